mod common;

use base64::{Engine, engine::general_purpose::STANDARD};
use common::{TestDb, price};
use diesel::QueryDsl;
use diesel_async::RunQueryDsl;
use northwind_storefront::{
    schema::charges,
    services::{
        ServiceError, carts, orders,
        payments::{self, PaymentCallback},
    },
};

fn merchant_parameters(code: &str) -> String {
    STANDARD.encode(format!(r#"{{"Ds_AuthorisationCode":"{code}","Ds_Response":"0000"}}"#))
}

async fn place_order(conn: &mut diesel_async::AsyncPgConnection) -> i32 {
    carts::upsert(conn, 7, "abc", Some("alice"), 2).await.unwrap();
    carts::upsert(conn, 9, "abc", Some("alice"), 1).await.unwrap();
    orders::materialize(conn, "alice", "abc").await.unwrap().order_id
}

fn callback(order_id: i32, code: &str) -> PaymentCallback {
    PaymentCallback {
        amount: Some("2500".into()),
        order_id: Some(order_id.to_string()),
        customer_id: Some("alice".into()),
        merchant_parameters: Some(merchant_parameters(code)),
    }
}

async fn charge_count(conn: &mut diesel_async::AsyncPgConnection) -> i64 {
    charges::table.count().get_result(conn).await.unwrap()
}

#[tokio::test]
async fn callback_records_a_charge() {
    let db = TestDb::new().await;
    let conn = &mut db.conn().await;
    let order_id = place_order(conn).await;

    let reconciliation = payments::reconcile(conn, &callback(order_id, "AUTH-42"))
        .await
        .unwrap();

    assert_eq!(reconciliation.authorisation_code.as_deref(), Some("AUTH-42"));
    let charge = reconciliation.charge.unwrap();
    assert_eq!(charge.order_id, order_id);
    assert_eq!(charge.customer_id, "alice");
    assert_eq!(charge.amount, price(2500));
    assert_eq!(charge_count(conn).await, 1);
}

#[tokio::test]
async fn duplicate_authorization_is_a_conflict() {
    let db = TestDb::new().await;
    let conn = &mut db.conn().await;
    let order_id = place_order(conn).await;

    payments::reconcile(conn, &callback(order_id, "AUTH-42"))
        .await
        .unwrap();
    let replay = payments::reconcile(conn, &callback(order_id, "AUTH-42")).await;

    assert!(matches!(replay, Err(ServiceError::Conflict(_))));
    assert_eq!(charge_count(conn).await, 1);
}

#[tokio::test]
async fn undecodable_parameters_persist_nothing() {
    let db = TestDb::new().await;
    let conn = &mut db.conn().await;
    let order_id = place_order(conn).await;

    let mut garbled = callback(order_id, "AUTH-42");
    garbled.merchant_parameters = Some("%%%not-base64%%%".into());

    let result = payments::reconcile(conn, &garbled).await;
    assert!(matches!(result, Err(ServiceError::Decode(_))));
    assert_eq!(charge_count(conn).await, 0);
}

#[tokio::test]
async fn incomplete_callback_is_acknowledged_without_a_charge() {
    let db = TestDb::new().await;
    let conn = &mut db.conn().await;

    let partial = PaymentCallback {
        amount: None,
        order_id: None,
        customer_id: Some("alice".into()),
        merchant_parameters: Some(merchant_parameters("AUTH-7")),
    };
    let reconciliation = payments::reconcile(conn, &partial).await.unwrap();

    assert_eq!(reconciliation.authorisation_code.as_deref(), Some("AUTH-7"));
    assert!(reconciliation.charge.is_none());
    assert_eq!(charge_count(conn).await, 0);
}

#[tokio::test]
async fn charge_for_unknown_order_is_not_found() {
    let db = TestDb::new().await;
    let conn = &mut db.conn().await;

    let result = payments::reconcile(conn, &callback(4242, "AUTH-9")).await;
    assert!(matches!(result, Err(ServiceError::NotFound("Order"))));
    assert_eq!(charge_count(conn).await, 0);
}
