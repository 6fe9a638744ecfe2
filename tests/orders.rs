mod common;

use common::{TestDb, price};
use diesel::{ExpressionMethods, QueryDsl};
use diesel_async::RunQueryDsl;
use northwind_storefront::{
    schema::{order_details, orders, products},
    services::{
        ServiceError,
        accounts::{self, NewAccount},
        carts, orders as order_service, payments,
    },
};

#[tokio::test]
async fn materializing_a_cart_creates_order_and_empties_cart() {
    let db = TestDb::new().await;
    let conn = &mut db.conn().await;

    carts::upsert(conn, 7, "abc", Some("alice"), 2).await.unwrap();
    carts::upsert(conn, 9, "abc", Some("alice"), 1).await.unwrap();

    let order = order_service::materialize(conn, "alice", "abc").await.unwrap();

    assert_eq!(order.total, price(2500));
    assert_eq!(order.lines, 2);

    let order_count: i64 = orders::table.count().get_result(conn).await.unwrap();
    assert_eq!(order_count, 1);

    let mut details: Vec<(i32, i32, rust_decimal::Decimal)> = order_details::table
        .filter(order_details::order_id.eq(order.order_id))
        .select((
            order_details::product_id,
            order_details::quantity,
            order_details::unit_price,
        ))
        .load(conn)
        .await
        .unwrap();
    details.sort_by_key(|(product_id, _, _)| *product_id);
    assert_eq!(details, vec![(7, 2, price(1000)), (9, 1, price(500))]);

    assert!(carts::read(conn, "abc").await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_customer_rolls_everything_back() {
    let db = TestDb::new().await;
    let conn = &mut db.conn().await;

    carts::upsert(conn, 7, "abc", None, 2).await.unwrap();

    let result = order_service::materialize(conn, "mallory", "abc").await;
    assert!(matches!(result, Err(ServiceError::NotFound("Customer"))));

    let order_count: i64 = orders::table.count().get_result(conn).await.unwrap();
    let detail_count: i64 = order_details::table.count().get_result(conn).await.unwrap();
    assert_eq!(order_count, 0);
    assert_eq!(detail_count, 0);
    assert_eq!(carts::read(conn, "abc").await.unwrap().len(), 1);
}

#[tokio::test]
async fn empty_cart_is_rejected_without_an_order() {
    let db = TestDb::new().await;
    let conn = &mut db.conn().await;

    let result = order_service::materialize(conn, "alice", "empty").await;
    assert!(matches!(result, Err(ServiceError::Validation(_))));

    let order_count: i64 = orders::table.count().get_result(conn).await.unwrap();
    assert_eq!(order_count, 0);
}

#[tokio::test]
async fn order_prices_are_frozen_at_creation() {
    let db = TestDb::new().await;
    let conn = &mut db.conn().await;

    carts::upsert(conn, 3, "abc", Some("alice"), 3).await.unwrap();
    let created = order_service::materialize(conn, "alice", "abc").await.unwrap();

    diesel::update(products::table.find(3))
        .set(products::unit_price.eq(price(9900)))
        .execute(conn)
        .await
        .unwrap();

    let order = order_service::get_order(conn, created.order_id).await.unwrap();
    assert_eq!(order.details.len(), 1);
    assert_eq!(order.details[0].unit_price, price(1800));
    assert_eq!(order.details[0].product_name, "Aniseed Syrup");
    assert_eq!(order.total, price(5400));
}

#[tokio::test]
async fn order_history_reports_totals_and_payment() {
    let db = TestDb::new().await;
    let conn = &mut db.conn().await;

    carts::upsert(conn, 7, "first", Some("alice"), 1).await.unwrap();
    let first = order_service::materialize(conn, "alice", "first").await.unwrap();
    carts::upsert(conn, 9, "second", Some("alice"), 4).await.unwrap();
    let second = order_service::materialize(conn, "alice", "second").await.unwrap();

    payments::record_charge(conn, "alice", first.order_id, price(1000), "AUTH-1")
        .await
        .unwrap();

    let history = order_service::list_customer_orders(conn, "alice").await.unwrap();
    assert_eq!(history.len(), 2);

    let first_summary = history.iter().find(|o| o.order_id == first.order_id).unwrap();
    let second_summary = history.iter().find(|o| o.order_id == second.order_id).unwrap();
    assert_eq!(first_summary.total, price(1000));
    assert!(first_summary.paid);
    assert_eq!(second_summary.total, price(2000));
    assert!(!second_summary.paid);
}

#[tokio::test]
async fn missing_order_is_not_found() {
    let db = TestDb::new().await;
    let conn = &mut db.conn().await;

    assert!(matches!(
        order_service::get_order(conn, 4242).await,
        Err(ServiceError::NotFound("Order"))
    ));
}

#[tokio::test]
async fn checking_out_another_users_cart_is_forbidden() {
    let db = TestDb::new().await;
    let conn = &mut db.conn().await;

    accounts::register(
        conn,
        NewAccount {
            username: "bob".into(),
            password: "hash".into(),
            accept_policy: true,
            accept_marketing: false,
        },
    )
    .await
    .unwrap();
    carts::upsert(conn, 7, "abc", Some("alice"), 2).await.unwrap();

    let result = order_service::materialize(conn, "bob", "abc").await;
    assert!(matches!(result, Err(ServiceError::Forbidden(_))));

    let order_count: i64 = orders::table.count().get_result(conn).await.unwrap();
    assert_eq!(order_count, 0);
    assert_eq!(carts::read(conn, "abc").await.unwrap().len(), 1);
}

#[tokio::test]
async fn checkout_takes_anonymous_and_own_lines() {
    let db = TestDb::new().await;
    let conn = &mut db.conn().await;

    carts::upsert(conn, 7, "abc", None, 1).await.unwrap();
    carts::upsert(conn, 9, "abc", Some("alice"), 2).await.unwrap();

    let order = order_service::materialize(conn, "alice", "abc").await.unwrap();
    assert_eq!(order.lines, 2);
    assert_eq!(order.total, price(2000));
    assert!(carts::read(conn, "abc").await.unwrap().is_empty());
}
