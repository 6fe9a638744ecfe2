mod common;

use common::TestDb;
use northwind_storefront::{
    models::CustomerUpdate,
    services::{
        ServiceError,
        accounts::{self, NewAccount},
        customers,
    },
};

fn account(username: &str, password: &str) -> NewAccount {
    NewAccount {
        username: username.into(),
        password: password.into(),
        accept_policy: true,
        accept_marketing: false,
    }
}

#[tokio::test]
async fn registering_creates_user_and_customer() {
    let db = TestDb::new().await;
    let conn = &mut db.conn().await;

    let user = accounts::register(conn, account("bob", "hash-1")).await.unwrap();
    assert_eq!(user.username, "bob");
    assert!(user.accept_policy);

    let customer = customers::get_customer(conn, "bob").await.unwrap();
    assert_eq!(customer.company_name, "bob");
    assert_eq!(customer.contact_name.as_deref(), Some("bob"));
}

#[tokio::test]
async fn registering_reuses_an_existing_customer() {
    let db = TestDb::new().await;
    let conn = &mut db.conn().await;

    accounts::register(conn, account("alice", "hash-1")).await.unwrap();

    let customer = customers::get_customer(conn, "alice").await.unwrap();
    assert_eq!(customer.company_name, "Alice Imports");
}

#[tokio::test]
async fn duplicate_username_is_a_conflict() {
    let db = TestDb::new().await;
    let conn = &mut db.conn().await;

    accounts::register(conn, account("bob", "hash-1")).await.unwrap();
    let again = accounts::register(conn, account("bob", "hash-2")).await;

    assert!(matches!(again, Err(ServiceError::Conflict(_))));
    assert!(accounts::authenticate(conn, "bob", "hash-1").await.is_ok());
}

#[tokio::test]
async fn authentication_and_password_change() {
    let db = TestDb::new().await;
    let conn = &mut db.conn().await;

    accounts::register(conn, account("bob", "hash-1")).await.unwrap();

    assert!(matches!(
        accounts::authenticate(conn, "bob", "wrong").await,
        Err(ServiceError::Unauthorized(_))
    ));
    assert!(matches!(
        accounts::change_password(conn, "bob", "wrong", "hash-2").await,
        Err(ServiceError::Unauthorized(_))
    ));

    accounts::change_password(conn, "bob", "hash-1", "hash-2")
        .await
        .unwrap();

    assert!(accounts::authenticate(conn, "bob", "hash-1").await.is_err());
    let user = accounts::authenticate(conn, "bob", "hash-2").await.unwrap();
    assert_eq!(user.username, "bob");
}

#[tokio::test]
async fn customer_profile_can_be_updated() {
    let db = TestDb::new().await;
    let conn = &mut db.conn().await;

    let update = CustomerUpdate {
        company_name: "Alice Imports Ltd".into(),
        city: Some("Berlin".into()),
        country: Some("Germany".into()),
        ..Default::default()
    };
    let customer = customers::update_customer(conn, "alice", &update).await.unwrap();

    assert_eq!(customer.company_name, "Alice Imports Ltd");
    assert_eq!(customer.city.as_deref(), Some("Berlin"));
    assert_eq!(customer.phone, None);

    assert!(matches!(
        customers::update_customer(conn, "nobody", &update).await,
        Err(ServiceError::NotFound("Customer"))
    ));
}
