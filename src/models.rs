use chrono::{DateTime, Utc};
use diesel::{
    Selectable,
    prelude::{AsChangeset, Identifiable, Insertable, Queryable},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// Catalog

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::products)]
#[diesel(primary_key(product_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProductEntity {
    pub product_id: i32,
    pub product_name: String,
    pub unit_price: Decimal,
    pub units_in_stock: i32,
}

// Customers and accounts

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::customers)]
#[diesel(primary_key(customer_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CustomerEntity {
    pub customer_id: String,
    pub company_name: String,
    pub contact_name: Option<String>,
    pub contact_title: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
    pub fax: Option<String>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::customers)]
pub struct CreateCustomerEntity<'a> {
    pub customer_id: &'a str,
    pub company_name: &'a str,
    pub contact_name: Option<&'a str>,
}

/// Full replacement of a customer's profile fields. Absent optional fields are
/// written as NULL.
#[derive(AsChangeset, Deserialize, Debug, Clone, Default, ToSchema)]
#[diesel(table_name = crate::schema::customers)]
#[diesel(treat_none_as_null = true)]
pub struct CustomerUpdate {
    pub company_name: String,
    pub contact_name: Option<String>,
    pub contact_title: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
    pub fax: Option<String>,
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserEntity {
    pub id: i32,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub accept_policy: bool,
    pub accept_marketing: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::users)]
pub struct CreateUserEntity<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub accept_policy: bool,
    pub accept_marketing: bool,
}

// Carts

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::cart_lines)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CartLineEntity {
    pub id: i32,
    pub product_id: i32,
    pub cart_id: String,
    pub username: Option<String>,
    pub quantity: i32,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::cart_lines)]
pub struct CreateCartLineEntity {
    pub product_id: i32,
    pub cart_id: String,
    pub username: Option<String>,
    pub quantity: i32,
}

/// A cart line joined with the product it refers to.
#[derive(Queryable, Serialize, Debug, Clone, PartialEq, ToSchema)]
pub struct CartLineView {
    pub product_id: i32,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

// Orders

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::orders)]
#[diesel(primary_key(order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderEntity {
    pub order_id: i32,
    pub customer_id: String,
    pub order_date: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::orders)]
pub struct CreateOrderEntity<'a> {
    pub customer_id: &'a str,
    pub order_date: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Insertable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::order_details)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderDetailEntity {
    pub order_id: i32,
    pub product_id: i32,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub discount: f32,
}

/// An order detail line joined with its product name.
#[derive(Queryable, Serialize, Debug, Clone, ToSchema)]
pub struct OrderDetailView {
    pub product_id: i32,
    pub product_name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub discount: f32,
}

// Charges

#[derive(Queryable, Selectable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::charges)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ChargeEntity {
    pub id: Uuid,
    pub order_id: i32,
    pub customer_id: String,
    pub amount: Decimal,
    pub authorization_code: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::charges)]
pub struct CreateChargeEntity<'a> {
    pub order_id: i32,
    pub customer_id: &'a str,
    pub amount: Decimal,
    pub authorization_code: &'a str,
}
