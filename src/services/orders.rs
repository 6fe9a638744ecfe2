//! Order materialization and order history.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use diesel::{BoolExpressionMethods, ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper};
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{error, info, warn};
use utoipa::ToSchema;

use crate::{
    models::{CreateOrderEntity, OrderDetailEntity, OrderDetailView, OrderEntity},
    schema::{cart_lines, charges, customers, order_details, orders, products},
    services::{ServiceError, ServiceResult, carts},
};

#[derive(Serialize, Debug, Clone, PartialEq, ToSchema)]
pub struct MaterializedOrder {
    pub order_id: i32,
    pub order_date: DateTime<Utc>,
    pub total: Decimal,
    pub lines: usize,
}

#[derive(Serialize, Debug, Clone, ToSchema)]
pub struct OrderSummary {
    pub order_id: i32,
    pub order_date: DateTime<Utc>,
    pub total: Decimal,
    pub paid: bool,
}

#[derive(Serialize, Debug, Clone, ToSchema)]
pub struct OrderWithDetails {
    pub order: OrderEntity,
    pub details: Vec<OrderDetailView>,
    pub total: Decimal,
}

/// Turns the contents of `cart_id` into an order for `username`.
///
/// Runs as a single transaction: the customer check, the order row, the
/// detail rows priced from the catalog and the removal of the cart lines
/// either all commit or none do. Only anonymous lines and lines owned by
/// `username` are taken; a cart holding another user's lines is refused.
pub async fn materialize(
    conn: &mut AsyncPgConnection,
    username: &str,
    cart_id: &str,
) -> ServiceResult<MaterializedOrder> {
    let username = username.to_owned();
    let cart_id = cart_id.to_owned();
    let log_cart_id = cart_id.clone();

    let result = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let customer_id: String = customers::table
                    .find(&username)
                    .select(customers::customer_id)
                    .first(conn)
                    .await
                    .optional()?
                    .ok_or(ServiceError::NotFound("Customer"))?;

                carts::ensure_claimable(conn, &cart_id, &username).await?;

                // Copy and clear read the same rows: DELETE ... RETURNING.
                let claimed: Vec<(i32, i32)> = diesel::delete(
                    cart_lines::table.filter(cart_lines::cart_id.eq(&cart_id)).filter(
                        cart_lines::username
                            .eq(&username)
                            .or(cart_lines::username.is_null()),
                    ),
                )
                .returning((cart_lines::product_id, cart_lines::quantity))
                .get_results(conn)
                .await?;

                if claimed.is_empty() {
                    return Err(ServiceError::Validation("Cart is empty".into()));
                }

                let product_ids: Vec<i32> = claimed.iter().map(|(id, _)| *id).collect();
                let unit_prices: HashMap<i32, Decimal> = products::table
                    .filter(products::product_id.eq_any(&product_ids))
                    .select((products::product_id, products::unit_price))
                    .load::<(i32, Decimal)>(conn)
                    .await?
                    .into_iter()
                    .collect();

                let order: OrderEntity = diesel::insert_into(orders::table)
                    .values(CreateOrderEntity {
                        customer_id: &customer_id,
                        order_date: Utc::now(),
                    })
                    .returning(OrderEntity::as_returning())
                    .get_result(conn)
                    .await?;

                let details = claimed
                    .into_iter()
                    .map(|(product_id, quantity)| -> ServiceResult<OrderDetailEntity> {
                        let unit_price = unit_prices
                            .get(&product_id)
                            .copied()
                            .ok_or(ServiceError::NotFound("Product"))?;
                        Ok(OrderDetailEntity {
                            order_id: order.order_id,
                            product_id,
                            unit_price,
                            quantity,
                            discount: 0.0,
                        })
                    })
                    .collect::<ServiceResult<Vec<_>>>()?;

                let inserted: Vec<OrderDetailEntity> = diesel::insert_into(order_details::table)
                    .values(&details)
                    .returning(OrderDetailEntity::as_returning())
                    .get_results(conn)
                    .await?;

                Ok::<MaterializedOrder, ServiceError>(MaterializedOrder {
                    order_id: order.order_id,
                    order_date: order.order_date,
                    total: gross_total(&inserted),
                    lines: inserted.len(),
                })
            })
        })
        .await;

    match &result {
        Ok(order) => info!(
            "Order #{} created from cart {} with {} lines, total {}",
            order.order_id, log_cart_id, order.lines, order.total
        ),
        Err(err) if err.is_internal() => {
            error!("Error creating order from cart {}: {}", log_cart_id, err)
        }
        Err(err) => warn!("Order from cart {} rejected: {}", log_cart_id, err),
    }

    result
}

/// Orders of `customer_id`, newest first, with totals and payment status.
pub async fn list_customer_orders(
    conn: &mut AsyncPgConnection,
    customer_id: &str,
) -> ServiceResult<Vec<OrderSummary>> {
    let orders: Vec<OrderEntity> = orders::table
        .filter(orders::customer_id.eq(customer_id))
        .order_by(orders::order_date.desc())
        .select(OrderEntity::as_select())
        .load(conn)
        .await?;

    let order_ids: Vec<i32> = orders.iter().map(|order| order.order_id).collect();

    let details: Vec<OrderDetailEntity> = order_details::table
        .filter(order_details::order_id.eq_any(&order_ids))
        .select(OrderDetailEntity::as_select())
        .load(conn)
        .await?;

    let paid: HashSet<i32> = charges::table
        .filter(charges::order_id.eq_any(&order_ids))
        .select(charges::order_id)
        .distinct()
        .load::<i32>(conn)
        .await?
        .into_iter()
        .collect();

    let mut group: HashMap<i32, Vec<OrderDetailEntity>> = HashMap::new();
    for detail in details {
        group.entry(detail.order_id).or_default().push(detail);
    }

    let summaries = orders
        .into_iter()
        .map(|order| {
            let details = group.remove(&order.order_id).unwrap_or_default();
            OrderSummary {
                order_id: order.order_id,
                order_date: order.order_date,
                total: gross_total(&details),
                paid: paid.contains(&order.order_id),
            }
        })
        .collect();

    Ok(summaries)
}

pub async fn get_order(conn: &mut AsyncPgConnection, order_id: i32) -> ServiceResult<OrderWithDetails> {
    let order: OrderEntity = orders::table
        .find(order_id)
        .select(OrderEntity::as_select())
        .first(conn)
        .await
        .optional()?
        .ok_or(ServiceError::NotFound("Order"))?;

    let details: Vec<OrderDetailView> = order_details::table
        .inner_join(products::table)
        .filter(order_details::order_id.eq(order_id))
        .select((
            order_details::product_id,
            products::product_name,
            order_details::unit_price,
            order_details::quantity,
            order_details::discount,
        ))
        .order_by(order_details::product_id)
        .load(conn)
        .await?;

    let total = discounted_total(&details);
    Ok(OrderWithDetails {
        order,
        details,
        total,
    })
}

/// Σ price × quantity, ignoring discounts.
pub fn gross_total(details: &[OrderDetailEntity]) -> Decimal {
    details
        .iter()
        .map(|detail| detail.unit_price * Decimal::from(detail.quantity))
        .sum()
}

/// Σ price × quantity × (1 − discount), rounded to cents.
pub fn discounted_total(details: &[OrderDetailView]) -> Decimal {
    details
        .iter()
        .map(|detail| {
            let discount = Decimal::try_from(detail.discount).unwrap_or_default();
            detail.unit_price * Decimal::from(detail.quantity) * (Decimal::ONE - discount)
        })
        .sum::<Decimal>()
        .round_dp(2)
}
