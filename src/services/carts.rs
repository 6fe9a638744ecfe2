//! Cart lines keyed by (product, cart id).
//!
//! A stored line always has a positive quantity: setting a line to zero
//! removes it instead of storing it.

use std::collections::BTreeMap;

use diesel::{
    BoolExpressionMethods, ExpressionMethods, QueryDsl, SelectableHelper, upsert::excluded,
};
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::{
    models::{CartLineEntity, CartLineView, CreateCartLineEntity},
    schema::{cart_lines, products},
    services::{ServiceError, ServiceResult, is_foreign_key_violation},
};

/// Sets the quantity of `product_id` in `cart_id`.
///
/// Returns the stored line, or `None` when a zero quantity removed it.
pub async fn upsert(
    conn: &mut AsyncPgConnection,
    product_id: i32,
    cart_id: &str,
    username: Option<&str>,
    quantity: i32,
) -> ServiceResult<Option<CartLineEntity>> {
    validate_cart_id(cart_id)?;
    if quantity < 0 {
        return Err(ServiceError::Validation(
            "Quantity cannot be negative".into(),
        ));
    }

    if quantity == 0 {
        let removed = diesel::delete(
            cart_lines::table
                .filter(cart_lines::product_id.eq(product_id))
                .filter(cart_lines::cart_id.eq(cart_id)),
        )
        .execute(conn)
        .await?;
        debug!(
            "Removed product {} from cart {} ({} rows)",
            product_id, cart_id, removed
        );
        return Ok(None);
    }

    let line = diesel::insert_into(cart_lines::table)
        .values(CreateCartLineEntity {
            product_id,
            cart_id: cart_id.to_owned(),
            username: username.map(str::to_owned),
            quantity,
        })
        .on_conflict((cart_lines::product_id, cart_lines::cart_id))
        .do_update()
        .set(cart_lines::quantity.eq(excluded(cart_lines::quantity)))
        .returning(CartLineEntity::as_returning())
        .get_result(conn)
        .await
        .map_err(|err| {
            if is_foreign_key_violation(&err) {
                ServiceError::NotFound("Product")
            } else {
                err.into()
            }
        })?;

    debug!(
        "Cart {} now holds {} x product {}",
        cart_id, line.quantity, product_id
    );
    Ok(Some(line))
}

/// All lines of `cart_id`, joined with product name and price.
pub async fn read(conn: &mut AsyncPgConnection, cart_id: &str) -> ServiceResult<Vec<CartLineView>> {
    let lines = cart_lines::table
        .inner_join(products::table)
        .filter(cart_lines::cart_id.eq(cart_id))
        .select((
            cart_lines::product_id,
            products::product_name,
            cart_lines::quantity,
            products::unit_price,
        ))
        .order_by(cart_lines::product_id)
        .load::<CartLineView>(conn)
        .await?;
    Ok(lines)
}

/// Associates `cart_id` with `username` after login.
///
/// Lines held under `cart_id` and lines previously owned by `username` are
/// merged per product, keeping the larger quantity, and stored again under
/// `cart_id` owned by `username`. A cart holding another user's lines is
/// refused.
pub async fn reassign(
    conn: &mut AsyncPgConnection,
    cart_id: &str,
    username: &str,
) -> ServiceResult<Vec<CartLineEntity>> {
    validate_cart_id(cart_id)?;
    if username.trim().is_empty() {
        return Err(ServiceError::Validation("Username is required".into()));
    }

    let cart_id = cart_id.to_owned();
    let username = username.to_owned();

    conn.transaction(move |conn| {
        Box::pin(async move {
            ensure_claimable(conn, &cart_id, &username).await?;

            let source: Vec<CartLineEntity> = cart_lines::table
                .filter(
                    cart_lines::cart_id
                        .eq(&cart_id)
                        .or(cart_lines::username.eq(&username)),
                )
                .select(CartLineEntity::as_select())
                .load(conn)
                .await?;

            let merged = merge_max_quantities(
                source.iter().map(|line| (line.product_id, line.quantity)),
            );

            diesel::delete(
                cart_lines::table.filter(
                    cart_lines::cart_id
                        .eq(&cart_id)
                        .or(cart_lines::username.eq(&username)),
                ),
            )
            .execute(conn)
            .await?;

            if merged.is_empty() {
                return Ok(Vec::new());
            }

            let rows: Vec<CreateCartLineEntity> = merged
                .into_iter()
                .map(|(product_id, quantity)| CreateCartLineEntity {
                    product_id,
                    cart_id: cart_id.clone(),
                    username: Some(username.clone()),
                    quantity,
                })
                .collect();

            let lines: Vec<CartLineEntity> = diesel::insert_into(cart_lines::table)
                .values(&rows)
                .returning(CartLineEntity::as_returning())
                .get_results(conn)
                .await?;

            info!(
                "Cart {} assigned to {} with {} lines",
                cart_id,
                username,
                lines.len()
            );
            Ok::<Vec<CartLineEntity>, ServiceError>(lines)
        })
    })
    .await
}

/// Fails when `cart_id` holds lines owned by someone other than `username`.
pub async fn ensure_claimable(
    conn: &mut AsyncPgConnection,
    cart_id: &str,
    username: &str,
) -> ServiceResult<()> {
    let foreign: i64 = cart_lines::table
        .filter(cart_lines::cart_id.eq(cart_id))
        .filter(cart_lines::username.is_not_null())
        .filter(cart_lines::username.ne(username))
        .count()
        .get_result(conn)
        .await?;

    if foreign > 0 {
        return Err(ServiceError::Forbidden(
            "Cart belongs to another customer".into(),
        ));
    }
    Ok(())
}

/// Collapses `(product, quantity)` pairs to one entry per product holding the
/// largest quantity, ordered by product id.
pub fn merge_max_quantities(lines: impl IntoIterator<Item = (i32, i32)>) -> Vec<(i32, i32)> {
    let mut merged: BTreeMap<i32, i32> = BTreeMap::new();
    for (product_id, quantity) in lines {
        merged
            .entry(product_id)
            .and_modify(|current| *current = (*current).max(quantity))
            .or_insert(quantity);
    }
    merged.into_iter().filter(|(_, quantity)| *quantity > 0).collect()
}

pub fn cart_total(lines: &[CartLineView]) -> Decimal {
    lines
        .iter()
        .map(|line| line.unit_price * Decimal::from(line.quantity))
        .sum()
}

fn validate_cart_id(cart_id: &str) -> ServiceResult<()> {
    if cart_id.trim().is_empty() {
        return Err(ServiceError::Validation("Cart id is required".into()));
    }
    Ok(())
}
