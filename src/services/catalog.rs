use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper};
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::{
    models::ProductEntity,
    schema::products,
    services::{ServiceError, ServiceResult},
};

pub async fn list_products(conn: &mut AsyncPgConnection) -> ServiceResult<Vec<ProductEntity>> {
    let products = products::table
        .select(ProductEntity::as_select())
        .order_by(products::product_id)
        .load(conn)
        .await?;
    Ok(products)
}

pub async fn get_product(conn: &mut AsyncPgConnection, id: i32) -> ServiceResult<ProductEntity> {
    products::table
        .find(id)
        .select(ProductEntity::as_select())
        .first(conn)
        .await
        .optional()?
        .ok_or(ServiceError::NotFound("Product"))
}

/// Bulk read; ids without a matching product are skipped.
pub async fn get_products(
    conn: &mut AsyncPgConnection,
    ids: &[i32],
) -> ServiceResult<Vec<ProductEntity>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let products = products::table
        .filter(products::product_id.eq_any(ids))
        .select(ProductEntity::as_select())
        .order_by(products::product_id)
        .load(conn)
        .await?;
    Ok(products)
}
