use std::sync::Arc;

use anyhow::Context;
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::HeaderMap,
    response::IntoResponse,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    infra::{
        app_error::{AppError, StdResponse},
        app_state::AppState,
        middleware::{self, AuthenticatedUser},
        tokens::TokenKeys,
    },
    models::{CartLineEntity, CartLineView},
    services::carts,
};

/// Cart routes. Reading and editing a cart works anonymously; assigning a cart
/// to an account requires a bearer token.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest(
        "/carts",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_cart))
            .routes(utoipa_axum::routes!(upsert_cart_line))
            .merge(
                OpenApiRouter::new()
                    .routes(utoipa_axum::routes!(assign_cart))
                    .route_layer(axum::middleware::from_fn(
                        middleware::customers_authorization,
                    )),
            ),
    )
}

#[derive(Serialize, ToSchema)]
struct GetCartRes {
    pub cart_id: String,
    pub lines: Vec<CartLineView>,
    pub total_price: Decimal,
}

/// Fetch the lines of a cart.
#[utoipa::path(
    get,
    path = "/{cart_id}",
    tags = ["Carts"],
    params(
        ("cart_id" = String, Path, description = "Cart identifier")
    ),
    responses(
        (status = 200, description = "Get cart successfully", body = StdResponse<GetCartRes, String>)
    )
)]
async fn get_cart(
    Path(cart_id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let lines = carts::read(conn, &cart_id).await?;
    let total_price = carts::cart_total(&lines);

    Ok(StdResponse {
        data: Some(GetCartRes {
            cart_id,
            lines,
            total_price,
        }),
        message: Some("Get cart successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct UpsertCartLineReq {
    /// New quantity; zero removes the product from the cart.
    quantity: i32,
}

#[derive(Serialize, ToSchema)]
struct UpsertCartLineRes {
    /// The stored line, absent when the product was removed.
    pub line: Option<CartLineEntity>,
}

/// Set the quantity of a product in a cart.
///
/// When a valid bearer token is sent, the line is recorded as owned by its user.
#[utoipa::path(
    put,
    path = "/{cart_id}/items/{product_id}",
    tags = ["Carts"],
    params(
        ("cart_id" = String, Path, description = "Cart identifier"),
        ("product_id" = i32, Path, description = "Product to add, update or remove")
    ),
    request_body = UpsertCartLineReq,
    responses(
        (status = 200, description = "Cart updated successfully", body = StdResponse<UpsertCartLineRes, String>),
        (status = 400, description = "Negative quantity"),
        (status = 404, description = "Product not found")
    )
)]
async fn upsert_cart_line(
    Path((cart_id, product_id)): Path<(String, i32)>,
    State(state): State<AppState>,
    Extension(keys): Extension<Arc<TokenKeys>>,
    headers: HeaderMap,
    Json(body): Json<UpsertCartLineReq>,
) -> Result<impl IntoResponse, AppError> {
    let owner = middleware::identify(&headers, &keys)?.map(|user| user.username);

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let line = carts::upsert(conn, product_id, &cart_id, owner.as_deref(), body.quantity).await?;
    let message = if line.is_some() {
        "Cart updated successfully"
    } else {
        "Product removed from cart"
    };

    Ok(StdResponse {
        data: Some(UpsertCartLineRes { line }),
        message: Some(message),
    })
}

/// Assign a cart to the authenticated user, merging the user's earlier lines.
#[utoipa::path(
    post,
    path = "/{cart_id}/assign",
    tags = ["Carts"],
    security(("bearerAuth" = [])),
    params(
        ("cart_id" = String, Path, description = "Cart identifier to assign")
    ),
    responses(
        (status = 200, description = "Cart assigned successfully", body = StdResponse<Vec<CartLineEntity>, String>),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Cart belongs to another customer")
    )
)]
async fn assign_cart(
    Path(cart_id): Path<String>,
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let lines = carts::reassign(conn, &cart_id, &user.username).await?;

    Ok(StdResponse {
        data: Some(lines),
        message: Some("Cart assigned successfully"),
    })
}
