use anyhow::Context;
use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use utoipa_axum::router::OpenApiRouter;

use crate::{
    infra::{
        app_error::{AppError, StdResponse},
        app_state::AppState,
        middleware::{self, AuthenticatedUser},
    },
    models::{CustomerEntity, CustomerUpdate},
    services::{
        customers,
        orders::{self, OrderSummary},
    },
};

/// Customer-scoped routes. Callers may only reach their own customer record.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest(
        "/customers",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_customer, update_customer))
            .routes(utoipa_axum::routes!(get_customer_orders))
            .route_layer(axum::middleware::from_fn(
                middleware::customers_authorization,
            )),
    )
}

/// Fetch the authenticated customer's profile.
#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Customers"],
    security(("bearerAuth" = [])),
    params(
        ("id" = String, Path, description = "Customer ID (the username)")
    ),
    responses(
        (status = 200, description = "Get customer successfully", body = StdResponse<CustomerEntity, String>),
        (status = 403, description = "Customer belongs to another user")
    )
)]
async fn get_customer(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, AppError> {
    user.ensure_owns(&id)?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let customer = customers::get_customer(conn, &id).await?;

    Ok(StdResponse {
        data: Some(customer),
        message: Some("Get customer successfully"),
    })
}

/// Replace the authenticated customer's profile fields.
#[utoipa::path(
    patch,
    path = "/{id}",
    tags = ["Customers"],
    security(("bearerAuth" = [])),
    params(
        ("id" = String, Path, description = "Customer ID (the username)")
    ),
    request_body = CustomerUpdate,
    responses(
        (status = 200, description = "Updated customer successfully", body = StdResponse<CustomerEntity, String>),
        (status = 400, description = "Invalid profile fields"),
        (status = 403, description = "Customer belongs to another user")
    )
)]
async fn update_customer(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(body): Json<CustomerUpdate>,
) -> Result<impl IntoResponse, AppError> {
    user.ensure_owns(&id)?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let customer = customers::update_customer(conn, &id, &body).await?;

    Ok(StdResponse {
        data: Some(customer),
        message: Some("Updated customer successfully"),
    })
}

/// List the authenticated customer's orders, newest first.
#[utoipa::path(
    get,
    path = "/{id}/orders",
    tags = ["Customers"],
    security(("bearerAuth" = [])),
    params(
        ("id" = String, Path, description = "Customer ID (the username)")
    ),
    responses(
        (status = 200, description = "List my orders", body = StdResponse<Vec<OrderSummary>, String>),
        (status = 403, description = "Customer belongs to another user")
    )
)]
async fn get_customer_orders(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, AppError> {
    user.ensure_owns(&id)?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let orders = orders::list_customer_orders(conn, &id).await?;

    Ok(StdResponse {
        data: Some(orders),
        message: Some("Get my orders successfully"),
    })
}
