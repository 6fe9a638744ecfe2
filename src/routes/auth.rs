use anyhow::Context;
use axum::{Extension, Json, extract::State, response::IntoResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    infra::{
        app_error::{AppError, StdResponse},
        app_state::AppState,
        middleware::{self, AuthenticatedUser},
    },
    models::{CartLineEntity, UserEntity},
    services::{
        accounts::{self, NewAccount},
        carts,
    },
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest(
        "/auth",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(register))
            .routes(utoipa_axum::routes!(login))
            .merge(
                OpenApiRouter::new()
                    .routes(utoipa_axum::routes!(change_password))
                    .route_layer(axum::middleware::from_fn(
                        middleware::customers_authorization,
                    )),
            ),
    )
}

#[derive(Deserialize, ToSchema)]
struct RegisterReq {
    username: String,
    /// Already hashed by the client.
    password: String,
    #[serde(default)]
    accept_policy: bool,
    #[serde(default)]
    accept_marketing: bool,
}

/// Create an account and its customer record.
#[utoipa::path(
    post,
    path = "/register",
    tags = ["Auth"],
    request_body = RegisterReq,
    responses(
        (status = 200, description = "Registered successfully", body = StdResponse<UserEntity, String>),
        (status = 409, description = "Username already exists")
    )
)]
async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let user = accounts::register(
        conn,
        NewAccount {
            username: body.username,
            password: body.password,
            accept_policy: body.accept_policy,
            accept_marketing: body.accept_marketing,
        },
    )
    .await?;

    Ok(StdResponse {
        data: Some(user),
        message: Some("Registered successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct LoginReq {
    username: String,
    password: String,
    /// Anonymous cart to associate with the account once logged in.
    cart_id: Option<String>,
}

#[derive(Serialize, ToSchema)]
struct LoginRes {
    user: UserEntity,
    token: String,
    cart: Option<Vec<CartLineEntity>>,
}

/// Check credentials and issue a signed, time-limited token.
#[utoipa::path(
    post,
    path = "/login",
    tags = ["Auth"],
    request_body = LoginReq,
    responses(
        (status = 200, description = "Logged in successfully", body = StdResponse<LoginRes, String>),
        (status = 401, description = "Invalid username or password")
    )
)]
async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let user = accounts::authenticate(conn, &body.username, &body.password).await?;
    let token = state
        .tokens
        .issue(user.id, &user.username)
        .context("Failed to sign token")?;

    let cart = match body.cart_id.as_deref().filter(|id| !id.trim().is_empty()) {
        Some(cart_id) => Some(carts::reassign(conn, cart_id, &user.username).await?),
        None => None,
    };

    tracing::info!("User {} logged in", user.username);

    Ok(StdResponse {
        data: Some(LoginRes { user, token, cart }),
        message: Some("Logged in successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct ChangePasswordReq {
    current_password: String,
    new_password: String,
}

/// Change the authenticated user's password.
#[utoipa::path(
    patch,
    path = "/password",
    tags = ["Auth"],
    security(("bearerAuth" = [])),
    request_body = ChangePasswordReq,
    responses(
        (status = 200, description = "Password changed successfully"),
        (status = 401, description = "Invalid username or password")
    )
)]
async fn change_password(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(body): Json<ChangePasswordReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    accounts::change_password(
        conn,
        &user.username,
        &body.current_password,
        &body.new_password,
    )
    .await?;

    Ok(StdResponse::<(), &str> {
        data: None,
        message: Some("Password changed successfully"),
    })
}
