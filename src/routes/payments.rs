use anyhow::Context;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::router::OpenApiRouter;

use crate::{
    infra::{
        app_error::{AppError, StdResponse},
        app_state::AppState,
    },
    models::ChargeEntity,
    services::{
        ServiceError,
        payments::{self, PaymentCallback},
    },
};

/// Gateway redirect targets. They carry no bearer token; the gateway
/// payload is the proof of payment.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest(
        "/payments",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(payment_callback))
            .routes(utoipa_axum::routes!(payment_failure)),
    )
}

#[derive(Deserialize, IntoParams, Debug)]
#[into_params(parameter_in = Query)]
struct PaymentCallbackQuery {
    /// Amount in minor currency units (cents).
    amount: Option<String>,
    #[serde(rename = "orderId")]
    order_id: Option<String>,
    #[serde(rename = "customerId")]
    customer_id: Option<String>,
    /// Base64 + URL-encoded JSON carrying `Ds_AuthorisationCode`.
    #[serde(rename = "Ds_MerchantParameters")]
    merchant_parameters: Option<String>,
}

#[derive(Serialize, ToSchema)]
struct PaymentCallbackRes {
    authorization_code: Option<String>,
    charge: Option<ChargeEntity>,
}

/// Successful-payment redirect: decode the authorization and record the charge.
#[utoipa::path(
    get,
    path = "/callback",
    tags = ["Payments"],
    params(PaymentCallbackQuery),
    responses(
        (status = 200, description = "Payment processed", body = StdResponse<PaymentCallbackRes, String>),
        (status = 400, description = "Payment authorization could not be read"),
        (status = 409, description = "Charge already recorded")
    )
)]
async fn payment_callback(
    Query(query): Query<PaymentCallbackQuery>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let callback = PaymentCallback {
        amount: query.amount,
        order_id: query.order_id,
        customer_id: query.customer_id,
        merchant_parameters: query.merchant_parameters,
    };

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let reconciliation = payments::reconcile(conn, &callback)
        .await
        .map_err(|err| match err {
            ServiceError::Conflict(msg) => {
                AppError::Conflict(format!("Error saving the charge: {msg}"))
            }
            other => other.into(),
        })?;

    let message = if reconciliation.charge.is_some() {
        "Charge saved successfully"
    } else {
        "Payment processed"
    };

    Ok(StdResponse {
        data: Some(PaymentCallbackRes {
            authorization_code: reconciliation.authorisation_code,
            charge: reconciliation.charge,
        }),
        message: Some(message),
    })
}

#[derive(Deserialize, IntoParams, Debug)]
#[into_params(parameter_in = Query)]
struct PaymentFailureQuery {
    amount: Option<String>,
    #[serde(rename = "orderId")]
    order_id: Option<String>,
    #[serde(rename = "customerId")]
    customer_id: Option<String>,
}

#[derive(Serialize, ToSchema)]
struct PaymentFailureRes {
    amount: Option<Decimal>,
    order_id: Option<String>,
    customer_id: Option<String>,
}

/// Failed-payment redirect. Nothing is persisted.
#[utoipa::path(
    get,
    path = "/failure",
    tags = ["Payments"],
    params(PaymentFailureQuery),
    responses(
        (status = 200, description = "Payment failure acknowledged", body = StdResponse<PaymentFailureRes, String>)
    )
)]
async fn payment_failure(Query(query): Query<PaymentFailureQuery>) -> impl IntoResponse {
    tracing::warn!(
        "Payment failed for order {:?} of customer {:?}",
        query.order_id,
        query.customer_id
    );

    StdResponse {
        data: Some(PaymentFailureRes {
            amount: query
                .amount
                .as_deref()
                .and_then(|amount| payments::parse_minor_units(amount).ok()),
            order_id: query.order_id,
            customer_id: query.customer_id,
        }),
        message: Some("The payment could not be processed"),
    }
}
