//! Payment gateway callback reconciliation.
//!
//! The gateway redirects back with the amount (minor units), order and
//! customer ids and `Ds_MerchantParameters`, a URL-encoded base64 JSON blob
//! carrying the authorization code.

use std::str::FromStr;

use base64::{
    Engine,
    engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD},
};
use diesel::SelectableHelper;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use percent_encoding::percent_decode_str;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::{info, warn};

use crate::{
    models::{ChargeEntity, CreateChargeEntity},
    schema::charges,
    services::{ServiceError, ServiceResult, is_foreign_key_violation, is_unique_violation},
};

/// Fields read from the decoded merchant parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MerchantParameters {
    pub authorisation_code: Option<String>,
    pub response: Option<String>,
    pub order: Option<String>,
}

/// Raw callback query values, all optional as the gateway sends them.
#[derive(Debug, Clone, Default)]
pub struct PaymentCallback {
    pub amount: Option<String>,
    pub order_id: Option<String>,
    pub customer_id: Option<String>,
    pub merchant_parameters: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    pub authorisation_code: Option<String>,
    pub charge: Option<ChargeEntity>,
}

pub fn decode_merchant_parameters(raw: &str) -> ServiceResult<MerchantParameters> {
    let unescaped = percent_decode_str(raw.trim())
        .decode_utf8()
        .map_err(|err| ServiceError::Decode(err.to_string()))?;
    // Query decoding may already have turned '+' into ' '.
    let encoded = unescaped.trim().replace(' ', "+");

    let bytes = [&STANDARD, &URL_SAFE, &STANDARD_NO_PAD, &URL_SAFE_NO_PAD]
        .into_iter()
        .find_map(|engine| engine.decode(&encoded).ok())
        .ok_or_else(|| ServiceError::Decode("invalid base64".into()))?;

    let json: Value =
        serde_json::from_slice(&bytes).map_err(|err| ServiceError::Decode(err.to_string()))?;
    let object = json
        .as_object()
        .ok_or_else(|| ServiceError::Decode("expected a JSON object".into()))?;

    Ok(MerchantParameters {
        authorisation_code: object.get("Ds_AuthorisationCode").and_then(value_as_string),
        response: object.get("Ds_Response").and_then(value_as_string),
        order: object.get("Ds_Order").and_then(value_as_string),
    })
}

fn value_as_string(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_owned(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Converts an amount in minor currency units (cents) to a decimal amount.
pub fn parse_minor_units(raw: &str) -> ServiceResult<Decimal> {
    let cents = Decimal::from_str(raw.trim())
        .map_err(|_| ServiceError::Validation(format!("Invalid amount: {raw}")))?;
    if cents.is_sign_negative() {
        return Err(ServiceError::Validation(format!("Invalid amount: {raw}")));
    }
    Ok(cents / Decimal::ONE_HUNDRED)
}

pub async fn record_charge(
    conn: &mut AsyncPgConnection,
    customer_id: &str,
    order_id: i32,
    amount: Decimal,
    authorisation_code: &str,
) -> ServiceResult<ChargeEntity> {
    let charge = diesel::insert_into(charges::table)
        .values(CreateChargeEntity {
            order_id,
            customer_id,
            amount,
            authorization_code: authorisation_code,
        })
        .returning(ChargeEntity::as_returning())
        .get_result(conn)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                ServiceError::Conflict(format!(
                    "Charge with authorization {authorisation_code} was already recorded"
                ))
            } else if is_foreign_key_violation(&err) {
                ServiceError::NotFound("Order")
            } else {
                err.into()
            }
        })?;

    info!(
        "Recorded charge {} of {} for order #{} ({})",
        charge.id, charge.amount, charge.order_id, charge.authorization_code
    );
    Ok(charge)
}

/// Decodes the callback and records a charge when enough data is present.
///
/// Decode failures persist nothing. Without amount, order and customer the
/// callback is acknowledged but nothing is recorded.
pub async fn reconcile(
    conn: &mut AsyncPgConnection,
    callback: &PaymentCallback,
) -> ServiceResult<Reconciliation> {
    let parameters = match callback.merchant_parameters.as_deref() {
        Some(raw) => decode_merchant_parameters(raw)?,
        None => MerchantParameters::default(),
    };

    let (Some(amount), Some(order_id), Some(customer_id)) = (
        non_empty(&callback.amount),
        non_empty(&callback.order_id),
        non_empty(&callback.customer_id),
    ) else {
        warn!("Payment callback without amount, order or customer; nothing recorded");
        return Ok(Reconciliation {
            authorisation_code: parameters.authorisation_code,
            charge: None,
        });
    };

    let authorisation_code = parameters.authorisation_code.ok_or_else(|| {
        ServiceError::Validation("Payment callback carries no authorization code".into())
    })?;
    let amount = parse_minor_units(amount)?;
    let order_id: i32 = order_id
        .trim()
        .parse()
        .map_err(|_| ServiceError::Validation(format!("Invalid order id: {order_id}")))?;

    let charge = record_charge(conn, customer_id, order_id, amount, &authorisation_code).await?;

    Ok(Reconciliation {
        authorisation_code: Some(authorisation_code),
        charge: Some(charge),
    })
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}
