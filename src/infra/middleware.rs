use std::sync::Arc;

use axum::{
    Extension,
    extract::Request,
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};

use crate::infra::{app_error::AppError, tokens::TokenKeys};

/// Identity of the caller, inserted into request extensions by
/// [`customers_authorization`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: i32,
    pub username: String,
}

impl AuthenticatedUser {
    /// Customers are keyed by username, so a caller owns exactly one customer row.
    pub fn ensure_owns(&self, customer_id: &str) -> Result<(), AppError> {
        if self.username == customer_id {
            Ok(())
        } else {
            Err(AppError::ForbiddenResource(
                "Customer does not belong to the authenticated user".into(),
            ))
        }
    }
}

/// Rejects requests without a valid bearer token.
pub async fn customers_authorization(
    Extension(keys): Extension<Arc<TokenKeys>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = identify(req.headers(), &keys)?.ok_or_else(|| {
        AppError::Unauthorized("Missing or invalid Authorization header".into())
    })?;

    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}

/// Resolves the caller from an optional bearer token.
///
/// No `Authorization` header yields `None`; a present but invalid token is an error.
pub fn identify(headers: &HeaderMap, keys: &TokenKeys) -> Result<Option<AuthenticatedUser>, AppError> {
    if !headers.contains_key(AUTHORIZATION) {
        return Ok(None);
    }

    let token = extract_bearer_token(headers).ok_or_else(|| {
        AppError::Unauthorized("Missing or invalid Authorization header".into())
    })?;

    let claims = keys.verify(token).map_err(|err| {
        tracing::debug!("Rejected bearer token: {}", err);
        AppError::Unauthorized("Invalid or expired token".into())
    })?;

    let user_id = claims
        .sub
        .parse()
        .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))?;

    Ok(Some(AuthenticatedUser {
        user_id,
        username: claims.username,
    }))
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();

    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return None;
    }

    Some(token)
}
