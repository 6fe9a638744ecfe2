pub mod auth;
pub mod carts;
pub mod customers;
pub mod orders;
pub mod payments;
pub mod products;

use utoipa_axum::router::OpenApiRouter;

use crate::infra::app_state::AppState;

/// Every route of the service, with its OpenAPI description.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    products::routes_with_openapi()
        .merge(carts::routes_with_openapi())
        .merge(auth::routes_with_openapi())
        .merge(customers::routes_with_openapi())
        .merge(orders::routes_with_openapi())
        .merge(payments::routes_with_openapi())
}
