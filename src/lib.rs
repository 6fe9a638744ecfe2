//! Storefront backend over a Northwind-style catalog: carts, checkout,
//! order history and payment gateway callbacks.

pub mod infra;
pub mod models;
pub mod routes;
pub mod schema;
pub mod services;
