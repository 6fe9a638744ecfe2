//! Throwaway PostgreSQL for integration tests.

#![allow(dead_code)]

use diesel::ExpressionMethods;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use northwind_storefront::{
    infra::db::{self, MIGRATIONS},
    schema::{customers, products},
};
use rust_decimal::Decimal;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;

pub struct TestDb {
    _container: ContainerAsync<Postgres>,
    pub url: String,
}

impl TestDb {
    /// Starts a container, applies the migrations and seeds a small catalog.
    pub async fn new() -> Self {
        let container = Postgres::default()
            .start()
            .await
            .expect("Failed to start PostgreSQL container");
        let port = container
            .get_host_port_ipv4(5432)
            .await
            .expect("Failed to get container port");
        let host = std::env::var("TESTCONTAINERS_HOST_OVERRIDE")
            .unwrap_or_else(|_| "127.0.0.1".to_string());
        let url = format!("postgres://postgres:postgres@{host}:{port}/postgres");

        db::run_migrations_blocking(MIGRATIONS, &url)
            .await
            .expect("Failed to run migrations");

        let db = Self {
            _container: container,
            url,
        };
        db.seed().await;
        db
    }

    pub async fn conn(&self) -> AsyncPgConnection {
        AsyncPgConnection::establish(&self.url)
            .await
            .expect("Failed to connect to test database")
    }

    async fn seed(&self) {
        let conn = &mut self.conn().await;

        for (id, name, cents, stock) in [
            (3, "Aniseed Syrup", 1800, 13),
            (7, "Uncle Bob's Organic Dried Pears", 1000, 15),
            (9, "Mishi Kobe Niku", 500, 29),
        ] {
            diesel::insert_into(products::table)
                .values((
                    products::product_id.eq(id),
                    products::product_name.eq(name),
                    products::unit_price.eq(Decimal::new(cents, 2)),
                    products::units_in_stock.eq(stock),
                ))
                .execute(conn)
                .await
                .expect("Failed to seed products");
        }

        diesel::insert_into(customers::table)
            .values((
                customers::customer_id.eq("alice"),
                customers::company_name.eq("Alice Imports"),
            ))
            .execute(conn)
            .await
            .expect("Failed to seed customers");
    }
}

pub fn price(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}
