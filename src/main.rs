use anyhow::Result;
use northwind_storefront::{
    infra::{
        app_state::AppState,
        bootstrap, config,
        db::{self, MIGRATIONS},
        swagger,
        tokens::TokenKeys,
    },
    routes,
};

#[tokio::main]
async fn main() -> Result<()> {
    bootstrap::init_env();
    let config = config::load()?;
    bootstrap::init_tracing(config.log_level);

    let (router, mut openapi) = routes::routes_with_openapi().split_for_parts();
    openapi.info = utoipa::openapi::InfoBuilder::new()
        .title("Northwind Storefront API")
        .version("1.0.0")
        .build();
    let swagger_ui = swagger::create_swagger_ui(openapi);

    tracing::info!("Running migrations...");
    let migrations_count = db::run_migrations_blocking(MIGRATIONS, &config.database.url).await?;
    tracing::info!("Run {} new migrations successfully", migrations_count);

    tracing::info!("Bootstrapping...");
    let db_pool = db::create_pool(&config.database).await?;
    let state = AppState::new(db_pool, TokenKeys::from_config(&config.auth));
    let app = bootstrap::build_app(router.merge(swagger_ui), state);

    bootstrap::serve("Storefront", app, &config.server).await
}
