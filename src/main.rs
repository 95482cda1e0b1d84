use std::sync::Arc;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use anyhow::Context;
use dotenvy::dotenv;

use payrun::api::AppState;
use payrun::config::Config;
use payrun::db::init_db;
use payrun::docs::ApiDoc;
use payrun::docstore::FsDocumentStore;
use payrun::pipeline::{LogSender, Orchestrator, RetryPolicy};
use payrun::routes;
use payrun::rules::StatutoryConfig;
use payrun::store::mysql::MySqlStore;

use tracing::info;
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "payrun payroll service"
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::from_env();

    // Rolling daily log
    let file_appender = rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let pool = init_db(&config.database_url).await;

    let statutory = match &config.statutory_rules_path {
        Some(path) => StatutoryConfig::load(path)
            .await
            .with_context(|| format!("loading statutory rules from {path}"))?,
        None => StatutoryConfig::builtin(),
    };

    let store = Arc::new(MySqlStore::new(pool));
    let docs = Arc::new(FsDocumentStore::new(config.document_root.clone()));
    let orchestrator = Orchestrator::new(
        store,
        docs.clone(),
        Arc::new(LogSender),
        Arc::new(statutory),
        RetryPolicy {
            max_attempts: config.retry_max_attempts,
            base_delay: std::time::Duration::from_millis(config.retry_base_delay_ms),
        },
    );
    let state = AppState { orchestrator, docs };

    let server_addr = config.server_addr.clone();
    let config_data = config.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(state.clone()))
            .app_data(Data::new(config.clone()))
            .service(index)
            .configure(|cfg| routes::configure(cfg, config_data.clone()))
    })
    .bind(server_addr)?
    .run()
    .await
    .context("server terminated")
}
