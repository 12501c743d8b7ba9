use std::{process, sync::Arc, time::Duration};

use quire::{
    application::{error::AppError, page::PageResolver, repos::PageViewsRepo},
    cache::ContentCache,
    config,
    infra::{
        content::FsContentStore,
        db::PostgresRepositories,
        error::InfraError,
        http::{self, HttpState},
        telemetry,
    },
};
use sqlx::PgPool;
use tokio::sync::Notify;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let pool = init_pool(&settings).await?;
    let repositories = Arc::new(PostgresRepositories::new(pool));
    let views: Arc<dyn PageViewsRepo> = repositories;

    // Refuse to serve when the pages table cannot be reached.
    let pages = views
        .count()
        .await
        .map_err(|err| AppError::from(InfraError::database(format!("startup probe: {err}"))))?;
    info!(
        target = "quire::startup",
        pages,
        content_dir = %settings.content.directory.display(),
        "Page views table ready"
    );

    let content = Arc::new(FsContentStore::new(
        settings.content.directory.clone(),
        settings.content.extension.clone(),
    ));
    let resolver = Arc::new(PageResolver::new(
        content,
        Arc::new(ContentCache::new()),
        views.clone(),
    ));

    serve_http(
        &settings,
        HttpState {
            pages: resolver,
            views,
        },
    )
    .await
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    init_pool(&settings).await?;
    info!(target = "quire::migrate", "Schema migrations applied");
    Ok(())
}

async fn init_pool(settings: &config::Settings) -> Result<PgPool, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool = PostgresRepositories::connect(
        database_url,
        settings.database.max_connections.get(),
        settings.database.acquire_timeout,
    )
    .await
    .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    Ok(pool)
}

async fn serve_http(settings: &config::Settings, state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        target = "quire::http",
        addr = %settings.server.addr,
        "Listening"
    );

    let shutdown = Arc::new(Notify::new());
    let trigger = shutdown.clone();
    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async move {
            wait_for_ctrl_c().await;
            trigger.notify_one();
        })
        .into_future();
    tokio::pin!(server);

    let grace = settings.server.graceful_shutdown;
    tokio::select! {
        result = &mut server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        () = drain_deadline(&shutdown, grace) => {
            warn!(
                target = "quire::http",
                grace_seconds = grace.as_secs(),
                "In-flight requests did not finish before the shutdown deadline"
            );
        }
    }

    info!(target = "quire::http", "Server stopped");
    Ok(())
}

async fn wait_for_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!(target = "quire::http", "Shutdown signal received"),
        Err(err) => {
            error!(target = "quire::http", error = %err, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}

async fn drain_deadline(shutdown: &Notify, grace: Duration) {
    shutdown.notified().await;
    tokio::time::sleep(grace).await;
}
