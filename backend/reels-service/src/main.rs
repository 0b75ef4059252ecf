/// Reels Service - HTTP Server
///
/// Serves the reels feed, uploads, engagement and moderation endpoints.
use actix_files::Files;
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use reels_service::handlers;
use reels_service::jobs::RateLimitSweeper;
use reels_service::metrics::metrics_handler;
use reels_service::middleware::IdentityMiddleware;
use reels_service::{AppState, Config};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = terminate.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,actix_web=info".into());
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::from_env()
        .map_err(anyhow::Error::msg)
        .context("Failed to load configuration")?;
    let bind_address = format!("{}:{}", config.app.host, config.app.port);
    let workers = config.app.workers;
    let media_dir = config.media.storage_dir.clone();
    let media_mount = config.media.public_base_url.trim_end_matches('/').to_string();
    let sweep_interval = Duration::from_secs(config.rate_limit.sweep_interval_secs);

    tracing::info!(env = %config.app.env, "Reels service starting on {}", bind_address);

    let state = web::Data::new(
        AppState::build(config)
            .await
            .context("Failed to initialize application state")?,
    );

    let (sweeper_shutdown, sweeper) =
        RateLimitSweeper::new(state.admission.clone(), sweep_interval).spawn();

    let app_state = state.clone();
    let mut server = HttpServer::new(move || {
        let admission = app_state.admission.clone();
        let mut app = App::new()
            .app_data(app_state.clone())
            .wrap(IdentityMiddleware::new(app_state.users.clone()))
            .wrap(tracing_actix_web::TracingLogger::default())
            .route("/metrics", web::get().to(metrics_handler))
            .route("/api/v1/health", web::get().to(handlers::health_check))
            .route("/api/v1/health/live", web::get().to(handlers::liveness_check))
            .route("/api/v1/health/ready", web::get().to(handlers::readiness_check))
            .service(
                web::scope("/api/v1").configure(|cfg| handlers::configure(cfg, admission)),
            );
        if media_mount.starts_with('/') {
            app = app.service(Files::new(&media_mount, media_dir.clone()));
        }
        app
    })
    .bind(&bind_address)
    .with_context(|| format!("Failed to bind {bind_address}"))?
    .disable_signals();

    if let Some(workers) = workers {
        server = server.workers(workers);
    }

    let server = server.run();
    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let outcome = tokio::select! {
        result = server_task => {
            match result {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(anyhow::Error::new(e).context("HTTP server error")),
                Err(e) => Err(anyhow::Error::new(e).context("HTTP server task failed")),
            }
        }
        _ = &mut shutdown => {
            tracing::info!("Shutdown signal received");
            server_handle.stop(true).await;
            Ok(())
        }
    };

    let _ = sweeper_shutdown.send(());
    if let Err(e) = sweeper.await {
        tracing::warn!("Rate limit sweeper did not stop cleanly: {}", e);
    }

    tracing::info!("Reels-service shutting down");
    outcome
}
