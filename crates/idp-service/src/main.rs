use idp_service::config::Config;
use idp_service::observability::metrics::init_metrics_recorder;
use idp_service::routes;
use std::net::SocketAddr;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "idp_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(target: "idp.startup", "Starting IdP service");

    let config = Config::load().map_err(|e| {
        error!(target: "idp.startup", error = %e, "Failed to load configuration");
        e
    })?;

    info!(
        target: "idp.startup",
        bind_port = config.bind_port,
        algorithm = ?config.issuer.algorithm,
        time_zone = %config.issuer.time_zone.name(),
        clients = config.clients.len(),
        "Configuration loaded"
    );

    if let Some(tls) = &config.tls {
        warn!(
            target: "idp.startup",
            keystore = %tls.keystore_path.display(),
            "TLS keystore configured but this listener serves plain HTTP; terminate TLS upstream"
        );
    }

    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!(target: "idp.startup", error = %e, "Failed to initialize metrics recorder");
        e
    })?;

    // Listener binds only after the signer is ready.
    let state = idp_service::initialize(&config).await.map_err(|e| {
        error!(target: "idp.startup", error = %e, "Failed to initialize token issuer");
        e
    })?;
    let authenticator = state.authenticator.clone();

    let app = routes::build_routes(state, metrics_handle);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.bind_port));
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        error!(target: "idp.startup", error = %e, %addr, "Failed to bind listener");
        e
    })?;

    info!(target: "idp.startup", %addr, "IdP service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    authenticator.cancel();
    info!(target: "idp.startup", "IdP service shutdown complete");

    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
