use servientd::config::Config;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.logging.filter)?)
        .init();

    let runtime = servientd::assemble(&config)?;
    for thing in &runtime.things {
        let mut changes = thing.subscribe_changes();
        let name = thing.name().to_string();
        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(description) => tracing::info!(
                        thing = %name,
                        properties = description.properties.len(),
                        actions = description.actions.len(),
                        events = description.events.len(),
                        "description changed"
                    ),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(thing = %name, skipped, "description changes dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
    }

    let app = runtime.router();
    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(
        addr = %bind_addr,
        routes = runtime.servient.table().len(),
        "servientd listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    runtime.shutdown();
    tracing::info!("servientd stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(%err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(%err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
