use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info};

use kllamma_core::{FeedbackService, PromptService};
use kllamma_db::Database;
use kllamma_logging::ServiceEvent;
use kllamma_refiner::{create_refiner, Refiner};

use crate::api::{self, AppState};
use crate::config::AppConfig;

/// Run the HTTP service until interrupted.
///
/// The database connection is opened before the listener binds and is closed
/// after the last in-flight request has finished.
pub async fn run(config: AppConfig) -> Result<()> {
    let db = Database::connect(&config.database_url).context("Failed to connect to database")?;

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind API server to {}", config.bind_addr))?;

    serve(config, db, listener, shutdown_signal()).await
}

/// Serve requests on `listener` until `shutdown` resolves, then disconnect `db`.
pub async fn serve<F>(
    config: AppConfig,
    db: Database,
    listener: tokio::net::TcpListener,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let db = Arc::new(db);

    let refiner: Arc<dyn Refiner> = Arc::from(
        create_refiner(config.refiner_type, config.refiner_settings.clone())
            .context("Failed to create refiner")?,
    );

    let prompts = PromptService::new(
        db.clone(),
        refiner.clone(),
        config.service.refiner.clone(),
        config.service.max_prompt_chars,
    );
    let feedback = FeedbackService::new(
        db.clone(),
        config.service.rating_range.clone(),
        config.service.missing_reference,
    );

    let state = AppState {
        prompts: Arc::new(prompts),
        feedback: Arc::new(feedback),
    };
    let router = api::create_router(state);

    let address = listener
        .local_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| config.bind_addr.clone());

    info!(
        database = %db.location(),
        missing_reference = %config.service.missing_reference,
        timeout_secs = config.service.refiner.timeout.as_secs(),
        "Service configured"
    );
    ServiceEvent::ServerStarted {
        address,
        refiner: refiner.name().to_string(),
        model: refiner.model().to_string(),
    }
    .emit();

    let result = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await;

    ServiceEvent::ServerStopped {
        reason: match &result {
            Ok(()) => "shutdown".to_string(),
            Err(e) => e.to_string(),
        },
    }
    .emit();

    drop(refiner);
    let closed = disconnect(db);

    result.context("API server error")?;
    closed
}

/// Close the shared connection once every service handle has been dropped.
fn disconnect(db: Arc<Database>) -> Result<()> {
    let db = Arc::try_unwrap(db)
        .map_err(|_| anyhow::anyhow!("Database still in use at shutdown"))?;
    db.disconnect().context("Failed to close database connection")?;
    info!("Database connection closed");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!(signal = "interrupt", "Shutting down"),
        _ = terminate => info!(signal = "terminate", "Shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kllamma_core::ServiceSettings;
    use kllamma_refiner::{RefinerSettings, RefinerType};
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tokio::sync::oneshot;

    fn config(database_url: String) -> AppConfig {
        AppConfig {
            database_url,
            bind_addr: "127.0.0.1:0".to_string(),
            refiner_type: RefinerType::Template,
            refiner_settings: RefinerSettings::default(),
            service: ServiceSettings::default(),
        }
    }

    #[tokio::test]
    async fn test_shutdown_closes_database_and_keeps_data() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kllamma.db");
        let config = config(format!("sqlite://{}", path.display()));

        let db = Database::connect(&config.database_url).unwrap();
        let listener = tokio::net::TcpListener::bind(&config.bind_addr).await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (stop, stopped) = oneshot::channel::<()>();
        let server = tokio::spawn(serve(config, db, listener, async move {
            let _ = stopped.await;
        }));

        let body: Value = reqwest::Client::new()
            .post(format!("http://{}/prompt/refine", addr))
            .json(&json!({ "prompt": "write a haiku" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let id = body["promptRefinementId"].as_str().unwrap().to_string();

        stop.send(()).unwrap();
        server.await.unwrap().unwrap();

        let reopened = Database::open_at(&path).unwrap();
        let stored = reopened.refinements().get(&id).unwrap().unwrap();
        assert_eq!(stored.original_prompt, "write a haiku");
    }
}
