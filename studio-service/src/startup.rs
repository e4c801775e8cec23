use crate::catalog::Catalog;
use crate::config::StudioConfig;
use crate::handlers;
use crate::housekeeping::Housekeeper;
use crate::services::image_fetcher::ImageFetcher;
use crate::services::providers::gemini::{GeminiConfig, GeminiProvider};
use crate::services::providers::ContentProvider;
use crate::services::{ImageStore, Studio};
use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware, security_headers::security_headers_middleware,
    tracing::{make_request_span, request_id_middleware},
};
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub studio: Studio,
}

/// Gemini client from configuration, or `None` when no API key is set.
pub fn provider_from_config(
    config: &StudioConfig,
) -> Result<Option<Arc<dyn ContentProvider>>, AppError> {
    let Some(api_key) = config.google.api_key.clone() else {
        tracing::warn!("GOOGLE_API_KEY not set; AI endpoints will report the client as not initialized");
        return Ok(None);
    };

    let provider = GeminiProvider::new(GeminiConfig {
        api_key,
        api_base: config.google.api_base.clone(),
        timeout: config.provider_timeout(),
    })
    .map_err(|e| AppError::ConfigError(anyhow::anyhow!(e)))?;

    tracing::info!(api_base = %config.google.api_base, "Gemini client initialized");
    Ok(Some(Arc::new(provider)))
}

pub async fn build_state(
    config: &StudioConfig,
    provider: Option<Arc<dyn ContentProvider>>,
) -> Result<AppState, AppError> {
    let store = ImageStore::new(&config.storage.generated_dir)
        .await
        .map_err(|e| {
            tracing::error!(
                path = %config.storage.generated_dir.display(),
                error = %e,
                "Failed to initialize generated images directory"
            );
            AppError::ConfigError(anyhow::anyhow!(e))
        })?;

    let fetcher = ImageFetcher::new(config.provider_timeout(), config.max_request_bytes)
        .map_err(|e| AppError::ConfigError(anyhow::anyhow!(e)))?;

    let studio = Studio::new(
        provider,
        store,
        Catalog::new(config.models.default_chat_model.clone()),
        config.models.clone(),
        fetcher,
    );

    Ok(AppState { studio })
}

pub fn build_router(state: AppState, config: &StudioConfig) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .route("/api", get(handlers::api_docs))
        .route("/analyze_base64", post(handlers::analyze_base64))
        .route("/analyze_url", post(handlers::analyze_url))
        .route("/generate_text_to_image", post(handlers::generate_text_to_image))
        .route("/edit_image", post(handlers::edit_image))
        .route("/compose_images", post(handlers::compose_images))
        .route("/ask", post(handlers::ask))
        .layer(DefaultBodyLimit::max(config.max_request_bytes))
        // Covers body upload too, so a stalled client cannot pin a connection.
        .layer(TimeoutLayer::new(config.server.request_timeout()))
        .layer(from_fn(metrics_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span::<Body>))
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
    state: AppState,
    shutdown: CancellationToken,
    shutdown_grace: Duration,
}

impl Application {
    pub async fn build(config: StudioConfig) -> Result<Self, AppError> {
        let provider = provider_from_config(&config)?;
        Self::build_with_provider(config, provider).await
    }

    pub async fn build_with_provider(
        config: StudioConfig,
        provider: Option<Arc<dyn ContentProvider>>,
    ) -> Result<Self, AppError> {
        if config.uses_dev_session_secret() {
            tracing::warn!("SESSION_SECRET not set; using development default");
        }

        let state = build_state(&config, provider).await?;
        let shutdown = CancellationToken::new();

        Housekeeper::new(
            config.housekeeping.clone(),
            state.studio.store().clone(),
            shutdown.clone(),
        )
        .spawn();

        let router = build_router(state.clone(), &config);

        let addr = config.common.address();
        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        Ok(Self {
            port,
            listener,
            router,
            state,
            shutdown,
            shutdown_grace: config.server.shutdown_grace(),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Cancelling this token stops the server and the housekeeping timers.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Serves until the shutdown token is cancelled, then drains for at most
    /// the configured grace window. Connections still open after that are
    /// abandoned so a scheduled restart always goes through.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let shutdown = self.shutdown.clone();
        let server = axum::serve(self.listener, self.router)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .into_future();
        tokio::pin!(server);

        tokio::select! {
            result = &mut server => {
                // Stop the timers too when the server ended for another reason.
                self.shutdown.cancel();
                return result;
            }
            _ = self.shutdown.cancelled() => {}
        }

        match tokio::time::timeout(self.shutdown_grace, server).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    grace_secs = self.shutdown_grace.as_secs(),
                    "Connections still open after shutdown grace; forcing shutdown"
                );
                Ok(())
            }
        }
    }
}
