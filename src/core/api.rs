//! HTTP API
//!
//! ## Endpoints
//! - `POST /api/generate` - render one portrait or a set of variations
//! - `POST /api/collection` - generate and stage a collection
//! - `GET /api/collection` - fetch the staged collection
//! - `POST /api/collection/mint` - pin and mint the staged collection
//! - `DELETE /api/collection` - discard the staged collection
//! - `GET /health` - health check
//!
//! Every failure is answered as `{success: false, error: {message, code}}`.
//!
//! Only one collection job (generate or mint) runs at a time; an overlapping
//! job is refused with 409. Reads and discards never wait on a job.

use axum::{
    extract::{rejection::JsonRejection, Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{oneshot, Mutex};
use tower_http::cors::{Any, CorsLayer};

use crate::core::character_gen::{
    validate_selection, CharacterAttributes, CharacterGenError, Selection,
};
use crate::core::collection::{
    Collection, CollectionContract, CollectionStats, CollectionStore, MintOutcome, MintProgress,
    MintingPipeline, PinningService, StoreError,
};
use crate::core::image_gen::orchestrator::GenerationOptions;
use crate::core::image_gen::{GenerationOrchestrator, ImageGenError, VariationResult};

pub const MAX_COLLECTION_SIZE: usize = 100;

// ============================================================================
// Errors
// ============================================================================

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Generation(ImageGenError),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ApiError::Generation(_) => (StatusCode::INTERNAL_SERVER_ERROR, "GENERATION_ERROR"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            ApiError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
        }
    }
}

impl From<CharacterGenError> for ApiError {
    fn from(e: CharacterGenError) -> Self {
        ApiError::Validation(e.to_string())
    }
}

impl From<ImageGenError> for ApiError {
    fn from(e: ImageGenError) -> Self {
        match e {
            ImageGenError::Validation(inner) => inner.into(),
            other => ApiError::Generation(other),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            log::error!("API error ({}): {}", code, self);
        }

        (
            status,
            Json(serde_json::json!({
                "success": false,
                "error": {
                    "message": self.to_string(),
                    "code": code
                }
            })),
        )
            .into_response()
    }
}

pub type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

// ============================================================================
// Request / Response Types
// ============================================================================

fn default_style() -> String {
    "realistic".to_string()
}

fn default_class() -> String {
    "warrior".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(default = "default_style")]
    pub style: String,
    #[serde(default = "default_class")]
    pub character_class: String,
    #[serde(default)]
    pub attributes: CharacterAttributes,
    #[serde(default)]
    pub generate_variations: bool,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

impl GenerateRequest {
    fn selection(&self) -> Selection {
        Selection {
            style: self.style.clone(),
            character_class: self.character_class.clone(),
            attributes: self.attributes.clone(),
        }
    }

    fn options(&self) -> GenerationOptions {
        GenerationOptions {
            variations: self.generate_variations,
            width: self.width,
            height: self.height,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub success: bool,
    pub variations: Vec<VariationResult>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCollectionRequest {
    pub selection: Selection,
    pub size: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectionResponse {
    pub success: bool,
    pub collection: Option<Collection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<CollectionStats>,
}

impl CollectionResponse {
    fn staged(collection: Option<Collection>) -> Self {
        Self {
            success: true,
            stats: collection.as_ref().map(Collection::stats),
            collection,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MintResponse {
    pub success: bool,
    pub mint: MintOutcome,
    pub progress: Vec<MintProgress>,
}

// ============================================================================
// State
// ============================================================================

pub struct AppState {
    pub orchestrator: GenerationOrchestrator,
    pub pinning: Arc<dyn PinningService>,
    pub contract: Arc<dyn CollectionContract>,
    pub marketplace_url: String,
    /// Guards file access only; never held across upstream calls.
    pub store: Mutex<CollectionStore>,
    /// Held for the duration of a collection generate or mint job.
    job: Mutex<()>,
}

impl AppState {
    pub fn new(
        orchestrator: GenerationOrchestrator,
        pinning: Arc<dyn PinningService>,
        contract: Arc<dyn CollectionContract>,
        marketplace_url: impl Into<String>,
        store: CollectionStore,
    ) -> Self {
        Self {
            orchestrator,
            pinning,
            contract,
            marketplace_url: marketplace_url.into(),
            store: Mutex::new(store),
            job: Mutex::new(()),
        }
    }

    fn begin_job(&self) -> Result<tokio::sync::MutexGuard<'_, ()>, ApiError> {
        self.job.try_lock().map_err(|_| {
            ApiError::Conflict("A collection is already being generated or minted".to_string())
        })
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/generate", post(generate))
        .route(
            "/api/collection",
            get(get_collection)
                .post(create_collection)
                .delete(clear_collection),
        )
        .route("/api/collection/mint", post(mint_collection))
        .route("/health", get(health_check))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .with_state(state)
}

// ============================================================================
// Service
// ============================================================================

pub struct ApiService {
    addr: SocketAddr,
    state: Arc<AppState>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl ApiService {
    pub fn new(addr: SocketAddr, state: Arc<AppState>) -> Self {
        Self {
            addr,
            state,
            shutdown_tx: None,
        }
    }

    /// Bind and start serving. Returns the bound address, which differs
    /// from the configured one when port 0 was requested.
    pub async fn start(&mut self) -> std::io::Result<SocketAddr> {
        if self.shutdown_tx.is_some() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::AddrInUse,
                "API service already running",
            ));
        }

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        let bound = listener.local_addr()?;
        let app = router(self.state.clone());
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            log::info!("API service started on http://{}", bound);
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                    log::info!("API service shutting down");
                })
                .await
                .ok();
        });

        self.shutdown_tx = Some(shutdown_tx);
        Ok(bound)
    }

    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            log::info!("API service stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.shutdown_tx.is_some()
    }
}

// ============================================================================
// HTTP Handlers
// ============================================================================

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn generate(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> ApiResult<GenerateResponse> {
    let Json(request) = payload?;
    validate_selection(&request.style, &request.character_class)?;

    let set = state
        .orchestrator
        .generate(&request.selection(), &request.options())
        .await?;

    Ok(Json(GenerateResponse {
        success: true,
        variations: set.variations,
        generated_at: set.generated_at,
    }))
}

async fn get_collection(State(state): State<Arc<AppState>>) -> ApiResult<CollectionResponse> {
    let store = state.store.lock().await;
    Ok(Json(CollectionResponse::staged(store.load().await?)))
}

async fn create_collection(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateCollectionRequest>, JsonRejection>,
) -> ApiResult<CollectionResponse> {
    let Json(request) = payload?;
    if request.size == 0 || request.size > MAX_COLLECTION_SIZE {
        return Err(ApiError::Validation(format!(
            "Collection size must be between 1 and {}",
            MAX_COLLECTION_SIZE
        )));
    }
    let selection = request.selection;
    validate_selection(&selection.style, &selection.character_class)?;

    let _job = state.begin_job()?;
    let mut rng = StdRng::from_entropy();
    let collection = state
        .orchestrator
        .generate_collection(&selection, request.size, &mut rng, |pct| {
            log::debug!("Collection generation {:.0}%", pct);
        })
        .await;

    if collection.is_empty() {
        return Err(ApiError::Generation(ImageGenError::AllVariationsFailed));
    }

    state.store.lock().await.save(&collection).await?;
    Ok(Json(CollectionResponse::staged(Some(collection))))
}

async fn mint_collection(State(state): State<Arc<AppState>>) -> ApiResult<MintResponse> {
    let _job = state.begin_job()?;
    let loaded = state.store.lock().await.load().await?;
    let mut collection = loaded
        .ok_or_else(|| ApiError::NotFound("No collection is staged".to_string()))?;

    let events = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink_events = events.clone();
    let mut pipeline = MintingPipeline::new(
        state.pinning.clone(),
        state.contract.clone(),
        state.marketplace_url.clone(),
    )
    .with_progress_sink(Arc::new(move |progress: &MintProgress| {
        if let Ok(mut events) = sink_events.lock() {
            events.push(progress.clone());
        }
    }));

    let outcome = pipeline.process_collection(&mut collection).await;
    let store = state.store.lock().await;
    if outcome.success {
        store.clear().await?;
    } else {
        store.save(&collection).await?;
    }
    drop(store);

    let progress = events
        .lock()
        .map(|mut events| std::mem::take(&mut *events))
        .unwrap_or_default();

    Ok(Json(MintResponse {
        success: outcome.success,
        mint: outcome,
        progress,
    }))
}

async fn clear_collection(State(state): State<Arc<AppState>>) -> ApiResult<serde_json::Value> {
    state.store.lock().await.clear().await?;
    Ok(Json(serde_json::json!({ "success": true })))
}
