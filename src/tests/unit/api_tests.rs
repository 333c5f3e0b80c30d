//! HTTP API Unit Tests
//!
//! Drives the axum router in-process with `tower::ServiceExt::oneshot`:
//! - Request validation and error bodies
//! - Single and variation generation responses
//! - Staged collection lifecycle (create, fetch, mint, clear)

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use crate::core::api::{router, ApiService, AppState};
use crate::core::collection::contract::MockCollectionContract;
use crate::core::collection::pinning::MockPinningService;
use crate::core::collection::{CollectionStore, MintReceipt};
use crate::core::image_gen::{
    GenerationOrchestrator, ImageDefaults, ImageFormat, ImageGenError, ImageGenerator,
    ImageRequest, MockImageGenerator,
};
use crate::tests::common::*;

struct Harness {
    state: Arc<AppState>,
    _data_dir: TempDir,
}

impl Harness {
    fn new(
        generator: MockImageGenerator,
        pinning: MockPinningService,
        contract: MockCollectionContract,
    ) -> Self {
        Self::build(Arc::new(generator), pinning, contract)
    }

    fn build(
        generator: Arc<dyn ImageGenerator>,
        pinning: MockPinningService,
        contract: MockCollectionContract,
    ) -> Self {
        let data_dir = TempDir::new().unwrap();
        let orchestrator = GenerationOrchestrator::new(generator, ImageDefaults::default());
        let state = Arc::new(AppState::new(
            orchestrator,
            Arc::new(pinning),
            Arc::new(contract),
            MARKETPLACE,
            CollectionStore::new(data_dir.path()),
        ));
        Self {
            state,
            _data_dir: data_dir,
        }
    }

    fn with_generator(generator: MockImageGenerator) -> Self {
        Self::new(generator, MockPinningService::new(), MockCollectionContract::new())
    }

    async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        send(self.state.clone(), method, uri, body).await
    }
}

async fn send(
    state: Arc<AppState>,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            request = request.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = router(state)
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn failing_generator() -> MockImageGenerator {
    let mut generator = MockImageGenerator::new();
    generator.expect_id().return_const("mock");
    generator.expect_output_format().return_const(ImageFormat::Png);
    generator.expect_request_image().returning(|_| {
        Err(ImageGenError::Upstream {
            status: 500,
            message: "Stability AI API Error: 500".to_string(),
        })
    });
    generator
}

/// Generator that takes `delay` to render each image.
struct SlowGenerator {
    delay: Duration,
}

#[async_trait]
impl ImageGenerator for SlowGenerator {
    fn id(&self) -> &'static str {
        "slow"
    }

    fn output_format(&self) -> ImageFormat {
        ImageFormat::Png
    }

    async fn request_image(&self, _request: &ImageRequest) -> Result<Vec<u8>, ImageGenError> {
        tokio::time::sleep(self.delay).await;
        Ok(PNG_BYTES.to_vec())
    }
}

fn untouched_generator() -> MockImageGenerator {
    let mut generator = MockImageGenerator::new();
    generator.expect_request_image().times(0);
    generator
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_check() {
    let harness = Harness::with_generator(untouched_generator());
    let (status, body) = harness.send("GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_service_binds_and_stops() {
    let harness = Harness::with_generator(untouched_generator());
    let mut service = ApiService::new("127.0.0.1:0".parse().unwrap(), harness.state.clone());

    let addr = service.start().await.unwrap();
    assert!(service.is_running());
    assert!(service.start().await.is_err());

    let body: Value = reqwest::get(format!("http://{}/health", addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");

    service.stop().await;
    assert!(!service.is_running());
}

// =============================================================================
// Generation
// =============================================================================

#[tokio::test]
async fn test_generate_with_defaults() {
    let harness = Harness::with_generator(generator_ok());
    let (status, body) = harness.send("POST", "/api/generate", Some(json!({}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(body["generatedAt"].is_string());
    let variations = body["variations"].as_array().unwrap();
    assert_eq!(variations.len(), 1);
    assert_eq!(variations[0]["success"], true);
    assert!(variations[0]["image"]
        .as_str()
        .unwrap()
        .starts_with("data:image/png;base64,"));
    assert_eq!(variations[0]["metadata"]["style"], "realistic");
    assert_eq!(variations[0]["metadata"]["characterClass"], "warrior");
}

#[tokio::test]
async fn test_generate_variations() {
    let harness = Harness::with_generator(generator_ok());
    let (status, body) = harness
        .send(
            "POST",
            "/api/generate",
            Some(json!({
                "style": "anime",
                "characterClass": "mage",
                "attributes": { "race": "elf", "equipment": "bow" },
                "generateVariations": true
            })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    let variations = body["variations"].as_array().unwrap();
    assert_eq!(variations.len(), 4);
    assert!(variations[0]["metadata"]["prompt"]
        .as_str()
        .unwrap()
        .contains("arcane archer with glowing bow"));
}

#[tokio::test]
async fn test_invalid_style_is_rejected() {
    let harness = Harness::with_generator(untouched_generator());
    let (status, body) = harness
        .send("POST", "/api/generate", Some(json!({ "style": "watercolor" })))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["message"], "Invalid style: watercolor");
}

#[tokio::test]
async fn test_class_outside_prompt_tables_is_rejected() {
    let harness = Harness::with_generator(untouched_generator());
    let (status, body) = harness
        .send(
            "POST",
            "/api/generate",
            Some(json!({ "style": "pixel", "characterClass": "rogue" })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Invalid character class: rogue");
}

#[tokio::test]
async fn test_malformed_body_is_validation_error() {
    let harness = Harness::with_generator(untouched_generator());
    let (status, body) = harness
        .send("POST", "/api/generate", Some(json!({ "width": "wide" })))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_upstream_failure_is_generation_error() {
    let harness = Harness::with_generator(failing_generator());
    let (status, body) = harness.send("POST", "/api/generate", Some(json!({}))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "GENERATION_ERROR");
    assert_eq!(body["error"]["message"], "Stability AI API Error: 500");
}

#[tokio::test]
async fn test_all_variations_failing_is_generation_error() {
    let harness = Harness::with_generator(failing_generator());
    let (status, body) = harness
        .send(
            "POST",
            "/api/generate",
            Some(json!({ "generateVariations": true })),
        )
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["message"], "Failed to generate any variations");
}

// =============================================================================
// Staged Collection
// =============================================================================

fn collection_body(size: usize) -> Value {
    json!({
        "selection": { "style": "pixel", "characterClass": "warrior", "attributes": { "race": "dwarf" } },
        "size": size
    })
}

#[tokio::test]
async fn test_collection_size_is_validated() {
    let harness = Harness::with_generator(untouched_generator());
    for size in [0, 101] {
        let (status, body) = harness
            .send("POST", "/api/collection", Some(collection_body(size)))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }
}

#[tokio::test]
async fn test_collection_lifecycle() {
    let harness = Harness::with_generator(generator_ok());

    let (status, body) = harness.send("GET", "/api/collection", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["collection"].is_null());

    let (status, body) = harness
        .send("POST", "/api/collection", Some(collection_body(2)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["collection"]["characters"].as_array().unwrap().len(), 2);
    assert_eq!(body["collection"]["status"], "preparing");
    assert!(body["stats"]["totalPower"].as_i64().unwrap() > 0);

    let (_, body) = harness.send("GET", "/api/collection", None).await;
    assert_eq!(body["collection"]["characters"][1]["id"], "char-2");

    let (status, body) = harness.send("DELETE", "/api/collection", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (_, body) = harness.send("GET", "/api/collection", None).await;
    assert!(body["collection"].is_null());
}

#[tokio::test]
async fn test_mint_without_staged_collection() {
    let harness = Harness::with_generator(untouched_generator());
    let (status, body) = harness.send("POST", "/api/collection/mint", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_mint_staged_collection() {
    let mut contract = MockCollectionContract::new();
    contract
        .expect_address()
        .returning(|| CONTRACT_ADDRESS.to_string());
    contract
        .expect_set_base_uri()
        .times(1)
        .returning(|_| Ok("0xbase".to_string()));
    contract.expect_mint().times(1).returning(|_| {
        Ok(MintReceipt {
            transaction_hash: "0xmint".to_string(),
            first_token_id: 1,
        })
    });
    let harness = Harness::new(generator_ok(), pinning_ok(), contract);

    harness
        .send("POST", "/api/collection", Some(collection_body(2)))
        .await;
    let (status, body) = harness.send("POST", "/api/collection/mint", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["mint"]["tokenIds"], json!(["1", "2"]));
    assert_eq!(
        body["mint"]["openSeaLink"],
        "https://testnets.opensea.io/assets/base-sepolia/0xC0FFEE/1"
    );
    let progress = body["progress"].as_array().unwrap();
    assert_eq!(progress.last().unwrap()["status"], "success");

    let (_, body) = harness.send("GET", "/api/collection", None).await;
    assert!(body["collection"].is_null());
}

#[tokio::test]
async fn test_failed_mint_keeps_collection_staged() {
    let mut pinning = MockPinningService::new();
    pinning.expect_pin_file().returning(|_, _, _| {
        Err(crate::core::collection::PinningError::Upstream {
            status: 401,
            message: "bad key".to_string(),
        })
    });
    let mut contract = MockCollectionContract::new();
    contract.expect_mint().times(0);
    let harness = Harness::new(generator_ok(), pinning, contract);

    harness
        .send("POST", "/api/collection", Some(collection_body(1)))
        .await;
    let (status, body) = harness.send("POST", "/api/collection/mint", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert!(body["mint"]["error"]
        .as_str()
        .unwrap()
        .starts_with("Failed to upload image for character 1"));

    let (_, body) = harness.send("GET", "/api/collection", None).await;
    assert_eq!(body["collection"]["status"], "failed");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_collection_reads_do_not_wait_for_generation() {
    let harness = Harness::build(
        Arc::new(SlowGenerator {
            delay: Duration::from_millis(300),
        }),
        MockPinningService::new(),
        MockCollectionContract::new(),
    );

    let state = harness.state.clone();
    let create = tokio::spawn(async move {
        send(state, "POST", "/api/collection", Some(collection_body(4))).await
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let (status, body) = tokio::time::timeout(
        Duration::from_millis(500),
        harness.send("GET", "/api/collection", None),
    )
    .await
    .expect("GET waited on collection generation");
    assert_eq!(status, StatusCode::OK);
    assert!(body["collection"].is_null());

    let (status, _) = tokio::time::timeout(
        Duration::from_millis(500),
        harness.send("DELETE", "/api/collection", None),
    )
    .await
    .expect("DELETE waited on collection generation");
    assert_eq!(status, StatusCode::OK);

    let (status, body) = harness
        .send("POST", "/api/collection", Some(collection_body(1)))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    let (status, body) = harness.send("POST", "/api/collection/mint", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);

    let (status, body) = create.await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["collection"]["characters"].as_array().unwrap().len(), 4);

    let (_, body) = harness.send("GET", "/api/collection", None).await;
    assert_eq!(body["collection"]["characters"].as_array().unwrap().len(), 4);
}
