//! Minting Pipeline Unit Tests
//!
//! Tests for the upload-then-mint state machine including:
//! - Full run: pinned content attached, base URI, contiguous token ids
//! - Progress sequence reported to the sink
//! - Upload failure aborts before any contract call
//! - Contract rejection after a complete upload
//! - Remote image resolution and retry

use std::sync::{Arc, Mutex};

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::core::collection::contract::MockCollectionContract;
use crate::core::collection::pinning::MockPinningService;
use crate::core::collection::{
    CollectionStatus, ContractError, MintProgress, MintReceipt, MintStatus, MintingPipeline,
    PinningError,
};
use crate::tests::common::*;

fn contract_ok(quantity: usize, first_token_id: u64) -> MockCollectionContract {
    let mut contract = MockCollectionContract::new();
    contract
        .expect_address()
        .returning(|| CONTRACT_ADDRESS.to_string());
    contract
        .expect_set_base_uri()
        .withf(|uri| uri.to_string() == "ipfs://QmMeta1/")
        .times(1)
        .returning(|_| Ok("0xbase".to_string()));
    contract
        .expect_mint()
        .withf(move |q| *q == quantity)
        .times(1)
        .returning(move |_| {
            Ok(MintReceipt {
                transaction_hash: "0xmint".to_string(),
                first_token_id,
            })
        });
    contract
}

fn contract_untouched() -> MockCollectionContract {
    let mut contract = MockCollectionContract::new();
    contract
        .expect_address()
        .returning(|| CONTRACT_ADDRESS.to_string());
    contract.expect_set_base_uri().times(0);
    contract.expect_mint().times(0);
    contract
}

type Recorded = Arc<Mutex<Vec<MintProgress>>>;

fn pipeline(pinning: MockPinningService, contract: MockCollectionContract) -> (MintingPipeline, Recorded) {
    let events: Recorded = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let pipeline = MintingPipeline::new(Arc::new(pinning), Arc::new(contract), MARKETPLACE)
        .with_progress_sink(Arc::new(move |p: &MintProgress| {
            sink.lock().unwrap().push(p.clone())
        }));
    (pipeline, events)
}

// =============================================================================
// Success
// =============================================================================

#[tokio::test]
async fn test_full_run_mints_collection() {
    let mut collection = collection(3);
    let (mut pipeline, events) = pipeline(pinning_ok(), contract_ok(3, 7));

    let outcome = pipeline.process_collection(&mut collection).await;

    assert!(outcome.success, "{:?}", outcome.error);
    assert_eq!(outcome.transaction_hash.as_deref(), Some("0xmint"));
    assert_eq!(
        outcome.token_ids,
        Some(vec!["7".to_string(), "8".to_string(), "9".to_string()])
    );
    assert_eq!(
        outcome.open_sea_link.as_deref(),
        Some("https://testnets.opensea.io/assets/base-sepolia/0xC0FFEE/7")
    );
    assert_eq!(collection.status, CollectionStatus::Minted);

    for (i, staged) in collection.characters.iter().enumerate() {
        let uploaded = staged.ipfs.as_ref().unwrap();
        assert_eq!(uploaded.image_hash, format!("QmImage-character-{}.png", i + 1));
        assert_eq!(uploaded.metadata_hash, format!("QmMeta{}", i + 1));
        assert_eq!(uploaded.metadata, format!("{}/ipfs/QmMeta{}", GATEWAY, i + 1));
    }

    let events = events.lock().unwrap();
    let statuses: Vec<MintStatus> = events.iter().map(|p| p.status).collect();
    assert_eq!(
        statuses,
        vec![
            MintStatus::Uploading,
            MintStatus::Uploading,
            MintStatus::Uploading,
            MintStatus::Minting,
            MintStatus::Success,
        ]
    );
    assert_eq!(events[0].progress, 0.0);
    assert_eq!(events[1].current_step, "Uploading character 2 of 3");
    assert!(events[2].progress < 50.0);
    assert_eq!(events[3].progress, 75.0);
    assert_eq!(events[4].progress, 100.0);
    assert_eq!(pipeline.progress().status, MintStatus::Success);
}

#[tokio::test]
async fn test_metadata_points_at_pinned_image() {
    let mut pinning = MockPinningService::new();
    pinning
        .expect_pin_file()
        .withf(|name, bytes, mime| {
            name.ends_with("character-1.png") && bytes.as_slice() == PNG_BYTES && mime.starts_with("image/png")
        })
        .times(1)
        .returning(|_, _, _| Ok(pinned("QmImage")));
    pinning
        .expect_pin_json()
        .withf(|doc| {
            doc["image"] == format!("{}/ipfs/QmImage", GATEWAY)
                && doc["name"] == "Character #1"
                && doc["attributes"][0]["value"] == "warrior"
        })
        .times(1)
        .returning(|_| Ok(pinned("QmMeta1")));

    let mut collection = collection(1);
    let (mut pipeline, _) = pipeline(pinning, contract_ok(1, 1));
    assert!(pipeline.process_collection(&mut collection).await.success);
}

// =============================================================================
// Failure
// =============================================================================

#[tokio::test]
async fn test_second_upload_failure_aborts_before_mint() {
    let mut pinning = MockPinningService::new();
    pinning.expect_pin_file().times(2).returning(|name, _, _| {
        if name.ends_with("character-2.png") {
            Err(PinningError::Upstream {
                status: 500,
                message: "pinning unavailable".to_string(),
            })
        } else {
            Ok(pinned(format!("QmImage-{}", name)))
        }
    });
    pinning
        .expect_pin_json()
        .times(1)
        .returning(|_| Ok(pinned("QmMeta1")));

    let mut collection = collection(3);
    let (mut pipeline, events) = pipeline(pinning, contract_untouched());

    let outcome = pipeline.process_collection(&mut collection).await;

    assert!(!outcome.success);
    assert!(outcome.token_ids.is_none());
    let error = outcome.error.unwrap();
    assert!(error.starts_with("Failed to upload image for character 2"), "{}", error);

    assert_eq!(collection.status, CollectionStatus::Failed);
    assert!(collection.characters.iter().all(|c| c.ipfs.is_none()));

    let last = events.lock().unwrap().last().cloned().unwrap();
    assert_eq!(last.status, MintStatus::Failed);
    assert_eq!(last.progress, 0.0);
    assert_eq!(last.error.as_deref(), Some(error.as_str()));
}

#[tokio::test]
async fn test_empty_collection_fails_without_calls() {
    let mut pinning = MockPinningService::new();
    pinning.expect_pin_file().times(0);
    pinning.expect_pin_json().times(0);

    let mut collection = collection(0);
    let (mut pipeline, _) = pipeline(pinning, contract_untouched());

    let outcome = pipeline.process_collection(&mut collection).await;
    assert_eq!(outcome.error.as_deref(), Some("Collection is empty"));
    assert_eq!(pipeline.progress().status, MintStatus::Failed);
}

#[tokio::test]
async fn test_contract_rejection_reports_failure() {
    let mut contract = MockCollectionContract::new();
    contract
        .expect_address()
        .returning(|| CONTRACT_ADDRESS.to_string());
    contract
        .expect_set_base_uri()
        .returning(|_| Ok("0xbase".to_string()));
    contract
        .expect_mint()
        .returning(|_| Err(ContractError::Rejected("insufficient funds".to_string())));

    let mut collection = collection(2);
    let (mut pipeline, events) = pipeline(pinning_ok(), contract);

    let outcome = pipeline.process_collection(&mut collection).await;

    assert!(!outcome.success);
    assert_eq!(outcome.error.as_deref(), Some("insufficient funds"));
    assert_eq!(collection.status, CollectionStatus::Failed);
    // Uploads finished before the mint call, so the pinned content stays attached.
    assert!(collection.characters.iter().all(|c| c.ipfs.is_some()));

    let events = events.lock().unwrap();
    assert_eq!(events[events.len() - 2].status, MintStatus::Minting);
    assert_eq!(events[events.len() - 1].status, MintStatus::Failed);
}

#[tokio::test]
async fn test_token_range_overflow_fails_mint() {
    let mut collection = collection(2);
    let (mut pipeline, events) = pipeline(pinning_ok(), contract_ok(2, u64::MAX));

    let outcome = pipeline.process_collection(&mut collection).await;

    assert!(!outcome.success);
    assert!(outcome.token_ids.is_none());
    let error = outcome.error.unwrap();
    assert!(error.starts_with("Invalid relay response"), "{}", error);
    assert_eq!(collection.status, CollectionStatus::Failed);
    assert_eq!(events.lock().unwrap().last().unwrap().status, MintStatus::Failed);
}

#[tokio::test]
async fn test_retry_resets_progress() {
    let mut collection = collection(0);
    let (mut pipeline, events) = pipeline(MockPinningService::new(), contract_untouched());

    pipeline.process_collection(&mut collection).await;
    assert_eq!(pipeline.progress().status, MintStatus::Failed);

    pipeline.retry();
    assert_eq!(pipeline.progress(), &MintProgress::pending());
    assert_eq!(events.lock().unwrap().last(), Some(&MintProgress::pending()));
}

// =============================================================================
// Image Resolution
// =============================================================================

#[tokio::test]
async fn test_remote_image_is_fetched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/portrait"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/jpeg")
                .set_body_bytes(b"jpeg-bytes".to_vec()),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut pinning = MockPinningService::new();
    pinning
        .expect_pin_file()
        .withf(|name, bytes, mime| {
            name.ends_with("character-1.jpg") && bytes.as_slice() == b"jpeg-bytes" && mime.starts_with("image/jpeg")
        })
        .times(1)
        .returning(|_, _, _| Ok(pinned("QmImage")));
    pinning
        .expect_pin_json()
        .returning(|_| Ok(pinned("QmMeta1")));

    let mut collection = collection(1);
    collection.characters[0].character.image = format!("{}/portrait", server.uri());
    let (mut pipeline, _) = pipeline(pinning, contract_ok(1, 1));

    assert!(pipeline.process_collection(&mut collection).await.success);
}

#[tokio::test]
async fn test_unsupported_image_reference_fails() {
    let mut pinning = MockPinningService::new();
    pinning.expect_pin_file().times(0);

    let mut collection = collection(1);
    collection.characters[0].character.image = "ftp://example.com/portrait.png".to_string();
    let (mut pipeline, _) = pipeline(pinning, contract_untouched());

    let outcome = pipeline.process_collection(&mut collection).await;
    let error = outcome.error.unwrap();
    assert!(error.starts_with("Failed to load image for character 1"), "{}", error);
}
