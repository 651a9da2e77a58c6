// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! End-to-end ingestion→retrieval test over the real HTTP router and a
//! real (in-memory) SQLite database, exercising the staged protocol
//! from `spec.md` §4.1/§4.2/§6 the way a vendor ERP client would.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use normalizer::infrastructure::adapters::{HttpCompletion, LmClientConfig};
use normalizer::infrastructure::repositories::sqlite::{
    initialize_database, SqliteBenchmarkRepository, SqliteCatalogRepository, SqliteCodeTreeRepository, SqliteGroupRepository,
    SqliteNormalizedRecordRepository, SqliteSessionRepository, SqliteUploadRepository,
};
use normalizer::infrastructure::runtime::{LmWorkerPool, NormalizationPipeline, StageExecutor};
use normalizer::infrastructure::services::{
    CachedBenchmarkStore, LearningKeywordClassifier, LmHierarchicalClassifier, RegexNameNormalizer, ScoredDuplicateDetector,
    SnowballStemmer, StandardPhoneticEncoder, StrsimEditDistances, UnicodeTokenizer, WeightedHybridScorer,
};
use normalizer::application::use_cases::{
    DetectDuplicatesUseCase, IngestUploadUseCase, ReclassifyHierarchicalUseCase, RetrieveCatalogUseCase, RunNormalizationUseCase,
};
use normalizer::presentation::http::{router, AppState};
use normalizer_domain::services::duplicate_detector::{DuplicateDetectionConfig, MatchAlgorithm};
use normalizer_domain::services::text_toolkit::HybridWeights;

/// Builds the same dependency graph `normalizer`'s `main.rs` composes
/// for `serve`, against an in-memory database, so the router under
/// test behaves exactly like the real binary.
async fn test_state() -> AppState {
    let pool = initialize_database("sqlite::memory:").await.unwrap();

    let uploads = Arc::new(SqliteUploadRepository::new(pool.clone()));
    let catalogs = Arc::new(SqliteCatalogRepository::new(pool.clone()));
    let code_tree = Arc::new(SqliteCodeTreeRepository::new(pool.clone()));
    let groups = Arc::new(SqliteGroupRepository::new(pool.clone()));
    let records = Arc::new(SqliteNormalizedRecordRepository::new(pool.clone()));
    let sessions = Arc::new(SqliteSessionRepository::new(pool.clone()));
    let benchmarks = Arc::new(SqliteBenchmarkRepository::new(pool.clone()));

    let benchmark_store = Arc::new(CachedBenchmarkStore::new(benchmarks));

    let name_normalizer = Arc::new(RegexNameNormalizer::new());
    let tokenizer = Arc::new(UnicodeTokenizer::new());
    let stemmer = Arc::new(SnowballStemmer::russian());
    let scorer = Arc::new(WeightedHybridScorer::new());
    let phonetics = Arc::new(StandardPhoneticEncoder::new());
    let _edit_distances = StrsimEditDistances::new();

    let completion = Arc::new(HttpCompletion::new(LmClientConfig::default()).unwrap());
    let keyword_classifier = Arc::new(LearningKeywordClassifier::new());
    let hierarchical_classifier = Arc::new(LmHierarchicalClassifier::new(code_tree, completion.clone(), keyword_classifier.clone()));

    let duplicate_detector = Arc::new(ScoredDuplicateDetector::new(records.clone(), catalogs.clone(), scorer.clone(), phonetics));

    let lm_pool = Arc::new(LmWorkerPool::new(1));
    let stage_executor = Arc::new(StageExecutor::new(
        name_normalizer.clone(),
        keyword_classifier,
        hierarchical_classifier.clone(),
        completion,
        benchmark_store,
        lm_pool,
    ));
    let pipeline = Arc::new(NormalizationPipeline::new(
        records.clone(),
        catalogs.clone(),
        groups.clone(),
        name_normalizer,
        tokenizer,
        stemmer,
        scorer,
        stage_executor,
    ));

    AppState {
        ingest: Arc::new(IngestUploadUseCase::new(uploads.clone(), catalogs.clone())),
        retrieve: Arc::new(RetrieveCatalogUseCase::new(uploads, catalogs.clone())),
        run_normalization: Arc::new(RunNormalizationUseCase::new(sessions, pipeline)),
        reclassify: Arc::new(ReclassifyHierarchicalUseCase::new(records.clone(), hierarchical_classifier)),
        detect_duplicates: Arc::new(DetectDuplicatesUseCase::new(records, catalogs, groups, duplicate_detector)),
        default_duplicate_config: DuplicateDetectionConfig {
            algorithms: vec![
                MatchAlgorithm::ExactByCode,
                MatchAlgorithm::ExactByName,
                MatchAlgorithm::Fuzzy,
                MatchAlgorithm::Phonetic,
                MatchAlgorithm::Semantic,
            ],
            threshold: 0.85,
            merge_overlapping: true,
            max_items: 5000,
            weights: HybridWeights::default(),
        },
        default_reclassify_min_confidence: 0.7,
    }
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn full_ingestion_protocol_then_retrieval_round_trip() {
    let app = router(test_state().await);

    let handshake = app
        .clone()
        .oneshot(
            Request::post("/handshake")
                .header("content-type", "application/json")
                .body(Body::from(json!({"source_version": "erp-3.2", "config_name": "default"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(handshake.status(), StatusCode::OK);
    let handshake_body = body_json(handshake).await;
    let upload_id = handshake_body["upload_id"].as_str().unwrap().to_string();
    assert_eq!(handshake_body["status"], "in_progress");

    let start_catalog = app
        .clone()
        .oneshot(
            Request::post("/catalog/meta")
                .header("content-type", "application/json")
                .body(Body::from(json!({"upload_id": upload_id, "name": "fasteners"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(start_catalog.status(), StatusCode::OK);

    let submit_item = app
        .clone()
        .oneshot(
            Request::post("/catalog/item")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({
                        "upload_id": upload_id,
                        "catalog_name": "fasteners",
                        "reference": "ref-001",
                        "code": null,
                        "name": "M6 hex bolt, 40mm, zinc-plated",
                        "attributes": "<attrs/>",
                        "table_parts": "<parts/>",
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(submit_item.status(), StatusCode::OK);

    let complete = app
        .clone()
        .oneshot(
            Request::post("/complete")
                .header("content-type", "application/json")
                .body(Body::from(json!({"upload_id": upload_id}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(complete.status(), StatusCode::OK);
    let completed_body = body_json(complete).await;
    assert_eq!(completed_body["status"], "completed");
    assert_eq!(completed_body["items_count"], 1);

    let list = app.clone().oneshot(Request::get("/api/uploads").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(list.status(), StatusCode::OK);
    let uploads = body_json(list).await;
    assert_eq!(uploads.as_array().unwrap().len(), 1);

    let fetched = app
        .oneshot(Request::get(format!("/api/uploads/{upload_id}")).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(fetched.status(), StatusCode::OK);
}

#[tokio::test]
async fn submitting_against_an_unknown_upload_returns_not_found() {
    let app = router(test_state().await);

    let response = app
        .oneshot(
            Request::post("/catalog/meta")
                .header("content-type", "application/json")
                .body(Body::from(json!({"upload_id": "01ARZ3NDEKTSV4RRFFQ69G5FAV", "name": "cat"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn completing_a_finalized_upload_twice_fails() {
    let app = router(test_state().await);

    let handshake = app
        .clone()
        .oneshot(
            Request::post("/handshake")
                .header("content-type", "application/json")
                .body(Body::from(json!({"source_version": "erp-3.2", "config_name": "default"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let upload_id = body_json(handshake).await["upload_id"].as_str().unwrap().to_string();

    let first = app
        .clone()
        .oneshot(
            Request::post("/complete")
                .header("content-type", "application/json")
                .body(Body::from(json!({"upload_id": upload_id}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .oneshot(
            Request::post("/complete")
                .header("content-type", "application/json")
                .body(Body::from(json!({"upload_id": upload_id}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::BAD_REQUEST);
}
