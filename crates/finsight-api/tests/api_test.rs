//! HTTP surface tests: envelope shape, validation, and the upload→job flow,
//! all over the mock inference backend and the in-memory vector index.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::util::ServiceExt;

use finsight_api::{app, AppState};
use finsight_inference::{EmbeddingService, MockBackend};
use finsight_ingest::{ConceptExtractor, DocumentProcessor};
use finsight_knowledge::{AnalysisEngine, InMemoryVectorIndex, KnowledgeService};

fn test_state(generation_reply: &str) -> AppState {
    let backend = MockBackend::new().with_fixed_response(generation_reply);
    let embedder = Arc::new(
        EmbeddingService::new(Arc::new(backend.clone()))
            .with_delays(Duration::ZERO, Duration::ZERO)
            .with_target_dimensions(64),
    );
    let index = Arc::new(InMemoryVectorIndex::new());
    let processor = Arc::new(DocumentProcessor::new(
        Arc::new(ConceptExtractor::new()),
        embedder.clone(),
    ));
    let knowledge = Arc::new(KnowledgeService::new(index, embedder.clone()));
    let analysis = Arc::new(AnalysisEngine::new(knowledge.clone(), Arc::new(backend)));
    AppState::new(processor, knowledge, analysis, embedder)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_envelope() {
    let router = app(test_state("{}"));
    let response = router
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["status"], "ok");
    assert!(json["timestamp"].is_string());
}

#[tokio::test]
async fn test_frameworks_endpoint() {
    let router = app(test_state("{}"));
    let response = router
        .oneshot(
            Request::get("/frameworks/STOCK?sector=Technology")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let frameworks = json["data"].as_array().unwrap();
    assert!(!frameworks.is_empty());
    let names: Vec<&str> = frameworks
        .iter()
        .map(|f| f["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"Discounted Cash Flow"));
    assert!(frameworks[0]["applicability"]
        .as_array()
        .unwrap()
        .iter()
        .any(|a| a.as_str().unwrap().contains("Technology")));
}

#[tokio::test]
async fn test_frameworks_unknown_type_is_400() {
    let router = app(test_state("{}"));
    let response = router
        .oneshot(Request::get("/frameworks/TULIP").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert!(json["error"].as_str().unwrap().contains("TULIP"));
}

#[tokio::test]
async fn test_knowledge_search_returns_envelope() {
    let router = app(test_state("{}"));
    let response = router
        .oneshot(
            Request::post("/knowledge/search")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    r#"{"analysis_type": "FUNDAMENTAL_ANALYSIS", "symbol": "NVDA"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert!(json["data"].is_array());
}

#[tokio::test]
async fn test_knowledge_search_invalid_min_score_is_400() {
    let router = app(test_state("{}"));
    let response = router
        .oneshot(
            Request::post("/knowledge/search")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    r#"{"analysis_type": "FUNDAMENTAL_ANALYSIS", "min_score": 3.0}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_enhanced_analysis_endpoint() {
    let reply = r#"{"summary": "Solid growth at a premium multiple.",
                    "recommendation": "BUY", "confidence": 0.7,
                    "key_insights": [], "risks": []}"#;
    let router = app(test_state(reply));

    let context = r#"{
        "symbol": "NVDA",
        "instrument_type": "STOCK",
        "analysis_type": "FUNDAMENTAL_ANALYSIS",
        "market": {
            "symbol": "NVDA", "price": 128.4, "change": 2.1,
            "change_percent": 1.7, "volume": 31000000, "market_cap": null
        },
        "fundamentals": { "pe_ratio": 62.5 }
    }"#;

    let response = router
        .oneshot(
            Request::post("/analysis/enhanced")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(context))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["recommendation"], "BUY");
    assert_eq!(json["data"]["degraded"], false);
}

#[tokio::test]
async fn test_enhanced_analysis_degrades_gracefully() {
    let router = app(test_state("no json to be found here"));

    let context = r#"{
        "symbol": "NVDA",
        "instrument_type": "STOCK",
        "analysis_type": "FUNDAMENTAL_ANALYSIS",
        "market": {
            "symbol": "NVDA", "price": 128.4, "change": 2.1,
            "change_percent": 1.7, "volume": 31000000, "market_cap": null
        },
        "fundamentals": {}
    }"#;

    let response = router
        .oneshot(
            Request::post("/analysis/enhanced")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(context))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["recommendation"], "HOLD");
    assert_eq!(json["data"]["degraded"], true);
    assert!(!json["data"]["summary"].as_str().unwrap().is_empty());
}

fn multipart_body(boundary: &str, with_title: bool) -> String {
    let content = "The discounted cash flow model discounts free cash flow at the \
                   weighted average cost of capital. "
        .repeat(10);
    let mut body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"doc.txt\"\r\n\
         Content-Type: text/plain\r\n\r\n{content}\r\n",
        b = boundary,
        content = content
    );
    if with_title {
        body.push_str(&format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"title\"\r\n\r\n\
             Equity Valuation Methods 2023\r\n",
            b = boundary
        ));
    }
    body.push_str(&format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"source\"\r\n\r\nCFA_INSTITUTE\r\n--{b}--\r\n",
        b = boundary
    ));
    body
}

#[tokio::test]
async fn test_upload_then_job_lookup() {
    let state = test_state("{}");
    let router = app(state);
    let boundary = "finsight-test-boundary";

    let response = router
        .clone()
        .oneshot(
            Request::post("/documents/upload")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={}", boundary),
                )
                .body(Body::from(multipart_body(boundary, true)))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["status"], "COMPLETED");
    assert!(json["data"]["stats"]["chunk_count"].as_u64().unwrap() >= 1);

    let job_id = json["data"]["id"].as_str().unwrap().to_string();
    let lookup = router
        .oneshot(
            Request::get(format!("/documents/jobs/{}", job_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(lookup.status(), StatusCode::OK);
    let json = body_json(lookup).await;
    assert_eq!(json["data"]["id"], job_id.as_str());
}

#[tokio::test]
async fn test_upload_without_title_is_400() {
    let router = app(test_state("{}"));
    let boundary = "finsight-test-boundary";

    let response = router
        .oneshot(
            Request::post("/documents/upload")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={}", boundary),
                )
                .body(Body::from(multipart_body(boundary, false)))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert!(json["error"].as_str().unwrap().contains("title"));
}

#[tokio::test]
async fn test_unknown_job_is_404() {
    let router = app(test_state("{}"));
    let response = router
        .oneshot(
            Request::get("/documents/jobs/00000000-0000-0000-0000-000000000000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
