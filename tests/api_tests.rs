//! End-to-end tests for the biodata HTTP API

mod common;

use biodata::processor::ProcessingFault;
use biodata::record::Payload;
use common::{TestServer, TestServerBuilder, LANDING_PAGE};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

async fn submit(server: &TestServer, body: Value) -> (StatusCode, Value) {
    let res = server
        .client
        .post(server.url("/submit"))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = res.status();
    (status, res.json().await.unwrap())
}

async fn get_json(server: &TestServer, path: &str) -> (StatusCode, Value) {
    let res = server.client.get(server.url(path)).send().await.unwrap();
    let status = res.status();
    (status, res.json().await.unwrap())
}

async fn record_count(server: &TestServer) -> usize {
    let (status, body) = get_json(server, "/getAll").await;
    assert_eq!(status, StatusCode::OK);
    body.as_array().unwrap().len()
}

#[tokio::test]
async fn test_submit_then_get_all_contains_processed_record() {
    let server = TestServerBuilder::new().start().await.unwrap();

    let (status, body) = submit(
        &server,
        json!({
            "name": "  Alice Smith ",
            "dob": "1995-04-12",
            "eid": "E-100",
            "pid": "P-200",
            "phone": 5551234,
            "github": "alice",
            "linkedin": "alice-smith",
            "leetcode": "alice_lc",
            "leetcodeProblems": "312",
            "languagesKnown": "Rust, Python"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], json!("Data saved successfully!"));
    let id = body["id"].as_str().unwrap().to_string();

    let (status, all) = get_json(&server, "/getAll").await;
    assert_eq!(status, StatusCode::OK);
    let all = all.as_array().unwrap();
    assert_eq!(all.len(), 1);

    let record = &all[0];
    assert_eq!(record["_id"], json!(id));
    assert_eq!(record["name"], json!("Alice Smith"));
    assert_eq!(record["phone"], json!(5551234));
    assert_eq!(record["leetcodeProblems"], json!("312"));
    assert_eq!(record["languagesKnown"], json!("Rust, Python"));
}

#[tokio::test]
async fn test_get_by_id_and_unknown_id() {
    let server = TestServerBuilder::new().start().await.unwrap();
    let (_, body) = submit(&server, json!({ "name": "Bob" })).await;
    let id = body["id"].as_str().unwrap();

    let (status, record) = get_json(&server, &format!("/get/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["name"], json!("Bob"));

    let (status, body) = get_json(&server, "/get/never-issued").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("Record not found"));
}

#[tokio::test]
async fn test_get_by_name_is_case_insensitive() {
    let server = TestServerBuilder::new().start().await.unwrap();
    submit(&server, json!({ "name": "Alice" })).await;
    submit(&server, json!({ "name": "Bob" })).await;

    for query in ["alice", "ALICE", "ali"] {
        let (status, found) = get_json(&server, &format!("/getByName?name={}", query)).await;
        assert_eq!(status, StatusCode::OK);
        let found = found.as_array().unwrap();
        assert_eq!(found.len(), 1, "query {query}");
        assert_eq!(found[0]["name"], json!("Alice"));
    }

    let (_, everyone) = get_json(&server, "/getByName?name=").await;
    assert_eq!(everyone.as_array().unwrap().len(), 2);

    let (_, everyone) = get_json(&server, "/getByName").await;
    assert_eq!(everyone.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_unusable_name_pattern_is_server_error() {
    let server = TestServerBuilder::new().start().await.unwrap();
    submit(&server, json!({ "name": "Bob" })).await;

    let huge = "k".repeat(50_000);
    for query in ["a%28b", huge.as_str()] {
        let (status, body) = get_json(&server, &format!("/getByName?name={}", query)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"]
            .as_str()
            .unwrap()
            .starts_with("Invalid name pattern"));
    }
}

#[tokio::test]
async fn test_partial_update_changes_only_given_fields() {
    let server = TestServerBuilder::new().start().await.unwrap();
    let (_, body) = submit(
        &server,
        json!({ "name": "Carol", "phone": 111, "github": "carol" }),
    )
    .await;
    let id = body["id"].as_str().unwrap();

    let res = server
        .client
        .put(server.url(&format!("/update/{}", id)))
        .json(&json!({ "phone": 555 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated: Value = res.json().await.unwrap();
    assert_eq!(updated["phone"], json!(555));
    assert_eq!(updated["name"], json!("Carol"));
    assert_eq!(updated["github"], json!("carol"));

    let (_, stored) = get_json(&server, &format!("/get/{}", id)).await;
    assert_eq!(stored, updated);
}

#[tokio::test]
async fn test_update_unknown_id_and_bad_value() {
    let server = TestServerBuilder::new().start().await.unwrap();

    let res = server
        .client
        .put(server.url("/update/missing"))
        .json(&json!({ "phone": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let (_, body) = submit(&server, json!({ "name": "Dan", "phone": 42 })).await;
    let id = body["id"].as_str().unwrap();

    let res = server
        .client
        .put(server.url(&format!("/update/{}", id)))
        .json(&json!({ "phone": "not a number" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let (_, stored) = get_json(&server, &format!("/get/{}", id)).await;
    assert_eq!(stored["phone"], json!(42));
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let server = TestServerBuilder::new().start().await.unwrap();
    let (_, body) = submit(&server, json!({ "name": "Erin" })).await;
    let id = body["id"].as_str().unwrap();

    for _ in 0..2 {
        let res = server
            .client
            .delete(server.url(&format!("/delete/{}", id)))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["message"], json!("Data deleted successfully!"));
    }

    let (status, _) = get_json(&server, &format!("/get/{}", id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_processor_fault_creates_no_record() {
    let server = TestServerBuilder::new()
        .with_processor(|_: Payload| -> Result<Payload, ProcessingFault> {
            Err(ProcessingFault::new("rejected"))
        })
        .start()
        .await
        .unwrap();

    let (status, body) = submit(&server, json!({ "name": "Frank" })).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], json!("Failed to process submission"));
    assert_eq!(record_count(&server).await, 0);
}

#[tokio::test]
async fn test_processor_crash_creates_no_record() {
    let server = TestServerBuilder::new()
        .with_processor(|_: Payload| -> Result<Payload, ProcessingFault> {
            panic!("processor crashed")
        })
        .start()
        .await
        .unwrap();

    let (status, body) = submit(&server, json!({ "name": "Grace" })).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].is_string());
    assert_eq!(record_count(&server).await, 0);
}

#[tokio::test]
async fn test_invalid_submissions_are_bad_requests() {
    let server = TestServerBuilder::new().start().await.unwrap();

    let (status, body) = submit(&server, json!({ "name": "Heidi", "phone": "call me" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("phone"));

    let res = server
        .client
        .post(server.url("/submit"))
        .header("content-type", "application/json")
        .body("{ not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert!(body["error"].is_string());

    assert_eq!(record_count(&server).await, 0);
}

#[tokio::test]
async fn test_saturated_pool_returns_service_unavailable() {
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let release_rx = Arc::new(Mutex::new(release_rx));

    let server = TestServerBuilder::new()
        .with_processor(move |p: Payload| -> Result<Payload, ProcessingFault> {
            let _ = release_rx.lock().unwrap().recv();
            Ok(p)
        })
        .with_pool(1, Duration::from_millis(100))
        .start()
        .await
        .unwrap();

    let client = server.client.clone();
    let url = server.url("/submit");
    let first = tokio::spawn(async move {
        client
            .post(url)
            .json(&json!({ "name": "first" }))
            .send()
            .await
            .unwrap()
            .status()
    });

    // Wait until the first submission holds the only processor slot
    let mut saturated = false;
    for _ in 0..100 {
        let (status, health) = get_json(&server, "/health").await;
        assert_eq!(status, StatusCode::OK);
        if health["processorsInFlight"] == json!(1) {
            saturated = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(saturated, "first submission never started processing");

    let (status, _) = submit(&server, json!({ "name": "second" })).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    release_tx.send(()).unwrap();
    assert_eq!(first.await.unwrap(), StatusCode::OK);
    assert_eq!(record_count(&server).await, 1);
}

#[tokio::test]
async fn test_concurrent_submissions_stay_isolated() {
    let server = TestServerBuilder::new().start().await.unwrap();

    let submissions: Vec<_> = (0..20)
        .map(|i| {
            let client = server.client.clone();
            let url = server.url("/submit");
            tokio::spawn(async move {
                let res = client
                    .post(url)
                    .json(&json!({ "name": format!("user-{i}"), "phone": i, "eid": format!("E{i}") }))
                    .send()
                    .await
                    .unwrap();
                assert_eq!(res.status(), StatusCode::OK);
            })
        })
        .collect();

    for handle in submissions {
        handle.await.unwrap();
    }

    let (_, all) = get_json(&server, "/getAll").await;
    let all = all.as_array().unwrap();
    assert_eq!(all.len(), 20);

    for record in all {
        let name = record["name"].as_str().unwrap();
        let i: i64 = name.trim_start_matches("user-").parse().unwrap();
        assert_eq!(record["phone"], json!(i));
        assert_eq!(record["eid"], json!(format!("E{i}")));
    }
}

#[tokio::test]
async fn test_landing_page_and_health() {
    let server = TestServerBuilder::new().start().await.unwrap();

    let res = server.client.get(server.url("/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), LANDING_PAGE);

    let (status, health) = get_json(&server, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], json!("ok"));
    assert_eq!(health["backend"], json!("memory"));
}

#[tokio::test]
async fn test_store_is_shared_with_handlers() {
    let server = TestServerBuilder::new().start().await.unwrap();
    submit(&server, json!({ "name": "Ivan" })).await;

    let stored = server.store.find_all().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].fields.name.as_deref(), Some("Ivan"));
}
