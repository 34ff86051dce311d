//! API integration tests against a running server
//!
//! Start the server, then run with: cargo test --test api_tests -- --ignored
//! `JWT_SECRET` and `LENDING_TEST_LIBRARIAN` must match the server's
//! configuration.

use std::env;

use lending_server::models::user::UserClaims;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

fn secret() -> String {
    env::var("JWT_SECRET").unwrap_or_else(|_| "change-this-secret-in-production".to_string())
}

fn librarian_token() -> String {
    let uid = env::var("LENDING_TEST_LIBRARIAN").unwrap_or_else(|_| "librarian-1".to_string());
    UserClaims::new(uid, 600).create_token(&secret()).expect("Failed to sign token")
}

fn reader_token(uid: &str) -> String {
    UserClaims::new(uid, 600).create_token(&secret()).expect("Failed to sign token")
}

/// Fresh ISBN-13 so reruns do not collide
fn unique_isbn() -> String {
    let suffix = chrono::Utc::now().timestamp_micros() % 10_000_000_000;
    format!("978{:010}", suffix)
}

async fn create_book(client: &Client, isbn: &str, units: u32) {
    let response = client
        .post(format!("{}/book", BASE_URL))
        .bearer_auth(librarian_token())
        .json(&json!({
            "isbn": isbn,
            "title": "Integration Test Book",
            "author": "Test Author",
            "totalUnits": units
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);
}

async fn delete_book(client: &Client, isbn: &str) {
    client
        .delete(format!("{}/book/{}", BASE_URL, isbn))
        .bearer_auth(librarian_token())
        .send()
        .await
        .expect("Failed to send request");
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_readiness_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/ready", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore]
async fn test_list_books_is_public() {
    let client = Client::new();

    let response = client
        .get(format!("{}/books", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body.is_array());
}

#[tokio::test]
#[ignore]
async fn test_checkout_without_token() {
    let client = Client::new();

    let response = client
        .post(format!("{}/checkout/{}", BASE_URL, unique_isbn()))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn test_checkout_return_cycle() {
    let client = Client::new();
    let isbn = unique_isbn();
    create_book(&client, &isbn, 1).await;

    let response = client
        .post(format!("{}/checkout/{}", BASE_URL, isbn))
        .bearer_auth(reader_token("it-reader-1"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["inventory"], 0);

    let response = client
        .post(format!("{}/checkout/{}", BASE_URL, isbn))
        .bearer_auth(reader_token("it-reader-2"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = client
        .post(format!("{}/return/{}", BASE_URL, isbn))
        .bearer_auth(reader_token("it-reader-1"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["inventory"], 1);

    delete_book(&client, &isbn).await;
}

#[tokio::test]
#[ignore]
async fn test_parallel_checkouts_never_oversell() {
    let client = Client::new();
    let isbn = unique_isbn();
    create_book(&client, &isbn, 3).await;

    let requests = (0..10).map(|i| {
        let client = client.clone();
        let url = format!("{}/checkout/{}", BASE_URL, isbn);
        async move {
            client
                .post(url)
                .bearer_auth(reader_token(&format!("it-parallel-{}", i)))
                .send()
                .await
                .expect("Failed to send request")
                .status()
        }
    });
    let handles: Vec<_> = requests.map(tokio::spawn).collect();

    let mut succeeded = 0;
    for handle in handles {
        if handle.await.expect("task panicked") == StatusCode::OK {
            succeeded += 1;
        }
    }
    assert_eq!(succeeded, 3);

    let body: Value = client
        .get(format!("{}/book/{}", BASE_URL, isbn))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(body["inventory"], 0);

    delete_book(&client, &isbn).await;
}
