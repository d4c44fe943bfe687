//! Failure tests for the fetcher and configuration validation
//!
//! These tests verify that:
//! - The fetch retry budget is exactly two attempts with recovery in between
//! - Malformed API responses are fetch failures, not panics
//! - Missing configuration is rejected before any network or file access

use assert_matches::assert_matches;
use follower_tracker::config::{Config, ConfigError};
use follower_tracker::fetcher::FetchError;
use tempfile::tempdir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::*;

#[tokio::test]
async fn test_fetch_recovers_after_one_failed_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/2/users/by/username/{USERNAME}")))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_follower_count(&server, 1234).await;

    let count = test_fetcher(&server).fetch().await.unwrap();
    assert_eq!(count, 1234);
}

#[tokio::test]
async fn test_fetch_gives_up_after_two_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/2/users/by/username/{USERNAME}")))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let result = test_fetcher(&server).fetch().await;
    assert_matches!(result, Err(FetchError::Api { status: 500, .. }));
}

#[tokio::test]
async fn test_fetch_rejects_invalid_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/2/users/by/username/{USERNAME}")))
        .respond_with(ResponseTemplate::new(200).set_body_string("{invalid json"))
        .mount(&server)
        .await;

    let result = test_fetcher(&server).fetch().await;
    assert_matches!(result, Err(FetchError::MalformedBody(_)));
}

#[tokio::test]
async fn test_fetch_rejects_body_without_metric_field() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/2/users/by/username/{USERNAME}")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "data": { "id": "12345" } })),
        )
        .mount(&server)
        .await;

    let result = test_fetcher(&server).fetch().await;
    assert_matches!(result, Err(FetchError::MalformedBody(_)));
}

#[tokio::test]
async fn test_fetch_reports_transport_failures() {
    // Nothing listens here; the request never produces a response.
    let fetcher = follower_tracker::fetcher::FollowerFetcher::new("test-token", USERNAME)
        .with_api_base("http://127.0.0.1:9")
        .with_retry_delay(std::time::Duration::ZERO);

    let result = fetcher.fetch().await;
    assert_matches!(result, Err(FetchError::Transport(_)));
}

#[test]
fn test_missing_backend_parameters_are_a_config_error() {
    let error = Config::from_vars(|name| match name {
        "X_BEARER_TOKEN" => Some("token".to_string()),
        "X_USERNAME" => Some("someone".to_string()),
        "STORAGE_TYPE" => Some("notion".to_string()),
        _ => None,
    })
    .unwrap_err();

    assert_eq!(
        error,
        ConfigError::Missing(vec!["NOTION_TOKEN", "NOTION_DATABASE_ID"])
    );
}

#[test]
fn test_config_resolution_performs_no_io() {
    let dir = tempdir().unwrap();
    let log_path = dir.path().join("followers.csv");
    let log_path_var = log_path.to_string_lossy().to_string();

    let config = Config::from_vars(|name| match name {
        "X_BEARER_TOKEN" => Some("token".to_string()),
        "X_USERNAME" => Some("someone".to_string()),
        "CSV_FILE_PATH" => Some(log_path_var.clone()),
        _ => None,
    })
    .unwrap();

    // Resolving configuration must not touch the storage target.
    assert!(!log_path.exists());
    drop(config);
}
