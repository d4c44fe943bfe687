//! Helper functions for integration tests

use std::time::Duration;

use follower_tracker::fetcher::FollowerFetcher;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const USERNAME: &str = "someone";

pub fn user_lookup_json(followers_count: u64) -> serde_json::Value {
    json!({
        "data": {
            "id": "12345",
            "name": "Someone",
            "username": USERNAME,
            "public_metrics": {
                "followers_count": followers_count,
                "following_count": 321,
                "tweet_count": 1000,
                "listed_count": 5
            }
        }
    })
}

pub async fn mount_follower_count(server: &MockServer, followers_count: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/2/users/by/username/{USERNAME}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_lookup_json(followers_count)))
        .mount(server)
        .await;
}

/// Mount a lookup response that only answers once
///
/// Lets a test stage different counts (or failures) for consecutive calls:
/// once the mock is exhausted, the next mounted mock takes over.
pub async fn mount_follower_count_once(server: &MockServer, followers_count: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/2/users/by/username/{USERNAME}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_lookup_json(followers_count)))
        .up_to_n_times(1)
        .mount(server)
        .await;
}

pub fn test_fetcher(server: &MockServer) -> FollowerFetcher {
    FollowerFetcher::new("test-token", USERNAME)
        .with_api_base(server.uri())
        .with_retry_delay(Duration::ZERO)
}
