//! Thumbnail integration tests against a mock imgproxy.
//!
//! Tests verify:
//! - The upstream path follows the processing template and is signed over salt + path
//! - Successful imgproxy responses pass through with their headers and body
//! - Non-200 responses and unreachable upstreams become 400 JSON errors

use std::time::Duration;

use axum::http::{header, StatusCode};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use http_body_util::BodyExt;

use imgproxy_gateway::hmac_sha256;

use super::test_utils::{
    body_bytes, body_json, send, test_config, test_router, MockBehavior, MockImgproxy,
    MOCK_REQUEST_ID, TEST_KEY, TEST_PREFIX, TEST_SALT,
};

fn expected_signature(path: &str) -> String {
    let digest = hmac_sha256(TEST_KEY, format!("{}{}", TEST_SALT, path)).unwrap();
    URL_SAFE_NO_PAD.encode(digest)
}

// =============================================================================
// Signed Requests
// =============================================================================

#[tokio::test]
async fn test_thumbnail_request_is_signed() {
    let imgproxy = MockImgproxy::start(MockBehavior::Image(b"webp-bytes".to_vec())).await;
    let router = test_router(test_config(&imgproxy.base_url));

    let response = send(router, "GET", "/abc.jpg?width=640").await;
    assert_eq!(response.status(), StatusCode::OK);

    let processing_path = format!("/rs:fit:640/q:87/plain/{}/abc.jpg@webp", TEST_PREFIX);
    let requests = imgproxy.requests().await;
    assert_eq!(
        requests,
        vec![format!(
            "/{}{}",
            expected_signature(&processing_path),
            processing_path
        )]
    );
}

#[tokio::test]
async fn test_signature_is_deterministic_across_requests() {
    let imgproxy = MockImgproxy::start(MockBehavior::Image(b"webp".to_vec())).await;

    for _ in 0..3 {
        let router = test_router(test_config(&imgproxy.base_url));
        let response = send(router, "GET", "/abc.jpg?width=256").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let requests = imgproxy.requests().await;
    assert_eq!(requests.len(), 3);
    assert!(requests.iter().all(|r| r == &requests[0]));
    assert!(requests[0].contains("/rs:fit:256/q:87/plain/"));
}

#[tokio::test]
async fn test_different_widths_get_different_signatures() {
    let imgproxy = MockImgproxy::start(MockBehavior::Image(b"webp".to_vec())).await;

    for width in [256, 640, 1000] {
        let router = test_router(test_config(&imgproxy.base_url));
        let response = send(router, "GET", &format!("/abc.jpg?width={}", width)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let signatures: Vec<String> = imgproxy
        .requests()
        .await
        .iter()
        .map(|r| r.split('/').nth(1).unwrap().to_string())
        .collect();
    assert_eq!(signatures.len(), 3);
    assert_ne!(signatures[0], signatures[1]);
    assert_ne!(signatures[1], signatures[2]);
    assert_ne!(signatures[0], signatures[2]);
}

#[tokio::test]
async fn test_dot_segments_resolved_before_signing() {
    for uri in [
        "/../private-bucket/secret.jpg?width=640",
        "/%2e%2e/private-bucket/secret.jpg?width=640",
        "/photos/./../private-bucket/secret.jpg?width=640",
    ] {
        let imgproxy = MockImgproxy::start(MockBehavior::Image(b"webp".to_vec())).await;
        let router = test_router(test_config(&imgproxy.base_url));

        let response = send(router, "GET", uri).await;
        assert_eq!(response.status(), StatusCode::OK, "uri {uri}");

        // The path imgproxy receives is the one that was signed
        let processing_path = format!(
            "/rs:fit:640/q:87/plain/{}/private-bucket/secret.jpg@webp",
            TEST_PREFIX
        );
        assert_eq!(
            imgproxy.requests().await,
            vec![format!(
                "/{}{}",
                expected_signature(&processing_path),
                processing_path
            )],
            "uri {uri}"
        );
    }
}

#[tokio::test]
async fn test_width_with_trailing_characters_uses_parsed_value() {
    let imgproxy = MockImgproxy::start(MockBehavior::Image(b"webp".to_vec())).await;
    let router = test_router(test_config(&imgproxy.base_url));

    let response = send(router, "GET", "/abc.jpg?width=640px").await;
    assert_eq!(response.status(), StatusCode::OK);

    let requests = imgproxy.requests().await;
    assert!(requests[0].contains("/rs:fit:640/"));
}

// =============================================================================
// Streaming Pass-through
// =============================================================================

#[tokio::test]
async fn test_upstream_response_passes_through() {
    let image: Vec<u8> = (0..=255u8).cycle().take(256 * 1024).collect();
    let imgproxy = MockImgproxy::start(MockBehavior::Image(image.clone())).await;
    let router = test_router(test_config(&imgproxy.base_url));

    let response = send(router, "GET", "/photos/abc.jpg?width=1000").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/webp"
    );
    assert_eq!(
        response.headers().get("x-request-id").unwrap(),
        MOCK_REQUEST_ID
    );
    assert_eq!(
        response.headers().get(header::CACHE_CONTROL).unwrap(),
        "max-age=31536000, public"
    );
    assert_eq!(body_bytes(response).await, image);
}

#[tokio::test]
async fn test_slow_stream_outlives_upstream_timeout() {
    // Whole transfer takes ~1.2s, but no single pause reaches the 1s timeout
    let imgproxy = MockImgproxy::start(MockBehavior::Trickle {
        chunk: b"0123456789".to_vec(),
        count: 4,
        delay: Duration::from_millis(400),
    })
    .await;
    let config = test_config(&imgproxy.base_url).with_upstream_timeout(Duration::from_secs(1));
    let router = test_router(config);

    let response = send(router, "GET", "/abc.jpg?width=640").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"0123456789".repeat(4));
}

#[tokio::test]
async fn test_stalled_stream_is_aborted() {
    let imgproxy = MockImgproxy::start(MockBehavior::Trickle {
        chunk: b"0123456789".to_vec(),
        count: 2,
        delay: Duration::from_millis(1500),
    })
    .await;
    let config =
        test_config(&imgproxy.base_url).with_upstream_timeout(Duration::from_millis(300));
    let router = test_router(config);

    let response = send(router, "GET", "/abc.jpg?width=640").await;

    // Headers already went out, so the failure shows up in the body
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.into_body().collect().await.is_err());
}

#[tokio::test]
async fn test_head_thumbnail_fetches_upstream() {
    let imgproxy = MockImgproxy::start(MockBehavior::Image(b"webp".to_vec())).await;
    let router = test_router(test_config(&imgproxy.base_url));

    let response = send(router, "HEAD", "/abc.jpg?width=640").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(imgproxy.requests().await.len(), 1);
}

// =============================================================================
// Upstream Failures
// =============================================================================

#[tokio::test]
async fn test_upstream_error_becomes_bad_request() {
    let imgproxy = MockImgproxy::start(MockBehavior::Error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "server error",
    ))
    .await;
    let router = test_router(test_config(&imgproxy.base_url));

    let response = send(router, "GET", "/abc.jpg?width=640").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/json; charset=utf-8"
    );
    let error = body_json(response).await;
    assert_eq!(
        error["error"],
        "Streaming /abc.jpg from imgproxy failed: server error"
    );
}

#[tokio::test]
async fn test_upstream_not_found_becomes_bad_request() {
    let imgproxy = MockImgproxy::start(MockBehavior::Error(
        StatusCode::NOT_FOUND,
        "Invalid source image",
    ))
    .await;
    let router = test_router(test_config(&imgproxy.base_url));

    let response = send(router, "GET", "/missing.jpg?width=256").await;

    // The upstream status is not preserved, only its message
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = body_json(response).await;
    let message = error["error"].as_str().unwrap();
    assert!(message.contains("/missing.jpg"));
    assert!(message.contains("Invalid source image"));
}

#[tokio::test]
async fn test_non_200_success_is_still_an_error() {
    let imgproxy =
        MockImgproxy::start(MockBehavior::Error(StatusCode::NO_CONTENT, "")).await;
    let router = test_router(test_config(&imgproxy.base_url));

    let response = send(router, "GET", "/abc.jpg?width=640").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unreachable_upstream_becomes_bad_request() {
    let router = test_router(test_config("http://127.0.0.1:1"));

    let response = send(router, "GET", "/abc.jpg?width=640").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = body_json(response).await;
    assert!(error["error"]
        .as_str()
        .unwrap()
        .starts_with("Streaming /abc.jpg from imgproxy failed: "));
}
