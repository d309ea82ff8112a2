//! License forwarding against a mock license service.

use axum::body::Bytes;
use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::routing::post;
use axum::Router;
use drm_proxy::config::Secret;
use std::sync::Arc;
use std::time::{Duration, Instant};

mod common;
use common::{Recorder, PLAYREADY_TOKEN, WIDEVINE_TOKEN};

/// License service that records the challenge and echoes it back.
fn echo_service(path: &str, recorder: Arc<Recorder>) -> Router {
    Router::new()
        .route(
            path,
            post(move |method: Method, uri: Uri, headers: HeaderMap, body: Bytes| {
                let recorder = recorder.clone();
                async move {
                    recorder.capture(method, uri, headers, body.clone());
                    (StatusCode::OK, body)
                }
            }),
        )
        .layer(DefaultBodyLimit::disable())
}

/// License service that answers every challenge with a fixed reply.
fn fixed_service(recorder: Arc<Recorder>, status: StatusCode, reply: &'static [u8]) -> Router {
    Router::new().route(
        "/proxy",
        post(move |method: Method, uri: Uri, headers: HeaderMap, body: Bytes| {
            let recorder = recorder.clone();
            async move {
                recorder.capture(method, uri, headers, body);
                (status, reply)
            }
        }),
    )
}

#[tokio::test]
async fn challenge_and_reply_round_trip_unmodified() {
    let recorder = Arc::new(Recorder::default());
    let upstream = common::start_upstream(echo_service("/proxy", recorder.clone())).await;
    let proxy = common::start_proxy(common::proxy_config(upstream)).await;
    let client = common::client();

    for size in [0usize, 2, 2500, 10 * 1024 * 1024] {
        let challenge: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();

        let res = client
            .post(proxy.url("/license-proxy"))
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(challenge.clone())
            .send()
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK, "size {size}");
        assert_eq!(res.headers()[header::CONTENT_TYPE], "application/octet-stream");
        let body = res.bytes().await.unwrap();
        assert_eq!(body.len(), size);
        assert!(body[..] == challenge[..], "reply altered at size {size}");

        let seen = recorder.last();
        assert_eq!(seen.body.len(), size);
        assert!(seen.body[..] == challenge[..], "challenge altered at size {size}");
    }

    assert_eq!(recorder.calls(), 4);
}

#[tokio::test]
async fn upstream_sees_token_and_fixed_headers_only() {
    let recorder = Arc::new(Recorder::default());
    let upstream = common::start_upstream(echo_service("/proxy", recorder.clone())).await;
    let proxy = common::start_proxy(common::proxy_config(upstream)).await;

    common::client()
        .post(proxy.url("/license-proxy"))
        .header(header::CONTENT_TYPE, "text/plain")
        .header(header::COOKIE, "session=abc")
        .header("x-player-session", "1234")
        .body(vec![8u8; 64])
        .send()
        .await
        .unwrap();

    let seen = recorder.last();
    assert_eq!(seen.method, Method::POST);
    assert_eq!(seen.uri.path(), "/proxy");
    assert_eq!(seen.uri.query(), Some(format!("pX={}", WIDEVINE_TOKEN).as_str()));
    assert_eq!(seen.headers[header::CONTENT_TYPE], "application/octet-stream");
    assert!(seen.headers[header::USER_AGENT]
        .to_str()
        .unwrap()
        .starts_with("drm-proxy/"));
    assert!(seen.headers.get(header::COOKIE).is_none());
    assert!(seen.headers.get("x-player-session").is_none());
    assert!(seen.headers.get("x-request-id").is_none());
}

#[tokio::test]
async fn rejected_certificate_request_is_relayed_verbatim() {
    let recorder = Arc::new(Recorder::default());
    let upstream = common::start_upstream(fixed_service(
        recorder.clone(),
        StatusCode::BAD_REQUEST,
        b"cert too small",
    ))
    .await;
    let proxy = common::start_proxy(common::proxy_config(upstream)).await;

    let res = common::client()
        .post(proxy.url("/license-proxy"))
        .body(b"0x".to_vec())
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.headers()[header::CONTENT_TYPE], "application/octet-stream");
    assert_eq!(&res.bytes().await.unwrap()[..], b"cert too small");
    assert_eq!(recorder.last().body.len(), 2);
}

#[tokio::test]
async fn upstream_server_errors_are_relayed_not_rewritten() {
    let recorder = Arc::new(Recorder::default());
    let upstream = common::start_upstream(fixed_service(
        recorder.clone(),
        StatusCode::INTERNAL_SERVER_ERROR,
        b"EZDRM internal error",
    ))
    .await;
    let proxy = common::start_proxy(common::proxy_config(upstream)).await;

    let res = common::client()
        .post(proxy.url("/license-proxy"))
        .body(vec![1u8; 2500])
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(&res.bytes().await.unwrap()[..], b"EZDRM internal error");
}

#[tokio::test]
async fn missing_token_fails_without_calling_upstream() {
    let recorder = Arc::new(Recorder::default());
    let upstream = common::start_upstream(echo_service("/proxy", recorder.clone())).await;
    let mut config = common::proxy_config(upstream);
    config.license.widevine.token = None;
    let proxy = common::start_proxy(config).await;
    let client = common::client();

    for _ in 0..3 {
        let res = client
            .post(proxy.url("/license-proxy"))
            .body(vec![0u8; 2500])
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            res.text().await.unwrap(),
            "Server Configuration Error: Missing PX"
        );
    }

    assert_eq!(recorder.calls(), 0);
}

#[tokio::test]
async fn blank_token_counts_as_missing() {
    let recorder = Arc::new(Recorder::default());
    let upstream = common::start_upstream(echo_service("/proxy", recorder.clone())).await;
    let mut config = common::proxy_config(upstream);
    config.license.widevine.token = Some(Secret::new(""));
    let proxy = common::start_proxy(config).await;

    let res = common::client()
        .post(proxy.url("/license-proxy"))
        .body(vec![0u8; 16])
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(recorder.calls(), 0);
}

#[tokio::test]
async fn slow_license_service_times_out() {
    let app = Router::new().route(
        "/proxy",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            "too late"
        }),
    );
    let upstream = common::start_upstream(app).await;
    let mut config = common::proxy_config(upstream);
    config.upstream.timeout_secs = 1;
    let proxy = common::start_proxy(config).await;

    let start = Instant::now();
    let res = common::client()
        .post(proxy.url("/license-proxy"))
        .body(vec![0u8; 2500])
        .send()
        .await
        .unwrap();
    let elapsed = start.elapsed();

    assert_eq!(res.status(), StatusCode::GATEWAY_TIMEOUT);
    assert!(elapsed < Duration::from_secs(3), "took {elapsed:?}");
    assert!(res.text().await.unwrap().starts_with("Proxy Error:"));
}

#[tokio::test]
async fn outer_request_deadline_answers_gateway_timeout() {
    let app = Router::new().route(
        "/proxy",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            "too late"
        }),
    );
    let upstream = common::start_upstream(app).await;
    let mut config = common::proxy_config(upstream);
    config.upstream.timeout_secs = 5;
    config.timeouts.request_secs = 1;
    let proxy = common::start_proxy(config).await;

    let res = common::client()
        .post(proxy.url("/license-proxy"))
        .body(vec![0u8; 2500])
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::GATEWAY_TIMEOUT);
}

#[tokio::test]
async fn unreachable_license_service_is_a_bad_gateway() {
    let mut config = common::proxy_config(common::closed_port().await);
    config.upstream.connect_timeout_secs = 2;
    let proxy = common::start_proxy(config).await;

    let res = common::client()
        .post(proxy.url("/license-proxy"))
        .body(vec![0u8; 8])
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let body = res.text().await.unwrap();
    assert!(body.starts_with("Proxy Error:"), "{body}");
    assert!(!body.contains(WIDEVINE_TOKEN), "token leaked: {body}");
}

#[tokio::test]
async fn playready_route_uses_its_own_endpoint_and_token() {
    let recorder = Arc::new(Recorder::default());
    let upstream =
        common::start_upstream(echo_service("/cency/preauth.aspx", recorder.clone())).await;
    let mut config = common::proxy_config(upstream);
    config.license.playready.token = Some(Secret::new(PLAYREADY_TOKEN));
    let proxy = common::start_proxy(config).await;

    let res = common::client()
        .post(proxy.url("/license-proxy/playready"))
        .body(b"<soap:Envelope/>".to_vec())
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(&res.bytes().await.unwrap()[..], b"<soap:Envelope/>");

    let seen = recorder.last();
    assert_eq!(seen.uri.path(), "/cency/preauth.aspx");
    assert_eq!(seen.uri.query(), Some(format!("pX={}", PLAYREADY_TOKEN).as_str()));
}

#[tokio::test]
async fn playready_without_token_has_no_route() {
    let recorder = Arc::new(Recorder::default());
    let upstream =
        common::start_upstream(echo_service("/cency/preauth.aspx", recorder.clone())).await;
    let proxy = common::start_proxy(common::proxy_config(upstream)).await;

    let res = common::client()
        .post(proxy.url("/license-proxy/playready"))
        .body(vec![0u8; 8])
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(recorder.calls(), 0);
}

#[tokio::test]
async fn license_route_only_accepts_post() {
    let recorder = Arc::new(Recorder::default());
    let upstream = common::start_upstream(echo_service("/proxy", recorder.clone())).await;
    let proxy = common::start_proxy(common::proxy_config(upstream)).await;

    let res = common::client()
        .get(proxy.url("/license-proxy"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(recorder.calls(), 0);
}
