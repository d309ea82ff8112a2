//! Shared utilities for integration tests.

use axum::body::Bytes;
use axum::http::{HeaderMap, Method, Uri};
use axum::Router;
use drm_proxy::config::{MediaSource, ProxyConfig, Secret};
use drm_proxy::{HttpServer, Shutdown};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::net::TcpListener;

pub const WIDEVINE_TOKEN: &str = "WV-TEST-PX";
pub const PLAYREADY_TOKEN: &str = "78C2E8";

/// One request as seen by a mock upstream.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct Captured {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Records every request a mock upstream receives.
#[derive(Debug, Default)]
pub struct Recorder {
    calls: AtomicUsize,
    requests: Mutex<Vec<Captured>>,
}

#[allow(dead_code)]
impl Recorder {
    pub fn capture(&self, method: Method, uri: Uri, headers: HeaderMap, body: Bytes) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(Captured {
            method,
            uri,
            headers,
            body,
        });
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last(&self) -> Captured {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("upstream saw no request")
    }
}

/// Serve `app` on an ephemeral port as a stand-in upstream.
pub async fn start_upstream(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// An address nothing listens on.
#[allow(dead_code)]
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Proxy config pointing both license schemes and the CDN at `upstream`.
/// Only Widevine has a token.
pub fn proxy_config(upstream: SocketAddr) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.license.widevine.endpoint = Some(format!("http://{}/proxy", upstream));
    config.license.widevine.token = Some(Secret::new(WIDEVINE_TOKEN));
    config.license.playready.endpoint =
        Some(format!("http://{}/cency/preauth.aspx", upstream));
    config.media.source = MediaSource::Cdn {
        base_url: format!("http://{}/media/DRMTEST/", upstream),
    };
    config
}

/// A proxy serving in the background; shut down on drop.
pub struct RunningProxy {
    pub addr: SocketAddr,
    shutdown: Shutdown,
}

impl RunningProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for RunningProxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub async fn start_proxy(config: ProxyConfig) -> RunningProxy {
    let server = HttpServer::new(config).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    RunningProxy { addr, shutdown }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
