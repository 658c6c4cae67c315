//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use doorkeeper::config::{parse_config, DoorkeeperConfig};
use doorkeeper::http::HttpServer;
use doorkeeper::lifecycle::Shutdown;
use doorkeeper::policy::token::{HmacAlgorithm, TokenValidator};
use doorkeeper::Engine;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Hex of `doorkeeper-test-key`.
pub const KEY_HEX: &str = "646f6f726b65657065722d746573742d6b6579";

/// Far-future expiry used by valid tokens.
pub const FAR_EXP: &str = "9999999999";

/// A full policy: path modifier, signed token on the path, forwarded IP list
/// and a version matcher, with custom templates.
pub fn policy_yaml() -> String {
    format!(
        r#"
logLevel: debug
modifiers:
  - type: Path
    path:
      pattern: "^/api/v1"
      replace: "/v2"
authorizations:
  - name: token
    type: HMAC
    param: {{ type: Header, name: Authorization }}
    hmac:
      type: URL
      mandatoryFields: [exp]
      encryptionKey: "{KEY_HEX}"
      encryptionAlgorithm: sha256
  - name: office
    type: IPLIST
    param: {{ type: Header, name: X-Forwarded-For }}
    ipList:
      cidr: 192.168.1.0/24
      trustedNetworks: [10.0.0.0/8]
  - name: version
    type: MATCH
    param: {{ type: Query, name: v }}
    match:
      pattern: "^v[0-9]+$"
requestAuthRequirements:
  - name: authenticated
    type: any
    authorizations: [token, office]
  - name: versioned
    type: all
    authorizations: [version]
response:
  allowed:
    statusCode: 200
    headers:
      x-doorkeeper: allowed
  denied:
    statusCode: 401
    headers:
      x-doorkeeper: denied
      content-type: application/json
    body: '{{"error":"unauthorized"}}'
"#
    )
}

pub fn policy_config() -> DoorkeeperConfig {
    parse_config(&policy_yaml()).unwrap()
}

pub fn policy_engine() -> Engine {
    Engine::from_config(&policy_config()).unwrap()
}

/// Token signed for `protected` with the test key.
pub fn token_for(protected: &str) -> String {
    TokenValidator::new(HmacAlgorithm::Sha256, key_bytes(), vec!["exp".to_string()])
        .issue(&[("exp", FAR_EXP)], protected)
        .unwrap()
}

fn key_bytes() -> Vec<u8> {
    b"doorkeeper-test-key".to_vec()
}

/// A server bound to an ephemeral local port.
pub struct TestServer {
    pub addr: SocketAddr,
    shutdown: Shutdown,
    handle: JoinHandle<Result<(), std::io::Error>>,
}

impl TestServer {
    pub async fn start(engine: Engine) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let shutdown = Shutdown::new();
        let server = HttpServer::new(Arc::new(engine), Duration::from_secs(5));
        let handle = tokio::spawn(server.run(listener, shutdown.wait()));

        Self { addr, shutdown, handle }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Trigger graceful shutdown and wait for the server task.
    pub async fn stop(self) {
        self.shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("server did not stop in time")
            .expect("server task panicked")
            .expect("server returned an error");
    }
}
