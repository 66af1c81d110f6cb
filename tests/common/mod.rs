//! Shared fixtures for integration tests: a test RSA key and a mock of the
//! token and reporting endpoints.

#![allow(dead_code)]

use std::sync::{Arc, Mutex, OnceLock};
use std::thread;
use std::time::Duration;

use newsroom_analytics::config::ProxyConfig;
use newsroom_analytics::credential::ServiceCredential;
use rsa::pkcs8::{EncodePrivateKey, LineEnding};
use rsa::RsaPrivateKey;
use tiny_http::{Header, Response, Server};

pub const ISSUER: &str = "newsroom-reader@newsroom-cms.iam.gserviceaccount.com";
pub const PROPERTY_ID: &str = "123456789";
pub const TOKEN_PATH: &str = "/token";
pub const REPORT_PREFIX: &str = "/v1beta/properties/";

static KEY: OnceLock<(RsaPrivateKey, String)> = OnceLock::new();

pub fn test_key() -> &'static (RsaPrivateKey, String) {
    KEY.get_or_init(|| {
        let key = RsaPrivateKey::new(&mut rand::thread_rng(), 2048).unwrap();
        let pem = key.to_pkcs8_pem(LineEnding::LF).unwrap().to_string();
        (key, pem)
    })
}

/// The credential as it arrives from the environment: newlines escaped.
pub fn credential() -> ServiceCredential {
    let (_, pem) = test_key();
    ServiceCredential::new(ISSUER, pem.replace('\n', "\\n"))
}

/// A canned GA4-style report.
pub fn sample_report() -> serde_json::Value {
    serde_json::json!({
        "dimensionHeaders": [{"name": "pageTitle"}, {"name": "pagePath"}],
        "metricHeaders": [
            {"name": "activeUsers", "type": "TYPE_INTEGER"},
            {"name": "screenPageViews", "type": "TYPE_INTEGER"}
        ],
        "rows": [
            {
                "dimensionValues": [{"value": "City council approves budget"}, {"value": "/articles/budget"}],
                "metricValues": [{"value": "412"}, {"value": "977"}]
            },
            {
                "dimensionValues": [{"value": "Home"}, {"value": "/"}],
                "metricValues": [{"value": "388"}, {"value": "1204"}]
            }
        ],
        "rowCount": 2,
        "metadata": {"currencyCode": "USD", "timeZone": "Europe/London"},
        "kind": "analyticsData#runReport"
    })
}

#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub body: String,
}

impl Reply {
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self {
            status,
            body: body.to_string(),
        }
    }

    pub fn raw(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

/// Serves `/token` and `/v1beta/properties/*` from canned replies and records
/// every request it sees.
pub struct MockEndpoints {
    server: Arc<Server>,
    handle: Option<thread::JoinHandle<()>>,
    base: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl MockEndpoints {
    pub fn start(token: Reply, report: Reply) -> Self {
        let server = Arc::new(Server::http("127.0.0.1:0").unwrap());
        let addr = server.server_addr().to_ip().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let srv = Arc::clone(&server);
        let seen = Arc::clone(&requests);
        let handle = thread::spawn(move || {
            for mut request in srv.incoming_requests() {
                let mut body = String::new();
                let _ = request.as_reader().read_to_string(&mut body);
                let authorization = request
                    .headers()
                    .iter()
                    .find(|h| h.field.equiv("Authorization"))
                    .map(|h| h.value.as_str().to_string());
                let content_type = request
                    .headers()
                    .iter()
                    .find(|h| h.field.equiv("Content-Type"))
                    .map(|h| h.value.as_str().to_string());
                let recorded = Recorded {
                    method: request.method().to_string(),
                    path: request.url().to_string(),
                    authorization,
                    content_type,
                    body,
                };

                let reply = if recorded.path == TOKEN_PATH {
                    token.clone()
                } else if recorded.path.starts_with(REPORT_PREFIX) {
                    report.clone()
                } else {
                    Reply::raw(404, "not found")
                };
                seen.lock().unwrap().push(recorded);

                let response = Response::from_string(reply.body)
                    .with_status_code(reply.status)
                    .with_header(
                        Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                            .unwrap(),
                    );
                let _ = request.respond(response);
            }
        });

        Self {
            server,
            handle: Some(handle),
            base: format!("http://{}", addr),
            requests,
        }
    }

    /// Proxy configuration pointing at this mock.
    pub fn config(&self) -> ProxyConfig {
        let mut config = ProxyConfig::new(PROPERTY_ID);
        config.token_url = format!("{}{}", self.base, TOKEN_PATH);
        config.report_base_url = format!("{}/v1beta", self.base);
        config.timeout = Duration::from_secs(5);
        config
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, prefix: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.path.starts_with(prefix))
            .collect()
    }
}

impl Drop for MockEndpoints {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Split an `application/x-www-form-urlencoded` body into pairs.
pub fn form_fields(body: &str) -> Vec<(String, String)> {
    body.split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// An address nothing listens on.
pub fn closed_port_url(path: &str) -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}{}", addr, path)
}

/// An address that accepts connections and never answers.
pub fn silent_server_url(path: &str, hold: Duration) -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        if let Ok((stream, _)) = listener.accept() {
            thread::sleep(hold);
            drop(stream);
        }
    });
    format!("http://{}{}", addr, path)
}
