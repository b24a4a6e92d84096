#![allow(dead_code)]

use async_trait::async_trait;
use restbind_http_tools::{
    EnvSnapshot, HttpTransport, ToolRegistry, ToolsConfig, TransportError, TransportRequest,
    TransportResponse,
};
use serde_json::Value;
use std::sync::{Arc, Mutex};

/// In-memory transport that records every request and replies with a fixed JSON response.
pub struct RecordingTransport {
    requests: Mutex<Vec<TransportRequest>>,
    status: u16,
    body: Value,
}

impl RecordingTransport {
    pub fn new(status: u16, body: Value) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            status,
            body,
        })
    }

    pub fn ok(body: Value) -> Arc<Self> {
        Self::new(200, body)
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().expect("lock").clone()
    }

    pub fn last(&self) -> TransportRequest {
        self.requests().pop().expect("at least one request was sent")
    }
}

#[async_trait]
impl HttpTransport for RecordingTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        self.requests.lock().expect("lock").push(request);
        Ok(TransportResponse {
            status: self.status,
            headers: vec![
                ("Content-Type".to_string(), "application/json".to_string()),
                ("X-Request-Id".to_string(), "req-1".to_string()),
                ("Set-Cookie".to_string(), "session=secret".to_string()),
            ],
            body: serde_json::to_vec(&self.body).expect("serialize body"),
        })
    }
}

pub fn registry(
    config: Value,
    env: &[(&str, &str)],
    transport: Arc<dyn HttpTransport>,
) -> ToolRegistry {
    let config: ToolsConfig = serde_json::from_value(config).expect("config parses");
    let env: EnvSnapshot = env.iter().copied().collect();
    ToolRegistry::load(config, env, transport).expect("config loads")
}
