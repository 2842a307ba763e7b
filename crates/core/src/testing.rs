//! Scripted transport for multi-request scenarios

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use http::{HeaderValue, StatusCode};

use crate::dispatch::Dispatcher;
use crate::error::{Error, Result};
use crate::token::{Credentials, jwt_with_exp};
use crate::transport::{HttpRequest, HttpResponse, Transport};

/// Answers requests from a queue, in order, and keeps what it was sent
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    responses: Mutex<VecDeque<HttpResponse>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn push(&self, status: u16, body: impl Into<bytes::Bytes>) {
        self.push_response(HttpResponse::new(
            StatusCode::from_u16(status).unwrap(),
            body.into(),
        ));
    }

    pub(crate) fn push_json(&self, status: u16, body: serde_json::Value) {
        self.push(status, body.to_string());
    }

    pub(crate) fn push_with_header(
        &self,
        status: u16,
        body: impl Into<bytes::Bytes>,
        name: &'static str,
        value: &str,
    ) {
        let mut resp = HttpResponse::new(StatusCode::from_u16(status).unwrap(), body.into());
        resp.headers
            .insert(name, HeaderValue::from_str(value).unwrap());
        self.push_response(resp);
    }

    pub(crate) fn push_response(&self, response: HttpResponse) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn remaining(&self) -> usize {
        self.responses.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::Network(format!("no scripted response for {}", request.url)))
    }
}

/// Dispatcher with a bearer token (valid until 2100) over a scripted
/// transport
pub(crate) fn scripted_dispatcher(base: &str) -> (Dispatcher, Arc<ScriptedTransport>) {
    let transport = ScriptedTransport::new();
    let token = jwt_with_exp(4_102_444_800);
    let dispatcher = Dispatcher::new(base, Credentials::bearer(token), transport.clone());
    (dispatcher, transport)
}
