//! Transport trait definition
//!
//! The facades never talk to an HTTP library directly. They hand fully
//! resolved requests to a [`Transport`], which lets the core stay independent
//! of reqwest and lets tests script the server side.

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};
use crate::progress::ProgressCallback;

/// One named part of a multipart form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartPart {
    /// Form field name
    pub name: String,
    /// File name for file parts; `None` for plain text fields
    pub filename: Option<String>,
    /// MIME type for file parts
    pub content_type: Option<String>,
    /// Raw part content
    pub data: Bytes,
}

impl MultipartPart {
    /// Plain text form field
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            filename: None,
            content_type: None,
            data: Bytes::from(value.into()),
        }
    }

    /// File field; the MIME type is guessed from the file name
    pub fn file(name: impl Into<String>, filename: impl Into<String>, data: Bytes) -> Self {
        let filename = filename.into();
        let content_type = mime_guess::from_path(&filename)
            .first_raw()
            .map(str::to_string);
        Self {
            name: name.into(),
            filename: Some(filename),
            content_type,
            data,
        }
    }
}

/// Request body variants used by the two APIs
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    #[default]
    Empty,
    /// `application/x-www-form-urlencoded`; keys may repeat
    Form(Vec<(String, String)>),
    /// `application/json`
    Json(serde_json::Value),
    /// `multipart/form-data`
    Multipart(Vec<MultipartPart>),
    /// Raw bytes sent as-is
    Bytes(Bytes),
}

/// A fully resolved request: absolute URL, final headers
#[derive(Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: RequestBody,
    /// Called per received chunk while the response body streams in
    pub progress: Option<ProgressCallback>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
            progress: None,
        }
    }

    /// Value of a header as text, if present and valid UTF-8
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

impl std::fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("body", &self.body)
            .field("progress", &self.progress.is_some())
            .finish_non_exhaustive()
    }
}

/// A buffered response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Value of a header as text, if present and valid UTF-8
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Decode the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Body as text
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Body that holds a single JSON string, e.g. `"https://..."`.
    ///
    /// The drive API answers link requests this way.
    pub fn quoted_string(&self) -> Result<String> {
        match serde_json::from_slice::<String>(&self.body) {
            Ok(s) => Ok(s),
            Err(_) => {
                let text = self.text();
                let trimmed = text.trim();
                if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
                    Ok(trimmed[1..trimmed.len() - 1].to_string())
                } else {
                    Err(Error::General(format!(
                        "expected a quoted string in response, got: {trimmed}"
                    )))
                }
            }
        }
    }
}

/// Executes resolved requests
///
/// Implemented by the reqwest adapter and mocked in tests. Implementations
/// return every status code as a response; only connection-level failures
/// are errors.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request and buffer the full response body
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}
