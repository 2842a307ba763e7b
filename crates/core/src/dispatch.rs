//! Authenticated request dispatch
//!
//! A [`Dispatcher`] is the session value every facade object carries: base
//! server URL, credentials and the transport. It resolves relative targets,
//! attaches the bearer token and classifies the response status.

use std::sync::Arc;

use bytes::Bytes;
use http::header::AUTHORIZATION;
use http::{HeaderMap, HeaderValue, Method, StatusCode};

use crate::error::{Error, Result};
use crate::progress::ProgressCallback;
use crate::token::Credentials;
use crate::transport::{HttpRequest, HttpResponse, MultipartPart, RequestBody, Transport};

/// Request description before URL resolution and authentication
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    target: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: RequestBody,
    expected: Vec<StatusCode>,
    authenticated: bool,
    progress: Option<ProgressCallbackSlot>,
}

// Wrapper so that `Request` stays `Debug`.
#[derive(Clone)]
struct ProgressCallbackSlot(ProgressCallback);

impl std::fmt::Debug for ProgressCallbackSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ProgressCallback")
    }
}

impl Request {
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        Self {
            method,
            target: target.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
            expected: vec![StatusCode::OK],
            authenticated: true,
            progress: None,
        }
    }

    pub fn get(target: impl Into<String>) -> Self {
        Self::new(Method::GET, target)
    }

    pub fn post(target: impl Into<String>) -> Self {
        Self::new(Method::POST, target)
    }

    pub fn put(target: impl Into<String>) -> Self {
        Self::new(Method::PUT, target)
    }

    pub fn delete(target: impl Into<String>) -> Self {
        Self::new(Method::DELETE, target)
    }

    /// Append a query parameter
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Append a query parameter only when `value` is set
    pub fn query_opt(self, key: &str, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(v) => self.query(key, v),
            None => self,
        }
    }

    /// Set a request header; an explicit `Authorization` wins over the
    /// session token
    pub fn header(mut self, name: http::HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn form<K, V>(mut self, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.body = RequestBody::Form(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    pub fn json(mut self, value: serde_json::Value) -> Self {
        self.body = RequestBody::Json(value);
        self
    }

    pub fn multipart(mut self, parts: Vec<MultipartPart>) -> Self {
        self.body = RequestBody::Multipart(parts);
        self
    }

    pub fn bytes(mut self, data: Bytes) -> Self {
        self.body = RequestBody::Bytes(data);
        self
    }

    /// Replace the accepted status set (default: `200` only)
    pub fn expect(mut self, statuses: &[StatusCode]) -> Self {
        self.expected = statuses.to_vec();
        self
    }

    /// Do not attach the session token. Signed URLs reject requests that
    /// carry one.
    pub fn unauthenticated(mut self) -> Self {
        self.authenticated = false;
        self
    }

    /// Report streaming progress of the response body
    pub fn progress(mut self, callback: Option<ProgressCallback>) -> Self {
        self.progress = callback.map(ProgressCallbackSlot);
        self
    }
}

/// Session bound to one server
#[derive(Clone)]
pub struct Dispatcher {
    base_url: String,
    credentials: Credentials,
    transport: Arc<dyn Transport>,
    check_expiry: bool,
}

impl Dispatcher {
    pub fn new(
        base_url: impl Into<String>,
        credentials: Credentials,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            credentials,
            transport,
            check_expiry: false,
        }
    }

    /// Check the token's `exp` claim before each request
    pub fn with_expiry_check(mut self, enabled: bool) -> Self {
        self.check_expiry = enabled;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Resolve a relative path against the base URL; absolute URLs pass
    /// through unchanged
    pub fn resolve(&self, target: &str) -> String {
        if is_absolute(target) {
            target.to_string()
        } else {
            join_url(&self.base_url, target)
        }
    }

    /// Resolve, authenticate, send and classify one request
    pub async fn send(&self, request: Request) -> Result<HttpResponse> {
        if self.check_expiry && request.authenticated {
            if let Some(token) = self.credentials.token() {
                token.ensure_valid()?;
            }
        }

        let url = with_query(&self.resolve(&request.target), &request.query)?;

        let mut headers = request.headers;
        if request.authenticated && !headers.contains_key(AUTHORIZATION) {
            if let Some(value) = self.credentials.authorization() {
                let mut value = HeaderValue::from_str(&value)
                    .map_err(|e| Error::InvalidToken(e.to_string()))?;
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
            }
        }

        let http_request = HttpRequest {
            method: request.method.clone(),
            url,
            headers,
            body: request.body,
            progress: request.progress.map(|slot| slot.0),
        };

        tracing::debug!(method = %http_request.method, url = %http_request.url, "sending request");
        let response = self.transport.execute(http_request).await?;
        tracing::debug!(status = %response.status, "received response");

        if !request.expected.contains(&response.status) {
            return Err(Error::Http {
                status: response.status,
                message: unexpected_status_message(&request.expected, response.status),
            });
        }

        Ok(response)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("base_url", &self.base_url)
            .field("credentials", &self.credentials)
            .field("check_expiry", &self.check_expiry)
            .finish_non_exhaustive()
    }
}

fn is_absolute(target: &str) -> bool {
    target.starts_with("http://") || target.starts_with("https://")
}

/// Join base and path with exactly one slash between them
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn with_query(url: &str, query: &[(String, String)]) -> Result<String> {
    if query.is_empty() {
        return Ok(url.to_string());
    }
    let mut parsed = url::Url::parse(url)?;
    {
        let mut pairs = parsed.query_pairs_mut();
        for (k, v) in query {
            pairs.append_pair(k, v);
        }
    }
    Ok(parsed.into())
}

fn unexpected_status_message(expected: &[StatusCode], got: StatusCode) -> String {
    let expected = expected
        .iter()
        .map(|s| s.as_u16().to_string())
        .collect::<Vec<_>>()
        .join(" or ");
    format!("Expected {expected}, but get {}", got.as_u16())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::jwt_with_exp;
    use crate::transport::MockTransport;

    fn dispatcher(mock: MockTransport, credentials: Credentials) -> Dispatcher {
        Dispatcher::new("https://drive.example.org/", credentials, Arc::new(mock))
    }

    #[test]
    fn test_join_url_single_slash() {
        assert_eq!(join_url("https://a/", "/b/c/"), "https://a/b/c/");
        assert_eq!(join_url("https://a", "b"), "https://a/b");
        assert_eq!(join_url("https://a//", "//b"), "https://a/b");
    }

    #[test]
    fn test_resolve_keeps_absolute() {
        let d = dispatcher(MockTransport::new(), Credentials::Anonymous);
        assert_eq!(d.resolve("https://other/x"), "https://other/x");
        assert_eq!(d.resolve("api2/repos/"), "https://drive.example.org/api2/repos/");
    }

    #[test]
    fn test_with_query_encodes() {
        let url = with_query("https://a/api2/repos/r/dir/", &[("p".into(), "/x y/ü".into())])
            .unwrap();
        assert_eq!(url, "https://a/api2/repos/r/dir/?p=%2Fx+y%2F%C3%BC");
    }

    #[tokio::test]
    async fn test_send_injects_bearer() {
        let mut mock = MockTransport::new();
        mock.expect_execute()
            .withf(|req| {
                req.url == "https://drive.example.org/api2/repos/"
                    && req.header("authorization") == Some("Bearer tok")
            })
            .times(1)
            .returning(|_| Ok(HttpResponse::new(StatusCode::OK, "[]")));

        let d = dispatcher(mock, Credentials::bearer("tok"));
        let resp = d.send(Request::get("/api2/repos/")).await.unwrap();
        assert_eq!(resp.text(), "[]");
    }

    #[tokio::test]
    async fn test_send_keeps_caller_authorization() {
        let mut mock = MockTransport::new();
        mock.expect_execute()
            .withf(|req| req.header("authorization") == Some("Token other"))
            .times(1)
            .returning(|_| Ok(HttpResponse::new(StatusCode::OK, "")));

        let d = dispatcher(mock, Credentials::bearer("tok"));
        d.send(Request::get("x").header(AUTHORIZATION, HeaderValue::from_static("Token other")))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_unauthenticated_and_anonymous_send_no_header() {
        let mut mock = MockTransport::new();
        mock.expect_execute()
            .withf(|req| req.header("authorization").is_none())
            .times(2)
            .returning(|_| Ok(HttpResponse::new(StatusCode::OK, "")));
        let mock = Arc::new(mock);

        let signed = Dispatcher::new("https://a", Credentials::bearer("tok"), mock.clone());
        signed
            .send(Request::get("https://signed.example.org/x?sig=1").unauthenticated())
            .await
            .unwrap();

        let public = Dispatcher::new("https://a", Credentials::Anonymous, mock);
        public.send(Request::get("x")).await.unwrap();
    }

    #[tokio::test]
    async fn test_unexpected_status_is_http_error() {
        let mut mock = MockTransport::new();
        mock.expect_execute()
            .returning(|_| Ok(HttpResponse::new(StatusCode::NOT_FOUND, "")));

        let d = dispatcher(mock, Credentials::bearer("tok"));
        let err = d
            .send(Request::put("x").expect(&[StatusCode::OK, StatusCode::CREATED]))
            .await
            .unwrap_err();
        match err {
            Error::Http { status, message } => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert_eq!(message, "Expected 200 or 201, but get 404");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_expired_token_fails_before_network() {
        let mut mock = MockTransport::new();
        mock.expect_execute().times(0);

        let d = dispatcher(mock, Credentials::bearer(jwt_with_exp(1))).with_expiry_check(true);
        let err = d.send(Request::get("v1/buckets/x/stat")).await.unwrap_err();
        assert!(matches!(err, Error::TokenExpired));
    }

    #[tokio::test]
    async fn test_expiry_not_checked_when_disabled() {
        let mut mock = MockTransport::new();
        mock.expect_execute()
            .times(1)
            .returning(|_| Ok(HttpResponse::new(StatusCode::OK, "")));

        let d = dispatcher(mock, Credentials::bearer(jwt_with_exp(1)));
        assert!(d.send(Request::get("x")).await.is_ok());
    }
}
