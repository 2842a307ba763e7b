//! reqwest implementation of the core `Transport` trait

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};

use drive_core::{
    Error, HttpRequest, HttpResponse, RequestBody, Result, TimeoutConfig, TransferProgress,
    Transport,
};

fn network(e: reqwest::Error) -> Error {
    Error::Network(e.to_string())
}

/// Transport backed by a shared `reqwest::Client`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Transport with the default timeouts
    pub fn new() -> Result<Self> {
        Self::with_timeouts(&TimeoutConfig::default())
    }

    /// Transport with the given connect and read timeouts
    pub fn with_timeouts(timeout: &TimeoutConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(timeout.connect_ms))
            .read_timeout(Duration::from_millis(timeout.read_ms))
            .user_agent(concat!("drive-http/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Network(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Wrap an already configured client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn build(&self, request: HttpRequest) -> Result<reqwest::Request> {
        let builder = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers);

        let builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Form(fields) => builder.form(&fields),
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Bytes(data) => builder.body(data),
            RequestBody::Multipart(parts) => {
                let mut form = Form::new();
                for part in parts {
                    let mut body = Part::bytes(part.data.to_vec());
                    if let Some(filename) = part.filename {
                        body = body.file_name(filename);
                    }
                    if let Some(content_type) = part.content_type {
                        body = body.mime_str(&content_type).map_err(network)?;
                    }
                    form = form.part(part.name, body);
                }
                builder.multipart(form)
            }
        };

        builder.build().map_err(network)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let progress = request.progress.clone();
        let request = self.build(request)?;

        let mut response = self.client.execute(request).await.map_err(network)?;
        let status = response.status();
        let headers = response.headers().clone();
        let total = response.content_length();

        let mut body = Vec::with_capacity(total.unwrap_or(0).min(64 * 1024 * 1024) as usize);
        while let Some(chunk) = response.chunk().await.map_err(network)? {
            body.extend_from_slice(&chunk);
            if let Some(callback) = &progress {
                callback(&TransferProgress::new(body.len() as u64, total));
            }
        }

        Ok(HttpResponse {
            status,
            headers,
            body: Bytes::from(body),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drive_core::{MultipartPart, ProgressCallback};
    use http::header::{AUTHORIZATION, CONTENT_TYPE};
    use http::{HeaderValue, Method, StatusCode};
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn transport() -> ReqwestTransport {
        ReqwestTransport::new().unwrap()
    }

    fn request(method: Method, body: RequestBody) -> HttpRequest {
        let mut req = HttpRequest::new(method, "https://drive.example.org/api2/repos/");
        req.body = body;
        req
    }

    fn body_bytes(req: &reqwest::Request) -> &[u8] {
        req.body().and_then(|b| b.as_bytes()).unwrap_or_default()
    }

    #[test]
    fn test_build_form_body() {
        let req = transport()
            .build(request(
                Method::POST,
                RequestBody::Form(vec![
                    ("dirents".into(), "a b".into()),
                    ("dirents".into(), "c".into()),
                ]),
            ))
            .unwrap();
        assert_eq!(
            req.headers()[CONTENT_TYPE],
            "application/x-www-form-urlencoded"
        );
        assert_eq!(body_bytes(&req), b"dirents=a+b&dirents=c");
    }

    #[test]
    fn test_build_json_body() {
        let req = transport()
            .build(request(
                Method::POST,
                RequestBody::Json(serde_json::json!({"bucket_name": "b"})),
            ))
            .unwrap();
        assert_eq!(req.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(body_bytes(&req), br#"{"bucket_name":"b"}"#);
    }

    #[test]
    fn test_build_raw_bytes_keeps_headers() {
        let mut http_req = request(Method::PUT, RequestBody::Bytes(Bytes::from_static(b"\x00\x01")));
        http_req
            .headers
            .insert(AUTHORIZATION, HeaderValue::from_static("Bearer t"));

        let req = transport().build(http_req).unwrap();
        assert_eq!(req.method(), &Method::PUT);
        assert_eq!(req.headers()[AUTHORIZATION], "Bearer t");
        assert_eq!(body_bytes(&req), b"\x00\x01");
    }

    #[test]
    fn test_build_multipart_sets_boundary() {
        let req = transport()
            .build(request(
                Method::POST,
                RequestBody::Multipart(vec![
                    MultipartPart::file("file", "a.txt", Bytes::from_static(b"hi")),
                    MultipartPart::text("parent_dir", "/"),
                ]),
            ))
            .unwrap();
        let content_type = req.headers()[CONTENT_TYPE].to_str().unwrap();
        assert!(content_type.starts_with("multipart/form-data; boundary="));
    }

    #[test]
    fn test_build_rejects_bad_url() {
        let mut req = HttpRequest::new(Method::GET, "not a url");
        req.body = RequestBody::Empty;
        assert!(matches!(transport().build(req), Err(Error::Network(_))));
    }

    /// Serve one canned HTTP/1.1 response on a local port
    async fn serve_once(response: &'static [u8]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            socket.write_all(response).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{addr}/")
    }

    #[tokio::test]
    async fn test_execute_reports_progress() {
        let url = serve_once(
            b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello",
        )
        .await;

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let callback: ProgressCallback = Arc::new(move |p: &TransferProgress| {
            sink.lock().unwrap().push(p.clone());
        });

        let mut req = HttpRequest::new(Method::GET, url);
        req.progress = Some(callback);
        let response = transport().execute(req).await.unwrap();

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(&response.body[..], b"hello");

        let seen = seen.lock().unwrap();
        let last = seen.last().unwrap();
        assert_eq!(last.done, 5);
        assert_eq!(last.total, Some(5));
        assert!(last.is_complete());
    }

    #[tokio::test]
    async fn test_execute_returns_error_statuses_as_responses() {
        let url = serve_once(
            b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;

        let response = transport()
            .execute(HttpRequest::new(Method::GET, url))
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert!(response.body.is_empty());
    }

    #[tokio::test]
    async fn test_execute_connection_refused_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = transport()
            .execute(HttpRequest::new(Method::GET, format!("http://{addr}/")))
            .await;
        assert!(matches!(result, Err(Error::Network(_))));
    }
}
