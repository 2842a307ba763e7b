//! Data-proxy client: bucket and dataset lookup, bucket lifecycle

use std::time::Duration;

use http::StatusCode;
use serde_json::json;

use crate::dataproxy::bucket::{Bucket, BucketTarget};
use crate::dispatch::{Dispatcher, Request, join_url};
use crate::error::{Error, Result, ResultExt as _};
use crate::models::BucketStat;

const BUCKET_UNAUTHORIZED: &str = "401 response. Check you/your token have access right and/or the bucket name has been spelt correctly.";

const DATASET_UNAUTHORIZED: &str = "You do not have access to this dataset. If this is a private dataset, set request_access to start the access request procedure.";

const SCOPE_HINT: &str = "Creating or deleting a bucket needs clb.drive:write in the token scope.";

/// Entry point to the flat (data-proxy) API
#[derive(Debug, Clone)]
pub struct DataproxyClient {
    dispatcher: Dispatcher,
    wiki_url: String,
    access_poll_interval: Duration,
}

impl DataproxyClient {
    /// Wrap a dispatcher bound to the data-proxy API root. Token expiry is
    /// checked locally before every request.
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher: dispatcher.with_expiry_check(true),
            wiki_url: "https://wiki.ebrains.eu".to_string(),
            access_poll_interval: Duration::from_secs(5),
        }
    }

    /// Collaboratory wiki used by [`create_bucket`](Self::create_bucket)
    pub fn with_wiki_url(mut self, wiki_url: impl Into<String>) -> Self {
        self.wiki_url = wiki_url.into();
        self
    }

    /// Interval between permission checks while a dataset access request
    /// is pending
    pub fn with_access_poll_interval(mut self, interval: Duration) -> Self {
        self.access_poll_interval = interval;
        self
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn wiki_url(&self) -> &str {
        &self.wiki_url
    }

    pub fn access_poll_interval(&self) -> Duration {
        self.access_poll_interval
    }

    /// Bucket called `name`
    pub async fn get_bucket(&self, name: &str) -> Result<Bucket> {
        let stat: BucketStat = self
            .dispatcher
            .send(Request::get(format!("v1/buckets/{}/stat", urlencoding::encode(name))))
            .await
            .on_unauthorized(BUCKET_UNAUTHORIZED)?
            .json()?;
        Ok(Bucket::new(
            self.clone(),
            BucketTarget::Bucket(name.to_string()),
            stat,
        ))
    }

    /// Dataset with the given id
    ///
    /// Without access, `request_access` sends one access request and then
    /// keeps checking until it is granted. Drop the future to give up.
    pub async fn get_dataset(&self, dataset_id: &str, request_access: bool) -> Result<Bucket> {
        let mut request_sent = false;
        let mut attempt: u32 = 0;

        loop {
            let result = self
                .dispatcher
                .send(Request::get(format!(
                    "v1/datasets/{}/stat",
                    urlencoding::encode(dataset_id)
                )))
                .await;

            match result {
                Ok(response) => {
                    let stat: BucketStat = response.json()?;
                    return Ok(Bucket::new(
                        self.clone(),
                        BucketTarget::Dataset(dataset_id.to_string()),
                        stat,
                    ));
                }
                Err(e) if e.is_status(StatusCode::UNAUTHORIZED) => {
                    if !request_access {
                        return Err(Error::Unauthorized(DATASET_UNAUTHORIZED.to_string()));
                    }
                    if !request_sent {
                        self.dispatcher
                            .send(
                                Request::post(format!(
                                    "v1/datasets/{}",
                                    urlencoding::encode(dataset_id)
                                ))
                                .expect(&[StatusCode::OK, StatusCode::CREATED]),
                            )
                            .await?;
                        request_sent = true;
                        tracing::info!(
                            dataset = dataset_id,
                            "access request sent, check the mailbox associated with the token"
                        );
                    }
                    tokio::time::sleep(self.access_poll_interval).await;
                    attempt += 1;
                    tracing::info!(dataset = dataset_id, attempt, "checking permission");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Create a collab named `name` and activate its bucket
    pub async fn create_bucket(
        &self,
        name: &str,
        title: Option<&str>,
        description: &str,
    ) -> Result<()> {
        self.dispatcher
            .send(
                Request::post(join_url(&self.wiki_url, "rest/v1/collabs"))
                    .json(json!({
                        "name": name,
                        "title": title.unwrap_or(name),
                        "description": description,
                        "drive": true,
                        "chat": true,
                        "public": false,
                    }))
                    .expect(&[StatusCode::CREATED]),
            )
            .await
            .on_unauthorized(SCOPE_HINT)?;

        self.dispatcher
            .send(
                Request::post("v1/buckets")
                    .json(json!({ "bucket_name": name }))
                    .expect(&[StatusCode::CREATED]),
            )
            .await
            .on_unauthorized(SCOPE_HINT)?;

        tracing::info!(bucket = name, "bucket created");
        Ok(())
    }

    pub async fn delete_bucket(&self, name: &str) -> Result<()> {
        self.dispatcher
            .send(Request::delete(format!("v1/buckets/{}", urlencoding::encode(name))))
            .await
            .on_unauthorized(SCOPE_HINT)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedTransport, scripted_dispatcher};
    use crate::token::{Credentials, jwt_with_exp};
    use crate::transport::RequestBody;
    use std::sync::Arc;

    const BASE: &str = "https://data-proxy.example.org/api";

    fn client() -> (DataproxyClient, Arc<ScriptedTransport>) {
        let (dispatcher, transport) = scripted_dispatcher(BASE);
        let client = DataproxyClient::new(dispatcher)
            .with_wiki_url("https://wiki.example.org")
            .with_access_poll_interval(Duration::from_millis(1));
        (client, transport)
    }

    fn stat_json(name: &str) -> serde_json::Value {
        json!({
            "name": name,
            "objects_count": 2,
            "bytes": 2048,
            "last_modified": "2024-03-01T10:20:30",
            "is_public": false,
            "role": "viewer",
        })
    }

    #[tokio::test]
    async fn test_get_bucket() {
        let (client, transport) = client();
        transport.push_json(200, stat_json("foo"));

        let bucket = client.get_bucket("foo").await.unwrap();
        assert_eq!(bucket.name(), "foo");
        assert_eq!(bucket.stat().objects_count, 2);
        assert_eq!(bucket.target(), &BucketTarget::Bucket("foo".into()));
        assert_eq!(transport.requests()[0].url, format!("{BASE}/v1/buckets/foo/stat"));
    }

    #[tokio::test]
    async fn test_get_bucket_encodes_name() {
        let (client, transport) = client();
        transport.push_json(200, stat_json("a b"));

        client.get_bucket("a b").await.unwrap();
        assert_eq!(
            transport.requests()[0].url,
            format!("{BASE}/v1/buckets/a%20b/stat")
        );
    }

    #[tokio::test]
    async fn test_get_bucket_unauthorized() {
        let (client, transport) = client();
        transport.push(401, "");
        assert!(matches!(
            client.get_bucket("foo").await,
            Err(Error::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_expired_token_fails_before_any_request() {
        let transport = ScriptedTransport::new();
        let dispatcher = Dispatcher::new(BASE, Credentials::bearer(jwt_with_exp(1)), transport.clone());
        let client = DataproxyClient::new(dispatcher);

        assert!(matches!(
            client.get_bucket("foo").await,
            Err(Error::TokenExpired)
        ));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_get_dataset_without_access() {
        let (client, transport) = client();
        transport.push(401, "");

        assert!(matches!(
            client.get_dataset("ds-1", false).await,
            Err(Error::Unauthorized(_))
        ));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_get_dataset_requests_access_once() {
        let (client, transport) = client();
        transport.push(401, "");
        transport.push(201, "");
        transport.push(401, "");
        transport.push(401, "");
        transport.push_json(200, stat_json("d-bucket"));

        let dataset = client.get_dataset("ds-1", true).await.unwrap();
        assert_eq!(dataset.target(), &BucketTarget::Dataset("ds-1".into()));

        let requests = transport.requests();
        assert_eq!(requests.len(), 5);
        let posts = requests
            .iter()
            .filter(|r| r.method == http::Method::POST)
            .count();
        assert_eq!(posts, 1);
        assert_eq!(requests[1].url, format!("{BASE}/v1/datasets/ds-1"));
    }

    #[tokio::test]
    async fn test_get_dataset_other_error_passes_through() {
        let (client, transport) = client();
        transport.push(500, "");
        assert!(matches!(
            client.get_dataset("ds-1", true).await,
            Err(Error::Http { .. })
        ));
    }

    #[tokio::test]
    async fn test_create_bucket() {
        let (client, transport) = client();
        transport.push(201, "{}");
        transport.push(201, "{}");

        client.create_bucket("my-bucket", None, "desc").await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests[0].url, "https://wiki.example.org/rest/v1/collabs");
        match &requests[0].body {
            RequestBody::Json(body) => {
                assert_eq!(body["title"], "my-bucket");
                assert_eq!(body["drive"], true);
                assert_eq!(body["public"], false);
            }
            other => panic!("expected json, got {other:?}"),
        }
        assert_eq!(requests[1].url, format!("{BASE}/v1/buckets"));
        assert_eq!(
            requests[1].body,
            RequestBody::Json(json!({"bucket_name": "my-bucket"}))
        );
    }

    #[tokio::test]
    async fn test_create_bucket_stops_when_collab_fails() {
        let (client, transport) = client();
        transport.push(401, "");

        let err = client.create_bucket("b", Some("B"), "d").await.unwrap_err();
        assert!(matches!(err, Error::Unauthorized(msg) if msg.contains("clb.drive:write")));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_bucket() {
        let (client, transport) = client();
        transport.push(200, "");
        client.delete_bucket("b").await.unwrap();
        assert_eq!(transport.requests()[0].method, http::Method::DELETE);
        assert_eq!(transport.requests()[0].url, format!("{BASE}/v1/buckets/b"));
    }
}
