//! Buckets and datasets of the data-proxy

use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt as _, TryStreamExt as _};
use http::StatusCode;

use crate::dataproxy::client::DataproxyClient;
use crate::dataproxy::object::DataproxyObject;
use crate::dispatch::Request;
use crate::error::{Error, Result, ResultExt as _, translate};
use crate::models::{BucketStat, ObjectPage, SignedUrl};
use crate::pagination::{PageRequest, PageSource, paginate};
use crate::path::{encode_path, object_key};

/// Page size of object listings
pub const LIST_LIMIT: usize = 10;

/// What a [`Bucket`] handle is bound to; decides the URL prefix of every
/// object operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BucketTarget {
    /// `v1/buckets/<name>`
    Bucket(String),
    /// `v1/datasets/<id>`
    Dataset(String),
}

impl BucketTarget {
    /// Path below `v1/`
    pub fn path(&self) -> String {
        match self {
            BucketTarget::Bucket(name) => format!("buckets/{}", urlencoding::encode(name)),
            BucketTarget::Dataset(id) => format!("datasets/{}", urlencoding::encode(id)),
        }
    }
}

/// A bucket (or dataset) with the stats it was resolved with
#[derive(Debug, Clone)]
pub struct Bucket {
    client: DataproxyClient,
    target: BucketTarget,
    stat: BucketStat,
}

struct ObjectPages {
    bucket: Bucket,
    prefix: Option<String>,
}

#[async_trait]
impl PageSource for ObjectPages {
    type Item = DataproxyObject;

    async fn fetch_page(&self, request: PageRequest) -> Result<Vec<DataproxyObject>> {
        let page: ObjectPage = self
            .bucket
            .client
            .dispatcher()
            .send(
                Request::get(format!("v1/{}", self.bucket.target.path()))
                    .query("limit", request.limit.to_string())
                    .query_opt("marker", request.marker)
                    .query_opt("prefix", self.prefix.clone()),
            )
            .await?
            .json()?;

        Ok(page
            .objects
            .into_iter()
            .map(|record| DataproxyObject::new(self.bucket.clone(), record))
            .collect())
    }

    fn marker_of(item: &DataproxyObject) -> String {
        item.name().to_string()
    }
}

impl Bucket {
    pub(crate) fn new(client: DataproxyClient, target: BucketTarget, stat: BucketStat) -> Self {
        Self {
            client,
            target,
            stat,
        }
    }

    pub fn name(&self) -> &str {
        &self.stat.name
    }

    pub fn target(&self) -> &BucketTarget {
        &self.target
    }

    /// Stats captured at lookup time
    pub fn stat(&self) -> &BucketStat {
        &self.stat
    }

    pub fn client(&self) -> &DataproxyClient {
        &self.client
    }

    pub(crate) fn object_url(&self, key: &str) -> String {
        format!("v1/{}/{}", self.target.path(), encode_path(key))
    }

    /// Lazily list objects, optionally only those under `prefix`
    ///
    /// Pages are fetched on demand; a 401 at any page surfaces as
    /// [`Error::Unauthorized`] at that point of the stream.
    pub fn list(&self, prefix: Option<&str>) -> BoxStream<'static, Result<DataproxyObject>> {
        let source = ObjectPages {
            bucket: self.clone(),
            prefix: prefix.map(str::to_string),
        };
        paginate(source, LIST_LIMIT)
            .map_err(|e| {
                translate(e, StatusCode::UNAUTHORIZED, || {
                    Error::Unauthorized("Unauthorized.".into())
                })
            })
            .boxed()
    }

    /// Object whose key is exactly `name` (a leading `/` is ignored)
    pub async fn get_file(&self, name: &str) -> Result<DataproxyObject> {
        let key = object_key(name)?;
        let mut objects = self.list(Some(&key));
        while let Some(object) = objects.try_next().await? {
            if object.name() == key {
                return Ok(object);
            }
        }
        Err(Error::NotFound(format!("Cannot find {key}.")))
    }

    /// Upload `data` under `name` and return the stored object
    pub async fn upload(&self, data: impl Into<Bytes>, name: &str) -> Result<DataproxyObject> {
        let key = object_key(name)?;
        let signed: SignedUrl = self
            .client
            .dispatcher()
            .send(Request::put(self.object_url(&key)))
            .await
            .on_unauthorized("Unauthorized")?
            .json()?;
        let upload_url = signed
            .url
            .ok_or_else(|| Error::General("upload did not get an upload url".into()))?;

        let data = data.into();
        let size = data.len();
        self.client
            .dispatcher()
            .send(
                Request::put(upload_url)
                    .unauthenticated()
                    .bytes(data)
                    .expect(&[StatusCode::OK, StatusCode::CREATED, StatusCode::NO_CONTENT]),
            )
            .await?;
        tracing::debug!(bucket = %self.name(), key = %key, size, "uploaded object");

        self.get_file(&key).await
    }

    /// Upload a local file; the object key defaults to the file name
    pub async fn upload_file(
        &self,
        local_path: impl AsRef<Path>,
        name: Option<&str>,
    ) -> Result<DataproxyObject> {
        let local_path = local_path.as_ref();
        let name = match name {
            Some(name) => name.to_string(),
            None => local_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    Error::InvalidPath(format!("{} has no file name", local_path.display()))
                })?,
        };
        let data = tokio::fs::read(local_path).await?;
        self.upload(data, &name).await
    }
}

impl std::fmt::Display for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(name='{}')", self.name())
    }
}
