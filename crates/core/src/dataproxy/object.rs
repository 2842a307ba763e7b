//! Objects stored in a bucket

use bytes::Bytes;

use crate::dataproxy::bucket::Bucket;
use crate::dispatch::Request;
use crate::error::{Error, Result, ResultExt as _};
use crate::models::{DeleteResponse, ObjectRecord, SignedUrl};
use crate::progress::ProgressCallback;

/// One object of a bucket listing
#[derive(Debug, Clone)]
pub struct DataproxyObject {
    bucket: Bucket,
    record: ObjectRecord,
}

impl DataproxyObject {
    pub(crate) fn new(bucket: Bucket, record: ObjectRecord) -> Self {
        Self { bucket, record }
    }

    /// Object key
    pub fn name(&self) -> &str {
        &self.record.name
    }

    pub fn bytes(&self) -> u64 {
        self.record.bytes
    }

    pub fn content_type(&self) -> &str {
        &self.record.content_type
    }

    /// Listing record as the server sent it
    pub fn record(&self) -> &ObjectRecord {
        &self.record
    }

    pub fn bucket(&self) -> &Bucket {
        &self.bucket
    }

    /// Signed download URL. It expires within seconds.
    pub async fn download_link(&self) -> Result<String> {
        let signed: SignedUrl = self
            .bucket
            .client()
            .dispatcher()
            .send(Request::get(self.bucket.object_url(self.name())).query("redirect", "false"))
            .await
            .on_unauthorized("Unauthorized")?
            .json()?;
        signed
            .url
            .ok_or_else(|| Error::General(format!("no download url for {}", self.name())))
    }

    /// Full object content. The signed URL is fetched without the bearer
    /// token; `progress` is called for every received chunk.
    pub async fn content(&self, progress: Option<ProgressCallback>) -> Result<Bytes> {
        let url = self.download_link().await?;
        let response = self
            .bucket
            .client()
            .dispatcher()
            .send(Request::get(url).unauthenticated().progress(progress))
            .await?;
        Ok(response.body)
    }

    pub async fn delete(&self) -> Result<()> {
        let response = self
            .bucket
            .client()
            .dispatcher()
            .send(Request::delete(self.bucket.object_url(self.name())))
            .await
            .on_unauthorized("Unauthorized")?;

        let outcome: DeleteResponse = response.json()?;
        if !outcome.is_success() {
            return Err(Error::Operation(format!(
                "deleting {} was not confirmed: {}",
                self.name(),
                response.text()
            )));
        }
        tracing::debug!(bucket = %self.bucket.name(), key = %self.name(), "deleted object");
        Ok(())
    }
}

impl std::fmt::Display for DataproxyObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "DataproxyObject[bucket={}, path={}, size={}]",
            self.bucket.name(),
            self.name(),
            self.bytes()
        )
    }
}
