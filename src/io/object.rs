use async_trait::async_trait;
use bytes::Bytes;
use url::Url;

use crate::error::IoError;

/// Bucket and key of an object in S3 or S3-compatible storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectLocation {
    pub bucket: String,
    pub key: String,
}

impl ObjectLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Derive bucket and key from a raster URL.
    ///
    /// Three shapes are understood:
    ///
    /// - `s3://bucket/key`
    /// - path-style AWS hosts (`s3.amazonaws.com`, `s3-<region>.amazonaws.com`,
    ///   `s3.<region>.amazonaws.com`), where the bucket is the first path
    ///   segment
    /// - any other host, where the bucket is the first DNS label
    ///   (`bucket.s3.amazonaws.com/key`)
    ///
    /// The key is percent-decoded.
    pub fn parse(raw: &str) -> Result<Self, IoError> {
        let url = Url::parse(raw)
            .map_err(|e| IoError::InvalidLocation(format!("{}: {}", raw, e)))?;
        let host = url
            .host_str()
            .ok_or_else(|| IoError::InvalidLocation(format!("{}: missing host", raw)))?;
        let path = url.path().trim_start_matches('/');

        let (bucket, raw_key) = if url.scheme() == "s3" {
            (host.to_string(), path)
        } else if is_path_style_host(host) {
            match path.split_once('/') {
                Some((bucket, key)) => (bucket.to_string(), key),
                None => (path.to_string(), ""),
            }
        } else {
            let bucket = host.split('.').next().unwrap_or(host);
            (bucket.to_string(), path)
        };

        if bucket.is_empty() {
            return Err(IoError::InvalidLocation(format!("{}: missing bucket", raw)));
        }
        if raw_key.is_empty() {
            return Err(IoError::InvalidLocation(format!("{}: missing key", raw)));
        }

        let key = urlencoding::decode(raw_key)
            .map_err(|e| IoError::InvalidLocation(format!("{}: {}", raw, e)))?
            .into_owned();

        Ok(Self { bucket, key })
    }
}

impl std::fmt::Display for ObjectLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

fn is_path_style_host(host: &str) -> bool {
    if host == "s3.amazonaws.com" {
        return true;
    }
    let Some(rest) = host
        .strip_prefix("s3.")
        .or_else(|| host.strip_prefix("s3-"))
    else {
        return false;
    };
    rest.ends_with(".amazonaws.com") && rest.len() > ".amazonaws.com".len()
}

/// Trait for reading whole objects from remote storage.
///
/// Snapshot rasters are small enough to be fetched in one request and decoded
/// in memory, so there is no range API here. Implementations must be
/// thread-safe.
#[async_trait]
pub trait ObjectReader: Send + Sync {
    /// Read the complete object at `location`.
    ///
    /// A missing object is reported as [`IoError::NotFound`].
    async fn read_object(&self, location: &ObjectLocation) -> Result<Bytes, IoError>;
}

#[async_trait]
impl<R: ObjectReader + ?Sized> ObjectReader for std::sync::Arc<R> {
    async fn read_object(&self, location: &ObjectLocation) -> Result<Bytes, IoError> {
        (**self).read_object(location).await
    }
}
