use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::{FetchError, IoError};
use crate::io::ObjectLocation;

/// Resolves a snapshot identifier to the storage location of its GeoTIFF.
#[async_trait]
pub trait MetadataLookup: Send + Sync {
    /// Fails with [`FetchError::NotFound`] for unknown snapshots.
    async fn resolve(&self, snapshot_id: &str) -> Result<ObjectLocation, FetchError>;
}

/// Metadata lookup against the snapshot API.
///
/// Issues `GET {api_base}/snapshots/{id}.json` and reads `geotiff.url` from
/// the response.
#[derive(Clone)]
pub struct HttpMetadataLookup {
    client: reqwest::Client,
    api_base: Url,
}

impl HttpMetadataLookup {
    pub fn new(api_base: Url) -> Self {
        Self::with_client(reqwest::Client::new(), api_base)
    }

    pub fn with_client(client: reqwest::Client, api_base: Url) -> Self {
        Self { client, api_base }
    }

    /// URL of the metadata document for `snapshot_id`.
    ///
    /// The identifier is appended as a single, percent-encoded path segment.
    pub fn metadata_url(&self, snapshot_id: &str) -> Result<Url, FetchError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::Lookup {
                snapshot_id: snapshot_id.to_string(),
                message: format!("API base URL {} cannot carry a path", self.api_base),
            })?
            .pop_if_empty()
            .push("snapshots")
            .push(&format!("{}.json", snapshot_id));
        Ok(url)
    }
}

#[async_trait]
impl MetadataLookup for HttpMetadataLookup {
    async fn resolve(&self, snapshot_id: &str) -> Result<ObjectLocation, FetchError> {
        let url = self.metadata_url(snapshot_id)?;
        debug!(snapshot_id, %url, "Looking up snapshot metadata");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| IoError::Connection(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound {
                snapshot_id: snapshot_id.to_string(),
            });
        }
        if !status.is_success() {
            return Err(IoError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            }
            .into());
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| IoError::Connection(e.to_string()))?;

        parse_metadata(snapshot_id, &body)
    }
}

#[derive(Debug, Deserialize)]
struct SnapshotDocument {
    geotiff: Option<GeotiffReference>,
}

#[derive(Debug, Deserialize)]
struct GeotiffReference {
    url: Option<String>,
}

/// Extract the GeoTIFF location from a snapshot metadata document.
pub fn parse_metadata(snapshot_id: &str, body: &[u8]) -> Result<ObjectLocation, FetchError> {
    let lookup_error = |message: String| FetchError::Lookup {
        snapshot_id: snapshot_id.to_string(),
        message,
    };

    let document: SnapshotDocument = serde_json::from_slice(body)
        .map_err(|e| lookup_error(format!("invalid metadata document: {}", e)))?;

    let url = document
        .geotiff
        .and_then(|g| g.url)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| lookup_error("metadata has no GeoTIFF URL".to_string()))?;

    ObjectLocation::parse(&url).map_err(|e| lookup_error(e.to_string()))
}
