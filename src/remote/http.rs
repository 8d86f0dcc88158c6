//! S3-style HTTP blob store.
//!
//! Objects live at `{endpoint}/{bucket}/{key}` (path-style addressing). Without an
//! explicit endpoint the regional S3 host `https://s3.{region}.amazonaws.com` is
//! used. Requests carry an optional bearer token; signing is left to a fronting
//! gateway or presigning proxy.

use crate::error::RemoteError;
use crate::remote::{BlobStore, PutObject};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use std::time::Duration;
use tracing::debug;

/// HTTP blob store client
#[derive(Debug, Clone)]
pub struct HttpBlobStore {
    client: Client,
    endpoint: Url,
    bucket: String,
    token: Option<String>,
}

/// Regional S3 host used when no endpoint is configured
pub fn regional_endpoint(region: &str) -> String {
    format!("https://s3.{}.amazonaws.com", region)
}

fn setup_error(message: String) -> RemoteError {
    RemoteError::Transport {
        key: String::new(),
        message,
    }
}

impl HttpBlobStore {
    pub fn new(
        endpoint: Option<&str>,
        bucket: &str,
        region: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, RemoteError> {
        let raw = match endpoint {
            Some(endpoint) => endpoint.to_string(),
            None => regional_endpoint(region),
        };
        let endpoint = Url::parse(&raw)
            .map_err(|e| setup_error(format!("Invalid endpoint '{}': {}", raw, e)))?;
        if endpoint.cannot_be_a_base() {
            return Err(setup_error(format!(
                "Endpoint '{}' cannot hold object paths",
                raw
            )));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| setup_error(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint,
            bucket: bucket.to_string(),
            token,
        })
    }

    /// URL of an object; each `/`-separated part of the key is one path segment
    pub fn object_url(&self, key: &str) -> Result<Url, RemoteError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| RemoteError::Transport {
                key: key.to_string(),
                message: format!("Endpoint '{}' cannot hold object paths", self.endpoint),
            })?
            .pop_if_empty()
            .push(&self.bucket)
            .extend(key.split('/'));
        Ok(url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

// Helper function to map HTTP errors to RemoteError
fn map_http_error(key: &str, error: reqwest::Error) -> RemoteError {
    RemoteError::Transport {
        key: key.to_string(),
        message: error.to_string(),
    }
}

fn map_status(key: &str, status: StatusCode) -> RemoteError {
    match status.as_u16() {
        401 | 403 => RemoteError::Auth {
            key: key.to_string(),
            message: format!("HTTP {}", status),
        },
        _ => RemoteError::Status {
            key: key.to_string(),
            status: status.as_u16(),
        },
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, RemoteError> {
        let url = self.object_url(key)?;
        debug!(%url, "GET object");
        let response = self
            .authorize(self.client.get(url))
            .send()
            .await
            .map_err(|e| map_http_error(key, e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(map_status(key, status));
        }
        let body = response
            .bytes()
            .await
            .map_err(|e| map_http_error(key, e))?;
        Ok(Some(body.to_vec()))
    }

    async fn put(&self, key: &str, object: PutObject) -> Result<(), RemoteError> {
        let url = self.object_url(key)?;
        debug!(%url, bytes = object.body.len(), "PUT object");
        let response = self
            .authorize(self.client.put(url))
            .header(reqwest::header::CONTENT_TYPE, object.content_type)
            .header(reqwest::header::CONTENT_DISPOSITION, "attachment")
            .header("x-amz-acl", object.access.as_header_value())
            .header("x-amz-server-side-encryption", "AES256")
            .header("x-amz-checksum-sha256", object.integrity.sha256)
            .header(
                "x-amz-meta-fingerprint",
                object.integrity.fingerprint.to_hex(),
            )
            .body(object.body)
            .send()
            .await
            .map_err(|e| map_http_error(key, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(map_status(key, status));
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!(
            "http:{}/{}",
            self.endpoint.as_str().trim_end_matches('/'),
            self.bucket
        )
    }
}
