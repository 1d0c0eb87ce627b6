//! Transport seam between the snapshot client and the cluster REST API
//!
//! [`SnapshotAdminClient`](crate::client::SnapshotAdminClient) never talks HTTP
//! directly. It builds a [`ClusterRequest`] and hands it to a
//! [`ClusterTransport`], which the caller injects. [`HttpTransport`] is the
//! production implementation; tests substitute an in-memory fake.

use crate::error::{Result, SnapshotError};
use essnap_common::ClusterConfig;
use std::time::Duration;

/// HTTP methods used by the snapshot API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

/// A single request against the cluster
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterRequest {
    pub method: Method,
    /// Unencoded path segments, e.g. `["_snapshot", "backup-1"]`
    pub path: Vec<String>,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl ClusterRequest {
    fn new<I, S>(method: Method, path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            method,
            path: path.into_iter().map(Into::into).collect(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get<I, S>(path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Method::Get, path)
    }

    pub fn put<I, S>(path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Method::Put, path)
    }

    pub fn delete<I, S>(path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Method::Delete, path)
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// `/segment/segment` form of the path, for log lines
    pub fn display_path(&self) -> String {
        format!("/{}", self.path.join("/"))
    }
}

/// Raw response from the cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterResponse {
    pub status: u16,
    pub body: String,
}

impl ClusterResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parse the body as JSON
    pub fn json(&self) -> Result<serde_json::Value> {
        serde_json::from_str(&self.body)
            .map_err(|e| SnapshotError::MalformedResponse(format!("invalid JSON body: {e}")))
    }
}

/// Executes requests against the cluster
///
/// Implementations report only transport-level failures as errors; a non-2xx
/// answer is a successful exchange and comes back as a [`ClusterResponse`].
pub trait ClusterTransport: Send + Sync {
    fn execute(&self, request: &ClusterRequest) -> Result<ClusterResponse>;
}

/// Blocking HTTP transport backed by `reqwest`
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    base_url: reqwest::Url,
}

impl HttpTransport {
    /// Create a transport for the cluster at `base_url`
    ///
    /// `timeout` of `None` disables the client-side timeout entirely.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let base_url = reqwest::Url::parse(base_url)
            .map_err(|e| SnapshotError::Config(format!("invalid cluster URL '{base_url}': {e}")))?;

        if base_url.cannot_be_a_base() {
            return Err(SnapshotError::Config(format!(
                "cluster URL '{base_url}' cannot carry a path"
            )));
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SnapshotError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, base_url })
    }

    pub fn from_config(config: &ClusterConfig) -> Result<Self> {
        Self::new(
            &config.url,
            config.request_timeout_secs.map(Duration::from_secs),
        )
    }

    /// Cluster URL every request path is appended to
    pub fn base_url(&self) -> &reqwest::Url {
        &self.base_url
    }

    /// Full URL for a request, with path segments percent-encoded
    pub fn url_for(&self, request: &ClusterRequest) -> Result<reqwest::Url> {
        let mut url = self.base_url.clone();

        url.path_segments_mut()
            .map_err(|_| SnapshotError::Config("cluster URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(request.path.iter());

        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(request.query.iter());
        }

        Ok(url)
    }
}

impl ClusterTransport for HttpTransport {
    fn execute(&self, request: &ClusterRequest) -> Result<ClusterResponse> {
        let url = self.url_for(request)?;

        let mut builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Put => self.client.put(url),
            Method::Delete => self.client.delete(url),
        };

        if let Some(ref body) = request.body {
            let bytes = serde_json::to_vec(body)
                .map_err(|e| SnapshotError::Transport(format!("failed to encode body: {e}")))?;
            builder = builder
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(bytes);
        }

        let response = builder
            .send()
            .map_err(|e| SnapshotError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| SnapshotError::Transport(format!("failed to read response: {e}")))?;

        Ok(ClusterResponse { status, body })
    }
}
