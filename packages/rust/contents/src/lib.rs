//! Jupyter Server contents API client.
//!
//! Three read-only calls back the navigator:
//! - [`ContentsClient::fetch_content`] — authenticated file read, classified into a [`ContentPayload`]
//! - [`ContentsClient::list_directory`] — unauthenticated listing with `content=1`, best effort
//! - [`ContentsClient::fetch_toc`] — the companion server extension's rendered TOC fragment
//!
//! There is no caching, deduplication or retry: each call is one request.

use jbooknav_shared::{ContentPayload, DirectoryListing, NavError, Result, ServerSettings};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use tracing::{debug, error, instrument};
use url::Url;

/// User-Agent string for all requests.
const USER_AGENT: &str = concat!("jbook-nav/", env!("CARGO_PKG_VERSION"));

/// Contents API prefix, relative to the server base URL.
const CONTENTS_PREFIX: &str = "api/contents/";

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 3;

// ---------------------------------------------------------------------------
// Response shapes
// ---------------------------------------------------------------------------

/// The subset of a contents-API model we read.
#[derive(Debug, Deserialize)]
struct FileModel {
    #[serde(default)]
    content: serde_json::Value,
}

/// Body returned by the server extension's `get-toc` handler.
#[derive(Debug, Clone, Deserialize)]
pub struct TocResponse {
    /// Rendered HTML fragment.
    pub data: String,
    /// Directory the server searched from.
    #[serde(default)]
    pub cwd: Option<String>,
    /// Last segment of `cwd`.
    #[serde(default)]
    pub browser_dir: Option<String>,
}

// ---------------------------------------------------------------------------
// ContentsClient
// ---------------------------------------------------------------------------

/// HTTP client bound to one Jupyter server.
#[derive(Debug, Clone)]
pub struct ContentsClient {
    settings: ServerSettings,
    client: Client,
}

impl ContentsClient {
    /// Create a client for the given server settings.
    pub fn new(settings: ServerSettings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(settings.timeout)
            .build()
            .map_err(|e| NavError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { settings, client })
    }

    /// The settings this client was built with.
    pub fn settings(&self) -> &ServerSettings {
        &self.settings
    }

    /// `{base_url}api/contents/{path}`, each path segment percent-encoded.
    pub fn contents_url(&self, path: &str) -> Result<Url> {
        let base = self
            .settings
            .base_url
            .join(CONTENTS_PREFIX)
            .map_err(|e| NavError::config(format!("bad contents URL: {e}")))?;
        append_segments(base, path)
    }

    /// `{origin}/api/contents/{path}?content=1`.
    pub fn listing_url(&self, path: &str) -> Result<Url> {
        let base = self
            .settings
            .base_url
            .join(&format!("/{CONTENTS_PREFIX}"))
            .map_err(|e| NavError::config(format!("bad listing URL: {e}")))?;
        let mut url = append_segments(base, path)?;
        url.query_pairs_mut().append_pair("content", "1");
        Ok(url)
    }

    /// `{base_url}{namespace}/get-toc?path={browser_path}`.
    pub fn toc_url(&self, browser_path: &str) -> Result<Url> {
        let mut url = self
            .settings
            .base_url
            .join(&format!("{}/get-toc", self.settings.namespace))
            .map_err(|e| NavError::config(format!("bad TOC URL: {e}")))?;
        url.query_pairs_mut().append_pair("path", browser_path);
        Ok(url)
    }

    /// Read a file through the contents API and classify its `content` field.
    ///
    /// Transport failures and non-success statuses are returned as errors;
    /// callers decide whether to swallow them.
    #[instrument(skip_all, fields(path = %path))]
    pub async fn fetch_content(&self, path: &str) -> Result<ContentPayload> {
        let url = self.contents_url(path)?;
        debug!(%url, "fetching file contents");

        let response = self.send(self.authorized(self.client.get(url.clone()))).await?;
        let response = check_status(response, &url)?;

        let model: FileModel = response
            .json()
            .await
            .map_err(|e| NavError::parse(format!("{url}: invalid contents model: {e}")))?;

        let payload = ContentPayload::from_value(model.content);
        debug!(kind = payload.kind(), "file contents fetched");
        Ok(payload)
    }

    /// Read a file that must be plain text (Markdown, YAML).
    pub async fn fetch_text(&self, path: &str) -> Result<String> {
        match self.fetch_content(path).await? {
            ContentPayload::Text(text) => Ok(text),
            other => Err(NavError::validation(format!(
                "{path}: expected text content, got {}",
                other.kind()
            ))),
        }
    }

    /// List a directory with content included.
    ///
    /// Goes straight to the server origin without the token, so it only
    /// works where the server allows it. Any failure is logged and
    /// reported as `None`.
    #[instrument(skip_all, fields(path = %path))]
    pub async fn list_directory(&self, path: &str) -> Option<DirectoryListing> {
        match self.try_list_directory(path).await {
            Ok(listing) => {
                debug!(
                    name = %listing.name,
                    kind = %listing.kind,
                    entries = listing.entries().len(),
                    "directory listed"
                );
                Some(listing)
            }
            Err(e) => {
                error!(error = %e, "error listing directory contents");
                None
            }
        }
    }

    async fn try_list_directory(&self, path: &str) -> Result<DirectoryListing> {
        let url = self.listing_url(path)?;
        let request = self
            .client
            .get(url.clone())
            .header(CONTENT_TYPE, "application/json");

        let response = check_status(self.send(request).await?, &url)?;
        response
            .json()
            .await
            .map_err(|e| NavError::parse(format!("{url}: invalid listing: {e}")))
    }

    /// Fetch the rendered TOC fragment for the browser's current directory.
    #[instrument(skip_all, fields(browser_path = %browser_path))]
    pub async fn fetch_toc(&self, browser_path: &str) -> Result<TocResponse> {
        let url = self.toc_url(browser_path)?;
        debug!(%url, "requesting table of contents");

        let response = self.send(self.authorized(self.client.get(url.clone()))).await?;
        let response = check_status(response, &url)?;

        response
            .json()
            .await
            .map_err(|e| NavError::parse(format!("{url}: invalid TOC response: {e}")))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.settings.token {
            Some(token) => request.header(AUTHORIZATION, format!("token {token}")),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        request.send().await.map_err(|e| {
            error!(error = %e, "request failed");
            NavError::Network(e.to_string())
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Append the non-empty `/`-separated segments of `path` to `base`.
fn append_segments(mut base: Url, path: &str) -> Result<Url> {
    if base.cannot_be_a_base() {
        return Err(NavError::config(format!("{base} cannot be a base URL")));
    }
    base.path_segments_mut()
        .map_err(|_| NavError::config("cannot be a base URL"))?
        .pop_if_empty()
        .extend(path.split('/').filter(|s| !s.is_empty()));
    Ok(base)
}

/// Turn a non-success status into [`NavError::Http`].
fn check_status(response: Response, url: &Url) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(NavError::Http {
            status: status.as_u16(),
            url: url.to_string(),
        })
    }
}
