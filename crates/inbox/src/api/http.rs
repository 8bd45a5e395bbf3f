//! reqwest-backed notification source.

use std::sync::OnceLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{
    Client, RequestBuilder, Response,
    header::{CONTENT_TYPE, COOKIE, HeaderMap, HeaderName, HeaderValue},
};
use serde::de::DeserializeOwned;
use tracing::{debug, trace, warn};
use url::Url;

use super::{MarkAllReadResponse, MarkReadResponse, NotificationApi, NotificationPage, format_since};
use crate::config::ManagerConfig;
use crate::error::{NotificationError, Result};
use crate::model::NotificationId;

/// Cookie carrying the CSRF token.
pub const CSRF_COOKIE: &str = "csrftoken";

/// Header the server expects the CSRF token in (`X-CSRFToken`).
const CSRF_HEADER_KEY: &str = "x-csrftoken";

const API_PATH: &str = "/api/notifications/";

pub fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            // Another crate got there first.
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

/// Split a `Cookie` header into name/value pairs, skipping empty parts.
pub fn parse_cookie_header(input: &str) -> Vec<(String, String)> {
    input
        .split(';')
        .filter_map(|part| {
            let part = part.trim();
            if part.is_empty() {
                return None;
            }

            let mut kv = part.splitn(2, '=');
            let name = kv.next()?.trim();
            let value = kv.next()?.trim();
            if name.is_empty() || value.is_empty() {
                return None;
            }

            Some((name.to_string(), value.to_string()))
        })
        .collect()
}

/// HTTP client for the notification endpoints.
#[derive(Debug, Clone)]
pub struct HttpNotificationApi {
    client: Client,
    base: Url,
    headers: HeaderMap,
}

impl HttpNotificationApi {
    pub fn new(config: &ManagerConfig) -> Result<Self> {
        install_rustls_provider();

        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            base: config.base()?,
            headers: build_headers(config.cookies.as_deref()),
        })
    }

    /// `csrftoken` value from the configured cookies, if any.
    pub fn csrf_token(&self) -> Option<&str> {
        self.headers
            .get(CSRF_HEADER_KEY)
            .and_then(|v| v.to_str().ok())
    }

    pub(crate) fn list_url(&self, unread_only: bool) -> Result<Url> {
        let mut url = self.base.join(API_PATH)?;
        url.query_pairs_mut()
            .append_pair("unread_only", if unread_only { "true" } else { "false" });
        Ok(url)
    }

    pub(crate) fn since_url(&self, since: Option<DateTime<Utc>>) -> Result<Url> {
        let mut url = self.base.join(API_PATH)?;
        url.query_pairs_mut()
            .append_pair("since", &format_since(since));
        Ok(url)
    }

    pub(crate) fn mark_read_url(&self, id: &NotificationId) -> Result<Url> {
        let mut url = self.base.join(API_PATH)?;
        url.path_segments_mut()
            .map_err(|_| NotificationError::config("base_url cannot be a base URL"))?
            .pop_if_empty()
            .push(id.as_str())
            .push("mark-read")
            .push("");
        Ok(url)
    }

    pub(crate) fn mark_all_read_url(&self) -> Result<Url> {
        Ok(self.base.join(API_PATH)?.join("mark-all-read/")?)
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.headers(self.headers.clone()).send().await?;
        decode(response).await
    }
}

fn build_headers(cookies: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(
        HeaderName::from_static("x-requested-with"),
        HeaderValue::from_static("XMLHttpRequest"),
    );

    let Some(cookies) = cookies.map(str::trim).filter(|c| !c.is_empty()) else {
        return headers;
    };

    match HeaderValue::from_str(cookies) {
        Ok(value) => {
            headers.insert(COOKIE, value);
        }
        Err(e) => warn!(error = %e, "Ignoring cookies that are not a valid header value"),
    }

    // Cookie values may be percent-encoded; the header wants the raw token.
    let token = parse_cookie_header(cookies)
        .into_iter()
        .find(|(name, _)| name == CSRF_COOKIE)
        .map(|(_, value)| {
            urlencoding::decode(&value)
                .map(|decoded| decoded.into_owned())
                .unwrap_or(value)
        });
    if let Some(value) = token.and_then(|t| HeaderValue::from_str(&t).ok()) {
        headers.insert(HeaderName::from_static(CSRF_HEADER_KEY), value);
    }

    headers
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(NotificationError::Status {
            status: status.as_u16(),
            body,
        });
    }

    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| NotificationError::payload(e.to_string()))
}

#[async_trait]
impl NotificationApi for HttpNotificationApi {
    async fn list(&self, unread_only: bool) -> Result<NotificationPage> {
        let url = self.list_url(unread_only)?;
        trace!(%url, "Loading notifications");
        self.execute(self.client.get(url)).await
    }

    async fn since(&self, since: Option<DateTime<Utc>>) -> Result<NotificationPage> {
        let url = self.since_url(since)?;
        trace!(%url, "Checking for new notifications");
        self.execute(self.client.get(url)).await
    }

    async fn mark_read(&self, id: &NotificationId) -> Result<MarkReadResponse> {
        let url = self.mark_read_url(id)?;
        self.execute(self.client.post(url)).await
    }

    async fn mark_all_read(&self) -> Result<MarkAllReadResponse> {
        let url = self.mark_all_read_url()?;
        self.execute(self.client.post(url)).await
    }
}
