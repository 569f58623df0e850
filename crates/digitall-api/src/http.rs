// HTTP seam between the retry layer and the network.
//
// `HttpSend` is the single underlying network call the retry loop invokes.
// The production implementation wraps `reqwest`; tests substitute scripted
// responders.

use std::future::Future;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// A fully-read HTTP response.
///
/// The body is buffered inside the attempt so that a stalled body read is
/// covered by the same per-attempt timeout as the headers.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// `true` for any 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        serde_json::from_slice(&self.body).map_err(|e| {
            let body = String::from_utf8_lossy(&self.body).into_owned();
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body,
            }
        })
    }
}

/// One GET round-trip. Implementations must be cancel-safe: dropping the
/// returned future abandons the request.
pub trait HttpSend: Send + Sync {
    fn get(&self, url: &Url) -> impl Future<Output = Result<HttpResponse, Error>> + Send;
}

/// `reqwest`-backed [`HttpSend`].
#[derive(Debug, Clone)]
pub struct HttpClient {
    http: reqwest::Client,
}

impl HttpClient {
    pub fn new(transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            http: transport.build_client()?,
        })
    }
}

impl HttpSend for HttpClient {
    async fn get(&self, url: &Url) -> Result<HttpResponse, Error> {
        debug!("GET {}", url);

        let resp = self
            .http
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await?;

        trace!(status, bytes = body.len(), "response received");
        Ok(HttpResponse { status, body })
    }
}

impl<T: HttpSend + ?Sized> HttpSend for std::sync::Arc<T> {
    fn get(&self, url: &Url) -> impl Future<Output = Result<HttpResponse, Error>> + Send {
        (**self).get(url)
    }
}
