//! `reqwest`-backed transport.

use std::future::Future;

use reqwest::{Client, Url};

use crate::error::TransportError;
use crate::transport::{HttpResponse, Transport};

/// HTTP client resolving relative URLs (the same-origin confirmation path)
/// against the landing page URL, as a browser would.
#[derive(Clone, Debug, Default)]
pub struct HttpTransport {
    client: Client,
    base: Option<Url>,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base(base: &str) -> Result<Self, TransportError> {
        let base = Url::parse(base).map_err(|error| TransportError::InvalidUrl {
            url: base.to_owned(),
            reason: error.to_string(),
        })?;
        Ok(Self {
            client: Client::new(),
            base: Some(base),
        })
    }

    pub fn resolve(&self, url: &str) -> Result<Url, TransportError> {
        let resolved = match &self.base {
            Some(base) => base.join(url),
            None => Url::parse(url),
        };
        resolved.map_err(|error| TransportError::InvalidUrl {
            url: url.to_owned(),
            reason: error.to_string(),
        })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> impl Future<Output = Result<HttpResponse, TransportError>> {
        let target = self.resolve(url);
        let client = self.client.clone();
        let url = url.to_owned();
        async move {
            let network = |error: reqwest::Error| TransportError::Network {
                url: url.clone(),
                reason: error.to_string(),
            };
            let response = client.get(target?).send().await.map_err(network)?;
            let status = response.status().as_u16();
            let body = response.text().await.map_err(network)?;
            Ok(HttpResponse::new(status, body))
        }
    }
}
