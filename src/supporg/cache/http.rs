use super::{CacheError, Network, Request, Response};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Blocking HTTP transport for the resource cache.
pub struct HttpNetwork {
    client: Client,
}

impl HttpNetwork {
    pub fn new() -> Result<Self, CacheError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, CacheError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CacheError::Network(e.to_string()))?;
        Ok(Self { client })
    }
}

impl Network for HttpNetwork {
    fn fetch(&self, request: &Request) -> Result<Response, CacheError> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| CacheError::Network(format!("bad method {}: {}", request.method, e)))?;
        let response = self
            .client
            .request(method, &request.url)
            .send()
            .map_err(|e| CacheError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = response
            .bytes()
            .map_err(|e| CacheError::Network(e.to_string()))?
            .to_vec();

        Ok(Response {
            status,
            content_type,
            body,
        })
    }
}
