use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::debug;

use super::types::HttpMethod;
use crate::utils::ProbeError;

/// A request after validation, proxy rewriting and header filtering
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutgoingRequest {
    pub method: HttpMethod,
    pub url: String,
    /// Sent as-is, duplicates included
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// What came back over the wire, before normalization
#[derive(Clone, Debug)]
pub struct RawResponse {
    pub status: u16,
    pub status_text: String,
    /// In arrival order; a name may repeat
    pub headers: Vec<(String, String)>,
    pub body: String,
    /// When status and headers became available
    pub received_at: Instant,
}

/// Issues exactly one network call per dispatch
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn dispatch(&self, request: OutgoingRequest) -> Result<RawResponse, ProbeError>;
}

/// Transport backed by reqwest
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Option<Duration>) -> Result<Self, ProbeError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    fn header_map(headers: &[(String, String)]) -> Result<HeaderMap, ProbeError> {
        let mut map = HeaderMap::new();
        for (key, value) in headers {
            let name = HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
                ProbeError::InvalidInput(format!("invalid header name '{}': {}", key, e))
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                ProbeError::InvalidInput(format!("invalid value for header '{}': {}", key, e))
            })?;
            // append keeps every occurrence of a repeated name
            map.append(name, value);
        }
        Ok(map)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn dispatch(&self, request: OutgoingRequest) -> Result<RawResponse, ProbeError> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self
            .client
            .request(method, &request.url)
            .headers(Self::header_map(&request.headers)?);

        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let received_at = Instant::now();

        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.text().await?;

        debug!("{} {} -> {}", request.method, request.url, status.as_u16());

        Ok(RawResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("").to_string(),
            headers,
            body,
            received_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_map_keeps_duplicates() {
        let headers = vec![
            ("Accept".to_string(), "text/plain".to_string()),
            ("accept".to_string(), "application/json".to_string()),
        ];
        let map = ReqwestTransport::header_map(&headers).unwrap();
        assert_eq!(map.get_all("accept").iter().count(), 2);
    }

    #[test]
    fn test_header_map_rejects_invalid_name() {
        let headers = vec![("Bad Header".to_string(), "x".to_string())];
        let err = ReqwestTransport::header_map(&headers).unwrap_err();
        assert!(matches!(err, ProbeError::InvalidInput(_)));
    }
}
