use std::time::Instant;
use tracing::debug;

use super::normalizer::normalize;
use super::transport::{OutgoingRequest, Transport};
use super::types::{ProxySetting, RequestDescriptor, ResponseRecord};
use crate::constants::DEFAULT_SCHEME_PREFIX;
use crate::utils::ProbeError;

/// Check the URL and add `https://` when no http(s) scheme is present
pub fn validate_url(raw: &str) -> Result<String, ProbeError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ProbeError::InvalidInput("URL cannot be empty.".to_string()));
    }

    let lower = trimmed.to_ascii_lowercase();
    let candidate = if lower.starts_with("http://") || lower.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("{}{}", DEFAULT_SCHEME_PREFIX, trimmed)
    };

    url::Url::parse(&candidate).map_err(|e| ProbeError::InvalidInput(e.to_string()))?;
    Ok(candidate)
}

/// Prepend the proxy prefix by plain concatenation
pub fn effective_url(url: &str, proxy: &ProxySetting) -> String {
    match proxy.prefix() {
        Some(prefix) => format!("{}{}", prefix, url),
        None => url.to_string(),
    }
}

/// Turn a descriptor into the request that actually goes out.
///
/// The URL is always validated. Without a proxy the validated form is sent;
/// behind a proxy the prefix is joined with the URL exactly as typed.
pub fn build_request(descriptor: &RequestDescriptor) -> Result<OutgoingRequest, ProbeError> {
    let validated = validate_url(&descriptor.url)?;
    let url = match descriptor.proxy.prefix() {
        Some(_) => effective_url(&descriptor.url, &descriptor.proxy),
        None => validated,
    };

    let headers = descriptor
        .headers
        .iter()
        .filter(|pair| pair.is_active())
        .map(|pair| (pair.key.clone(), pair.value.clone()))
        .collect();

    let body = if descriptor.method.allows_body() {
        Some(descriptor.body.clone())
    } else {
        None
    };

    Ok(OutgoingRequest {
        method: descriptor.method,
        url,
        headers,
        body,
    })
}

/// Sends requests built from user-editable state
pub struct RequestExecutor<T> {
    transport: T,
}

impl<T: Transport> RequestExecutor<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Issue one request; never retries
    pub async fn send(&self, descriptor: &RequestDescriptor) -> Result<ResponseRecord, ProbeError> {
        let request = build_request(descriptor)?;
        debug!(
            "sending {} {} with {} header(s)",
            request.method,
            request.url,
            request.headers.len()
        );

        let started = Instant::now();
        let raw = self.transport.dispatch(request).await?;
        let elapsed_ms = raw.received_at.saturating_duration_since(started).as_millis() as u64;

        Ok(normalize(raw, elapsed_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::transport::{MockTransport, RawResponse};
    use crate::http::types::{HttpMethod, ResponseBody};
    use mockall::predicate::function;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn ok_json(body: &str) -> RawResponse {
        RawResponse {
            status: 200,
            status_text: "OK".to_string(),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: body.to_string(),
            received_at: Instant::now(),
        }
    }

    #[test]
    fn test_validate_url_adds_scheme() {
        assert_eq!(validate_url("example.com/x").unwrap(), "https://example.com/x");
        assert_eq!(
            validate_url("HTTP://example.com").unwrap(),
            "HTTP://example.com"
        );
    }

    #[test]
    fn test_validate_url_rejects_empty_and_malformed() {
        assert!(matches!(validate_url(""), Err(ProbeError::InvalidInput(_))));
        assert!(matches!(
            validate_url("http://exa mple.com"),
            Err(ProbeError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_proxy_is_plain_concatenation() {
        let url = effective_url(
            "https://api.example.com/v1",
            &ProxySetting::Custom("https://proxy.local//".to_string()),
        );
        assert_eq!(url, "https://proxy.local//https://api.example.com/v1");
        assert_eq!(
            effective_url("https://a.b", &ProxySetting::CorsProxyIo),
            "https://corsproxy.io/?https://a.b"
        );
    }

    #[test]
    fn test_proxied_url_is_sent_as_typed() {
        let descriptor = RequestDescriptor::new(HttpMethod::Get, "example.com/x")
            .with_proxy(ProxySetting::CorsProxyIo);
        assert_eq!(
            build_request(&descriptor).unwrap().url,
            "https://corsproxy.io/?example.com/x"
        );

        let descriptor = RequestDescriptor::new(HttpMethod::Get, "https://api.example.com/v1?q=1")
            .with_proxy(ProxySetting::CorsAnywhere);
        assert_eq!(
            build_request(&descriptor).unwrap().url,
            "https://cors-anywhere.herokuapp.com/https://api.example.com/v1?q=1"
        );
    }

    #[test]
    fn test_proxied_url_still_validated() {
        let descriptor = RequestDescriptor::new(HttpMethod::Get, "   ")
            .with_proxy(ProxySetting::CorsProxyIo);
        assert!(matches!(
            build_request(&descriptor),
            Err(ProbeError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_body_dropped_for_get_and_delete() {
        for method in [HttpMethod::Get, HttpMethod::Delete] {
            let descriptor = RequestDescriptor::new(method, "https://example.com").with_body("{\"a\":1}");
            assert_eq!(build_request(&descriptor).unwrap().body, None);
        }
        for method in [HttpMethod::Post, HttpMethod::Put, HttpMethod::Patch] {
            let descriptor = RequestDescriptor::new(method, "https://example.com").with_body("{}");
            assert_eq!(build_request(&descriptor).unwrap().body, Some("{}".to_string()));
        }
    }

    #[test]
    fn test_commented_and_empty_headers_skipped() {
        let descriptor = RequestDescriptor::new(HttpMethod::Get, "https://example.com")
            .with_header("Accept", "application/json")
            .with_header("//Authorization", "Bearer secret")
            .with_header("", "orphan")
            .with_header("Accept", "text/plain");

        let request = build_request(&descriptor).unwrap();
        assert_eq!(
            request.headers,
            vec![
                ("Accept".to_string(), "application/json".to_string()),
                ("Accept".to_string(), "text/plain".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_patch_without_scheme_is_sent_over_https() {
        let mut transport = MockTransport::new();
        transport
            .expect_dispatch()
            .with(function(|req: &OutgoingRequest| {
                req.url == "https://example.com/x"
                    && req.method == HttpMethod::Patch
                    && req.body.as_deref() == Some("{}")
            }))
            .times(1)
            .returning(|_| Ok(ok_json(r#"{"patched": true}"#)));

        let executor = RequestExecutor::new(transport);
        let descriptor = RequestDescriptor::new(HttpMethod::Patch, "example.com/x").with_body("{}");
        let record = executor.send(&descriptor).await.unwrap();

        assert_eq!(record.status, 200);
        assert_eq!(record.body, ResponseBody::Json(json!({"patched": true})));
    }

    #[tokio::test]
    async fn test_invalid_url_never_dispatches() {
        let mut transport = MockTransport::new();
        transport.expect_dispatch().times(0);

        let executor = RequestExecutor::new(transport);
        let err = executor
            .send(&RequestDescriptor::new(HttpMethod::Get, ""))
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_transport_failure_becomes_error() {
        let mut transport = MockTransport::new();
        transport
            .expect_dispatch()
            .times(1)
            .returning(|_| Err(ProbeError::TransportFailure("dns error".to_string())));

        let executor = RequestExecutor::new(transport);
        let err = executor
            .send(&RequestDescriptor::new(HttpMethod::Get, "https://nowhere.invalid"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::TransportFailure(_)));
    }
}
