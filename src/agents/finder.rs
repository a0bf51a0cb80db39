use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::parser::extract_json_block;
use crate::constants::JSON_CONTENT_TYPE;
use crate::http::{HttpMethod, KeyValueList, RequestDescriptor};
use crate::utils::ProbeError;

/// A public API suggested by the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoundApi {
    pub name: String,
    pub description: String,
    pub url: String,
    pub method: HttpMethod,
    /// In the order the model listed them
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    #[serde(default)]
    pub body: String,
    pub usage_explanation: String,
    pub test_in_app_example: String,
}

impl FoundApi {
    /// Load the suggestion into a request ready to send.
    ///
    /// A body without a content type gets `Content-Type: application/json`
    /// in front; a suggestion with no headers at all gets only that row.
    pub fn to_descriptor(&self) -> RequestDescriptor {
        let mut headers: KeyValueList = self
            .headers
            .iter()
            .cloned()
            .collect();

        if headers.is_empty() || (!self.body.is_empty() && !headers.contains_key("content-type")) {
            headers.prepend("Content-Type", JSON_CONTENT_TYPE);
        }

        let mut descriptor = RequestDescriptor::new(self.method, self.url.clone());
        descriptor.headers = headers.into_pairs();
        descriptor.body = self.body.clone();
        descriptor
    }
}

/// Parse the finder reply, dropping entries that are incomplete.
///
/// The reply has to be a JSON array (optionally fenced); anything else is
/// malformed. An empty result is fine: it means nothing matched.
pub fn parse_found_apis(text: &str) -> Result<Vec<FoundApi>, ProbeError> {
    let candidate = extract_json_block(text);
    let items = match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Array(items)) => items,
        Ok(_) => {
            return Err(ProbeError::MalformedAiOutput(
                "the reply was not a list of APIs".to_string(),
            ))
        }
        Err(e) => {
            return Err(ProbeError::MalformedAiOutput(format!(
                "unexpected reply format: {}",
                e
            )))
        }
    };

    let total = items.len();
    let apis: Vec<FoundApi> = items.into_iter().filter_map(found_api_from).collect();
    if apis.len() < total {
        debug!("dropped {} incomplete API suggestion(s)", total - apis.len());
    }
    Ok(apis)
}

fn found_api_from(item: Value) -> Option<FoundApi> {
    let text = |name: &str| {
        item.get(name)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let method = text("method")?.parse::<HttpMethod>().ok()?;
    let headers = item
        .get("headers")
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .map(|(k, v)| {
                    let value = match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (k.clone(), value)
                })
                .collect()
        })
        .unwrap_or_default();

    Some(FoundApi {
        name: text("name")?,
        description: text("description")?,
        url: text("url")?,
        method,
        headers,
        body: text("body").unwrap_or_default(),
        usage_explanation: text("usage_explanation")?,
        test_in_app_example: text("test_in_app_example")?,
    })
}
