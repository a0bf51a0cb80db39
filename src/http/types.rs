use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::kv::KeyValuePair;
use crate::constants::{CORSPROXY_IO_PREFIX, CORS_ANYWHERE_PREFIX};

/// HTTP Methods supported by the client
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 5] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Patch,
        HttpMethod::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Only POST, PUT and PATCH carry a request body
    pub fn allows_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            other => Err(format!("unsupported HTTP method: {}", other)),
        }
    }
}

/// Where the request is routed before reaching its target
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ProxySetting {
    #[default]
    None,
    CorsProxyIo,
    CorsAnywhere,
    Custom(String),
}

impl ProxySetting {
    /// The prefix to prepend to the target URL, if any
    pub fn prefix(&self) -> Option<&str> {
        let prefix = match self {
            ProxySetting::None => return None,
            ProxySetting::CorsProxyIo => CORSPROXY_IO_PREFIX,
            ProxySetting::CorsAnywhere => CORS_ANYWHERE_PREFIX,
            ProxySetting::Custom(prefix) => prefix.trim(),
        };
        if prefix.is_empty() {
            None
        } else {
            Some(prefix)
        }
    }
}

impl FromStr for ProxySetting {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "none" => Ok(ProxySetting::None),
            "corsproxy" | "corsproxy.io" => Ok(ProxySetting::CorsProxyIo),
            "cors-anywhere" | "herokuapp" => Ok(ProxySetting::CorsAnywhere),
            custom => Ok(ProxySetting::Custom(custom.to_string())),
        }
    }
}

impl fmt::Display for ProxySetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxySetting::None => f.write_str("none"),
            ProxySetting::CorsProxyIo => f.write_str("corsproxy"),
            ProxySetting::CorsAnywhere => f.write_str("cors-anywhere"),
            ProxySetting::Custom(prefix) => f.write_str(prefix),
        }
    }
}

impl Serialize for ProxySetting {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ProxySetting {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Everything needed to issue one request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub method: HttpMethod,
    pub url: String,
    /// Duplicates allowed; empty and commented-out keys are skipped on send
    pub headers: Vec<KeyValuePair>,
    pub body: String,
    pub proxy: ProxySetting,
}

impl RequestDescriptor {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: String::new(),
            proxy: ProxySetting::None,
        }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let id = self.headers.len() as u64 + 1;
        self.headers.push(KeyValuePair::new(id, key, value));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_proxy(mut self, proxy: ProxySetting) -> Self {
        self.proxy = proxy;
        self
    }
}

/// Decoded response body
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Json(serde_json::Value),
    Text(String),
}

impl ResponseBody {
    /// Pretty JSON for structured bodies, the raw text otherwise
    pub fn to_display_string(&self) -> String {
        match self {
            ResponseBody::Json(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
            ResponseBody::Text(text) => text.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            ResponseBody::Json(_) => false,
            ResponseBody::Text(text) => text.is_empty(),
        }
    }
}

/// A completed response, ready for display
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub status: u16,
    pub status_text: String,
    pub headers: BTreeMap<String, String>,
    pub body: ResponseBody,
    pub elapsed_ms: u64,
}

impl ResponseRecord {
    pub fn status_class(&self) -> StatusClass {
        StatusClass::from_status(self.status)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    Redirect,
    ClientError,
    ServerError,
    Informational,
}

impl StatusClass {
    pub fn from_status(status: u16) -> Self {
        match status {
            200..=299 => StatusClass::Success,
            300..=399 => StatusClass::Redirect,
            400..=499 => StatusClass::ClientError,
            s if s >= 500 => StatusClass::ServerError,
            _ => StatusClass::Informational,
        }
    }
}
