use std::collections::BTreeMap;

use super::transport::RawResponse;
use super::types::{ResponseBody, ResponseRecord};
use crate::constants::JSON_CONTENT_TYPE;

/// Package a raw response into a display-ready record.
///
/// Header names are lowercased and the last occurrence of a name wins.
/// Bodies declared as JSON are parsed; anything that fails to parse falls
/// back to the raw text. No size limit is applied here.
pub fn normalize(raw: RawResponse, elapsed_ms: u64) -> ResponseRecord {
    let mut headers = BTreeMap::new();
    for (name, value) in raw.headers {
        headers.insert(name.to_ascii_lowercase(), value);
    }

    let is_json = headers
        .get("content-type")
        .map(|ct| ct.to_ascii_lowercase().contains(JSON_CONTENT_TYPE))
        .unwrap_or(false);

    let body = if is_json {
        match serde_json::from_str(&raw.body) {
            Ok(value) => ResponseBody::Json(value),
            Err(_) => ResponseBody::Text(raw.body),
        }
    } else {
        ResponseBody::Text(raw.body)
    };

    ResponseRecord {
        status: raw.status,
        status_text: raw.status_text,
        headers,
        body,
        elapsed_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::time::Instant;

    fn raw(headers: &[(&str, &str)], body: &str) -> RawResponse {
        RawResponse {
            status: 200,
            status_text: "OK".to_string(),
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body: body.to_string(),
            received_at: Instant::now(),
        }
    }

    #[test]
    fn test_json_body_is_parsed() {
        let record = normalize(
            raw(
                &[("Content-Type", "application/json; charset=utf-8")],
                r#"{"id": 1, "tags": ["a", "b"], "done": false}"#,
            ),
            12,
        );

        let expected = json!({"done": false, "tags": ["a", "b"], "id": 1});
        assert_eq!(record.body, ResponseBody::Json(expected.clone()));

        // Re-serializing yields equivalent JSON regardless of key order
        let reparsed: serde_json::Value =
            serde_json::from_str(&record.body.to_display_string()).unwrap();
        assert_eq!(reparsed, expected);
        assert_eq!(record.elapsed_ms, 12);
    }

    #[test]
    fn test_empty_json_body_falls_back_to_text() {
        let record = normalize(raw(&[("content-type", "application/json")], ""), 0);
        assert_eq!(record.body, ResponseBody::Text(String::new()));
    }

    #[test]
    fn test_invalid_json_kept_verbatim() {
        let record = normalize(raw(&[("content-type", "application/json")], "{oops"), 0);
        assert_eq!(record.body, ResponseBody::Text("{oops".to_string()));
    }

    #[test]
    fn test_non_json_content_type_stays_text() {
        let record = normalize(raw(&[("content-type", "text/plain")], r#"{"a":1}"#), 0);
        assert_eq!(record.body, ResponseBody::Text(r#"{"a":1}"#.to_string()));

        let record = normalize(raw(&[], "[1,2]"), 0);
        assert_eq!(record.body, ResponseBody::Text("[1,2]".to_string()));
    }

    #[test]
    fn test_duplicate_headers_last_wins() {
        let record = normalize(
            raw(
                &[
                    ("Set-Cookie", "a=1"),
                    ("X-Request-Id", "abc"),
                    ("set-cookie", "b=2"),
                ],
                "",
            ),
            0,
        );
        assert_eq!(record.headers.len(), 2);
        assert_eq!(record.headers["set-cookie"], "b=2");
        assert_eq!(record.headers["x-request-id"], "abc");
    }
}
