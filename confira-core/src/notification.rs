//! Webhook notification parsing.
//!
//! The payment provider delivers notifications in several payload shapes and
//! re-delivers them at least once. Extraction is best-effort: a body with no
//! usable payment identifier is a recoverable no-op for the caller, never an
//! error surfaced back to the provider.

use serde_json::Value;

/// Extract the payment identifier from a raw notification body.
///
/// The body is parsed as JSON first, falling back to URL-encoded form pairs.
/// Fields are checked in priority order:
///
/// 1. `data.id`
/// 2. `data.id_payment`
/// 3. top-level `id`
/// 4. trailing path segment of `resource`, only when `topic` is `payment`
pub fn extract_payment_id(body: &[u8]) -> Option<String> {
    if let Ok(json) = serde_json::from_slice::<Value>(body) {
        return extract_from_json(&json);
    }
    extract_from_form(body)
}

fn extract_from_json(json: &Value) -> Option<String> {
    json.pointer("/data/id")
        .and_then(id_value)
        .or_else(|| json.pointer("/data/id_payment").and_then(id_value))
        .or_else(|| json.get("id").and_then(id_value))
        .or_else(|| {
            resource_tail(
                json.get("topic").and_then(Value::as_str),
                json.get("resource").and_then(Value::as_str),
            )
        })
}

fn extract_from_form(body: &[u8]) -> Option<String> {
    let pairs: Vec<(String, String)> = url::form_urlencoded::parse(body).into_owned().collect();
    let get = |key: &str| {
        pairs
            .iter()
            .find(|(k, v)| k == key && !v.is_empty())
            .map(|(_, v)| v.as_str())
    };

    get("data.id")
        .or_else(|| get("data.id_payment"))
        .or_else(|| get("id"))
        .map(str::to_owned)
        .or_else(|| resource_tail(get("topic"), get("resource")))
}

fn resource_tail(topic: Option<&str>, resource: Option<&str>) -> Option<String> {
    if topic? != "payment" {
        return None;
    }
    let tail = resource?.trim_end_matches('/').rsplit('/').next()?;
    (!tail.is_empty()).then(|| tail.to_owned())
}

/// Identifier fields may be JSON numbers or strings; both normalize to a
/// non-empty string.
pub(crate) fn id_value(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_data_id_wins() {
        let body = br#"{"id": 1, "data": {"id": 999}}"#;
        assert_eq!(extract_payment_id(body).as_deref(), Some("999"));
    }

    #[test]
    fn nested_data_id_accepts_strings() {
        let body = br#"{"data": {"id": "abc-7"}}"#;
        assert_eq!(extract_payment_id(body).as_deref(), Some("abc-7"));
    }

    #[test]
    fn alternate_nested_field_is_second_choice() {
        let body = br#"{"data": {"id_payment": "456"}}"#;
        assert_eq!(extract_payment_id(body).as_deref(), Some("456"));
    }

    #[test]
    fn top_level_id_is_third_choice() {
        let body = br#"{"id": 42, "type": "payment"}"#;
        assert_eq!(extract_payment_id(body).as_deref(), Some("42"));
    }

    #[test]
    fn resource_url_tail_requires_payment_topic() {
        let body = br#"{"topic": "payment", "resource": "https://api.example.com/v1/payments/555"}"#;
        assert_eq!(extract_payment_id(body).as_deref(), Some("555"));

        let other_topic =
            br#"{"topic": "merchant_order", "resource": "https://api.example.com/orders/555"}"#;
        assert_eq!(extract_payment_id(other_topic), None);
    }

    #[test]
    fn form_encoded_fallback() {
        assert_eq!(
            extract_payment_id(b"topic=payment&id=123").as_deref(),
            Some("123")
        );
        assert_eq!(
            extract_payment_id(b"data.id=9&type=payment").as_deref(),
            Some("9")
        );
        assert_eq!(
            extract_payment_id(b"topic=payment&resource=https%3A%2F%2Fapi.example.com%2Fv1%2Fpayments%2F77")
                .as_deref(),
            Some("77")
        );
    }

    #[test]
    fn unusable_bodies_are_none() {
        assert_eq!(extract_payment_id(b""), None);
        assert_eq!(extract_payment_id(b"{\"action\":\"created\"}"), None);
        assert_eq!(extract_payment_id(br#"{"data": {"id": ""}}"#), None);
        assert_eq!(extract_payment_id(b"\x00\xff not a payload"), None);
    }
}
