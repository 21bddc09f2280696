// Cloudflare API client and zone-scoped resources

mod client;
mod page_rules;
mod routes;

pub use client::{BASE_URL, HttpClient};
pub use page_rules::{DEFAULT_ORDER, PageRules};
pub use routes::{Routes, validate_pattern};

use route_kit_core::{Configuration, Error, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// Entry point bundling one configuration with client constructors.
///
/// Every call returns a fresh client bound to the same configuration.
#[derive(Debug, Clone)]
pub struct Cloudflare {
    config: Arc<Configuration>,
    base_url: String,
}

impl Cloudflare {
    pub fn new(config: Configuration) -> Self {
        Self::with_base_url(config, BASE_URL)
    }

    pub fn with_base_url(config: Configuration, base_url: impl Into<String>) -> Self {
        Self {
            config: Arc::new(config),
            base_url: base_url.into(),
        }
    }

    pub fn configuration(&self) -> &Configuration {
        &self.config
    }

    pub fn client(&self) -> HttpClient {
        HttpClient::with_base_url(self.config.clone(), self.base_url.clone())
    }

    /// Worker routes for `zone_id`, or for the configured zone
    pub fn routes(&self, zone_id: Option<&str>) -> Result<Routes<HttpClient>> {
        Routes::new(self.client(), zone_id, &self.config)
    }

    /// Page rules for `zone_id`, or for the configured zone
    pub fn page_rules(&self, zone_id: Option<&str>) -> Result<PageRules<HttpClient>> {
        PageRules::new(self.client(), zone_id, &self.config)
    }
}

/// Explicit zone first, then the configured one
fn resolve_zone(zone_id: Option<&str>, config: &Configuration) -> Result<String> {
    zone_id
        .or(config.zone_id.as_deref())
        .filter(|zone| !zone.is_empty())
        .map(str::to_string)
        .ok_or_else(|| Error::Configuration("zone_id must be configured".to_string()))
}

/// Decode the envelope's `result` field
fn extract_result<T: DeserializeOwned>(mut envelope: Value) -> Result<T> {
    let result = envelope
        .get_mut("result")
        .map(Value::take)
        .unwrap_or(Value::Null);

    if result.is_null() {
        return Err(Error::UnexpectedResponse(
            "response envelope has no result".to_string(),
        ));
    }

    serde_json::from_value(result)
        .map_err(|e| Error::UnexpectedResponse(format!("could not decode result: {}", e)))
}

/// Envelope `result` as a list; a missing or null result is an empty list
fn extract_list<T: DeserializeOwned>(mut envelope: Value) -> Result<Vec<T>> {
    match envelope.get_mut("result").map(Value::take) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(result) => serde_json::from_value(result)
            .map_err(|e| Error::UnexpectedResponse(format!("could not decode result: {}", e))),
    }
}

fn envelope_success(envelope: &Value) -> bool {
    envelope
        .get("success")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolve_zone_prefers_explicit() {
        let config = Configuration::configure(|c| c.zone_id = Some("config-zone".to_string()));
        assert_eq!(resolve_zone(Some("custom-zone"), &config).unwrap(), "custom-zone");
        assert_eq!(resolve_zone(None, &config).unwrap(), "config-zone");
    }

    #[test]
    fn test_resolve_zone_requires_a_zone() {
        let err = resolve_zone(None, &Configuration::default()).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert_eq!(err.to_string(), "zone_id must be configured");
    }

    #[test]
    fn test_facade_builds_clients() {
        let cloudflare = Cloudflare::new(Configuration::configure(|c| {
            c.api_token = Some("token".to_string());
            c.zone_id = Some("test-zone".to_string());
        }));

        assert_eq!(cloudflare.client().base_url(), BASE_URL);
        assert_eq!(cloudflare.routes(None).unwrap().zone_id(), "test-zone");
        assert_eq!(
            cloudflare.page_rules(Some("custom-zone")).unwrap().zone_id(),
            "custom-zone"
        );
    }

    #[test]
    fn test_facade_without_zone_fails() {
        let cloudflare = Cloudflare::new(Configuration::default());
        assert!(cloudflare.routes(None).is_err());
        assert!(cloudflare.page_rules(None).is_err());
        assert!(cloudflare.routes(Some("explicit")).is_ok());
    }

    #[test]
    fn test_extract_result() {
        let value: Value = extract_result(json!({"success": true, "result": {"id": "x"}})).unwrap();
        assert_eq!(value, json!({"id": "x"}));

        let missing: Result<Value> = extract_result(json!({"success": true}));
        assert!(matches!(missing, Err(Error::UnexpectedResponse(_))));
    }

    #[test]
    fn test_extract_list_treats_null_as_empty() {
        let list: Vec<Value> = extract_list(json!({"result": null})).unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn test_envelope_success() {
        assert!(envelope_success(&json!({"success": true})));
        assert!(!envelope_success(&json!({"success": false})));
        assert!(!envelope_success(&Value::Null));
    }
}
