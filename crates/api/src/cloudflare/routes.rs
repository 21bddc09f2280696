use super::{HttpClient, envelope_success, extract_list, extract_result, resolve_zone};
use crate::ApiTransport;
use once_cell::sync::Lazy;
use regex::Regex;
use route_kit_core::{Configuration, Pagination, Result, Route, RouteList, RouteUpdate};
use serde_json::{Map, Value, json};
use tracing::info;

static ROUTE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://[^/]+/.*$").expect("route pattern regex is valid"));

/// Check a route pattern locally: protocol, host, and something after the host.
///
/// ```
/// use route_kit_api::cloudflare::validate_pattern;
///
/// assert!(validate_pattern(Some("https://example.com/*")));
/// assert!(!validate_pattern(Some("example.com/*")));
/// assert!(!validate_pattern(None));
/// ```
pub fn validate_pattern(pattern: Option<&str>) -> bool {
    match pattern {
        None | Some("") => false,
        Some(pattern) => ROUTE_PATTERN.is_match(pattern),
    }
}

/// Workers Routes for one zone
#[derive(Debug, Clone)]
pub struct Routes<C = HttpClient> {
    client: C,
    zone_id: String,
}

impl Routes<HttpClient> {
    /// Routes client using the HTTP client's own configuration for the zone default
    pub fn for_client(client: HttpClient, zone_id: Option<&str>) -> Result<Self> {
        let zone_id = resolve_zone(zone_id, client.configuration())?;
        Ok(Self { client, zone_id })
    }
}

impl<C: ApiTransport> Routes<C> {
    /// Bind to `zone_id`, or to the configured zone when `None`.
    ///
    /// # Errors
    ///
    /// [`route_kit_core::Error::Configuration`] when neither is set.
    pub fn new(client: C, zone_id: Option<&str>, config: &Configuration) -> Result<Self> {
        let zone_id = resolve_zone(zone_id, config)?;
        Ok(Self { client, zone_id })
    }

    pub fn zone_id(&self) -> &str {
        &self.zone_id
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    fn collection_path(&self) -> String {
        format!("/zones/{}/workers/routes", self.zone_id)
    }

    fn route_path(&self, route_id: &str) -> String {
        format!("/zones/{}/workers/routes/{}", self.zone_id, route_id)
    }

    /// One page of routes with the envelope's paging info
    pub async fn list(&self, pagination: Pagination) -> Result<RouteList> {
        let query = [
            ("page", pagination.page.to_string()),
            ("per_page", pagination.per_page.to_string()),
        ];
        let envelope = self.client.get(&self.collection_path(), &query).await?;

        let info = envelope.get("result_info").cloned().unwrap_or(Value::Null);
        let routes: Vec<Route> = extract_list(envelope)?;
        let count = |field: &str, fallback: u64| {
            info.get(field).and_then(Value::as_u64).unwrap_or(fallback)
        };

        Ok(RouteList {
            total_count: count("total_count", routes.len() as u64),
            page: count("page", u64::from(pagination.page)),
            per_page: count("per_page", u64::from(pagination.per_page)),
            routes,
        })
    }

    /// Create a route; `script` is omitted from the request when `None`
    pub async fn create(&self, pattern: &str, script: Option<&str>, enabled: bool) -> Result<Route> {
        let mut body = Map::new();
        body.insert("pattern".to_string(), json!(pattern));
        body.insert("enabled".to_string(), json!(enabled));
        if let Some(script) = script {
            body.insert("script".to_string(), json!(script));
        }

        let envelope = self
            .client
            .post(&self.collection_path(), Value::Object(body))
            .await?;
        let route: Route = extract_result(envelope)?;
        info!(zone = %self.zone_id, route = %route.id, pattern, "Created worker route");
        Ok(route)
    }

    pub async fn get(&self, route_id: &str) -> Result<Route> {
        let envelope = self.client.get(&self.route_path(route_id), &[]).await?;
        extract_result(envelope)
    }

    /// Send only the fields set in `changes`
    pub async fn update(&self, route_id: &str, changes: &RouteUpdate) -> Result<Route> {
        let body = serde_json::to_value(changes)
            .map_err(|e| route_kit_core::Error::InvalidArgument(e.to_string()))?;
        let envelope = self.client.put(&self.route_path(route_id), body).await?;
        extract_result(envelope)
    }

    /// Delete a route and report the envelope's `success` flag
    pub async fn delete(&self, route_id: &str) -> Result<bool> {
        let envelope = self.client.delete(&self.route_path(route_id)).await?;
        let deleted = envelope_success(&envelope);
        info!(zone = %self.zone_id, route = route_id, deleted, "Deleted worker route");
        Ok(deleted)
    }

    pub fn validate_pattern(&self, pattern: Option<&str>) -> bool {
        validate_pattern(pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloudflare::testing::RecordingTransport;
    use route_kit_core::Error;

    const ZONE: &str = "test-zone-id";

    fn routes_with(responses: Vec<Value>) -> Routes<RecordingTransport> {
        Routes::new(
            RecordingTransport::responding(responses),
            Some(ZONE),
            &Configuration::default(),
        )
        .unwrap()
    }

    fn list_response() -> Value {
        json!({
            "success": true,
            "result": [{
                "id": "route1",
                "pattern": "https://example.com/*",
                "script": "worker-script",
                "enabled": true
            }],
            "result_info": {"page": 1, "per_page": 50, "total_count": 1}
        })
    }

    #[test]
    fn test_new_uses_configured_zone() {
        let config = Configuration::configure(|c| c.zone_id = Some("config-zone".to_string()));
        let routes = Routes::new(RecordingTransport::default(), None, &config).unwrap();
        assert_eq!(routes.zone_id(), "config-zone");
    }

    #[test]
    fn test_new_without_zone_fails() {
        let result = Routes::new(RecordingTransport::default(), None, &Configuration::default());
        match result {
            Err(Error::Configuration(msg)) => assert_eq!(msg, "zone_id must be configured"),
            other => panic!("expected configuration error, got {:?}", other.map(|r| r.zone_id)),
        }
    }

    #[test]
    fn test_for_client_reads_client_configuration() {
        let client = HttpClient::new(Configuration::configure(|c| {
            c.zone_id = Some("client-zone".to_string());
        }));
        let routes = Routes::for_client(client, None).unwrap();
        assert_eq!(routes.zone_id(), "client-zone");
    }

    #[tokio::test]
    async fn test_list_reshapes_envelope() {
        let routes = routes_with(vec![list_response()]);

        let result = routes.list(Pagination::default()).await.unwrap();

        assert_eq!(result.routes.len(), 1);
        assert_eq!(result.routes[0].id, "route1");
        assert_eq!(result.total_count, 1);
        assert_eq!(result.page, 1);
        assert_eq!(result.per_page, 50);

        let calls = routes.client().calls();
        assert_eq!(calls[0].method, "GET");
        assert_eq!(calls[0].path, "/zones/test-zone-id/workers/routes");
        assert_eq!(
            calls[0].query,
            vec![
                ("page".to_string(), "1".to_string()),
                ("per_page".to_string(), "50".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_list_forwards_pagination() {
        let routes = routes_with(vec![list_response()]);

        routes
            .list(Pagination {
                page: 2,
                per_page: 100,
            })
            .await
            .unwrap();

        assert_eq!(
            routes.client().calls()[0].query,
            vec![
                ("page".to_string(), "2".to_string()),
                ("per_page".to_string(), "100".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_list_without_result_info_falls_back() {
        let routes = routes_with(vec![json!({"success": true, "result": []})]);

        let result = routes
            .list(Pagination {
                page: 3,
                per_page: 10,
            })
            .await
            .unwrap();

        assert!(result.routes.is_empty());
        assert_eq!(result.total_count, 0);
        assert_eq!(result.page, 3);
        assert_eq!(result.per_page, 10);
    }

    #[tokio::test]
    async fn test_create_with_script() {
        let routes = routes_with(vec![json!({"result": {"id": "new-route"}})]);

        let route = routes
            .create("https://example.com/api/*", Some("api-worker"), true)
            .await
            .unwrap();

        assert_eq!(route.id, "new-route");
        let call = &routes.client().calls()[0];
        assert_eq!(call.method, "POST");
        assert_eq!(
            call.body,
            Some(json!({"pattern": "https://example.com/api/*", "script": "api-worker", "enabled": true}))
        );
    }

    #[tokio::test]
    async fn test_create_without_script_and_disabled() {
        let routes = routes_with(vec![json!({"result": {"id": "new-route"}})]);

        routes
            .create("https://example.com/test/*", None, false)
            .await
            .unwrap();

        assert_eq!(
            routes.client().calls()[0].body,
            Some(json!({"pattern": "https://example.com/test/*", "enabled": false}))
        );
    }

    #[tokio::test]
    async fn test_get_route() {
        let routes = routes_with(vec![json!({
            "result": {"id": "route123", "pattern": "https://example.com/*"}
        })]);

        let route = routes.get("route123").await.unwrap();

        assert_eq!(route.id, "route123");
        assert_eq!(route.pattern, "https://example.com/*");
        assert_eq!(
            routes.client().calls()[0].path,
            "/zones/test-zone-id/workers/routes/route123"
        );
    }

    #[tokio::test]
    async fn test_update_sends_only_supplied_fields() {
        let routes = routes_with(vec![json!({"result": {"id": "route123"}})]);

        let changes = RouteUpdate {
            pattern: Some("https://example.com/new/*".to_string()),
            enabled: Some(false),
            ..Default::default()
        };
        routes.update("route123", &changes).await.unwrap();

        let call = &routes.client().calls()[0];
        assert_eq!(call.method, "PUT");
        assert_eq!(
            call.body,
            Some(json!({"pattern": "https://example.com/new/*", "enabled": false}))
        );
    }

    #[tokio::test]
    async fn test_delete_returns_success_flag() {
        let routes = routes_with(vec![json!({"success": true, "result": {"id": "route123"}})]);

        assert!(routes.delete("route123").await.unwrap());
        assert_eq!(routes.client().calls()[0].method, "DELETE");
    }

    #[tokio::test]
    async fn test_missing_result_is_unexpected_response() {
        let routes = routes_with(vec![json!({"success": true})]);
        let result = routes.get("route123").await;
        assert!(matches!(result, Err(Error::UnexpectedResponse(_))));
    }

    #[test]
    fn test_validate_pattern_accepts() {
        assert!(validate_pattern(Some("https://example.com/*")));
        assert!(validate_pattern(Some("http://example.com/api/*")));
        assert!(validate_pattern(Some("https://sub.example.com/path/*")));
    }

    #[test]
    fn test_validate_pattern_rejects() {
        assert!(!validate_pattern(None));
        assert!(!validate_pattern(Some("")));
        assert!(!validate_pattern(Some("example.com/*")));
        assert!(!validate_pattern(Some("https://")));
        assert!(!validate_pattern(Some("/path/*")));
        assert!(!validate_pattern(Some("https://example.com")));
    }
}
