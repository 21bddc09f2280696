use super::{HttpClient, envelope_success, extract_list, extract_result, resolve_zone};
use crate::ApiTransport;
use route_kit_core::{
    Configuration, Error, PageRule, PageRuleStatus, PageRuleUpdate, Result, RulePriority,
    TargetSpec,
};
use serde_json::{Map, Value, json};
use tracing::info;

/// Ordering used by [`PageRules::list`] when none is given
pub const DEFAULT_ORDER: &str = "priority";

/// Page Rules for one zone
#[derive(Debug, Clone)]
pub struct PageRules<C = HttpClient> {
    client: C,
    zone_id: String,
}

impl PageRules<HttpClient> {
    /// Page rules client using the HTTP client's own configuration for the zone default
    pub fn for_client(client: HttpClient, zone_id: Option<&str>) -> Result<Self> {
        let zone_id = resolve_zone(zone_id, client.configuration())?;
        Ok(Self { client, zone_id })
    }
}

impl<C: ApiTransport> PageRules<C> {
    /// Bind to `zone_id`, or to the configured zone when `None`
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
        format!("/zones/{}/pagerules", self.zone_id)
    }

    fn rule_path(&self, rule_id: &str) -> String {
        format!("/zones/{}/pagerules/{}", self.zone_id, rule_id)
    }

    /// All rules in the zone, optionally filtered by status
    pub async fn list(&self, status: Option<PageRuleStatus>, order: Option<&str>) -> Result<Vec<PageRule>> {
        let mut query = vec![("order", order.unwrap_or(DEFAULT_ORDER).to_string())];
        if let Some(status) = status {
            query.push(("status", status.to_string()));
        }

        let envelope = self.client.get(&self.collection_path(), &query).await?;
        extract_list(envelope)
    }

    /// Create a rule. String targets become `url matches` constraints.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] when an action isn't a JSON object.
    pub async fn create(
        &self,
        targets: Vec<TargetSpec>,
        actions: Vec<Value>,
        priority: Option<i64>,
        status: PageRuleStatus,
    ) -> Result<PageRule> {
        let mut body = Map::new();
        body.insert("targets".to_string(), normalize_targets(targets));
        body.insert("actions".to_string(), normalize_actions(actions)?);
        body.insert("status".to_string(), json!(status));
        if let Some(priority) = priority {
            body.insert("priority".to_string(), json!(priority));
        }

        let envelope = self
            .client
            .post(&self.collection_path(), Value::Object(body))
            .await?;
        let rule: PageRule = extract_result(envelope)?;
        info!(zone = %self.zone_id, rule = %rule.id, "Created page rule");
        Ok(rule)
    }

    pub async fn get(&self, rule_id: &str) -> Result<PageRule> {
        let envelope = self.client.get(&self.rule_path(rule_id), &[]).await?;
        extract_result(envelope)
    }

    /// Patch only the fields set in `changes`
    pub async fn update(&self, rule_id: &str, changes: PageRuleUpdate) -> Result<PageRule> {
        let PageRuleUpdate {
            targets,
            actions,
            priority,
            status,
        } = changes;

        let mut body = Map::new();
        if let Some(targets) = targets {
            body.insert("targets".to_string(), normalize_targets(targets));
        }
        if let Some(actions) = actions {
            body.insert("actions".to_string(), normalize_actions(actions)?);
        }
        if let Some(priority) = priority {
            body.insert("priority".to_string(), json!(priority));
        }
        if let Some(status) = status {
            body.insert("status".to_string(), json!(status));
        }

        let envelope = self
            .client
            .patch(&self.rule_path(rule_id), Value::Object(body))
            .await?;
        extract_result(envelope)
    }

    pub async fn delete(&self, rule_id: &str) -> Result<bool> {
        let envelope = self.client.delete(&self.rule_path(rule_id)).await?;
        let deleted = envelope_success(&envelope);
        info!(zone = %self.zone_id, rule = rule_id, deleted, "Deleted page rule");
        Ok(deleted)
    }

    /// Reorder rules with a single batch PATCH carrying the full list
    pub async fn update_priorities(&self, priorities: &[RulePriority]) -> Result<Vec<PageRule>> {
        let body: Vec<Value> = priorities
            .iter()
            .map(|p| json!({ "id": p.id, "priority": p.priority }))
            .collect();

        let envelope = self
            .client
            .patch(&self.collection_path(), Value::Array(body))
            .await?;
        extract_list(envelope)
    }
}

fn normalize_targets(targets: Vec<TargetSpec>) -> Value {
    Value::Array(targets.into_iter().map(normalize_target).collect())
}

fn normalize_target(target: TargetSpec) -> Value {
    match target {
        TargetSpec::Url(pattern) | TargetSpec::Raw(Value::String(pattern)) => json!({
            "target": "url",
            "constraint": {"operator": "matches", "value": pattern},
        }),
        TargetSpec::Raw(value) => value,
    }
}

fn normalize_actions(actions: Vec<Value>) -> Result<Value> {
    actions
        .into_iter()
        .map(normalize_action)
        .collect::<Result<Vec<_>>>()
        .map(Value::Array)
}

fn normalize_action(action: Value) -> Result<Value> {
    match action {
        Value::Object(_) => Ok(action),
        _ => Err(Error::InvalidArgument("Invalid action format".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloudflare::testing::RecordingTransport;
    use route_kit_core::{PageRuleAction, PageRuleTarget};

    const ZONE: &str = "test-zone-id";

    fn rules_with(responses: Vec<Value>) -> PageRules<RecordingTransport> {
        PageRules::new(
            RecordingTransport::responding(responses),
            Some(ZONE),
            &Configuration::default(),
        )
        .unwrap()
    }

    fn rule_response(id: &str) -> Value {
        json!({"success": true, "result": {"id": id, "priority": 1, "status": "active"}})
    }

    #[test]
    fn test_new_without_zone_fails() {
        let result = PageRules::new(RecordingTransport::default(), None, &Configuration::default());
        assert!(matches!(result, Err(Error::Configuration(ref msg)) if msg == "zone_id must be configured"));
    }

    #[tokio::test]
    async fn test_list_orders_by_priority() {
        let rules = rules_with(vec![json!({
            "success": true,
            "result": [{"id": "rule1", "priority": 1}, {"id": "rule2", "priority": 2}]
        })]);

        let result = rules.list(None, None).await.unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[1].id, "rule2");
        let call = &rules.client().calls()[0];
        assert_eq!(call.path, "/zones/test-zone-id/pagerules");
        assert_eq!(call.query, vec![("order".to_string(), "priority".to_string())]);
    }

    #[tokio::test]
    async fn test_list_with_status_filter() {
        let rules = rules_with(vec![json!({"success": true, "result": []})]);

        rules
            .list(Some(PageRuleStatus::Disabled), Some("status"))
            .await
            .unwrap();

        assert_eq!(
            rules.client().calls()[0].query,
            vec![
                ("order".to_string(), "status".to_string()),
                ("status".to_string(), "disabled".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_create_normalizes_string_target() {
        let rules = rules_with(vec![rule_response("new-rule")]);

        let rule = rules
            .create(
                vec!["https://example.com/images/*".into()],
                vec![
                    PageRuleAction::with_value("browser_cache_ttl", 14400).into(),
                    PageRuleAction::with_value("edge_cache_ttl", 7200).into(),
                ],
                Some(1),
                PageRuleStatus::Active,
            )
            .await
            .unwrap();

        assert_eq!(rule.id, "new-rule");
        let call = &rules.client().calls()[0];
        assert_eq!(call.method, "POST");
        assert_eq!(
            call.body,
            Some(json!({
                "targets": [{
                    "target": "url",
                    "constraint": {"operator": "matches", "value": "https://example.com/images/*"}
                }],
                "actions": [
                    {"id": "browser_cache_ttl", "value": 14400},
                    {"id": "edge_cache_ttl", "value": 7200}
                ],
                "status": "active",
                "priority": 1
            }))
        );
    }

    #[tokio::test]
    async fn test_create_passes_object_target_through() {
        let rules = rules_with(vec![rule_response("new-rule")]);
        let custom = json!({
            "target": "url",
            "constraint": {"operator": "matches", "value": "*example.com/assets/*"}
        });

        rules
            .create(
                vec![custom.clone().into()],
                vec![json!({"id": "always_online", "value": "on"})],
                None,
                PageRuleStatus::Disabled,
            )
            .await
            .unwrap();

        let body = rules.client().calls()[0].body.clone().unwrap();
        assert_eq!(body["targets"][0], custom);
        assert_eq!(body["status"], "disabled");
        assert!(body.get("priority").is_none());
    }

    #[tokio::test]
    async fn test_create_rejects_non_object_action() {
        let rules = rules_with(vec![]);

        let result = rules
            .create(
                vec!["https://example.com/*".into()],
                vec![json!("cache_everything")],
                None,
                PageRuleStatus::Active,
            )
            .await;

        match result {
            Err(Error::InvalidArgument(msg)) => assert_eq!(msg, "Invalid action format"),
            other => panic!("expected invalid argument, got {:?}", other),
        }
        assert!(rules.client().calls().is_empty());
    }

    #[tokio::test]
    async fn test_get_rule() {
        let rules = rules_with(vec![rule_response("rule123")]);

        let rule = rules.get("rule123").await.unwrap();

        assert_eq!(rule.id, "rule123");
        assert_eq!(
            rules.client().calls()[0].path,
            "/zones/test-zone-id/pagerules/rule123"
        );
    }

    #[tokio::test]
    async fn test_update_patches_supplied_fields() {
        let rules = rules_with(vec![rule_response("rule123")]);

        rules
            .update(
                "rule123",
                PageRuleUpdate {
                    targets: Some(vec![PageRuleTarget::url_matches("https://example.com/new/*").into()]),
                    status: Some(PageRuleStatus::Disabled),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let call = &rules.client().calls()[0];
        assert_eq!(call.method, "PATCH");
        assert_eq!(
            call.body,
            Some(json!({
                "targets": [{
                    "target": "url",
                    "constraint": {"operator": "matches", "value": "https://example.com/new/*"}
                }],
                "status": "disabled"
            }))
        );
    }

    #[tokio::test]
    async fn test_delete_returns_success_flag() {
        let rules = rules_with(vec![json!({"success": true, "result": {"id": "rule123"}})]);

        assert!(rules.delete("rule123").await.unwrap());
        assert_eq!(rules.client().calls()[0].method, "DELETE");
    }

    #[tokio::test]
    async fn test_update_priorities_sends_single_batch() {
        let rules = rules_with(vec![json!({
            "success": true,
            "result": [{"id": "rule1", "priority": 2}, {"id": "rule2", "priority": 1}]
        })]);

        let updated = rules
            .update_priorities(&[RulePriority::new("rule1", 2), RulePriority::new("rule2", 1)])
            .await
            .unwrap();

        assert_eq!(updated.len(), 2);
        let calls = rules.client().calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, "PATCH");
        assert_eq!(calls[0].path, "/zones/test-zone-id/pagerules");
        assert_eq!(
            calls[0].body,
            Some(json!([{"id": "rule1", "priority": 2}, {"id": "rule2", "priority": 1}]))
        );
    }
}
