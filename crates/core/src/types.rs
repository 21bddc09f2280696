use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::fmt;
use std::str::FromStr;

/// Worker route: a URL pattern bound to an edge script
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Route {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub pattern: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Fields the API returns that aren't modelled here
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One page of worker routes, reshaped from the response envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteList {
    pub routes: Vec<Route>,
    pub total_count: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Partial route update; `None` fields are left unchanged on the server
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RouteUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

impl RouteUpdate {
    pub fn is_empty(&self) -> bool {
        self.pattern.is_none() && self.script.is_none() && self.enabled.is_none()
    }
}

/// Page number and size for list calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageRuleStatus {
    #[default]
    Active,
    Disabled,
}

impl PageRuleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageRuleStatus::Active => "active",
            PageRuleStatus::Disabled => "disabled",
        }
    }
}

impl fmt::Display for PageRuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PageRuleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(PageRuleStatus::Active),
            "disabled" => Ok(PageRuleStatus::Disabled),
            other => Err(format!(
                "Invalid page rule status '{}', expected active or disabled",
                other
            )),
        }
    }
}

/// Edge rule matched by URL and evaluated in priority order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageRule {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub targets: Vec<PageRuleTarget>,
    #[serde(default)]
    pub actions: Vec<PageRuleAction>,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub status: PageRuleStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_on: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_on: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageRuleTarget {
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub constraint: Constraint,
}

impl PageRuleTarget {
    /// The usual "url matches <glob>" target
    pub fn url_matches<S: Into<String>>(pattern: S) -> Self {
        Self {
            target: "url".to_string(),
            constraint: Constraint {
                operator: "matches".to_string(),
                value: pattern.into(),
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    #[serde(default)]
    pub operator: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageRuleAction {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl PageRuleAction {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self {
            id: id.into(),
            value: None,
        }
    }

    pub fn with_value<S: Into<String>, V: Into<Value>>(id: S, value: V) -> Self {
        Self {
            id: id.into(),
            value: Some(value.into()),
        }
    }
}

impl From<PageRuleAction> for Value {
    fn from(action: PageRuleAction) -> Self {
        match action.value {
            Some(value) => json!({ "id": action.id, "value": value }),
            None => json!({ "id": action.id }),
        }
    }
}

/// A page rule target as supplied by a caller.
///
/// Plain URL globs are expanded into a `url matches` target before sending;
/// raw JSON is sent as given.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetSpec {
    Url(String),
    Raw(Value),
}

impl From<&str> for TargetSpec {
    fn from(pattern: &str) -> Self {
        TargetSpec::Url(pattern.to_string())
    }
}

impl From<String> for TargetSpec {
    fn from(pattern: String) -> Self {
        TargetSpec::Url(pattern)
    }
}

impl From<Value> for TargetSpec {
    fn from(value: Value) -> Self {
        match value {
            Value::String(pattern) => TargetSpec::Url(pattern),
            other => TargetSpec::Raw(other),
        }
    }
}

impl From<PageRuleTarget> for TargetSpec {
    fn from(target: PageRuleTarget) -> Self {
        TargetSpec::Raw(json!({
            "target": target.target,
            "constraint": {
                "operator": target.constraint.operator,
                "value": target.constraint.value,
            },
        }))
    }
}

/// New priority for one page rule in a batch reorder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulePriority {
    pub id: String,
    pub priority: i64,
}

impl RulePriority {
    pub fn new<S: Into<String>>(id: S, priority: i64) -> Self {
        Self {
            id: id.into(),
            priority,
        }
    }
}

/// Partial page rule update; `None` fields are left unchanged on the server
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageRuleUpdate {
    pub targets: Option<Vec<TargetSpec>>,
    pub actions: Option<Vec<Value>>,
    pub priority: Option<i64>,
    pub status: Option<PageRuleStatus>,
}
