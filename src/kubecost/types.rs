//! Kubecost API request model
//!
//! Budget types double as tool inputs, so their doc comments end up as the
//! property descriptions in the generated MCP schemas. Responses are not
//! modelled here: the client hands them back as raw JSON.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// ============================================================================
// Budgets
// ============================================================================

/// Budget enforcement kind: soft only warns, hard enforces.
//
// Variants stay undocumented so the schema is a plain string enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum BudgetKind {
    Soft,
    Hard,
}

/// Budget reset cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum BudgetInterval {
    Weekly,
    Monthly,
}

/// Budget scope: which clusters, namespaces and labels the budget covers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BudgetScope {
    /// List of cluster names to apply budget to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<Vec<String>>,

    /// List of namespace names to apply budget to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<Vec<String>>,

    /// Label filters for budget scope (label key to accepted values)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<BTreeMap<String, Vec<String>>>,
}

/// Notification action fired when spend crosses a threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BudgetAction {
    /// Percentage threshold for action
    pub percentage: f64,

    /// Email addresses for notifications
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emails: Option<Vec<String>>,

    /// Slack webhook URLs for notifications
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slack_webhooks: Option<Vec<String>>,

    /// Microsoft Teams webhook URLs for notifications
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ms_teams_webhooks: Option<Vec<String>>,
}

/// Budget rule body, without the server-assigned identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BudgetSpec {
    /// Name of the budget rule
    pub name: String,

    /// Budget scope values (cluster, namespace, labels)
    pub values: BudgetScope,

    /// Budget type - soft (warnings) or hard (enforcement)
    pub kind: BudgetKind,

    /// Budget reset interval
    pub interval: BudgetInterval,

    /// Day of week (1-7) or month (1-31) for budget reset
    pub interval_day: u32,

    /// Budget limit in USD
    pub spend_limit: f64,

    /// List of actions to take when budget thresholds are reached
    pub actions: Vec<BudgetAction>,
}

/// Budget rule as submitted to the API.
///
/// The same POST creates or updates: an `id` targets an existing rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(flatten)]
    pub spec: BudgetSpec,
}

impl BudgetRule {
    /// A rule the server will create
    pub fn new(spec: BudgetSpec) -> Self {
        Self { id: None, spec }
    }

    /// A rule replacing the existing budget `id`
    pub fn with_id(id: impl Into<String>, spec: BudgetSpec) -> Self {
        Self { id: Some(id.into()), spec }
    }
}

// ============================================================================
// Reports
// ============================================================================

/// Cost allocation query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AllocationQuery {
    /// Time window for cost data (e.g., "7d", "30d", "1d")
    pub window: String,

    /// Aggregation level (e.g., "cluster", "namespace", "pod", "container")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<String>,

    /// Whether to accumulate costs over time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accumulate: Option<bool>,

    /// Filters to apply to the cost data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<BTreeMap<String, String>>,
}

impl AllocationQuery {
    pub fn new(window: impl Into<String>) -> Self {
        Self { window: window.into(), ..Default::default() }
    }

    /// Query string pairs; absent options are omitted
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![("window".to_string(), self.window.clone())];
        if let Some(aggregate) = &self.aggregate {
            pairs.push(("aggregate".to_string(), aggregate.clone()));
        }
        if let Some(accumulate) = self.accumulate {
            pairs.push(("accumulate".to_string(), accumulate.to_string()));
        }
        push_filters(&mut pairs, self.filters.as_ref());
        pairs
    }
}

/// Asset query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AssetQuery {
    /// Time window for asset data (e.g., "7d", "30d", "1d")
    pub window: String,

    /// Aggregation level (e.g., "cluster", "namespace", "type")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<String>,

    /// Filters to apply to the asset data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<BTreeMap<String, String>>,
}

impl AssetQuery {
    pub fn new(window: impl Into<String>) -> Self {
        Self { window: window.into(), ..Default::default() }
    }

    /// Query string pairs; absent options are omitted
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![("window".to_string(), self.window.clone())];
        if let Some(aggregate) = &self.aggregate {
            pairs.push(("aggregate".to_string(), aggregate.clone()));
        }
        push_filters(&mut pairs, self.filters.as_ref());
        pairs
    }
}

/// Filters use bracket notation: `filters[namespace]=kube-system`
fn push_filters(pairs: &mut Vec<(String, String)>, filters: Option<&BTreeMap<String, String>>) {
    for (key, value) in filters.into_iter().flatten() {
        pairs.push((format!("filters[{}]", key), value.clone()));
    }
}
