//! Tool registry
//!
//! Every tool is defined once: a name, a description and a typed input.
//! The advertised JSON schema is derived from the input type via
//! `JsonSchema`, and argument validation is deserialising into that same
//! type, so the two cannot drift apart.

use std::fmt;
use std::str::FromStr;

use schemars::gen::SchemaSettings;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::kubecost::types::{AllocationQuery, AssetQuery, BudgetSpec};

use super::protocol::ToolInfo;

// ============================================================================
// Tool Inputs
// ============================================================================

/// Tools that take no arguments
#[derive(Debug, Deserialize, JsonSchema)]
pub struct NoInput {}

/// Input for tools addressing a single budget
#[derive(Debug, Deserialize, JsonSchema)]
pub struct BudgetIdInput {
    /// The ID of the budget rule
    #[serde(rename = "budgetId")]
    pub budget_id: String,
}

/// Input for update_budget: the target id plus the full replacement rule
#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateBudgetInput {
    /// The ID of the budget rule to update
    #[serde(rename = "budgetId")]
    pub budget_id: String,

    #[serde(flatten)]
    pub spec: BudgetSpec,
}

// ============================================================================
// Tool Definitions
// ============================================================================

/// Argument validation failure
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for tool {tool}: {source}")]
    InvalidArguments {
        tool: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Every tool this server exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    ListBudgets,
    GetBudget,
    CreateBudget,
    UpdateBudget,
    DeleteBudget,
    GetCostAllocation,
    GetAssets,
    HealthCheck,
}

impl Tool {
    /// All tools, in tools/list order
    pub const ALL: [Tool; 8] = [
        Tool::ListBudgets,
        Tool::GetBudget,
        Tool::CreateBudget,
        Tool::UpdateBudget,
        Tool::DeleteBudget,
        Tool::GetCostAllocation,
        Tool::GetAssets,
        Tool::HealthCheck,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Tool::ListBudgets => "list_budgets",
            Tool::GetBudget => "get_budget",
            Tool::CreateBudget => "create_budget",
            Tool::UpdateBudget => "update_budget",
            Tool::DeleteBudget => "delete_budget",
            Tool::GetCostAllocation => "get_cost_allocation",
            Tool::GetAssets => "get_assets",
            Tool::HealthCheck => "health_check",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Tool::ListBudgets => "List all budget rules in Kubecost",
            Tool::GetBudget => "Get detailed information about a specific budget rule",
            Tool::CreateBudget => "Create a new budget rule in Kubecost",
            Tool::UpdateBudget => {
                "Update an existing budget rule in Kubecost. \
                 The rule is replaced as a whole, so all budget fields are required."
            }
            Tool::DeleteBudget => "Delete a budget rule from Kubecost",
            Tool::GetCostAllocation => "Get cost allocation data from Kubecost",
            Tool::GetAssets => "Get asset data from Kubecost",
            Tool::HealthCheck => "Check if Kubecost API is healthy and accessible",
        }
    }

    /// JSON schema for the tool's arguments
    pub fn input_schema(self) -> Value {
        match self {
            Tool::ListBudgets | Tool::HealthCheck => schema_of::<NoInput>(),
            Tool::GetBudget | Tool::DeleteBudget => schema_of::<BudgetIdInput>(),
            Tool::CreateBudget => schema_of::<BudgetSpec>(),
            Tool::UpdateBudget => schema_of::<UpdateBudgetInput>(),
            Tool::GetCostAllocation => schema_of::<AllocationQuery>(),
            Tool::GetAssets => schema_of::<AssetQuery>(),
        }
    }

    pub fn info(self) -> ToolInfo {
        ToolInfo {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }

    /// Validate arguments into a typed call. Missing or null arguments count as `{}`.
    pub fn parse(self, arguments: Option<Value>) -> Result<ToolCall, ToolError> {
        let args = match arguments {
            None | Some(Value::Null) => json!({}),
            Some(args) => args,
        };

        let call = match self {
            Tool::ListBudgets => {
                self.input::<NoInput>(args)?;
                ToolCall::ListBudgets
            }
            Tool::GetBudget => ToolCall::GetBudget {
                budget_id: self.input::<BudgetIdInput>(args)?.budget_id,
            },
            Tool::CreateBudget => ToolCall::CreateBudget(self.input(args)?),
            Tool::UpdateBudget => {
                let input: UpdateBudgetInput = self.input(args)?;
                ToolCall::UpdateBudget {
                    budget_id: input.budget_id,
                    spec: input.spec,
                }
            }
            Tool::DeleteBudget => ToolCall::DeleteBudget {
                budget_id: self.input::<BudgetIdInput>(args)?.budget_id,
            },
            Tool::GetCostAllocation => ToolCall::GetCostAllocation(self.input(args)?),
            Tool::GetAssets => ToolCall::GetAssets(self.input(args)?),
            Tool::HealthCheck => {
                self.input::<NoInput>(args)?;
                ToolCall::HealthCheck
            }
        };

        Ok(call)
    }

    fn input<T: DeserializeOwned>(self, args: Value) -> Result<T, ToolError> {
        serde_json::from_value(args).map_err(|source| ToolError::InvalidArguments {
            tool: self.name(),
            source,
        })
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Tool {
    type Err = ToolError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Tool::ALL
            .into_iter()
            .find(|tool| tool.name() == name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))
    }
}

/// Generate an inline (no `$ref`) object schema for a tool input
fn schema_of<T: JsonSchema>() -> Value {
    let generator = SchemaSettings::draft07()
        .with(|s| {
            s.inline_subschemas = true;
            s.option_add_null_type = false;
        })
        .into_generator();
    let root = generator.into_root_schema_for::<T>();

    let mut schema = serde_json::to_value(root.schema).unwrap_or(Value::Null);
    if let Some(obj) = schema.as_object_mut() {
        obj.remove("title");
        obj.entry("properties").or_insert_with(|| json!({}));
    }
    schema
}

// ============================================================================
// Validated Calls
// ============================================================================

/// A tool invocation whose arguments passed validation
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    ListBudgets,
    GetBudget { budget_id: String },
    CreateBudget(BudgetSpec),
    UpdateBudget { budget_id: String, spec: BudgetSpec },
    DeleteBudget { budget_id: String },
    GetCostAllocation(AllocationQuery),
    GetAssets(AssetQuery),
    HealthCheck,
}

impl ToolCall {
    pub fn tool(&self) -> Tool {
        match self {
            ToolCall::ListBudgets => Tool::ListBudgets,
            ToolCall::GetBudget { .. } => Tool::GetBudget,
            ToolCall::CreateBudget(_) => Tool::CreateBudget,
            ToolCall::UpdateBudget { .. } => Tool::UpdateBudget,
            ToolCall::DeleteBudget { .. } => Tool::DeleteBudget,
            ToolCall::GetCostAllocation(_) => Tool::GetCostAllocation,
            ToolCall::GetAssets(_) => Tool::GetAssets,
            ToolCall::HealthCheck => Tool::HealthCheck,
        }
    }
}
