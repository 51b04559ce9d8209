//! Tool dispatcher
//!
//! Turns validated tool calls into Kubecost client calls and wraps the
//! outcome in a [`ToolCallResult`] envelope. Client failures and unknown
//! tool names become `isError: true` envelopes; nothing escapes as an error
//! except arguments that fail validation, which the protocol layer rejects
//! before dispatch.

use serde::Serialize;
use serde_json::Value;

use crate::kubecost::types::BudgetRule;
use crate::kubecost::{KubecostClient, KubecostError};

use super::protocol::{JsonRpcError, ToolCallResult};
use super::tools::{Tool, ToolCall};

pub const HEALTHY_MESSAGE: &str = "Kubecost API is healthy and accessible";
pub const UNHEALTHY_MESSAGE: &str = "Kubecost API is not accessible";

/// Routes tool calls to the Kubecost client
#[derive(Debug, Clone)]
pub struct Dispatcher {
    client: KubecostClient,
}

impl Dispatcher {
    pub fn new(client: KubecostClient) -> Self {
        Self { client }
    }

    /// Validate and dispatch a call by tool name.
    ///
    /// Unknown tools produce an error envelope; invalid arguments are an
    /// invalid-params protocol error.
    pub async fn call(&self, name: &str, arguments: Option<Value>) -> Result<ToolCallResult, JsonRpcError> {
        let tool = match name.parse::<Tool>() {
            Ok(tool) => tool,
            Err(e) => {
                tracing::warn!(tool = %name, "Unknown tool");
                return Ok(ToolCallResult::error(e.to_string()));
            }
        };

        let call = tool
            .parse(arguments)
            .map_err(|e| JsonRpcError::invalid_params(e.to_string()))?;

        Ok(self.dispatch(call).await)
    }

    /// Execute a validated call. Always returns an envelope.
    pub async fn dispatch(&self, call: ToolCall) -> ToolCallResult {
        let tool = call.tool();
        tracing::info!(tool = %tool, "Executing tool");

        match self.execute(call).await {
            Ok(text) => ToolCallResult::text(text),
            Err(e) => {
                let message = format!("{:#}", anyhow::Error::new(e));
                tracing::warn!(tool = %tool, error = %message, "Tool failed");
                ToolCallResult::error(message)
            }
        }
    }

    async fn execute(&self, call: ToolCall) -> Result<String, KubecostError> {
        let text = match call {
            ToolCall::ListBudgets => pretty(&self.client.list_budgets().await?),
            ToolCall::GetBudget { budget_id } => pretty(&self.client.get_budget(&budget_id).await?),
            ToolCall::CreateBudget(spec) => {
                let budget = self.client.create_or_update_budget(&BudgetRule::new(spec)).await?;
                format!("Budget created successfully: {}", pretty(&budget))
            }
            ToolCall::UpdateBudget { budget_id, spec } => {
                let budget = self
                    .client
                    .create_or_update_budget(&BudgetRule::with_id(budget_id, spec))
                    .await?;
                format!("Budget updated successfully: {}", pretty(&budget))
            }
            ToolCall::DeleteBudget { budget_id } => {
                self.client.delete_budget(&budget_id).await?;
                format!("Budget with ID {} deleted successfully", budget_id)
            }
            ToolCall::GetCostAllocation(query) => pretty(&self.client.get_cost_allocation(&query).await?),
            ToolCall::GetAssets(query) => pretty(&self.client.get_assets(&query).await?),
            ToolCall::HealthCheck => {
                if self.client.health_check().await {
                    HEALTHY_MESSAGE.to_string()
                } else {
                    UNHEALTHY_MESSAGE.to_string()
                }
            }
        };

        Ok(text)
    }
}

/// Pretty-print a response body
fn pretty<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("<unserializable response: {}>", e))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use super::*;
    use crate::mcp::protocol::INVALID_PARAMS;
    use crate::test_support::MockKubecost;

    fn budget_args() -> Value {
        json!({
            "name": "n",
            "values": { "namespace": ["default"] },
            "kind": "soft",
            "interval": "monthly",
            "intervalDay": 15,
            "spendLimit": 42.5,
            "actions": [{ "percentage": 50, "emails": ["a@example.com"] }]
        })
    }

    fn budget_response(id: &str) -> Value {
        let mut body = budget_args();
        body["id"] = json!(id);
        body["createdAt"] = json!("2024-05-01T00:00:00Z");
        body["updatedAt"] = json!("2024-05-02T00:00:00Z");
        body
    }

    async fn setup() -> (MockKubecost, Dispatcher) {
        let mock = MockKubecost::start().await;
        let dispatcher = Dispatcher::new(mock.client());
        (mock, dispatcher)
    }

    #[tokio::test]
    async fn test_unknown_tool_is_error_envelope() {
        let (mock, dispatcher) = setup().await;

        let result = dispatcher.call("drop_tables", None).await.unwrap();
        assert!(result.is_error);
        assert!(result.text_content().contains("drop_tables"));
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_list_budgets_pretty_json() {
        let (mock, dispatcher) = setup().await;
        mock.on(Method::GET, "/model/budget", StatusCode::OK, json!({ "budgets": [budget_response("b1")] }));

        let result = dispatcher.call("list_budgets", Some(json!({}))).await.unwrap();
        assert!(!result.is_error);

        let text = result.text_content();
        assert!(text.contains('\n'));
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["budgets"][0]["id"], json!("b1"));
    }

    #[tokio::test]
    async fn test_create_budget_confirmation() {
        let (mock, dispatcher) = setup().await;
        mock.on(Method::POST, "/model/budget", StatusCode::OK, budget_response("new"));

        let result = dispatcher.call("create_budget", Some(budget_args())).await.unwrap();
        assert!(!result.is_error);
        assert!(result.text_content().starts_with("Budget created successfully: "));

        let body = mock.requests()[0].json();
        assert!(body.get("id").is_none());
        assert_eq!(body["kind"], json!("soft"));
        assert_eq!(body["interval"], json!("monthly"));
    }

    #[tokio::test]
    async fn test_enum_values_forwarded_exactly() {
        for (kind, interval) in [("soft", "weekly"), ("soft", "monthly"), ("hard", "weekly"), ("hard", "monthly")] {
            let (mock, dispatcher) = setup().await;
            mock.on(Method::POST, "/model/budget", StatusCode::OK, budget_response("x"));

            let mut args = budget_args();
            args["kind"] = json!(kind);
            args["interval"] = json!(interval);
            dispatcher.call("create_budget", Some(args)).await.unwrap();

            let body = mock.requests()[0].json();
            assert_eq!(body["kind"], json!(kind));
            assert_eq!(body["interval"], json!(interval));
        }
    }

    #[tokio::test]
    async fn test_invalid_enum_rejected_before_dispatch() {
        let (mock, dispatcher) = setup().await;

        let mut args = budget_args();
        args["kind"] = json!("strict");
        let err = dispatcher.call("create_budget", Some(args)).await.unwrap_err();
        assert_eq!(err.code, INVALID_PARAMS);
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_update_budget_moves_budget_id_to_id() {
        let (mock, dispatcher) = setup().await;
        mock.on(Method::POST, "/model/budget", StatusCode::OK, budget_response("b1"));

        let mut args = budget_args();
        args["budgetId"] = json!("b1");
        let result = dispatcher.call("update_budget", Some(args)).await.unwrap();
        assert!(!result.is_error);
        assert!(result.text_content().starts_with("Budget updated successfully: "));

        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::POST);

        let body = requests[0].json();
        assert_eq!(body["id"], json!("b1"));
        assert!(body.get("budgetId").is_none());
        assert_eq!(body["name"], json!("n"));
    }

    #[tokio::test]
    async fn test_list_response_forwarded_verbatim() {
        let (mock, dispatcher) = setup().await;
        let body = json!({
            "code": 200,
            "data": [{ "id": "b1", "spendLimit": 10, "currentSpend": 7.5, "actions": null }]
        });
        mock.on(Method::GET, "/model/budget", StatusCode::OK, body.clone());

        let result = dispatcher.call("list_budgets", None).await.unwrap();
        assert!(!result.is_error);
        let parsed: Value = serde_json::from_str(&result.text_content()).unwrap();
        assert_eq!(parsed, body);
    }

    #[tokio::test]
    async fn test_report_fields_forwarded_verbatim() {
        let (mock, dispatcher) = setup().await;
        let body = json!({
            "code": 200,
            "data": [{ "name": "ns-a", "cpuCost": 1.25, "minutes": 60, "totals": { "totalCost": 3 } }]
        });
        mock.on(Method::GET, "/model/allocation", StatusCode::OK, body.clone());

        let result = dispatcher.call("get_cost_allocation", Some(json!({ "window": "1d" }))).await.unwrap();
        let parsed: Value = serde_json::from_str(&result.text_content()).unwrap();
        assert_eq!(parsed, body);
        assert!(parsed["data"][0].get("window").is_none());
    }

    #[tokio::test]
    async fn test_budget_confirmation_carries_server_body() {
        let (mock, dispatcher) = setup().await;
        let mut body = budget_response("b1");
        body["currentSpend"] = json!(7.5);
        body["spendLimit"] = json!(10);
        mock.on(Method::POST, "/model/budget", StatusCode::OK, body.clone());

        let result = dispatcher.call("create_budget", Some(budget_args())).await.unwrap();
        let text = result.text_content();
        let json_part = text.strip_prefix("Budget created successfully: ").unwrap();
        let parsed: Value = serde_json::from_str(json_part).unwrap();
        assert_eq!(parsed, body);
        assert!(parsed["spendLimit"].is_u64());
    }

    #[tokio::test]
    async fn test_delete_budget_confirmation() {
        let (mock, dispatcher) = setup().await;
        mock.on(Method::DELETE, "/model/budget/b-42", StatusCode::OK, json!({}));

        let result = dispatcher.call("delete_budget", Some(json!({ "budgetId": "b-42" }))).await.unwrap();
        assert!(!result.is_error);
        assert_eq!(result.text_content(), "Budget with ID b-42 deleted successfully");
    }

    #[tokio::test]
    async fn test_cost_allocation_forwards_window_only() {
        let (mock, dispatcher) = setup().await;
        mock.on(Method::GET, "/model/allocation", StatusCode::OK, json!({ "data": [] }));

        let result = dispatcher.call("get_cost_allocation", Some(json!({ "window": "7d" }))).await.unwrap();
        assert!(!result.is_error);
        assert_eq!(mock.requests()[0].query.as_deref(), Some("window=7d"));
    }

    #[tokio::test]
    async fn test_remote_error_becomes_error_envelope() {
        let (mock, dispatcher) = setup().await;
        mock.on(Method::GET, "/model/budget/b1", StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": "boom" }));

        let result = dispatcher.call("get_budget", Some(json!({ "budgetId": "b1" }))).await.unwrap();
        assert!(result.is_error);
        assert!(result.text_content().contains("500"));
    }

    #[tokio::test]
    async fn test_health_check_unhealthy_is_not_an_error() {
        let (mock, dispatcher) = setup().await;
        mock.on(Method::GET, "/healthz", StatusCode::BAD_GATEWAY, json!({}));

        let result = dispatcher.call("health_check", None).await.unwrap();
        assert!(!result.is_error);
        assert_eq!(result.text_content(), UNHEALTHY_MESSAGE);
    }

    #[tokio::test]
    async fn test_health_check_healthy() {
        let (mock, dispatcher) = setup().await;
        mock.on(Method::GET, "/healthz", StatusCode::OK, json!({ "status": "ok" }));

        let result = dispatcher.dispatch(ToolCall::HealthCheck).await;
        assert_eq!(result, ToolCallResult::text(HEALTHY_MESSAGE));
    }
}
