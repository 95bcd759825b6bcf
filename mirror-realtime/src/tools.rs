//! Tool handlers and the registry that dispatches function calls to them.

use crate::config::FunctionDeclaration;
use crate::error::ToolExecutionError;
use crate::events::{FunctionCall, FunctionResponse, Scheduling, ToolResponse};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::Instrument;

/// Result of a successful tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    /// Payload returned to the model.
    pub result: Value,
    /// When the model should act on it.
    pub scheduling: Scheduling,
}

impl ToolOutcome {
    /// `{result: "ok"}`, scheduled when idle.
    pub fn ok() -> Self {
        Self::new(json!({ "result": "ok" }))
    }

    /// Arbitrary payload, scheduled when idle.
    pub fn new(result: Value) -> Self {
        Self { result, scheduling: Scheduling::WhenIdle }
    }

    /// Override the scheduling hint.
    pub fn with_scheduling(mut self, scheduling: Scheduling) -> Self {
        self.scheduling = scheduling;
        self
    }
}

impl Default for ToolOutcome {
    fn default() -> Self {
        Self::ok()
    }
}

/// Result type returned by tool handlers.
pub type ToolResult = std::result::Result<ToolOutcome, ToolExecutionError>;

/// Handler for one named function.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Run the call.
    async fn call(&self, call: &FunctionCall) -> ToolResult;
}

/// A simple function-based tool handler.
pub struct FnToolHandler<F>
where
    F: Fn(&FunctionCall) -> ToolResult + Send + Sync,
{
    handler: F,
}

impl<F> FnToolHandler<F>
where
    F: Fn(&FunctionCall) -> ToolResult + Send + Sync,
{
    /// Create a new function-based tool handler.
    pub fn new(handler: F) -> Self {
        Self { handler }
    }
}

#[async_trait]
impl<F> ToolHandler for FnToolHandler<F>
where
    F: Fn(&FunctionCall) -> ToolResult + Send + Sync,
{
    async fn call(&self, call: &FunctionCall) -> ToolResult {
        (self.handler)(call)
    }
}

/// Name-keyed handler table.
///
/// Declarations keep registration order so the setup message is stable.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    declarations: Vec<FunctionDeclaration>,
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any previous handler with the same name.
    pub fn register(&mut self, declaration: FunctionDeclaration, handler: Arc<dyn ToolHandler>) {
        let name = declaration.name.clone();
        if self.handlers.insert(name.clone(), handler).is_some() {
            self.declarations.retain(|d| d.name != name);
        }
        self.declarations.push(declaration);
    }

    /// Register a tool (builder style).
    pub fn with_tool(
        mut self,
        declaration: FunctionDeclaration,
        handler: impl ToolHandler + 'static,
    ) -> Self {
        self.register(declaration, Arc::new(handler));
        self
    }

    /// Register a tool with a sync function handler.
    pub fn with_tool_fn<F>(self, declaration: FunctionDeclaration, handler: F) -> Self
    where
        F: Fn(&FunctionCall) -> ToolResult + Send + Sync + 'static,
    {
        self.with_tool(declaration, FnToolHandler::new(handler))
    }

    /// Declarations in registration order.
    pub fn declarations(&self) -> &[FunctionDeclaration] {
        &self.declarations
    }

    /// Whether a handler is registered for `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run one call in place and build its response.
    pub async fn dispatch(&self, call: &FunctionCall) -> FunctionResponse {
        let Some(handler) = self.handlers.get(&call.name).cloned() else {
            tracing::warn!(tool = %call.name, call_id = %call.id, "Unknown tool");
            return FunctionResponse::error(call, "Unknown tool");
        };
        run_handler(handler, call).await
    }

    /// Run every call of a batch concurrently and collect the responses in
    /// call order.
    ///
    /// Each handler runs on its own task, so a failing or panicking handler
    /// only affects its own response.
    pub async fn dispatch_all(&self, calls: Vec<FunctionCall>) -> ToolResponse {
        let tasks: Vec<_> = calls
            .into_iter()
            .map(|call| {
                let handler = self.handlers.get(&call.name).cloned();
                let task = handler.map(|handler| {
                    let call = call.clone();
                    tokio::spawn(async move { run_handler(handler, &call).await })
                });
                (call, task)
            })
            .collect();

        let mut function_responses = Vec::with_capacity(tasks.len());
        for (call, task) in tasks {
            let response = match task {
                None => {
                    tracing::warn!(tool = %call.name, call_id = %call.id, "Unknown tool");
                    FunctionResponse::error(&call, "Unknown tool")
                }
                Some(task) => match task.await {
                    Ok(response) => response,
                    Err(e) => {
                        tracing::error!(tool = %call.name, error = %e, "Tool handler aborted");
                        FunctionResponse::error(&call, format!("Tool handler aborted: {}", e))
                    }
                },
            };
            function_responses.push(response);
        }

        ToolResponse { function_responses }
    }
}

async fn run_handler(handler: Arc<dyn ToolHandler>, call: &FunctionCall) -> FunctionResponse {
    let span = mirror_telemetry::tool_execute_span(&call.name, &call.id);
    async {
        tracing::info!(args = %call.args, "Executing tool");
        match handler.call(call).await {
            Ok(outcome) => {
                tracing::debug!(scheduling = ?outcome.scheduling, "Tool succeeded");
                FunctionResponse::success(call, outcome.result, outcome.scheduling)
            }
            Err(e) => {
                tracing::error!(error = %e, "Tool failed");
                FunctionResponse::error(call, e.message())
            }
        }
    }
    .instrument(span)
    .await
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.declarations.iter().map(|d| d.name.as_str()).collect();
        f.debug_struct("ToolRegistry").field("tools", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ToolRegistry {
        ToolRegistry::new()
            .with_tool_fn(FunctionDeclaration::new("ok_tool"), |_| Ok(ToolOutcome::ok()))
            .with_tool_fn(FunctionDeclaration::new("failing"), |_| Err("disk on fire".into()))
    }

    #[tokio::test]
    async fn test_dispatch_unknown_tool() {
        let response = registry().dispatch(&FunctionCall::new("1", "nope", Value::Null)).await;
        assert!(response.is_error());
        assert_eq!(response.error_message(), Some("Unknown tool"));
        assert_eq!(response.id, "1");
    }

    #[tokio::test]
    async fn test_dispatch_handler_error_is_contained() {
        let response = registry().dispatch(&FunctionCall::new("2", "failing", Value::Null)).await;
        assert_eq!(response.response["result"], "error");
        assert_eq!(response.response["error"], "disk on fire");
    }

    #[tokio::test]
    async fn test_dispatch_all_keeps_call_order() {
        let calls = vec![
            FunctionCall::new("a", "failing", Value::Null),
            FunctionCall::new("b", "nope", Value::Null),
            FunctionCall::new("c", "ok_tool", Value::Null),
        ];
        let batch = registry().dispatch_all(calls).await;
        let ids: Vec<&str> = batch.function_responses.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert!(!batch.function_responses[2].is_error());
    }

    #[test]
    fn test_reregister_replaces_declaration() {
        let mut registry = registry();
        registry.register(
            FunctionDeclaration::new("ok_tool").with_description("v2"),
            Arc::new(FnToolHandler::new(|_| Ok(ToolOutcome::ok()))),
        );
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.declarations()[1].description.as_deref(), Some("v2"));
    }
}
