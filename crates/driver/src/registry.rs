//! Tool registry (spec.md C7): composes the direct executor and any
//! configured remote tool-servers into one routing table built once at
//! startup and shared read-only across sessions.

use cueso_domain::error::{Error, Result};
use cueso_domain::executor::ToolExecutor;
use cueso_domain::tool::{ToolCall, ToolDefinition, ToolResult};
use std::collections::HashMap;
use std::sync::Arc;

/// Maps each exposed tool name to the executor that serves it. Built once
/// from configuration; read-only thereafter (spec.md §5 "the tool
/// registry is read-only after startup").
pub struct ToolRegistry {
    definitions: Vec<ToolDefinition>,
    owners: HashMap<String, Arc<dyn ToolExecutor>>,
}

impl ToolRegistry {
    /// `executors` are consulted in order; the first executor whose
    /// catalog contains a given tool name owns it. A name repeated across
    /// executors keeps the earlier owner.
    pub fn new(executors: Vec<Arc<dyn ToolExecutor>>) -> Self {
        let mut definitions = Vec::new();
        let mut owners: HashMap<String, Arc<dyn ToolExecutor>> = HashMap::new();
        for executor in executors {
            for def in executor.catalog() {
                if owners.contains_key(&def.name) {
                    tracing::warn!(tool = %def.name, "duplicate tool name across executors, keeping first owner");
                    continue;
                }
                owners.insert(def.name.clone(), executor.clone());
                definitions.push(def);
            }
        }
        Self { definitions, owners }
    }

    /// The catalog offered to the provider as a turn's `tools` input.
    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    pub fn definition(&self, name: &str) -> Option<&ToolDefinition> {
        self.definitions.iter().find(|d| d.name == name)
    }

    pub async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        let executor = self
            .owners
            .get(&call.name)
            .ok_or_else(|| Error::Tool {
                tool: call.name.clone(),
                message: "no executor registered for this tool".into(),
            })?;
        executor.execute(call).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    struct Stub {
        name: &'static str,
        pause_after: bool,
    }

    #[async_trait]
    impl ToolExecutor for Stub {
        fn catalog(&self) -> Vec<ToolDefinition> {
            vec![ToolDefinition {
                name: self.name.into(),
                description: "stub".into(),
                input_schema: json!({"type": "object"}),
                pause_after: self.pause_after,
            }]
        }

        async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
            Ok(ToolResult::ok(call.id.clone(), "stub result"))
        }
    }

    #[tokio::test]
    async fn routes_call_to_owning_executor() {
        let registry = ToolRegistry::new(vec![Arc::new(Stub { name: "a", pause_after: false })]);
        let call = ToolCall { id: "c1".into(), name: "a".into(), arguments: json!({}) };
        let result = registry.execute(&call).await.unwrap();
        assert_eq!(result.content, "stub result");
    }

    #[tokio::test]
    async fn unknown_tool_name_is_an_error() {
        let registry = ToolRegistry::new(vec![Arc::new(Stub { name: "a", pause_after: false })]);
        let call = ToolCall { id: "c1".into(), name: "ghost".into(), arguments: json!({}) };
        assert!(registry.execute(&call).await.is_err());
    }

    #[test]
    fn first_executor_wins_on_duplicate_name() {
        let registry = ToolRegistry::new(vec![
            Arc::new(Stub { name: "a", pause_after: true }),
            Arc::new(Stub { name: "a", pause_after: false }),
        ]);
        assert!(registry.definition("a").unwrap().pause_after);
        assert_eq!(registry.definitions().len(), 1);
    }
}
