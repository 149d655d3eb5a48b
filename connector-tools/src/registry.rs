//! Runtime registry for tool metadata and execution.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{ToolError, ToolResult};

/// Metadata describing a registered tool.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ToolMetadata {
    name: String,
    description: String,
    input_schema: Value,
}

impl ToolMetadata {
    /// Creates metadata for the supplied tool name.
    ///
    /// Names are restricted to ASCII letters, digits, `_` and `-` because the
    /// calling agent addresses tools by them.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidMetadata`] if the name is empty or holds
    /// other characters.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> ToolResult<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(ToolError::InvalidMetadata {
                reason: "tool name cannot be empty".into(),
            });
        }
        if let Some(bad) = name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
        {
            return Err(ToolError::InvalidMetadata {
                reason: format!("tool name `{name}` contains `{bad}`"),
            });
        }

        Ok(Self {
            name,
            description: description.into(),
            input_schema: crate::schema::ObjectSchema::new().into_value(),
        })
    }

    /// Sets the JSON schema describing the tool input.
    #[must_use]
    pub fn with_input_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }

    /// Replaces the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Returns the tool name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the description shown to the agent.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the input schema.
    #[must_use]
    pub fn input_schema(&self) -> &Value {
        &self.input_schema
    }
}

/// What a tool hands back to the agent.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolOutput {
    text: String,
    is_error: bool,
}

impl ToolOutput {
    /// A successful result.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    /// A failed result.
    #[must_use]
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }

    /// Returns the text block.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.text
    }

    /// Whether the call failed.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.is_error
    }
}

impl fmt::Display for ToolOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Trait implemented by tool executors.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Invokes the tool with the given JSON input.
    async fn invoke(&self, input: Value) -> ToolResult<ToolOutput>;
}

#[async_trait]
impl<F, Fut> Tool for F
where
    F: Send + Sync + Fn(Value) -> Fut,
    Fut: Future<Output = ToolResult<ToolOutput>> + Send,
{
    async fn invoke(&self, input: Value) -> ToolResult<ToolOutput> {
        (self)(input).await
    }
}

/// A tool implementation paired with its metadata.
#[derive(Clone)]
pub struct ToolHandle {
    metadata: ToolMetadata,
    executor: Arc<dyn Tool>,
}

impl fmt::Debug for ToolHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolHandle")
            .field("name", &self.metadata.name)
            .finish_non_exhaustive()
    }
}

impl ToolHandle {
    /// Pairs metadata with an implementation.
    #[must_use]
    pub fn new<T>(metadata: ToolMetadata, tool: T) -> Self
    where
        T: Tool + 'static,
    {
        Self {
            metadata,
            executor: Arc::new(tool),
        }
    }

    /// Returns a handle with different metadata sharing this implementation.
    #[must_use]
    pub fn renamed(&self, metadata: ToolMetadata) -> Self {
        Self {
            metadata,
            executor: Arc::clone(&self.executor),
        }
    }

    /// Returns the associated metadata.
    #[must_use]
    pub fn metadata(&self) -> &ToolMetadata {
        &self.metadata
    }

    /// Returns the tool name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.metadata.name()
    }

    /// Executes the underlying tool implementation.
    ///
    /// # Errors
    ///
    /// Propagates any [`ToolError`] returned by the implementation.
    pub async fn invoke(&self, input: Value) -> ToolResult<ToolOutput> {
        self.executor.invoke(input).await
    }
}

/// Registry that stores one session's tools keyed by name.
#[derive(Default)]
pub struct ToolRegistry {
    inner: RwLock<BTreeMap<String, ToolHandle>>,
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("registered", &self.names())
            .finish()
    }
}

impl ToolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool implementation.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::DuplicateTool`] if the name is already present.
    pub fn register_tool<T>(&self, metadata: ToolMetadata, tool: T) -> ToolResult<()>
    where
        T: Tool + 'static,
    {
        self.register(ToolHandle::new(metadata, tool))
    }

    /// Registers a prepared handle.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::DuplicateTool`] if the name is already present.
    pub fn register(&self, handle: ToolHandle) -> ToolResult<()> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let name = handle.name().to_owned();
        if inner.contains_key(&name) {
            return Err(ToolError::DuplicateTool { name });
        }
        inner.insert(name, handle);
        Ok(())
    }

    /// Returns a handle to the tool matching the supplied name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<ToolHandle> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Whether a tool with this name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Invokes a registered tool directly.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::UnknownTool`] when the tool is not found or
    /// propagates the implementation's error.
    pub async fn invoke(&self, name: &str, input: Value) -> ToolResult<ToolOutput> {
        let handle = self.get(name).ok_or_else(|| ToolError::UnknownTool {
            name: name.to_owned(),
        })?;
        handle.invoke(input).await
    }

    /// Invokes a tool and folds any error into a flagged output.
    pub async fn call(&self, name: &str, input: Value) -> ToolOutput {
        match self.invoke(name, input).await {
            Ok(output) => output,
            Err(err) => {
                debug!(tool = name, error = %err, "tool call failed");
                err.to_output()
            }
        }
    }

    /// Lists the metadata of all registered tools, sorted by name.
    #[must_use]
    pub fn list(&self) -> Vec<ToolMetadata> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|handle| handle.metadata.clone())
            .collect()
    }

    /// Lists registered tool names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no tools are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> ToolMetadata {
        ToolMetadata::new("echo", "Echo incoming payload").unwrap()
    }

    async fn echo(input: Value) -> ToolResult<ToolOutput> {
        Ok(ToolOutput::text(input.to_string()))
    }

    #[tokio::test]
    async fn register_and_invoke_tool() {
        let registry = ToolRegistry::new();
        registry.register_tool(metadata(), echo).unwrap();

        let payload = serde_json::json!({ "message": "hello" });
        let output = registry.invoke("echo", payload.clone()).await.unwrap();
        assert_eq!(output.content(), payload.to_string());
        assert!(!output.is_error());
    }

    #[tokio::test]
    async fn duplicate_registration_errors() {
        let registry = ToolRegistry::new();
        registry.register_tool(metadata(), echo).unwrap();

        let err = registry
            .register_tool(ToolMetadata::new("echo", "again").unwrap(), echo)
            .expect_err("duplicate registration should fail");

        assert!(matches!(err, ToolError::DuplicateTool { name } if name == "echo"));
    }

    #[tokio::test]
    async fn unknown_tool_errors() {
        let registry = ToolRegistry::new();
        let err = registry
            .invoke("missing", Value::Null)
            .await
            .expect_err("unknown tool should error");

        assert!(matches!(err, ToolError::UnknownTool { name } if name == "missing"));
    }

    #[tokio::test]
    async fn call_flags_failures_instead_of_returning_them() {
        let registry = ToolRegistry::new();
        registry
            .register_tool(metadata(), |_input: Value| async {
                Err::<ToolOutput, _>(ToolError::execution("backend unavailable"))
            })
            .unwrap();

        let output = registry.call("echo", Value::Null).await;
        assert!(output.is_error());
        assert_eq!(output.content(), "backend unavailable");

        let output = registry.call("missing", Value::Null).await;
        assert!(output.is_error());
    }

    #[tokio::test]
    async fn renamed_handle_shares_implementation() {
        let original = ToolHandle::new(metadata(), echo);
        let alias = original.renamed(ToolMetadata::new("echo_old", "Deprecated").unwrap());

        let registry = ToolRegistry::new();
        registry.register(original).unwrap();
        registry.register(alias).unwrap();

        assert_eq!(registry.names(), vec!["echo", "echo_old"]);
        let output = registry.invoke("echo_old", serde_json::json!(1)).await.unwrap();
        assert_eq!(output.content(), "1");
    }

    #[test]
    fn invalid_metadata_errors() {
        let err = ToolMetadata::new("", "x").expect_err("empty name should error");
        assert!(matches!(err, ToolError::InvalidMetadata { .. }));

        let err = ToolMetadata::new("bad name", "x").expect_err("space should error");
        assert!(matches!(err, ToolError::InvalidMetadata { .. }));
    }
}
