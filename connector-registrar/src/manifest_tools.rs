//! Derives callable tools from a manifest.

use std::sync::Arc;

use connector_http::{Caller, ExecutionError, ManifestExecutor};
use connector_manifest::{Manifest, Operation, ParamSpec};
use connector_tools::{
    ObjectSchema, Property, Tool, ToolError, ToolHandle, ToolMetadata, ToolOutput, ToolResult, args,
};
use serde_json::Value;
use tracing::debug;

/// Tool name for an operation: `{provider}_{operation}`.
#[must_use]
pub fn tool_name(manifest: &Manifest, operation: &Operation) -> String {
    format!("{}_{}", manifest.provider(), operation.id())
}

/// Agent-facing description of an operation.
#[must_use]
pub fn describe(manifest: &Manifest, operation: &Operation) -> String {
    let summary = if operation.description().trim().is_empty() {
        format!("{} {}", operation.method().as_str(), operation.path())
    } else {
        operation.description().trim().to_owned()
    };
    format!(
        "{summary} [{}; {} access]",
        manifest.display_name(),
        operation.access().as_str()
    )
}

/// Input schema covering the operation's params and body fields.
#[must_use]
pub fn input_schema(operation: &Operation) -> Value {
    operation
        .inputs()
        .fold(ObjectSchema::new(), |schema, spec| {
            let property = property_for(spec);
            if spec.required() {
                schema.required(spec.name(), property)
            } else {
                schema.optional(spec.name(), property)
            }
        })
        .into_value()
}

fn property_for(spec: &ParamSpec) -> Property {
    let mut property = Property::of_type(spec.kind().as_str()).one_of(spec.allowed().to_vec());
    if let Some(description) = spec.description() {
        property = property.description(description);
    }
    if let Some(format) = spec.format() {
        property = property.format(format);
    }
    if let Some(items) = spec.items() {
        property = property.items(items.as_str());
    }
    if let Some(default) = spec.default_value() {
        property = property.default_value(default.clone());
    }
    property
}

pub use connector_tools::Withheld;

/// Builds one tool per operation the caller's granted access covers.
///
/// Operations above the granted access are left out entirely and returned
/// alongside the tools, so a read-only caller never sees a write tool.
///
/// # Errors
///
/// Returns [`ToolError::InvalidMetadata`] if a derived tool name is invalid.
pub fn manifest_tools(
    manifest: &Arc<Manifest>,
    executor: &Arc<ManifestExecutor>,
    caller: &Caller,
) -> ToolResult<(Vec<ToolHandle>, Withheld)> {
    let mut tools = Vec::new();
    let mut withheld = Vec::new();

    for operation in manifest.operations() {
        let name = tool_name(manifest, operation);
        if !caller
            .granted()
            .is_some_and(|granted| granted.covers(operation.access()))
        {
            debug!(
                provider = %manifest.provider(),
                tool = %name,
                required = operation.access().as_str(),
                "operation withheld for insufficient access"
            );
            withheld.push((name, operation.access()));
            continue;
        }

        let metadata = ToolMetadata::new(name, describe(manifest, operation))?
            .with_input_schema(input_schema(operation));
        tools.push(ToolHandle::new(
            metadata,
            bind(manifest, executor, caller, operation.id()),
        ));
    }

    Ok((tools, withheld))
}

fn bind(
    manifest: &Arc<Manifest>,
    executor: &Arc<ManifestExecutor>,
    caller: &Caller,
    operation_id: &str,
) -> impl Tool + 'static {
    let manifest = Arc::clone(manifest);
    let executor = Arc::clone(executor);
    let caller = caller.clone();
    let operation_id = operation_id.to_owned();
    let max_chars = executor.config().summary_max_chars();

    move |input: Value| {
        let manifest = Arc::clone(&manifest);
        let executor = Arc::clone(&executor);
        let caller = caller.clone();
        let operation_id = operation_id.clone();
        async move {
            let args = args::into_object(input)?;
            let outcome = executor
                .execute(&manifest, &operation_id, &args, &caller)
                .await
                .map_err(|err| execution_error(&err))?;
            Ok::<_, ToolError>(ToolOutput::text(outcome.summary(max_chars)))
        }
    }
}

/// Converts an executor failure into a tool error carrying its suggestion.
#[must_use]
pub fn execution_error(err: &ExecutionError) -> ToolError {
    match err.suggestion() {
        Some(suggestion) => ToolError::with_suggestion(err.to_string(), suggestion),
        None => ToolError::execution(err.to_string()),
    }
}
