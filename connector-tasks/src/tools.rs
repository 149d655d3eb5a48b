//! `scrape_page` and `scrape_status`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use connector_primitives::TaskId;
use connector_tools::args;
use connector_tools::{
    ObjectSchema, Property, SessionContext, ToolBuilder, ToolError, ToolHandle, ToolMetadata,
    ToolOutput, ToolResult,
};
use serde_json::Value;

use crate::client::AsyncTaskClient;
use crate::model::TaskStatus;

/// Builds the scraping tools over one client.
#[derive(Debug, Clone)]
pub struct ScrapeToolBuilder {
    client: Arc<AsyncTaskClient>,
}

impl ScrapeToolBuilder {
    /// Creates a builder.
    #[must_use]
    pub fn new(client: Arc<AsyncTaskClient>) -> Self {
        Self { client }
    }

    fn tools(&self) -> ToolResult<Vec<ToolHandle>> {
        let default_timeout = max_timeout_secs(&self.client);
        let page = ToolMetadata::new(
            "scrape_page",
            "Fetch a web page's text through the user's browser extension. Use for pages \
             that need the user's signed-in session.",
        )?
        .with_input_schema(
            ObjectSchema::new()
                .required("url", Property::string().format("uri").description("Absolute http(s) URL"))
                .optional(
                    "timeout_seconds",
                    Property::integer()
                        .minimum(1)
                        .maximum(i64::try_from(default_timeout).unwrap_or(i64::MAX))
                        .default_value(default_timeout.into())
                        .description("How long to wait for the page, up to the default"),
                )
                .into_value(),
        );
        let status = ToolMetadata::new(
            "scrape_status",
            "Check a scrape task started earlier, by task id.",
        )?
        .with_input_schema(
            ObjectSchema::new()
                .required("task_id", Property::string().format("uuid"))
                .into_value(),
        );

        let client = Arc::clone(&self.client);
        let scrape = move |input: Value| {
            let client = Arc::clone(&client);
            async move { scrape_page(&client, input).await }
        };
        let client = Arc::clone(&self.client);
        let check = move |input: Value| {
            let client = Arc::clone(&client);
            async move { scrape_status(&client, input).await }
        };

        Ok(vec![ToolHandle::new(page, scrape), ToolHandle::new(status, check)])
    }
}

#[async_trait]
impl ToolBuilder for ScrapeToolBuilder {
    async fn build(&self, _ctx: &SessionContext) -> ToolResult<Vec<ToolHandle>> {
        self.tools()
    }
}

/// Longest wait a caller may ask for: the configured wait, at least a second.
fn max_timeout_secs(client: &AsyncTaskClient) -> u64 {
    client.wait_options().timeout().as_secs().max(1)
}

async fn scrape_page(client: &AsyncTaskClient, input: Value) -> ToolResult<ToolOutput> {
    let args = args::into_object(input)?;
    let url = args::required_str(&args, "url")?;
    let mut options = client.wait_options();
    if let Some(seconds) = args::optional_u64(&args, "timeout_seconds")? {
        if seconds == 0 {
            return Err(ToolError::invalid_input("`timeout_seconds` must be at least 1"));
        }
        let max = max_timeout_secs(client);
        if seconds > max {
            return Err(ToolError::invalid_input(format!(
                "`timeout_seconds` must be at most {max}"
            )));
        }
        options = options.with_timeout(Duration::from_secs(seconds));
    }

    let task = client.create(url).await?;
    let done = client.wait_for(task.id(), options).await?;
    Ok(ToolOutput::text(format!(
        "Content of {}:\n\n{}",
        done.url(),
        done.result().unwrap_or_default()
    )))
}

async fn scrape_status(client: &AsyncTaskClient, input: Value) -> ToolResult<ToolOutput> {
    let args = args::into_object(input)?;
    let raw = args::required_str(&args, "task_id")?;
    let id: TaskId = raw
        .parse()
        .map_err(|_| ToolError::invalid_input(format!("`{raw}` is not a task id")))?;

    let task = client.get(id).await?;
    let text = match task.status() {
        TaskStatus::Pending => format!(
            "Task {id} is pending: the browser extension has not picked it up yet."
        ),
        TaskStatus::Processing => format!("Task {id} is processing."),
        TaskStatus::Completed => match task.result().filter(|r| !r.trim().is_empty()) {
            Some(result) => format!("Task {id} completed. Content of {}:\n\n{result}", task.url()),
            None => format!("Task {id} completed but returned no content."),
        },
        TaskStatus::Failed => {
            let reason = task.error_message().unwrap_or("no reason given");
            match task.suggestion() {
                Some(suggestion) => format!("Task {id} failed: {reason}\nSuggestion: {suggestion}"),
                None => format!("Task {id} failed: {reason}"),
            }
        }
    };
    Ok(ToolOutput::text(text))
}
