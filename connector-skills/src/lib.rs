//! Free-text instruction bundles ("skills") the agent can browse.
//!
//! Skills need no connected account, so their tools register in every
//! session.

#![warn(missing_docs, clippy::pedantic)]

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use connector_tools::args;
use connector_tools::{
    ObjectSchema, Property, SessionContext, ToolBuilder, ToolError, ToolHandle, ToolMetadata,
    ToolOutput, ToolResult,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors emitted by skill catalogs.
#[derive(Debug, Error)]
pub enum SkillError {
    /// No skill has this slug.
    #[error("no skill named `{slug}`")]
    NotFound {
        /// Requested slug.
        slug: String,
    },
    /// The catalog backend failed.
    #[error("skill catalog failure: {reason}")]
    Backend {
        /// Human-readable reason.
        reason: String,
    },
}

/// Result alias for skill operations.
pub type SkillResult<T> = Result<T, SkillError>;

impl From<SkillError> for ToolError {
    fn from(err: SkillError) -> Self {
        match err {
            SkillError::NotFound { .. } => Self::with_suggestion(
                err.to_string(),
                "Call skills_list to see the available slugs.",
            ),
            SkillError::Backend { .. } => Self::execution(err.to_string()),
        }
    }
}

/// Listing entry for one skill.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillSummary {
    /// Identifier used to fetch the instructions.
    pub slug: String,
    /// Display name.
    pub name: String,
    /// One-line description.
    pub description: String,
}

/// Source of skills.
#[async_trait]
pub trait SkillCatalog: Send + Sync {
    /// Lists every skill.
    async fn list_skills(&self) -> SkillResult<Vec<SkillSummary>>;

    /// Returns the instructions of one skill.
    async fn skill_instructions(&self, slug: &str) -> SkillResult<String>;
}

/// Skills held in process memory, keyed by slug.
#[derive(Debug, Default)]
pub struct InMemorySkillCatalog {
    skills: RwLock<BTreeMap<String, (SkillSummary, String)>>,
}

impl InMemorySkillCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a skill.
    pub async fn insert(&self, summary: SkillSummary, instructions: impl Into<String>) {
        self.skills
            .write()
            .await
            .insert(summary.slug.clone(), (summary, instructions.into()));
    }
}

#[async_trait]
impl SkillCatalog for InMemorySkillCatalog {
    async fn list_skills(&self) -> SkillResult<Vec<SkillSummary>> {
        Ok(self
            .skills
            .read()
            .await
            .values()
            .map(|(summary, _)| summary.clone())
            .collect())
    }

    async fn skill_instructions(&self, slug: &str) -> SkillResult<String> {
        self.skills
            .read()
            .await
            .get(slug)
            .map(|(_, instructions)| instructions.clone())
            .ok_or_else(|| SkillError::NotFound {
                slug: slug.to_owned(),
            })
    }
}

/// Builds `skills_list` and `skills_get_instructions`.
pub struct SkillToolBuilder {
    catalog: Arc<dyn SkillCatalog>,
}

impl fmt::Debug for SkillToolBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SkillToolBuilder").finish_non_exhaustive()
    }
}

impl SkillToolBuilder {
    /// Creates a builder over a catalog.
    #[must_use]
    pub fn new(catalog: Arc<dyn SkillCatalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl ToolBuilder for SkillToolBuilder {
    async fn build(&self, _ctx: &SessionContext) -> ToolResult<Vec<ToolHandle>> {
        let list = ToolMetadata::new("skills_list", "List available skills: reusable instructions for common tasks.")?;
        let get = ToolMetadata::new(
            "skills_get_instructions",
            "Fetch the full instructions of one skill by slug.",
        )?
        .with_input_schema(
            ObjectSchema::new()
                .required("slug", Property::string().description("Slug from skills_list"))
                .into_value(),
        );

        let catalog = Arc::clone(&self.catalog);
        let list_tool = move |_input: Value| {
            let catalog = Arc::clone(&catalog);
            async move { list_skills(catalog.as_ref()).await }
        };
        let catalog = Arc::clone(&self.catalog);
        let get_tool = move |input: Value| {
            let catalog = Arc::clone(&catalog);
            async move { get_instructions(catalog.as_ref(), input).await }
        };

        Ok(vec![ToolHandle::new(list, list_tool), ToolHandle::new(get, get_tool)])
    }
}

async fn list_skills(catalog: &dyn SkillCatalog) -> ToolResult<ToolOutput> {
    let skills = catalog.list_skills().await?;
    if skills.is_empty() {
        return Ok(ToolOutput::text("No skills are available."));
    }
    let lines: Vec<String> = skills
        .iter()
        .map(|s| format!("- {} ({}): {}", s.name, s.slug, s.description))
        .collect();
    Ok(ToolOutput::text(lines.join("\n")))
}

async fn get_instructions(catalog: &dyn SkillCatalog, input: Value) -> ToolResult<ToolOutput> {
    let args = args::into_object(input)?;
    let slug = args::required_str(&args, "slug")?;
    Ok(ToolOutput::text(catalog.skill_instructions(slug.trim()).await?))
}
