//! The seam through which non-manifest tool sets join a session.

use async_trait::async_trait;
use connector_primitives::{Access, CapabilityProfile, UserId};

use crate::error::ToolResult;
use crate::registry::ToolHandle;

/// What a builder knows about the session it is building tools for.
#[derive(Clone, Debug)]
pub struct SessionContext {
    user: UserId,
    profile: CapabilityProfile,
}

impl SessionContext {
    /// Creates a context for one registration pass.
    #[must_use]
    pub fn new(user: UserId, profile: CapabilityProfile) -> Self {
        Self { user, profile }
    }

    /// The end user.
    #[must_use]
    pub fn user(&self) -> &UserId {
        &self.user
    }

    /// The capability profile fetched for this pass.
    #[must_use]
    pub fn profile(&self) -> &CapabilityProfile {
        &self.profile
    }
}

/// Tools left out of a pass for lack of access, with the access each needs.
pub type Withheld = Vec<(String, Access)>;

/// Produces a set of tools for one session.
///
/// Builders run once per registration pass and may do read-only I/O (for
/// example fetching a tabular backend's current tabs). They must not cache
/// results across passes.
#[async_trait]
pub trait ToolBuilder: Send + Sync {
    /// Builds this builder's tools.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::ToolError`] when the tool set cannot be produced.
    /// The registrar logs it and continues with other builders.
    async fn build(&self, ctx: &SessionContext) -> ToolResult<Vec<ToolHandle>>;

    /// Builds this builder's tools and names the ones left out because the
    /// session's grant does not cover them.
    ///
    /// The default withholds nothing. Builders that gate tools on access
    /// override it so the registrar can report what was left out.
    ///
    /// # Errors
    ///
    /// Same as [`ToolBuilder::build`].
    async fn build_gated(&self, ctx: &SessionContext) -> ToolResult<(Vec<ToolHandle>, Withheld)> {
        Ok((self.build(ctx).await?, Withheld::new()))
    }
}
