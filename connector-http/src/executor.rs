//! The manifest interpreter.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use connector_manifest::{AuthMode, Manifest};
use connector_primitives::{Access, UserId};
use http::Request;
use http::header::{CONTENT_TYPE, USER_AGENT};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::auth::{self, AppliedAuth};
use crate::credentials::{Credential, CredentialProvider};
use crate::error::{ExecutionError, ExecutionResult};
use crate::limiter::{self, RateLimitKey, RateLimiter, TokenBucketLimiter};
use crate::outcome::{ExecutionOutcome, classify};
use crate::request::{self, PreparedCall};
use crate::transport::HttpTransport;

const USER_AGENT_VALUE: &str = concat!("connector-hub/", env!("CARGO_PKG_VERSION"));

/// Tunables for [`ManifestExecutor`].
#[derive(Debug, Clone, Copy)]
pub struct ExecutorConfig {
    max_rate_limit_wait: Duration,
    summary_max_chars: usize,
}

impl ExecutorConfig {
    /// Creates a configuration with the default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Longest time a call may wait for a rate-limit permit before failing.
    #[must_use]
    pub fn with_max_rate_limit_wait(mut self, wait: Duration) -> Self {
        self.max_rate_limit_wait = wait;
        self
    }

    /// Character cap for result summaries.
    #[must_use]
    pub fn with_summary_max_chars(mut self, max_chars: usize) -> Self {
        self.summary_max_chars = max_chars;
        self
    }

    /// Returns the bounded rate-limit wait.
    #[must_use]
    pub const fn max_rate_limit_wait(self) -> Duration {
        self.max_rate_limit_wait
    }

    /// Returns the summary character cap.
    #[must_use]
    pub const fn summary_max_chars(self) -> usize {
        self.summary_max_chars
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_rate_limit_wait: Duration::from_secs(2),
            summary_max_chars: 4000,
        }
    }
}

/// Who is calling and what they were granted for the target provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    user: UserId,
    granted: Option<Access>,
}

impl Caller {
    /// Creates a caller context.
    #[must_use]
    pub fn new(user: UserId, granted: Option<Access>) -> Self {
        Self { user, granted }
    }

    /// The end user.
    #[must_use]
    pub fn user(&self) -> &UserId {
        &self.user
    }

    /// Highest access class granted, if any.
    #[must_use]
    pub fn granted(&self) -> Option<Access> {
        self.granted
    }
}

/// Turns `(manifest, operation id, args)` into one HTTP call.
pub struct ManifestExecutor {
    transport: Arc<dyn HttpTransport>,
    credentials: Arc<dyn CredentialProvider>,
    limiter: Arc<dyn RateLimiter>,
    config: ExecutorConfig,
}

impl fmt::Debug for ManifestExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManifestExecutor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ManifestExecutor {
    /// Creates an executor with an in-process token-bucket limiter.
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            transport,
            credentials,
            limiter: Arc::new(TokenBucketLimiter::new()),
            config: ExecutorConfig::default(),
        }
    }

    /// Replaces the rate limiter, e.g. with one backed by a shared store.
    #[must_use]
    pub fn with_limiter(mut self, limiter: Arc<dyn RateLimiter>) -> Self {
        self.limiter = limiter;
        self
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> ExecutorConfig {
        self.config
    }

    /// Executes one operation.
    ///
    /// Every precondition (operation exists, access, arguments, placeholders,
    /// blocklist) is checked before the credential is fetched or any request
    /// is sent.
    ///
    /// # Errors
    ///
    /// Returns a classified [`ExecutionError`]; see [`ExecutionError::class`].
    pub async fn execute(
        &self,
        manifest: &Manifest,
        operation_id: &str,
        args: &Map<String, Value>,
        caller: &Caller,
    ) -> ExecutionResult<ExecutionOutcome> {
        let provider = manifest.provider();
        let operation = manifest
            .operation(operation_id)
            .ok_or_else(|| ExecutionError::UnknownOperation {
                provider: provider.to_string(),
                operation: operation_id.to_owned(),
            })?;

        if !caller
            .granted()
            .is_some_and(|granted| granted.covers(operation.access()))
        {
            return Err(ExecutionError::InsufficientAccess {
                operation: operation.id().to_owned(),
                required: operation.access(),
                granted: caller.granted(),
            });
        }

        let prepared = request::prepare(operation, args)?;

        if let Some(prefix) = manifest.blocked_prefix(&prepared.path) {
            warn!(provider = %provider, operation = operation.id(), prefix, "blocked path refused");
            return Err(ExecutionError::Blocklisted {
                path: prepared.path,
            });
        }

        let credential = match manifest.auth() {
            AuthMode::None => None,
            _ => Some(self.credentials.credential(provider, caller.user()).await?),
        };

        if let Some(limit) = manifest.rate_limit() {
            let identity = credential
                .as_ref()
                .and_then(Credential::identity)
                .unwrap_or(caller.user().as_str());
            let key = RateLimitKey::new(provider.clone(), identity);
            limiter::acquire(
                self.limiter.as_ref(),
                &key,
                limit,
                self.config.max_rate_limit_wait,
            )
            .await?;
        }

        let request = build_request(manifest, &prepared, credential.as_ref())?;
        drop(credential);

        debug!(
            provider = %provider,
            operation = operation.id(),
            method = prepared.method.as_str(),
            path = %prepared.path,
            "executing manifest operation"
        );

        let response = self.transport.send(request).await?;
        let outcome = classify(
            provider.as_str(),
            &prepared.path,
            response,
            operation.response_hints(),
        );

        match &outcome {
            Ok(result) => debug!(provider = %provider, operation = operation.id(), status = result.status(), "operation succeeded"),
            Err(err) => warn!(provider = %provider, operation = operation.id(), error = %err, "operation failed"),
        }

        outcome
    }
}

fn build_request(
    manifest: &Manifest,
    prepared: &PreparedCall,
    credential: Option<&Credential>,
) -> ExecutionResult<Request<Bytes>> {
    let mut builder = Request::builder()
        .method(prepared.method.as_str())
        .header(USER_AGENT, USER_AGENT_VALUE);

    for (name, value) in manifest.default_headers() {
        builder = builder.header(name.as_str(), value.as_str());
    }
    if let (Some(header), Some(version)) = (manifest.version_header(), manifest.api_version()) {
        builder = builder.header(header, version);
    }

    let (builder, auth_query) = match auth::apply(manifest.auth(), credential, builder) {
        AppliedAuth::Header(builder) => (builder, Vec::new()),
        AppliedAuth::Query {
            builder,
            param,
            value,
        } => (builder, vec![(param, value)]),
    };

    let uri = format!("{}{}", manifest.base_url(), prepared.path_and_query(&auth_query));
    let mut builder = builder.uri(uri);

    let body = match &prepared.body {
        Some(fields) => {
            builder = builder.header(CONTENT_TYPE, "application/json");
            let encoded = serde_json::to_vec(fields).map_err(|err| {
                ExecutionError::configuration(format!("failed to encode request body: {err}"))
            })?;
            Bytes::from(encoded)
        }
        None => Bytes::new(),
    };

    builder
        .body(body)
        .map_err(|err| ExecutionError::configuration(format!("failed to build request: {err}")))
}
