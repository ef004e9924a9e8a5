//! Deterministic stand-in for the platform execution context.
//!
//! Every value is a constant or absent. Nothing is derived from the clock,
//! the environment or the host, so two runs with the same settings hand the
//! handler identical contexts.

use std::collections::BTreeMap;
use std::fmt::Display;

use serde::Serialize;

pub const MOCK_REQUEST_ID: &str = "AwsRequestId";
pub const DEFAULT_FUNCTION_NAME: &str = "FunctionName";
pub const DEFAULT_FUNCTION_VERSION: &str = "current";
pub const DEFAULT_MEMORY_LIMIT_MB: u32 = 128;
pub const MEMORY_STEP_MB: u32 = 64;
pub const MAX_MEMORY_LIMIT_MB: u32 = 1536;
pub const MIN_TIMEOUT_SECS: u64 = 1;
pub const MAX_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub identity_id: String,
    pub identity_pool_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientContext {
    pub installation_id: String,
    pub app_title: String,
    pub custom: BTreeMap<String, String>,
    pub environment: BTreeMap<String, String>,
}

/// Logger capability handed to handlers. Lines go to the harness log
/// stream (stderr), never to stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextLogger {
    request_id: String,
    function_name: String,
}

impl ContextLogger {
    pub fn log(&self, message: impl Display) {
        tracing::info!(
            component = "handler",
            request_id = %self.request_id,
            function_name = %self.function_name,
            "{message}"
        );
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MockContext {
    aws_request_id: String,
    log_group_name: Option<String>,
    log_stream_name: Option<String>,
    function_name: String,
    function_version: String,
    invoked_function_arn: String,
    identity: Option<Identity>,
    client_context: Option<ClientContext>,
    remaining_time_in_millis: u64,
    memory_limit_in_mb: u32,
    #[serde(skip)]
    logger: ContextLogger,
}

impl MockContext {
    pub fn aws_request_id(&self) -> &str {
        &self.aws_request_id
    }

    pub fn log_group_name(&self) -> Option<&str> {
        self.log_group_name.as_deref()
    }

    pub fn log_stream_name(&self) -> Option<&str> {
        self.log_stream_name.as_deref()
    }

    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    pub fn function_version(&self) -> &str {
        &self.function_version
    }

    pub fn invoked_function_arn(&self) -> &str {
        &self.invoked_function_arn
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn client_context(&self) -> Option<&ClientContext> {
        self.client_context.as_ref()
    }

    pub fn remaining_time_in_millis(&self) -> u64 {
        self.remaining_time_in_millis
    }

    pub fn memory_limit_in_mb(&self) -> u32 {
        self.memory_limit_in_mb
    }

    pub fn logger(&self) -> &ContextLogger {
        &self.logger
    }
}

/// The fixed context every invocation receives unless settings override it.
pub fn build_context() -> MockContext {
    ContextSettings::default().build()
}

/// Per-function overrides for the mock context. Values are normalized the
/// way the deployment tooling normalizes function settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextSettings {
    pub function_name: String,
    pub memory_limit_in_mb: u32,
    pub timeout_secs: Option<u64>,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            function_name: DEFAULT_FUNCTION_NAME.to_string(),
            memory_limit_in_mb: DEFAULT_MEMORY_LIMIT_MB,
            timeout_secs: None,
        }
    }
}

impl ContextSettings {
    pub fn new(
        function_name: impl Into<String>,
        memory_limit_in_mb: u32,
        timeout_secs: Option<u64>,
    ) -> Self {
        Self {
            function_name: function_name.into(),
            memory_limit_in_mb,
            timeout_secs,
        }
    }

    pub fn build(&self) -> MockContext {
        let function_name = if self.function_name.trim().is_empty() {
            DEFAULT_FUNCTION_NAME.to_string()
        } else {
            self.function_name.clone()
        };

        MockContext {
            aws_request_id: MOCK_REQUEST_ID.to_string(),
            log_group_name: None,
            log_stream_name: None,
            function_name: function_name.clone(),
            function_version: DEFAULT_FUNCTION_VERSION.to_string(),
            invoked_function_arn: String::new(),
            identity: None,
            client_context: None,
            remaining_time_in_millis: self
                .timeout_secs
                .map(|secs| normalize_timeout_secs(secs) * 1_000)
                .unwrap_or(0),
            memory_limit_in_mb: normalize_memory_mb(self.memory_limit_in_mb),
            logger: ContextLogger {
                request_id: MOCK_REQUEST_ID.to_string(),
                function_name,
            },
        }
    }
}

/// Rounds down to a multiple of 64 MB within `[64, 1536]`.
pub fn normalize_memory_mb(memory_mb: u32) -> u32 {
    let rounded = memory_mb - (memory_mb % MEMORY_STEP_MB);
    rounded.clamp(MEMORY_STEP_MB, MAX_MEMORY_LIMIT_MB)
}

pub fn normalize_timeout_secs(timeout_secs: u64) -> u64 {
    timeout_secs.clamp(MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS)
}
