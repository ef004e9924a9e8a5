use std::any::Any;
use std::fmt;
use std::io::BufRead;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;

use crate::context::ContextSettings;
use crate::error::{HandlerError, HarnessError};
use crate::framing::read_payload;
use crate::registry::Registry;
use crate::shape::DecodedInput;

/// Stages of a single run. Transitions only move forward; `Failed` and
/// `Succeeded` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum InvocationStage {
    Idle,
    Resolving,
    ReadingInput,
    Decoding,
    Invoking,
    Succeeded,
    Failed,
}

impl InvocationStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Resolving => "resolving",
            Self::ReadingInput => "reading_input",
            Self::Decoding => "decoding",
            Self::Invoking => "invoking",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }

    fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl fmt::Display for InvocationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runs one handler invocation: resolve, read stdin, decode, invoke.
pub struct InvocationDriver<'a> {
    registry: &'a Registry,
    settings: ContextSettings,
    stage: InvocationStage,
}

impl<'a> InvocationDriver<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self {
            registry,
            settings: ContextSettings::default(),
            stage: InvocationStage::Idle,
        }
    }

    pub fn with_context_settings(mut self, settings: ContextSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Returns the `output: <value>` line on success. Nothing is written
    /// anywhere but the log stream; the caller owns stdout.
    pub fn run(mut self, reference: &str, stdin: impl BufRead) -> Result<String, HarnessError> {
        tracing::info!(
            component = "invoke_driver",
            event = "invocation_started",
            reference
        );

        match self.run_stages(reference, stdin) {
            Ok(output) => {
                self.advance(InvocationStage::Succeeded);
                tracing::info!(
                    component = "invoke_driver",
                    event = "invocation_succeeded",
                    reference,
                    output_len = output.len()
                );
                Ok(format!("output: {output}"))
            }
            Err(error) => {
                let failed_stage = self.stage;
                self.advance(InvocationStage::Failed);
                tracing::error!(
                    component = "invoke_driver",
                    event = "invocation_failed",
                    reference,
                    kind = error.kind(),
                    stage = %failed_stage,
                    error = %error
                );
                Err(error)
            }
        }
    }

    fn run_stages(&mut self, reference: &str, stdin: impl BufRead) -> Result<String, HarnessError> {
        self.advance(InvocationStage::Resolving);
        let handler = self.registry.resolve(reference)?;
        tracing::info!(
            component = "invoke_driver",
            event = "handler_resolved",
            reference = %handler.reference(),
            input_shape = handler.input_shape().label(),
            input_type = %handler.input_shape()
        );

        self.advance(InvocationStage::ReadingInput);
        let raw = read_payload(stdin)?;
        tracing::info!(
            component = "invoke_driver",
            event = "input_read",
            bytes = raw.text.len(),
            lines = raw.lines,
            end = ?raw.end,
            fingerprint = %raw.fingerprint()
        );

        self.advance(InvocationStage::Decoding);
        let decoded = DecodedInput::decode(&raw.text, handler.input_shape())?;
        tracing::info!(
            component = "invoke_driver",
            event = "input_decoded",
            fields = decoded.field_count()
        );
        let call = handler.bind(decoded)?;

        self.advance(InvocationStage::Invoking);
        let context = self.settings.build();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|error| HarnessError::HandlerInvocation {
                reference: reference.to_string(),
                source: Box::new(error),
            })?;

        let outcome = runtime.block_on(AssertUnwindSafe(call(context)).catch_unwind());
        match outcome {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(source)) => Err(HarnessError::HandlerInvocation {
                reference: reference.to_string(),
                source,
            }),
            Err(panic) => Err(HarnessError::HandlerInvocation {
                reference: reference.to_string(),
                source: panic_cause(panic),
            }),
        }
    }

    fn advance(&mut self, next: InvocationStage) {
        debug_assert!(
            !self.stage.is_terminal() && next > self.stage,
            "invalid stage transition {} -> {}",
            self.stage,
            next
        );
        tracing::debug!(
            component = "invoke_driver",
            event = "stage_changed",
            from = %self.stage,
            to = %next
        );
        self.stage = next;
    }
}

fn panic_cause(panic: Box<dyn Any + Send>) -> HandlerError {
    let message = if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    };
    format!("handler panicked: {message}").into()
}
