//! Local invocation primitives for serverless handler units.
//!
//! This crate owns handler resolution, the mock execution context, stdin
//! framing, input shape adaptation and the invocation driver. It intentionally
//! excludes CLI parsing, logging setup and process exit handling, which live in
//! `invoke_harness_handlers`.

pub mod context;
pub mod driver;
pub mod error;
pub mod framing;
pub mod reference;
pub mod registry;
pub mod shape;

pub use context::{build_context, ContextSettings, MockContext};
pub use driver::{InvocationDriver, InvocationStage};
pub use error::{HandlerError, HarnessError, RegistrationError};
pub use reference::HandlerReference;
pub use registry::{EntryTable, HandlerUnit, Registry, ResolvedHandler};
pub use shape::{DecodedInput, InputShape};
