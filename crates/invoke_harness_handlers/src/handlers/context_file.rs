//! `example.Hello`: reads deployment settings from the `.context` file in
//! the working directory and returns the configured bucket name.

use invoke_harness_core::{EntryTable, HandlerError, HandlerUnit, MockContext};
use serde::Deserialize;

use crate::adapters::context_store::{ContextStore, FileContextStore};

pub const BUCKET_KEY: &str = "bucket";

/// The entry point takes no fields; any payload object is accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EventClass {}

pub struct ContextHello {
    store: Box<dyn ContextStore>,
}

impl HandlerUnit for ContextHello {
    fn construct() -> Result<Self, HandlerError> {
        Ok(Self::with_store(FileContextStore::in_working_dir()))
    }

    fn entry_points(table: &mut EntryTable<Self>) {
        table.handler("handler", Self::handler);
    }
}

impl ContextHello {
    pub fn with_store(store: impl ContextStore + 'static) -> Self {
        Self {
            store: Box::new(store),
        }
    }

    pub fn handler(&self, _event: EventClass, context: &MockContext) -> Result<String, HandlerError> {
        let values = self.store.load()?;
        let bucket = values
            .get(BUCKET_KEY)
            .and_then(|value| value.as_str())
            .ok_or_else(|| format!("context has no string value for '{BUCKET_KEY}'"))?;

        context.logger().log(format!("bucket = {bucket}"));
        Ok(bucket.to_string())
    }
}
