use invoke_harness_core::{EntryTable, HandlerError, HandlerUnit, MockContext};
use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EventClass {
    pub key1: Option<String>,
    pub key2: Option<String>,
    pub key3: Option<String>,
}

/// Logs the three keys it receives and returns the first one.
#[derive(Debug, Default)]
pub struct Hello;

impl HandlerUnit for Hello {
    fn construct() -> Result<Self, HandlerError> {
        Ok(Self)
    }

    fn entry_points(table: &mut EntryTable<Self>) {
        table.handler("handler", Self::handler);
    }
}

impl Hello {
    pub fn handler(&self, event: EventClass, context: &MockContext) -> Result<String, HandlerError> {
        let logger = context.logger();
        logger.log(format!("value1 = {}", display_key(&event.key1)));
        logger.log(format!("value2 = {}", display_key(&event.key2)));
        logger.log(format!("value3 = {}", display_key(&event.key3)));
        Ok(event.key1.unwrap_or_default())
    }
}

fn display_key(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("null")
}
