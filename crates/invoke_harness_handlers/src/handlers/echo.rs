use invoke_harness_core::{EntryTable, HandlerError, HandlerUnit, MockContext};

/// Returns the raw payload unchanged.
#[derive(Debug, Default)]
pub struct Echo;

impl HandlerUnit for Echo {
    fn construct() -> Result<Self, HandlerError> {
        Ok(Self)
    }

    fn entry_points(table: &mut EntryTable<Self>) {
        table.handler("handler", Self::handler);
    }
}

impl Echo {
    pub fn handler(&self, payload: String, context: &MockContext) -> Result<String, HandlerError> {
        context
            .logger()
            .log(format!("echoing {} bytes", payload.len()));
        Ok(payload)
    }
}
