use invoke_harness_core::{EntryTable, HandlerError, HandlerUnit, MockContext};

/// Panics with the raw payload as the panic message. Used to check how a
/// panicking handler is reported.
#[derive(Debug, Default)]
pub struct Crash;

impl HandlerUnit for Crash {
    fn construct() -> Result<Self, HandlerError> {
        Ok(Self)
    }

    fn entry_points(table: &mut EntryTable<Self>) {
        table.handler("handler", Self::handler);
    }
}

impl Crash {
    pub fn handler(&self, payload: String, _context: &MockContext) -> Result<String, HandlerError> {
        panic!("{payload}");
    }
}
