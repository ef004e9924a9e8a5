pub mod context_store;
pub mod logging;
