//! Handler units runnable through the local invoke harness, plus the
//! process-level adapters (`local_invoke` logging setup and the registry
//! the binary resolves references against).

pub mod adapters;
pub mod handlers;

use invoke_harness_core::{RegistrationError, Registry};

use crate::handlers::context_file::ContextHello;
use crate::handlers::crash::Crash;
use crate::handlers::echo::Echo;
use crate::handlers::greeting::Greeter;
use crate::handlers::helloworld::Hello;

/// Registry with every unit this crate ships.
pub fn default_registry() -> Result<Registry, RegistrationError> {
    let mut registry = Registry::new();
    registry
        .register::<Hello>("helloworld.Hello")?
        .register::<ContextHello>("example.Hello")?
        .register::<Echo>("echo.Echo")?
        .register::<Greeter>("greeting.Greeter")?
        .register::<Crash>("crash.Crash")?;
    Ok(registry)
}
