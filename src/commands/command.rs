//! Command trait definition for CLI commands.
//!
//! The [`Command`] trait is implemented by every `bcqc` subcommand and dispatched with
//! `enum_dispatch`.

use anyhow::Result;
use enum_dispatch::enum_dispatch;

/// Trait implemented by all bcqc CLI commands.
///
/// `command_line` is the full invocation, logged at debug level for provenance.
#[enum_dispatch]
pub trait Command {
    #[allow(clippy::missing_errors_doc)]
    fn execute(&self, command_line: &str) -> Result<()>;
}
