//! CLI command handlers, one file per subcommand.

mod clean;
mod generate;
mod run;
mod status;

pub use clean::run_clean;
pub use generate::{run_completions, run_man};
pub use run::{build_run_config, run_sieve};
pub use status::run_status;
