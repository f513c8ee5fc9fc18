pub mod formatter;

pub use formatter::{format_outcome, print_run_report, print_targets};
