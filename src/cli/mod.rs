//! Command-line interface

pub mod commands;
pub mod output;
pub mod types;

use console::style;
use serde_json::json;

pub use types::{Cli, Commands};

/// Print a command error and exit non-zero
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let body = json!({
            "success": false,
            "error": err.to_string(),
            "chain": err.chain().skip(1).map(ToString::to_string).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("{} {}", style("Error:").red().bold(), output::error_chain(&err));
    }
    std::process::exit(1);
}
