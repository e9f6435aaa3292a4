//! Command-line argument parsing and processing.
//!
//! This module handles parsing of command-line arguments and provides a clean
//! interface for the main application logic. It supports the standard help,
//! version, and debug flags while gracefully handling unknown options.

use crate::logger::Log;

/// Represents the parsed command-line arguments and their intended actions.
#[derive(Debug, PartialEq)]
pub enum CliAction {
    /// Run the daemon with these settings
    Run { debug_enabled: bool },
    /// Ask the running daemon to re-read its configuration
    Reload { debug_enabled: bool },
    /// Print the current period, the next boundary and the daemon state
    Status { debug_enabled: bool },
    /// Dispatch one trigger immediately, outside the daemon
    Apply { debug_enabled: bool, action: String },
    /// Display help information and exit
    ShowHelp,
    /// Display version information and exit
    ShowVersion,
    /// Show help due to unknown arguments and exit
    ShowHelpDueToError,
}

/// Result of parsing command-line arguments.
pub struct ParsedArgs {
    pub action: CliAction,
}

impl ParsedArgs {
    /// Parse command-line arguments into a structured result.
    ///
    /// The first item is the program name and is skipped.
    pub fn parse<I, S>(args: I) -> ParsedArgs
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut debug_enabled = false;
        let mut display_help = false;
        let mut display_version = false;
        let mut run_reload = false;
        let mut run_status = false;
        let mut apply_action: Option<String> = None;
        let mut unknown_arg_found = false;

        let args_vec: Vec<String> = args
            .into_iter()
            .skip(1)
            .map(|s| s.as_ref().to_string())
            .collect();

        let mut i = 0;
        while i < args_vec.len() {
            let arg_str = &args_vec[i];
            match arg_str.as_str() {
                "--help" | "-h" => display_help = true,
                "--version" | "-V" | "-v" => display_version = true,
                "--debug" | "-d" => debug_enabled = true,
                "--reload" | "-r" => run_reload = true,
                "--status" | "-s" => run_status = true,
                "--apply" | "-a" => {
                    // Parse: --apply <action>
                    match args_vec.get(i + 1) {
                        Some(value) if !value.starts_with('-') => {
                            apply_action = Some(value.clone());
                            i += 1;
                        }
                        _ => {
                            Log::log_warning(
                                "Missing argument for --apply. Usage: --apply <day|night>",
                            );
                            unknown_arg_found = true;
                        }
                    }
                }
                _ => {
                    if arg_str.starts_with('-') {
                        Log::log_warning(&format!("Unknown option: {}", arg_str));
                        unknown_arg_found = true;
                    }
                    // Non-option arguments are currently ignored
                }
            }
            i += 1;
        }

        let action = if display_version {
            CliAction::ShowVersion
        } else if unknown_arg_found {
            CliAction::ShowHelpDueToError
        } else if display_help {
            CliAction::ShowHelp
        } else if run_reload {
            CliAction::Reload { debug_enabled }
        } else if run_status {
            CliAction::Status { debug_enabled }
        } else if let Some(action) = apply_action {
            CliAction::Apply {
                debug_enabled,
                action,
            }
        } else {
            CliAction::Run { debug_enabled }
        };

        ParsedArgs { action }
    }

    /// Convenience method to parse from std::env::args()
    pub fn from_env() -> ParsedArgs {
        Self::parse(std::env::args())
    }
}

/// Displays version information using custom logging style.
pub fn display_version_info() {
    Log::log_version();
    Log::log_pipe();
    println!("┗ {}", env!("CARGO_PKG_DESCRIPTION"));
}

/// Displays custom help message using logger methods.
pub fn display_help() {
    Log::log_version();
    Log::log_block_start(env!("CARGO_PKG_DESCRIPTION"));
    Log::log_block_start("Usage: nightcolors [OPTIONS]");
    Log::log_block_start("Options:");
    Log::log_indented("-a, --apply <day|night>   Apply a profile now through the dispatcher");
    Log::log_indented("-d, --debug               Enable detailed debug output");
    Log::log_indented("-h, --help                Print help information");
    Log::log_indented("-r, --reload              Make the running daemon re-read its config");
    Log::log_indented("-s, --status              Show the current period and next boundary");
    Log::log_indented("-V, --version             Print version information");
    Log::log_end();
}
