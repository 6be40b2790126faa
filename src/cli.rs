use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum VerbosityLevel {
    /// Only show errors
    Quiet,
    #[default]
    Normal,
    /// Show rendered payloads and response bodies too
    Verbose,
}

impl VerbosityLevel {
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        if quiet {
            VerbosityLevel::Quiet
        } else if verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }

    /// Default `tracing` filter directive when `RUST_LOG` is unset
    pub fn log_directive(&self) -> &'static str {
        match self {
            VerbosityLevel::Quiet => "error",
            VerbosityLevel::Normal => "warn",
            VerbosityLevel::Verbose => "cxml_outbound=debug,info",
        }
    }
}

/// Build, validate and submit cXML purchase orders and invoices
#[derive(Parser, Debug, Clone)]
#[command(name = "cxml-outbound")]
#[command(about = "Build, validate and submit cXML purchase orders and invoices")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (TOML or JSON)
    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// HTTP request timeout in seconds
    #[arg(long = "timeout", global = true)]
    pub timeout: Option<u64>,

    /// Directory holding cXML.dtd and InvoiceDetail.dtd
    #[arg(long = "dtd-dir", global = true)]
    pub dtd_dir: Option<PathBuf>,

    /// DTD-validate orders before sending (invoices always are)
    #[arg(long = "validate-orders", global = true)]
    pub validate_orders: bool,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(
        short = 'q',
        long = "quiet",
        global = true,
        help = "Quiet mode",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Print the wire text for a JSON document description
    Render {
        /// JSON document description
        file: PathBuf,

        /// Emit without indentation
        #[arg(long = "compact")]
        compact: bool,
    },
    /// Build, validate and submit a document; `%%TEST%%` stays offline
    Submit {
        /// JSON document description
        file: PathBuf,

        /// Destination endpoint
        #[arg(long = "url")]
        url: String,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn verbosity(&self) -> VerbosityLevel {
        VerbosityLevel::from_flags(self.verbose, self.quiet)
    }

    /// Document description the subcommand operates on
    pub fn input_file(&self) -> &PathBuf {
        match &self.command {
            Command::Render { file, .. } | Command::Submit { file, .. } => file,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        let file = self.input_file();
        if !file.exists() {
            return Err(format!("File does not exist: {}", file.display()));
        }
        if self.timeout == Some(0) {
            return Err("Timeout must be greater than 0".to_string());
        }
        Ok(())
    }
}
