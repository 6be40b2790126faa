use crate::cli::VerbosityLevel;
use crate::error::{ConfigError, CxmlError};
use crate::response::{CxmlResponse, ResponseKind};

/// User-facing output of the command-line tool
pub struct Reporter {
    verbosity: VerbosityLevel,
}

impl Reporter {
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self { verbosity }
    }

    pub fn verbosity(&self) -> VerbosityLevel {
        self.verbosity
    }

    /// Report an error with appropriate verbosity
    pub fn report_error(&self, error: &CxmlError) {
        eprintln!("{}", self.format_error(error));
    }

    /// Report configuration error
    pub fn report_config_error(&self, error: &ConfigError) {
        eprintln!("Configuration error: {}", error);
        if self.verbosity == VerbosityLevel::Verbose {
            eprintln!("{}", config_help(error));
        }
    }

    /// Print a submit result on stdout
    pub fn report_response(&self, response: &CxmlResponse) {
        if self.verbosity == VerbosityLevel::Quiet {
            return;
        }
        println!("{}", self.format_response(response));
    }

    /// Print rendered wire text on stdout
    pub fn report_rendered(&self, xml: &str) {
        println!("{}", xml);
    }

    pub fn format_error(&self, error: &CxmlError) -> String {
        match self.verbosity {
            VerbosityLevel::Quiet => format_error_brief(error),
            VerbosityLevel::Normal => format!("Error: {}", error),
            VerbosityLevel::Verbose => self.format_error_verbose(error),
        }
    }

    fn format_error_verbose(&self, error: &CxmlError) -> String {
        let mut output = format!("Error: {}", error);

        match error {
            CxmlError::SchemaInvalid { errors, .. } => {
                for message in errors {
                    output.push_str(&format!("\n  - {}", message));
                }
                output.push_str("\nSuggestion: Compare the rendered document with the DTD");
            }
            CxmlError::Http(_) | CxmlError::Timeout { .. } => {
                output.push_str("\nSuggestion: Check network connectivity and the destination URL");
            }
            CxmlError::HttpStatus { status, .. } if *status >= 500 => {
                output.push_str("\nSuggestion: The endpoint failed; try again later");
            }
            CxmlError::LibXml2Internal { .. } => {
                output.push_str("\nSuggestion: Check that --dtd-dir holds cXML.dtd and InvoiceDetail.dtd");
            }
            CxmlError::Validation { .. } => {
                output.push_str("\nSuggestion: Fix the named field in the document description");
            }
            _ => {}
        }

        let mut current: &dyn std::error::Error = error;
        while let Some(source) = current.source() {
            output.push_str(&format!("\nCaused by: {}", source));
            current = source;
        }

        output
    }

    pub fn format_response(&self, response: &CxmlResponse) -> String {
        let mut output = match response.kind() {
            ResponseKind::Test => "Test destination: nothing was sent".to_string(),
            ResponseKind::Empty => "Endpoint accepted the document with an empty reply".to_string(),
            ResponseKind::Received { http_status } => match response.status() {
                Some(status) => format!(
                    "HTTP {}: cXML status {} {}",
                    http_status, status.code, status.text
                ),
                None => format!("HTTP {}: reply carried no cXML status", http_status),
            },
        };

        if self.verbosity == VerbosityLevel::Verbose {
            output.push('\n');
            output.push_str(response.body());
        }

        output
    }
}

fn config_help(error: &ConfigError) -> &'static str {
    match error {
        ConfigError::TomlParsing(_) | ConfigError::JsonParsing(_) => {
            "Check the syntax of cxml-outbound.toml or cxml-outbound.json"
        }
        ConfigError::Environment(_) => "Check the CXML_* environment variables",
        ConfigError::UnsupportedFormat(_) => "Configuration files must end in .toml or .json",
        _ => "Run with --help to see the available options",
    }
}

/// One line per error for quiet mode
fn format_error_brief(error: &CxmlError) -> String {
    match error {
        CxmlError::Validation { entity, field, .. } => format!("INVALID {}: {}", entity, field),
        CxmlError::SchemaInvalid { dtd, errors } => {
            format!("DTD INVALID ({}): {} error(s)", dtd, errors.len())
        }
        _ => format!("ERROR: {}", error),
    }
}
