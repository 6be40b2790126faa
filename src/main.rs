use std::process::ExitCode;

use anyhow::Context;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use cxml_outbound::cli::{Cli, Command};
use cxml_outbound::config::ConfigManager;
use cxml_outbound::document::RenderOptions;
use cxml_outbound::loader::load_document;
use cxml_outbound::reporter::Reporter;
use cxml_outbound::submit::{SubmitEvent, Submitter};
use cxml_outbound::{CxmlError, VerbosityLevel};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse_args();

    if let Err(message) = cli.validate() {
        eprintln!("Error: {}", message);
        return Ok(ExitCode::from(2));
    }

    let config = match ConfigManager::load_config(&cli).await {
        Ok(config) => config,
        Err(error) => {
            Reporter::new(cli.verbosity()).report_config_error(&error);
            return Ok(ExitCode::from(2));
        }
    };

    let verbosity = VerbosityLevel::from_flags(config.output.verbose, config.output.quiet);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.log_directive()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!(error))
        .context("installing the tracing subscriber")?;

    let reporter = Reporter::new(verbosity);
    match run(&cli, &config, &reporter).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(error) => {
            reporter.report_error(&error);
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn run(
    cli: &Cli,
    config: &cxml_outbound::Config,
    reporter: &Reporter,
) -> Result<(), CxmlError> {
    let mut loaded = load_document(cli.input_file()).await?;

    match &cli.command {
        Command::Render { compact, .. } => {
            let options = RenderOptions {
                pretty: config.output.pretty && !compact,
            };
            let xml = loaded.as_document().render(options)?;
            reporter.report_rendered(&xml);
        }
        Command::Submit { url, .. } => {
            let mut submitter = Submitter::from_config(config)?;
            submitter.on_event(|event| match event {
                SubmitEvent::Sending(xml) => debug!(bytes = xml.len(), "sending document"),
                SubmitEvent::Received(body) => debug!(bytes = body.len(), "received reply"),
            });

            let response = submitter.submit(loaded.as_document_mut(), url).await?;
            reporter.report_response(&response);
        }
    }

    Ok(())
}
