//! Publishing run: configuration, connection, synchronization, summary.

use md2conf_config::Config;
use md2conf_confluence::{ConfluenceSession, PageApi};
use md2conf_renderer::{Converter, ConverterOptions};
use md2conf_sync::{SyncOptions, SyncReport, Synchronizer};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::Cli;
use crate::error::CliError;
use crate::output::Output;

/// Publish `cli.mdpath` and print a summary.
///
/// # Errors
///
/// Returns an error if configuration is invalid, the connection fails, the
/// run aborts, or the report is not successful.
pub(crate) fn run(cli: &Cli, output: &Output) -> Result<(), CliError> {
    let config = Config::load(cli.config.as_deref(), Some(&cli.settings()))?;
    init_logging(&config);
    if let Some(path) = &config.config_path {
        debug!(path = %path.display(), "Loaded configuration");
    }

    let settings = config.require_confluence()?;
    let session = ConfluenceSession::connect(&settings)?;
    output.info(&format!(
        "Publishing {} to space {} at {}",
        cli.mdpath.display(),
        session.space_key(),
        session.base_url()
    ));

    let publish = &config.publish;
    let options = SyncOptions {
        converter: Converter::new(ConverterOptions {
            ignore_invalid_url: publish.ignore_invalid_url,
            generated_by: publish.generated_by.clone().into_inner(),
        }),
        tolerate_partial: publish.tolerate_partial,
        root_page: publish.root_page.clone(),
    };
    let result = Synchronizer::new(&session, options).synchronize(&cli.mdpath);
    session.close();
    let report = result?;

    print_report(output, &report);

    if report.succeeded(publish.tolerate_partial) {
        Ok(())
    } else {
        Err(CliError::Incomplete {
            failed: report.failed(),
            unresolved: report.unresolved.len(),
        })
    }
}

/// Install the tracing subscriber. `RUST_LOG` wins over the configured level.
fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log.filter_directive()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_report(output: &Output, report: &SyncReport) {
    if report.is_empty() {
        output.warning("No Markdown documents found.");
        return;
    }

    output.heading("\nSummary");
    for doc in &report.documents {
        output.page(
            &doc.outcome,
            &format!("  {} ({}): {}", doc.title, doc.key, doc.outcome),
        );
        for warning in &doc.warnings {
            output.warning(&format!("    warning: {warning}"));
        }
    }
    for reference in &report.unresolved {
        output.warning(&format!(
            "  unresolved link from {} to {}",
            reference.document, reference.target
        ));
    }

    let counts = format!(
        "\n{} created, {} updated, {} unchanged, {} failed",
        report.created(),
        report.updated(),
        report.unchanged(),
        report.failed()
    );
    if report.failed() == 0 && report.unresolved.is_empty() {
        output.success(&counts);
    } else {
        output.error(&counts);
    }
}

/// Pretty-print a server response body if it is JSON.
pub(crate) fn format_payload(payload: &str) -> String {
    serde_json::from_str::<serde_json::Value>(payload)
        .ok()
        .and_then(|value| serde_json::to_string_pretty(&value).ok())
        .unwrap_or_else(|| payload.to_owned())
}
