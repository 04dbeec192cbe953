//! md2conf CLI - publish Markdown documentation to Confluence.
//!
//! Publishes a Markdown file, or a directory tree of them, to a Confluence
//! space. Each document becomes a page; re-running updates only what changed.

mod error;
mod output;
mod publish;

use std::path::PathBuf;

use clap::Parser;
use clap::builder::PossibleValuesParser;
use md2conf_config::{CliSettings, GeneratedBy, LOG_LEVELS};

use output::Output;

/// Publish Markdown files to Confluence wiki.
#[derive(Parser)]
#[command(name = "md2conf", version, about)]
pub(crate) struct Cli {
    /// Markdown file or directory to publish.
    mdpath: PathBuf,

    /// Confluence organization domain (e.g. example.atlassian.net).
    #[arg(short, long, env = "CONFLUENCE_DOMAIN")]
    domain: Option<String>,

    /// Base path of the Confluence wiki (default: /wiki/).
    #[arg(short, long, env = "CONFLUENCE_PATH")]
    path: Option<String>,

    /// Confluence user name.
    #[arg(short, long, env = "CONFLUENCE_USER_NAME")]
    username: Option<String>,

    /// Confluence API key.
    #[arg(
        short = 'a',
        long = "apikey",
        env = "CONFLUENCE_API_KEY",
        hide_env_values = true
    )]
    api_key: Option<String>,

    /// Confluence space key (default: the user's personal space).
    #[arg(short, long, env = "CONFLUENCE_SPACE_KEY")]
    space: Option<String>,

    /// Log level (default: info).
    #[arg(
        short,
        long = "loglevel",
        value_parser = PossibleValuesParser::new(LOG_LEVELS.iter().copied())
    )]
    loglevel: Option<String>,

    /// Footer text appended to every page.
    #[arg(long, conflicts_with = "no_generated_by")]
    generated_by: Option<String>,

    /// Do not append a footer to pages.
    #[arg(long)]
    no_generated_by: bool,

    /// Render links to missing targets as text instead of failing the document.
    #[arg(long)]
    ignore_invalid_url: bool,

    /// Exit successfully even if some documents failed.
    #[arg(long)]
    tolerate_partial: bool,

    /// Title of an existing page to publish top-level pages under.
    #[arg(long)]
    root_page: Option<String>,

    /// Path to configuration file (default: auto-discover md2conf.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl Cli {
    /// Settings given on the command line, overriding the config file.
    fn settings(&self) -> CliSettings {
        let generated_by = if self.no_generated_by {
            Some(GeneratedBy::disabled())
        } else {
            self.generated_by.clone().map(GeneratedBy::text)
        };
        CliSettings {
            domain: self.domain.clone(),
            base_path: self.path.clone(),
            username: self.username.clone(),
            api_key: self.api_key.clone(),
            space_key: self.space.clone(),
            ignore_invalid_url: self.ignore_invalid_url.then_some(true),
            generated_by,
            tolerate_partial: self.tolerate_partial.then_some(true),
            root_page: self.root_page.clone(),
            log_level: self.loglevel.clone(),
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    if let Err(err) = publish::run(&cli, &output) {
        output.error(&format!("Error: {err}"));
        if let Some(payload) = err.payload() {
            output.info(&publish::format_payload(payload));
        }
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_settings_from_flags() {
        let cli = Cli::try_parse_from([
            "md2conf",
            "docs",
            "-d",
            "example.atlassian.net",
            "-s",
            "DOCS",
            "-l",
            "debug",
            "--generated-by",
            "Published by CI",
            "--tolerate-partial",
        ])
        .unwrap();

        let settings = cli.settings();

        assert_eq!(cli.mdpath, PathBuf::from("docs"));
        assert_eq!(settings.domain.as_deref(), Some("example.atlassian.net"));
        assert_eq!(settings.space_key.as_deref(), Some("DOCS"));
        assert_eq!(settings.log_level.as_deref(), Some("debug"));
        assert_eq!(
            settings.generated_by,
            Some(GeneratedBy::text("Published by CI"))
        );
        assert_eq!(settings.tolerate_partial, Some(true));
        assert_eq!(settings.ignore_invalid_url, None);
    }

    #[test]
    fn test_no_generated_by() {
        let cli = Cli::try_parse_from(["md2conf", "docs", "--no-generated-by"]).unwrap();
        assert_eq!(cli.settings().generated_by, Some(GeneratedBy::disabled()));
    }

    #[test]
    fn test_generated_by_flags_conflict() {
        let result = Cli::try_parse_from([
            "md2conf",
            "docs",
            "--generated-by",
            "x",
            "--no-generated-by",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_unknown_log_level() {
        let result = Cli::try_parse_from(["md2conf", "docs", "-l", "chatty"]);
        assert!(result.is_err());
    }
}
