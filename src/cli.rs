//! Command-line interface
//!
//! Flag parsing is delegated to `clap`. Failures are turned into a [`ParseFailure`]
//! value that renders to plain or coloured text; nothing here touches the console,
//! so the caller decides where the text goes and whether colour is appropriate.

use ansi_term::Colour;
use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::{CommandFactory, Parser};
use std::ffi::OsString;
use std::path::PathBuf;

use crate::config::Scheme;

const HEADING: &str = "Giles File Server\n==================";

#[derive(Parser, Debug, Clone)]
#[command(name = "giles", version, about = HEADING, long_about = None)]
pub struct Cli {
    /// Port to host the file server on
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    /// Url or ip address to host on. 0.0.0.0 listens on all available addresses
    #[arg(short, long, default_value = "0.0.0.0")]
    pub url: String,

    /// Root path of the file share. The current working directory is used when omitted
    #[arg(short = 'r', long = "rootPath", value_name = "PATH")]
    pub root_path: Option<PathBuf>,

    /// Scheme to use, either http or https
    #[arg(short, long, value_enum, default_value_t = Scheme::Http)]
    pub scheme: Scheme,

    /// Settings file for logging and performance tuning
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Why parsing did not produce a [`Cli`]
#[derive(Debug)]
pub enum ParseOutcome {
    /// Help or version text was requested; print it to stdout and exit successfully
    Info(String),
    /// The arguments were malformed
    Failure(ParseFailure),
}

/// A rendered-on-demand description of malformed arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    pub headline: String,
    pub usage: String,
}

impl ParseFailure {
    fn from_clap(err: &clap::Error) -> Self {
        let headline = match (err.kind(), err.get(ContextKind::InvalidArg)) {
            (ErrorKind::UnknownArgument, Some(ContextValue::String(token))) => {
                format!("Option: {token} is unknown")
            }
            _ => err
                .to_string()
                .lines()
                .next()
                .unwrap_or_default()
                .trim_start_matches("error: ")
                .to_string(),
        };

        Self {
            headline,
            usage: Cli::command().render_help().to_string(),
        }
    }

    /// Render the failure, painting the headline red when `color` is set
    pub fn render(&self, color: bool) -> String {
        let headline = if color {
            Colour::Red.paint(self.headline.as_str()).to_string()
        } else {
            self.headline.clone()
        };
        format!("\n{headline}\n\n{}", self.usage)
    }
}

/// Parse arguments (including the program name in first position)
pub fn parse_args<I, T>(args: I) -> Result<Cli, ParseOutcome>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Cli::try_parse_from(args).map_err(|err| match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ParseOutcome::Info(err.to_string()),
        _ => ParseOutcome::Failure(ParseFailure::from_clap(&err)),
    })
}
