//! CLI parse tests.

use super::Cli;
use clap::Parser;

pub(super) fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(args).unwrap()
}

pub(super) fn parse_err(args: &[&str]) -> clap::error::ErrorKind {
    Cli::try_parse_from(args).unwrap_err().kind()
}
