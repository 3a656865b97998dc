//! Command-line interface definitions.

use clap::{Parser, Subcommand};

/// Build the book and publish it to the hosting branch
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// subcommand, `build` when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Render the book and assemble the output directory
    Build,

    /// Open the built book in the default viewer
    Open,

    /// Build from a clean clone and push to the hosting branch
    Publish,

    /// Rebuild whenever the text or static files change
    Watch,
}

impl Cli {
    pub fn selected(&self) -> Commands {
        self.command.unwrap_or(Commands::Build)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("bookpress").chain(args.iter().copied()))
    }

    #[test]
    fn test_cli_is_consistent() {
        <Cli as CommandFactory>::command().debug_assert();
    }

    #[test]
    fn test_no_argument_builds() {
        assert_eq!(parse(&[]).unwrap().selected(), Commands::Build);
    }

    #[test]
    fn test_subcommands() {
        assert_eq!(parse(&["open"]).unwrap().selected(), Commands::Open);
        assert_eq!(parse(&["publish"]).unwrap().selected(), Commands::Publish);
        assert_eq!(parse(&["watch"]).unwrap().selected(), Commands::Watch);
    }

    #[test]
    fn test_rejects_unknown_and_extra_arguments() {
        assert!(parse(&["deploy"]).is_err());
        assert!(parse(&["build", "watch"]).is_err());
        assert!(parse(&["build", "--fast"]).is_err());
    }
}
