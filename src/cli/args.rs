//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! - `--config <path>`: Use this configuration file
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal, machine-readable output

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::core::types::{ArtifactKind, LayoutKind, RepositoryRef};

/// sorpush - publish feed artifacts into a GitHub repository
#[derive(Parser, Debug)]
#[command(name = "sorpush")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (default: $SORPUSH_CONFIG, then the standard locations)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

fn parse_repo(s: &str) -> Result<RepositoryRef, String> {
    RepositoryRef::parse(s).map_err(|e| e.to_string())
}

fn parse_kind(s: &str) -> Result<ArtifactKind, String> {
    s.parse::<ArtifactKind>().map_err(|e| e.to_string())
}

fn parse_layout(s: &str) -> Result<LayoutKind, String> {
    s.parse()
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage the GitHub credential
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },

    /// Create a branch from the default branch head (no-op if it exists)
    Branch {
        /// Repository as owner/name
        #[arg(long, value_parser = parse_repo)]
        repo: RepositoryRef,

        /// Branch to create
        name: String,
    },

    /// Publish a feed artifact at its layout-derived path
    #[command(after_help = "\
EXAMPLES:
    # Flat SOR: lands at src/batch/sor1/sql/orders.sql
    sorpush push --repo octocat/feeds --branch feature/orders \\
        --sor sor1 --feed orders --kind sql --file orders.sql

    # Content from stdin
    cat orders.json | sorpush push --repo octocat/feeds --branch main \\
        --sor sor2 --feed orders --kind json --file -")]
    Push {
        /// Repository as owner/name
        #[arg(long, value_parser = parse_repo)]
        repo: RepositoryRef,

        /// Target branch
        #[arg(long)]
        branch: String,

        /// System of record
        #[arg(long)]
        sor: String,

        /// Feed name
        #[arg(long)]
        feed: String,

        /// Artifact kind: json, sql, scripts, metadata, hql, ddl
        #[arg(long, value_parser = parse_kind)]
        kind: ArtifactKind,

        /// File to publish, or - for stdin
        #[arg(long, value_name = "PATH")]
        file: PathBuf,

        /// Commit message
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Create a new file at an explicit path (fails if it exists)
    Add {
        #[arg(long, value_parser = parse_repo)]
        repo: RepositoryRef,

        #[arg(long)]
        branch: String,

        /// Repository-relative destination path
        #[arg(long)]
        path: String,

        /// File to publish, or - for stdin
        #[arg(long, value_name = "PATH")]
        file: PathBuf,

        #[arg(short, long)]
        message: String,
    },

    /// Replace an existing file at an explicit path
    Update {
        #[arg(long, value_parser = parse_repo)]
        repo: RepositoryRef,

        #[arg(long)]
        branch: String,

        /// Repository-relative destination path
        #[arg(long)]
        path: String,

        /// File to publish, or - for stdin
        #[arg(long, value_name = "PATH")]
        file: PathBuf,

        #[arg(short, long)]
        message: String,

        /// Create the file if it does not exist
        #[arg(long)]
        upsert: bool,
    },

    /// Merge one branch into another on the provider
    Merge {
        #[arg(long, value_parser = parse_repo)]
        repo: RepositoryRef,

        /// Branch receiving the merge
        #[arg(long)]
        base: String,

        /// Branch being merged
        #[arg(long)]
        head: String,

        #[arg(short, long)]
        message: Option<String>,
    },

    /// Show which layout a SOR uses
    Layout {
        #[arg(long, value_parser = parse_repo)]
        repo: RepositoryRef,

        #[arg(long)]
        sor: String,
    },

    /// Print the destination path for an artifact (offline)
    Path {
        #[arg(long)]
        sor: String,

        #[arg(long)]
        feed: String,

        #[arg(long, value_parser = parse_kind)]
        kind: ArtifactKind,

        /// flat or nested
        #[arg(long, value_parser = parse_layout)]
        layout: LayoutKind,
    },

    /// Run a JSON operation request
    #[command(after_help = "\
EXAMPLES:
    echo '{\"operation\":\"createBranch\",\"owner\":\"octocat\",\"repo\":\"feeds\",\"branchName\":\"feature\"}' \\
        | sorpush run --request -")]
    Run {
        /// Request file, or - for stdin
        #[arg(long, value_name = "PATH")]
        request: PathBuf,
    },

    /// List repositories you can push to
    Repos,

    /// List branches of a repository
    Branches {
        #[arg(long, value_parser = parse_repo)]
        repo: RepositoryRef,
    },
}

/// Authentication actions.
#[derive(Subcommand, Debug)]
pub enum AuthAction {
    /// Print the OAuth authorization URL and remember its state
    Url {
        /// Also open the URL in a browser
        #[arg(long)]
        open: bool,
    },

    /// Exchange the callback code for a token and store it
    Exchange {
        #[arg(long)]
        code: String,

        #[arg(long)]
        state: String,
    },

    /// Store a personal access token (prompts if omitted)
    Token {
        #[arg(long)]
        token: Option<String>,
    },

    /// Show whether a credential is available
    Status,

    /// Remove the stored credential
    Logout,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_push() {
        let cli = Cli::try_parse_from([
            "sorpush", "push", "--repo", "octocat/feeds", "--branch", "main", "--sor", "sor1",
            "--feed", "orders", "--kind", "SQL", "--file", "-",
        ])
        .unwrap();
        match cli.command {
            Command::Push { repo, kind, .. } => {
                assert_eq!(repo.to_string(), "octocat/feeds");
                assert_eq!(kind, ArtifactKind::Sql);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn rejects_unknown_kind_and_bad_repo() {
        assert!(Cli::try_parse_from([
            "sorpush", "path", "--sor", "s", "--feed", "f", "--kind", "parquet", "--layout", "flat",
        ])
        .is_err());
        assert!(Cli::try_parse_from(["sorpush", "branches", "--repo", "no-slash"]).is_err());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["sorpush", "repos", "--debug", "-q"]).unwrap();
        assert!(cli.debug);
        assert!(cli.quiet);
    }
}
