//! Command-line interface

use std::convert::Infallible;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use common::Secret;

use crate::resources::{Page, Resource};

/// SmartGas back-office console
#[derive(Parser, Debug)]
#[command(name = "smartgas-console", author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to the TOML config file (default: smartgas-console.toml or CONFIG_PATH)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log output format (logs go to stderr)
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Json, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in with email and password and store the session
    Login {
        #[arg(long)]
        email: String,

        #[arg(long, env = "SMARTGAS_PASSWORD", hide_env_values = true, value_parser = parse_secret)]
        password: Option<Secret<String>>,
    },

    /// Remove the stored session
    Logout,

    /// Show whether a session is stored
    Status,

    /// Show the logged-in user
    Me,

    /// List a dashboard resource page by page
    List {
        #[arg(value_enum)]
        resource: Resource,

        #[command(flatten)]
        paging: PageArgs,

        /// Synchronization job type (required for synchronizations)
        #[arg(long = "type")]
        sync_type: Option<String>,
    },

    /// Show a single record
    Get {
        #[arg(value_enum)]
        resource: Resource,

        id: String,

        /// Page of synchronization details
        #[arg(long, default_value_t = 1)]
        page: u32,

        #[arg(long, default_value_t = 10)]
        limit: u32,
    },

    /// Show the latest synchronization of a job type
    LastSync {
        #[arg(long = "type")]
        sync_type: String,
    },

    /// Start a synchronization against the POS system
    SyncNow {
        #[arg(long = "type")]
        sync_type: String,
    },

    /// Send a raw API call through the session gateway
    Request {
        /// HTTP method (GET, POST, PUT, DELETE, ...)
        method: String,

        /// Path relative to the API base URL, query string included
        path: String,

        /// JSON request body
        #[arg(long)]
        body: Option<String>,
    },
}

/// Grid paging flags
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct PageArgs {
    #[arg(long, default_value_t = 1)]
    pub page: u32,

    #[arg(long, default_value_t = 10)]
    pub limit: u32,

    #[arg(long, default_value = "")]
    pub search: String,
}

impl Default for PageArgs {
    fn default() -> Self {
        let page = Page::default();
        Self {
            page: page.page,
            limit: page.limit,
            search: page.search,
        }
    }
}

impl From<PageArgs> for Page {
    fn from(args: PageArgs) -> Self {
        Page {
            page: args.page,
            limit: args.limit,
            search: args.search,
        }
    }
}

fn parse_secret(value: &str) -> Result<Secret<String>, Infallible> {
    Ok(Secret::from(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn parses_list_with_paging() {
        let args = CliArgs::try_parse_from([
            "smartgas-console",
            "list",
            "gas-pumps",
            "--page",
            "3",
            "--search",
            "norte",
        ])
        .unwrap();

        match args.command {
            Command::List {
                resource,
                paging,
                sync_type,
            } => {
                assert_eq!(resource, Resource::GasPumps);
                assert_eq!(paging.page, 3);
                assert_eq!(paging.limit, 10);
                assert_eq!(paging.search, "norte");
                assert!(sync_type.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let args = CliArgs::try_parse_from([
            "smartgas-console",
            "status",
            "--config",
            "/etc/smartgas.toml",
            "--log-format",
            "pretty",
        ])
        .unwrap();
        assert_eq!(args.config, Some(PathBuf::from("/etc/smartgas.toml")));
        assert_eq!(args.log_format, LogFormat::Pretty);
        assert!(matches!(args.command, Command::Status));
    }

    #[test]
    fn login_password_is_redacted_in_debug() {
        let args = CliArgs::try_parse_from([
            "smartgas-console",
            "login",
            "--email",
            "ops@smartgas.mx",
            "--password",
            "hunter2",
        ])
        .unwrap();
        let debug = format!("{args:?}");
        assert!(!debug.contains("hunter2"), "password leaked: {debug}");
        assert!(debug.contains("ops@smartgas.mx"));
    }

    #[test]
    fn get_takes_paging_but_not_search() {
        let args = CliArgs::try_parse_from([
            "smartgas-console",
            "get",
            "synchronizations",
            "s1",
            "--page",
            "2",
        ])
        .unwrap();
        match args.command {
            Command::Get { id, page, limit, .. } => {
                assert_eq!(id, "s1");
                assert_eq!((page, limit), (2, 10));
            }
            other => panic!("unexpected command: {other:?}"),
        }

        assert!(
            CliArgs::try_parse_from([
                "smartgas-console",
                "get",
                "users",
                "u1",
                "--search",
                "ana",
            ])
            .is_err()
        );
    }

    #[test]
    fn unknown_resource_is_rejected() {
        assert!(CliArgs::try_parse_from(["smartgas-console", "list", "invoices"]).is_err());
    }
}
