use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::core::orchestrator::QueryType;

#[derive(Parser, Debug)]
#[command(name = "tire-intel", version, about = "Tire manufacturing intelligence CLI")]
pub struct Cli {
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    pub json: bool,
    #[arg(
        long,
        global = true,
        default_value = ".",
        help = "Workspace root holding .env, data/ and testing/"
    )]
    pub root: PathBuf,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the workspace directories and .env
    Setup,
    /// Show version, workspace files and component health
    Status,
    /// Process a single query
    Query {
        query: String,
        #[arg(long = "type", value_enum, default_value_t = QueryType::Auto)]
        query_type: QueryType,
    },
    /// Run the system self-test and the performance harness
    Test,
    /// Start the system and answer queries from stdin
    Start {
        #[arg(long, default_value_t = false, help = "Run system tests after initialization")]
        test: bool,
    },
    /// Show KPIs and write the daily report
    Dashboard {
        #[arg(long, default_value_t = false, help = "Serve the dashboard API over HTTP")]
        serve: bool,
        #[arg(long, help = "Port for --serve (defaults to DASHBOARD_PORT)")]
        port: Option<u16>,
    },
    /// Show the security report and OWASP checklist
    Security,
    /// Development utilities
    Dev {
        #[command(subcommand)]
        command: DevCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum DevCommands {
    Format,
    Lint,
    SecurityScan,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn query_type_parses_snake_case_names() {
        let cli = Cli::try_parse_from(["tire-intel", "query", "why", "--type", "agentic_rag"]).unwrap();
        match cli.command {
            Commands::Query { query, query_type } => {
                assert_eq!(query, "why");
                assert_eq!(query_type, QueryType::AgenticRag);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn unknown_query_type_is_rejected() {
        assert!(Cli::try_parse_from(["tire-intel", "query", "why", "--type", "vector"]).is_err());
    }

    #[test]
    fn global_flags_follow_subcommands() {
        let cli = Cli::try_parse_from(["tire-intel", "dev", "security-scan", "--json", "--root", "/tmp/w"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.root, PathBuf::from("/tmp/w"));
        assert!(matches!(cli.command, Commands::Dev { command: DevCommands::SecurityScan }));
    }
}
