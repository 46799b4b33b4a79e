use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::process::DEFAULT_TIMEOUT_SECS;

/// Ansible MCP server - expose Ansible command-line tools over MCP
///
/// ansible-mcp keeps a registry of Ansible projects (root, inventory, roles
/// and collections paths, extra environment) and serves tools that run
/// ansible, ansible-playbook, ansible-inventory, ansible-vault and
/// ansible-galaxy inside the resolved project. Without a subcommand it
/// serves MCP over stdin/stdout.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (defaults to ./.ansible-mcp-config.json, then ~/.ansible-mcp-config.json)
    #[arg(long, global = true, env = "MCP_ANSIBLE_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Subprocess timeout in seconds
    #[arg(
        long,
        global = true,
        env = "MCP_ANSIBLE_TIMEOUT",
        value_name = "SECS",
        default_value_t = DEFAULT_TIMEOUT_SECS
    )]
    pub timeout: u64,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve MCP over stdin/stdout (default)
    Serve,

    /// List registered projects
    Projects,

    /// Register or replace a project
    Register {
        /// Project name
        #[arg(value_name = "NAME")]
        name: String,

        /// Project root directory
        #[arg(value_name = "ROOT")]
        root: String,

        /// Inventory path, relative to the project root
        #[arg(short, long, value_name = "PATH")]
        inventory: Option<String>,

        /// Colon-separated roles search paths
        #[arg(long, value_name = "PATHS")]
        roles_path: Option<String>,

        /// Colon-separated collections search paths
        #[arg(long, value_name = "PATHS")]
        collections_paths: Option<String>,

        /// Make this the default project
        #[arg(short, long)]
        default: bool,
    },

    /// Print the environment a project's commands run with
    ///
    /// Only variables that differ from the current environment are printed,
    /// as sorted KEY=VALUE lines.
    Env {
        /// Project name (defaults to the resolved project)
        #[arg(short, long, value_name = "NAME")]
        project: Option<String>,
    },

    /// Validate the configuration file
    Check,

    /// List the tools served over MCP
    Tools,

    /// Invoke a single tool and print its result
    Call {
        /// Tool name
        #[arg(value_name = "TOOL")]
        tool: String,

        /// Tool arguments as a JSON object
        #[arg(value_name = "ARGS_JSON")]
        arguments: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["ansible-mcp"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.timeout, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_register_flags() {
        let cli = Cli::try_parse_from([
            "ansible-mcp",
            "register",
            "infra",
            "~/infra",
            "--inventory",
            "hosts.ini",
            "--roles-path",
            "roles",
            "--default",
            "--timeout",
            "60",
        ])
        .unwrap();

        assert_eq!(cli.timeout, 60);
        match cli.command {
            Some(Commands::Register {
                name,
                root,
                inventory,
                roles_path,
                collections_paths,
                default,
            }) => {
                assert_eq!(name, "infra");
                assert_eq!(root, "~/infra");
                assert_eq!(inventory.as_deref(), Some("hosts.ini"));
                assert_eq!(roles_path.as_deref(), Some("roles"));
                assert!(collections_paths.is_none());
                assert!(default);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
