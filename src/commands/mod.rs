use crate::cli::{Cli, Commands};
use crate::config::ConfigStore;
use crate::process::SystemRunner;
use crate::tools::Dispatcher;
use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;

mod call;
mod check;
mod env;
mod projects;
mod register;
mod serve;
mod tools;

pub fn execute(cli: Cli) -> Result<()> {
    let store = open_store(cli.config)?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve::execute(dispatcher(store, cli.timeout)),

        Commands::Projects => projects::execute(&store),

        Commands::Register {
            name,
            root,
            inventory,
            roles_path,
            collections_paths,
            default,
        } => register::execute(
            store,
            register::Registration {
                name,
                root,
                inventory,
                roles_path,
                collections_paths,
                default,
            },
        ),

        Commands::Env { project } => env::execute(&store, project.as_deref()),

        Commands::Check => check::execute(&store),

        Commands::Tools => tools::execute(),

        Commands::Call { tool, arguments } => {
            call::execute(dispatcher(store, cli.timeout), &tool, arguments.as_deref())
        }
    }
}

fn open_store(explicit: Option<PathBuf>) -> Result<ConfigStore> {
    match explicit.filter(|path| !path.as_os_str().is_empty()) {
        Some(path) => ConfigStore::open_at(path),
        None => ConfigStore::open(),
    }
}

fn dispatcher(store: ConfigStore, timeout_secs: u64) -> Dispatcher {
    Dispatcher::new(store, SystemRunner::new(Duration::from_secs(timeout_secs)))
}
