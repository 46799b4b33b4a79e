//! Tool dispatcher: maps each exposed operation onto an Ansible command line.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::config::{ConfigStore, ProjectDefinition};
use crate::environment::{self, EnvMap};
use crate::error::{Result, ToolError};
use crate::inventory::{DEFAULT_INVENTORY, INVENTORY_ENV};
use crate::process::{CommandOutput, CommandRunner, CommandSpec};
use crate::project::{self, PROJECT_ENV};

mod diagnostics;
mod galaxy;
mod inventory;
mod playbook;
mod projects;
mod vault;

pub use projects::definition_from_input;

/// Name, description and JSON schema of an exposed tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Every exposed tool, grouped by area.
pub fn catalog() -> Vec<ToolSpec> {
    let mut specs = Vec::new();
    specs.extend(inventory::specs());
    specs.extend(playbook::specs());
    specs.extend(projects::specs());
    specs.extend(vault::specs());
    specs.extend(galaxy::specs());
    specs.extend(diagnostics::specs());
    specs
}

/// Executes tool calls against a configuration store and a command runner.
pub struct Dispatcher {
    store: ConfigStore,
    runner: Box<dyn CommandRunner>,
    host_env: EnvMap,
}

impl Dispatcher {
    pub fn new(store: ConfigStore, runner: impl CommandRunner + 'static) -> Self {
        Self {
            store,
            runner: Box::new(runner),
            host_env: environment::host_env(),
        }
    }

    /// Replace the captured host environment.
    pub fn with_host_env(mut self, host_env: EnvMap) -> Self {
        self.host_env = host_env;
        self
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Run one tool and return its text payload.
    pub fn call(&mut self, name: &str, arguments: Value) -> Result<String> {
        tracing::debug!(tool = name, "dispatching tool call");

        match name {
            "ansible_inventory" => inventory::list(self, parse(name, arguments)?),
            "inventory_graph" => inventory::graph(self, parse(name, arguments)?),
            "inventory_find_host" => inventory::find_host(self, parse(name, arguments)?),
            "ansible_playbook" => playbook::run_playbook(self, parse(name, arguments)?),
            "ansible_task" => playbook::run_task(self, parse(name, arguments)?),
            "ansible_ping" => playbook::ping(self, parse(name, arguments)?),
            "validate_playbook" => playbook::validate(self, parse(name, arguments)?),
            "create_playbook" => playbook::create(self, parse(name, arguments)?),
            "register_project" => projects::register(self, parse(name, arguments)?),
            "list_projects" => projects::list(self),
            "project_playbooks" => projects::playbooks(self, parse(name, arguments)?),
            "vault_encrypt" => vault::encrypt(self, parse(name, arguments)?),
            "vault_decrypt" => vault::decrypt(self, parse(name, arguments)?),
            "vault_view" => vault::view(self, parse(name, arguments)?),
            "galaxy_install" => galaxy::install(self, parse(name, arguments)?),
            "ansible_gather_facts" => diagnostics::gather_facts(self, parse(name, arguments)?),
            "ansible_diagnose_host" => diagnostics::diagnose_host(self, parse(name, arguments)?),
            "ansible_service_manager" => {
                diagnostics::service_manager(self, parse(name, arguments)?)
            }
            _ => Err(ToolError::UnknownTool(name.to_string())),
        }
    }

    fn resolve(&self, explicit: Option<&str>) -> Option<&ProjectDefinition> {
        project::resolve_project_with(
            self.store.config(),
            explicit,
            self.host_env.get(PROJECT_ENV).map(String::as_str),
        )
    }

    /// Command for `program` running inside the project's root with its environment.
    fn command(&self, program: &str, project: Option<&ProjectDefinition>) -> CommandSpec {
        let mut spec = CommandSpec::new(program);
        if let Some(project) = project {
            spec.cwd = Some(project.root_path().to_path_buf());
            spec.env = Some(environment::compose_env(project, &self.host_env));
        }
        spec
    }

    /// Inventory precedence: request, project, `MCP_ANSIBLE_INVENTORY`, `inventory`.
    fn inventory_path(&self, explicit: Option<&str>, project: Option<&ProjectDefinition>) -> String {
        explicit
            .filter(|inv| !inv.is_empty())
            .or_else(|| project.and_then(|p| p.inventory.as_deref()))
            .filter(|inv| !inv.is_empty())
            .or_else(|| self.host_env.get(INVENTORY_ENV).map(String::as_str))
            .unwrap_or(DEFAULT_INVENTORY)
            .to_string()
    }

    fn run(&self, spec: &CommandSpec) -> CommandOutput {
        tracing::info!(argv = ?spec.argv(), cwd = ?spec.cwd, "running command");
        self.runner.run(spec)
    }
}

fn parse<T: DeserializeOwned>(tool: &str, arguments: Value) -> Result<T> {
    let arguments = match arguments {
        Value::Null => Value::Object(Default::default()),
        other => other,
    };
    serde_json::from_value(arguments).map_err(|source| ToolError::InvalidArguments {
        tool: tool.to_string(),
        source,
    })
}

fn to_json(value: &impl Serialize) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

fn to_json_pretty(value: &impl Serialize) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
