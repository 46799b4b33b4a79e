use serde::Deserialize;
use serde_json::{json, Map};

use super::{to_json, to_json_pretty, Dispatcher, ToolSpec};
use crate::config::ProjectDefinition;
use crate::error::Result;
use crate::playbook::{discover_playbooks, split_paths};
use crate::util::paths;

#[derive(Debug, Deserialize)]
pub(super) struct RegisterArgs {
    name: String,
    root: String,
    #[serde(default)]
    inventory: Option<String>,
    #[serde(default)]
    roles_path: Option<String>,
    #[serde(default)]
    collections_paths: Option<String>,
    #[serde(default)]
    set_as_default: bool,
}

#[derive(Debug, Deserialize)]
pub(super) struct PlaybooksArgs {
    #[serde(default)]
    project: Option<String>,
}

pub(super) fn specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: "register_project",
            description: "Register an Ansible project",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string", "description": "Project name"},
                    "root": {"type": "string", "description": "Project root directory"},
                    "inventory": {"type": "string", "description": "Inventory path"},
                    "roles_path": {"type": "string", "description": "Colon-separated roles paths"},
                    "collections_paths": {"type": "string", "description": "Colon-separated collections paths"},
                    "set_as_default": {"type": "boolean", "default": false, "description": "Set as default project"}
                },
                "required": ["name", "root"]
            }),
        },
        ToolSpec {
            name: "list_projects",
            description: "List all registered projects",
            input_schema: json!({"type": "object", "properties": {}}),
        },
        ToolSpec {
            name: "project_playbooks",
            description: "List all playbooks in a project",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "project": {"type": "string", "description": "Project name"}
                }
            }),
        },
    ]
}

/// Build a project definition from user input, as the tool and the CLI accept it.
pub fn definition_from_input(
    name: &str,
    root: &str,
    inventory: Option<String>,
    roles_path: Option<&str>,
    collections_paths: Option<&str>,
) -> anyhow::Result<ProjectDefinition> {
    let root = paths::absolute_path(root)?;
    let mut project = ProjectDefinition::new(name, root.to_string_lossy());
    project.inventory = inventory.filter(|inv| !inv.is_empty());
    project.roles_path = Some(split_paths(roles_path)).filter(|p| !p.is_empty());
    project.collections_paths = Some(split_paths(collections_paths)).filter(|p| !p.is_empty());
    Ok(project)
}

pub(super) fn register(dispatcher: &mut Dispatcher, args: RegisterArgs) -> Result<String> {
    let project = definition_from_input(
        &args.name,
        &args.root,
        args.inventory,
        args.roles_path.as_deref(),
        args.collections_paths.as_deref(),
    )?;
    let root = project.root.clone();
    let is_default = dispatcher.store.register(project, args.set_as_default)?;

    to_json(&json!({
        "success": true,
        "project": args.name,
        "root": root,
        "is_default": is_default,
    }))
}

pub(super) fn list(dispatcher: &Dispatcher) -> Result<String> {
    let config = dispatcher.store.config();

    let projects: Map<String, serde_json::Value> = config
        .projects
        .iter()
        .map(|(name, project)| {
            (
                name.clone(),
                json!({
                    "root": project.root,
                    "inventory": project.inventory,
                    "is_default": config.default_project.as_deref() == Some(name.as_str()),
                }),
            )
        })
        .collect();

    to_json_pretty(&json!({
        "projects": projects,
        "default": config.default_project,
        "total": config.projects.len(),
    }))
}

pub(super) fn playbooks(dispatcher: &Dispatcher, args: PlaybooksArgs) -> Result<String> {
    let Some(project) = dispatcher.resolve(args.project.as_deref()) else {
        return to_json(&json!({"error": "No project specified or found"}));
    };

    let playbooks = discover_playbooks(project.root_path());
    to_json_pretty(&json!({
        "project": project.name,
        "root": project.root,
        "total": playbooks.len(),
        "playbooks": playbooks,
    }))
}
