use serde::Deserialize;
use serde_json::json;

use super::{to_json, to_json_pretty, Dispatcher, ToolSpec};
use crate::error::Result;
use crate::inventory::Inventory;

const PROGRAM: &str = "ansible-inventory";

#[derive(Debug, Deserialize)]
pub(super) struct ListArgs {
    #[serde(default)]
    inventory: Option<String>,
    #[serde(default)]
    project: Option<String>,
    #[serde(default)]
    show_hostvars: bool,
}

#[derive(Debug, Deserialize)]
pub(super) struct GraphArgs {
    #[serde(default)]
    inventory: Option<String>,
    #[serde(default)]
    project: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct FindHostArgs {
    hostname: String,
    #[serde(default)]
    inventory: Option<String>,
    #[serde(default)]
    project: Option<String>,
}

pub(super) fn specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: "ansible_inventory",
            description: "List all hosts and groups in the Ansible inventory",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "inventory": {"type": "string", "description": "Path to inventory file"},
                    "project": {"type": "string", "description": "Project name to use"},
                    "show_hostvars": {"type": "boolean", "default": false, "description": "Include host variables in output"}
                }
            }),
        },
        ToolSpec {
            name: "inventory_graph",
            description: "Show the inventory in graph format",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "inventory": {"type": "string", "description": "Path to inventory file"},
                    "project": {"type": "string", "description": "Project name to use"}
                }
            }),
        },
        ToolSpec {
            name: "inventory_find_host",
            description: "Find a specific host and show its groups and variables",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "hostname": {"type": "string", "description": "Hostname to find"},
                    "inventory": {"type": "string", "description": "Path to inventory file"},
                    "project": {"type": "string", "description": "Project name to use"}
                },
                "required": ["hostname"]
            }),
        },
    ]
}

fn run_inventory(
    dispatcher: &Dispatcher,
    inventory: Option<&str>,
    project: Option<&str>,
    mode: &str,
) -> crate::process::CommandOutput {
    let project = dispatcher.resolve(project);
    let inventory = dispatcher.inventory_path(inventory, project);

    let mut spec = dispatcher.command(PROGRAM, project);
    spec.args(["-i", inventory.as_str(), mode]);
    dispatcher.run(&spec)
}

pub(super) fn list(dispatcher: &Dispatcher, args: ListArgs) -> Result<String> {
    let output = run_inventory(
        dispatcher,
        args.inventory.as_deref(),
        args.project.as_deref(),
        "--list",
    );

    if !output.success() {
        return to_json(&json!({
            "error": "Failed to list inventory",
            "stderr": output.stderr,
            "return_code": output.return_code,
        }));
    }

    match Inventory::parse(&output.stdout) {
        Ok(inventory) => to_json_pretty(&inventory.summary(args.show_hostvars)),
        Err(err) => to_json(&json!({"error": format!("Failed to parse inventory JSON: {err}")})),
    }
}

pub(super) fn graph(dispatcher: &Dispatcher, args: GraphArgs) -> Result<String> {
    let output = run_inventory(
        dispatcher,
        args.inventory.as_deref(),
        args.project.as_deref(),
        "--graph",
    );

    if !output.success() {
        return to_json(&json!({"error": output.stderr, "return_code": output.return_code}));
    }
    Ok(output.stdout)
}

pub(super) fn find_host(dispatcher: &Dispatcher, args: FindHostArgs) -> Result<String> {
    let output = run_inventory(
        dispatcher,
        args.inventory.as_deref(),
        args.project.as_deref(),
        "--list",
    );

    if !output.success() {
        return to_json(&json!({"error": output.stderr}));
    }

    let inventory = match Inventory::parse(&output.stdout) {
        Ok(inventory) => inventory,
        Err(err) => {
            return to_json(&json!({"error": format!("Failed to parse inventory: {err}")}));
        }
    };

    match inventory.find_host(&args.hostname) {
        Some(details) => to_json_pretty(&details),
        None => to_json(&json!({
            "error": format!("Host '{}' not found in inventory", args.hostname)
        })),
    }
}
