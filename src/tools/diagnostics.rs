use chrono::Local;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::playbook::{all_hosts, run_task, task_output, TaskArgs};
use super::{to_json_pretty, Dispatcher, ToolSpec};
use crate::diagnostics::{facts_for_host, health_score, metrics_from_facts, snapshot_id};
use crate::error::Result;

#[derive(Debug, Deserialize)]
pub(super) struct FactsArgs {
    #[serde(default = "all_hosts")]
    hosts: String,
    #[serde(default)]
    filter_pattern: Option<String>,
    #[serde(default)]
    inventory: Option<String>,
    #[serde(default)]
    project: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct DiagnoseArgs {
    hostname: String,
    #[serde(default)]
    inventory: Option<String>,
    #[serde(default)]
    project: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ServiceArgs {
    hosts: String,
    service: String,
    state: String,
    #[serde(default)]
    inventory: Option<String>,
    #[serde(default)]
    project: Option<String>,
}

pub(super) fn specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: "ansible_gather_facts",
            description: "Gather system facts from hosts",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "hosts": {"type": "string", "default": "all", "description": "Host pattern"},
                    "filter_pattern": {"type": "string", "description": "Fact filter pattern"},
                    "inventory": {"type": "string", "description": "Inventory path"},
                    "project": {"type": "string", "description": "Project name"}
                }
            }),
        },
        ToolSpec {
            name: "ansible_diagnose_host",
            description: "Run diagnostics on a host and compute a health score",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "hostname": {"type": "string", "description": "Host to diagnose"},
                    "inventory": {"type": "string", "description": "Inventory path"},
                    "project": {"type": "string", "description": "Project name"}
                },
                "required": ["hostname"]
            }),
        },
        ToolSpec {
            name: "ansible_service_manager",
            description: "Manage systemd services",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "hosts": {"type": "string", "description": "Host pattern"},
                    "service": {"type": "string", "description": "Service name"},
                    "state": {
                        "type": "string",
                        "enum": ["started", "stopped", "restarted", "reloaded"],
                        "description": "Desired state"
                    },
                    "inventory": {"type": "string", "description": "Inventory path"},
                    "project": {"type": "string", "description": "Project name"}
                },
                "required": ["hosts", "service", "state"]
            }),
        },
    ]
}

fn setup_task(
    hosts: String,
    filter_pattern: Option<String>,
    inventory: Option<String>,
    project: Option<String>,
) -> TaskArgs {
    let args = filter_pattern.filter(|p| !p.is_empty()).map(|pattern| {
        let mut args = Map::new();
        args.insert("filter".to_string(), Value::String(pattern));
        args
    });

    TaskArgs {
        hosts,
        module: "setup".to_string(),
        args,
        inventory,
        project,
        ..TaskArgs::default()
    }
}

pub(super) fn gather_facts(dispatcher: &Dispatcher, args: FactsArgs) -> Result<String> {
    run_task(
        dispatcher,
        setup_task(args.hosts, args.filter_pattern, args.inventory, args.project),
    )
}

pub(super) fn diagnose_host(dispatcher: &Dispatcher, args: DiagnoseArgs) -> Result<String> {
    let task = setup_task(args.hostname.clone(), None, args.inventory, args.project);
    let output = task_output(dispatcher, &task);

    let facts = facts_for_host(&output.stdout, &args.hostname);
    if output.success() && facts.is_none() {
        tracing::warn!(host = %args.hostname, "no facts found in setup output");
    }
    let metrics = facts.as_ref().map(metrics_from_facts).unwrap_or_default();
    let collected_at = Local::now();

    to_json_pretty(&json!({
        "hostname": args.hostname,
        "health_score": health_score(&metrics),
        "facts": {
            "return_code": output.return_code,
            "stdout": output.stdout,
            "stderr": output.stderr,
            "success": output.success(),
        },
        "metrics": metrics,
        "snapshot_id": snapshot_id(collected_at),
        "collected_at": collected_at.to_rfc3339(),
    }))
}

pub(super) fn service_manager(dispatcher: &Dispatcher, args: ServiceArgs) -> Result<String> {
    let mut module_args = Map::new();
    module_args.insert("name".to_string(), Value::String(args.service));
    module_args.insert("state".to_string(), Value::String(args.state));

    run_task(
        dispatcher,
        TaskArgs {
            hosts: args.hosts,
            module: "systemd".to_string(),
            args: Some(module_args),
            inventory: args.inventory,
            r#become: true,
            project: args.project,
            ..TaskArgs::default()
        },
    )
}
