use anyhow::Context;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::fs;
use std::path::Path;

use super::{to_json, to_json_pretty, Dispatcher, ToolSpec};
use crate::error::Result;
use crate::playbook::{module_args, playbook_yaml, verbosity_flag};
use crate::process::CommandOutput;

#[derive(Debug, Deserialize)]
pub(super) struct PlaybookArgs {
    playbook: String,
    #[serde(default)]
    inventory: Option<String>,
    #[serde(default)]
    extra_vars: Option<Map<String, Value>>,
    #[serde(default)]
    tags: Option<String>,
    #[serde(default)]
    skip_tags: Option<String>,
    #[serde(default)]
    limit: Option<String>,
    #[serde(default)]
    check: bool,
    #[serde(default)]
    diff: bool,
    #[serde(default)]
    verbose: i64,
    #[serde(default)]
    project: Option<String>,
}

/// Ad-hoc task request; also built internally by the ping and diagnostics tools.
#[derive(Debug, Default, Deserialize)]
pub(super) struct TaskArgs {
    pub hosts: String,
    pub module: String,
    #[serde(default)]
    pub args: Option<Map<String, Value>>,
    #[serde(default)]
    pub inventory: Option<String>,
    #[serde(default)]
    pub r#become: bool,
    #[serde(default)]
    pub check: bool,
    #[serde(default)]
    pub verbose: i64,
    #[serde(default)]
    pub project: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct PingArgs {
    #[serde(default = "all_hosts")]
    hosts: String,
    #[serde(default)]
    inventory: Option<String>,
    #[serde(default)]
    project: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ValidateArgs {
    playbook: String,
    #[serde(default)]
    inventory: Option<String>,
    #[serde(default)]
    project: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateArgs {
    path: String,
    content: Value,
    #[serde(default)]
    project: Option<String>,
}

pub(super) fn all_hosts() -> String {
    "all".to_string()
}

pub(super) fn specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: "ansible_playbook",
            description: "Run an Ansible playbook",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "playbook": {"type": "string", "description": "Path to playbook file"},
                    "inventory": {"type": "string", "description": "Inventory file path"},
                    "extra_vars": {"type": "object", "description": "Extra variables"},
                    "tags": {"type": "string", "description": "Tags to run"},
                    "skip_tags": {"type": "string", "description": "Tags to skip"},
                    "limit": {"type": "string", "description": "Limit to specific hosts"},
                    "check": {"type": "boolean", "default": false, "description": "Run in check mode"},
                    "diff": {"type": "boolean", "default": false, "description": "Show diffs"},
                    "verbose": {"type": "integer", "default": 0, "description": "Verbosity level 0-4; higher values are capped"},
                    "project": {"type": "string", "description": "Project name"}
                },
                "required": ["playbook"]
            }),
        },
        ToolSpec {
            name: "ansible_task",
            description: "Run an ad-hoc Ansible task",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "hosts": {"type": "string", "description": "Host pattern"},
                    "module": {"type": "string", "description": "Ansible module name"},
                    "args": {"type": "object", "description": "Module arguments"},
                    "inventory": {"type": "string", "description": "Inventory file path"},
                    "become": {"type": "boolean", "default": false, "description": "Use privilege escalation"},
                    "check": {"type": "boolean", "default": false, "description": "Run in check mode"},
                    "verbose": {"type": "integer", "default": 0, "description": "Verbosity level 0-4; higher values are capped"},
                    "project": {"type": "string", "description": "Project name"}
                },
                "required": ["hosts", "module"]
            }),
        },
        ToolSpec {
            name: "ansible_ping",
            description: "Ping Ansible hosts to test connectivity",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "hosts": {"type": "string", "default": "all", "description": "Host pattern"},
                    "inventory": {"type": "string", "description": "Inventory file path"},
                    "project": {"type": "string", "description": "Project name"}
                }
            }),
        },
        ToolSpec {
            name: "validate_playbook",
            description: "Validate playbook syntax",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "playbook": {"type": "string", "description": "Path to playbook file"},
                    "inventory": {"type": "string", "description": "Inventory file path"},
                    "project": {"type": "string", "description": "Project name"}
                },
                "required": ["playbook"]
            }),
        },
        ToolSpec {
            name: "create_playbook",
            description: "Create a new playbook file from YAML text or a structured playbook",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string", "description": "Path of the playbook, relative to the project root"},
                    "content": {"description": "Playbook content as YAML text or an object/array"},
                    "project": {"type": "string", "description": "Project name"}
                },
                "required": ["path", "content"]
            }),
        },
    ]
}

fn execution_result(output: &CommandOutput) -> Result<String> {
    to_json_pretty(&json!({
        "return_code": output.return_code,
        "stdout": output.stdout,
        "stderr": output.stderr,
        "success": output.success(),
    }))
}

pub(super) fn run_playbook(dispatcher: &Dispatcher, args: PlaybookArgs) -> Result<String> {
    let project = dispatcher.resolve(args.project.as_deref());
    let inventory = dispatcher.inventory_path(args.inventory.as_deref(), project);

    let mut spec = dispatcher.command("ansible-playbook", project);
    spec.arg(&args.playbook).args(["-i", inventory.as_str()]);

    if let Some(extra_vars) = args.extra_vars.filter(|vars| !vars.is_empty()) {
        spec.arg("--extra-vars")
            .arg(serde_json::to_string(&extra_vars)?);
    }
    if let Some(tags) = args.tags.filter(|t| !t.is_empty()) {
        spec.args(["--tags".to_string(), tags]);
    }
    if let Some(skip_tags) = args.skip_tags.filter(|t| !t.is_empty()) {
        spec.args(["--skip-tags".to_string(), skip_tags]);
    }
    if let Some(limit) = args.limit.filter(|l| !l.is_empty()) {
        spec.args(["--limit".to_string(), limit]);
    }
    if args.check {
        spec.arg("--check");
    }
    if args.diff {
        spec.arg("--diff");
    }
    if let Some(flag) = verbosity_flag(args.verbose) {
        spec.arg(flag);
    }

    execution_result(&dispatcher.run(&spec))
}

/// Run an ad-hoc task and return the raw command output.
pub(super) fn task_output(dispatcher: &Dispatcher, args: &TaskArgs) -> CommandOutput {
    let project = dispatcher.resolve(args.project.as_deref());
    let inventory = dispatcher.inventory_path(args.inventory.as_deref(), project);

    let mut spec = dispatcher.command("ansible", project);
    spec.arg(&args.hosts)
        .args(["-i", inventory.as_str(), "-m", args.module.as_str()]);

    if let Some(module_args) = args.args.as_ref().filter(|a| !a.is_empty()).map(module_args) {
        spec.args(["-a".to_string(), module_args]);
    }
    if args.r#become {
        spec.arg("--become");
    }
    if args.check {
        spec.arg("--check");
    }
    if let Some(flag) = verbosity_flag(args.verbose) {
        spec.arg(flag);
    }

    dispatcher.run(&spec)
}

pub(super) fn run_task(dispatcher: &Dispatcher, args: TaskArgs) -> Result<String> {
    execution_result(&task_output(dispatcher, &args))
}

pub(super) fn ping(dispatcher: &Dispatcher, args: PingArgs) -> Result<String> {
    run_task(
        dispatcher,
        TaskArgs {
            hosts: args.hosts,
            module: "ping".to_string(),
            inventory: args.inventory,
            project: args.project,
            ..TaskArgs::default()
        },
    )
}

pub(super) fn validate(dispatcher: &Dispatcher, args: ValidateArgs) -> Result<String> {
    let project = dispatcher.resolve(args.project.as_deref());
    let inventory = dispatcher.inventory_path(args.inventory.as_deref(), project);

    let mut spec = dispatcher.command("ansible-playbook", project);
    spec.arg(&args.playbook)
        .args(["-i", inventory.as_str(), "--syntax-check"]);

    let output = dispatcher.run(&spec);
    to_json_pretty(&json!({
        "valid": output.success(),
        "return_code": output.return_code,
        "stdout": output.stdout,
        "stderr": output.stderr,
    }))
}

pub(super) fn create(dispatcher: &Dispatcher, args: CreateArgs) -> Result<String> {
    let root = match dispatcher.resolve(args.project.as_deref()) {
        Some(project) => project.root_path().to_path_buf(),
        None => std::env::current_dir().context("Failed to read current directory")?,
    };
    let path = root.join(&args.path);

    match write_playbook(&path, &args.content) {
        Ok(()) => {
            tracing::info!(path = %path.display(), "created playbook");
            to_json(&json!({
                "success": true,
                "path": path.display().to_string(),
                "message": format!("Playbook created at {}", path.display()),
            }))
        }
        Err(err) => to_json(&json!({"error": format!("{err:#}")})),
    }
}

fn write_playbook(path: &Path, content: &Value) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {:?}", parent))?;
    }
    let yaml = playbook_yaml(content)?;
    fs::write(path, yaml).with_context(|| format!("Failed to write playbook {:?}", path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use crate::config::ServerConfiguration;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_playbook_argv() {
        let temp = TempDir::new().unwrap();
        let runner = RecordingRunner::default();
        runner.respond(2, "PLAY RECAP", "failed");
        let mut dispatcher = dispatcher(
            temp.path(),
            config_with(project("web", temp.path())),
            &runner,
        );

        let value = call_json(
            &mut dispatcher,
            "ansible_playbook",
            json!({
                "playbook": "site.yml",
                "extra_vars": {"version": "1.2"},
                "tags": "deploy",
                "skip_tags": "slow",
                "limit": "web1",
                "check": true,
                "diff": true,
                "verbose": 7
            }),
        );

        assert_eq!(
            runner.last().argv(),
            vec![
                "ansible-playbook",
                "site.yml",
                "-i",
                "hosts.ini",
                "--extra-vars",
                r#"{"version":"1.2"}"#,
                "--tags",
                "deploy",
                "--skip-tags",
                "slow",
                "--limit",
                "web1",
                "--check",
                "--diff",
                "-vvvv"
            ]
        );
        assert_eq!(value["return_code"], 2);
        assert_eq!(value["success"], false);
        assert_eq!(value["stdout"], "PLAY RECAP");
        assert_eq!(value["stderr"], "failed");
    }

    #[test]
    fn test_playbook_minimal_argv() {
        let temp = TempDir::new().unwrap();
        let runner = RecordingRunner::default();
        let mut dispatcher = dispatcher(temp.path(), ServerConfiguration::default(), &runner);

        let value = call_json(&mut dispatcher, "ansible_playbook", json!({"playbook": "site.yml"}));
        assert_eq!(value["success"], true);
        assert_eq!(
            runner.last().argv(),
            vec!["ansible-playbook", "site.yml", "-i", "inventory"]
        );
    }

    #[test]
    fn test_task_argv() {
        let temp = TempDir::new().unwrap();
        let runner = RecordingRunner::default();
        let mut dispatcher = dispatcher(temp.path(), ServerConfiguration::default(), &runner);

        call_json(
            &mut dispatcher,
            "ansible_task",
            json!({
                "hosts": "web",
                "module": "apt",
                "args": {"name": "nginx", "update_cache": true},
                "become": true,
                "check": true,
                "verbose": 2
            }),
        );

        assert_eq!(
            runner.last().argv(),
            vec![
                "ansible",
                "web",
                "-i",
                "inventory",
                "-m",
                "apt",
                "-a",
                "name=nginx update_cache=true",
                "--become",
                "--check",
                "-vv"
            ]
        );
    }

    #[test]
    fn test_verbosity_out_of_range() {
        let temp = TempDir::new().unwrap();
        let runner = RecordingRunner::default();
        let mut dispatcher = dispatcher(temp.path(), ServerConfiguration::default(), &runner);

        call_json(
            &mut dispatcher,
            "ansible_task",
            json!({"hosts": "web", "module": "ping", "verbose": 300}),
        );
        assert_eq!(runner.last().args.last().map(String::as_str), Some("-vvvv"));

        call_json(
            &mut dispatcher,
            "ansible_playbook",
            json!({"playbook": "site.yml", "verbose": -1}),
        );
        assert_eq!(
            runner.last().argv(),
            vec!["ansible-playbook", "site.yml", "-i", "inventory"]
        );
    }

    #[test]
    fn test_ping_defaults_to_all() {
        let temp = TempDir::new().unwrap();
        let runner = RecordingRunner::default();
        let mut dispatcher = dispatcher(temp.path(), ServerConfiguration::default(), &runner);

        call_json(&mut dispatcher, "ansible_ping", json!({}));
        assert_eq!(
            runner.last().argv(),
            vec!["ansible", "all", "-i", "inventory", "-m", "ping"]
        );
    }

    #[test]
    fn test_validate_playbook() {
        let temp = TempDir::new().unwrap();
        let runner = RecordingRunner::default();
        runner.respond(4, "", "ERROR! Syntax Error");
        let mut dispatcher = dispatcher(temp.path(), ServerConfiguration::default(), &runner);

        let value = call_json(&mut dispatcher, "validate_playbook", json!({"playbook": "bad.yml"}));
        assert_eq!(value["valid"], false);
        assert_eq!(value["return_code"], 4);
        assert_eq!(
            runner.last().argv(),
            vec!["ansible-playbook", "bad.yml", "-i", "inventory", "--syntax-check"]
        );
    }

    #[test]
    fn test_create_playbook_from_structure() {
        let temp = TempDir::new().unwrap();
        let runner = RecordingRunner::default();
        let mut dispatcher = dispatcher(
            temp.path(),
            config_with(project("web", temp.path())),
            &runner,
        );

        let value = call_json(
            &mut dispatcher,
            "create_playbook",
            json!({
                "path": "playbooks/web.yml",
                "content": [{"name": "Web", "hosts": "web", "tasks": []}]
            }),
        );

        let written = temp.path().join("playbooks/web.yml");
        assert_eq!(value["success"], true);
        assert_eq!(value["path"], written.display().to_string());
        let contents = fs::read_to_string(written).unwrap();
        assert!(contents.starts_with("- name: Web\n"));
        assert!(runner.calls.borrow().is_empty());
    }

    #[test]
    fn test_create_playbook_from_text() {
        let temp = TempDir::new().unwrap();
        let runner = RecordingRunner::default();
        let mut dispatcher = dispatcher(
            temp.path(),
            config_with(project("web", temp.path())),
            &runner,
        );

        let text = "- hosts: all\n  tasks: []\n";
        call_json(
            &mut dispatcher,
            "create_playbook",
            json!({"path": "site.yml", "content": text}),
        );
        assert_eq!(fs::read_to_string(temp.path().join("site.yml")).unwrap(), text);
    }

    #[test]
    fn test_create_playbook_reports_write_errors() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("blocker"), "file").unwrap();
        let runner = RecordingRunner::default();
        let mut dispatcher = dispatcher(
            temp.path(),
            config_with(project("web", temp.path())),
            &runner,
        );

        let value = call_json(
            &mut dispatcher,
            "create_playbook",
            json!({"path": "blocker/site.yml", "content": "---"}),
        );
        assert!(value["error"].as_str().unwrap().contains("Failed to create directory"));
    }
}
