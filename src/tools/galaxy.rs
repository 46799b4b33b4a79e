use serde::Deserialize;
use serde_json::json;

use super::{to_json_pretty, Dispatcher, ToolSpec};
use crate::error::Result;

const DEFAULT_REQUIREMENTS: &str = "requirements.yml";

#[derive(Debug, Deserialize)]
pub(super) struct InstallArgs {
    #[serde(default = "default_requirements")]
    requirements_file: String,
    #[serde(default)]
    force: bool,
    #[serde(default)]
    project: Option<String>,
}

fn default_requirements() -> String {
    DEFAULT_REQUIREMENTS.to_string()
}

pub(super) fn specs() -> Vec<ToolSpec> {
    vec![ToolSpec {
        name: "galaxy_install",
        description: "Install roles and collections from a requirements file",
        input_schema: json!({
            "type": "object",
            "properties": {
                "requirements_file": {"type": "string", "default": DEFAULT_REQUIREMENTS, "description": "Path to requirements file"},
                "force": {"type": "boolean", "default": false, "description": "Force reinstall"},
                "project": {"type": "string", "description": "Project name"}
            }
        }),
    }]
}

pub(super) fn install(dispatcher: &Dispatcher, args: InstallArgs) -> Result<String> {
    let project = dispatcher.resolve(args.project.as_deref());

    let mut spec = dispatcher.command("ansible-galaxy", project);
    spec.args(["install", "-r", args.requirements_file.as_str()]);
    if args.force {
        spec.arg("--force");
    }

    let output = dispatcher.run(&spec);
    to_json_pretty(&json!({
        "success": output.success(),
        "stdout": output.stdout,
        "stderr": output.stderr,
    }))
}
