use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::path::Path;
use walkdir::{DirEntry, WalkDir};

/// Directories never searched for playbooks
const EXCLUDED_DIRS: &[&str] = &[
    ".git",
    "group_vars",
    "host_vars",
    "roles",
    "collections",
    "venv",
    ".venv",
    "__pycache__",
];

const PLAYBOOK_EXTENSIONS: &[&str] = &["yml", "yaml"];

/// Highest `-v` count passed to Ansible
pub const MAX_VERBOSITY: i64 = 4;

/// Find every YAML file under `root` outside of excluded directories.
///
/// Paths are relative to `root`, `/`-separated and sorted.
pub fn discover_playbooks(root: &Path) -> Vec<String> {
    let mut playbooks: Vec<String> = WalkDir::new(root)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_excluded(entry))
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && has_playbook_extension(entry.path()))
        .filter_map(|entry| {
            let relative = entry.path().strip_prefix(root).ok()?;
            let parts: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            Some(parts.join("/"))
        })
        .collect();

    playbooks.sort();
    playbooks
}

fn is_excluded(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| EXCLUDED_DIRS.contains(&name))
}

fn has_playbook_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| PLAYBOOK_EXTENSIONS.contains(&ext))
}

/// Render playbook content as YAML. Strings are written verbatim.
pub fn playbook_yaml(content: &Value) -> Result<String> {
    match content {
        Value::String(text) => Ok(text.clone()),
        other => serde_yaml::to_string(other).context("Failed to serialize playbook as YAML"),
    }
}

/// Format module arguments as `key=value` pairs for `ansible -a`.
///
/// Nested values are JSON-encoded, booleans are lowercase, strings are verbatim.
pub fn module_args(args: &Map<String, Value>) -> String {
    args.iter()
        .map(|(key, value)| {
            let rendered = match value {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                Value::Bool(b) => b.to_string(),
                other => other.to_string(),
            };
            format!("{key}={rendered}")
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split a colon-separated path list, trimming entries and dropping empty ones.
pub fn split_paths(paths: Option<&str>) -> Vec<String> {
    paths
        .unwrap_or_default()
        .split(':')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// `-v` … `-vvvv` for a requested verbosity, `None` at zero or below.
pub fn verbosity_flag(level: i64) -> Option<String> {
    if level <= 0 {
        return None;
    }
    Some(format!("-{}", "v".repeat(level.min(MAX_VERBOSITY) as usize)))
}
