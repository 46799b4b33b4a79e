use crate::config::{ConfigStore, ServerConfiguration};
use crate::ui;
use anyhow::{bail, Result};

/// A problem found in a loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    pub project: Option<String>,
    pub message: String,
}

impl ConfigIssue {
    fn general(message: impl Into<String>) -> Self {
        Self {
            project: None,
            message: message.into(),
        }
    }

    fn for_project(project: &str, message: impl Into<String>) -> Self {
        Self {
            project: Some(project.to_string()),
            message: message.into(),
        }
    }
}

pub fn validate(config: &ServerConfiguration) -> Vec<ConfigIssue> {
    let mut issues = Vec::new();

    if let Some(name) = config.dangling_default() {
        issues.push(ConfigIssue::general(format!(
            "default project '{name}' is not registered"
        )));
    }

    for (name, project) in &config.projects {
        if project.root.is_empty() {
            issues.push(ConfigIssue::for_project(name, "root is empty"));
            continue;
        }
        let root = project.root_path();
        if !root.is_absolute() {
            issues.push(ConfigIssue::for_project(
                name,
                format!("root {} is not an absolute path", root.display()),
            ));
        }
        if !root.is_dir() {
            issues.push(ConfigIssue::for_project(
                name,
                format!("root {} does not exist", root.display()),
            ));
        }
    }

    issues
}

pub fn execute(store: &ConfigStore) -> Result<()> {
    let config = store.config();
    let issues = validate(config);

    if issues.is_empty() {
        ui::success(
            "Checked",
            format!(
                "{} ({} project(s))",
                store.path().display(),
                config.projects.len()
            ),
        );
        return Ok(());
    }

    for issue in &issues {
        match &issue.project {
            Some(project) => ui::error(format!("{project}: {}", issue.message)),
            None => ui::error(&issue.message),
        }
    }

    bail!(
        "Found {} issue(s) in {}",
        issues.len(),
        store.path().display()
    )
}
