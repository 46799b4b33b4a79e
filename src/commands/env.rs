use crate::config::ConfigStore;
use crate::environment::{self, EnvMap};
use crate::project;
use anyhow::{bail, Result};

pub fn execute(store: &ConfigStore, name: Option<&str>) -> Result<()> {
    let Some(project) = project::resolve_project(store.config(), name) else {
        match name {
            Some(name) => bail!("Project '{name}' is not registered"),
            None => bail!("No project specified and none could be resolved"),
        }
    };

    let host = environment::host_env();
    let composed = environment::compose_env(project, &host);
    for line in changed_lines(&composed, &host) {
        println!("{line}");
    }

    Ok(())
}

/// `KEY=VALUE` lines for entries of `composed` that are new or differ from `host`.
fn changed_lines(composed: &EnvMap, host: &EnvMap) -> Vec<String> {
    composed
        .iter()
        .filter(|(key, value)| host.get(*key) != Some(*value))
        .map(|(key, value)| format!("{key}={value}"))
        .collect()
}
