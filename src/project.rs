use std::env;

use crate::config::{ProjectDefinition, ServerConfiguration};

/// Environment variable naming the project to use when no explicit name is given
pub const PROJECT_ENV: &str = "MCP_ANSIBLE_PROJECT_NAME";

/// Resolve which project to use, reading the override from the process environment.
pub fn resolve_project<'a>(
    config: &'a ServerConfiguration,
    explicit: Option<&str>,
) -> Option<&'a ProjectDefinition> {
    let env_override = env::var(PROJECT_ENV).ok();
    resolve_project_with(config, explicit, env_override.as_deref())
}

/// Resolve which project to use.
///
/// First match wins: explicit name, environment override, configured default,
/// then the only registered project. An explicit or environment name that is
/// not registered resolves to `None` without falling through.
pub fn resolve_project_with<'a>(
    config: &'a ServerConfiguration,
    explicit: Option<&str>,
    env_override: Option<&str>,
) -> Option<&'a ProjectDefinition> {
    if let Some(name) = non_empty(explicit) {
        return lookup(config, name, "explicit");
    }

    if let Some(name) = non_empty(env_override) {
        return lookup(config, name, PROJECT_ENV);
    }

    if let Some(name) = non_empty(config.default_project.as_deref()) {
        // A dangling default only falls through to the single-project shortcut.
        match lookup(config, name, "default_project") {
            Some(project) => return Some(project),
            None if config.projects.len() != 1 => return None,
            None => {}
        }
    }

    if config.projects.len() == 1 {
        return config.projects.values().next();
    }

    None
}

fn lookup<'a>(
    config: &'a ServerConfiguration,
    name: &str,
    source: &str,
) -> Option<&'a ProjectDefinition> {
    let project = config.get(name);
    if project.is_none() {
        tracing::warn!(project = name, source, "project is not registered");
    }
    project
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
