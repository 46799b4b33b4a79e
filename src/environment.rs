use std::collections::BTreeMap;
use std::env;

use crate::config::ProjectDefinition;

/// Variables set from a project's search paths
pub const ROLES_PATH_VAR: &str = "ANSIBLE_ROLES_PATH";
pub const COLLECTIONS_PATH_VAR: &str = "ANSIBLE_COLLECTIONS_PATH";

/// Host variables carrying this prefix are forwarded with the prefix stripped
pub const FORWARD_PREFIX: &str = "MCP_ANSIBLE_ENV_";

#[cfg(windows)]
pub const PATH_LIST_SEPARATOR: &str = ";";
#[cfg(not(windows))]
pub const PATH_LIST_SEPARATOR: &str = ":";

/// Environment passed to a child process
pub type EnvMap = BTreeMap<String, String>;

/// Snapshot of the current process environment. Non-UTF-8 entries are skipped.
pub fn host_env() -> EnvMap {
    env::vars_os()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
        .collect()
}

/// Build the environment for a project on top of the current process environment.
pub fn project_env(project: &ProjectDefinition) -> EnvMap {
    compose_env(project, &host_env())
}

/// Build the environment for a project on top of `host`.
///
/// Layers, later wins: inherited variables, search paths, the project's
/// `env_vars`, then `MCP_ANSIBLE_ENV_*` forwards from `host`.
pub fn compose_env(project: &ProjectDefinition, host: &EnvMap) -> EnvMap {
    let mut env = host.clone();

    if let Some(joined) = join_paths(project.roles_path.as_deref()) {
        env.insert(ROLES_PATH_VAR.to_string(), joined);
    }

    if let Some(joined) = join_paths(project.collections_paths.as_deref()) {
        env.insert(COLLECTIONS_PATH_VAR.to_string(), joined);
    }

    env.extend(
        project
            .env_vars
            .iter()
            .map(|(key, value)| (key.clone(), value.clone())),
    );

    for (key, value) in forwarded(host) {
        env.insert(key.to_string(), value.to_string());
    }

    env
}

/// `MCP_ANSIBLE_ENV_*` entries of `host` with the prefix removed.
pub fn forwarded(host: &EnvMap) -> impl Iterator<Item = (&str, &str)> {
    host.iter().filter_map(|(key, value)| {
        key.strip_prefix(FORWARD_PREFIX)
            .filter(|name| !name.is_empty())
            .map(|name| (name, value.as_str()))
    })
}

fn join_paths(paths: Option<&[String]>) -> Option<String> {
    match paths {
        Some(paths) if !paths.is_empty() => Some(paths.join(PATH_LIST_SEPARATOR)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host(pairs: &[(&str, &str)]) -> EnvMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_basic_env_inherits_host() {
        let project = ProjectDefinition::new("test", "/test");
        let env = compose_env(&project, &host(&[("HOME", "/home/ops")]));

        assert_eq!(env.get("HOME").map(String::as_str), Some("/home/ops"));
        assert!(!env.contains_key(ROLES_PATH_VAR));
        assert!(!env.contains_key(COLLECTIONS_PATH_VAR));
    }

    #[cfg(not(windows))]
    #[test]
    fn test_roles_path_joined() {
        let mut project = ProjectDefinition::new("test", "/test");
        project.roles_path = Some(vec![
            "roles".to_string(),
            "/usr/share/ansible/roles".to_string(),
        ]);

        let env = compose_env(&project, &EnvMap::new());
        assert_eq!(
            env.get(ROLES_PATH_VAR).map(String::as_str),
            Some("roles:/usr/share/ansible/roles")
        );
    }

    #[cfg(not(windows))]
    #[test]
    fn test_collections_path_joined() {
        let mut project = ProjectDefinition::new("test", "/test");
        project.collections_paths = Some(vec!["collections".to_string(), "/opt/c".to_string()]);

        let env = compose_env(&project, &EnvMap::new());
        assert_eq!(
            env.get(COLLECTIONS_PATH_VAR).map(String::as_str),
            Some("collections:/opt/c")
        );
    }

    #[test]
    fn test_empty_search_paths_are_not_set() {
        let mut project = ProjectDefinition::new("test", "/test");
        project.roles_path = Some(Vec::new());

        let env = compose_env(&project, &host(&[(ROLES_PATH_VAR, "/inherited")]));
        assert_eq!(
            env.get(ROLES_PATH_VAR).map(String::as_str),
            Some("/inherited")
        );
    }

    #[test]
    fn test_env_vars_override_inherited() {
        let mut project = ProjectDefinition::new("test", "/test");
        project
            .env_vars
            .insert("CUSTOM_VAR".to_string(), "project".to_string());

        let env = compose_env(&project, &host(&[("CUSTOM_VAR", "host")]));
        assert_eq!(env.get("CUSTOM_VAR").map(String::as_str), Some("project"));
    }

    #[test]
    fn test_env_vars_override_search_paths() {
        let mut project = ProjectDefinition::new("test", "/test");
        project.roles_path = Some(vec!["roles".to_string()]);
        project
            .env_vars
            .insert(ROLES_PATH_VAR.to_string(), "/explicit".to_string());

        let env = compose_env(&project, &EnvMap::new());
        assert_eq!(env.get(ROLES_PATH_VAR).map(String::as_str), Some("/explicit"));
    }

    #[test]
    fn test_forwarded_prefix_beats_project_vars() {
        let mut project = ProjectDefinition::new("test", "/test");
        project
            .env_vars
            .insert("ANSIBLE_STDOUT_CALLBACK".to_string(), "yaml".to_string());

        let env = compose_env(
            &project,
            &host(&[("MCP_ANSIBLE_ENV_ANSIBLE_STDOUT_CALLBACK", "json")]),
        );
        assert_eq!(
            env.get("ANSIBLE_STDOUT_CALLBACK").map(String::as_str),
            Some("json")
        );
        assert!(env.contains_key("MCP_ANSIBLE_ENV_ANSIBLE_STDOUT_CALLBACK"));
    }

    #[test]
    fn test_bare_prefix_is_ignored() {
        let project = ProjectDefinition::new("test", "/test");
        let env = compose_env(&project, &host(&[(FORWARD_PREFIX, "value")]));

        assert!(!env.contains_key(""));
        assert_eq!(env.len(), 1);
    }

    #[test]
    fn test_prefix_only_stripped_at_start() {
        let host = host(&[("X_MCP_ANSIBLE_ENV_Y", "1")]);
        assert_eq!(forwarded(&host).count(), 0);
    }
}
