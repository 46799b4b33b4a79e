use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::util::paths;

/// A registered Ansible project.
///
/// The name is the key in [`ServerConfiguration::projects`] and is not repeated
/// inside the stored record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDefinition {
    #[serde(skip)]
    pub name: String,
    pub root: String,
    #[serde(default)]
    pub inventory: Option<String>,
    #[serde(default)]
    pub roles_path: Option<Vec<String>>,
    #[serde(default)]
    pub collections_paths: Option<Vec<String>>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub env_vars: BTreeMap<String, String>,
}

impl ProjectDefinition {
    pub fn new(name: impl Into<String>, root: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            inventory: None,
            roles_path: None,
            collections_paths: None,
            env_vars: BTreeMap::new(),
        }
    }

    pub fn root_path(&self) -> &Path {
        Path::new(&self.root)
    }
}

/// Persisted server configuration: every registered project plus the default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfiguration {
    #[serde(default)]
    pub projects: BTreeMap<String, ProjectDefinition>,
    #[serde(default)]
    pub default_project: Option<String>,
}

impl ServerConfiguration {
    /// Parse a configuration document, filling in project names from their keys.
    pub fn from_json(contents: &str) -> Result<Self> {
        let mut config: Self = serde_json::from_str(contents)?;
        for (name, project) in config.projects.iter_mut() {
            project.name = name.clone();
        }
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize configuration")
    }

    /// Register or replace a project; last write wins.
    ///
    /// The project becomes the default when requested or when no default is set.
    /// Returns whether it is the default afterwards.
    pub fn insert(&mut self, project: ProjectDefinition, set_as_default: bool) -> bool {
        let name = project.name.clone();
        self.projects.insert(name.clone(), project);

        if set_as_default || self.default_project.is_none() {
            self.default_project = Some(name.clone());
        }

        self.default_project.as_deref() == Some(name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&ProjectDefinition> {
        self.projects.get(name)
    }

    /// The configured default project name when it does not name a registered project.
    pub fn dangling_default(&self) -> Option<&str> {
        self.default_project
            .as_deref()
            .filter(|name| !self.projects.contains_key(*name))
    }
}

/// Configuration bound to the file it was loaded from.
///
/// Every mutation is written back to the same location.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    config: ServerConfiguration,
}

impl ConfigStore {
    /// Open the store at the location resolved from the environment.
    pub fn open() -> Result<Self> {
        Self::open_at(paths::config_file()?)
    }

    /// Open the store at an explicit path. A missing file yields an empty configuration.
    pub fn open_at(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let config = Self::load(&path)?;
        Ok(Self { path, config })
    }

    /// A store that has not been read from disk; saving still writes to `path`.
    pub fn with_config(path: impl Into<PathBuf>, config: ServerConfiguration) -> Self {
        Self {
            path: path.into(),
            config,
        }
    }

    pub fn load(path: &Path) -> Result<ServerConfiguration> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "configuration file not found, starting empty");
            return Ok(ServerConfiguration::default());
        }

        let config = fs::read_to_string(path)
            .map_err(anyhow::Error::from)
            .and_then(|contents| ServerConfiguration::from_json(&contents))
            .with_context(|| format!("Failed to load configuration from {:?}", path))?;

        if let Some(name) = config.dangling_default() {
            tracing::warn!(
                default_project = name,
                "default project is not registered and will never resolve"
            );
        }

        tracing::debug!(
            path = %path.display(),
            projects = config.projects.len(),
            "loaded configuration"
        );
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create config directory {:?}", parent))?;
            }
        }

        let contents = self.config.to_json()?;
        fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write config file {:?}", self.path))?;
        Ok(())
    }

    /// Register a project and persist the configuration.
    pub fn register(&mut self, project: ProjectDefinition, set_as_default: bool) -> Result<bool> {
        let name = project.name.clone();
        let is_default = self.config.insert(project, set_as_default);
        self.save()?;
        tracing::info!(project = %name, is_default, "registered project");
        Ok(is_default)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &ServerConfiguration {
        &self.config
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<BTreeMap<String, String>> = Option::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}
