use crate::config::ConfigStore;
use crate::ui;
use anyhow::Result;

pub fn execute(store: &ConfigStore) -> Result<()> {
    let config = store.config();

    if config.projects.is_empty() {
        ui::info(format!(
            "No projects registered in {}",
            store.path().display()
        ));
        return Ok(());
    }

    for (name, project) in &config.projects {
        let label = if config.default_project.as_deref() == Some(name.as_str()) {
            "Default"
        } else {
            "Project"
        };

        let mut details = format!("{name} -> {}", project.root);
        if let Some(inventory) = &project.inventory {
            details.push_str(&format!("\ninventory: {inventory}"));
        }
        if let Some(roles) = &project.roles_path {
            details.push_str(&format!("\nroles: {}", roles.join(", ")));
        }
        if let Some(collections) = &project.collections_paths {
            details.push_str(&format!("\ncollections: {}", collections.join(", ")));
        }
        if !project.root_path().is_dir() {
            details.push_str("\n(root directory is missing)");
        }
        ui::status(label, details);
    }

    if let Some(name) = config.dangling_default() {
        ui::warn(format!("default project '{name}' is not registered"));
    }

    Ok(())
}
