use crate::config::ConfigStore;
use crate::tools::definition_from_input;
use crate::ui;
use anyhow::Result;

pub struct Registration {
    pub name: String,
    pub root: String,
    pub inventory: Option<String>,
    pub roles_path: Option<String>,
    pub collections_paths: Option<String>,
    pub default: bool,
}

pub fn execute(mut store: ConfigStore, registration: Registration) -> Result<()> {
    let project = definition_from_input(
        &registration.name,
        &registration.root,
        registration.inventory,
        registration.roles_path.as_deref(),
        registration.collections_paths.as_deref(),
    )?;

    if !project.root_path().is_dir() {
        ui::warn(format!(
            "project root {} does not exist yet",
            project.root_path().display()
        ));
    }

    let root = project.root.clone();
    let is_default = store.register(project, registration.default)?;

    let suffix = if is_default { " (default)" } else { "" };
    ui::success(
        "Registered",
        format!("{} -> {root}{suffix}", registration.name),
    );
    ui::info(format!("Saved to {}", store.path().display()));
    Ok(())
}
