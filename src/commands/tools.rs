use crate::tools;
use anyhow::Result;

pub fn execute() -> Result<()> {
    let catalog = tools::catalog();
    let width = catalog.iter().map(|spec| spec.name.len()).max().unwrap_or(0);

    for spec in &catalog {
        println!("{:<width$}  {}", spec.name, spec.description);
    }

    Ok(())
}
