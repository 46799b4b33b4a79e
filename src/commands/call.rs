use crate::tools::Dispatcher;
use anyhow::{Context, Result};
use serde_json::Value;

pub fn execute(mut dispatcher: Dispatcher, tool: &str, arguments: Option<&str>) -> Result<()> {
    let arguments = match arguments.map(str::trim).filter(|args| !args.is_empty()) {
        Some(raw) => serde_json::from_str(raw).context("Tool arguments must be a JSON object")?,
        None => Value::Null,
    };

    let text = dispatcher.call(tool, arguments)?;
    println!("{text}");
    Ok(())
}
