use anyhow::Context;
use serde::Deserialize;
use serde_json::json;
use std::io::Write;
use tempfile::NamedTempFile;

use super::{to_json, Dispatcher, ToolSpec};
use crate::error::Result;
use crate::process::CommandOutput;

const PROGRAM: &str = "ansible-vault";

#[derive(Debug, Deserialize)]
pub(super) struct VaultArgs {
    file_path: String,
    #[serde(default)]
    vault_password: Option<String>,
    #[serde(default)]
    vault_id: Option<String>,
    #[serde(default)]
    project: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ViewArgs {
    file_path: String,
    #[serde(default)]
    vault_password: Option<String>,
    #[serde(default)]
    project: Option<String>,
}

fn vault_schema(with_vault_id: bool) -> serde_json::Value {
    let mut schema = json!({
        "type": "object",
        "properties": {
            "file_path": {"type": "string", "description": "File to operate on"},
            "vault_password": {"type": "string", "description": "Vault password; written to a temporary password file"},
            "project": {"type": "string", "description": "Project name"}
        },
        "required": ["file_path"]
    });
    if with_vault_id {
        schema["properties"]["vault_id"] =
            json!({"type": "string", "description": "Vault ID, used when no password is given"});
    }
    schema
}

pub(super) fn specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: "vault_encrypt",
            description: "Encrypt a file with Ansible Vault",
            input_schema: vault_schema(true),
        },
        ToolSpec {
            name: "vault_decrypt",
            description: "Decrypt a file encrypted with Ansible Vault",
            input_schema: vault_schema(true),
        },
        ToolSpec {
            name: "vault_view",
            description: "View an encrypted file without decrypting it on disk",
            input_schema: vault_schema(false),
        },
    ]
}

/// Write the password to a temporary file that is removed when dropped.
fn password_file(password: &str) -> anyhow::Result<NamedTempFile> {
    let mut file = NamedTempFile::new().context("Failed to create vault password file")?;
    file.write_all(password.as_bytes())
        .context("Failed to write vault password file")?;
    file.flush().context("Failed to write vault password file")?;
    Ok(file)
}

fn run_vault(
    dispatcher: &Dispatcher,
    action: &str,
    file_path: &str,
    vault_password: Option<&str>,
    vault_id: Option<&str>,
    project: Option<&str>,
) -> Result<CommandOutput> {
    let project = dispatcher.resolve(project);
    let mut spec = dispatcher.command(PROGRAM, project);
    spec.args([action, file_path]);

    let password = match vault_password.filter(|p| !p.is_empty()) {
        Some(password) => Some(password_file(password)?),
        None => None,
    };

    if let Some(file) = &password {
        spec.arg("--vault-password-file")
            .arg(file.path().to_string_lossy());
    } else if let Some(vault_id) = vault_id.filter(|id| !id.is_empty()) {
        spec.args(["--vault-id", vault_id]);
    }

    let output = dispatcher.run(&spec);
    drop(password);
    Ok(output)
}

fn change_result(output: &CommandOutput) -> Result<String> {
    to_json(&json!({
        "success": output.success(),
        "stdout": output.stdout,
        "stderr": output.stderr,
    }))
}

pub(super) fn encrypt(dispatcher: &Dispatcher, args: VaultArgs) -> Result<String> {
    let output = run_vault(
        dispatcher,
        "encrypt",
        &args.file_path,
        args.vault_password.as_deref(),
        args.vault_id.as_deref(),
        args.project.as_deref(),
    )?;
    change_result(&output)
}

pub(super) fn decrypt(dispatcher: &Dispatcher, args: VaultArgs) -> Result<String> {
    let output = run_vault(
        dispatcher,
        "decrypt",
        &args.file_path,
        args.vault_password.as_deref(),
        args.vault_id.as_deref(),
        args.project.as_deref(),
    )?;
    change_result(&output)
}

pub(super) fn view(dispatcher: &Dispatcher, args: ViewArgs) -> Result<String> {
    let output = run_vault(
        dispatcher,
        "view",
        &args.file_path,
        args.vault_password.as_deref(),
        None,
        args.project.as_deref(),
    )?;

    if !output.success() {
        return to_json(&json!({"error": output.stderr}));
    }
    Ok(output.stdout)
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use crate::config::ServerConfiguration;
    use serde_json::json;
    use std::path::Path;
    use tempfile::TempDir;

    #[test]
    fn test_encrypt_with_password_uses_temp_file() {
        let temp = TempDir::new().unwrap();
        let runner = RecordingRunner::default();
        runner.respond(0, "Encryption successful", "");
        let mut dispatcher = dispatcher(temp.path(), ServerConfiguration::default(), &runner);

        let value = call_json(
            &mut dispatcher,
            "vault_encrypt",
            json!({"file_path": "secrets.yml", "vault_password": "hunter2", "vault_id": "prod@prompt"}),
        );
        assert_eq!(value["success"], true);
        assert_eq!(value["stdout"], "Encryption successful");

        let args = runner.last().args;
        assert_eq!(args[..3], ["encrypt", "secrets.yml", "--vault-password-file"]);
        assert_eq!(args.len(), 4);
        assert!(!args.iter().any(|a| a == "hunter2" || a == "--vault-id"));
        assert!(!Path::new(&args[3]).exists());
    }

    #[test]
    fn test_decrypt_with_vault_id() {
        let temp = TempDir::new().unwrap();
        let runner = RecordingRunner::default();
        runner.respond(1, "", "Decryption failed");
        let mut dispatcher = dispatcher(temp.path(), ServerConfiguration::default(), &runner);

        let value = call_json(
            &mut dispatcher,
            "vault_decrypt",
            json!({"file_path": "secrets.yml", "vault_id": "prod@~/.vault_pass"}),
        );
        assert_eq!(value["success"], false);
        assert_eq!(value["stderr"], "Decryption failed");
        assert_eq!(
            runner.last().argv(),
            vec![
                "ansible-vault",
                "decrypt",
                "secrets.yml",
                "--vault-id",
                "prod@~/.vault_pass"
            ]
        );
    }

    #[test]
    fn test_view() {
        let temp = TempDir::new().unwrap();
        let runner = RecordingRunner::default();
        runner
            .respond(0, "db_password: s3cret\n", "")
            .respond(1, "", "ERROR! Decryption failed");
        let mut dispatcher = dispatcher(temp.path(), ServerConfiguration::default(), &runner);

        let text = dispatcher
            .call("vault_view", json!({"file_path": "secrets.yml"}))
            .unwrap();
        assert_eq!(text, "db_password: s3cret\n");
        assert_eq!(runner.last().args, vec!["view", "secrets.yml"]);

        let value = call_json(&mut dispatcher, "vault_view", json!({"file_path": "secrets.yml"}));
        assert_eq!(value["error"], "ERROR! Decryption failed");
    }
}
