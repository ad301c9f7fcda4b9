//! `chatload keys`

use std::path::Path;

use anyhow::{Context, Result};
use chatload_auth::{CredentialStore, NewKey, StoredKey};
use clap::Subcommand;

#[derive(Subcommand, Debug, Clone)]
pub enum KeysCommand {
    /// List stored credentials (secrets are never printed)
    List,
    /// Append a credential to the store
    Add {
        /// Identifier, used in result paths ([A-Za-z0-9._-])
        #[arg(long)]
        id: String,
        /// Secret sent as the Authorization header
        #[arg(long, env = "CHATLOAD_API_KEY", hide_env_values = true)]
        key: String,
        /// Free-form description
        #[arg(short, long, default_value = "")]
        description: String,
        /// Model bound to this credential
        #[arg(short, long)]
        model: Option<String>,
    },
}

pub async fn execute(command: &KeysCommand, key_store: &Path) -> Result<()> {
    let store = CredentialStore::open(key_store);
    match command {
        KeysCommand::List => {
            let keys = store
                .load()
                .with_context(|| format!("Failed to read {}", key_store.display()))?;
            println!("{}", format_listing(&keys));
        }
        KeysCommand::Add {
            id,
            key,
            description,
            model,
        } => {
            let new_key = NewKey {
                id: id.clone(),
                key: key.clone(),
                description: description.clone(),
                model: model.clone(),
            };
            // The store lock waits with a blocking sleep
            let entry = tokio::task::spawn_blocking(move || store.append(new_key))
                .await
                .context("Credential store update was interrupted")??;
            println!("✓ Added {} to {}", entry.id, key_store.display());
        }
    }
    Ok(())
}

fn format_listing(keys: &[StoredKey]) -> String {
    if keys.is_empty() {
        return "No credentials stored.".to_string();
    }

    let mut lines = vec![format!(
        "{:<20} {:<20} {:<26} {}",
        "ID", "MODEL", "CREATED", "DESCRIPTION"
    )];
    for key in keys {
        lines.push(format!(
            "{:<20} {:<20} {:<26} {}",
            key.id,
            key.model.as_deref().unwrap_or("-"),
            key.created_at,
            key.description
        ));
    }
    lines.push(format!("{} credential(s)", keys.len()));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_add_then_list() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("keys.json");

        execute(
            &KeysCommand::Add {
                id: "k1".to_string(),
                key: "sk-secret".to_string(),
                description: "primary".to_string(),
                model: Some("m1".to_string()),
            },
            &path,
        )
        .await
        .unwrap();

        let keys = CredentialStore::open(&path).load().unwrap();
        let listing = format_listing(&keys);
        assert!(listing.contains("k1"));
        assert!(listing.contains("m1"));
        assert!(listing.contains("primary"));
        assert!(!listing.contains("sk-secret"));
        assert!(listing.ends_with("1 credential(s)"));
    }

    #[tokio::test]
    async fn test_add_rejects_duplicate() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("keys.json");
        let add = KeysCommand::Add {
            id: "k1".to_string(),
            key: "sk".to_string(),
            description: String::new(),
            model: None,
        };

        execute(&add, &path).await.unwrap();
        assert!(execute(&add, &path).await.is_err());
    }

    #[tokio::test]
    async fn test_list_missing_store_fails() {
        let dir = TempDir::new().unwrap();
        assert!(execute(&KeysCommand::List, &dir.path().join("none.json"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_add_waits_for_lock_without_blocking_runtime() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("keys.json");
        let held = chatload_auth::StoreLock::acquire(&path, std::time::Duration::from_secs(1))
            .unwrap();

        // The runtime keeps making progress while the append waits
        let add = KeysCommand::Add {
            id: "k1".to_string(),
            key: "sk".to_string(),
            description: String::new(),
            model: None,
        };
        let task = tokio::spawn(async move { execute(&add, &path).await });
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        drop(held);

        task.await.unwrap().unwrap();
    }

    #[test]
    fn test_empty_listing() {
        assert_eq!(format_listing(&[]), "No credentials stored.");
    }
}
