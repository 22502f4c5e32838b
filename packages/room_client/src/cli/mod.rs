pub mod chat;

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use room_client::config::{ClientConfig, ClientPaths, FileConfig};
use room_client::connector::SessionConnector;

/// `roomchat join`: open a session and chat until the user quits or the room goes away.
pub async fn join_command(config: &ClientConfig, room: &str, name: Option<String>) -> Result<()> {
    let name = name
        .or_else(|| config.display_name.clone())
        .filter(|n| !n.trim().is_empty())
        .context("no display name; pass --name or set session.display_name")?;

    let mut connector = SessionConnector::new(config).context("failed to build HTTP client")?;
    connector
        .connect(room, &name)
        .await
        .with_context(|| format!("could not join room {room}"))?;

    let result = chat::run(&connector, room).await;
    connector.disconnect().await;
    info!(room, "left room");
    result
}

/// `roomchat config`: print the effective configuration, or write a starter file.
pub fn config_command(paths: &ClientPaths, file_config: &FileConfig, init: bool) -> Result<()> {
    if init {
        let path = paths.config_path();
        if write_starter_config(&path)? {
            println!("wrote {}", path.display());
        } else {
            println!("{} already exists; leaving it alone", path.display());
        }
        return Ok(());
    }

    println!("# data dir: {}", paths.data_dir.display());
    print!(
        "{}",
        toml::to_string_pretty(file_config).context("failed to render configuration")?
    );
    Ok(())
}

/// Write the default configuration to `path` unless a file is already there.
/// Returns whether a file was written.
fn write_starter_config(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }
    let body = toml::to_string_pretty(&FileConfig::default())
        .context("failed to render default configuration")?;
    std::fs::write(path, body).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(true)
}
