use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;

use crate::publish::ManagerImages;

pub const DEFAULT_INTERVALS: &str = "30,60,90";

pub fn database_url() -> anyhow::Result<String> {
    std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to the data warehouse (or pass --csv)")
}

/// Reads a JSON object of manager display name to picture URL.
pub fn load_manager_images(path: Option<&Path>) -> anyhow::Result<ManagerImages> {
    let Some(path) = path else {
        return Ok(ManagerImages::default());
    };

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let urls: HashMap<String, String> = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a name-to-URL object", path.display()))?;
    Ok(ManagerImages::new(urls))
}
