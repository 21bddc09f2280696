pub mod check;
pub mod configure;
pub mod install;
pub mod page_rules;
pub mod routes;
pub mod templates;

use anyhow::{Context as _, Result};
use route_kit_api::Cloudflare;
use route_kit_core::{Configuration, CredentialSource, EnvSource, FileSource};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Global flags shared by every command
pub struct Context {
    config_file: Option<PathBuf>,
    zone: Option<String>,
}

impl Context {
    pub fn new(config_file: Option<PathBuf>, zone: Option<String>) -> Self {
        Self { config_file, zone }
    }

    pub fn zone(&self) -> Option<&str> {
        self.zone.as_deref()
    }

    /// Resolve configuration: `--config`, else the user config file, else environment
    pub fn load_configuration(&self) -> Result<Configuration> {
        if let Some(path) = &self.config_file {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            return Configuration::from_sources(&[&FileSource::new(path)])
                .with_context(|| format!("Failed to load {}", path.display()));
        }

        let user_file = FileSource::new(config_path()?);
        let env = EnvSource::new();
        let sources: [&dyn CredentialSource; 2] = [&user_file, &env];
        Configuration::from_sources(&sources).context("Failed to load configuration")
    }

    pub fn cloudflare(&self) -> Result<Cloudflare> {
        Ok(Cloudflare::new(self.load_configuration()?))
    }
}

/// Path to the user config file (`~/.route-kit/config.toml`)
pub fn config_path() -> Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .context("Could not determine home directory")?;
    Ok(PathBuf::from(home).join(".route-kit").join("config.toml"))
}

/// Pretty-print an API result on stdout
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Human-readable relative path for status lines
pub fn display_path(base: &Path, path: &Path) -> String {
    path.strip_prefix(base).unwrap_or(path).display().to_string()
}
