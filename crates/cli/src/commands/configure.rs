use super::{Context, config_path};
use anyhow::{Context as _, Result};
use route_kit_core::{Configuration, parse_config_toml};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Helper to read user input
fn read_input(prompt: &str) -> Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

/// Combine an answer with the current value: empty keeps it, `none` clears it
fn merge_answer(input: &str, current: Option<&str>) -> Option<String> {
    if input.is_empty() {
        current.filter(|c| !c.is_empty()).map(str::to_string)
    } else if input.eq_ignore_ascii_case("none") {
        None
    } else {
        Some(input.to_string())
    }
}

/// Ask for a value, showing the current one (masked for secrets)
fn prompt_setting(label: &str, current: Option<&str>, secret: bool) -> Result<Option<String>> {
    let prompt = match current.filter(|c| !c.is_empty()) {
        Some(value) if secret => {
            let preview: String = value.chars().take(10).collect();
            format!("{} [current: {}...]: ", label, preview)
        }
        Some(value) => format!("{} [current: {}] (Enter to keep, 'none' to remove): ", label, value),
        None => format!("{}: ", label),
    };
    Ok(merge_answer(&read_input(&prompt)?, current))
}

fn load_existing(path: &Path) -> Result<Configuration> {
    if !path.exists() {
        return Ok(Configuration::default());
    }
    parse_config_toml(path).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Write the configuration, creating the parent directory if needed
fn save_config(path: &Path, config: &Configuration) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let contents = config.to_toml().context("Failed to serialize config")?;
    fs::write(path, contents).context("Failed to write config file")?;
    println!("✅ Configuration saved to: {}", path.display());
    Ok(())
}

/// Interactively configure credentials, zone and routing cookie
pub async fn run(ctx: &Context) -> Result<()> {
    println!("🔧 Configuring Cloudflare access...\n");

    let path: PathBuf = match &ctx.config_file {
        Some(path) => path.clone(),
        None => config_path()?,
    };
    let mut config = load_existing(&path)?;

    println!("📋 You'll need:");
    println!("   1. Cloudflare API Token (Workers Routes and Page Rules permissions)");
    println!("      Create at: https://dash.cloudflare.com/profile/api-tokens");
    println!("   2. Zone ID of the site");
    println!("      Find at: https://dash.cloudflare.com/ (zone overview, right sidebar)");
    println!("   3. Marketing origin and cookie domain (optional)");
    println!("      Example: https://www.example.com and .example.com");
    println!();

    config.api_token = prompt_setting("API Token", config.api_token.as_deref(), true)?;
    if !config.credentials_configured() {
        anyhow::bail!("API token is required");
    }

    config.zone_id = prompt_setting("Zone ID", config.zone_id.as_deref(), false)?;
    if config.zone_id.is_none() {
        anyhow::bail!("Zone ID is required");
    }

    config.account_id = prompt_setting(
        "Account ID (optional)",
        config.account_id.as_deref(),
        false,
    )?;
    config.cookie.marketing_origin = prompt_setting(
        "Marketing origin (optional)",
        config.cookie.marketing_origin.as_deref(),
        false,
    )?;
    config.cookie.domain = prompt_setting(
        "Cookie domain (optional)",
        config.cookie.domain.as_deref(),
        false,
    )?;

    save_config(&path, &config)?;

    println!();
    println!("✅ Configuration complete!");
    if config.cookie.marketing_origin.is_none() {
        println!("   💡 Tip: Set a marketing origin later with 'route-kit configure'");
    }
    println!();
    println!("🚀 Ready! Try: route-kit check");

    Ok(())
}
