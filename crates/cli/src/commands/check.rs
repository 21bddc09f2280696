use super::Context;
use anyhow::Result;
use route_kit_core::Configuration;

/// Which pieces of configuration are missing
fn missing_settings(config: &Configuration, zone_override: Option<&str>) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if !config.credentials_configured() {
        missing.push("credentials (api_token, or api_key + api_email)");
    }
    let zone = zone_override.or(config.zone_id.as_deref());
    if zone.is_none_or(str::is_empty) {
        missing.push("zone_id");
    }
    missing
}

/// Report configuration status without calling the API
pub fn run(ctx: &Context) -> Result<()> {
    println!("🔍 Checking configuration...\n");

    let config = ctx.load_configuration()?;

    let auth = if config.api_token.as_deref().is_some_and(|t| !t.is_empty()) {
        "API token"
    } else if config.credentials_configured() {
        "API key + email"
    } else {
        "none"
    };
    println!("   Credentials: {}", auth);
    println!(
        "   Zone: {}",
        ctx.zone().or(config.zone_id.as_deref()).unwrap_or("not set")
    );
    println!("   Cookie: {}", config.cookie.name);
    println!(
        "   Marketing origin: {}",
        config.cookie.marketing_origin.as_deref().unwrap_or("not set")
    );
    println!();

    let missing = missing_settings(&config, ctx.zone());
    if missing.is_empty() {
        println!("✅ Ready to manage routes and page rules");
        Ok(())
    } else {
        anyhow::bail!(
            "Missing configuration: {}\nRun 'route-kit configure' or set CLOUDFLARE_* environment variables",
            missing.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_settings_complete() {
        let config = Configuration::configure(|c| {
            c.api_token = Some("token".to_string());
            c.zone_id = Some("zone".to_string());
        });
        assert!(missing_settings(&config, None).is_empty());
    }

    #[test]
    fn test_missing_settings_reports_each_gap() {
        let missing = missing_settings(&Configuration::default(), None);
        assert_eq!(missing.len(), 2);
        assert_eq!(missing[1], "zone_id");
    }

    #[test]
    fn test_zone_flag_satisfies_zone() {
        let config = Configuration::configure(|c| {
            c.api_key = Some("key".to_string());
            c.api_email = Some("user@example.com".to_string());
        });
        assert!(missing_settings(&config, Some("flag-zone")).is_empty());
    }
}
