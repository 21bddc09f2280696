use super::{Context, print_json};
use anyhow::{Context as _, Result};
use route_kit_api::cloudflare::validate_pattern;
use route_kit_core::{Pagination, RouteUpdate};

pub async fn list(ctx: &Context, page: u32, per_page: u32) -> Result<()> {
    let routes = ctx.cloudflare()?.routes(ctx.zone())?;
    let result = routes
        .list(Pagination { page, per_page })
        .await
        .context("Failed to list routes")?;
    print_json(&result)
}

pub async fn get(ctx: &Context, id: &str) -> Result<()> {
    let routes = ctx.cloudflare()?.routes(ctx.zone())?;
    let route = routes
        .get(id)
        .await
        .with_context(|| format!("Failed to fetch route {}", id))?;
    print_json(&route)
}

pub async fn create(ctx: &Context, pattern: &str, script: Option<&str>, enabled: bool) -> Result<()> {
    if !validate_pattern(Some(pattern)) {
        anyhow::bail!(
            "Invalid route pattern: {}\nExpected something like https://example.com/*",
            pattern
        );
    }

    let routes = ctx.cloudflare()?.routes(ctx.zone())?;
    let route = routes
        .create(pattern, script, enabled)
        .await
        .context("Failed to create route")?;
    print_json(&route)
}

pub async fn update(
    ctx: &Context,
    id: &str,
    pattern: Option<String>,
    script: Option<String>,
    enabled: Option<bool>,
) -> Result<()> {
    let changes = RouteUpdate {
        pattern,
        script,
        enabled,
    };
    if changes.is_empty() {
        anyhow::bail!("Nothing to update: pass --pattern, --script or --enabled");
    }

    let routes = ctx.cloudflare()?.routes(ctx.zone())?;
    let route = routes
        .update(id, &changes)
        .await
        .with_context(|| format!("Failed to update route {}", id))?;
    print_json(&route)
}

pub async fn delete(ctx: &Context, id: &str) -> Result<()> {
    let routes = ctx.cloudflare()?.routes(ctx.zone())?;
    let deleted = routes
        .delete(id)
        .await
        .with_context(|| format!("Failed to delete route {}", id))?;

    if deleted {
        println!("✅ Deleted route {}", id);
    } else {
        println!("❌ Cloudflare did not confirm deletion of route {}", id);
    }
    Ok(())
}

pub fn validate(pattern: &str) -> Result<()> {
    if validate_pattern(Some(pattern)) {
        println!("✅ Valid route pattern: {}", pattern);
        Ok(())
    } else {
        anyhow::bail!("Invalid route pattern: {}", pattern)
    }
}
