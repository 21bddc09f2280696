use super::{Context, print_json};
use anyhow::{Context as _, Result};
use route_kit_core::{PageRuleAction, PageRuleStatus, PageRuleUpdate, RulePriority, TargetSpec};
use serde_json::Value;

/// `--target` value: a JSON object, or a URL pattern
fn parse_target(input: &str) -> Result<TargetSpec> {
    let trimmed = input.trim();
    if trimmed.starts_with('{') {
        let value: Value = serde_json::from_str(trimmed)
            .with_context(|| format!("Invalid JSON target: {}", input))?;
        return Ok(TargetSpec::Raw(value));
    }
    Ok(TargetSpec::Url(trimmed.to_string()))
}

/// `--action` value: a JSON object, `id=value`, or a bare `id`.
///
/// The value part is read as JSON when it parses (numbers, objects), and as
/// a plain string otherwise.
fn parse_action(input: &str) -> Result<Value> {
    let trimmed = input.trim();
    if trimmed.starts_with('{') {
        return serde_json::from_str(trimmed)
            .with_context(|| format!("Invalid JSON action: {}", input));
    }

    let action = match trimmed.split_once('=') {
        Some((id, raw)) => {
            let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
            PageRuleAction::with_value(id.trim(), value)
        }
        None => PageRuleAction::new(trimmed),
    };
    if action.id.is_empty() {
        anyhow::bail!("Action id is empty: {}", input);
    }
    Ok(action.into())
}

/// `id=priority` pair for reorder
fn parse_priority(input: &str) -> Result<RulePriority> {
    let (id, priority) = input
        .split_once('=')
        .with_context(|| format!("Expected id=priority, got: {}", input))?;
    let priority: i64 = priority
        .trim()
        .parse()
        .with_context(|| format!("Invalid priority in: {}", input))?;
    Ok(RulePriority::new(id.trim(), priority))
}

fn parse_all<T>(inputs: &[String], parse: fn(&str) -> Result<T>) -> Result<Vec<T>> {
    inputs.iter().map(|s| parse(s)).collect()
}

pub async fn list(ctx: &Context, status: Option<PageRuleStatus>, order: &str) -> Result<()> {
    let rules = ctx.cloudflare()?.page_rules(ctx.zone())?;
    let result = rules
        .list(status, Some(order))
        .await
        .context("Failed to list page rules")?;
    print_json(&result)
}

pub async fn get(ctx: &Context, id: &str) -> Result<()> {
    let rules = ctx.cloudflare()?.page_rules(ctx.zone())?;
    let rule = rules
        .get(id)
        .await
        .with_context(|| format!("Failed to fetch page rule {}", id))?;
    print_json(&rule)
}

pub async fn create(
    ctx: &Context,
    targets: &[String],
    actions: &[String],
    priority: Option<i64>,
    status: PageRuleStatus,
) -> Result<()> {
    let targets = parse_all(targets, parse_target)?;
    let actions = parse_all(actions, parse_action)?;

    let rules = ctx.cloudflare()?.page_rules(ctx.zone())?;
    let rule = rules
        .create(targets, actions, priority, status)
        .await
        .context("Failed to create page rule")?;
    print_json(&rule)
}

pub async fn update(
    ctx: &Context,
    id: &str,
    targets: &[String],
    actions: &[String],
    priority: Option<i64>,
    status: Option<PageRuleStatus>,
) -> Result<()> {
    let changes = PageRuleUpdate {
        targets: (!targets.is_empty())
            .then(|| parse_all(targets, parse_target))
            .transpose()?,
        actions: (!actions.is_empty())
            .then(|| parse_all(actions, parse_action))
            .transpose()?,
        priority,
        status,
    };
    if changes == PageRuleUpdate::default() {
        anyhow::bail!("Nothing to update: pass --target, --action, --priority or --status");
    }

    let rules = ctx.cloudflare()?.page_rules(ctx.zone())?;
    let rule = rules
        .update(id, changes)
        .await
        .with_context(|| format!("Failed to update page rule {}", id))?;
    print_json(&rule)
}

pub async fn delete(ctx: &Context, id: &str) -> Result<()> {
    let rules = ctx.cloudflare()?.page_rules(ctx.zone())?;
    let deleted = rules
        .delete(id)
        .await
        .with_context(|| format!("Failed to delete page rule {}", id))?;

    if deleted {
        println!("✅ Deleted page rule {}", id);
    } else {
        println!("❌ Cloudflare did not confirm deletion of page rule {}", id);
    }
    Ok(())
}

pub async fn reorder(ctx: &Context, priorities: &[String]) -> Result<()> {
    let priorities = parse_all(priorities, parse_priority)?;

    let rules = ctx.cloudflare()?.page_rules(ctx.zone())?;
    let updated = rules
        .update_priorities(&priorities)
        .await
        .context("Failed to reorder page rules")?;
    print_json(&updated)
}
