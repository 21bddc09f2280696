mod commands;
mod logging;

use clap::{ArgAction, CommandFactory, Parser};
use clap_complete::{Shell, generate};
use commands::Context;
use route_kit_core::PageRuleStatus;
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "route-kit")]
#[command(version, about = "Cookie-based origin routing on Cloudflare Workers", long_about = None)]
struct Cli {
    /// Configuration file (default: ~/.route-kit/config.toml, then environment)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Zone ID, overriding the configured one
    #[arg(long, global = true)]
    zone: Option<String>,

    /// Increase log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Configure Cloudflare credentials, zone and routing cookie
    ///
    /// Required API Token Permissions:
    ///   Zone > Workers Routes > Edit
    ///   Zone > Page Rules > Edit
    ///
    /// Create token at: https://dash.cloudflare.com/profile/api-tokens
    Configure,

    /// Scaffold config, edge worker and wrangler.toml into a project
    Install {
        /// Project directory (default: current directory)
        path: Option<PathBuf>,

        /// Overwrite files that already exist
        #[arg(long)]
        force: bool,
    },

    /// Manage Workers Routes
    Routes {
        #[command(subcommand)]
        command: RoutesCommand,
    },

    /// Manage Page Rules
    PageRules {
        #[command(subcommand)]
        command: PageRulesCommand,
    },

    /// Report whether credentials and zone are configured
    Check,

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser)]
enum RoutesCommand {
    /// List routes in the zone
    List {
        #[arg(long, default_value = "1")]
        page: u32,

        #[arg(long, default_value = "50")]
        per_page: u32,
    },

    /// Show one route
    Get { id: String },

    /// Bind a URL pattern to a worker script
    Create {
        /// Pattern such as https://example.com/*
        pattern: String,

        /// Worker script name
        #[arg(long)]
        script: Option<String>,

        /// Create the route disabled
        #[arg(long)]
        disabled: bool,
    },

    /// Change a route's pattern, script or enabled flag
    Update {
        id: String,

        #[arg(long)]
        pattern: Option<String>,

        #[arg(long)]
        script: Option<String>,

        #[arg(long)]
        enabled: Option<bool>,
    },

    /// Delete a route
    Delete { id: String },

    /// Check a pattern locally without calling the API
    Validate { pattern: String },
}

#[derive(Parser)]
enum PageRulesCommand {
    /// List page rules in the zone
    List {
        /// Only rules with this status (active, disabled)
        #[arg(long)]
        status: Option<PageRuleStatus>,

        /// Sort field
        #[arg(long, default_value = route_kit_api::cloudflare::DEFAULT_ORDER)]
        order: String,
    },

    /// Show one page rule
    Get { id: String },

    /// Create a page rule
    ///
    /// Actions are `id=value` (value parsed as JSON when possible) or a JSON
    /// object. Example: --action browser_cache_ttl=14400
    Create {
        /// URL pattern or JSON target object (repeatable)
        #[arg(long = "target", required = true)]
        targets: Vec<String>,

        /// Action (repeatable)
        #[arg(long = "action", required = true)]
        actions: Vec<String>,

        #[arg(long)]
        priority: Option<i64>,

        /// Create the rule disabled
        #[arg(long)]
        disabled: bool,
    },

    /// Change targets, actions, priority or status of a rule
    Update {
        id: String,

        #[arg(long = "target")]
        targets: Vec<String>,

        #[arg(long = "action")]
        actions: Vec<String>,

        #[arg(long)]
        priority: Option<i64>,

        #[arg(long)]
        status: Option<PageRuleStatus>,
    },

    /// Delete a page rule
    Delete { id: String },

    /// Reassign priorities in one batch, as `id=priority` pairs
    Reorder {
        #[arg(required = true)]
        priorities: Vec<String>,
    },
}

/// A `.env` load failure worth reporting; a missing file is normal
fn dotenv_problem(result: &dotenvy::Result<PathBuf>) -> Option<&dotenvy::Error> {
    match result {
        Err(err) if !err.not_found() => Some(err),
        _ => None,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let dotenv = dotenvy::dotenv();
    logging::init(cli.verbose);
    if let Some(err) = dotenv_problem(&dotenv) {
        tracing::warn!(error = %err, "Ignoring unreadable .env file");
    }

    let ctx = Context::new(cli.config, cli.zone);

    match cli.command {
        Command::Configure => commands::configure::run(&ctx).await,
        Command::Install { path, force } => {
            commands::install::run(&ctx, path.unwrap_or_else(|| PathBuf::from(".")), force).await
        }
        Command::Routes { command } => match command {
            RoutesCommand::List { page, per_page } => {
                commands::routes::list(&ctx, page, per_page).await
            }
            RoutesCommand::Get { id } => commands::routes::get(&ctx, &id).await,
            RoutesCommand::Create {
                pattern,
                script,
                disabled,
            } => commands::routes::create(&ctx, &pattern, script.as_deref(), !disabled).await,
            RoutesCommand::Update {
                id,
                pattern,
                script,
                enabled,
            } => commands::routes::update(&ctx, &id, pattern, script, enabled).await,
            RoutesCommand::Delete { id } => commands::routes::delete(&ctx, &id).await,
            RoutesCommand::Validate { pattern } => commands::routes::validate(&pattern),
        },
        Command::PageRules { command } => match command {
            PageRulesCommand::List { status, order } => {
                commands::page_rules::list(&ctx, status, &order).await
            }
            PageRulesCommand::Get { id } => commands::page_rules::get(&ctx, &id).await,
            PageRulesCommand::Create {
                targets,
                actions,
                priority,
                disabled,
            } => {
                let status = if disabled {
                    PageRuleStatus::Disabled
                } else {
                    PageRuleStatus::Active
                };
                commands::page_rules::create(&ctx, &targets, &actions, priority, status).await
            }
            PageRulesCommand::Update {
                id,
                targets,
                actions,
                priority,
                status,
            } => {
                commands::page_rules::update(&ctx, &id, &targets, &actions, priority, status).await
            }
            PageRulesCommand::Delete { id } => commands::page_rules::delete(&ctx, &id).await,
            PageRulesCommand::Reorder { priorities } => {
                commands::page_rules::reorder(&ctx, &priorities).await
            }
        },
        Command::Check => commands::check::run(&ctx),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "route-kit", &mut io::stdout());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_dotenv_is_not_reported() {
        let dir = TempDir::new().unwrap();
        let result = dotenvy::from_path(dir.path().join(".env"));
        assert!(dotenv_problem(&result.map(|_| PathBuf::new())).is_none());
    }

    #[test]
    fn test_malformed_dotenv_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".env");
        fs::write(&path, "ROUTE_KIT_BROKEN_LINE\"\n").unwrap();

        let result = dotenvy::from_path(&path);
        assert!(dotenv_problem(&result.map(|_| path.clone())).is_some());
    }
}
