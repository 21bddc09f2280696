use super::templates::{config_template, slugify, worker_script, wrangler_toml};
use super::{Context, display_path};
use anyhow::{Context as _, Result};
use route_kit_core::CookieSettings;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "config/route-kit.toml";
const WORKER_FILE: &str = "cloudflare/worker.js";
const WRANGLER_FILE: &str = "wrangler.toml";

/// Worker name derived from the project directory
fn worker_name(base: &Path) -> String {
    let dir_name = fs::canonicalize(base)
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_default();

    match slugify(&dir_name) {
        slug if slug.is_empty() => "route-kit-router".to_string(),
        slug => format!("{}-router", slug),
    }
}

/// Render and write the three scaffold files.
///
/// Nothing is written when any target already exists, unless `force` is set.
fn install_files(base: &Path, cookie: &CookieSettings, force: bool) -> Result<Vec<PathBuf>> {
    let files = [
        (base.join(CONFIG_FILE), config_template(cookie)),
        (base.join(WORKER_FILE), worker_script(cookie)?),
        (base.join(WRANGLER_FILE), wrangler_toml(&worker_name(base), cookie)),
    ];

    if !force {
        let existing: Vec<String> = files
            .iter()
            .filter(|(path, _)| path.exists())
            .map(|(path, _)| display_path(base, path))
            .collect();
        if !existing.is_empty() {
            anyhow::bail!(
                "Refusing to overwrite existing files: {}\nUse --force to replace them",
                existing.join(", ")
            );
        }
    }

    let mut written = Vec::with_capacity(files.len());
    for (path, contents) in files {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}

/// Scaffold route-kit into a project directory
pub async fn run(ctx: &Context, path: PathBuf, force: bool) -> Result<()> {
    println!("📦 Installing route-kit into {}\n", path.display());

    if !path.is_dir() {
        anyhow::bail!("Not a directory: {}", path.display());
    }

    // Defaults apply when no source is configured; a broken config file is an error
    let cookie = ctx
        .load_configuration()
        .context("Cannot render templates from the current configuration")?
        .cookie;

    for file in install_files(&path, &cookie, force)? {
        println!("   ✅ Created {}", display_path(&path, &file));
    }

    println!();
    println!("✅ route-kit installed!");
    println!();
    println!("Next steps:");
    println!("   1. Update {} with your credentials and domains", CONFIG_FILE);
    println!("   2. Review and customize {} if needed", WORKER_FILE);
    println!("   3. Update {} with your Cloudflare account details", WRANGLER_FILE);
    println!("   4. Deploy with: wrangler deploy");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_install_writes_all_files() {
        let dir = TempDir::new().unwrap();

        let written = install_files(dir.path(), &CookieSettings::default(), false).unwrap();

        assert_eq!(written.len(), 3);
        assert!(dir.path().join(CONFIG_FILE).is_file());
        assert!(dir.path().join(WORKER_FILE).is_file());
        assert!(dir.path().join(WRANGLER_FILE).is_file());

        let worker = fs::read_to_string(dir.path().join(WORKER_FILE)).unwrap();
        assert!(worker.contains(r#"const COOKIE_NAME = "cf_router_origin";"#));
    }

    #[test]
    fn test_install_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(WRANGLER_FILE), "name = \"mine\"\n").unwrap();

        let err = install_files(dir.path(), &CookieSettings::default(), false).unwrap_err();

        assert!(err.to_string().contains("wrangler.toml"));
        assert_eq!(
            fs::read_to_string(dir.path().join(WRANGLER_FILE)).unwrap(),
            "name = \"mine\"\n"
        );
        assert!(!dir.path().join(CONFIG_FILE).exists());
    }

    #[test]
    fn test_install_force_overwrites() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(WRANGLER_FILE), "name = \"mine\"\n").unwrap();

        install_files(dir.path(), &CookieSettings::default(), true).unwrap();

        let wrangler = fs::read_to_string(dir.path().join(WRANGLER_FILE)).unwrap();
        assert!(wrangler.contains("main = \"cloudflare/worker.js\""));
    }

    #[test]
    fn test_worker_name_from_directory() {
        let dir = TempDir::new().unwrap();
        let project = dir.path().join("My Shop");
        fs::create_dir(&project).unwrap();

        assert_eq!(worker_name(&project), "my-shop-router");
    }

    #[tokio::test]
    async fn test_run_uses_configured_cookie_name() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("route-kit.toml");
        fs::write(&config, "[cookie]\nname = \"shop_origin\"\n").unwrap();
        let project = dir.path().join("shop");
        fs::create_dir(&project).unwrap();

        run(&Context::new(Some(config), None), project.clone(), false)
            .await
            .unwrap();

        let worker = fs::read_to_string(project.join(WORKER_FILE)).unwrap();
        assert!(worker.contains(r#"const COOKIE_NAME = "shop_origin";"#));
    }

    #[tokio::test]
    async fn test_run_rejects_broken_config() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("route-kit.toml");
        fs::write(&config, "[cookie\nname = ").unwrap();
        let project = dir.path().join("shop");
        fs::create_dir(&project).unwrap();

        let result = run(&Context::new(Some(config), None), project.clone(), false).await;

        assert!(result.is_err());
        assert!(!project.join(WORKER_FILE).exists());
    }

    #[test]
    fn test_worker_name_fallback() {
        assert_eq!(worker_name(Path::new("/definitely/missing/dir")), "route-kit-router");
    }
}
