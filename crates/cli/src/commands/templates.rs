use anyhow::Result;
use route_kit_core::CookieSettings;

/// Escape a string for a TOML basic string.
///
/// The generated files carry comments and a fixed layout, so they are
/// rendered by hand rather than through the toml serializer.
pub fn toml_escape_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\x08', "\\b")
        .replace('\x0C', "\\f")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

/// Lowercase ASCII slug for worker names.
/// Example: "My Shop_App" -> "my-shop-app"
pub fn slugify(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c
            } else if c.is_whitespace() || c == '-' || c == '_' || c == '.' {
                '-'
            } else {
                '\0'
            }
        })
        .filter(|&c| c != '\0')
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Project configuration file with every setting documented
pub fn config_template(cookie: &CookieSettings) -> String {
    let domain = cookie
        .domain
        .as_deref()
        .map(|d| format!("domain = \"{}\"", toml_escape_string(d)))
        .unwrap_or_else(|| "# domain = \".example.com\"".to_string());
    let marketing_origin = cookie
        .marketing_origin
        .as_deref()
        .map(|o| format!("marketing_origin = \"{}\"", toml_escape_string(o)))
        .unwrap_or_else(|| "# marketing_origin = \"https://www.example.com\"".to_string());

    format!(
        r#"# route-kit configuration
#
# Credentials can also come from the environment:
#   CLOUDFLARE_API_TOKEN, or CLOUDFLARE_API_KEY + CLOUDFLARE_API_EMAIL
#   CLOUDFLARE_ZONE_ID, CLOUDFLARE_ACCOUNT_ID

[cloudflare]
# api_token = "your-api-token"
# zone_id = "your-zone-id"
# account_id = "your-account-id"

[http]
# Seconds
timeout = 30
open_timeout = 10
retry_count = 3
retry_delay = 1

[cookie]
name = "{name}"
# Seconds (default 30 days)
ttl = {ttl}
{domain}
{marketing_origin}
"#,
        name = toml_escape_string(&cookie.name),
        ttl = cookie.ttl.as_secs(),
        domain = domain,
        marketing_origin = marketing_origin,
    )
}

/// Edge worker that proxies to the marketing origin while the routing
/// cookie says so and passes everything else through to the app.
pub fn worker_script(cookie: &CookieSettings) -> Result<String> {
    let cookie_name = serde_json::to_string(&cookie.name)?;
    let marketing_origin = serde_json::to_string(cookie.marketing_origin.as_deref().unwrap_or(""))?;

    Ok(format!(
        r#"// Routes visitors between the marketing site and the application
// based on the `{raw_name}` cookie.

const COOKIE_NAME = {cookie_name};
const MARKETING_VALUE = "marketing";
const DEFAULT_MARKETING_ORIGIN = {marketing_origin};

function readCookie(request, name) {{
  const header = request.headers.get("Cookie") || "";
  for (const pair of header.split(";")) {{
    const [key, ...rest] = pair.trim().split("=");
    if (key === name) {{
      return rest.join("=");
    }}
  }}
  return null;
}}

export default {{
  async fetch(request, env) {{
    if (readCookie(request, COOKIE_NAME) !== MARKETING_VALUE) {{
      return fetch(request);
    }}

    const origin = env.MARKETING_ORIGIN || DEFAULT_MARKETING_ORIGIN;
    if (!origin) {{
      return fetch(request);
    }}

    const url = new URL(request.url);
    const target = new URL(url.pathname + url.search, origin);
    return fetch(new Request(target, request));
  }},
}};
"#,
        raw_name = cookie.name.replace('\n', " "),
        cookie_name = cookie_name,
        marketing_origin = marketing_origin,
    ))
}

/// Wrangler deployment settings for the edge worker
pub fn wrangler_toml(worker_name: &str, cookie: &CookieSettings) -> String {
    let marketing_origin = cookie.marketing_origin.as_deref().unwrap_or("");

    format!(
        r#"name = "{name}"
main = "cloudflare/worker.js"
compatibility_date = "2024-01-01"

# account_id = "your-account-id"

# Bind the worker to your zone, or manage routes with `route-kit routes create`
# routes = [
#   {{ pattern = "https://example.com/*", zone_id = "your-zone-id" }}
# ]

[vars]
MARKETING_ORIGIN = "{marketing_origin}"
"#,
        name = toml_escape_string(worker_name),
        marketing_origin = toml_escape_string(marketing_origin),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cookie() -> CookieSettings {
        CookieSettings {
            domain: Some(".example.com".to_string()),
            marketing_origin: Some("https://www.example.com".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_toml_escape_string() {
        assert_eq!(toml_escape_string("plain"), "plain");
        assert_eq!(toml_escape_string(r#"say "hi""#), r#"say \"hi\""#);
        assert_eq!(toml_escape_string("a\\b"), "a\\\\b");
        assert_eq!(toml_escape_string("line\nbreak\ttab"), "line\\nbreak\\ttab");
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("My Shop"), "my-shop");
        assert_eq!(slugify("shop_app.web"), "shop-app-web");
        assert_eq!(slugify("  spaced  out  "), "spaced-out");
        assert_eq!(slugify("Café!"), "caf");
        assert_eq!(slugify("--"), "");
    }

    #[test]
    fn test_config_template_parses() {
        let rendered = config_template(&cookie());
        let config = route_kit_core::parse_config_toml_str(&rendered).unwrap();

        assert_eq!(config.cookie.name, "cf_router_origin");
        assert_eq!(config.cookie.ttl.as_secs(), 30 * 24 * 60 * 60);
        assert_eq!(config.cookie.domain.as_deref(), Some(".example.com"));
        assert_eq!(
            config.cookie.marketing_origin.as_deref(),
            Some("https://www.example.com")
        );
        assert!(config.api_token.is_none());
    }

    #[test]
    fn test_config_template_comments_unset_cookie_fields() {
        let rendered = config_template(&CookieSettings::default());
        assert!(rendered.contains("# domain = "));
        assert!(rendered.contains("# marketing_origin = "));

        let config = route_kit_core::parse_config_toml_str(&rendered).unwrap();
        assert!(config.cookie.domain.is_none());
    }

    #[test]
    fn test_worker_script_embeds_cookie_name() {
        let settings = CookieSettings {
            name: "site\"origin".to_string(),
            ..cookie()
        };
        let script = worker_script(&settings).unwrap();

        assert!(script.contains(r#"const COOKIE_NAME = "site\"origin";"#));
        assert!(script.contains(r#"const DEFAULT_MARKETING_ORIGIN = "https://www.example.com";"#));
        assert!(script.contains("export default {"));
    }

    #[test]
    fn test_wrangler_toml() {
        let rendered = wrangler_toml("my-shop-router", &cookie());
        assert!(rendered.starts_with("name = \"my-shop-router\"\n"));
        assert!(rendered.contains("main = \"cloudflare/worker.js\""));
        assert!(rendered.contains("MARKETING_ORIGIN = \"https://www.example.com\""));
    }
}
