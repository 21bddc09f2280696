// Routing-cookie helper for host applications. The edge worker sends a
// visitor to the marketing origin while the routing cookie holds `marketing`,
// and to the application otherwise.

use crate::config::CookieSettings;
use crate::error::{Error, Result};
use url::Url;

/// Cookie value that routes a visitor to the marketing origin
pub const MARKETING_VALUE: &str = "marketing";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Marketing,
    App,
}

impl Origin {
    /// Which origin a request's `Cookie` header currently points at
    pub fn from_cookie_header(settings: &CookieSettings, header: &str) -> Self {
        let routed_to_marketing = header
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .any(|(name, value)| name == settings.name && value == MARKETING_VALUE);

        if routed_to_marketing {
            Origin::Marketing
        } else {
            Origin::App
        }
    }
}

/// Response pieces for switching a visitor's origin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    /// Where to send the visitor
    pub location: String,
    /// Value for the `Set-Cookie` response header
    pub set_cookie: String,
}

/// Build the cookie and redirect that move a visitor to `origin`.
///
/// Switching to [`Origin::Marketing`] sets the routing cookie for the
/// configured TTL and redirects to the root of the marketing origin.
/// Switching to [`Origin::App`] clears the cookie and redirects to `/`.
///
/// # Errors
///
/// [`Error::Configuration`] when switching to marketing without a valid
/// `marketing_origin`.
pub fn redirect_to(settings: &CookieSettings, origin: Origin, secure: bool) -> Result<Redirect> {
    match origin {
        Origin::Marketing => {
            let location = marketing_root(settings)?;
            let mut cookie = format!(
                "{}={}; Path=/; Max-Age={}",
                settings.name,
                MARKETING_VALUE,
                settings.ttl.as_secs()
            );
            push_attributes(&mut cookie, settings, secure);
            Ok(Redirect {
                location,
                set_cookie: cookie,
            })
        }
        Origin::App => {
            let mut cookie = format!("{}=; Path=/; Max-Age=0", settings.name);
            push_attributes(&mut cookie, settings, secure);
            Ok(Redirect {
                location: "/".to_string(),
                set_cookie: cookie,
            })
        }
    }
}

fn push_attributes(cookie: &mut String, settings: &CookieSettings, secure: bool) {
    if let Some(domain) = settings.domain.as_deref().filter(|d| !d.is_empty()) {
        cookie.push_str("; Domain=");
        cookie.push_str(domain);
    }
    if secure {
        cookie.push_str("; Secure");
    }
    cookie.push_str("; HttpOnly");
}

fn marketing_root(settings: &CookieSettings) -> Result<String> {
    let origin = settings
        .marketing_origin
        .as_deref()
        .filter(|o| !o.is_empty())
        .ok_or_else(|| Error::Configuration("marketing_origin must be configured".to_string()))?;

    let url = Url::parse(origin).map_err(|e| {
        Error::Configuration(format!("marketing_origin '{}' is not a valid URL: {}", origin, e))
    })?;

    if url.host_str().is_none() {
        return Err(Error::Configuration(format!(
            "marketing_origin '{}' has no host",
            origin
        )));
    }

    let root = url
        .join("/")
        .map_err(|e| Error::Configuration(format!("marketing_origin '{}': {}", origin, e)))?;
    Ok(root.to_string())
}
