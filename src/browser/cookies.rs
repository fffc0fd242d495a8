//! Cookie file normalization
//!
//! Cookie exports come from browser extensions, DevTools copies and our own
//! `export_cookies`. They disagree on shape and on field names, so everything
//! is funneled through [`normalize_cookies`] before it reaches the browser.

use chromiumoxide::cdp::browser_protocol::network::{
    Cookie, CookieParam, CookieSameSite, TimeSinceEpoch,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors reading, writing or converting cookies
#[derive(Debug, Error)]
pub enum CookieError {
    #[error("Cannot read cookie file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot write cookie file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cookie file {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid cookie {name}: {reason}")]
    Invalid { name: String, reason: String },
}

/// A cookie in the one shape the session installs and exports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<i64>,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
    pub same_site: String,
}

/// Normalizes any supported cookie export into canonical cookies
///
/// Accepted shapes are a list of cookie objects, an object with a `cookies`
/// list, or a single cookie object. Entries missing `name`, `value` or
/// `domain` are dropped with a warning.
pub fn normalize_cookies(data: Value) -> Vec<CanonicalCookie> {
    let entries = match data {
        Value::Array(items) => items,
        Value::Object(mut map) if map.contains_key("cookies") => {
            match map.remove("cookies") {
                Some(Value::Array(items)) => items,
                Some(other) => vec![other],
                None => Vec::new(),
            }
        }
        other => vec![other],
    };

    entries
        .iter()
        .filter_map(|entry| {
            let cookie = normalize_cookie(entry);
            if cookie.is_none() {
                tracing::warn!("Skipping cookie without name/value/domain: {}", entry);
            }
            cookie
        })
        .collect()
}

fn normalize_cookie(entry: &Value) -> Option<CanonicalCookie> {
    let text = |key: &str| entry.get(key).and_then(Value::as_str).map(str::to_string);

    let name = text("name")?;
    let value = text("value")?;
    let domain = text("domain")?;
    let path = text("path").filter(|p| !p.is_empty()).unwrap_or_else(|| "/".to_string());

    // Extension exports use `expirationDate`, our own exports use `expires`
    let expires = ["expirationDate", "expires"]
        .iter()
        .filter_map(|key| entry.get(*key).and_then(Value::as_f64))
        .find(|secs| *secs > 0.0)
        .map(|secs| secs as i64);

    let flag = |key: &str| entry.get(key).and_then(Value::as_bool).unwrap_or(false);

    Some(CanonicalCookie {
        name,
        value,
        domain,
        path,
        expires,
        http_only: flag("httpOnly"),
        secure: flag("secure"),
        same_site: normalize_same_site(entry.get("sameSite")).to_string(),
    })
}

/// Maps the many spellings of a same-site policy onto Strict, Lax or None
pub fn normalize_same_site(value: Option<&Value>) -> &'static str {
    let raw = match value.and_then(Value::as_str) {
        Some(raw) => raw.trim().to_ascii_lowercase(),
        None => return "None",
    };

    match raw.as_str() {
        "strict" => "Strict",
        "lax" => "Lax",
        _ => "None",
    }
}

/// Reads and normalizes a cookie file
pub fn read_cookie_file(path: &Path) -> Result<Vec<CanonicalCookie>, CookieError> {
    let content = std::fs::read_to_string(path).map_err(|source| CookieError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let data: Value = serde_json::from_str(&content).map_err(|source| CookieError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(normalize_cookies(data))
}

/// Writes cookies in the list shape [`read_cookie_file`] accepts
pub fn write_cookie_file(path: &Path, cookies: &[CanonicalCookie]) -> Result<(), CookieError> {
    let json = serde_json::to_string_pretty(cookies).map_err(|source| CookieError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    let write_error = |source| CookieError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_error)?;
    }
    std::fs::write(path, json).map_err(write_error)
}

impl CanonicalCookie {
    /// Converts to the CDP parameter used by `Network.setCookies`
    pub fn to_param(&self) -> Result<CookieParam, CookieError> {
        let same_site = match self.same_site.as_str() {
            "Strict" => CookieSameSite::Strict,
            "Lax" => CookieSameSite::Lax,
            _ => CookieSameSite::None,
        };

        let mut builder = CookieParam::builder()
            .name(self.name.clone())
            .value(self.value.clone())
            .domain(self.domain.clone())
            .path(self.path.clone())
            .http_only(self.http_only)
            .secure(self.secure)
            .same_site(same_site);

        if let Some(expires) = self.expires {
            builder = builder.expires(TimeSinceEpoch::new(expires as f64));
        }

        builder.build().map_err(|reason| CookieError::Invalid {
            name: self.name.clone(),
            reason,
        })
    }

    /// Converts a cookie read back from the browser
    pub fn from_cdp(cookie: &Cookie) -> Self {
        let same_site = match &cookie.same_site {
            Some(CookieSameSite::Strict) => "Strict",
            Some(CookieSameSite::Lax) => "Lax",
            _ => "None",
        };

        Self {
            name: cookie.name.clone(),
            value: cookie.value.clone(),
            domain: cookie.domain.clone(),
            path: cookie.path.clone(),
            expires: (!cookie.session && cookie.expires > 0.0).then(|| cookie.expires as i64),
            http_only: cookie.http_only,
            secure: cookie.secure,
            same_site: same_site.to_string(),
        }
    }
}
