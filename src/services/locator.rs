// src/services/locator.rs

//! Build token discovery.
//!
//! The listing page references `/_next/static/<TOKEN>/_buildManifest.js`;
//! the token is needed to address the site's data endpoint.

use regex::Regex;

const BUILD_MANIFEST_PATTERN: &str = r"/_next/static/([^/]+)/_buildManifest\.js";

/// Extract the build token from listing markup.
///
/// Returns the first match, or `None` if the page has no manifest reference.
pub fn extract_build_token(source: &str) -> Option<String> {
    let pattern = Regex::new(BUILD_MANIFEST_PATTERN).ok()?;
    pattern
        .captures(source)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
