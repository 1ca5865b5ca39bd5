//! Askama template filters for asset management

// Include compile-time generated asset hashes
include!(concat!(env!("OUT_DIR"), "/asset_hashes.rs"));

/// Append a cache-busting hash to static asset URLs.
///
/// Usage in templates:
/// ```html
/// <link rel="stylesheet" href="{{ "/static/css/admin.css"|asset_url }}">
/// ```
#[askama::filter_fn]
pub fn asset_url(path: impl std::fmt::Display, _: &dyn askama::Values) -> askama::Result<String> {
    Ok(versioned(&path.to_string()))
}

fn versioned(path: &str) -> String {
    match path {
        "/static/css/admin.css" => format!("{}?v={}", path, ADMIN_CSS_HASH),
        _ => path.to_string(),
    }
}
