use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::Path;

/// Short content hash used as a cache-busting query string.
fn hash_file(path: &Path) -> String {
    let content = fs::read(path).unwrap_or_default();
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    format!("{:016x}", hasher.finish())[..8].to_string()
}

fn main() {
    println!("cargo:rerun-if-changed=static/css/admin.css");
    println!("cargo:rerun-if-changed=templates/");

    let css_hash = hash_file(Path::new("static/css/admin.css"));

    let out_dir = std::env::var("OUT_DIR").expect("OUT_DIR is set by cargo");
    fs::write(
        Path::new(&out_dir).join("asset_hashes.rs"),
        format!(
            r#"/// Hash of admin.css for cache busting
pub const ADMIN_CSS_HASH: &str = "{}";"#,
            css_hash
        ),
    )
    .expect("failed to write asset_hashes.rs");
}
