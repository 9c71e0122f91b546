use std::path::{Component, Path, PathBuf};

use log::warn;
use pulldown_cmark::{html, Options, Parser};

use crate::config::AppConfig;

/// Reads a markdown file below the content directory and returns it as HTML.
/// A missing or unreadable file yields an empty string.
pub async fn load_filtered(config: &AppConfig, relative: &str) -> String {
    let Some(path) = resolve(&config.content_path, relative) else {
        warn!("refusing content path outside content dir: {}", relative);
        return String::new();
    };
    match tokio::fs::read_to_string(&path).await {
        Ok(text) => markdown_to_html(&text),
        Err(e) => {
            warn!("content {} unavailable: {}", path.display(), e);
            String::new()
        }
    }
}

fn resolve(base: &str, relative: &str) -> Option<PathBuf> {
    let relative = Path::new(relative);
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return None;
    }
    Some(Path::new(base).join(relative))
}

pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    let parser = Parser::new_ext(markdown, options);
    let mut html_output = String::new();
    html::push_html(&mut html_output, parser);
    html_output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markdown_becomes_html() {
        let out = markdown_to_html("### Lägg till\n\nFyll i **alla** fält.");
        assert!(out.contains("<h3>Lägg till</h3>"));
        assert!(out.contains("<strong>alla</strong>"));
    }

    #[test]
    fn resolve_stays_inside_base() {
        assert_eq!(
            resolve("content", "users/addUserInfo.md"),
            Some(Path::new("content").join("users/addUserInfo.md"))
        );
        assert_eq!(resolve("content", "../Cargo.toml"), None);
        assert_eq!(resolve("content", "/etc/passwd"), None);
    }

    #[actix_web::test]
    async fn shipped_user_info_is_rendered() {
        let mut config = AppConfig::for_tests();
        config.content_path = concat!(env!("CARGO_MANIFEST_DIR"), "/content").to_string();
        let html = load_filtered(&config, "users/addUserInfo.md").await;
        assert!(html.starts_with("<h"));

        let missing = load_filtered(&config, "users/nothing.md").await;
        assert!(missing.is_empty());
    }
}
