//! Inspect command implementation.
//!
//! Lists the resources a page declares, the way a swap would see them.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::Result;
use owo_colors::Style;

use super::read_page;
use crate::config::PageswapConfig;
use crate::core::Environment;
use crate::dom::Document;
use crate::log;
use crate::logger::paint;
use crate::resource::{ScriptResource, StyleResource, collect_scripts, collect_styles};

/// Execute inspect command
pub fn inspect_page(page: &Path, config: &PageswapConfig) -> Result<()> {
    let env = config.environment()?;
    let doc = read_page(page)?;
    let (scripts, styles) = collect(&doc, &env)?;

    log!("inspect"; "{}: {} scripts, {} stylesheets", page.display(), scripts.len(), styles.len());
    print!("{}", render(&scripts, &styles, &env));
    Ok(())
}

fn collect(doc: &Document, env: &Environment) -> Result<(Vec<ScriptResource>, Vec<StyleResource>)> {
    let scripts = collect_scripts(doc, doc.root(), env.base())?;
    let styles = collect_styles(doc, doc.root(), env.base());
    Ok((scripts, styles))
}

fn render(scripts: &[ScriptResource], styles: &[StyleResource], env: &Environment) -> String {
    let mut out = String::new();

    if !scripts.is_empty() {
        writeln!(out, "{}", paint("scripts", Style::new().bold())).ok();
    }
    for script in scripts {
        let key = match &script.key {
            Some(key) if env.is_same_origin(&script.address) => paint(key, Style::new().green()),
            Some(key) => format!("{} (cross-origin)", paint(key, Style::new().yellow())),
            None => paint("-", Style::new().dimmed()),
        };
        write!(out, "  {}  {}", script.address, key).ok();
        if !script.dependencies.is_empty() {
            let deps: Vec<&str> = script.dependencies.iter().map(|k| k.as_str()).collect();
            write!(out, "  after [{}]", deps.join(", ")).ok();
        }
        if script.is_module() {
            write!(out, "  module").ok();
        } else if script.no_module {
            write!(out, "  nomodule").ok();
        }
        writeln!(out).ok();
    }

    if !styles.is_empty() {
        writeln!(out, "{}", paint("stylesheets", Style::new().bold())).ok();
    }
    for style in styles {
        writeln!(out, "  {}", style.address).ok();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head>
        <link rel="stylesheet" href="/site.css">
      </head><body>
        <script src="/js/menu.js" data-script-key="menu"></script>
        <script src="/js/gallery.js" data-script-key="gallery" data-script-dependencies='["menu"]'></script>
        <script src="https://cdn.net/lib.js" data-script-key="lib"></script>
        <script src="/js/plain.js"></script>
      </body></html>"#;

    fn env() -> Environment {
        Environment::parse("https://example.com", true).unwrap()
    }

    #[test]
    fn test_render_lists_everything() {
        owo_colors::set_override(false);
        let doc = Document::parse(PAGE).unwrap();
        let (scripts, styles) = collect(&doc, &env()).unwrap();
        let out = render(&scripts, &styles, &env());

        assert!(out.contains("https://example.com/js/menu.js  menu\n"));
        assert!(out.contains("https://example.com/js/gallery.js  gallery  after [menu]\n"));
        assert!(out.contains("https://cdn.net/lib.js  lib (cross-origin)\n"));
        assert!(out.contains("https://example.com/js/plain.js  -\n"));
        assert!(out.contains("stylesheets\n  https://example.com/site.css\n"));
    }

    #[test]
    fn test_malformed_dependencies_fail() {
        let doc = Document::parse(
            r#"<body><script src="/a.js" data-script-dependencies="[menu"></script></body>"#,
        )
        .unwrap();
        assert!(collect(&doc, &env()).is_err());
    }
}
