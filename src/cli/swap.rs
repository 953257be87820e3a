//! Swap command implementation.
//!
//! Loads the old page, swaps in the new one through a [`Session`], waits for
//! every readiness signal and reports what happened on the lifecycle bus.

use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use owo_colors::Style;
use parking_lot::Mutex;
use serde::Serialize;

use super::{read_markup, read_page};
use crate::config::PageswapConfig;
use crate::core::{Key, SignalKind, Status};
use crate::dom::SharedDocument;
use crate::lifecycle::{LifecycleBus, Signal};
use crate::logger::{failure, paint, success};
use crate::reconcile::{Reconciler, join};
use crate::session::Session;

/// One signal as seen by the tracing observer.
#[derive(Debug, Serialize)]
pub struct SignalRecord {
    pub kind: SignalKind,
    pub key: Key,
    pub context: String,
}

impl From<&Signal> for SignalRecord {
    fn from(signal: &Signal) -> Self {
        Self {
            kind: signal.kind,
            key: signal.key.clone(),
            context: signal.context.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ScriptRecord {
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<Key>,
    pub loaded: bool,
}

/// Everything a swap did, in publish order.
#[derive(Debug, Serialize)]
pub struct SwapReport {
    pub signals: Vec<SignalRecord>,
    pub scripts: Vec<ScriptRecord>,
    pub styles: Vec<String>,
    /// First load failure, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SwapReport {
    fn render(&self) -> String {
        let mut out = String::new();

        writeln!(out, "{}", paint("signals", Style::new().bold())).ok();
        if self.signals.is_empty() {
            writeln!(out, "  {}", paint("(none)", Style::new().dimmed())).ok();
        }
        for signal in &self.signals {
            writeln!(out, "  {:<8} {}  {}", signal.kind, signal.key, paint(&signal.context, Style::new().dimmed())).ok();
        }

        writeln!(out, "{}", paint("scripts", Style::new().bold())).ok();
        for script in &self.scripts {
            let state = if script.loaded {
                paint("loaded", Style::new().green())
            } else {
                paint("unloaded", Style::new().red())
            };
            match &script.key {
                Some(key) => writeln!(out, "  {}  {}  {}", script.address, key, state).ok(),
                None => writeln!(out, "  {}  {}", script.address, state).ok(),
            };
        }

        writeln!(out, "{}", paint("stylesheets", Style::new().bold())).ok();
        for style in &self.styles {
            writeln!(out, "  {style}").ok();
        }
        out
    }
}

/// Execute swap command
pub fn swap_pages(old: &Path, new: &Path, json: bool, config: &PageswapConfig) -> Result<()> {
    let doc = read_page(old)?.into_shared();
    let markup = read_markup(new)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let href = new.display().to_string();
    let report = runtime.block_on(run_swap(doc, &markup, &href, config))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print!("{}", report.render());
    match &report.error {
        None => success(&format!("swapped to {href} ({} signals)", report.signals.len())),
        Some(err) => failure(&format!("swapped to {href} with load failures"), err),
    }
    Ok(())
}

/// Run one traced swap of `doc` to `markup` and wait for it to settle.
async fn run_swap(
    doc: SharedDocument,
    markup: &str,
    href: &str,
    config: &PageswapConfig,
) -> Result<SwapReport> {
    let bus = Arc::new(LifecycleBus::new());
    let trace = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&trace);
    bus.observe(move |signal| sink.lock().push(SignalRecord::from(signal)));

    let reconciler = Reconciler::new(doc, bus, config.environment()?)
        .with_loader(config.resource_loader())
        .with_policy(config.scripts.join);
    let mut session = Session::attach(reconciler, config.region_selector()?)?;

    let token = session.begin(href);
    let outcome = session.swap(&token, markup)?;

    let waits = outcome
        .readiness
        .signals()
        .iter()
        .cloned()
        .map(|r| async move { r.wait().await });
    let settled = join(waits, session.reconciler().policy()).await;

    let reconciler = session.reconciler();
    let scripts = session
        .scripts()
        .iter()
        .map(|s| ScriptRecord {
            address: s.address.to_string(),
            key: s.key.clone(),
            loaded: reconciler.status(s.node) == Status::Loaded,
        })
        .collect();
    let styles = session.styles().iter().map(|s| s.address.to_string()).collect();
    let signals = std::mem::take(&mut *trace.lock());

    Ok(SwapReport {
        signals,
        scripts,
        styles,
        error: settled.err().map(|e| e.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::config::test_parse_config;
    use crate::dom::Document;

    const OLD: &str = r#"<html><head><title>Old</title></head><body>
        <main><p>old</p></main>
        <script src="/js/menu.js" data-script-key="menu"></script>
        <script src="/js/old.js" data-script-key="old"></script>
      </body></html>"#;

    const NEW: &str = r#"<html><head><title>New</title><link rel="stylesheet" href="/new.css"></head><body>
        <main><p>new</p></main>
        <script src="/js/menu.js" data-script-key="menu"></script>
        <script src="/js/gallery.js" data-script-key="gallery" data-script-dependencies='["menu"]'></script>
      </body></html>"#;

    fn kinds(report: &SwapReport) -> Vec<String> {
        report
            .signals
            .iter()
            .map(|s| format!("{} {}", s.kind, s.key))
            .collect()
    }

    #[tokio::test]
    async fn test_run_swap_traces_signals() {
        let config = test_parse_config("[page]\norigin = \"https://example.com\"");
        let doc = Document::parse(OLD).unwrap().into_shared();
        let report = run_swap(doc, NEW, "/new", &config).await.unwrap();

        assert_eq!(kinds(&report), vec!["destroy old", "unload menu", "load menu", "init gallery"]);
        assert!(report.error.is_none());
        assert_eq!(report.styles, vec!["https://example.com/new.css"]);
        assert!(report.scripts.iter().all(|s| s.loaded));
    }

    #[tokio::test]
    async fn test_missing_file_fails_dependents() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("js")).unwrap();
        fs::write(dir.path().join("js/gallery.js"), "").unwrap();

        let mut config = test_parse_config("[page]\norigin = \"https://example.com\"");
        config.loader.root = Some(dir.path().to_path_buf());

        // lib.js is missing on disk
        let new = r#"<html><body><main></main>
            <script src="/js/lib.js" data-script-key="lib"></script>
            <script src="/js/gallery.js" data-script-key="gallery" data-script-dependencies='["lib"]'></script>
          </body></html>"#;
        let doc = Document::parse(OLD).unwrap().into_shared();
        let report = run_swap(doc, new, "/new", &config).await.unwrap();

        let err = report.error.clone().unwrap();
        assert!(err.contains("lib.js"), "{err}");
        let signals = kinds(&report);
        assert!(!signals.contains(&"init gallery".to_string()));
        assert!(!signals.contains(&"init lib".to_string()));
        let gallery = report.scripts.iter().find(|s| s.address.ends_with("gallery.js")).unwrap();
        assert!(!gallery.loaded);
    }

    #[test]
    fn test_render_honors_color_override() {
        owo_colors::set_override(false);
        let report = SwapReport {
            signals: Vec::new(),
            scripts: vec![ScriptRecord {
                address: "https://example.com/a.js".to_string(),
                key: Some(Key::from("a")),
                loaded: false,
            }],
            styles: Vec::new(),
            error: None,
        };
        assert_eq!(
            report.render(),
            "signals\n  (none)\nscripts\n  https://example.com/a.js  a  unloaded\nstylesheets\n"
        );
    }

    #[test]
    fn test_report_json_shape() {
        let report = SwapReport {
            signals: vec![SignalRecord {
                kind: SignalKind::Load,
                key: Key::from("menu"),
                context: "document".to_string(),
            }],
            scripts: vec![ScriptRecord {
                address: "https://example.com/a.js".to_string(),
                key: None,
                loaded: true,
            }],
            styles: Vec::new(),
            error: None,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["signals"][0]["kind"], "load");
        assert_eq!(json["signals"][0]["key"], "menu");
        assert!(json["scripts"][0].get("key").is_none());
        assert!(json.get("error").is_none());
    }
}
