//! Navigation Session
//!
//! Carries everything one page keeps between navigations: the scripts and
//! stylesheets on the page, the reconciler, and the token of the newest
//! navigation.
//!
//! # Flow
//!
//! ```text
//! begin(href) ──► token ──► (fetch markup elsewhere) ──► swap(token, markup)
//!                                                          │
//!             stale token? ─► StaleNavigation ◄────────────┤
//!                                                          ▼
//!                    styles ─► scripts ─► old region detached
//! ```
//!
//! Fetching is the caller's business. A response for a superseded
//! navigation is rejected instead of applied.

use std::sync::Arc;

use rustc_hash::FxHashSet;
use url::Url;

use crate::core::{SignalKind, Status};
use crate::dom::{Document, NodeId, Selector};
use crate::lifecycle::{Context, ReadinessSet};
use crate::reconcile::{ReconcileError, Reconciler};
use crate::resource::{ScriptResource, StyleResource, collect_scripts, collect_styles};
use crate::debug;

/// Identifies one navigation. Only the newest one may swap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationToken {
    id: u64,
    href: Arc<str>,
}

impl NavigationToken {
    pub fn href(&self) -> &str {
        &self.href
    }
}

/// Result of a completed swap.
#[derive(Debug, Clone)]
pub struct SwapOutcome {
    pub new_region: NodeId,
    /// Detached by the swap; handlers may still inspect it.
    pub old_region: NodeId,
    pub readiness: ReadinessSet,
}

/// Per-page navigation context.
#[derive(Debug)]
pub struct Session {
    reconciler: Reconciler,
    region: Selector,
    scripts: Vec<ScriptResource>,
    styles: Vec<StyleResource>,
    next_id: u64,
    current: Option<NavigationToken>,
    /// Region replaced by the last swap, released on the next one.
    retired: Option<NodeId>,
}

impl Session {
    /// Snapshot the resources of the page the reconciler owns.
    ///
    /// Scripts present at first load are already running, so they start
    /// out `Loaded`.
    pub fn attach(reconciler: Reconciler, region: Selector) -> Result<Self, ReconcileError> {
        let (scripts, styles) = {
            let doc = reconciler.document().lock();
            let base = reconciler.environment().base();
            let scripts = collect_scripts(&doc, doc.root(), base)?;
            let styles = doc
                .head()
                .map(|head| collect_styles(&doc, head, base))
                .unwrap_or_default();
            (scripts, styles)
        };
        reconciler.mark_loaded(&scripts);

        debug!("session"; "attached: {} scripts, {} stylesheets", scripts.len(), styles.len());
        Ok(Self {
            reconciler,
            region,
            scripts,
            styles,
            next_id: 0,
            current: None,
            retired: None,
        })
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn scripts(&self) -> &[ScriptResource] {
        &self.scripts
    }

    pub fn styles(&self) -> &[StyleResource] {
        &self.styles
    }

    // =========================================================================
    // Navigation tokens
    // =========================================================================

    /// Start a navigation; it supersedes any navigation in flight.
    pub fn begin(&mut self, href: impl AsRef<str>) -> NavigationToken {
        self.next_id += 1;
        let token = NavigationToken {
            id: self.next_id,
            href: Arc::from(href.as_ref()),
        };
        debug!("session"; "navigating to {}", token.href());
        self.current = Some(token.clone());
        token
    }

    pub fn is_current(&self, token: &NavigationToken) -> bool {
        self.current.as_ref() == Some(token)
    }

    // =========================================================================
    // Swap
    // =========================================================================

    /// Replace the page region with the one from `markup`.
    ///
    /// Stylesheets are reconciled against `head`, scripts against `body`.
    /// Returns before new scripts finish loading; await
    /// `SwapOutcome::readiness` for that.
    ///
    /// The rest of the fetched page is released once reconciled. The old
    /// region stays inspectable until the next swap releases it.
    pub fn swap(&mut self, token: &NavigationToken, markup: &str) -> Result<SwapOutcome, ReconcileError> {
        if !self.is_current(token) {
            return Err(ReconcileError::StaleNavigation(token.href().to_string()));
        }
        self.reconciler.runtime()?;

        let doc_handle = Arc::clone(self.reconciler.document());
        let base = self.reconciler.environment().base().clone();

        let (fragment, new_region, old_region, head, body, new_scripts, new_styles) = {
            let mut doc = doc_handle.lock();
            if let Some(retired) = self.retired.take() {
                let released = doc.release(retired);
                debug!("session"; "released {} nodes of the previous region", released);
            }
            let fragment = doc.parse_fragment(markup)?;

            let (new_region, old_region, body, new_scripts) = match self.locate(&doc, fragment, &base) {
                Ok(located) => located,
                Err(err) => {
                    doc.release(fragment);
                    return Err(err);
                }
            };
            let new_styles = collect_styles(&doc, fragment, &base);

            // The reconciler owns external script elements
            for script in &new_scripts {
                if doc.contains(new_region, script.node) {
                    doc.detach(script.node);
                }
            }

            apply_page_chrome(&mut doc, fragment);
            if let Some(parent) = doc.parent(old_region) {
                doc.insert_before(parent, new_region, Some(old_region));
            }
            (fragment, new_region, old_region, doc.head(), body, new_scripts, new_styles)
        };

        if let Some(head) = head {
            self.styles = self.reconciler.reconcile_styles(&self.styles, &new_styles, head);
        }

        let outcome = self.reconciler.reconcile_scripts(
            &self.scripts,
            &new_scripts,
            body,
            Context::region(new_region),
            Context::region(old_region),
        )?;
        self.scripts = outcome.on_page;

        {
            let mut doc = doc_handle.lock();
            doc.detach(old_region);
            doc.release(fragment);
        }
        self.retired = Some(old_region);
        debug!("session"; "swapped to {}", token.href());

        Ok(SwapOutcome {
            new_region,
            old_region,
            readiness: outcome.readiness,
        })
    }

    /// Find both regions and `body`, and collect the fetched scripts.
    fn locate(
        &self,
        doc: &Document,
        fragment: NodeId,
        base: &Url,
    ) -> Result<(NodeId, NodeId, NodeId, Vec<ScriptResource>), ReconcileError> {
        let missing = || ReconcileError::MissingRegion(self.region.to_string());
        let new_region = self.region.find_first(doc, fragment).ok_or_else(missing)?;
        let old_region = self.region.find_first(doc, doc.root()).ok_or_else(missing)?;
        let body = doc
            .body()
            .ok_or_else(|| ReconcileError::MissingRegion("body".to_string()))?;
        let scripts = collect_scripts(doc, fragment, base)?;
        Ok((new_region, old_region, body, scripts))
    }

    /// Send `load(context)` once per key of every active, eligible script.
    ///
    /// Returns how many keys were notified.
    pub fn load_active_scripts(&self, context: Context) -> usize {
        let mut keys = Vec::new();
        let mut seen = FxHashSet::default();
        for script in &self.scripts {
            if self.reconciler.status(script.node) != Status::Loaded {
                continue;
            }
            if let Some(key) = self.reconciler.eligible_key(script)
                && seen.insert(key)
            {
                keys.push(key.clone());
            }
        }

        for key in &keys {
            self.reconciler.bus().publish(SignalKind::Load, key, context);
        }
        keys.len()
    }
}

/// Carry over the new page's `<title>` and body class.
fn apply_page_chrome(doc: &mut Document, fragment: NodeId) {
    if let Some(new_title) = doc.elements_by_tag(fragment, "title").into_iter().next() {
        let text = doc.text_content(new_title);
        match doc.elements_by_tag(doc.root(), "title").into_iter().next() {
            Some(title) => doc.set_text_content(title, text),
            None => {
                if let Some(head) = doc.head() {
                    let title = doc.create_element("title");
                    doc.set_text_content(title, text);
                    doc.append_child(head, title);
                }
            }
        }
    }

    let class = doc
        .elements_by_tag(fragment, "body")
        .into_iter()
        .next()
        .and_then(|body| doc.attr(body, "class").map(str::to_string));
    if let Some(body) = doc.body() {
        match class {
            Some(class) => doc.set_attr(body, "class", class),
            None => doc.remove_attr(body, "class"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
