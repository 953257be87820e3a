//! Script reconciliation.
//!
//! Two phases per pass, in this order:
//!
//! 1. **Removal** - old scripts missing from the new page are unloaded and
//!    detached; `destroy` fires once per eligible key.
//! 2. **Addition** - retained scripts rebind (`unload` old region, `load` new
//!    region) or activate (`init`); new scripts are synthesized and inserted,
//!    immediately or once their dependencies are ready.
//!
//! Inline scripts in the new region are rebuilt afterwards. Network steps
//! run as tasks, so a pass returns before any new script has loaded.

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashSet;

use super::{JoinPolicy, ReconcileError, Reconciler, ScriptOutcome, ScriptState, join};
use crate::core::{Address, Key, SignalKind, Status};
use crate::dom::{Document, NodeId, SharedDocument};
use crate::lifecycle::{Context, LifecycleBus, LoadError, Readiness, ReadinessRegistry, Settle};
use crate::loader::ResourceLoader;
use crate::resource::{DEPENDENCIES_ATTR, IdentityMap, KEY_ATTR, ScriptResource};
use crate::{debug, log};

/// A signal decided under the locks, published after they are released.
#[derive(Debug)]
struct Planned {
    kind: SignalKind,
    key: Key,
    context: Context,
}

/// A synthesized script waiting for insertion and/or its network step.
#[derive(Debug)]
struct Injection {
    node: NodeId,
    address: Address,
    /// Key to activate once the script has run.
    lifecycle_key: Option<Key>,
    own_key: Option<Key>,
    dependencies: Vec<Key>,
    settle: Settle,
}

impl Injection {
    fn is_deferred(&self) -> bool {
        !self.dependencies.is_empty()
    }
}

/// Mutable bookkeeping of one pass.
#[derive(Debug, Default)]
struct Pass {
    signals: Vec<Planned>,
    registry: ReadinessRegistry,
    retained: FxHashSet<NodeId>,
    synthesized: Vec<ScriptResource>,
    injections: Vec<Injection>,
}

impl Pass {
    fn plan(&mut self, kind: SignalKind, key: &Key, context: Context) {
        self.signals.push(Planned {
            kind,
            key: key.clone(),
            context,
        });
    }
}

impl Reconciler {
    /// Reconcile the page's scripts against a new page's scripts.
    ///
    /// `parent` receives synthesized scripts. `new_region` and `old_region`
    /// are the contexts handed to `load` and `unload` of retained keys.
    ///
    /// Must be called inside a tokio runtime.
    pub fn reconcile_scripts(
        &self,
        old: &[ScriptResource],
        new: &[ScriptResource],
        parent: NodeId,
        new_region: Context,
        old_region: Context,
    ) -> Result<ScriptOutcome, ReconcileError> {
        let runtime = self.runtime()?;
        let old_map = IdentityMap::new(old);
        let new_map = IdentityMap::new(new);
        let mut pass = Pass::default();

        {
            let mut doc = self.doc.lock();
            let mut state = self.state.lock();
            self.remove_old(&mut doc, &mut state, old, &new_map, &mut pass);
            self.add_new(
                &mut doc,
                &mut state,
                &old_map,
                new,
                parent,
                (new_region, old_region),
                &mut pass,
            );

            let inline_root = match new_region {
                Context::Region(node) => node,
                Context::Document => doc.root(),
            };
            let rebuilt = super::rebuild_inline_scripts(&mut doc, inline_root);
            if rebuilt > 0 {
                debug!("scripts"; "rebuilt {} inline scripts", rebuilt);
            }
        }

        for planned in &pass.signals {
            self.bus.publish(planned.kind, &planned.key, planned.context);
        }

        let injector = Injector {
            doc: Arc::clone(&self.doc),
            bus: Arc::clone(&self.bus),
            state: Arc::clone(&self.state),
            loader: Arc::clone(&self.loader),
            policy: self.policy,
            parent,
        };
        for job in pass.injections.drain(..) {
            let deps = job
                .dependencies
                .iter()
                .filter(|&key| {
                    let own = job.own_key.as_ref() == Some(key);
                    if own {
                        debug!("scripts"; "{} depends on its own key `{}`, ignoring", job.address, key);
                    }
                    !own
                })
                .map(|key| (key.clone(), pass.registry.get(key)))
                .collect();
            runtime.spawn(injector.clone().run(job, deps));
        }

        let mut on_page: Vec<ScriptResource> = old
            .iter()
            .filter(|s| pass.retained.contains(&s.node))
            .cloned()
            .collect();
        on_page.append(&mut pass.synthesized);

        Ok(ScriptOutcome {
            on_page,
            readiness: pass.registry.into_set(),
        })
    }

    // =========================================================================
    // Removal phase
    // =========================================================================

    fn remove_old(
        &self,
        doc: &mut Document,
        state: &mut ScriptState,
        old: &[ScriptResource],
        new: &IdentityMap<'_, ScriptResource>,
        pass: &mut Pass,
    ) {
        let mut destroyed = FxHashSet::default();
        for script in old {
            if new.contains(&script.address) {
                continue;
            }
            // Unloaded by an earlier pass
            if state.status.get(script.node) != Some(&Status::Loaded) {
                continue;
            }

            state.status.remove(script.node);
            state.inflight.remove(script.node);
            doc.detach(script.node);
            debug!("scripts"; "removed {}", script.address);

            if let Some(key) = self.eligible_key(script)
                && destroyed.insert(key.clone())
            {
                state.active.remove(key);
                pass.plan(SignalKind::Destroy, key, Context::Document);
            }
        }
    }

    // =========================================================================
    // Addition phase
    // =========================================================================

    #[allow(clippy::too_many_arguments)]
    fn add_new(
        &self,
        doc: &mut Document,
        state: &mut ScriptState,
        old: &IdentityMap<'_, ScriptResource>,
        new: &[ScriptResource],
        parent: NodeId,
        (new_region, old_region): (Context, Context),
        pass: &mut Pass,
    ) {
        let mut seen = FxHashSet::default();
        let mut triggered = FxHashSet::default();

        for script in new {
            if !seen.insert(&script.address) {
                debug!("scripts"; "{} is listed twice, keeping the first", script.address);
                continue;
            }

            // Never inserted (abandoned by a failed dependency): start over
            let retained = old
                .get(&script.address)
                .filter(|r| is_on_page(doc, state, r.node));

            match retained {
                Some(retained) => {
                    // A load from an overlapping pass may still be running
                    let readiness = state
                        .inflight
                        .get(retained.node)
                        .filter(|r| !r.is_settled())
                        .cloned()
                        .unwrap_or_else(|| Readiness::satisfied(retained.address.as_str()));
                    pass.registry.record(script.key.as_ref(), readiness);

                    if let Some(key) = self.eligible_key(script)
                        && triggered.insert(key.clone())
                    {
                        let was_loaded = state.status.get(retained.node) == Some(&Status::Loaded);
                        if !was_loaded {
                            if state.activate(key) {
                                pass.plan(SignalKind::Init, key, Context::Document);
                            }
                        } else if new_region != old_region {
                            pass.plan(SignalKind::Unload, key, old_region);
                            pass.plan(SignalKind::Load, key, new_region);
                        }
                    }

                    state.status.insert(retained.node, Status::Loaded);
                    pass.retained.insert(retained.node);
                }
                None => {
                    if self.is_opted_out(script) {
                        debug!("scripts"; "skipping {} (opted out by environment)", script.address);
                        continue;
                    }

                    let node = synthesize(doc, script);
                    let (settle, readiness) = Readiness::pending(script.address.as_str());
                    pass.registry.record(script.key.as_ref(), readiness.clone());
                    state.inflight.insert(node, readiness);
                    state.status.insert(node, Status::Loaded);

                    if script.dependencies.is_empty() {
                        doc.append_child(parent, node);
                        debug!("scripts"; "inserted {}", script.address);
                    } else {
                        let deps: Vec<&str> = script.dependencies.iter().map(Key::as_str).collect();
                        debug!("scripts"; "deferring {} until [{}] are ready", script.address, deps.join(", "));
                    }

                    pass.injections.push(Injection {
                        node,
                        address: script.address.clone(),
                        lifecycle_key: self.eligible_key(script).cloned(),
                        own_key: script.key.clone(),
                        dependencies: script.dependencies.clone(),
                        settle,
                    });
                    pass.synthesized.push(ScriptResource {
                        node,
                        ..script.clone()
                    });
                }
            }
        }
    }
}

/// Attached, or synthesized and still waiting on its dependencies.
fn is_on_page(doc: &Document, state: &ScriptState, node: NodeId) -> bool {
    doc.is_attached(node) || state.status.get(node) == Some(&Status::Loaded)
}

/// Build a fresh, detached `script` element for a new resource.
fn synthesize(doc: &mut Document, script: &ScriptResource) -> NodeId {
    let node = doc.create_element("script");
    doc.set_attr(node, "src", script.address.as_str());
    if let Some(script_type) = &script.script_type {
        doc.set_attr(node, "type", script_type.as_ref());
    }
    if script.no_module {
        doc.set_attr(node, "nomodule", "");
    }
    if let Some(cross_origin) = &script.cross_origin {
        doc.set_attr(node, "crossorigin", cross_origin.as_ref());
    }
    if let Some(key) = &script.key {
        doc.set_attr(node, KEY_ATTR, key.as_str());
    }
    if !script.dependencies.is_empty()
        && let Ok(json) = serde_json::to_string(&script.dependencies)
    {
        doc.set_attr(node, DEPENDENCIES_ATTR, json);
    }
    node
}

// =============================================================================
// Injection
// =============================================================================

/// Everything a spawned injection task needs.
#[derive(Clone)]
struct Injector {
    doc: SharedDocument,
    bus: Arc<LifecycleBus>,
    state: Arc<Mutex<ScriptState>>,
    loader: Arc<dyn ResourceLoader>,
    policy: JoinPolicy,
    parent: NodeId,
}

impl Injector {
    async fn run(self, job: Injection, deps: Vec<(Key, Readiness)>) {
        if job.is_deferred() {
            let waits = deps.into_iter().map(|(key, readiness)| async move {
                readiness
                    .wait()
                    .await
                    .map_err(|err| LoadError::dependency(&key, err))
            });

            if let Err(err) = join(waits, self.policy).await {
                match self.policy {
                    JoinPolicy::FailFast => {
                        log!("scripts"; "not inserting {}: {}", job.address, err);
                        self.abandon(job, err);
                        return;
                    }
                    JoinPolicy::BestEffort => {
                        log!("warning"; "inserting {} despite: {}", job.address, err);
                    }
                }
            }

            if !self.insert(job.node) {
                debug!("scripts"; "{} left the page before its dependencies were ready", job.address);
                let err = LoadError::Abandoned(Arc::from(job.address.as_str()));
                self.finish(job, Err(err));
                return;
            }
            debug!("scripts"; "inserted {}", job.address);
        }

        let result = self.loader.load(&job.address).await;
        // A loaded script registers its feature
        if result.is_ok()
            && let Some(key) = &job.lifecycle_key
            && self.activate(job.node, key)
        {
            self.bus.publish(SignalKind::Init, key, Context::Document);
        }
        self.finish(job, result);
    }

    /// Claim the `init` for `key` if the script is still on the page and no
    /// other script with that key has initialized it.
    fn activate(&self, node: NodeId, key: &Key) -> bool {
        let mut state = self.state.lock();
        state.status.get(node) == Some(&Status::Loaded) && state.activate(key)
    }

    /// Insert a deferred script unless a later pass removed it meanwhile.
    fn insert(&self, node: NodeId) -> bool {
        let mut doc = self.doc.lock();
        let state = self.state.lock();
        if state.status.get(node) != Some(&Status::Loaded) {
            return false;
        }
        doc.append_child(self.parent, node);
        true
    }

    /// A dependent that is never inserted is not on the page.
    fn abandon(&self, job: Injection, err: LoadError) {
        {
            let mut state = self.state.lock();
            state.inflight.remove(job.node);
            if state.status.get(job.node).is_some() {
                state.status.insert(job.node, Status::Unloaded);
            }
        }
        job.settle.fail(err);
    }

    fn finish(&self, job: Injection, result: Result<(), LoadError>) {
        self.state.lock().inflight.remove(job.node);
        match result {
            Ok(()) => {
                debug!("scripts"; "loaded {}", job.address);
                job.settle.ready();
            }
            Err(err) => {
                log!("error"; "{}", err);
                job.settle.fail(err);
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
