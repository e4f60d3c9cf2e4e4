//! Prefetch scheduling engine
//!
//! The [`Scheduler`] owns a [`Registry`] of resources, dispatches them to a
//! [`HintIssuer`] under a concurrency cap and lets attention signals boost and
//! restore priorities.
//!
//! # Dispatch
//!
//! Dispatch runs after every admission, priority change and hint completion:
//!
//! 1. While fewer than `max_concurrency` slots are reserved, reserve one and
//!    claim the first `queued` resource in scheduling order.
//! 2. Nothing to claim: release the slot and stop. Nothing polls; the next
//!    admission or priority change re-enters the loop.
//! 3. A claimed resource moves to `loading` (or straight to `skipped` when its
//!    method is disabled) before the registry lock is released, so no two
//!    slots can claim the same resource.
//! 4. The slot awaits the issuer, records `done`/`skipped`, and keeps draining
//!    the queue until nothing is left.
//!
//! A failed hint only marks its own resource `skipped`. Completions that land
//! on a resource already aborted are ignored.

mod events;
mod policy;
mod registry;
mod resource;

pub use events::{Callback, EventKind, Notifier, SubscriptionId};
pub use policy::{MethodToggles, SchedulerPolicy};
pub use registry::Registry;
pub use resource::{Method, ParseEnumError, Priority, Resource, ResourceSnapshot, State};

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::issuer::{Hint, HintError, HintIssuer};
use crate::observability::Metrics;

/// Result of [`Scheduler::admit_or_get`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    /// Snapshot taken at admission time.
    pub resource: ResourceSnapshot,
    /// `false` when the address was already registered.
    pub inserted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortOutcome {
    Aborted,
    AlreadyFinished,
    Unknown,
}

/// Cheap, cloneable handle to one scheduler instance.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

struct Inner {
    id: Uuid,
    policy: SchedulerPolicy,
    issuer: Arc<dyn HintIssuer>,
    core: Mutex<Core>,
    notifier: Notifier,
    idle: Notify,
    metrics: Arc<Metrics>,
}

/// State mutated only under the `core` lock.
#[derive(Default)]
struct Core {
    registry: Registry,
    active: usize,
}

/// A resource a slot has committed to issue.
#[derive(Debug, Clone)]
struct Claim {
    address: String,
    method: Method,
}

impl Scheduler {
    pub fn new(policy: SchedulerPolicy, issuer: Arc<dyn HintIssuer>) -> Self {
        let id = Uuid::new_v4();
        info!(
            scheduler = %id,
            max_concurrency = policy.max_concurrency,
            "Scheduler created"
        );

        Self {
            inner: Arc::new(Inner {
                id,
                policy,
                issuer,
                core: Mutex::new(Core::default()),
                notifier: Notifier::new(),
                idle: Notify::new(),
                metrics: Arc::new(Metrics::new()),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn policy(&self) -> &SchedulerPolicy {
        &self.inner.policy
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.inner.metrics)
    }

    pub fn on_resource_queued<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&ResourceSnapshot) + Send + Sync + 'static,
    {
        self.inner.notifier.subscribe(EventKind::Queued, callback)
    }

    pub fn on_resource_updated<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&ResourceSnapshot) + Send + Sync + 'static,
    {
        self.inner.notifier.subscribe(EventKind::Updated, callback)
    }

    pub fn on_resource_removed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&ResourceSnapshot) + Send + Sync + 'static,
    {
        self.inner.notifier.subscribe(EventKind::Removed, callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.notifier.unsubscribe(id)
    }

    /// Registers `address` once; later calls return the existing entry untouched.
    ///
    /// A new entry is queued, announced, sorted into place and dispatch is
    /// triggered.
    pub async fn admit_or_get(
        &self,
        address: &str,
        method: Method,
        priority: Priority,
    ) -> Admission {
        let mut core = self.inner.core.lock().await;
        let (resource, inserted) = core.registry.admit_or_get(address, method, priority);
        let snapshot = resource.snapshot();

        if inserted {
            debug!(
                scheduler = %self.inner.id,
                address,
                %method,
                %priority,
                "Resource queued"
            );
            self.inner.metrics.resource_admitted();
            self.inner.notifier.emit(EventKind::Queued, &snapshot);
            core.registry.reorder();
            self.inner.pump(&mut core);
        }

        Admission {
            resource: snapshot,
            inserted,
        }
    }

    pub async fn find(&self, address: &str) -> Option<ResourceSnapshot> {
        let core = self.inner.core.lock().await;
        core.registry.find(address).map(Resource::snapshot)
    }

    /// All resources in current scheduling order.
    pub async fn resources(&self) -> Vec<ResourceSnapshot> {
        let core = self.inner.core.lock().await;
        core.registry.iter().map(Resource::snapshot).collect()
    }

    pub async fn next_available(&self) -> Option<ResourceSnapshot> {
        let core = self.inner.core.lock().await;
        core.registry.next_available().map(Resource::snapshot)
    }

    /// Currently reserved dispatch slots.
    pub async fn active_slots(&self) -> usize {
        self.inner.core.lock().await.active
    }

    /// Temporarily raises (or lowers) a resource's priority.
    ///
    /// The previous priority is remembered only if it differs; an unchanged
    /// priority emits no event. Returns `false` for unknown addresses.
    pub async fn boost(&self, address: &str, priority: Priority) -> bool {
        self.adjust_priority(address, Some(priority)).await
    }

    /// Reinstates the priority held before the most recent boost.
    pub async fn restore(&self, address: &str) -> bool {
        self.adjust_priority(address, None).await
    }

    async fn adjust_priority(&self, address: &str, target: Option<Priority>) -> bool {
        let mut core = self.inner.core.lock().await;
        let Some(resource) = core.registry.find_mut(address) else {
            return false;
        };

        let changed = match target {
            Some(priority) => resource.change_priority(priority),
            None => resource.restore_priority(),
        };
        if !changed {
            return true;
        }
        let snapshot = resource.snapshot();
        debug!(
            scheduler = %self.inner.id,
            address,
            priority = %snapshot.priority,
            "Priority changed"
        );

        core.registry.reorder();
        self.inner.notifier.emit(EventKind::Updated, &snapshot);
        self.inner.pump(&mut core);
        true
    }

    /// Cancels a resource that has not finished.
    ///
    /// An in-flight hint is not interrupted; its completion is ignored.
    pub async fn abort(&self, address: &str) -> AbortOutcome {
        let mut core = self.inner.core.lock().await;
        let Some(resource) = core.registry.find_mut(address) else {
            return AbortOutcome::Unknown;
        };

        if !resource.transition(State::AbortedManually) {
            return AbortOutcome::AlreadyFinished;
        }
        let snapshot = resource.snapshot();
        info!(scheduler = %self.inner.id, address, "Resource aborted manually");

        core.registry.reorder();
        self.inner.metrics.resource_aborted();
        self.inner.notifier.emit(EventKind::Updated, &snapshot);
        AbortOutcome::Aborted
    }

    /// Emits a removal event for `address` on behalf of an external pruner.
    ///
    /// The registry keeps the resource so the address stays deduplicated.
    pub async fn notify_removed(&self, address: &str) -> bool {
        let core = self.inner.core.lock().await;
        match core.registry.find(address) {
            Some(resource) => {
                self.inner
                    .notifier
                    .emit(EventKind::Removed, &resource.snapshot());
                true
            }
            None => false,
        }
    }

    /// Resolves once no slot is reserved and nothing is queued.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            {
                let core = self.inner.core.lock().await;
                if core.active == 0 && !core.registry.has_available() {
                    return;
                }
            }
            notified.await;
        }
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("id", &self.inner.id)
            .field("policy", &self.inner.policy)
            .finish_non_exhaustive()
    }
}

impl Inner {
    /// Fills free slots. Must be called with the core lock held.
    fn pump(self: &Arc<Self>, core: &mut Core) {
        while core.active < self.policy.max_concurrency {
            core.active += 1;
            let Some(claim) = self.claim_next(core) else {
                core.active -= 1;
                if core.active == 0 {
                    self.idle.notify_waiters();
                }
                break;
            };

            debug!(
                scheduler = %self.id,
                active = core.active,
                address = %claim.address,
                "Dispatch slot reserved"
            );
            tokio::spawn(Arc::clone(self).run_slot(claim));
        }
    }

    /// Takes the next queued resource, skipping those whose method is disabled.
    fn claim_next(&self, core: &mut Core) -> Option<Claim> {
        loop {
            let resource = core.registry.next_available_mut()?;
            let method = resource.method();

            if self.policy.methods.is_enabled(method) {
                resource.transition(State::Loading);
                let snapshot = resource.snapshot();
                core.registry.reorder();
                self.metrics.hint_issued();
                self.notifier.emit(EventKind::Updated, &snapshot);
                return Some(Claim {
                    address: snapshot.address,
                    method,
                });
            }

            resource.transition(State::Skipped);
            let snapshot = resource.snapshot();
            debug!(
                scheduler = %self.id,
                address = %snapshot.address,
                %method,
                "Method disabled, resource skipped"
            );
            core.registry.reorder();
            self.metrics.hint_skipped();
            self.notifier.emit(EventKind::Updated, &snapshot);
        }
    }

    async fn run_slot(self: Arc<Self>, mut claim: Claim) {
        loop {
            let outcome = self.execute(&claim).await;

            let mut core = self.core.lock().await;
            self.complete(&mut core, &claim, outcome);

            match self.claim_next(&mut core) {
                Some(next) => claim = next,
                None => {
                    core.active -= 1;
                    debug!(scheduler = %self.id, active = core.active, "Dispatch slot released");
                    if core.active == 0 {
                        self.idle.notify_waiters();
                    }
                    return;
                }
            }
        }
    }

    async fn execute(&self, claim: &Claim) -> Result<(), HintError> {
        let hint = Hint::new(claim.address.clone(), claim.method);

        // DNS hints have no completion signal: fire and count as done.
        if claim.method == Method::DnsPrefetch {
            let issuer = Arc::clone(&self.issuer);
            tokio::spawn(async move {
                if let Err(error) = issuer.issue(&hint).await {
                    debug!(address = %hint.address, %error, "DNS prefetch failed");
                }
            });
            return Ok(());
        }

        // A panicking issuer must not take the slot down with it.
        let issuer = Arc::clone(&self.issuer);
        match tokio::spawn(async move { issuer.issue(&hint).await }).await {
            Ok(outcome) => outcome,
            Err(error) => Err(HintError::Crashed(error.to_string())),
        }
    }

    fn complete(&self, core: &mut Core, claim: &Claim, outcome: Result<(), HintError>) {
        let next = match &outcome {
            Ok(()) => State::Done,
            Err(error) => {
                warn!(
                    scheduler = %self.id,
                    address = %claim.address,
                    method = %claim.method,
                    %error,
                    "Hint failed"
                );
                State::Skipped
            }
        };

        let Some(resource) = core.registry.find_mut(&claim.address) else {
            return;
        };
        if !resource.transition(next) {
            debug!(
                scheduler = %self.id,
                address = %claim.address,
                state = %resource.state(),
                "Completion ignored, resource already settled"
            );
            return;
        }

        match next {
            State::Done => self.metrics.hint_completed(),
            _ => self.metrics.hint_failed(),
        }
        let snapshot = resource.snapshot();
        core.registry.reorder();
        self.notifier.emit(EventKind::Updated, &snapshot);
    }
}
