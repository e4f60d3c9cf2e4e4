use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Semaphore;

use hintbox::issuer::{Hint, HintError, HintIssuer};
use hintbox::scheduler::{
    AbortOutcome, Method, MethodToggles, Priority, Scheduler, SchedulerPolicy, State,
};

/// Issuer whose hints block until the test releases them.
struct GatedIssuer {
    gate: Semaphore,
    calls: Mutex<Vec<Hint>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    failing: Mutex<HashSet<String>>,
}

impl GatedIssuer {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            gate: Semaphore::new(0),
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            failing: Mutex::new(HashSet::new()),
        })
    }

    fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }

    fn fail(&self, address: &str) {
        self.failing.lock().insert(address.to_string());
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().iter().map(|h| h.address.clone()).collect()
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HintIssuer for GatedIssuer {
    async fn issue(&self, hint: &Hint) -> Result<(), HintError> {
        self.calls.lock().push(hint.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| HintError::Request(e.to_string()))?;
        permit.forget();
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.lock().contains(&hint.address) {
            return Err(HintError::Status(500));
        }
        Ok(())
    }
}

fn scheduler(max_concurrency: usize, issuer: Arc<GatedIssuer>) -> Scheduler {
    Scheduler::new(
        SchedulerPolicy::new(max_concurrency, MethodToggles::default()),
        issuer,
    )
}

async fn wait_for_calls(issuer: &GatedIssuer, n: usize) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while issuer.calls().len() < n {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("issuer was not called in time");
}

async fn wait_idle(scheduler: &Scheduler) {
    tokio::time::timeout(Duration::from_secs(2), scheduler.wait_idle())
        .await
        .expect("scheduler did not go idle");
}

async fn state_of(scheduler: &Scheduler, address: &str) -> State {
    scheduler.find(address).await.expect("resource registered").state
}

#[tokio::test]
async fn test_concurrency_limit_never_exceeded() {
    let issuer = GatedIssuer::new();
    let scheduler = scheduler(2, Arc::clone(&issuer));

    for i in 0..5 {
        let address = format!("https://site.test/page-{i}");
        scheduler
            .admit_or_get(&address, Method::Prefetch, Priority::Low)
            .await;
    }

    wait_for_calls(&issuer, 2).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(issuer.calls().len(), 2);
    assert_eq!(scheduler.active_slots().await, 2);

    issuer.release(5);
    wait_idle(&scheduler).await;

    assert_eq!(issuer.calls().len(), 5);
    assert!(issuer.peak() <= 2);
    assert_eq!(scheduler.active_slots().await, 0);
    for resource in scheduler.resources().await {
        assert_eq!(resource.state, State::Done);
    }
    assert_eq!(scheduler.metrics().snapshot().completed, 5);
}

#[tokio::test]
async fn test_single_slot_queues_second_resource() {
    let issuer = GatedIssuer::new();
    let scheduler = scheduler(1, Arc::clone(&issuer));

    scheduler
        .admit_or_get("https://site.test/a", Method::Prefetch, Priority::Normal)
        .await;
    scheduler
        .admit_or_get("https://site.test/b", Method::Prefetch, Priority::Normal)
        .await;

    assert_eq!(state_of(&scheduler, "https://site.test/a").await, State::Loading);
    assert_eq!(state_of(&scheduler, "https://site.test/b").await, State::Queued);

    issuer.release(1);
    wait_for_calls(&issuer, 2).await;
    assert_eq!(state_of(&scheduler, "https://site.test/a").await, State::Done);
    assert_eq!(state_of(&scheduler, "https://site.test/b").await, State::Loading);

    issuer.release(1);
    wait_idle(&scheduler).await;
    assert_eq!(state_of(&scheduler, "https://site.test/b").await, State::Done);
    assert_eq!(issuer.calls(), vec!["https://site.test/a", "https://site.test/b"]);
}

#[tokio::test]
async fn test_disabled_method_is_skipped_without_issuing() {
    let issuer = GatedIssuer::new();
    let mut methods = MethodToggles::default();
    methods.set(Method::ModulePreload, false);
    let scheduler = Scheduler::new(SchedulerPolicy::new(2, methods), issuer.clone());

    scheduler
        .admit_or_get("https://cdn.test/app.js", Method::ModulePreload, Priority::Low)
        .await;

    wait_idle(&scheduler).await;
    assert_eq!(
        state_of(&scheduler, "https://cdn.test/app.js").await,
        State::Skipped
    );
    assert!(issuer.calls().is_empty());
    assert_eq!(scheduler.metrics().snapshot().skipped, 1);
}

#[tokio::test]
async fn test_boost_moves_resource_ahead_and_restore_reverts() {
    let issuer = GatedIssuer::new();
    let scheduler = scheduler(1, Arc::clone(&issuer));

    for address in ["https://site.test/a", "https://site.test/b", "https://site.test/c"] {
        scheduler
            .admit_or_get(address, Method::Prefetch, Priority::Low)
            .await;
    }
    wait_for_calls(&issuer, 1).await;

    assert!(scheduler.boost("https://site.test/c", Priority::Realtime).await);
    let next = scheduler.next_available().await.unwrap();
    assert_eq!(next.address, "https://site.test/c");
    assert_eq!(next.priority, Priority::Realtime);

    assert!(scheduler.boost("https://site.test/b", Priority::High).await);
    assert!(scheduler.restore("https://site.test/b").await);
    let b = scheduler.find("https://site.test/b").await.unwrap();
    assert_eq!(b.priority, Priority::Low);

    issuer.release(1);
    wait_for_calls(&issuer, 2).await;
    assert_eq!(issuer.calls()[1], "https://site.test/c");

    issuer.release(2);
    wait_idle(&scheduler).await;
    assert_eq!(
        issuer.calls(),
        vec!["https://site.test/a", "https://site.test/c", "https://site.test/b"]
    );
}

#[tokio::test]
async fn test_priority_change_on_unknown_address() {
    let scheduler = scheduler(1, GatedIssuer::new());
    assert!(!scheduler.boost("https://site.test/none", Priority::High).await);
    assert!(!scheduler.restore("https://site.test/none").await);
}

#[tokio::test]
async fn test_abort_while_loading_ignores_completion() {
    let issuer = GatedIssuer::new();
    let scheduler = scheduler(1, Arc::clone(&issuer));

    scheduler
        .admit_or_get("https://site.test/a", Method::Prefetch, Priority::Low)
        .await;
    wait_for_calls(&issuer, 1).await;

    assert_eq!(
        scheduler.abort("https://site.test/a").await,
        AbortOutcome::Aborted
    );
    issuer.release(1);
    wait_idle(&scheduler).await;

    assert_eq!(
        state_of(&scheduler, "https://site.test/a").await,
        State::AbortedManually
    );
    let metrics = scheduler.metrics().snapshot();
    assert_eq!(metrics.aborted, 1);
    assert_eq!(metrics.completed, 0);
}

#[tokio::test]
async fn test_abort_outcomes() {
    let issuer = GatedIssuer::new();
    let scheduler = scheduler(1, Arc::clone(&issuer));

    assert_eq!(
        scheduler.abort("https://site.test/none").await,
        AbortOutcome::Unknown
    );

    scheduler
        .admit_or_get("https://site.test/a", Method::Prefetch, Priority::Low)
        .await;
    scheduler
        .admit_or_get("https://site.test/b", Method::Prefetch, Priority::Low)
        .await;

    // A queued resource is never handed to the issuer once aborted.
    assert_eq!(
        scheduler.abort("https://site.test/b").await,
        AbortOutcome::Aborted
    );
    issuer.release(1);
    wait_idle(&scheduler).await;

    assert_eq!(issuer.calls(), vec!["https://site.test/a"]);
    assert_eq!(
        scheduler.abort("https://site.test/a").await,
        AbortOutcome::AlreadyFinished
    );
}

#[tokio::test]
async fn test_failure_marks_only_that_resource_skipped() {
    let issuer = GatedIssuer::new();
    issuer.fail("https://site.test/broken");
    let scheduler = scheduler(1, Arc::clone(&issuer));

    scheduler
        .admit_or_get("https://site.test/broken", Method::Prefetch, Priority::Low)
        .await;
    scheduler
        .admit_or_get("https://site.test/fine", Method::Prefetch, Priority::Low)
        .await;

    issuer.release(2);
    wait_idle(&scheduler).await;

    assert_eq!(
        state_of(&scheduler, "https://site.test/broken").await,
        State::Skipped
    );
    assert_eq!(state_of(&scheduler, "https://site.test/fine").await, State::Done);
    let metrics = scheduler.metrics().snapshot();
    assert_eq!(metrics.failed, 1);
    assert_eq!(metrics.completed, 1);
}

#[tokio::test]
async fn test_dns_prefetch_is_done_without_waiting() {
    let issuer = GatedIssuer::new();
    let scheduler = scheduler(1, Arc::clone(&issuer));

    // The gate is never opened: the DNS hint stays pending in the issuer.
    scheduler
        .admit_or_get("https://other.test/", Method::DnsPrefetch, Priority::Low)
        .await;
    wait_idle(&scheduler).await;

    assert_eq!(state_of(&scheduler, "https://other.test/").await, State::Done);
    assert_eq!(scheduler.active_slots().await, 0);
    wait_for_calls(&issuer, 1).await;
}

#[tokio::test]
async fn test_admission_is_idempotent() {
    let issuer = GatedIssuer::new();
    let scheduler = scheduler(1, Arc::clone(&issuer));

    let first = scheduler
        .admit_or_get("https://site.test/a", Method::Prefetch, Priority::Low)
        .await;
    let second = scheduler
        .admit_or_get("https://site.test/a", Method::Preconnect, Priority::High)
        .await;

    assert!(first.inserted);
    assert!(!second.inserted);
    assert_eq!(second.resource.method, Method::Prefetch);
    assert_eq!(second.resource.priority, Priority::Low);
    assert_eq!(scheduler.resources().await.len(), 1);
    assert_eq!(scheduler.metrics().snapshot().admitted, 1);

    issuer.release(1);
    wait_idle(&scheduler).await;
}

#[tokio::test]
async fn test_instances_are_independent() {
    let issuer = GatedIssuer::new();
    let left = scheduler(1, Arc::clone(&issuer));
    let right = scheduler(1, Arc::clone(&issuer));

    assert_ne!(left.id(), right.id());
    assert!(
        left.admit_or_get("https://site.test/a", Method::Prefetch, Priority::Low)
            .await
            .inserted
    );
    assert!(
        right
            .admit_or_get("https://site.test/a", Method::Prefetch, Priority::Low)
            .await
            .inserted
    );
    assert!(left.find("https://site.test/b").await.is_none());

    issuer.release(2);
    wait_idle(&left).await;
    wait_idle(&right).await;
}

#[tokio::test]
async fn test_events_follow_lifecycle() {
    let issuer = GatedIssuer::new();
    let scheduler = scheduler(1, Arc::clone(&issuer));

    let queued = Arc::new(Mutex::new(Vec::new()));
    let updated = Arc::new(Mutex::new(Vec::new()));
    let removed = Arc::new(AtomicUsize::new(0));

    let sink = Arc::clone(&queued);
    scheduler.on_resource_queued(move |r| sink.lock().push(r.state));
    let sink = Arc::clone(&updated);
    let updates = scheduler.on_resource_updated(move |r| sink.lock().push(r.state));
    let sink = Arc::clone(&removed);
    scheduler.on_resource_removed(move |_| {
        sink.fetch_add(1, Ordering::SeqCst);
    });

    scheduler
        .admit_or_get("https://site.test/a", Method::Prefetch, Priority::Low)
        .await;
    issuer.release(1);
    wait_idle(&scheduler).await;

    assert_eq!(*queued.lock(), vec![State::Queued]);
    assert_eq!(*updated.lock(), vec![State::Loading, State::Done]);

    assert!(scheduler.notify_removed("https://site.test/a").await);
    assert!(!scheduler.notify_removed("https://site.test/none").await);
    assert_eq!(removed.load(Ordering::SeqCst), 1);
    // Removal is advisory; the address stays deduplicated.
    assert!(scheduler.find("https://site.test/a").await.is_some());

    assert!(scheduler.unsubscribe(updates));
    scheduler.boost("https://site.test/a", Priority::High).await;
    assert_eq!(updated.lock().len(), 2);
}

/// Issuer that panics for addresses ending in `/boom`.
struct PanickingIssuer;

#[async_trait]
impl HintIssuer for PanickingIssuer {
    async fn issue(&self, hint: &Hint) -> Result<(), HintError> {
        if hint.address.ends_with("/boom") {
            panic!("issuer blew up on {}", hint.address);
        }
        Ok(())
    }
}

#[tokio::test]
async fn test_panicking_issuer_releases_slot() {
    let scheduler = Scheduler::new(
        SchedulerPolicy::new(1, MethodToggles::default()),
        Arc::new(PanickingIssuer),
    );

    scheduler
        .admit_or_get("https://site.test/boom", Method::Prefetch, Priority::Low)
        .await;
    scheduler
        .admit_or_get("https://site.test/ok", Method::Prefetch, Priority::Low)
        .await;

    wait_idle(&scheduler).await;

    assert_eq!(
        state_of(&scheduler, "https://site.test/boom").await,
        State::Skipped
    );
    assert_eq!(state_of(&scheduler, "https://site.test/ok").await, State::Done);
    assert_eq!(scheduler.active_slots().await, 0);
    assert_eq!(scheduler.metrics().snapshot().failed, 1);
}

#[tokio::test]
async fn test_unchanged_priority_emits_no_update() {
    let issuer = GatedIssuer::new();
    let scheduler = scheduler(1, Arc::clone(&issuer));
    scheduler
        .admit_or_get("https://site.test/a", Method::Prefetch, Priority::Low)
        .await;

    let updates = Arc::new(AtomicUsize::new(0));
    let sink = Arc::clone(&updates);
    scheduler.on_resource_updated(move |_| {
        sink.fetch_add(1, Ordering::SeqCst);
    });

    // Same priority and an empty history are both no-ops on a known address.
    assert!(scheduler.boost("https://site.test/a", Priority::Low).await);
    assert!(scheduler.restore("https://site.test/a").await);
    assert_eq!(updates.load(Ordering::SeqCst), 0);

    assert!(scheduler.boost("https://site.test/a", Priority::High).await);
    assert_eq!(updates.load(Ordering::SeqCst), 1);

    issuer.release(1);
    wait_idle(&scheduler).await;
}
