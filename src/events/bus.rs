//! # Typed in-process event bus.
//!
//! [`EventBus`] keeps, per event type, an ordered list of subscriptions and
//! dispatches each publish under one of four [`DispatchBehavior`]s.
//!
//! ## Architecture
//! ```text
//! subscribe::<E>(handler)              ─┐
//! subscribe_for::<E>(&resource, h)     ─┼─► HashMap<TypeId, Vec<Subscriber>>   (registration order)
//!                                       │
//! publish(event, behavior)              │
//!     ├─► snapshot matching subscribers ┘   (global always; scoped iff same Arc)
//!     ├─► child token of the bus root token
//!     └─► behavior:
//!          BlockingSequential    ─► await h1, await h2, ...        ─► aggregate failures → caller
//!          BlockingConcurrent    ─► spawn all on the tracker, join ─► aggregate failures → caller
//!          NonBlockingConcurrent ─► spawn all on the tracker       ─► failures → FailureChannel
//!          NonBlockingSequential ─► spawn one chain on the tracker ─► failures → FailureChannel
//! ```
//!
//! ## Rules
//! - Every matching handler runs **exactly once** per publish.
//! - Sequential disciplines follow registration order; handler `i+1` starts after `i` completes.
//! - A failing handler never stops its siblings.
//! - Panics are caught (`catch_unwind`) and reported as [`HandlerError::Panicked`].
//! - The subscriber list is snapshotted at publish time; handlers may subscribe while dispatching.
//! - Every spawned handler is tracked, so `shutdown()` also waits for handlers of a dropped blocking publish.
//!
//! **Warning**: `AssertUnwindSafe` is used, which can leave shared state inconsistent
//! if a handler panics while holding a lock.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use tokio::sync::broadcast;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

use super::event::event_name;
use super::{DispatchBehavior, Event, FailureChannel, Handle, HandlerFn};
use crate::config::Config;
use crate::error::{HandlerError, HandlerFailure, PublishError};
use crate::resources::ResourceRef;

type Payload = Arc<dyn Any + Send + Sync>;
type Invoke =
    Arc<dyn Fn(Payload, CancellationToken) -> BoxFuture<'static, Result<(), HandlerError>> + Send + Sync>;

/// One registered handler.
#[derive(Clone)]
struct Subscriber {
    id: u64,
    name: Arc<str>,
    scope: Option<ResourceRef>,
    invoke: Invoke,
}

impl Subscriber {
    fn matches(&self, resource: Option<&ResourceRef>) -> bool {
        match &self.scope {
            None => true,
            Some(scope) => resource.is_some_and(|r| Arc::ptr_eq(r, scope)),
        }
    }
}

/// Token returned by `subscribe*`; pass it to [`EventBus::unsubscribe`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subscription {
    id: u64,
    event: TypeId,
    event_name: &'static str,
    scoped: bool,
}

impl Subscription {
    /// Short name of the subscribed event type.
    pub fn event_name(&self) -> &'static str {
        self.event_name
    }

    /// True for resource-scoped subscriptions.
    pub fn is_scoped(&self) -> bool {
        self.scoped
    }
}

/// Typed publish/subscribe hub owned by the orchestrator.
pub struct EventBus {
    subscribers: RwLock<HashMap<TypeId, Vec<Subscriber>>>,
    next_id: AtomicU64,
    default_dispatch: DispatchBehavior,
    failures: FailureChannel,
    background: TaskTracker,
    root: CancellationToken,
}

impl EventBus {
    /// Creates a bus with the given failure channel capacity.
    pub fn new(failure_capacity: usize) -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            default_dispatch: DispatchBehavior::default(),
            failures: FailureChannel::new(failure_capacity),
            background: TaskTracker::new(),
            root: CancellationToken::new(),
        }
    }

    /// Creates a bus using [`Config::failure_channel_capacity`] and [`Config::default_dispatch`].
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            default_dispatch: cfg.default_dispatch,
            ..Self::new(cfg.failure_capacity_clamped())
        }
    }

    /// Registers a global closure handler for `E`.
    pub fn subscribe<E, F, Fut>(&self, f: F) -> Subscription
    where
        E: Event,
        F: Fn(Arc<E>, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        let id = self.next_id();
        let handler = HandlerFn::arc(format!("{}#{id}", event_name::<E>()), f);
        self.register::<E>(id, None, handler)
    }

    /// Registers a closure handler for `E` that only fires for events about `resource`.
    pub fn subscribe_for<E, F, Fut>(&self, resource: &ResourceRef, f: F) -> Subscription
    where
        E: Event,
        F: Fn(Arc<E>, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        let id = self.next_id();
        let handler = HandlerFn::arc(format!("{}@{}#{id}", event_name::<E>(), resource.name()), f);
        self.register::<E>(id, Some(Arc::clone(resource)), handler)
    }

    /// Registers a global struct-style handler.
    pub fn subscribe_handler<E: Event>(&self, handler: Arc<dyn Handle<E>>) -> Subscription {
        let id = self.next_id();
        self.register(id, None, handler)
    }

    /// Registers a resource-scoped struct-style handler.
    pub fn subscribe_handler_for<E: Event>(
        &self,
        resource: &ResourceRef,
        handler: Arc<dyn Handle<E>>,
    ) -> Subscription {
        let id = self.next_id();
        self.register(id, Some(Arc::clone(resource)), handler)
    }

    /// Removes a subscription. Returns `false` if it was already removed.
    ///
    /// Publishes already in flight keep their snapshot and still run the handler.
    pub fn unsubscribe(&self, subscription: &Subscription) -> bool {
        let mut map = self.subscribers.write().unwrap_or_else(PoisonError::into_inner);
        let Some(list) = map.get_mut(&subscription.event) else {
            return false;
        };
        let before = list.len();
        list.retain(|s| s.id != subscription.id);
        let removed = list.len() != before;
        if removed {
            debug!(event = subscription.event_name, id = subscription.id, "unsubscribed");
        }
        removed
    }

    /// Number of handlers (global and scoped) registered for `E`.
    pub fn handler_count<E: Event>(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&TypeId::of::<E>())
            .map_or(0, Vec::len)
    }

    /// Publishes with the bus default discipline.
    pub async fn publish_default<E: Event>(&self, event: E) -> Result<(), PublishError> {
        self.publish(event, self.default_dispatch).await
    }

    /// Delivers `event` to every matching handler under `behavior`.
    ///
    /// Blocking disciplines return every handler failure in
    /// [`PublishError::Handlers`]; non-blocking ones return `Ok(())` at once
    /// and report failures through [`failures`](Self::failures).
    pub async fn publish<E: Event>(&self, event: E, behavior: DispatchBehavior) -> Result<(), PublishError> {
        let name = event_name::<E>();
        let targets = self.matching(TypeId::of::<E>(), event.resource());
        debug!(event = name, handlers = targets.len(), ?behavior, "publishing");
        if targets.is_empty() {
            return Ok(());
        }

        let payload: Payload = Arc::new(event);
        let ctx = self.root.child_token();

        match behavior {
            DispatchBehavior::BlockingSequential => {
                let mut failures = Vec::new();
                for sub in targets {
                    if let Some(f) = invoke(name, sub, Arc::clone(&payload), ctx.clone()).await {
                        failures.push(f);
                    }
                }
                aggregate(name, failures)
            }
            DispatchBehavior::BlockingConcurrent => {
                let (names, joins): (Vec<_>, Vec<_>) = targets
                    .into_iter()
                    .map(|sub| {
                        let handler = Arc::clone(&sub.name);
                        let join = self
                            .background
                            .spawn(invoke(name, sub, Arc::clone(&payload), ctx.clone()));
                        (handler, join)
                    })
                    .unzip();

                let failures = names
                    .into_iter()
                    .zip(join_all(joins).await)
                    .filter_map(|(handler, res)| match res {
                        Ok(failure) => failure,
                        Err(join) => Some(HandlerFailure {
                            event: name,
                            handler,
                            error: join_error(join),
                        }),
                    })
                    .collect();
                aggregate(name, failures)
            }
            DispatchBehavior::NonBlockingConcurrent => {
                for sub in targets {
                    let failures = self.failures.clone();
                    let run = invoke(name, sub, Arc::clone(&payload), ctx.clone());
                    self.background.spawn(async move {
                        if let Some(f) = run.await {
                            failures.report(f);
                        }
                    });
                }
                Ok(())
            }
            DispatchBehavior::NonBlockingSequential => {
                let failures = self.failures.clone();
                self.background.spawn(async move {
                    for sub in targets {
                        if let Some(f) = invoke(name, sub, Arc::clone(&payload), ctx.clone()).await {
                            failures.report(f);
                        }
                    }
                });
                Ok(())
            }
        }
    }

    /// Receiver of failures from non-blocking publishes issued after this call.
    pub fn failures(&self) -> broadcast::Receiver<HandlerFailure> {
        self.failures.subscribe()
    }

    /// Waits until every background dispatch started so far has finished.
    pub async fn drain(&self) {
        self.background.close();
        self.background.wait().await;
        self.background.reopen();
    }

    /// Root token; cancelling it cancels every in-flight handler.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.root.clone()
    }

    /// Cancels every in-flight handler without waiting for it.
    pub fn cancel_all(&self) {
        debug!("cancelling in-flight handlers");
        self.root.cancel();
    }

    /// Cancels in-flight handlers and waits for background dispatches to exit.
    ///
    /// Handlers of later publishes receive an already cancelled token.
    pub async fn shutdown(&self) {
        self.cancel_all();
        self.drain().await;
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn register<E: Event>(
        &self,
        id: u64,
        scope: Option<ResourceRef>,
        handler: Arc<dyn Handle<E>>,
    ) -> Subscription {
        let name: Arc<str> = Arc::from(handler.name());
        let invoke: Invoke = Arc::new(move |payload: Payload, ctx: CancellationToken| {
            let handler = Arc::clone(&handler);
            async move {
                match payload.downcast::<E>() {
                    Ok(event) => handler.handle(event, ctx).await,
                    // Subscribers are keyed by TypeId; a mismatch cannot be dispatched.
                    Err(_) => Ok(()),
                }
            }
            .boxed()
        });

        let subscription = Subscription {
            id,
            event: TypeId::of::<E>(),
            event_name: event_name::<E>(),
            scoped: scope.is_some(),
        };
        debug!(
            event = subscription.event_name,
            handler = %name,
            scope = scope.as_ref().map(|r| r.name()),
            "subscribed"
        );

        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(subscription.event)
            .or_default()
            .push(Subscriber {
                id,
                name,
                scope,
                invoke,
            });
        subscription
    }

    fn matching(&self, event: TypeId, resource: Option<&ResourceRef>) -> Vec<Subscriber> {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&event)
            .map(|list| list.iter().filter(|s| s.matches(resource)).cloned().collect())
            .unwrap_or_default()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers: usize = self
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(Vec::len)
            .sum();
        f.debug_struct("EventBus")
            .field("handlers", &handlers)
            .field("default_dispatch", &self.default_dispatch)
            .field("background", &self.background.len())
            .field("cancelled", &self.root.is_cancelled())
            .finish()
    }
}

/// Runs one handler with panic isolation.
async fn invoke(
    event: &'static str,
    sub: Subscriber,
    payload: Payload,
    ctx: CancellationToken,
) -> Option<HandlerFailure> {
    let fut = (sub.invoke)(payload, ctx);
    let result = match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(r) => r,
        Err(panic) => Err(HandlerError::Panicked {
            info: panic_message(&*panic),
        }),
    };
    result.err().map(|error| HandlerFailure {
        event,
        handler: sub.name,
        error,
    })
}

fn aggregate(event: &'static str, failures: Vec<HandlerFailure>) -> Result<(), PublishError> {
    if failures.is_empty() {
        return Ok(());
    }
    for f in &failures {
        warn!(event, handler = %f.handler, label = f.error.as_label(), error = %f.error, "handler failed");
    }
    Err(PublishError::Handlers { event, failures })
}

fn join_error(err: JoinError) -> HandlerError {
    if err.is_panic() {
        HandlerError::Panicked {
            info: panic_message(&*err.into_panic()),
        }
    } else {
        HandlerError::Canceled
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::{mpsc, Semaphore};
    use tokio::time::timeout;

    use super::*;
    use crate::resources::Resource;

    struct Ping;
    impl Event for Ping {}

    struct Touched(ResourceRef);
    impl Event for Touched {
        fn resource(&self) -> Option<&ResourceRef> {
            Some(&self.0)
        }
    }

    #[derive(Clone, Default)]
    struct Log(Arc<Mutex<Vec<&'static str>>>);

    impl Log {
        fn push(&self, entry: &'static str) {
            self.0.lock().unwrap().push(entry);
        }

        fn snapshot(&self) -> Vec<&'static str> {
            self.0.lock().unwrap().clone()
        }
    }

    /// Handler that reports `started`, waits for one permit of `gate`, then logs `done`.
    fn gated(
        bus: &EventBus,
        log: &Log,
        started: &mpsc::UnboundedSender<&'static str>,
        gate: &Arc<Semaphore>,
        tag: &'static str,
        done: &'static str,
    ) {
        let (log, started, gate) = (log.clone(), started.clone(), Arc::clone(gate));
        bus.subscribe(move |_: Arc<Ping>, _ctx: CancellationToken| {
            let (log, started, gate) = (log.clone(), started.clone(), Arc::clone(&gate));
            async move {
                let _ = started.send(tag);
                match gate.acquire().await {
                    Ok(permit) => permit.forget(),
                    Err(e) => return Err(HandlerError::failed(e.to_string())),
                }
                log.push(done);
                Ok(())
            }
        });
    }

    const WAIT: Duration = Duration::from_secs(5);

    async fn explode() -> Result<(), HandlerError> {
        panic!("second")
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn blocking_sequential_waits_for_each_handler_in_order() {
        let bus = Arc::new(EventBus::new(8));
        let log = Log::default();
        let (tx, mut started) = mpsc::unbounded_channel();
        let gate = Arc::new(Semaphore::new(0));
        gated(&bus, &log, &tx, &gate, "h1", "h1:done");
        {
            let (log, tx) = (log.clone(), tx.clone());
            bus.subscribe(move |_: Arc<Ping>, _ctx: CancellationToken| {
                let (log, tx) = (log.clone(), tx.clone());
                async move {
                    let _ = tx.send("h2");
                    log.push("h2:done");
                    Ok(())
                }
            });
        }

        let publisher = tokio::spawn({
            let bus = Arc::clone(&bus);
            async move { bus.publish(Ping, DispatchBehavior::BlockingSequential).await }
        });

        assert_eq!(timeout(WAIT, started.recv()).await.unwrap(), Some("h1"));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(started.try_recv().is_err(), "h2 must not start while h1 is held");
        assert!(!publisher.is_finished());

        gate.add_permits(1);
        timeout(WAIT, publisher).await.unwrap().unwrap().unwrap();
        assert_eq!(started.try_recv().unwrap(), "h2");
        assert_eq!(log.snapshot(), ["h1:done", "h2:done"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn blocking_concurrent_starts_all_and_waits_for_all() {
        let bus = Arc::new(EventBus::new(8));
        let log = Log::default();
        let (tx, mut started) = mpsc::unbounded_channel();
        let gate = Arc::new(Semaphore::new(0));
        gated(&bus, &log, &tx, &gate, "h1", "h1:done");
        gated(&bus, &log, &tx, &gate, "h2", "h2:done");

        let publisher = tokio::spawn({
            let bus = Arc::clone(&bus);
            async move { bus.publish(Ping, DispatchBehavior::BlockingConcurrent).await }
        });

        let mut seen = vec![
            timeout(WAIT, started.recv()).await.unwrap().unwrap(),
            timeout(WAIT, started.recv()).await.unwrap().unwrap(),
        ];
        seen.sort_unstable();
        assert_eq!(seen, ["h1", "h2"]);
        assert!(log.snapshot().is_empty());
        assert!(!publisher.is_finished());

        gate.add_permits(2);
        timeout(WAIT, publisher).await.unwrap().unwrap().unwrap();
        let mut done = log.snapshot();
        done.sort_unstable();
        assert_eq!(done, ["h1:done", "h2:done"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn non_blocking_concurrent_returns_before_handlers_complete() {
        let bus = EventBus::new(8);
        let log = Log::default();
        let (tx, mut started) = mpsc::unbounded_channel();
        let gate = Arc::new(Semaphore::new(0));
        gated(&bus, &log, &tx, &gate, "h1", "h1:done");
        gated(&bus, &log, &tx, &gate, "h2", "h2:done");

        timeout(WAIT, bus.publish(Ping, DispatchBehavior::NonBlockingConcurrent))
            .await
            .unwrap()
            .unwrap();
        assert!(log.snapshot().is_empty());

        timeout(WAIT, started.recv()).await.unwrap().unwrap();
        timeout(WAIT, started.recv()).await.unwrap().unwrap();

        gate.add_permits(2);
        timeout(WAIT, bus.drain()).await.unwrap();
        assert_eq!(log.snapshot().len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn non_blocking_sequential_chains_in_the_background() {
        let bus = EventBus::new(8);
        let log = Log::default();
        let (tx, mut started) = mpsc::unbounded_channel();
        let gate1 = Arc::new(Semaphore::new(0));
        let gate2 = Arc::new(Semaphore::new(1));
        gated(&bus, &log, &tx, &gate1, "h1", "h1:done");
        gated(&bus, &log, &tx, &gate2, "h2", "h2:done");

        timeout(WAIT, bus.publish(Ping, DispatchBehavior::NonBlockingSequential))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(timeout(WAIT, started.recv()).await.unwrap(), Some("h1"));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(started.try_recv().is_err(), "h2 must wait for h1");

        gate1.add_permits(1);
        assert_eq!(timeout(WAIT, started.recv()).await.unwrap(), Some("h2"));
        timeout(WAIT, bus.drain()).await.unwrap();
        assert_eq!(log.snapshot(), ["h1:done", "h2:done"]);
    }

    #[tokio::test]
    async fn scoped_handlers_match_by_identity() {
        let bus = EventBus::new(8);
        let x = Arc::new(Resource::process("x"));
        let y = Arc::new(Resource::process("y"));
        let log = Log::default();

        let a = log.clone();
        bus.subscribe(move |_: Arc<Touched>, _ctx: CancellationToken| {
            let a = a.clone();
            async move {
                a.push("A");
                Ok(())
            }
        });
        let b = log.clone();
        let sub = bus.subscribe_for(&x, move |_: Arc<Touched>, _ctx: CancellationToken| {
            let b = b.clone();
            async move {
                b.push("B");
                Ok(())
            }
        });
        assert!(sub.is_scoped());
        assert_eq!(sub.event_name(), "Touched");

        bus.publish(Touched(Arc::clone(&x)), DispatchBehavior::BlockingSequential)
            .await
            .unwrap();
        assert_eq!(log.snapshot(), ["A", "B"]);

        bus.publish(Touched(Arc::clone(&y)), DispatchBehavior::BlockingSequential)
            .await
            .unwrap();
        assert_eq!(log.snapshot(), ["A", "B", "A"]);

        // Same name, different identity.
        let x_twin = Arc::new(Resource::process("x"));
        bus.publish(Touched(x_twin), DispatchBehavior::BlockingSequential)
            .await
            .unwrap();
        assert_eq!(log.snapshot(), ["A", "B", "A", "A"]);
    }

    #[tokio::test]
    async fn blocking_publish_aggregates_every_failure() {
        for behavior in [DispatchBehavior::BlockingSequential, DispatchBehavior::BlockingConcurrent] {
            let bus = EventBus::new(8);
            let ran = Arc::new(AtomicUsize::new(0));

            bus.subscribe(|_: Arc<Ping>, _ctx: CancellationToken| async {
                Err(HandlerError::failed("first"))
            });
            bus.subscribe(|_: Arc<Ping>, _ctx: CancellationToken| explode());
            let counter = Arc::clone(&ran);
            bus.subscribe(move |_: Arc<Ping>, _ctx: CancellationToken| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            });

            let err = bus.publish(Ping, behavior).await.unwrap_err();
            let failures = err.failures();
            assert_eq!(failures.len(), 2, "{behavior:?}");
            assert_eq!(failures[0].error, HandlerError::failed("first"));
            assert_eq!(failures[1].error, HandlerError::Panicked { info: "second".into() });
            assert!(failures.iter().all(|f| f.event == "Ping"));
            assert_eq!(ran.load(Ordering::SeqCst), 1, "{behavior:?}");
        }
    }

    #[tokio::test]
    async fn background_failures_reach_the_failure_channel() {
        for behavior in [DispatchBehavior::NonBlockingConcurrent, DispatchBehavior::NonBlockingSequential] {
            let bus = EventBus::new(8);
            let mut failures = bus.failures();
            bus.subscribe(|_: Arc<Ping>, _ctx: CancellationToken| async {
                Err(HandlerError::failed("late"))
            });

            bus.publish(Ping, behavior).await.unwrap();
            let failure = timeout(WAIT, failures.recv()).await.unwrap().unwrap();
            assert_eq!(failure.error, HandlerError::failed("late"));
            assert_eq!(&*failure.handler, "Ping#1");
        }
    }

    #[tokio::test]
    async fn each_handler_runs_once_per_publish() {
        let bus = EventBus::new(8);
        let hits = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let hits = Arc::clone(&hits);
            bus.subscribe(move |_: Arc<Ping>, _ctx: CancellationToken| {
                let hits = Arc::clone(&hits);
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            });
        }

        for behavior in [
            DispatchBehavior::BlockingSequential,
            DispatchBehavior::BlockingConcurrent,
            DispatchBehavior::NonBlockingConcurrent,
            DispatchBehavior::NonBlockingSequential,
        ] {
            bus.publish(Ping, behavior).await.unwrap();
        }
        bus.drain().await;
        assert_eq!(hits.load(Ordering::SeqCst), 12);
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery() {
        let bus = EventBus::new(8);
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let sub = bus.subscribe(move |_: Arc<Ping>, _ctx: CancellationToken| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });
        assert_eq!(bus.handler_count::<Ping>(), 1);

        assert!(bus.unsubscribe(&sub));
        assert!(!bus.unsubscribe(&sub));
        bus.publish_default(Ping).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(bus.handler_count::<Ping>(), 0);
    }

    #[tokio::test]
    async fn shutdown_waits_for_concurrent_handlers_of_an_abandoned_publish() {
        let bus = EventBus::new(8);
        let done = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&done);
        bus.subscribe(move |_: Arc<Ping>, _ctx: CancellationToken| {
            let flag = Arc::clone(&flag);
            async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                flag.store(true, Ordering::SeqCst);
                Ok(())
            }
        });

        let abandoned = timeout(
            Duration::from_millis(20),
            bus.publish(Ping, DispatchBehavior::BlockingConcurrent),
        )
        .await;
        assert!(abandoned.is_err());
        assert!(!done.load(Ordering::SeqCst));

        timeout(WAIT, bus.shutdown()).await.unwrap();
        assert!(done.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn shutdown_cancels_in_flight_handlers() {
        let bus = EventBus::new(8);
        let mut failures = bus.failures();
        bus.subscribe(|_: Arc<Ping>, ctx: CancellationToken| async move {
            ctx.cancelled().await;
            Err(HandlerError::Canceled)
        });

        bus.publish(Ping, DispatchBehavior::NonBlockingConcurrent).await.unwrap();
        timeout(WAIT, bus.shutdown()).await.unwrap();

        let failure = timeout(WAIT, failures.recv()).await.unwrap().unwrap();
        assert_eq!(failure.error, HandlerError::Canceled);
        assert!(bus.cancellation_token().is_cancelled());
    }

    struct Named(Log);

    #[async_trait]
    impl Handle<Ping> for Named {
        async fn handle(&self, _event: Arc<Ping>, _ctx: CancellationToken) -> Result<(), HandlerError> {
            self.0.push("named");
            Ok(())
        }

        fn name(&self) -> &str {
            "named"
        }
    }

    #[tokio::test]
    async fn struct_handlers_and_subscribe_during_dispatch() {
        let bus = Arc::new(EventBus::new(8));
        let log = Log::default();
        bus.subscribe_handler::<Ping>(Arc::new(Named(log.clone())));

        let inner_bus = Arc::clone(&bus);
        let inner_log = log.clone();
        bus.subscribe(move |_: Arc<Ping>, _ctx: CancellationToken| {
            let (bus, log) = (Arc::clone(&inner_bus), inner_log.clone());
            async move {
                bus.subscribe(move |_: Arc<Ping>, _ctx: CancellationToken| {
                    let log = log.clone();
                    async move {
                        log.push("late");
                        Ok(())
                    }
                });
                Ok(())
            }
        });

        bus.publish(Ping, DispatchBehavior::BlockingSequential).await.unwrap();
        assert_eq!(log.snapshot(), ["named"]);

        bus.publish(Ping, DispatchBehavior::BlockingSequential).await.unwrap();
        assert_eq!(log.snapshot(), ["named", "named", "late"]);
    }
}
