//! Lifecycle of one shared element transition.
//!
//! ```text
//!            pair ready / start()
//!   idle ───────────────────────────▶ preparing
//!    ▲                                   │ measured, snapshotted, hidden
//!    │ reset()                           ▼
//!    │                                running ──── pair lost ────┐
//!    │                                   │ scheduler finished    │
//!    │                                   ▼                       ▼
//!    └──────────────── completed / error ◀───────────────────────┘
//! ```
//!
//! Every asynchronous step is tagged with the generation it was started in.
//! A cancel (pair lost, `reset()`, drop) bumps the generation so that late
//! bridge results are released instead of applied. Snapshots and hidden views
//! are owned by the controller's record and released exactly once by
//! whichever path takes them out of it.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::watch;

use crate::bridge::{BridgeAdapter, BridgeHost};
use crate::event::Subscription;
use crate::interpolate::{interpolate, VisualState};
use crate::scheduler::{RunOutcome, Scheduler, Timeline};
use crate::{
    BridgeResult, PreparedTransition, Registry, Snapshot, TransitionConfig, TransitionError,
    TransitionPair, TransitionResult, ViewHandle,
};

/// Where a transition is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionState {
    /// Nothing in progress.
    Idle,
    /// Measuring and capturing the pair.
    Preparing,
    /// Progress is advancing.
    Running,
    /// Reached the end (or lost a side). Terminal until reset.
    Completed,
    /// Failed. Terminal until reset.
    Error,
}

impl TransitionState {
    /// Whether the state only changes through `reset()`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    /// Whether a transition is in flight.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Preparing | Self::Running)
    }
}

impl fmt::Display for TransitionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Preparing => "preparing",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Error => "error",
        })
    }
}

/// Everything the overlay renderer needs for the current frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    /// Frame and per-layer opacity.
    pub visual: VisualState,
    /// Content for the start layer.
    pub start_content: Snapshot,
    /// Content for the end layer.
    pub end_content: Snapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Auto,
    Manual,
}

#[derive(Debug, Default)]
struct Resources {
    prepared: Option<PreparedTransition>,
    hidden: Vec<ViewHandle>,
}

impl Resources {
    fn is_empty(&self) -> bool {
        self.prepared.is_none() && self.hidden.is_empty()
    }
}

#[derive(Debug)]
struct Record {
    state: TransitionState,
    generation: u64,
    error: Option<TransitionError>,
    resources: Resources,
}

struct Shared {
    identifier: String,
    config: TransitionConfig,
    registry: Registry,
    bridge: Arc<dyn BridgeAdapter>,
    record: Mutex<Record>,
    state_tx: watch::Sender<TransitionState>,
    progress_tx: watch::Sender<f32>,
}

/// Drives the transition for one identifier.
///
/// State and progress are readable at any time. With `auto_detect` enabled
/// the controller starts by itself when the registry reports a pair.
///
/// ```no_run
/// # use std::sync::Arc;
/// # use morph_core::{BridgeAdapter, Registry, TransitionConfig, TransitionController, TransitionState};
/// # async fn demo(bridge: Arc<dyn BridgeAdapter>) {
/// let registry = Registry::new();
/// let controller = TransitionController::new(
///     "photo-7",
///     &registry,
///     bridge,
///     TransitionConfig::default().with_auto_detect(false),
/// );
///
/// if controller.start().await.is_err() {
///     assert_eq!(controller.state(), TransitionState::Error);
///     controller.reset().await;
/// }
/// # }
/// ```
pub struct TransitionController {
    shared: Arc<Shared>,
    _subscription: Subscription,
}

impl TransitionController {
    /// Create a controller for `identifier` and subscribe it to `registry`.
    ///
    /// If the identifier already has a pair and auto-detect is on, the
    /// transition starts right away.
    #[must_use]
    pub fn new(
        identifier: impl Into<String>,
        registry: &Registry,
        bridge: Arc<dyn BridgeAdapter>,
        config: TransitionConfig,
    ) -> Self {
        let (state_tx, _) = watch::channel(TransitionState::Idle);
        let (progress_tx, _) = watch::channel(0.0_f32);
        let shared = Arc::new(Shared {
            identifier: identifier.into(),
            config,
            registry: registry.clone(),
            bridge,
            record: Mutex::new(Record {
                state: TransitionState::Idle,
                generation: 0,
                error: None,
                resources: Resources::default(),
            }),
            state_tx,
            progress_tx,
        });

        let weak: Weak<Shared> = Arc::downgrade(&shared);
        let subscription = registry.subscribe(move |identifier, nodes| {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            if identifier != shared.identifier {
                return;
            }
            if nodes.len() >= 2 {
                shared.auto_start();
            } else {
                shared.pair_lost();
            }
        });

        if registry.transition_pair(&shared.identifier).is_some() {
            shared.auto_start();
        }

        Self {
            shared,
            _subscription: subscription,
        }
    }

    /// Create a controller bound to the host's selected backend.
    ///
    /// # Errors
    ///
    /// Returns an error if no bridge backend is available.
    pub fn with_host(
        identifier: impl Into<String>,
        registry: &Registry,
        host: &BridgeHost,
        config: TransitionConfig,
    ) -> BridgeResult<Self> {
        Ok(Self::new(identifier, registry, host.adapter()?, config))
    }

    /// Start the transition and wait until it settles.
    ///
    /// A no-op outside `idle` or when the controller is disabled. Failures
    /// move the controller to `error` and are also returned here.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::NoPair`] if fewer than two views are
    /// registered, or the bridge error that stopped preparation.
    pub async fn start(&self) -> TransitionResult<()> {
        let shared = &self.shared;
        if shared.config.disabled {
            tracing::debug!(identifier = %shared.identifier, "Transition disabled; start ignored");
            return Ok(());
        }

        let runtime = Handle::try_current();
        let generation = {
            let mut record = shared.lock();
            if record.state != TransitionState::Idle {
                tracing::debug!(
                    identifier = %shared.identifier,
                    state = %record.state,
                    "Transition already started; start ignored"
                );
                return Ok(());
            }
            if runtime.is_err() {
                record.error = Some(TransitionError::NoRuntime);
                shared.set_state(&mut record, TransitionState::Error);
                return Err(TransitionError::NoRuntime);
            }
            record.generation += 1;
            shared.set_state(&mut record, TransitionState::Preparing);
            record.generation
        };

        let Ok(runtime) = runtime else {
            return Err(TransitionError::NoRuntime);
        };
        let task = runtime.spawn(Arc::clone(shared).drive(generation, Trigger::Manual));
        match task.await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(identifier = %shared.identifier, "Transition task aborted: {e}");
                shared.error().map_or(Ok(()), Err)
            }
        }
    }

    /// Cancel and rewind to `idle`.
    ///
    /// Hidden views are shown again and snapshots released before this
    /// returns. Progress is reset to 0 and any error is cleared.
    pub async fn reset(&self) {
        let shared = &self.shared;
        let resources = {
            let mut record = shared.lock();
            record.generation += 1;
            record.error = None;
            shared.set_state(&mut record, TransitionState::Idle);
            shared.progress_tx.send_replace(0.0);
            std::mem::take(&mut record.resources)
        };
        tracing::debug!(identifier = %shared.identifier, "Transition reset");
        shared.release(resources).await;
    }

    /// Identifier this controller follows.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.shared.identifier
    }

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &TransitionConfig {
        &self.shared.config
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> TransitionState {
        *self.shared.state_tx.borrow()
    }

    /// Latest published progress.
    #[must_use]
    pub fn progress(&self) -> f32 {
        *self.shared.progress_tx.borrow()
    }

    /// The error that moved the controller to `error`, if any.
    #[must_use]
    pub fn error(&self) -> Option<TransitionError> {
        self.shared.error()
    }

    /// Current pair in the registry.
    #[must_use]
    pub fn pair(&self) -> Option<TransitionPair> {
        self.shared.registry.transition_pair(&self.shared.identifier)
    }

    /// Watch state changes.
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<TransitionState> {
        self.shared.state_tx.subscribe()
    }

    /// Watch progress changes.
    #[must_use]
    pub fn subscribe_progress(&self) -> watch::Receiver<f32> {
        self.shared.progress_tx.subscribe()
    }

    /// Wait until the controller reaches `completed` or `error`.
    ///
    /// When the transition finishes or fails on its own, hidden views are
    /// already visible again and snapshots released by the time this
    /// returns. After a pair loss the release runs in the background.
    pub async fn settled(&self) -> TransitionState {
        let mut rx = self.shared.state_tx.subscribe();
        let terminal = rx.wait_for(|state| state.is_terminal()).await.map(|state| *state);
        terminal.unwrap_or_else(|_| self.state())
    }

    /// Overlay for the current progress, while running.
    ///
    /// `None` when no geometry has been captured (the caller must not render).
    #[must_use]
    pub fn overlay(&self) -> Option<Overlay> {
        let progress = self.progress();
        let record = self.shared.lock();
        if record.state != TransitionState::Running {
            return None;
        }
        let prepared = record.resources.prepared.as_ref()?;
        let visual = interpolate(
            progress,
            Some(&prepared.start.frame),
            Some(&prepared.end.frame),
            self.shared.config.mode,
        )?;
        Some(Overlay {
            visual,
            start_content: prepared.start.snapshot.clone(),
            end_content: prepared.end.snapshot.clone(),
        })
    }
}

impl Drop for TransitionController {
    fn drop(&mut self) {
        let resources = {
            let mut record = self.shared.lock();
            record.generation += 1;
            std::mem::take(&mut record.resources)
        };
        if !resources.is_empty() {
            Arc::clone(&self.shared).release_detached(resources);
        }
    }
}

impl fmt::Debug for TransitionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionController")
            .field("identifier", &self.shared.identifier)
            .field("state", &self.state())
            .field("progress", &self.progress())
            .finish_non_exhaustive()
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Record> {
        self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, record: &mut Record, state: TransitionState) {
        record.state = state;
        self.state_tx.send_replace(state);
    }

    fn error(&self) -> Option<TransitionError> {
        self.lock().error.clone()
    }

    fn is_current(&self, generation: u64) -> bool {
        self.lock().generation == generation
    }

    /// Registry reported a ready pair.
    fn auto_start(self: &Arc<Self>) {
        if self.config.disabled || !self.config.auto_detect {
            return;
        }
        let Ok(runtime) = Handle::try_current() else {
            tracing::warn!(
                identifier = %self.identifier,
                "No async runtime; automatic transition not started"
            );
            return;
        };

        let generation = {
            let mut record = self.lock();
            if record.state != TransitionState::Idle {
                return;
            }
            record.generation += 1;
            self.set_state(&mut record, TransitionState::Preparing);
            record.generation
        };

        tracing::debug!(identifier = %self.identifier, "Pair ready; starting transition");
        let shared = Arc::clone(self);
        runtime.spawn(async move {
            // Failures are recorded in the state machine.
            let _ = shared.drive(generation, Trigger::Auto).await;
        });
    }

    /// Registry reported that the pair is gone. An in-flight transition is
    /// treated as having reached its end.
    fn pair_lost(self: &Arc<Self>) {
        let resources = {
            let mut record = self.lock();
            if !record.state.is_active() {
                return;
            }
            record.generation += 1;
            self.set_state(&mut record, TransitionState::Completed);
            self.progress_tx.send_replace(1.0);
            std::mem::take(&mut record.resources)
        };
        tracing::info!(identifier = %self.identifier, "Pair lost; transition completed early");
        Arc::clone(self).release_detached(resources);
    }

    async fn drive(self: Arc<Self>, generation: u64, trigger: Trigger) -> TransitionResult<()> {
        let Some(pair) = self.registry.transition_pair(&self.identifier) else {
            return match trigger {
                Trigger::Auto => {
                    let mut record = self.lock();
                    if record.generation == generation {
                        self.set_state(&mut record, TransitionState::Idle);
                    }
                    tracing::debug!(identifier = %self.identifier, "Pair vanished before preparation");
                    Ok(())
                }
                Trigger::Manual => {
                    let error = TransitionError::NoPair(self.identifier.clone());
                    self.fail(generation, error.clone()).await;
                    Err(error)
                }
            };
        };

        let prepared = match self.bridge.prepare_transition(pair.start, pair.end).await {
            Ok(prepared) => prepared,
            Err(e) => {
                if !self.is_current(generation) {
                    tracing::debug!(identifier = %self.identifier, "Discarding stale bridge failure: {e}");
                    return Ok(());
                }
                let error = TransitionError::from(e);
                self.fail(generation, error.clone()).await;
                return Err(error);
            }
        };

        let stale = {
            let mut record = self.lock();
            if record.generation == generation {
                record.resources.prepared = Some(prepared);
                None
            } else {
                Some(prepared)
            }
        };
        if let Some(prepared) = stale {
            tracing::debug!(identifier = %self.identifier, "Discarding stale measurement");
            self.release(Resources {
                prepared: Some(prepared),
                hidden: Vec::new(),
            })
            .await;
            return Ok(());
        }

        for handle in [pair.start, pair.end] {
            if let Err(e) = self.bridge.set_hidden(handle, true).await {
                if !self.is_current(generation) {
                    return Ok(());
                }
                let error = TransitionError::from(e);
                self.fail(generation, error.clone()).await;
                return Err(error);
            }
            let kept = {
                let mut record = self.lock();
                if record.generation == generation {
                    record.resources.hidden.push(handle);
                    true
                } else {
                    false
                }
            };
            if !kept {
                self.show(handle).await;
                return Ok(());
            }
        }

        {
            let mut record = self.lock();
            if record.generation != generation {
                return Ok(());
            }
            self.progress_tx.send_replace(0.0);
            self.set_state(&mut record, TransitionState::Running);
        }
        tracing::info!(
            identifier = %self.identifier,
            start = %pair.start,
            end = %pair.end,
            duration_ms = self.config.duration_ms,
            easing = %self.config.easing,
            mode = %self.config.mode,
            "Transition running"
        );

        let scheduler = Scheduler::new(self.config.frame_interval());
        let timeline = Timeline::from_config(&self.config);
        let outcome = scheduler
            .run(timeline, |progress| self.publish(generation, progress))
            .await;

        if outcome == RunOutcome::Finished {
            self.complete(generation).await;
        }
        Ok(())
    }

    fn publish(&self, generation: u64, progress: f32) -> bool {
        let record = self.lock();
        if record.generation != generation || record.state != TransitionState::Running {
            return false;
        }
        self.progress_tx.send_replace(progress);
        if self.config.debug {
            tracing::trace!(identifier = %self.identifier, progress, "Transition frame");
        }
        true
    }

    /// Take this generation's resources out of the record.
    fn take_resources(&self, generation: u64) -> Option<Resources> {
        let mut record = self.lock();
        (record.generation == generation).then(|| std::mem::take(&mut record.resources))
    }

    /// Views are shown again and snapshots released before the state
    /// turns terminal. A cancel during the release wins.
    async fn complete(&self, generation: u64) {
        let Some(resources) = self.take_resources(generation) else {
            return;
        };
        self.release(resources).await;

        {
            let mut record = self.lock();
            if record.generation != generation {
                return;
            }
            self.progress_tx.send_replace(1.0);
            self.set_state(&mut record, TransitionState::Completed);
        }
        tracing::info!(identifier = %self.identifier, "Transition completed");
    }

    async fn fail(&self, generation: u64, error: TransitionError) {
        let Some(resources) = self.take_resources(generation) else {
            return;
        };
        self.release(resources).await;

        {
            let mut record = self.lock();
            if record.generation != generation {
                return;
            }
            record.error = Some(error.clone());
            self.set_state(&mut record, TransitionState::Error);
        }
        match &error {
            TransitionError::NoPair(_) => {
                tracing::warn!(identifier = %self.identifier, "Transition failed: {error}");
            }
            _ => tracing::error!(identifier = %self.identifier, "Transition failed: {error}"),
        }
    }

    async fn show(&self, handle: ViewHandle) {
        if let Err(e) = self.bridge.set_hidden(handle, false).await {
            tracing::warn!(identifier = %self.identifier, %handle, "Failed to show view: {e}");
        }
    }

    /// Show hidden views, then release snapshots.
    async fn release(&self, resources: Resources) {
        for handle in resources.hidden {
            self.show(handle).await;
        }
        if let Some(prepared) = resources.prepared {
            if let Err(e) = self.bridge.cleanup(prepared.into_snapshots()).await {
                tracing::warn!(identifier = %self.identifier, "Snapshot cleanup failed: {e}");
            }
        }
    }

    /// Release from a synchronous context.
    fn release_detached(self: Arc<Self>, resources: Resources) {
        if resources.is_empty() {
            return;
        }
        match Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move { self.release(resources).await });
            }
            Err(_) => pollster::block_on(self.release(resources)),
        }
    }
}
