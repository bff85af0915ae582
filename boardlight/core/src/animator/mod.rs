//! Animator
//!
//! The cancellable rendering loop keyed by display state. On each
//! scheduling tick the animator reads the [`StateStore`], and when the
//! desired state differs from the one currently rendering it cancels the
//! in-flight animation and starts the handler for the new state. At most
//! one animation renders at a time.
//!
//! # Handler classes
//!
//! - *Continuous* handlers loop their effect until cancelled, checking the
//!   cancellation token every frame, so preemption latency is bounded by
//!   one frame period rather than by the animation's length.
//! - *One-shot* handlers run for a fixed duration and then yield to the
//!   idle policy: the default visual renders until the store changes, and
//!   the completed message is remembered so it does not retrigger.
//!
//! Which class a state uses comes from the [`ScheduleTable`]. Victory and
//! defeat default to continuous "hold" animations that keep rendering
//! until superseded; a one-shot flourish is a schedule entry away.
//!
//! # State machine
//!
//! Idle (initial) -> per-state handlers -> Shutdown (terminal). Unknown or
//! unset state maps to the configured default continuous handler; the
//! display never shows nothing and never crashes on a bad token.

mod handle;

pub use handle::{AnimationHandle, CancelToken};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::effector::DeviceEffector;
use crate::protocol::{StateKind, StateMessage};
use crate::state::StateStore;

/// Default scheduling tick interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Default grace period for cooperative cancellation.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_millis(200);

/// Default per-frame period, derived from the original effect cadences.
pub const DEFAULT_FRAME_PERIOD: Duration = Duration::from_millis(40);

/// Whether a handler runs once or loops until cancelled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandlerClass {
    /// Loop indefinitely, checking the cancellation token every frame.
    Continuous,
    /// Run for the given duration, then fall back to idle.
    OneShot(Duration),
}

/// How one state's handler behaves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnimationPlan {
    pub class: HandlerClass,
    pub frame_period: Duration,
}

impl AnimationPlan {
    /// Continuous plan at the default frame period.
    pub fn continuous() -> Self {
        Self {
            class: HandlerClass::Continuous,
            frame_period: DEFAULT_FRAME_PERIOD,
        }
    }

    /// One-shot plan at the default frame period.
    pub fn one_shot(duration: Duration) -> Self {
        Self {
            class: HandlerClass::OneShot(duration),
            frame_period: DEFAULT_FRAME_PERIOD,
        }
    }
}

/// Per-state handler plans, with a fallback for everything unlisted
/// (including `Unknown`).
#[derive(Clone, Debug)]
pub struct ScheduleTable {
    plans: HashMap<StateKind, AnimationPlan>,
    fallback: AnimationPlan,
}

impl ScheduleTable {
    /// Table where every state is continuous at the default frame period.
    pub fn all_continuous() -> Self {
        Self {
            plans: HashMap::new(),
            fallback: AnimationPlan::continuous(),
        }
    }

    /// Override the plan for one state.
    pub fn insert(&mut self, kind: StateKind, plan: AnimationPlan) {
        self.plans.insert(kind, plan);
    }

    /// Builder-style override.
    pub fn with(mut self, kind: StateKind, plan: AnimationPlan) -> Self {
        self.insert(kind, plan);
        self
    }

    /// Override the fallback frame period, which applies to every state
    /// without its own entry.
    pub fn with_fallback_period(mut self, frame_period: Duration) -> Self {
        self.fallback.frame_period = frame_period;
        self
    }

    /// The plan for a state, or the fallback.
    pub fn plan_for(&self, kind: StateKind) -> AnimationPlan {
        self.plans.get(&kind).copied().unwrap_or(self.fallback)
    }
}

impl Default for ScheduleTable {
    fn default() -> Self {
        Self::all_continuous()
    }
}

/// The running animation plus the store message it was started for.
#[derive(Debug)]
struct ActiveAnimation {
    /// Store message this animation corresponds to. Comparison is
    /// whole-message (kind and payload) so a new score value restarts
    /// the score display while an identical message never does.
    message: StateMessage,
    /// True when this is the idle fallback after a one-shot completed;
    /// `message` then records the already-satisfied state so it does not
    /// retrigger.
    idle_fallback: bool,
    handle: AnimationHandle,
}

/// Scheduler owning the device effector and the single animation slot.
pub struct Animator {
    store: Arc<StateStore>,
    effector: Arc<dyn DeviceEffector>,
    schedule: ScheduleTable,
    poll_interval: Duration,
    grace_period: Duration,
    /// Visual rendered for `Unknown` and for the idle fallback.
    default_visual: StateKind,
    shutdown: CancelToken,
    active: Option<ActiveAnimation>,
    starts: u64,
}

impl Animator {
    /// Create an animator with default timing and the draw/waiting visual
    /// as the idle default.
    pub fn new(
        store: Arc<StateStore>,
        effector: Arc<dyn DeviceEffector>,
        schedule: ScheduleTable,
        shutdown: CancelToken,
    ) -> Self {
        Self {
            store,
            effector,
            schedule,
            poll_interval: DEFAULT_POLL_INTERVAL,
            grace_period: DEFAULT_GRACE_PERIOD,
            default_visual: StateKind::Draw,
            shutdown,
            active: None,
            starts: 0,
        }
    }

    /// Override poll interval and cancellation grace period.
    pub fn with_timing(mut self, poll_interval: Duration, grace_period: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.grace_period = grace_period;
        self
    }

    /// Override the visual used for `Unknown` and the idle fallback.
    pub fn with_default_visual(mut self, kind: StateKind) -> Self {
        self.default_visual = kind;
        self
    }

    /// Handlers started since creation (including idle fallbacks).
    pub fn starts(&self) -> u64 {
        self.starts
    }

    /// Run the scheduling loop until the shutdown token is cancelled.
    ///
    /// The terminal transition cancels the active animation with the same
    /// grace rules as a preemption.
    pub async fn run(mut self) {
        info!(
            poll_ms = self.poll_interval.as_millis() as u64,
            grace_ms = self.grace_period.as_millis() as u64,
            default_visual = %self.default_visual,
            "animator running"
        );

        while !self.shutdown.is_cancelled() {
            self.tick().await;
            tokio::time::sleep(self.poll_interval).await;
        }

        if let Some(active) = self.active.take() {
            if !active.handle.stop(self.grace_period).await {
                warn!(
                    state = %active.message,
                    "animation failed to acknowledge cancellation during shutdown"
                );
            }
        }
        info!("animator stopped");
    }

    /// One scheduling tick: reconcile the running animation with the
    /// store's latest message.
    async fn tick(&mut self) {
        let desired = self.store.get();

        match self.active.take() {
            None => self.start(desired),

            Some(active) if active.message == desired => {
                if !active.handle.is_finished() {
                    // Same state, still rendering: never restart (no flicker).
                    self.active = Some(active);
                } else if active.idle_fallback {
                    // Idle only ends on effector failure; keep trying.
                    warn!("idle handler ended, restarting");
                    self.start_idle(desired);
                } else {
                    // One-shot ran to completion, or the handler aborted.
                    debug!(state = %desired, "animation ended, falling back to idle");
                    self.start_idle(desired);
                }
            }

            Some(active) => {
                info!(from = %active.message, to = %desired, "state change, preempting");
                if !active.handle.stop(self.grace_period).await {
                    warn!(
                        state = %active.message,
                        grace_ms = self.grace_period.as_millis() as u64,
                        "animation failed to acknowledge cancellation within grace period, \
                         leaking its task"
                    );
                }
                self.start(desired);
            }
        }
    }

    /// Start the handler for a store message.
    fn start(&mut self, msg: StateMessage) {
        let plan = self.schedule.plan_for(msg.kind);
        let visual = if msg.kind == StateKind::Unknown {
            self.default_visual
        } else {
            msg.kind
        };
        let handle = self.spawn_handler(visual, msg.payload, plan);
        self.starts += 1;
        self.active = Some(ActiveAnimation {
            message: msg,
            idle_fallback: false,
            handle,
        });
    }

    /// Start the idle fallback while remembering the satisfied message.
    fn start_idle(&mut self, satisfied: StateMessage) {
        // Idle is continuous by definition, whatever the default visual's
        // own schedule entry says.
        let plan = AnimationPlan {
            class: HandlerClass::Continuous,
            frame_period: self.schedule.plan_for(self.default_visual).frame_period,
        };
        let handle = self.spawn_handler(self.default_visual, None, plan);
        self.starts += 1;
        self.active = Some(ActiveAnimation {
            message: satisfied,
            idle_fallback: true,
            handle,
        });
    }

    /// Spawn one rendering task. The loop never blocks longer than one
    /// frame period without checking its cancellation token.
    fn spawn_handler(
        &self,
        kind: StateKind,
        payload: Option<i64>,
        plan: AnimationPlan,
    ) -> AnimationHandle {
        let token = CancelToken::new();
        let cancel = token.clone();
        let effector = Arc::clone(&self.effector);

        let task = tokio::spawn(async move {
            let started = tokio::time::Instant::now();
            loop {
                if cancel.is_cancelled() {
                    break;
                }
                let elapsed = started.elapsed();
                if let HandlerClass::OneShot(duration) = plan.class {
                    if elapsed >= duration {
                        break;
                    }
                }
                if let Err(e) = effector.render_frame(kind, payload, elapsed) {
                    error!(state = %kind, error = %e, "device effector failed, aborting animation");
                    break;
                }
                tokio::time::sleep(plan.frame_period).await;
            }
        });

        AnimationHandle::new(token, task)
    }

    #[cfg(test)]
    fn active_token(&self) -> Option<CancelToken> {
        self.active.as_ref().map(|a| a.handle.token().clone())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::effector::test_support::RecordingEffector;

    fn animator_with(effector: &RecordingEffector, schedule: ScheduleTable) -> Animator {
        Animator::new(
            StateStore::new(),
            Arc::new(effector.clone()),
            schedule,
            CancelToken::new(),
        )
    }

    async fn settle() {
        // Let spawned handler loops make progress under paused time.
        tokio::time::sleep(Duration::from_millis(120)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_unset_state_renders_default_visual() {
        let effector = RecordingEffector::new();
        let mut animator = animator_with(&effector, ScheduleTable::all_continuous());

        animator.tick().await;
        settle().await;

        let kinds = effector.kinds();
        assert!(!kinds.is_empty());
        assert!(kinds.iter().all(|&k| k == StateKind::Draw), "{kinds:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_message_never_restarts() {
        let effector = RecordingEffector::new();
        let mut animator = animator_with(&effector, ScheduleTable::all_continuous());
        animator.store.set(StateMessage::new(StateKind::Thinking));

        animator.tick().await;
        assert_eq!(animator.starts(), 1);

        // The same token arriving again must not cancel or restart.
        animator.store.set(StateMessage::new(StateKind::Thinking));
        settle().await;
        animator.tick().await;
        assert_eq!(animator.starts(), 1);
        assert!(!animator.active_token().unwrap().is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_state_change_preempts_within_grace() {
        let effector = RecordingEffector::new();
        let mut animator = animator_with(&effector, ScheduleTable::all_continuous());

        animator.store.set(StateMessage::new(StateKind::Thinking));
        animator.tick().await;
        let thinking_token = animator.active_token().unwrap();

        animator.store.set(StateMessage::new(StateKind::Victory));
        animator.tick().await;

        assert!(thinking_token.is_cancelled());
        assert_eq!(animator.starts(), 2);

        settle().await;
        assert_eq!(*effector.kinds().last().unwrap(), StateKind::Victory);
    }

    #[tokio::test(start_paused = true)]
    async fn test_score_payload_change_restarts_display() {
        let effector = RecordingEffector::new();
        let mut animator = animator_with(&effector, ScheduleTable::all_continuous());

        animator.store.set(StateMessage::score(1));
        animator.tick().await;
        animator.store.set(StateMessage::score(2));
        animator.tick().await;
        assert_eq!(animator.starts(), 2);

        settle().await;
        assert_eq!(effector.frames().last().unwrap().payload, Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_shot_completes_then_idles_without_retrigger() {
        let effector = RecordingEffector::new();
        let schedule = ScheduleTable::all_continuous().with(
            StateKind::Victory,
            AnimationPlan::one_shot(Duration::from_millis(100)),
        );
        let mut animator = animator_with(&effector, schedule);

        animator.store.set(StateMessage::new(StateKind::Victory));
        animator.tick().await;
        assert_eq!(animator.starts(), 1);

        // Flourish runs out...
        tokio::time::sleep(Duration::from_millis(200)).await;
        animator.tick().await;
        assert_eq!(animator.starts(), 2); // idle fallback

        // ...and an unchanged store never re-runs the one-shot.
        settle().await;
        animator.tick().await;
        assert_eq!(animator.starts(), 2);
        assert_eq!(*effector.kinds().last().unwrap(), StateKind::Draw);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_message_interrupts_idle_fallback() {
        let effector = RecordingEffector::new();
        let schedule = ScheduleTable::all_continuous().with(
            StateKind::Victory,
            AnimationPlan::one_shot(Duration::from_millis(100)),
        );
        let mut animator = animator_with(&effector, schedule);

        animator.store.set(StateMessage::new(StateKind::Victory));
        animator.tick().await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        animator.tick().await; // idle fallback

        animator.store.set(StateMessage::new(StateKind::Thinking));
        animator.tick().await;
        assert_eq!(animator.starts(), 3);

        settle().await;
        assert_eq!(*effector.kinds().last().unwrap(), StateKind::Thinking);
    }

    #[tokio::test(start_paused = true)]
    async fn test_effector_failure_falls_back_to_idle() {
        let effector = RecordingEffector::failing_on(StateKind::Thinking);
        let mut animator = animator_with(&effector, ScheduleTable::all_continuous());

        animator.store.set(StateMessage::new(StateKind::Thinking));
        animator.tick().await;
        settle().await;

        // Handler aborted on the first failed frame; next tick idles.
        animator.tick().await;
        assert_eq!(animator.starts(), 2);
        settle().await;
        assert_eq!(*effector.kinds().last().unwrap(), StateKind::Draw);
    }

    #[tokio::test(start_paused = true)]
    async fn test_thinking_then_victory_scenario() {
        // Full run loop: thinking starts within one poll interval, is
        // cancelled when victory arrives, and victory renders next.
        let effector = RecordingEffector::new();
        let store = StateStore::new();
        let shutdown = CancelToken::new();
        let animator = Animator::new(
            Arc::clone(&store),
            Arc::new(effector.clone()),
            ScheduleTable::all_continuous(),
            shutdown.clone(),
        );
        let runner = tokio::spawn(animator.run());

        store.set(StateMessage::new(StateKind::Thinking));
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(effector.kinds().contains(&StateKind::Thinking));

        store.set(StateMessage::new(StateKind::Victory));
        tokio::time::sleep(Duration::from_secs(1)).await;

        let kinds = effector.kinds();
        let first_victory = kinds.iter().position(|&k| k == StateKind::Victory).unwrap();
        assert!(kinds[..first_victory].contains(&StateKind::Thinking));
        // Once victory is rendering, thinking never comes back.
        assert!(kinds[first_victory..].iter().all(|&k| k == StateKind::Victory));

        shutdown.cancel();
        runner.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_active_animation() {
        let effector = RecordingEffector::new();
        let store = StateStore::new();
        let shutdown = CancelToken::new();
        let animator = Animator::new(
            Arc::clone(&store),
            Arc::new(effector.clone()),
            ScheduleTable::all_continuous(),
            shutdown.clone(),
        );
        let runner = tokio::spawn(animator.run());

        store.set(StateMessage::new(StateKind::UnderAttack));
        tokio::time::sleep(Duration::from_millis(200)).await;

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), runner)
            .await
            .expect("animator should stop promptly")
            .unwrap();
    }
}
