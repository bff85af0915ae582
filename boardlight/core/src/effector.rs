//! Device Effector Seam
//!
//! The animator owns the display hardware exclusively and drives it
//! through this one trait. The actual pixel math - color ramps, brightness
//! curves, image rotation - and the neopixel/LCD driver bindings live
//! behind implementations of [`DeviceEffector`]; the core never touches
//! them.
//!
//! Implementations are expected to be bounded in per-call latency (the
//! animator calls once per frame and checks cancellation between calls)
//! and idempotent when called repeatedly with the same state.

use std::time::Duration;

use thiserror::Error;

use crate::protocol::StateKind;

/// Errors surfaced by a device driver.
///
/// A failure aborts the current animation and the animator falls back to
/// idle; it never crashes the listener side.
#[derive(Debug, Error)]
pub enum EffectorError {
    /// The device could not be reached (bus error, disconnected panel)
    #[error("device unavailable: {0}")]
    Unavailable(String),
    /// The device rejected or failed the frame
    #[error("render failed: {0}")]
    Render(String),
}

/// The one interface the animator renders through.
pub trait DeviceEffector: Send + Sync {
    /// Render one frame of the given state.
    ///
    /// `elapsed` is the time since this animation started, letting
    /// implementations phase their effect without keeping their own
    /// clock. `payload` carries the score value when `kind` is
    /// [`StateKind::Score`].
    fn render_frame(
        &self,
        kind: StateKind,
        payload: Option<i64>,
        elapsed: Duration,
    ) -> Result<(), EffectorError>;
}

/// Effector that renders nothing. For headless runs and tests.
#[derive(Debug, Default)]
pub struct NullEffector;

impl DeviceEffector for NullEffector {
    fn render_frame(
        &self,
        _kind: StateKind,
        _payload: Option<i64>,
        _elapsed: Duration,
    ) -> Result<(), EffectorError> {
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Recording effector shared by animator and integration tests.

    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;

    /// One recorded frame.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct RenderedFrame {
        pub kind: StateKind,
        pub payload: Option<i64>,
    }

    /// Effector that records every frame, optionally failing on one kind.
    #[derive(Clone, Default)]
    pub struct RecordingEffector {
        frames: Arc<Mutex<Vec<RenderedFrame>>>,
        fail_on: Option<StateKind>,
    }

    impl RecordingEffector {
        pub fn new() -> Self {
            Self::default()
        }

        /// Record frames but fail every render of `kind`.
        pub fn failing_on(kind: StateKind) -> Self {
            Self {
                frames: Arc::default(),
                fail_on: Some(kind),
            }
        }

        pub fn frames(&self) -> Vec<RenderedFrame> {
            self.frames.lock().clone()
        }

        pub fn kinds(&self) -> Vec<StateKind> {
            self.frames.lock().iter().map(|f| f.kind).collect()
        }
    }

    impl DeviceEffector for RecordingEffector {
        fn render_frame(
            &self,
            kind: StateKind,
            payload: Option<i64>,
            _elapsed: Duration,
        ) -> Result<(), EffectorError> {
            self.frames.lock().push(RenderedFrame { kind, payload });
            if self.fail_on == Some(kind) {
                return Err(EffectorError::Render(format!("injected failure for {kind}")));
            }
            Ok(())
        }
    }
}
