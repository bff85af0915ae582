//! Logging Device Effector
//!
//! Stand-in for the real LED-ring/LCD drivers: renders frames into the
//! tracing log. State changes land at info level, individual frames at
//! trace, so a default log level shows what the display *would* be doing
//! without drowning the output at 25 frames per second.

use std::time::Duration;

use parking_lot::Mutex;
use tracing::{info, trace};

use boardlight_core::{DeviceEffector, EffectorError, StateKind};

/// Effector that logs frames instead of driving hardware.
#[derive(Debug, Default)]
pub struct LogEffector {
    last: Mutex<Option<(StateKind, Option<i64>)>>,
}

impl DeviceEffector for LogEffector {
    fn render_frame(
        &self,
        kind: StateKind,
        payload: Option<i64>,
        elapsed: Duration,
    ) -> Result<(), EffectorError> {
        let mut last = self.last.lock();
        if *last != Some((kind, payload)) {
            match payload {
                Some(n) => info!(state = %kind, value = n, "display state"),
                None => info!(state = %kind, "display state"),
            }
            *last = Some((kind, payload));
        }
        trace!(state = %kind, elapsed_ms = elapsed.as_millis() as u64, "frame");
        Ok(())
    }
}
