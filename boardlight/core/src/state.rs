//! State Store
//!
//! Process-wide single-slot holder of the current desired display state.
//! The listener writes decoded messages into it; the animator polls it.
//! It is the only shared mutable state between the two activities.
//!
//! This is deliberately not a queue: readers observe the latest value and
//! intermediate states may be dropped if superseded before being rendered.
//! Last-write-wins is the contract, not a bug - the display is a live view
//! of the match, not a history. `get()` never blocks waiting for a new
//! value; the animator polls at its own interval, trading a few tens of
//! milliseconds of latency for freedom from lost-wakeup hazards.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::protocol::{StateKind, StateMessage};

/// Single-slot latest-value store shared between listener and animator.
#[derive(Debug)]
pub struct StateStore {
    slot: RwLock<Slot>,
}

#[derive(Debug)]
struct Slot {
    current: StateMessage,
    version: u64,
}

impl StateStore {
    /// Create a store holding the initial `Unknown` state.
    ///
    /// `Unknown` renders as the configured default visual, so the display
    /// shows something sensible before the first message arrives.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            slot: RwLock::new(Slot {
                current: StateMessage::new(StateKind::Unknown),
                version: 0,
            }),
        })
    }

    /// Overwrite the slot with the latest decoded message.
    pub fn set(&self, msg: StateMessage) {
        let mut slot = self.slot.write();
        slot.current = msg;
        slot.version += 1;
    }

    /// Read the latest message. Never blocks on a new value.
    pub fn get(&self) -> StateMessage {
        self.slot.read().current
    }

    /// Monotonic write counter.
    ///
    /// Lets callers observe that a write happened even when the written
    /// message compares equal to the previous one.
    pub fn version(&self) -> u64 {
        self.slot.read().version
    }
}
