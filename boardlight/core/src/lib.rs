//! Boardlight Core - Match-State Display Coordination
//!
//! This crate coordinates presentation hardware (an LED ring and a round
//! LCD) driven by short textual state tokens from a remote match server.
//! It owns the line-oriented state protocol, the single-slot current-state
//! store, and the cancellable animation lifecycle; the actual pixel math
//! and hardware drivers live behind the [`DeviceEffector`] seam.
//!
//! # Architecture
//!
//! ```text
//! match server ──TCP──▶ StateListener ──▶ LineFramer ──▶ MessageDecoder
//!                                                              │
//!                                                     StateStore (1 slot)
//!                                                              │ poll
//!                                                          Animator
//!                                                              │ frames
//!                                                       DeviceEffector
//! ```
//!
//! Two activities run concurrently: the listener, which only blocks on
//! short-timeout socket reads, and the animator, which owns the effector
//! exclusively. They share nothing but the store. The running animation is
//! a third unit of work whose only synchronization point is its
//! cancellation token.
//!
//! # Key Types
//!
//! - [`StateListener`]: accepts the match connection, feeds the store
//! - [`StateStore`]: latest-value slot, last-write-wins
//! - [`Animator`]: preemptable per-state rendering scheduler
//! - [`StateSender`]: the remote side's connect-and-send API
//! - [`DisplayConfig`]: TOML-backed tunables

pub mod animator;
pub mod client;
pub mod config;
pub mod effector;
pub mod listener;
pub mod protocol;
pub mod state;

pub use animator::{AnimationPlan, Animator, CancelToken, HandlerClass, ScheduleTable};
pub use client::StateSender;
pub use config::{ConfigError, DisplayConfig};
pub use effector::{DeviceEffector, EffectorError, NullEffector};
pub use listener::{ListenerError, StateListener};
pub use protocol::{StateKind, StateMessage};
pub use state::StateStore;
