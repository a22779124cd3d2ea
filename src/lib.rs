//! Platform radio bridge between a Thread/IPv6 stack and an external
//! IEEE 802.15.4 hard-MAC co-processor.
//!
//! The co-processor owns the PHY and the heavy MAC machinery (CSMA-CA,
//! retries, acknowledgment, AES-CCM*); the stack thinks in PHY-level PDUs.
//! This crate is the engine in between: it translates frames between the two
//! representations, tracks in-transit transmissions so confirms find their
//! submitter, mirrors the stack's neighbor set into the co-processor's device
//! and key tables, and serializes the transport's worker-thread callbacks
//! into the stack's single-threaded main loop.
//!
//! Two halves come out of [`Radio::new`]:
//!
//! - [`Radio`] lives on the main loop and carries the whole synchronous
//!   surface (`enable`/`receive`/`transmit`/scans/address setters/...).
//! - [`RadioEvents`] goes to the transport driver, which invokes its
//!   [`MacCallbacks`](mac::MacCallbacks) from the worker thread as
//!   indications and confirms arrive.
//!
//! The worker never runs stack code directly. It parks one event at a time
//! and blocks until the main loop's [`Radio::process`] call has run the
//! matching stack callback, so callbacks always execute between two
//! main-loop iterations. Registering a waker in [`RadioConfig`] lets the
//! park kick the main loop's poll, typically through a self-pipe.
//!
//! The UART transport itself, the event loop, timers and the random source
//! are the embedder's: this crate only defines the traits it consumes
//! ([`mac::MacTransport`], [`ThreadStack`], [`Entropy`]).

mod activity;
mod barrier;
pub mod config;
pub mod error;
pub mod frame;
pub mod mac;
mod pending;
pub mod radio;
mod scan;
mod slot;
pub mod stack;
pub mod state;
mod tables;

#[cfg(test)]
mod testutil;

pub use config::RadioConfig;
pub use error::{RadioError, Result};
pub use frame::RadioPacket;
pub use radio::{Radio, RadioCaps, RadioEvents};
pub use stack::{Entropy, StateChangeFlags, ThreadStack};
pub use state::RadioState;
