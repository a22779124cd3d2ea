//! One-shot rendezvous between the worker thread and the main loop.
//!
//! The worker parks exactly one event and blocks until the main loop has run
//! the matching stack callback; the main loop services at most one event per
//! iteration. The effect is that callbacks driven by the worker execute
//! synchronously between two consecutive main-loop iterations and therefore
//! see the same stack invariants as callbacks issued from the main loop
//! itself. Concurrent worker events serialize on the idle→waiting
//! transition.

use std::sync::{Condvar, Mutex};

use crate::config::MainLoopWaker;

/// Where a passage currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
	/// No event pending; a worker may post.
	Idle,
	/// An event is parked; the main loop has not picked it up.
	Waiting,
	/// The main loop took the event and is running the callback.
	Greenlit,
	/// The callback returned; the posting worker may resume.
	Done,
}

#[derive(Debug)]
struct Inner<T> {
	phase: Phase,
	event: Option<T>,
}

pub(crate) struct Rendezvous<T> {
	inner: Mutex<Inner<T>>,
	turned: Condvar,
	waker: Option<MainLoopWaker>,
}

impl<T> Rendezvous<T> {
	pub fn new(waker: Option<MainLoopWaker>) -> Self {
		Self {
			inner: Mutex::new(Inner {
				phase: Phase::Idle,
				event: None,
			}),
			turned: Condvar::new(),
			waker,
		}
	}

	/// Worker side: parks one event and blocks until the main loop finished
	/// servicing it.
	pub fn post(&self, event: T) {
		let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
		while inner.phase != Phase::Idle {
			inner = self.turned.wait(inner).unwrap_or_else(|e| e.into_inner());
		}
		inner.event = Some(event);
		inner.phase = Phase::Waiting;
		if let Some(waker) = &self.waker {
			waker();
		}
		self.turned.notify_all();

		while inner.phase != Phase::Done {
			inner = self.turned.wait(inner).unwrap_or_else(|e| e.into_inner());
		}
		inner.phase = Phase::Idle;
		self.turned.notify_all();
	}

	/// Main side: picks up a parked event, if any. The caller must follow up
	/// with [`complete`](Self::complete) after running the callback.
	pub fn begin(&self) -> Option<T> {
		let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
		if inner.phase != Phase::Waiting {
			return None;
		}
		inner.phase = Phase::Greenlit;
		self.turned.notify_all();
		inner.event.take()
	}

	/// Main side: marks the passage finished and releases the worker.
	pub fn complete(&self) {
		let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
		debug_assert_eq!(inner.phase, Phase::Greenlit);
		inner.phase = Phase::Done;
		self.turned.notify_all();
	}

	#[cfg(test)]
	pub(crate) fn phase(&self) -> Phase {
		self.inner.lock().unwrap_or_else(|e| e.into_inner()).phase
	}
}
