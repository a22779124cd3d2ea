//! Single-cell hand-off of a decoded inbound frame from the worker to the
//! main loop.
//!
//! The cell holds at most one frame. A worker with a second frame blocks in
//! [`deposit`](ReceiveSlot::deposit) until the main loop drains, which is the
//! backpressure that keeps the co-processor's indications strictly ordered.

use std::sync::{Condvar, Mutex};

use crate::frame::RadioPacket;

#[derive(Debug)]
pub struct ReceiveSlot {
	cell: Mutex<Option<RadioPacket>>,
	drained: Condvar,
}

impl ReceiveSlot {
	pub fn new() -> Self {
		Self {
			cell: Mutex::new(None),
			drained: Condvar::new(),
		}
	}

	/// Parks a frame for the main loop, blocking while the previous one has
	/// not been consumed yet.
	pub fn deposit(&self, packet: RadioPacket) {
		let mut cell = self.cell.lock().unwrap_or_else(|e| e.into_inner());
		while cell.is_some() {
			cell = self.drained.wait(cell).unwrap_or_else(|e| e.into_inner());
		}
		*cell = Some(packet);
	}

	/// Removes the parked frame and unblocks a waiting worker.
	pub fn take(&self) -> Option<RadioPacket> {
		let mut cell = self.cell.lock().unwrap_or_else(|e| e.into_inner());
		let packet = cell.take();
		if packet.is_some() {
			self.drained.notify_all();
		}
		packet
	}

	pub fn is_empty(&self) -> bool {
		self.cell
			.lock()
			.unwrap_or_else(|e| e.into_inner())
			.is_none()
	}
}

impl Default for ReceiveSlot {
	fn default() -> Self {
		Self::new()
	}
}
