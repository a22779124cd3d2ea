//! The in-transit table: a small bounded map from MCPS handle to the
//! transmission that owns it.
//!
//! The main thread inserts on submission, the worker removes on confirm. At
//! this scale a fixed array beats any map and keeps the hot path free of
//! allocation; the bound is the co-processor's indirect queue depth plus
//! margin, not a tunable.

use std::sync::Mutex;

use thiserror::Error;

use crate::config::MAX_PENDING;
use crate::frame::RadioPacket;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingError {
	#[error("in-transit table is full")]
	Overflow,
	#[error("no in-transit record for handle {0}")]
	UnknownHandle(u8),
}

/// Handle 0 marks a free slot on the wire; it is never allocated.
#[derive(Debug)]
struct Slots {
	entries: [Option<(u8, RadioPacket)>; MAX_PENDING],
}

#[derive(Debug)]
pub struct PendingTable {
	slots: Mutex<Slots>,
}

impl PendingTable {
	pub fn new() -> Self {
		Self {
			slots: Mutex::new(Slots {
				entries: [const { None }; MAX_PENDING],
			}),
		}
	}

	/// Stores a snapshot of the submitted packet and returns the lowest
	/// currently-unused non-zero handle for it.
	pub fn allocate(&self, packet: RadioPacket) -> Result<u8, PendingError> {
		let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
		let free = slots
			.entries
			.iter()
			.position(|entry| entry.is_none())
			.ok_or(PendingError::Overflow)?;
		let handle = (1..=u8::MAX)
			.find(|candidate| {
				!slots
					.entries
					.iter()
					.flatten()
					.any(|(handle, _)| handle == candidate)
			})
			.ok_or(PendingError::Overflow)?;
		slots.entries[free] = Some((handle, packet));
		Ok(handle)
	}

	/// Atomically removes and returns the record for a confirm.
	pub fn take(&self, handle: u8) -> Result<RadioPacket, PendingError> {
		let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
		let index = slots
			.entries
			.iter()
			.position(|entry| matches!(entry, Some((h, _)) if *h == handle))
			.ok_or(PendingError::UnknownHandle(handle))?;
		match slots.entries[index].take() {
			Some((_, packet)) => Ok(packet),
			None => Err(PendingError::UnknownHandle(handle)),
		}
	}

	/// Whether a record exists for the handle. Only used for defensive
	/// assertions.
	pub fn peek(&self, handle: u8) -> bool {
		let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
		slots
			.entries
			.iter()
			.flatten()
			.any(|(h, _)| *h == handle)
	}

	/// Forgets every record. A MAC reset invalidates all handles.
	pub fn clear(&self) {
		let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
		slots.entries = [const { None }; MAX_PENDING];
	}

	pub fn len(&self) -> usize {
		let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
		slots.entries.iter().flatten().count()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl Default for PendingTable {
	fn default() -> Self {
		Self::new()
	}
}
