//! Liveness tracking for sleepy children via device-table frame counters.
//!
//! The co-processor bumps a device's frame counter whenever it accepts a
//! secured frame from it, so a counter that moved between two liveness
//! queries means the device spoke in between. The cache re-reads the whole
//! device table on every query; a staged/live two-phase flag makes sure rows
//! that vanished from the table cannot linger in the cache.

use log::warn;

use crate::config::MAX_DEVICES;
use crate::error::{RadioError, Result};
use crate::mac::{MacTransport, PibAttribute};
use crate::tables::{DEVICE_DESCRIPTOR_LEN, DeviceDescriptor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Freshness {
	#[default]
	Empty,
	Staged,
	Live,
}

#[derive(Debug, Clone, Copy, Default)]
struct CacheEntry {
	freshness: Freshness,
	/// Extended address in the co-processor's little-endian convention.
	ext_addr: [u8; 8],
	/// Counter as of the latest table read.
	frame_counter: u32,
	/// Counter captured at the previous liveness query.
	counter_at_query: u32,
}

#[derive(Debug)]
pub(crate) struct ActivityCache {
	entries: [CacheEntry; MAX_DEVICES],
}

impl ActivityCache {
	pub fn new() -> Self {
		Self {
			entries: [CacheEntry::default(); MAX_DEVICES],
		}
	}

	/// Whether the device moved its frame counter since the previous query.
	///
	/// The extended address is taken in network order, matching the public
	/// API. The first query after a device appears reports inactive: there
	/// is no previous counter to have a delta against.
	pub fn is_active(
		&mut self,
		mac: &mut impl MacTransport,
		ext_addr: [u8; 8],
	) -> Result<bool> {
		self.refresh(mac)?;

		let mut wire_addr = ext_addr;
		wire_addr.reverse();
		let Some(entry) = self
			.entries
			.iter_mut()
			.find(|entry| entry.freshness == Freshness::Live && entry.ext_addr == wire_addr)
		else {
			return Ok(false);
		};
		let active = entry.frame_counter != entry.counter_at_query;
		entry.counter_at_query = entry.frame_counter;
		Ok(active)
	}

	/// Forgets everything, for a MAC reset.
	pub fn clear(&mut self) {
		self.entries = [CacheEntry::default(); MAX_DEVICES];
	}

	fn refresh(&mut self, mac: &mut impl MacTransport) -> Result<()> {
		for entry in &mut self.entries {
			if entry.freshness == Freshness::Live {
				entry.freshness = Freshness::Staged;
			}
		}

		let mut count_buf = [0u8; 1];
		mac.mlme_get(PibAttribute::MacDeviceTableEntries, 0, &mut count_buf)
			.map_err(|_| RadioError::Failed)?;
		let count = usize::from(count_buf[0]).min(MAX_DEVICES);

		for index in 0..count {
			let mut buf = [0u8; DEVICE_DESCRIPTOR_LEN];
			let len = mac
				.mlme_get(PibAttribute::MacDeviceTable, index as u8, &mut buf)
				.map_err(|_| RadioError::Failed)?;
			let Some(descriptor) = DeviceDescriptor::parse(&buf[..len]) else {
				warn!("short device descriptor at index {index}");
				continue;
			};
			self.observe(&descriptor);
		}

		// whatever stayed staged fell out of the device table
		for entry in &mut self.entries {
			if entry.freshness == Freshness::Staged {
				*entry = CacheEntry::default();
			}
		}
		Ok(())
	}

	fn observe(&mut self, descriptor: &DeviceDescriptor) {
		if let Some(entry) = self
			.entries
			.iter_mut()
			.find(|entry| entry.freshness == Freshness::Staged && entry.ext_addr == descriptor.ext_addr)
		{
			entry.frame_counter = descriptor.frame_counter;
			entry.freshness = Freshness::Live;
			return;
		}
		if let Some(slot) = self
			.entries
			.iter_mut()
			.find(|entry| entry.freshness == Freshness::Empty)
		{
			*slot = CacheEntry {
				freshness: Freshness::Live,
				ext_addr: descriptor.ext_addr,
				frame_counter: descriptor.frame_counter,
				counter_at_query: descriptor.frame_counter,
			};
		} else {
			warn!("device table reported more rows than the cache holds");
		}
	}
}
