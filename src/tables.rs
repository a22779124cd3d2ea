//! Keeps the co-processor's device table and three-generation key table in
//! step with the stack's neighbor set.
//!
//! Every trigger rebuilds both tables from scratch with synchronous MLME-SET
//! commands. A failed write leaves the co-processor partially updated; the
//! rebuild is idempotent, so the next trigger repairs it.

use log::{debug, warn};

use crate::config::{DEFAULT_KEY_SOURCE, KEY_GENERATIONS, MAX_DEVICES};
use crate::frame::FrameType;
use crate::mac::{MacStatus, MacTransport, PibAttribute, StartRequest};
use crate::stack::{Neighbor, Role, StateChangeFlags, ThreadStack};

/// Serialized length of a device descriptor.
pub(crate) const DEVICE_DESCRIPTOR_LEN: usize = 17;

/// Serialized key-table entry: counts, key, one lookup entry, two usage
/// entries and at most [`MAX_DEVICES`] device-list entries.
const KEY_ENTRY_MAX_LEN: usize = 3 + 16 + 10 + 4 + MAX_DEVICES;

/// The MAC command frame identifier of a data request, the one command a key
/// must cover so sleepy children can poll.
const CMD_DATA_REQUEST: u8 = 0x04;

/// A device table row in the co-processor's convention: extended address in
/// little-endian, counters little-endian on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DeviceDescriptor {
	pub pan_id: u16,
	pub short_addr: u16,
	pub ext_addr: [u8; 8],
	pub frame_counter: u32,
	pub exempt: bool,
}

impl DeviceDescriptor {
	/// Builds a descriptor for a fresh neighbor. The stack hands extended
	/// addresses out in network order; the co-processor wants them reversed.
	fn from_neighbor(neighbor: &Neighbor, pan_id: u16) -> Self {
		let mut ext_addr = neighbor.ext_addr;
		ext_addr.reverse();
		Self {
			pan_id,
			short_addr: neighbor.short_addr,
			ext_addr,
			frame_counter: 0,
			exempt: false,
		}
	}

	pub fn to_bytes(self) -> [u8; DEVICE_DESCRIPTOR_LEN] {
		let mut bytes = [0u8; DEVICE_DESCRIPTOR_LEN];
		bytes[0..2].copy_from_slice(&self.pan_id.to_le_bytes());
		bytes[2..4].copy_from_slice(&self.short_addr.to_le_bytes());
		bytes[4..12].copy_from_slice(&self.ext_addr);
		bytes[12..16].copy_from_slice(&self.frame_counter.to_le_bytes());
		bytes[16] = u8::from(self.exempt);
		bytes
	}

	pub fn parse(bytes: &[u8]) -> Option<Self> {
		if bytes.len() < DEVICE_DESCRIPTOR_LEN {
			return None;
		}
		let mut ext_addr = [0u8; 8];
		ext_addr.copy_from_slice(&bytes[4..12]);
		Some(Self {
			pan_id: u16::from_le_bytes([bytes[0], bytes[1]]),
			short_addr: u16::from_le_bytes([bytes[2], bytes[3]]),
			ext_addr,
			frame_counter: u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]),
			exempt: bytes[16] != 0,
		})
	}
}

/// One key-table entry: the key itself, a lookup entry derived from the
/// default key source and key sequence, usage entries for data and
/// data-request frames, and a device-list entry per device descriptor.
fn key_table_entry(
	key: &[u8; 16],
	sequence: u32,
	device_count: usize,
) -> heapless::Vec<u8, KEY_ENTRY_MAX_LEN> {
	let mut entry = heapless::Vec::new();
	// entry counts: lookup, device, usage
	let _ = entry.push(1);
	let _ = entry.push(device_count as u8);
	let _ = entry.push(2);
	let _ = entry.extend_from_slice(key);
	// lookup data: default key source with the key index appended
	let _ = entry.extend_from_slice(&DEFAULT_KEY_SOURCE);
	let _ = entry.push(((sequence & 0x7f) + 1) as u8);
	let _ = entry.push(1); // size code: 9-octet lookup data
	// usage: plain data frames and data-request commands
	let _ = entry.push(FrameType::Data.into());
	let _ = entry.push(0);
	let _ = entry.push(FrameType::MacCommand.into());
	let _ = entry.push(CMD_DATA_REQUEST);
	for index in 0..device_count {
		let _ = entry.push(index as u8);
	}
	entry
}

fn collect_devices(
	stack: &impl ThreadStack,
	pan_id: u16,
) -> heapless::Vec<DeviceDescriptor, MAX_DEVICES> {
	let mut devices = heapless::Vec::new();
	let mut neighbors: heapless::Vec<Neighbor, MAX_DEVICES> = heapless::Vec::new();
	if stack.role() == Role::Child {
		if let Some(parent) = stack.parent() {
			let _ = neighbors.push(parent);
		}
	} else {
		stack.children(&mut neighbors);
		stack.router_neighbors(&mut neighbors);
	}
	for neighbor in &neighbors {
		if neighbor.ext_addr == [0u8; 8] {
			continue;
		}
		let _ = devices.push(DeviceDescriptor::from_neighbor(neighbor, pan_id));
	}
	devices
}

/// Reacts to stack state changes by rebuilding the co-processor's tables and
/// by switching the MAC in and out of coordinator mode.
#[derive(Debug)]
pub(crate) struct Synchronizer {
	last_role: Role,
}

impl Synchronizer {
	pub fn new() -> Self {
		Self {
			last_role: Role::Detached,
		}
	}

	pub fn handle(
		&mut self,
		mac: &mut impl MacTransport,
		stack: &impl ThreadStack,
		flags: StateChangeFlags,
		pan_id: u16,
		channel: u8,
	) {
		let relevant = StateChangeFlags::KEY_SEQUENCE
			| StateChangeFlags::CHILD_ADDED
			| StateChangeFlags::CHILD_REMOVED
			| StateChangeFlags::ROLE
			| StateChangeFlags::LINK_ACCEPTED;
		if !flags.intersects(relevant) {
			return;
		}
		if flags.contains(StateChangeFlags::ROLE) {
			self.apply_role(mac, stack.role(), pan_id, channel);
		}
		if let Err(status) = rebuild(mac, stack, pan_id) {
			// partial tables stand until the next trigger retries
			warn!("table rebuild failed with status {status:?}");
		}
	}

	fn apply_role(&mut self, mac: &mut impl MacTransport, role: Role, pan_id: u16, channel: u8) {
		if role.is_parent() && !self.last_role.is_parent() {
			let request = StartRequest {
				pan_id,
				logical_channel: channel,
				beacon_order: 15,
				superframe_order: 15,
				pan_coordinator: true,
			};
			if let Err(status) = mac.mlme_start(&request) {
				warn!("MLME-START failed with status {status:?}");
			}
		} else if !role.is_parent() && self.last_role.is_parent() {
			if let Err(status) = mac.mlme_reset(false) {
				warn!("MLME-RESET failed with status {status:?}");
			}
		}
		self.last_role = role;
	}
}

fn rebuild(
	mac: &mut impl MacTransport,
	stack: &impl ThreadStack,
	pan_id: u16,
) -> Result<(), MacStatus> {
	let devices = collect_devices(stack, pan_id);
	for (index, device) in devices.iter().enumerate() {
		mac.mlme_set(PibAttribute::MacDeviceTable, index as u8, &device.to_bytes())?;
	}
	mac.mlme_set(
		PibAttribute::MacDeviceTableEntries,
		0,
		&[devices.len() as u8],
	)?;

	let sequence = stack.key_sequence();
	let generations = [
		sequence.checked_sub(1),
		Some(sequence),
		sequence.checked_add(1),
	];
	let mut written: u8 = 0;
	for generation in generations.into_iter().flatten() {
		if generation == 0 {
			continue;
		}
		let key = stack.mac_key(generation);
		let entry = key_table_entry(&key, generation, devices.len());
		mac.mlme_set(PibAttribute::MacKeyTable, written, &entry)?;
		written += 1;
	}
	debug_assert!(usize::from(written) <= KEY_GENERATIONS);
	mac.mlme_set(PibAttribute::MacKeyTableEntries, 0, &[written])?;
	debug!(
		"synchronized {} device(s), {} key generation(s)",
		devices.len(),
		written
	);
	Ok(())
}
