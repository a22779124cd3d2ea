//! The upward collaborator: what this crate needs from the Thread stack and
//! the platform it runs on.

use bitflags::bitflags;

use crate::config::{EXT_PAN_ID_LEN, MAX_DEVICES, NETWORK_NAME_LEN};
use crate::error::RadioError;
use crate::frame::RadioPacket;

bitflags! {
	/// Stack state-change flags that drive the table synchronizer.
	#[derive(Debug, Clone, Copy, PartialEq, Eq)]
	pub struct StateChangeFlags: u32 {
		const KEY_SEQUENCE = 1 << 0;
		const CHILD_ADDED = 1 << 1;
		const CHILD_REMOVED = 1 << 2;
		const ROLE = 1 << 3;
		const LINK_ACCEPTED = 1 << 4;
	}
}

/// Device role within the Thread partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
	Detached,
	Child,
	Router,
	Leader,
}

impl Role {
	/// Whether the role keeps frames for sleepy children, which decides
	/// which side of the device table rebuild applies.
	pub fn is_parent(self) -> bool {
		matches!(self, Role::Router | Role::Leader)
	}
}

/// A neighbor as the stack enumerates it. The extended address is in network
/// byte order; reversal to the co-processor's convention happens in the
/// table synchronizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Neighbor {
	pub short_addr: u16,
	pub ext_addr: [u8; 8],
}

/// One discovered network, streamed per received beacon during an active
/// scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveScanResult {
	pub pan_id: u16,
	pub channel: u8,
	pub rssi: i8,
	pub lqi: u8,
	pub version: u8,
	pub joinable: bool,
	pub network_name: [u8; NETWORK_NAME_LEN],
	pub extended_pan_id: [u8; EXT_PAN_ID_LEN],
}

/// One channel's result of an energy scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnergyScanResult {
	pub channel: u8,
	pub max_rssi: i8,
}

/// Everything the radio consumes from the stack: synchronous queries driven
/// by the table synchronizer, and the callbacks delivered from
/// [`Radio::process`](crate::Radio::process).
///
/// Callbacks always run on the main thread, between two consecutive
/// iterations of the stack's event loop, so they may touch stack state
/// without further locking.
pub trait ThreadStack {
	fn role(&self) -> Role;
	/// The current thrKeySequenceCounter.
	fn key_sequence(&self) -> u32;
	/// Derives the 128-bit MAC key for a key sequence number.
	fn mac_key(&self, sequence: u32) -> [u8; 16];
	/// The current parent, when attached as a child.
	fn parent(&self) -> Option<Neighbor>;
	/// Appends children, at most up to the vector's capacity.
	fn children(&self, out: &mut heapless::Vec<Neighbor, MAX_DEVICES>);
	/// Appends router neighbors, at most up to the vector's capacity.
	fn router_neighbors(&self, out: &mut heapless::Vec<Neighbor, MAX_DEVICES>);

	/// A frame arrived. The packet is valid only for the duration of the
	/// call.
	fn receive_done(&mut self, packet: &RadioPacket, result: Result<(), RadioError>);
	/// A transmission concluded. `ack_received` is always false: the
	/// co-processor consumes acknowledgment frames internally.
	fn transmit_done(
		&mut self,
		packet: &RadioPacket,
		ack_received: bool,
		result: Result<(), RadioError>,
	);
	/// One beacon result, or `None` once the active scan completed.
	fn active_scan_done(&mut self, result: Option<&ActiveScanResult>);
	/// One channel result, or `None` once the energy scan completed.
	fn energy_scan_done(&mut self, result: Option<&EnergyScanResult>);
}

/// Platform random source, used once to mint an EUI-64 when none is
/// configured.
pub trait Entropy {
	fn fill(&mut self, buffer: &mut [u8]);
}
