//! Recording fakes for the two collaborators, shared by the unit tests.

use crate::error::RadioError;
use crate::frame::RadioPacket;
use crate::mac::{
	DataRequest, HwmeAttribute, MacStatus, MacTransport, PibAttribute, PollRequest, ScanRequest,
	StartRequest,
};
use crate::stack::{
	ActiveScanResult, EnergyScanResult, Entropy, Neighbor, Role, ThreadStack,
};

/// A co-processor stand-in that records every command and answers reads from
/// a configurable attribute store.
#[derive(Default)]
pub(crate) struct FakeMac {
	pub sets: Vec<(PibAttribute, u8, Vec<u8>)>,
	pub get_values: Vec<(PibAttribute, u8, Vec<u8>)>,
	pub resets: Vec<bool>,
	pub starts: Vec<StartRequest>,
	pub scans: Vec<ScanRequest>,
	pub polls: Vec<PollRequest>,
	pub data_requests: Vec<DataRequest>,
	pub hwme_sets: Vec<(HwmeAttribute, Vec<u8>)>,
	pub hwme_values: Vec<(HwmeAttribute, Vec<u8>)>,
	/// Fail the n-th (0-based, counted over recorded sets) MLME-SET.
	pub fail_sets_at: Option<usize>,
	pub data_request_status: Option<MacStatus>,
	pub scan_status: Option<MacStatus>,
	pub poll_status: Option<MacStatus>,
}

impl FakeMac {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn last_set(&self, attribute: PibAttribute) -> Option<&Vec<u8>> {
		self.sets
			.iter()
			.rev()
			.find(|(attr, _, _)| *attr == attribute)
			.map(|(_, _, value)| value)
	}
}

impl MacTransport for FakeMac {
	fn mlme_set(
		&mut self,
		attribute: PibAttribute,
		index: u8,
		value: &[u8],
	) -> Result<(), MacStatus> {
		if self.fail_sets_at == Some(self.sets.len()) {
			return Err(MacStatus::InvalidParameter);
		}
		self.sets.push((attribute, index, value.to_vec()));
		Ok(())
	}

	fn mlme_get(
		&mut self,
		attribute: PibAttribute,
		index: u8,
		out: &mut [u8],
	) -> Result<usize, MacStatus> {
		let value = self
			.get_values
			.iter()
			.find(|(attr, i, _)| *attr == attribute && *i == index)
			.map(|(_, _, value)| value)
			.ok_or(MacStatus::UnsupportedAttribute)?;
		let len = value.len().min(out.len());
		out[..len].copy_from_slice(&value[..len]);
		Ok(len)
	}

	fn mlme_reset(&mut self, set_default_pib: bool) -> Result<(), MacStatus> {
		self.resets.push(set_default_pib);
		Ok(())
	}

	fn mlme_start(&mut self, request: &StartRequest) -> Result<(), MacStatus> {
		self.starts.push(*request);
		Ok(())
	}

	fn mlme_scan(&mut self, request: &ScanRequest) -> Result<(), MacStatus> {
		if let Some(status) = self.scan_status {
			return Err(status);
		}
		self.scans.push(*request);
		Ok(())
	}

	fn mlme_poll(&mut self, request: &PollRequest) -> Result<(), MacStatus> {
		if let Some(status) = self.poll_status {
			return Err(status);
		}
		self.polls.push(*request);
		Ok(())
	}

	fn mcps_data_request(&mut self, request: &DataRequest) -> Result<(), MacStatus> {
		if let Some(status) = self.data_request_status {
			return Err(status);
		}
		self.data_requests.push(request.clone());
		Ok(())
	}

	fn hwme_set(&mut self, attribute: HwmeAttribute, value: &[u8]) -> Result<(), MacStatus> {
		self.hwme_sets.push((attribute, value.to_vec()));
		Ok(())
	}

	fn hwme_get(&mut self, attribute: HwmeAttribute, out: &mut [u8]) -> Result<usize, MacStatus> {
		let value = self
			.hwme_values
			.iter()
			.find(|(attr, _)| *attr == attribute)
			.map(|(_, value)| value)
			.ok_or(MacStatus::UnsupportedAttribute)?;
		let len = value.len().min(out.len());
		out[..len].copy_from_slice(&value[..len]);
		Ok(len)
	}
}

/// A stack stand-in with scripted neighbors and recorded callbacks.
pub(crate) struct FakeStack {
	pub role: Role,
	pub key_sequence: u32,
	pub parent: Option<Neighbor>,
	pub children: Vec<Neighbor>,
	pub routers: Vec<Neighbor>,

	pub received: Vec<(Vec<u8>, Result<(), RadioError>)>,
	pub transmitted: Vec<(usize, bool, Result<(), RadioError>)>,
	pub active_results: Vec<Option<ActiveScanResult>>,
	pub energy_results: Vec<Option<EnergyScanResult>>,
}

impl FakeStack {
	pub fn new() -> Self {
		Self {
			role: Role::Detached,
			key_sequence: 0,
			parent: None,
			children: Vec::new(),
			routers: Vec::new(),
			received: Vec::new(),
			transmitted: Vec::new(),
			active_results: Vec::new(),
			energy_results: Vec::new(),
		}
	}
}

impl ThreadStack for FakeStack {
	fn role(&self) -> Role {
		self.role
	}

	fn key_sequence(&self) -> u32 {
		self.key_sequence
	}

	fn mac_key(&self, sequence: u32) -> [u8; 16] {
		[sequence as u8; 16]
	}

	fn parent(&self) -> Option<Neighbor> {
		self.parent
	}

	fn children(&self, out: &mut heapless::Vec<Neighbor, { crate::config::MAX_DEVICES }>) {
		for child in &self.children {
			if out.push(*child).is_err() {
				break;
			}
		}
	}

	fn router_neighbors(&self, out: &mut heapless::Vec<Neighbor, { crate::config::MAX_DEVICES }>) {
		for router in &self.routers {
			if out.push(*router).is_err() {
				break;
			}
		}
	}

	fn receive_done(&mut self, packet: &RadioPacket, result: Result<(), RadioError>) {
		self.received.push((packet.psdu.to_vec(), result));
	}

	fn transmit_done(
		&mut self,
		packet: &RadioPacket,
		ack_received: bool,
		result: Result<(), RadioError>,
	) {
		self.transmitted.push((packet.context, ack_received, result));
	}

	fn active_scan_done(&mut self, result: Option<&ActiveScanResult>) {
		self.active_results.push(result.copied());
	}

	fn energy_scan_done(&mut self, result: Option<&EnergyScanResult>) {
		self.energy_results.push(result.copied());
	}
}

/// Deterministic entropy for EUI-64 generation in tests.
pub(crate) struct FixedEntropy(pub u8);

impl Entropy for FixedEntropy {
	fn fill(&mut self, buffer: &mut [u8]) {
		buffer.fill(self.0);
	}
}
