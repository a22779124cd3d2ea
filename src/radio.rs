//! The platform radio itself: the synchronous surface the stack calls on its
//! main loop, and the worker-side half that receives the co-processor's
//! asynchronous callbacks.
//!
//! [`Radio::new`] returns both halves. The transport drives [`RadioEvents`]
//! from its worker thread; the main loop calls [`Radio::process`] once per
//! iteration to run at most one parked stack callback under the barrier.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use bitflags::bitflags;
use log::{debug, error, warn};

use crate::barrier::Rendezvous;
use crate::config::{
	CHANNEL_MAX, CHANNEL_MIN, DEFAULT_KEY_SOURCE, DEFAULT_MAX_BE, DEFAULT_MAX_CSMA_BACKOFFS,
	DEFAULT_MAX_FRAME_RETRIES, DEFAULT_TRANSACTION_PERSISTENCE, EXT_PAN_ID_LEN, LQI_MODE_ED,
	NETWORK_NAME_LEN, RadioConfig,
};
use crate::error::{RadioError, Result};
use crate::frame::{FullAddress, MacAddress, RadioPacket, SecuritySpec, codec, lqi_to_dbm};
use crate::mac::{
	BeaconNotifyIndication, DataConfirm, DataIndication, HwmeAttribute, MacCallbacks, MacStatus,
	MacTransport, PibAttribute, PollRequest, ScanConfirm, ScanRequest, ScanType,
};
use crate::pending::{PendingError, PendingTable};
use crate::scan::{self, ScanState};
use crate::slot::ReceiveSlot;
use crate::stack::{StateChangeFlags, ThreadStack};
use crate::state::{RadioState, StateMachine};
use crate::tables::Synchronizer;

/// Supported transmit power range of the part, in dBm.
const TX_POWER_MIN: i8 = -32;
const TX_POWER_MAX: i8 = 8;

bitflags! {
	/// Capabilities advertised to the stack.
	#[derive(Debug, Clone, Copy, PartialEq, Eq)]
	pub struct RadioCaps: u8 {
		/// The co-processor times out unacknowledged transmissions itself.
		const ACK_TIMEOUT = 1 << 0;
	}
}

/// What the worker parks for the main loop. One event, one stack callback.
#[derive(Debug)]
pub(crate) enum RadioEvent {
	/// The decoded frame is parked in the receive slot.
	FrameReceived,
	TransmitDone {
		packet: RadioPacket,
		status: MacStatus,
	},
	BeaconSeen(crate::stack::ActiveScanResult),
	ScanComplete(ScanConfirm),
}

/// Cross-thread cells shared between the two halves.
struct Shared {
	pending: PendingTable,
	slot: ReceiveSlot,
	events: Rendezvous<RadioEvent>,
	/// Written by the main thread only; the worker reads it to stamp
	/// inbound frames with the channel they arrived on.
	channel: AtomicU8,
}

/// Main-loop half of the platform radio.
pub struct Radio<M> {
	mac: M,
	shared: Arc<Shared>,
	config: RadioConfig,
	machine: StateMachine,
	synchronizer: Synchronizer,
	activity: crate::activity::ActivityCache,
	scan: Option<ScanState>,
	tx: RadioPacket,
	pan_id: u16,
	eui64: Option<[u8; 8]>,
	promiscuous: bool,
	rx_on_when_idle: bool,
	network_name: [u8; NETWORK_NAME_LEN],
	extended_pan_id: [u8; EXT_PAN_ID_LEN],
}

impl<M: MacTransport> Radio<M> {
	/// Creates both halves. Hand [`RadioEvents`] to the transport driver; it
	/// must invoke the callbacks from a single worker thread.
	pub fn new(mac: M, mut config: RadioConfig) -> (Self, RadioEvents) {
		let shared = Arc::new(Shared {
			pending: PendingTable::new(),
			slot: ReceiveSlot::new(),
			events: Rendezvous::new(config.waker.take()),
			channel: AtomicU8::new(CHANNEL_MIN),
		});
		let radio = Self {
			mac,
			shared: Arc::clone(&shared),
			config,
			machine: StateMachine::new(),
			synchronizer: Synchronizer::new(),
			activity: crate::activity::ActivityCache::new(),
			scan: None,
			tx: RadioPacket::new(),
			pan_id: 0xffff,
			eui64: None,
			promiscuous: false,
			rx_on_when_idle: false,
			network_name: [0u8; NETWORK_NAME_LEN],
			extended_pan_id: [0u8; EXT_PAN_ID_LEN],
		};
		(radio, RadioEvents { shared })
	}

	/// Resets the MAC and writes the initialization defaults.
	pub fn init(&mut self, entropy: &mut dyn crate::stack::Entropy) -> Result<()> {
		self.mac.mlme_reset(true).map_err(command_failed)?;

		self.pib_set(PibAttribute::MacSecurityEnabled, &[1])?;
		self.pib_set(PibAttribute::MacMaxFrameRetries, &[DEFAULT_MAX_FRAME_RETRIES])?;
		self.pib_set(PibAttribute::MacMaxCsmaBackoffs, &[DEFAULT_MAX_CSMA_BACKOFFS])?;
		self.pib_set(PibAttribute::MacMaxBe, &[DEFAULT_MAX_BE])?;
		self.pib_set(PibAttribute::MacDefaultKeySource, &DEFAULT_KEY_SOURCE)?;
		self.pib_set(
			PibAttribute::MacTransactionPersistenceTime,
			&DEFAULT_TRANSACTION_PERSISTENCE.to_le_bytes(),
		)?;
		self.mac
			.hwme_set(HwmeAttribute::LqiMode, &[LQI_MODE_ED])
			.map_err(command_failed)?;

		if self.eui64.is_none() {
			self.eui64 = Some(match self.config.eui64 {
				Some(eui64) => eui64,
				None => {
					let mut eui64 = [0u8; 8];
					entropy.fill(&mut eui64);
					// locally administered, not a group address
					eui64[0] = (eui64[0] | 0x02) & !0x01;
					debug!("minted EUI-64 {eui64:02x?}");
					eui64
				}
			});
		}
		Ok(())
	}

	/// MAC reset at process exit: pending handles and any scan in flight are
	/// forgotten.
	pub fn stop(&mut self) {
		if let Err(status) = self.mac.mlme_reset(false) {
			warn!("MLME-RESET at stop failed with status {status:?}");
		}
		self.shared.pending.clear();
		self.activity.clear();
		self.scan = None;
		self.machine.reset();
	}

	pub fn state(&self) -> RadioState {
		self.machine.current()
	}

	pub fn caps(&self) -> RadioCaps {
		RadioCaps::ACK_TIMEOUT
	}

	pub fn enable(&mut self) -> Result<()> {
		self.machine.enable()
	}

	pub fn disable(&mut self) -> Result<()> {
		self.machine.disable()
	}

	/// Enters sleep. Deliberately no co-processor command: rx-on-when-idle
	/// already controls the receiver, and hardware low-power entry is the
	/// platform's call via [`RadioConfig::low_power_hook`].
	pub fn sleep(&mut self) -> Result<()> {
		self.machine.sleep()?;
		if let Some(hook) = self.config.low_power_hook {
			hook(true);
		}
		Ok(())
	}

	/// Starts (or keeps) receiving on a channel.
	pub fn receive(&mut self, channel: u8) -> Result<()> {
		if !(CHANNEL_MIN..=CHANNEL_MAX).contains(&channel) {
			return Err(RadioError::Abort);
		}
		let was_sleeping = self.machine.current() == RadioState::Sleep;
		self.machine.receive()?;
		if was_sleeping {
			if let Some(hook) = self.config.low_power_hook {
				hook(false);
			}
		}
		self.set_channel(channel)
	}

	pub fn set_rx_on_when_idle(&mut self, on: bool) -> Result<()> {
		self.pib_set(PibAttribute::MacRxOnWhenIdle, &[u8::from(on)])?;
		self.rx_on_when_idle = on;
		Ok(())
	}

	pub fn rx_on_when_idle(&self) -> bool {
		self.rx_on_when_idle
	}

	/// The buffer the stack fills before calling [`transmit`](Self::transmit).
	pub fn transmit_buffer(&mut self) -> &mut RadioPacket {
		&mut self.tx
	}

	/// Submits the transmit buffer. Completion arrives through the stack's
	/// transmit-done callback once the confirm is serviced.
	///
	/// A direct submission occupies the radio until its confirm; an indirect
	/// one is queued on the co-processor for the polling child and leaves the
	/// radio receiving, which is how several in-transit records coexist.
	pub fn transmit(&mut self) -> Result<()> {
		let mut request = codec::encode(&self.tx).map_err(|error| {
			warn!("rejecting transmit submission: {error}");
			RadioError::Abort
		})?;

		let direct = !self.tx.indirect;
		if direct {
			self.machine.transmit()?;
		} else if self.machine.current() != RadioState::Receive {
			return Err(RadioError::Busy);
		}
		if let Err(error) = self.set_channel(self.tx.channel) {
			if direct {
				let _ = self.machine.transmit_done();
			}
			return Err(error);
		}

		let handle = match self.shared.pending.allocate(self.tx.clone()) {
			Ok(handle) => handle,
			Err(error) => {
				if direct {
					let _ = self.machine.transmit_done();
				}
				return Err(match error {
					PendingError::Overflow => RadioError::Busy,
					PendingError::UnknownHandle(_) => RadioError::Failed,
				});
			}
		};
		request.msdu_handle = handle;

		if let Err(status) = self.mac.mcps_data_request(&request) {
			if let Err(error) = self.shared.pending.take(handle) {
				warn!("rolling back a rejected submission: {error}");
			}
			if direct {
				let _ = self.machine.transmit_done();
			}
			return Err(command_failed(status));
		}
		Ok(())
	}

	/// Issues a data poll toward the parent so queued indirect frames can be
	/// delivered. `Ok(false)` means the parent had nothing for us.
	pub fn poll(&mut self, stack: &impl ThreadStack) -> Result<bool> {
		let Some(parent) = stack.parent() else {
			return Err(RadioError::Abort);
		};
		let request = PollRequest {
			coord: FullAddress {
				pan_id: self.pan_id,
				address: MacAddress::Short(parent.short_addr),
			},
			security: SecuritySpec::default(),
		};
		match self.mac.mlme_poll(&request) {
			Ok(()) => Ok(true),
			Err(MacStatus::NoData) => Ok(false),
			Err(status) => Err(command_failed(status)),
		}
	}

	/// Runs at most one worker-parked stack callback. Call once per
	/// main-loop iteration, after the poll wakes up.
	pub fn process(&mut self, stack: &mut impl ThreadStack) {
		let Some(event) = self.shared.events.begin() else {
			return;
		};
		match event {
			RadioEvent::FrameReceived => match self.shared.slot.take() {
				Some(packet) => stack.receive_done(&packet, Ok(())),
				None => warn!("receive event with an empty slot"),
			},
			RadioEvent::TransmitDone { packet, status } => {
				if self.machine.current() == RadioState::Transmit {
					let _ = self.machine.transmit_done();
				}
				let result = match status {
					MacStatus::Success => Ok(()),
					status => Err(RadioError::from(status)),
				};
				// the co-processor consumed any acknowledgment itself
				stack.transmit_done(&packet, false, result);
			}
			RadioEvent::BeaconSeen(result) => {
				if self.scan.is_some() {
					stack.active_scan_done(Some(&result));
				} else {
					warn!("beacon result outside an active scan");
				}
			}
			RadioEvent::ScanComplete(confirm) => self.finish_scan(stack, confirm),
		}
		self.shared.events.complete();
	}

	pub fn active_scan(&mut self, channel_mask: u32, duration_ms: u32) -> Result<()> {
		self.start_scan(ScanType::Active, channel_mask, duration_ms)
	}

	pub fn energy_scan(&mut self, channel_mask: u32, duration_ms: u32) -> Result<()> {
		self.start_scan(ScanType::Energy, channel_mask, duration_ms)
	}

	fn start_scan(&mut self, kind: ScanType, channel_mask: u32, duration_ms: u32) -> Result<()> {
		if self.scan.is_some() || self.machine.current() == RadioState::Disabled {
			return Err(RadioError::Busy);
		}
		let mask = scan::effective_mask(channel_mask);
		let request = ScanRequest {
			scan_type: kind,
			scan_channels: mask,
			scan_duration: scan::duration_exponent(duration_ms, kind),
		};
		self.mac.mlme_scan(&request).map_err(command_failed)?;
		self.scan = Some(ScanState {
			kind,
			mask,
			prior_channel: self.channel(),
		});
		Ok(())
	}

	fn finish_scan(&mut self, stack: &mut impl ThreadStack, confirm: ScanConfirm) {
		let Some(state) = self.scan.take() else {
			warn!("scan confirm without a scan in flight");
			return;
		};
		if confirm.status != MacStatus::Success {
			debug!("scan ended with status {:?}", confirm.status);
		}
		match state.kind {
			ScanType::Energy => {
				let mut mask = state.mask;
				for &energy in &confirm.result_list {
					match scan::pair_energy(&mut mask, energy) {
						Some(result) => stack.energy_scan_done(Some(&result)),
						None => {
							warn!("energy result without a channel left in the mask");
							break;
						}
					}
				}
				stack.energy_scan_done(None);
			}
			_ => stack.active_scan_done(None),
		}
		// put the stack's channel selection back
		if let Err(status) = self
			.mac
			.mlme_set(PibAttribute::PhyCurrentChannel, 0, &[state.prior_channel])
		{
			warn!("failed to restore channel after scan: {status:?}");
		} else {
			self.shared
				.channel
				.store(state.prior_channel, Ordering::Relaxed);
		}
	}

	/// Stack state-change hook feeding the table synchronizer.
	pub fn state_changed(&mut self, stack: &impl ThreadStack, flags: StateChangeFlags) {
		let channel = self.channel();
		self.synchronizer
			.handle(&mut self.mac, stack, flags, self.pan_id, channel);
	}

	/// Liveness query for a sleepy child, by extended address in network
	/// order.
	pub fn is_device_active(&mut self, ext_addr: [u8; 8]) -> Result<bool> {
		self.activity.is_active(&mut self.mac, ext_addr)
	}

	pub fn set_pan_id(&mut self, pan_id: u16) -> Result<()> {
		self.pib_set(PibAttribute::MacPanId, &pan_id.to_le_bytes())?;
		self.pan_id = pan_id;
		Ok(())
	}

	pub fn pan_id(&self) -> u16 {
		self.pan_id
	}

	pub fn set_short_address(&mut self, short_addr: u16) -> Result<()> {
		self.pib_set(PibAttribute::MacShortAddress, &short_addr.to_le_bytes())
	}

	/// Writes the interface's own extended address, given in network order.
	pub fn set_extended_address(&mut self, ext_addr: [u8; 8]) -> Result<()> {
		let mut wire = ext_addr;
		wire.reverse();
		self.pib_set(PibAttribute::NsIeeeAddress, &wire)
	}

	pub fn set_network_name(&mut self, name: &str) -> Result<()> {
		if name.len() > NETWORK_NAME_LEN {
			return Err(RadioError::Abort);
		}
		self.network_name = [0u8; NETWORK_NAME_LEN];
		self.network_name[..name.len()].copy_from_slice(name.as_bytes());
		self.update_beacon_payload()
	}

	pub fn set_extended_pan_id(&mut self, extended_pan_id: [u8; EXT_PAN_ID_LEN]) -> Result<()> {
		self.extended_pan_id = extended_pan_id;
		self.update_beacon_payload()
	}

	/// The persisted EUI-64, all zeros before the first `init`.
	pub fn eui64(&self) -> [u8; 8] {
		self.eui64.unwrap_or_default()
	}

	pub fn promiscuous(&self) -> bool {
		self.promiscuous
	}

	pub fn set_promiscuous(&mut self, on: bool) -> Result<()> {
		self.pib_set(PibAttribute::MacPromiscuousMode, &[u8::from(on)])?;
		self.promiscuous = on;
		Ok(())
	}

	/// Latest energy-detect reading, as dBm.
	pub fn noise_floor(&mut self) -> Result<i8> {
		let mut value = [0u8; 1];
		self.mac
			.hwme_get(HwmeAttribute::EdValue, &mut value)
			.map_err(command_failed)?;
		Ok(lqi_to_dbm(value[0]))
	}

	pub fn transmit_power(&mut self) -> Result<i8> {
		let mut value = [0u8; 1];
		self.mac
			.hwme_get(HwmeAttribute::TxPower, &mut value)
			.map_err(command_failed)?;
		Ok(value[0] as i8)
	}

	pub fn set_transmit_power(&mut self, dbm: i8) -> Result<()> {
		let dbm = dbm.clamp(TX_POWER_MIN, TX_POWER_MAX);
		self.mac
			.hwme_set(HwmeAttribute::TxPower, &[dbm as u8])
			.map_err(command_failed)
	}

	pub fn channel(&self) -> u8 {
		self.shared.channel.load(Ordering::Relaxed)
	}

	fn set_channel(&mut self, channel: u8) -> Result<()> {
		if channel == self.channel() {
			return Ok(());
		}
		self.pib_set(PibAttribute::PhyCurrentChannel, &[channel])?;
		self.shared.channel.store(channel, Ordering::Relaxed);
		Ok(())
	}

	fn pib_set(&mut self, attribute: PibAttribute, value: &[u8]) -> Result<()> {
		self.mac
			.mlme_set(attribute, 0, value)
			.map_err(command_failed)
	}

	fn update_beacon_payload(&mut self) -> Result<()> {
		let mut payload = [0u8; 2 + NETWORK_NAME_LEN + EXT_PAN_ID_LEN];
		payload[0] = 3; // Thread protocol id
		payload[1] = 1 << 4; // version 1, joining not permitted
		payload[2..2 + NETWORK_NAME_LEN].copy_from_slice(&self.network_name);
		payload[2 + NETWORK_NAME_LEN..].copy_from_slice(&self.extended_pan_id);
		self.pib_set(PibAttribute::MacBeaconPayload, &payload)?;
		self.pib_set(PibAttribute::MacBeaconPayloadLength, &[payload.len() as u8])
	}
}

fn command_failed(status: MacStatus) -> RadioError {
	warn!("co-processor command failed with status {status:?}");
	RadioError::Failed
}

/// Worker-side half: the transport invokes these from its worker thread.
///
/// Each callback either drops its input with a warning or parks exactly one
/// event for the main loop, blocking until [`Radio::process`] has serviced
/// it. Indication-side malformations never reach the stack.
pub struct RadioEvents {
	shared: Arc<Shared>,
}

impl MacCallbacks for RadioEvents {
	fn mcps_data_indication(&self, indication: DataIndication) {
		let channel = self.shared.channel.load(Ordering::Relaxed);
		match codec::decode(&indication, channel) {
			Ok(packet) => {
				// blocks while the previous frame is still undrained
				self.shared.slot.deposit(packet);
				self.shared.events.post(RadioEvent::FrameReceived);
			}
			Err(error) => warn!("dropping malformed indication: {error}"),
		}
	}

	fn mcps_data_confirm(&self, confirm: DataConfirm) {
		match self.shared.pending.take(confirm.msdu_handle) {
			Ok(packet) => self.shared.events.post(RadioEvent::TransmitDone {
				packet,
				status: confirm.status,
			}),
			Err(error) => warn!("dropping confirm: {error}"),
		}
	}

	fn mlme_beacon_notify(&self, indication: BeaconNotifyIndication) {
		if let Some(result) = scan::parse_beacon(&indication) {
			self.shared.events.post(RadioEvent::BeaconSeen(result));
		}
	}

	fn mlme_scan_confirm(&self, confirm: ScanConfirm) {
		self.shared.events.post(RadioEvent::ScanComplete(confirm));
	}

	fn dispatch(&self, frame: &[u8]) -> bool {
		debug!("unhandled co-processor frame of {} bytes", frame.len());
		false
	}

	fn driver_failure(&self, reason: &str) -> ! {
		error!("co-processor transport failed: {reason}");
		std::process::abort();
	}
}
