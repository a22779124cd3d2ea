//! The co-processor's MAC service surface, as this crate consumes it.
//!
//! Synchronous MLME/MCPS/HWME requests travel through [`MacTransport`],
//! implemented by the transport driver over its serialized command channel.
//! Asynchronous indications and confirms come back through [`MacCallbacks`],
//! invoked on the transport's worker thread.

use bitflags::bitflags;
use num_enum::{FromPrimitive, IntoPrimitive, TryFromPrimitive};

use crate::frame::{AddressMode, FullAddress, MAX_MSDU_LEN, SecuritySpec};

/// Longest beacon payload (aMaxBeaconPayloadLength).
pub const MAX_BEACON_PAYLOAD: usize = 52;

/// Longest energy-detect result list a scan confirm carries.
pub const MAX_SCAN_RESULTS: usize = 16;

/// MAC status byte as defined by IEEE 802.15.4-2006 Table 78.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum MacStatus {
	Success = 0x00,
	ChannelAccessFailure = 0xe1,
	Denied = 0xe2,
	SecurityError = 0xe4,
	FrameTooLong = 0xe5,
	InvalidHandle = 0xe7,
	InvalidParameter = 0xe8,
	NoAck = 0xe9,
	NoBeacon = 0xea,
	NoData = 0xeb,
	NoShortAddress = 0xec,
	TransactionExpired = 0xf0,
	TransactionOverflow = 0xf1,
	UnavailableKey = 0xf3,
	UnsupportedAttribute = 0xf4,
	InvalidAddress = 0xf5,
	InvalidIndex = 0xf9,
	LimitReached = 0xfa,
	ReadOnly = 0xfb,
	ScanInProgress = 0xfc,
	#[num_enum(catch_all)]
	Other(u8),
}

/// PIB attribute identifiers for MLME-SET/GET.
///
/// Standard identifiers follow IEEE 802.15.4-2006 Table 71/88; `NsIeeeAddress`
/// is the vendor attribute carrying the interface's own EUI-64.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive)]
#[repr(u8)]
pub enum PibAttribute {
	PhyCurrentChannel = 0x00,
	PhyTransmitPower = 0x02,
	PhyCcaMode = 0x03,
	MacAckWaitDuration = 0x40,
	MacBeaconPayload = 0x45,
	MacBeaconPayloadLength = 0x46,
	MacDsn = 0x4c,
	MacMaxCsmaBackoffs = 0x4e,
	MacMinBe = 0x4f,
	MacPanId = 0x50,
	MacPromiscuousMode = 0x51,
	MacRxOnWhenIdle = 0x52,
	MacShortAddress = 0x53,
	MacTransactionPersistenceTime = 0x55,
	MacMaxBe = 0x57,
	MacMaxFrameRetries = 0x59,
	MacKeyTable = 0x71,
	MacKeyTableEntries = 0x72,
	MacDeviceTable = 0x73,
	MacDeviceTableEntries = 0x74,
	MacSecurityLevelTable = 0x75,
	MacSecurityLevelTableEntries = 0x76,
	MacFrameCounter = 0x77,
	MacDefaultKeySource = 0x7c,
	MacSecurityEnabled = 0x7d,
	NsIeeeAddress = 0xff,
}

/// Vendor hardware attribute identifiers for HWME-SET/GET.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive)]
#[repr(u8)]
pub enum HwmeAttribute {
	PowerCon = 0x00,
	ChipId = 0x01,
	TxPower = 0x02,
	CcaMode = 0x03,
	EdThreshold = 0x04,
	EdValue = 0x06,
	LqiMode = 0x08,
}

/// Scan kind for MLME-SCAN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum ScanType {
	Energy = 0,
	Active = 1,
	Passive = 2,
	Orphan = 3,
}

bitflags! {
	/// MCPS-DATA.request TxOptions word.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
	pub struct TxOptions: u8 {
		const ACKNOWLEDGED = 1 << 0;
		const GTS = 1 << 1;
		const INDIRECT = 1 << 2;
	}
}

/// MCPS-DATA.request parameter set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataRequest {
	pub src_addr_mode: AddressMode,
	pub dst: FullAddress,
	pub msdu_handle: u8,
	pub tx_options: TxOptions,
	pub msdu: heapless::Vec<u8, MAX_MSDU_LEN>,
	pub security: SecuritySpec,
}

/// MCPS-DATA.indication parameter set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataIndication {
	pub src: FullAddress,
	pub dst: FullAddress,
	pub msdu: heapless::Vec<u8, MAX_MSDU_LEN>,
	pub mpdu_link_quality: u8,
	pub dsn: u8,
	pub security: SecuritySpec,
}

/// MCPS-DATA.confirm parameter set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataConfirm {
	pub msdu_handle: u8,
	pub status: MacStatus,
}

/// MLME-START.request parameter set, reduced to what a PAN coordinator
/// bring-up needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartRequest {
	pub pan_id: u16,
	pub logical_channel: u8,
	pub beacon_order: u8,
	pub superframe_order: u8,
	pub pan_coordinator: bool,
}

/// MLME-SCAN.request parameter set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanRequest {
	pub scan_type: ScanType,
	pub scan_channels: u32,
	pub scan_duration: u8,
}

/// MLME-SCAN.confirm parameter set. For energy scans `result_list` carries
/// one energy-detect byte per scanned channel in ascending channel order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfirm {
	pub status: MacStatus,
	pub scan_type: ScanType,
	pub unscanned_channels: u32,
	pub result_list: heapless::Vec<u8, MAX_SCAN_RESULTS>,
}

/// The PAN descriptor part of MLME-BEACON-NOTIFY.indication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanDescriptor {
	pub coord: FullAddress,
	pub logical_channel: u8,
	pub link_quality: u8,
}

/// MLME-BEACON-NOTIFY.indication parameter set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeaconNotifyIndication {
	pub bsn: u8,
	pub pan_descriptor: PanDescriptor,
	pub sdu: heapless::Vec<u8, MAX_BEACON_PAYLOAD>,
}

/// MLME-POLL.request parameter set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollRequest {
	pub coord: FullAddress,
	pub security: SecuritySpec,
}

/// Synchronous command surface of the co-processor.
///
/// Implementations serialize each request over the transport and block until
/// the matching synchronous confirm arrives. A non-success status is returned
/// as `Err`; the transport itself failing is reported through
/// [`MacCallbacks::driver_failure`].
pub trait MacTransport {
	fn mlme_set(
		&mut self,
		attribute: PibAttribute,
		index: u8,
		value: &[u8],
	) -> Result<(), MacStatus>;
	fn mlme_get(
		&mut self,
		attribute: PibAttribute,
		index: u8,
		out: &mut [u8],
	) -> Result<usize, MacStatus>;
	fn mlme_reset(&mut self, set_default_pib: bool) -> Result<(), MacStatus>;
	fn mlme_start(&mut self, request: &StartRequest) -> Result<(), MacStatus>;
	fn mlme_scan(&mut self, request: &ScanRequest) -> Result<(), MacStatus>;
	fn mlme_poll(&mut self, request: &PollRequest) -> Result<(), MacStatus>;
	fn mcps_data_request(&mut self, request: &DataRequest) -> Result<(), MacStatus>;
	fn hwme_set(&mut self, attribute: HwmeAttribute, value: &[u8]) -> Result<(), MacStatus>;
	fn hwme_get(&mut self, attribute: HwmeAttribute, out: &mut [u8]) -> Result<usize, MacStatus>;
}

/// Asynchronous upcall surface, invoked on the transport's worker thread.
pub trait MacCallbacks: Send {
	fn mcps_data_indication(&self, indication: DataIndication);
	fn mcps_data_confirm(&self, confirm: DataConfirm);
	fn mlme_beacon_notify(&self, indication: BeaconNotifyIndication);
	fn mlme_scan_confirm(&self, confirm: ScanConfirm);
	/// Generic hook for frames no other callback claims. Returns whether the
	/// frame was consumed.
	fn dispatch(&self, frame: &[u8]) -> bool;
	/// Transport-fatal error. Does not return; there is no recovery from a
	/// dead command channel.
	fn driver_failure(&self, reason: &str) -> !;
}
