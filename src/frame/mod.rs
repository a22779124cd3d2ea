//! PHY-level PDU representation and the 802.15.4 header vocabulary shared by
//! the codec, the MCPS parameter sets and the table synchronizer.

pub mod codec;

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Largest PSDU a 2.4 GHz O-QPSK PHY carries.
pub const MAX_PSDU_LEN: usize = 127;

/// Largest MAC payload (aMaxMacPayloadSize).
pub const MAX_MSDU_LEN: usize = 118;

/// Bytes the frame check sequence occupies on the wire. The co-processor
/// computes and strips it; the PDU only reserves the space.
pub const FCS_LEN: usize = 2;

/// MAC frame type, frame control bits 0..2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum FrameType {
	Beacon = 0,
	Data = 1,
	Acknowledgment = 2,
	MacCommand = 3,
}

/// Addressing mode for either end of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum AddressMode {
	None = 0,
	Reserved = 1,
	Short = 2,
	Extended = 3,
}

/// A MAC address as carried in MCPS parameter sets.
///
/// Extended addresses are held in wire order (little-endian). The stack hands
/// out extended addresses in network order; reversal happens at the trait
/// boundaries, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MacAddress {
	#[default]
	None,
	Short(u16),
	Extended([u8; 8]),
}

impl MacAddress {
	pub fn mode(&self) -> AddressMode {
		match self {
			MacAddress::None => AddressMode::None,
			MacAddress::Short(_) => AddressMode::Short,
			MacAddress::Extended(_) => AddressMode::Extended,
		}
	}

	/// Wire length of the address field.
	pub fn wire_len(&self) -> usize {
		match self {
			MacAddress::None => 0,
			MacAddress::Short(_) => 2,
			MacAddress::Extended(_) => 8,
		}
	}

	pub fn is_none(&self) -> bool {
		matches!(self, MacAddress::None)
	}
}

/// An address together with its PAN, the way MCPS primitives carry it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FullAddress {
	pub pan_id: u16,
	pub address: MacAddress,
}

/// Auxiliary security header parameters.
///
/// Level 0 means the frame is unsecured and every other field is meaningless.
/// `key_source` is only meaningful for its first [`key_source_len`] bytes.
///
/// [`key_source_len`]: SecuritySpec::key_source_len
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SecuritySpec {
	pub level: u8,
	pub key_id_mode: u8,
	pub key_source: [u8; 8],
	pub key_index: u8,
}

impl SecuritySpec {
	pub fn is_none(&self) -> bool {
		self.level == 0
	}

	/// Bytes of key source present for the key-id mode: 0, 0, 4 or 8.
	pub fn key_source_len(&self) -> usize {
		match self.key_id_mode {
			2 => 4,
			3 => 8,
			_ => 0,
		}
	}

	/// Bytes the key identifier field occupies: key source plus, for any
	/// mode other than 0, one key index byte.
	pub fn key_id_len(&self) -> usize {
		if self.key_id_mode == 0 {
			0
		} else {
			self.key_source_len() + 1
		}
	}

	/// Wire length of the auxiliary security header.
	pub fn aux_len(&self) -> usize {
		if self.is_none() {
			0
		} else {
			// security control + frame counter + key identifier
			1 + 4 + self.key_id_len()
		}
	}

	/// MIC length for the security level.
	pub fn mic_len(&self) -> usize {
		mic_len(self.level)
	}
}

/// MIC length for a security level: 0, 4, 8 or 16 bytes.
pub fn mic_len(level: u8) -> usize {
	match 2usize << (level & 0x03) {
		2 => 0,
		n => n,
	}
}

/// The co-processor reports link quality as an energy estimate; fold it into
/// a signed dBm figure.
pub(crate) fn lqi_to_dbm(lqi: u8) -> i8 {
	((i16::from(lqi) - 256) / 2) as i8
}

/// The first two PSDU bytes, little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameControl(pub u16);

impl FrameControl {
	const SECURITY_ENABLED: u16 = 1 << 3;
	const FRAME_PENDING: u16 = 1 << 4;
	const ACK_REQUEST: u16 = 1 << 5;
	const PAN_ID_COMPRESSION: u16 = 1 << 6;

	pub fn from_le_bytes(bytes: [u8; 2]) -> Self {
		Self(u16::from_le_bytes(bytes))
	}

	pub fn to_le_bytes(self) -> [u8; 2] {
		self.0.to_le_bytes()
	}

	pub fn frame_type(self) -> Result<FrameType, u8> {
		let bits = (self.0 & 0x07) as u8;
		FrameType::try_from(bits).map_err(|_| bits)
	}

	pub fn security_enabled(self) -> bool {
		self.0 & Self::SECURITY_ENABLED != 0
	}

	pub fn frame_pending(self) -> bool {
		self.0 & Self::FRAME_PENDING != 0
	}

	pub fn ack_request(self) -> bool {
		self.0 & Self::ACK_REQUEST != 0
	}

	pub fn pan_id_compression(self) -> bool {
		self.0 & Self::PAN_ID_COMPRESSION != 0
	}

	pub fn dst_addr_mode(self) -> AddressMode {
		address_mode_bits(((self.0 >> 10) & 0x03) as u8)
	}

	pub fn frame_version(self) -> u8 {
		((self.0 >> 12) & 0x03) as u8
	}

	pub fn src_addr_mode(self) -> AddressMode {
		address_mode_bits(((self.0 >> 14) & 0x03) as u8)
	}

	/// Synthesize a frame control word for an inbound frame.
	pub fn compose(
		frame_type: FrameType,
		security_enabled: bool,
		pan_id_compression: bool,
		dst_addr_mode: AddressMode,
		frame_version: u8,
		src_addr_mode: AddressMode,
	) -> Self {
		let mut word = u16::from(u8::from(frame_type)) & 0x07;
		if security_enabled {
			word |= Self::SECURITY_ENABLED;
		}
		if pan_id_compression {
			word |= Self::PAN_ID_COMPRESSION;
		}
		word |= u16::from(u8::from(dst_addr_mode)) << 10;
		word |= u16::from(frame_version & 0x03) << 12;
		word |= u16::from(u8::from(src_addr_mode)) << 14;
		Self(word)
	}
}

fn address_mode_bits(bits: u8) -> AddressMode {
	match bits & 0x03 {
		0 => AddressMode::None,
		1 => AddressMode::Reserved,
		2 => AddressMode::Short,
		_ => AddressMode::Extended,
	}
}

/// A PHY-level PDU as the stack sees it: the MAC frame exactly as a sniffer
/// would, MHR first, trailed by the space the MIC and FCS occupy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RadioPacket {
	/// Frame bytes; the length is the PSDU length (1..=127).
	pub psdu: heapless::Vec<u8, MAX_PSDU_LEN>,
	/// Channel the frame was or will be on, 11..=26.
	pub channel: u8,
	/// Link quality of reception, 0..=255.
	pub lqi: u8,
	/// Power estimate in dBm.
	pub rssi: i8,
	/// Queue on the co-processor for a polling child instead of
	/// transmitting immediately.
	pub indirect: bool,
	/// Opaque caller context routed back through the transmit-done callback.
	pub context: usize,
}

impl RadioPacket {
	pub fn new() -> Self {
		Self {
			psdu: heapless::Vec::new(),
			channel: crate::config::CHANNEL_MIN,
			lqi: 0,
			rssi: 0,
			indirect: false,
			context: 0,
		}
	}

	pub fn frame_control(&self) -> Option<FrameControl> {
		let bytes = [*self.psdu.first()?, *self.psdu.get(1)?];
		Some(FrameControl::from_le_bytes(bytes))
	}
}

impl Default for RadioPacket {
	fn default() -> Self {
		Self::new()
	}
}
