//! Translation between PHY-level PDUs and MCPS-DATA parameter sets.
//!
//! Encode walks the MAC header of an outbound PSDU to recover the addressing
//! and security parameters the co-processor wants spelled out; decode runs
//! the same rules backwards to synthesize the header of an inbound frame from
//! the indication's parameters. Both directions go through [`HeaderView`], so
//! every field read is checked against the real buffer length instead of
//! trusting offsets promised elsewhere.

use thiserror::Error;

use crate::frame::{
	AddressMode, FCS_LEN, FrameControl, FrameType, FullAddress, MAX_PSDU_LEN, MacAddress,
	RadioPacket, SecuritySpec, lqi_to_dbm, mic_len,
};
use crate::mac::{DataIndication, DataRequest, TxOptions};

/// Why a frame could not be translated.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
	#[error("frame type {0:#04x} is not a data or MAC command frame")]
	UnsupportedFrameType(u8),
	#[error("reserved addressing mode")]
	ReservedAddressing,
	#[error("frame shorter than its declared header and footer")]
	Truncated,
	#[error("frame would exceed the PHY maximum")]
	FrameTooLong,
}

/// Checked positional reader over a MAC header.
struct HeaderView<'a> {
	buf: &'a [u8],
	pos: usize,
}

impl<'a> HeaderView<'a> {
	fn new(buf: &'a [u8]) -> Self {
		Self { buf, pos: 0 }
	}

	fn take(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
		let end = self.pos.checked_add(len).ok_or(CodecError::Truncated)?;
		let slice = self.buf.get(self.pos..end).ok_or(CodecError::Truncated)?;
		self.pos = end;
		Ok(slice)
	}

	fn u8(&mut self) -> Result<u8, CodecError> {
		Ok(self.take(1)?[0])
	}

	fn u16_le(&mut self) -> Result<u16, CodecError> {
		let bytes = self.take(2)?;
		Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
	}

	fn skip(&mut self, len: usize) -> Result<(), CodecError> {
		self.take(len).map(|_| ())
	}

	fn offset(&self) -> usize {
		self.pos
	}
}

fn read_address(view: &mut HeaderView<'_>, mode: AddressMode) -> Result<MacAddress, CodecError> {
	match mode {
		AddressMode::None => Ok(MacAddress::None),
		AddressMode::Reserved => Err(CodecError::ReservedAddressing),
		AddressMode::Short => Ok(MacAddress::Short(view.u16_le()?)),
		AddressMode::Extended => {
			let bytes = view.take(8)?;
			let mut addr = [0u8; 8];
			addr.copy_from_slice(bytes);
			Ok(MacAddress::Extended(addr))
		}
	}
}

fn read_security(view: &mut HeaderView<'_>) -> Result<SecuritySpec, CodecError> {
	let control = view.u8()?;
	let mut spec = SecuritySpec {
		level: control & 0x07,
		key_id_mode: (control >> 3) & 0x03,
		key_source: [0u8; 8],
		key_index: 0,
	};
	// frame counter is assigned by the MAC, not by us
	view.skip(4)?;
	let source_len = spec.key_source_len();
	if source_len != 0 {
		spec.key_source[..source_len].copy_from_slice(view.take(source_len)?);
	}
	if spec.key_id_mode != 0 {
		spec.key_index = view.u8()?;
	}
	Ok(spec)
}

/// Translate an outbound PDU into an MCPS-DATA.request parameter set.
///
/// The MSDU handle is left at zero; the caller assigns it when the in-transit
/// record is allocated.
pub fn encode(packet: &RadioPacket) -> Result<DataRequest, CodecError> {
	let psdu = packet.psdu.as_slice();
	let mut view = HeaderView::new(psdu);

	let fc_bytes = view.take(2)?;
	let fc = FrameControl::from_le_bytes([fc_bytes[0], fc_bytes[1]]);
	match fc.frame_type() {
		Ok(FrameType::Data) | Ok(FrameType::MacCommand) => {}
		Ok(other) => return Err(CodecError::UnsupportedFrameType(other.into())),
		Err(bits) => return Err(CodecError::UnsupportedFrameType(bits)),
	}

	// sequence number is assigned by the co-processor on transmit
	view.skip(1)?;

	let dst_mode = fc.dst_addr_mode();
	let src_mode = fc.src_addr_mode();
	if dst_mode == AddressMode::Reserved || src_mode == AddressMode::Reserved {
		return Err(CodecError::ReservedAddressing);
	}

	let mut dst = FullAddress::default();
	if dst_mode != AddressMode::None {
		dst.pan_id = view.u16_le()?;
		dst.address = read_address(&mut view, dst_mode)?;
	}
	if src_mode != AddressMode::None {
		if !fc.pan_id_compression() {
			// source PAN is only on the wire when not compressed
			view.skip(2)?;
		}
		read_address(&mut view, src_mode)?;
	}

	let security = if fc.security_enabled() {
		read_security(&mut view)?
	} else {
		SecuritySpec::default()
	};

	let header_len = view.offset();
	let footer_len = security.mic_len() + FCS_LEN;
	let payload_end = psdu
		.len()
		.checked_sub(footer_len)
		.filter(|end| *end >= header_len)
		.ok_or(CodecError::Truncated)?;

	let mut tx_options = TxOptions::empty();
	if fc.ack_request() {
		tx_options |= TxOptions::ACKNOWLEDGED;
	}
	if packet.indirect {
		tx_options |= TxOptions::INDIRECT;
	}

	let msdu = heapless::Vec::from_slice(&psdu[header_len..payload_end])
		.map_err(|_| CodecError::FrameTooLong)?;

	Ok(DataRequest {
		src_addr_mode: src_mode,
		dst,
		msdu_handle: 0,
		tx_options,
		msdu,
		security,
	})
}

fn push(psdu: &mut heapless::Vec<u8, MAX_PSDU_LEN>, bytes: &[u8]) -> Result<(), CodecError> {
	psdu.extend_from_slice(bytes)
		.map_err(|_| CodecError::FrameTooLong)
}

/// Synthesize an inbound PDU from an MCPS-DATA.indication parameter set.
///
/// The footer (MIC and FCS) is counted in the length but carries no
/// meaningful bytes; the co-processor already verified and stripped both.
pub fn decode(indication: &DataIndication, channel: u8) -> Result<RadioPacket, CodecError> {
	let dst_mode = indication.dst.address.mode();
	let src_mode = indication.src.address.mode();
	let pan_compression = !indication.dst.address.is_none()
		&& !indication.src.address.is_none()
		&& indication.src.pan_id == indication.dst.pan_id;
	let security_enabled = !indication.security.is_none();

	let fc = FrameControl::compose(
		FrameType::Data,
		security_enabled,
		pan_compression,
		dst_mode,
		// secured frames need the 2006 frame format
		if security_enabled { 1 } else { 0 },
		src_mode,
	);

	let mut psdu = heapless::Vec::new();
	push(&mut psdu, &fc.to_le_bytes())?;
	push(&mut psdu, &[indication.dsn])?;

	if !indication.dst.address.is_none() {
		push(&mut psdu, &indication.dst.pan_id.to_le_bytes())?;
		push_address(&mut psdu, indication.dst.address)?;
	}
	if !indication.src.address.is_none() {
		if !pan_compression {
			push(&mut psdu, &indication.src.pan_id.to_le_bytes())?;
		}
		push_address(&mut psdu, indication.src.address)?;
	}

	if security_enabled {
		let spec = &indication.security;
		let control = (spec.level & 0x07) | ((spec.key_id_mode & 0x03) << 3);
		push(&mut psdu, &[control])?;
		// frame counter was consumed by the co-processor's replay check
		push(&mut psdu, &[0u8; 4])?;
		let source_len = spec.key_source_len();
		push(&mut psdu, &spec.key_source[..source_len])?;
		if spec.key_id_mode != 0 {
			push(&mut psdu, &[spec.key_index])?;
		}
	}

	push(&mut psdu, indication.msdu.as_slice())?;

	// reserve footer space without inventing its content
	let footer_len = mic_len(indication.security.level) + FCS_LEN;
	if psdu.len() + footer_len > MAX_PSDU_LEN {
		return Err(CodecError::FrameTooLong);
	}
	psdu.resize(psdu.len() + footer_len, 0)
		.map_err(|_| CodecError::FrameTooLong)?;

	Ok(RadioPacket {
		psdu,
		channel,
		lqi: indication.mpdu_link_quality,
		rssi: lqi_to_dbm(indication.mpdu_link_quality),
		indirect: false,
		context: 0,
	})
}

fn push_address(
	psdu: &mut heapless::Vec<u8, MAX_PSDU_LEN>,
	address: MacAddress,
) -> Result<(), CodecError> {
	match address {
		MacAddress::None => Ok(()),
		MacAddress::Short(short) => push(psdu, &short.to_le_bytes()),
		MacAddress::Extended(ext) => push(psdu, &ext),
	}
}
