//! Scan translation: stack scan requests to MLME-SCAN parameters, beacon
//! notifications and energy lists back to stack scan results.

use log::warn;

use crate::config::{CHANNEL_MASK_ALL, EXT_PAN_ID_LEN, NETWORK_NAME_LEN};
use crate::frame::lqi_to_dbm;
use crate::mac::{BeaconNotifyIndication, ScanType};
use crate::stack::{ActiveScanResult, EnergyScanResult};

/// Thread beacon payload protocol identifier.
const BEACON_PROTOCOL_ID: u8 = 3;

/// Thread beacon payload protocol version.
const BEACON_VERSION: u8 = 1;

/// Joining-permitted bit in the beacon payload flags nibble.
const BEACON_JOINABLE: u8 = 1 << 0;

/// What a scan in flight remembers until its confirm arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ScanState {
	pub kind: ScanType,
	pub mask: u32,
	pub prior_channel: u8,
}

/// Scan duration in milliseconds to the MAC's base-duration exponent.
///
/// One base superframe duration is roughly 15 ms, so the exponent is
/// `log2(ms / 15)` clamped to the legal 0..=14. Sub-50 ms requests fall back
/// to the defaults a human would pick: 5 for active scans, 6 for energy
/// scans.
pub(crate) fn duration_exponent(duration_ms: u32, kind: ScanType) -> u8 {
	if duration_ms < 50 {
		return match kind {
			ScanType::Energy => 6,
			_ => 5,
		};
	}
	(duration_ms / 15).ilog2().clamp(0, 14) as u8
}

/// An empty mask means "everything": restrict anything else to 11..=26.
pub(crate) fn effective_mask(mask: u32) -> u32 {
	if mask == 0 {
		CHANNEL_MASK_ALL
	} else {
		mask & CHANNEL_MASK_ALL
	}
}

/// Extracts a scan result from a beacon notification, if the beacon carries
/// a well-formed Thread payload.
pub(crate) fn parse_beacon(indication: &BeaconNotifyIndication) -> Option<ActiveScanResult> {
	let payload = indication.sdu.as_slice();
	if payload.len() < 2 + NETWORK_NAME_LEN + EXT_PAN_ID_LEN {
		warn!("beacon payload of {} bytes is too short", payload.len());
		return None;
	}
	if payload[0] != BEACON_PROTOCOL_ID {
		warn!("beacon with foreign protocol id {}", payload[0]);
		return None;
	}
	let version = payload[1] >> 4;
	if version != BEACON_VERSION {
		warn!("beacon with unsupported version {version}");
		return None;
	}

	let mut network_name = [0u8; NETWORK_NAME_LEN];
	network_name.copy_from_slice(&payload[2..2 + NETWORK_NAME_LEN]);
	let mut extended_pan_id = [0u8; EXT_PAN_ID_LEN];
	extended_pan_id
		.copy_from_slice(&payload[2 + NETWORK_NAME_LEN..2 + NETWORK_NAME_LEN + EXT_PAN_ID_LEN]);

	let descriptor = &indication.pan_descriptor;
	Some(ActiveScanResult {
		pan_id: descriptor.coord.pan_id,
		channel: descriptor.logical_channel,
		rssi: lqi_to_dbm(descriptor.link_quality),
		lqi: descriptor.link_quality,
		version,
		joinable: payload[1] & BEACON_JOINABLE != 0,
		network_name,
		extended_pan_id,
	})
}

/// Pairs one energy-detect byte with the lowest channel still set in the
/// mask, consuming that bit.
pub(crate) fn pair_energy(mask: &mut u32, energy: u8) -> Option<EnergyScanResult> {
	if *mask == 0 {
		return None;
	}
	let channel = mask.trailing_zeros() as u8;
	*mask &= *mask - 1;
	Some(EnergyScanResult {
		channel,
		max_rssi: lqi_to_dbm(energy),
	})
}
