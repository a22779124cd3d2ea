//! End-to-end scenarios across the public surface: a scripted co-processor,
//! a recording stack, and a real worker thread driving the callbacks.

use std::sync::{Arc, Mutex};
use std::thread;

use hardmac_radio::error::RadioError;
use hardmac_radio::frame::{FullAddress, MacAddress, SecuritySpec};
use hardmac_radio::mac::{
	BeaconNotifyIndication, DataConfirm, DataIndication, DataRequest, HwmeAttribute, MacCallbacks,
	MacStatus, MacTransport, PanDescriptor, PibAttribute, PollRequest, ScanConfirm, ScanRequest,
	ScanType, StartRequest, TxOptions,
};
use hardmac_radio::stack::{
	ActiveScanResult, EnergyScanResult, Entropy, Neighbor, Role, ThreadStack,
};
use hardmac_radio::{Radio, RadioConfig, StateChangeFlags};

#[derive(Default)]
struct MacLog {
	sets: Vec<(PibAttribute, u8, Vec<u8>)>,
	resets: Vec<bool>,
	starts: Vec<StartRequest>,
	scans: Vec<ScanRequest>,
	data_requests: Vec<DataRequest>,
}

/// Co-processor stand-in whose command log outlives the radio owning it.
#[derive(Clone, Default)]
struct ScriptedMac {
	log: Arc<Mutex<MacLog>>,
}

impl ScriptedMac {
	fn log(&self) -> std::sync::MutexGuard<'_, MacLog> {
		self.log.lock().unwrap()
	}
}

impl MacTransport for ScriptedMac {
	fn mlme_set(
		&mut self,
		attribute: PibAttribute,
		index: u8,
		value: &[u8],
	) -> Result<(), MacStatus> {
		self.log().sets.push((attribute, index, value.to_vec()));
		Ok(())
	}

	fn mlme_get(
		&mut self,
		_attribute: PibAttribute,
		_index: u8,
		_out: &mut [u8],
	) -> Result<usize, MacStatus> {
		Err(MacStatus::UnsupportedAttribute)
	}

	fn mlme_reset(&mut self, set_default_pib: bool) -> Result<(), MacStatus> {
		self.log().resets.push(set_default_pib);
		Ok(())
	}

	fn mlme_start(&mut self, request: &StartRequest) -> Result<(), MacStatus> {
		self.log().starts.push(*request);
		Ok(())
	}

	fn mlme_scan(&mut self, request: &ScanRequest) -> Result<(), MacStatus> {
		self.log().scans.push(*request);
		Ok(())
	}

	fn mlme_poll(&mut self, _request: &PollRequest) -> Result<(), MacStatus> {
		Err(MacStatus::NoData)
	}

	fn mcps_data_request(&mut self, request: &DataRequest) -> Result<(), MacStatus> {
		self.log().data_requests.push(request.clone());
		Ok(())
	}

	fn hwme_set(&mut self, _attribute: HwmeAttribute, _value: &[u8]) -> Result<(), MacStatus> {
		Ok(())
	}

	fn hwme_get(&mut self, _attribute: HwmeAttribute, _out: &mut [u8]) -> Result<usize, MacStatus> {
		Err(MacStatus::UnsupportedAttribute)
	}
}

#[derive(Default)]
struct RecordingStack {
	parent: Option<Neighbor>,
	role: Option<Role>,
	received: Vec<Vec<u8>>,
	transmitted: Vec<(usize, bool, Result<(), RadioError>)>,
	active_results: Vec<Option<ActiveScanResult>>,
	energy_results: Vec<Option<EnergyScanResult>>,
}

impl ThreadStack for RecordingStack {
	fn role(&self) -> Role {
		self.role.unwrap_or(Role::Detached)
	}

	fn key_sequence(&self) -> u32 {
		1
	}

	fn mac_key(&self, sequence: u32) -> [u8; 16] {
		[sequence as u8; 16]
	}

	fn parent(&self) -> Option<Neighbor> {
		self.parent
	}

	fn children(&self, _out: &mut heapless::Vec<Neighbor, 5>) {}

	fn router_neighbors(&self, _out: &mut heapless::Vec<Neighbor, 5>) {}

	fn receive_done(
		&mut self,
		packet: &hardmac_radio::RadioPacket,
		result: Result<(), RadioError>,
	) {
		assert_eq!(result, Ok(()));
		self.received.push(packet.psdu.to_vec());
	}

	fn transmit_done(
		&mut self,
		packet: &hardmac_radio::RadioPacket,
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

struct ZeroEntropy;

impl Entropy for ZeroEntropy {
	fn fill(&mut self, buffer: &mut [u8]) {
		buffer.fill(0xa5);
	}
}

fn running_radio() -> (Radio<ScriptedMac>, hardmac_radio::RadioEvents, ScriptedMac) {
	let mac = ScriptedMac::default();
	let (mut radio, events) = Radio::new(mac.clone(), RadioConfig::default());
	radio.init(&mut ZeroEntropy).unwrap();
	radio.enable().unwrap();
	radio.receive(17).unwrap();
	(radio, events, mac)
}

fn data_frame(sequence: u8, payload: &[u8]) -> Vec<u8> {
	let mut psdu = vec![
		0x61, 0x88, // data, ack request, PAN compression, short/short
		sequence,
		0xce, 0xfa, // dst PAN 0xface
		0x01, 0x00, // dst short 0x0001
		0x02, 0x00, // src short 0x0002
	];
	psdu.extend_from_slice(payload);
	psdu.extend_from_slice(&[0u8; 2]); // FCS space
	psdu
}

#[test]
fn acknowledged_short_address_transmission() {
	let (mut radio, events, mac) = running_radio();

	{
		let tx = radio.transmit_buffer();
		tx.psdu = heapless::Vec::from_slice(&data_frame(7, &[0xaa, 0xbb, 0xcc])).unwrap();
		tx.channel = 17;
		tx.context = 0x1234;
	}
	radio.transmit().unwrap();

	let request = mac.log().data_requests[0].clone();
	assert_eq!(request.dst.pan_id, 0xface);
	assert_eq!(request.dst.address, MacAddress::Short(0x0001));
	assert_eq!(request.tx_options, TxOptions::ACKNOWLEDGED);
	assert_eq!(request.msdu.as_slice(), &[0xaa, 0xbb, 0xcc]);
	assert!(request.security.is_none());

	let worker = thread::spawn(move || {
		events.mcps_data_confirm(DataConfirm {
			msdu_handle: request.msdu_handle,
			status: MacStatus::Success,
		});
	});

	let mut stack = RecordingStack::default();
	while stack.transmitted.is_empty() {
		radio.process(&mut stack);
	}
	worker.join().unwrap();

	assert_eq!(stack.transmitted, vec![(0x1234, false, Ok(()))]);
}

#[test]
fn concurrent_confirms_never_cross_over() {
	let (mut radio, events, mac) = running_radio();

	for context in [0xaaaa_usize, 0xbbbb] {
		let tx = radio.transmit_buffer();
		tx.psdu = heapless::Vec::from_slice(&data_frame(1, &[0x01])).unwrap();
		tx.channel = 17;
		tx.indirect = true;
		tx.context = context;
		radio.transmit().unwrap();
	}

	let (first, second) = {
		let log = mac.log();
		(
			log.data_requests[0].msdu_handle,
			log.data_requests[1].msdu_handle,
		)
	};
	assert_ne!(first, second);

	// confirm in reverse order: each must route to its own submission
	let worker = thread::spawn(move || {
		events.mcps_data_confirm(DataConfirm {
			msdu_handle: second,
			status: MacStatus::Success,
		});
		events.mcps_data_confirm(DataConfirm {
			msdu_handle: first,
			status: MacStatus::NoAck,
		});
	});

	let mut stack = RecordingStack::default();
	while stack.transmitted.len() < 2 {
		radio.process(&mut stack);
	}
	worker.join().unwrap();

	assert_eq!(stack.transmitted[0], (0xbbbb, false, Ok(())));
	assert_eq!(
		stack.transmitted[1],
		(0xaaaa, false, Err(RadioError::NoAck))
	);
}

#[test]
fn received_frames_arrive_in_order_with_backpressure() {
	let (mut radio, events, _mac) = running_radio();

	let indication = |src: u16, payload: &[u8]| DataIndication {
		src: FullAddress {
			pan_id: 0xbeef,
			address: MacAddress::Short(src),
		},
		dst: FullAddress {
			pan_id: 0xbeef,
			address: MacAddress::Short(0x0001),
		},
		msdu: heapless::Vec::from_slice(payload).unwrap(),
		mpdu_link_quality: 180,
		dsn: 9,
		security: SecuritySpec::default(),
	};

	let first = indication(0x0002, &[0x11, 0x22]);
	let second = indication(0x0003, &[0x33]);
	let worker = thread::spawn(move || {
		// the second call blocks in the receive slot until the main loop
		// drained the first frame
		events.mcps_data_indication(first);
		events.mcps_data_indication(second);
	});

	let mut stack = RecordingStack::default();
	while stack.received.len() < 2 {
		radio.process(&mut stack);
	}
	worker.join().unwrap();

	// PAN compression puts src right after dst, payload at offset 9
	let psdu = &stack.received[0];
	assert_eq!(&psdu[3..5], &[0xef, 0xbe]);
	assert_eq!(&psdu[5..7], &[0x01, 0x00]);
	assert_eq!(&psdu[7..9], &[0x02, 0x00]);
	assert_eq!(&psdu[9..11], &[0x11, 0x22]);
	assert_eq!(stack.received[1][7..9], [0x03, 0x00]);
}

fn thread_beacon(channel: u8, name: &[u8; 16]) -> BeaconNotifyIndication {
	let mut sdu = heapless::Vec::new();
	sdu.extend_from_slice(&[3, 1 << 4]).unwrap();
	sdu.extend_from_slice(name).unwrap();
	sdu.extend_from_slice(&[0xee; 8]).unwrap();
	BeaconNotifyIndication {
		bsn: 0,
		pan_descriptor: PanDescriptor {
			coord: FullAddress {
				pan_id: 0xface,
				address: MacAddress::Short(0x1111),
			},
			logical_channel: channel,
			link_quality: 120,
		},
		sdu,
	}
}

#[test]
fn active_scan_streams_results_then_a_terminator() {
	let (mut radio, events, mac) = running_radio();

	radio.active_scan(1 << 15 | 1 << 20, 200).unwrap();
	{
		let log = mac.log();
		let request = &log.scans[0];
		assert_eq!(request.scan_type, ScanType::Active);
		assert_eq!(request.scan_channels, 1 << 15 | 1 << 20);
		assert_eq!(request.scan_duration, 3);
	}

	let worker = thread::spawn(move || {
		events.mlme_beacon_notify(thread_beacon(15, b"FirstNetworkName"));
		events.mlme_beacon_notify(thread_beacon(20, b"OtherNetworkName"));
		events.mlme_scan_confirm(ScanConfirm {
			status: MacStatus::Success,
			scan_type: ScanType::Active,
			unscanned_channels: 0,
			result_list: heapless::Vec::new(),
		});
	});

	let mut stack = RecordingStack::default();
	while stack.active_results.len() < 3 {
		radio.process(&mut stack);
	}
	worker.join().unwrap();

	let first = stack.active_results[0].unwrap();
	assert_eq!(first.channel, 15);
	assert_eq!(&first.network_name, b"FirstNetworkName");
	let second = stack.active_results[1].unwrap();
	assert_eq!(second.channel, 20);
	assert!(stack.active_results[2].is_none());

	// the channel selected before the scan is put back
	let log = mac.log();
	let restored = log
		.sets
		.iter()
		.rev()
		.find(|(attr, _, _)| *attr == PibAttribute::PhyCurrentChannel)
		.unwrap();
	assert_eq!(restored.2, vec![17]);
}

#[test]
fn energy_scan_pairs_readings_with_ascending_channels() {
	let (mut radio, events, _mac) = running_radio();

	radio.energy_scan(1 << 13 | 1 << 14 | 1 << 25, 100).unwrap();

	let worker = thread::spawn(move || {
		events.mlme_scan_confirm(ScanConfirm {
			status: MacStatus::Success,
			scan_type: ScanType::Energy,
			unscanned_channels: 0,
			result_list: heapless::Vec::from_slice(&[100, 150, 250]).unwrap(),
		});
	});

	let mut stack = RecordingStack::default();
	while stack.energy_results.len() < 4 {
		radio.process(&mut stack);
	}
	worker.join().unwrap();

	let channels: Vec<u8> = stack
		.energy_results
		.iter()
		.flatten()
		.map(|result| result.channel)
		.collect();
	assert_eq!(channels, vec![13, 14, 25]);
	assert_eq!(stack.energy_results[0].unwrap().max_rssi, -78);
	assert!(stack.energy_results[3].is_none());
}

#[test]
fn role_changes_drive_coordinator_mode() {
	let (mut radio, _events, mac) = running_radio();
	radio.set_pan_id(0xface).unwrap();

	let mut stack = RecordingStack::default();
	stack.role = Some(Role::Router);
	radio.state_changed(&stack, StateChangeFlags::ROLE);
	{
		let log = mac.log();
		assert_eq!(log.starts.len(), 1);
		let start = &log.starts[0];
		assert_eq!(start.pan_id, 0xface);
		assert_eq!(start.logical_channel, 17);
		assert_eq!(start.beacon_order, 15);
		assert_eq!(start.superframe_order, 15);
		assert!(start.pan_coordinator);
	}

	stack.role = Some(Role::Child);
	stack.parent = Some(Neighbor {
		short_addr: 0xc000,
		ext_addr: [1, 2, 3, 4, 5, 6, 7, 8],
	});
	radio.state_changed(&stack, StateChangeFlags::ROLE);
	let log = mac.log();
	// init reset(true), then the demotion's MLME-RESET(0)
	assert_eq!(log.resets, vec![true, false]);
	// the child's device table holds exactly its parent
	let count = log
		.sets
		.iter()
		.rev()
		.find(|(attr, _, _)| *attr == PibAttribute::MacDeviceTableEntries)
		.unwrap();
	assert_eq!(count.2, vec![1]);
}

#[test]
fn poll_without_queued_data_reports_none() {
	let (mut radio, _events, _mac) = running_radio();
	let mut stack = RecordingStack::default();
	stack.parent = Some(Neighbor {
		short_addr: 0xc000,
		ext_addr: [1; 8],
	});
	assert_eq!(radio.poll(&stack), Ok(false));
}
