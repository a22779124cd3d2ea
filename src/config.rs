//! Build-time constants and per-instance configuration.

/// Lowest 2.4 GHz O-QPSK channel.
pub const CHANNEL_MIN: u8 = 11;

/// Highest 2.4 GHz O-QPSK channel.
pub const CHANNEL_MAX: u8 = 26;

/// Channel mask covering every channel in 11..=26.
pub const CHANNEL_MASK_ALL: u32 = 0x07ff_f800;

/// Capacity of the co-processor's device table.
pub const MAX_DEVICES: usize = 5;

/// Concurrent in-transit transmissions: five indirect plus two of margin.
pub const MAX_PENDING: usize = 7;

/// Key generations kept on the co-processor (previous, current, next).
pub const KEY_GENERATIONS: usize = 3;

/// The well-known default key source used for MAC key lookups.
pub const DEFAULT_KEY_SOURCE: [u8; 8] = [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xff];

pub const DEFAULT_MAX_FRAME_RETRIES: u8 = 7;
pub const DEFAULT_MAX_CSMA_BACKOFFS: u8 = 5;
pub const DEFAULT_MAX_BE: u8 = 4;

/// Indirect transaction persistence in units of aBaseSuperframeDuration
/// (15.36 ms), roughly 90 seconds.
pub const DEFAULT_TRANSACTION_PERSISTENCE: u16 = 5859;

/// HWME LQI mode selector: derive LQI from the energy detect value.
pub const LQI_MODE_ED: u8 = 0x01;

/// Length of a network name in the beacon payload.
pub const NETWORK_NAME_LEN: usize = 16;

/// Length of an extended PAN id in the beacon payload.
pub const EXT_PAN_ID_LEN: usize = 8;

/// Hook invoked on sleep and wake transitions when the platform wants to
/// drive hardware low-power entry itself. The argument is `true` on entry
/// to sleep.
pub type LowPowerHook = fn(bool);

/// Callback used to wake the main loop's poll when the worker parks an event,
/// typically a one-byte write to a self-pipe.
pub type MainLoopWaker = Box<dyn Fn() + Send + Sync>;

/// Per-instance configuration handed to [`Radio::new`](crate::Radio::new).
#[derive(Default)]
pub struct RadioConfig {
	/// Factory-assigned EUI-64 in network byte order. When absent, one is
	/// generated from the platform entropy source on the first `init` and
	/// kept for the life of the instance.
	pub eui64: Option<[u8; 8]>,
	/// Optional hardware low-power hook; the co-processor itself treats
	/// sleep as a no-op because rx-on-when-idle subsumes it.
	pub low_power_hook: Option<LowPowerHook>,
	/// Wakes the main loop's poll from the worker thread.
	pub waker: Option<MainLoopWaker>,
}
