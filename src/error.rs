//! Error taxonomy surfaced to the stack.

use thiserror::Error;

use crate::mac::MacStatus;

/// Outcome of a platform radio operation, as seen by the stack.
///
/// Synchronous faults from co-processor set/get commands map to [`Failed`]
/// and are returned directly. Transmit faults arrive on the confirm path and
/// are translated via [`RadioError::from`] before the transmit-done callback
/// runs.
///
/// [`Failed`]: RadioError::Failed
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioError {
	/// The operation is not permitted in the current state, or an equivalent
	/// request is already outstanding.
	#[error("operation not permitted in the current state")]
	Busy,
	/// The submission was malformed or carries an unsupported frame type.
	#[error("malformed or unsupported submission")]
	Abort,
	/// CSMA-CA gave up without finding a clear channel.
	#[error("channel access failure")]
	ChannelAccessFailure,
	/// An acknowledged transmission went unacknowledged. Transaction expiry
	/// and overflow report the same way so the stack retries.
	#[error("no acknowledgment received")]
	NoAck,
	/// The co-processor rejected the command.
	#[error("co-processor command failed")]
	Failed,
}

/// Confirm-path translation from a MAC status byte.
impl From<MacStatus> for RadioError {
	fn from(status: MacStatus) -> Self {
		match status {
			MacStatus::ChannelAccessFailure => RadioError::ChannelAccessFailure,
			MacStatus::NoAck | MacStatus::TransactionExpired | MacStatus::TransactionOverflow => {
				RadioError::NoAck
			}
			_ => RadioError::Failed,
		}
	}
}

pub type Result<T> = core::result::Result<T, RadioError>;
