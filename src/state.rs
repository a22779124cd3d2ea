//! The radio's operating-state machine.
//!
//! All mutation happens on the main thread: events coming from the worker are
//! serviced by [`Radio::process`](crate::Radio::process) under the barrier,
//! so the Transmit→Receive transition on a confirm is still main-thread code.

use crate::error::{RadioError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioState {
	Disabled,
	Sleep,
	Receive,
	Transmit,
}

#[derive(Debug)]
pub(crate) struct StateMachine {
	state: RadioState,
}

impl StateMachine {
	pub fn new() -> Self {
		Self {
			state: RadioState::Disabled,
		}
	}

	pub fn current(&self) -> RadioState {
		self.state
	}

	/// Disabled → Sleep.
	pub fn enable(&mut self) -> Result<()> {
		self.step(RadioState::Disabled, RadioState::Sleep)
	}

	/// Sleep/Receive → Disabled. Refused while a transmission is in flight.
	pub fn disable(&mut self) -> Result<()> {
		match self.state {
			RadioState::Sleep | RadioState::Receive => {
				self.state = RadioState::Disabled;
				Ok(())
			}
			_ => Err(RadioError::Busy),
		}
	}

	/// Receive → Sleep. Refused while a transmission is in flight.
	pub fn sleep(&mut self) -> Result<()> {
		self.step(RadioState::Receive, RadioState::Sleep)
	}

	/// Sleep → Receive, or Receive → Receive for a channel change.
	pub fn receive(&mut self) -> Result<()> {
		match self.state {
			RadioState::Sleep | RadioState::Receive => {
				self.state = RadioState::Receive;
				Ok(())
			}
			_ => Err(RadioError::Busy),
		}
	}

	/// Receive → Transmit.
	pub fn transmit(&mut self) -> Result<()> {
		self.step(RadioState::Receive, RadioState::Transmit)
	}

	/// Transmit → Receive, driven by the data confirm.
	pub fn transmit_done(&mut self) -> Result<()> {
		self.step(RadioState::Transmit, RadioState::Receive)
	}

	/// A MAC reset invalidates everything; back to Disabled unconditionally.
	pub fn reset(&mut self) {
		self.state = RadioState::Disabled;
	}

	fn step(&mut self, from: RadioState, to: RadioState) -> Result<()> {
		if self.state == from {
			self.state = to;
			Ok(())
		} else {
			Err(RadioError::Busy)
		}
	}
}
