use std::fmt;

use crate::i2c::Transfer;
use crate::mpsse::Status;

/// Which leg of an EEPROM operation failed
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Stage {
	/// `[address, data]` + STOP
	WriteCommand,
	/// dummy write of `[address]` followed by a 1-byte read
	RandomRead,
}

impl fmt::Display for Stage {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Stage::WriteCommand => write!(f, "write command"),
			Stage::RandomRead => write!(f, "random read"),
		}
	}
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Fail)]
pub enum TransferError {
	#[fail(display = "{} failed: {}", _0, _1)]
	Status(Stage, Status),
	#[fail(display = "{} not acknowledged ({} of {} bytes)", stage, transferred, requested)]
	Nack {
		stage: Stage,
		transferred: usize,
		requested: usize,
	},
	/// the device kept NACKing the completion probe
	#[fail(display = "write not committed after {} completion polls", _0)]
	WriteTimeout(usize),
}

impl TransferError {
	pub(super) fn check(stage: Stage, transfer: Transfer, requested: usize) -> Result<(), TransferError> {
		if !transfer.status.is_ok() {
			Err(TransferError::Status(stage, transfer.status))
		} else if transfer.transferred != requested {
			Err(TransferError::Nack {
				stage,
				transferred: transfer.transferred,
				requested,
			})
		} else {
			Ok(())
		}
	}
}
