use std::fmt;
use std::ops::{
	BitOr,
	BitOrAssign,
};

/// `FT_STATUS` as returned by every libMPSSE / D2XX call.
///
/// The driver doesn't distinguish "device not present" from "bus NACK" or a
/// USB I/O error in any reliable way, so this is kept opaque; the names are
/// only used for display.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Status(pub u32);

impl Status {
	pub const OK: Status = Status(0);
	pub const INVALID_HANDLE: Status = Status(1);
	pub const DEVICE_NOT_FOUND: Status = Status(2);
	pub const DEVICE_NOT_OPENED: Status = Status(3);
	pub const IO_ERROR: Status = Status(4);
	pub const INSUFFICIENT_RESOURCES: Status = Status(5);
	pub const INVALID_PARAMETER: Status = Status(6);
	pub const INVALID_ARGS: Status = Status(16);
	pub const NOT_SUPPORTED: Status = Status(17);
	pub const OTHER_ERROR: Status = Status(18);

	pub fn is_ok(self) -> bool {
		self == Status::OK
	}

	pub fn name(self) -> Option<&'static str> {
		Some(match self.0 {
			0 => "FT_OK",
			1 => "FT_INVALID_HANDLE",
			2 => "FT_DEVICE_NOT_FOUND",
			3 => "FT_DEVICE_NOT_OPENED",
			4 => "FT_IO_ERROR",
			5 => "FT_INSUFFICIENT_RESOURCES",
			6 => "FT_INVALID_PARAMETER",
			7 => "FT_INVALID_BAUD_RATE",
			8 => "FT_DEVICE_NOT_OPENED_FOR_ERASE",
			9 => "FT_DEVICE_NOT_OPENED_FOR_WRITE",
			10 => "FT_FAILED_TO_WRITE_DEVICE",
			11 => "FT_EEPROM_READ_FAILED",
			12 => "FT_EEPROM_WRITE_FAILED",
			13 => "FT_EEPROM_ERASE_FAILED",
			14 => "FT_EEPROM_NOT_PRESENT",
			15 => "FT_EEPROM_NOT_PROGRAMMED",
			16 => "FT_INVALID_ARGS",
			17 => "FT_NOT_SUPPORTED",
			18 => "FT_OTHER_ERROR",
			19 => "FT_DEVICE_LIST_NOT_READY",
			_ => return None,
		})
	}

	/// turn a setup-call status into a `Result`, remembering which call failed
	pub fn check(self, call: &'static str) -> Result<(), StatusError> {
		if self.is_ok() {
			Ok(())
		} else {
			Err(StatusError { call, status: self })
		}
	}
}

impl BitOr for Status {
	type Output = Status;

	fn bitor(self, rhs: Status) -> Status {
		Status(self.0 | rhs.0)
	}
}

impl BitOrAssign for Status {
	fn bitor_assign(&mut self, rhs: Status) {
		self.0 |= rhs.0;
	}
}

impl fmt::Display for Status {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self.name() {
			Some(name) => write!(f, "{} (0x{:x})", name, self.0),
			None => write!(f, "status 0x{:x}", self.0),
		}
	}
}

impl fmt::Debug for Status {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		fmt::Display::fmt(self, f)
	}
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Fail)]
#[fail(display = "{}(): status {} != FT_OK", call, status)]
pub struct StatusError {
	pub call: &'static str,
	pub status: Status,
}

#[cfg(test)]
mod tests {
	use super::*;
	use test_case::test_case;

	#[test]
	fn or_combines_failures() {
		assert_eq!(Status::OK | Status::OK, Status::OK);
		assert!(!(Status::OK | Status::IO_ERROR).is_ok());
		let mut s = Status::INVALID_HANDLE;
		s |= Status::IO_ERROR;
		assert_eq!(s, Status(5));
	}

	#[test_case(Status::OK, "FT_OK (0x0)")]
	#[test_case(Status::IO_ERROR, "FT_IO_ERROR (0x4)")]
	#[test_case(Status(0x42), "status 0x42")]
	fn display(status: Status, expected: &str) {
		assert_eq!(status.to_string(), expected);
	}

	#[test]
	fn check_names_call() {
		assert!(Status::OK.check("I2C_InitChannel").is_ok());
		let err = Status::DEVICE_NOT_FOUND.check("I2C_OpenChannel").unwrap_err();
		assert_eq!(err.call, "I2C_OpenChannel");
		assert_eq!(err.to_string(), "I2C_OpenChannel(): status FT_DEVICE_NOT_FOUND (0x2) != FT_OK");
	}
}
