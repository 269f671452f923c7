use std::fmt;
use std::str::FromStr;

use crate::mpsse::{
	Status,
	TransferOptions,
};

/// 7-bit I2C slave address
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlaveAddress(u8);

impl SlaveAddress {
	pub fn new(address: u8) -> crate::AResult<Self> {
		ensure!(address < 0x80, "I2C slave address 0x{:02x} doesn't fit in 7 bits", address);
		Ok(SlaveAddress(address))
	}

	pub fn get(self) -> u8 {
		self.0
	}
}

impl fmt::Display for SlaveAddress {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "0x{:02x}", self.0)
	}
}

impl fmt::Debug for SlaveAddress {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "SlaveAddress(0x{:02x})", self.0)
	}
}

impl FromStr for SlaveAddress {
	type Err = failure::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		SlaveAddress::new(parse_u8(s)?)
	}
}

/// parse decimal or `0x`-prefixed hex
pub fn parse_u8(s: &str) -> crate::AResult<u8> {
	let r = if s.starts_with("0x") || s.starts_with("0X") {
		u8::from_str_radix(&s[2..], 16)
	} else {
		s.parse::<u8>()
	};
	r.map_err(|e| format_err!("invalid byte value {:?}: {}", s, e))
}

/// Outcome of a single `I2C_DeviceWrite` / `I2C_DeviceRead`
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Transfer {
	/// number of bytes the slave acknowledged (writes) or that were read
	pub transferred: usize,
	pub status: Status,
}

impl Transfer {
	pub fn failed(status: Status) -> Self {
		Transfer {
			transferred: 0,
			status,
		}
	}

	/// status is FT_OK and all requested bytes went over the bus
	pub fn is_complete(&self, requested: usize) -> bool {
		self.status.is_ok() && self.transferred == requested
	}
}

/// One EEPROM-level transfer: register (byte) address plus optional data
/// byte, and the framing to use.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TransferRequest {
	pub slave: SlaveAddress,
	pub register: u8,
	pub payload: Option<u8>,
	pub options: TransferOptions,
}

impl TransferRequest {
	/// `[register, data]` with START+STOP: a byte write
	pub fn write(slave: SlaveAddress, register: u8, data: u8) -> Self {
		TransferRequest {
			slave,
			register,
			payload: Some(data),
			options: TransferOptions::start_stop(),
		}
	}

	/// `[register]` with START+BREAK_ON_NACK: ACKed only once the slave is idle
	pub fn probe(slave: SlaveAddress, register: u8) -> Self {
		TransferRequest {
			slave,
			register,
			payload: None,
			options: TransferOptions::probe(),
		}
	}

	/// `[register]` with START only: sets the address pointer for a read
	pub fn set_address(slave: SlaveAddress, register: u8) -> Self {
		TransferRequest {
			slave,
			register,
			payload: None,
			options: TransferOptions::start(),
		}
	}

	pub fn len(&self) -> usize {
		if self.payload.is_some() { 2 } else { 1 }
	}

	/// issue as a write on `bus`
	pub fn issue<B: I2cBus + ?Sized>(&self, bus: &mut B) -> Transfer {
		let buf = [self.register, self.payload.unwrap_or(0)];
		let transfer = bus.write(self.slave, &buf[..self.len()], self.options);
		trace!("write {:?} -> {:?}", self, transfer);
		transfer
	}
}

/// An open I2C master channel
pub trait I2cBus {
	fn write(&mut self, slave: SlaveAddress, buffer: &[u8], options: TransferOptions) -> Transfer;

	fn read(&mut self, slave: SlaveAddress, buffer: &mut [u8], options: TransferOptions) -> Transfer;
}

impl<B: I2cBus + ?Sized> I2cBus for &mut B {
	fn write(&mut self, slave: SlaveAddress, buffer: &[u8], options: TransferOptions) -> Transfer {
		(**self).write(slave, buffer, options)
	}

	fn read(&mut self, slave: SlaveAddress, buffer: &mut [u8], options: TransferOptions) -> Transfer {
		(**self).read(slave, buffer, options)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use test_case::test_case;

	#[test_case("0x57", 0x57)]
	#[test_case("0X50", 0x50)]
	#[test_case("87", 87)]
	fn parse_slave(s: &str, expected: u8) {
		assert_eq!(s.parse::<SlaveAddress>().unwrap().get(), expected);
	}

	#[test_case("0x80")]
	#[test_case("256")]
	#[test_case("eeprom")]
	fn reject_slave(s: &str) {
		assert!(s.parse::<SlaveAddress>().is_err());
	}

	#[test]
	fn request_framing() {
		let slave = SlaveAddress::new(0x57).unwrap();
		let w = TransferRequest::write(slave, 3, 0xaa);
		assert_eq!(w.len(), 2);
		assert!(w.options.is_stop_bit());
		let p = TransferRequest::probe(slave, 3);
		assert_eq!(p.len(), 1);
		assert!(p.options.is_break_on_nack() && !p.options.is_stop_bit());
		let a = TransferRequest::set_address(slave, 3);
		assert_eq!(a.options, TransferOptions::start());
	}

	#[test]
	fn completion_needs_status_and_count() {
		assert!(Transfer { transferred: 1, status: Status::OK }.is_complete(1));
		assert!(!Transfer { transferred: 0, status: Status::OK }.is_complete(1));
		assert!(!Transfer { transferred: 1, status: Status::IO_ERROR }.is_complete(1));
	}
}
