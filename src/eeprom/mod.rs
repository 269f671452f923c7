//! Byte access to a 24LC024H-family I2C EEPROM (2 kbit, 8-bit word address)
//!
//! Datasheet: http://ww1.microchip.com/downloads/en/devicedoc/22102a.pdf
//!
//! Byte write: START, `[address, data]`, STOP. The STOP starts the internal
//! write cycle (up to 5 ms), during which the device doesn't acknowledge its
//! slave address. Instead of sleeping we poll: send START + `[address]` with
//! BREAK_ON_NACK until the address byte gets ACKed.
//!
//! Random read: START, `[address]` (no STOP; sets the internal address
//! pointer), then START again and read one byte.

mod batch;
mod error;

pub use self::batch::{
	BatchReport,
	ByteOutcome,
	Mismatch,
	with_retry,
};

pub use self::error::{
	Stage,
	TransferError,
};

use crate::i2c::{
	I2cBus,
	SlaveAddress,
	TransferRequest,
};
use crate::mpsse::TransferOptions;

/// maximum number of completion probes after a write
pub const WRITE_COMPLETION_RETRY: usize = 10;
/// how often a failed byte read/write gets repeated before it is skipped
pub const RETRY_COUNT: usize = 10;

/// A write that was acknowledged by the device after its write cycle
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Committed {
	/// number of completion probes sent (including the ACKed one)
	pub polls: usize,
}

pub trait EepromBusExt: I2cBus {
	/// probe until the device ACKs its address again
	///
	/// returns the number of probes sent
	fn eeprom_wait_write_complete(&mut self, slave: SlaveAddress, register: u8) -> Result<usize, TransferError> {
		let probe = TransferRequest::probe(slave, register);
		for poll in 1..=WRITE_COMPLETION_RETRY {
			if probe.issue(self).is_complete(probe.len()) {
				return Ok(poll);
			}
		}
		Err(TransferError::WriteTimeout(WRITE_COMPLETION_RETRY))
	}

	fn eeprom_write_byte(&mut self, slave: SlaveAddress, register: u8, data: u8) -> Result<Committed, TransferError> {
		let command = TransferRequest::write(slave, register, data);
		let transfer = command.issue(self);
		TransferError::check(Stage::WriteCommand, transfer, command.len())?;

		let polls = self.eeprom_wait_write_complete(slave, register)?;
		debug!("0x{:02x}: wrote 0x{:02x}, done after {} polls", register, data, polls);
		Ok(Committed { polls })
	}

	/// the status of both legs is OR-ed; a short read isn't detected
	fn eeprom_read_byte(&mut self, slave: SlaveAddress, register: u8) -> Result<u8, TransferError> {
		let set_address = TransferRequest::set_address(slave, register);
		let mut status = set_address.issue(self).status;

		let mut buf = [0u8; 1];
		let read = self.read(slave, &mut buf, TransferOptions::start());
		trace!("read {} byte(s) -> {:?}", buf.len(), read);
		status |= read.status;

		if !status.is_ok() {
			return Err(TransferError::Status(Stage::RandomRead, status));
		}
		Ok(buf[0])
	}
}

impl<B: I2cBus + ?Sized> EepromBusExt for B {}

/// An EEPROM at a fixed slave address on a bus
pub struct Eeprom<B> {
	bus: B,
	slave: SlaveAddress,
}

impl<B: I2cBus> Eeprom<B> {
	pub fn new(bus: B, slave: SlaveAddress) -> Self {
		Eeprom {
			bus,
			slave,
		}
	}

	pub fn slave(&self) -> SlaveAddress {
		self.slave
	}

	pub fn into_inner(self) -> B {
		self.bus
	}

	pub fn write_byte(&mut self, address: u8, data: u8) -> Result<Committed, TransferError> {
		self.bus.eeprom_write_byte(self.slave, address, data)
	}

	pub fn read_byte(&mut self, address: u8) -> Result<u8, TransferError> {
		self.bus.eeprom_read_byte(self.slave, address)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use test_case::test_case;

	use crate::mpsse::{
		Channel,
		SimulatedMaster,
		Status,
		SIMULATED_EEPROM_ADDRESS,
	};

	fn slave() -> SlaveAddress {
		SlaveAddress::new(SIMULATED_EEPROM_ADDRESS).unwrap()
	}

	#[test]
	fn round_trip() {
		let mut sim = SimulatedMaster::new();
		let mut channel = Channel::open(&mut sim, 1).unwrap();
		let mut eeprom = Eeprom::new(&mut channel, slave());
		for address in 0..16u8 {
			let data = address.wrapping_mul(37) ^ 0x5a;
			eeprom.write_byte(address, data).unwrap();
			assert_eq!(eeprom.read_byte(address).unwrap(), data);
		}
	}

	#[test_case(0)]
	#[test_case(1)]
	#[test_case(5)]
	#[test_case(9)]
	fn poll_stops_at_first_ack(busy_polls: usize) {
		let mut sim = SimulatedMaster::new();
		sim.set_write_cycle_polls(busy_polls);
		{
			let mut channel = Channel::open(&mut sim, 1).unwrap();
			let mut eeprom = Eeprom::new(&mut channel, slave());
			assert_eq!(eeprom.write_byte(0x04, 0x99).unwrap(), Committed { polls: busy_polls + 1 });
		}
		assert_eq!(sim.probes(), busy_polls + 1);
		assert_eq!(sim.memory(1)[0x04], 0x99);
	}

	#[test_case(10)]
	#[test_case(25)]
	fn poll_gives_up_after_ten(busy_polls: usize) {
		let mut sim = SimulatedMaster::new();
		sim.set_write_cycle_polls(busy_polls);
		{
			let mut channel = Channel::open(&mut sim, 1).unwrap();
			let mut eeprom = Eeprom::new(&mut channel, slave());
			assert_eq!(eeprom.write_byte(0x04, 0x99).unwrap_err(), TransferError::WriteTimeout(10));
		}
		assert_eq!(sim.probes(), WRITE_COMPLETION_RETRY);
	}

	#[test]
	fn erased_cell_reads_ff() {
		let mut sim = SimulatedMaster::new();
		let mut channel = Channel::open(&mut sim, 0).unwrap();
		let mut eeprom = Eeprom::new(&mut channel, slave());
		assert_eq!(eeprom.read_byte(0x80).unwrap(), 0xff);
	}

	#[test]
	fn failed_write_command_skips_polling() {
		let mut sim = SimulatedMaster::new();
		sim.fail_transfers_at(0x02, 1);
		{
			let mut channel = Channel::open(&mut sim, 1).unwrap();
			let mut eeprom = Eeprom::new(&mut channel, slave());
			assert_eq!(
				eeprom.write_byte(0x02, 0x11).unwrap_err(),
				TransferError::Status(Stage::WriteCommand, Status::IO_ERROR),
			);
		}
		assert_eq!(sim.probes(), 0);
		assert_eq!(sim.memory(1)[0x02], 0xff);
	}

	#[test]
	fn failed_address_set_fails_read() {
		let mut sim = SimulatedMaster::new();
		sim.fail_transfers_at(0x07, 1);
		let mut channel = Channel::open(&mut sim, 1).unwrap();
		let mut eeprom = Eeprom::new(&mut channel, slave());
		assert_eq!(
			eeprom.read_byte(0x07).unwrap_err(),
			TransferError::Status(Stage::RandomRead, Status::IO_ERROR),
		);
		assert_eq!(eeprom.read_byte(0x07).unwrap(), 0xff);
	}

	#[test]
	fn absent_device_never_commits() {
		let mut sim = SimulatedMaster::new();
		let mut channel = Channel::open(&mut sim, 1).unwrap();
		let mut eeprom = Eeprom::new(&mut channel, SlaveAddress::new(0x50).unwrap());
		assert_eq!(eeprom.write_byte(0, 0).unwrap_err(), TransferError::WriteTimeout(10));
	}
}
