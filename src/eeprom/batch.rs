use std::ops::Range;

use crate::i2c::I2cBus;

use super::{
	Eeprom,
	TransferError,
};

/// Run `op` once, and again up to `retries` times while it fails
///
/// Returns the number of attempts made and the last result.
pub fn with_retry<T, F>(what: &str, retries: usize, mut op: F) -> (usize, Result<T, TransferError>)
where
	F: FnMut() -> Result<T, TransferError>,
{
	let mut attempts = 0;
	loop {
		attempts += 1;
		match op() {
			Ok(v) => return (attempts, Ok(v)),
			Err(e) => {
				if attempts > retries {
					return (attempts, Err(e));
				}
				warn!("{}: {}, retrying ({}/{})", what, e, attempts, retries);
			},
		}
	}
}

/// Result of writing or reading one address, retries included
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ByteOutcome {
	pub address: u8,
	pub attempts: usize,
	/// byte written / read
	pub result: Result<u8, TransferError>,
}

impl ByteOutcome {
	pub fn is_ok(&self) -> bool {
		self.result.is_ok()
	}
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Mismatch {
	pub address: u8,
	pub expected: u8,
	pub read: u8,
}

#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct BatchReport {
	pub writes: Vec<ByteOutcome>,
	pub reads: Vec<ByteOutcome>,
}

impl BatchReport {
	pub fn failed_writes(&self) -> usize {
		self.writes.iter().filter(|o| !o.is_ok()).count()
	}

	pub fn failed_reads(&self) -> usize {
		self.reads.iter().filter(|o| !o.is_ok()).count()
	}

	/// bytes that were written and read back successfully, but differ
	pub fn mismatches(&self) -> Vec<Mismatch> {
		let mut result = Vec::new();
		for w in &self.writes {
			let expected = match w.result {
				Ok(b) => b,
				Err(_) => continue,
			};
			let read = self.reads.iter()
				.find(|r| r.address == w.address)
				.and_then(|r| r.result.ok());
			if let Some(read) = read {
				if read != expected {
					result.push(Mismatch { address: w.address, expected, read });
				}
			}
		}
		result
	}
}

// 24LC024H: 256 byte addresses
fn addresses(range: Range<u16>) -> crate::AResult<impl Iterator<Item = u8>> {
	ensure!(range.end <= 0x100, "EEPROM address range {:?} exceeds 8 bits", range);
	Ok(range.map(|a| a as u8))
}

impl<B: I2cBus> Eeprom<B> {
	/// write with the outer retry policy; a failure after all retries is
	/// logged and reported, not propagated
	pub fn write_byte_retrying(&mut self, address: u8, data: u8, retries: usize) -> ByteOutcome {
		let what = format!("write 0x{:02x} to 0x{:02x}", data, address);
		let (attempts, result) = with_retry(&what, retries, || self.write_byte(address, data));
		let result = result.map(|_| data);
		if let Err(e) = result {
			error!("{}: giving up after {} attempts: {}", what, attempts, e);
		}
		ByteOutcome { address, attempts, result }
	}

	pub fn read_byte_retrying(&mut self, address: u8, retries: usize) -> ByteOutcome {
		let what = format!("read 0x{:02x}", address);
		let (attempts, result) = with_retry(&what, retries, || self.read_byte(address));
		if let Err(e) = result {
			error!("{}: giving up after {} attempts: {}", what, attempts, e);
		}
		ByteOutcome { address, attempts, result }
	}

	/// write `pattern(address)` to every address in `range`
	///
	/// fails without any transfer if `range` doesn't fit the EEPROM
	pub fn write_range<F>(&mut self, range: Range<u16>, pattern: F, retries: usize) -> crate::AResult<Vec<ByteOutcome>>
	where
		F: Fn(u8) -> u8,
	{
		Ok(addresses(range)?.map(|address| {
			let data = pattern(address);
			info!("writing address = 0x{:02x} data = 0x{:02x}", address, data);
			self.write_byte_retrying(address, data, retries)
		}).collect())
	}

	pub fn read_range(&mut self, range: Range<u16>, retries: usize) -> crate::AResult<Vec<ByteOutcome>> {
		Ok(addresses(range)?.map(|address| {
			let outcome = self.read_byte_retrying(address, retries);
			if let Ok(data) = outcome.result {
				info!("reading address 0x{:02x} data read = 0x{:02x}", address, data);
			}
			outcome
		}).collect())
	}

	/// write the pattern, then read everything back
	pub fn write_and_verify<F>(&mut self, range: Range<u16>, pattern: F, retries: usize) -> crate::AResult<BatchReport>
	where
		F: Fn(u8) -> u8,
	{
		let writes = self.write_range(range.clone(), pattern, retries)?;
		let reads = self.read_range(range, retries)?;
		let report = BatchReport { writes, reads };
		for m in report.mismatches() {
			warn!("0x{:02x}: expected 0x{:02x}, read 0x{:02x}", m.address, m.expected, m.read);
		}
		Ok(report)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	use crate::i2c::SlaveAddress;
	use crate::eeprom::{
		RETRY_COUNT,
		Stage,
	};
	use crate::mpsse::{
		Channel,
		SimulatedMaster,
		Status,
		SIMULATED_EEPROM_ADDRESS,
	};

	fn slave() -> SlaveAddress {
		SlaveAddress::new(SIMULATED_EEPROM_ADDRESS).unwrap()
	}

	fn offset(address: u8) -> u8 {
		address.wrapping_add(1)
	}

	#[test]
	fn retry_counts_attempts() {
		let mut calls = 0;
		let (attempts, result) = with_retry("op", 10, || {
			calls += 1;
			if calls < 3 { Err(TransferError::WriteTimeout(10)) } else { Ok(calls) }
		});
		assert_eq!((attempts, result), (3, Ok(3)));
	}

	#[test]
	fn retry_is_bounded() {
		let mut calls = 0;
		let (attempts, result) = with_retry::<(), _>("op", 10, || {
			calls += 1;
			Err(TransferError::WriteTimeout(10))
		});
		assert_eq!(attempts, 11);
		assert_eq!(calls, 11);
		assert!(result.is_err());
	}

	#[test]
	fn full_range_round_trip() {
		let mut sim = SimulatedMaster::new();
		let report = {
			let mut channel = Channel::open(&mut sim, 1).unwrap();
			let mut eeprom = Eeprom::new(&mut channel, slave());
			eeprom.write_and_verify(0x00..0x10, offset, RETRY_COUNT).unwrap()
		};
		assert_eq!(report.writes.len(), 16);
		assert_eq!(report.reads.len(), 16);
		assert_eq!(report.failed_writes(), 0);
		assert_eq!(report.failed_reads(), 0);
		assert!(report.mismatches().is_empty());
		for address in 0..16u8 {
			assert_eq!(sim.memory(1)[address as usize], offset(address));
		}
	}

	#[test]
	fn transient_write_failure_is_retried() {
		let mut sim = SimulatedMaster::new();
		sim.fail_transfers_at(0x05, 1);
		let report = {
			let mut channel = Channel::open(&mut sim, 1).unwrap();
			let mut eeprom = Eeprom::new(&mut channel, slave());
			eeprom.write_and_verify(0x00..0x10, offset, RETRY_COUNT).unwrap()
		};
		assert_eq!(report.writes[5].attempts, 2);
		assert!(report.writes.iter().enumerate().all(|(i, w)| w.attempts == if i == 5 { 2 } else { 1 }));
		assert_eq!(report.failed_writes(), 0);
		assert!(report.mismatches().is_empty());
	}

	#[test]
	fn transient_read_failure_is_retried() {
		let mut sim = SimulatedMaster::new();
		{
			let mut channel = Channel::open(&mut sim, 1).unwrap();
			Eeprom::new(&mut channel, slave()).write_range(0x00..0x10, offset, RETRY_COUNT).unwrap();
			channel.close().unwrap();
		}
		sim.fail_transfers_at(0x0a, 1);
		let reads = {
			let mut channel = Channel::open(&mut sim, 1).unwrap();
			let mut eeprom = Eeprom::new(&mut channel, slave());
			eeprom.read_range(0x00..0x10, RETRY_COUNT).unwrap()
		};
		assert_eq!(reads.len(), 16);
		assert_eq!(reads[0x0a].attempts, 2);
		assert_eq!(reads[0x0a].result, Ok(offset(0x0a)));
		assert!(reads.iter().all(|r| r.is_ok()));
	}

	#[test]
	fn persistent_failure_skips_address() {
		let mut sim = SimulatedMaster::new();
		sim.fail_transfers_at(0x03, 100);
		let report = {
			let mut channel = Channel::open(&mut sim, 1).unwrap();
			let mut eeprom = Eeprom::new(&mut channel, slave());
			eeprom.write_and_verify(0x00..0x10, offset, RETRY_COUNT).unwrap()
		};
		assert_eq!(report.writes[3].attempts, RETRY_COUNT + 1);
		assert_eq!(report.writes[3].result, Err(TransferError::Status(Stage::WriteCommand, Status::IO_ERROR)));
		assert_eq!(report.reads[3].result, Err(TransferError::Status(Stage::RandomRead, Status::IO_ERROR)));
		assert_eq!(report.failed_writes(), 1);
		assert_eq!(report.failed_reads(), 1);
		// everything after the broken address still went through
		assert!(report.writes[4..].iter().all(|w| w.is_ok()));
		assert!(report.reads[4..].iter().all(|r| r.is_ok()));
	}

	#[test]
	fn range_beyond_eeprom_is_rejected() {
		let mut sim = SimulatedMaster::new();
		{
			let mut channel = Channel::open(&mut sim, 1).unwrap();
			let mut eeprom = Eeprom::new(&mut channel, slave());
			let err = eeprom.write_and_verify(0xf0..0x101, offset, RETRY_COUNT).unwrap_err();
			assert_eq!(err.to_string(), "EEPROM address range 240..257 exceeds 8 bits");
			assert!(eeprom.read_range(0x00..0x200, RETRY_COUNT).is_err());
		}
		assert_eq!(sim.probes(), 0);
		assert!(sim.memory(1).iter().all(|&b| b == 0xff));
	}

	#[test]
	fn mismatch_is_reported() {
		let report = BatchReport {
			writes: vec![
				ByteOutcome { address: 0, attempts: 1, result: Ok(1) },
				ByteOutcome { address: 1, attempts: 1, result: Ok(2) },
			],
			reads: vec![
				ByteOutcome { address: 0, attempts: 1, result: Ok(1) },
				ByteOutcome { address: 1, attempts: 1, result: Ok(0xff) },
			],
		};
		assert_eq!(report.mismatches(), vec![Mismatch { address: 1, expected: 2, read: 0xff }]);
	}
}
