use std::collections::HashMap;

use crate::i2c::{
	SlaveAddress,
	Transfer,
};

use super::{
	ChannelConfig,
	ChannelHandle,
	ChannelInfo,
	I2cMaster,
	Status,
	StatusError,
	TransferOptions,
};

/// the 24LC024H on every simulated bus answers here (A2..A0 tied high)
pub const SIMULATED_EEPROM_ADDRESS: u8 = 0x57;
/// 2 kbit
pub const SIMULATED_EEPROM_SIZE: usize = 256;

const PAGE_SIZE: usize = 16;
const ERASED: u8 = 0xff;

// FT_DEVICE_2232H
const DEVICE_TYPE_2232H: u32 = 6;
const FLAGS_OPENED: u32 = 0x1;
const FLAGS_HISPEED: u32 = 0x2;

struct SimEeprom {
	memory: [u8; SIMULATED_EEPROM_SIZE],
	pointer: u8,
	// NACKs left until the internal write cycle is done
	busy: usize,
}

impl SimEeprom {
	fn new() -> Self {
		SimEeprom {
			memory: [ERASED; SIMULATED_EEPROM_SIZE],
			pointer: 0,
			busy: 0,
		}
	}

	// addressing phase; false is a NACK
	fn select(&mut self) -> bool {
		if self.busy > 0 {
			self.busy -= 1;
			false
		} else {
			true
		}
	}

	// page write: the low 4 address bits wrap around inside the page
	fn program(&mut self, register: u8, data: &[u8]) {
		let page = register as usize & !(PAGE_SIZE - 1);
		for (i, b) in data.iter().enumerate() {
			let offset = (register as usize + i) % PAGE_SIZE;
			self.memory[page + offset] = *b;
		}
		self.pointer = register.wrapping_add(data.len() as u8);
	}
}

struct SimChannel {
	serial_number: String,
	description: String,
	location_id: u32,
	open: bool,
	eeprom: SimEeprom,
}

/// An FT2232H-like dual channel bridge living in memory, with a 24LC024H
/// attached to each channel.
///
/// The EEPROM NACKs every addressing attempt for a configurable number of
/// polls after each committed write, to model its internal write cycle.
/// Transfers whose first byte is a given register address can be made to
/// fail with `FT_IO_ERROR`.
pub struct SimulatedMaster {
	channels: Vec<SimChannel>,
	write_cycle_polls: usize,
	faults: HashMap<u8, usize>,
	fail_open: bool,
	fail_init: bool,
	last_config: Option<ChannelConfig>,
	open_calls: usize,
	close_calls: usize,
	probes: usize,
}

impl SimulatedMaster {
	pub fn new() -> Self {
		Self::with_channels(2)
	}

	pub fn with_channels(count: u32) -> Self {
		let channels = (0..count).map(|i| {
			let suffix = (b'A' + (i % 26) as u8) as char;
			SimChannel {
				serial_number: format!("FTSIM01{}", suffix),
				description: format!("Dual RS232-HS {}", suffix),
				location_id: 0x1011 + i,
				open: false,
				eeprom: SimEeprom::new(),
			}
		}).collect();

		SimulatedMaster {
			channels,
			write_cycle_polls: 2,
			faults: HashMap::new(),
			fail_open: false,
			fail_init: false,
			last_config: None,
			open_calls: 0,
			close_calls: 0,
			probes: 0,
		}
	}

	/// number of addressing attempts the EEPROM NACKs after each write
	pub fn set_write_cycle_polls(&mut self, polls: usize) {
		self.write_cycle_polls = polls;
	}

	/// let the next `count` writes starting with `register` fail
	pub fn fail_transfers_at(&mut self, register: u8, count: usize) {
		*self.faults.entry(register).or_insert(0) += count;
	}

	pub fn fail_open(&mut self, fail: bool) {
		self.fail_open = fail;
	}

	/// `I2C_InitChannel` fails on an otherwise valid handle
	pub fn fail_init(&mut self, fail: bool) {
		self.fail_init = fail;
	}

	pub fn memory(&self, channel: u32) -> &[u8] {
		&self.channels[channel as usize].eeprom.memory
	}

	pub fn last_config(&self) -> Option<ChannelConfig> {
		self.last_config
	}

	pub fn open_calls(&self) -> usize {
		self.open_calls
	}

	pub fn close_calls(&self) -> usize {
		self.close_calls
	}

	pub fn open_channels(&self) -> usize {
		self.channels.iter().filter(|c| c.open).count()
	}

	/// completion probes (1 byte, BREAK_ON_NACK) seen so far
	pub fn probes(&self) -> usize {
		self.probes
	}

	fn handle_for(index: usize) -> ChannelHandle {
		ChannelHandle((index + 1) as *mut libc::c_void)
	}

	fn channel_mut(&mut self, handle: ChannelHandle) -> Option<&mut SimChannel> {
		let index = (handle.as_raw() as usize).checked_sub(1)?;
		self.channels.get_mut(index).filter(|c| c.open)
	}

	fn take_fault(&mut self, register: u8) -> bool {
		match self.faults.get_mut(&register) {
			Some(n) if *n > 0 => {
				*n -= 1;
				true
			},
			_ => false,
		}
	}
}

impl Default for SimulatedMaster {
	fn default() -> Self {
		Self::new()
	}
}

impl I2cMaster for SimulatedMaster {
	fn binding_name(&self) -> &'static str {
		"simulated"
	}

	fn num_channels(&mut self) -> Result<u32, StatusError> {
		Ok(self.channels.len() as u32)
	}

	fn channel_info(&mut self, index: u32) -> Result<ChannelInfo, StatusError> {
		let channel = match self.channels.get(index as usize) {
			Some(c) => c,
			None => return Err(StatusError { call: "I2C_GetChannelInfo", status: Status::INVALID_PARAMETER }),
		};
		let handle = if channel.open { Some(Self::handle_for(index as usize)) } else { None };
		Ok(ChannelInfo {
			flags: FLAGS_HISPEED | if channel.open { FLAGS_OPENED } else { 0 },
			device_type: DEVICE_TYPE_2232H,
			id: 0x0403_6010,
			location_id: channel.location_id,
			serial_number: channel.serial_number.clone(),
			description: channel.description.clone(),
			is_open: channel.open,
			handle,
		})
	}

	fn open_channel(&mut self, index: u32) -> Result<ChannelHandle, StatusError> {
		self.open_calls += 1;
		if self.fail_open {
			return Err(StatusError { call: "I2C_OpenChannel", status: Status::DEVICE_NOT_FOUND });
		}
		let channel = match self.channels.get_mut(index as usize) {
			Some(c) => c,
			None => return Err(StatusError { call: "I2C_OpenChannel", status: Status::DEVICE_NOT_FOUND }),
		};
		if channel.open {
			return Err(StatusError { call: "I2C_OpenChannel", status: Status::DEVICE_NOT_OPENED });
		}
		channel.open = true;
		Ok(Self::handle_for(index as usize))
	}

	fn init_channel(&mut self, handle: ChannelHandle, config: &ChannelConfig) -> Result<(), StatusError> {
		if self.channel_mut(handle).is_none() {
			return Err(StatusError { call: "I2C_InitChannel", status: Status::INVALID_HANDLE });
		}
		if self.fail_init {
			return Err(StatusError { call: "I2C_InitChannel", status: Status::IO_ERROR });
		}
		self.last_config = Some(*config);
		Ok(())
	}

	fn close_channel(&mut self, handle: ChannelHandle) -> Result<(), StatusError> {
		self.close_calls += 1;
		match self.channel_mut(handle) {
			Some(channel) => {
				channel.open = false;
				Ok(())
			},
			None => Err(StatusError { call: "I2C_CloseChannel", status: Status::INVALID_HANDLE }),
		}
	}

	fn device_write(&mut self, handle: ChannelHandle, slave: SlaveAddress, buffer: &[u8], options: TransferOptions) -> Transfer {
		if buffer.is_empty() {
			return Transfer::failed(Status::INVALID_PARAMETER);
		}
		if options.is_break_on_nack() && buffer.len() == 1 {
			self.probes += 1;
		}
		if self.take_fault(buffer[0]) {
			return Transfer::failed(Status::IO_ERROR);
		}
		let write_cycle_polls = self.write_cycle_polls;
		let channel = match self.channel_mut(handle) {
			Some(c) => c,
			None => return Transfer::failed(Status::INVALID_HANDLE),
		};

		// nobody else on the bus
		let acked = slave.get() == SIMULATED_EEPROM_ADDRESS && channel.eeprom.select();
		if !acked {
			// without BREAK_ON_NACK the driver clocks the bytes out anyway
			let transferred = if options.is_break_on_nack() { 0 } else { buffer.len() };
			return Transfer { transferred, status: Status::OK };
		}

		let eeprom = &mut channel.eeprom;
		if buffer.len() > 1 && options.is_stop_bit() {
			eeprom.program(buffer[0], &buffer[1..]);
			eeprom.busy = write_cycle_polls;
		} else {
			eeprom.pointer = buffer[0];
		}
		Transfer { transferred: buffer.len(), status: Status::OK }
	}

	fn device_read(&mut self, handle: ChannelHandle, slave: SlaveAddress, buffer: &mut [u8], _options: TransferOptions) -> Transfer {
		let channel = match self.channel_mut(handle) {
			Some(c) => c,
			None => return Transfer::failed(Status::INVALID_HANDLE),
		};
		if slave.get() != SIMULATED_EEPROM_ADDRESS || !channel.eeprom.select() {
			// released bus reads as ones
			for b in buffer.iter_mut() {
				*b = 0xff;
			}
			return Transfer { transferred: 0, status: Status::OK };
		}

		let eeprom = &mut channel.eeprom;
		for b in buffer.iter_mut() {
			*b = eeprom.memory[eeprom.pointer as usize];
			eeprom.pointer = eeprom.pointer.wrapping_add(1);
		}
		Transfer { transferred: buffer.len(), status: Status::OK }
	}
}
