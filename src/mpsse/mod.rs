//! Binding to FTDI's libMPSSE I2C master API.
//!
//! The library itself (and the D2XX driver below it) is closed source; all
//! this module does is describe its operations as the `I2cMaster` capability
//! set, and provide ways to reach an implementation:
//! - `DynamicLibrary`: `dlopen("libMPSSE.so")` at runtime; unix only, there
//!   is no `LoadLibrary` counterpart, so on Windows use `static-link`
//! - `StaticLibrary`: linked at build time (feature `static-link`)
//! - `SimulatedMaster`: in-memory bridge with a 24LC024H attached

use std::fmt;

mod channel;
pub mod ffi;
mod options;
mod simulated;
mod status;

#[cfg(unix)]
mod dynamic;
#[cfg(feature = "static-link")]
mod static_link;

pub use self::channel::Channel;

pub use self::options::{
	ChannelConfig,
	ChannelOptions,
	ClockRate,
	TransferOptions,
};

pub use self::simulated::{
	SimulatedMaster,
	SIMULATED_EEPROM_ADDRESS,
	SIMULATED_EEPROM_SIZE,
};

pub use self::status::{
	Status,
	StatusError,
};

#[cfg(unix)]
pub use self::dynamic::{
	DynamicLibrary,
	DEFAULT_LIBRARY_NAME,
};

#[cfg(feature = "static-link")]
pub use self::static_link::StaticLibrary;

use crate::i2c::{
	SlaveAddress,
	Transfer,
};

/// Opaque `FT_HANDLE` of an open channel
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelHandle(pub ffi::FT_HANDLE);

impl ChannelHandle {
	pub fn as_raw(self) -> ffi::FT_HANDLE {
		self.0
	}
}

impl fmt::Display for ChannelHandle {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "0x{:x}", self.0 as usize)
	}
}

impl fmt::Debug for ChannelHandle {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "ChannelHandle({})", self)
	}
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ChannelInfo {
	pub flags: u32,
	pub device_type: u32,
	pub id: u32,
	pub location_id: u32,
	pub serial_number: String,
	pub description: String,
	pub is_open: bool,
	pub handle: Option<ChannelHandle>,
}

impl fmt::Display for ChannelInfo {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		writeln!(f, "\tFlags=0x{:x}", self.flags)?;
		writeln!(f, "\tType=0x{:x}", self.device_type)?;
		writeln!(f, "\tID=0x{:x}", self.id)?;
		writeln!(f, "\tLocId=0x{:x}", self.location_id)?;
		writeln!(f, "\tSerialNumber={}", self.serial_number)?;
		writeln!(f, "\tDescription={}", self.description)?;
		match self.handle {
			Some(handle) => write!(f, "\tftHandle={}", handle),
			None => write!(f, "\tftHandle=0x0"),
		}
	}
}

/// The operations of libMPSSE's I2C API
///
/// Setup calls return the driver status as error; transfers always return
/// a `Transfer`, as the caller has to look at both the status and the
/// number of bytes that were actually acknowledged.
///
/// Only one call may be in flight per channel; `&mut self` takes care of
/// that.
pub trait I2cMaster {
	/// short name for log messages
	fn binding_name(&self) -> &'static str;

	fn num_channels(&mut self) -> Result<u32, StatusError>;

	fn channel_info(&mut self, index: u32) -> Result<ChannelInfo, StatusError>;

	fn open_channel(&mut self, index: u32) -> Result<ChannelHandle, StatusError>;

	fn init_channel(&mut self, handle: ChannelHandle, config: &ChannelConfig) -> Result<(), StatusError>;

	fn close_channel(&mut self, handle: ChannelHandle) -> Result<(), StatusError>;

	/// write all of `buffer` to the slave
	fn device_write(
		&mut self,
		handle: ChannelHandle,
		slave: SlaveAddress,
		buffer: &[u8],
		options: TransferOptions,
	) -> Transfer;

	/// fill `buffer` from the slave
	fn device_read(
		&mut self,
		handle: ChannelHandle,
		slave: SlaveAddress,
		buffer: &mut [u8],
		options: TransferOptions,
	) -> Transfer;
}

impl<M: I2cMaster + ?Sized> I2cMaster for Box<M> {
	fn binding_name(&self) -> &'static str {
		(**self).binding_name()
	}

	fn num_channels(&mut self) -> Result<u32, StatusError> {
		(**self).num_channels()
	}

	fn channel_info(&mut self, index: u32) -> Result<ChannelInfo, StatusError> {
		(**self).channel_info(index)
	}

	fn open_channel(&mut self, index: u32) -> Result<ChannelHandle, StatusError> {
		(**self).open_channel(index)
	}

	fn init_channel(&mut self, handle: ChannelHandle, config: &ChannelConfig) -> Result<(), StatusError> {
		(**self).init_channel(handle, config)
	}

	fn close_channel(&mut self, handle: ChannelHandle) -> Result<(), StatusError> {
		(**self).close_channel(handle)
	}

	fn device_write(&mut self, handle: ChannelHandle, slave: SlaveAddress, buffer: &[u8], options: TransferOptions) -> Transfer {
		(**self).device_write(handle, slave, buffer, options)
	}

	fn device_read(&mut self, handle: ChannelHandle, slave: SlaveAddress, buffer: &mut [u8], options: TransferOptions) -> Transfer {
		(**self).device_read(handle, slave, buffer, options)
	}
}
