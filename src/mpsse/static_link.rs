use std::ptr;

use crate::i2c::{
	SlaveAddress,
	Transfer,
};

use super::ffi::{
	FT_DEVICE_LIST_INFO_NODE,
	FT_HANDLE,
	FT_STATUS,
	I2C_ChannelConfig,
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

#[allow(non_snake_case)]
#[link(name = "MPSSE")]
#[link(name = "ftd2xx")]
extern "C" {
	fn I2C_GetNumChannels(numChannels: *mut u32) -> FT_STATUS;
	fn I2C_GetChannelInfo(index: u32, chanInfo: *mut FT_DEVICE_LIST_INFO_NODE) -> FT_STATUS;
	fn I2C_OpenChannel(index: u32, handle: *mut FT_HANDLE) -> FT_STATUS;
	fn I2C_InitChannel(handle: FT_HANDLE, config: *mut I2C_ChannelConfig) -> FT_STATUS;
	fn I2C_CloseChannel(handle: FT_HANDLE) -> FT_STATUS;
	fn I2C_DeviceRead(
		handle: FT_HANDLE,
		deviceAddress: u32,
		sizeToTransfer: u32,
		buffer: *mut u8,
		sizeTransfered: *mut u32,
		options: u32,
	) -> FT_STATUS;
	fn I2C_DeviceWrite(
		handle: FT_HANDLE,
		deviceAddress: u32,
		sizeToTransfer: u32,
		buffer: *mut u8,
		sizeTransfered: *mut u32,
		options: u32,
	) -> FT_STATUS;
}

// the MSVC build of the static library needs explicit setup / teardown
#[cfg(target_env = "msvc")]
#[allow(non_snake_case)]
extern "C" {
	fn Init_libMPSSE();
	fn Cleanup_libMPSSE();
}

/// libMPSSE linked into the binary
pub struct StaticLibrary {
	_private: (),
}

impl StaticLibrary {
	pub fn new() -> Self {
		#[cfg(target_env = "msvc")]
		unsafe { Init_libMPSSE() };
		StaticLibrary { _private: () }
	}
}

impl Default for StaticLibrary {
	fn default() -> Self {
		Self::new()
	}
}

impl Drop for StaticLibrary {
	fn drop(&mut self) {
		#[cfg(target_env = "msvc")]
		unsafe { Cleanup_libMPSSE() };
	}
}

impl I2cMaster for StaticLibrary {
	fn binding_name(&self) -> &'static str {
		"static"
	}

	fn num_channels(&mut self) -> Result<u32, StatusError> {
		let mut channels = 0u32;
		Status(unsafe { I2C_GetNumChannels(&mut channels) }).check("I2C_GetNumChannels")?;
		Ok(channels)
	}

	fn channel_info(&mut self, index: u32) -> Result<ChannelInfo, StatusError> {
		let mut node = FT_DEVICE_LIST_INFO_NODE::default();
		Status(unsafe { I2C_GetChannelInfo(index, &mut node) }).check("I2C_GetChannelInfo")?;
		Ok(ChannelInfo::from(&node))
	}

	fn open_channel(&mut self, index: u32) -> Result<ChannelHandle, StatusError> {
		let mut handle: FT_HANDLE = ptr::null_mut();
		Status(unsafe { I2C_OpenChannel(index, &mut handle) }).check("I2C_OpenChannel")?;
		Ok(ChannelHandle(handle))
	}

	fn init_channel(&mut self, handle: ChannelHandle, config: &ChannelConfig) -> Result<(), StatusError> {
		let mut raw = I2C_ChannelConfig::from(config);
		Status(unsafe { I2C_InitChannel(handle.as_raw(), &mut raw) }).check("I2C_InitChannel")
	}

	fn close_channel(&mut self, handle: ChannelHandle) -> Result<(), StatusError> {
		Status(unsafe { I2C_CloseChannel(handle.as_raw()) }).check("I2C_CloseChannel")
	}

	fn device_write(&mut self, handle: ChannelHandle, slave: SlaveAddress, buffer: &[u8], options: TransferOptions) -> Transfer {
		let mut data = buffer.to_vec();
		let mut transferred = 0u32;
		let status = Status(unsafe {
			I2C_DeviceWrite(handle.as_raw(), slave.get() as u32, data.len() as u32, data.as_mut_ptr(), &mut transferred, options.0)
		});
		Transfer { transferred: transferred as usize, status }
	}

	fn device_read(&mut self, handle: ChannelHandle, slave: SlaveAddress, buffer: &mut [u8], options: TransferOptions) -> Transfer {
		let mut transferred = 0u32;
		let status = Status(unsafe {
			I2C_DeviceRead(handle.as_raw(), slave.get() as u32, buffer.len() as u32, buffer.as_mut_ptr(), &mut transferred, options.0)
		});
		Transfer { transferred: transferred as usize, status }
	}
}
