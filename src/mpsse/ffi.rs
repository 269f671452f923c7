//! C ABI of `libMPSSE_i2c.h` / `ftd2xx.h`
#![allow(non_camel_case_types, non_snake_case)]

use libc::{
	c_char,
	c_void,
};

use super::{
	ChannelConfig,
	ChannelHandle,
	ChannelInfo,
};

pub type FT_STATUS = u32;
pub type FT_HANDLE = *mut c_void;

const FT_FLAGS_OPENED: u32 = 0x1;

#[repr(C)]
#[derive(Clone, Copy)]
pub struct FT_DEVICE_LIST_INFO_NODE {
	pub Flags: u32,
	pub Type: u32,
	pub ID: u32,
	pub LocId: u32,
	pub SerialNumber: [c_char; 16],
	pub Description: [c_char; 64],
	pub ftHandle: FT_HANDLE,
}

impl Default for FT_DEVICE_LIST_INFO_NODE {
	fn default() -> Self {
		FT_DEVICE_LIST_INFO_NODE {
			Flags: 0,
			Type: 0,
			ID: 0,
			LocId: 0,
			SerialNumber: [0; 16],
			Description: [0; 64],
			ftHandle: std::ptr::null_mut(),
		}
	}
}

// the driver doesn't guarantee NUL termination if the string fills the array
fn c_chars_to_string(chars: &[c_char]) -> String {
	let bytes: Vec<u8> = chars.iter()
		.take_while(|&&c| c != 0)
		.map(|&c| c as u8)
		.collect();
	String::from_utf8_lossy(&bytes).into_owned()
}

impl From<&FT_DEVICE_LIST_INFO_NODE> for ChannelInfo {
	fn from(node: &FT_DEVICE_LIST_INFO_NODE) -> Self {
		let handle = if node.ftHandle.is_null() {
			None
		} else {
			Some(ChannelHandle(node.ftHandle))
		};
		ChannelInfo {
			flags: node.Flags,
			device_type: node.Type,
			id: node.ID,
			location_id: node.LocId,
			serial_number: c_chars_to_string(&node.SerialNumber),
			description: c_chars_to_string(&node.Description),
			is_open: handle.is_some() || 0 != node.Flags & FT_FLAGS_OPENED,
			handle,
		}
	}
}

#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct I2C_ChannelConfig {
	pub ClockRate: u32,
	pub LatencyTimer: u8,
	pub Options: u32,
}

impl From<&ChannelConfig> for I2C_ChannelConfig {
	fn from(config: &ChannelConfig) -> Self {
		I2C_ChannelConfig {
			ClockRate: config.clock_rate.hz(),
			LatencyTimer: config.latency_timer,
			Options: config.options.0,
		}
	}
}

pub type I2C_GetNumChannels = unsafe extern "C" fn(numChannels: *mut u32) -> FT_STATUS;
pub type I2C_GetChannelInfo = unsafe extern "C" fn(index: u32, chanInfo: *mut FT_DEVICE_LIST_INFO_NODE) -> FT_STATUS;
pub type I2C_OpenChannel = unsafe extern "C" fn(index: u32, handle: *mut FT_HANDLE) -> FT_STATUS;
pub type I2C_InitChannel = unsafe extern "C" fn(handle: FT_HANDLE, config: *mut I2C_ChannelConfig) -> FT_STATUS;
pub type I2C_CloseChannel = unsafe extern "C" fn(handle: FT_HANDLE) -> FT_STATUS;
pub type I2C_DeviceRead = unsafe extern "C" fn(
	handle: FT_HANDLE,
	deviceAddress: u32,
	sizeToTransfer: u32,
	buffer: *mut u8,
	sizeTransfered: *mut u32,
	options: u32,
) -> FT_STATUS;
pub type I2C_DeviceWrite = unsafe extern "C" fn(
	handle: FT_HANDLE,
	deviceAddress: u32,
	sizeToTransfer: u32,
	buffer: *mut u8,
	sizeTransfered: *mut u32,
	options: u32,
) -> FT_STATUS;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn info_node_strings_stop_at_nul_or_array_end() {
		let mut node = FT_DEVICE_LIST_INFO_NODE::default();
		for (t, s) in node.SerialNumber.iter_mut().zip(b"FT1234A\0junk") {
			*t = *s as c_char;
		}
		for t in node.Description.iter_mut() {
			*t = b'x' as c_char;
		}
		let info = ChannelInfo::from(&node);
		assert_eq!(info.serial_number, "FT1234A");
		assert_eq!(info.description.len(), 64);
		assert!(!info.is_open);
		assert!(info.handle.is_none());
	}

	#[test]
	fn config_layout_follows_header() {
		let raw = I2C_ChannelConfig::from(&ChannelConfig::default());
		assert_eq!(raw.ClockRate, 400_000);
		assert_eq!(raw.LatencyTimer, 255);
		assert_eq!(raw.Options, 0);
		assert_eq!(std::mem::size_of::<I2C_ChannelConfig>(), 12);
	}
}
