use std::ffi::{
	CStr,
	CString,
};
use std::mem;
use std::ptr;

use libc::{
	RTLD_LAZY,
	c_void,
	dlclose,
	dlerror,
	dlopen,
	dlsym,
};

use crate::i2c::{
	SlaveAddress,
	Transfer,
};

use super::ffi;
use super::{
	ChannelConfig,
	ChannelHandle,
	ChannelInfo,
	I2cMaster,
	Status,
	StatusError,
	TransferOptions,
};

pub const DEFAULT_LIBRARY_NAME: &str = "libMPSSE.so";

fn last_dl_error() -> String {
	let msg = unsafe { dlerror() };
	if msg.is_null() {
		"unknown error".to_string()
	} else {
		unsafe { CStr::from_ptr(msg) }.to_string_lossy().into_owned()
	}
}

struct Symbols {
	get_num_channels: ffi::I2C_GetNumChannels,
	get_channel_info: ffi::I2C_GetChannelInfo,
	open_channel: ffi::I2C_OpenChannel,
	init_channel: ffi::I2C_InitChannel,
	close_channel: ffi::I2C_CloseChannel,
	device_read: ffi::I2C_DeviceRead,
	device_write: ffi::I2C_DeviceWrite,
}

/// libMPSSE loaded at runtime with `dlopen`
pub struct DynamicLibrary {
	library: ptr::NonNull<c_void>,
	symbols: Symbols,
}

impl Drop for DynamicLibrary {
	fn drop(&mut self) {
		let res = unsafe { dlclose(self.library.as_ptr()) };
		if 0 != res {
			warn!("dlclose failed: {}", last_dl_error());
		}
	}
}

// resolve `name` and reinterpret it as function pointer type `F`
unsafe fn resolve<F: Copy>(library: ptr::NonNull<c_void>, name: &str) -> crate::AResult<F> {
	assert_eq!(mem::size_of::<F>(), mem::size_of::<*mut c_void>());
	let cname = CString::new(name)?;
	// clear stale error state; NULL is a valid symbol value in general
	dlerror();
	let sym = dlsym(library.as_ptr(), cname.as_ptr());
	if sym.is_null() {
		bail!("dlsym {}: {}", name, last_dl_error());
	}
	Ok(mem::transmute_copy::<*mut c_void, F>(&sym))
}

impl DynamicLibrary {
	pub fn open(path: &str) -> crate::AResult<Self> {
		let cpath = CString::new(path)?;
		let handle = unsafe { dlopen(cpath.as_ptr(), RTLD_LAZY) };
		let library = match ptr::NonNull::new(handle) {
			None => bail!("Failed loading {}: {}", path, last_dl_error()),
			Some(l) => l,
		};

		let symbols = match unsafe { Self::resolve_all(library) } {
			Ok(s) => s,
			Err(e) => {
				unsafe { dlclose(library.as_ptr()) };
				return Err(e);
			},
		};
		info!("Loaded {}", path);

		Ok(DynamicLibrary {
			library,
			symbols,
		})
	}

	unsafe fn resolve_all(library: ptr::NonNull<c_void>) -> crate::AResult<Symbols> {
		Ok(Symbols {
			get_num_channels: resolve(library, "I2C_GetNumChannels")?,
			get_channel_info: resolve(library, "I2C_GetChannelInfo")?,
			open_channel: resolve(library, "I2C_OpenChannel")?,
			init_channel: resolve(library, "I2C_InitChannel")?,
			close_channel: resolve(library, "I2C_CloseChannel")?,
			device_read: resolve(library, "I2C_DeviceRead")?,
			device_write: resolve(library, "I2C_DeviceWrite")?,
		})
	}
}

impl I2cMaster for DynamicLibrary {
	fn binding_name(&self) -> &'static str {
		"dynamic"
	}

	fn num_channels(&mut self) -> Result<u32, StatusError> {
		let mut channels = 0u32;
		let status = Status(unsafe { (self.symbols.get_num_channels)(&mut channels) });
		status.check("I2C_GetNumChannels")?;
		Ok(channels)
	}

	fn channel_info(&mut self, index: u32) -> Result<ChannelInfo, StatusError> {
		let mut node = ffi::FT_DEVICE_LIST_INFO_NODE::default();
		let status = Status(unsafe { (self.symbols.get_channel_info)(index, &mut node) });
		status.check("I2C_GetChannelInfo")?;
		Ok(ChannelInfo::from(&node))
	}

	fn open_channel(&mut self, index: u32) -> Result<ChannelHandle, StatusError> {
		let mut handle: ffi::FT_HANDLE = ptr::null_mut();
		let status = Status(unsafe { (self.symbols.open_channel)(index, &mut handle) });
		status.check("I2C_OpenChannel")?;
		Ok(ChannelHandle(handle))
	}

	fn init_channel(&mut self, handle: ChannelHandle, config: &ChannelConfig) -> Result<(), StatusError> {
		let mut raw = ffi::I2C_ChannelConfig::from(config);
		let status = Status(unsafe { (self.symbols.init_channel)(handle.as_raw(), &mut raw) });
		status.check("I2C_InitChannel")
	}

	fn close_channel(&mut self, handle: ChannelHandle) -> Result<(), StatusError> {
		let status = Status(unsafe { (self.symbols.close_channel)(handle.as_raw()) });
		status.check("I2C_CloseChannel")
	}

	fn device_write(&mut self, handle: ChannelHandle, slave: SlaveAddress, buffer: &[u8], options: TransferOptions) -> Transfer {
		// the C API takes a mutable buffer even for writes
		let mut data = buffer.to_vec();
		let mut transferred = 0u32;
		let status = Status(unsafe {
			(self.symbols.device_write)(
				handle.as_raw(),
				slave.get() as u32,
				data.len() as u32,
				data.as_mut_ptr(),
				&mut transferred,
				options.0,
			)
		});
		Transfer { transferred: transferred as usize, status }
	}

	fn device_read(&mut self, handle: ChannelHandle, slave: SlaveAddress, buffer: &mut [u8], options: TransferOptions) -> Transfer {
		let mut transferred = 0u32;
		let status = Status(unsafe {
			(self.symbols.device_read)(
				handle.as_raw(),
				slave.get() as u32,
				buffer.len() as u32,
				buffer.as_mut_ptr(),
				&mut transferred,
				options.0,
			)
		});
		Transfer { transferred: transferred as usize, status }
	}
}
