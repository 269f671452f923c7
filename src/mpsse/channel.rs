use crate::i2c::{
	I2cBus,
	SlaveAddress,
	Transfer,
};

use super::{
	ChannelConfig,
	ChannelHandle,
	I2cMaster,
	TransferOptions,
};

/// An open channel; closed exactly once, either by `close` or on drop.
pub struct Channel<'a, M: I2cMaster + ?Sized + 'a> {
	master: &'a mut M,
	handle: ChannelHandle,
	index: u32,
	open: bool,
}

impl<'a, M: I2cMaster + ?Sized> Channel<'a, M> {
	pub fn open(master: &'a mut M, index: u32) -> crate::AResult<Self> {
		let handle = with_context!(("open channel {}", index), {
			Ok(master.open_channel(index)?)
		})?;
		debug!("{}: opened channel {} (handle {})", master.binding_name(), index, handle);

		Ok(Channel {
			master,
			handle,
			index,
			open: true,
		})
	}

	pub fn handle(&self) -> ChannelHandle {
		self.handle
	}

	pub fn index(&self) -> u32 {
		self.index
	}

	pub fn init(&mut self, config: &ChannelConfig) -> crate::AResult<()> {
		let handle = self.handle;
		let master = &mut *self.master;
		with_context!(("init channel {} at {}, latency {} ms", self.index, config.clock_rate, config.latency_timer), {
			Ok(master.init_channel(handle, config)?)
		})
	}

	pub fn close(mut self) -> crate::AResult<()> {
		self.open = false;
		let handle = self.handle;
		let master = &mut *self.master;
		with_context!(("close channel {}", self.index), {
			Ok(master.close_channel(handle)?)
		})
	}
}

impl<'a, M: I2cMaster + ?Sized> Drop for Channel<'a, M> {
	fn drop(&mut self) {
		if self.open {
			self.open = false;
			if let Err(e) = self.master.close_channel(self.handle) {
				error!("Couldn't close channel {}: {}", self.index, e);
			}
		}
	}
}

impl<'a, M: I2cMaster + ?Sized> I2cBus for Channel<'a, M> {
	fn write(&mut self, slave: SlaveAddress, buffer: &[u8], options: TransferOptions) -> Transfer {
		self.master.device_write(self.handle, slave, buffer, options)
	}

	fn read(&mut self, slave: SlaveAddress, buffer: &mut [u8], options: TransferOptions) -> Transfer {
		self.master.device_read(self.handle, slave, buffer, options)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::mpsse::SimulatedMaster;

	#[test]
	fn close_once_after_explicit_close() {
		let mut sim = SimulatedMaster::new();
		{
			let mut channel = Channel::open(&mut sim, 1).unwrap();
			channel.init(&ChannelConfig::default()).unwrap();
			channel.close().unwrap();
		}
		assert_eq!(sim.open_calls(), 1);
		assert_eq!(sim.close_calls(), 1);
		assert_eq!(sim.open_channels(), 0);
	}

	#[test]
	fn close_on_drop() {
		let mut sim = SimulatedMaster::new();
		{
			let _channel = Channel::open(&mut sim, 0).unwrap();
		}
		assert_eq!(sim.close_calls(), 1);
		assert_eq!(sim.open_channels(), 0);
	}

	#[test]
	fn failed_open_is_never_closed() {
		let mut sim = SimulatedMaster::new();
		sim.fail_open(true);
		assert!(Channel::open(&mut sim, 1).is_err());
		assert_eq!(sim.open_calls(), 1);
		assert_eq!(sim.close_calls(), 0);
	}

	#[test]
	fn open_out_of_range() {
		let mut sim = SimulatedMaster::new();
		let err = Channel::open(&mut sim, 7).err().unwrap();
		assert!(err.to_string().starts_with("open channel 7: "));
		assert_eq!(sim.close_calls(), 0);
	}

	#[test]
	fn init_reaches_master() {
		let mut sim = SimulatedMaster::new();
		let mut config = ChannelConfig::default();
		config.latency_timer = 16;
		{
			let mut channel = Channel::open(&mut sim, 0).unwrap();
			channel.init(&config).unwrap();
		}
		assert_eq!(sim.last_config(), Some(config));
	}
}
