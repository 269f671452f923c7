use std::fmt;
use std::str::FromStr;

// I2C_DeviceWrite / I2C_DeviceRead option bits
const TRANSFER_START_BIT:          u32 = 0x0000_0001;
const TRANSFER_STOP_BIT:           u32 = 0x0000_0002;
const TRANSFER_BREAK_ON_NACK:      u32 = 0x0000_0004;
const TRANSFER_NACK_LAST_BYTE:     u32 = 0x0000_0008;
const TRANSFER_FAST_TRANSFER_BYTES: u32 = 0x0000_0010;
const TRANSFER_FAST_TRANSFER_BITS: u32 = 0x0000_0020;
const TRANSFER_NO_ADDRESS:         u32 = 0x0000_0040;

// ChannelConfig.Options bits
const CHANNEL_DISABLE_3PHASE_CLOCKING: u32 = 0x0000_0001;
const CHANNEL_ENABLE_DRIVE_ONLY_ZERO:  u32 = 0x0000_0002;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TransferOptions(pub u32);

impl TransferOptions {
	pub fn none() -> Self {
		TransferOptions(0)
	}

	/// START ... STOP: a complete, self-contained transaction
	pub fn start_stop() -> Self {
		*TransferOptions(0)
			.set_start_bit()
			.set_stop_bit()
	}

	/// START without STOP; the bus stays claimed for a repeated start
	pub fn start() -> Self {
		*TransferOptions(0)
			.set_start_bit()
	}

	/// START and abort on the first missing ACK; used to probe a busy device
	pub fn probe() -> Self {
		*TransferOptions(0)
			.set_start_bit()
			.set_break_on_nack()
	}

	pub fn is_start_bit(&self) -> bool {
		0 != self.0 & TRANSFER_START_BIT
	}
	pub fn set_start_bit(&mut self) -> &mut Self {
		self.0 |= TRANSFER_START_BIT;
		self
	}

	pub fn is_stop_bit(&self) -> bool {
		0 != self.0 & TRANSFER_STOP_BIT
	}
	pub fn set_stop_bit(&mut self) -> &mut Self {
		self.0 |= TRANSFER_STOP_BIT;
		self
	}

	pub fn is_break_on_nack(&self) -> bool {
		0 != self.0 & TRANSFER_BREAK_ON_NACK
	}
	pub fn set_break_on_nack(&mut self) -> &mut Self {
		self.0 |= TRANSFER_BREAK_ON_NACK;
		self
	}

	pub fn is_nack_last_byte(&self) -> bool {
		0 != self.0 & TRANSFER_NACK_LAST_BYTE
	}
	pub fn set_nack_last_byte(&mut self) -> &mut Self {
		self.0 |= TRANSFER_NACK_LAST_BYTE;
		self
	}

	pub fn is_fast_transfer_bytes(&self) -> bool {
		0 != self.0 & TRANSFER_FAST_TRANSFER_BYTES
	}
	pub fn is_fast_transfer_bits(&self) -> bool {
		0 != self.0 & TRANSFER_FAST_TRANSFER_BITS
	}
	pub fn is_no_address(&self) -> bool {
		0 != self.0 & TRANSFER_NO_ADDRESS
	}
}

impl fmt::Debug for TransferOptions {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "0x{:02x} (", self.0)?;
		if self.is_start_bit() { write!(f, " [START]")?; }
		if self.is_stop_bit() { write!(f, " [STOP]")?; }
		if self.is_break_on_nack() { write!(f, " [BREAK_ON_NACK]")?; }
		if self.is_nack_last_byte() { write!(f, " [NACK_LAST_BYTE]")?; }
		if self.is_fast_transfer_bytes() { write!(f, " [FAST_BYTES]")?; }
		if self.is_fast_transfer_bits() { write!(f, " [FAST_BITS]")?; }
		if self.is_no_address() { write!(f, " [NO_ADDRESS]")?; }
		write!(f, " )")
	}
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug)]
pub struct ChannelOptions(pub u32);

impl ChannelOptions {
	pub fn is_3phase_clocking_disabled(&self) -> bool {
		0 != self.0 & CHANNEL_DISABLE_3PHASE_CLOCKING
	}
	pub fn disable_3phase_clocking(&mut self) -> &mut Self {
		self.0 |= CHANNEL_DISABLE_3PHASE_CLOCKING;
		self
	}

	pub fn is_drive_only_zero(&self) -> bool {
		0 != self.0 & CHANNEL_ENABLE_DRIVE_ONLY_ZERO
	}
	pub fn enable_drive_only_zero(&mut self) -> &mut Self {
		self.0 |= CHANNEL_ENABLE_DRIVE_ONLY_ZERO;
		self
	}
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum ClockRate {
	Standard,
	Fast,
	FastPlus,
	HighSpeed,
	Hz(u32),
}

impl ClockRate {
	pub fn hz(self) -> u32 {
		match self {
			ClockRate::Standard => 100_000,
			ClockRate::Fast => 400_000,
			ClockRate::FastPlus => 1_000_000,
			ClockRate::HighSpeed => 3_400_000,
			ClockRate::Hz(hz) => hz,
		}
	}
}

impl Default for ClockRate {
	fn default() -> Self {
		ClockRate::Fast
	}
}

impl fmt::Display for ClockRate {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "{} Hz", self.hz())
	}
}

impl FromStr for ClockRate {
	type Err = failure::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(match s {
			"standard" => ClockRate::Standard,
			"fast" => ClockRate::Fast,
			"fast-plus" => ClockRate::FastPlus,
			"high-speed" => ClockRate::HighSpeed,
			_ => {
				let hz: u32 = s.parse()
					.map_err(|_| format_err!("unknown clock rate {:?} (expected standard, fast, fast-plus, high-speed or a rate in Hz)", s))?;
				ensure!(hz > 0, "clock rate must not be zero");
				ClockRate::Hz(hz)
			},
		})
	}
}

/// Parameters for `I2C_InitChannel`
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ChannelConfig {
	pub clock_rate: ClockRate,
	/// USB latency timer in milliseconds
	pub latency_timer: u8,
	pub options: ChannelOptions,
}

impl Default for ChannelConfig {
	fn default() -> Self {
		ChannelConfig {
			clock_rate: ClockRate::Fast,
			latency_timer: 255,
			options: ChannelOptions::default(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use test_case::test_case;

	#[test]
	fn transfer_option_bits() {
		assert_eq!(TransferOptions::start_stop().0, 0x03);
		assert_eq!(TransferOptions::start().0, 0x01);
		assert_eq!(TransferOptions::probe().0, 0x05);
		assert!(!TransferOptions::start().is_stop_bit());
		assert!(TransferOptions::probe().is_break_on_nack());
		assert_eq!(TransferOptions::none().set_nack_last_byte().0, 0x08);
	}

	#[test]
	fn channel_option_bits() {
		let mut options = ChannelOptions::default();
		assert!(!options.is_drive_only_zero());
		options.disable_3phase_clocking().enable_drive_only_zero();
		assert_eq!(options.0, 0x3);
		assert!(options.is_3phase_clocking_disabled());
	}

	#[test_case("standard", 100_000)]
	#[test_case("fast", 400_000)]
	#[test_case("fast-plus", 1_000_000)]
	#[test_case("high-speed", 3_400_000)]
	#[test_case("250000", 250_000)]
	fn parse_clock_rate(s: &str, hz: u32) {
		assert_eq!(s.parse::<ClockRate>().unwrap().hz(), hz);
	}

	#[test_case("turbo")]
	#[test_case("0")]
	#[test_case("-1")]
	fn reject_clock_rate(s: &str) {
		assert!(s.parse::<ClockRate>().is_err());
	}

	#[test]
	fn default_config_is_fast_mode() {
		let config = ChannelConfig::default();
		assert_eq!(config.clock_rate.hz(), 400_000);
		assert_eq!(config.latency_timer, 255);
		assert_eq!(config.options.0, 0);
	}
}
