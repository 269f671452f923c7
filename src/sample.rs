//! The EEPROM sample session: enumerate channels, open one, write a pattern
//! to a range of addresses, read it back.

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use crate::eeprom::{
	BatchReport,
	Eeprom,
	RETRY_COUNT,
};
use crate::i2c::SlaveAddress;
use crate::mpsse::{
	Channel,
	ChannelConfig,
	ChannelInfo,
	I2cMaster,
	SimulatedMaster,
};

/// 24LC024H with A2..A0 tied high
pub const EEPROM_SLAVE_ADDRESS: u8 = 0x57;
/// 0 for the first channel, 1 for the next, ...
pub const CHANNEL_TO_OPEN: u32 = 1;
pub const START_ADDRESS: u16 = 0x00;
pub const END_ADDRESS: u16 = 0x10;
/// byte written to `address` is `address + DATA_OFFSET`
pub const DATA_OFFSET: u8 = 1;

/// How to reach libMPSSE
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Binding {
	Dynamic,
	Static,
	Simulated,
}

impl Default for Binding {
	fn default() -> Self {
		if cfg!(feature = "static-link") {
			Binding::Static
		} else {
			Binding::Dynamic
		}
	}
}

impl fmt::Display for Binding {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Binding::Dynamic => write!(f, "dynamic"),
			Binding::Static => write!(f, "static"),
			Binding::Simulated => write!(f, "simulated"),
		}
	}
}

impl FromStr for Binding {
	type Err = failure::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(match s {
			"dynamic" => Binding::Dynamic,
			"static" => Binding::Static,
			"simulated" => Binding::Simulated,
			_ => bail!("unknown binding {:?} (expected dynamic, static or simulated)", s),
		})
	}
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SampleConfig {
	pub binding: Binding,
	/// library to `dlopen` for `Binding::Dynamic`
	pub library: String,
	pub channel: u32,
	pub channel_config: ChannelConfig,
	pub slave: SlaveAddress,
	/// EEPROM addresses to write and read, end exclusive
	pub addresses: Range<u16>,
	pub data_offset: u8,
	pub retries: usize,
}

impl Default for SampleConfig {
	fn default() -> Self {
		SampleConfig {
			binding: Binding::default(),
			library: DEFAULT_LIBRARY.to_string(),
			channel: CHANNEL_TO_OPEN,
			channel_config: ChannelConfig::default(),
			slave: SlaveAddress::new(EEPROM_SLAVE_ADDRESS).expect("constant address fits in 7 bits"),
			addresses: START_ADDRESS..END_ADDRESS,
			data_offset: DATA_OFFSET,
			retries: RETRY_COUNT,
		}
	}
}

impl SampleConfig {
	pub fn validate(&self) -> crate::AResult<()> {
		ensure!(self.addresses.start <= self.addresses.end,
			"start address 0x{:02x} after end address 0x{:02x}", self.addresses.start, self.addresses.end
		);
		ensure!(self.addresses.end <= 0x100,
			"end address 0x{:x} beyond the 256 byte EEPROM", self.addresses.end
		);
		Ok(())
	}

	pub fn pattern(&self, address: u8) -> u8 {
		address.wrapping_add(self.data_offset)
	}
}

#[cfg(unix)]
const DEFAULT_LIBRARY: &str = crate::mpsse::DEFAULT_LIBRARY_NAME;
#[cfg(not(unix))]
const DEFAULT_LIBRARY: &str = "libMPSSE.dll";

/// Pick the `I2cMaster` implementation at startup
pub fn open_binding(config: &SampleConfig) -> crate::AResult<Box<dyn I2cMaster>> {
	match config.binding {
		Binding::Simulated => Ok(Box::new(SimulatedMaster::new())),
		#[cfg(unix)]
		Binding::Dynamic => {
			let library = crate::mpsse::DynamicLibrary::open(&config.library)?;
			Ok(Box::new(library))
		},
		#[cfg(not(unix))]
		Binding::Dynamic => bail!("dynamic loading of {} is only supported on unix, build with the static-link feature", config.library),
		#[cfg(feature = "static-link")]
		Binding::Static => Ok(Box::new(crate::mpsse::StaticLibrary::new())),
		#[cfg(not(feature = "static-link"))]
		Binding::Static => bail!("built without the static-link feature"),
	}
}

/// enumerate all channels and print their info
pub fn list_channels<M: I2cMaster + ?Sized>(master: &mut M) -> crate::AResult<Vec<ChannelInfo>> {
	let channels = with_context!("I2C_GetNumChannels", {
		Ok(master.num_channels()?)
	})?;
	println!("Number of available I2C channels = {}", channels);

	let mut infos = Vec::new();
	for index in 0..channels {
		let info = with_context!(("I2C_GetChannelInfo({})", index), {
			Ok(master.channel_info(index)?)
		})?;
		println!("Information on channel number {}:", index);
		println!("{}", info);
		infos.push(info);
	}
	Ok(infos)
}

/// Run the whole session against `master`
///
/// Errors during enumeration, open, init and close are returned; failing
/// EEPROM transfers are retried, then logged and skipped, and end up in the
/// report.
pub fn run_sample<M: I2cMaster + ?Sized>(master: &mut M, config: &SampleConfig) -> crate::AResult<Option<BatchReport>> {
	config.validate()?;

	let infos = list_channels(master)?;
	if infos.is_empty() {
		info!("No I2C channels available");
		return Ok(None);
	}
	ensure!((config.channel as usize) < infos.len(),
		"channel {} not available ({} channel(s) found)", config.channel, infos.len()
	);

	let mut channel = Channel::open(master, config.channel)?;
	println!("\nhandle={}", channel.handle());
	channel.init(&config.channel_config)?;

	let report = {
		let mut eeprom = Eeprom::new(&mut channel, config.slave);
		eeprom.write_and_verify(config.addresses.clone(), |a| config.pattern(a), config.retries)?
	};
	channel.close()?;

	info!(
		"{} address(es): {} write(s) failed, {} read(s) failed, {} mismatch(es)",
		report.writes.len(),
		report.failed_writes(),
		report.failed_reads(),
		report.mismatches().len(),
	);
	Ok(Some(report))
}
