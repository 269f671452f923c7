#[macro_use]
extern crate clap;
#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

extern crate mpsse_i2c_eeprom;
use mpsse_i2c_eeprom::*;

use std::process::exit;

use mpsse_i2c_eeprom::i2c::parse_u8;
use mpsse_i2c_eeprom::mpsse::{
	ChannelOptions,
	I2cMaster,
};
use mpsse_i2c_eeprom::sample::SampleConfig;

// parse an optional parameter; absent means `default`
fn get_param<T>(matches: &clap::ArgMatches, name: &str, default: T) -> AResult<T>
where
	T: std::str::FromStr,
	failure::Error: From<<T as std::str::FromStr>::Err>,
{
	let param = match matches.value_of(name) {
		Some(p) => p,
		None => return Ok(default),
	};
	param.parse::<T>().map_err(|e| {
		let e = failure::Error::from(e);
		let msg = format!("invalid parameter {}: {}", name, e);
		e.context(msg).into()
	})
}

// like `get_param`, but also accepts 0x-prefixed hex
fn get_address(matches: &clap::ArgMatches, name: &str, default: u16) -> AResult<u16> {
	let param = match matches.value_of(name) {
		Some(p) => p,
		None => return Ok(default),
	};
	let r = if param.starts_with("0x") || param.starts_with("0X") {
		u16::from_str_radix(&param[2..], 16)
	} else {
		param.parse::<u16>()
	};
	r.map_err(|e| format_err!("invalid parameter {}: {:?}: {}", name, param, e))
}

fn config_from_args() -> AResult<SampleConfig> {
	let matches = clap_app!(@app (app_from_crate!())
		(@arg binding: --binding +takes_value "How to reach libMPSSE: dynamic, static or simulated")
		(@arg library: --library +takes_value "Library to load for the dynamic binding")
		(@arg channel: --channel +takes_value "Index of the channel to open (0 is the first)")
		(@arg clock: --clock +takes_value "I2C clock: standard, fast, fast-plus, high-speed or rate in Hz")
		(@arg latency: --latency +takes_value "USB latency timer in ms")
		(@arg disable_3phase: --("disable-3phase") "Disable 3-phase clocking")
		(@arg drive_only_zero: --("drive-only-zero") "Only drive SDA/SCL low (open drain)")
		(@arg slave: --slave +takes_value "EEPROM slave address")
		(@arg start: --start +takes_value "First EEPROM address")
		(@arg end: --end +takes_value "EEPROM address to stop at (exclusive)")
		(@arg data_offset: --("data-offset") +takes_value "Value written is address + offset")
		(@arg retries: --retries +takes_value "Retries per byte before skipping it")
	).get_matches();

	let defaults = SampleConfig::default();
	let mut config = SampleConfig {
		binding: get_param(&matches, "binding", defaults.binding)?,
		library: get_param(&matches, "library", defaults.library.clone())?,
		channel: get_param(&matches, "channel", defaults.channel)?,
		slave: get_param(&matches, "slave", defaults.slave)?,
		addresses: get_address(&matches, "start", defaults.addresses.start)?
			..get_address(&matches, "end", defaults.addresses.end)?,
		data_offset: match matches.value_of("data_offset") {
			Some(p) => parse_u8(p)?,
			None => defaults.data_offset,
		},
		retries: get_param(&matches, "retries", defaults.retries)?,
		..defaults.clone()
	};
	config.channel_config.clock_rate = get_param(&matches, "clock", defaults.channel_config.clock_rate)?;
	config.channel_config.latency_timer = get_param(&matches, "latency", defaults.channel_config.latency_timer)?;
	let mut options = ChannelOptions::default();
	if matches.is_present("disable_3phase") {
		options.disable_3phase_clocking();
	}
	if matches.is_present("drive_only_zero") {
		options.enable_drive_only_zero();
	}
	config.channel_config.options = options;

	config.validate()?;
	Ok(config)
}

fn open_master(config: &SampleConfig) -> AResult<Box<dyn I2cMaster>> {
	sample::open_binding(config).map_err(|e| {
		let msg = format!("{} binding: {}", config.binding, e);
		e.context(msg).into()
	})
}

fn main_app() -> AResult<()> {
	let config = config_from_args()?;
	debug!("{:?}", config);

	let mut master = open_master(&config)?;
	info!("Using {} binding", master.binding_name());

	if let Some(report) = sample::run_sample(&mut *master, &config)? {
		let failed = report.failed_writes() + report.failed_reads();
		if failed > 0 {
			warn!("{} transfer(s) failed after all retries", failed);
		}
	}

	Ok(())
}

fn main() {
	env_logger::from_env(env_logger::Env::default().default_filter_or("info")).init();

	if let Err(e) = main_app() {
		error!("Error: {}", e);
		exit(1);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use mpsse_i2c_eeprom::sample::Binding;

	#[test]
	fn simulated_master_runs_the_sample() {
		let config = SampleConfig {
			binding: Binding::Simulated,
			..SampleConfig::default()
		};
		let mut master = open_master(&config).unwrap();
		let report = sample::run_sample(&mut *master, &config).unwrap().unwrap();
		assert_eq!(report.failed_writes() + report.failed_reads(), 0);
	}

	#[cfg(not(feature = "static-link"))]
	#[test]
	fn binding_error_names_the_binding() {
		let config = SampleConfig {
			binding: Binding::Static,
			..SampleConfig::default()
		};
		let err = open_master(&config).err().unwrap();
		assert_eq!(err.to_string(), "static binding: built without the static-link feature");
	}
}
