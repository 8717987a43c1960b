mod animation;
mod catalog;
mod color;
mod config;
mod controller;
mod error;
mod input;
mod pixels;
#[cfg(feature = "term_display")]
mod term_write;
mod weather;
#[cfg(feature = "rpi")]
mod ws2812b_rpi;

use smart_leds_trait::{SmartLedsWrite, RGB8};

use clap::{App, Arg};
use env_logger::Env;
use signal_hook::consts::{SIGINT, SIGTERM};

use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::catalog::Catalog;
use crate::config::{Config, ConfigStore, OutputConfig};
use crate::controller::ModeController;
use crate::error::Error;
use crate::input::InputSource;
#[cfg(feature = "term_display")]
use crate::input::TermInput;
#[cfg(feature = "rpi")]
use crate::input::IrRemote;
#[cfg(feature = "term_display")]
use crate::term_write::TerminalWrite;
use crate::weather::{OpenWeatherMap, Weather};
#[cfg(feature = "rpi")]
use crate::ws2812b_rpi::WS2812BRpiWrite;

const FRAME_PERIOD: Duration = Duration::from_millis(20);
/// Polling cadence while the lamp is switched off: nothing renders, so the
/// loop only needs to wake often enough to notice the power key.
const IDLE_PERIOD: Duration = Duration::from_secs(1);

fn loop_delay(enabled: bool) -> Duration {
	if enabled {
		FRAME_PERIOD
	} else {
		IDLE_PERIOD
	}
}

fn run<W, I>(
	mut controller: ModeController,
	mut writer: W,
	mut input: I,
	shutdown: Arc<AtomicBool>,
) -> Result<(), Error>
	where
		W: SmartLedsWrite<Color = RGB8, Error = Error>,
		I: InputSource,
{
	while !shutdown.load(Ordering::Relaxed) {
		if let Some(key) = input.poll() {
			controller.handle_key(key);
			writer.write(controller.pixels().iter().cloned())?;
		} else if controller.is_enabled() {
			if controller.tick(Instant::now()) {
				writer.write(controller.pixels().iter().cloned())?;
			}
		}
		thread::sleep(loop_delay(controller.is_enabled()));
	}

	log::info!("shutting down");
	controller.blank();
	writer.write(controller.pixels().iter().cloned())?;
	if let Err(err) = controller.save_config() {
		log::warn!("could not save config on shutdown: {}", err);
	}
	Ok(())
}

fn main_result(config: Config, store: ConfigStore) -> Result<(), Error> {
	let shutdown = Arc::new(AtomicBool::new(false));
	signal_hook::flag::register(SIGTERM, Arc::clone(&shutdown)).map_err(Error::Signal)?;
	signal_hook::flag::register(SIGINT, Arc::clone(&shutdown)).map_err(Error::Signal)?;

	let weather = Weather::new(
		Box::new(OpenWeatherMap),
		&config.zipcode,
		&config.country,
		config.appid(),
	);
	let output = config.output.clone();
	let controller = ModeController::new(Catalog::build(), weather, config, store);

	match output {
		#[cfg(feature = "term_display")]
		OutputConfig::Terminal => run(controller, TerminalWrite, TermInput, shutdown),
		#[cfg(feature = "rpi")]
		OutputConfig::Rpi { pin, input_device } => {
			let writer = WS2812BRpiWrite::new(pin)?;
			let input = IrRemote::open(&input_device)?;
			run(controller, writer, input, shutdown)
		}
		#[allow(unreachable_patterns)]
		other => {
			eprintln!("output {:?} is not supported by this build", other);
			process::exit(1);
		}
	}
}

fn get_config() -> (Config, ConfigStore) {
	let matches = App::new("cloudlamp")
		.version("1.0")
		.about("Weather-reactive LED cloud lamp")
		.arg(Arg::with_name("config")
			.short("c")
			.long("config")
			.value_name("FILE")
			.help("Path to the configuration file")
			.default_value("cloudlamp.toml")
			.takes_value(true))
		.get_matches();

	let config_path = matches.value_of("config").expect("config has a default");
	let mut store = ConfigStore::new(config_path);
	let config = store.load();
	(config, store)
}

fn main() {
	env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
	let (config, store) = get_config();
	main_result(config, store)
		.unwrap_or_else(|err| panic!("{}", err))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_disabled_loop_polls_slower() {
		assert_eq!(loop_delay(true), FRAME_PERIOD);
		assert_eq!(loop_delay(false), IDLE_PERIOD);
		assert!(loop_delay(false) >= Duration::from_secs(1));
	}
}
