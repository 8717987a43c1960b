use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::catalog::{MODE_COUNT, WEATHER_DEMO};
use crate::error::Error;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "target")]
pub enum OutputConfig {
	#[serde(rename = "terminal")]
	Terminal,
	#[serde(rename = "rpi")]
	Rpi {
		#[serde(default = "default_pin")]
		pin: u32,
		#[serde(default = "default_input_device")]
		input_device: String,
	},
}

impl Default for OutputConfig {
	fn default() -> Self {
		OutputConfig::Terminal
	}
}

/// Persisted lamp settings. Every field has a default so a missing file or
/// missing key never fails; colors are strict RGB triples and anything else
/// in their place is a parse error.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
	#[serde(default = "default_true")]
	pub is_enabled: bool,
	#[serde(default = "default_zipcode")]
	pub zipcode: String,
	#[serde(default = "default_country")]
	pub country: String,
	#[serde(default)]
	pub ow_appid: String,
	#[serde(default)]
	pub current_mode: usize,
	#[serde(default = "default_color")]
	pub mode1_color: [u8; 3],
	#[serde(default = "default_color")]
	pub mode3_color: [u8; 3],
	#[serde(default = "default_color")]
	pub mode4_color: [u8; 3],
	#[serde(default = "default_color")]
	pub mode6_color: [u8; 3],
	#[serde(default = "default_color")]
	pub mode7_color: [u8; 3],
	#[serde(default)]
	pub mode9_index: usize,
	#[serde(default)]
	pub output: OutputConfig,
}

fn default_true() -> bool {
	true
}

fn default_zipcode() -> String {
	"97007".to_string()
}

fn default_country() -> String {
	"us".to_string()
}

fn default_color() -> [u8; 3] {
	[255, 0, 0]
}

fn default_pin() -> u32 {
	18
}

fn default_input_device() -> String {
	"/dev/input/event0".to_string()
}

impl Default for Config {
	fn default() -> Self {
		toml::from_str("").expect("empty config deserializes from defaults")
	}
}

impl Config {
	pub fn appid(&self) -> Option<String> {
		if self.ow_appid.is_empty() {
			None
		} else {
			Some(self.ow_appid.clone())
		}
	}
}

/// Loads and saves the config file, remembering the last persisted snapshot
/// so an unchanged save is a no-op instead of a disk write.
pub struct ConfigStore {
	path: PathBuf,
	last_saved: Option<Config>,
}

impl ConfigStore {
	pub fn new<P: Into<PathBuf>>(path: P) -> Self {
		ConfigStore {
			path: path.into(),
			last_saved: None,
		}
	}

	/// Never fails: a missing or unparsable file falls back to defaults
	/// with a warning, and out-of-range indices are clamped.
	pub fn load(&mut self) -> Config {
		let mut config = match fs::read_to_string(&self.path) {
			Ok(contents) => match toml::from_str::<Config>(&contents) {
				Ok(config) => {
					self.last_saved = Some(config.clone());
					config
				}
				Err(err) => {
					log::warn!(
						"could not parse config file {}, using defaults: {}",
						self.path.display(),
						err
					);
					Config::default()
				}
			},
			Err(err) => {
				log::warn!(
					"could not read config file {}, using defaults: {}",
					self.path.display(),
					err
				);
				Config::default()
			}
		};
		if config.current_mode >= MODE_COUNT {
			log::warn!("stored mode {} out of range, using 0", config.current_mode);
			config.current_mode = 0;
		}
		if config.mode9_index >= WEATHER_DEMO.len() {
			log::warn!("stored pattern index {} out of range, using 0", config.mode9_index);
			config.mode9_index = 0;
		}
		config
	}

	/// Writes only when something differs from the last persisted snapshot.
	pub fn save(&mut self, config: &Config) -> Result<(), Error> {
		if self.last_saved.as_ref() == Some(config) {
			return Ok(());
		}
		let contents = toml::to_string(config)?;
		fs::write(&self.path, contents).map_err(Error::ConfigWrite)?;
		self.last_saved = Some(config.clone());
		log::debug!("saved config to {}", self.path.display());
		Ok(())
	}
}
