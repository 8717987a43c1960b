#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum Error {
	#[display(fmt = "Weather request failed: {}", _0)]
	WeatherHttp(Box<ureq::Error>),
	#[display(fmt = "Could not parse weather response: {}", _0)]
	WeatherBody(serde_json::Error),
	#[display(fmt = "Weather response has no conditions")]
	WeatherBodyEmpty,
	#[display(fmt = "Could not serialize config: {}", _0)]
	ConfigSerialize(toml::ser::Error),
	#[from(ignore)]
	#[display(fmt = "Could not write config file: {}", _0)]
	ConfigWrite(std::io::Error),
	#[from(ignore)]
	#[display(fmt = "Could not register signal handler: {}", _0)]
	Signal(std::io::Error),
	#[cfg(feature = "term_display")]
	#[from(ignore)]
	#[display(fmt = "Could not write to terminal: {}", _0)]
	TerminalOutput(std::io::Error),
	#[cfg(feature = "rpi")]
	#[from(ignore)]
	#[display(fmt = "Could not open input device: {}", _0)]
	InputDevice(std::io::Error),
	#[cfg(feature = "rpi")]
	#[display(fmt = "LED strip error: {}", _0)]
	Ws281x(rs_ws281x::WS2811Error),
}
