use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde::Deserialize;

use crate::error::Error;

const API_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

/// Regular polling interval.
pub const UPDATE_INTERVAL: Duration = Duration::from_secs(3600);
/// Backoff after a failed fetch.
const RETRY_INTERVAL: Duration = Duration::from_secs(600);

/// Condition assumed until a real observation arrives (clear sky).
pub const DEFAULT_CONDITION_ID: u32 = 800;

#[derive(Debug, Clone)]
pub struct Observation {
	pub id: u32,
	pub condition: String,
	pub sunrise: u64,
	pub sunset: u64,
}

#[derive(Debug, Deserialize)]
struct ApiCondition {
	id: u32,
	main: String,
}

#[derive(Debug, Deserialize)]
struct ApiSys {
	sunrise: u64,
	sunset: u64,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
	weather: Vec<ApiCondition>,
	sys: ApiSys,
}

/// One blocking GET against the weather endpoint.
#[cfg_attr(test, mockall::automock)]
pub trait WeatherApi {
	fn fetch(&self, zipcode: &str, country: &str, appid: &str) -> Result<Observation, Error>;
}

pub struct OpenWeatherMap;

impl WeatherApi for OpenWeatherMap {
	fn fetch(&self, zipcode: &str, country: &str, appid: &str) -> Result<Observation, Error> {
		let response = ureq::get(API_URL)
			.query("units", "imperial")
			.query("zip", &format!("{},{}", zipcode, country))
			.query("appid", appid)
			.call()
			.map_err(|err| Error::WeatherHttp(Box::new(err)))?;
		let body: ApiResponse =
			serde_json::from_reader(response.into_reader()).map_err(Error::WeatherBody)?;
		let condition = body.weather.into_iter().next().ok_or(Error::WeatherBodyEmpty)?;
		Ok(Observation {
			id: condition.id,
			condition: condition.main,
			sunrise: body.sys.sunrise,
			sunset: body.sys.sunset,
		})
	}
}

/// Cached current conditions, refreshed at most once per interval. Fetch
/// failures never cross this boundary; they log, back off and leave the
/// cached state in place.
pub struct Weather {
	api: Box<dyn WeatherApi>,
	zipcode: String,
	country: String,
	appid: Option<String>,
	is_active: bool,
	id: u32,
	condition: String,
	sunrise: u64,
	sunset: u64,
	next_update: Option<Instant>,
}

impl Weather {
	pub fn new(api: Box<dyn WeatherApi>, zipcode: &str, country: &str, appid: Option<String>) -> Self {
		if appid.is_none() {
			log::warn!("no weather API key configured, weather updates disabled");
		}
		let mut weather = Weather {
			api,
			zipcode: String::new(),
			country: country.to_string(),
			appid,
			is_active: false,
			id: DEFAULT_CONDITION_ID,
			condition: "Clear".to_string(),
			sunrise: 0,
			sunset: 0,
			next_update: None,
		};
		weather.set_zipcode(zipcode);
		weather
	}

	/// Accepts only a 5-digit zip; anything else is rejected and the
	/// previous value kept (updates stay disabled if none was ever valid).
	pub fn set_zipcode(&mut self, value: &str) -> bool {
		if value.len() != 5 || !value.bytes().all(|b| b.is_ascii_digit()) {
			log::warn!("zip code must be 5 digits, got {:?}", value);
			return false;
		}
		self.zipcode = value.to_string();
		self.is_active = self.appid.is_some();
		true
	}

	pub fn id(&self) -> u32 {
		self.id
	}

	pub fn condition(&self) -> &str {
		&self.condition
	}

	pub fn is_thunderstorm(&self) -> bool {
		self.id / 100 == 2
	}

	pub fn is_daytime_at(&self, epoch_secs: u64) -> bool {
		if self.sunset == 0 {
			// No observation yet.
			return true;
		}
		epoch_secs >= self.sunrise && epoch_secs < self.sunset
	}

	pub fn is_daytime(&self) -> bool {
		let epoch = SystemTime::now()
			.duration_since(UNIX_EPOCH)
			.map(|d| d.as_secs())
			.unwrap_or(0);
		self.is_daytime_at(epoch)
	}

	/// Fetch if due (or forced). Returns true only when the condition id
	/// actually changed.
	pub fn update(&mut self, now: Instant, force: bool) -> bool {
		if !force {
			if let Some(next) = self.next_update {
				if now < next {
					return false;
				}
			}
		}
		if !self.is_active {
			log::debug!("weather is inactive, keeping condition {}", self.id);
			self.next_update = Some(now + UPDATE_INTERVAL);
			return false;
		}
		let appid = self.appid.as_deref().unwrap_or("");
		let observation = match self.api.fetch(&self.zipcode, &self.country, appid) {
			Ok(observation) => observation,
			Err(err) => {
				log::warn!("weather fetch failed, retrying in {:?}: {}", RETRY_INTERVAL, err);
				self.next_update = Some(now + RETRY_INTERVAL);
				return false;
			}
		};
		self.next_update = Some(now + UPDATE_INTERVAL);
		self.sunrise = observation.sunrise;
		self.sunset = observation.sunset;
		if observation.id == self.id {
			log::debug!("weather condition unchanged: {} {}", self.id, self.condition);
			return false;
		}
		log::info!(
			"weather condition changed: {} {} -> {} {}",
			self.id,
			self.condition,
			observation.id,
			observation.condition
		);
		self.id = observation.id;
		self.condition = observation.condition;
		true
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::time::Duration;

	fn observation(id: u32) -> Observation {
		Observation {
			id,
			condition: "Test".to_string(),
			sunrise: 1,
			sunset: u64::MAX,
		}
	}

	#[test]
	fn test_update_reports_change_once() {
		let mut api = MockWeatherApi::new();
		api.expect_fetch().times(2).returning(|_, _, _| Ok(observation(500)));
		let mut weather =
			Weather::new(Box::new(api), "97007", "us", Some("key".to_string()));
		let now = Instant::now();
		assert!(weather.update(now, true));
		assert_eq!(weather.id(), 500);
		assert_eq!(weather.condition(), "Test");
		assert!(!weather.update(now, true));
	}

	#[test]
	fn test_update_rate_limited() {
		let mut api = MockWeatherApi::new();
		api.expect_fetch().times(1).returning(|_, _, _| Ok(observation(500)));
		let mut weather =
			Weather::new(Box::new(api), "97007", "us", Some("key".to_string()));
		let now = Instant::now();
		assert!(weather.update(now, false));
		// Next attempt is not due for an hour; fetch must not be called.
		assert!(!weather.update(now + Duration::from_secs(60), false));
	}

	#[test]
	fn test_fetch_failure_backs_off() {
		let mut api = MockWeatherApi::new();
		api.expect_fetch()
			.times(1)
			.returning(|_, _, _| Err(Error::WeatherBodyEmpty));
		let mut weather =
			Weather::new(Box::new(api), "97007", "us", Some("key".to_string()));
		let now = Instant::now();
		assert!(!weather.update(now, true));
		assert_eq!(weather.id(), DEFAULT_CONDITION_ID);
		// Still backing off, no second fetch.
		assert!(!weather.update(now + Duration::from_secs(60), false));
	}

	#[test]
	fn test_missing_appid_disables_updates() {
		let mut api = MockWeatherApi::new();
		api.expect_fetch().never();
		let mut weather = Weather::new(Box::new(api), "97007", "us", None);
		assert!(!weather.update(Instant::now(), true));
		assert_eq!(weather.id(), DEFAULT_CONDITION_ID);
	}

	#[test]
	fn test_invalid_zipcode_rejected() {
		let mut api = MockWeatherApi::new();
		api.expect_fetch().never();
		let mut weather =
			Weather::new(Box::new(api), "bad", "us", Some("key".to_string()));
		assert!(!weather.update(Instant::now(), true));
		assert!(weather.set_zipcode("12345"));
		assert!(!weather.set_zipcode("1234a"));
		assert!(!weather.set_zipcode("123456"));
	}

	#[test]
	fn test_day_night_from_sun_times() {
		let mut api = MockWeatherApi::new();
		api.expect_fetch().times(1).returning(|_, _, _| {
			Ok(Observation {
				id: 800,
				condition: "Clear".to_string(),
				sunrise: 1_000,
				sunset: 2_000,
			})
		});
		let mut weather =
			Weather::new(Box::new(api), "97007", "us", Some("key".to_string()));
		// No observation yet: assume day.
		assert!(weather.is_daytime_at(0));
		weather.update(Instant::now(), true);
		assert!(!weather.is_daytime_at(500));
		assert!(weather.is_daytime_at(1_500));
		assert!(!weather.is_daytime_at(2_500));
	}

	#[test]
	fn test_thunderstorm_category() {
		let mut api = MockWeatherApi::new();
		api.expect_fetch().times(1).returning(|_, _, _| Ok(observation(211)));
		let mut weather =
			Weather::new(Box::new(api), "97007", "us", Some("key".to_string()));
		assert!(!weather.is_thunderstorm());
		weather.update(Instant::now(), true);
		assert!(weather.is_thunderstorm());
	}
}
