use std::time::{Duration, Instant};

use rand::seq::SliceRandom;
use rand::Rng;
use smart_leds_trait::RGB8;

use crate::catalog::{
	default_modes, weather_animation, AnimId, Catalog, ModeSlot, DEFAULT_WEATHER, LIGHTNING_POOL,
	MODE_COUNT, WEATHER_DEMO,
};
use crate::color;
use crate::config::{Config, ConfigStore};
use crate::error::Error;
use crate::input::Key;
use crate::pixels::PixelBuffer;
use crate::weather::Weather;

const HUE_STEP_DEGREES: f32 = 10.0;
const INTENSITY_STEP: f32 = 0.1;
const SAVE_INTERVAL: Duration = Duration::from_secs(60);
/// Lightning sub-sequences swap after this many completed play-throughs.
const LIGHTNING_MAX_CYCLES: u32 = 3;

const WEATHER_MODE: usize = 0;
const DEMO_MODE: usize = 9;
const LIGHTNING_MODE: usize = 8;

/// Owns the whole lamp state: the 10 mode slots, the active mode, the
/// lightning cycling sub-machine and the live config copy. Each loop
/// iteration either feeds it one key event or one tick.
pub struct ModeController {
	catalog: Catalog,
	slots: [ModeSlot; MODE_COUNT],
	curr_mode: usize,
	enabled: bool,
	demo_index: usize,
	daytime: bool,
	force_weather: bool,
	lightning_next: Option<Instant>,
	weather: Weather,
	config: Config,
	store: ConfigStore,
	next_save: Option<Instant>,
	buffer: PixelBuffer,
}

impl ModeController {
	pub fn new(mut catalog: Catalog, weather: Weather, config: Config, store: ConfigStore) -> Self {
		let mut slots = default_modes();
		let demo_index = config.mode9_index;
		slots[DEMO_MODE].anim = WEATHER_DEMO[demo_index];

		let daytime = weather.is_daytime();
		slots[WEATHER_MODE].anim = resolve_weather(weather.id(), daytime);

		for &(mode, stored) in &[
			(1, config.mode1_color),
			(3, config.mode3_color),
			(4, config.mode4_color),
			(6, config.mode6_color),
			(7, config.mode7_color),
		] {
			let anim = catalog.get_mut(slots[mode].anim);
			anim.set_color(RGB8 { r: stored[0], g: stored[1], b: stored[2] });
		}

		ModeController {
			catalog,
			slots,
			curr_mode: config.current_mode,
			enabled: config.is_enabled,
			demo_index,
			daytime,
			force_weather: false,
			lightning_next: None,
			weather,
			config: config.clone(),
			store,
			next_save: None,
			buffer: PixelBuffer::new(),
		}
	}

	pub fn is_enabled(&self) -> bool {
		self.enabled
	}

	pub fn current_mode(&self) -> usize {
		self.curr_mode
	}

	pub fn pixels(&self) -> &[RGB8] {
		self.buffer.leds()
	}

	pub fn blank(&mut self) {
		self.buffer.fill(color::BLACK);
	}

	pub fn save_config(&mut self) -> Result<(), Error> {
		self.store.save(&self.config)
	}

	/// One loop iteration without pending input: weather, day/night flip,
	/// lightning cycling, one animation frame, persistence cadence.
	pub fn tick(&mut self, now: Instant) -> bool {
		if !self.enabled {
			return false;
		}
		self.check_weather(now);
		self.check_day_night();
		self.cycle_lightning(now);
		let anim = self.slots[self.curr_mode].anim;
		let drew = self.catalog.get_mut(anim).tick(now, &mut self.buffer);
		self.maybe_save(now);
		drew
	}

	fn check_weather(&mut self, now: Instant) {
		if self.curr_mode != WEATHER_MODE {
			return;
		}
		let force = std::mem::take(&mut self.force_weather);
		if self.weather.update(now, force) || force {
			self.set_weather_slot();
		}
	}

	fn set_weather_slot(&mut self) {
		let anim = resolve_weather(self.weather.id(), self.daytime);
		let previous = self.slots[WEATHER_MODE].anim;
		if anim != previous {
			log::debug!(
				"weather animation: {:?} -> {:?} ({})",
				previous,
				anim,
				self.weather.condition()
			);
			self.catalog.get_mut(previous).reset();
			self.slots[WEATHER_MODE].anim = anim;
		}
	}

	fn check_day_night(&mut self) {
		let daytime = self.weather.is_daytime();
		if daytime == self.daytime {
			return;
		}
		log::info!("day/night changed: daytime={}", daytime);
		self.daytime = daytime;
		if self.curr_mode == WEATHER_MODE {
			self.set_weather_slot();
		}
	}

	/// While lightning is showing (mode 8, or mode 0 during a thunderstorm),
	/// swap randomly among the pool on a 1-5 s cadence, and cut to the
	/// blackout animation whenever a sub-sequence has played through
	/// `LIGHTNING_MAX_CYCLES` times. The next due swap picks a fresh one.
	fn cycle_lightning(&mut self, now: Instant) {
		let active = self.curr_mode == LIGHTNING_MODE
			|| (self.curr_mode == WEATHER_MODE && self.weather.is_thunderstorm());
		if !active {
			return;
		}
		let mut rng = rand::thread_rng();
		let due = match self.lightning_next {
			Some(next) => now >= next,
			None => true,
		};
		if due {
			let pick = *LIGHTNING_POOL
				.choose(&mut rng)
				.expect("lightning pool is not empty");
			let previous = self.slots[self.curr_mode].anim;
			if pick != previous {
				self.catalog.get_mut(previous).reset();
			}
			let anim = self.catalog.get_mut(pick);
			anim.reset_cycle_count();
			anim.reset();
			self.slots[self.curr_mode].anim = pick;
			self.lightning_next = Some(now + Duration::from_secs(rng.gen_range(1..=5)));
		}
		let current = self.slots[self.curr_mode].anim;
		if self.catalog.get(current).cycle_count() >= LIGHTNING_MAX_CYCLES {
			self.catalog.get_mut(current).reset_cycle_count();
			self.slots[self.curr_mode].anim = AnimId::Reset;
		}
	}

	fn maybe_save(&mut self, now: Instant) {
		match self.next_save {
			Some(next) if now < next => return,
			None => {
				// First tick just schedules the cadence.
				self.next_save = Some(now + SAVE_INTERVAL);
				return;
			}
			Some(_) => {}
		}
		self.next_save = Some(now + SAVE_INTERVAL);
		if let Err(err) = self.store.save(&self.config) {
			log::warn!("could not persist config: {}", err);
		}
	}

	/// Apply one remote key press. Unrecognized keys are ignored.
	pub fn handle_key(&mut self, key: Key) {
		log::debug!("key pressed: {:?}", key);
		match key {
			Key::Mode => self.switch_mode((self.curr_mode + 1) % MODE_COUNT),
			Key::Digit(digit) => {
				let target = digit as usize % MODE_COUNT;
				if target == WEATHER_MODE && self.curr_mode == WEATHER_MODE {
					log::debug!("forcing weather re-check");
					self.force_weather = true;
				} else {
					self.switch_mode(target);
				}
			}
			Key::Right => {
				if self.curr_mode == DEMO_MODE {
					self.page_demo(1);
				} else {
					self.rotate_color(HUE_STEP_DEGREES);
				}
			}
			Key::Left => {
				if self.curr_mode == DEMO_MODE {
					self.page_demo(-1);
				} else {
					self.rotate_color(-HUE_STEP_DEGREES);
				}
			}
			Key::Up => self.adjust_intensity(INTENSITY_STEP),
			Key::Down => self.adjust_intensity(-INTENSITY_STEP),
			Key::Play => self.toggle_enabled(),
			Key::Enter => {
				if let Err(err) = self.store.save(&self.config) {
					log::warn!("could not persist config: {}", err);
				}
			}
			Key::Setup | Key::Back | Key::VolUp | Key::VolDown => {
				log::debug!("unassigned key: {:?}", key);
			}
		}
	}

	/// Reset the outgoing animation and blank the strip so no stale pixels
	/// from the previous mode's geometry survive, even for one frame.
	fn switch_mode(&mut self, target: usize) {
		log::debug!("mode changed: {} -> {}", self.curr_mode, target);
		let outgoing = self.slots[self.curr_mode].anim;
		self.catalog.get_mut(outgoing).reset();
		self.blank();
		// Stale swap windows must not survive into the next lightning visit.
		self.lightning_next = None;
		self.curr_mode = target;
		self.config.current_mode = target;
	}

	fn rotate_color(&mut self, degrees: f32) {
		let slot = self.slots[self.curr_mode];
		if !slot.color_adjust {
			return;
		}
		let anim = self.catalog.get_mut(slot.anim);
		let rotated = color::rotate_hue(anim.color(), degrees);
		anim.set_color(rotated);
		self.store_mode_color(rotated);
	}

	fn adjust_intensity(&mut self, delta: f32) {
		let slot = self.slots[self.curr_mode];
		if !slot.intensity_adjust {
			return;
		}
		let anim = self.catalog.get_mut(slot.anim);
		let adjusted = color::adjust_value(anim.color(), delta);
		anim.set_color(adjusted);
		self.store_mode_color(adjusted);
	}

	fn store_mode_color(&mut self, new_color: RGB8) {
		let stored = [new_color.r, new_color.g, new_color.b];
		match self.curr_mode {
			1 => self.config.mode1_color = stored,
			3 => self.config.mode3_color = stored,
			4 => self.config.mode4_color = stored,
			6 => self.config.mode6_color = stored,
			7 => self.config.mode7_color = stored,
			_ => {}
		}
	}

	fn page_demo(&mut self, direction: isize) {
		let len = WEATHER_DEMO.len();
		self.demo_index = (self.demo_index as isize + direction).rem_euclid(len as isize) as usize;
		let outgoing = self.slots[DEMO_MODE].anim;
		self.catalog.get_mut(outgoing).reset();
		self.blank();
		self.slots[DEMO_MODE].anim = WEATHER_DEMO[self.demo_index];
		self.config.mode9_index = self.demo_index;
		log::debug!("demo pattern: {:?}", self.slots[DEMO_MODE].anim);
	}

	fn toggle_enabled(&mut self) {
		if self.enabled {
			self.blank();
		}
		self.enabled = !self.enabled;
		self.config.is_enabled = self.enabled;
		log::info!("lamp enabled: {}", self.enabled);
	}
}

fn resolve_weather(id: u32, daytime: bool) -> AnimId {
	weather_animation(id, daytime).unwrap_or_else(|| {
		log::warn!("no animation for weather condition {}, using default", id);
		DEFAULT_WEATHER
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::input::{InputSource, MockInputSource};
	use crate::weather::{MockWeatherApi, Observation};
	use std::path::PathBuf;

	fn temp_store(name: &str) -> ConfigStore {
		let mut path: PathBuf = std::env::temp_dir();
		path.push(format!("cloudlamp-ctl-{}-{}.toml", name, std::process::id()));
		ConfigStore::new(path)
	}

	fn controller_with_api(name: &str, api: MockWeatherApi) -> ModeController {
		let config = Config::default();
		let weather = Weather::new(Box::new(api), &config.zipcode, &config.country, Some("key".into()));
		ModeController::new(Catalog::build(), weather, config, temp_store(name))
	}

	fn controller(name: &str) -> ModeController {
		let mut api = MockWeatherApi::new();
		api.expect_fetch().never();
		controller_with_api(name, api)
	}

	fn observation(id: u32, sunrise: u64, sunset: u64) -> Observation {
		Observation {
			id,
			condition: "Test".to_string(),
			sunrise,
			sunset,
		}
	}

	#[test]
	fn test_mode_key_is_circular() {
		let mut ctl = controller("circular");
		assert_eq!(ctl.current_mode(), 0);
		for i in 1..=9 {
			ctl.handle_key(Key::Mode);
			assert_eq!(ctl.current_mode(), i);
		}
		ctl.handle_key(Key::Mode);
		assert_eq!(ctl.current_mode(), 0);
	}

	#[test]
	fn test_digit_jumps_to_mode() {
		let mut ctl = controller("digit");
		ctl.handle_key(Key::Digit(8));
		assert_eq!(ctl.current_mode(), 8);
		ctl.handle_key(Key::Digit(1));
		assert_eq!(ctl.current_mode(), 1);
	}

	#[test]
	fn test_mode_switch_blanks_strip() {
		let mut ctl = controller("blank");
		let mut now = Instant::now();
		ctl.handle_key(Key::Digit(1));
		now += Duration::from_millis(600);
		ctl.tick(now);
		assert!(ctl.pixels().iter().any(|&led| led != color::BLACK));
		ctl.handle_key(Key::Mode);
		assert!(ctl.pixels().iter().all(|&led| led == color::BLACK));
	}

	#[test]
	fn test_weather_resolution_day_and_night() {
		let mut api = MockWeatherApi::new();
		// Sun already set, so after the fetch the lamp flips to night.
		api.expect_fetch()
			.times(1)
			.returning(|_, _, _| Ok(observation(800, 1, 2)));
		let mut ctl = controller_with_api("daynight", api);
		assert_eq!(ctl.slots[0].anim, AnimId::ClearDay);
		ctl.force_weather = true;
		ctl.tick(Instant::now());
		assert_eq!(ctl.slots[0].anim, AnimId::ClearNight);
	}

	#[test]
	fn test_unknown_weather_code_falls_back() {
		let mut api = MockWeatherApi::new();
		api.expect_fetch()
			.times(1)
			.returning(|_, _, _| Ok(observation(999, 0, u64::MAX)));
		let mut ctl = controller_with_api("unknown", api);
		ctl.force_weather = true;
		ctl.tick(Instant::now());
		assert_eq!(ctl.slots[0].anim, DEFAULT_WEATHER);
	}

	#[test]
	fn test_lightning_cycle_limit_swaps_to_blackout() {
		let mut ctl = controller("lightningcap");
		let mut now = Instant::now();
		ctl.handle_key(Key::Digit(8));
		// Let the cycler make its first pick.
		ctl.tick(now);
		let active = ctl.slots[8].anim;
		assert_ne!(active, AnimId::Reset);

		// Park the swap timer far in the future, then play the active
		// sequence until it has completed three passes.
		ctl.lightning_next = Some(now + Duration::from_secs(3600));
		let mut buf = PixelBuffer::new();
		let mut frames = 0;
		while ctl.catalog.get(active).cycle_count() < LIGHTNING_MAX_CYCLES && frames < 5000 {
			now += Duration::from_millis(250);
			ctl.catalog.get_mut(active).tick(now, &mut buf);
			frames += 1;
		}
		assert!(ctl.catalog.get(active).cycle_count() >= LIGHTNING_MAX_CYCLES);

		ctl.cycle_lightning(now);
		assert_eq!(ctl.slots[8].anim, AnimId::Reset);
		assert_eq!(ctl.catalog.get(active).cycle_count(), 0);
	}

	#[test]
	fn test_lightning_swap_reschedules() {
		let mut ctl = controller("lightningswap");
		let now = Instant::now();
		ctl.handle_key(Key::Digit(8));
		ctl.tick(now);
		let next = ctl.lightning_next.expect("swap scheduled");
		let delay = next - now;
		assert!(delay >= Duration::from_secs(1) && delay <= Duration::from_secs(5));
		assert!(LIGHTNING_POOL.contains(&ctl.slots[8].anim));
	}

	#[test]
	fn test_mode_switch_clears_lightning_schedule() {
		let mut ctl = controller("lightningleave");
		let now = Instant::now();
		ctl.handle_key(Key::Digit(8));
		ctl.tick(now);
		assert!(ctl.lightning_next.is_some());

		// Leaving and coming back must pick fresh, not replay the pending
		// swap window from the previous visit.
		ctl.handle_key(Key::Mode);
		assert!(ctl.lightning_next.is_none());
		ctl.handle_key(Key::Digit(8));
		ctl.tick(now + Duration::from_millis(100));
		assert!(ctl.lightning_next.expect("fresh pick scheduled") > now);
		assert!(LIGHTNING_POOL.contains(&ctl.slots[8].anim));
	}

	#[test]
	fn test_color_rotation_round_trip() {
		let mut ctl = controller("rotate");
		ctl.handle_key(Key::Digit(1));
		let before = ctl.catalog.get(ctl.slots[1].anim).color();
		ctl.handle_key(Key::Right);
		let rotated = ctl.catalog.get(ctl.slots[1].anim).color();
		assert_ne!(rotated, before);
		ctl.handle_key(Key::Left);
		let back = ctl.catalog.get(ctl.slots[1].anim).color();
		assert!((back.r as i16 - before.r as i16).abs() <= 2);
		assert!((back.g as i16 - before.g as i16).abs() <= 2);
		assert!((back.b as i16 - before.b as i16).abs() <= 2);
	}

	#[test]
	fn test_color_keys_ignored_on_fixed_mode() {
		let mut ctl = controller("fixedcolor");
		ctl.handle_key(Key::Digit(2));
		let before = ctl.catalog.get(ctl.slots[2].anim).color();
		ctl.handle_key(Key::Right);
		assert_eq!(ctl.catalog.get(ctl.slots[2].anim).color(), before);
	}

	#[test]
	fn test_intensity_clamps_at_floor_and_ceiling() {
		let mut ctl = controller("intensity");
		ctl.handle_key(Key::Digit(1));
		for _ in 0..20 {
			ctl.handle_key(Key::Down);
		}
		let dimmed = ctl.catalog.get(ctl.slots[1].anim).color();
		let max_channel = dimmed.r.max(dimmed.g).max(dimmed.b);
		assert!(max_channel >= 24, "dimmed below floor: {:?}", dimmed);

		for _ in 0..20 {
			ctl.handle_key(Key::Up);
		}
		let restored = ctl.catalog.get(ctl.slots[1].anim).color();
		assert_eq!(restored.r.max(restored.g).max(restored.b), 255);
	}

	#[test]
	fn test_demo_mode_pages_circularly() {
		let mut ctl = controller("demo");
		ctl.handle_key(Key::Digit(9));
		assert_eq!(ctl.slots[9].anim, WEATHER_DEMO[0]);
		ctl.handle_key(Key::Left);
		assert_eq!(ctl.slots[9].anim, WEATHER_DEMO[WEATHER_DEMO.len() - 1]);
		ctl.handle_key(Key::Right);
		assert_eq!(ctl.slots[9].anim, WEATHER_DEMO[0]);
		for _ in 0..WEATHER_DEMO.len() {
			ctl.handle_key(Key::Right);
		}
		assert_eq!(ctl.slots[9].anim, WEATHER_DEMO[0]);
	}

	#[test]
	fn test_play_toggles_without_losing_state() {
		let mut ctl = controller("play");
		let mut now = Instant::now();
		ctl.handle_key(Key::Digit(4));
		ctl.handle_key(Key::Right);
		let color_before = ctl.catalog.get(ctl.slots[4].anim).color();
		now += Duration::from_millis(600);
		ctl.tick(now);

		ctl.handle_key(Key::Play);
		assert!(!ctl.is_enabled());
		assert!(ctl.pixels().iter().all(|&led| led == color::BLACK));
		assert!(!ctl.tick(now + Duration::from_secs(1)));

		ctl.handle_key(Key::Play);
		assert!(ctl.is_enabled());
		assert_eq!(ctl.current_mode(), 4);
		assert_eq!(ctl.catalog.get(ctl.slots[4].anim).color(), color_before);
	}

	#[test]
	fn test_digit_zero_on_weather_mode_forces_recheck() {
		let mut api = MockWeatherApi::new();
		api.expect_fetch()
			.times(1)
			.returning(|_, _, _| Ok(observation(800, 0, u64::MAX)));
		api.expect_fetch()
			.times(1)
			.returning(|_, _, _| Ok(observation(500, 0, u64::MAX)));
		let mut ctl = controller_with_api("force", api);
		let now = Instant::now();
		// Startup fetch; conditions unchanged from the default.
		ctl.tick(now);
		assert_eq!(ctl.slots[0].anim, AnimId::ClearDay);
		// Well inside the hourly interval, so only the forced re-check can
		// trigger the second fetch.
		ctl.handle_key(Key::Digit(0));
		ctl.tick(now + Duration::from_millis(100));
		assert_eq!(ctl.slots[0].anim, AnimId::RainLight);
	}

	#[test]
	fn test_enter_persists_config() {
		let mut path: PathBuf = std::env::temp_dir();
		path.push(format!("cloudlamp-ctl-enter-{}.toml", std::process::id()));
		let _ = std::fs::remove_file(&path);

		let mut api = MockWeatherApi::new();
		api.expect_fetch().never();
		let config = Config::default();
		let weather =
			Weather::new(Box::new(api), &config.zipcode, &config.country, Some("key".into()));
		let mut ctl = ModeController::new(
			Catalog::build(),
			weather,
			config,
			ConfigStore::new(&path),
		);
		ctl.handle_key(Key::Digit(3));
		ctl.handle_key(Key::Enter);
		assert!(path.exists());

		let mut store = ConfigStore::new(&path);
		assert_eq!(store.load().current_mode, 3);
		std::fs::remove_file(&path).unwrap();
	}

	#[test]
	fn test_input_source_drives_controller() {
		let mut source = MockInputSource::new();
		let mut presses = vec![Key::Mode, Key::Mode].into_iter();
		source.expect_poll().returning(move || presses.next());

		let mut ctl = controller("source");
		while let Some(key) = source.poll() {
			ctl.handle_key(key);
		}
		assert_eq!(ctl.current_mode(), 2);
	}
}
