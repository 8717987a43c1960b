use std::collections::HashMap;
use std::time::Duration;

use crate::animation::{
	Animation, AnimationGroup, AnimationSequence, Comet, Drops, LightningFlash, Pulse, Rainbow,
	RainbowSparkle, Solid, Sparkle, StarTwinkle,
};
use crate::color;
use crate::pixels;
use crate::pixels::PixelGroup;

/// Stable name for one animation instance in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnimId {
	ClearDay,
	ClearNight,
	Cloud25,
	Cloud50,
	Cloud75,
	Cloud100,
	RainLight,
	RainHeavy,
	RainVeryHeavy,
	SnowLight,
	SnowHeavy,
	SnowVeryHeavy,
	Solid,
	Rainbow,
	Pulse,
	Sparkle,
	RainbowSparkle,
	LineScan,
	GridScan,
	Lightning1,
	Lightning2,
	Lightning3,
	Lightning4,
	Lightning5,
	Lightning6,
	Reset,
}

pub const MODE_COUNT: usize = 10;

/// One of the 10 fixed roles the lamp can display.
#[derive(Debug, Clone, Copy)]
pub struct ModeSlot {
	pub anim: AnimId,
	pub color_adjust: bool,
	pub intensity_adjust: bool,
}

impl ModeSlot {
	const fn fixed(anim: AnimId) -> Self {
		ModeSlot { anim, color_adjust: false, intensity_adjust: false }
	}

	const fn adjustable(anim: AnimId) -> Self {
		ModeSlot { anim, color_adjust: true, intensity_adjust: true }
	}
}

/// Mode roles: 0 weather, 1 solid, 2 rainbow, 3 pulse, 4 sparkle,
/// 5 rainbow-sparkle, 6 line scan, 7 grid scan, 8 lightning, 9 weather demo.
pub fn default_modes() -> [ModeSlot; MODE_COUNT] {
	[
		ModeSlot::fixed(AnimId::ClearDay),
		ModeSlot::adjustable(AnimId::Solid),
		ModeSlot::fixed(AnimId::Rainbow),
		ModeSlot::adjustable(AnimId::Pulse),
		ModeSlot::adjustable(AnimId::Sparkle),
		ModeSlot::fixed(AnimId::RainbowSparkle),
		ModeSlot::adjustable(AnimId::LineScan),
		ModeSlot::adjustable(AnimId::GridScan),
		ModeSlot::fixed(AnimId::Lightning1),
		ModeSlot::fixed(WEATHER_DEMO[0]),
	]
}

/// Pool the lightning cycler picks from. The plain double-flash is
/// interleaved so streak sequences rarely run back to back.
pub const LIGHTNING_POOL: [AnimId; 10] = [
	AnimId::Lightning1,
	AnimId::Lightning6,
	AnimId::Lightning2,
	AnimId::Lightning6,
	AnimId::Lightning3,
	AnimId::Lightning6,
	AnimId::Lightning4,
	AnimId::Lightning6,
	AnimId::Lightning5,
	AnimId::Lightning6,
];

/// Patterns mode 9 pages through with Left/Right.
pub const WEATHER_DEMO: [AnimId; 12] = [
	AnimId::ClearDay,
	AnimId::ClearNight,
	AnimId::Cloud25,
	AnimId::Cloud50,
	AnimId::Cloud75,
	AnimId::Cloud100,
	AnimId::RainLight,
	AnimId::RainHeavy,
	AnimId::RainVeryHeavy,
	AnimId::SnowLight,
	AnimId::SnowHeavy,
	AnimId::SnowVeryHeavy,
];

pub const DEFAULT_WEATHER: AnimId = AnimId::Cloud100;

/// Resolve an OpenWeatherMap condition code to an animation, day and night
/// variants separately. Unknown codes return None; the caller falls back to
/// `DEFAULT_WEATHER`.
pub fn weather_animation(code: u32, daytime: bool) -> Option<AnimId> {
	use AnimId::*;
	let (day, night) = match code {
		// Thunderstorm group
		200 | 201 | 202 | 210 | 211 | 212 | 221 | 230 | 231 | 232 => (Cloud100, Cloud100),
		// Drizzle
		300 | 301 | 310 => (RainLight, RainLight),
		302 | 311 | 312 | 313 | 314 | 321 => (RainHeavy, RainHeavy),
		// Rain
		500 | 501 | 520 => (RainLight, RainLight),
		502 | 511 | 521 | 522 => (RainHeavy, RainHeavy),
		503 | 504 | 531 => (RainVeryHeavy, RainVeryHeavy),
		// Snow and mixes
		600 | 620 => (SnowLight, SnowLight),
		601 | 621 => (SnowHeavy, SnowHeavy),
		602 | 622 => (SnowVeryHeavy, SnowVeryHeavy),
		611 | 612 | 615 | 616 => (RainLight, RainLight),
		613 => (RainHeavy, RainHeavy),
		// Atmosphere (mist through tornado)
		701 | 711 | 721 | 731 | 741 | 751 | 761 | 762 | 771 | 781 => (Cloud100, Cloud100),
		// Clear and clouds
		800 => (ClearDay, ClearNight),
		801 => (Cloud25, Cloud25),
		802 => (Cloud50, Cloud50),
		803 => (Cloud75, Cloud75),
		804 => (Cloud100, Cloud100),
		_ => return None,
	};
	Some(if daytime { day } else { night })
}

/// Registry of every animation instance, built once at startup and handed
/// to the controller. Slots refer to animations by id, never by pointer.
pub struct Catalog {
	anims: HashMap<AnimId, Box<dyn Animation>>,
}

const FRAME: Duration = Duration::from_millis(100);

fn flash() -> Box<dyn Animation> {
	Box::new(LightningFlash::new(
		PixelGroup::whole(),
		color::WHITE,
		12,
		Duration::from_millis(50),
		Duration::from_millis(200),
	))
}

fn streak(path: usize) -> Box<dyn Animation> {
	Box::new(Comet::new(
		pixels::lightning_path(path),
		Duration::from_millis(30),
		color::WHITE,
		3,
		false,
	))
}

fn cloud_top(sunny: PixelGroup, cloudy: PixelGroup) -> Box<dyn Animation> {
	Box::new(AnimationGroup::new(vec![
		Box::new(Solid::new(sunny, color::YELLOW)),
		Box::new(Solid::new(cloudy, color::DULL_WHITE)),
	]))
}

fn precipitation(
	drop_color: smart_leds_trait::RGB8,
	count: usize,
	min_period: u64,
	max_period: u64,
) -> Box<dyn Animation> {
	Box::new(AnimationGroup::new(vec![
		Box::new(Solid::new(pixels::top_half(), color::DULL_WHITE)),
		Box::new(Drops::new(
			pixels::rain_pixels(),
			FRAME,
			drop_color,
			count,
			min_period,
			max_period,
			color::DULL_WHITE,
		)),
	]))
}

impl Catalog {
	pub fn build() -> Self {
		let mut rng = rand::thread_rng();
		let mut anims: HashMap<AnimId, Box<dyn Animation>> = HashMap::new();

		anims.insert(
			AnimId::ClearDay,
			Box::new(Solid::new(PixelGroup::whole(), color::YELLOW)),
		);
		anims.insert(
			AnimId::ClearNight,
			Box::new(StarTwinkle::new(pixels::star_set(&mut rng, 12), FRAME, 4)),
		);
		anims.insert(AnimId::Cloud25, cloud_top(pixels::sunny75(), pixels::cloudy25()));
		anims.insert(AnimId::Cloud50, cloud_top(pixels::sunny50(), pixels::cloudy50()));
		anims.insert(AnimId::Cloud75, cloud_top(pixels::sunny25(), pixels::cloudy75()));
		anims.insert(
			AnimId::Cloud100,
			Box::new(Solid::new(PixelGroup::whole(), color::DULL_WHITE)),
		);

		anims.insert(AnimId::RainLight, precipitation(color::BLUE, 4, 2, 6));
		anims.insert(AnimId::RainHeavy, precipitation(color::BLUE, 10, 1, 5));
		anims.insert(AnimId::RainVeryHeavy, precipitation(color::BLUE, 16, 1, 4));
		anims.insert(AnimId::SnowLight, precipitation(color::WHITE, 4, 2, 6));
		anims.insert(AnimId::SnowHeavy, precipitation(color::WHITE, 10, 1, 5));
		anims.insert(AnimId::SnowVeryHeavy, precipitation(color::WHITE, 16, 1, 4));

		anims.insert(
			AnimId::Solid,
			Box::new(Solid::new(PixelGroup::whole(), color::RED)),
		);
		anims.insert(
			AnimId::Rainbow,
			Box::new(Rainbow::new(PixelGroup::whole(), FRAME, Duration::from_secs(2))),
		);
		anims.insert(
			AnimId::Pulse,
			Box::new(Pulse::new(
				PixelGroup::whole(),
				FRAME,
				Duration::from_secs(6),
				color::RED,
			)),
		);
		anims.insert(
			AnimId::Sparkle,
			Box::new(Sparkle::new(PixelGroup::whole(), FRAME, color::RED, 10)),
		);
		anims.insert(
			AnimId::RainbowSparkle,
			Box::new(RainbowSparkle::new(PixelGroup::whole(), FRAME, 15)),
		);
		anims.insert(
			AnimId::LineScan,
			Box::new(Comet::new(
				pixels::cross_strips(),
				Duration::from_millis(200),
				color::RED,
				3,
				true,
			)),
		);
		anims.insert(
			AnimId::GridScan,
			Box::new(Comet::new(
				pixels::hatch_strips(),
				Duration::from_millis(200),
				color::RED,
				4,
				true,
			)),
		);

		anims.insert(
			AnimId::Lightning1,
			Box::new(AnimationSequence::new(vec![flash(), streak(1), flash()])),
		);
		anims.insert(
			AnimId::Lightning2,
			Box::new(AnimationSequence::new(vec![streak(0), flash()])),
		);
		anims.insert(
			AnimId::Lightning3,
			Box::new(AnimationSequence::new(vec![flash(), streak(2)])),
		);
		anims.insert(
			AnimId::Lightning4,
			Box::new(AnimationSequence::new(vec![streak(1), flash(), streak(0)])),
		);
		anims.insert(
			AnimId::Lightning5,
			Box::new(AnimationSequence::new(vec![streak(3), flash(), flash()])),
		);
		anims.insert(
			AnimId::Lightning6,
			Box::new(AnimationSequence::new(vec![flash(), flash()])),
		);

		anims.insert(
			AnimId::Reset,
			Box::new(Solid::new(PixelGroup::whole(), color::BLACK)),
		);

		Catalog { anims }
	}

	pub fn get(&self, id: AnimId) -> &dyn Animation {
		self.anims
			.get(&id)
			.expect("catalog is built with every animation id")
			.as_ref()
	}

	pub fn get_mut(&mut self, id: AnimId) -> &mut dyn Animation {
		self.anims
			.get_mut(&id)
			.expect("catalog is built with every animation id")
			.as_mut()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use assert_matches::assert_matches;

	#[test]
	fn test_catalog_contains_all_referenced_ids() {
		let catalog = Catalog::build();
		for slot in default_modes().iter() {
			let _ = catalog.get(slot.anim);
		}
		for &id in LIGHTNING_POOL.iter().chain(WEATHER_DEMO.iter()) {
			let _ = catalog.get(id);
		}
		let _ = catalog.get(AnimId::Reset);
		let _ = catalog.get(DEFAULT_WEATHER);
	}

	#[test]
	fn test_weather_table_representative_codes() {
		assert_eq!(weather_animation(800, true), Some(AnimId::ClearDay));
		assert_eq!(weather_animation(800, false), Some(AnimId::ClearNight));
		assert_eq!(weather_animation(804, false), Some(AnimId::Cloud100));
		assert_eq!(weather_animation(200, true), Some(AnimId::Cloud100));
		assert_eq!(weather_animation(500, true), Some(AnimId::RainLight));
		assert_eq!(weather_animation(503, true), Some(AnimId::RainVeryHeavy));
		assert_eq!(weather_animation(601, true), Some(AnimId::SnowHeavy));
		assert_eq!(weather_animation(701, true), Some(AnimId::Cloud100));
		assert_matches!(weather_animation(999, true), None);
		assert_matches!(weather_animation(700, true), None);
	}

	#[test]
	fn test_mode_table_roles() {
		let modes = default_modes();
		assert_eq!(modes.len(), MODE_COUNT);
		assert!(modes[1].color_adjust && modes[1].intensity_adjust);
		assert!(!modes[2].color_adjust);
		assert!(!modes[9].color_adjust);
		assert_eq!(modes[9].anim, WEATHER_DEMO[0]);
	}
}
