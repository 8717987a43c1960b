use std::time::{Duration, Instant};

use rand::seq::SliceRandom;
use rand::Rng;
use smart_leds_trait::RGB8;

use crate::color;
use crate::pixels::{PixelBuffer, PixelGroup};

/// A stateful visual pattern rendering frame-by-frame onto a region of the
/// strip. Every variant exposes one active color, whatever it uses it for
/// internally, so the controller never has to special-case variants.
pub trait Animation {
	/// Advance by at most one frame. Each animation paces itself; the call is
	/// a no-op until the frame interval has elapsed. Returns whether the
	/// buffer was touched.
	fn tick(&mut self, now: Instant, buf: &mut PixelBuffer) -> bool;

	/// Return to the initial frame.
	fn reset(&mut self);

	fn color(&self) -> RGB8;

	fn set_color(&mut self, color: RGB8);

	/// Completed play-throughs since the last reset, for sequence-type
	/// animations. Plain animations report 0.
	fn cycle_count(&self) -> u32 {
		0
	}

	fn reset_cycle_count(&mut self) {}
}

/// Per-animation frame pacing. `due` fires immediately on the first call
/// after construction or restart.
struct FrameTimer {
	interval: Duration,
	next: Option<Instant>,
}

impl FrameTimer {
	fn new(interval: Duration) -> Self {
		FrameTimer { interval, next: None }
	}

	fn due(&mut self, now: Instant) -> bool {
		match self.next {
			Some(next) if now < next => false,
			_ => {
				self.next = Some(now + self.interval);
				true
			}
		}
	}

	fn set_interval(&mut self, interval: Duration) {
		self.interval = interval;
	}

	fn restart(&mut self) {
		self.next = None;
	}
}

pub struct Solid {
	group: PixelGroup,
	color: RGB8,
	timer: FrameTimer,
}

impl Solid {
	pub fn new(group: PixelGroup, color: RGB8) -> Self {
		Solid {
			group,
			color,
			timer: FrameTimer::new(Duration::from_millis(500)),
		}
	}
}

impl Animation for Solid {
	fn tick(&mut self, now: Instant, buf: &mut PixelBuffer) -> bool {
		if !self.timer.due(now) {
			return false;
		}
		self.group.fill(buf, self.color);
		true
	}

	fn reset(&mut self) {
		self.timer.restart();
	}

	fn color(&self) -> RGB8 {
		self.color
	}

	fn set_color(&mut self, color: RGB8) {
		self.color = color;
	}
}

/// A bright head with a fading tail moving cell by cell through a group.
/// With `ring` the head wraps forever; without it the run ends after one
/// pass and counts a cycle.
pub struct Comet {
	group: PixelGroup,
	color: RGB8,
	tail: usize,
	ring: bool,
	pos: usize,
	timer: FrameTimer,
	cycles: u32,
}

impl Comet {
	pub fn new(group: PixelGroup, interval: Duration, color: RGB8, tail: usize, ring: bool) -> Self {
		Comet {
			group,
			color,
			tail,
			ring,
			pos: 0,
			timer: FrameTimer::new(interval),
			cycles: 0,
		}
	}
}

impl Animation for Comet {
	fn tick(&mut self, now: Instant, buf: &mut PixelBuffer) -> bool {
		if !self.timer.due(now) {
			return false;
		}
		let len = self.group.len();
		self.group.fill(buf, color::BLACK);
		for k in 0..=self.tail {
			let cell = if self.pos >= k {
				self.pos - k
			} else if self.ring {
				len + self.pos - k
			} else {
				continue;
			};
			let fade = 1.0 - k as f32 / (self.tail + 1) as f32;
			self.group.set(buf, cell, color::scale(self.color, fade));
		}
		self.pos += 1;
		if self.pos >= len {
			self.pos = 0;
			self.cycles += 1;
		}
		true
	}

	fn reset(&mut self) {
		self.pos = 0;
		self.timer.restart();
	}

	fn color(&self) -> RGB8 {
		self.color
	}

	fn set_color(&mut self, color: RGB8) {
		self.color = color;
	}

	fn cycle_count(&self) -> u32 {
		self.cycles
	}

	fn reset_cycle_count(&mut self) {
		self.cycles = 0;
	}
}

/// Whole-group breathing: intensity ramps up then back down over `period`.
pub struct Pulse {
	group: PixelGroup,
	color: RGB8,
	step: u32,
	steps_per_period: u32,
	timer: FrameTimer,
	cycles: u32,
}

impl Pulse {
	pub fn new(group: PixelGroup, interval: Duration, period: Duration, color: RGB8) -> Self {
		let steps_per_period = (period.as_millis() / interval.as_millis().max(1)).max(2) as u32;
		Pulse {
			group,
			color,
			step: 0,
			steps_per_period,
			timer: FrameTimer::new(interval),
			cycles: 0,
		}
	}
}

impl Animation for Pulse {
	fn tick(&mut self, now: Instant, buf: &mut PixelBuffer) -> bool {
		if !self.timer.due(now) {
			return false;
		}
		let half = self.steps_per_period / 2;
		let intensity = if self.step <= half {
			self.step as f32 / half as f32
		} else {
			(self.steps_per_period - self.step) as f32 / half as f32
		};
		self.group.fill(buf, color::scale(self.color, intensity));
		self.step += 1;
		if self.step >= self.steps_per_period {
			self.step = 0;
			self.cycles += 1;
		}
		true
	}

	fn reset(&mut self) {
		self.step = 0;
		self.timer.restart();
	}

	fn color(&self) -> RGB8 {
		self.color
	}

	fn set_color(&mut self, color: RGB8) {
		self.color = color;
	}

	fn cycle_count(&self) -> u32 {
		self.cycles
	}

	fn reset_cycle_count(&mut self) {
		self.cycles = 0;
	}
}

/// Random cells flare to full color over a dimmed base.
pub struct Sparkle {
	group: PixelGroup,
	color: RGB8,
	num_sparkles: usize,
	timer: FrameTimer,
}

impl Sparkle {
	pub fn new(group: PixelGroup, interval: Duration, color: RGB8, num_sparkles: usize) -> Self {
		Sparkle {
			group,
			color,
			num_sparkles,
			timer: FrameTimer::new(interval),
		}
	}
}

impl Animation for Sparkle {
	fn tick(&mut self, now: Instant, buf: &mut PixelBuffer) -> bool {
		if !self.timer.due(now) {
			return false;
		}
		let mut rng = rand::thread_rng();
		self.group.fill(buf, color::scale(self.color, 0.3));
		for _ in 0..self.num_sparkles {
			let cell = rng.gen_range(0..self.group.len());
			self.group.set(buf, cell, self.color);
		}
		true
	}

	fn reset(&mut self) {
		self.timer.restart();
	}

	fn color(&self) -> RGB8 {
		self.color
	}

	fn set_color(&mut self, color: RGB8) {
		self.color = color;
	}
}

/// Hue gradient across the group, rotating one step per frame.
pub struct Rainbow {
	group: PixelGroup,
	offset: f32,
	step: f32,
	timer: FrameTimer,
	cycles: u32,
}

impl Rainbow {
	pub fn new(group: PixelGroup, interval: Duration, period: Duration) -> Self {
		let step = 360.0 * interval.as_secs_f32() / period.as_secs_f32();
		Rainbow {
			group,
			offset: 0.0,
			step,
			timer: FrameTimer::new(interval),
			cycles: 0,
		}
	}
}

impl Animation for Rainbow {
	fn tick(&mut self, now: Instant, buf: &mut PixelBuffer) -> bool {
		if !self.timer.due(now) {
			return false;
		}
		let len = self.group.len();
		for cell in 0..len {
			let hue = self.offset + cell as f32 * 360.0 / len as f32;
			self.group.set(buf, cell, color::from_hue(hue));
		}
		self.offset += self.step;
		if self.offset >= 360.0 {
			self.offset -= 360.0;
			self.cycles += 1;
		}
		true
	}

	fn reset(&mut self) {
		self.offset = 0.0;
		self.timer.restart();
	}

	fn color(&self) -> RGB8 {
		color::from_hue(self.offset)
	}

	fn set_color(&mut self, _color: RGB8) {}

	fn cycle_count(&self) -> u32 {
		self.cycles
	}

	fn reset_cycle_count(&mut self) {
		self.cycles = 0;
	}
}

/// Random cells at random hues over a dimmed white base.
pub struct RainbowSparkle {
	group: PixelGroup,
	num_sparkles: usize,
	timer: FrameTimer,
}

impl RainbowSparkle {
	pub fn new(group: PixelGroup, interval: Duration, num_sparkles: usize) -> Self {
		RainbowSparkle {
			group,
			num_sparkles,
			timer: FrameTimer::new(interval),
		}
	}
}

impl Animation for RainbowSparkle {
	fn tick(&mut self, now: Instant, buf: &mut PixelBuffer) -> bool {
		if !self.timer.due(now) {
			return false;
		}
		let mut rng = rand::thread_rng();
		self.group.fill(buf, color::scale(color::WHITE, 0.1));
		for _ in 0..self.num_sparkles {
			let cell = rng.gen_range(0..self.group.len());
			let hue = rng.gen_range(0.0..360.0);
			self.group.set(buf, cell, color::from_hue(hue));
		}
		true
	}

	fn reset(&mut self) {
		self.timer.restart();
	}

	fn color(&self) -> RGB8 {
		color::WHITE
	}

	fn set_color(&mut self, _color: RGB8) {}
}

struct ActiveDrop {
	cell: usize,
	period: Duration,
	elapsed: Duration,
}

/// Rain or snow droplets: each drop ramps up in brightness over half its
/// period on a random cell, then vanishes back into the background.
pub struct Drops {
	group: PixelGroup,
	color: RGB8,
	background: RGB8,
	count: usize,
	min_period_secs: u64,
	max_period_secs: u64,
	drops: Vec<ActiveDrop>,
	timer: FrameTimer,
	interval: Duration,
}

impl Drops {
	pub fn new(
		group: PixelGroup,
		interval: Duration,
		color: RGB8,
		count: usize,
		min_period_secs: u64,
		max_period_secs: u64,
		background: RGB8,
	) -> Self {
		Drops {
			group,
			color,
			background,
			count,
			min_period_secs,
			max_period_secs,
			drops: Vec::new(),
			timer: FrameTimer::new(interval),
			interval,
		}
	}
}

impl Animation for Drops {
	fn tick(&mut self, now: Instant, buf: &mut PixelBuffer) -> bool {
		if !self.timer.due(now) {
			return false;
		}
		let mut rng = rand::thread_rng();

		self.group.fill(buf, self.background);

		for drop in self.drops.iter_mut() {
			drop.elapsed += self.interval;
		}
		let interval = self.interval;
		self.drops.retain(|drop| drop.elapsed < drop.period / 2 + interval);

		if self.drops.len() < self.count {
			let used: Vec<usize> = self.drops.iter().map(|drop| drop.cell).collect();
			let avail: Vec<usize> =
				(0..self.group.len()).filter(|cell| !used.contains(cell)).collect();
			if let Some(&cell) = avail.choose(&mut rng) {
				let secs = rng.gen_range(self.min_period_secs..=self.max_period_secs);
				self.drops.push(ActiveDrop {
					cell,
					period: Duration::from_secs(secs),
					elapsed: Duration::from_secs(0),
				});
			}
		}

		for drop in &self.drops {
			let half = drop.period.as_secs_f32() / 2.0;
			let intensity = (drop.elapsed.as_secs_f32() / half).min(1.0);
			self.group.set(buf, drop.cell, color::scale(self.color, intensity));
		}
		true
	}

	fn reset(&mut self) {
		self.drops.clear();
		self.timer.restart();
	}

	fn color(&self) -> RGB8 {
		self.color
	}

	fn set_color(&mut self, color: RGB8) {
		self.color = color;
	}
}

/// Strobes a random scatter of pixels at randomized intervals. A cycle
/// completes after a random handful of flashes, which is what lets a
/// lightning sequence advance past it.
pub struct LightningFlash {
	group: PixelGroup,
	color: RGB8,
	num_pixels: usize,
	lower: Duration,
	upper: Duration,
	lit: bool,
	flashes_left: u32,
	timer: FrameTimer,
	cycles: u32,
}

impl LightningFlash {
	pub fn new(
		group: PixelGroup,
		color: RGB8,
		num_pixels: usize,
		lower: Duration,
		upper: Duration,
	) -> Self {
		LightningFlash {
			group,
			color,
			num_pixels,
			lower,
			upper,
			lit: false,
			flashes_left: 0,
			timer: FrameTimer::new(lower),
			cycles: 0,
		}
	}

	fn random_interval(&self) -> Duration {
		let millis = rand::thread_rng()
			.gen_range(self.lower.as_millis() as u64..=self.upper.as_millis() as u64);
		Duration::from_millis(millis)
	}
}

impl Animation for LightningFlash {
	fn tick(&mut self, now: Instant, buf: &mut PixelBuffer) -> bool {
		if !self.timer.due(now) {
			return false;
		}
		let mut rng = rand::thread_rng();
		if self.flashes_left == 0 {
			self.flashes_left = rng.gen_range(2..=4);
		}
		if self.lit {
			self.group.fill(buf, color::BLACK);
			self.lit = false;
			self.flashes_left -= 1;
			if self.flashes_left == 0 {
				self.cycles += 1;
			}
		} else {
			for _ in 0..self.num_pixels {
				let cell = rng.gen_range(0..self.group.len());
				self.group.set(buf, cell, self.color);
			}
			self.lit = true;
		}
		let interval = self.random_interval();
		self.timer.set_interval(interval);
		true
	}

	fn reset(&mut self) {
		self.lit = false;
		self.flashes_left = 0;
		self.timer.restart();
	}

	fn color(&self) -> RGB8 {
		self.color
	}

	fn set_color(&mut self, color: RGB8) {
		self.color = color;
	}

	fn cycle_count(&self) -> u32 {
		self.cycles
	}

	fn reset_cycle_count(&mut self) {
		self.cycles = 0;
	}
}

/// Clear-night stars: a random handful of the star pixels blink between
/// full and dull white, repicking after a random number of blinks.
pub struct StarTwinkle {
	group: PixelGroup,
	lit: Vec<usize>,
	num_stars: usize,
	bright_phase: bool,
	blinks_left: u32,
	base_interval: Duration,
	timer: FrameTimer,
}

impl StarTwinkle {
	pub fn new(group: PixelGroup, interval: Duration, num_stars: usize) -> Self {
		StarTwinkle {
			group,
			lit: Vec::new(),
			num_stars,
			bright_phase: true,
			blinks_left: 0,
			base_interval: interval,
			timer: FrameTimer::new(interval),
		}
	}
}

impl Animation for StarTwinkle {
	fn tick(&mut self, now: Instant, buf: &mut PixelBuffer) -> bool {
		if !self.timer.due(now) {
			return false;
		}
		let mut rng = rand::thread_rng();
		if self.blinks_left == 0 {
			self.lit = (0..self.num_stars)
				.map(|_| rng.gen_range(0..self.group.len()))
				.collect();
			self.blinks_left = rng.gen_range(1..=5);
		}
		self.group.fill(buf, color::DULL_WHITE);
		if self.bright_phase {
			for &cell in &self.lit {
				self.group.set(buf, cell, color::WHITE);
			}
		} else {
			self.blinks_left -= 1;
		}
		self.bright_phase = !self.bright_phase;
		self.timer
			.set_interval(self.base_interval * rng.gen_range(1..=4));
		true
	}

	fn reset(&mut self) {
		self.lit.clear();
		self.blinks_left = 0;
		self.bright_phase = true;
		self.timer.restart();
	}

	fn color(&self) -> RGB8 {
		color::WHITE
	}

	fn set_color(&mut self, _color: RGB8) {}
}

/// Several animations rendered together each frame, e.g. a lit cloud top
/// with a rain skirt underneath.
pub struct AnimationGroup {
	members: Vec<Box<dyn Animation>>,
}

impl AnimationGroup {
	pub fn new(members: Vec<Box<dyn Animation>>) -> Self {
		AnimationGroup { members }
	}
}

impl Animation for AnimationGroup {
	fn tick(&mut self, now: Instant, buf: &mut PixelBuffer) -> bool {
		let mut drew = false;
		for member in self.members.iter_mut() {
			drew |= member.tick(now, buf);
		}
		drew
	}

	fn reset(&mut self) {
		for member in self.members.iter_mut() {
			member.reset();
		}
	}

	fn color(&self) -> RGB8 {
		self.members.first().map(|m| m.color()).unwrap_or(color::BLACK)
	}

	fn set_color(&mut self, color: RGB8) {
		for member in self.members.iter_mut() {
			member.set_color(color);
		}
	}
}

/// Plays its members one after another, advancing when the current member
/// completes a cycle; a full pass through all members counts one cycle of
/// the sequence. The strip is cleared between members.
pub struct AnimationSequence {
	members: Vec<Box<dyn Animation>>,
	current: usize,
	cycles: u32,
}

impl AnimationSequence {
	pub fn new(members: Vec<Box<dyn Animation>>) -> Self {
		assert!(!members.is_empty());
		AnimationSequence {
			members,
			current: 0,
			cycles: 0,
		}
	}
}

impl Animation for AnimationSequence {
	fn tick(&mut self, now: Instant, buf: &mut PixelBuffer) -> bool {
		let member = &mut self.members[self.current];
		let drew = member.tick(now, buf);
		if member.cycle_count() > 0 {
			member.reset_cycle_count();
			member.reset();
			buf.fill(color::BLACK);
			self.current += 1;
			if self.current >= self.members.len() {
				self.current = 0;
				self.cycles += 1;
			}
		}
		drew
	}

	fn reset(&mut self) {
		for member in self.members.iter_mut() {
			member.reset_cycle_count();
			member.reset();
		}
		self.current = 0;
	}

	fn color(&self) -> RGB8 {
		self.members[self.current].color()
	}

	fn set_color(&mut self, color: RGB8) {
		for member in self.members.iter_mut() {
			member.set_color(color);
		}
	}

	fn cycle_count(&self) -> u32 {
		self.cycles
	}

	fn reset_cycle_count(&mut self) {
		self.cycles = 0;
	}
}
