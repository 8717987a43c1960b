use rand::seq::index::sample;
use rand::Rng;
use smart_leds_trait::RGB8;

/// Total pixels in the cloud: 32 in the upper body, 16 in the rain skirt.
pub const PIXEL_COUNT: usize = 48;

/// Flat frame buffer for the whole strip. Animations draw into this and the
/// main loop flushes it to the output device in one write.
pub struct PixelBuffer {
	leds: [RGB8; PIXEL_COUNT],
}

impl PixelBuffer {
	pub fn new() -> Self {
		PixelBuffer {
			leds: [RGB8 { r: 0, g: 0, b: 0 }; PIXEL_COUNT],
		}
	}

	pub fn fill(&mut self, color: RGB8) {
		for led in self.leds.iter_mut() {
			*led = color;
		}
	}

	pub fn set(&mut self, index: usize, color: RGB8) {
		self.leds[index] = color;
	}

	pub fn get(&self, index: usize) -> RGB8 {
		self.leds[index]
	}

	pub fn leds(&self) -> &[RGB8] {
		&self.leds
	}
}

/// A named region of the strip, as a list of logical cells. Most groups map
/// one cell to one physical pixel; the scan groups map one cell to a whole
/// column or band so a comet head lights several pixels at once.
#[derive(Debug, Clone)]
pub struct PixelGroup {
	cells: Vec<Vec<usize>>,
}

impl PixelGroup {
	pub fn individual(indices: &[usize]) -> Self {
		PixelGroup {
			cells: indices.iter().map(|&i| vec![i]).collect(),
		}
	}

	pub fn subset(start: usize, end: usize) -> Self {
		PixelGroup {
			cells: (start..end).map(|i| vec![i]).collect(),
		}
	}

	pub fn banded(bands: &[(usize, usize)]) -> Self {
		PixelGroup {
			cells: bands.iter().map(|&(start, end)| (start..end).collect()).collect(),
		}
	}

	pub fn whole() -> Self {
		Self::subset(0, PIXEL_COUNT)
	}

	pub fn len(&self) -> usize {
		self.cells.len()
	}

	/// Write one logical cell.
	pub fn set(&self, buf: &mut PixelBuffer, cell: usize, color: RGB8) {
		for &index in &self.cells[cell] {
			buf.set(index, color);
		}
	}

	pub fn fill(&self, buf: &mut PixelBuffer, color: RGB8) {
		for cell in &self.cells {
			for &index in cell {
				buf.set(index, color);
			}
		}
	}

	pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
		self.cells.iter().flat_map(|cell| cell.iter().cloned())
	}
}

/// Vertical columns through the serpentine upper body plus the rain skirt,
/// scanned left to right by the line-scan mode.
pub fn cross_strips() -> PixelGroup {
	PixelGroup {
		cells: vec![
			vec![31, 16, 15, 0],
			vec![30, 17, 14, 1],
			vec![29, 18, 13, 2],
			vec![28, 19, 12, 3],
			vec![27, 20, 11, 4],
			vec![26, 21, 10, 5],
			vec![25, 22, 9, 6],
			vec![24, 23, 8, 7],
			vec![35, 36, 43, 44],
			vec![34, 37, 42, 45],
			vec![33, 38, 41, 46],
			vec![32, 39, 40, 47],
		],
	}
}

/// Horizontal bands, top row first, scanned by the grid-scan mode.
pub fn hatch_strips() -> PixelGroup {
	PixelGroup::banded(&[
		(24, 32),
		(16, 24),
		(8, 16),
		(0, 8),
		(44, 48),
		(40, 44),
		(36, 40),
		(32, 36),
	])
}

pub fn sunny75() -> PixelGroup {
	PixelGroup::subset(8, 32)
}

pub fn sunny50() -> PixelGroup {
	PixelGroup::subset(16, 32)
}

pub fn sunny25() -> PixelGroup {
	PixelGroup::subset(24, 32)
}

pub fn cloudy75() -> PixelGroup {
	PixelGroup::banded(&[(32, 48), (0, 24)])
}

pub fn cloudy50() -> PixelGroup {
	PixelGroup::banded(&[(32, 48), (0, 16)])
}

pub fn cloudy25() -> PixelGroup {
	PixelGroup::banded(&[(32, 48), (0, 8)])
}

pub fn top_half() -> PixelGroup {
	PixelGroup::subset(0, 32)
}

pub fn rain_pixels() -> PixelGroup {
	PixelGroup::subset(32, 48)
}

/// Random distinct pixels acting as stars for the clear-night animation.
pub fn star_set<R: Rng>(rng: &mut R, count: usize) -> PixelGroup {
	let stars = sample(rng, PIXEL_COUNT, count).into_vec();
	PixelGroup::individual(&stars)
}

const LIGHTNING_PATHS: [&[usize]; 6] = [
	&[26, 28, 30, 19, 11, 2, 46, 42, 38],
	&[41, 45, 4, 13, 20, 25, 27, 33, 39],
	&[39, 31, 29, 18, 11, 7, 45, 41, 32],
	&[6, 10, 20, 29, 17, 39, 38, 42, 47],
	&[44, 38, 31, 17, 13, 3, 9, 38, 34],
	&[7, 10, 11, 12, 18, 30, 32, 37, 41],
];

pub const LIGHTNING_PATH_COUNT: usize = LIGHTNING_PATHS.len();

/// Jagged top-to-bottom path traced by a lightning streak, `index` in
/// `0..LIGHTNING_PATH_COUNT`.
pub fn lightning_path(index: usize) -> PixelGroup {
	PixelGroup::individual(LIGHTNING_PATHS[index])
}
