use palette::{FromColor, Hsv, RgbHue, Srgb};
use smart_leds_trait::RGB8;

pub const RED: RGB8 = RGB8 { r: 255, g: 0, b: 0 };
pub const YELLOW: RGB8 = RGB8 { r: 255, g: 150, b: 0 };
pub const BLUE: RGB8 = RGB8 { r: 0, g: 0, b: 255 };
pub const WHITE: RGB8 = RGB8 { r: 255, g: 255, b: 255 };
pub const BLACK: RGB8 = RGB8 { r: 0, g: 0, b: 0 };

/// White at 10% intensity, used as the overcast cloud body color.
pub const DULL_WHITE: RGB8 = RGB8 { r: 25, g: 25, b: 25 };

/// Floor for the HSV value channel so an intensity-adjustable mode never
/// goes fully dark.
pub const MIN_VALUE: f32 = 0.1;

fn to_hsv(color: RGB8) -> Hsv {
	let rgb = Srgb::new(color.r, color.g, color.b).into_format::<f32>();
	Hsv::from_color(rgb)
}

fn from_hsv(hsv: Hsv) -> RGB8 {
	let rgb = Srgb::from_color(hsv).into_format::<u8>();
	RGB8 { r: rgb.red, g: rgb.green, b: rgb.blue }
}

/// Rotate a color around the hue wheel, preserving saturation and value.
/// Wrap-around is exact modulo 360°.
pub fn rotate_hue(color: RGB8, degrees: f32) -> RGB8 {
	let mut hsv = to_hsv(color);
	hsv.hue = RgbHue::from_degrees(hsv.hue.to_positive_degrees() + degrees);
	from_hsv(hsv)
}

/// Step the HSV value channel by `delta`, clamped to `[MIN_VALUE, 1.0]`.
pub fn adjust_value(color: RGB8, delta: f32) -> RGB8 {
	let mut hsv = to_hsv(color);
	hsv.value = (hsv.value + delta).max(MIN_VALUE).min(1.0);
	from_hsv(hsv)
}

/// Scale all channels by `intensity` in `[0, 1]`.
pub fn scale(color: RGB8, intensity: f32) -> RGB8 {
	let intensity = intensity.max(0.0).min(1.0);
	RGB8 {
		r: (color.r as f32 * intensity) as u8,
		g: (color.g as f32 * intensity) as u8,
		b: (color.b as f32 * intensity) as u8,
	}
}

/// Fully saturated color at the given hue, for rainbow effects.
pub fn from_hue(degrees: f32) -> RGB8 {
	from_hsv(Hsv::new(RgbHue::from_degrees(degrees), 1.0, 1.0))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn channels_close(a: RGB8, b: RGB8, tolerance: u8) {
		assert!(
			(a.r as i16 - b.r as i16).abs() <= tolerance as i16
				&& (a.g as i16 - b.g as i16).abs() <= tolerance as i16
				&& (a.b as i16 - b.b as i16).abs() <= tolerance as i16,
			"{:?} != {:?}",
			a,
			b
		);
	}

	#[test]
	fn test_rotate_hue_round_trip() {
		for &color in &[RED, YELLOW, BLUE, RGB8 { r: 17, g: 200, b: 96 }] {
			for &step in &[10.0, 30.0, 170.0] {
				let rotated = rotate_hue(rotate_hue(color, step), -step);
				channels_close(rotated, color, 2);
			}
		}
	}

	#[test]
	fn test_rotate_hue_wraps_exactly() {
		let full_turn = rotate_hue(RED, 360.0);
		channels_close(full_turn, RED, 2);
	}

	#[test]
	fn test_adjust_value_clamps() {
		let mut color = RED;
		for _ in 0..20 {
			color = adjust_value(color, -0.1);
		}
		let floor = to_hsv(color).value;
		assert!(floor >= MIN_VALUE - 0.01, "value fell to {}", floor);

		for _ in 0..20 {
			color = adjust_value(color, 0.1);
		}
		assert_eq!(color, RED);
	}

	#[test]
	fn test_scale() {
		assert_eq!(scale(WHITE, 0.1), DULL_WHITE);
		assert_eq!(scale(WHITE, 0.0), BLACK);
		assert_eq!(scale(RED, 1.0), RED);
	}
}
