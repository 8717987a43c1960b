use smart_leds_trait::{SmartLedsWrite, RGB8};
use std::io::{self, stdout};

use crossterm::{ExecutableCommand, style::{Print, SetForegroundColor, ResetColor, Color}};

use crate::error::Error;
use crate::pixels::PIXEL_COUNT;

const ROW_LEN: usize = 8;

/// Renders the strip to the terminal, one "O" per pixel, wrapped into rows
/// matching how the strip coils through the lamp shell.
pub struct TerminalWrite;

impl TerminalWrite {
	fn write_with_io_error<T, I>(&mut self, mut iterator: T) -> Result<(), io::Error>
		where
			T: Iterator<Item=I>,
			I: Into<RGB8>,
	{
		for _ in 0..(PIXEL_COUNT / ROW_LEN) {
			for color in iterator.by_ref().take(ROW_LEN) {
				let color = color.into();
				stdout()
					.execute(SetForegroundColor(Color::Rgb {r: color.r, g: color.g, b: color.b}))?
					.execute(Print("O"))?;
			}
			stdout()
				.execute(ResetColor)?
				.execute(Print("\n"))?;
		}
		stdout().execute(Print("\n"))?;
		Ok(())
	}
}

impl SmartLedsWrite for TerminalWrite {
	type Error = Error;
	type Color = RGB8;

	fn write<T, I>(&mut self, iterator: T) -> Result<(), Self::Error>
		where
			T: Iterator<Item=I>,
			I: Into<Self::Color>,
	{
		self.write_with_io_error(iterator)
			.map_err(Error::TerminalOutput)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_write() {
		let mut writer = TerminalWrite;
		writer.write(vec![RGB8::new(255, 0, 0); PIXEL_COUNT].into_iter()).unwrap();
	}
}
