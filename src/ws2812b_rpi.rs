use rs_ws281x::{ChannelBuilder, Controller, ControllerBuilder, StripType};
use smart_leds_trait::{SmartLedsWrite, RGB8};
use std::time::{Duration, Instant};

use crate::error::Error;
use crate::pixels::PIXEL_COUNT;

pub struct WS2812BRpiWrite {
	controller: Controller,
}

const MAX_WAIT_TIME: Duration = Duration::from_millis(1);

impl WS2812BRpiWrite {
	pub fn new(pin: u32) -> Result<Self, Error> {
		let mut controller_builder = ControllerBuilder::new();
		controller_builder.freq(1_000_000_000 / 1250);  // 1250ns period

		let channel = ChannelBuilder::new()
			.pin(pin as i32)
			.count(PIXEL_COUNT as i32)
			.strip_type(StripType::Ws2812)
			.brightness(255)
			.build();
		controller_builder.channel(0, channel);

		let controller = controller_builder.build()?;
		Ok(WS2812BRpiWrite {
			controller,
		})
	}
}

impl SmartLedsWrite for WS2812BRpiWrite {
	type Error = Error;
	type Color = RGB8;

	fn write<T, I>(&mut self, mut iter: T) -> Result<(), Self::Error>
		where
			T: Iterator<Item=I>,
			I: Into<Self::Color>,
	{
		let before_wait = Instant::now();
		self.controller.wait()?;
		if Instant::now().duration_since(before_wait) > MAX_WAIT_TIME {
			log::warn!(
				"Had to wait more than {}us for last render before next render, \
				render frequency may be too high",
				MAX_WAIT_TIME.as_micros()
			);
		}

		for value in self.controller.leds_mut(0).iter_mut() {
			if let Some(color) = iter.next() {
				let color = color.into();
				*value = [color.b, color.g, color.r, 0];
			} else {
				log::error!("Not enough values in color iterator");
				break;
			}
		}
		self.controller.render()?;
		Ok(())
	}
}
