#[cfg(feature = "term_display")]
use std::time::Duration;

#[cfg(feature = "rpi")]
use std::sync::mpsc::{self, Receiver, TryRecvError};
#[cfg(feature = "rpi")]
use std::thread;

#[cfg(feature = "rpi")]
use crate::error::Error;

/// Remote button vocabulary. Raw codes outside this set never make it past
/// the input source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
	Mode,
	Up,
	Down,
	Left,
	Right,
	Enter,
	Setup,
	Back,
	VolUp,
	VolDown,
	Play,
	Digit(u8),
}

/// Map a kernel key code (as decoded from the NEC IR protocol) to a remote
/// key. Unmapped codes are dropped.
#[cfg(feature = "rpi")]
fn key_from_code(code: evdev::Key) -> Option<Key> {
	let key = match code {
		evdev::Key::KEY_STOP => Key::Mode,
		evdev::Key::KEY_UP => Key::Up,
		evdev::Key::KEY_DOWN => Key::Down,
		evdev::Key::KEY_LEFT => Key::Left,
		evdev::Key::KEY_RIGHT => Key::Right,
		evdev::Key::KEY_ENTER => Key::Enter,
		evdev::Key::KEY_SETUP => Key::Setup,
		evdev::Key::KEY_BACK => Key::Back,
		evdev::Key::KEY_VOLUMEUP => Key::VolUp,
		evdev::Key::KEY_VOLUMEDOWN => Key::VolDown,
		evdev::Key::KEY_PLAYPAUSE => Key::Play,
		evdev::Key::KEY_0 => Key::Digit(0),
		evdev::Key::KEY_1 => Key::Digit(1),
		evdev::Key::KEY_2 => Key::Digit(2),
		evdev::Key::KEY_3 => Key::Digit(3),
		evdev::Key::KEY_4 => Key::Digit(4),
		evdev::Key::KEY_5 => Key::Digit(5),
		evdev::Key::KEY_6 => Key::Digit(6),
		evdev::Key::KEY_7 => Key::Digit(7),
		evdev::Key::KEY_8 => Key::Digit(8),
		evdev::Key::KEY_9 => Key::Digit(9),
		_ => return None,
	};
	Some(key)
}

/// Non-blocking source of remote key events.
#[cfg_attr(test, mockall::automock)]
pub trait InputSource {
	fn poll(&mut self) -> Option<Key>;
}

/// IR remote events from a Linux input device. A reader thread blocks on
/// the device and feeds decoded presses through a channel so `poll` never
/// blocks the render loop.
#[cfg(feature = "rpi")]
pub struct IrRemote {
	receiver: Receiver<Key>,
}

#[cfg(feature = "rpi")]
impl IrRemote {
	pub fn open(path: &str) -> Result<Self, Error> {
		let device = evdev::Device::open(path).map_err(Error::InputDevice)?;
		log::info!("opened input device {}", path);
		let (sender, receiver) = mpsc::channel();
		thread::spawn(move || read_events(device, sender));
		Ok(IrRemote { receiver })
	}
}

#[cfg(feature = "rpi")]
impl InputSource for IrRemote {
	fn poll(&mut self) -> Option<Key> {
		match self.receiver.try_recv() {
			Ok(key) => Some(key),
			Err(TryRecvError::Empty) => None,
			Err(TryRecvError::Disconnected) => {
				log::error!("input reader thread exited");
				None
			}
		}
	}
}

#[cfg(feature = "rpi")]
fn read_events(mut device: evdev::Device, sender: mpsc::Sender<Key>) {
	loop {
		let events = match device.fetch_events() {
			Ok(events) => events,
			Err(err) => {
				log::error!("could not read from input device: {}", err);
				return;
			}
		};
		for event in events {
			if let evdev::InputEventKind::Key(code) = event.kind() {
				// Key-down only; repeats and releases are ignored.
				if event.value() != 1 {
					continue;
				}
				if let Some(key) = key_from_code(code) {
					if sender.send(key).is_err() {
						return;
					}
				}
			}
		}
	}
}

/// Keyboard stand-in for the IR remote when rendering to a terminal:
/// m=Mode, p=Play, arrows, Enter, digits.
#[cfg(feature = "term_display")]
pub struct TermInput;

#[cfg(feature = "term_display")]
impl InputSource for TermInput {
	fn poll(&mut self) -> Option<Key> {
		use crossterm::event::{self, Event, KeyCode};

		match event::poll(Duration::from_millis(0)) {
			Ok(true) => {}
			Ok(false) => return None,
			Err(err) => {
				log::warn!("could not poll terminal events: {}", err);
				return None;
			}
		}
		let event = match event::read() {
			Ok(event) => event,
			Err(err) => {
				log::warn!("could not read terminal event: {}", err);
				return None;
			}
		};
		let code = match event {
			Event::Key(key_event) => key_event.code,
			_ => return None,
		};
		match code {
			KeyCode::Char('m') => Some(Key::Mode),
			KeyCode::Up => Some(Key::Up),
			KeyCode::Down => Some(Key::Down),
			KeyCode::Left => Some(Key::Left),
			KeyCode::Right => Some(Key::Right),
			KeyCode::Enter => Some(Key::Enter),
			KeyCode::Char('s') => Some(Key::Setup),
			KeyCode::Char('b') => Some(Key::Back),
			KeyCode::Char('+') => Some(Key::VolUp),
			KeyCode::Char('-') => Some(Key::VolDown),
			KeyCode::Char('p') => Some(Key::Play),
			KeyCode::Char(c @ '0'..='9') => Some(Key::Digit(c as u8 - b'0')),
			_ => None,
		}
	}
}
