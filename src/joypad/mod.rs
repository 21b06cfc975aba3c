//! Virtual joypad subsystem
//!
//! Translates abstract pad intents from the presentation layer into kernel
//! joystick event records and forwards them to an external reader:
//!
//! ```text
//! Presentation ──► JoypadHandle ──► Queue ──► Writer ──► Fifo
//!                  (Translation)   (Unbounded)           (External reader)
//! ```
//!
//! The bridge holds no state: every call produces exactly one record, and the
//! unbounded queue means a slow or absent reader never blocks the caller.

pub mod event;
pub mod writer;

use chrono::Local;
use tokio::sync::mpsc;
use tracing::{debug, warn};

// Re-export types that need to be public
pub use event::{JsEvent, JsEventKind, EVENT_SIZE};
pub use writer::{WriterError, WriterHandle};

/// Axis extreme for a pressed direction key.
pub const AXIS_MIN: i16 = i16::MIN;
pub const AXIS_MAX: i16 = i16::MAX;

// Fixed device layout: two axes, four buttons
const AXIS_X: u8 = 0;
const AXIS_Y: u8 = 1;
const BUTTON_B: u8 = 0;
const BUTTON_A: u8 = 1;
const BUTTON_SELECT: u8 = 8;
const BUTTON_START: u8 = 9;

/// Sending side of the joypad bridge, handed to the presentation layer.
#[derive(Clone)]
pub struct JoypadHandle {
    event_sender: mpsc::UnboundedSender<JsEvent>,
}

impl JoypadHandle {
    /// Create the bridge and the queue the writer task drains.
    pub fn create() -> (Self, mpsc::UnboundedReceiver<JsEvent>) {
        let (event_sender, event_receiver) = mpsc::unbounded_channel();
        (Self { event_sender }, event_receiver)
    }

    /// Emit one axis event. Values are passed through unchanged.
    pub fn axis(&self, number: u8, value: i16) {
        self.push(JsEvent::axis(number, value, wall_clock_seconds()));
    }

    /// Emit one button event.
    pub fn button(&self, number: u8, pressed: bool) {
        self.push(JsEvent::button(number, pressed, wall_clock_seconds()));
    }

    fn push(&self, event: JsEvent) {
        debug!("Joypad event: {:?}", event);
        if self.event_sender.send(event).is_err() {
            warn!("Joypad event dropped, writer task is gone");
        }
    }
}

fn wall_clock_seconds() -> u32 {
    Local::now().timestamp() as u32
}

/// The fixed pad layout the presentation layer reports intents in.
///
/// Directions map onto the two axes with signed extremes while pressed and 0
/// when released; the four action keys map onto independent button numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PadKey {
    Left,
    Right,
    Up,
    Down,
    Select,
    Start,
    B,
    A,
}

impl PadKey {
    /// Forward a press or release of this key through the bridge.
    pub fn apply(self, joypad: &JoypadHandle, pressed: bool) {
        match self {
            PadKey::Left => joypad.axis(AXIS_X, if pressed { AXIS_MIN } else { 0 }),
            PadKey::Right => joypad.axis(AXIS_X, if pressed { AXIS_MAX } else { 0 }),
            PadKey::Up => joypad.axis(AXIS_Y, if pressed { AXIS_MIN } else { 0 }),
            PadKey::Down => joypad.axis(AXIS_Y, if pressed { AXIS_MAX } else { 0 }),
            PadKey::Select => joypad.button(BUTTON_SELECT, pressed),
            PadKey::Start => joypad.button(BUTTON_START, pressed),
            PadKey::B => joypad.button(BUTTON_B, pressed),
            PadKey::A => joypad.button(BUTTON_A, pressed),
        }
    }
}
