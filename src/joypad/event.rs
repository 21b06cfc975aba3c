//! Joystick event records.
//!
//! The sink speaks the classic kernel joystick device format: fixed 8-byte
//! records of `{u32 time, i16 value, u8 kind, u8 number}` in little-endian
//! byte order, one record per state change.

/// Serialized size of one record in bytes.
pub const EVENT_SIZE: usize = 8;

/// Event kinds emitted by the bridge. Init/synthetic kinds are not emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum JsEventKind {
    Button = 0x01,
    Axis = 0x02,
}

/// One immutable joystick event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsEvent {
    /// Wall clock seconds since the epoch.
    pub time: u32,
    /// Axis position or button state (1 pressed, 0 released).
    pub value: i16,
    pub kind: JsEventKind,
    /// Axis or button number, assigned by the caller.
    pub number: u8,
}

impl JsEvent {
    pub fn axis(number: u8, value: i16, time: u32) -> Self {
        Self {
            time,
            value,
            kind: JsEventKind::Axis,
            number,
        }
    }

    pub fn button(number: u8, pressed: bool, time: u32) -> Self {
        Self {
            time,
            value: if pressed { 1 } else { 0 },
            kind: JsEventKind::Button,
            number,
        }
    }

    /// Serialize to the on-wire record layout.
    pub fn to_bytes(&self) -> [u8; EVENT_SIZE] {
        let mut bytes = [0u8; EVENT_SIZE];
        bytes[0..4].copy_from_slice(&self.time.to_le_bytes());
        bytes[4..6].copy_from_slice(&self.value.to_le_bytes());
        bytes[6] = self.kind as u8;
        bytes[7] = self.number;
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_record_layout() {
        let event = JsEvent::axis(0, -32768, 0x0102_0304);
        assert_eq!(
            event.to_bytes(),
            [0x04, 0x03, 0x02, 0x01, 0x00, 0x80, 0x02, 0x00]
        );
    }

    #[test]
    fn button_record_layout() {
        let pressed = JsEvent::button(9, true, 1);
        assert_eq!(pressed.to_bytes(), [1, 0, 0, 0, 1, 0, 0x01, 9]);

        let released = JsEvent::button(9, false, 2);
        assert_eq!(released.to_bytes(), [2, 0, 0, 0, 0, 0, 0x01, 9]);
    }
}
