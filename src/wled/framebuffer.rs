//! Fixed-size pixel store with freshness tracking.
//!
//! The buffer moves between three display states over its lifetime:
//!
//! ```text
//! NoSource ──first accepted write──► Active ◄──new frame──┐
//!                                      │                  │
//!                                      └─deadline passed─► Stale
//! ```
//!
//! Pixels are retained in the stale state, only `active` drops. Activity is a
//! function of the expiry deadline and the current time, so it has to be
//! refreshed on every poll: a silent sender must flip the display to stale
//! even when no packet ever arrives again.

use std::net::IpAddr;

use chrono::{DateTime, Duration, Local};
use tracing::debug;

use crate::wled::protocol::{DecodedFrame, Protocol, Rgb};

#[derive(Debug, Clone)]
pub struct FrameBuffer {
    width: usize,
    height: usize,
    pixels: Vec<Rgb>,
    /// True after the first accepted pixel write, never resets.
    pixel_data: bool,
    /// True while pixel data is present and not expired.
    active: bool,
    /// Dirty flag for the presentation consumer.
    updated: bool,
    protocol: Option<Protocol>,
    sender: Option<IpAddr>,
    /// Last timeout byte in seconds, `None` for a sticky frame.
    timeout: Option<u8>,
    expires_at: Option<DateTime<Local>>,
    last_update: Option<DateTime<Local>>,
    update_interval: Option<Duration>,
}

impl FrameBuffer {
    /// Create a buffer for a `width` x `height` grid, all pixels black.
    /// Dimensions are fixed for the lifetime of the buffer.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![Rgb::BLACK; width * height],
            pixel_data: false,
            active: false,
            // Starts dirty so a consumer draws the idle state once.
            updated: true,
            protocol: None,
            sender: None,
            timeout: None,
            expires_at: None,
            last_update: None,
            update_interval: None,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixel_count(&self) -> usize {
        self.pixels.len()
    }

    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn has_pixel_data(&self) -> bool {
        self.pixel_data
    }

    pub fn protocol(&self) -> Option<Protocol> {
        self.protocol
    }

    pub fn sender(&self) -> Option<IpAddr> {
        self.sender
    }

    pub fn expires_at(&self) -> Option<DateTime<Local>> {
        self.expires_at
    }

    pub fn last_update(&self) -> Option<DateTime<Local>> {
        self.last_update
    }

    /// Gap between the two most recent packets, absent until the second one.
    pub fn update_interval(&self) -> Option<Duration> {
        self.update_interval
    }

    pub fn updated(&self) -> bool {
        self.updated
    }

    /// Clear the dirty flag. Only the presentation consumer calls this, after
    /// it has rendered.
    pub fn clear_updated(&mut self) {
        self.updated = false;
    }

    /// Record the origin of the most recent packet. Tracked for every
    /// datagram, even ones too short to decode.
    pub fn note_sender(&mut self, source: Option<IpAddr>) {
        self.sender = source;
    }

    /// Apply one decoded frame received at `now`.
    ///
    /// Updates the update timestamps, the protocol tag and the expiry
    /// deadline, then performs the pixel writes in wire order (last write to
    /// an index wins). Any accepted write marks the buffer dirty.
    pub fn apply_frame(&mut self, frame: &DecodedFrame, now: DateTime<Local>) {
        self.update_interval = self.last_update.map(|prev| now - prev);
        self.last_update = Some(now);
        self.protocol = Some(frame.protocol);
        self.timeout = frame.timeout;
        self.expires_at = frame
            .timeout
            .map(|seconds| now + Duration::seconds(i64::from(seconds)));

        for write in &frame.writes {
            // The decoder already bounds-checked, but the buffer still never
            // writes outside its own pixel range.
            if let Some(pixel) = self.pixels.get_mut(write.index) {
                *pixel = write.color;
                self.pixel_data = true;
                self.updated = true;
            }
        }
    }

    /// Recompute the activity state against `now` and return whether it
    /// changed. Called once per poll cycle regardless of traffic, so an
    /// expired deadline is noticed without new packets.
    pub fn refresh_activity(&mut self, now: DateTime<Local>) -> bool {
        let active = self.pixel_data && self.expires_at.map_or(true, |deadline| now < deadline);
        if active == self.active {
            return false;
        }

        debug!(
            "Display {}",
            if active { "became active" } else { "went stale" }
        );
        self.active = active;
        self.updated = true;
        true
    }

    /// One-line status summary for the presentation layer.
    pub fn status_line(&self, now: DateTime<Local>) -> String {
        if self.active {
            let mut line = match self.sender {
                Some(sender) => format!("Active. Source: {}.", sender),
                None => "Active. Source: unknown.".to_string(),
            };
            if let Some(protocol) = self.protocol {
                line.push_str(&format!(" {}.", protocol));
            }
            match self.timeout {
                Some(seconds) => line.push_str(&format!(" Timeout: {}.", seconds)),
                None => line.push_str(" No timeout."),
            }
            if let Some(interval) = self.update_interval {
                let seconds = interval.num_milliseconds() as f64 / 1000.0;
                if seconds > 0.0 {
                    line.push_str(&format!(" Updates/sec: {:.2}", 1.0 / seconds));
                }
            }
            line
        } else {
            let mut line = "No source.".to_string();
            if let Some(sender) = self.sender {
                line.push_str(&format!(" Last source: {}.", sender));
            }
            if let Some(last_update) = self.last_update {
                let age = now - last_update;
                if age < Duration::seconds(60) {
                    let seconds = age.num_seconds();
                    if seconds == 1 {
                        line.push_str(&format!(" Last update: {} sec ago.", seconds));
                    } else {
                        line.push_str(&format!(" Last update: {} secs ago.", seconds));
                    }
                } else {
                    line.push_str(&format!(
                        " Last update: {}.",
                        last_update.format("%Y-%m-%d %H:%M:%S")
                    ));
                }
            }
            line
        }
    }
}
