//! Packet drain and framebuffer update.
//!
//! Runs cooperatively: the presentation tick calls [`UpdateProcessor::process_pending`]
//! once per cycle, which empties the packet queue in arrival order and then
//! refreshes the activity state. Malformed packets never stop the drain.

use std::sync::Arc;

use chrono::{DateTime, Local};
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

use crate::wled::framebuffer::FrameBuffer;
use crate::wled::protocol::decode;
use crate::wled::RawPacket;

pub struct UpdateProcessor {
    packet_receiver: mpsc::Receiver<RawPacket>,
    framebuffer: Arc<Mutex<FrameBuffer>>,
}

impl UpdateProcessor {
    pub fn new(
        packet_receiver: mpsc::Receiver<RawPacket>,
        framebuffer: Arc<Mutex<FrameBuffer>>,
    ) -> Self {
        Self {
            packet_receiver,
            framebuffer,
        }
    }

    pub fn framebuffer(&self) -> Arc<Mutex<FrameBuffer>> {
        self.framebuffer.clone()
    }

    /// Drain the packet queue completely, apply each packet in arrival order,
    /// then recompute the activity state against `now`. Returns the number of
    /// packets applied.
    ///
    /// The activity refresh runs even when the queue was empty: expiry must
    /// be noticed during packet-free intervals too.
    pub async fn process_pending(&mut self, now: DateTime<Local>) -> usize {
        let mut processed = 0;

        loop {
            match self.packet_receiver.try_recv() {
                Ok(packet) => {
                    self.apply(packet, now).await;
                    processed += 1;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    warn!("Packet queue disconnected, no more packets will arrive");
                    break;
                }
            }
        }

        self.framebuffer.lock().await.refresh_activity(now);
        processed
    }

    // Apply a single raw packet. Undersized packets only update the sender
    // diagnostic and are otherwise ignored.
    async fn apply(&self, packet: RawPacket, now: DateTime<Local>) {
        let mut framebuffer = self.framebuffer.lock().await;
        framebuffer.note_sender(packet.source);

        let Some(frame) = decode(&packet.data, framebuffer.pixel_count()) else {
            debug!("Ignoring undersized packet ({} bytes)", packet.data.len());
            return;
        };

        debug!(
            "Applying {} frame: {} writes, timeout {:?}",
            frame.protocol,
            frame.writes.len(),
            frame.timeout
        );
        framebuffer.apply_frame(&frame, now);
    }
}
