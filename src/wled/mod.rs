//! WLED realtime display subsystem
//!
//! Implements the receive-and-decode pipeline for the UDP pixel stream:
//!
//! 1. [`receiver`] - Raw datagram reception
//! 2. [`protocol`] - Stateless packet decoding
//! 3. [`processor`] - Queue drain and framebuffer updates
//! 4. [`framebuffer`] - Pixel store and liveness state
//!
//! # Architecture
//!
//! ```text
//! Socket ──► Receiver ──► Queue ──► Processor ──► FrameBuffer
//!            (Datagrams)           (Decoded)      (Shared, polled)
//! ```
//!
//! The receiver runs as its own task; the processor is driven cooperatively
//! from the presentation tick and drains the queue to empty each cycle.

pub mod framebuffer;
pub mod processor;
pub mod protocol;
pub mod receiver;

use std::net::IpAddr;

// Re-export types that need to be public
pub use framebuffer::FrameBuffer;
pub use processor::UpdateProcessor;
pub use protocol::{decode, DecodedFrame, PixelWrite, Protocol, Rgb, NO_TIMEOUT};
pub use receiver::{PacketReceiver, ReceiverError, ReceiverHandle};

/// Capacity of the receiver-to-processor packet queue.
pub const PACKET_QUEUE_CAPACITY: usize = 1000;

/// One datagram as it came off the socket, decoded later on the consumer
/// side.
#[derive(Debug, Clone)]
pub struct RawPacket {
    pub data: Vec<u8>,
    pub source: Option<IpAddr>,
}
