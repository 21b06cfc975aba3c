//! UDP receive task.
//!
//! Reads one datagram at a time from the socket and forwards it unparsed into
//! the packet queue. Decoding happens on the consumer side, once per
//! presentation tick, so this loop never does more than a socket read and a
//! channel push.

use std::net::SocketAddr;

use statum::{machine, state};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::wled::protocol::MAX_DATAGRAM_SIZE;
use crate::wled::RawPacket;

// Receiver errors
#[derive(Debug, thiserror::Error)]
pub enum ReceiverError {
    #[error("Failed to bind UDP socket: {0}")]
    BindError(String),

    #[error("Failed to receive datagram: {0}")]
    ReceiveError(String),

    #[error("Failed to queue packet: {0}")]
    QueueError(String),
}

// Define receiver states using statum's state macro
#[state]
#[derive(Debug, Clone)]
pub enum ReceiverState {
    Binding,
    Receiving,
}

#[machine]
#[derive(Debug)]
pub struct PacketReceiver<S: ReceiverState> {
    // Bound UDP socket
    socket: UdpSocket,

    // Channel into the update processor
    packet_sender: mpsc::Sender<RawPacket>,
}

// Implementation of methods available in all states
impl<S: ReceiverState> PacketReceiver<S> {
    // Actual bound address, useful when listening on port 0
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

// Implementation for Binding state
impl PacketReceiver<Binding> {
    /// Bind the listen socket. A bind failure is fatal for the whole process
    /// and is reported to the caller before any task starts.
    pub async fn create(
        listen_addr: SocketAddr,
        packet_sender: mpsc::Sender<RawPacket>,
    ) -> Result<Self, ReceiverError> {
        info!("Binding UDP socket on {}", listen_addr);
        let socket = match UdpSocket::bind(listen_addr).await {
            Ok(socket) => socket,
            Err(e) => {
                error!("Failed to bind {}: {}", listen_addr, e);
                return Err(ReceiverError::BindError(e.to_string()));
            }
        };

        Ok(Self::new(socket, packet_sender))
    }

    // Transition to the Receiving state
    pub fn initialize(self) -> PacketReceiver<Receiving> {
        info!("UDP socket bound, transitioning to Receiving state");
        self.transition()
    }
}

// Implementation for Receiver in Receiving state
impl PacketReceiver<Receiving> {
    /// Receive datagrams until the socket or the queue dies.
    ///
    /// A full queue drops the packet (the protocol is lossy anyway), a closed
    /// queue or an unrecoverable socket error ends the loop with an error so
    /// the failure is surfaced rather than swallowed.
    pub async fn run_receive_loop(&mut self) -> Result<(), ReceiverError> {
        info!("Starting UDP receive loop");
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];

        loop {
            let (len, source) = match self.socket.recv_from(&mut buf).await {
                Ok(received) => received,
                Err(e) => {
                    error!("Unrecoverable socket error: {}", e);
                    return Err(ReceiverError::ReceiveError(e.to_string()));
                }
            };
            debug!("Received {} bytes from {}", len, source);

            let packet = RawPacket {
                data: buf[..len].to_vec(),
                source: Some(source.ip()),
            };
            match self.packet_sender.try_send(packet) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!("Packet queue full, dropping datagram from {}", source);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    return Err(ReceiverError::QueueError("packet queue closed".to_string()));
                }
            }
        }
    }
}

// Public interface for spawning the receive task
pub struct ReceiverHandle {}

impl ReceiverHandle {
    /// Bind the socket and spawn the receive loop as a tokio task.
    ///
    /// Binding happens before the task is spawned so startup fails fast when
    /// the port is taken. The task itself runs until process termination.
    pub async fn spawn(
        listen_addr: SocketAddr,
        packet_sender: mpsc::Sender<RawPacket>,
    ) -> Result<Self, ReceiverError> {
        let receiver = PacketReceiver::create(listen_addr, packet_sender).await?;

        tokio::spawn(async move {
            let mut receiving = receiver.initialize();
            if let Err(e) = receiving.run_receive_loop().await {
                error!("Receive task terminated: {}", e);
            }
        });

        info!("UDP receiver started on {}", listen_addr);
        Ok(Self {})
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn received_datagrams_land_in_the_queue() {
        let (packet_sender, mut packet_receiver) = mpsc::channel(16);
        let receiver = PacketReceiver::create("127.0.0.1:0".parse().unwrap(), packet_sender)
            .await
            .expect("bind on an ephemeral port");
        let addr = receiver.local_addr().unwrap();

        tokio::spawn(async move {
            let mut receiving = receiver.initialize();
            let _ = receiving.run_receive_loop().await;
        });

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        sender.send_to(&[0x02, 0xFF, 1, 2, 3], addr).await.unwrap();

        let packet = tokio::time::timeout(
            std::time::Duration::from_secs(2),
            packet_receiver.recv(),
        )
        .await
        .expect("datagram within two seconds")
        .expect("queue still open");

        assert_eq!(packet.data, vec![0x02, 0xFF, 1, 2, 3]);
        assert!(packet.source.is_some());
    }

    #[tokio::test]
    async fn bind_failure_is_fatal_before_spawn() {
        let taken = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = taken.local_addr().unwrap();

        let (packet_sender, _packet_receiver) = mpsc::channel(16);
        let result = ReceiverHandle::spawn(addr, packet_sender).await;
        assert!(matches!(result, Err(ReceiverError::BindError(_))));
    }
}
