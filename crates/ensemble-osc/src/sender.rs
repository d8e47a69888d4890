//! Background UDP sender thread.
//!
//! Callers enqueue pre-encoded packets through a bounded channel; a
//! dedicated thread owns the socket and does the blocking sends. A full
//! queue drops the packet and bumps a counter instead of stalling the
//! caller, so control-surface traffic can never back up into the engine.

use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{bounded, Sender};

/// Packets the queue holds before it starts dropping.
pub const QUEUE_CAPACITY: usize = 1024;

pub(crate) struct OscSender {
    tx: Sender<Vec<u8>>,
    dropped: Arc<AtomicUsize>,
}

impl Clone for OscSender {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            dropped: self.dropped.clone(),
        }
    }
}

impl OscSender {
    /// Spawn the sender thread. The thread exits when every queue handle is
    /// dropped.
    pub(crate) fn spawn(socket: UdpSocket, target: SocketAddr) -> (Self, JoinHandle<()>) {
        let (tx, rx) = bounded::<Vec<u8>>(QUEUE_CAPACITY);
        let dropped = Arc::new(AtomicUsize::new(0));

        let handle = std::thread::Builder::new()
            .name("osc-sender".into())
            .spawn(move || {
                for packet in rx {
                    if let Err(err) = socket.send_to(&packet, target) {
                        tracing::warn!(%target, "OSC send failed: {err}");
                    }
                }
            })
            .expect("spawn osc-sender thread");

        (Self { tx, dropped }, handle)
    }

    /// Enqueue one encoded packet; drops it when the queue is full.
    pub(crate) fn enqueue(&self, packet: Vec<u8>) {
        if self.tx.try_send(packet).is_err() {
            let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            tracing::warn!(total, "OSC queue full, packet dropped");
        }
    }

    /// Packets dropped because the queue was full.
    pub(crate) fn dropped_count(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }
}
