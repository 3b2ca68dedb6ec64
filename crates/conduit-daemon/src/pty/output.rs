use std::collections::VecDeque;
use std::io::Read;
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tracing::{debug, error};

/// Ring buffer for recent PTY output (scrollback replay on attach).
pub struct ScrollbackBuffer {
    buffer: VecDeque<u8>,
    capacity: usize,
}

impl ScrollbackBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append bytes to the ring buffer, evicting oldest data if full.
    pub fn push(&mut self, data: &[u8]) {
        for &byte in data {
            if self.buffer.len() >= self.capacity {
                self.buffer.pop_front();
            }
            self.buffer.push_back(byte);
        }
    }

    pub fn contents(&self) -> Vec<u8> {
        self.buffer.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

/// Holds the broadcast sender for live PTY output distribution and the
/// scrollback buffer for replay on attach.
pub struct PtyOutputBroadcaster {
    tx: broadcast::Sender<Vec<u8>>,
    scrollback: ScrollbackBuffer,
}

impl PtyOutputBroadcaster {
    pub fn new(scrollback_capacity: usize, broadcast_capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(broadcast_capacity);
        Self {
            tx,
            scrollback: ScrollbackBuffer::new(scrollback_capacity),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Vec<u8>> {
        self.tx.subscribe()
    }

    pub fn scrollback_contents(&self) -> Vec<u8> {
        self.scrollback.contents()
    }

    /// Feed bytes into the broadcaster: stores in scrollback and sends to
    /// subscribers.
    pub fn feed(&mut self, data: &[u8]) {
        self.scrollback.push(data);
        // No receivers means no one is attached; that's fine.
        let _ = self.tx.send(data.to_vec());
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Notification that a PTY reader has exited (child process ended or read
/// error), carrying the pane it was reading for.
pub struct PtyExitEvent {
    pub pane: String,
}

/// Spawn a blocking task that reads from a PTY reader and feeds output to
/// the broadcaster. Exits on EOF (child exited) or read error, notifying
/// `exit_tx` either way.
pub fn spawn_pty_reader(
    pane: String,
    mut reader: Box<dyn Read + Send>,
    output_tx: broadcast::Sender<Vec<u8>>,
    scrollback: Arc<Mutex<ScrollbackBuffer>>,
    exit_tx: Option<tokio::sync::mpsc::UnboundedSender<PtyExitEvent>>,
) -> tokio::task::JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        let mut buf = [0u8; 4096];
        loop {
            match reader.read(&mut buf) {
                Ok(0) => {
                    debug!(event = "daemon.pty.reader_eof", pane = pane);
                    break;
                }
                Ok(n) => {
                    let data = buf[..n].to_vec();
                    if let Ok(mut sb) = scrollback.lock() {
                        sb.push(&data);
                    }
                    let _ = output_tx.send(data);
                }
                Err(e) => {
                    error!(event = "daemon.pty.reader_error", pane = pane, error = %e);
                    break;
                }
            }
        }
        if let Some(tx) = exit_tx {
            let _ = tx.send(PtyExitEvent { pane: pane.clone() });
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scrollback_buffer_basic() {
        let mut buf = ScrollbackBuffer::new(10);
        assert!(buf.is_empty());

        buf.push(b"hello");
        assert_eq!(buf.len(), 5);
        assert_eq!(buf.contents(), b"hello");
    }

    #[test]
    fn test_scrollback_buffer_overflow() {
        let mut buf = ScrollbackBuffer::new(5);
        buf.push(b"hello world");
        assert_eq!(buf.len(), 5);
        assert_eq!(buf.contents(), b"world");
    }

    #[test]
    fn test_scrollback_buffer_exact_capacity() {
        let mut buf = ScrollbackBuffer::new(5);
        buf.push(b"12345");
        assert_eq!(buf.len(), 5);
        assert_eq!(buf.contents(), b"12345");
    }

    #[test]
    fn test_scrollback_buffer_incremental_push() {
        let mut buf = ScrollbackBuffer::new(5);
        buf.push(b"abc");
        buf.push(b"def");
        assert_eq!(buf.len(), 5);
        assert_eq!(buf.contents(), b"bcdef");
    }

    #[test]
    fn test_scrollback_buffer_clear() {
        let mut buf = ScrollbackBuffer::new(10);
        buf.push(b"test");
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.len(), 0);
    }

    #[test]
    fn test_broadcaster_basic() {
        let broadcaster = PtyOutputBroadcaster::new(1024, 16);
        assert_eq!(broadcaster.receiver_count(), 0);
        assert!(broadcaster.scrollback_contents().is_empty());
    }

    #[test]
    fn test_broadcaster_feed_and_scrollback() {
        let mut broadcaster = PtyOutputBroadcaster::new(1024, 16);
        broadcaster.feed(b"hello ");
        broadcaster.feed(b"world");
        assert_eq!(broadcaster.scrollback_contents(), b"hello world");
    }

    #[test]
    fn test_broadcaster_subscribe_and_receive() {
        let mut broadcaster = PtyOutputBroadcaster::new(1024, 16);
        let mut rx = broadcaster.subscribe();
        assert_eq!(broadcaster.receiver_count(), 1);

        broadcaster.feed(b"test data");

        let received = rx.try_recv().unwrap();
        assert_eq!(received, b"test data");
    }

    #[test]
    fn test_broadcaster_multiple_subscribers() {
        let mut broadcaster = PtyOutputBroadcaster::new(1024, 16);
        let mut rx1 = broadcaster.subscribe();
        let mut rx2 = broadcaster.subscribe();
        assert_eq!(broadcaster.receiver_count(), 2);

        broadcaster.feed(b"shared data");

        assert_eq!(rx1.try_recv().unwrap(), b"shared data");
        assert_eq!(rx2.try_recv().unwrap(), b"shared data");
    }

    #[test]
    fn test_broadcaster_no_receivers_ok() {
        let mut broadcaster = PtyOutputBroadcaster::new(1024, 16);
        broadcaster.feed(b"no one listening");
        assert_eq!(broadcaster.scrollback_contents(), b"no one listening");
    }
}
