use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;
use tokio::{io::AsyncWriteExt, net::tcp::OwnedWriteHalf};
use uuid::Uuid;

pub type Sockets = Arc<DashMap<Uuid, Arc<Connection>>>;

/// The write half of a client connection plus what is still owed to it.
///
/// A connection is forgotten once the peer stopped sending and every request
/// it made has been answered, so a client that half-closes still gets its
/// results and one that disconnects early leaves nothing behind.
#[derive(Debug)]
pub struct Connection {
    writer: tokio::sync::Mutex<OwnedWriteHalf>,
    state: Mutex<ConnectionState>,
}

#[derive(Debug)]
struct ConnectionState {
    pending: usize,
    reading: bool,
}

impl ConnectionState {
    fn done(&self) -> bool {
        !self.reading && self.pending == 0
    }
}

impl Connection {
    pub fn new(writer: OwnedWriteHalf) -> Self {
        Self {
            writer: tokio::sync::Mutex::new(writer),
            state: Mutex::new(ConnectionState {
                pending: 0,
                reading: true,
            }),
        }
    }

    pub async fn write_line(&self, line: &str) -> std::io::Result<()> {
        let mut writer = self.writer.lock().await;
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await
    }

    pub fn request_received(&self) {
        self.state().pending += 1;
    }

    /// Returns `true` when this was the last thing owed to a peer that
    /// stopped sending.
    pub fn request_answered(&self) -> bool {
        let mut state = self.state();
        state.pending = state.pending.saturating_sub(1);
        state.done()
    }

    /// Returns `true` when nothing is owed to the peer anymore.
    pub fn reading_stopped(&self) -> bool {
        let mut state = self.state();
        state.reading = false;
        state.done()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, ConnectionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
