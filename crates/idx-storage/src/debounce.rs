//! Asynchronous fsync debouncer (§5): batches commit requests for
//! `SyncMode::AsyncSync` volumes so a burst of commits pays for one
//! `fsync` instead of one per commit.

use std::{
    collections::HashSet,
    fs::File,
    path::PathBuf,
    thread::JoinHandle,
    time::Duration,
};

use crossbeam_channel::{Receiver, Sender, bounded};

enum Request {
    Sync(PathBuf),
    Drain,
}

/// Schedules deduplicated fsync calls on a background worker thread.
pub struct FsyncDebouncer {
    sender: Sender<Request>,
    handle: Option<JoinHandle<()>>,
}

impl FsyncDebouncer {
    /// Spawns the debouncer's background worker. `window` bounds how long
    /// pending requests are batched before being flushed.
    pub fn spawn(window: Duration) -> Self {
        let (sender, receiver): (Sender<Request>, Receiver<Request>) = bounded(1024);

        let handle = std::thread::spawn(move || {
            Self::run(&receiver, window);
        });

        Self { sender, handle: Some(handle) }
    }

    fn run(receiver: &Receiver<Request>, window: Duration) {
        let mut pending: HashSet<PathBuf> = HashSet::new();
        loop {
            let first = match receiver.recv() {
                Ok(request) => request,
                Err(_) => return,
            };
            match first {
                Request::Drain => return,
                Request::Sync(path) => {
                    pending.insert(path);
                }
            }

            let deadline = crossbeam_channel::after(window);
            loop {
                crossbeam_channel::select! {
                    recv(receiver) -> msg => match msg {
                        Ok(Request::Sync(path)) => { pending.insert(path); }
                        Ok(Request::Drain) | Err(_) => {
                            Self::flush(&mut pending);
                            return;
                        }
                    },
                    recv(deadline) -> _ => break,
                }
            }
            Self::flush(&mut pending);
        }
    }

    fn flush(pending: &mut HashSet<PathBuf>) {
        for path in pending.drain() {
            if let Ok(file) = File::open(&path) {
                if let Err(error) = file.sync_all() {
                    tracing::warn!(?path, %error, "debounced fsync failed");
                }
            }
        }
    }

    /// Schedules `path` for a future fsync.
    pub fn schedule(&self, path: PathBuf) {
        let _ = self.sender.send(Request::Sync(path));
    }

    /// Drains pending work and stops accepting new submissions, blocking
    /// until the worker thread exits.
    pub fn finish(mut self) {
        let _ = self.sender.send(Request::Drain);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for FsyncDebouncer {
    fn drop(&mut self) {
        let _ = self.sender.send(Request::Drain);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn schedules_and_finishes_without_panicking() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("volume.0");
        std::fs::write(&path, b"data").unwrap();

        let debouncer = FsyncDebouncer::spawn(Duration::from_millis(20));
        debouncer.schedule(path.clone());
        debouncer.schedule(path);
        debouncer.finish();
    }
}
