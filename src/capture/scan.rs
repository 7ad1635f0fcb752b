use anyhow::{bail, Context, Result};
use log::info;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::ocr::TextReading;
use crate::{log_info, log_warn};

use super::stability::StabilityLock;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

/// Frames buffered between the camera callback and the loop. The camera
/// produces tens of frames per second; a full buffer drops frames rather
/// than stalling delivery.
pub const FRAME_BUFFER: usize = 8;

/// Feeds recognized frames into `lock` until it fires, the frame source
/// closes, or `cancel_token` is cancelled.
pub async fn scan_loop(
    mut frames: mpsc::Receiver<TextReading>,
    mut lock: StabilityLock,
    cancel_token: CancellationToken,
) {
    let mut frames_seen: u64 = 0;

    loop {
        tokio::select! {
            frame = frames.recv() => {
                let Some(reading) = frame else {
                    log_warn!(
                        "scan loop frame source closed after {} frames without lock",
                        frames_seen
                    );
                    break;
                };
                frames_seen += 1;
                lock.observe(&reading);
                if lock.is_locked() {
                    log_info!(
                        "document text locked after {} frames: {:?}",
                        frames_seen,
                        lock.last_joined_text()
                    );
                    break;
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("scan loop shutting down after {} frames", frames_seen);
                break;
            }
        }
    }
}

/// Owns the scan task for one mounted capture screen.
pub struct ScanController {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl ScanController {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
        }
    }

    /// Spawns a fresh lock and loop; returns the sender the frame pipeline
    /// pushes readings into (use `try_send` from the camera thread).
    ///
    /// Must be called from inside a tokio runtime; otherwise returns an
    /// error and spawns nothing.
    pub fn start_scan<F>(
        &mut self,
        stable_frames: u32,
        on_lock: F,
    ) -> Result<mpsc::Sender<TextReading>>
    where
        F: FnMut(&TextReading) + Send + 'static,
    {
        if self.is_active() {
            bail!("scan already active");
        }

        let Ok(runtime) = Handle::try_current() else {
            bail!("no tokio runtime available for scan");
        };

        let cancel_token = CancellationToken::new();
        let (frames_tx, frames_rx) = mpsc::channel(FRAME_BUFFER);
        let lock = StabilityLock::new(stable_frames, on_lock);

        info!("starting document scan (stable_frames={stable_frames})");
        let handle = runtime.spawn(scan_loop(frames_rx, lock, cancel_token.clone()));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(frames_tx)
    }

    /// True while a scan task is running. A task that already locked counts
    /// as inactive.
    pub fn is_active(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    pub async fn stop_scan(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("scan loop task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }
}

impl Default for ScanController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    };

    #[test]
    fn start_outside_runtime_is_an_error() {
        let mut controller = ScanController::new();
        let err = controller.start_scan(3, |_| {}).unwrap_err();
        assert!(err.to_string().contains("no tokio runtime"));
        assert!(!controller.is_active());
    }

    #[tokio::test]
    async fn loop_exits_after_lock() {
        let fired = Arc::new(AtomicU32::new(0));
        let counter = fired.clone();
        let mut controller = ScanController::new();
        let tx = controller
            .start_scan(2, move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        for _ in 0..3 {
            tx.send(TextReading::from_texts(["D1234567"])).await.unwrap();
        }

        let handle = controller.handle.take().unwrap();
        handle.await.unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!controller.is_active());
    }

    #[tokio::test]
    async fn loop_exits_when_sender_dropped() {
        let (tx, rx) = mpsc::channel(FRAME_BUFFER);
        let lock = StabilityLock::new(3, |_| panic!("must not lock"));
        let task = tokio::spawn(scan_loop(rx, lock, CancellationToken::new()));

        tx.send(TextReading::from_texts(["ABC"])).await.unwrap();
        drop(tx);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn starting_twice_is_rejected_and_stop_is_idempotent() {
        let mut controller = ScanController::new();
        let _tx = controller.start_scan(3, |_| {}).unwrap();
        assert!(controller.is_active());
        assert!(controller.start_scan(3, |_| {}).is_err());

        controller.stop_scan().await.unwrap();
        assert!(!controller.is_active());
        controller.stop_scan().await.unwrap();

        let _tx = controller.start_scan(3, |_| {}).unwrap();
        controller.stop_scan().await.unwrap();
    }
}
