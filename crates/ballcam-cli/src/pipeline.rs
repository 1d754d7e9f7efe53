use std::time::Instant;

use anyhow::{Context, Result};
use ballcam_camera::FrameSource;
use ballcam_core::TrackingUpdate;
use ballcam_vision::{FrameStore, Tracker};
use tokio::sync::{broadcast, watch};

const CLOCK_FORMAT: &str = "%H:%M:%S";

/// Feed frames from `source` through the tracker until the source ends or a shutdown
/// signal is received.
///
/// Every processed frame, with its overlay and a wall clock stamp, is stored in `frames`
/// and the resulting update is published on `update_tx`.
pub async fn run<S: FrameSource>(
    mut source: S,
    mut tracker: Tracker,
    frames: FrameStore,
    update_tx: watch::Sender<Option<TrackingUpdate>>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<()> {
    let start = Instant::now();
    let mut frame_count: u64 = 0;
    loop {
        let frame = tokio::select! {
            _ = shutdown_rx.recv() => {
                tracing::debug!("Pipeline received shutdown signal");
                break;
            }
            frame = source.next_frame() => frame?,
        };
        let Some(frame) = frame else {
            tracing::warn!("Frame source ended after {} frames", frame_count);
            break;
        };

        let timestamp = start.elapsed().as_secs_f64();
        // Detection is CPU bound, keep it off the async workers
        let (returned, frame, update) = tokio::task::spawn_blocking(move || {
            let (mut frame, update) = tracker.process_frame(frame, timestamp);
            let clock = chrono::Local::now().format(CLOCK_FORMAT).to_string();
            tracker.overlay().draw_clock(&mut frame, &clock);
            (tracker, frame, update)
        })
        .await
        .context("Frame processing task failed")?;
        tracker = returned;

        frames.set_frame(frame);
        update_tx.send_replace(Some(update));

        frame_count += 1;
        if frame_count % 300 == 0 {
            tracing::debug!("Processed {} frames", frame_count);
        }
    }

    source.close().await
}
