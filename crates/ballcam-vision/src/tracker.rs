use std::sync::Arc;

use arc_swap::ArcSwap;
use ballcam_core::{PositionSample, TrackerSettings, TrackingReport, TrackingState, TrackingUpdate};

use crate::{BallDetector, Frame, MotionEstimator, Overlay, PositionHistory};

/// Read access to the latest [`TrackingState`]. Cheap to clone and safe to use from any
/// thread while the [`Tracker`] keeps updating it.
#[derive(Clone)]
pub struct TrackingHandle {
    state: Arc<ArcSwap<TrackingState>>,
}

impl TrackingHandle {
    fn new() -> Self {
        Self {
            state: Arc::new(ArcSwap::from_pointee(TrackingState::default())),
        }
    }

    /// The latest estimate, `{0, 0}` until the first one is made.
    pub fn snapshot(&self) -> TrackingState {
        **self.state.load()
    }

    /// The latest estimate rounded for reporting.
    pub fn report(&self) -> TrackingReport {
        self.snapshot().report()
    }

    fn publish(&self, state: TrackingState) {
        self.state.store(Arc::new(state));
    }
}

/// Tracks the ball across frames.
///
/// The tracker is the only writer of the position history and the tracking state; it is
/// meant to be driven by a single frame pipeline. Readers use a [`TrackingHandle`].
pub struct Tracker {
    detector: BallDetector,
    history: PositionHistory,
    estimator: MotionEstimator,
    handle: TrackingHandle,
    focal_length_px: f64,
    ball_diameter_m: f64,
}

impl Tracker {
    pub fn new(settings: &TrackerSettings) -> Self {
        Self::with_detector(settings, BallDetector::new(settings))
    }

    pub fn with_detector(settings: &TrackerSettings, detector: BallDetector) -> Self {
        Self {
            detector,
            history: PositionHistory::new(settings.history_capacity),
            estimator: MotionEstimator::new(settings.ball_diameter_m),
            handle: TrackingHandle::new(),
            focal_length_px: settings.focal_length_px,
            ball_diameter_m: settings.ball_diameter_m,
        }
    }

    pub fn handle(&self) -> TrackingHandle {
        self.handle.clone()
    }

    pub fn history(&self) -> &PositionHistory {
        &self.history
    }

    pub fn overlay(&self) -> &Overlay {
        self.detector.overlay()
    }

    /// Run detection on a frame taken at `timestamp` (seconds) and update the estimate.
    ///
    /// The returned frame carries the overlay, drawn with the estimate from before this
    /// frame.
    pub fn process_frame(&mut self, frame: Frame, timestamp: f64) -> (Frame, TrackingUpdate) {
        let last_state = self.handle.snapshot();
        let (frame, detection) = self.detector.detect(frame, &last_state);

        let state = match &detection {
            Some(detection) => self.record_position(PositionSample {
                timestamp,
                position: detection.center,
            }),
            None => last_state,
        };

        let update = TrackingUpdate {
            timestamp,
            report: state.report(),
            detection,
            distance_m: detection
                .and_then(|d| d.distance_m(self.focal_length_px, self.ball_diameter_m)),
        };
        (frame, update)
    }

    /// Add a position to the history and recompute the estimate.
    pub fn record_position(&mut self, sample: PositionSample) -> TrackingState {
        self.history.push(sample);
        self.update_from_history()
    }

    /// Recompute the estimate from the history. With fewer than two samples the previous
    /// estimate is kept.
    pub fn update_from_history(&mut self) -> TrackingState {
        match self.estimator.estimate(&self.history) {
            Some(state) => {
                self.handle.publish(state);
                state
            }
            None => self.handle.snapshot(),
        }
    }
}
