use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use ballcam_core::{EscChannel, Hsv, ThrottleCmd, TrackingReport, TrackingUpdate};
use ballcam_vision::{Frame, SampleError};
use futures::StreamExt;
use image::codecs::jpeg::JpegEncoder;
use serde::Deserialize;
use tokio::sync::watch;

use crate::{server::ServerState, ApiError};

const JPEG_QUALITY: u8 = 80;

#[derive(Debug, Deserialize)]
pub struct SamplePixelQuery {
    x: i64,
    y: i64,
}

#[derive(Debug, Deserialize)]
pub struct ThrottleQuery {
    esc: u8,
    value: u32,
}

pub async fn ball_stats(state: State<Arc<ServerState>>) -> Json<TrackingReport> {
    Json(state.tracking.report())
}

pub async fn sample_pixel(
    state: State<Arc<ServerState>>,
    Query(query): Query<SamplePixelQuery>,
) -> Result<Json<Hsv>, ApiError> {
    let hsv = state.frames.sample(query.x, query.y)?;
    Ok(Json(hsv))
}

pub async fn last_sampled_hsv(state: State<Arc<ServerState>>) -> Json<Hsv> {
    Json(state.frames.last_sampled())
}

pub async fn frame_jpeg(state: State<Arc<ServerState>>) -> Result<Response, ApiError> {
    let frame = state
        .frames
        .last_frame()
        .ok_or(SampleError::NoFrameAvailable)?;
    let bytes = encode_jpeg(&frame)?;
    Ok(([(header::CONTENT_TYPE, "image/jpeg")], bytes).into_response())
}

fn encode_jpeg(frame: &Frame) -> anyhow::Result<Vec<u8>> {
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY).encode_image(frame)?;
    Ok(bytes)
}

pub async fn set_throttle(
    state: State<Arc<ServerState>>,
    Query(query): Query<ThrottleQuery>,
) -> Result<Json<ThrottleCmd>, ApiError> {
    let channel = EscChannel::try_from(query.esc).map_err(ApiError::BadRequest)?;
    let cmd = ThrottleCmd::new(channel, query.value);
    state.esc.send(cmd).await?;
    Ok(Json(cmd))
}

pub async fn websocket(ws: WebSocketUpgrade, state: State<Arc<ServerState>>) -> impl IntoResponse {
    let rx = state.update_rx.clone();
    ws.on_upgrade(|socket| handle_ws_conn(rx, socket))
}

async fn handle_ws_conn(mut rx: watch::Receiver<Option<TrackingUpdate>>, mut socket: WebSocket) {
    loop {
        tokio::select! {
            msg = socket.next() => match msg {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                if let Err(err) = handle_send_ws_update(&mut rx, &mut socket).await {
                    tracing::error!("Failed to send update: {}", err);
                    break;
                }
            }
        }
    }

    if let Err(err) = socket.close().await {
        tracing::debug!("Failed to close websocket: {}", err);
    }
}

async fn handle_send_ws_update(
    rx: &mut watch::Receiver<Option<TrackingUpdate>>,
    socket: &mut WebSocket,
) -> anyhow::Result<()> {
    let text_data = rx
        .borrow_and_update()
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;
    if let Some(text_data) = text_data {
        socket.send(Message::Text(text_data)).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        Router,
    };
    use ballcam_core::{EscSettings, PositionSample, TrackerSettings};
    use ballcam_esc::{EscBackend, EscClient};
    use ballcam_vision::{FrameStore, Tracker};
    use image::Rgb;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::router;

    struct Fixture {
        app: Router,
        tracker: Tracker,
        frames: FrameStore,
        _update_tx: watch::Sender<Option<TrackingUpdate>>,
    }

    async fn fixture() -> Fixture {
        let tracker = Tracker::new(&TrackerSettings::default());
        let frames = FrameStore::new();
        let esc = EscClient::connect(EscBackend::DryRun, &EscSettings::default())
            .await
            .unwrap();
        let (update_tx, update_rx) = watch::channel(None);
        let app = router(ServerState {
            tracking: tracker.handle(),
            frames: frames.clone(),
            esc,
            update_rx,
        });
        Fixture {
            app,
            tracker,
            frames,
            _update_tx: update_tx,
        }
    }

    async fn call(app: &Router, method: &str, uri: &str) -> (StatusCode, Vec<u8>) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    async fn call_json(app: &Router, method: &str, uri: &str) -> (StatusCode, Value) {
        let (status, body) = call(app, method, uri).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_ball_stats_before_any_detection() {
        let fx = fixture().await;
        let (status, body) = call_json(&fx.app, "GET", "/api/ball_stats").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["speed_mps"].as_f64(), Some(0.0));
        assert_eq!(body["angle_deg"].as_f64(), Some(0.0));
    }

    #[tokio::test]
    async fn test_ball_stats_are_rounded() {
        let mut fx = fixture().await;
        fx.tracker
            .record_position(PositionSample::new(0.0, 0.0, 0.0));
        fx.tracker
            .record_position(PositionSample::new(1.0, 3.0, 4.0));

        let (status, body) = call_json(&fx.app, "GET", "/api/ball_stats").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["speed_mps"].as_f64(), Some(0.07));
        assert_eq!(body["angle_deg"].as_f64(), Some(-53.13));
    }

    #[tokio::test]
    async fn test_sample_pixel() {
        let fx = fixture().await;
        let (status, body) = call_json(&fx.app, "GET", "/api/sample_pixel?x=1&y=1").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "No frame available");

        let mut frame = Frame::new(4, 3);
        frame.put_pixel(2, 1, Rgb([0, 255, 0]));
        fx.frames.set_frame(frame);

        let (status, body) = call_json(&fx.app, "GET", "/api/sample_pixel?x=2&y=1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({"h": 60, "s": 255, "v": 255}));

        let (status, body) = call_json(&fx.app, "GET", "/api/last_sampled_hsv").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({"h": 60, "s": 255, "v": 255}));

        let (status, body) = call_json(&fx.app, "GET", "/api/sample_pixel?x=4&y=1").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("outside"));
    }

    #[tokio::test]
    async fn test_sample_pixel_requires_coordinates() {
        let fx = fixture().await;
        let (status, _) = call(&fx.app, "GET", "/api/sample_pixel?x=1").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_set_throttle() {
        let fx = fixture().await;
        let (status, body) = call_json(&fx.app, "POST", "/set_throttle/?esc=1&value=1500").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({"esc": 1, "pulse": 1500}));

        let (status, _) = call(&fx.app, "POST", "/set_throttle?esc=2&value=0").await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = call(&fx.app, "POST", "/set_throttle/?esc=3&value=1500").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = call_json(&fx.app, "POST", "/set_throttle/?esc=1&value=2500").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("2500"));
    }

    #[tokio::test]
    async fn test_frame_snapshot() {
        let fx = fixture().await;
        let (status, _) = call(&fx.app, "GET", "/api/frame.jpg").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        fx.frames.set_frame(Frame::from_pixel(64, 48, Rgb([10, 200, 10])));
        let (status, body) = call(&fx.app, "GET", "/api/frame.jpg").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(&body[..2], &[0xFF, 0xD8]);
    }
}
