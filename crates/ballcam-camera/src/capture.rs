use std::process::Stdio;

use anyhow::{Context, Result};
use ballcam_core::CameraSettings;
use image::{ImageFormat, RgbImage};
use tokio::{
    io::AsyncReadExt,
    process::{Child, ChildStdout, Command},
};

use crate::{FrameSource, MjpegSplitter};

/// Decode a single JPEG image.
pub fn decode_jpeg(bytes: &[u8]) -> Result<RgbImage> {
    let image = image::load_from_memory_with_format(bytes, ImageFormat::Jpeg)
        .context("Failed to decode JPEG frame")?;
    Ok(image.to_rgb8())
}

/// Frames read from a capture process that writes an MJPEG stream to stdout.
pub struct CameraCapture {
    child: Child,
    stdout: ChildStdout,
    splitter: MjpegSplitter,
    chunk: Vec<u8>,
}

impl CameraCapture {
    /// Start the camera program described by the settings.
    pub fn spawn(settings: &CameraSettings) -> Result<Self> {
        Self::spawn_command(&settings.program, &settings.args(), settings.read_chunk_size)
    }

    /// Start `program` with `args`, reading its stdout in chunks of `chunk_size` bytes.
    pub fn spawn_command(program: &str, args: &[String], chunk_size: usize) -> Result<Self> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to start capture process {}", program))?;
        let stdout = child
            .stdout
            .take()
            .context("Capture process has no stdout")?;
        tracing::info!("Started capture process {} (pid {:?})", program, child.id());

        Ok(Self {
            child,
            stdout,
            splitter: MjpegSplitter::new(),
            chunk: vec![0u8; chunk_size.max(1)],
        })
    }

    /// The next complete JPEG from the stream, `None` once the process closed its stdout.
    pub async fn next_jpeg(&mut self) -> Result<Option<Vec<u8>>> {
        loop {
            if let Some(jpeg) = self.splitter.next_jpeg() {
                return Ok(Some(jpeg));
            }
            let n = self
                .stdout
                .read(&mut self.chunk)
                .await
                .context("Failed to read from capture process")?;
            if n == 0 {
                return Ok(None);
            }
            self.splitter.push(&self.chunk[..n]);
        }
    }
}

impl FrameSource for CameraCapture {
    async fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        while let Some(jpeg) = self.next_jpeg().await? {
            match decode_jpeg(&jpeg) {
                Ok(frame) => return Ok(Some(frame)),
                Err(err) => tracing::debug!("Dropping frame ({} bytes): {:#}", jpeg.len(), err),
            }
        }
        Ok(None)
    }

    /// Stop the capture process.
    async fn close(mut self) -> Result<()> {
        tracing::info!("Stopping capture process");
        if self.child.try_wait()?.is_none() {
            self.child
                .kill()
                .await
                .context("Failed to kill capture process")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use std::io::{Cursor, Write};

    fn encode_jpeg(color: Rgb<u8>) -> Vec<u8> {
        let frame = RgbImage::from_pixel(32, 24, color);
        let mut bytes = Cursor::new(Vec::new());
        frame.write_to(&mut bytes, ImageFormat::Jpeg).unwrap();
        bytes.into_inner()
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_jpeg(&[0xFF, 0xD8, 0, 0, 0xFF, 0xD9]).is_err());
        let frame = decode_jpeg(&encode_jpeg(Rgb([200, 10, 10]))).unwrap();
        assert_eq!(frame.dimensions(), (32, 24));
    }

    #[tokio::test]
    async fn test_reads_frames_from_process() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0x00, 0x11]).unwrap();
        file.write_all(&encode_jpeg(Rgb([200, 10, 10]))).unwrap();
        // Not a decodable image, skipped.
        file.write_all(&[0xFF, 0xD8, 1, 2, 0xFF, 0xD9]).unwrap();
        file.write_all(&encode_jpeg(Rgb([10, 10, 200]))).unwrap();
        file.flush().unwrap();

        let path = file.path().to_string_lossy().to_string();
        let mut capture = CameraCapture::spawn_command("cat", &[path], 64).unwrap();

        let first = capture.next_frame().await.unwrap().unwrap();
        assert_eq!(first.dimensions(), (32, 24));
        assert!(first.get_pixel(16, 12).0[0] > 150);

        let second = capture.next_frame().await.unwrap().unwrap();
        assert!(second.get_pixel(16, 12).0[2] > 150);

        assert!(capture.next_frame().await.unwrap().is_none());
        capture.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_program() {
        assert!(CameraCapture::spawn_command("ballcam-no-such-program", &[], 64).is_err());
    }
}
