const SOI: [u8; 2] = [0xFF, 0xD8];
const EOI: [u8; 2] = [0xFF, 0xD9];
/// Upper bound for a single buffered image.
const DEFAULT_MAX_PENDING: usize = 4 * 1024 * 1024;

/// Splits a raw MJPEG byte stream into individual JPEG images.
///
/// An image spans from a start-of-image marker to the first end-of-image marker after it.
/// Bytes before a start marker are discarded. An image that grows past the pending limit
/// without an end marker is dropped.
#[derive(Debug)]
pub struct MjpegSplitter {
    buf: Vec<u8>,
    max_pending: usize,
}

impl MjpegSplitter {
    pub fn new() -> Self {
        Self::with_max_pending(DEFAULT_MAX_PENDING)
    }

    pub fn with_max_pending(max_pending: usize) -> Self {
        Self {
            buf: Vec::new(),
            max_pending,
        }
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Number of buffered bytes that do not form a complete image yet.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    pub fn next_jpeg(&mut self) -> Option<Vec<u8>> {
        loop {
            let Some(start) = find(&self.buf, &SOI) else {
                // Keep a trailing 0xFF, it may be the first half of a marker.
                let keep = usize::from(self.buf.last() == Some(&0xFF));
                self.buf.drain(..self.buf.len() - keep);
                return None;
            };
            self.buf.drain(..start);

            if let Some(end) = find(&self.buf[SOI.len()..], &EOI) {
                let end = end + SOI.len() + EOI.len();
                return Some(self.buf.drain(..end).collect());
            }
            if self.buf.len() <= self.max_pending {
                return None;
            }
            // Unterminated image, skip to the next start marker
            let skip = find(&self.buf[SOI.len()..], &SOI)
                .map(|i| i + SOI.len())
                .unwrap_or(self.buf.len());
            tracing::warn!("Dropping {} bytes of an unterminated JPEG", skip);
            self.buf.drain(..skip);
        }
    }
}

impl Default for MjpegSplitter {
    fn default() -> Self {
        Self::new()
    }
}

fn find(haystack: &[u8], marker: &[u8; 2]) -> Option<usize> {
    haystack.windows(2).position(|w| w == marker)
}
