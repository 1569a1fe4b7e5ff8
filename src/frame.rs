//! Captured camera frames.
//!
//! A frame is packed 8-bit RGB.  Pixel data sits behind an `Arc` so the
//! same capture can be classified, saved, and held for a challenge
//! without copying.

use std::sync::Arc;

/// SHA-256 of the pixel data; identifies a capture by content.
pub type ContentHash = [u8; 32];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub captured_at_ms: u64,
    pixels: Arc<[u8]>,
}

impl Frame {
    /// Build from packed RGB.  Returns `None` if the buffer length does
    /// not match the dimensions.
    pub fn from_rgb(width: u32, height: u32, captured_at_ms: u64, pixels: Vec<u8>) -> Option<Self> {
        if pixels.len() != width as usize * height as usize * 3 {
            return None;
        }
        Some(Self {
            width,
            height,
            captured_at_ms,
            pixels: pixels.into(),
        })
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Horizontally mirrored copy (selfie-view cameras).
    pub fn mirrored(&self) -> Self {
        let row_len = self.width as usize * 3;
        let mut out = Vec::with_capacity(self.pixels.len());
        for row in self.pixels.chunks_exact(row_len.max(1)) {
            for px in row.chunks_exact(3).rev() {
                out.extend_from_slice(px);
            }
        }
        Self {
            width: self.width,
            height: self.height,
            captured_at_ms: self.captured_at_ms,
            pixels: out.into(),
        }
    }

    pub fn content_hash(&self) -> ContentHash {
        hmac_sha256::Hash::hash(&self.pixels)
    }

    /// Binary PPM (P6) encoding.
    pub fn to_ppm(&self) -> Vec<u8> {
        let header = format!("P6\n{} {}\n255\n", self.width, self.height);
        let mut out = Vec::with_capacity(header.len() + self.pixels.len());
        out.extend_from_slice(header.as_bytes());
        out.extend_from_slice(&self.pixels);
        out
    }
}
