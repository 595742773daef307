//! CPU-side staging for texture uploads.

use std::borrow::Cow;

use anyhow::{Result, ensure};
use vista_formats::DepthImage;

/// Pixel data laid out for `queue.write_texture`, with rows padded out to
/// wgpu's copy alignment when the source rows are not already aligned.
pub struct RgbaUpload<'a> {
    data: Cow<'a, [u8]>,
    bytes_per_row: u32,
}

impl<'a> RgbaUpload<'a> {
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn bytes_per_row(&self) -> u32 {
        self.bytes_per_row
    }
}

pub fn stage_rgba_upload<'a>(width: u32, height: u32, data: &'a [u8]) -> Result<RgbaUpload<'a>> {
    ensure!(width > 0 && height > 0, "texture has no dimensions");
    let row_bytes = 4usize * width as usize;
    let alignment = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT as usize;
    ensure!(
        data.len() == row_bytes * height as usize,
        "texture buffer ({}) does not match {}x{} RGBA ({})",
        data.len(),
        width,
        height,
        row_bytes * height as usize
    );

    if row_bytes % alignment == 0 {
        return Ok(RgbaUpload {
            data: Cow::Borrowed(data),
            bytes_per_row: row_bytes as u32,
        });
    }

    let padded_row_bytes = row_bytes.div_ceil(alignment) * alignment;
    let mut buffer = vec![0u8; padded_row_bytes * height as usize];
    for row in 0..height as usize {
        let src_offset = row * row_bytes;
        let dst_offset = row * padded_row_bytes;
        buffer[dst_offset..dst_offset + row_bytes]
            .copy_from_slice(&data[src_offset..src_offset + row_bytes]);
    }

    Ok(RgbaUpload {
        data: Cow::Owned(buffer),
        bytes_per_row: padded_row_bytes as u32,
    })
}

/// Expands a normalized depth raster into opaque grayscale RGBA for the
/// depth-image view's quad.
pub fn depth_preview_rgba(depth: &DepthImage) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(depth.gray.len() * 4);
    for &gray in &depth.gray {
        let level = (gray.clamp(0.0, 1.0) * 255.0).round() as u8;
        rgba.extend_from_slice(&[level, level, level, 255]);
    }
    rgba
}

/// Flat-colored stand-in shown when the depth raster failed to decode.
pub fn placeholder_rgba(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    let mut rgba = Vec::with_capacity((width * height * 4) as usize);
    for _ in 0..width * height {
        rgba.extend_from_slice(&[rgb[0], rgb[1], rgb[2], 255]);
    }
    rgba
}

#[cfg(test)]
mod texture_tests {
    use super::*;

    #[test]
    fn aligned_rows_borrow_the_source() {
        // 64 pixels * 4 bytes = 256, already a multiple of the alignment.
        let data = vec![7u8; 64 * 2 * 4];
        let upload = stage_rgba_upload(64, 2, &data).expect("staged");
        assert_eq!(upload.bytes_per_row(), 256);
        assert_eq!(upload.data().len(), data.len());
    }

    #[test]
    fn unaligned_rows_are_padded() {
        let data = vec![9u8; 3 * 2 * 4];
        let upload = stage_rgba_upload(3, 2, &data).expect("staged");
        assert_eq!(
            upload.bytes_per_row() % wgpu::COPY_BYTES_PER_ROW_ALIGNMENT,
            0
        );
        assert_eq!(upload.data()[0], 9);
        // Padding bytes stay zeroed.
        assert_eq!(upload.data()[13], 0);
    }

    #[test]
    fn short_buffers_are_rejected() {
        let data = vec![0u8; 7];
        assert!(stage_rgba_upload(2, 2, &data).is_err());
    }

    #[test]
    fn depth_preview_maps_gray_levels() {
        let depth = DepthImage {
            width: 2,
            height: 1,
            gray: vec![0.0, 1.0],
        };
        let rgba = depth_preview_rgba(&depth);
        assert_eq!(rgba, vec![0, 0, 0, 255, 255, 255, 255, 255]);
    }
}
