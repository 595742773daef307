//! Depth/color image pairs and pinhole point-cloud reconstruction.
//!
//! Depth arrives as a grayscale raster in the red channel; color is an
//! ordinary RGB raster aligned to the same grid. Reconstruction back-projects
//! every retained pixel through a pinhole model whose focal length follows
//! from the vertical field of view.

use std::path::Path;

use image::RgbaImage;

use crate::FormatError;

/// Upper bound on pixels fed to reconstruction. Pairs above it are
/// downsampled uniformly before any point is emitted.
pub const PIXEL_BUDGET: u32 = 262_144;

/// Grayscale values above this are treated as background and skipped.
pub const DEPTH_CUTOFF: f32 = 0.99;

/// Scale from normalized grayscale to world depth units.
pub const DEPTH_RANGE: f32 = 255.0 * 0.5;

/// Vertical field of view used when the caller has no preference.
pub const DEFAULT_FIELD_OF_VIEW: f32 = 75.0;

/// Normalized depth raster. `gray` holds the red channel mapped to [0, 1],
/// row-major from the top-left pixel.
#[derive(Debug, Clone)]
pub struct DepthImage {
    pub width: u32,
    pub height: u32,
    pub gray: Vec<f32>,
}

/// Normalized color raster aligned index-for-index with a [`DepthImage`].
#[derive(Debug, Clone)]
pub struct ColorImage {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<[f32; 3]>,
}

/// A depth/color pair sharing one pixel grid, ready for reconstruction.
#[derive(Debug, Clone)]
pub struct ImagePair {
    pub depth: DepthImage,
    pub color: ColorImage,
}

/// Reconstruction output. Positions and colors are parallel arrays and are
/// only ever replaced wholesale, never patched in place.
#[derive(Debug, Clone, Default)]
pub struct CloudBuffers {
    pub positions: Vec<[f32; 3]>,
    pub colors: Vec<[f32; 3]>,
}

impl CloudBuffers {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

impl DepthImage {
    fn from_rgba(rgba: &RgbaImage) -> Self {
        let gray = rgba
            .pixels()
            .map(|pixel| f32::from(pixel.0[0]) / 255.0)
            .collect();
        DepthImage {
            width: rgba.width(),
            height: rgba.height(),
            gray,
        }
    }

    fn resampled(&self, width: u32, height: u32) -> Self {
        let gray = resample_indices(self.width, self.height, width, height)
            .map(|index| self.gray[index])
            .collect();
        DepthImage {
            width,
            height,
            gray,
        }
    }
}

impl ColorImage {
    fn from_rgba(rgba: &RgbaImage) -> Self {
        let rgb = rgba
            .pixels()
            .map(|pixel| {
                [
                    f32::from(pixel.0[0]) / 255.0,
                    f32::from(pixel.0[1]) / 255.0,
                    f32::from(pixel.0[2]) / 255.0,
                ]
            })
            .collect();
        ColorImage {
            width: rgba.width(),
            height: rgba.height(),
            rgb,
        }
    }

    fn resampled(&self, width: u32, height: u32) -> Self {
        let rgb = resample_indices(self.width, self.height, width, height)
            .map(|index| self.rgb[index])
            .collect();
        ColorImage {
            width,
            height,
            rgb,
        }
    }
}

/// Nearest-neighbor source indices for resampling `src` onto a `dst` grid,
/// emitted in row-major order.
fn resample_indices(
    src_w: u32,
    src_h: u32,
    dst_w: u32,
    dst_h: u32,
) -> impl Iterator<Item = usize> {
    (0..dst_h).flat_map(move |y| {
        let src_y = (u64::from(y) * u64::from(src_h) / u64::from(dst_h)) as u32;
        (0..dst_w).map(move |x| {
            let src_x = (u64::from(x) * u64::from(src_w) / u64::from(dst_w)) as u32;
            (src_y * src_w + src_x) as usize
        })
    })
}

impl ImagePair {
    /// Aligns the color raster to the depth grid, then shrinks both onto the
    /// pixel budget. Downsampling is uniform so the aspect ratio survives up
    /// to the flooring of each dimension.
    pub fn harmonized(depth: DepthImage, color: ColorImage) -> Self {
        let color = if color.width == depth.width && color.height == depth.height {
            color
        } else {
            color.resampled(depth.width, depth.height)
        };
        let pixels = depth.width * depth.height;
        if pixels <= PIXEL_BUDGET {
            return ImagePair { depth, color };
        }
        let scale = (PIXEL_BUDGET as f32 / pixels as f32).sqrt();
        let width = ((depth.width as f32 * scale).floor() as u32).max(1);
        let height = ((depth.height as f32 * scale).floor() as u32).max(1);
        ImagePair {
            depth: depth.resampled(width, height),
            color: color.resampled(width, height),
        }
    }
}

fn decode_rgba(path: &Path) -> Result<RgbaImage, FormatError> {
    let decoded = image::open(path).map_err(|source| FormatError::ImageDecode {
        path: path.to_path_buf(),
        source,
    })?;
    let rgba = decoded.to_rgba8();
    if rgba.width() == 0 || rgba.height() == 0 {
        return Err(FormatError::EmptyImage {
            path: path.to_path_buf(),
        });
    }
    Ok(rgba)
}

/// Loads and decodes both rasters, failing the whole pair if either file is
/// unreadable. Decoding runs on two threads since the images are independent.
pub fn load_image_pair(depth_path: &Path, color_path: &Path) -> Result<ImagePair, FormatError> {
    let (depth_rgba, color_rgba) = std::thread::scope(|scope| {
        let depth_task = scope.spawn(|| decode_rgba(depth_path));
        let color_rgba = decode_rgba(color_path);
        let depth_rgba = match depth_task.join() {
            Ok(result) => result,
            Err(payload) => std::panic::resume_unwind(payload),
        };
        (depth_rgba, color_rgba)
    });
    let depth = DepthImage::from_rgba(&depth_rgba?);
    let color = ColorImage::from_rgba(&color_rgba?);
    Ok(ImagePair::harmonized(depth, color))
}

/// Back-projects every retained depth pixel into camera space.
///
/// The focal length derives from the vertical field of view as
/// `height / (2 * tan(fov / 2))`. Pixels whose grayscale exceeds
/// [`DEPTH_CUTOFF`] are background and produce no point. Emitted points flip
/// Y and Z so the cloud faces the camera in a Y-up right-handed frame.
pub fn reconstruct(depth: &DepthImage, color: &ColorImage, fov_degrees: f32) -> CloudBuffers {
    debug_assert_eq!(depth.width, color.width);
    debug_assert_eq!(depth.height, color.height);
    let width = depth.width as f32;
    let height = depth.height as f32;
    let focal = height / (2.0 * (fov_degrees.to_radians() * 0.5).tan());

    let mut positions = Vec::with_capacity(depth.gray.len());
    let mut colors = Vec::with_capacity(depth.gray.len());
    for v in 0..depth.height {
        for u in 0..depth.width {
            let index = (v * depth.width + u) as usize;
            let gray = depth.gray[index];
            if gray > DEPTH_CUTOFF {
                continue;
            }
            let z = (1.0 - gray) * DEPTH_RANGE;
            let x = (u as f32 - width / 2.0) * z / focal;
            let y = (v as f32 - height / 2.0) * z / focal;
            positions.push([x, -y, -z]);
            colors.push(color.rgb[index]);
        }
    }
    CloudBuffers { positions, colors }
}

/// A decoded pair plus the field-of-view knob that drives regeneration.
#[derive(Debug, Clone)]
pub struct CloudSource {
    pair: ImagePair,
    field_of_view: f32,
    cloud: CloudBuffers,
}

impl CloudSource {
    pub fn new(pair: ImagePair, field_of_view: f32) -> Self {
        let cloud = reconstruct(&pair.depth, &pair.color, field_of_view);
        CloudSource {
            pair,
            field_of_view,
            cloud,
        }
    }

    pub fn from_paths(
        depth_path: &Path,
        color_path: &Path,
        field_of_view: f32,
    ) -> Result<Self, FormatError> {
        Ok(CloudSource::new(
            load_image_pair(depth_path, color_path)?,
            field_of_view,
        ))
    }

    pub fn field_of_view(&self) -> f32 {
        self.field_of_view
    }

    /// Rebuilds the cloud under the new field of view. The swap is a move of
    /// a fully built buffer, so readers never see a half-written cloud.
    pub fn set_field_of_view(&mut self, degrees: f32) {
        if (degrees - self.field_of_view).abs() < f32::EPSILON {
            return;
        }
        self.field_of_view = degrees;
        self.cloud = reconstruct(&self.pair.depth, &self.pair.color, degrees);
    }

    /// True once both source rasters decoded; a source that failed to load is
    /// never constructed, so callers gate on `Option<CloudSource>` plus this.
    pub fn is_ready(&self) -> bool {
        !self.pair.depth.gray.is_empty()
    }

    pub fn cloud(&self) -> &CloudBuffers {
        &self.cloud
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.pair.depth.width, self.pair.depth.height)
    }
}

#[cfg(test)]
mod cloud_tests {
    use super::*;

    fn uniform_pair(width: u32, height: u32, gray: f32) -> ImagePair {
        let pixels = (width * height) as usize;
        ImagePair {
            depth: DepthImage {
                width,
                height,
                gray: vec![gray; pixels],
            },
            color: ColorImage {
                width,
                height,
                rgb: vec![[0.5, 0.5, 0.5]; pixels],
            },
        }
    }

    #[test]
    fn uniform_mid_depth_lands_on_constant_z() {
        let pair = uniform_pair(4, 4, 0.5);
        let cloud = reconstruct(&pair.depth, &pair.color, DEFAULT_FIELD_OF_VIEW);
        assert_eq!(cloud.len(), 16);
        for position in &cloud.positions {
            assert!((position[2] - (-63.75)).abs() < 1e-5);
        }
    }

    #[test]
    fn background_pixels_produce_no_points() {
        let gray = vec![0.0, 1.0, 1.0, 0.0];
        let depth = DepthImage {
            width: 2,
            height: 2,
            gray,
        };
        let color = ColorImage {
            width: 2,
            height: 2,
            rgb: vec![[1.0, 0.0, 0.0]; 4],
        };
        let cloud = reconstruct(&depth, &color, DEFAULT_FIELD_OF_VIEW);
        assert_eq!(cloud.len(), 2);
        for position in &cloud.positions {
            assert!((position[2] - (-127.5)).abs() < 1e-5);
        }
    }

    #[test]
    fn positions_and_colors_stay_parallel() {
        let gray = vec![0.2, 1.0, 0.4, 1.0];
        let depth = DepthImage {
            width: 2,
            height: 2,
            gray,
        };
        let color = ColorImage {
            width: 2,
            height: 2,
            rgb: vec![
                [1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [0.0, 0.0, 1.0],
                [1.0, 1.0, 0.0],
            ],
        };
        let cloud = reconstruct(&depth, &color, DEFAULT_FIELD_OF_VIEW);
        assert_eq!(cloud.positions.len(), cloud.colors.len());
        assert_eq!(cloud.colors, vec![[1.0, 0.0, 0.0], [0.0, 0.0, 1.0]]);
    }

    #[test]
    fn oversized_pair_is_clamped_to_budget() {
        let pair = uniform_pair(1024, 1024, 0.5);
        let pair = ImagePair::harmonized(pair.depth, pair.color);
        assert!(pair.depth.width * pair.depth.height <= PIXEL_BUDGET);
        assert_eq!(pair.depth.width, 512);
        assert_eq!(pair.depth.height, 512);
        let cloud = reconstruct(&pair.depth, &pair.color, DEFAULT_FIELD_OF_VIEW);
        assert!(cloud.len() <= PIXEL_BUDGET as usize);
    }

    #[test]
    fn downsampling_preserves_aspect_within_rounding() {
        let pair = uniform_pair(800, 600, 0.5);
        let pair = ImagePair::harmonized(pair.depth, pair.color);
        assert!(pair.depth.width * pair.depth.height <= PIXEL_BUDGET);
        let original = 800.0 / 600.0;
        let resampled = pair.depth.width as f32 / pair.depth.height as f32;
        assert!((original - resampled).abs() < 0.01);
        assert_eq!(pair.color.width, pair.depth.width);
        assert_eq!(pair.color.height, pair.depth.height);
    }

    #[test]
    fn small_pair_is_left_untouched() {
        let pair = uniform_pair(512, 512, 0.5);
        let pair = ImagePair::harmonized(pair.depth, pair.color);
        assert_eq!(pair.depth.width, 512);
        assert_eq!(pair.depth.height, 512);
    }

    #[test]
    fn mismatched_color_is_resampled_onto_depth_grid() {
        let depth = uniform_pair(4, 4, 0.5).depth;
        let color = uniform_pair(8, 8, 0.5).color;
        let pair = ImagePair::harmonized(depth, color);
        assert_eq!(pair.color.width, 4);
        assert_eq!(pair.color.height, 4);
        assert_eq!(pair.color.rgb.len(), 16);
    }

    #[test]
    fn ninety_degree_fov_puts_focal_at_half_height() {
        // f = h / (2 tan(45 deg)) = h / 2, so the corner column lands at
        // x = (u - w/2) * z / (h/2).
        let depth = DepthImage {
            width: 2,
            height: 2,
            gray: vec![0.5; 4],
        };
        let color = ColorImage {
            width: 2,
            height: 2,
            rgb: vec![[0.0; 3]; 4],
        };
        let cloud = reconstruct(&depth, &color, 90.0);
        let z = 63.75;
        let expected_x = (0.0 - 1.0) * z / 1.0;
        assert!((cloud.positions[0][0] - expected_x).abs() < 1e-3);
    }

    #[test]
    fn fov_change_regenerates_the_cloud() {
        let pair = uniform_pair(4, 4, 0.5);
        let mut source = CloudSource::new(pair, DEFAULT_FIELD_OF_VIEW);
        assert!(source.is_ready());
        let wide_fov_x = source.cloud().positions[0][0];
        source.set_field_of_view(30.0);
        let narrow_fov_x = source.cloud().positions[0][0];
        // A narrower fov lengthens the focal, pulling points toward the axis.
        assert!(narrow_fov_x.abs() < wide_fov_x.abs());
        assert_eq!(source.cloud().len(), 16);
    }

    #[test]
    fn unreadable_image_fails_the_whole_pair() {
        use std::io::Write;

        let dir = tempfile::tempdir().expect("tempdir");
        let depth_path = dir.path().join("depth.png");
        let color_path = dir.path().join("color.png");
        let depth = RgbaImage::from_pixel(2, 2, image::Rgba([128, 128, 128, 255]));
        depth.save(&depth_path).expect("save depth png");
        let mut broken = std::fs::File::create(&color_path).expect("create color file");
        broken.write_all(b"not a png").expect("write color file");

        let err = load_image_pair(&depth_path, &color_path).expect_err("pair must fail");
        assert!(err.to_string().contains("color.png"));
    }

    #[test]
    fn decoded_pair_reconstructs_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let depth_path = dir.path().join("depth.png");
        let color_path = dir.path().join("color.png");
        RgbaImage::from_pixel(2, 2, image::Rgba([128, 0, 0, 255]))
            .save(&depth_path)
            .expect("save depth png");
        RgbaImage::from_pixel(2, 2, image::Rgba([10, 200, 30, 255]))
            .save(&color_path)
            .expect("save color png");

        let pair = load_image_pair(&depth_path, &color_path).expect("pair loads");
        let cloud = reconstruct(&pair.depth, &pair.color, DEFAULT_FIELD_OF_VIEW);
        assert_eq!(cloud.len(), 4);
        assert!((cloud.colors[0][1] - 200.0 / 255.0).abs() < 1e-6);
    }
}
