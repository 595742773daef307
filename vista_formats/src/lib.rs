//! Data-side building blocks for the vista viewer.
//!
//! `cloud` turns a depth/color raster pair into a point cloud; `mesh` loads
//! pre-exported mesh assets and normalizes them into the shared model frame.
//! Nothing in this crate touches the GPU, so every operation is testable on
//! plain buffers.

use std::path::PathBuf;

use thiserror::Error;

pub mod cloud;
pub mod mesh;

pub use cloud::{
    CloudBuffers, CloudSource, ColorImage, DepthImage, ImagePair, DEFAULT_FIELD_OF_VIEW,
    PIXEL_BUDGET, load_image_pair, reconstruct,
};
pub use mesh::{MODEL_TARGET_EXTENT, MeshAsset};

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("decoding image {path}: {source}")]
    ImageDecode {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("image {path} decoded to zero pixels")]
    EmptyImage { path: PathBuf },
    #[error("reading mesh asset {path}: {source}")]
    MeshRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parsing mesh asset {path}: {source}")]
    MeshParse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("mesh asset has no vertices")]
    EmptyMesh,
    #[error("mesh index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },
}
