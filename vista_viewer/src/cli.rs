use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;

use crate::layout::ViewRect;
use crate::sync::CoordinateMapping;
use crate::views::ViewStack;

#[derive(Parser, Debug)]
#[command(about = "Multi-viewport model and point-cloud inspector", version)]
pub struct Args {
    /// Depth raster (PNG) driving point-cloud reconstruction
    #[arg(long, default_value = "assets/depth.png")]
    pub depth_image: PathBuf,

    /// Color raster (PNG) paired with the depth raster
    #[arg(long, default_value = "assets/color.png")]
    pub color_image: PathBuf,

    /// Pre-exported mesh asset JSON shown in the model views
    #[arg(long)]
    pub mesh_json: Option<PathBuf>,

    /// Initial vertical field of view for the reconstruction, in degrees
    #[arg(long, default_value_t = 75.0)]
    pub field_of_view: f32,

    /// Scale applied to X when mapping handle moves onto the front view
    #[arg(long, default_value_t = 1.0)]
    pub scale_x: f32,

    /// Scale applied to Z when mapping handle moves onto the front view
    #[arg(long, default_value_t = 1.0)]
    pub scale_z: f32,

    /// Mirror the X axis of the handle-to-highlight mapping
    #[arg(long)]
    pub invert_x: bool,

    /// Mirror the Z axis of the handle-to-highlight mapping
    #[arg(long)]
    pub invert_z: bool,

    /// Skip creating a winit window/event loop; useful for headless automation
    #[arg(long)]
    pub headless: bool,

    /// Optional layout preset JSON overriding the stock view fractions
    #[arg(long)]
    pub layout_preset: Option<PathBuf>,
}

impl Args {
    pub fn mapping(&self) -> CoordinateMapping {
        CoordinateMapping {
            scale_x: self.scale_x,
            scale_z: self.scale_z,
            invert_x: self.invert_x,
            invert_z: self.invert_z,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LayoutPreset {
    #[serde(default)]
    pub views: Vec<ViewPreset>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ViewPreset {
    pub name: String,
    pub left: f32,
    pub bottom: f32,
    pub width: f32,
    pub height: f32,
}

pub fn load_layout_preset(path: &Path) -> Result<LayoutPreset> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading layout preset {}", path.display()))?;
    let preset: LayoutPreset = serde_json::from_str(&data)
        .with_context(|| format!("parsing layout preset {}", path.display()))?;
    Ok(preset)
}

/// Overrides the fractions of any stock view the preset names; unnamed views
/// keep their defaults.
pub fn apply_layout_preset(stack: &mut ViewStack, preset: &LayoutPreset) {
    for view_preset in &preset.views {
        for view in stack.iter_mut() {
            if view.name == view_preset.name {
                view.rect = ViewRect::new(
                    view_preset.left,
                    view_preset.bottom,
                    view_preset.width,
                    view_preset.height,
                );
            }
        }
    }
}

#[cfg(test)]
mod cli_tests {
    use std::io::Write;

    use super::*;
    use crate::views::stock_views;

    #[test]
    fn layout_preset_overrides_only_named_views() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            "{{\"views\":[{{\"name\":\"cloud\",\"left\":0.7,\"bottom\":0.7,\"width\":0.3,\"height\":0.3}}]}}"
        )
        .expect("write preset");
        let preset = load_layout_preset(file.path()).expect("preset loads");

        let mut stack = stock_views();
        apply_layout_preset(&mut stack, &preset);
        let cloud = stack
            .iter()
            .find(|view| view.name == "cloud")
            .expect("cloud view");
        assert_eq!(cloud.rect, ViewRect::new(0.7, 0.7, 0.3, 0.3));
        let front = stack
            .iter()
            .find(|view| view.name == "front")
            .expect("front view");
        assert_eq!(front.rect, ViewRect::new(0.0, 0.0, 0.6, 1.0));
    }

    #[test]
    fn malformed_preset_reports_the_path() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, "[not json").expect("write preset");
        let err = load_layout_preset(file.path()).expect_err("must fail");
        assert!(err.to_string().contains("parsing layout preset"));
    }
}
