pub mod assets;
pub mod pdf;
pub mod raster;

use std::path::PathBuf;

/// Where image sources resolve from, and how finely raster captures sample.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub asset_dir: PathBuf,
    pub raster_scale: f32,
}

impl RenderOptions {
    pub fn new(asset_dir: impl Into<PathBuf>) -> Self {
        Self {
            asset_dir: asset_dir.into(),
            raster_scale: 2.0,
        }
    }

    pub fn with_raster_scale(mut self, scale: f32) -> Self {
        self.raster_scale = scale;
        self
    }
}
