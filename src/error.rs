//! Error types for atlas loading and GPU setup.

use std::path::PathBuf;

/// Everything that can go wrong between picking an atlas file and putting it on screen.
#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    /// The atlas file could not be opened.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The atlas file could not be decoded as an image.
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    /// The atlas image has no rows, so no tile size can be derived.
    #[error("atlas image is empty")]
    EmptyAtlas,

    /// The atlas strip is not wide enough for the requested number of square tiles.
    #[error("atlas {width}x{height} is too narrow for {tiles} tiles of {height}x{height}")]
    AtlasTooNarrow { width: u32, height: u32, tiles: usize },

    /// A cube atlas needs 6 (mono) or 12 (stereo) faces.
    #[error("unsupported tile count {0}, expected 6 or 12")]
    TileCount(usize),

    /// Tiles handed to a cube atlas differ in size.
    #[error("tile {index} is {width}x{height}, expected {expected}x{expected}")]
    TileSize {
        index: usize,
        width: u32,
        height: u32,
        expected: u32,
    },

    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("no compatible graphics adapter found")]
    NoAdapter,

    #[error("failed to request device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
}
