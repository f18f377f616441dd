// atlas.rs — 条带图集切片：每块为正方形，边长等于图集高度

use crate::error::ViewerError;
use crate::stereo::{Eye, FACES_PER_EYE};
use image::imageops::{self, FilterType};
use image::io::Reader as ImageReader;
use image::{GenericImageView, RgbaImage};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub const MONO_TILES: usize = FACES_PER_EYE as usize;
pub const STEREO_TILES: usize = 2 * FACES_PER_EYE as usize;

/// Cuts `tiles` square tiles out of a horizontal strip, left to right.
pub fn slice_atlas(atlas: &RgbaImage, tiles: usize) -> Result<Vec<RgbaImage>, ViewerError> {
    let (width, height) = atlas.dimensions();
    if height == 0 {
        return Err(ViewerError::EmptyAtlas);
    }
    if u64::from(height) * tiles as u64 > u64::from(width) {
        return Err(ViewerError::AtlasTooNarrow {
            width,
            height,
            tiles,
        });
    }

    let edge = height;
    Ok((0..tiles as u32)
        .map(|i| imageops::crop_imm(atlas, edge * i, 0, edge, edge).to_image())
        .collect())
}

/// Tile count implied by a strip's shape: stereo when it holds at least twelve
/// square tiles, otherwise mono.
pub fn infer_tiles(width: u32, height: u32) -> Result<usize, ViewerError> {
    if height == 0 {
        return Err(ViewerError::EmptyAtlas);
    }
    if (width / height) as usize >= STEREO_TILES {
        Ok(STEREO_TILES)
    } else {
        Ok(MONO_TILES)
    }
}

/// Cube faces for one (mono) or two (stereo) eyes.
#[derive(Debug, Clone)]
pub struct CubeAtlas {
    tile_size: u32,
    faces: Vec<RgbaImage>,
}

impl CubeAtlas {
    pub fn from_tiles(faces: Vec<RgbaImage>) -> Result<Self, ViewerError> {
        if faces.len() != MONO_TILES && faces.len() != STEREO_TILES {
            return Err(ViewerError::TileCount(faces.len()));
        }

        let tile_size = faces[0].width();
        for (index, face) in faces.iter().enumerate() {
            let (width, height) = face.dimensions();
            if width != tile_size || height != tile_size {
                return Err(ViewerError::TileSize {
                    index,
                    width,
                    height,
                    expected: tile_size,
                });
            }
        }

        Ok(Self { tile_size, faces })
    }

    pub fn from_image(atlas: &RgbaImage, tiles: usize) -> Result<Self, ViewerError> {
        if tiles != MONO_TILES && tiles != STEREO_TILES {
            return Err(ViewerError::TileCount(tiles));
        }
        Self::from_tiles(slice_atlas(atlas, tiles)?)
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn is_stereo(&self) -> bool {
        self.faces.len() == STEREO_TILES
    }

    /// The six faces shown to `eye`. A mono atlas shows the same faces to both eyes.
    pub fn faces(&self, eye: Eye) -> &[RgbaImage] {
        let start = if self.is_stereo() {
            eye.layer_offset() as usize
        } else {
            0
        };
        &self.faces[start..start + MONO_TILES]
    }

    /// Downscales every face so its edge fits within `max_edge`.
    pub fn fit_to(self, max_edge: u32) -> Self {
        if self.tile_size <= max_edge {
            return self;
        }

        log::warn!(
            "tile {}x{} exceeds the GPU limit {}, scaling down",
            self.tile_size,
            self.tile_size,
            max_edge
        );

        let faces = self
            .faces
            .iter()
            .map(|f| imageops::resize(f, max_edge, max_edge, FilterType::Lanczos3))
            .collect();

        Self {
            tile_size: max_edge,
            faces,
        }
    }
}

/// Decodes the file at `path` and slices it into a cube atlas. Without an explicit
/// `tiles` the count is taken from the strip's width to height ratio.
pub fn load_atlas(path: &Path, tiles: Option<usize>) -> Result<CubeAtlas, ViewerError> {
    let file = File::open(path).map_err(|source| ViewerError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let mut reader = ImageReader::new(BufReader::new(file))
        .with_guessed_format()
        .map_err(|source| ViewerError::Open {
            path: path.to_path_buf(),
            source,
        })?;
    reader.no_limits();
    let img = reader.decode()?;

    let (w, h) = img.dimensions();
    log::info!("decoded atlas {}x{}", w, h);

    let tiles = match tiles {
        Some(n) => n,
        None => infer_tiles(w, h)?,
    };
    CubeAtlas::from_image(&img.to_rgba8(), tiles)
}
