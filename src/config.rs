// config.rs — 命令行 / 环境变量配置

use crate::atlas::{MONO_TILES, STEREO_TILES};
use crate::panorama::{Geometry, DEFAULT_FOV, DEFAULT_LAT, DEFAULT_LON};
use crate::stereo::StereoMode;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Atlas shipped next to the binary, tried when no path is given.
pub const DEFAULT_ATLAS: &str = "assets/sun_temple_stripe_stereo.jpg";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GeometryArg {
    Cube,
    Sphere,
}

impl From<GeometryArg> for Geometry {
    fn from(arg: GeometryArg) -> Self {
        match arg {
            GeometryArg::Cube => Geometry::Cube,
            GeometryArg::Sphere => Geometry::Sphere,
        }
    }
}

/// 360° cube-map panorama viewer with side-by-side stereo.
#[derive(Debug, Clone, Parser)]
#[command(version, about)]
pub struct Args {
    /// Striped atlas image: square tiles laid left to right, tile edge = image height.
    pub atlas: Option<PathBuf>,

    /// Number of tiles in the startup atlas: 12 for stereo (left faces, then right),
    /// 6 for mono. Inferred from the image shape when omitted.
    #[arg(long, value_parser = parse_tiles)]
    pub tiles: Option<usize>,

    /// Surface the faces are projected onto.
    #[arg(long, value_enum, default_value_t = GeometryArg::Cube)]
    pub geometry: GeometryArg,

    /// Start in side-by-side stereo.
    #[arg(long)]
    pub stereo: bool,

    /// Initial longitude in degrees.
    #[arg(long, default_value_t = DEFAULT_LON, allow_negative_numbers = true)]
    pub lon: f32,

    /// Initial latitude in degrees, clamped to ±85.
    #[arg(long, default_value_t = DEFAULT_LAT, allow_negative_numbers = true)]
    pub lat: f32,

    /// Initial vertical field of view in degrees, clamped to 10..=75.
    #[arg(long, default_value_t = DEFAULT_FOV)]
    pub fov: f32,

    /// UI language (en, fr, de, es).
    #[arg(long, env = "PANORAMA_LANG", default_value = "en")]
    pub lang: String,
}

fn parse_tiles(s: &str) -> Result<usize, String> {
    let n: usize = s.parse().map_err(|e| format!("{e}"))?;
    if n == MONO_TILES || n == STEREO_TILES {
        Ok(n)
    } else {
        Err(format!("expected {MONO_TILES} or {STEREO_TILES}, got {n}"))
    }
}

impl Args {
    pub fn stereo_mode(&self) -> StereoMode {
        if self.stereo {
            StereoMode::SideBySide
        } else {
            StereoMode::Mono
        }
    }

    /// The atlas to open at startup, if any.
    pub fn initial_atlas(&self) -> Option<PathBuf> {
        if let Some(path) = &self.atlas {
            return Some(path.clone());
        }

        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                let p = dir.join(DEFAULT_ATLAS);
                if p.exists() {
                    return Some(p);
                }
            }
        }

        let p = PathBuf::from(DEFAULT_ATLAS);
        p.exists().then_some(p)
    }
}
