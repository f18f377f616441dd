// stereo.rs — 左右眼与视口划分

/// Number of cube faces per eye.
pub const FACES_PER_EYE: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eye {
    Left,
    Right,
}

impl Eye {
    /// First texture layer holding this eye's faces.
    pub fn layer_offset(self) -> u32 {
        match self {
            Eye::Left => 0,
            Eye::Right => FACES_PER_EYE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StereoMode {
    Mono,       // 仅左眼，全窗口
    SideBySide, // 左半窗口左眼，右半窗口右眼
}

impl StereoMode {
    pub fn toggled(self) -> Self {
        match self {
            StereoMode::Mono => StereoMode::SideBySide,
            StereoMode::SideBySide => StereoMode::Mono,
        }
    }

    /// Viewports to draw for a surface of `width` x `height` physical pixels.
    pub fn views(self, width: u32, height: u32) -> Vec<EyeView> {
        match self {
            StereoMode::Mono => vec![EyeView {
                eye: Eye::Left,
                viewport: Viewport {
                    x: 0.0,
                    y: 0.0,
                    width: width as f32,
                    height: height as f32,
                },
            }],
            StereoMode::SideBySide => {
                let half = width as f32 / 2.0;
                vec![
                    EyeView {
                        eye: Eye::Left,
                        viewport: Viewport {
                            x: 0.0,
                            y: 0.0,
                            width: half,
                            height: height as f32,
                        },
                    },
                    EyeView {
                        eye: Eye::Right,
                        viewport: Viewport {
                            x: half,
                            y: 0.0,
                            width: half,
                            height: height as f32,
                        },
                    },
                ]
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn aspect(&self) -> f32 {
        if self.height > 0.0 {
            self.width / self.height
        } else {
            1.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeView {
    pub eye: Eye,
    pub viewport: Viewport,
}
