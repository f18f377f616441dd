// panorama.rs — 视角参数、拖拽/缩放与相机矩阵

use crate::stereo::StereoMode;
use glam::{Mat4, Vec3};

/// Degrees of rotation per logical pixel of drag.
pub const DRAG_DEGREES_PER_PIXEL: f32 = 0.1;
/// Degrees of field of view per pixel of wheel delta.
pub const ZOOM_DEGREES_PER_PIXEL: f32 = 0.05;

pub const LAT_LIMIT: f32 = 85.0;
pub const MIN_FOV: f32 = 10.0;
pub const MAX_FOV: f32 = 75.0;

pub const DEFAULT_LON: f32 = 90.0;
pub const DEFAULT_LAT: f32 = 0.0;
pub const DEFAULT_FOV: f32 = 70.0;

pub const NEAR: f32 = 1.0;
pub const FAR: f32 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Geometry {
    Cube,   // 反向立方体，边长 100
    Sphere, // 反向球体，半径 500
}

impl Geometry {
    pub fn toggled(self) -> Self {
        match self {
            Geometry::Cube => Geometry::Sphere,
            Geometry::Sphere => Geometry::Cube,
        }
    }
}

/// Who owns the current drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerId {
    Mouse,
    Touch(u64),
}

#[derive(Debug, Clone, Copy)]
struct Drag {
    pointer: PointerId,
    x: f32,
    y: f32,
}

pub struct PanoramaViewer {
    lon: f32,
    lat: f32,
    phi: f32,
    theta: f32,
    pub fov: f32,
    pub geometry: Geometry,
    pub stereo: StereoMode,
    pub is_fullscreen: bool,
    initial: (f32, f32, f32),
    drag: Option<Drag>,
}

impl PanoramaViewer {
    pub fn new(lon: f32, lat: f32, fov: f32) -> Self {
        let fov = fov.clamp(MIN_FOV, MAX_FOV);
        let mut viewer = Self {
            lon: 0.0,
            lat: 0.0,
            phi: 0.0,
            theta: 0.0,
            fov,
            geometry: Geometry::Cube,
            stereo: StereoMode::Mono,
            is_fullscreen: false,
            initial: (lon, lat, fov),
            drag: None,
        };
        viewer.set_orientation(lon, lat);
        viewer
    }

    pub fn lon(&self) -> f32 {
        self.lon
    }

    pub fn lat(&self) -> f32 {
        self.lat
    }

    /// Sets the view angles, clamping latitude and recomputing the spherical angles.
    pub fn set_orientation(&mut self, lon: f32, lat: f32) {
        self.lon = lon.rem_euclid(360.0);
        self.lat = lat.clamp(-LAT_LIMIT, LAT_LIMIT);
        self.phi = (90.0 - self.lat).to_radians();
        self.theta = self.lon.to_radians();
    }

    pub fn reset(&mut self) {
        let (lon, lat, fov) = self.initial;
        self.set_orientation(lon, lat);
        self.fov = fov;
        self.drag = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Starts a drag at `(x, y)` in logical pixels. A new mouse press always takes over;
    /// a touch only starts a drag when no other pointer holds one.
    pub fn begin_drag(&mut self, pointer: PointerId, x: f32, y: f32) {
        if let (Some(current), PointerId::Touch(_)) = (self.drag, pointer) {
            if current.pointer != pointer {
                return;
            }
        }
        self.drag = Some(Drag { pointer, x, y });
    }

    pub fn drag_to(&mut self, pointer: PointerId, x: f32, y: f32) {
        let Some(drag) = self.drag else {
            return;
        };
        if drag.pointer != pointer {
            return;
        }

        let lon = self.lon - (x - drag.x) * DRAG_DEGREES_PER_PIXEL;
        let lat = self.lat + (y - drag.y) * DRAG_DEGREES_PER_PIXEL;
        self.set_orientation(lon, lat);

        self.drag = Some(Drag { pointer, x, y });
    }

    pub fn end_drag(&mut self, pointer: PointerId) {
        if self.drag.map(|d| d.pointer) == Some(pointer) {
            self.drag = None;
        }
    }

    /// Adjusts the field of view by a wheel delta in pixels; positive zooms out.
    pub fn zoom(&mut self, delta_y: f32) {
        self.fov = (self.fov + delta_y * ZOOM_DEGREES_PER_PIXEL).clamp(MIN_FOV, MAX_FOV);
    }

    /// Unit vector the camera looks along.
    pub fn look_target(&self) -> Vec3 {
        Vec3::new(
            self.phi.sin() * self.theta.cos(),
            self.phi.cos(),
            self.phi.sin() * self.theta.sin(),
        )
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(Vec3::ZERO, self.look_target(), Vec3::Y)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov.to_radians(), aspect.max(f32::EPSILON), NEAR, FAR)
    }

    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        self.projection_matrix(aspect) * self.view_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_default_looks_along_positive_z() {
        let viewer = PanoramaViewer::new(DEFAULT_LON, DEFAULT_LAT, DEFAULT_FOV);
        let t = viewer.look_target();
        assert!(close(t.x, 0.0));
        assert!(close(t.y, 0.0));
        assert!(close(t.z, 1.0));
    }

    #[test]
    fn test_drag_moves_lon_and_lat() {
        let mut viewer = PanoramaViewer::new(90.0, 0.0, 70.0);
        viewer.begin_drag(PointerId::Mouse, 100.0, 100.0);
        viewer.drag_to(PointerId::Mouse, 150.0, 80.0);
        assert!(close(viewer.lon(), 85.0));
        assert!(close(viewer.lat(), -2.0));

        // deltas are measured from the last position, not the drag origin
        viewer.drag_to(PointerId::Mouse, 160.0, 80.0);
        assert!(close(viewer.lon(), 84.0));
        assert!(close(viewer.lat(), -2.0));
    }

    #[test]
    fn test_latitude_is_clamped() {
        let mut viewer = PanoramaViewer::new(90.0, 0.0, 70.0);
        viewer.begin_drag(PointerId::Mouse, 0.0, 0.0);
        viewer.drag_to(PointerId::Mouse, 0.0, 5000.0);
        assert_eq!(viewer.lat(), LAT_LIMIT);
        viewer.drag_to(PointerId::Mouse, 0.0, -5000.0);
        assert_eq!(viewer.lat(), -LAT_LIMIT);

        let t = viewer.look_target();
        assert!(t.y < -0.99);
        assert!(close(t.length(), 1.0));
    }

    #[test]
    fn test_initial_latitude_is_clamped() {
        let viewer = PanoramaViewer::new(0.0, 120.0, 70.0);
        assert_eq!(viewer.lat(), LAT_LIMIT);
    }

    #[test]
    fn test_move_without_drag_is_ignored() {
        let mut viewer = PanoramaViewer::new(90.0, 0.0, 70.0);
        viewer.drag_to(PointerId::Mouse, 500.0, 500.0);
        assert!(close(viewer.lon(), 90.0));
        assert!(close(viewer.lat(), 0.0));
    }

    #[test]
    fn test_drag_owned_by_first_touch() {
        let mut viewer = PanoramaViewer::new(90.0, 0.0, 70.0);
        viewer.begin_drag(PointerId::Touch(1), 0.0, 0.0);
        viewer.begin_drag(PointerId::Touch(2), 50.0, 50.0);
        viewer.drag_to(PointerId::Touch(2), 100.0, 100.0);
        assert!(close(viewer.lon(), 90.0));

        viewer.drag_to(PointerId::Touch(1), 10.0, 0.0);
        assert!(close(viewer.lon(), 89.0));

        viewer.end_drag(PointerId::Touch(2));
        assert!(viewer.is_dragging());
        viewer.end_drag(PointerId::Touch(1));
        assert!(!viewer.is_dragging());
    }

    #[test]
    fn test_lon_wraps() {
        let mut viewer = PanoramaViewer::new(1.0, 0.0, 70.0);
        viewer.begin_drag(PointerId::Mouse, 0.0, 0.0);
        viewer.drag_to(PointerId::Mouse, 20.0, 0.0);
        assert!(close(viewer.lon(), 359.0));
    }

    #[test]
    fn test_zoom_steps_and_clamps() {
        let mut viewer = PanoramaViewer::new(90.0, 0.0, 70.0);
        viewer.zoom(-100.0);
        assert!(close(viewer.fov, 65.0));
        viewer.zoom(10_000.0);
        assert_eq!(viewer.fov, MAX_FOV);
        viewer.zoom(-10_000.0);
        assert_eq!(viewer.fov, MIN_FOV);
    }

    #[test]
    fn test_reset_restores_initial_view() {
        let mut viewer = PanoramaViewer::new(90.0, 10.0, 60.0);
        viewer.begin_drag(PointerId::Mouse, 0.0, 0.0);
        viewer.drag_to(PointerId::Mouse, 300.0, 300.0);
        viewer.zoom(200.0);
        viewer.reset();
        assert!(close(viewer.lon(), 90.0));
        assert!(close(viewer.lat(), 10.0));
        assert!(close(viewer.fov, 60.0));
        assert!(!viewer.is_dragging());
    }

    #[test]
    fn test_view_projection_centres_look_target() {
        let viewer = PanoramaViewer::new(30.0, 20.0, 70.0);
        let clip = viewer.view_projection(16.0 / 9.0) * (viewer.look_target() * 50.0).extend(1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(close(ndc.x, 0.0));
        assert!(close(ndc.y, 0.0));
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }
}
