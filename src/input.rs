// input.rs — winit 输入事件到视角操作的换算

use crate::panorama::PointerId;
use winit::event::{ElementState, MouseScrollDelta, TouchPhase, WindowEvent};

/// Pixels per wheel line, matching a browser's `deltaY` for one notch.
pub const WHEEL_LINE_PIXELS: f32 = 100.0;

/// Wheel delta in logical pixels with the browser's sign: positive scrolls down
/// and zooms out.
pub fn wheel_delta_pixels(delta: MouseScrollDelta, scale: f64) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => -y * WHEEL_LINE_PIXELS,
        MouseScrollDelta::PixelDelta(pos) => -pos.to_logical::<f64>(scale).y as f32,
    }
}

/// The pointer whose drag `event` ends, if any.
///
/// Checked before egui gets a chance to consume the event: a button released
/// over a panel must still release the drag.
pub fn released_pointer(event: &WindowEvent<'_>) -> Option<PointerId> {
    match event {
        WindowEvent::MouseInput {
            state: ElementState::Released,
            ..
        }
        | WindowEvent::CursorLeft { .. }
        | WindowEvent::Focused(false) => Some(PointerId::Mouse),
        WindowEvent::Touch(touch)
            if matches!(touch.phase, TouchPhase::Ended | TouchPhase::Cancelled) =>
        {
            Some(PointerId::Touch(touch.id))
        }
        _ => None,
    }
}

#[cfg(test)]
#[allow(deprecated)] // MouseInput still carries the deprecated `modifiers` field
mod tests {
    use super::*;
    use crate::panorama::PanoramaViewer;
    use winit::dpi::PhysicalPosition;
    use winit::event::{DeviceId, ModifiersState, MouseButton, Touch};

    fn device() -> DeviceId {
        // SAFETY: only used as an opaque tag in synthetic events.
        unsafe { DeviceId::dummy() }
    }

    fn mouse(state: ElementState) -> WindowEvent<'static> {
        WindowEvent::MouseInput {
            device_id: device(),
            state,
            button: MouseButton::Left,
            modifiers: ModifiersState::empty(),
        }
    }

    fn touch(id: u64, phase: TouchPhase) -> WindowEvent<'static> {
        WindowEvent::Touch(Touch {
            device_id: device(),
            phase,
            location: PhysicalPosition::new(0.0, 0.0),
            force: None,
            id,
        })
    }

    #[test]
    fn test_line_delta_is_hundred_pixels_inverted() {
        assert_eq!(wheel_delta_pixels(MouseScrollDelta::LineDelta(0.0, 1.0), 1.0), -100.0);
        assert_eq!(wheel_delta_pixels(MouseScrollDelta::LineDelta(0.0, -2.0), 1.0), 200.0);
    }

    #[test]
    fn test_pixel_delta_is_logical() {
        let delta = MouseScrollDelta::PixelDelta(PhysicalPosition::new(0.0, -40.0));
        assert_eq!(wheel_delta_pixels(delta, 2.0), 20.0);
    }

    #[test]
    fn test_scrolling_down_zooms_out() {
        let mut viewer = PanoramaViewer::new(90.0, 0.0, 50.0);
        viewer.zoom(wheel_delta_pixels(MouseScrollDelta::LineDelta(0.0, -1.0), 1.0));
        assert!((viewer.fov - 55.0).abs() < 1e-4);
        viewer.zoom(wheel_delta_pixels(MouseScrollDelta::LineDelta(0.0, 1.0), 1.0));
        assert!((viewer.fov - 50.0).abs() < 1e-4);
    }

    #[test]
    fn test_mouse_release_and_focus_loss_end_mouse_drag() {
        assert_eq!(released_pointer(&mouse(ElementState::Released)), Some(PointerId::Mouse));
        assert_eq!(released_pointer(&mouse(ElementState::Pressed)), None);
        assert_eq!(released_pointer(&WindowEvent::Focused(false)), Some(PointerId::Mouse));
        assert_eq!(released_pointer(&WindowEvent::Focused(true)), None);
        assert_eq!(
            released_pointer(&WindowEvent::CursorLeft { device_id: device() }),
            Some(PointerId::Mouse)
        );
    }

    #[test]
    fn test_touch_end_and_cancel_release_that_touch() {
        assert_eq!(released_pointer(&touch(3, TouchPhase::Ended)), Some(PointerId::Touch(3)));
        assert_eq!(released_pointer(&touch(4, TouchPhase::Cancelled)), Some(PointerId::Touch(4)));
        assert_eq!(released_pointer(&touch(3, TouchPhase::Moved)), None);
    }

    #[test]
    fn test_release_stops_later_moves_from_dragging() {
        let mut viewer = PanoramaViewer::new(90.0, 0.0, 70.0);
        viewer.begin_drag(PointerId::Mouse, 0.0, 0.0);

        // the release lands over a panel; the drag must still end
        if let Some(pointer) = released_pointer(&mouse(ElementState::Released)) {
            viewer.end_drag(pointer);
        }
        assert!(!viewer.is_dragging());

        viewer.drag_to(PointerId::Mouse, 200.0, 0.0);
        assert!((viewer.lon() - 90.0).abs() < 1e-4);
    }
}
