use glam::Vec2;
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, MouseButton as WinitMouseButton, MouseScrollDelta, WindowEvent};
use winit::window::Window;

use crate::events::{Event, MOUSE_EVENT, MouseButton, ResizeEvent, WINDOW_EVENT};
use crate::input::InputState;

/// Logical pixels treated as one wheel line for touchpad-style pixel deltas.
const PIXELS_PER_LINE: f32 = 20.0;

/// Folds a winit `WindowEvent` into `state` and hands every resulting engine
/// event to `emit` together with its channel.
///
/// Events with no engine counterpart are ignored.
pub(crate) fn translate_window_event(
    window: &Window,
    state: &mut InputState,
    event: &WindowEvent,
    mut emit: impl FnMut(&'static str, Event),
) {
    match event {
        WindowEvent::Focused(focused) => {
            for ev in state.focus(*focused) {
                emit(MOUSE_EVENT, Event::Mouse(ev));
            }
        }

        WindowEvent::CursorLeft { .. } => state.pointer_left(),

        WindowEvent::CursorMoved { position, .. } => {
            let pos = to_logical(*position, window.scale_factor());
            if let Some(ev) = state.pointer_moved(pos) {
                emit(MOUSE_EVENT, Event::Mouse(ev));
            }
        }

        WindowEvent::MouseInput { state: st, button, .. } => {
            let Some(button) = map_mouse_button(*button) else {
                return;
            };
            let pressed = *st == ElementState::Pressed;
            if let Some(ev) = state.button(button, pressed) {
                emit(MOUSE_EVENT, Event::Mouse(ev));
            }
        }

        WindowEvent::MouseWheel { delta, .. } => {
            let lines = wheel_lines(*delta, window.scale_factor());
            if let Some(ev) = state.wheel(lines) {
                emit(MOUSE_EVENT, Event::Mouse(ev));
            }
        }

        WindowEvent::Resized(size) => emit(WINDOW_EVENT, Event::Resized(resize_event(*size))),

        _ => {}
    }
}

pub(crate) fn resize_event(size: PhysicalSize<u32>) -> ResizeEvent {
    ResizeEvent {
        width: size.width,
        height: size.height,
    }
}

fn to_logical(pos: PhysicalPosition<f64>, scale: f64) -> Vec2 {
    let logical = pos.to_logical::<f64>(scale);
    Vec2::new(logical.x as f32, logical.y as f32)
}

fn wheel_lines(delta: MouseScrollDelta, scale: f64) -> Vec2 {
    match delta {
        MouseScrollDelta::LineDelta(x, y) => Vec2::new(x, y),
        MouseScrollDelta::PixelDelta(p) => to_logical(p, scale) / PIXELS_PER_LINE,
    }
}

/// Only the three primary buttons are tracked.
fn map_mouse_button(b: WinitMouseButton) -> Option<MouseButton> {
    match b {
        WinitMouseButton::Left => Some(MouseButton::Left),
        WinitMouseButton::Right => Some(MouseButton::Right),
        WinitMouseButton::Middle => Some(MouseButton::Middle),
        WinitMouseButton::Back | WinitMouseButton::Forward | WinitMouseButton::Other(_) => None,
    }
}
