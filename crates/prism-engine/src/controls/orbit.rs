use std::cell::RefCell;
use std::f32::consts::FRAC_PI_2;
use std::rc::Rc;

use glam::{Mat4, Vec2, Vec3};

use crate::camera::Camera;
use crate::events::{
    EventDispatcher, MOUSE_EVENT, MouseButton, MouseEvent, MouseEventKind, Subscription,
};

/// Pitch stays strictly inside (-π/2, π/2) so the look-at basis never degenerates.
pub const VERTICAL_LIMIT: f32 = FRAC_PI_2 - 0.1;

/// Closest the camera may zoom towards its target.
pub const MIN_RADIUS: f32 = 0.1;

const WORLD_UP: Vec3 = Vec3::Y;

/// Pointer state written by the mouse listener and read back on `update`.
#[derive(Debug, Default)]
struct PointerState {
    current: Vec2,
    button: MouseButton,
    scroll: f32,
}

impl PointerState {
    fn apply(&mut self, ev: &MouseEvent) {
        self.current = ev.position;
        match ev.kind {
            MouseEventKind::Moved => {}
            MouseEventKind::ButtonPressed => {
                if self.button == MouseButton::None {
                    self.button = ev.button;
                }
            }
            MouseEventKind::ButtonReleased => {
                if self.button == ev.button {
                    self.button = MouseButton::None;
                }
            }
            MouseEventKind::Scrolled => self.scroll = ev.scroll.y,
        }
    }
}

/// Mouse-driven orbit camera controller.
///
/// Left drag orbits around `target`, right drag pans the target in the
/// camera plane, the wheel zooms. Input is accumulated from the
/// [`MOUSE_EVENT`] channel and applied to a camera on [`OrbitControls::update`].
///
/// The listener is owned by the controls: dropping them deregisters it.
#[derive(Debug)]
pub struct OrbitControls {
    pub radius: f32,
    pub pitch: f32,
    pub yaw: f32,
    pub orbit_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,

    target: Vec3,
    previous: Vec2,
    first_update: bool,
    pointer: Rc<RefCell<PointerState>>,
    _subscription: Subscription,
}

impl OrbitControls {
    pub fn new(dispatcher: &EventDispatcher) -> Self {
        let pointer = Rc::new(RefCell::new(PointerState::default()));

        let sink = Rc::clone(&pointer);
        let subscription = dispatcher.subscribe(MOUSE_EVENT, move |event| {
            if let Some(ev) = event.downcast_ref::<MouseEvent>() {
                sink.borrow_mut().apply(ev);
            }
        });

        Self {
            radius: 1.0,
            pitch: 0.0,
            yaw: 0.0,
            orbit_speed: 5.0,
            zoom_speed: 50.0,
            pan_speed: 1.5,
            target: Vec3::ZERO,
            previous: Vec2::ZERO,
            first_update: true,
            pointer,
            _subscription: subscription,
        }
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn set_target(&mut self, target: Vec3) {
        self.target = target;
    }

    /// Button currently driving the controls, `MouseButton::None` when idle.
    pub fn tracked_button(&self) -> MouseButton {
        self.pointer.borrow().button
    }

    /// Camera position implied by the current spherical coordinates.
    pub fn eye(&self) -> Vec3 {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        self.target + self.radius * Vec3::new(sin_yaw * cos_pitch, sin_pitch, cos_yaw * cos_pitch)
    }

    /// Folds the input gathered since the previous call into `camera`.
    ///
    /// The very first call only records the pointer position so the camera does
    /// not jump by the distance the pointer travelled before the controls existed.
    pub fn update<C: Camera + ?Sized>(&mut self, camera: &mut C, delta: f32) {
        let mut pointer = self.pointer.borrow_mut();

        if self.first_update {
            self.previous = pointer.current;
            self.first_update = false;
            return;
        }

        let offset = pointer.current - self.previous;

        match pointer.button {
            MouseButton::Left => {
                self.yaw -= offset.x * self.orbit_speed * delta;
                self.pitch += offset.y * self.orbit_speed * delta;
                self.pitch = self.pitch.clamp(-VERTICAL_LIMIT, VERTICAL_LIMIT);
            }
            MouseButton::Right => {
                // Basis built from the target towards the eye, so both axes drag the scene
                // along with the pointer.
                let forward = (camera.position() - self.target).try_normalize();
                let right = forward.and_then(|f| f.cross(WORLD_UP).try_normalize());
                if let (Some(forward), Some(right)) = (forward, right) {
                    let up = right.cross(forward);
                    let step = self.pan_speed * delta;
                    self.target += right * offset.x * step + up * offset.y * step;
                } else {
                    log::debug!("pan skipped: camera direction is degenerate");
                }
            }
            _ => {}
        }

        if pointer.scroll != 0.0 {
            self.radius = (self.radius - pointer.scroll * self.zoom_speed * delta).max(MIN_RADIUS);
            pointer.scroll = 0.0;
        }

        let eye = self.eye();
        camera.set_transform(Mat4::look_at_rh(eye, self.target, WORLD_UP).inverse());

        self.previous = pointer.current;
    }
}
