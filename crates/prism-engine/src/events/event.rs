use glam::Vec2;

/// Channel carrying every [`MouseEvent`], whatever its kind.
pub const MOUSE_EVENT: &str = "mouse_event";

/// Channel carrying window-level events ([`ResizeEvent`]).
pub const WINDOW_EVENT: &str = "window_event";

/// Mouse button identifier.
///
/// `None` is used by event kinds that do not involve a button (moves, scrolls)
/// and by consumers to mean "nothing is being tracked".
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum MouseButton {
    #[default]
    None,
    Left,
    Right,
    Middle,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum MouseEventKind {
    Moved,
    ButtonPressed,
    ButtonReleased,
    Scrolled,
}

/// Pointer event in logical pixels.
///
/// `position` is always the pointer position at the time of the event, even for
/// button and scroll events. `scroll` is only meaningful for `Scrolled` and is
/// expressed in lines (positive `y` scrolls away from the user).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MouseEvent {
    pub kind: MouseEventKind,
    pub button: MouseButton,
    pub position: Vec2,
    pub scroll: Vec2,
}

impl MouseEvent {
    pub fn moved(position: Vec2) -> Self {
        Self {
            kind: MouseEventKind::Moved,
            button: MouseButton::None,
            position,
            scroll: Vec2::ZERO,
        }
    }

    pub fn pressed(button: MouseButton, position: Vec2) -> Self {
        Self {
            kind: MouseEventKind::ButtonPressed,
            button,
            position,
            scroll: Vec2::ZERO,
        }
    }

    pub fn released(button: MouseButton, position: Vec2) -> Self {
        Self {
            kind: MouseEventKind::ButtonReleased,
            button,
            position,
            scroll: Vec2::ZERO,
        }
    }

    pub fn scrolled(scroll: Vec2, position: Vec2) -> Self {
        Self {
            kind: MouseEventKind::Scrolled,
            button: MouseButton::None,
            position,
            scroll,
        }
    }
}

/// Framebuffer resize, in physical pixels.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ResizeEvent {
    pub width: u32,
    pub height: u32,
}

impl ResizeEvent {
    /// Width over height, or `None` while the window is minimized.
    pub fn aspect(&self) -> Option<f32> {
        if self.width == 0 || self.height == 0 {
            return None;
        }
        Some(self.width as f32 / self.height as f32)
    }
}

/// Value broadcast on a dispatcher channel.
///
/// The set of variants is closed; consumers either `match` on it or ask for a
/// typed view with [`Event::downcast_ref`].
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Mouse(MouseEvent),
    Resized(ResizeEvent),
}

/// Payload types that can be viewed out of an [`Event`].
pub trait EventPayload: Sized + 'static {
    fn from_event(event: &Event) -> Option<&Self>;
    fn from_event_mut(event: &mut Event) -> Option<&mut Self>;
}

impl EventPayload for MouseEvent {
    fn from_event(event: &Event) -> Option<&Self> {
        match event {
            Event::Mouse(e) => Some(e),
            _ => None,
        }
    }

    fn from_event_mut(event: &mut Event) -> Option<&mut Self> {
        match event {
            Event::Mouse(e) => Some(e),
            _ => None,
        }
    }
}

impl EventPayload for ResizeEvent {
    fn from_event(event: &Event) -> Option<&Self> {
        match event {
            Event::Resized(e) => Some(e),
            _ => None,
        }
    }

    fn from_event_mut(event: &mut Event) -> Option<&mut Self> {
        match event {
            Event::Resized(e) => Some(e),
            _ => None,
        }
    }
}

impl Event {
    /// True when this event carries a `T`.
    #[inline]
    pub fn is<T: EventPayload>(&self) -> bool {
        T::from_event(self).is_some()
    }

    /// Typed view of the payload, `None` on variant mismatch.
    #[inline]
    pub fn downcast_ref<T: EventPayload>(&self) -> Option<&T> {
        T::from_event(self)
    }

    #[inline]
    pub fn downcast_mut<T: EventPayload>(&mut self) -> Option<&mut T> {
        T::from_event_mut(self)
    }

    #[inline]
    pub fn as_mouse(&self) -> Option<&MouseEvent> {
        self.downcast_ref()
    }
}

impl From<MouseEvent> for Event {
    fn from(e: MouseEvent) -> Self {
        Event::Mouse(e)
    }
}

impl From<ResizeEvent> for Event {
    fn from(e: ResizeEvent) -> Self {
        Event::Resized(e)
    }
}
