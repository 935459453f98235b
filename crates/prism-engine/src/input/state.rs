use std::collections::HashSet;

use glam::Vec2;

use crate::events::{MouseButton, MouseEvent};

/// Current pointer state for a single window.
///
/// Platform events are folded in here first; each method returns the
/// [`MouseEvent`] to broadcast, or `None` when the event carries nothing new.
#[derive(Debug, Default)]
pub struct InputState {
    /// Whether the window is focused.
    pub focused: bool,

    /// Pointer position in logical pixels, `None` while outside the window.
    pub pointer_pos: Option<Vec2>,

    /// Set of currently held mouse buttons.
    pub buttons_down: HashSet<MouseButton>,
}

impl InputState {
    /// Last known pointer position, or the origin.
    pub fn pointer(&self) -> Vec2 {
        self.pointer_pos.unwrap_or(Vec2::ZERO)
    }

    pub fn pointer_moved(&mut self, position: Vec2) -> Option<MouseEvent> {
        if self.pointer_pos == Some(position) {
            return None;
        }
        self.pointer_pos = Some(position);
        Some(MouseEvent::moved(position))
    }

    pub fn pointer_left(&mut self) {
        self.pointer_pos = None;
    }

    /// Records a press/release. Repeated presses of a held button are dropped.
    pub fn button(&mut self, button: MouseButton, pressed: bool) -> Option<MouseEvent> {
        if button == MouseButton::None {
            return None;
        }

        let position = self.pointer();
        if pressed {
            self.buttons_down
                .insert(button)
                .then(|| MouseEvent::pressed(button, position))
        } else {
            self.buttons_down
                .remove(&button)
                .then(|| MouseEvent::released(button, position))
        }
    }

    pub fn wheel(&mut self, lines: Vec2) -> Option<MouseEvent> {
        (lines != Vec2::ZERO).then(|| MouseEvent::scrolled(lines, self.pointer()))
    }

    /// Updates focus. On focus loss every held button is released.
    pub fn focus(&mut self, focused: bool) -> Vec<MouseEvent> {
        self.focused = focused;
        if focused {
            return Vec::new();
        }

        let position = self.pointer();
        let mut released: Vec<MouseButton> = self.buttons_down.drain().collect();
        released.sort_by_key(|b| *b as u8);
        released
            .into_iter()
            .map(|b| MouseEvent::released(b, position))
            .collect()
    }

    pub fn button_down(&self, button: MouseButton) -> bool {
        self.buttons_down.contains(&button)
    }
}
