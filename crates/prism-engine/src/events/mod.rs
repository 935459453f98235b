//! Event model and channel dispatcher.
//!
//! Producers (the window runtime) publish [`Event`] values on named channels;
//! consumers (controls, application code) subscribe with closures. The
//! dispatcher holds listeners weakly: a listener lives exactly as long as its
//! owner keeps the [`Listener`] or [`Subscription`] alive.

mod dispatcher;
mod event;

pub use dispatcher::{EventDispatcher, Listener, Subscription};
pub use event::{
    Event,
    EventPayload,
    MouseButton,
    MouseEvent,
    MouseEventKind,
    ResizeEvent,
    MOUSE_EVENT,
    WINDOW_EVENT,
};
