//! Input subsystem.
//!
//! Platform events are folded into an [`InputState`] and re-emitted as
//! [`crate::events::Event`]s; nothing outside `platform` sees winit input types.

pub(crate) mod platform;
mod state;

pub use state::InputState;
