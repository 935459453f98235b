//! Input-driven camera controllers.

mod orbit;

pub use orbit::{MIN_RADIUS, OrbitControls, VERTICAL_LIMIT};
