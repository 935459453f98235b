//! File loaders.
//!
//! [`Loader`] validates a path (extension, existence) before handing it to the
//! concrete decoder; [`ImageLoader`] decodes PNG and JPEG into RGBA8 [`Image`]s.

mod error;
mod image;
mod loader;

pub use error::LoadError;
pub use self::image::{Image, ImageLoader};
pub use loader::{LoadResult, Loader};
