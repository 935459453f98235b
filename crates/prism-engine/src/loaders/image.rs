use std::path::Path;

use super::{LoadError, Loader};

/// Decoded image, always expanded to RGBA8.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub filename: String,
    pub width: u32,
    pub height: u32,
    /// Channel count of the source file before expansion.
    pub depth: u8,
    /// Row-major RGBA8 pixels, `width * height * 4` bytes.
    pub data: Vec<u8>,
}

impl Image {
    /// Builds an image from raw RGBA8 pixels; `None` if the length does not match.
    pub fn from_rgba8(filename: impl Into<String>, width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        if data.len() != width as usize * height as usize * 4 {
            return None;
        }
        Some(Self {
            filename: filename.into(),
            width,
            height,
            depth: 4,
            data,
        })
    }
}

/// PNG/JPEG loader backed by the `image` crate.
#[derive(Debug, Copy, Clone, Default)]
pub struct ImageLoader;

impl ImageLoader {
    pub fn new() -> Self {
        Self
    }
}

impl Loader for ImageLoader {
    type Resource = Image;

    fn valid_extensions(&self) -> &[&str] {
        &[".png", ".jpg", ".jpeg"]
    }

    fn load_impl(&self, path: &Path) -> Result<Image, LoadError> {
        let decoded = image::open(path).map_err(|e| LoadError::Decode {
            path: path.to_path_buf(),
            source: Box::new(e),
        })?;

        let depth = decoded.color().channel_count();
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();

        log::debug!("decoded {} ({width}x{height}, {depth} channels)", path.display());

        Ok(Image {
            filename: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            width,
            height,
            depth,
            data: rgba.into_raw(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::mpsc;
    use std::time::Duration;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("prism-{}-{name}", std::process::id()))
    }

    fn write_png(name: &str) -> PathBuf {
        let path = temp_path(name);
        let mut img = image::RgbImage::new(3, 2);
        img.put_pixel(0, 0, image::Rgb([255, 0, 0]));
        img.save(&path).unwrap();
        path
    }

    // ── validation ────────────────────────────────────────────────────────

    #[test]
    fn rejects_unknown_extension() {
        let err = ImageLoader.load(Path::new("texture.bmp")).unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedFileType(ref e) if e == ".bmp"));
    }

    #[test]
    fn extension_check_is_case_sensitive() {
        let err = ImageLoader.load(Path::new("texture.PNG")).unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedFileType(ref e) if e == ".PNG"));
    }

    #[test]
    fn rejects_missing_extension() {
        let err = ImageLoader.load(Path::new("texture")).unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedFileType(ref e) if e.is_empty()));
    }

    #[test]
    fn reports_missing_file() {
        let path = temp_path("does-not-exist.png");
        let err = ImageLoader.load(&path).unwrap_err();
        assert!(matches!(err, LoadError::FileNotFound(ref p) if *p == path));
    }

    // ── decoding ──────────────────────────────────────────────────────────

    #[test]
    fn decodes_png_to_rgba() {
        let path = write_png("decode.png");
        let image = ImageLoader.load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!((image.width, image.height), (3, 2));
        assert_eq!(image.depth, 3);
        assert_eq!(image.data.len(), 3 * 2 * 4);
        assert_eq!(&image.data[..4], &[255, 0, 0, 255]);
        assert!(image.filename.ends_with("decode.png"));
    }

    #[test]
    fn corrupt_file_is_decode_error() {
        let path = temp_path("corrupt.png");
        std::fs::write(&path, b"not a png").unwrap();
        let err = ImageLoader.load(&path).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, LoadError::Decode { .. }));
    }

    // ── async ─────────────────────────────────────────────────────────────

    #[test]
    fn async_load_calls_back_from_helper_thread() {
        let path = write_png("async.png");
        let (tx, rx) = mpsc::channel();

        let handle = ImageLoader
            .load_async(path.clone(), move |result| {
                let name = std::thread::current().name().map(str::to_owned);
                tx.send((result.map(|img| img.width), name)).unwrap();
            })
            .expect("thread spawned");
        handle.join().unwrap();

        let (width, thread_name) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(width.unwrap(), 3);
        assert!(thread_name.unwrap().starts_with("prism-loader:"));
    }

    #[test]
    fn async_validation_failure_is_synchronous() {
        let (tx, rx) = mpsc::channel();
        let handle = ImageLoader.load_async("model.obj", move |result| {
            tx.send(result.is_err()).unwrap();
        });
        assert!(handle.is_none());
        assert!(rx.try_recv().unwrap());
    }

    #[test]
    fn from_rgba8_checks_length() {
        assert!(Image::from_rgba8("a", 2, 2, vec![0; 16]).is_some());
        assert!(Image::from_rgba8("a", 2, 2, vec![0; 15]).is_none());
    }
}
