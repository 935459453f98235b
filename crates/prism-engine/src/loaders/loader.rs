use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;

use super::LoadError;

/// Result handed to load callbacks.
pub type LoadResult<R> = Result<Arc<R>, LoadError>;

/// File-backed resource loader.
///
/// Implementors list the extensions they accept and decode a validated path;
/// validation, logging and the background variant are provided.
pub trait Loader: Send + Sync + 'static {
    type Resource: Send + Sync + 'static;

    /// Accepted extensions including the leading dot, compared case-sensitively.
    fn valid_extensions(&self) -> &[&str];

    /// Decodes the resource at `path`. Only called after validation.
    fn load_impl(&self, path: &Path) -> Result<Self::Resource, LoadError>;

    /// Checks the extension, then that the file exists.
    fn validate(&self, path: &Path) -> Result<(), LoadError> {
        let ext = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        if !self.valid_extensions().contains(&ext.as_str()) {
            return Err(LoadError::UnsupportedFileType(ext));
        }
        if !path.exists() {
            return Err(LoadError::FileNotFound(path.to_path_buf()));
        }
        Ok(())
    }

    fn load(&self, path: &Path) -> LoadResult<Self::Resource> {
        self.validate(path)?;
        match self.load_impl(path) {
            Ok(resource) => Ok(Arc::new(resource)),
            Err(e) => {
                log::error!("{e}");
                Err(e)
            }
        }
    }

    /// Validates on the calling thread, then decodes on a helper thread.
    ///
    /// `callback` runs on the helper thread once decoding finishes. Validation
    /// and spawn failures are reported to `callback` on the calling thread and
    /// no handle is returned.
    fn load_async<F>(&self, path: impl Into<PathBuf>, callback: F) -> Option<JoinHandle<()>>
    where
        Self: Clone,
        F: FnOnce(LoadResult<Self::Resource>) + Send + 'static,
    {
        let path = path.into();
        if let Err(e) = self.validate(&path) {
            callback(Err(e));
            return None;
        }

        let loader = self.clone();
        let name = format!(
            "prism-loader:{}",
            path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default()
        );

        // Keep the callback reachable if the spawn itself fails.
        let slot = Arc::new(std::sync::Mutex::new(Some(callback)));
        let worker_slot = Arc::clone(&slot);

        let spawned = std::thread::Builder::new().name(name).spawn(move || {
            let result = match loader.load_impl(&path) {
                Ok(resource) => Ok(Arc::new(resource)),
                Err(e) => {
                    log::error!("{e}");
                    Err(e)
                }
            };
            let callback = worker_slot.lock().ok().and_then(|mut c| c.take());
            if let Some(callback) = callback {
                callback(result);
            }
        });

        match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::error!("failed to spawn loader thread: {e}");
                let callback = slot.lock().ok().and_then(|mut c| c.take());
                if let Some(callback) = callback {
                    callback(Err(LoadError::ThreadSpawn(e)));
                }
                None
            }
        }
    }
}
