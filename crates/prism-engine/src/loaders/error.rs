use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Extension (with its leading dot, empty when absent) is not handled by the loader.
    #[error("Unsupported file type '{0}'")]
    UnsupportedFileType(String),

    #[error("File not found '{}'", .0.display())]
    FileNotFound(PathBuf),

    #[error("Failed to load resource '{}'", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("failed to spawn loader thread")]
    ThreadSpawn(#[source] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        assert_eq!(
            LoadError::UnsupportedFileType(".bmp".into()).to_string(),
            "Unsupported file type '.bmp'"
        );
        assert_eq!(
            LoadError::FileNotFound(PathBuf::from("assets/missing.png")).to_string(),
            "File not found 'assets/missing.png'"
        );
    }
}
