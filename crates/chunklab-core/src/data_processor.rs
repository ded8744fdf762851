use chrono::Utc;
use std::hash::Hasher;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use twox_hash::XxHash64;

use crate::error::ExtractError;
use crate::types::{FileType, UploadedFile};

/// Turns files on disk into [`UploadedFile`]s holding plain text.
///
/// Text, Markdown and CSV are read as UTF-8 (lossy on invalid bytes). PDF
/// extraction is not handled here and is reported as unsupported.
#[derive(Debug, Default)]
pub struct DataProcessor;

impl DataProcessor {
    pub fn new() -> Self { Self }

    /// Load every path concurrently. Fails as a whole if any file cannot be read,
    /// so callers never persist half of an upload batch.
    pub async fn load_files(&self, paths: &[PathBuf]) -> Result<Vec<UploadedFile>, ExtractError> {
        let files = futures::future::try_join_all(paths.iter().map(|p| self.load_file(p))).await?;
        info!("Loaded {} files", files.len());
        Ok(files)
    }

    pub async fn load_file(&self, path: &Path) -> Result<UploadedFile, ExtractError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");
        let file_type = match FileType::from_extension(ext) {
            Some(FileType::Pdf) => return Err(ExtractError::Unsupported(format!("{name} (PDF text extraction is not available)"))),
            Some(t) => t,
            None => return Err(ExtractError::Unsupported(name)),
        };
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| ExtractError::Io { path: path.to_path_buf(), source })?;
        let size = bytes.len() as u64;
        let content = match String::from_utf8(bytes) {
            Ok(content) => content,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).to_string(),
        };
        debug!("Read {} ({} bytes)", name, size);
        Ok(UploadedFile { id: file_id(&name, &content), name, file_type, size, content, uploaded_at: Utc::now() })
    }

    /// Supported files under `root`, sorted for a stable upload order.
    pub fn list_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(root).into_iter().filter_map(|e| e.ok()).filter(|e| e.file_type().is_file()) {
            let path = entry.path();
            let supported = path
                .extension()
                .and_then(|s| s.to_str())
                .and_then(FileType::from_extension)
                .is_some_and(|t| t != FileType::Pdf);
            if supported { files.push(path.to_path_buf()); }
        }
        files.sort();
        files
    }
}

/// Content-addressed id: the same name and text always map to the same file.
pub fn file_id(name: &str, content: &str) -> String {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(name.as_bytes());
    hasher.write_u8(0);
    hasher.write(content.as_bytes());
    format!("{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_id_is_stable_and_content_sensitive() {
        assert_eq!(file_id("a.txt", "hello"), file_id("a.txt", "hello"));
        assert_ne!(file_id("a.txt", "hello"), file_id("a.txt", "hello!"));
        assert_ne!(file_id("a.txt", "hello"), file_id("b.txt", "hello"));
        assert_eq!(file_id("a.txt", "x").len(), 16);
    }
}
