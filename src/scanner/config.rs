//! Configuration for folder scanning behavior.

use crate::session::FileKind;

/// Configuration for folder scanning behavior.
///
/// The extension sets are configuration constants, not a protocol detail;
/// hosts may extend them without touching the scan algorithm.
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// Top-level category directories the convention recognizes.
    pub category_directories: Vec<String>,
    /// Categories whose act folders contribute support docs, in append
    /// order.
    pub support_doc_categories: Vec<String>,
    /// Directory names under `characters/` holding player-character sheets.
    pub pc_directory_names: Vec<String>,
    /// Markdown file extensions (lowercase, no dot).
    pub markdown_extensions: Vec<String>,
    /// Image file extensions (lowercase, no dot).
    pub image_extensions: Vec<String>,
    /// Audio file extensions (lowercase, no dot).
    pub audio_extensions: Vec<String>,
    /// Minimum number of recognized category directories for a folder to
    /// count as a plausible session folder (soft signal only).
    pub min_plausible_categories: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            category_directories: to_strings(&[
                "characters",
                "images",
                "maps",
                "music",
                "plan",
                "threats",
            ]),
            support_doc_categories: to_strings(&["characters", "threats", "maps"]),
            pc_directory_names: to_strings(&["PCs", "pcs"]),
            markdown_extensions: to_strings(&["md", "markdown", "mdown"]),
            image_extensions: to_strings(&[
                "avif", "bmp", "gif", "jpeg", "jpg", "png", "svg", "webp",
            ]),
            audio_extensions: to_strings(&[
                "aac", "flac", "m4a", "mp3", "oga", "ogg", "opus", "wav", "weba",
            ]),
            min_plausible_categories: 2,
        }
    }
}

impl ScannerConfig {
    /// Classifies a filename by its extension.
    #[must_use]
    pub fn kind_for_filename(&self, filename: &str) -> Option<FileKind> {
        let (_, extension) = filename.rsplit_once('.')?;
        let extension = extension.to_lowercase();
        if self.markdown_extensions.contains(&extension) {
            Some(FileKind::Markdown)
        } else if self.image_extensions.contains(&extension) {
            Some(FileKind::Image)
        } else if self.audio_extensions.contains(&extension) {
            Some(FileKind::Audio)
        } else {
            None
        }
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(ToString::to_string).collect()
}

#[cfg(test)]
mod tests {
    use crate::{scanner::config::ScannerConfig, session::FileKind};

    #[test]
    fn test_kind_for_filename() {
        let config = ScannerConfig::default();
        assert_eq!(config.kind_for_filename("notes.md"), Some(FileKind::Markdown));
        assert_eq!(config.kind_for_filename("map.PNG"), Some(FileKind::Image));
        assert_eq!(config.kind_for_filename("drums.ogg"), Some(FileKind::Audio));
        assert_eq!(config.kind_for_filename("archive.zip"), None);
        assert_eq!(config.kind_for_filename("no_extension"), None);
    }
}
