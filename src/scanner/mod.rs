//! Convention-based session folder auto-detection.
//!
//! Given a [`FileStore`] rooted at a session folder, the scanner infers a
//! complete [`SessionConfig`] without user input: top-level category
//! directories hold per-act subdirectories, and the union of act numbers
//! found across all categories determines which parts exist. A missing
//! `images/act2` never blocks `plan/act2` from producing a part, and any
//! unreadable subdirectory is treated as absent rather than fatal.

use std::collections::{BTreeMap, BTreeSet};

use {
    regex::Regex,
    tracing::{debug, warn},
};

use crate::{
    session::{AudioTrack, CharacterStats, FileKind, FileReference, Part, Playlist, SessionConfig},
    store::{DirEntry, FileStore, StoreError},
};

mod config;
pub mod duration;
mod stats;

pub use {
    config::ScannerConfig,
    duration::{DurationHint, DurationHintConfig, extract_duration_hint},
    stats::StatExtractor,
};

/// Result of scanning a session folder.
///
/// Zero detected parts is not an error: it tells the calling UI that
/// nothing was recognized and the GM should be routed toward manual setup.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    /// The inferred session configuration.
    pub config: SessionConfig,
    /// Whether the folder looked like a session folder at all (at least
    /// two recognized category directories). Soft signal only; scanning
    /// proceeds regardless.
    pub plausible_structure: bool,
}

impl ScanOutcome {
    /// Whether the scan found no usable parts.
    #[must_use]
    pub fn nothing_detected(&self) -> bool {
        self.config.parts.is_empty()
    }
}

/// Convention-based scanner producing a [`SessionConfig`] from a folder.
pub struct SessionScanner {
    config: ScannerConfig,
    act_pattern: Regex,
    stat_extractor: StatExtractor,
}

/// Scans `store` with the default [`ScannerConfig`].
///
/// # Errors
///
/// Returns `StoreError` only when the root itself cannot be listed; every
/// failure below the root is tolerated.
pub async fn scan_session_folder<S: FileStore>(store: &S) -> Result<ScanOutcome, StoreError> {
    SessionScanner::new(ScannerConfig::default()).scan(store).await
}

impl SessionScanner {
    /// Creates a scanner with the given configuration.
    #[must_use]
    pub fn new(config: ScannerConfig) -> Self {
        Self {
            config,
            act_pattern: Regex::new(r"(?i)^act(\d+)$").expect("valid act pattern"),
            stat_extractor: StatExtractor::new(),
        }
    }

    /// Scans the folder behind `store` into a [`ScanOutcome`].
    ///
    /// # Errors
    ///
    /// Returns `StoreError` only when the root itself cannot be listed
    /// (no granted handle, revoked permission). Unreadable subdirectories
    /// are treated as absent.
    pub async fn scan<S: FileStore>(&self, store: &S) -> Result<ScanOutcome, StoreError> {
        let root_entries = store.list("").await?;
        let present: Vec<String> = self
            .config
            .category_directories
            .iter()
            .filter(|category| {
                root_entries
                    .iter()
                    .any(|entry| entry.is_directory && entry.name == **category)
            })
            .cloned()
            .collect();
        let plausible_structure = present.len() >= self.config.min_plausible_categories;

        // Union of act numbers across every category; each category also
        // remembers the directory name it saw so `Act2`/`act2` both resolve.
        let mut act_numbers = BTreeSet::new();
        let mut act_dirs: BTreeMap<&str, BTreeMap<u32, String>> = BTreeMap::new();
        for category in &present {
            for entry in list_or_absent(store, category).await {
                if !entry.is_directory {
                    continue;
                }
                if let Some(number) = self.act_number(&entry.name) {
                    act_numbers.insert(number);
                    act_dirs
                        .entry(category.as_str())
                        .or_default()
                        .entry(number)
                        .or_insert(entry.name);
                }
            }
        }

        let mut parts = Vec::new();
        if act_numbers.is_empty() {
            if let Some(part) = self.scan_flat_part(store, &present).await {
                parts.push(part);
            }
        } else {
            for number in &act_numbers {
                parts.push(self.scan_act_part(store, *number, &act_dirs).await);
            }
        }

        let (player_character_names, player_character_stats) =
            self.scan_player_characters(store, &present).await;

        let config = SessionConfig {
            root_folder_name: store.root_name(),
            parts,
            player_character_names,
            player_character_stats,
        };
        debug!(
            parts = config.parts.len(),
            plausible_structure, "Scanned session folder"
        );
        Ok(ScanOutcome {
            config,
            plausible_structure,
        })
    }

    fn act_number(&self, directory_name: &str) -> Option<u32> {
        let captures = self.act_pattern.captures(directory_name)?;
        captures[1].parse().ok()
    }

    /// Builds the part for one act number from whichever categories have a
    /// matching act directory.
    async fn scan_act_part<S: FileStore>(
        &self,
        store: &S,
        number: u32,
        act_dirs: &BTreeMap<&str, BTreeMap<u32, String>>,
    ) -> Part {
        let dir_for = |category: &str| -> Option<String> {
            let name = act_dirs.get(category)?.get(&number)?;
            Some(format!("{category}/{name}"))
        };
        let id = format!("act-{number}");

        let (plan_file, mut support_docs) = match dir_for("plan") {
            Some(dir) => self.collect_plan(store, &dir).await,
            None => (None, Vec::new()),
        };
        let name = plan_file
            .as_ref()
            .map_or_else(|| format!("Act {number}"), |plan| derive_part_name(&plan.name));

        let images = match dir_for("images") {
            Some(dir) => self.files_of_kind(store, &dir, FileKind::Image).await,
            None => Vec::new(),
        };

        for category in &self.config.support_doc_categories {
            if let Some(dir) = dir_for(category) {
                support_docs
                    .extend(self.files_of_kind(store, &dir, FileKind::Markdown).await);
            }
        }

        let (ambient_playlist, event_playlists) = match dir_for("music") {
            Some(dir) => self.collect_music(store, &dir, &id).await,
            None => (Vec::new(), Vec::new()),
        };

        Part {
            id,
            name,
            plan_file,
            images,
            support_docs,
            ambient_playlist,
            event_playlists,
        }
    }

    /// Fallback when no act directories exist anywhere: one part built from
    /// the top-level category directories themselves, or nothing at all if
    /// they hold no usable files.
    async fn scan_flat_part<S: FileStore>(&self, store: &S, present: &[String]) -> Option<Part> {
        let has = |category: &str| present.iter().any(|name| name == category);
        let id = "part-1".to_string();

        let (plan_file, mut support_docs) = if has("plan") {
            self.collect_plan(store, "plan").await
        } else {
            (None, Vec::new())
        };
        let images = if has("images") {
            self.files_of_kind(store, "images", FileKind::Image).await
        } else {
            Vec::new()
        };
        for category in &self.config.support_doc_categories {
            if has(category) {
                support_docs
                    .extend(self.files_of_kind(store, category, FileKind::Markdown).await);
            }
        }
        let (ambient_playlist, event_playlists) = if has("music") {
            self.collect_music(store, "music", &id).await
        } else {
            (Vec::new(), Vec::new())
        };

        let empty = plan_file.is_none()
            && images.is_empty()
            && support_docs.is_empty()
            && ambient_playlist.is_empty()
            && event_playlists.is_empty();
        if empty {
            return None;
        }

        Some(Part {
            id,
            name: "Part 1".to_string(),
            plan_file,
            images,
            support_docs,
            ambient_playlist,
            event_playlists,
        })
    }

    /// First markdown file becomes the plan, the rest become support docs.
    async fn collect_plan<S: FileStore>(
        &self,
        store: &S,
        dir: &str,
    ) -> (Option<FileReference>, Vec<FileReference>) {
        let mut markdown = self.files_of_kind(store, dir, FileKind::Markdown).await;
        if markdown.is_empty() {
            return (None, Vec::new());
        }
        let plan = markdown.remove(0);
        (Some(plan), markdown)
    }

    /// Direct audio files form the ambient playlist; each subfolder with at
    /// least one audio file becomes a named event playlist. Subfolders with
    /// none are skipped entirely.
    async fn collect_music<S: FileStore>(
        &self,
        store: &S,
        dir: &str,
        playlist_id_prefix: &str,
    ) -> (Vec<AudioTrack>, Vec<Playlist>) {
        let mut ambient = Vec::new();
        let mut event_playlists = Vec::new();
        for entry in list_or_absent(store, dir).await {
            if entry.is_directory {
                let subdir = format!("{dir}/{}", entry.name);
                let tracks = self.files_of_kind(store, &subdir, FileKind::Audio).await;
                if tracks.is_empty() {
                    continue;
                }
                event_playlists.push(Playlist {
                    id: format!("{playlist_id_prefix}/{}", entry.name),
                    name: entry.name,
                    tracks,
                });
            } else if self.config.kind_for_filename(&entry.name) == Some(FileKind::Audio) {
                ambient.push(FileReference::new(
                    format!("{dir}/{}", entry.name),
                    FileKind::Audio,
                ));
            }
        }
        (ambient, event_playlists)
    }

    /// Files of one kind directly inside `dir`, in listing (lexicographic)
    /// order.
    async fn files_of_kind<S: FileStore>(
        &self,
        store: &S,
        dir: &str,
        kind: FileKind,
    ) -> Vec<FileReference> {
        list_or_absent(store, dir)
            .await
            .into_iter()
            .filter(|entry| {
                !entry.is_directory && self.config.kind_for_filename(&entry.name) == Some(kind)
            })
            .map(|entry| FileReference::new(format!("{dir}/{}", entry.name), kind))
            .collect()
    }

    /// Reads the player-character roster and per-character stats from the
    /// first PC directory that exists under `characters/`.
    async fn scan_player_characters<S: FileStore>(
        &self,
        store: &S,
        present: &[String],
    ) -> (BTreeSet<String>, BTreeMap<String, CharacterStats>) {
        let mut names = BTreeSet::new();
        let mut stats = BTreeMap::new();
        if !present.iter().any(|name| name == "characters") {
            return (names, stats);
        }

        let mut sheets = Vec::new();
        for dir_name in &self.config.pc_directory_names {
            let dir = format!("characters/{dir_name}");
            match store.list(&dir).await {
                Ok(entries) => {
                    sheets = entries
                        .into_iter()
                        .filter(|entry| {
                            !entry.is_directory
                                && self.config.kind_for_filename(&entry.name)
                                    == Some(FileKind::Markdown)
                        })
                        .map(|entry| (format!("{dir}/{}", entry.name), entry.name))
                        .collect();
                    break;
                }
                Err(StoreError::NotFound { .. }) => {}
                Err(error) => {
                    warn!(dir, %error, "Treating unreadable PC directory as absent");
                    break;
                }
            }
        }

        for (path, filename) in sheets {
            let name = filename
                .rsplit_once('.')
                .map_or(filename.as_str(), |(stem, _)| stem)
                .to_string();
            match store.read_text(&path).await {
                Ok(content) => {
                    let extracted = self.stat_extractor.extract(&content);
                    if extracted.max_hp.is_some() || extracted.defense_score.is_some() {
                        stats.insert(name.clone(), extracted);
                    }
                }
                Err(error) => {
                    warn!(path, %error, "Skipping unreadable character sheet");
                }
            }
            names.insert(name);
        }
        (names, stats)
    }
}

/// Lists a directory, treating a missing or unreadable one as empty.
async fn list_or_absent<S: FileStore>(store: &S, dir: &str) -> Vec<DirEntry> {
    match store.list(dir).await {
        Ok(entries) => entries,
        Err(StoreError::NotFound { .. }) => Vec::new(),
        Err(error) => {
            warn!(dir, %error, "Treating unreadable directory as absent");
            Vec::new()
        }
    }
}

/// Derives a part display name from a plan filename: extension stripped,
/// underscores become spaces, each word capitalized except short non-first
/// words, which stay lowercase.
fn derive_part_name(filename: &str) -> String {
    let stem = filename.rsplit_once('.').map_or(filename, |(stem, _)| stem);
    stem.replace('_', " ")
        .split_whitespace()
        .enumerate()
        .map(|(index, word)| {
            if index > 0 && word.chars().count() <= 2 {
                word.to_lowercase()
            } else {
                capitalize(word)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
