//! Content library readiness classification
//!
//! Derives each item's lifecycle state from filesystem evidence: an
//! encoded manifest means READY, an encoder run marker means NOT_READY,
//! neither means INCOMPLETE. Nothing here is cached or persisted; every
//! query re-reads the evidence.

use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::models::{ReadinessState, VideoEntry};
use crate::{Error, Result};

/// Manifest file an item directory must contain to be playable.
pub const MANIFEST_FILE: &str = "manifest.mpd";

/// Content library service over the media root and the encoder run
/// directory.
#[derive(Debug, Clone)]
pub struct LibraryService {
    media_dir: PathBuf,
    run_dir: PathBuf,
}

impl LibraryService {
    #[must_use]
    pub fn new(media_dir: impl Into<PathBuf>, run_dir: impl Into<PathBuf>) -> Self {
        Self {
            media_dir: media_dir.into(),
            run_dir: run_dir.into(),
        }
    }

    /// Reject identifiers that could escape the media root.
    ///
    /// Must be called before any filesystem access on behalf of a
    /// client-supplied name.
    pub fn validate_name(name: &str) -> Result<()> {
        if name.is_empty()
            || name == "."
            || name.contains(['/', '\\', '\0'])
            || name.contains("..")
        {
            return Err(Error::InvalidInput(format!("Invalid video name: {name:?}")));
        }
        Ok(())
    }

    /// Classify one item from filesystem evidence.
    ///
    /// Pure function of two facts: manifest present, run marker present.
    /// The caller is responsible for having validated the name.
    #[must_use]
    pub fn classify(&self, name: &str) -> ReadinessState {
        if self.media_dir.join(name).join(MANIFEST_FILE).exists() {
            ReadinessState::Ready
        } else if self.run_marker_path(name).exists() {
            ReadinessState::NotReady
        } else {
            ReadinessState::Incomplete
        }
    }

    /// List every item directory under the media root with its state.
    ///
    /// An unreadable media root degrades to an empty listing; the read
    /// path stays available even when the evidence is not.
    #[must_use]
    pub fn list(&self) -> Vec<VideoEntry> {
        let entries = match std::fs::read_dir(&self.media_dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(
                    media_dir = %self.media_dir.display(),
                    error = %e,
                    "Media root unreadable, returning empty listing"
                );
                return Vec::new();
            }
        };

        let mut videos = Vec::new();
        for entry in entries.flatten() {
            if !entry.path().is_dir() {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            // A name the delivery paths would reject is never listed.
            if Self::validate_name(&name).is_err() {
                continue;
            }

            let created_at = entry
                .metadata()
                .ok()
                .and_then(|m| m.created().ok())
                .map(DateTime::<Utc>::from);

            videos.push(VideoEntry {
                state: self.classify(&name),
                name,
                created_at,
            });
        }

        videos.sort_by(|a, b| a.name.cmp(&b.name));
        videos
    }

    /// Absolute path of an item's manifest, if the item is READY.
    pub fn manifest_path(&self, name: &str) -> Result<PathBuf> {
        Self::validate_name(name)?;

        let path = self.media_dir.join(name).join(MANIFEST_FILE);
        if path.is_file() {
            Ok(path)
        } else {
            Err(Error::NotFound(format!("No manifest for {name}")))
        }
    }

    /// Absolute path of an arbitrary file inside an item's directory.
    pub fn segment_path(&self, name: &str, file: &str) -> Result<PathBuf> {
        Self::validate_name(name)?;
        Self::validate_name(file)?;

        let path = self.media_dir.join(name).join(file);
        if path.is_file() {
            Ok(path)
        } else {
            Err(Error::NotFound(format!("No such segment: {name}/{file}")))
        }
    }

    fn run_marker_path(&self, name: &str) -> PathBuf {
        self.run_dir.join(format!("transcode_{name}.run"))
    }
}
