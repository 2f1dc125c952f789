//! Per-variant persisted state: one JSON file per variant holding the last
//! prompt, selected options, conversation, undo stack and snapshots.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::config::Config;
use crate::history::{SnapshotLog, Transcript, UndoStack};
use crate::variant::{GenerationOptions, Variant};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub variant: Variant,
    #[serde(default)]
    pub last_prompt: String,
    #[serde(default)]
    pub options: GenerationOptions,
    #[serde(default)]
    pub transcript: Transcript,
    #[serde(default)]
    pub undo: UndoStack<String>,
    #[serde(default)]
    pub snapshots: SnapshotLog,
}

impl SessionState {
    pub fn new(variant: Variant) -> Self {
        Self {
            variant,
            last_prompt: String::new(),
            options: GenerationOptions::default(),
            transcript: Transcript::new(),
            undo: UndoStack::new(),
            snapshots: SnapshotLog::new(),
        }
    }

    /// The artifact at the current undo position.
    pub fn current_code(&self) -> Option<&str> {
        self.undo.current().map(String::as_str)
    }
}

pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `<config_dir>/readmesmith/sessions`
    pub fn default_location() -> Result<Self> {
        Ok(Self::new(Config::config_dir()?.join("sessions")))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, variant: Variant) -> PathBuf {
        self.dir.join(format!("{}.json", variant.storage_key()))
    }

    /// Load the saved session. A missing file yields a fresh session; an
    /// unreadable or corrupt one is logged and replaced by a fresh session.
    pub fn load(&self, variant: Variant) -> Result<SessionState> {
        let path = self.path_for(variant);
        if !path.exists() {
            return Ok(SessionState::new(variant));
        }

        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot read session file, starting fresh");
                return Ok(SessionState::new(variant));
            }
        };

        match serde_json::from_slice::<SessionState>(&bytes) {
            Ok(mut state) => {
                state.variant = variant;
                state.undo.normalize();
                Ok(state)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "discarding corrupt session file");
                Ok(SessionState::new(variant))
            }
        }
    }

    /// Write the session atomically through a uniquely named temp file in
    /// the same directory.
    pub fn save(&self, state: &SessionState) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating {}", self.dir.display()))?;

        let path = self.path_for(state.variant);
        let content = serde_json::to_string_pretty(state)?;
        let mut tmp = NamedTempFile::new_in(&self.dir)
            .with_context(|| format!("creating temp file in {}", self.dir.display()))?;
        tmp.write_all(content.as_bytes())?;
        tmp.persist(&path)
            .with_context(|| format!("replacing {}", path.display()))?;

        tracing::debug!(path = %path.display(), "session saved");
        Ok(())
    }

    pub fn clear(&self, variant: Variant) -> Result<()> {
        let path = self.path_for(variant);
        if path.exists() {
            fs::remove_file(&path).with_context(|| format!("removing {}", path.display()))?;
        }
        Ok(())
    }
}
