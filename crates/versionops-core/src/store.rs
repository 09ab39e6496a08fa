//! Agent state persistence with atomic replace

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::agent_state::AgentState;
use crate::error::StateError;

/// Version of the on-disk state envelope
pub const STATE_SCHEMA_VERSION: u32 = 1;

/// A single byte blob that is read whole and replaced whole.
///
/// `replace` must be atomic: a reader sees either the previous blob or the new
/// one, never a mix.
pub trait BlobStore: Send + Sync {
    /// Current blob, `None` if nothing was stored yet
    fn read(&self) -> io::Result<Option<Vec<u8>>>;

    fn replace(&self, bytes: &[u8]) -> io::Result<()>;
}

/// File-backed blob replaced via write-to-temp, fsync and rename
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    path: PathBuf,
}

impl FsBlobStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn dir(&self) -> &Path {
        self.path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
    }
}

impl BlobStore for FsBlobStore {
    fn read(&self) -> io::Result<Option<Vec<u8>>> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn replace(&self, bytes: &[u8]) -> io::Result<()> {
        let dir = self.dir();
        std::fs::create_dir_all(dir)?;

        // Same directory as the target so the rename never crosses filesystems
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        Ok(())
    }
}

/// In-memory blob, for tests and one-off runs
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    data: Mutex<Option<Vec<u8>>>,
}

impl MemoryBlobStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemoryBlobStore {
    fn read(&self) -> io::Result<Option<Vec<u8>>> {
        Ok(self
            .data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn replace(&self, bytes: &[u8]) -> io::Result<()> {
        *self.data.lock().unwrap_or_else(PoisonError::into_inner) = Some(bytes.to_vec());
        Ok(())
    }
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    schema_version: u32,
    state: &'a AgentState,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    schema_version: u32,
    state: AgentState,
}

/// Loads and saves [`AgentState`] through a [`BlobStore`]
#[derive(Clone)]
pub struct StateStore {
    blob: Arc<dyn BlobStore>,
}

impl std::fmt::Debug for StateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateStore").finish_non_exhaustive()
    }
}

impl StateStore {
    pub fn new(blob: Arc<dyn BlobStore>) -> Self {
        Self { blob }
    }

    /// Store backed by a file at `path`
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(FsBlobStore::new(path)))
    }

    /// Store kept in memory only
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBlobStore::new()))
    }

    /// Last saved state; a fresh default if absent or unreadable
    #[must_use]
    pub fn load(&self) -> AgentState {
        let bytes = match self.blob.read() {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!("no saved state, starting fresh");
                return AgentState::default();
            }
            Err(e) => {
                warn!(error = %e, "cannot read saved state, starting fresh");
                return AgentState::default();
            }
        };

        match serde_json::from_slice::<Envelope>(&bytes) {
            Ok(envelope) => {
                if envelope.schema_version > STATE_SCHEMA_VERSION {
                    debug!(
                        found = envelope.schema_version,
                        supported = STATE_SCHEMA_VERSION,
                        "state written by a newer agent"
                    );
                }
                envelope.state
            }
            Err(e) => {
                warn!(error = %e, "saved state is corrupt, starting fresh");
                AgentState::default()
            }
        }
    }

    /// Atomically replace the saved state
    ///
    /// # Errors
    /// Returns error if the state cannot be encoded or written
    pub fn save(&self, state: &AgentState) -> Result<(), StateError> {
        let bytes = serde_json::to_vec_pretty(&EnvelopeRef {
            schema_version: STATE_SCHEMA_VERSION,
            state,
        })?;
        self.blob.replace(&bytes)?;
        debug!(cycle = state.cycle_count, "state saved");
        Ok(())
    }
}
