//! QA state persistence
//!
//! The engine never stores state itself. It goes through a
//! [`QaStateGateway`]; two implementations ship with the crate:
//!
//! - [`InMemoryGateway`]: concurrent map, for tests and embedding
//! - [`JsonFileGateway`]: one `{id}.json` file per state, replaced atomically

use crate::error::GatewayError;
use dashmap::DashMap;
use parking_lot::Mutex;
use qa_model::{QaState, QaStateId};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Loads, creates and saves QA state records
pub trait QaStateGateway: Send + Sync {
    /// Load state by id; `None` if absent
    ///
    /// # Errors
    /// Backend failures
    fn load(&self, id: QaStateId) -> Result<Option<QaState>, GatewayError>;

    /// Store a new state and return its assigned id
    ///
    /// # Errors
    /// Backend failures
    fn create(&self, state: QaState) -> Result<QaStateId, GatewayError>;

    /// Persist an existing state; `false` when the backend refuses the write
    ///
    /// # Errors
    /// Backend failures
    fn save(&self, state: &QaState) -> Result<bool, GatewayError>;

    /// Re-read state, failing if it disappeared
    ///
    /// # Errors
    /// `GatewayError::NotFound` if absent, or backend failures
    fn reload(&self, id: QaStateId) -> Result<QaState, GatewayError> {
        self.load(id)?.ok_or(GatewayError::NotFound(id))
    }
}

impl<G: QaStateGateway + ?Sized> QaStateGateway for Arc<G> {
    fn load(&self, id: QaStateId) -> Result<Option<QaState>, GatewayError> {
        (**self).load(id)
    }

    fn create(&self, state: QaState) -> Result<QaStateId, GatewayError> {
        (**self).create(state)
    }

    fn save(&self, state: &QaState) -> Result<bool, GatewayError> {
        (**self).save(state)
    }

    fn reload(&self, id: QaStateId) -> Result<QaState, GatewayError> {
        (**self).reload(id)
    }
}

/// In-process state store
#[derive(Debug, Default)]
pub struct InMemoryGateway {
    states: DashMap<QaStateId, QaState>,
    next_id: AtomicU64,
}

impl InMemoryGateway {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored states
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// True when nothing is stored
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

impl QaStateGateway for InMemoryGateway {
    fn load(&self, id: QaStateId) -> Result<Option<QaState>, GatewayError> {
        Ok(self.states.get(&id).map(|s| s.clone()))
    }

    fn create(&self, mut state: QaState) -> Result<QaStateId, GatewayError> {
        let id = QaStateId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        state.id = Some(id);
        self.states.insert(id, state);
        Ok(id)
    }

    fn save(&self, state: &QaState) -> Result<bool, GatewayError> {
        let Some(id) = state.id else {
            return Ok(false);
        };
        match self.states.get_mut(&id) {
            Some(mut stored) => {
                *stored = state.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Directory of JSON state files
#[derive(Debug)]
pub struct JsonFileGateway {
    dir: PathBuf,
    // Serializes id allocation
    create_lock: Mutex<()>,
}

impl JsonFileGateway {
    /// Open store in `dir`, creating the directory if needed
    ///
    /// # Errors
    /// `GatewayError::Io` if the directory cannot be created
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, GatewayError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| GatewayError::io_error(&dir, e))?;
        Ok(Self {
            dir,
            create_lock: Mutex::new(()),
        })
    }

    /// Store directory
    #[inline]
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_of(&self, id: QaStateId) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    fn highest_id(&self) -> Result<u64, GatewayError> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| GatewayError::io_error(&self.dir, e))?;
        let mut highest = 0;
        for entry in entries {
            let entry = entry.map_err(|e| GatewayError::io_error(&self.dir, e))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(id) = path.file_stem().and_then(|s| s.to_str()).and_then(|s| s.parse::<u64>().ok()) {
                highest = highest.max(id);
            }
        }
        Ok(highest)
    }

    fn write(&self, state: &QaState, id: QaStateId) -> Result<(), GatewayError> {
        let path = self.path_of(id);
        let json = serde_json::to_vec_pretty(state)?;
        let mut file =
            tempfile::NamedTempFile::new_in(&self.dir).map_err(|e| GatewayError::io_error(&self.dir, e))?;
        file.write_all(&json).map_err(|e| GatewayError::io_error(&path, e))?;
        file.persist(&path)
            .map_err(|e| GatewayError::io_error(&path, e.error))?;
        Ok(())
    }
}

impl QaStateGateway for JsonFileGateway {
    fn load(&self, id: QaStateId) -> Result<Option<QaState>, GatewayError> {
        let path = self.path_of(id);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(GatewayError::io_error(&path, e)),
        };
        let mut state: QaState = serde_json::from_slice(&bytes)?;
        state.id = Some(id);
        Ok(Some(state))
    }

    fn create(&self, mut state: QaState) -> Result<QaStateId, GatewayError> {
        let _guard = self.create_lock.lock();
        let id = QaStateId(self.highest_id()? + 1);
        state.id = Some(id);
        self.write(&state, id)?;
        tracing::debug!(id = %id, dir = %self.dir.display(), "created qa state file");
        Ok(id)
    }

    fn save(&self, state: &QaState) -> Result<bool, GatewayError> {
        let Some(id) = state.id else {
            return Ok(false);
        };
        if !self.path_of(id).exists() {
            return Ok(false);
        }
        self.write(state, id)?;
        Ok(true)
    }
}
