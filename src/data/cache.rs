use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::SystemTime;

use once_cell::sync::OnceCell;

use super::loader::{self, Engine, ParseOptions};
use super::model::DatasetSnapshot;
use crate::error::{AlreadyInstalled, DatasetError};

// ---------------------------------------------------------------------------
// FileSignature – cheap staleness proxy
// ---------------------------------------------------------------------------

/// `(modified, len)` of the backing file.
///
/// An overwrite that keeps the byte size and lands within the filesystem's
/// timestamp resolution produces an equal signature and goes unnoticed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileSignature {
    /// `None` on platforms that do not report modification times.
    pub modified: Option<SystemTime>,
    pub len: u64,
}

impl FileSignature {
    pub fn probe(path: &Path) -> io::Result<Self> {
        let meta = fs::metadata(path)?;
        if !meta.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "dataset path is not a regular file",
            ));
        }
        Ok(Self {
            modified: meta.modified().ok(),
            len: meta.len(),
        })
    }
}

// ---------------------------------------------------------------------------
// DatasetSource – where and how to read
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetSource {
    pub path: PathBuf,
    pub engine: Engine,
    pub options: ParseOptions,
}

impl DatasetSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            engine: Engine::default(),
            options: ParseOptions::default(),
        }
    }

    pub fn with_engine(mut self, engine: Engine) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    fn load(&self) -> Result<DatasetSnapshot, DatasetError> {
        loader::load_file(&self.path, self.engine, &self.options)
    }
}

// ---------------------------------------------------------------------------
// DatasetCache
// ---------------------------------------------------------------------------

/// Signature and snapshot are only ever stored and replaced together.
#[derive(Debug)]
struct Loaded {
    signature: FileSignature,
    snapshot: Arc<DatasetSnapshot>,
}

#[derive(Debug)]
struct CacheState {
    source: DatasetSource,
    current: Option<Loaded>,
}

/// Single-slot, demand-refreshed holder of the dataset snapshot.
///
/// `get` stats the file on every call.  While the signature matches, callers
/// only take the shared read lock.  A mismatch sends the caller to the reload
/// path, which is serialised by `reload_lock`; a caller that queued behind a
/// reload re-checks the signature and reuses the fresh snapshot instead of
/// parsing again.
#[derive(Debug)]
pub struct DatasetCache {
    state: RwLock<CacheState>,
    reload_lock: Mutex<()>,
    reloads: AtomicUsize,
}

impl DatasetCache {
    /// Create an empty cache; nothing is read until the first `get`.
    pub fn new(source: DatasetSource) -> Self {
        Self {
            state: RwLock::new(CacheState {
                source,
                current: None,
            }),
            reload_lock: Mutex::new(()),
            reloads: AtomicUsize::new(0),
        }
    }

    /// Current snapshot, reloading first if the backing file changed.
    ///
    /// A failed parse leaves the previous signature in place, so each later
    /// call parses the broken file again (one caller at a time) until it is
    /// fixed or replaced.
    pub fn get(&self) -> Result<Arc<DatasetSnapshot>, DatasetError> {
        let path = self.read_state().source.path.clone();
        let signature = probe(&path)?;
        if let Some(snapshot) = self.matching(&path, signature) {
            return Ok(snapshot);
        }
        self.reload_if_stale()
    }

    fn reload_if_stale(&self) -> Result<Arc<DatasetSnapshot>, DatasetError> {
        let _guard = self
            .reload_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        // Another caller may have finished a reload while we waited.
        let source = self.read_state().source.clone();
        let signature = probe(&source.path)?;
        if let Some(snapshot) = self.matching(&source.path, signature) {
            return Ok(snapshot);
        }

        self.reloads.fetch_add(1, Ordering::SeqCst);
        let snapshot = Arc::new(source.load()?);

        self.write_state().current = Some(Loaded {
            signature,
            snapshot: Arc::clone(&snapshot),
        });
        Ok(snapshot)
    }

    fn matching(&self, path: &Path, signature: FileSignature) -> Option<Arc<DatasetSnapshot>> {
        let state = self.read_state();
        if state.source.path != path {
            return None;
        }
        state
            .current
            .as_ref()
            .filter(|loaded| loaded.signature == signature)
            .map(|loaded| Arc::clone(&loaded.snapshot))
    }

    /// Point the cache at another file.  The loaded pair is dropped; the
    /// next `get` reads the new path.
    pub fn retarget(&self, path: impl Into<PathBuf>) {
        let _guard = self
            .reload_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut state = self.write_state();
        state.source.path = path.into();
        state.current = None;
    }

    pub fn path(&self) -> PathBuf {
        self.read_state().source.path.clone()
    }

    /// Signature recorded with the current snapshot, if one is loaded.
    pub fn signature(&self) -> Option<FileSignature> {
        self.read_state().current.as_ref().map(|l| l.signature)
    }

    /// Reloads attempted since construction (failed parses included).
    pub fn reload_count(&self) -> usize {
        self.reloads.load(Ordering::SeqCst)
    }

    // A panic while holding the lock cannot leave a half-written pair, since
    // `current` is assigned in one statement; poisoned guards are usable.
    fn read_state(&self) -> RwLockReadGuard<'_, CacheState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, CacheState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn probe(path: &Path) -> Result<FileSignature, DatasetError> {
    FileSignature::probe(path).map_err(|source| DatasetError::Unavailable {
        path: path.to_path_buf(),
        source,
    })
}

// ---------------------------------------------------------------------------
// Process-wide instance
// ---------------------------------------------------------------------------

static GLOBAL: OnceCell<DatasetCache> = OnceCell::new();

/// Install the process-wide cache.  Call once at start-up.
pub fn install_global(source: DatasetSource) -> Result<&'static DatasetCache, AlreadyInstalled> {
    let mut installed = false;
    let cache = GLOBAL.get_or_init(|| {
        installed = true;
        DatasetCache::new(source)
    });
    if installed {
        Ok(cache)
    } else {
        Err(AlreadyInstalled)
    }
}

/// The process-wide cache, if installed.
pub fn global() -> Option<&'static DatasetCache> {
    GLOBAL.get()
}
