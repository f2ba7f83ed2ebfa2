//! File-backed [`TokenCache`] that lets several processes on one host share tokens.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
	sync::{
		LazyLock,
		atomic::{AtomicU64, Ordering},
	},
};
// self
use crate::{
	_prelude::*,
	cache::{CacheError, CacheFuture, TokenCache},
	clock::{Clock, SystemClock},
};

type Snapshot = HashMap<String, FileEntry>;

/// One writer lock per cache file, shared by every handle in the process.
static WRITE_LOCKS: LazyLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> =
	LazyLock::new(Default::default);
static TMP_SEQUENCE: AtomicU64 = AtomicU64::new(0);

#[derive(Clone, Debug, Serialize, Deserialize)]
struct FileEntry {
	value: String,
	/// Unix timestamp (seconds); `None` never expires.
	expires_at: Option<i64>,
}
impl FileEntry {
	fn is_live_at(&self, now: OffsetDateTime) -> bool {
		self.expires_at.is_none_or(|deadline| now.unix_timestamp() < deadline)
	}
}

/// Persists cache entries to a JSON file, rewriting it atomically on every `set`.
///
/// Every `get` re-reads the file so writes made by other processes are observed. Writes to one
/// path are serialized across all handles in the process; concurrent writers in different
/// processes follow last-rename-wins semantics.
#[derive(Clone)]
pub struct FileCache {
	path: PathBuf,
	write_lock: Arc<Mutex<()>>,
	clock: Arc<dyn Clock>,
}
impl FileCache {
	/// Opens (or creates the parent directory for) a cache at `path`.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, CacheError> {
		Self::open_with_clock(path, Arc::new(SystemClock))
	}

	/// Same as [`FileCache::open`] but evaluates TTLs against `clock`.
	pub fn open_with_clock(
		path: impl Into<PathBuf>,
		clock: Arc<dyn Clock>,
	) -> Result<Self, CacheError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let write_lock = Self::write_lock_for(&path);

		Ok(Self { path, write_lock, clock })
	}

	/// Location of the backing file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_snapshot(path: &Path) -> Result<Snapshot, CacheError> {
		if !path.exists() {
			return Ok(HashMap::new());
		}

		let bytes = fs::read(path).map_err(|e| CacheError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		if bytes.is_empty() {
			return Ok(HashMap::new());
		}

		serde_json::from_slice(&bytes).map_err(|e| CacheError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})
	}

	fn write_lock_for(path: &Path) -> Arc<Mutex<()>> {
		// Resolve the directory so `./a/c.json` and `a/c.json` share a lock.
		let key = match (path.parent(), path.file_name()) {
			(Some(parent), Some(name)) => {
				let parent = if parent.as_os_str().is_empty() { Path::new(".") } else { parent };

				fs::canonicalize(parent)
					.map(|dir| dir.join(name))
					.unwrap_or_else(|_| path.to_path_buf())
			},
			_ => path.to_path_buf(),
		};

		WRITE_LOCKS.lock().entry(key).or_default().clone()
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), CacheError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| CacheError::Backend {
				message: format!("Failed to create cache directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist(&self, contents: &Snapshot) -> Result<(), CacheError> {
		Self::ensure_parent_exists(&self.path)?;

		let serialized = serde_json::to_vec_pretty(contents).map_err(|e| {
			CacheError::Serialization { message: format!("Failed to serialize cache: {e}") }
		})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension(format!(
			"{}.{}.tmp",
			std::process::id(),
			TMP_SEQUENCE.fetch_add(1, Ordering::Relaxed)
		));

		{
			let mut file = File::create(&tmp_path).map_err(|e| CacheError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| CacheError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| CacheError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| CacheError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}

	fn get_now(&self, key: &str) -> Result<Option<String>, CacheError> {
		let now = self.clock.now();
		let snapshot = Self::load_snapshot(&self.path)?;

		Ok(snapshot.get(key).filter(|entry| entry.is_live_at(now)).map(|entry| entry.value.clone()))
	}

	fn set_now(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
		let _guard = self.write_lock.lock();
		let now = self.clock.now();
		// A corrupt file is replaced rather than blocking every future write.
		let mut snapshot = Self::load_snapshot(&self.path).unwrap_or_default();
		let expires_at = ttl
			.is_positive()
			.then(|| now.unix_timestamp().saturating_add(ttl.whole_seconds()));

		snapshot.retain(|_, entry| entry.is_live_at(now));
		snapshot.insert(key.to_owned(), FileEntry { value, expires_at });

		self.persist(&snapshot)
	}
}
impl Debug for FileCache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("FileCache").field("path", &self.path).finish()
	}
}
impl TokenCache for FileCache {
	fn get<'a>(&'a self, key: &'a str) -> CacheFuture<'a, Option<String>> {
		Box::pin(async move { self.get_now(key) })
	}

	fn set<'a>(&'a self, key: &'a str, value: String, ttl: Duration) -> CacheFuture<'a, ()> {
		Box::pin(async move { self.set_now(key, value, ttl) })
	}
}
