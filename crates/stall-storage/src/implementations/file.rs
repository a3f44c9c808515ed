//! File-based storage backend.
//!
//! Each key lives in its own file under `storage_path`. Files start with a
//! small header carrying the expiry time so stale sessions are ignored even
//! if nobody cleaned them up.

use crate::{StorageError, StorageInterface};
use async_trait::async_trait;
use stall_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, StorageKey, ValidationError,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::fs;
use tokio::io::AsyncWriteExt;

const DEFAULT_STORAGE_PATH: &str = "./data/session";

/// Entries hold bearer tokens, so only the owner may read them.
#[cfg(unix)]
const ENTRY_MODE: u32 = 0o600;
#[cfg(unix)]
const DIR_MODE: u32 = 0o700;

fn backend_error(e: std::io::Error) -> StorageError {
	StorageError::Backend(e.to_string())
}

fn unix_now() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|d| d.as_secs())
		.unwrap_or(0)
}

/// Header written in front of every stored value.
///
/// Layout (16 bytes):
/// - `[0..4]` magic `STLS`
/// - `[4..6]` format version, little-endian u16
/// - `[6..14]` expiry in Unix seconds, little-endian u64, 0 = never
/// - `[14..16]` reserved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EntryHeader {
	version: u16,
	expires_at: u64,
}

impl EntryHeader {
	const MAGIC: &'static [u8; 4] = b"STLS";
	const VERSION: u16 = 1;
	const SIZE: usize = 16;

	fn new(ttl: Duration) -> Self {
		let expires_at = if ttl.is_zero() {
			0
		} else {
			unix_now().saturating_add(ttl.as_secs().max(1))
		};
		Self {
			version: Self::VERSION,
			expires_at,
		}
	}

	fn encode(&self) -> [u8; Self::SIZE] {
		let mut bytes = [0u8; Self::SIZE];
		bytes[0..4].copy_from_slice(Self::MAGIC);
		bytes[4..6].copy_from_slice(&self.version.to_le_bytes());
		bytes[6..14].copy_from_slice(&self.expires_at.to_le_bytes());
		bytes
	}

	fn decode(bytes: &[u8]) -> Result<Self, StorageError> {
		let header = bytes
			.get(..Self::SIZE)
			.ok_or_else(|| StorageError::Corrupted("entry too small for header".into()))?;
		if &header[0..4] != Self::MAGIC {
			return Err(StorageError::Corrupted("not a stall storage entry".into()));
		}
		let version = u16::from_le_bytes([header[4], header[5]]);
		if version > Self::VERSION {
			return Err(StorageError::Corrupted(format!(
				"unsupported entry version: {}",
				version
			)));
		}
		let mut expires = [0u8; 8];
		expires.copy_from_slice(&header[6..14]);
		Ok(Self {
			version,
			expires_at: u64::from_le_bytes(expires),
		})
	}

	fn is_expired(&self) -> bool {
		self.expires_at != 0 && unix_now() >= self.expires_at
	}
}

/// Per-namespace default TTLs, read from `ttl_<namespace>` keys.
#[derive(Debug, Clone, Default)]
pub struct TtlConfig {
	ttls: HashMap<StorageKey, Duration>,
}

impl TtlConfig {
	fn from_config(config: &toml::Value) -> Self {
		let mut ttls = HashMap::new();
		if let Some(table) = config.as_table() {
			for storage_key in StorageKey::all() {
				let config_key = format!("ttl_{}", storage_key.as_str());
				if let Some(seconds) = table
					.get(&config_key)
					.and_then(|v| v.as_integer())
					.and_then(|v| u64::try_from(v).ok())
				{
					ttls.insert(storage_key, Duration::from_secs(seconds));
				}
			}
		}
		Self { ttls }
	}

	fn for_key(&self, key: &str) -> Duration {
		key.split(':')
			.next()
			.and_then(|namespace| namespace.parse::<StorageKey>().ok())
			.and_then(|storage_key| self.ttls.get(&storage_key).copied())
			.unwrap_or(Duration::ZERO)
	}
}

pub struct FileStorage {
	base_path: PathBuf,
	ttl_config: TtlConfig,
}

impl FileStorage {
	pub fn new(base_path: PathBuf, ttl_config: TtlConfig) -> Self {
		Self {
			base_path,
			ttl_config,
		}
	}

	fn file_path(&self, key: &str) -> PathBuf {
		let safe_key = key.replace(['/', '\\', ':'], "_");
		self.base_path.join(format!("{}.bin", safe_key))
	}

	async fn ensure_dir(&self) -> Result<(), StorageError> {
		let mut builder = fs::DirBuilder::new();
		builder.recursive(true);
		#[cfg(unix)]
		builder.mode(DIR_MODE);
		builder.create(&self.base_path).await.map_err(backend_error)
	}

	async fn read_entry(&self, key: &str) -> Result<Option<(EntryHeader, Vec<u8>)>, StorageError> {
		let data = match fs::read(self.file_path(key)).await {
			Ok(data) => data,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
			Err(e) => return Err(backend_error(e)),
		};
		let header = EntryHeader::decode(&data)?;
		Ok(Some((header, data[EntryHeader::SIZE..].to_vec())))
	}
}

/// Writes `data` to a fresh file readable by the owner only.
async fn write_private(path: &Path, data: &[u8]) -> Result<(), StorageError> {
	// A leftover temp file would keep its old mode
	match fs::remove_file(path).await {
		Ok(()) => {},
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => {},
		Err(e) => return Err(backend_error(e)),
	}

	let mut options = fs::OpenOptions::new();
	options.write(true).create_new(true);
	#[cfg(unix)]
	options.mode(ENTRY_MODE);

	let mut file = options.open(path).await.map_err(backend_error)?;
	file.write_all(data).await.map_err(backend_error)?;
	file.sync_all().await.map_err(backend_error)
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		match self.read_entry(key).await? {
			Some((header, _)) if header.is_expired() => {
				tracing::debug!(key, "Stored entry expired");
				Err(StorageError::NotFound)
			},
			Some((_, value)) => Ok(value),
			None => Err(StorageError::NotFound),
		}
	}

	async fn set_bytes(
		&self,
		key: &str,
		value: Vec<u8>,
		ttl: Option<Duration>,
	) -> Result<(), StorageError> {
		self.ensure_dir().await?;

		let ttl = ttl.unwrap_or_else(|| self.ttl_config.for_key(key));
		let mut data = Vec::with_capacity(EntryHeader::SIZE + value.len());
		data.extend_from_slice(&EntryHeader::new(ttl).encode());
		data.extend_from_slice(&value);

		// Write then rename so a crash never leaves a half-written session
		let path = self.file_path(key);
		let temp_path = path.with_extension("tmp");
		write_private(&temp_path, &data).await?;
		fs::rename(&temp_path, &path).await.map_err(backend_error)
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		match fs::remove_file(self.file_path(key)).await {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(backend_error(e)),
		}
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		Ok(matches!(
			self.read_entry(key).await?,
			Some((header, _)) if !header.is_expired()
		))
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(FileStorageSchema)
	}

	async fn cleanup_expired(&self) -> Result<usize, StorageError> {
		let mut entries = match fs::read_dir(&self.base_path).await {
			Ok(entries) => entries,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
			Err(e) => return Err(backend_error(e)),
		};

		let mut removed = 0;
		while let Some(entry) = entries
			.next_entry()
			.await
			.map_err(backend_error)?
		{
			let path = entry.path();
			if path.extension() != Some(std::ffi::OsStr::new("bin")) {
				continue;
			}
			let expired = match fs::read(&path).await {
				Ok(data) => EntryHeader::decode(&data).is_ok_and(|h| h.is_expired()),
				Err(e) => {
					tracing::debug!("Skipping {:?}: {}", path, e);
					false
				},
			};
			if expired {
				match fs::remove_file(&path).await {
					Ok(()) => removed += 1,
					Err(e) => tracing::warn!("Failed to remove expired entry {:?}: {}", path, e),
				}
			}
		}
		Ok(removed)
	}
}

/// `storage_path` is required; `ttl_<namespace>` keys are optional.
pub struct FileStorageSchema;

impl ConfigSchema for FileStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let optional = StorageKey::all()
			.map(|storage_key| {
				Field::new(
					format!("ttl_{}", storage_key.as_str()),
					FieldType::Integer {
						min: Some(0),
						max: None,
					},
				)
			})
			.collect();

		let schema = Schema::new(
			vec![
				Field::new("storage_path", FieldType::String).with_validator(|value| {
					match value.as_str() {
						Some(path) if !path.trim().is_empty() => Ok(()),
						_ => Err("storage_path must not be empty".into()),
					}
				}),
			],
			optional,
		);
		schema.validate(config)
	}
}

/// Builds a file backend from its configuration section.
///
/// - `storage_path`: directory for entries (default `./data/session`)
/// - `ttl_session`: default TTL in seconds for the session namespace (default 0, never)
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	FileStorageSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(e.to_string()))?;

	let storage_path = config
		.get("storage_path")
		.and_then(|v| v.as_str())
		.unwrap_or(DEFAULT_STORAGE_PATH);

	Ok(Box::new(FileStorage::new(
		PathBuf::from(storage_path),
		TtlConfig::from_config(config),
	)))
}

pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "file";
	type Factory = crate::StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl crate::StorageRegistry for Registry {}
