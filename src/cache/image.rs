use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;

use log::{debug, warn};
use parking_lot::RwLock;
use tokio::fs;

/// Which cache tier satisfied a lookup. Surfaced to clients in the `X-Cache`
/// response header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTier {
    Memory,
    Disk,
}

impl CacheTier {
    pub fn header_value(&self) -> &'static str {
        match self {
            CacheTier::Memory => "HIT-MEMORY",
            CacheTier::Disk => "HIT-DISK",
        }
    }
}

// Fingerprint for one (url, width, quality) triple. Width is rendered as the
// empty string when absent so "no resize" and "width 0" cannot collide with a
// real width.
pub fn cache_key(url: &str, width: Option<u32>, quality: u8) -> String {
    let width_part = width.map(|w| w.to_string()).unwrap_or_default();
    format!("{:x}", md5::compute(format!("{}-{}-{}", url, width_part, quality)))
}

// Memory tier bookkeeping: the entry map plus the insertion order used for
// eviction. Eviction is oldest-inserted-first, not LRU - a hit does not
// refresh an entry's position.
struct MemoryTier {
    entries: HashMap<String, Vec<u8>>,
    order: VecDeque<String>,
}

/// Two-tier cache for encoded images: a bounded in-memory map in front of an
/// optional flat directory of files (one per key, filename = key fingerprint).
///
/// The tiers are not kept in sync: a disk hit promotes the entry into memory,
/// but memory eviction never deletes from disk, and entries are immutable
/// forever once written.
pub struct ImageCache {
    memory: RwLock<MemoryTier>,
    capacity: usize,
    disk_dir: Option<PathBuf>,
}

impl ImageCache {
    /// `disk_dir: None` disables the disk tier entirely.
    pub fn new(capacity: usize, disk_dir: Option<PathBuf>) -> Self {
        Self {
            memory: RwLock::new(MemoryTier {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
            capacity,
            disk_dir,
        }
    }

    pub fn disk_enabled(&self) -> bool {
        self.disk_dir.is_some()
    }

    // Ensure the cache directory exists. Best-effort: a failure only loses
    // the disk tier, not the service.
    pub async fn init(&self) {
        if let Some(dir) = &self.disk_dir {
            if let Err(e) = fs::create_dir_all(dir).await {
                warn!("Failed to create image cache directory {:?}: {}", dir, e);
            }
        }
    }

    /// Memory-only lookup. No I/O.
    pub fn get_memory(&self, key: &str) -> Option<Vec<u8>> {
        let memory = self.memory.read();
        memory.entries.get(key).cloned()
    }

    /// Full lookup: memory first, then disk. A disk hit is promoted into the
    /// memory tier.
    pub async fn get(&self, key: &str) -> Option<(Vec<u8>, CacheTier)> {
        if let Some(data) = self.get_memory(key) {
            return Some((data, CacheTier::Memory));
        }

        let dir = self.disk_dir.as_ref()?;
        match fs::read(dir.join(key)).await {
            Ok(data) => {
                self.insert_memory(key, data.clone());
                Some((data, CacheTier::Disk))
            }
            Err(_) => None,
        }
    }

    /// Populate both tiers. The disk write is best-effort: errors are logged
    /// and swallowed, the request still succeeds from memory.
    pub async fn store(&self, key: &str, data: &[u8]) {
        if let Some(dir) = &self.disk_dir {
            if let Err(e) = fs::write(dir.join(key), data).await {
                warn!("Failed to write image cache file {}: {}", key, e);
            }
        }
        self.insert_memory(key, data.to_vec());
    }

    pub fn insert_memory(&self, key: &str, data: Vec<u8>) {
        let mut memory = self.memory.write();
        if memory.entries.contains_key(key) {
            memory.entries.insert(key.to_string(), data);
            return;
        }
        while memory.entries.len() >= self.capacity {
            match memory.order.pop_front() {
                Some(oldest) => {
                    debug!("Evicting oldest image cache entry {}", oldest);
                    memory.entries.remove(&oldest);
                }
                None => break,
            }
        }
        memory.order.push_back(key.to_string());
        memory.entries.insert(key.to_string(), data);
    }

    pub fn memory_len(&self) -> usize {
        self.memory.read().entries.len()
    }
}
