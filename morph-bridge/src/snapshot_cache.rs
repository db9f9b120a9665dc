//! Snapshot storage with byte accounting.
//!
//! Captured bitmaps live here from capture until the transition that owns
//! them releases them. Entries are never evicted behind an owner's back;
//! a capture that would exceed the byte budget fails instead.

use std::collections::HashMap;
use std::time::Instant;

use morph_core::{BridgeError, BridgeResult, ContentKind, ContentRef, Frame, Snapshot, ViewHandle};
use uuid::Uuid;

/// URI scheme of captured snapshots.
pub const SNAPSHOT_SCHEME: &str = "snapshot://";

/// Bytes per captured pixel (RGBA8).
const BYTES_PER_PIXEL: usize = 4;

#[derive(Debug)]
struct CacheEntry {
    /// View the snapshot was taken from.
    source: ViewHandle,
    /// Size in bytes.
    size_bytes: usize,
    /// When it was captured.
    captured_at: Instant,
}

/// Configuration for the snapshot cache.
#[derive(Debug, Clone)]
pub struct SnapshotCacheConfig {
    /// Maximum bytes held at once.
    pub max_size_bytes: usize,
}

impl Default for SnapshotCacheConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: 64 * 1024 * 1024, // 64 MB
        }
    }
}

/// Cache statistics for monitoring.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Snapshots captured.
    pub captures: u64,
    /// Snapshots released.
    pub releases: u64,
    /// Captures refused for exceeding the budget.
    pub rejected: u64,
    /// Total bytes captured.
    pub bytes_captured: u64,
}

/// Owns captured snapshot bitmaps until they are released.
#[derive(Debug)]
pub struct SnapshotCache {
    entries: HashMap<String, CacheEntry>,
    config: SnapshotCacheConfig,
    current_size: usize,
    stats: CacheStats,
}

impl SnapshotCache {
    /// Create a cache with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(SnapshotCacheConfig::default())
    }

    /// Create a cache with custom configuration.
    #[must_use]
    pub fn with_config(config: SnapshotCacheConfig) -> Self {
        Self {
            entries: HashMap::new(),
            config,
            current_size: 0,
            stats: CacheStats::default(),
        }
    }

    /// Capture a view of the given frame.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Snapshot`] if the frame is not finite or the
    /// capture would exceed the byte budget.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn capture(&mut self, source: ViewHandle, frame: &Frame) -> BridgeResult<Snapshot> {
        if !frame.width.is_finite() || !frame.height.is_finite() {
            self.stats.rejected += 1;
            return Err(BridgeError::Snapshot(format!(
                "cannot capture {source}: non-finite size {}x{}",
                frame.width, frame.height
            )));
        }

        let width = frame.width.max(0.0).ceil() as u32;
        let height = frame.height.max(0.0).ceil() as u32;
        let size_bytes = (width as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(BYTES_PER_PIXEL));
        let total = size_bytes.and_then(|size| self.current_size.checked_add(size));

        let size_bytes = match (size_bytes, total) {
            (Some(size_bytes), Some(total)) if total <= self.config.max_size_bytes => size_bytes,
            _ => {
                self.stats.rejected += 1;
                return Err(BridgeError::Snapshot(format!(
                    "capturing {source} at {width}x{height} exceeds the budget, {} of {} bytes in use",
                    self.current_size, self.config.max_size_bytes
                )));
            }
        };

        let uri = format!("{SNAPSHOT_SCHEME}{}", Uuid::new_v4());
        self.entries.insert(
            uri.clone(),
            CacheEntry {
                source,
                size_bytes,
                captured_at: Instant::now(),
            },
        );
        self.current_size += size_bytes;
        self.stats.captures += 1;
        self.stats.bytes_captured += size_bytes as u64;

        tracing::trace!(%source, %uri, size_bytes, "Captured snapshot");
        Ok(Snapshot {
            content: ContentRef::Bitmap { uri, width, height },
            kind: ContentKind::Snapshot,
        })
    }

    /// Release a snapshot. Content not owned by this cache (image sources,
    /// live content) is ignored and returns `false`.
    pub fn release(&mut self, snapshot: &Snapshot) -> bool {
        let ContentRef::Bitmap { uri, .. } = &snapshot.content else {
            return false;
        };
        let Some(entry) = self.entries.remove(uri) else {
            return false;
        };
        self.current_size -= entry.size_bytes;
        self.stats.releases += 1;
        tracing::trace!(
            source = %entry.source,
            %uri,
            held_ms = u64::try_from(entry.captured_at.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Released snapshot"
        );
        true
    }

    /// Whether `uri` is currently held.
    #[must_use]
    pub fn contains(&self, uri: &str) -> bool {
        self.entries.contains_key(uri)
    }

    /// Number of snapshots held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no snapshots are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bytes currently held.
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.current_size
    }

    /// Cache statistics.
    #[must_use]
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}

impl Default for SnapshotCache {
    fn default() -> Self {
        Self::new()
    }
}
