use crate::{
    core::geo::TileCoord,
    input::events::{MapSignal, SignalSender},
    prelude::{HashMap, HashSet},
};
use image::RgbaImage;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex, RwLock,
};

/// Delivers content-source notifications to the owning map control.
///
/// Sending never blocks; the map control picks the signals up on the
/// interactive thread.
#[derive(Debug, Clone)]
pub struct ContentNotifier {
    signals: SignalSender,
}

impl ContentNotifier {
    pub fn new(signals: SignalSender) -> Self {
        Self { signals }
    }

    /// New content arrived; the map should redraw
    pub fn content_updated(&self) {
        self.signals.send(MapSignal::ContentUpdated);
    }

    /// Every outstanding request has been served
    pub fn loading_finished(&self) {
        self.signals.send(MapSignal::LoadingFinished);
    }
}

/// Supplies tile imagery to tile layers.
///
/// Fetching and caching are the implementation's business; the map only
/// asks for tiles, learns about new content through the notifier and
/// aborts outstanding work when the zoom changes.
pub trait ContentSource: Send + Sync {
    /// Connects the source to the map control that owns it
    fn attach(&self, notifier: ContentNotifier);

    /// Returns the tile if it is available, otherwise schedules it and
    /// returns `None`. May be called from redraw workers.
    fn request_tile(&self, coord: TileCoord) -> Option<Arc<RgbaImage>>;

    /// Drops every outstanding request
    fn abort_loading(&self);

    fn is_loading(&self) -> bool;
}

/// Content source without any content
#[derive(Debug, Default)]
pub struct NullContentSource;

impl ContentSource for NullContentSource {
    fn attach(&self, _notifier: ContentNotifier) {}

    fn request_tile(&self, _coord: TileCoord) -> Option<Arc<RgbaImage>> {
        None
    }

    fn abort_loading(&self) {}

    fn is_loading(&self) -> bool {
        false
    }
}

/// In-memory tile store
///
/// Tiles that are requested but absent are recorded as pending until they
/// are inserted, the loading is finished explicitly, or the map aborts.
#[derive(Default)]
pub struct MemoryTileSource {
    tiles: RwLock<HashMap<TileCoord, Arc<RgbaImage>>>,
    pending: Mutex<HashSet<TileCoord>>,
    notifier: RwLock<Option<ContentNotifier>>,
    aborts: AtomicUsize,
}

impl MemoryTileSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn notifier(&self) -> Option<ContentNotifier> {
        self.notifier.read().ok().and_then(|slot| slot.clone())
    }

    /// Stores a tile and notifies the map. Completing the last pending
    /// request also reports that loading finished.
    pub fn insert_tile(&self, coord: TileCoord, image: RgbaImage) {
        match self.tiles.write() {
            Ok(mut tiles) => {
                tiles.insert(coord, Arc::new(image));
            }
            Err(_) => {
                log::warn!("tile store poisoned, dropping tile {:?}", coord);
                return;
            }
        }

        let drained = match self.pending.lock() {
            Ok(mut pending) => pending.remove(&coord) && pending.is_empty(),
            Err(_) => false,
        };
        if let Some(notifier) = self.notifier() {
            notifier.content_updated();
            if drained {
                notifier.loading_finished();
            }
        }
    }

    pub fn contains(&self, coord: &TileCoord) -> bool {
        self.tiles
            .read()
            .map(|tiles| tiles.contains_key(coord))
            .unwrap_or(false)
    }

    /// Declares every outstanding request served
    pub fn finish_loading(&self) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.clear();
        }
        if let Some(notifier) = self.notifier() {
            notifier.loading_finished();
        }
    }

    /// Outstanding requests, sorted for stable output
    pub fn pending_tiles(&self) -> Vec<TileCoord> {
        let mut pending: Vec<TileCoord> = self
            .pending
            .lock()
            .map(|pending| pending.iter().copied().collect())
            .unwrap_or_default();
        pending.sort_by_key(|c| (c.z, c.y, c.x));
        pending
    }

    /// How often the map aborted loading
    pub fn abort_count(&self) -> usize {
        self.aborts.load(Ordering::Acquire)
    }
}

impl ContentSource for MemoryTileSource {
    fn attach(&self, notifier: ContentNotifier) {
        if let Ok(mut slot) = self.notifier.write() {
            *slot = Some(notifier);
        }
    }

    fn request_tile(&self, coord: TileCoord) -> Option<Arc<RgbaImage>> {
        let tile = self.tiles.read().ok()?.get(&coord).cloned();
        if tile.is_none() {
            if let Ok(mut pending) = self.pending.lock() {
                pending.insert(coord);
            }
        }
        tile
    }

    fn abort_loading(&self) {
        self.aborts.fetch_add(1, Ordering::AcqRel);
        if let Ok(mut pending) = self.pending.lock() {
            if !pending.is_empty() {
                log::debug!("aborting {} pending tile requests", pending.len());
            }
            pending.clear();
        }
    }

    fn is_loading(&self) -> bool {
        self.pending
            .lock()
            .map(|pending| !pending.is_empty())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::events::signal_channel;

    #[test]
    fn test_missing_tile_becomes_pending() {
        let source = MemoryTileSource::new();
        assert!(source.request_tile(TileCoord::new(1, 2, 3)).is_none());
        assert!(source.is_loading());
        assert_eq!(source.pending_tiles(), vec![TileCoord::new(1, 2, 3)]);
    }

    #[test]
    fn test_insert_notifies_and_finishes() {
        let source = MemoryTileSource::new();
        let (sender, rx) = signal_channel();
        source.attach(ContentNotifier::new(sender));

        source.request_tile(TileCoord::new(0, 0, 1));
        source.insert_tile(TileCoord::new(0, 0, 1), RgbaImage::new(4, 4));

        assert_eq!(rx.try_recv().unwrap(), MapSignal::ContentUpdated);
        assert_eq!(rx.try_recv().unwrap(), MapSignal::LoadingFinished);
        assert!(!source.is_loading());
        assert!(source.request_tile(TileCoord::new(0, 0, 1)).is_some());
    }

    #[test]
    fn test_abort_clears_pending() {
        let source = MemoryTileSource::new();
        source.request_tile(TileCoord::new(0, 0, 1));
        source.abort_loading();
        assert!(!source.is_loading());
        assert_eq!(source.abort_count(), 1);
    }

    #[test]
    fn test_null_source_is_idle() {
        let source = NullContentSource;
        assert!(source.request_tile(TileCoord::new(0, 0, 0)).is_none());
        assert!(!source.is_loading());
    }
}
