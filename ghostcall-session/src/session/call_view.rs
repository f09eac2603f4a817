use dashmap::DashMap;
use ghostcall_core::{ParticipantId, ParticipantTile};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

struct ViewInner {
    tiles: DashMap<ParticipantId, (usize, ParticipantTile)>,
    host: RwLock<Option<ParticipantId>>,
    in_call: AtomicBool,
}

/// Плитки участников только для чтения. Пересчитываются менеджером
/// звонка; эту структуру безопасно клонировать и передавать между потоками.
#[derive(Clone)]
pub struct CallView {
    inner: Arc<ViewInner>,
}

impl CallView {
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(ViewInner {
                tiles: DashMap::new(),
                host: RwLock::new(None),
                in_call: AtomicBool::new(false),
            }),
        }
    }

    /// Tiles in display order: self first, then remotes in join order.
    pub fn tiles(&self) -> Vec<ParticipantTile> {
        let mut tiles: Vec<(usize, ParticipantTile)> = self
            .inner
            .tiles
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        tiles.sort_by_key(|(position, _)| *position);
        tiles.into_iter().map(|(_, tile)| tile).collect()
    }

    pub fn tile(&self, id: &ParticipantId) -> Option<ParticipantTile> {
        self.inner.tiles.get(id).map(|entry| entry.value().1.clone())
    }

    pub fn host(&self) -> Option<ParticipantId> {
        self.inner.host.read().ok().and_then(|host| host.clone())
    }

    pub fn in_call(&self) -> bool {
        self.inner.in_call.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.inner.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.tiles.is_empty()
    }

    pub(crate) fn publish(
        &self,
        tiles: Vec<ParticipantTile>,
        host: Option<ParticipantId>,
        in_call: bool,
    ) {
        self.inner
            .tiles
            .retain(|id, _| tiles.iter().any(|tile| &tile.id == id));
        for (position, tile) in tiles.into_iter().enumerate() {
            self.inner.tiles.insert(tile.id.clone(), (position, tile));
        }

        if let Ok(mut current) = self.inner.host.write() {
            *current = host;
        }
        self.inner.in_call.store(in_call, Ordering::Release);
    }
}
