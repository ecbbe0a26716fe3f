//! In-memory subscriber table mirrored to a [`SubscriberStore`].

use crate::store::SubscriberStore;
use alloc::{string::String, sync::Arc, vec::Vec};
use chrono::{DateTime, TimeDelta, Utc};
use core::num::NonZeroU64;
use dashmap::{mapref::entry::Entry, DashMap};
use model::Subscriber;
use tokio::sync::Mutex;

type Slot = Arc<Mutex<Subscriber>>;

/// Defaults applied to newly registered subscribers.
#[derive(Clone, Debug)]
pub struct Defaults {
    pub section: String,
    pub interval: TimeDelta,
}

pub struct Registry {
    /// Map guards are never held across an await. Each entry carries its own
    /// lock, held across the mutation and the write-through.
    subscribers: DashMap<NonZeroU64, Slot>,
    store: Arc<dyn SubscriberStore>,
    defaults: Defaults,
}

impl Registry {
    pub fn new(store: Arc<dyn SubscriberStore>, defaults: Defaults) -> Self {
        Self { subscribers: DashMap::new(), store, defaults }
    }

    /// Rebuilds the registry from a full scan of the store. Unreadable rows are
    /// logged and skipped.
    pub async fn load(store: Arc<dyn SubscriberStore>, defaults: Defaults) -> db::error::Result<Self> {
        let rows = store.scan().await?;
        let registry = Self::new(store, defaults);
        for row in rows {
            match row {
                Ok(sub) => {
                    registry.subscribers.insert(sub.id, Arc::new(Mutex::new(sub)));
                }
                Err(err) => log::warn!("skipping unreadable subscriber row: {err}"),
            }
        }
        log::info!("loaded {} subscribers", registry.subscribers.len());
        Ok(registry)
    }

    pub fn defaults(&self) -> &Defaults {
        &self.defaults
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    fn slot(&self, id: NonZeroU64) -> Option<Slot> {
        self.subscribers.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    async fn persist(&self, sub: &Subscriber) {
        if let Err(err) = self.store.upsert(sub).await {
            log::error!("failed to persist subscriber {}: {err}", sub.id);
        }
    }

    /// Returns the subscriber for `id`, creating (and persisting) it with the
    /// defaults if absent. The flag is `true` only for the call that created it.
    pub async fn register(&self, id: NonZeroU64, now: DateTime<Utc>) -> (Subscriber, bool) {
        let (slot, created) = match self.subscribers.entry(id) {
            Entry::Occupied(entry) => (Arc::clone(entry.get()), false),
            Entry::Vacant(entry) => {
                let sub = Subscriber::new(id, self.defaults.section.clone(), self.defaults.interval, now);
                let slot = Arc::new(Mutex::new(sub));
                entry.insert(Arc::clone(&slot));
                (slot, true)
            }
        };

        let sub = slot.lock().await;
        if created {
            log::info!("registered subscriber {id}");
            self.persist(&sub).await;
        }
        (sub.clone(), created)
    }

    pub async fn get(&self, id: NonZeroU64) -> Option<Subscriber> {
        let slot = self.slot(id)?;
        let sub = slot.lock().await;
        Some(sub.clone())
    }

    /// Applies `mutate` under the entry lock and writes the row through before
    /// returning. `None` if `id` is not registered.
    pub async fn update<T>(&self, id: NonZeroU64, mutate: impl FnOnce(&mut Subscriber) -> T) -> Option<T> {
        let slot = self.slot(id)?;
        let mut sub = slot.lock().await;
        let out = mutate(&mut sub);
        self.persist(&sub).await;
        Some(out)
    }

    /// Like [`Self::update`], but only writes through when `mutate` reports a change.
    pub async fn update_if(&self, id: NonZeroU64, mutate: impl FnOnce(&mut Subscriber) -> bool) -> Option<bool> {
        let slot = self.slot(id)?;
        let mut sub = slot.lock().await;
        let changed = mutate(&mut sub);
        if changed {
            self.persist(&sub).await;
        }
        Some(changed)
    }

    /// Copies the current ID list. Registrations racing with the walk are
    /// picked up by the next one.
    pub fn snapshot(&self) -> Vec<NonZeroU64> {
        self.subscribers.iter().map(|entry| *entry.key()).collect()
    }
}
