//! # Detail Renderer Pool
//!
//! Hard cap on active detailed renderers plus a bounded recycle list.
//!
//! ```text
//! acquire ──► recycle list? ──yes──► reset + rebuild ──┐
//!                  │ no                                ├──► active (cap: max_detailed)
//!                  └──────────► construct ─────────────┘
//! release ──► hide ──► recycle list below bound? ──yes──► push
//!                                    │ no
//!                                    └──► destroy
//! ```

use std::collections::HashMap;

use tracing::{trace, warn};
use verdant_core::{PoolAllocator, PoolHandle};
use verdant_shared::{EntityKey, EntityRecord};

use super::factory::{DetailFactory, ProceduralFactory};
use super::handle::DetailHandle;
use super::registry::AssetRegistry;
use crate::error::{RenderError, RenderResult};

/// Pool counters since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetailPoolStats {
    /// Handles built by the factory.
    pub constructed: u64,
    /// Acquisitions served from the recycle list.
    pub recycled: u64,
    /// Released handles dropped because the recycle list was full.
    pub destroyed: u64,
    /// Handles released.
    pub released: u64,
    /// Factory failures.
    pub construction_failures: u64,
    /// Acquisitions refused at the active cap.
    pub exhausted: u64,
}

/// Recycling pool of detailed renderers keyed by entity.
pub struct DetailPool<F: DetailFactory = ProceduralFactory> {
    factory: F,
    registry: AssetRegistry,
    /// Active handles; capacity is `max_detailed`.
    active: PoolAllocator<DetailHandle>,
    by_key: HashMap<EntityKey, PoolHandle>,
    recycle: Vec<DetailHandle>,
    recycle_limit: usize,
    stats: DetailPoolStats,
}

impl<F: DetailFactory> DetailPool<F> {
    /// Creates a pool with at most `max_detailed` active handles and at most
    /// `recycle_limit` idle ones.
    #[must_use]
    pub fn new(factory: F, max_detailed: usize, recycle_limit: usize) -> Self {
        Self {
            factory,
            registry: AssetRegistry::new(),
            active: PoolAllocator::new(max_detailed),
            by_key: HashMap::with_capacity(max_detailed),
            recycle: Vec::with_capacity(recycle_limit),
            recycle_limit,
            stats: DetailPoolStats::default(),
        }
    }

    /// Hard cap on active handles.
    #[must_use]
    pub fn max_detailed(&self) -> usize {
        self.active.capacity()
    }

    /// Active handle count.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.allocated_count()
    }

    /// Idle handles waiting for reuse.
    #[must_use]
    pub fn recycled_count(&self) -> usize {
        self.recycle.len()
    }

    /// Bound on the recycle list.
    #[must_use]
    pub const fn recycle_limit(&self) -> usize {
        self.recycle_limit
    }

    /// Whether another acquisition would hit the cap.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.active.is_full()
    }

    /// Whether `key` holds an active handle.
    #[must_use]
    pub fn contains(&self, key: EntityKey) -> bool {
        self.by_key.contains_key(&key)
    }

    /// Counters.
    #[must_use]
    pub const fn stats(&self) -> DetailPoolStats {
        self.stats
    }

    /// Shared geometry/material registry.
    #[must_use]
    pub const fn registry(&self) -> &AssetRegistry {
        &self.registry
    }

    /// Factory.
    #[must_use]
    pub const fn factory(&self) -> &F {
        &self.factory
    }

    /// Checks out a handle for `record`.
    ///
    /// Reuses a recycled handle when one is idle, resetting it before the
    /// factory rebinds it. If `record` already holds a handle it is updated
    /// in place instead.
    ///
    /// # Errors
    ///
    /// - [`RenderError::ResourceExhausted`] at the active cap
    /// - [`RenderError::ConstructionFailure`] if the factory fails; a
    ///   recycled handle goes back to the recycle list
    pub fn acquire(&mut self, record: &EntityRecord) -> RenderResult<PoolHandle> {
        let key = record.key();
        if let Some(&handle) = self.by_key.get(&key) {
            self.update(key, record);
            return Ok(handle);
        }
        if self.active.is_full() {
            self.stats.exhausted += 1;
            return Err(RenderError::ResourceExhausted {
                resource: "detail pool",
                capacity: self.active.capacity(),
            });
        }

        let handle = match self.recycle.pop() {
            Some(mut handle) => {
                handle.reset();
                if let Err(err) = self.factory.rebuild(&mut handle, record, &mut self.registry) {
                    handle.reset();
                    self.recycle.push(handle);
                    self.stats.construction_failures += 1;
                    warn!(%key, error = %err, "Detailed renderer rebuild failed");
                    return Err(err);
                }
                self.stats.recycled += 1;
                handle
            }
            None => match self.factory.construct(record, &mut self.registry) {
                Ok(handle) => {
                    self.stats.constructed += 1;
                    handle
                }
                Err(err) => {
                    self.stats.construction_failures += 1;
                    warn!(%key, error = %err, "Detailed renderer construction failed");
                    return Err(err);
                }
            },
        };

        match self.active.allocate(handle) {
            Ok(slot) => {
                self.by_key.insert(key, slot);
                trace!(%key, "Detailed renderer acquired");
                Ok(slot)
            }
            Err(handle) => {
                // Unreachable after the is_full check, but keep the handle.
                self.park(handle);
                self.stats.exhausted += 1;
                Err(RenderError::ResourceExhausted {
                    resource: "detail pool",
                    capacity: self.active.capacity(),
                })
            }
        }
    }

    /// Hides and returns `key`'s handle to the recycle list, or destroys it
    /// when the list is at its bound.
    ///
    /// Returns `false` if `key` held no handle.
    pub fn release(&mut self, key: EntityKey) -> bool {
        let Some(slot) = self.by_key.remove(&key) else {
            trace!(%key, "Release of entity without detailed renderer");
            return false;
        };
        let Some(mut handle) = self.active.free(slot) else {
            return false;
        };
        handle.hide();
        self.stats.released += 1;
        self.park(handle);
        true
    }

    /// Rewrites transform and transient flags of `key`'s handle.
    ///
    /// Returns `false` if `key` held no handle.
    pub fn update(&mut self, key: EntityKey, record: &EntityRecord) -> bool {
        let Some(handle) = self.get_mut(key) else {
            return false;
        };
        handle.apply_record(record);
        true
    }

    /// Advances animation timers of every active handle.
    pub fn tick(&mut self, dt: f32) {
        for (_, handle) in self.active.iter_mut() {
            handle.tick(dt);
        }
    }

    /// Handle bound to `key`.
    #[must_use]
    pub fn get(&self, key: EntityKey) -> Option<&DetailHandle> {
        self.by_key.get(&key).and_then(|slot| self.active.get(*slot))
    }

    fn get_mut(&mut self, key: EntityKey) -> Option<&mut DetailHandle> {
        let slot = *self.by_key.get(&key)?;
        self.active.get_mut(slot)
    }

    /// Iterates active handles with their entity.
    pub fn iter(&self) -> impl Iterator<Item = (EntityKey, &DetailHandle)> {
        self.active
            .iter()
            .filter_map(|(_, handle)| handle.occupant().map(|key| (key, handle)))
    }

    fn park(&mut self, handle: DetailHandle) {
        if self.recycle.len() < self.recycle_limit {
            self.recycle.push(handle);
        } else {
            self.stats.destroyed += 1;
            drop(handle);
        }
    }
}

impl Default for DetailPool<ProceduralFactory> {
    fn default() -> Self {
        Self::new(ProceduralFactory::new(), 100, 32)
    }
}
