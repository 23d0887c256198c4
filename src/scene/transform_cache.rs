//! Dual-representation transform cache.
//!
//! Every node keeps both its local-to-parent (L2P) and local-to-world (L2W)
//! matrices. At most one of them is stale at any time, which the
//! [`CacheState`] enum makes the only representable option: there is no
//! "both dirty" state.
//!
//! The cache itself knows nothing about the hierarchy. The
//! [`SceneGraph`](crate::scene::SceneGraph) drives recomputation because
//! resolving either matrix needs the parent's world transform.
//!
//! Both matrices live in [`Cell`]s so lazy reads work through `&self`, the
//! same way a `const` getter with `mutable` members would.

use std::cell::Cell;

use glam::Affine3A;

/// Which representation, if any, is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheState {
    /// Both matrices are valid.
    #[default]
    Clean,
    /// L2W is authoritative; L2P must be derived from it and the parent.
    ParentDirty,
    /// L2P is authoritative; L2W must be composed with the parent's world.
    WorldDirty,
}

/// Recompute counters, for instrumentation and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransformStats {
    /// Number of times L2P was derived from L2W.
    pub local_recomputes: u32,
    /// Number of times L2W was composed from L2P.
    pub world_recomputes: u32,
}

#[derive(Debug)]
pub(crate) struct TransformCache {
    local_to_parent: Cell<Affine3A>,
    local_to_world: Cell<Affine3A>,
    state: Cell<CacheState>,
    stats: Cell<TransformStats>,
}

impl TransformCache {
    pub(crate) fn new() -> Self {
        Self {
            local_to_parent: Cell::new(Affine3A::IDENTITY),
            local_to_world: Cell::new(Affine3A::IDENTITY),
            state: Cell::new(CacheState::Clean),
            stats: Cell::new(TransformStats::default()),
        }
    }

    #[inline]
    pub(crate) fn state(&self) -> CacheState {
        self.state.get()
    }

    #[inline]
    pub(crate) fn stats(&self) -> TransformStats {
        self.stats.get()
    }

    /// Raw L2P, valid unless the state is [`CacheState::ParentDirty`].
    #[inline]
    pub(crate) fn local(&self) -> Affine3A {
        self.local_to_parent.get()
    }

    /// Raw L2W, valid unless the state is [`CacheState::WorldDirty`].
    #[inline]
    pub(crate) fn world(&self) -> Affine3A {
        self.local_to_world.get()
    }

    /// Stores a freshly derived L2P and resolves [`CacheState::ParentDirty`].
    pub(crate) fn store_local(&self, local: Affine3A) {
        debug_assert_eq!(self.state(), CacheState::ParentDirty);
        self.local_to_parent.set(local);
        self.state.set(CacheState::Clean);

        let mut stats = self.stats.get();
        stats.local_recomputes += 1;
        self.stats.set(stats);
    }

    /// Stores a freshly composed L2W and resolves [`CacheState::WorldDirty`].
    pub(crate) fn store_world(&self, world: Affine3A) {
        debug_assert_eq!(self.state(), CacheState::WorldDirty);
        self.local_to_world.set(world);
        self.state.set(CacheState::Clean);

        let mut stats = self.stats.get();
        stats.world_recomputes += 1;
        self.stats.set(stats);
    }

    /// The caller must have resolved any pending L2W first.
    pub(crate) fn mark_parent_dirty(&self) {
        debug_assert_ne!(self.state(), CacheState::WorldDirty);
        self.state.set(CacheState::ParentDirty);
    }

    /// The caller must have resolved any pending L2P first.
    pub(crate) fn mark_world_dirty(&self) {
        debug_assert_ne!(self.state(), CacheState::ParentDirty);
        self.state.set(CacheState::WorldDirty);
    }

    #[inline]
    pub(crate) fn local_mut(&mut self) -> &mut Affine3A {
        self.local_to_parent.get_mut()
    }

    #[inline]
    pub(crate) fn world_mut(&mut self) -> &mut Affine3A {
        self.local_to_world.get_mut()
    }
}

impl Default for TransformCache {
    fn default() -> Self {
        Self::new()
    }
}
