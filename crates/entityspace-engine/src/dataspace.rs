//! `DataSpace`: the facade wiring the physical schema, mutation engine,
//! query evaluator, and result projector behind one public API.
//!
//! Mutating methods take `&mut self`, read methods take `&self` — the
//! simplest faithful rendering of "not reentrant, not supported across
//! threads" from the concurrency model: no internal locking, since nothing
//! here claims thread safety the way `entityspace_storage::MemoryStore`'s
//! `parking_lot::RwLock` does.

use tracing::debug;

use entityspace_core::{AttrSet, Condition, EntityId, Result, Scope};
use entityspace_storage::{MemoryStore, Store, StoreFacade};

use crate::mutation::MutationEngine;
use crate::projector::{EntityTree, Projector};
use crate::query::Evaluator;
use crate::schema::IndexProfile;

/// Configuration a [`DataSpace`] is opened with.
#[derive(Copy, Clone, Debug, Default)]
pub struct DataSpaceConfig {
    /// Which auxiliary index tables to maintain.
    pub profile: IndexProfile,
}

impl DataSpaceConfig {
    /// Build a config with the given profile.
    pub fn new(profile: IndexProfile) -> Self {
        Self { profile }
    }
}

/// Options accepted by [`DataSpace::search`].
#[derive(Copy, Clone, Debug, Default)]
pub struct SearchOptions {
    /// Whether to expand stored attribute synonymy mappings during search.
    pub use_mappings: bool,
}

/// The embedded entity/attribute data space.
///
/// Owns a [`StoreFacade`] for its whole lifetime; there is no in-memory
/// cache beyond the `visited` set scoped to a single [`DataSpace::get_entity`]
/// call.
pub struct DataSpace<S: Store> {
    facade: StoreFacade<S>,
    profile: IndexProfile,
}

impl<S: Store> DataSpace<S> {
    /// Open a data space over an already-constructed [`Store`].
    ///
    /// The physical choice of KV engine is out of scope for this crate (see
    /// the external-interfaces notes); callers bring their own [`Store`].
    pub fn open(store: S, config: DataSpaceConfig) -> Self {
        debug!(profile = ?config.profile, "open");
        Self {
            facade: StoreFacade::new(store),
            profile: config.profile,
        }
    }

    /// Release this instance. `DataSpace` owns no resources beyond the
    /// store it was given, so this simply drops `self`; it exists for
    /// open/close API symmetry.
    pub fn close(self) {
        debug!("close");
    }

    /// Drop every row in every table.
    pub fn clear(&mut self) -> Result<()> {
        debug!("clear");
        self.facade.truncate()
    }

    fn mutation(&self) -> MutationEngine<'_, S> {
        MutationEngine::new(&self.facade, self.profile)
    }

    /// See [`MutationEngine::insert_entity`].
    pub fn insert_entity(&mut self, id: &EntityId) -> Result<()> {
        self.mutation().insert_entity(id)
    }

    /// See [`MutationEngine::delete_entity`].
    pub fn delete_entity(&mut self, id: &EntityId) -> Result<()> {
        self.mutation().delete_entity(id)
    }

    /// See [`MutationEngine::insert_attribute`].
    pub fn insert_attribute(
        &mut self,
        id: &EntityId,
        name: &str,
        value: &entityspace_core::AttrValue,
    ) -> Result<()> {
        self.mutation().insert_attribute(id, name, value)
    }

    /// See [`MutationEngine::delete_attribute`].
    pub fn delete_attribute(
        &mut self,
        id: &EntityId,
        name: Option<&str>,
        value: Option<&entityspace_core::AttrValue>,
    ) -> Result<()> {
        self.mutation().delete_attribute(id, name, value)
    }

    /// See [`MutationEngine::insert_mapping`].
    pub fn insert_mapping(&mut self, scope: &Scope, original: &AttrSet, synonym: &AttrSet) -> Result<()> {
        self.mutation().insert_mapping(scope, original, synonym)
    }

    /// See [`MutationEngine::delete_mapping`].
    pub fn delete_mapping(
        &mut self,
        scope: &Scope,
        original: Option<&AttrSet>,
        synonym: Option<&AttrSet>,
    ) -> Result<()> {
        self.mutation().delete_mapping(scope, original, synonym)
    }

    /// Which entity ids satisfy `root`, per [`Evaluator::search`].
    pub fn search(&self, root: &Condition, options: SearchOptions) -> Result<Vec<EntityId>> {
        Evaluator::new(&self.facade, self.profile).search(root, options.use_mappings)
    }

    /// Materialize the tree rooted at `id`, per [`Projector::get_entity`].
    pub fn get_entity(&self, id: &EntityId) -> Result<EntityTree> {
        Projector::new(&self.facade, self.profile).get_entity(id)
    }
}

impl DataSpace<MemoryStore> {
    /// Convenience constructor for the common case and for tests: an
    /// in-memory store with the given profile.
    pub fn open_in_memory(profile: IndexProfile) -> Self {
        Self::open(MemoryStore::new(), DataSpaceConfig::new(profile))
    }
}
