//! Detailed renderer construction.

use verdant_shared::{CreatureTraits, EntityRecord};

use super::features::{describe, FeatureDescriptor};
use super::handle::{DetailHandle, MeshPart};
use super::registry::AssetRegistry;
use crate::error::{RenderError, RenderResult};

/// Builds detailed renderers from entity records.
///
/// The pool calls [`DetailFactory::construct`] when it has nothing to
/// recycle and [`DetailFactory::rebuild`] on a recycled handle that has
/// already been reset.
pub trait DetailFactory {
    /// Creates a new handle bound to `record`.
    ///
    /// # Errors
    ///
    /// [`RenderError::ConstructionFailure`] if the record cannot be built.
    fn construct(
        &mut self,
        record: &EntityRecord,
        registry: &mut AssetRegistry,
    ) -> RenderResult<DetailHandle>;

    /// Rebinds an existing, reset handle to `record`.
    ///
    /// # Errors
    ///
    /// [`RenderError::ConstructionFailure`] if the record cannot be built.
    /// The handle may be left partially bound; the pool resets it again.
    fn rebuild(
        &mut self,
        handle: &mut DetailHandle,
        record: &EntityRecord,
        registry: &mut AssetRegistry,
    ) -> RenderResult<()>;
}

/// Default factory: [`describe`] the creature, then intern each part.
#[derive(Debug, Default)]
pub struct ProceduralFactory {
    next_serial: u64,
}

impl ProceduralFactory {
    /// Creates a factory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles constructed so far.
    #[must_use]
    pub const fn constructed(&self) -> u64 {
        self.next_serial
    }
}

impl DetailFactory for ProceduralFactory {
    fn construct(
        &mut self,
        record: &EntityRecord,
        registry: &mut AssetRegistry,
    ) -> RenderResult<DetailHandle> {
        // Validate before spending a serial.
        creature_traits(record)?;
        let mut handle = DetailHandle::new(self.next_serial);
        self.next_serial += 1;
        self.rebuild(&mut handle, record, registry)?;
        Ok(handle)
    }

    fn rebuild(
        &mut self,
        handle: &mut DetailHandle,
        record: &EntityRecord,
        registry: &mut AssetRegistry,
    ) -> RenderResult<()> {
        let traits = creature_traits(record)?;
        let parts = describe(traits, record.size)
            .into_iter()
            .map(|d| resolve(&d, traits.hue, registry));
        handle.bind(record.key(), parts);
        handle.apply_record(record);
        Ok(())
    }
}

fn creature_traits(record: &EntityRecord) -> RenderResult<&CreatureTraits> {
    record.creature().ok_or_else(|| RenderError::ConstructionFailure {
        key: record.key(),
        reason: format!("no detailed model for {}", record.class().name()),
    })
}

fn resolve(descriptor: &FeatureDescriptor, hue: f32, registry: &mut AssetRegistry) -> MeshPart {
    MeshPart {
        kind: descriptor.kind,
        geometry: registry.geometry(descriptor.kind, descriptor.size),
        material: registry.material(hue, descriptor.tint),
        offset: descriptor.offset,
    }
}
