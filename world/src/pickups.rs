//! Resource pickups (crystals) scattered around the arena.

use crystal_siege_core::{circles_overlap, PickupId, ResourceKind, Vec2};

/// Collision radius shared by every pickup.
pub const PICKUP_RADIUS: f32 = 12.0;

/// Collectible crystal that seeds spawn structures.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResourcePickup {
    id: PickupId,
    kind: ResourceKind,
    position: Vec2,
}

impl ResourcePickup {
    /// Creates a pickup at `position`.
    #[must_use]
    pub const fn new(id: PickupId, kind: ResourceKind, position: Vec2) -> Self {
        Self { id, kind, position }
    }

    /// Identifier of the pickup.
    #[must_use]
    pub const fn id(&self) -> PickupId {
        self.id
    }

    /// Category of the pickup.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// World position of the pickup.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.position
    }

    /// Collision radius of the pickup.
    #[must_use]
    pub const fn radius(&self) -> f32 {
        PICKUP_RADIUS
    }
}

/// Owns every pickup currently lying in the world.
#[derive(Debug, Default)]
pub struct PickupField {
    pickups: Vec<ResourcePickup>,
    next_id: u32,
}

impl PickupField {
    /// Creates an empty field.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Places a new pickup and returns its identifier.
    pub fn place(&mut self, kind: ResourceKind, position: Vec2) -> PickupId {
        let id = PickupId::new(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        self.pickups.push(ResourcePickup::new(id, kind, position));
        id
    }

    /// Removes the pickup with `id`, returning it when present.
    pub fn take(&mut self, id: PickupId) -> Option<ResourcePickup> {
        let index = self.pickups.iter().position(|pickup| pickup.id == id)?;
        Some(self.pickups.swap_remove(index))
    }

    /// Looks up a pickup by identifier.
    #[must_use]
    pub fn get(&self, id: PickupId) -> Option<&ResourcePickup> {
        self.pickups.iter().find(|pickup| pickup.id == id)
    }

    /// First pickup overlapping the circle at `position`.
    #[must_use]
    pub fn first_overlapping(&self, position: Vec2, radius: f32) -> Option<ResourcePickup> {
        self.pickups
            .iter()
            .copied()
            .find(|pickup| circles_overlap(position, radius, pickup.position, PICKUP_RADIUS))
    }

    /// Every pickup as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[ResourcePickup] {
        &self.pickups
    }

    /// Number of pickups in the field.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pickups.len()
    }

    /// Reports whether the field is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pickups.is_empty()
    }
}
