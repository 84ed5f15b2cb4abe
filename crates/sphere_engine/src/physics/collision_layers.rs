//! Collision roles for filtering pair generation
//!
//! Each kind is a target, a projectile, both or neither. Pairs are only formed
//! between a target and a projectile, so the roles decide which kinds are ever
//! compared.

use crate::ecs::EntityKind;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Collision roles of an entity kind
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct Roles: u8 {
        /// Can be hit
        const TARGET = 1 << 0;
        /// Can hit a target
        const PROJECTILE = 1 << 1;
    }
}

impl Roles {
    /// Roles used when a kind's configuration does not override them
    pub fn default_for(kind: EntityKind) -> Self {
        match kind {
            // Ships are mutual targets and projectiles
            EntityKind::Ship => Roles::TARGET | Roles::PROJECTILE,
            EntityKind::Rock => Roles::TARGET,
            EntityKind::Bullet | EntityKind::Explosion => Roles::PROJECTILE,
            EntityKind::CellMarker => Roles::empty(),
        }
    }

    /// Whether entities with these roles are collected as targets
    pub fn is_target(self) -> bool {
        self.contains(Roles::TARGET)
    }

    /// Whether entities with these roles are collected as projectiles
    pub fn is_projectile(self) -> bool {
        self.contains(Roles::PROJECTILE)
    }
}

impl Default for Roles {
    fn default() -> Self {
        Roles::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_roles() {
        let ship = Roles::default_for(EntityKind::Ship);
        assert!(ship.is_target() && ship.is_projectile());
        assert!(Roles::default_for(EntityKind::Rock).is_target());
        assert!(!Roles::default_for(EntityKind::Rock).is_projectile());
        assert!(Roles::default_for(EntityKind::Bullet).is_projectile());
        assert!(Roles::default_for(EntityKind::CellMarker).is_empty());
    }

    #[test]
    fn test_roles_serialize_by_name() {
        let both = Roles::TARGET | Roles::PROJECTILE;
        let text = ron::to_string(&both).unwrap();
        assert!(text.contains("TARGET") && text.contains("PROJECTILE"));
        assert_eq!(ron::from_str::<Roles>(&text).unwrap(), both);
        assert_eq!(ron::from_str::<Roles>("\"TARGET\"").unwrap(), Roles::TARGET);
    }
}
