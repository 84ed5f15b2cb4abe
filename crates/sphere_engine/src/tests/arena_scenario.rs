//! A ship inside a ring of rocks, firing outward
//!
//! Exercises every subsystem through the public simulation surface: pools,
//! kinematics, collision detection, dispatch, lifetimes and shutdown.

use crate::prelude::*;
use crate::foundation::math::utils::deg_to_rad;
use approx::assert_relative_eq;
use std::cell::Cell;
use std::collections::HashSet;
use std::rc::Rc;

#[cfg(test)]
mod tests {
    use super::*;

    const RING_ARC_DEGREES: f64 = 10.0;
    const RING_SIZE: usize = 12;

    fn place(sim: &mut Simulation, kind: EntityKind, lat: f64, lng: f64) -> EntityHandle {
        let handle = sim.acquire(kind, None).unwrap();
        sim.entity_mut(handle)
            .unwrap()
            .motion
            .set_orientation(from_lat_lng(deg_to_rad(lat), deg_to_rad(lng)));
        handle
    }

    fn fire(sim: &mut Simulation, ship: EntityHandle, heading: f64) -> EntityHandle {
        let orientation = sim.orientation_of(ship).unwrap();
        let bullet = sim.acquire(EntityKind::Bullet, None).unwrap();
        let entity = sim.entity_mut(bullet).unwrap();
        entity.motion.set_orientation(orientation);
        entity.owner = Some(ship);
        sim.set_heading(bullet, heading, 2.0).unwrap();
        bullet
    }

    #[test]
    fn test_colocated_pair_collides_and_separated_pair_does_not() {
        let mut sim = Simulation::new(SimulationConfig::default()).unwrap();
        let target = place(&mut sim, EntityKind::Ship, 0.0, 0.0);
        let projectile = place(&mut sim, EntityKind::Bullet, 0.0, 0.0);

        sim.step(0.0).unwrap();
        assert_eq!(sim.collisions_this_tick(), &[CollisionPair::new(target, projectile)]);

        sim.entity_mut(projectile)
            .unwrap()
            .motion
            .set_orientation(from_lat_lng(0.0, deg_to_rad(5.0)));
        sim.step(0.0).unwrap();
        assert!(sim.collisions_this_tick().is_empty());
    }

    #[test]
    fn test_ship_clears_ring_of_rocks() {
        let mut sim = Simulation::new(SimulationConfig::default()).unwrap();
        let radius = sim.sphere_radius();
        let ship = place(&mut sim, EntityKind::Ship, 0.0, 0.0);
        for i in 0..RING_SIZE {
            let azimuth = std::f64::consts::TAU * i as f64 / RING_SIZE as f64;
            place(
                &mut sim,
                EntityKind::Rock,
                RING_ARC_DEGREES * azimuth.sin(),
                RING_ARC_DEGREES * azimuth.cos(),
            );
        }

        let destroyed = Rc::new(Cell::new(0usize));
        let counter = Rc::clone(&destroyed);
        sim.register_handler(EntityKind::Bullet, EntityKind::Rock, move |pair: &CollisionPair, ctx: &mut ResolutionContext| {
            counter.set(counter.get() + 1);
            if let Some(at) = ctx.orientation_of(pair.target) {
                ctx.spawn(SpawnRequest::at(EntityKind::Explosion, at));
            }
            ctx.release(pair.target);
            ctx.release(pair.projectile);
        });

        let mut fired = 0;
        for tick in 0..300 {
            if tick % 10 == 0 {
                fire(&mut sim, ship, deg_to_rad(37.0 * fired as f64));
                fired += 1;
            }
            sim.step(16.0).unwrap();

            let mut projectiles = HashSet::new();
            for pair in sim.collisions_this_tick() {
                assert!(projectiles.insert(pair.projectile), "{} hit twice in one tick", pair.projectile);
            }

            for kind in EntityKind::ALL {
                let handles = sim.active_handles(kind);
                assert_eq!(sim.pool_stats(kind).unwrap().active, handles.len());
                for handle in handles {
                    assert_relative_eq!(sim.position_of(handle).unwrap().norm(), radius, epsilon = 1e-9);
                }
            }
        }

        assert!(destroyed.get() > 0);
        assert_eq!(sim.active_handles(EntityKind::Rock).len(), RING_SIZE - destroyed.get());
        assert_eq!(sim.active_handles(EntityKind::Ship), vec![ship]);
        // Bullets live 1.2 s; the last one was fired 0.16 s before the end
        assert!(sim.active_handles(EntityKind::Bullet).len() <= 8);

        let bullets = sim.pool_stats(EntityKind::Bullet).unwrap();
        assert_eq!(bullets.acquisitions, fired);
        assert!(bullets.hits > 0, "released bullets are reused");

        let report = sim.shutdown();
        assert_eq!(report.failed, 0);
        assert_eq!(report.skipped, 0);
        for kind in EntityKind::ALL {
            let stats = sim.pool_stats(kind).unwrap();
            assert_eq!(stats.disposals, stats.misses, "{kind} items disposed exactly once");
            assert_eq!(stats.active + stats.idle + stats.disposing, 0);
        }
    }
}
