//! Headless asteroids on a sphere
//!
//! Builds a simulation from a configuration file (first argument, `.toml` or
//! `.ron`), scatters rocks, and lets an autopilot ship cruise and fire until
//! the tick limit is reached or the last ship is lost.

mod config;
mod rules;

use config::GameConfig;
use nalgebra::{Unit, UnitQuaternion, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rules::{Scoreboard, SharedScoreboard};
use sphere_engine::foundation::logging;
use sphere_engine::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;

struct Game {
    sim: Simulation,
    board: SharedScoreboard,
    config: GameConfig,
    rng: StdRng,
    ship: Option<EntityHandle>,
    last_shot: Option<Millis>,
}

impl Game {
    fn new(config: GameConfig) -> Result<Self, SimulationError> {
        let mut sim = Simulation::new(config.simulation.clone())?;
        let board = Rc::new(RefCell::new(Scoreboard::new(config.gameplay.starting_lives)));
        rules::install(
            &mut sim,
            &board,
            config.gameplay.rock_score,
            config.gameplay.respawn_delay_ms,
        );

        Ok(Self {
            sim,
            board,
            rng: StdRng::seed_from_u64(config.gameplay.seed),
            config,
            ship: None,
            last_shot: None,
        })
    }

    fn random_orientation(&mut self) -> Quat {
        let axis = Vector3::new(
            self.rng.gen_range(-1.0..1.0),
            self.rng.gen_range(-1.0..1.0),
            self.rng.gen_range(-1.0..1.0),
        );
        if axis.norm() < 1e-6 {
            return Quat::identity();
        }
        UnitQuaternion::from_axis_angle(&Unit::new_normalize(axis), self.rng.gen_range(0.0..std::f64::consts::PI))
    }

    fn spawn_rocks(&mut self) -> Result<(), SimulationError> {
        let (min_speed, max_speed) = self.config.gameplay.asteroid_speed;
        for _ in 0..self.config.gameplay.asteroid_count {
            let orientation = self.random_orientation();
            // Keep the ship's spawn point clear
            if rotate_up(&orientation).dot(&UP) > 0.9 {
                continue;
            }
            let heading = self.rng.gen_range(0.0..std::f64::consts::TAU);
            let speed = self.rng.gen_range(min_speed..=max_speed);
            let rock = self.sim.acquire(EntityKind::Rock, None)?;
            if let Some(entity) = self.sim.entity_mut(rock) {
                entity.motion.set_orientation(orientation);
            }
            self.sim.set_heading(rock, heading, speed)?;
        }
        log::info!("Placed {} rocks", self.sim.active_handles(EntityKind::Rock).len());
        Ok(())
    }

    fn spawn_ship(&mut self) -> Result<(), SimulationError> {
        let ship = self.sim.acquire(EntityKind::Ship, None)?;
        self.sim.set_heading(ship, 0.0, self.config.gameplay.ship_speed)?;
        log::info!("{ship} launched at {} ms", self.sim.now());
        self.ship = Some(ship);
        Ok(())
    }

    fn fire(&mut self, ship: EntityHandle) -> Result<(), SimulationError> {
        let orientation = self.sim.orientation_of(ship)?;
        let bullet = self.sim.acquire(EntityKind::Bullet, None)?;
        if let Some(entity) = self.sim.entity_mut(bullet) {
            entity.motion.set_orientation(orientation);
            entity.owner = Some(ship);
        }
        let heading = self.rng.gen_range(-0.3..0.3);
        self.sim.set_heading(bullet, heading, self.config.gameplay.bullet_speed)?;
        self.last_shot = Some(self.sim.now());
        Ok(())
    }

    /// Steer and shoot for the current ship
    fn autopilot(&mut self) -> Result<(), SimulationError> {
        let Some(ship) = self.ship else { return Ok(()) };
        if self.sim.entity(ship).is_none() {
            self.ship = None;
            return Ok(());
        }
        if let Some(entity) = self.sim.entity_mut(ship) {
            entity.motion.turn(self.config.gameplay.ship_turn_per_tick);
        }
        self.sim.set_heading(ship, 0.0, self.config.gameplay.ship_speed)?;

        let due = self
            .last_shot
            .map_or(true, |at| self.sim.now() - at >= self.config.gameplay.fire_interval_ms);
        if due {
            self.fire(ship)?;
        }
        Ok(())
    }

    fn run(&mut self) -> Result<(), SimulationError> {
        self.spawn_rocks()?;
        self.spawn_ship()?;

        for _ in 0..self.config.gameplay.max_ticks {
            let respawn = self.board.borrow_mut().take_due_respawn(self.sim.now());
            if respawn {
                if self.board.borrow().lives == 0 {
                    log::warn!("Respawning with no lives left");
                }
                self.spawn_ship()?;
            }
            self.autopilot()?;

            let report = self.sim.step(self.config.gameplay.tick_ms)?;
            if report.collisions > 0 {
                log::debug!("Tick {}: {} collisions", report.tick, report.collisions);
            }

            if self.sim.active_handles(EntityKind::Rock).is_empty() {
                log::info!("All rocks destroyed at {} ms", self.sim.now());
                break;
            }
            if self.board.borrow().is_game_over() && self.sim.active_handles(EntityKind::Ship).is_empty() {
                log::info!("Game over at {} ms", self.sim.now());
                break;
            }
        }
        Ok(())
    }

    fn report(&mut self) {
        let board = self.board.borrow().clone();
        log::info!(
            "Score {} ({} rocks, {} ships lost, {} lives left) after {} ticks",
            board.score,
            board.rocks_destroyed,
            board.ships_lost,
            board.lives,
            self.sim.tick()
        );
        for kind in EntityKind::ALL {
            if let Ok(stats) = self.sim.pool_stats(kind) {
                log::info!(
                    "Pool {kind}: {} active, {} idle, {} hits, {} misses, {} evictions",
                    stats.active,
                    stats.idle,
                    stats.hits,
                    stats.misses,
                    stats.evictions
                );
            }
        }
        let footprints = self.sim.footprint_stats();
        log::info!(
            "Footprints: {} memo hits, {} misses",
            footprints.memo_hits,
            footprints.memo_misses
        );
        let drained = self.sim.shutdown();
        log::info!("Shutdown disposed {} items ({} failed)", drained.disposed, drained.failed);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_with_default("info");
    log::info!("Starting headless asteroids");

    let path = std::env::args().nth(1);
    let config = GameConfig::load_or_default(path.as_deref());

    let mut game = Game::new(config)?;
    let result = game.run();
    game.report();

    match result {
        Ok(()) => {
            log::info!("Asteroids finished successfully");
            Ok(())
        }
        Err(e) => {
            log::error!("Simulation error: {e}");
            Err(e.into())
        }
    }
}
