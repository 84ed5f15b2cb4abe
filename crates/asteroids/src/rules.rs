//! Game rules: score, lives and respawning
//!
//! The simulation core only reports collisions. What a hit means is decided
//! here, inside the handlers registered with the simulation.

use sphere_engine::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;

/// Score and lives shared between handlers and the game loop
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scoreboard {
    /// Points earned
    pub score: u32,
    /// Ships left, the current one included
    pub lives: u32,
    /// Rocks destroyed by bullets
    pub rocks_destroyed: u32,
    /// Ships lost to rocks
    pub ships_lost: u32,
    /// When the next ship appears, if one is pending
    pub respawn_at: Option<Millis>,
}

impl Scoreboard {
    /// Fresh board with `lives` ships
    pub fn new(lives: u32) -> Self {
        Self {
            lives,
            ..Self::default()
        }
    }

    /// Whether the game has ended
    pub fn is_game_over(&self) -> bool {
        self.lives == 0 && self.respawn_at.is_none()
    }

    /// Take the respawn that is due at `now`.
    ///
    /// Once scheduled a respawn always fires, even if the last life was lost
    /// while it was pending.
    pub fn take_due_respawn(&mut self, now: Millis) -> bool {
        match self.respawn_at {
            Some(at) if now >= at => {
                self.respawn_at = None;
                true
            }
            _ => false,
        }
    }
}

/// Shared handle to the scoreboard
pub type SharedScoreboard = Rc<RefCell<Scoreboard>>;

/// Register the game's collision handlers on `sim`
pub fn install(sim: &mut Simulation, board: &SharedScoreboard, rock_score: u32, respawn_delay: Millis) {
    let scores = Rc::clone(board);
    sim.register_handler(EntityKind::Bullet, EntityKind::Rock, move |pair: &CollisionPair, ctx: &mut ResolutionContext| {
        let mut board = scores.borrow_mut();
        board.score += rock_score;
        board.rocks_destroyed += 1;
        if let Some(at) = ctx.orientation_of(pair.target) {
            ctx.spawn(SpawnRequest::at(EntityKind::Explosion, at));
        }
        ctx.release(pair.target);
        ctx.release(pair.projectile);
    });

    let losses = Rc::clone(board);
    sim.register_handler(EntityKind::Ship, EntityKind::Rock, move |pair: &CollisionPair, ctx: &mut ResolutionContext| {
        let mut board = losses.borrow_mut();
        board.lives = board.lives.saturating_sub(1);
        board.ships_lost += 1;
        board.respawn_at = Some(ctx.now() + respawn_delay);
        log::info!("{} destroyed by {}, {} lives left", pair.projectile, pair.target, board.lives);
        if let Some(at) = ctx.orientation_of(pair.projectile) {
            ctx.spawn(SpawnRequest::at(EntityKind::Explosion, at));
        }
        ctx.release(pair.projectile);
    });

    // Friendly fire between ships is ignored
    sim.register_handler(EntityKind::Ship, EntityKind::Ship, |pair: &CollisionPair, _: &mut ResolutionContext| {
        log::debug!("{} brushed {}", pair.projectile, pair.target);
    });
}
