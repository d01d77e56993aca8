use evade_core::geometry::{Direction, Position, Vector};
use evade_core::team::TeamId;
use evade_core::views::CharacterView;

/// The single entity controlled by the registered team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Character {
    id: String,
    team_id: TeamId,
    position: Position,
    spawn_point: Position,
    alive: bool,
    direction: Option<Direction>,
    moved_this_tick: bool,
    respawn_cooldown_ticks: u32,
    respawn_countdown: u32,
}

impl Character {
    pub fn new(team_id: TeamId, spawn_point: Position, respawn_cooldown_ticks: u32) -> Self {
        Self {
            id: format!("character-{team_id}"),
            team_id,
            position: spawn_point,
            spawn_point,
            alive: true,
            direction: None,
            moved_this_tick: false,
            respawn_cooldown_ticks,
            respawn_countdown: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn team_id(&self) -> &TeamId {
        &self.team_id
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn has_moved_this_tick(&self) -> bool {
        self.moved_this_tick
    }

    pub fn direction(&self) -> Option<Direction> {
        self.direction
    }

    /// Commit a move that the world already validated.
    pub fn move_to(&mut self, position: Position, vector: Vector) {
        self.position = position;
        if let Some(direction) = vector.direction() {
            self.direction = Some(direction);
        }
        self.moved_this_tick = true;
    }

    /// Called once per tick after commands were applied.
    pub fn update(&mut self) {
        self.moved_this_tick = false;
        if self.alive {
            return;
        }
        self.respawn_countdown = self.respawn_countdown.saturating_sub(1);
        if self.respawn_countdown == 0 {
            self.alive = true;
            self.position = self.spawn_point;
            self.direction = None;
            tracing::debug!(character = %self.id, "Character respawned");
        }
    }

    /// Mark the character as caught. It respawns at its spawn point after the
    /// configured cooldown if the match keeps running.
    pub fn kill(&mut self) {
        if !self.alive {
            return;
        }
        self.alive = false;
        self.respawn_countdown = self.respawn_cooldown_ticks.max(1);
    }

    pub fn to_view(&self) -> CharacterView {
        CharacterView {
            id: self.id.clone(),
            team_id: self.team_id.clone(),
            position: self.position,
            alive: self.alive,
            spawn_point: self.spawn_point,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn character() -> Character {
        Character::new(TeamId::from("t1"), Position::new(2, 2), 3)
    }

    #[test]
    fn move_sets_flag_until_update() {
        let mut c = character();
        c.move_to(Position::new(3, 2), Vector::new(1, 0));
        assert_eq!(c.position(), Position::new(3, 2));
        assert_eq!(c.direction(), Some(Direction::Right));
        assert!(c.has_moved_this_tick());
        c.update();
        assert!(!c.has_moved_this_tick());
    }

    #[test]
    fn respawns_at_spawn_after_cooldown() {
        let mut c = character();
        c.move_to(Position::new(2, 3), Vector::new(0, 1));
        c.kill();
        assert!(!c.is_alive());
        c.update();
        c.update();
        assert!(!c.is_alive());
        c.update();
        assert!(c.is_alive());
        assert_eq!(c.position(), Position::new(2, 2));
    }

    #[test]
    fn view_reports_owner_and_spawn() {
        let view = character().to_view();
        assert_eq!(view.team_id, TeamId::from("t1"));
        assert_eq!(view.spawn_point, Position::new(2, 2));
        assert!(view.alive);
    }
}
