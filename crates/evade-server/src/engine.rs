use std::time::Duration;

use tokio::time::Instant;

use evade_core::tick::TickResult;
use evade_world::{Challenge, EngineError};

use crate::channel::{CommandChannel, CommandRequest};

/// Drives a [`Challenge`] one tick at a time, collecting team commands from a
/// [`CommandChannel`] under a per-tick deadline.
#[derive(Debug)]
pub struct MatchEngine<C> {
    challenge: Challenge,
    channel: C,
    time_per_tick: Duration,
}

impl<C: CommandChannel> MatchEngine<C> {
    pub fn new(challenge: Challenge, channel: C, time_per_tick: Duration) -> Self {
        Self {
            challenge,
            channel,
            time_per_tick,
        }
    }

    pub fn challenge(&self) -> &Challenge {
        &self.challenge
    }

    pub fn setup(&mut self) -> Result<(), EngineError> {
        self.challenge.setup()
    }

    /// Play tick `tick`. Tick 0 only observes: no commands are requested.
    ///
    /// Completion is checked first, so a catch during tick N ends the match
    /// at the start of tick N+1 without applying any further commands.
    pub async fn play_one_tick(&mut self, tick: u32) -> Result<TickResult, EngineError> {
        self.challenge.set_current_tick(tick);

        if self.challenge.is_game_complete() {
            let game_results = self.challenge.game_results();
            tracing::info!(
                tick,
                score = self.challenge.score(),
                "Game complete. Your score is: {}",
                self.challenge.score()
            );
            return Ok(TickResult::Complete { game_results });
        }

        if tick > 0 {
            let prompts = self
                .challenge
                .teams()
                .iter()
                .map(|team| {
                    self.challenge
                        .serialize_for_team(&team.id)
                        .map(|state| (team.id.clone(), state))
                })
                .collect::<Result<Vec<_>, _>>()?;
            let request = CommandRequest {
                tick,
                deadline: Instant::now() + self.time_per_tick,
                prompts,
            };
            let commands = self.channel.fetch_commands(request).await;
            tracing::debug!(tick, received = commands.len(), "Commands collected");
            self.challenge.apply_commands(commands)?;
        }

        self.challenge.advance()
    }
}
