use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, Notify, mpsc, oneshot};
use tokio::time::Instant;

use evade_core::action::Command;
use evade_core::team::{Team, TeamId};
use evade_core::tick::GameResults;
use evade_core::views::PlayerState;
use evade_world::EngineError;

/// How long a team's queue may stay full before its results are dropped.
const RESULTS_SEND_TIMEOUT: Duration = Duration::from_secs(1);

/// One tick's worth of questions: every team gets its own view and must
/// answer before `deadline`.
#[derive(Debug)]
pub struct CommandRequest {
    pub tick: u32,
    pub deadline: Instant,
    pub prompts: Vec<(TeamId, PlayerState)>,
}

/// Source of team commands for the engine.
pub trait CommandChannel: Send + Sync {
    /// Returns whatever arrived by the deadline. Teams that did not answer
    /// are simply absent.
    fn fetch_commands(
        &self,
        request: CommandRequest,
    ) -> impl Future<Output = HashMap<TeamId, Command>> + Send;
}

/// A view handed to a connected team together with the slot for its answer.
#[derive(Debug)]
pub struct TeamPrompt {
    pub tick: u32,
    pub state: Box<PlayerState>,
    pub reply: oneshot::Sender<Command>,
}

/// Messages delivered to one team's connection.
#[derive(Debug)]
pub enum TeamEvent {
    Prompt(TeamPrompt),
    Results(GameResults),
}

#[derive(Debug, Default)]
struct HubInner {
    /// Registered but not yet claimed by a match.
    waiting: Vec<Team>,
    senders: BTreeMap<TeamId, mpsc::Sender<TeamEvent>>,
}

/// In-process fan-out to connected teams. Shared between the socket handlers
/// (which register teams and answer prompts) and the match runner.
#[derive(Debug, Clone, Default)]
pub struct TeamHub {
    inner: Arc<Mutex<HubInner>>,
    registered: Arc<Notify>,
    registrations: Arc<AtomicU64>,
}

impl TeamHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id for the next registering team, counted from 1.
    pub fn allocate_team_id(&self) -> TeamId {
        TeamId::numbered(self.registrations.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Register a team for the next match and return its event stream.
    pub async fn register(&self, team: Team, buffer: usize) -> mpsc::Receiver<TeamEvent> {
        let (tx, rx) = mpsc::channel(buffer);
        {
            let mut inner = self.inner.lock().await;
            inner.senders.insert(team.id.clone(), tx);
            inner.waiting.push(team);
        }
        self.registered.notify_waiters();
        rx
    }

    /// Forget a team's connection. A team still waiting for a match is
    /// removed from the lobby.
    pub async fn disconnect(&self, team_id: &TeamId) {
        let mut inner = self.inner.lock().await;
        inner.senders.remove(team_id);
        inner.waiting.retain(|t| &t.id != team_id);
    }

    pub async fn connected(&self) -> usize {
        self.inner.lock().await.senders.len()
    }

    /// Wait until `expected` teams are registered, then claim them for a
    /// match. Fails once `timeout` elapses.
    pub async fn wait_for_teams(
        &self,
        expected: usize,
        timeout: Duration,
    ) -> Result<Vec<Team>, EngineError> {
        let deadline = Instant::now() + timeout;
        loop {
            let notified = self.registered.notified();
            {
                let mut inner = self.inner.lock().await;
                if inner.waiting.len() >= expected {
                    return Ok(inner.waiting.drain(..).collect());
                }
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                let registered = self.inner.lock().await.waiting.len();
                return Err(EngineError::StartTimeout {
                    expected,
                    registered,
                });
            }
        }
    }

    /// Send the final standings to every connected team and drop their
    /// streams, which closes the connections. A team whose queue stays full
    /// past [`RESULTS_SEND_TIMEOUT`] does not get them.
    pub async fn finish(&self, results: &GameResults, teams: &[Team]) {
        let senders: Vec<_> = {
            let mut inner = self.inner.lock().await;
            teams
                .iter()
                .filter_map(|team| inner.senders.remove(&team.id).map(|tx| (&team.id, tx)))
                .collect()
        };

        let deliveries = senders.into_iter().map(|(team_id, tx)| async move {
            let event = TeamEvent::Results(results.clone());
            if let Err(e) = tx.send_timeout(event, RESULTS_SEND_TIMEOUT).await {
                tracing::debug!(team_id = %team_id, error = %e, "Results not delivered");
            }
        });
        futures::future::join_all(deliveries).await;
    }
}

impl CommandChannel for TeamHub {
    async fn fetch_commands(&self, request: CommandRequest) -> HashMap<TeamId, Command> {
        let CommandRequest {
            tick,
            deadline,
            prompts,
        } = request;

        let mut pending = Vec::with_capacity(prompts.len());
        {
            let inner = self.inner.lock().await;
            for (team_id, state) in prompts {
                let Some(tx) = inner.senders.get(&team_id) else {
                    tracing::debug!(team_id = %team_id, tick, "Team not connected");
                    continue;
                };
                let (reply, rx) = oneshot::channel();
                let prompt = TeamPrompt {
                    tick,
                    state: Box::new(state),
                    reply,
                };
                if tx.try_send(TeamEvent::Prompt(prompt)).is_err() {
                    tracing::warn!(team_id = %team_id, tick, "Team prompt queue full or closed");
                    continue;
                }
                pending.push((team_id, rx));
            }
        }

        let answers = pending.into_iter().map(|(team_id, rx)| async move {
            match tokio::time::timeout_at(deadline, rx).await {
                Ok(Ok(command)) => Some((team_id, command)),
                Ok(Err(_)) => {
                    tracing::debug!(team_id = %team_id, tick, "Team dropped its prompt");
                    None
                },
                Err(_) => {
                    tracing::debug!(team_id = %team_id, tick, "Team missed the tick deadline");
                    None
                },
            }
        });

        futures::future::join_all(answers)
            .await
            .into_iter()
            .flatten()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use evade_core::action::Action;
    use evade_core::test_helpers::make_team;
    use evade_core::views::Constants;
    use evade_core::views::MapView;

    use super::*;

    fn empty_state() -> PlayerState {
        PlayerState {
            constants: Constants::default(),
            current_tick_number: 0,
            tick: 0,
            map: MapView {
                width: 0,
                height: 0,
                tiles: Vec::new(),
            },
            threats: Vec::new(),
            your_character: None,
            last_tick_errors: Vec::new(),
        }
    }

    /// Answer every prompt with `action` after `delay`.
    fn spawn_bot(mut rx: mpsc::Receiver<TeamEvent>, delay: Duration, action: Action) {
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let TeamEvent::Prompt(prompt) = event {
                    tokio::time::sleep(delay).await;
                    let _ = prompt.reply.send(Command::from_actions(&[action]));
                }
            }
        });
    }

    fn request(tick: u32, budget: Duration, teams: &[&Team]) -> CommandRequest {
        CommandRequest {
            tick,
            deadline: Instant::now() + budget,
            prompts: teams.iter().map(|t| (t.id.clone(), empty_state())).collect(),
        }
    }

    #[tokio::test]
    async fn collects_answers_from_all_teams() {
        let hub = TeamHub::new();
        let a = make_team("a");
        let b = make_team("b");
        spawn_bot(hub.register(a.clone(), 4).await, Duration::ZERO, Action::MoveUp);
        spawn_bot(hub.register(b.clone(), 4).await, Duration::ZERO, Action::MoveDown);

        let commands = hub
            .fetch_commands(request(1, Duration::from_millis(500), &[&a, &b]))
            .await;
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[&a.id], Command::from_actions(&[Action::MoveUp]));
    }

    #[tokio::test]
    async fn slow_team_does_not_delay_the_tick() {
        let hub = TeamHub::new();
        let fast = make_team("fast");
        let slow = make_team("slow");
        spawn_bot(hub.register(fast.clone(), 4).await, Duration::ZERO, Action::MoveUp);
        spawn_bot(
            hub.register(slow.clone(), 4).await,
            Duration::from_secs(5),
            Action::MoveUp,
        );

        let started = Instant::now();
        let commands = hub
            .fetch_commands(request(1, Duration::from_millis(100), &[&fast, &slow]))
            .await;
        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(commands.contains_key(&fast.id));
        assert!(!commands.contains_key(&slow.id));
    }

    #[tokio::test]
    async fn unknown_or_disconnected_team_has_no_command() {
        let hub = TeamHub::new();
        let a = make_team("a");
        let _rx = hub.register(a.clone(), 4).await;
        hub.disconnect(&a.id).await;
        let ghost = make_team("ghost");
        let commands = hub
            .fetch_commands(request(1, Duration::from_millis(50), &[&a, &ghost]))
            .await;
        assert!(commands.is_empty());
        assert_eq!(hub.connected().await, 0);
    }

    #[tokio::test]
    async fn wait_for_teams_returns_once_enough_registered() {
        let hub = TeamHub::new();
        let waiter = {
            let hub = hub.clone();
            tokio::spawn(async move { hub.wait_for_teams(2, Duration::from_secs(5)).await })
        };
        let _a = hub.register(make_team("a"), 4).await;
        let _b = hub.register(make_team("b"), 4).await;
        let teams = waiter.await.unwrap().unwrap();
        assert_eq!(teams.len(), 2);
        assert_eq!(teams[0].external_name, "a");
    }

    #[tokio::test]
    async fn wait_for_teams_times_out() {
        let hub = TeamHub::new();
        let _a = hub.register(make_team("a"), 4).await;
        let err = hub
            .wait_for_teams(2, Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::StartTimeout {
                expected: 2,
                registered: 1
            }
        ));
    }

    #[tokio::test]
    async fn finish_delivers_results_and_closes() {
        let hub = TeamHub::new();
        let a = make_team("a");
        let mut rx = hub.register(a.clone(), 4).await;
        let results = GameResults {
            results: Vec::new(),
        };
        hub.finish(&results, std::slice::from_ref(&a)).await;
        assert!(matches!(rx.recv().await, Some(TeamEvent::Results(_))));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn stalled_team_does_not_lock_the_hub_on_finish() {
        let hub = TeamHub::new();
        let a = make_team("a");
        let _rx = hub.register(a.clone(), 1).await;
        let results = GameResults {
            results: Vec::new(),
        };
        // Nobody drains the queue: fill its single slot.
        {
            let inner = hub.inner.lock().await;
            inner.senders[&a.id]
                .try_send(TeamEvent::Results(results.clone()))
                .unwrap();
        }

        let finishing = {
            let hub = hub.clone();
            let teams = vec![a.clone()];
            tokio::spawn(async move { hub.finish(&results, &teams).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        let connected = tokio::time::timeout(Duration::from_millis(500), hub.connected())
            .await
            .expect("hub stays usable while results are pending");
        assert_eq!(connected, 0);

        tokio::time::timeout(RESULTS_SEND_TIMEOUT * 3, finishing)
            .await
            .expect("finish gives up on a stalled team")
            .unwrap();
    }

    #[test]
    fn team_ids_follow_registration_order() {
        let hub = TeamHub::new();
        assert_eq!(hub.allocate_team_id(), TeamId::numbered(1));
        assert_eq!(hub.allocate_team_id(), TeamId::numbered(2));
    }
}
