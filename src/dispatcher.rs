use crate::ai::Narrator;
use crate::error::{GameError, StoreError};
use crate::game_state::{ChoiceOption, GameSession, TurnOutcome};
use crate::prompts::{
    CHOICE_REPROMPT, FAREWELL, GENERATION_APOLOGY, INVALID_CHOICE, REPLAY_PROMPT, SESSION_BUSY,
    STORE_UNAVAILABLE, WELCOME,
};
use crate::save::Record;
use crate::session_id::{SessionId, SessionKeys};
use crate::store::{SessionStore, Snapshot};

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Phrases that start a brand-new game whatever the stored state.
pub const RESTART_PHRASES: [&str; 4] = [
    "begin the crypto adventure",
    "welcome to the crypto adventure navigate your choices",
    "enter the world of web3 and start your journey",
    "shape the future of crypto with every choice",
];

/// Trimmed, case-insensitive exact match. The empty string is not a restart
/// phrase: it only opens a game when nothing is stored yet.
pub fn is_restart_phrase(input: &str) -> bool {
    let input = input.trim().to_lowercase();
    !input.is_empty() && RESTART_PHRASES.contains(&input.as_str())
}

/// Which transition an inbound message triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    StartNewGame,
    PlayChoice(ChoiceOption),
    AskForChoice,
    Farewell,
    AskReplay,
}

pub fn decide(record: Option<&Record>, input: &str) -> Decision {
    let input = input.trim().to_lowercase();
    if is_restart_phrase(&input) {
        return Decision::StartNewGame;
    }

    match record {
        None => Decision::StartNewGame,
        Some(Record::Terminal) => match input.as_str() {
            "yes" => Decision::StartNewGame,
            "no" => Decision::Farewell,
            _ => Decision::AskReplay,
        },
        // A live record that isn't waiting on a choice can't make progress.
        Some(Record::Live(game)) if !game.awaiting_choice() => Decision::StartNewGame,
        Some(Record::Live(_)) => match input.parse::<ChoiceOption>() {
            Ok(option) => Decision::PlayChoice(option),
            Err(_) => Decision::AskForChoice,
        },
    }
}

/// One async mutex per session id, held for a whole fetch → transition → store
/// sequence. A request that finds it held is turned away rather than queued, so
/// a duplicate submission applies once. Entries nobody holds are pruned on the
/// next acquisition.
#[derive(Default)]
struct SessionLocks {
    locks: Mutex<HashMap<SessionId, Arc<AsyncMutex<()>>>>,
}

impl SessionLocks {
    fn try_acquire(&self, id: &SessionId) -> Option<OwnedMutexGuard<()>> {
        let lock = {
            let mut locks = match self.locks.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(id.clone()).or_default().clone()
        };
        lock.try_lock_owned().ok()
    }
}

/// Maps `(requester, input)` to a reply, applying at most one transition to the
/// requester's stored session. Never fails: every error becomes reply text.
pub struct Dispatcher {
    store: SessionStore,
    narrator: Narrator,
    keys: SessionKeys,
    locks: SessionLocks,
}

impl Dispatcher {
    pub fn new(store: SessionStore, narrator: Narrator, keys: SessionKeys) -> Self {
        Self {
            store,
            narrator,
            keys,
            locks: SessionLocks::default(),
        }
    }

    pub fn session_id(&self, requester: &str) -> SessionId {
        self.keys.derive(requester)
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub async fn handle(&self, requester: &str, input: &str) -> String {
        let id = self.session_id(requester);
        let Some(_guard) = self.locks.try_acquire(&id) else {
            log::warn!("Session {id} is already handling a request; turned away");
            return SESSION_BUSY.to_string();
        };

        let snapshot = match self.store.fetch(&id).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::error!("Failed to load session {id}: {e}");
                return STORE_UNAVAILABLE.to_string();
            }
        };

        let decision = decide(snapshot.record.as_ref(), input);
        log::debug!("Session {id}: {decision:?}");

        match decision {
            Decision::StartNewGame => self.start_new_game(&id, &snapshot).await,
            Decision::PlayChoice(option) => self.play_choice(&id, &snapshot, option).await,
            Decision::AskForChoice => CHOICE_REPROMPT.to_string(),
            Decision::AskReplay => REPLAY_PROMPT.to_string(),
            Decision::Farewell => match self.store.replace(&id, &snapshot, None).await {
                Ok(()) => {
                    log::info!("Session {id} ended by the player");
                    FAREWELL.to_string()
                }
                Err(e) => store_failure_reply(&id, e),
            },
        }
    }

    async fn start_new_game(&self, id: &SessionId, snapshot: &Snapshot) -> String {
        let mut game = GameSession::new();
        let scenario = match game.start(&self.narrator).await {
            Ok(scenario) => scenario,
            Err(e) => return game_failure_reply(id, e),
        };

        match self.store.replace(id, snapshot, Some(&Record::Live(game))).await {
            Ok(()) => {
                log::info!("Session {id} started a new game");
                format!("{WELCOME}{scenario}")
            }
            Err(e) => store_failure_reply(id, e),
        }
    }

    async fn play_choice(&self, id: &SessionId, snapshot: &Snapshot, option: ChoiceOption) -> String {
        let Some(Record::Live(game)) = &snapshot.record else {
            return CHOICE_REPROMPT.to_string();
        };

        let mut game = game.clone();
        let (record, reply) = match game.apply_choice(&self.narrator, option.as_str()).await {
            Ok(TurnOutcome::Continue(scenario)) => (Record::Live(game), scenario),
            Ok(TurnOutcome::Finished(summary)) => {
                (Record::Terminal, format!("{summary}\n\n{REPLAY_PROMPT}"))
            }
            Err(e) => return game_failure_reply(id, e),
        };

        match self.store.replace(id, snapshot, Some(&record)).await {
            Ok(()) => {
                if record.is_terminal() {
                    log::info!("Session {id} reached the end of its game");
                }
                reply
            }
            Err(e) => store_failure_reply(id, e),
        }
    }
}

fn game_failure_reply(id: &SessionId, error: GameError) -> String {
    match error {
        GameError::InvalidChoice(_) => INVALID_CHOICE.to_string(),
        GameError::InvalidGameState(reason) => {
            log::warn!("Session {id} rejected a transition: {reason}");
            CHOICE_REPROMPT.to_string()
        }
        GameError::GenerationUnavailable => {
            log::warn!("Session {id} left unchanged after a generation failure");
            GENERATION_APOLOGY.to_string()
        }
    }
}

fn store_failure_reply(id: &SessionId, error: StoreError) -> String {
    match error {
        StoreError::Conflict => {
            log::warn!("Session {id} was modified concurrently; write dropped");
            SESSION_BUSY.to_string()
        }
        other => {
            log::error!("Failed to save session {id}: {other}");
            STORE_UNAVAILABLE.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    fn live_awaiting_choice() -> Record {
        let mut game = GameSession::with_scenario_pool(Vec::new());
        game.turn_history.push(Message::game("🚀 1. a 2. b 3. c"));
        Record::Live(game)
    }

    #[test]
    fn test_restart_phrases_match_exactly_ignoring_case() {
        assert!(is_restart_phrase("Begin the crypto adventure"));
        assert!(is_restart_phrase("  SHAPE THE FUTURE OF CRYPTO WITH EVERY CHOICE "));
        assert!(!is_restart_phrase("begin the crypto adventure!"));
        assert!(!is_restart_phrase("begin the crypto"));
        assert!(!is_restart_phrase(""));
    }

    #[test]
    fn test_decision_table() {
        let live = live_awaiting_choice();
        let terminal = Record::Terminal;

        assert_eq!(decide(None, ""), Decision::StartNewGame);
        assert_eq!(decide(None, "2"), Decision::StartNewGame);

        assert_eq!(decide(Some(&terminal), "YES"), Decision::StartNewGame);
        assert_eq!(decide(Some(&terminal), " no "), Decision::Farewell);
        assert_eq!(decide(Some(&terminal), "maybe"), Decision::AskReplay);
        assert_eq!(decide(Some(&terminal), ""), Decision::AskReplay);
        assert_eq!(
            decide(Some(&terminal), "Begin the crypto adventure"),
            Decision::StartNewGame
        );

        assert_eq!(
            decide(Some(&live), "2"),
            Decision::PlayChoice(ChoiceOption::Two)
        );
        assert_eq!(decide(Some(&live), "4"), Decision::AskForChoice);
        assert_eq!(decide(Some(&live), ""), Decision::AskForChoice);
        assert_eq!(decide(Some(&live), "yes"), Decision::AskForChoice);
        assert_eq!(
            decide(Some(&live), "enter the world of web3 and start your journey"),
            Decision::StartNewGame
        );
    }

    #[test]
    fn test_live_record_without_pending_scenario_restarts() {
        let stuck = Record::Live(GameSession::with_scenario_pool(Vec::new()));
        assert_eq!(decide(Some(&stuck), "1"), Decision::StartNewGame);
    }

    #[test]
    fn test_idle_locks_are_pruned() {
        let locks = SessionLocks::default();
        let a = SessionId::from_raw("a");
        let b = SessionId::from_raw("b");

        drop(locks.try_acquire(&a));
        let _held = locks.try_acquire(&b);
        assert_eq!(locks.locks.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_held_session_turns_away_a_second_request() {
        let locks = SessionLocks::default();
        let a = SessionId::from_raw("a");
        let b = SessionId::from_raw("b");

        let held = locks.try_acquire(&a);
        assert!(held.is_some());
        assert!(locks.try_acquire(&a).is_none());
        assert!(locks.try_acquire(&b).is_some());

        drop(held);
        assert!(locks.try_acquire(&a).is_some());
    }
}
