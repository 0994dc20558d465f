pub mod ai;
pub mod dispatcher;
pub mod error;
pub mod game_state;
pub mod logging;
pub mod message;
pub mod prompts;
pub mod save;
pub mod server;
pub mod session_id;
pub mod settings;
pub mod store;

// Re-export commonly used items for easier access
pub use ai::{Narrator, OpenAIGenerator, TextGenerator, is_well_formed};
pub use dispatcher::{Decision, Dispatcher, decide, is_restart_phrase};
pub use error::{AIError, AppError, GameError, StoreError};
pub use game_state::{ChoiceOption, GameSession, MAX_TURNS, Phase, TurnOutcome};
pub use message::{Message, MessageType, PromptMessage, PromptRole};
pub use save::{Record, TERMINAL_SENTINEL};
pub use server::{AppState, build_router};
pub use session_id::{SessionId, SessionKeys};
pub use settings::Settings;
pub use store::{KvBackend, MemoryBackend, RedisBackend, SessionStore, Snapshot};
