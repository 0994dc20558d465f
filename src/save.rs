use crate::error::StoreError;
use crate::game_state::GameSession;

use serde::{Deserialize, Serialize};

/// Stored in place of a session once its last turn has been played.
pub const TERMINAL_SENTINEL: &str = "TERMINAL";

/// Version written into every live record. Bump it when `GameSession` changes shape
/// and teach `Record::decode` how to read the previous one.
pub const SCHEMA_VERSION: u32 = 1;

/// What the store may hold for a session id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Live(GameSession),
    Terminal,
}

#[derive(Serialize)]
struct SaveFileRef<'a> {
    schema_version: u32,
    game: &'a GameSession,
}

#[derive(Deserialize)]
struct SaveFileHeader {
    schema_version: u32,
}

#[derive(Deserialize)]
struct SaveFile {
    game: GameSession,
}

impl Record {
    pub fn encode(&self) -> Result<String, StoreError> {
        match self {
            Record::Terminal => Ok(TERMINAL_SENTINEL.to_string()),
            Record::Live(game) => serde_json::to_string(&SaveFileRef {
                schema_version: SCHEMA_VERSION,
                game,
            })
            .map_err(|e| StoreError::Corrupt(e.to_string())),
        }
    }

    pub fn decode(raw: &str) -> Result<Self, StoreError> {
        if raw == TERMINAL_SENTINEL {
            return Ok(Record::Terminal);
        }

        let header: SaveFileHeader =
            serde_json::from_str(raw).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        match header.schema_version {
            SCHEMA_VERSION => {
                let save: SaveFile =
                    serde_json::from_str(raw).map_err(|e| StoreError::Corrupt(e.to_string()))?;
                Ok(Record::Live(save.game))
            }
            other => Err(StoreError::Corrupt(format!(
                "unsupported schema version {other}"
            ))),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Record::Terminal)
    }
}
