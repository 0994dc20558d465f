use crate::ai::Narrator;
use crate::error::GameError;
use crate::message::{Message, MessageType};
use crate::prompts::{CLOSING_FOOTER, OPENING_INSTRUCTION, continuation_instruction, scoring_instruction};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Number of player decisions in one playthrough.
pub const MAX_TURNS: u32 = 3;

pub const SCENARIO_TYPES: [&str; 17] = [
    "DeFi",
    "NFTs",
    "DAOs",
    "Market Trends",
    "Community",
    "Security",
    "Regulations",
    "Innovation",
    "Ethical Dilemmas",
    "New Projects",
    "Web3",
    "Partnerships",
    "Announcements",
    "TGE",
    "Web3 and AI Convergence",
    "Convergence",
    "AI",
];

pub const EMOJIS: [&str; 10] = ["🚀", "🔥", "💎", "💰", "🌐", "🔐", "📈", "🤝", "⚙️", "✨"];

// The closed set of answers a player may give to a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChoiceOption {
    #[serde(rename = "1")]
    One,
    #[serde(rename = "2")]
    Two,
    #[serde(rename = "3")]
    Three,
}

impl ChoiceOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChoiceOption::One => "1",
            ChoiceOption::Two => "2",
            ChoiceOption::Three => "3",
        }
    }
}

impl fmt::Display for ChoiceOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChoiceOption {
    type Err = GameError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim() {
            "1" => Ok(ChoiceOption::One),
            "2" => Ok(ChoiceOption::Two),
            "3" => Ok(ChoiceOption::Three),
            other => Err(GameError::InvalidChoice(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceRecord {
    pub turn: u32,
    pub option: ChoiceOption,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Fresh,
    InProgress,
    Terminal,
}

/// What an accepted choice led to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The next scenario; the session is still in progress.
    Continue(String),
    /// Final feedback and footer; the session is now terminal.
    Finished(String),
}

/// One player's playthrough.
///
/// Every transition is computed on a copy and only committed once the
/// generator has answered, so a failed generation or a rejected input
/// leaves the session exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSession {
    pub game_id: Uuid,
    pub turn_history: Vec<Message>,
    pub choice_log: Vec<ChoiceRecord>,
    pub turn_count: u32,
    pub terminal: bool,
    #[serde(default)]
    pub scenario_pool: Vec<String>,
}

impl Default for GameSession {
    fn default() -> Self {
        Self::new()
    }
}

impl GameSession {
    pub fn new() -> Self {
        let mut scenario_pool: Vec<String> = SCENARIO_TYPES.iter().map(|s| s.to_string()).collect();
        scenario_pool.shuffle(&mut rand::rng());
        Self::with_scenario_pool(scenario_pool)
    }

    pub fn with_scenario_pool(scenario_pool: Vec<String>) -> Self {
        Self {
            game_id: Uuid::new_v4(),
            turn_history: Vec::new(),
            choice_log: Vec::new(),
            turn_count: 0,
            terminal: false,
            scenario_pool,
        }
    }

    pub fn phase(&self) -> Phase {
        if self.terminal {
            Phase::Terminal
        } else if self.turn_count == 0 {
            Phase::Fresh
        } else {
            Phase::InProgress
        }
    }

    /// A scenario has been presented and no choice has answered it yet.
    pub fn awaiting_choice(&self) -> bool {
        !self.terminal
            && matches!(
                self.turn_history.last(),
                Some(Message {
                    message_type: MessageType::Game,
                    ..
                })
            )
    }

    fn emoji(&self) -> &'static str {
        EMOJIS[self.turn_count as usize % EMOJIS.len()]
    }

    fn theme(&self) -> Option<&str> {
        if self.scenario_pool.is_empty() {
            return None;
        }
        Some(self.scenario_pool[self.turn_count as usize % self.scenario_pool.len()].as_str())
    }

    /// Plain report of every choice, one line per turn.
    pub fn choice_report(&self) -> String {
        self.choice_log
            .iter()
            .map(|choice| format!("Scenario {}: Chose option {}", choice.turn, choice.option))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Generates the opening scenario. Turn 0 is setup, so `turn_count` is not touched.
    pub async fn start(&mut self, narrator: &Narrator) -> Result<String, GameError> {
        if self.phase() != Phase::Fresh || !self.turn_history.is_empty() {
            return Err(GameError::InvalidGameState(
                "the game has already started".to_string(),
            ));
        }

        let scenario = narrator.scenario(OPENING_INSTRUCTION, &self.turn_history).await?;
        self.turn_history.push(Message::game(scenario.clone()));
        Ok(scenario)
    }

    pub async fn apply_choice(
        &mut self,
        narrator: &Narrator,
        input: &str,
    ) -> Result<TurnOutcome, GameError> {
        let option: ChoiceOption = input.parse()?;

        if self.phase() == Phase::Terminal {
            return Err(GameError::InvalidGameState("the game is over".to_string()));
        }
        if !self.awaiting_choice() {
            return Err(GameError::InvalidGameState(
                "no scenario is waiting for a choice".to_string(),
            ));
        }

        let mut next = self.clone();
        next.turn_count += 1;
        next.turn_history.push(Message::player(option.as_str()));
        next.choice_log.push(ChoiceRecord {
            turn: next.turn_count,
            option,
        });

        if next.turn_count >= MAX_TURNS {
            let summary = next.summarize(narrator).await?;
            next.terminal = true;
            *self = next;
            log::info!("Game {} finished after {} turns", self.game_id, self.turn_count);
            return Ok(TurnOutcome::Finished(summary));
        }

        let instruction = continuation_instruction(option.as_str(), next.emoji(), next.theme());
        let scenario = narrator.scenario(&instruction, &next.turn_history).await?;
        next.turn_history.push(Message::game(scenario.clone()));
        *self = next;
        log::debug!("Game {} advanced to turn {}", self.game_id, self.turn_count);
        Ok(TurnOutcome::Continue(scenario))
    }

    /// Scores the choice log. Only meaningful once the last turn has been played;
    /// never mutates the session.
    pub async fn summarize(&self, narrator: &Narrator) -> Result<String, GameError> {
        if self.turn_count < MAX_TURNS {
            return Err(GameError::InvalidGameState(format!(
                "cannot summarize at turn {} of {MAX_TURNS}",
                self.turn_count
            )));
        }

        let instruction = scoring_instruction(MAX_TURNS, &self.choice_report());
        let feedback = narrator.narrate(&instruction, &self.turn_history).await?;
        Ok(format!("{feedback}{CLOSING_FOOTER}"))
    }
}
