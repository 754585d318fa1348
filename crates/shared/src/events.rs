//! Event payloads published by the game's subsystems.
//!
//! Each payload is its own type; the bus routes on the type, so there is no
//! envelope enum. Payloads are small immutable values.

use serde::{Deserialize, Serialize};

// =============================================================================
// Score
// =============================================================================

/// Score the round starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitialScoreChanged {
    pub initial_score: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalScoreChanged {
    pub total_score: i32,
}

/// Streak multiplier applied to the next correct answer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MultiplierChanged {
    pub multiplier: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectAnswer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncorrectAnswer;

// =============================================================================
// Game flow
// =============================================================================

/// Phase of a game session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameState {
    Tutorial,
    #[default]
    Waiting,
    Countdown,
    Playing,
    Pause,
    GameOver,
}

impl GameState {
    /// Whether cards can be dragged in this phase.
    pub fn is_interactive(self) -> bool {
        matches!(self, Self::Playing)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStateChanged {
    pub state: GameState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PauseRequested;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeRequested;

// =============================================================================
// Sound
// =============================================================================

/// Volumes are linear gain in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MasterVolumeChanged {
    pub volume: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MusicVolumeChanged {
    pub volume: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SfxVolumeChanged {
    pub volume: f32,
}

// =============================================================================
// Words
// =============================================================================

/// A word card was sorted into its container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordCompleted;

/// Number of word cards dealt for the round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalWordCards {
    pub count: u32,
}

/// A letter was dropped on the wrong slot of a word container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncorrectLetterDrop;

// =============================================================================
// Tutorial
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceChanged {
    pub sequence: u32,
}

/// The player performed the action the current tutorial step waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceTriggered;
