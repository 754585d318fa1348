//! Capability traits registered in the service registry.
//!
//! Subsystems look each other up by trait (`dyn ScoreSystem`, ...) rather than
//! by concrete type, so the registry holds one implementation per trait.

use serde::{Deserialize, Serialize};

use crate::events::GameState;

/// Read access to the running score.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait ScoreSystem: Send + Sync {
    fn total_score(&self) -> i32;

    /// Nouns sorted correctly this round
    fn noun_count(&self) -> u32;

    /// Verbs sorted correctly this round
    fn verb_count(&self) -> u32;

    /// Adjectives sorted correctly this round
    fn adjective_count(&self) -> u32;
}

/// Game phase and round timer.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait GameSystem: Send + Sync {
    fn game_state(&self) -> GameState;

    /// Length of a round in seconds
    fn timer_duration(&self) -> f32;

    /// Seconds left in the current round
    fn timer(&self) -> f32;
}

/// Mixer volumes, linear gain in `0.0..=1.0`.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait SoundSystem: Send + Sync {
    fn master_volume(&self) -> f32;
    fn music_volume(&self) -> f32;
    fn sfx_volume(&self) -> f32;

    fn set_master_volume(&self, volume: f32);
    fn set_music_volume(&self, volume: f32);
    fn set_sfx_volume(&self, volume: f32);
}

/// Word list access.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait WordSystem: Send + Sync {
    /// Up to `count` distinct words of `difficulty`, in random order.
    ///
    /// Returns fewer than `count` when the list is short.
    fn next_words(&self, difficulty: WordDifficulty, count: usize) -> Vec<WordEntry>;

    /// Every loaded word, sorted by spelling when `alphabetical`.
    fn all_words(&self, alphabetical: bool) -> Vec<WordEntry>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WordDifficulty {
    Easy,
    Medium,
    Hard,
}

/// Word class a card has to be sorted into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WordClass {
    Noun,
    Verb,
    Adjective,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordEntry {
    pub word: String,
    pub difficulty: WordDifficulty,
    pub class: WordClass,
}

impl WordEntry {
    pub fn new(word: impl Into<String>, difficulty: WordDifficulty, class: WordClass) -> Self {
        Self {
            word: word.into(),
            difficulty,
            class,
        }
    }
}
