//! Wordsort Shared - Messages and capability traits of the word-sorting game
//!
//! This crate holds the vocabulary the game's subsystems exchange through the
//! backbone:
//! - Message payloads published on the event bus (`events`)
//! - Capability traits registered in the service registry (`services`)
//!
//! # Design Principles
//!
//! 1. **No backbone dependency** - payloads are plain data, traits are plain traits
//! 2. **No gameplay** - implementations live with the game, fakes live in tests
//! 3. **Object safety** - every capability trait is registered as `dyn Trait`

pub mod events;
pub mod services;

pub use events::{
    CorrectAnswer, GameState, GameStateChanged, IncorrectAnswer, IncorrectLetterDrop,
    InitialScoreChanged, MasterVolumeChanged, MultiplierChanged, MusicVolumeChanged,
    PauseRequested, ResumeRequested, SequenceChanged, SequenceTriggered, SfxVolumeChanged,
    TotalScoreChanged, TotalWordCards, WordCompleted,
};
pub use services::{
    GameSystem, ScoreSystem, SoundSystem, WordClass, WordDifficulty, WordEntry, WordSystem,
};

#[cfg(any(test, feature = "testing"))]
pub use services::{MockGameSystem, MockScoreSystem, MockSoundSystem, MockWordSystem};
