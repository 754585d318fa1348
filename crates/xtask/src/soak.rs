//! Soak run: a scripted game session hammered from many threads.
//!
//! Publishers play words, churners join and leave the HUD, and a scene
//! thread clears subscriptions now and then. The run fails if any listener
//! failed or if the bus ends up inconsistent.

use std::sync::atomic::{AtomicI32, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wordsort_backbone::{config, Backbone, BackboneConfig, Listener};
use wordsort_shared::{
    CorrectAnswer, GameState, GameStateChanged, ScoreSystem, TotalScoreChanged, WordClass,
    WordCompleted,
};

const DEFAULT_THREADS: usize = 4;
const DEFAULT_ITERATIONS: usize = 10_000;
const POINTS_PER_WORD: i32 = 10;

/// Classes credited to successive correct answers.
const CLASS_ROTATION: [WordClass; 3] = [WordClass::Noun, WordClass::Verb, WordClass::Adjective];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoakOptions {
    pub threads: usize,
    pub iterations: usize,
}

impl Default for SoakOptions {
    fn default() -> Self {
        Self {
            threads: DEFAULT_THREADS,
            iterations: DEFAULT_ITERATIONS,
        }
    }
}

impl SoakOptions {
    pub fn parse(mut args: impl Iterator<Item = String>) -> anyhow::Result<Self> {
        let mut options = Self::default();
        while let Some(flag) = args.next() {
            let target = match flag.as_str() {
                "--threads" => &mut options.threads,
                "--iterations" => &mut options.iterations,
                other => anyhow::bail!("Unknown soak option: {other}"),
            };
            let value = args
                .next()
                .with_context(|| format!("missing value for {flag}"))?;
            *target = value
                .parse()
                .with_context(|| format!("invalid value for {flag}: {value}"))?;
        }

        if options.threads == 0 {
            anyhow::bail!("--threads must be at least 1");
        }
        Ok(options)
    }
}

/// Score keeper registered as the session's `dyn ScoreSystem`.
#[derive(Debug, Default)]
struct TallyScore {
    answers: AtomicUsize,
    total: AtomicI32,
    nouns: AtomicU32,
    verbs: AtomicU32,
    adjectives: AtomicU32,
}

impl TallyScore {
    /// Credit a correct answer, cycling through the word classes.
    fn record_answer(&self) -> i32 {
        let answer = self.answers.fetch_add(1, Ordering::Relaxed);
        self.record(CLASS_ROTATION[answer % CLASS_ROTATION.len()])
    }

    fn record(&self, class: WordClass) -> i32 {
        let counter = match class {
            WordClass::Noun => &self.nouns,
            WordClass::Verb => &self.verbs,
            WordClass::Adjective => &self.adjectives,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.total.fetch_add(POINTS_PER_WORD, Ordering::Relaxed) + POINTS_PER_WORD
    }
}

impl ScoreSystem for TallyScore {
    fn total_score(&self) -> i32 {
        self.total.load(Ordering::Relaxed)
    }

    fn noun_count(&self) -> u32 {
        self.nouns.load(Ordering::Relaxed)
    }

    fn verb_count(&self) -> u32 {
        self.verbs.load(Ordering::Relaxed)
    }

    fn adjective_count(&self) -> u32 {
        self.adjectives.load(Ordering::Relaxed)
    }
}

pub fn run(options: SoakOptions) -> anyhow::Result<()> {
    load_dotenv_from_repo_root();
    init_tracing();

    let config = BackboneConfig::from_env();
    config.validate().context("invalid backbone configuration")?;
    let backbone = Arc::new(Backbone::new(config));

    let score = Arc::new(TallyScore::default());
    backbone
        .services()
        .register::<dyn ScoreSystem>(score.clone())
        .context("registering score system")?;

    // the score system turns correct answers into score updates
    let score_clone = Arc::clone(&score);
    let backbone_clone = Arc::clone(&backbone);
    let scorer = Listener::new(move |_: &CorrectAnswer| {
        let total = score_clone.record_answer();
        backbone_clone.events().publish(&TotalScoreChanged { total_score: total });
    });

    tracing::info!(
        threads = options.threads,
        iterations = options.iterations,
        "Starting soak run"
    );
    let started = Instant::now();
    backbone.events().publish(&GameStateChanged {
        state: GameState::Playing,
    });

    thread::scope(|s| {
        for _ in 0..options.threads {
            s.spawn(|| play_words(&backbone, &scorer, options.iterations));
            s.spawn(|| churn_hud(&backbone, options.iterations));
        }
        s.spawn(|| change_scenes(&backbone, &scorer, options.iterations));
    });

    backbone.events().publish(&GameStateChanged {
        state: GameState::GameOver,
    });

    let stats = backbone.events().stats();
    tracing::info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        published = stats.published,
        delivered = stats.delivered,
        failed = stats.failed,
        topics = stats.topics,
        listeners = stats.listeners,
        total_score = score.total_score(),
        nouns = score.noun_count(),
        verbs = score.verb_count(),
        adjectives = score.adjective_count(),
        "Soak run finished"
    );

    if stats.failed > 0 {
        anyhow::bail!("{} listener invocation(s) failed", stats.failed);
    }
    let hud_listeners = backbone.events().listener_count::<TotalScoreChanged>();
    if hud_listeners != 0 {
        anyhow::bail!("{hud_listeners} HUD listener(s) leaked after churn");
    }

    backbone.reset();
    Ok(())
}

/// Publish a completed word and a correct answer per iteration.
fn play_words(backbone: &Backbone, scorer: &Listener<CorrectAnswer>, iterations: usize) {
    let events = backbone.events();
    events.subscribe(scorer.clone());
    for _ in 0..iterations {
        events.publish(&WordCompleted);
        events.publish(&CorrectAnswer);
    }
    events.unsubscribe(scorer);
}

/// HUD widgets appearing and disappearing while scores stream in.
fn churn_hud(backbone: &Backbone, iterations: usize) {
    let events = backbone.events();
    for _ in 0..iterations {
        let hud = events.subscribe_fn(|evt: &TotalScoreChanged| {
            debug_assert!(evt.total_score > 0);
        });
        events.unsubscribe(&hud);
    }
}

/// Scene changes drop every subscription; players come back right after.
fn change_scenes(backbone: &Backbone, scorer: &Listener<CorrectAnswer>, iterations: usize) {
    let events = backbone.events();
    for round in 0..iterations / 100 {
        events.clear_all();
        events.subscribe(scorer.clone());
        if round % 10 == 0 {
            tracing::debug!(round, "Scene changed");
        }
    }
    events.unsubscribe_all::<CorrectAnswer>();
}

fn init_tracing() {
    let fallback = std::env::var(config::LOG_FILTER_VAR)
        .unwrap_or_else(|_| BackboneConfig::default().log_filter);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{fallback},xtask=info").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> impl Iterator<Item = String> {
        values
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn parse_defaults() {
        assert_eq!(SoakOptions::parse(args(&[])).unwrap(), SoakOptions::default());
    }

    #[test]
    fn parse_flags() {
        let options = SoakOptions::parse(args(&["--threads", "2", "--iterations", "50"])).unwrap();
        assert_eq!(
            options,
            SoakOptions {
                threads: 2,
                iterations: 50
            }
        );
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!(SoakOptions::parse(args(&["--threads"])).is_err());
        assert!(SoakOptions::parse(args(&["--threads", "many"])).is_err());
        assert!(SoakOptions::parse(args(&["--threads", "0"])).is_err());
        assert!(SoakOptions::parse(args(&["--speed", "1"])).is_err());
    }

    #[test]
    fn tally_counts_per_class() {
        let tally = TallyScore::default();
        tally.record(WordClass::Verb);
        let total = tally.record(WordClass::Adjective);

        assert_eq!(total, 2 * POINTS_PER_WORD);
        assert_eq!(tally.verb_count(), 1);
        assert_eq!(tally.adjective_count(), 1);
        assert_eq!(tally.noun_count(), 0);
    }

    #[test]
    fn answers_rotate_through_word_classes() {
        let tally = TallyScore::default();
        for _ in 0..7 {
            tally.record_answer();
        }

        assert_eq!(tally.noun_count(), 3);
        assert_eq!(tally.verb_count(), 2);
        assert_eq!(tally.adjective_count(), 2);
        assert_eq!(tally.total_score(), 7 * POINTS_PER_WORD);
    }

    #[test]
    fn short_soak_session_is_consistent() {
        let backbone = Backbone::default();
        let scorer = Listener::new(|_: &CorrectAnswer| {});

        thread::scope(|s| {
            s.spawn(|| play_words(&backbone, &scorer, 200));
            s.spawn(|| churn_hud(&backbone, 200));
            s.spawn(|| change_scenes(&backbone, &scorer, 200));
        });

        assert_eq!(backbone.events().listener_count::<TotalScoreChanged>(), 0);
        assert_eq!(backbone.events().stats().failed, 0);
    }
}
