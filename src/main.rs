use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

use lexicard::collab::loader::CachingLoader;
use lexicard::collab::null::{NoopFetcher, SilentAudio};
use lexicard::collab::source::WordSetSource;
use lexicard::collab::{Collaborators, ResourceFetcher};
use lexicard::config::Config;
use lexicard::ui::TerminalRenderer;
use lexicard::word::{DisplayMode, WordSet};
use lexicard::{Controller, FlowState, Interaction, ModeKind, RoundOutcome, SessionContext};

#[derive(Parser)]
#[command(name = "lexicard", version, about = "Vocabulary flashcards with adaptive quiz and learn modes")]
struct Cli {
    #[arg(short, long, default_value = "quiz", help = "Learning mode (quiz, learn)")]
    mode: ModeKind,

    #[arg(short, long, help = "Card display (audio, image, text)")]
    display: Option<DisplayMode>,

    #[arg(short, long, help = "Word set JSON file; the bundled sample is used otherwise")]
    wordset: Option<PathBuf>,

    #[arg(short, long = "category", help = "Category to include (repeatable, default: all)")]
    categories: Vec<String>,

    #[arg(long, value_name = "ACCURACY", help = "Answer automatically, right with this probability")]
    simulate: Option<f64>,

    #[arg(long, help = "Seed for card selection and the simulated learner")]
    seed: Option<u64>,

    #[arg(long, default_value_t = 50, help = "Stop after this many rounds")]
    max_rounds: u32,

    #[arg(long, help = "Base url for word audio and images")]
    media_url: Option<String>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("LEXICARD_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(feature = "network")]
fn build_fetcher(media_url: Option<&str>) -> Result<Arc<dyn ResourceFetcher>> {
    Ok(match media_url {
        Some(url) => Arc::new(lexicard::collab::http::HttpFetcher::new(url)?),
        None => Arc::new(NoopFetcher),
    })
}

#[cfg(not(feature = "network"))]
fn build_fetcher(media_url: Option<&str>) -> Result<Arc<dyn ResourceFetcher>> {
    if media_url.is_some() {
        tracing::warn!("built without network support, ignoring --media-url");
    }
    Ok(Arc::new(NoopFetcher))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let mut config = Config::load()?;
    if let Some(display) = cli.display {
        config.display_mode = display;
    }

    let source = match &cli.wordset {
        Some(path) => WordSetSource::from_path(path)?,
        None => WordSetSource::new(WordSet::sample()),
    };
    let categories = if cli.categories.is_empty() {
        source.category_names()
    } else {
        cli.categories.clone()
    };

    let loader = CachingLoader::new(
        Arc::new(source),
        build_fetcher(cli.media_url.as_deref())?,
        config.display_mode,
        config.preload_chunk_size,
    );
    let collab = Collaborators {
        loader: Arc::new(loader),
        renderer: Arc::new(TerminalRenderer::stdout()),
        audio: Arc::new(SilentAudio),
    };
    let ctx = match cli.seed {
        Some(seed) => SessionContext::with_seed(config, collab, seed),
        None => SessionContext::new(config, collab),
    };

    let mut controller = Controller::new(ctx);
    let outcome = controller.open(&categories, cli.mode).await?;
    info!(?outcome, mode = %cli.mode, "session started");

    match cli.simulate {
        Some(accuracy) => simulate(&mut controller, accuracy, cli.seed, cli.max_rounds).await?,
        None => interactive(&mut controller, cli.max_rounds).await?,
    }

    if let Some(results) = controller.close().await {
        println!("{}", serde_json::to_string_pretty(&results)?);
    }
    Ok(())
}

/// Drives the session with a learner who answers right with probability
/// `accuracy` and otherwise picks the first wrong card still showing.
async fn simulate(controller: &mut Controller, accuracy: f64, seed: Option<u64>, max_rounds: u32) -> Result<()> {
    let accuracy = accuracy.clamp(0.0, 1.0);
    let mut learner = match seed {
        Some(seed) => SmallRng::seed_from_u64(seed.wrapping_add(1)),
        None => SmallRng::from_entropy(),
    };
    let max_attempts = max_rounds.saturating_mul(10);
    let mut rounds = 0;
    let mut attempts = 0;

    while rounds < max_rounds && attempts < max_attempts {
        match controller.state().flow_state() {
            FlowState::ShowingQuestion => {}
            FlowState::QuizReady => {
                controller.resume().await?;
                attempts += 1;
                continue;
            }
            _ => break,
        }
        let interaction = if learner.gen_bool(accuracy) {
            Interaction::CorrectAnswer
        } else {
            wrong_slot(controller)
                .map(|slot| Interaction::WrongAnswer { slot })
                .unwrap_or(Interaction::CorrectAnswer)
        };
        if interaction == Interaction::CorrectAnswer {
            rounds += 1;
        }
        attempts += 1;
        controller.dispatch(interaction).await?;
    }
    Ok(())
}

fn wrong_slot(controller: &Controller) -> Option<usize> {
    let state = controller.state();
    let target = state.current_target()?.id;
    state.current_options().iter().position(|w| w.id != target)
}

async fn interactive(controller: &mut Controller, max_rounds: u32) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut rounds = 0;

    while rounds < max_rounds {
        match controller.state().flow_state() {
            FlowState::ShowingQuestion => {}
            FlowState::QuizReady => {
                controller.resume().await?;
                continue;
            }
            _ => break,
        }
        if let Some(target) = controller.state().current_target() {
            println!("Which card is \"{}\"? (number, r = replay, q = quit)", target.title);
        }
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let interaction = match line.trim() {
            "q" => break,
            "r" => Interaction::ReplayAudio,
            input => match input.parse::<usize>() {
                Ok(n) if n >= 1 => Interaction::Select { slot: n - 1 },
                _ => {
                    println!("Type the number shown next to a card.");
                    continue;
                }
            },
        };
        match controller.dispatch(interaction).await {
            Ok(RoundOutcome::Question) if interaction != Interaction::ReplayAudio => {
                if controller.state().turn_had_wrong() {
                    println!("Not quite, try again.");
                } else {
                    rounds += 1;
                }
            }
            Ok(_) => {}
            Err(err) => println!("{err}"),
        }
    }
    Ok(())
}
