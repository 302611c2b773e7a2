//! wordcast - interactive next-word prediction in the terminal.
//!
//! The loop is a pure projection of the session state: it renders the
//! current text plus the ranked prediction set, and feeds selections back
//! through the controller. All prediction logic lives in wordcast-engine.

use std::io::{self, BufRead, Write};

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wordcast_engine::{Normalizer, Predictor, SelectionController};
use wordcast_types::{
    ApiStyle, FallbackConfig, NormalizerConfig, SessionState, SessionStatus, SourceConfig,
};

/// Interactive next-word prediction session.
#[derive(Parser)]
#[command(name = "wordcast")]
#[command(about = "Grow a text one predicted word at a time", long_about = None)]
#[command(version)]
struct Cli {
    /// Remote completion endpoint; omit to run on the local fallback
    #[arg(long, env = "WORDCAST_ENDPOINT")]
    endpoint: Option<String>,

    /// API key for the remote endpoint
    #[arg(long, env = "WORDCAST_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model identifier sent to the remote endpoint
    #[arg(long, env = "WORDCAST_MODEL", default_value = "gpt-3.5-turbo-instruct")]
    model: String,

    /// Remote API shape: completion or chat
    #[arg(long, env = "WORDCAST_API_STYLE", default_value = "completion")]
    api_style: ApiStyle,

    /// Text the session starts from and resets to
    #[arg(long, default_value = "The future of work is")]
    initial_text: String,

    /// Fixed fallback RNG seed for reproducible sessions
    #[arg(long)]
    seed: Option<u64>,

    /// Log level
    #[arg(long, env = "WORDCAST_LOG_LEVEL", default_value = "warn")]
    log_level: String,
}

impl Cli {
    fn source_config(&self) -> SourceConfig {
        SourceConfig {
            endpoint: self.endpoint.clone(),
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            api_style: self.api_style,
            ..SourceConfig::default()
        }
    }

    fn fallback_config(&self) -> FallbackConfig {
        FallbackConfig {
            seed: self.seed,
            ..FallbackConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli.log_level.clone().into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let predictor = Predictor::from_config(&cli.source_config(), cli.fallback_config());
    let mut controller = SelectionController::new(
        cli.initial_text.clone(),
        predictor,
        Normalizer::new(NormalizerConfig::default()),
    );

    println!("wordcast - pick a number to grow the text, or type new text.");
    println!("Commands: 1-5 select, r reset, q quit.\n");

    controller.reset().await;

    let stdin = io::stdin();
    loop {
        render(controller.state());
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();

        match input {
            "" => continue,
            "q" | "quit" => break,
            "r" | "reset" => controller.reset().await,
            _ => {
                if let Some(index) = parse_selection(input, controller.state()) {
                    let word = controller
                        .state()
                        .predictions
                        .get(index)
                        .map(|p| p.word.clone());
                    match word {
                        Some(word) => {
                            if let Err(err) = controller.select_word(&word).await {
                                println!("{err}");
                            }
                        }
                        None => println!("no prediction at that position"),
                    }
                } else {
                    controller.request_predictions(input).await;
                }
            }
        }
    }

    println!("bye");
    Ok(())
}

/// A bare in-range number is a selection; anything else is new text.
fn parse_selection(input: &str, state: &SessionState) -> Option<usize> {
    let number: usize = input.parse().ok()?;
    if number == 0 || number > state.predictions.len() {
        return None;
    }
    Some(number - 1)
}

fn render(state: &SessionState) {
    println!();
    println!("  {}", state.text);

    match state.status {
        SessionStatus::Loading => println!("  (predicting...)"),
        SessionStatus::Error => {
            if let Some(message) = &state.error {
                println!("  error: {message} (type new text or r to retry)");
            }
        }
        SessionStatus::Idle => {}
        SessionStatus::Ready => {
            for (idx, prediction) in state.predictions.iter().enumerate() {
                println!(
                    "  {}. {:<12} {:5.1}%",
                    idx + 1,
                    prediction.word,
                    prediction.probability * 100.0
                );
            }
            if !state.predictions.is_full() {
                println!("  (vocabulary exhausted: fewer than five candidates)");
            }
        }
    }
}
