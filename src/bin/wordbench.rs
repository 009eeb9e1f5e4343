//! wordbench binary: run one puzzle episode against a model, replay archived failures through
//! healing, or collect episode records for the dashboard.
//!
//! Subcommands: `bracket`, `wordle`, `heal-eval`, `collect-results`.

use clap::{Parser, Subcommand, ValueEnum};
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use wordbench::archive::FailureArchive;
use wordbench::clients::openrouter::{OpenRouterClient, OPENROUTER_API_KEY_VAR};
use wordbench::event::LoggingEventHandler;
use wordbench::games::bracket::BracketPuzzle;
use wordbench::games::wordle::WordlePuzzle;
use wordbench::heal_eval::evaluate_healing;
use wordbench::prompts::PromptTemplate;
use wordbench::record::{collect_results, EpisodeRecord, ResultStore};
use wordbench::{
    ClientWrapper, ClueAnswerGrammar, GuessGrammar, HealingCoordinator, ModelInvoker,
    MoveGrammar, TransportError, TurnLoop, WordbenchConfig,
};

type AppResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

#[derive(Parser, Debug)]
#[command(name = "wordbench")]
#[command(about = "Evaluate LLMs on Bracket City and Wordle puzzles")]
struct Args {
    #[command(subcommand)]
    cmd: Command,

    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info", value_parser = ["trace", "debug", "info", "warn", "error"])]
    logging_level: String,

    /// Directory for unparseable model replies (default: parse-errors or WORDBENCH_FAILURE_DIR)
    #[arg(long, global = true, value_name = "DIR")]
    errors_dir: Option<PathBuf>,

    /// Directory for episode records (default: results or WORDBENCH_RESULTS_DIR)
    #[arg(long, global = true, value_name = "DIR")]
    results_dir: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Game {
    Bracket,
    Wordle,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Solve one nested-clue puzzle
    Bracket {
        #[arg(long)]
        model_name: String,
        /// Puzzle JSON file
        #[arg(long, value_name = "PATH")]
        puzzle_file: PathBuf,
        /// Step budget for the episode
        #[arg(long, default_value_t = 50)]
        num_steps: usize,
        /// Model used for healing (default: the episode's model)
        #[arg(long)]
        heal_model: Option<String>,
    },
    /// Play one game of Wordle
    Wordle {
        #[arg(long)]
        model_name: String,
        /// Secret word
        #[arg(long)]
        word: String,
        #[arg(long, default_value_t = 6)]
        turns: usize,
        #[arg(long)]
        heal_model: Option<String>,
    },
    /// Replay archived failures through healing and report the fix rate
    HealEval {
        #[arg(long)]
        model_name: String,
        /// Which move template the archived samples should be healed into
        #[arg(long, value_enum, default_value = "bracket")]
        game: Game,
        /// Print every sample that could not be fixed
        #[arg(long)]
        print_errors: bool,
        /// Log original and healed text of every sample
        #[arg(long)]
        verbose: bool,
    },
    /// Merge episode records into one JSON array for the dashboard
    CollectResults {
        #[arg(long, value_name = "PATH", default_value = "webapp/data/results.json")]
        out: PathBuf,
    },
}

fn build_invoker(config: &WordbenchConfig) -> AppResult<Arc<ModelInvoker>> {
    let key = config
        .api_key
        .clone()
        .ok_or_else(|| TransportError::MissingCredentials(OPENROUTER_API_KEY_VAR.to_string()))?;
    let client: Arc<dyn ClientWrapper> =
        Arc::new(OpenRouterClient::new_with_base_url(&key, &config.api_base_url));
    Ok(Arc::new(ModelInvoker::new(client, config.retry.clone())))
}

async fn heal_eval<G: MoveGrammar>(
    grammar: G,
    config: &WordbenchConfig,
    archive: FailureArchive,
    model_name: &str,
    print_errors: bool,
) -> AppResult<()> {
    let coordinator = HealingCoordinator::new(grammar, build_invoker(config)?, archive.clone());
    let report = evaluate_healing(&archive, &coordinator, model_name).await?;
    println!("\n--- Evaluation Complete ---");
    println!("Final Score: {} / {} examples fixed.", report.fixed, report.total);
    if print_errors {
        if report.failures.is_empty() {
            println!("\nNo errors to print.");
        }
        for failure in &report.failures {
            println!("\nFilename: {}", failure.key);
            println!("Stage of Failure: {}", failure.stage);
            if let Some(original) = &failure.original {
                println!("Original Text:\n{}", original);
            }
            if let Some(healed) = &failure.healed {
                println!("Healed Text (attempted):\n{}", healed);
            }
            println!("Error: {}", failure.error);
        }
    }
    Ok(())
}

fn report(record: &EpisodeRecord, store: &ResultStore) -> AppResult<()> {
    store.save(record)?;
    println!("\n--- Episode Finished ---");
    println!("Game Won: {}", record.won);
    println!("Steps Taken: {} / {}", record.step_count, record.step_limit);
    println!(
        "Moves: {} parsed, {} healed, {} unparseable, {} rejected",
        record.stats.parsed_moves,
        record.stats.healed_moves,
        record.stats.parse_failures,
        record.stats.rejected_moves
    );
    println!("Tokens Used: {}", record.token_usage.total_tokens);
    Ok(())
}

async fn run(args: Args) -> AppResult<()> {
    let mut config = WordbenchConfig::from_env();
    if let Some(dir) = args.errors_dir {
        config.failure_dir = dir;
    }
    if let Some(dir) = args.results_dir {
        config.results_dir = dir;
    }
    let archive = FailureArchive::in_dir(&config.failure_dir);
    let store = ResultStore::new(&config.results_dir);

    match args.cmd {
        Command::Bracket {
            model_name,
            puzzle_file,
            num_steps,
            heal_model,
        } => {
            let puzzle = BracketPuzzle::load(&puzzle_file)?;
            let mut coordinator =
                HealingCoordinator::new(ClueAnswerGrammar, build_invoker(&config)?, archive);
            if let Some(model) = heal_model {
                coordinator = coordinator.with_heal_model(model);
            }
            let outcome = TurnLoop::new(
                puzzle,
                coordinator,
                model_name,
                num_steps,
                PromptTemplate::bracket(),
            )
            .with_event_handler(Arc::new(LoggingEventHandler))
            .run()
            .await;
            report(&outcome.record, &store)?;
            println!("Final Game State:\n{}", outcome.puzzle.rendered_puzzle());
        }
        Command::Wordle {
            model_name,
            word,
            turns,
            heal_model,
        } => {
            let mut coordinator =
                HealingCoordinator::new(GuessGrammar, build_invoker(&config)?, archive);
            if let Some(model) = heal_model {
                coordinator = coordinator.with_heal_model(model);
            }
            let outcome = TurnLoop::new(
                WordlePuzzle::new(&word, turns),
                coordinator,
                model_name,
                turns,
                PromptTemplate::wordle(),
            )
            .with_event_handler(Arc::new(LoggingEventHandler))
            .run()
            .await;
            report(&outcome.record, &store)?;
            if !outcome.record.won {
                println!("The word was {}", outcome.puzzle.word());
            }
        }
        Command::HealEval {
            model_name,
            game,
            print_errors,
            ..
        } => match game {
            Game::Bracket => {
                heal_eval(ClueAnswerGrammar, &config, archive, &model_name, print_errors).await?
            }
            Game::Wordle => {
                heal_eval(GuessGrammar, &config, archive, &model_name, print_errors).await?
            }
        },
        Command::CollectResults { out } => {
            let entries = collect_results(&store, &out)?;
            println!("Wrote {} results to {}", entries.len(), out.display());
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let args = Args::parse();
    let level = match args.cmd {
        Command::HealEval { verbose: true, .. } => "debug",
        _ => args.logging_level.as_str(),
    };
    wordbench::init_logger_with_level(level);

    if let Err(err) = run(args).await {
        log::error!("{}", err);
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}
