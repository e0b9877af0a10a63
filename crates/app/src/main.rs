use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use pdf_quiz_core::{
    HttpModelConfig, HttpModelLoader, JsonFileStore, ModelSynthesisOptions, ModelSynthesizer,
    PipelineOptions, QuestionCount, QuestionKind, QuestionSynthesizer, QuizError, QuizGenerator,
    QuizService, SegmentationPolicy, SubmitRequest, TemplateSynthesizer, Upload, ENDPOINT_ENV,
    PDF_MEDIA_TYPE,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "pdf-quiz", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory where generated question sets are saved
    #[arg(long, env = "QUIZ_STORE_DIR", default_value = "question_sets", global = true)]
    store_dir: PathBuf,

    /// Question synthesis strategy
    #[arg(
        long,
        env = "QUIZ_STRATEGY",
        value_enum,
        default_value_t = Strategy::Template,
        global = true
    )]
    strategy: Strategy,

    /// Text-generation endpoint used by the model strategy
    /// [default: $QUIZ_MODEL_ENDPOINT]
    #[arg(long, global = true)]
    model_endpoint: Option<String>,

    /// Bearer token for the text-generation endpoint
    /// [default: $QUIZ_MODEL_API_KEY]
    #[arg(long, global = true)]
    model_api_key: Option<String>,

    /// Per-chunk model timeout in seconds
    #[arg(long, default_value = "30", global = true)]
    model_timeout_secs: u64,

    /// Language the model writes questions in
    #[arg(long, default_value = "Arabic", global = true)]
    language: String,

    /// Chunking policy: sentence or word_budget
    #[arg(long, default_value = "sentence", global = true)]
    segmentation: SegmentationPolicy,

    /// Character budget for word_budget chunks
    #[arg(long, default_value = "512", global = true)]
    max_chunk_chars: usize,

    /// Chunks at or below this many characters are dropped
    #[arg(long, default_value = "20", global = true)]
    min_chunk_chars: usize,

    /// Fixed seed for reproducible question selection
    #[arg(long, global = true)]
    seed: Option<u64>,
}

#[derive(Subcommand)]
enum Command {
    /// Generate questions from a PDF file.
    Generate {
        /// PDF file to read.
        #[arg(long)]
        file: PathBuf,
        /// essay or multiple_choice
        #[arg(long = "type", default_value = "essay")]
        kind: QuestionKind,
        /// Requested number of questions; clamped to 1..=10.
        #[arg(long)]
        count: Option<String>,
        /// Do not save the generated set.
        #[arg(long, default_value_t = false)]
        no_save: bool,
    },
    /// Print a saved question set.
    Show {
        #[arg(long)]
        id: String,
    },
    /// List saved question sets, oldest first.
    History,
    /// Report service status and model readiness.
    Health,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Strategy {
    Template,
    Model,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let options = PipelineOptions {
        segmentation: cli.segmentation,
        chunk_max_chars: cli.max_chunk_chars,
        min_chunk_chars: cli.min_chunk_chars,
        ..PipelineOptions::default()
    };

    info!(
        version = app_version,
        strategy = ?cli.strategy,
        store_dir = %cli.store_dir.display(),
        started_at = %Utc::now().to_rfc3339(),
        "pdf-quiz boot"
    );

    match cli.strategy {
        Strategy::Template => {
            let generator = generator(TemplateSynthesizer, options, cli.seed);
            run(generator, &cli).await
        }
        Strategy::Model => {
            let synthesizer = ModelSynthesizer::new(
                HttpModelLoader::new(model_config(&cli)?),
                ModelSynthesisOptions {
                    language: cli.language.clone(),
                    timeout: Duration::from_secs(cli.model_timeout_secs),
                    ..ModelSynthesisOptions::default()
                },
            );
            let generator = generator(synthesizer, options, cli.seed);
            run(generator, &cli).await
        }
    }
}

/// Command-line values win over `QUIZ_MODEL_ENDPOINT` / `QUIZ_MODEL_API_KEY`.
fn model_config(cli: &Cli) -> anyhow::Result<HttpModelConfig> {
    let config = match cli.model_endpoint.as_deref() {
        Some(endpoint) => HttpModelConfig::new(endpoint)?.with_env_api_key(),
        None => HttpModelConfig::from_env().ok_or_else(|| {
            anyhow::anyhow!("the model strategy needs --model-endpoint or {ENDPOINT_ENV}")
        })??,
    };

    Ok(match &cli.model_api_key {
        Some(api_key) => config.with_api_key(Some(api_key.clone())),
        None => config,
    })
}

fn generator<S>(synthesizer: S, options: PipelineOptions, seed: Option<u64>) -> QuizGenerator<S>
where
    S: QuestionSynthesizer + Send + Sync,
{
    match seed {
        Some(seed) => QuizGenerator::with_seed(synthesizer, options, seed),
        None => QuizGenerator::new(synthesizer, options),
    }
}

async fn run<S>(generator: QuizGenerator<S>, cli: &Cli) -> anyhow::Result<()>
where
    S: QuestionSynthesizer + Send + Sync,
{
    let save = !matches!(cli.command, Command::Generate { no_save: true, .. });
    let store = save.then(|| JsonFileStore::new(&cli.store_dir));
    let service = QuizService::new(generator, store);

    match &cli.command {
        Command::Generate {
            file,
            kind,
            count,
            ..
        } => {
            let bytes = tokio::fs::read(file).await.map_err(|error| {
                anyhow::anyhow!("unable to read {}: {error}", file.display())
            })?;
            let filename = file
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();

            let count = QuestionCount::parse(
                count.as_deref().unwrap_or_default(),
                service.generator().options(),
            );
            let request = SubmitRequest {
                upload: Upload::new(filename, media_type_for(file), bytes),
                kind: *kind,
                count,
            };

            let outcome = service.submit(request).await.map_err(describe)?;
            info!(
                questions = outcome.questions.len(),
                persistence = ?outcome.persistence,
                "generation finished"
            );
            print_json(&outcome)?;
        }
        Command::Show { id } => {
            let set = service.fetch(id).await.map_err(describe)?;
            print_json(&set)?;
        }
        Command::History => {
            let summaries = service.history().await.map_err(describe)?;
            print_json(&summaries)?;
        }
        Command::Health => {
            print_json(&service.health())?;
        }
    }

    Ok(())
}

fn media_type_for(path: &Path) -> Option<String> {
    let extension = path.extension()?.to_str()?;
    if extension.eq_ignore_ascii_case("pdf") {
        Some(PDF_MEDIA_TYPE.to_string())
    } else {
        None
    }
}

fn describe(error: QuizError) -> anyhow::Error {
    anyhow::anyhow!("{}: {}", error.code(), error)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
