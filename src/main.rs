use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use interpret::export::OutputLocations;
use interpret::labels::TopicLabels;
use interpret::{inference, report, AnalysisConfig, InterpretError, JsonlStore, LdaModel, PublicationRecord};

#[derive(Parser, Debug)]
#[command(version, about = "Interpret a trained topic model over a publication corpus", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
    #[clap(short, long, global = true, help = "JSON config file; defaults are used for missing fields")]
    config: Option<PathBuf>,
    #[clap(long, global = true, help = "Directory holding the JSONL document collections")]
    store_dir: Option<PathBuf>,
    #[clap(short = 'k', long, global = true, help = "Number of topics of the model to use")]
    topics: Option<usize>,
    #[clap(short, long, global = true, action = clap::ArgAction::Count, help = "More logging (-v info, -vv debug)")]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Infer topic distributions for the raw collection and store them
    Infer,
    /// Dominant topic and its probability per publication title
    Titles,
    /// Mean topic share per year, one series per topic
    TopicsOverTime,
    /// Mean topic share per year, one row per year
    TopicsStacked,
    /// Topic co-occurrence within dominant-topic groups
    CoOccurrence,
    /// Mean topic distribution per journal
    Journals,
    /// Highest-weight words per topic
    TopWords {
        #[clap(short, long)]
        n: Option<usize>,
    },
    /// Every report over the derived collection
    All,
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(args) {
        error!("{:#}", e);
        std::process::exit(exit_code(&e));
    }
}

// 2 when the stored topic data or model output is corrupt, 1 otherwise.
fn exit_code(error: &anyhow::Error) -> i32 {
    let corrupt = error
        .chain()
        .filter_map(|cause| cause.downcast_ref::<InterpretError>())
        .any(InterpretError::is_corruption);
    if corrupt {
        2
    } else {
        1
    }
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: Args) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => AnalysisConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AnalysisConfig::default(),
    };
    if let Some(store_dir) = args.store_dir {
        config.store_dir = store_dir;
    }
    if let Some(k) = args.topics {
        config.model.k = k;
    }
    config.validate()?;

    let mut store = JsonlStore::open(&config.store_dir)
        .with_context(|| format!("Failed to open store {}", config.store_dir.display()))?;
    let outputs = OutputLocations::from_config(&config);
    let k = config.model.k;

    match args.command {
        Command::Infer => {
            let model = load_model(&config)?;
            let summary = inference::run_inference_pass(
                &mut store,
                &model,
                &config.raw_collection,
                &config.derived_collection,
            )?;
            outputs.write_table("inference-summary", &summary)?;
        }
        Command::TopWords { n } => {
            let model = load_model(&config)?;
            let labels = load_labels(&config)?;
            let table = report::top_words_table(&model, &labels, n.unwrap_or(config.top_n_words))?;
            outputs.write_table("top-words", &table)?;
        }
        command => {
            let labels = load_labels(&config)?;
            let documents = report::load_publications(&store, &config.derived_collection)?;
            info!("Loaded {} publications from {}", documents.len(), config.derived_collection);
            run_report(&command, &documents, k, &labels, &outputs)?;
        }
    }

    Ok(())
}

fn run_report(
    command: &Command,
    documents: &[PublicationRecord],
    k: usize,
    labels: &TopicLabels,
    outputs: &OutputLocations,
) -> anyhow::Result<()> {
    let all = matches!(command, Command::All);

    if all || matches!(command, Command::Titles) {
        outputs.write_table("titles-to-topics", &report::title_table(documents)?)?;
    }
    if all || matches!(command, Command::TopicsOverTime) {
        outputs.write_plot_data("topics-over-time", &report::topics_over_time(documents, k, labels)?)?;
    }
    if all || matches!(command, Command::TopicsStacked) {
        outputs.write_plot_data("topics-over-time-stacked", &report::topics_stacked(documents, k, labels)?)?;
    }
    if all || matches!(command, Command::CoOccurrence) {
        outputs.write_plot_data("topic-co-occurrence", &report::co_occurrence(documents, k, labels)?)?;
    }
    if all || matches!(command, Command::Journals) {
        outputs.write_plot_data("topics-in-journals", &report::journal_heatmap(documents, k, labels)?)?;
    }
    Ok(())
}

fn load_model(config: &AnalysisConfig) -> anyhow::Result<LdaModel> {
    LdaModel::load(&config.models_folder, &config.model)
        .with_context(|| format!("Failed to load model {}", config.model))
}

fn load_labels(config: &AnalysisConfig) -> anyhow::Result<TopicLabels> {
    if !config.labels_path.exists() {
        warn!(
            "No labels at {}, falling back to numbered topics",
            config.labels_path.display()
        );
        return Ok(TopicLabels::numbered(config.model.k));
    }
    TopicLabels::load(&config.labels_path, config.model.k)
        .with_context(|| format!("Failed to load labels {}", config.labels_path.display()))
}
