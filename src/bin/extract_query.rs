use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use searchterm::config::ExtractorConfig;
use searchterm::document::Article;
use searchterm::extraction::{QueryMode, ScoringStrategy, StatisticalStrategy};
use searchterm::pipeline::{analyze_article, learned_strategy, Analysis};
use searchterm::storage::{ArticleFilter, DocumentStore, MemoryStore, SqliteStore};
use searchterm::text::LexiconPosLookup;
use searchterm::training::{
    collect_training_terms, evaluate, select_training_data, Selection, TrainingSet,
};
use searchterm::TextTools;
use std::path::{Path, PathBuf};
use tokio::main;
use tracing::{info, warn};

#[derive(Parser)]
#[command(author, version, about = "Extract image search queries from news articles", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Scoring strategy
    #[arg(short, long, value_enum, default_value = "statistical", global = true)]
    strategy: StrategyArg,

    /// JSON lexicon (word -> ["noun", "verb", ...]) for part-of-speech lookups
    #[arg(long, global = true)]
    lexicon: Option<PathBuf>,

    /// Build queries from entity terms only
    #[arg(long, global = true)]
    entities_only: bool,

    /// Also print the terms above the keyword threshold
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory for the rolling log file
    #[arg(long, default_value = "logs", global = true)]
    log_dir: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the query of one article JSON file
    File {
        /// Article with headline, paragraphs and optional entities
        path: PathBuf,
    },

    /// Extract queries for the articles of a document store
    Store {
        /// JSON store file, or SQLite database with --sqlite
        path: PathBuf,

        /// Treat the store as a SQLite database
        #[arg(long)]
        sqlite: bool,

        /// Only articles with entity annotations
        #[arg(long)]
        with_entities: bool,

        /// Maximum number of articles
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Train a classifier on the keyword-labelled articles of a JSON document store
    Train {
        /// JSON store file
        store: PathBuf,

        /// Where to write the serialized model
        #[arg(short, long)]
        output: PathBuf,

        /// Row selection (slice, balanced)
        #[arg(long, default_value = "balanced")]
        selection: String,

        /// Maximum number of training rows
        #[arg(long)]
        rows: Option<usize>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    Statistical,
    Learned,
}

#[main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    searchterm::logging::configure_logging(&cli.log_dir);

    let mut config = ExtractorConfig::from_env()?;
    if cli.entities_only {
        config.query_mode = QueryMode::EntitiesOnly;
    }

    let pos_lookup = match &cli.lexicon {
        Some(path) => {
            let json = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read lexicon {}", path.display()))?;
            LexiconPosLookup::from_json(&json)?
        }
        None => {
            warn!("No lexicon given; every word is reported as 'rest'");
            LexiconPosLookup::new()
        }
    };

    if let Commands::Train {
        store,
        output,
        selection,
        rows,
    } = &cli.command
    {
        return train(&config, &pos_lookup, store, output, selection, *rows).await;
    }

    match cli.strategy {
        StrategyArg::Statistical => run(&cli, &config, &pos_lookup, StatisticalStrategy).await,
        StrategyArg::Learned => {
            let strategy = learned_strategy(&config)?;
            run(&cli, &config, &pos_lookup, strategy).await
        }
    }
}

async fn run<S: ScoringStrategy>(
    cli: &Cli,
    config: &ExtractorConfig,
    pos_lookup: &LexiconPosLookup,
    strategy: S,
) -> Result<()> {
    let tools = TextTools::default();

    match &cli.command {
        Commands::File { path } => {
            let article = read_article(path).await?;
            let analysis = analyze_article(&article, &strategy, &tools, pos_lookup, config).await?;
            print_analysis(&path.display().to_string(), &analysis, cli.verbose);
        }

        Commands::Store {
            path,
            sqlite,
            with_entities,
            limit,
        } => {
            let filter = ArticleFilter {
                with_entities: *with_entities,
                limit: *limit,
                ..Default::default()
            };

            if *sqlite {
                let store = SqliteStore::connect(&path.to_string_lossy()).await?;
                run_store(&store, &filter, cli, config, pos_lookup, &strategy).await?;
            } else {
                let store = MemoryStore::load(path).await?;
                run_store(&store, &filter, cli, config, pos_lookup, &strategy).await?;
            }
        }

        Commands::Train { .. } => unreachable!("handled before a strategy is built"),
    }
    Ok(())
}

async fn train(
    config: &ExtractorConfig,
    pos_lookup: &LexiconPosLookup,
    store_path: &Path,
    output: &Path,
    selection: &str,
    rows: Option<usize>,
) -> Result<()> {
    let store = MemoryStore::load(store_path).await?;
    let filter = ArticleFilter::default().with_lead_image();
    let corpus = collect_training_terms(
        &store,
        &filter,
        &TextTools::default(),
        pos_lookup,
        config.fuzzy_threshold,
    )
    .await?;
    info!(
        "Collected {} training and {} test terms from {} articles",
        corpus.training.len(),
        corpus.test.len(),
        corpus.articles
    );

    let selection = match (selection.parse::<Selection>()?, rows) {
        (Selection::Slice(_), Some(n)) => Selection::Slice(n),
        (Selection::Balanced(_), Some(n)) => Selection::Balanced(Some(n)),
        (selection, None) => selection,
    };
    let builder = config.feature_builder();
    let available = TrainingSet::from_terms(&corpus.training, &builder);
    let training = select_training_data(&available.features, &available.labels, selection)?;

    let mut classifier = config.model_kind.classifier();
    classifier.train(&training.features, &training.labels)?;
    tokio::fs::write(output, classifier.serialize()?)
        .await
        .with_context(|| format!("Failed to write model {}", output.display()))?;

    let test = TrainingSet::from_terms(&corpus.test, &builder);
    let predictions = classifier.predict(&test.features)?;
    let evaluation = evaluate(&predictions, &test.labels, config.keyword_threshold)?;
    println!("Model written to {}", output.display());
    println!(
        "Correct predictions: {:.2} % overall, {:.2} % of keywords, {:.2} % of regular terms",
        evaluation.prediction_rate * 100.0,
        evaluation.keyword_rate * 100.0,
        evaluation.regular_rate * 100.0
    );
    println!(
        "Keyword precision: {:.2} % ({} predicted)",
        evaluation.keyword_precision * 100.0,
        evaluation.predicted_keywords
    );
    Ok(())
}

async fn run_store<D: DocumentStore, S: ScoringStrategy>(
    store: &D,
    filter: &ArticleFilter,
    cli: &Cli,
    config: &ExtractorConfig,
    pos_lookup: &LexiconPosLookup,
    strategy: &S,
) -> Result<()> {
    let tools = TextTools::default();
    let ids = store.get_article_ids(filter).await?;
    info!("Extracting queries for {} articles", ids.len());

    let mut found = 0;
    for article in store.get_articles(&ids).await? {
        let label = article
            .id
            .map_or_else(|| "?".to_string(), |id| id.to_string());
        let analysis = analyze_article(&article, strategy, &tools, pos_lookup, config)
            .await
            .with_context(|| format!("Failed to analyze article {}", label))?;
        if analysis.found_query() {
            found += 1;
        }
        print_analysis(&label, &analysis, cli.verbose);
    }
    info!("Found queries for {} of {} articles", found, ids.len());
    Ok(())
}

async fn read_article(path: &Path) -> Result<Article> {
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read article {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Malformed article {}", path.display()))
}

fn print_analysis(label: &str, analysis: &Analysis, verbose: bool) {
    if analysis.found_query() {
        println!("{}\t{}", label, analysis.query);
    } else {
        println!("{}\t(no query found)", label);
    }
    if verbose {
        for scored in &analysis.keywords {
            println!("\t{:.3}\t{}", scored.p, scored.term.display_form());
        }
    }
}
