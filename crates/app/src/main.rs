use anyhow::Context;
use catalog_search_core::{
    index_catalog_folder, CatalogOptions, CharacterNgramEmbedder, ChatCompletionsClient,
    DocumentStore, Embedder, LanguageModel, LocalStore, NoLanguageModel, ProductAssistant,
    ProductMatch, ProductRecord, QdrantStore, RemoteEmbedder, SerpApiSearch, DEFAULT_CHAT_ENDPOINT,
    DEFAULT_CHAT_MODEL, DEFAULT_EMBEDDING_DIMENSIONS,
};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "catalog-search", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Document store backend.
    #[arg(long, value_enum, default_value_t = StoreKind::Local, env = "CATALOG_STORE")]
    store: StoreKind,

    /// Directory for the local store.
    #[arg(long, default_value = "catalog_index", env = "CATALOG_DATA_DIR")]
    data_dir: PathBuf,

    /// Qdrant base URL
    #[arg(long, default_value = "http://localhost:6333", env = "QDRANT_URL")]
    qdrant_url: String,

    /// Qdrant collection
    #[arg(long, default_value = "products")]
    qdrant_collection: String,

    /// Embedding model.
    #[arg(long, value_enum, default_value_t = EmbedderKind::Ngram)]
    embedder: EmbedderKind,

    /// OpenAI-compatible embeddings base URL for `--embedder remote`.
    #[arg(long, default_value = "https://api.openai.com/v1", env = "EMBEDDING_URL")]
    embedding_url: String,

    /// Remote embedding model name.
    #[arg(long, default_value = "text-embedding-3-small", env = "EMBEDDING_MODEL")]
    embedding_model: String,

    /// Remote embedding vector size.
    #[arg(long, default_value = "1536")]
    embedding_dimensions: usize,

    #[arg(long, env = "EMBEDDING_API_KEY", hide_env_values = true)]
    embedding_api_key: Option<String>,

    /// OpenAI-compatible chat completions base URL.
    #[arg(long, default_value = DEFAULT_CHAT_ENDPOINT, env = "LLM_URL")]
    llm_url: String,

    #[arg(long, default_value = DEFAULT_CHAT_MODEL, env = "LLM_MODEL")]
    llm_model: String,

    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
    llm_api_key: Option<String>,

    /// SerpApi key for the online fallback; without it online search is empty.
    #[arg(long, env = "SERPAPI_KEY", hide_env_values = true)]
    serpapi_key: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum StoreKind {
    Local,
    Qdrant,
}

#[derive(Clone, Copy, ValueEnum)]
enum EmbedderKind {
    Ngram,
    Remote,
}

#[derive(Subcommand)]
enum Command {
    /// Extract every .xlsx/.pdf catalog in a folder and index the products.
    Index {
        #[arg(long, default_value = "data/catalogs")]
        folder: PathBuf,
        /// Descend into sub-folders.
        #[arg(long, default_value_t = false)]
        recursive: bool,
    },
    /// Similarity search over the indexed catalog.
    Search {
        #[arg(long)]
        query: String,
        #[arg(long, default_value = "10")]
        top_k: usize,
        /// Fall back to online listings when nothing local matches.
        #[arg(long, default_value_t = false)]
        online: bool,
    },
    /// Print one product by identifier (`<category>_<Product_Name>`).
    Get {
        #[arg(long)]
        id: String,
    },
    /// Answer a single question.
    Ask {
        #[arg(long)]
        query: String,
    },
    /// Interactive assistant; type `exit` to quit.
    Chat,
}

type Assistant = ProductAssistant<Box<dyn DocumentStore>, Box<dyn LanguageModel>, SerpApiSearch>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "catalog-search boot"
    );

    let embedder = build_embedder(&cli)?;
    let store = open_store(&cli, embedder).await?;

    let assistant: Assistant = ProductAssistant::new(
        store,
        build_language_model(&cli)?,
        SerpApiSearch::new(cli.serpapi_key.clone()),
    );

    let outcome = run(&cli, &assistant).await;

    assistant
        .store()
        .close()
        .await
        .context("failed to close document store")?;

    outcome
}

async fn run(cli: &Cli, assistant: &Assistant) -> anyhow::Result<()> {
    match &cli.command {
        Command::Index { folder, recursive } => {
            let options = CatalogOptions {
                recursive: *recursive,
                ..CatalogOptions::default()
            };
            index_folder(assistant.store(), folder, &options).await?;
        }
        Command::Search {
            query,
            top_k,
            online,
        } => {
            let matches = assistant.search_products(query, *top_k, *online).await?;
            if matches.is_empty() {
                println!("no products found");
            }
            for found in matches {
                match found {
                    ProductMatch::Local(record) => println!(
                        "[local] {} | {} {}: {}, Price: ${}, {}",
                        record.identifier(),
                        record.brand,
                        record.product_name,
                        record.description,
                        record.price,
                        record.stock
                    ),
                    ProductMatch::Online(listing) => println!(
                        "[online] {}: ${}",
                        listing.title().unwrap_or("Unknown Product"),
                        listing.price().unwrap_or_else(|| "N/A".to_string())
                    ),
                }
            }
        }
        Command::Get { id } => match assistant.product_details(id).await? {
            Some(record) => println!("{}", render_record(&record)),
            None => println!("product not found: {id}"),
        },
        Command::Ask { query } => {
            println!("{}", assistant.answer(query).await);
        }
        Command::Chat => chat_loop(assistant).await?,
    }

    Ok(())
}

async fn index_folder(
    store: &dyn DocumentStore,
    folder: &Path,
    options: &CatalogOptions,
) -> anyhow::Result<()> {
    let run = index_catalog_folder(store, folder, options)
        .await
        .with_context(|| format!("indexing {} failed", folder.display()))?;

    println!(
        "{} products indexed, {} failed, {} entries skipped, {} files skipped at {}",
        run.summary.indexed,
        run.summary.failures.len(),
        run.ingestion.skipped_units.len(),
        run.ingestion.skipped_files.len(),
        Utc::now().to_rfc3339()
    );
    Ok(())
}

async fn chat_loop(assistant: &Assistant) -> anyhow::Result<()> {
    println!("Welcome to the product assistant! Type 'exit' to quit.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("Enter your query: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let query = line.trim();
        if query.eq_ignore_ascii_case("exit") {
            break;
        }
        if query.is_empty() {
            continue;
        }

        println!("{}", assistant.answer(query).await);
    }

    Ok(())
}

fn build_embedder(cli: &Cli) -> anyhow::Result<Arc<dyn Embedder>> {
    let embedder: Arc<dyn Embedder> = match cli.embedder {
        EmbedderKind::Ngram => Arc::new(CharacterNgramEmbedder {
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }),
        EmbedderKind::Remote => Arc::new(
            RemoteEmbedder::new(
                &cli.embedding_url,
                cli.embedding_model.clone(),
                cli.embedding_dimensions,
                cli.embedding_api_key.clone(),
            )
            .context("failed to build embedding client")?,
        ),
    };
    Ok(embedder)
}

async fn open_store(
    cli: &Cli,
    embedder: Arc<dyn Embedder>,
) -> anyhow::Result<Box<dyn DocumentStore>> {
    let store: Box<dyn DocumentStore> = match cli.store {
        StoreKind::Local => Box::new(
            LocalStore::open(&cli.data_dir, embedder)
                .await
                .context("failed to open local store")?,
        ),
        StoreKind::Qdrant => Box::new(
            QdrantStore::connect(&cli.qdrant_url, &cli.qdrant_collection, embedder)
                .await
                .context("failed to connect to qdrant")?,
        ),
    };
    Ok(store)
}

fn build_language_model(cli: &Cli) -> anyhow::Result<Box<dyn LanguageModel>> {
    let model: Box<dyn LanguageModel> = match cli.llm_api_key.as_deref().map(str::trim) {
        Some(key) if !key.is_empty() => Box::new(
            ChatCompletionsClient::new(&cli.llm_url, cli.llm_model.clone(), key)
                .context("failed to build language model client")?,
        ),
        _ => {
            warn!("no language model API key set; answers will list raw results");
            Box::new(NoLanguageModel)
        }
    };
    Ok(model)
}

fn render_record(record: &ProductRecord) -> String {
    format!(
        "id: {}\ncategory: {}\nbrand: {}\nproduct_name: {}\ndescription: {}\nprice: {}\nstock: {}",
        record.identifier(),
        record.category,
        record.brand,
        record.product_name,
        record.description,
        record.price,
        record.stock
    )
}
