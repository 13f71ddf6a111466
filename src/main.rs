use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use graph_writer::{GraphWriter, GraphWriterConfig, Neo4jGraphStore};
use startup_config::{load_workspace_manifest, EngineConfig};
use symbol_mapper::MapperConfig;
use tracing::info;
use vector_writer::{Distance, HttpEmbeddingProvider, MockEmbeddingProvider, QdrantVectorStore, VectorWriter, VectorWriterConfig};
use workspace_pipeline::{run_workspace_pipeline, PipelineRunOptions, RepoStageConfig, ScipIndexerConfig};

#[derive(Parser, Debug)]
#[command(name = "cxxkb", about = "Builds a vector + graph knowledge base from a C++ workspace")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Runs the full workspace ingest: fetch, extract, index, and write every enabled repo.
    Run {
        /// Path to the workspace manifest (YAML or JSON, §6).
        #[arg(long = "manifest-path")]
        manifest_path: PathBuf,

        /// Path to a docker-compose.yml used to derive deployment defaults when env vars are silent.
        #[arg(long)]
        compose: Option<PathBuf>,

        /// Restricts the run to a single named repo from the manifest.
        #[arg(long = "repo-name")]
        repo_name: Option<String>,

        /// Overrides the compdb path(s) of the repo selected by `--repo-name` with this single path.
        #[arg(long = "compdb-path", requires = "repo_name")]
        compdb_path: Option<PathBuf>,

        /// Overrides the workspace-wide SCIP index output directory.
        #[arg(long = "index-path")]
        index_path: Option<PathBuf>,

        /// Skips compdb normalization, scip-clang, and graph ingestion for every repo this run.
        #[arg(long = "skip-indexing")]
        skip_indexing: bool,

        /// Wipes the graph store before merging this run's graph in, instead of merging incrementally.
        #[arg(long = "recreate-graph")]
        recreate_graph: bool,

        /// Number of repo checkouts fetched concurrently, and the `--jobs` hint passed to scip-clang.
        #[arg(long, default_value_t = 4)]
        jobs: usize,

        /// Treats any configuration fallback (missing env var, missing compose service) as fatal.
        #[arg(long = "strict-config")]
        strict_config: bool,

        /// Initializes and updates git submodules after each repo checkout.
        #[arg(long = "update-submodules")]
        update_submodules: bool,

        /// Aborts the run after the first repo that fails, instead of continuing with the rest.
        #[arg(long = "fail-fast")]
        fail_fast: bool,

        /// scip-clang binary to invoke for each compile database.
        #[arg(long, default_value = "scip-clang")]
        scip_clang: String,

        /// Per-compdb scip-clang timeout, in seconds.
        #[arg(long, default_value_t = 600)]
        scip_clang_timeout_secs: u64,

        /// Treat the current host as Windows when normalizing compile databases (§4.8).
        #[arg(long)]
        host_windows: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file, if present. Unlike the
    // manifest and compose file, a missing .env is not an error: most
    // deployments set these vars directly in the environment instead.
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            manifest_path,
            compose,
            repo_name,
            compdb_path,
            index_path,
            skip_indexing,
            recreate_graph,
            jobs,
            strict_config,
            update_submodules,
            fail_fast,
            scip_clang,
            scip_clang_timeout_secs,
            host_windows,
        } => {
            run(RunArgs {
                manifest_path,
                compose_path: compose,
                repo_name,
                compdb_path,
                index_path,
                skip_indexing,
                recreate_graph,
                jobs,
                strict_config,
                update_submodules,
                fail_fast,
                scip_clang_binary: scip_clang,
                scip_clang_timeout_secs,
                host_windows,
            })
            .await
        }
    }
}

struct RunArgs {
    manifest_path: PathBuf,
    compose_path: Option<PathBuf>,
    repo_name: Option<String>,
    compdb_path: Option<PathBuf>,
    index_path: Option<PathBuf>,
    skip_indexing: bool,
    recreate_graph: bool,
    jobs: usize,
    strict_config: bool,
    update_submodules: bool,
    fail_fast: bool,
    scip_clang_binary: String,
    scip_clang_timeout_secs: u64,
    host_windows: bool,
}

async fn run(args: RunArgs) -> anyhow::Result<()> {
    if args.strict_config {
        // SAFETY: single-threaded at this point in startup, before any
        // spawned task could observe a torn read of the environment.
        unsafe { std::env::set_var("STRICT_CONFIG_VALIDATION", "1") };
    }

    let mut manifest = load_workspace_manifest(&args.manifest_path).context("loading workspace manifest")?;

    if let Some(repo_name) = &args.repo_name {
        manifest.repos.retain(|r| &r.repo_name == repo_name);
        if manifest.repos.is_empty() {
            anyhow::bail!("no repo named '{repo_name}' in manifest '{}'", args.manifest_path.display());
        }
        if let Some(compdb_path) = &args.compdb_path {
            manifest.repos[0].compdb_paths = vec![compdb_path.display().to_string()];
        }
    }

    if args.skip_indexing {
        for repo in &mut manifest.repos {
            repo.run_graph = false;
        }
    }

    let compose_path = args.compose_path.unwrap_or_else(EngineConfig::default_compose_path);
    let compose_path = compose_path.exists().then_some(compose_path);
    let config = EngineConfig::load_from_env_or_compose(compose_path.as_deref()).context("resolving engine configuration")?;

    info!(
        workspace = %manifest.workspace_name,
        repos = manifest.repos.len(),
        mock_embedding = config.use_mock_embedding,
        "starting workspace ingest"
    );

    let mapper_config = MapperConfig::default();

    let index_dir = args.index_path.unwrap_or_else(|| PathBuf::from(&manifest.index_dir));
    let stage_cfg = RepoStageConfig {
        repo_cache_dir: PathBuf::from(&manifest.repo_cache_dir),
        entities_dir: PathBuf::from(&manifest.entities_dir),
        index_dir,
        host_is_windows: args.host_windows,
        scip_indexer: ScipIndexerConfig {
            binary: args.scip_clang_binary,
            timeout: Duration::from_secs(args.scip_clang_timeout_secs),
            extra_args: vec!["--jobs".to_string(), args.jobs.to_string()],
        },
    };

    let run_options = PipelineRunOptions {
        jobs: args.jobs,
        fail_fast: args.fail_fast,
        update_submodules: args.update_submodules,
    };

    tokio::fs::create_dir_all(&stage_cfg.repo_cache_dir).await?;
    tokio::fs::create_dir_all(&stage_cfg.entities_dir).await?;
    tokio::fs::create_dir_all(&stage_cfg.index_dir).await?;

    let store = Neo4jGraphStore::connect(&config.neo4j_uri, &config.neo4j_user, &config.neo4j_password).await?;
    let graph_writer_cfg = GraphWriterConfig {
        recreate_before_write: args.recreate_graph || manifest.neo4j.recreate_graph,
        ..GraphWriterConfig::default()
    };
    let graph_writer = GraphWriter::new(store, graph_writer_cfg);

    let collection_name = manifest.qdrant.collection_name.clone().unwrap_or_else(|| manifest.workspace_name.clone());
    let vector_store = QdrantVectorStore::new(&config.qdrant_url, config.qdrant_api_key.as_deref(), &collection_name)?;
    let vector_writer_cfg = VectorWriterConfig {
        recreate_on_mismatch: manifest.qdrant.recreate_collection,
        ..VectorWriterConfig::new(config.vector_dimension, Distance::Cosine)
    };

    let report = if config.use_mock_embedding {
        let embedder = MockEmbeddingProvider;
        let writer = VectorWriter::new(vector_store, embedder, vector_writer_cfg);
        run_workspace_pipeline(&manifest, &stage_cfg, &mapper_config, &run_options, Some(&graph_writer), Some(&writer)).await?
    } else {
        let embedder = HttpEmbeddingProvider::new(
            &config.embedding_endpoint,
            &config.embedding_model,
            config.embedding_api_key.as_deref(),
            Duration::from_secs(60),
        )?;
        let writer = VectorWriter::new(vector_store, embedder, vector_writer_cfg);
        run_workspace_pipeline(&manifest, &stage_cfg, &mapper_config, &run_options, Some(&graph_writer), Some(&writer)).await?
    };

    info!(
        status = ?report.status,
        repos_with_errors = report.repos_with_errors(),
        "workspace ingest finished"
    );
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
