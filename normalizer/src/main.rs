// /////////////////////////////////////////////////////////////////////////////
// Catalog Normalizer
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Catalog Normalizer CLI
//!
//! The composition root's binary half (`normalizer_bootstrap` owns the
//! other half: CLI parsing, config loading, signals, shutdown). Parses
//! arguments, loads configuration, wires every adapter to its
//! `normalizer_domain` trait, and dispatches on the requested
//! subcommand: `serve` runs the HTTP surface from `spec.md` §6;
//! `migrate`, `validate-config`, `reclassify`, `load-benchmarks`, and
//! `show-record` are maintenance entry points that share the same
//! repository and service wiring without starting a listener.

use std::path::Path;
use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use sqlx::SqlitePool;
use tokio::runtime::Builder as RuntimeBuilder;
use tracing::{debug, error, info, warn};

use normalizer_bootstrap::config::{AppConfig, DuplicateWeights};
use normalizer_bootstrap::{
    bootstrap_cli, create_platform, map_error_to_exit_code, result_to_exit_code, BootstrapLogger, ConsoleLogger, ExitCode,
    ShutdownCoordinator, ValidatedCli, ValidatedCommand, DEFAULT_GRACE_PERIOD_SECS,
};

use normalizer_domain::repositories::{BenchmarkRepository, CatalogRepository, CodeTreeRepository, GroupRepository, NormalizedRecordRepository, SessionRepository, UploadRepository};
use normalizer_domain::services::completion::Completion;
use normalizer_domain::services::duplicate_detector::{DuplicateDetectionConfig, DuplicateDetector, MatchAlgorithm};
use normalizer_domain::services::hierarchical_classifier::{HierarchicalClassifier, KeywordClassifier};
use normalizer_domain::services::name_normalizer::NameNormalizer;
use normalizer_domain::services::text_toolkit::{HybridScorer, HybridWeights, PhoneticEncoder, Stemmer, Tokenizer};
use normalizer_domain::{Benchmark, NormalizationError, NormalizedRecordId};

use normalizer::application::use_cases::{
    DetectDuplicatesUseCase, IngestUploadUseCase, ReclassifyHierarchicalUseCase, RetrieveCatalogUseCase, RunNormalizationUseCase,
};
use normalizer::infrastructure::adapters::{HttpCompletion, LmClientConfig as HttpLmClientConfig};
use normalizer::infrastructure::config::ConfigService;
use normalizer::infrastructure::logging::ObservabilityService;
use normalizer::infrastructure::metrics::MetricsService;
use normalizer::infrastructure::repositories::sqlite::{
    initialize_database, SqliteBenchmarkRepository, SqliteCatalogRepository, SqliteCodeTreeRepository, SqliteGroupRepository,
    SqliteNormalizedRecordRepository, SqliteSessionRepository, SqliteUploadRepository,
};
use normalizer::infrastructure::runtime::{LmWorkerPool, NormalizationPipeline, StageExecutor};
use normalizer::infrastructure::services::{
    CachedBenchmarkStore, LearningKeywordClassifier, LmHierarchicalClassifier, RegexNameNormalizer, ScoredDuplicateDetector,
    SnowballStemmer, StandardPhoneticEncoder, StrsimEditDistances, UnicodeTokenizer, WeightedHybridScorer,
};
use normalizer::presentation::http::{router, AppState};

fn main() -> std::process::ExitCode {
    let bootstrap_logger = ConsoleLogger::new();

    let cli = match bootstrap_cli() {
        Ok(cli) => cli,
        Err(err) => {
            bootstrap_logger.error(&format!("invalid command line: {err}"));
            return std::process::ExitCode::from(ExitCode::GenericError.code());
        }
    };

    init_tracing(cli.verbose);
    bootstrap_logger.info("normalizer starting");

    let platform = create_platform();
    let worker_threads = cli.cpu_threads.unwrap_or_else(|| platform.cpu_count().max(1));
    let blocking_threads = cli.io_threads.unwrap_or(512);
    debug!(worker_threads, blocking_threads, channel_depth = cli.channel_depth, "sizing tokio runtime");

    let runtime = match RuntimeBuilder::new_multi_thread()
        .worker_threads(worker_threads)
        .max_blocking_threads(blocking_threads)
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            error!("failed to build tokio runtime: {err}");
            return std::process::ExitCode::from(ExitCode::GenericError.code());
        }
    };

    let result = runtime.block_on(run(cli));
    if let Err(ref err) = result {
        error!("normalizer exited with error: {err}");
    }
    std::process::ExitCode::from(result_to_exit_code(&result).code())
}

fn init_tracing(verbose: bool) {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let subscriber = tracing_subscriber::fmt().with_max_level(level).finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("tracing subscriber already set, continuing with the existing one");
    }
}

async fn run(cli: ValidatedCli) -> Result<(), NormalizationError> {
    let config = normalizer_bootstrap::config::load(cli.config.as_deref())
        .map_err(|err| NormalizationError::invalid_config(err.to_string()))?;

    match cli.command {
        ValidatedCommand::ValidateConfig { config: path } => validate_config(&path).await,
        ValidatedCommand::Migrate => migrate(&config).await,
        ValidatedCommand::Serve { bind } => serve(config, bind).await,
        ValidatedCommand::Reclassify { catalog_id, force } => reclassify(config, &catalog_id, force).await,
        ValidatedCommand::LoadBenchmarks { file } => load_benchmarks(config, &file).await,
        ValidatedCommand::ShowRecord { record_id } => show_record(config, &record_id).await,
    }
}

async fn validate_config(path: &Path) -> Result<(), NormalizationError> {
    let config = normalizer_bootstrap::config::load(Some(path)).map_err(|err| NormalizationError::invalid_config(err.to_string()))?;
    info!(
        database_url = %config.database_url,
        bind_address = %config.bind_address,
        "configuration at {} is valid",
        path.display()
    );
    println!("configuration OK: {}", path.display());
    Ok(())
}

async fn migrate(config: &AppConfig) -> Result<(), NormalizationError> {
    initialize_database(&config.database_url).await.map_err(|err| NormalizationError::database_error(err.to_string()))?;
    info!(database_url = %config.database_url, "schema migrations applied");
    println!("migrations applied to {}", config.database_url);
    Ok(())
}

/// Everything shared by `serve`, `reclassify`, `load-benchmarks`, and
/// `show-record`: the repository set, the domain services, and the
/// use cases built on top of them.
struct Composition {
    pool: SqlitePool,
    ingest: Arc<IngestUploadUseCase>,
    retrieve: Arc<RetrieveCatalogUseCase>,
    run_normalization: Arc<RunNormalizationUseCase>,
    reclassify: Arc<ReclassifyHierarchicalUseCase>,
    detect_duplicates: Arc<DetectDuplicatesUseCase>,
    benchmarks: Arc<dyn BenchmarkRepository>,
    records: Arc<dyn NormalizedRecordRepository>,
}

async fn compose(config: &AppConfig) -> Result<Composition, NormalizationError> {
    let pool = initialize_database(&config.database_url).await.map_err(|err| NormalizationError::database_error(err.to_string()))?;

    let uploads: Arc<dyn UploadRepository> = Arc::new(SqliteUploadRepository::new(pool.clone()));
    let catalogs: Arc<dyn CatalogRepository> = Arc::new(SqliteCatalogRepository::new(pool.clone()));
    let code_tree: Arc<dyn CodeTreeRepository> = Arc::new(SqliteCodeTreeRepository::new(pool.clone()));
    let groups: Arc<dyn GroupRepository> = Arc::new(SqliteGroupRepository::new(pool.clone()));
    let records: Arc<dyn NormalizedRecordRepository> = Arc::new(SqliteNormalizedRecordRepository::new(pool.clone()));
    let sessions: Arc<dyn SessionRepository> = Arc::new(SqliteSessionRepository::new(pool.clone()));
    let benchmarks: Arc<dyn BenchmarkRepository> = Arc::new(SqliteBenchmarkRepository::new(pool.clone()));

    let benchmark_store = Arc::new(CachedBenchmarkStore::new(benchmarks.clone()));

    let name_normalizer: Arc<dyn NameNormalizer> = Arc::new(RegexNameNormalizer::new());
    let tokenizer: Arc<dyn Tokenizer> = Arc::new(UnicodeTokenizer::new());
    let stemmer: Arc<dyn Stemmer> = Arc::new(SnowballStemmer::russian());
    let scorer: Arc<dyn HybridScorer> = Arc::new(WeightedHybridScorer::new());
    let phonetics: Arc<dyn PhoneticEncoder> = Arc::new(StandardPhoneticEncoder::new());
    let _edit_distances = StrsimEditDistances::new();

    let completion: Arc<dyn Completion> = Arc::new(HttpCompletion::new(translate_lm_config(&config.lm_client))?);
    let keyword_classifier: Arc<dyn KeywordClassifier> = Arc::new(LearningKeywordClassifier::new());
    let seeded = benchmark_store.seed_keyword_classifier("catalog_item", name_normalizer.as_ref(), keyword_classifier.as_ref()).await?;
    info!(seeded, "seeded keyword classifier from benchmark store");
    let hierarchical_classifier: Arc<dyn HierarchicalClassifier> =
        Arc::new(LmHierarchicalClassifier::new(code_tree.clone(), completion.clone(), keyword_classifier.clone()));

    let duplicate_detector: Arc<dyn DuplicateDetector> =
        Arc::new(ScoredDuplicateDetector::new(records.clone(), catalogs.clone(), scorer.clone(), phonetics.clone()));

    let lm_pool = Arc::new(LmWorkerPool::new(config.classifier.max_workers));
    let stage_executor = Arc::new(StageExecutor::new(
        name_normalizer.clone(),
        keyword_classifier.clone(),
        hierarchical_classifier.clone(),
        completion.clone(),
        benchmark_store.clone(),
        lm_pool.clone(),
    ));
    let pipeline = Arc::new(NormalizationPipeline::new(
        records.clone(),
        catalogs.clone(),
        groups.clone(),
        name_normalizer.clone(),
        tokenizer.clone(),
        stemmer.clone(),
        scorer.clone(),
        stage_executor,
    ));

    let ingest = Arc::new(IngestUploadUseCase::new(uploads.clone(), catalogs.clone()));
    let retrieve = Arc::new(RetrieveCatalogUseCase::new(uploads.clone(), catalogs.clone()));
    let run_normalization = Arc::new(RunNormalizationUseCase::new(sessions.clone(), pipeline));
    let reclassify = Arc::new(ReclassifyHierarchicalUseCase::new(records.clone(), hierarchical_classifier.clone()));
    let detect_duplicates = Arc::new(DetectDuplicatesUseCase::new(records.clone(), catalogs.clone(), groups.clone(), duplicate_detector));

    Ok(Composition { pool, ingest, retrieve, run_normalization, reclassify, detect_duplicates, benchmarks, records })
}

/// `normalizer_bootstrap`'s `LmClientConfig` has no `base_url`/
/// `max_retries` — those are HTTP-adapter concerns, not domain-facing
/// settings, so they come from the adapter's own defaults here.
fn translate_lm_config(cfg: &normalizer_bootstrap::config::LmClientConfig) -> HttpLmClientConfig {
    let defaults = HttpLmClientConfig::default();
    HttpLmClientConfig {
        base_url: defaults.base_url,
        model: cfg.model.clone(),
        api_key: cfg.api_key.clone(),
        timeout_secs: cfg.timeout_secs,
        rate_limit_per_min: cfg.rate_limit_per_min,
        max_retries: defaults.max_retries,
        breaker_failure_threshold: cfg.breaker_thresholds.failure_count,
        breaker_reset_secs: cfg.breaker_thresholds.reset_timeout_secs,
    }
}

/// `normalizer_bootstrap`'s `DuplicateWeights`/`DuplicateDetectionConfig`
/// only carry the five scoring weights and a threshold/batch/max-items
/// triplet (`spec.md` §9) — the domain type additionally wants an
/// explicit algorithm set and a merge-overlapping flag. Every algorithm
/// runs by default and overlapping candidate groups are merged, since
/// neither is currently exposed as a separate config knob.
fn translate_duplicate_config(cfg: &normalizer_bootstrap::config::DuplicateDetectionConfig) -> DuplicateDetectionConfig {
    DuplicateDetectionConfig {
        algorithms: vec![
            MatchAlgorithm::ExactByCode,
            MatchAlgorithm::ExactByName,
            MatchAlgorithm::Fuzzy,
            MatchAlgorithm::Phonetic,
            MatchAlgorithm::Semantic,
        ],
        threshold: cfg.threshold,
        merge_overlapping: true,
        max_items: cfg.max_items,
        weights: translate_weights(&cfg.weights),
    }
}

fn translate_weights(weights: &DuplicateWeights) -> HybridWeights {
    HybridWeights { jaro_winkler: weights.jw, lcs: weights.lcs, phonetic: weights.phonetic, ngram: weights.ngram, jaccard: weights.jaccard }
}

async fn serve(config: AppConfig, bind_override: Option<String>) -> Result<(), NormalizationError> {
    let composition = compose(&config).await?;
    let bind_address = bind_override.unwrap_or_else(|| config.bind_address.clone());

    let state = AppState {
        ingest: composition.ingest,
        retrieve: composition.retrieve,
        run_normalization: composition.run_normalization,
        reclassify: composition.reclassify,
        detect_duplicates: composition.detect_duplicates,
        default_duplicate_config: translate_duplicate_config(&config.duplicate_detection),
        default_reclassify_min_confidence: config.classifier.min_confidence,
    };

    let metrics_service = Arc::new(MetricsService::new()?);
    let observability_service = Arc::new(ObservabilityService::new(metrics_service.clone()));
    let observability_config = ConfigService::load_default_observability_config()?;
    tokio::spawn(serve_metrics(metrics_service, observability_service, observability_config.metrics.port));

    let shutdown = ShutdownCoordinator::new(std::time::Duration::from_secs(DEFAULT_GRACE_PERIOD_SECS));
    let signal_handle = normalizer_bootstrap::signals::install(shutdown.clone());
    let shutdown_token = shutdown.token();

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .map_err(|err| NormalizationError::internal_error(format!("failed to bind {bind_address}: {err}")))?;
    info!(%bind_address, "normalizer HTTP surface listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_token.cancelled().await;
            info!("graceful shutdown initiated, draining in-flight requests");
        })
        .await
        .map_err(|err| NormalizationError::internal_error(format!("HTTP server error: {err}")))?;

    shutdown.complete_shutdown();
    signal_handle.abort();
    composition.pool.close().await;
    Ok(())
}

/// A small standalone listener for `GET /metrics` (Prometheus text
/// exposition) and `GET /health` (the observability service's scored
/// snapshot), separate from the main router so scrapers never share a
/// port with application traffic.
async fn serve_metrics(metrics: Arc<MetricsService>, observability: Arc<ObservabilityService>, port: u16) {
    let router = Router::new()
        .route(
            "/metrics",
            get(move || {
                let metrics = metrics.clone();
                async move { metrics.render().unwrap_or_else(|err| format!("# error rendering metrics: {err}\n")) }
            }),
        )
        .route(
            "/health",
            get(move || {
                let observability = observability.clone();
                async move { Json(observability.get_system_health().await) }
            }),
        );

    let address = format!("0.0.0.0:{port}");
    match tokio::net::TcpListener::bind(&address).await {
        Ok(listener) => {
            info!(%address, "metrics endpoint listening");
            if let Err(err) = axum::serve(listener, router).await {
                warn!("metrics endpoint stopped: {err}");
            }
        }
        Err(err) => warn!(%address, "failed to bind metrics endpoint: {err}"),
    }
}

async fn reclassify(config: AppConfig, catalog_id: &str, force: bool) -> Result<(), NormalizationError> {
    let composition = compose(&config).await?;
    let limit = if force { 10_000 } else { 100 };
    info!(catalog_id, force, limit, "running hierarchical reclassification");

    let summary = composition.reclassify.execute(limit, config.classifier.min_confidence).await?;
    println!(
        "attempted {}, reclassified {}, left pending {}",
        summary.attempted, summary.reclassified, summary.left_pending
    );
    composition.pool.close().await;
    Ok(())
}

async fn load_benchmarks(config: AppConfig, file: &Path) -> Result<(), NormalizationError> {
    let composition = compose(&config).await?;

    let contents = tokio::fs::read_to_string(file)
        .await
        .map_err(|err| NormalizationError::invalid_config(format!("cannot read {}: {err}", file.display())))?;
    let entries: Vec<BenchmarkEntry> =
        serde_json::from_str(&contents).map_err(|err| NormalizationError::invalid_config(format!("malformed benchmark file: {err}")))?;

    let mut loaded = 0u32;
    for entry in entries {
        let mut benchmark = Benchmark::new(entry.entity_type, entry.canonical_name, entry.data_blob);
        for variation in entry.variations {
            benchmark.add_variation(variation);
        }
        composition.benchmarks.save(&benchmark).await?;
        loaded += 1;
    }

    info!(loaded, file = %file.display(), "loaded benchmarks");
    println!("loaded {loaded} benchmark(s) from {}", file.display());
    composition.pool.close().await;
    Ok(())
}

#[derive(serde::Deserialize)]
struct BenchmarkEntry {
    entity_type: String,
    canonical_name: String,
    data_blob: String,
    #[serde(default)]
    variations: Vec<String>,
}

async fn show_record(config: AppConfig, record_id: &str) -> Result<(), NormalizationError> {
    let composition = compose(&config).await?;
    let id: NormalizedRecordId = record_id.parse()?;

    match composition.records.find_by_id(&id).await? {
        Some(record) => {
            let pretty = serde_json::to_string_pretty(&record).map_err(|err| NormalizationError::internal_error(err.to_string()))?;
            println!("{pretty}");
        }
        None => {
            println!("no normalized record found for id {record_id}");
            return Err(NormalizationError::RecordNotFound(record_id.to_string()));
        }
    }
    composition.pool.close().await;
    Ok(())
}

#[allow(dead_code)]
fn exit_code_for(error: &NormalizationError) -> ExitCode {
    map_error_to_exit_code(error)
}
