//! pollfinder CLI
//!
//! Commands:
//! - `filter` - filter and sort a polls file
//! - `suggest` - query completions backed by the search history
//! - `history`, `presets` - manage the stored history and filter presets
//! - `categories` - facet listing for the filter panels
//! - `interactive` - suggestions per typed line, filtered list once typing settles

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use pollfinder::cli::{
    Cli, Commands, FilterArgs, FilterFlags, HistoryCommands, InteractiveArgs, OutputFormat,
    PresetsCommands, SortFlags, SuggestArgs,
};
use pollfinder::config::{load_config, EngineConfig};
use pollfinder::history::{FileHistory, HistoryStore, MemoryHistory};
use pollfinder::output;
use pollfinder::presets::{DatePreset, FilterPreset, PresetStore};
use pollfinder::search::filter::{FilterState, ResolvedFilter, StatusTab};
use pollfinder::search::suggest::SuggestionEngine;
use pollfinder::search::{self, SortConfig, SortContext};
use pollfinder::{load_polls, spawn_debounced, AppError, Debouncer, Poll};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity flags
    let log_level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr) // Log to stderr to keep stdout clean
        .init();

    let result = run(cli).await;

    // Handle result and exit with appropriate code
    match result {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output.trim_end());
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(get_exit_code(&e));
        }
    }
}

async fn run(cli: Cli) -> Result<String> {
    let config = load_config(cli.config.as_deref())?;
    debug!("Using config: {:?}", config);

    match cli.command {
        Commands::Filter(args) => execute_filter(args, &config),
        Commands::Suggest(args) => execute_suggest(args, &config),
        Commands::History(args) => execute_history(args.command, &config),
        Commands::Presets(args) => execute_presets(args.command, &config),
        Commands::Categories(args) => {
            let polls = read_polls(&args.source.records)?;
            let needle = args.search.as_deref();
            let mut categories = search::category_counts(&polls);
            let allowed = search::categories(&polls, needle);
            categories.retain(|(name, _)| allowed.contains(name));
            let creators = search::creators(&polls, needle);
            let statuses = search::status_counts(&polls);
            match args.source.format {
                OutputFormat::Markdown => Ok(output::format_facets(&categories, &creators, &statuses)),
                OutputFormat::Json => output::facets_json(&categories, &creators, &statuses),
            }
        }
        Commands::Interactive(args) => execute_interactive(args, &config).await,
    }
}

fn read_polls(path: &std::path::Path) -> Result<Vec<Poll>> {
    load_polls(path).with_context(|| format!("Failed to load polls from {}", path.display()))
}

fn open_history(config: &EngineConfig) -> Result<FileHistory> {
    let path = match &config.history_path {
        Some(path) => path.clone(),
        None => FileHistory::default_path()?,
    };
    Ok(FileHistory::open(path, config.history_capacity)?)
}

fn open_presets(config: &EngineConfig) -> Result<PresetStore> {
    let path = match &config.presets_path {
        Some(path) => path.clone(),
        None => PresetStore::default_path()?,
    };
    Ok(PresetStore::open(path)?)
}

/// Parse the sort flags on top of `base`
fn resolve_sort(flags: &SortFlags, base: SortConfig) -> Result<SortConfig, AppError> {
    let mut sort = base;
    if let Some(key) = &flags.sort {
        sort.primary_key = key.parse()?;
    }
    if let Some(key) = &flags.then {
        sort.secondary_key = Some(key.parse()?);
    }
    if let Some(direction) = &flags.direction {
        sort.direction = direction.parse()?;
    }
    Ok(sort)
}

/// Resolve the filter flags; explicitly given ones replace the matching parts of `base`
fn resolve_filter(flags: &FilterFlags, base: FilterState) -> Result<ResolvedFilter> {
    let ResolvedFilter { state, messages } = flags.to_input().resolve();
    let mut merged = base;
    if !state.search_query.trim().is_empty() {
        merged.search_query = state.search_query;
    }
    if !state.categories.is_empty() {
        merged.categories = state.categories;
    }
    if !state.statuses.is_empty() {
        merged.statuses = state.statuses;
    }
    if state.active_tab != StatusTab::All {
        merged.active_tab = state.active_tab;
    }
    if let Some(raw) = &flags.date {
        let preset: DatePreset = raw.parse()?;
        merged.date_range = preset.resolve(Utc::now().date_naive());
    } else if state.date_range.start.is_some() || state.date_range.end.is_some() {
        merged.date_range = state.date_range;
    }
    if state.participants_range.min.is_some() || state.participants_range.max.is_some() {
        merged.participants_range = state.participants_range;
    }
    if !state.creators.is_empty() {
        merged.creators = state.creators;
    }

    // inverted ranges are only visible after merging with the preset
    let mut messages = messages;
    for message in merged.validate() {
        if !messages.contains(&message) {
            messages.push(message);
        }
    }
    for message in &messages {
        warn!("{}: {}", message.field, message.message);
    }
    Ok(ResolvedFilter {
        state: merged,
        messages,
    })
}

fn execute_filter(args: FilterArgs, config: &EngineConfig) -> Result<String> {
    let (base_state, base_sort) = match &args.preset {
        Some(name) => open_presets(config)?.apply(name)?,
        None => (FilterState::default(), SortConfig::default()),
    };
    let resolved = resolve_filter(&args.filter, base_state)?;
    let sort = resolve_sort(&args.sort, base_sort)?;

    let polls = read_polls(&args.source.records)?;
    let mut matched = search::filter_and_sort(&polls, &resolved.state, &sort);
    let total = matched.len();
    if let Some(limit) = args.limit {
        matched.truncate(limit);
    }
    info!("{} of {} polls match", total, polls.len());

    match args.source.format {
        OutputFormat::Markdown => Ok(output::format_polls(&matched, total, &sort, &resolved.messages)),
        OutputFormat::Json => output::polls_json(&matched, total, &resolved.messages),
    }
}

fn execute_suggest(args: SuggestArgs, config: &EngineConfig) -> Result<String> {
    let polls = read_polls(&args.source.records)?;
    let engine = SuggestionEngine::new().with_recent_window(config.recent_window);
    let limit = args.limit.unwrap_or(config.suggestion_limit);

    let suggestions = if args.no_history {
        let mut history = MemoryHistory::with_capacity(config.history_capacity);
        engine.suggest(&args.query, &polls, &mut history, limit)
    } else {
        let mut history = open_history(config)?;
        engine.suggest(&args.query, &polls, &mut history, limit)
    };

    match args.source.format {
        OutputFormat::Markdown => Ok(output::format_suggestions(&args.query, &suggestions)),
        OutputFormat::Json => output::suggestions_json(&suggestions),
    }
}

fn execute_history(command: HistoryCommands, config: &EngineConfig) -> Result<String> {
    let mut history = open_history(config)?;
    match command {
        HistoryCommands::List => Ok(output::format_history(&history.read())),
        HistoryCommands::Clear => {
            history.clear()?;
            info!("Cleared search history at {}", history.path().display());
            Ok(String::new())
        }
    }
}

fn execute_presets(command: PresetsCommands, config: &EngineConfig) -> Result<String> {
    let mut store = open_presets(config)?;
    match command {
        PresetsCommands::List => Ok(output::format_presets(store.list())),
        PresetsCommands::Save { name, filter, sort } => {
            let resolved = resolve_filter(&filter, FilterState::default())?;
            let sort = resolve_sort(&sort, SortConfig::default())?;
            let preset = FilterPreset::capture(&name, &resolved.state, &sort)?;
            store.save(preset)?;
            Ok(format!("Saved preset '{}'", name.trim()))
        }
        PresetsCommands::Delete { name } => {
            let removed = store.delete(&name)?;
            Ok(format!("Deleted preset '{}'", removed.name))
        }
        PresetsCommands::Show { name } => {
            let preset = store
                .get(&name)
                .ok_or_else(|| AppError::NotFound(format!("Preset '{}'", name.trim())))?;
            Ok(serde_json::to_string_pretty(preset)?)
        }
    }
}

/// Every stdin line gets suggestions right away; the filtered list follows
/// once no new line has arrived for the debounce delay.
async fn execute_interactive(args: InteractiveArgs, config: &EngineConfig) -> Result<String> {
    let polls = read_polls(&args.source.records)?;
    let sort = resolve_sort(&args.sort, SortConfig::default())?;
    let engine = SuggestionEngine::new().with_recent_window(config.recent_window);
    let limit = args.limit.unwrap_or(config.suggestion_limit);

    let mut options = config.debounce_options();
    if let Some(ms) = args.debounce_ms {
        options = options.with_delay(std::time::Duration::from_millis(ms));
    }

    let mut history: Box<dyn HistoryStore> = match open_history(config) {
        Ok(history) => Box::new(history),
        Err(e) => {
            warn!("Search history unavailable, using memory only: {:#}", e);
            Box::new(MemoryHistory::with_capacity(config.history_capacity))
        }
    };

    let (query_tx, query_rx) = mpsc::channel::<String>(64);
    let mut settled = spawn_debounced(query_rx, Debouncer::new(options));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    // dropping the sender closes the channel, which flushes the pending query
    let mut query_tx = Some(query_tx);
    info!("Reading queries from stdin (debounce {} ms)", options.delay.as_millis());

    loop {
        tokio::select! {
            line = lines.next_line(), if query_tx.is_some() => {
                let Some(query) = line.context("Failed to read stdin")? else {
                    query_tx = None;
                    continue;
                };
                let suggestions = engine.suggest(&query, &polls, history.as_mut(), limit);
                let rendered = match args.source.format {
                    OutputFormat::Markdown => output::format_suggestions(&query, &suggestions),
                    OutputFormat::Json => output::suggestions_json(&suggestions)?,
                };
                println!("{}", rendered.trim_end());
                if let Some(tx) = &query_tx {
                    if tx.send(query).await.is_err() {
                        warn!("Debounce task stopped");
                        query_tx = None;
                    }
                }
            }
            emission = settled.recv() => {
                let Some(emission) = emission else { break };
                debug!("Query settled ({}): '{}'", emission.reason.as_str(), emission.value);
                let filter = FilterState {
                    search_query: emission.value,
                    ..FilterState::default()
                };
                let matched = search::filter_and_sort_at(&polls, &filter, &sort, &SortContext::now());
                let rendered = match args.source.format {
                    OutputFormat::Markdown => output::format_polls(&matched, matched.len(), &sort, &[]),
                    OutputFormat::Json => output::polls_json(&matched, matched.len(), &[])?,
                };
                println!("{}", rendered.trim_end());
            }
        }
    }
    Ok(String::new())
}

/// Map error to exit code: 1 invalid input, 3 not found, 5 anything else
fn get_exit_code(err: &anyhow::Error) -> i32 {
    if let Some(app) = err.downcast_ref::<AppError>() {
        return match app {
            AppError::InvalidDate(_)
            | AppError::InvalidRange(_)
            | AppError::InvalidSortKey(_)
            | AppError::InvalidInput(_) => 1,
            AppError::NotFound(_) => 3,
            _ => 5,
        };
    }

    let err_str = err.to_string().to_lowercase();
    if err_str.contains("invalid") || err_str.contains("usage") {
        1
    } else if err_str.contains("not found") {
        3
    } else {
        5
    }
}
