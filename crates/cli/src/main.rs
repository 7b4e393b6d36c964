// LashPop command palette CLI - headless ranking and usage history
// Reads and writes the same per-user settings documents as the DAM UI

mod exit_codes;

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::{DateTime, FixedOffset, Local, Utc};
use clap::{Args, Parser, Subcommand};
use serde_json::json;

use lashpop_palette_config::paths;
use lashpop_palette_config::{
    load_settings_or_default, DamSettings, JsonFileStore, SettingsStore, SqliteStore, StoreError,
};
use lashpop_palette_engine::catalog::dam_commands;
use lashpop_palette_engine::insights;
use lashpop_palette_engine::scoring::RankOptions;
use lashpop_palette_engine::usage::{reset_usage, Tracker};
use lashpop_palette_engine::{
    build_context, group_scored_commands, toggle_favorite, toggle_hidden, Command, FilterChip,
    PaletteConfig, Ranker, ScoredCommand, UiState,
};

use exit_codes::{EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};

const DAY_NAMES: [&str; 7] = ["Sunday", "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday"];

#[derive(Parser)]
#[command(name = "lp-palette")]
#[command(about = "Command palette ranking and usage history (headless)")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank the command catalog for a user and a UI situation
    #[command(after_help = "\
Examples:
  lp-palette rank --user alice
  lp-palette rank --user alice --selection 12 --limit 5
  lp-palette rank --user alice --query expo --json
  lp-palette rank --user alice --filter team:emily --filter lash_type:volume --grouped")]
    Rank(RankArgs),

    /// Record one invocation of a command
    Record {
        #[command(flatten)]
        store: StoreArgs,

        /// Command id
        command_id: String,

        /// Invocation time (RFC 3339); defaults to now
        #[arg(long)]
        at: Option<String>,
    },

    /// Pin a command to the top, or unpin it
    Pin {
        #[command(flatten)]
        store: StoreArgs,

        /// Command id
        command_id: String,
    },

    /// Hide a command from results, or unhide it
    Hide {
        #[command(flatten)]
        store: StoreArgs,

        /// Command id
        command_id: String,
    },

    /// Show usage statistics
    Stats {
        #[command(flatten)]
        store: StoreArgs,

        /// Entries per list
        #[arg(long, default_value_t = 10)]
        limit: usize,

        /// Also show peak times and session partners for this command
        #[arg(long, value_name = "ID")]
        command: Option<String>,

        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// Forget usage history (pins and hidden commands are kept)
    Reset {
        #[command(flatten)]
        store: StoreArgs,

        /// Delete the user's whole settings document
        #[arg(long)]
        all: bool,
    },

    /// List the built-in command catalog
    Catalog {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug, Clone)]
struct StoreArgs {
    /// User whose settings are read and written
    #[arg(long, env = "LP_PALETTE_USER")]
    user: String,

    /// Directory of per-user JSON settings files
    #[arg(long, value_name = "DIR", conflicts_with = "sqlite")]
    store_dir: Option<PathBuf>,

    /// SQLite database with a dam_user_settings table
    #[arg(long, value_name = "FILE")]
    sqlite: Option<PathBuf>,

    /// Ranking config (TOML); defaults to palette.toml in the config dir
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct RankArgs {
    #[command(flatten)]
    store: StoreArgs,

    /// Search text typed into the palette
    #[arg(long, short = 'q')]
    query: Option<String>,

    /// Number of selected assets
    #[arg(long)]
    selection: Option<i64>,

    /// Lightbox / detail view is open
    #[arg(long)]
    lightbox: bool,

    /// Active filter chip as category:option. Repeatable.
    #[arg(long, value_name = "CAT:OPT")]
    filter: Vec<String>,

    /// Assets in the library
    #[arg(long)]
    total_assets: Option<i64>,

    /// Command invoked just before opening the palette
    #[arg(long, value_name = "ID")]
    last: Option<String>,

    /// Ranking time (RFC 3339); defaults to now
    #[arg(long)]
    at: Option<String>,

    /// Show at most N commands
    #[arg(long)]
    limit: Option<usize>,

    /// Drop unpinned commands scoring below this
    #[arg(long)]
    min_score: Option<f64>,

    /// Group output by category
    #[arg(long)]
    grouped: bool,

    /// Output JSON
    #[arg(long)]
    json: bool,

    /// JSON file with a command array to rank instead of the built-in catalog
    #[arg(long, value_name = "FILE")]
    catalog: Option<PathBuf>,
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        "\nengine:  lashpop-palette-engine ", env!("CARGO_PKG_VERSION"),
        "\nstores:  json, sqlite",
    )
}

fn main() -> ExitCode {
    // RUST_LOG wins when set
    let mut logger = env_logger::Builder::from_default_env();
    if std::env::var_os("RUST_LOG").is_none() {
        logger.filter_level(log::LevelFilter::Warn);
    }
    logger.init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Rank(args) => cmd_rank(args),
        Commands::Record { store, command_id, at } => cmd_record(store, command_id, at),
        Commands::Pin { store, command_id } => cmd_pin(store, command_id),
        Commands::Hide { store, command_id } => cmd_hide(store, command_id),
        Commands::Stats { store, limit, command, json } => cmd_stats(store, limit, command, json),
        Commands::Reset { store, all } => cmd_reset(store, all),
        Commands::Catalog { json } => cmd_catalog(json),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn runtime(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<StoreError> for CliError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidUserId(_) => CliError::usage(err.to_string()),
            StoreError::Serialize(_) => CliError::runtime(err.to_string())
                .with_hint("the stored settings document is not valid JSON; `reset --all` discards it"),
            _ => CliError::runtime(err.to_string()),
        }
    }
}

fn write_err(e: io::Error) -> CliError {
    CliError::runtime(format!("cannot write output: {}", e))
}

// ============================================================================
// Shared helpers
// ============================================================================

fn open_store(args: &StoreArgs) -> Result<Box<dyn SettingsStore>, CliError> {
    if args.user.trim().is_empty() {
        return Err(CliError::usage("--user must not be blank"));
    }
    let store: Box<dyn SettingsStore> = match (&args.sqlite, &args.store_dir) {
        (Some(path), _) => Box::new(SqliteStore::open(path)?),
        (None, Some(dir)) => Box::new(JsonFileStore::new(dir)),
        (None, None) => Box::new(JsonFileStore::open_default()),
    };
    Ok(store)
}

fn load_config(args: &StoreArgs) -> Result<PaletteConfig, CliError> {
    match &args.config {
        Some(path) => paths::read_palette_config(path).map_err(|e| CliError::usage(e.to_string())),
        None => Ok(paths::load_palette_config()),
    }
}

fn load_catalog(path: Option<&Path>) -> Result<Vec<Command>, CliError> {
    let Some(path) = path else {
        return Ok(dam_commands());
    };
    let contents = fs::read_to_string(path)
        .map_err(|e| CliError::usage(format!("cannot read catalog {}: {}", path.display(), e)))?;
    serde_json::from_str(&contents)
        .map_err(|e| CliError::usage(format!("invalid catalog {}: {}", path.display(), e)))
}

fn parse_at(at: Option<&str>) -> Result<DateTime<FixedOffset>, CliError> {
    match at {
        None => Ok(Local::now().fixed_offset()),
        Some(s) => DateTime::parse_from_rfc3339(s.trim()).map_err(|e| {
            CliError::usage(format!("invalid timestamp {:?}: {}", s, e))
                .with_hint("use RFC 3339, e.g. 2026-03-04T14:30:00-08:00")
        }),
    }
}

fn parse_filter(raw: &str) -> Result<FilterChip, CliError> {
    match raw.split_once(':') {
        Some((category, option)) if !category.trim().is_empty() && !option.trim().is_empty() => {
            Ok(FilterChip::new(category.trim(), option.trim()))
        }
        _ => Err(CliError::usage(format!("invalid --filter {:?}, expected category:option", raw))),
    }
}

fn require_command_id(id: &str) -> Result<&str, CliError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(CliError::usage("command id must not be blank"));
    }
    Ok(id)
}

/// Load, transform and save a user's settings. Store failures are reported;
/// a corrupt document is never silently overwritten.
fn update_settings(
    store: &dyn SettingsStore,
    user: &str,
    f: impl FnOnce(DamSettings) -> DamSettings,
) -> Result<DamSettings, CliError> {
    let current = store.load_strict(user)?.unwrap_or_default();
    let next = f(current);
    store.save(user, &next)?;
    Ok(next)
}

// ============================================================================
// rank
// ============================================================================

fn cmd_rank(args: RankArgs) -> Result<(), CliError> {
    let store = open_store(&args.store)?;
    let config = load_config(&args.store)?;
    let catalog = load_catalog(args.catalog.as_deref())?;
    let now = parse_at(args.at.as_deref())?;
    let active_filters = args
        .filter
        .iter()
        .map(|f| parse_filter(f))
        .collect::<Result<Vec<_>, _>>()?;

    let record = load_settings_or_default(store.as_ref(), &args.store.user).usage();

    let ui = UiState {
        selection_count: args.selection,
        active_filters,
        lightbox_open: Some(args.lightbox),
        total_assets: args.total_assets,
        last_command_id: args.last,
        search_query: args.query,
        now: Some(now),
        ..UiState::default()
    };
    let ctx = build_context(&ui).fill_last_command(&record, config.session.window());
    let options = RankOptions {
        limit: args.limit,
        min_score: args.min_score,
    };
    let ranked = Ranker::new(config).rank_with_options(&catalog, &record, &ctx, None, &options);

    let mut out = io::stdout().lock();
    if args.json {
        let body = if args.grouped {
            serde_json::to_string_pretty(&group_scored_commands(&ranked))
        } else {
            serde_json::to_string_pretty(&ranked)
        }
        .map_err(|e| CliError::runtime(e.to_string()))?;
        writeln!(out, "{}", body).map_err(write_err)?;
        return Ok(());
    }

    if ranked.is_empty() {
        eprintln!("no commands available");
        return Ok(());
    }

    if args.grouped {
        for group in group_scored_commands(&ranked) {
            writeln!(out, "{}", group.category).map_err(write_err)?;
            for item in &group.commands {
                write_ranked_line(&mut out, item, "  ")?;
            }
        }
    } else {
        for item in &ranked {
            write_ranked_line(&mut out, item, "")?;
        }
    }
    Ok(())
}

fn write_ranked_line(out: &mut impl Write, item: &ScoredCommand<'_>, indent: &str) -> Result<(), CliError> {
    let marker = if item.pinned { '*' } else { ' ' };
    let signals = item.signal_names().join(",");
    writeln!(
        out,
        "{indent}{marker} {:>7.1}  {:<22} {}{}",
        item.score,
        item.id(),
        item.command.label,
        if signals.is_empty() { String::new() } else { format!("  [{}]", signals) },
    )
    .map_err(write_err)
}

// ============================================================================
// record / pin / hide
// ============================================================================

fn cmd_record(args: StoreArgs, command_id: String, at: Option<String>) -> Result<(), CliError> {
    let id = require_command_id(&command_id)?;
    let at = parse_at(at.as_deref())?;
    let config = load_config(&args)?;
    let store = open_store(&args)?;
    let tracker = Tracker::new(&config.session);

    let saved = update_settings(store.as_ref(), &args.user, |settings| {
        let usage = tracker.record_usage(&settings.usage(), id, at);
        settings.with_usage(usage, Utc::now())
    })?;

    println!("recorded {} (count {})", id, saved.usage().count(id));
    Ok(())
}

fn cmd_pin(args: StoreArgs, command_id: String) -> Result<(), CliError> {
    let id = require_command_id(&command_id)?;
    let store = open_store(&args)?;
    let saved = update_settings(store.as_ref(), &args.user, |settings| {
        let usage = toggle_favorite(&settings.usage(), id);
        settings.with_usage(usage, Utc::now())
    })?;

    if saved.usage().is_pinned(id) {
        println!("pinned {}", id);
    } else {
        println!("unpinned {}", id);
    }
    Ok(())
}

fn cmd_hide(args: StoreArgs, command_id: String) -> Result<(), CliError> {
    let id = require_command_id(&command_id)?;
    let store = open_store(&args)?;
    let saved = update_settings(store.as_ref(), &args.user, |settings| {
        let usage = toggle_hidden(&settings.usage(), id);
        settings.with_usage(usage, Utc::now())
    })?;

    if saved.usage().is_hidden(id) {
        println!("hidden {}", id);
    } else {
        println!("unhidden {}", id);
    }
    Ok(())
}

// ============================================================================
// stats
// ============================================================================

fn cmd_stats(args: StoreArgs, limit: usize, command: Option<String>, json: bool) -> Result<(), CliError> {
    let store = open_store(&args)?;
    let record = store.load(&args.user)?.unwrap_or_default().usage();

    let summary = insights::summarize(&record);
    let frequent = insights::most_frequent(&record, limit);
    let recent = insights::most_recent(&record, limit);
    let focus = command.as_deref().map(str::trim).filter(|c| !c.is_empty());

    let mut out = io::stdout().lock();
    if json {
        let mut body = json!({
            "user": args.user,
            "summary": summary,
            "mostFrequent": frequent,
            "mostRecent": recent,
        });
        if let Some(id) = focus {
            body["command"] = json!({
                "commandId": id,
                "count": record.count(id),
                "peakHour": insights::peak_hour(&record, id),
                "peakDay": insights::peak_day(&record, id),
                "usedWith": insights::used_with(&record, id, limit),
            });
        }
        let text = serde_json::to_string_pretty(&body).map_err(|e| CliError::runtime(e.to_string()))?;
        writeln!(out, "{}", text).map_err(write_err)?;
        return Ok(());
    }

    writeln!(out, "user:        {}", args.user).map_err(write_err)?;
    writeln!(out, "commands:    {}", summary.total_commands).map_err(write_err)?;
    writeln!(out, "executions:  {}", summary.total_executions).map_err(write_err)?;
    writeln!(out, "pinned:      {}", summary.pinned.join(", ")).map_err(write_err)?;
    writeln!(out, "hidden:      {}", summary.hidden.join(", ")).map_err(write_err)?;

    if !frequent.is_empty() {
        writeln!(out, "\nmost frequent:").map_err(write_err)?;
        for c in &frequent {
            writeln!(out, "  {:>6}  {}", c.count, c.command_id).map_err(write_err)?;
        }
    }
    if !recent.is_empty() {
        writeln!(out, "\nmost recent:").map_err(write_err)?;
        for c in &recent {
            writeln!(out, "  {}  {}", c.last_used_at.to_rfc3339(), c.command_id).map_err(write_err)?;
        }
    }

    if let Some(id) = focus {
        writeln!(out, "\n{}: {} runs", id, record.count(id)).map_err(write_err)?;
        if let Some(hour) = insights::peak_hour(&record, id) {
            writeln!(out, "  peak hour:  {:02}:00", hour).map_err(write_err)?;
        }
        if let Some(day) = insights::peak_day(&record, id) {
            writeln!(out, "  peak day:   {}", DAY_NAMES[day]).map_err(write_err)?;
        }
        for c in insights::used_with(&record, id, limit) {
            writeln!(out, "  with {:<22} {}", c.command_id, c.count).map_err(write_err)?;
        }
    }
    Ok(())
}

// ============================================================================
// reset
// ============================================================================

fn cmd_reset(args: StoreArgs, all: bool) -> Result<(), CliError> {
    let store = open_store(&args)?;
    if all {
        store.delete(&args.user)?;
        println!("deleted settings for {}", args.user);
        return Ok(());
    }

    update_settings(store.as_ref(), &args.user, |settings| {
        let usage = reset_usage(&settings.usage());
        settings.with_usage(usage, Utc::now())
    })?;
    println!("cleared usage history for {}", args.user);
    Ok(())
}

// ============================================================================
// catalog
// ============================================================================

fn cmd_catalog(json: bool) -> Result<(), CliError> {
    let commands = dam_commands();
    let mut out = io::stdout().lock();

    if json {
        let text = serde_json::to_string_pretty(&commands).map_err(|e| CliError::runtime(e.to_string()))?;
        writeln!(out, "{}", text).map_err(write_err)?;
        return Ok(());
    }

    for cmd in &commands {
        writeln!(out, "{:<22} {:<20} {}", cmd.id, cmd.category, cmd.label).map_err(write_err)?;
    }
    Ok(())
}
