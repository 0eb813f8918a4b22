//! searchmate - line-oriented driver for the search core.
//!
//! Each input line is treated as the current contents of a search box and
//! fed to the debouncer. Lines starting with `:` are commands.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use searchmate::cache::default_cache_dir;
use searchmate::settings::default_settings_path;
use searchmate::walk::default_ignored_dirs;
use searchmate::{
    load_or_create_settings, PathWalker, SearchConfig, SearchEvent, SearchOrchestrator,
    SearchRoots, SearchService, SettingsDraft,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;

#[derive(Parser, Debug)]
#[command(name = "searchmate")]
#[command(about = "Search-as-you-type file search across mounted volumes")]
struct Args {
    /// Search only these roots instead of every mounted volume
    #[arg(long = "root")]
    roots: Vec<PathBuf>,

    /// Directory for cached result records
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Settings file
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Walker threads (0 = available parallelism)
    #[arg(long, default_value = "0")]
    threads: usize,

    /// Accept two-character queries
    #[arg(long)]
    loose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let settings_path = args
        .settings
        .or_else(default_settings_path)
        .ok_or_else(|| anyhow!("no settings location; pass --settings"))?;
    let cache_dir = args
        .cache_dir
        .or_else(default_cache_dir)
        .ok_or_else(|| anyhow!("no cache location; pass --cache-dir"))?;
    let config = load_or_create_settings(&settings_path)
        .with_context(|| format!("loading settings from {}", settings_path.display()))?;

    let roots = if args.roots.is_empty() {
        SearchRoots::system()
    } else {
        SearchRoots::fixed(args.roots)
    };
    let walker = PathWalker::new(args.threads)?.with_ignored(default_ignored_dirs());
    let min_query_len = if args.loose { 2 } else { searchmate::types::MIN_QUERY_LEN };
    let orchestrator = Arc::new(SearchOrchestrator::open(
        walker,
        roots,
        &cache_dir,
        &config,
        min_query_len,
    ));

    log::info!(
        "searchmate ready cache_dir={} settings={}",
        cache_dir.display(),
        settings_path.display()
    );

    let service = SearchService::new(orchestrator, config).with_settings_path(settings_path);
    let events = service
        .subscribe()
        .ok_or_else(|| anyhow!("search events already taken"))?;
    let printer = tokio::spawn(print_events(events));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last_query = String::new();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };

        match line.strip_prefix(':') {
            Some(command) => match run_command(&service, command.trim(), &last_query) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Quit) => break,
                Err(error) => eprintln!("error: {error:#}"),
            },
            None => {
                service.notify_query_changed(&line);
                last_query = line;
            }
        }
    }

    printer.abort();
    Ok(())
}

enum Flow {
    Continue,
    Quit,
}

fn run_command(service: &SearchService, command: &str, last_query: &str) -> Result<Flow> {
    let (name, rest) = command
        .split_once(char::is_whitespace)
        .map(|(name, rest)| (name, rest.trim()))
        .unwrap_or((command, ""));

    match name {
        "quit" | "q" => return Ok(Flow::Quit),
        "clear" => {
            let removed = service.clear_cache()?;
            println!("cleared {removed} cached queries");
        }
        "stale" => {
            if rest.is_empty() {
                bail!("usage: :stale <path>");
            }
            if service.remove_stale_path(last_query, rest)? {
                println!("removed {rest} from cached results for {last_query:?}");
            } else {
                println!("{rest} is not cached for {last_query:?}");
            }
        }
        "settings" => {
            if !rest.is_empty() {
                let config = edit_settings(&service.config(), rest)?;
                service.apply_settings(config)?;
            }
            print_settings(&service.config());
        }
        other => bail!("unknown command :{other} (try :clear, :settings, :stale, :quit)"),
    }
    Ok(Flow::Continue)
}

/// Applies `key=value` pairs to a draft of the current settings.
fn edit_settings(current: &SearchConfig, assignments: &str) -> Result<SearchConfig> {
    let mut draft = SettingsDraft::from_config(current);
    for assignment in assignments.split_whitespace() {
        let (key, value) = assignment
            .split_once('=')
            .ok_or_else(|| anyhow!("expected key=value, got {assignment:?}"))?;
        match key {
            "max_results" => {
                draft.max_results = value
                    .parse()
                    .with_context(|| format!("max_results {value:?}"))?
            }
            "entries" => draft.max_cache_entries = value.to_string(),
            "days" => draft.expiration_days = value.to_string(),
            "cache" => draft.cache_enabled = parse_switch(value)?,
            "auto_clean" => draft.auto_clean_enabled = parse_switch(value)?,
            other => bail!("unknown setting {other:?}"),
        }
    }
    Ok(draft.validate(current)?)
}

fn parse_switch(value: &str) -> Result<bool> {
    match value {
        "on" | "true" | "yes" => Ok(true),
        "off" | "false" | "no" => Ok(false),
        other => bail!("expected on/off, got {other:?}"),
    }
}

fn print_settings(config: &SearchConfig) {
    println!(
        "max_results={} cache={} auto_clean={} days={} entries={}",
        config.max_results,
        on_off(config.cache_enabled),
        on_off(config.auto_clean_enabled),
        config.expiration_days,
        config.max_cache_entries
    );
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}

async fn print_events(mut events: UnboundedReceiver<SearchEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            SearchEvent::Cleared { .. } => println!("(cleared)"),
            SearchEvent::Results { query, results, .. } => {
                for path in results.sorted() {
                    println!("{path}");
                }
                println!("-- {} results for {:?}", results.len(), query.trim());
            }
        }
    }
}
