use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;

use clap::ArgMatches;
use tracing::{error, info, warn};

use winlink_core::config::{Config, WinlinkConfig};
use winlink_core::events;
use winlink_core::store::file::validate_key;
use winlink_core::{
    FileStore, GeometrySource, KeyValueStore, MemoryStore, Metadata, SharedStore, Snapshot,
    StaticGeometry, SyncOptions, TerminationSignal, WindowRecord, WindowShape, WindowSync,
    connect,
};

use crate::geometry::FileGeometry;

/// Load configuration with warning on errors.
///
/// Falls back to defaults if config loading fails, but notifies the user via:
/// - stderr message for immediate visibility
/// - structured log event `cli.config.load_failed` for debugging
fn load_config_with_warning(runtime: &Config) -> WinlinkConfig {
    match WinlinkConfig::load_hierarchy(runtime) {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Could not load config: {}. Using defaults.\n\
                 Tip: Check {} and ./.winlink/config.toml for syntax errors.",
                e,
                runtime.user_config_path().display()
            );
            warn!(
                event = "cli.config.load_failed",
                error = %e,
                "Config load failed, using defaults"
            );
            WinlinkConfig::default()
        }
    }
}

/// `--store-dir` wins over the config file, which wins over `<winlink_dir>/store`.
fn resolve_store_dir(matches: &ArgMatches, runtime: &Config, config: &WinlinkConfig) -> PathBuf {
    matches
        .get_one::<PathBuf>("store-dir")
        .cloned()
        .unwrap_or_else(|| config.store.dir_or_default(runtime))
}

fn timestamp() -> String {
    chrono::Local::now().format("%H:%M:%S%.3f").to_string()
}

fn format_ids(windows: &[WindowRecord]) -> String {
    if windows.is_empty() {
        return "(none)".to_string();
    }
    windows
        .iter()
        .map(|w| w.id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Build window metadata from `--kind` and `--meta key=value` entries.
///
/// Values that parse as JSON are stored as JSON, anything else as a string.
fn build_metadata<'a>(
    kind: Option<&String>,
    entries: impl Iterator<Item = &'a String>,
) -> Result<Metadata, Box<dyn std::error::Error>> {
    let mut metadata = Metadata::new();
    if let Some(kind) = kind {
        metadata.insert("type".to_string(), serde_json::Value::String(kind.clone()));
    }

    for entry in entries {
        let (key, raw) = entry
            .split_once('=')
            .filter(|(key, _)| !key.is_empty())
            .ok_or_else(|| format!("Invalid --meta '{}': expected key=value", entry))?;
        let value = serde_json::from_str(raw)
            .unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));
        metadata.insert(key.to_string(), value);
    }

    Ok(metadata)
}

/// Session storage for the identity: per-name directory, or process memory.
fn open_session(
    runtime: &Config,
    session: Option<&String>,
) -> Result<Box<dyn KeyValueStore>, Box<dyn std::error::Error>> {
    let Some(name) = session else {
        return Ok(Box::new(MemoryStore::standalone()));
    };

    validate_key(name).map_err(|e| format!("Invalid session name '{}': {}", name, e))?;
    let store = FileStore::open(runtime.session_dir(name))?;
    Ok(Box::new(store))
}

pub fn run_command(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    events::log_app_startup(matches.subcommand_name().unwrap_or("none"));

    match matches.subcommand() {
        Some(("join", sub_matches)) => handle_join_command(sub_matches),
        Some(("list", sub_matches)) => handle_list_command(sub_matches),
        Some(("clear", sub_matches)) => handle_clear_command(sub_matches),
        _ => {
            error!(event = "cli.command_unknown");
            Err("Unknown command".into())
        }
    }
}

fn handle_join_command(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = Config::new();
    let config = load_config_with_warning(&runtime);
    let store_dir = resolve_store_dir(matches, &runtime, &config);
    let frames = matches.get_one::<u64>("frames").copied();

    let coordinate = |name: &str| matches.get_one::<i32>(name).copied().unwrap_or_default();
    let initial = WindowShape::new(
        coordinate("x"),
        coordinate("y"),
        coordinate("w"),
        coordinate("h"),
    );
    let geometry: Box<dyn GeometrySource> = match matches.get_one::<PathBuf>("geometry-file") {
        Some(path) => Box::new(FileGeometry::new(path.clone(), initial)),
        None => Box::new(StaticGeometry(initial)),
    };

    let metadata = build_metadata(
        matches.get_one::<String>("kind"),
        matches.get_many::<String>("meta").into_iter().flatten(),
    )?;
    let session = open_session(&runtime, matches.get_one::<String>("session"))?;

    let termination = match TerminationSignal::install() {
        Ok(signal) => signal,
        Err(e) => {
            warn!(event = "cli.join.signal_handler_failed", error = %e);
            TerminationSignal::new()
        }
    };

    info!(
        event = "cli.join_started",
        store_dir = %store_dir.display(),
        frames = ?frames
    );

    let options = SyncOptions {
        key: config.store.key().to_string(),
        termination: Some(termination),
    };
    let open_dir = store_dir.clone();
    let mut sync = connect(
        move || FileStore::open(open_dir).map(|store| Box::new(store) as Box<dyn SharedStore>),
        session,
        geometry,
        options,
        metadata,
    );

    let shape_changed: Rc<Cell<Option<bool>>> = Rc::new(Cell::new(None));
    let shape_sink = Rc::clone(&shape_changed);
    sync.set_shape_change_callback(Box::new(move |easing: bool| shape_sink.set(Some(easing))));

    let windows_changed = Rc::new(Cell::new(false));
    let windows_sink = Rc::clone(&windows_changed);
    sync.set_windows_change_callback(Box::new(move || windows_sink.set(true)));

    let local_id = sync.local_id();
    let id_display = local_id.map_or("-".to_string(), |id| id.to_string());
    println!(
        "[{}] Joined as window {} (store: {})",
        timestamp(),
        id_display,
        store_dir.display()
    );
    println!("[{}] windows: {}", timestamp(), format_ids(sync.windows()));

    let interval = config.poll.frame_interval();
    let mut frame: u64 = 0;
    while frames.is_none_or(|limit| frame < limit) {
        sync.update();
        if sync.is_terminated() {
            break;
        }
        frame += 1;

        if let Some(easing) = shape_changed.take() {
            let shape = sync
                .windows()
                .iter()
                .find(|w| Some(w.id) == local_id)
                .map(|w| w.shape);
            if let Some(shape) = shape {
                println!("[{}] moved to {} (easing={})", timestamp(), shape, easing);
            }
        }
        if windows_changed.replace(false) {
            println!("[{}] windows: {}", timestamp(), format_ids(sync.windows()));
        }

        std::thread::sleep(interval);
    }

    sync.shutdown();
    println!("[{}] Window {} left", timestamp(), id_display);

    info!(event = "cli.join_completed", window_id = ?local_id, frames = frame);
    events::log_app_shutdown("join");
    Ok(())
}

fn handle_list_command(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let json_output = matches.get_flag("json");
    let runtime = Config::new();
    let config = load_config_with_warning(&runtime);
    let store_dir = resolve_store_dir(matches, &runtime, &config);

    info!(event = "cli.list_started", json_output = json_output);

    let raw = FileStore::open(&store_dir).and_then(|store| store.get(config.store.key()));
    match raw {
        Ok(raw) => {
            let snapshot = Snapshot::parse(raw.as_deref());

            if json_output {
                println!("{}", serde_json::to_string_pretty(snapshot.records())?);
            } else if snapshot.is_empty() {
                println!("No windows registered.");
            } else {
                println!("Windows in {}:", store_dir.display());
                let formatter = crate::table::TableFormatter::new(snapshot.records());
                formatter.print_table(snapshot.records());
            }

            info!(event = "cli.list_completed", count = snapshot.len());
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ Failed to list windows: {}", e);

            error!(
                event = "cli.list_failed",
                error = %e
            );

            events::log_app_error(&e);
            Err(e.into())
        }
    }
}

fn handle_clear_command(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = Config::new();
    let config = load_config_with_warning(&runtime);
    let store_dir = resolve_store_dir(matches, &runtime, &config);

    info!(event = "cli.clear_started", store_dir = %store_dir.display());

    match FileStore::open(&store_dir).and_then(|store| store.clear()) {
        Ok(()) => {
            println!("✅ Cleared shared store at {}", store_dir.display());
            info!(event = "cli.clear_completed", store_dir = %store_dir.display());
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ Failed to clear shared store: {}", e);

            error!(
                event = "cli.clear_failed",
                error = %e
            );

            events::log_app_error(&e);
            Err(e.into())
        }
    }
}
