//! Entry point for the **dashgrid** command-line tool.
//!
//! Loads the dashboard, then reads newline-delimited JSON layout operations
//! from stdin on a background thread and applies them on the main thread.
//! After every accepted operation the committed layout is printed to stdout
//! as one line of JSON.
//!
//! ```text
//! dashgrid [--config PATH] [--local | --detached] [DASHBOARD_PATH]
//! ```
//!
//! * `--local`: the dashboard file is only loaded and saved; operations are
//!   computed in process and saves are debounced.
//! * `--detached`: nothing is read or written; start from the default
//!   dashboard.

use dashgrid::backend::file::FileAuthority;
use dashgrid::backend::DetachedAuthority;
use dashgrid::config::Config;
use dashgrid::ipc::reader::LineReader;
use dashgrid::layout::LayoutState;
use dashgrid::operation::LayoutOperation;
use dashgrid::scheduler::ManualScheduler;
use dashgrid::store::LayoutStore;
use dashgrid::traits::{LayoutAuthority, OperationSource};
use log::{error, info, warn};
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::mpsc;
use std::time::Instant;

/// Resolve `$XDG_<kind>_HOME/dashgrid`, falling back to `~/<fallback>`.
fn xdg_dir(var: &str, fallback: &str) -> PathBuf {
    let base = std::env::var(var).unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        format!("{}/{}", home, fallback)
    });
    PathBuf::from(base).join("dashgrid")
}

fn default_config_path() -> PathBuf {
    xdg_dir("XDG_CONFIG_HOME", ".config").join("config.json")
}

fn default_dashboard_path() -> PathBuf {
    xdg_dir("XDG_DATA_HOME", ".local/share").join("dashboard.json")
}

/// Load the config, falling back to compiled-in defaults.
fn load_config(path: Option<PathBuf>) -> Config {
    let path = path.unwrap_or_else(default_config_path);
    match Config::load(&path) {
        Ok(cfg) => {
            info!("loaded config from {}", path.display());
            cfg
        }
        Err(e) => {
            info!("no config file ({}), using defaults", e);
            Config::default()
        }
    }
}

//  Arguments

#[derive(Debug, Default)]
struct Options {
    config: Option<PathBuf>,
    local: bool,
    detached: bool,
    dashboard: Option<PathBuf>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Options, String> {
    let mut opts = Options::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => match args.next() {
                Some(path) => opts.config = Some(PathBuf::from(path)),
                None => return Err("--config needs a path".into()),
            },
            "--local" => opts.local = true,
            "--detached" => opts.detached = true,
            flag if flag.starts_with("--") => return Err(format!("unknown option {}", flag)),
            path => {
                if opts.dashboard.is_some() {
                    return Err(format!("unexpected argument {}", path));
                }
                opts.dashboard = Some(PathBuf::from(path));
            }
        }
    }
    if opts.local && opts.detached {
        return Err("--local and --detached are mutually exclusive".into());
    }
    Ok(opts)
}

//  Main

fn main() {
    env_logger::init();

    let opts = match parse_args(std::env::args().skip(1)) {
        Ok(opts) => opts,
        Err(e) => {
            error!("{}", e);
            eprintln!("usage: dashgrid [--config PATH] [--local | --detached] [DASHBOARD_PATH]");
            std::process::exit(2);
        }
    };
    let config = load_config(opts.config.clone());

    if opts.detached {
        info!("running detached, nothing will be saved");
        run(Rc::new(DetachedAuthority), &config);
        return;
    }

    let path = opts.dashboard.unwrap_or_else(default_dashboard_path);
    info!("dashboard file {}", path.display());
    let authority = if opts.local {
        FileAuthority::passive(path)
    } else {
        FileAuthority::authoritative(path)
    };
    run(
        Rc::new(
            authority
                .with_registry(config.registry())
                .with_grid(config.grid),
        ),
        &config,
    );
}

/// Load the dashboard and apply operations from stdin until it closes.
fn run<A: LayoutAuthority + 'static>(authority: Rc<A>, config: &Config) {
    let clock = Rc::new(ManualScheduler::new());
    let mut store = LayoutStore::from_config(authority, Rc::clone(&clock), config);
    print_state(store.load());

    let (op_tx, op_rx) = mpsc::channel::<LayoutOperation>();
    spawn_operation_source(op_tx);

    // The virtual clock follows wall time so debounced saves fire as
    // operations keep arriving.
    let started = Instant::now();
    for op in op_rx {
        let elapsed = started.elapsed();
        clock.advance(elapsed.saturating_sub(clock.now()));

        let kind = op.kind();
        match store.execute(op) {
            Ok(()) => print_state(store.state()),
            Err(e) => warn!("{} rejected: {}", kind, e),
        }
    }

    if store.has_pending_save() {
        info!("input closed, flushing pending save");
        store.flush();
    } else {
        info!("input closed");
    }
}

fn print_state(state: &LayoutState) {
    match serde_json::to_string(state) {
        Ok(json) => println!("{}", json),
        Err(e) => error!("failed to serialize layout: {}", e),
    }
}

//  Helpers

fn spawn_operation_source(tx: mpsc::Sender<LayoutOperation>) {
    std::thread::spawn(move || {
        let mut source = LineReader::new(std::io::stdin());
        if let Err(e) = source.run(tx) {
            error!("stdin reader error: {}", e);
        }
    });
}
