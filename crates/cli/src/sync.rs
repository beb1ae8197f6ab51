//! `feedsync diff|run|plan|validate`: feed reconciliation commands.

use std::path::{Path, PathBuf};

use feedsync_config::Settings;
use feedsync_io::{read_feed, write_view, DirStore, FeedStore, IoError, RunLogEntry};
use feedsync_recon::metafields::{plan_metafields, MetafieldBatch};
use feedsync_recon::model::ReconSummary;
use feedsync_recon::plan::{plan_products, ProductPlan};
use feedsync_recon::{build_views, run, ReconResult, Row, SyncConfig, UploadViews};
use serde::Serialize;

use crate::exit_codes::{EXIT_CHANGES, EXIT_ERROR};
use crate::CliError;

pub struct DiffArgs {
    pub incoming: PathBuf,
    pub master: PathBuf,
    pub out_dir: PathBuf,
    pub config: Option<PathBuf>,
    pub json: bool,
    pub output: Option<PathBuf>,
    pub exit_code: bool,
}

fn sync_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError { code, message: msg.into(), hint: None }
}

// ---------------------------------------------------------------------------
// Shared
// ---------------------------------------------------------------------------

/// Explicit path, else `sync.config` from settings, else built-in views.
fn load_config(explicit: Option<&Path>, settings: &Settings) -> Result<SyncConfig, CliError> {
    let path = explicit
        .map(Path::to_path_buf)
        .or_else(|| settings.sync_config.as_ref().map(PathBuf::from));
    let Some(path) = path else {
        return Ok(SyncConfig::default());
    };

    let text = std::fs::read_to_string(&path)
        .map_err(|e| CliError::io(format!("cannot read config {}: {e}", path.display())))?;
    SyncConfig::from_toml(&text).map_err(|e| CliError::config(format!("{}: {e}", path.display())))
}

#[derive(Debug, Serialize)]
struct ViewOutput {
    view: String,
    file: String,
    rows: usize,
    written: bool,
}

#[derive(Serialize)]
struct SyncOutput<'a> {
    #[serde(flatten)]
    result: &'a ReconResult,
    outputs: &'a [ViewOutput],
}

/// Write every non-empty view into `dir` under its configured file name.
fn write_views(views: &UploadViews, dir: &Path) -> Result<Vec<ViewOutput>, CliError> {
    std::fs::create_dir_all(dir)
        .map_err(|e| CliError::io(format!("cannot create {}: {e}", dir.display())))?;

    views
        .iter()
        .map(|view| -> Result<ViewOutput, CliError> {
            let path = dir.join(&view.file);
            let written = write_view(&path, view)?;
            Ok(ViewOutput {
                view: view.name.clone(),
                file: path.display().to_string(),
                rows: view.len(),
                written,
            })
        })
        .collect()
}

fn print_summary(result: &ReconResult, outputs: &[ViewOutput]) {
    let s = &result.summary;
    eprintln!(
        "reconciled {} incoming / {} master rows: {} changes ({} add, {} remove, {} update) across {} products",
        result.meta.incoming_rows,
        result.meta.master_rows,
        s.total,
        s.adds,
        s.removes,
        s.updates,
        s.parents_touched,
    );
    for out in outputs {
        if out.written {
            eprintln!("  {}: {} rows -> {}", out.view, out.rows, out.file);
        } else {
            eprintln!("  {}: no rows, skipped", out.view);
        }
    }
}

fn emit_json(value: &impl Serialize, stdout: bool, file: Option<&Path>) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| sync_err(EXIT_ERROR, format!("JSON serialization error: {e}")))?;

    if let Some(path) = file {
        std::fs::write(path, &json)
            .map_err(|e| CliError::io(format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if stdout {
        println!("{json}");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// diff
// ---------------------------------------------------------------------------

pub fn cmd_diff(settings: &Settings, args: DiffArgs) -> Result<(), CliError> {
    let config = load_config(args.config.as_deref(), settings)?;

    let incoming = read_feed(&args.incoming)?;
    let master = read_feed(&args.master)?;

    let result = run(&incoming, &master, &config.schema);
    let views = build_views(&result.records, &config);
    let outputs = write_views(&views, &args.out_dir)?;

    print_summary(&result, &outputs);

    if args.json || args.output.is_some() {
        let out = SyncOutput {
            result: &result,
            outputs: &outputs,
        };
        emit_json(&out, args.json, args.output.as_deref())?;
    }

    if args.exit_code && result.summary.total > 0 {
        return Err(sync_err(EXIT_CHANGES, ""));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

pub fn cmd_run(settings: &Settings, config: Option<PathBuf>, json: bool) -> Result<(), CliError> {
    let config = load_config(config.as_deref(), settings)?;
    let store = DirStore::new(settings.inbox_dir(), settings.outbox_dir(), settings.logs_dir());
    let staging = settings.staging_dir();

    let (incoming, master) = match fetch_feeds(settings, &store, &staging) {
        Ok(feeds) => feeds,
        Err(err) => {
            let entry = RunLogEntry::new(0, 0, &ReconSummary::default(), 0, 0, failed(&err));
            return Err(log_failure(&store, settings, &entry, err));
        }
    };

    let result = run(&incoming, &master, &config.schema);
    let views = build_views(&result.records, &config);
    let entry = |status: String| {
        RunLogEntry::new(
            result.meta.incoming_rows,
            result.meta.master_rows,
            &result.summary,
            views.product.len(),
            views.metafield.len(),
            status,
        )
    };

    // failures from here on keep the reconciliation counts
    let outputs = match publish_views(&views, &staging, &store) {
        Ok(outputs) => outputs,
        Err(err) => return Err(log_failure(&store, settings, &entry(failed(&err)), err)),
    };

    let status = if result.summary.total == 0 { "no changes" } else { "ok" };
    store.append_log(&settings.run_log_file, &entry(status.to_string()))?;

    print_summary(&result, &outputs);
    if json {
        let out = SyncOutput {
            result: &result,
            outputs: &outputs,
        };
        emit_json(&out, true, None)?;
    }
    Ok(())
}

fn failed(err: &CliError) -> String {
    format!("error: {}", err.message)
}

/// Record a failed run, then hand the error back.
fn log_failure(store: &DirStore, settings: &Settings, entry: &RunLogEntry, err: CliError) -> CliError {
    if let Err(e) = store.append_log(&settings.run_log_file, entry) {
        log::warn!("cannot append run log: {e}");
    }
    err
}

/// Copy both feeds from the inbox into `staging` and parse them.
fn fetch_feeds(
    settings: &Settings,
    store: &DirStore,
    staging: &Path,
) -> Result<(Vec<Row>, Vec<Row>), CliError> {
    std::fs::create_dir_all(staging)
        .map_err(|e| CliError::io(format!("cannot create {}: {e}", staging.display())))?;

    let fetch = |name: &str| -> Result<PathBuf, CliError> {
        let dest = staging.join(name);
        store.fetch(name, &dest).map_err(|e| {
            let missing = e.is_not_found();
            let err = CliError::from(e);
            if missing {
                err.with_hint(format!("expected {name} in {}", store.inbox.display()))
            } else {
                err
            }
        })?;
        Ok(dest)
    };

    let incoming = read_feed(&fetch(settings.incoming_file.as_str())?)?;
    let master = read_feed(&fetch(settings.master_file.as_str())?)?;
    Ok((incoming, master))
}

/// Write the views into `staging` and publish the non-empty ones.
fn publish_views(
    views: &UploadViews,
    staging: &Path,
    store: &DirStore,
) -> Result<Vec<ViewOutput>, CliError> {
    let mut outputs = write_views(views, staging)?;

    for (view, out) in views.iter().zip(outputs.iter_mut()) {
        if !out.written {
            continue;
        }
        store.publish(&staging.join(&view.file), &view.file)?;
        out.file = store.outbox.join(&view.file).display().to_string();
    }

    Ok(outputs)
}

// ---------------------------------------------------------------------------
// plan
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct PlanOutput {
    products: Vec<ProductPlan>,
    metafields: Vec<MetafieldBatch>,
}

pub fn cmd_plan(
    settings: &Settings,
    products: PathBuf,
    metafields: Option<PathBuf>,
    config: Option<PathBuf>,
) -> Result<(), CliError> {
    let config = load_config(config.as_deref(), settings)?;

    let product_rows = read_feed(&products)?;
    let products = plan_products(&product_rows, &config.schema, &config.products);

    let metafields = match metafields {
        Some(path) => {
            let rows = read_feed(&path)?;
            plan_metafields(&rows, &config.schema, &config.metafields)
        }
        None => Vec::new(),
    };

    eprintln!(
        "{} product plan(s), {} metafield batch(es)",
        products.len(),
        metafields.len()
    );
    emit_json(&PlanOutput { products, metafields }, true, None)
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let text = std::fs::read_to_string(&config_path).map_err(|e| {
        CliError::from(IoError::Io {
            path: config_path.clone(),
            source: e,
        })
    })?;
    let config = SyncConfig::from_toml(&text)
        .map_err(|e| CliError::config(format!("{}: {e}", config_path.display())))?;

    eprintln!("{}: ok", config_path.display());
    for (name, view) in [("product", &config.views.product), ("metafield", &config.views.metafield)] {
        eprintln!(
            "  {name}: {} columns ({} key) -> {}",
            view.columns.len(),
            view.key_columns.len(),
            view.file
        );
    }
    Ok(())
}
