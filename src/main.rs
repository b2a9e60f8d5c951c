//! course-reviews - course detail and review aggregation
//!
//! Loads a course from a catalog dataset, gathers its reviews and the
//! viewing student's relationship to it, applies any requested actions
//! and renders the resulting course detail view.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error, missing student, or a requested action failed

mod analysis;
mod cli;
mod config;
mod engine;
mod error;
mod models;
mod report;
mod store;

use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::{Config, GeneralConfig, CONFIG_FILE_NAME};
use engine::{CourseDetailEngine, CourseDetailSession, EngineConfig, Notification, Notifications};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use store::{
    AvatarCatalog, Collaborators, Dataset, HttpReachability, MemoryStore, NetworkReachability,
    StaticReachability, StudentDirectory,
};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    let (mut config, origin) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    init_logging(&config.general, args.quiet);

    info!("course-reviews v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    match origin {
        ConfigOrigin::File(path) => info!("Loaded config from {}", path.display()),
        ConfigOrigin::Defaults => debug!("No config file found, using defaults"),
        ConfigOrigin::Unreadable(e) => warn!("Failed to load config: {:#}", e),
    }

    match run(args, config).await {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .coursereviews.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// Logs go to stderr; stdout carries the report.
fn init_logging(general: &GeneralConfig, quiet: bool) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(general.log_level(quiet))
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Load the course, run the requested actions and write the report.
async fn run(args: Args, config: Config) -> Result<i32> {
    let data_path = args
        .data
        .clone()
        .context("No dataset given (use --data or COURSE_REVIEWS_DATA)")?;
    let dataset = Dataset::load(&data_path)?;
    info!(
        "Loaded {} courses and {} reviews from {}",
        dataset.courses.len(),
        dataset.reviews.len(),
        data_path.display()
    );

    let store = Arc::new(MemoryStore::new(dataset).with_current_user(args.student.clone()));
    let avatars = Arc::new(AvatarCatalog::from(&config.avatars));
    let network = build_reachability(&args, &config)?;

    let (engine, mut notifications) = CourseDetailEngine::new(
        Collaborators::from_memory(store.clone(), avatars, network),
        EngineConfig::from(&config.engine),
    );
    let engine = Arc::new(engine);
    let course_id = args.course_id().to_string();

    let Some(student_id) = store.current_user_id() else {
        // Surfaces "User not logged in" through the notification channel.
        if let Err(e) = engine.load_for_current_user(&course_id).await {
            debug!("Load refused: {}", e);
        }
        print_toasts(&mut notifications);
        return Ok(1);
    };

    let session = CourseDetailSession::new(engine.clone(), &course_id, &student_id);

    session.reload();
    wait_with_spinner(&session, &args, format!("Loading course {}", course_id)).await;

    let mut toasts = print_toasts(&mut notifications);
    let mut failed = false;

    if let Some(rating) = args.submit_rating() {
        let comment = args.comment.as_deref().unwrap_or("");
        if let Err(e) = engine
            .submit_review(&course_id, &student_id, rating, comment)
            .await
        {
            debug!("Submit failed: {}", e);
            failed = true;
        }
        toasts.extend(print_toasts(&mut notifications));
    }

    if args.toggle_save {
        if let Err(e) = engine.toggle_saved_state(&course_id, &student_id).await {
            debug!("Toggle failed: {}", e);
            failed = true;
        }
        toasts.extend(print_toasts(&mut notifications));
    }

    if args.delete_review {
        if let Err(e) = engine.delete_my_review(&student_id).await {
            debug!("Delete failed: {}", e);
            failed = true;
        }
        toasts.extend(print_toasts(&mut notifications));
    }

    if args.refresh {
        session.refresh();
        wait_with_spinner(&session, &args, format!("Refreshing reviews of {}", course_id)).await;

        let raised = print_toasts(&mut notifications);
        failed |= raised.iter().any(Notification::is_error);
        toasts.extend(raised);
    }

    let view = engine.view();
    let output = match config.general.format {
        OutputFormat::Json => report::generate_json_report(&view, &toasts)?,
        OutputFormat::Markdown => report::generate_markdown_report(&view, &toasts, &config.report),
    };

    match args.output {
        Some(ref path) => {
            std::fs::write(path, &output)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            info!("Report saved to {}", path.display());
        }
        None => print!("{}", output),
    }

    if args.write_back && args.has_actions() {
        store
            .snapshot()
            .await
            .save(&data_path)
            .with_context(|| format!("Failed to write dataset to {}", data_path.display()))?;
        info!("Dataset written back to {}", data_path.display());
    }

    Ok(if failed { 1 } else { 0 })
}

/// Pick how network reachability is decided.
fn build_reachability(args: &Args, config: &Config) -> Result<Arc<dyn NetworkReachability>> {
    if args.offline {
        debug!("Offline mode: network treated as unreachable");
        return Ok(Arc::new(StaticReachability(false)));
    }

    if config.network.check_url.is_empty() {
        return Ok(Arc::new(StaticReachability(true)));
    }

    let checker = HttpReachability::new(&config.network.check_url, config.network.timeout_seconds)?;
    Ok(Arc::new(checker))
}

/// Wait for the session's task while a spinner follows the published view.
async fn wait_with_spinner(session: &CourseDetailSession, args: &Args, label: String) {
    let spinner = loading_spinner(args, &label);
    let mut updates = session.engine().subscribe();
    let wait = session.wait();
    tokio::pin!(wait);

    loop {
        tokio::select! {
            _ = &mut wait => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    (&mut wait).await;
                    break;
                }
                let (code, loading, count) = {
                    let view = updates.borrow_and_update();
                    (view.course_code.clone(), view.is_loading, view.review_count)
                };
                if loading {
                    spinner.set_message(format!("{}...", label));
                } else {
                    spinner.set_message(format!("{}: {} reviews", code, count));
                }
            }
        }
    }

    spinner.finish_and_clear();
}

fn loading_spinner(args: &Args, label: &str) -> ProgressBar {
    if args.quiet {
        return ProgressBar::hidden();
    }

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(format!("{}...", label));
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Print queued notifications to stderr and hand them back for the report.
fn print_toasts(notifications: &mut Notifications) -> Vec<Notification> {
    let drained = notifications.drain();
    for notification in &drained {
        eprintln!("{}", notification);
    }
    drained
}

/// Where the configuration came from. Reported once logging is up.
enum ConfigOrigin {
    File(PathBuf),
    Defaults,
    Unreadable(anyhow::Error),
}

/// Load configuration from file or use defaults.
///
/// An explicit `--config` must load; a broken default file falls back.
fn load_config(args: &Args) -> Result<(Config, ConfigOrigin)> {
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, ConfigOrigin::File(config_path.clone())));
    }

    match Config::load_default() {
        Ok(Some(config)) => Ok((config, ConfigOrigin::File(PathBuf::from(CONFIG_FILE_NAME)))),
        Ok(None) => Ok((Config::default(), ConfigOrigin::Defaults)),
        Err(e) => Ok((Config::default(), ConfigOrigin::Unreadable(e))),
    }
}
