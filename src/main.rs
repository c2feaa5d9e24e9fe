use activity_logger::config::settings::Settings;
use activity_logger::environment::provider::HostEnvironment;
use activity_logger::page::lifecycle::{Navigator, Page};
use activity_logger::reporter::activity::ActivityReporter;
use activity_logger::reporter::transport::HttpTransport;
use activity_logger::session::context::SessionContext;
use anyhow::Result;
use clap::{Arg, ArgAction, Command};
use dotenvy::dotenv;
use std::env;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A writer that flushes after every write so the log file is always current
struct FlushingWriter {
    inner: Arc<Mutex<std::fs::File>>,
}

impl FlushingWriter {
    fn new(file: std::fs::File) -> Self {
        Self {
            inner: Arc::new(Mutex::new(file)),
        }
    }
}

impl Write for FlushingWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut file = self
            .inner
            .lock()
            .map_err(|_| std::io::Error::other("log file lock poisoned"))?;
        let written = file.write(buf)?;
        file.flush()?;
        Ok(written)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let mut file = self
            .inner
            .lock()
            .map_err(|_| std::io::Error::other("log file lock poisoned"))?;
        file.flush()
    }
}

/// Prints where the page would go; a terminal has nowhere to redirect to.
struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn navigate(&self, path: &str) {
        log::info!("Navigating to {}", path);
        println!("→ {}", path);
    }
}

fn init_logging() -> Result<()> {
    let debug_enabled = env::var("DEBUG_LOGS_ENABLED")
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(false);

    if debug_enabled {
        let log_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open("activity_logger.log")?;

        env_logger::Builder::from_env(
            env_logger::Env::default()
                .default_filter_or("activity_logger=debug")
        )
        .target(env_logger::Target::Pipe(Box::new(FlushingWriter::new(log_file))))
        .init();

        log::info!("=== DEBUG LOGGING ENABLED ===");
        log::info!("Writing logs to activity_logger.log");
    } else {
        env_logger::Builder::from_env(
            env_logger::Env::default()
                .default_filter_or("warn")
        )
        .init();
    }

    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    let shutdown_flag = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&shutdown_flag))?;
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&shutdown_flag))?;

    println!("Page open. Press Ctrl+C to unload.");
    while !shutdown_flag.load(Ordering::Relaxed) {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    log::info!("Received shutdown signal, unloading page...");
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let matches = Command::new("Activity Logger")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Record page activity for one session and send it to the collector")
        .arg(
            Arg::new("url")
                .long("url")
                .value_name("URL")
                .default_value("http://localhost/")
                .help("URL reported with the page_loaded event"),
        )
        .arg(
            Arg::new("action")
                .long("action")
                .value_name("NAME")
                .action(ArgAction::Append)
                .help("Log an action and follow the redirect (repeatable)"),
        )
        .arg(
            Arg::new("wait")
                .long("wait")
                .help("Keep the page open until SIGINT/SIGTERM")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("dump")
                .long("dump")
                .help("Print the session's activity log as JSON on exit")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    dotenv().ok();
    init_logging()?;

    let settings = Settings::new()?;
    log::info!("Settings: {:?}", settings);

    let context = Arc::new(SessionContext::initialize());
    let environment = Arc::new(HostEnvironment::from_settings(&settings));
    let transport = HttpTransport::from_settings(&settings)?;
    let reporter = ActivityReporter::new(Arc::clone(&context), environment, transport);
    let page = Page::new(&reporter, TerminalNavigator, settings.redirect_path.clone());

    let url = matches
        .get_one::<String>("url")
        .map(String::as_str)
        .unwrap_or("http://localhost/");
    page.on_load(url);

    if let Some(actions) = matches.get_many::<String>("action") {
        for action in actions {
            page.log_activity_and_navigate(action);
        }
    }

    if matches.get_flag("wait") {
        wait_for_shutdown().await?;
    }

    page.on_unload();

    if !reporter.settle(settings.request_timeout).await {
        eprintln!("Some activity records were still being sent when the page closed.");
    }

    if matches.get_flag("dump") {
        println!("{}", serde_json::to_string_pretty(&context.summary())?);
    } else {
        println!("Session {}: {} activities recorded", context.session_id(), context.len());
    }

    Ok(())
}
