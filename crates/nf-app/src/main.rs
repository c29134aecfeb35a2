use std::fs::File;
use std::sync::Arc;

use anyhow::{Context, Result};
use arc_swap::ArcSwap;
use clap::Parser;
use nf_core::config::PipelineConfig;
use nf_core::session::{ModeSelector, SessionLock};
use nf_flight::{SessionExit, SessionReport};

pub mod app;
pub mod cli;
pub mod hotreload;
pub mod pipeline;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    init_logging(&cli)?;

    let config = resolve_config(&cli)?;
    let modes = Arc::new(ModeSelector::new(config.mode));
    let config = Arc::new(ArcSwap::from_pointee(config));

    // The watcher must stay alive for the whole session.
    let _watcher = if cli.config.exists() {
        Some(hotreload::spawn_config_watcher(
            &cli.config,
            &config,
            &modes,
            cli.overrides(),
        )?)
    } else {
        None
    };

    let lock = Arc::new(SessionLock::new());
    let interrupt = Arc::clone(&lock);
    ctrlc::set_handler(move || {
        if interrupt.engage() {
            log::info!("Interrupt received, landing");
        }
    })?;

    let pipeline = pipeline::start(&cli, &config, lock, modes)?;

    let result = if cli.headless {
        log::info!("Running headless, Ctrl-C to stop");
        Ok(())
    } else {
        let terminal = ratatui::init();
        let result = app::App::new(&pipeline).run(terminal);
        // Restore on every path, error included.
        ratatui::restore();
        result
    };
    if result.is_err() {
        pipeline.lock.engage();
    }

    let report = pipeline.join()?;
    result?;
    summarize(&report)
}

fn init_logging(cli: &cli::Cli) -> Result<()> {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(cli.log_level.parse().unwrap_or(log::LevelFilter::Warn));
    if !cli.headless {
        // The dashboard owns the terminal.
        let file = File::create(&cli.log_file)
            .with_context(|| format!("cannot create log file {}", cli.log_file.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

/// Load the config file if present, otherwise defaults; CLI overrides win.
fn resolve_config(cli: &cli::Cli) -> Result<PipelineConfig> {
    let overrides = cli.overrides();
    if cli.config.exists() {
        hotreload::reload(&cli.config, &overrides)
    } else {
        log::warn!(
            "Config not found: {}. Using defaults.",
            cli.config.display()
        );
        hotreload::finalize(PipelineConfig::default(), &overrides)
    }
}

fn summarize(report: &SessionReport) -> Result<()> {
    println!(
        "Session over: {} cycles, {} actuations, vehicle {:?}",
        report.cycles,
        report.actuations,
        report.final_state
    );
    if !report.landing_ok {
        log::error!("Shutdown landing was not acknowledged");
        println!("WARNING: shutdown landing was not acknowledged");
    }
    match &report.exit {
        SessionExit::Stopped => Ok(()),
        SessionExit::Failed(err) => anyhow::bail!("flight session failed: {err}"),
    }
}
