use std::io::IsTerminal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use dirsnap::{
    cli::Cli,
    config::DirsnapConfig,
    session::{Session, SessionOptions},
    DirectorySnapshotManager,
};

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(err) = cli.validate() {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }

    cli.setup_logging();

    let config = DirsnapConfig::load_or_default();
    run_session(&cli, config)
}

fn run_session(cli: &Cli, config: DirsnapConfig) -> Result<()> {
    let filter = cli.build_filter(&config)?;

    let mut manager = DirectorySnapshotManager::new(filter);
    if let Some(ref path) = cli.path {
        manager.set_directory(path.clone());
        tracing::info!("Managing directory: {}", path.display());
    }

    let options = SessionOptions {
        output: cli.output,
        no_color: cli.no_color,
        force: cli.force,
        show_prompt: std::io::stdin().is_terminal(),
    };

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();

    let mut session = Session::new(manager, config, options);
    session.run(stdin.lock(), &mut stdout, &running)?;

    Ok(())
}
