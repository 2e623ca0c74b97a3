use std::path::PathBuf;

use anyhow::Result;
use arbor::{Application, config::Config, driver::DriverKind};
use arbor_demos::focusgym::build;
use clap::Parser;

/// Split and cycle through nested focusable blocks.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Backend: curses, windows or fallback
    #[clap(short, long)]
    driver: Option<DriverKind>,

    /// Write a trace log to this file
    #[clap(short, long)]
    log: Option<PathBuf>,
}

pub fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = Config::from_env()?;
    config.driver = args.driver.or(config.driver);
    config.log_file = args.log.or(config.log_file);

    let mut app = Application::new(config)?;
    let top = build(app.views_mut())?;
    app.run(top)?;
    Ok(())
}
