use anyhow::Result;
use arbor::{Application, config::Config, driver::DriverKind};
use arbor_demos::intervals::{build, start};
use clap::Parser;

/// Counters advancing on their own timers.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Backend: curses, windows or fallback
    #[clap(short, long)]
    driver: Option<DriverKind>,

    /// Timer periods in milliseconds
    #[clap(default_values_t = [100, 250, 1000])]
    periods: Vec<u64>,
}

pub fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = Config::from_env()?;
    config.driver = args.driver.or(config.driver);

    let mut app = Application::new(config)?;
    let (top, counters) = build(app.views_mut(), &args.periods)?;
    start(&app, app.views(), &counters)?;
    app.run(top)?;
    Ok(())
}
