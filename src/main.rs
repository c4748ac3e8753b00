use inciser::{init_logging, load_config, run, SleepInhibitor, CONFIG_ENV};
use std::path::PathBuf;

fn main() -> anyhow::Result<()> {
    init_logging()?;

    let path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
    let config = load_config(path.as_deref())?;

    // Dropped at the end of main, after the beam is off.
    let _inhibitor = SleepInhibitor::acquire();

    let summaries = run(&config)?;
    let holes: usize = summaries.iter().map(|s| s.holes_burned).sum();
    let elapsed: f64 = summaries.iter().map(|s| s.elapsed.as_secs_f64()).sum();
    tracing::info!(
        "Done: {} holes in {} block(s), {:.1}s",
        holes,
        summaries.len(),
        elapsed
    );

    Ok(())
}
