use std::io::{self, BufRead, Write};

use color_eyre::eyre::Result;
use tracing::info;

pub fn run(yes: bool) -> Result<()> {
    if !yes && !confirm("Delete cached intensity data and all session and lifetime totals?")? {
        println!("Aborted.");
        return Ok(());
    }

    let cache = super::open_cache()?;
    cache.store().clear_all()?;
    info!(root = ?cache.store().root(), "Stats reset");
    println!("Stats reset. Totals start again from zero.");
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
