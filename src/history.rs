//! The `dkt history` command.

use anyhow::Result;

use crate::config::Config;
use crate::ledger::Ledger;

pub fn run_history(config: &Config, limit: Option<usize>, summary: bool) -> Result<()> {
    let ledger = Ledger::open(&config.data.ledger_path())?;

    if summary {
        let s = ledger.summary();
        println!("ledger summary");
        println!("  entries: {}", s.total);
        println!("  applied: {}", s.applied);
        println!("  dry-run: {}", s.dry_run);
        println!("  skipped: {}", s.skipped);
        for (source, count) in &s.by_source {
            println!("  source {}: {}", source, count);
        }
        for (method, count) in &s.by_method {
            println!("  method {}: {}", method, count);
        }
        println!("  average confidence: {:.2}", s.average_confidence);
        if let (Some(first), Some(last)) = (s.first, s.last) {
            println!("  first entry: {}", first.format("%Y-%m-%d %H:%M"));
            println!("  last entry: {}", last.format("%Y-%m-%d %H:%M"));
        }
        println!("ok");
        return Ok(());
    }

    let entries = ledger.history(limit);
    if entries.is_empty() {
        println!("ledger is empty");
        return Ok(());
    }

    for entry in entries {
        println!(
            "{} [{}] {} -> {} (confidence {:.2}, {}, {})",
            entry.timestamp.format("%Y-%m-%d %H:%M"),
            entry.outcome.as_str(),
            entry.original_name,
            entry.new_name,
            entry.confidence,
            entry.source.as_str(),
            entry.extraction_method,
        );
    }
    println!("ok");
    Ok(())
}
