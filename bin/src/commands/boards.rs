//! Boards command implementation.

use anyhow::Result;
use tickbar_lib::prelude::*;

/// List known boards with their trading sessions.
pub(crate) fn list_boards() -> Result<()> {
    let registry = BoardRegistry::global();
    let mut boards: Vec<_> = registry.all().collect();
    boards.sort_by(|a, b| a.code().cmp(b.code()));

    println!(
        "{:<8} {:<32} {:>10} {:>6} {:>8}",
        "CODE", "NAME", "UTC OFFSET", "OPEN", "LENGTH"
    );
    println!("{}", "-".repeat(68));

    for board in &boards {
        let session = board.session();
        let length = session.length();
        println!(
            "{:<8} {:<32} {:>10} {:>6} {:>8}",
            board.code(),
            board.name(),
            session.utc_offset().to_string(),
            session.start().format("%H:%M").to_string(),
            format!("{}h{:02}m", length.num_hours(), length.num_minutes() % 60)
        );
    }

    println!("\nTotal: {} boards", boards.len());
    Ok(())
}
