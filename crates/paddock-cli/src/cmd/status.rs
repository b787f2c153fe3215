//! `paddock status` - task and warehouse counts

use anyhow::Result;
use comfy_table::{Cell, Color};
use paddock_core::{TaskStatus, fmt_num};
use paddock_store::TaskRepository;

use super::{Stores, table};
use crate::config::Config;

fn status_color(status: TaskStatus) -> Color {
    match status {
        TaskStatus::New => Color::Yellow,
        TaskStatus::Queued => Color::Blue,
        TaskStatus::Completed => Color::Green,
        TaskStatus::Error => Color::Red,
    }
}

pub async fn run(config: &Config) -> Result<()> {
    let stores = Stores::open(config)?;

    let counts = stores.tasks.status_counts().await?;
    let mut tasks = table(&["Status", "Tasks"]);
    for status in TaskStatus::ALL {
        let n = counts
            .iter()
            .find(|(s, _)| *s == status)
            .map_or(0, |(_, n)| *n);
        tasks.add_row(vec![
            Cell::new(status).fg(status_color(status)),
            Cell::new(fmt_num(n)),
        ]);
    }
    let total: u64 = counts.iter().map(|(_, n)| n).sum();
    tasks.add_row(vec![Cell::new("total"), Cell::new(fmt_num(total))]);
    eprintln!("\n{tasks}");

    let mut warehouse = table(&["Table", "Rows"]);
    for (name, rows) in stores.warehouse.table_counts().await? {
        warehouse.add_row(vec![Cell::new(name), Cell::new(fmt_num(rows))]);
    }
    eprintln!("{warehouse}");
    Ok(())
}
