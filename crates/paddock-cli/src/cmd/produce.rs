//! `paddock produce` - discover sessions and create tasks

use anyhow::Result;
use clap::Args;
use paddock_core::ProgressContext;

use super::{LoadMode, Stores, discovery_config, table};
use crate::config::Config;

#[derive(Args, Debug)]
pub struct ProduceArgs {
    /// Maximum number of tasks to create (0 = unlimited)
    #[arg(default_value_t = 0)]
    pub limit: usize,

    /// Incremental (watermarked) or full discovery
    #[arg(value_enum, default_value = "inc")]
    pub mode: LoadMode,
}

pub async fn run(args: ProduceArgs, config: &Config, progress: &ProgressContext) -> Result<()> {
    let stores = Stores::open(config)?;
    let ctx = stores.context(config)?;
    let summary =
        paddock_pipeline::produce(&ctx, discovery_config(args.limit, args.mode), progress).await?;

    let mut table = table(&["Level", "Count"]);
    table.add_row(vec!["Seasons", &summary.seasons.to_string()]);
    table.add_row(vec!["Events", &summary.events.to_string()]);
    table.add_row(vec!["Categories", &summary.categories.to_string()]);
    table.add_row(vec!["Sessions", &summary.sessions.to_string()]);
    table.add_row(vec!["Tasks created", &summary.tasks_created.to_string()]);
    eprintln!("\n{table}");
    if summary.limit_reached {
        eprintln!("Stopped at limit of {} tasks", args.limit);
    }
    Ok(())
}
