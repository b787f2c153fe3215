//! `paddock consume` - drain pending tasks, then export

use anyhow::Result;
use clap::Args;
use paddock_core::ProgressContext;

use super::{Stores, limit_arg, print_run_summary};
use crate::config::Config;

#[derive(Args, Debug)]
pub struct ConsumeArgs {
    /// Maximum number of tasks to process (0 = all pending)
    #[arg(default_value_t = 0)]
    pub limit: usize,
}

pub async fn run(
    args: ConsumeArgs,
    config: &Config,
    workers: usize,
    progress: &ProgressContext,
) -> Result<()> {
    let stores = Stores::open(config)?;
    let ctx = stores.context(config)?;
    let summary =
        paddock_pipeline::consume(&ctx, limit_arg(args.limit), workers, progress).await?;
    print_run_summary(&summary);

    if summary.enqueued > 0 {
        super::export::export(&stores, &config.export.path)?;
    }
    Ok(())
}
