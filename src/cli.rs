use anyhow::Result;
use clap::Parser;

use crate::commands::watch::{self, WatchOptions};
use crate::logging;

#[derive(Debug, Parser)]
#[command(
    name = "linkding-pdf-archiver",
    version,
    about = "Download PDF bookmarks from Linkding and attach them back as assets"
)]
pub struct Cli {
    /// Dry run: download PDFs but do not actually upload them to Linkding
    #[arg(short = 'n', long)]
    pub dry_run: bool,
    /// Single run: exit after processing bookmarks once
    #[arg(short = 's', long)]
    pub single_run: bool,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init_from_env()?;

    watch::run(&WatchOptions {
        dry_run: cli.dry_run,
        single_run: cli.single_run,
    })
}
