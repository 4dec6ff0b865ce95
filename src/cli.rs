use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "powernukkit-versions")]
#[command(about = "Aggregate PowerNukkit releases and snapshots into a version catalog")]
pub struct Cli {
    #[arg(long, value_name = "FILE")]
    pub catalog: Option<PathBuf>,

    #[arg(long, value_name = "URL")]
    pub maven_base: Option<String>,

    #[arg(long, value_name = "URL")]
    pub snapshot_base: Option<String>,
}
