use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(about = "Interactive portal stage viewer", version)]
pub struct Args {
    /// Stage roster JSON preset; defaults to the built-in three-stage set
    #[arg(long)]
    pub stages: Option<PathBuf>,

    /// Directory searched recursively for stage background textures
    #[arg(long)]
    pub assets: Option<PathBuf>,

    /// TTF font used for stage labels and the status readout
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// Timeline artifact from portal_engine; plays it back instead of live input
    #[arg(long)]
    pub replay: Option<PathBuf>,

    /// Window width in physical pixels
    #[arg(long, default_value_t = 1280)]
    pub width: u32,

    /// Window height in physical pixels
    #[arg(long, default_value_t = 720)]
    pub height: u32,

    /// Print the resolved stage roster and exit without opening a window
    #[arg(long)]
    pub print_roster: bool,
}
