mod app;
mod assets;
mod config;
mod dialogue;
mod error;
mod input;
mod proximity;
mod render;
mod session;
mod sprites;
mod tree;
mod typewriter;
mod world;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = config::Cli::parse();
    app::run(cli)
}
