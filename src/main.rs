use anyhow::Context;
use clap::Parser;

fn main() -> anyhow::Result<()> {
    let cli = scenestealer::cli::Cli::parse();
    scenestealer::run(cli).context("scenestealer failed")
}
