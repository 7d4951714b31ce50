pub mod archive;
pub mod cli;
pub mod config;
pub mod editor;
pub mod error;
pub mod export;
pub mod logging;
pub mod notification;
pub mod offline;
pub mod preset;
pub mod storage;
pub mod store;
pub mod theme;
pub use error::{AppError, AppResult};

/// Entrypoint used by the binary and by integrations that build their own [`cli::Cli`].
pub fn run(cli: cli::Cli) -> AppResult<()> {
    logging::init();
    tracing::debug!(command = ?cli.command, "starting SceneStealer");
    cli::run(cli)
}
