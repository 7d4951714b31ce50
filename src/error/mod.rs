use thiserror::Error;

use crate::archive::ArchiveError;
use crate::editor::EditorError;
use crate::export::ExportError;
use crate::offline::OfflineError;
use crate::preset::PresetError;
use crate::storage::StorageError;
use crate::store::StoreError;

pub type AppResult<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Preset(#[from] PresetError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Editor(#[from] EditorError),
    #[error(transparent)]
    Offline(#[from] OfflineError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}
