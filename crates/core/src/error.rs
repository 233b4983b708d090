use thiserror::Error;

use crate::model::CatalogError;
use crate::model::IdError;
use crate::model::QuestionError;
use crate::model::SettingsError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Id(#[from] IdError),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
}
