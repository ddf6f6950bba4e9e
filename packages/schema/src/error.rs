use outliner_model::ModelError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Invalid document: {0}")]
    Model(#[from] ModelError),
}
