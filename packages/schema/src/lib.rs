mod error;
mod issue;
mod normalizer;
mod validator;

pub use error::SchemaError;
pub use issue::{IssueCode, SchemaIssue, WrapperReason};
pub use normalizer::{normalize, NormalizeOutcome, Normalizer, Repair};
pub use validator::{validate, validate_json};
