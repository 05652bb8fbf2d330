pub mod cleaner;
pub mod validator;

pub use cleaner::{CleanReport, EmptyFileCleaner};
pub use validator::{DatasetValidator, IncompleteRecord, ValidationReport};
