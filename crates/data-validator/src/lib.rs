//! Data Validation
//!
//! Range and shape checks for inbound tracking samples and request bodies.
//! Failures are reported per field so they can be returned to clients.

mod error;
mod validator;

pub use error::{FieldError, ValidationError};
pub use validator::{ValidationConfig, ValidationResult, Validator};
