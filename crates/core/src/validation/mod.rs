mod traits;
mod types;

pub use traits::{is_suppressed, relax_schema, NoopValidator, Validator};
pub use types::{SchemaViolation, ViolationKind};
