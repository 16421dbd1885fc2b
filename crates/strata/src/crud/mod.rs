//! Owner-scoped records with a status lifecycle.

mod error;
mod service;
mod transition;
mod types;

pub use error::{crud_error_to_status_code, CrudError, Result};
pub use service::CrudService;
pub use transition::Transition;
pub use types::{PageQuery, StatusQuery};
