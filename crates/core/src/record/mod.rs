mod stamp;
mod status;
mod types;

pub use stamp::{now_or, stamp_new, stamp_update, strip_nulls};
pub use status::{Status, StatusError, LIFECYCLE_FIELDS};
pub use types::CrudRecord;
