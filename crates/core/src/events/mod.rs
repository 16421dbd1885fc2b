mod error;
mod traits;
mod types;

pub use error::{EventError, Result};
pub use traits::{EventSink, NoopEventSink};
pub use types::CrudEvent;
