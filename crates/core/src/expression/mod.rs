//! Expression AST and its DynamoDB renderer.
//!
//! Conditions, key conditions, projections and update plans are plain data.
//! The in-memory gateway evaluates them directly; the DynamoDB gateway
//! renders them with [`ExpressionBuilder`].

mod builder;
mod condition;
mod error;
mod key;
mod path;
mod projection;
mod update;

pub use builder::ExpressionBuilder;
pub use condition::{Comparator, Condition};
pub use error::ExpressionError;
pub use key::{KeyCondition, SortFilter};
pub use path::{compare_values, lookup};
pub use projection::Projection;
pub use update::UpdatePlan;
