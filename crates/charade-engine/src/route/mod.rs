//! Route pattern compilation, operation registry and resolution.

mod operation;
mod pattern;
mod table;

pub use operation::{CrudKind, RouteMatch, RouteOperation};
pub use pattern::RoutePattern;
pub use table::RouteTable;
