//! Route paths and the in-process route table.

mod path;
mod table;

pub use path::RoutePath;
pub use table::RouteMatch;
pub use table::RouteTable;
