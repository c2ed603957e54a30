//! Storage-side building blocks: the mapped model and command construction.

pub mod command;
pub mod indented;
pub mod model;

pub use command::{Indenter, RelationalCommand, RelationalCommandBuilder, RelationalParameter};
pub use indented::IndentedStringBuilder;
pub use model::{EntityType, Model, Property};
