#![deny(missing_docs)]
//! The Tool Builder: deriving callable tools from routed agent subtrees and
//! validating their input/output against JSON Schema (spec §4.3).

mod callable;
mod schema;

pub use callable::{agent_as_tool, CallableTool};
pub use schema::validate;
