//! Scenario/test factory
//!
//! Turns fixture records into [`Test`]s: resolves the scenario, validates the
//! fixtures against its schema and renders the script a worker runs.

pub mod registry;
pub mod schema;
pub mod template;

pub use registry::ScenarioInfo;
pub use schema::{Field, FieldType, FixtureSchema};
pub use test::{ScenarioRef, Test};
