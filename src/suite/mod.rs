mod builder;
mod model;
mod reader;

pub use builder::ScenarioBuilder;
pub(crate) use model::is_absolute_url;
pub use model::{Expectation, Scenario, Sequence, Suite};
pub(crate) use reader::compile_schema;
pub use reader::{discover_suites, load_suite, validate_suite, SUITE_SUFFIX};
