pub mod campaign;
pub mod policy;
pub mod reports;
pub mod scenarios;
pub mod tester;

pub use scenarios::{TestScenario, find_scenario, list_scenarios};
pub use tester::{LogicTester, ScenarioResult};
