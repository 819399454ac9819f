/// Logistic acceptance model and wait-time estimation.
pub mod acceptance;
/// Step cap for the session loop.
pub mod clock;
pub mod engine;
pub mod kpi;
/// Decision and charge price computation.
pub mod pricing;
/// In-memory simulator used by the test suites.
pub mod scripted;
pub mod simulator;
pub mod types;
/// State-of-charge derivation from battery parameters.
pub mod vehicle;
