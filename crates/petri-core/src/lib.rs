pub mod agent;
pub mod colony;
pub mod config;
pub mod constants;
pub mod metrics;
pub mod nutrient;
pub mod rng;

pub use agent::{Agent, AgentFault, Kinetics, Motion};
pub use colony::{Colony, ColonyError, ExperimentError, ParamChange, ParamKey, StepReport};
pub use config::{ColonyConfig, ConfigError, KineticParams};
pub use metrics::{ColonySnapshot, RunSummary, StepMetrics};
pub use nutrient::NutrientField;
