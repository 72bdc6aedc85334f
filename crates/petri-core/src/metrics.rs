use crate::agent::Agent;
use crate::config::KineticParams;
use crate::nutrient::NutrientField;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct StepMetrics {
    pub iteration: u64,
    pub agent_count: usize,
    pub motile_count: usize,
    pub divisions: usize,
    pub total_mass: f64,
    pub mean_mass: f64,
    pub nutrient_total: f64,
    pub nutrient_min: f64,
    pub nutrient_max: f64,
}

fn default_schema_version() -> u32 {
    1
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub seed: u64,
    pub steps: usize,
    pub sample_every: usize,
    pub final_iteration: u64,
    pub final_agent_count: usize,
    #[serde(default)]
    pub total_divisions: usize,
    pub samples: Vec<StepMetrics>,
}

/// Scalar run parameters recorded alongside a snapshot.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SimulationParams {
    pub grid_size: usize,
    pub c_max: f64,
    pub d_c: f64,
    pub time_step: f64,
    pub num_agents_initial: usize,
    pub current_iteration: u64,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct AgentRecord {
    pub x: usize,
    pub y: usize,
    pub mass: f64,
}

impl From<&Agent> for AgentRecord {
    fn from(agent: &Agent) -> Self {
        Self {
            x: agent.x(),
            y: agent.y(),
            mass: agent.mass(),
        }
    }
}

/// Point-in-time export of a colony: run parameters, kinetics and every live agent.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ColonySnapshot {
    pub simulation_params: SimulationParams,
    pub agent_params: KineticParams,
    pub agents: Vec<AgentRecord>,
}

pub fn collect_step_metrics(
    iteration: u64,
    divisions: usize,
    agents: &[Agent],
    field: &NutrientField,
) -> StepMetrics {
    let agent_count = agents.len();
    let total_mass: f64 = agents.iter().map(Agent::mass).sum();
    StepMetrics {
        iteration,
        agent_count,
        motile_count: agents.iter().filter(|a| a.is_motile()).count(),
        divisions,
        total_mass,
        mean_mass: if agent_count > 0 {
            total_mass / agent_count as f64
        } else {
            0.0
        },
        nutrient_total: field.total(),
        nutrient_min: field.min(),
        nutrient_max: field.max(),
    }
}
