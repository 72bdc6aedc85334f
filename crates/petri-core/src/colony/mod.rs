use crate::agent::{Agent, AgentFault, Kinetics};
use crate::config::{ColonyConfig, ConfigError};
use crate::metrics::{
    collect_step_metrics, AgentRecord, ColonySnapshot, RunSummary, SimulationParams, StepMetrics,
};
use crate::nutrient::NutrientField;
use crate::rng::{create_rng, ColonyRng};
use rand::Rng;
use std::sync::Arc;
use std::time::Instant;
use std::{error::Error, fmt};
use tracing::{debug, info, trace};

mod params;

pub use params::{ParamChange, ParamError, ParamKey, ParamValue};

#[derive(Clone, Debug)]
pub struct StepReport {
    /// Iteration count after this step.
    pub iteration: u64,
    pub agents_processed: usize,
    pub divisions: usize,
    pub agent_pass_us: u64,
    pub diffusion_us: u64,
    pub total_us: u64,
}

/// A population of agents feeding on one nutrient field.
///
/// Owns the field, the agents, the kinetic record they share and the RNG every
/// random draw comes from. A new colony starts paused.
#[derive(Clone, Debug)]
pub struct Colony {
    config: ColonyConfig,
    kinetics: Arc<Kinetics>,
    field: NutrientField,
    agents: Vec<Agent>,
    // Offspring produced during the agent pass; merged once the pass ends.
    pending: Vec<Agent>,
    rng: ColonyRng,
    iteration: u64,
    paused: bool,
    // Set when an agent update fails; `step` refuses to run until `reset`.
    fault: Option<AgentFault>,
    divisions_last_step: usize,
    total_divisions: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColonyError {
    Config(ConfigError),
    Agent(AgentFault),
    Param(ParamError),
    Experiment(ExperimentError),
}

impl fmt::Display for ColonyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColonyError::Config(e) => write!(f, "{e}"),
            ColonyError::Agent(e) => write!(f, "{e}"),
            ColonyError::Param(e) => write!(f, "{e}"),
            ColonyError::Experiment(e) => write!(f, "{e}"),
        }
    }
}

impl From<ConfigError> for ColonyError {
    fn from(err: ConfigError) -> Self {
        ColonyError::Config(err)
    }
}

impl From<AgentFault> for ColonyError {
    fn from(err: AgentFault) -> Self {
        ColonyError::Agent(err)
    }
}

impl From<ParamError> for ColonyError {
    fn from(err: ParamError) -> Self {
        ColonyError::Param(err)
    }
}

impl From<ExperimentError> for ColonyError {
    fn from(err: ExperimentError) -> Self {
        ColonyError::Experiment(err)
    }
}

impl Error for ColonyError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ColonyError::Config(e) => Some(e),
            ColonyError::Agent(e) => Some(e),
            ColonyError::Param(e) => Some(e),
            ColonyError::Experiment(e) => Some(e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExperimentError {
    InvalidSampleEvery,
    TooManySteps { max: usize, actual: usize },
    TooManySamples { max: usize, actual: usize },
}

impl fmt::Display for ExperimentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExperimentError::InvalidSampleEvery => write!(f, "sample_every must be positive"),
            ExperimentError::TooManySteps { max, actual } => {
                write!(f, "steps ({actual}) exceed supported maximum ({max})")
            }
            ExperimentError::TooManySamples { max, actual } => {
                write!(f, "samples ({actual}) exceed supported maximum ({max})")
            }
        }
    }
}

impl Error for ExperimentError {}

impl Colony {
    pub const MAX_EXPERIMENT_STEPS: usize = 1_000_000;
    pub const MAX_EXPERIMENT_SAMPLES: usize = 50_000;

    pub fn new(config: ColonyConfig) -> Result<Self, ColonyError> {
        config.validate()?;
        let kinetics = Arc::new(Kinetics::from_config(&config)?);
        let mut colony = Self {
            field: Self::fresh_field(&config),
            rng: create_rng(config.seed),
            agents: Vec::with_capacity(config.num_agents),
            pending: Vec::new(),
            kinetics,
            config,
            iteration: 0,
            paused: true,
            fault: None,
            divisions_last_step: 0,
            total_divisions: 0,
        };
        colony.populate()?;
        Ok(colony)
    }

    fn fresh_field(config: &ColonyConfig) -> NutrientField {
        NutrientField::new(config.grid_size, config.c_max, config.d_c, config.dt)
    }

    /// Place `num_agents` agents of mass `m_min` around the grid centre.
    fn populate(&mut self) -> Result<(), ColonyError> {
        let size = self.config.grid_size;
        let center = (size / 2) as i64;
        let jitter = self.config.initial_jitter as f64;
        let upper = size.saturating_sub(1) as i64;
        for _ in 0..self.config.num_agents {
            let mut coord = || {
                let offset = if jitter > 0.0 {
                    self.rng.random_range(-jitter..jitter).trunc() as i64
                } else {
                    0
                };
                (center + offset).clamp(0, upper) as usize
            };
            let x = coord();
            let y = coord();
            let agent = Agent::new(
                x,
                y,
                self.kinetics.m_min(),
                Arc::clone(&self.kinetics),
                &mut self.rng,
            )?;
            self.agents.push(agent);
        }
        debug!(
            agents = self.agents.len(),
            grid_size = size,
            jitter = self.config.initial_jitter,
            "placed initial population"
        );
        Ok(())
    }

    /// Rebuild the field, RNG and initial population from the current config.
    ///
    /// Leaves the colony paused at iteration 0.
    pub fn reset(&mut self) -> Result<(), ColonyError> {
        self.field = Self::fresh_field(&self.config);
        self.rng = create_rng(self.config.seed);
        self.agents.clear();
        self.pending.clear();
        self.iteration = 0;
        self.paused = true;
        self.fault = None;
        self.divisions_last_step = 0;
        self.total_divisions = 0;
        debug!(seed = self.config.seed, "colony reset");
        self.populate()
    }

    pub fn config(&self) -> &ColonyConfig {
        &self.config
    }

    /// Validate and install a new configuration, then reset.
    ///
    /// On error the colony is left exactly as it was.
    pub fn set_config(&mut self, config: ColonyConfig) -> Result<(), ColonyError> {
        config.validate()?;
        let kinetics = Arc::new(Kinetics::from_config(&config)?);
        info!(
            grid_size = config.grid_size,
            num_agents = config.num_agents,
            seed = config.seed,
            "colony reconfigured"
        );
        self.config = config;
        self.kinetics = kinetics;
        self.reset()
    }

    /// Change one named parameter, then reconfigure and reset.
    pub fn apply_param_change(&mut self, change: &ParamChange) -> Result<(), ColonyError> {
        let mut config = self.config.clone();
        change.apply_to(&mut config)?;
        self.set_config(config)
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// The fault that halted the colony, if any. Cleared by `reset`.
    pub fn fault(&self) -> Option<AgentFault> {
        self.fault
    }

    pub fn kinetics(&self) -> &Arc<Kinetics> {
        &self.kinetics
    }

    pub fn field(&self) -> &NutrientField {
        &self.field
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Completed steps since the last reset.
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    pub fn total_divisions(&self) -> usize {
        self.total_divisions
    }

    pub fn step_metrics(&self) -> StepMetrics {
        collect_step_metrics(
            self.iteration,
            self.divisions_last_step,
            &self.agents,
            &self.field,
        )
    }

    pub fn snapshot(&self) -> ColonySnapshot {
        ColonySnapshot {
            simulation_params: SimulationParams {
                grid_size: self.config.grid_size,
                c_max: self.config.c_max,
                d_c: self.config.d_c,
                time_step: self.config.dt,
                num_agents_initial: self.config.num_agents,
                current_iteration: self.iteration,
            },
            agent_params: self.kinetics.params().clone(),
            agents: self.agents.iter().map(AgentRecord::from).collect(),
        }
    }

    /// Resume the colony and run `steps` steps, sampling metrics every
    /// `sample_every` steps and after the last one.
    pub fn run_experiment(
        &mut self,
        steps: usize,
        sample_every: usize,
    ) -> Result<RunSummary, ColonyError> {
        if sample_every == 0 {
            return Err(ExperimentError::InvalidSampleEvery.into());
        }
        if steps > Self::MAX_EXPERIMENT_STEPS {
            return Err(ExperimentError::TooManySteps {
                max: Self::MAX_EXPERIMENT_STEPS,
                actual: steps,
            }
            .into());
        }
        let estimated_samples = if steps == 0 {
            0
        } else {
            ((steps - 1) / sample_every) + 1
        };
        if estimated_samples > Self::MAX_EXPERIMENT_SAMPLES {
            return Err(ExperimentError::TooManySamples {
                max: Self::MAX_EXPERIMENT_SAMPLES,
                actual: estimated_samples,
            }
            .into());
        }

        self.resume();
        let divisions_before = self.total_divisions;
        let mut samples = Vec::with_capacity(estimated_samples);
        for step in 1..=steps {
            self.step()?;
            if step % sample_every == 0 || step == steps {
                samples.push(self.step_metrics());
            }
        }
        Ok(RunSummary {
            schema_version: 1,
            seed: self.config.seed,
            steps,
            sample_every,
            final_iteration: self.iteration,
            final_agent_count: self.agents.len(),
            total_divisions: self.total_divisions - divisions_before,
            samples,
        })
    }

    /// Advance one step: the agent pass, then one diffusion pass.
    ///
    /// Returns `Ok(None)` without touching any state while paused. An agent
    /// fault aborts the step before diffusion, pauses the colony and makes every
    /// later `step` return the same fault until `reset`.
    pub fn step(&mut self) -> Result<Option<StepReport>, ColonyError> {
        if let Some(fault) = self.fault {
            return Err(fault.into());
        }
        if self.paused {
            return Ok(None);
        }
        let total_start = Instant::now();

        let t0 = Instant::now();
        let (agents_processed, divisions) = self.step_agent_phase()?;
        let agent_pass_us = t0.elapsed().as_micros() as u64;

        let t1 = Instant::now();
        self.step_environment_phase();
        let diffusion_us = t1.elapsed().as_micros() as u64;

        self.iteration += 1;
        self.divisions_last_step = divisions;
        self.total_divisions += divisions;
        trace!(
            iteration = self.iteration,
            agents = self.agents.len(),
            divisions,
            "step complete"
        );

        Ok(Some(StepReport {
            iteration: self.iteration,
            agents_processed,
            divisions,
            agent_pass_us,
            diffusion_us,
            total_us: total_start.elapsed().as_micros() as u64,
        }))
    }
}

mod phases;
