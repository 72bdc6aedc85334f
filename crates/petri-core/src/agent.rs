use crate::config::{ColonyConfig, ConfigError, DisplacementRounding, KineticParams};
use crate::nutrient::NutrientField;
use rand::Rng;
use rand_distr::{Distribution, Poisson};
use std::f64::consts::{PI, TAU};
use std::fmt;
use std::sync::Arc;

/// Immutable kinetic record shared (via `Arc`) by every agent of a run.
///
/// Built once from a validated [`ColonyConfig`]; changing any parameter means
/// building a new record and resetting the colony.
#[derive(Clone, Debug)]
pub struct Kinetics {
    params: KineticParams,
    m_max: f64,
    /// Stokes drag prefactor `4πμ`.
    drag: f64,
    run_length: Poisson<f64>,
    rounding: DisplacementRounding,
}

impl Kinetics {
    pub fn from_config(config: &ColonyConfig) -> Result<Self, ConfigError> {
        let run_length = Poisson::new(config.persistence_mean)
            .map_err(|_| ConfigError::InvalidPersistenceMean)?;
        let params = config.kinetics.clone();
        Ok(Self {
            m_max: params.m_max(),
            drag: 4.0 * PI * params.mu,
            params,
            run_length,
            rounding: config.rounding,
        })
    }

    pub fn params(&self) -> &KineticParams {
        &self.params
    }

    pub fn m_min(&self) -> f64 {
        self.params.m_min
    }

    pub fn m_max(&self) -> f64 {
        self.m_max
    }

    pub fn rounding(&self) -> DisplacementRounding {
        self.rounding
    }

    fn draw_heading<R: Rng>(&self, rng: &mut R) -> f64 {
        rng.random_range(0.0..TAU)
    }

    fn draw_run_length<R: Rng>(&self, rng: &mut R) -> u32 {
        // Poisson samples are non-negative integers stored as f64; the cast saturates.
        self.run_length.sample(rng) as u32
    }
}

/// Internal-consistency fault raised when an update leaves an agent without a
/// strictly positive, finite mass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AgentFault {
    NonPositiveMass { mass: f64 },
}

impl fmt::Display for AgentFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentFault::NonPositiveMass { mass } => {
                write!(f, "agent mass must stay positive and finite, got {mass}")
            }
        }
    }
}

impl std::error::Error for AgentFault {}

/// Outcome of a single [`Agent::swim`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Motion {
    /// Mass outside the motile window; nothing changed.
    Immobile,
    /// Run step taken; `dx`/`dy` is the displacement actually applied after clamping.
    Moved { dx: i64, dy: i64 },
    /// Run exhausted; a new heading and run length were drawn instead of moving.
    Tumbled,
}

#[derive(Clone, Debug)]
pub struct Agent {
    // Fields are private; mass changes go through `commit_mass`.
    x: usize,
    y: usize,
    mass: f64,
    size: f64,
    radius: f64,
    velocity: f64,
    heading: f64,
    run_remaining: u32,
    kinetics: Arc<Kinetics>,
}

impl Agent {
    /// Create an agent at `(x, y)`, drawing its heading and first run length from `rng`.
    pub fn new<R: Rng>(
        x: usize,
        y: usize,
        mass: f64,
        kinetics: Arc<Kinetics>,
        rng: &mut R,
    ) -> Result<Self, AgentFault> {
        let heading = kinetics.draw_heading(rng);
        let run_remaining = kinetics.draw_run_length(rng);
        let mut agent = Self {
            x,
            y,
            mass: 0.0,
            size: 0.0,
            radius: 0.0,
            velocity: 0.0,
            heading,
            run_remaining,
            kinetics,
        };
        agent.commit_mass(mass)?;
        Ok(agent)
    }

    /// Take up nutrient from the current cell with Michaelis–Menten kinetics.
    ///
    /// Uptake `u = r_max·c / (K_m + c)` is added to mass as `p·u·size`, using the
    /// size from before the update, and `u` is removed from the field. Runs
    /// whether or not the agent is motile. Returns `u`.
    pub fn eat(&mut self, field: &mut NutrientField) -> Result<f64, AgentFault> {
        let c = field.read(self.x, self.y);
        let params = self.kinetics.params();
        // Diffusion can leave a cell slightly negative; such cells feed nothing.
        let uptake = if c > 0.0 {
            params.r_max * c / (params.k_m + c)
        } else {
            0.0
        };
        self.commit_mass(self.mass + params.p * uptake * self.size)?;
        field.consume(self.x, self.y, uptake);
        Ok(uptake)
    }

    /// One run-and-tumble step.
    ///
    /// Motile agents with run steps left move `(round(v·cosθ), round(v·sinθ))`
    /// cells, clamped to the grid, and pay `|F_d|·v / ΔH` in mass. An exhausted
    /// run redraws the heading and run length without moving.
    pub fn swim<R: Rng>(&mut self, grid_size: usize, rng: &mut R) -> Result<Motion, AgentFault> {
        if !self.is_motile() {
            return Ok(Motion::Immobile);
        }
        if self.run_remaining == 0 {
            self.heading = self.kinetics.draw_heading(rng);
            self.run_remaining = self.kinetics.draw_run_length(rng);
            return Ok(Motion::Tumbled);
        }

        let rounding = self.kinetics.rounding();
        let (sin, cos) = self.heading.sin_cos();
        let step_x = rounding.apply(self.velocity * cos) as i64;
        let step_y = rounding.apply(self.velocity * sin) as i64;
        let new_x = clamp_axis(self.x, step_x, grid_size);
        let new_y = clamp_axis(self.y, step_y, grid_size);

        let params = self.kinetics.params();
        let work = params.f_d.abs() * self.velocity / params.delta_h;
        self.commit_mass(self.mass - work)?;

        let motion = Motion::Moved {
            dx: new_x as i64 - self.x as i64,
            dy: new_y as i64 - self.y as i64,
        };
        self.x = new_x;
        self.y = new_y;
        self.run_remaining -= 1;
        Ok(motion)
    }

    /// Divide once the agent reaches the division mass (inclusive).
    ///
    /// The daughter lands on a random non-zero Moore neighbour (clamped to the
    /// grid); parent and daughter each keep half the mass.
    pub fn replicate<R: Rng>(
        &mut self,
        grid_size: usize,
        rng: &mut R,
    ) -> Result<Option<Agent>, AgentFault> {
        if self.mass < self.kinetics.m_max() {
            return Ok(None);
        }
        let (dx, dy) = moore_offset(rng);
        let half = self.mass / 2.0;
        let daughter = Agent::new(
            clamp_axis(self.x, dx, grid_size),
            clamp_axis(self.y, dy, grid_size),
            half,
            Arc::clone(&self.kinetics),
            rng,
        )?;
        self.commit_mass(half)?;
        Ok(Some(daughter))
    }

    /// `m_min < mass < m_max`.
    pub fn is_motile(&self) -> bool {
        self.kinetics.m_min() < self.mass && self.mass < self.kinetics.m_max()
    }

    pub fn x(&self) -> usize {
        self.x
    }

    pub fn y(&self) -> usize {
        self.y
    }

    pub fn position(&self) -> (usize, usize) {
        (self.x, self.y)
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Area occupied by the cell, `mass / density`.
    pub fn size(&self) -> f64 {
        self.size
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Terminal swimming speed in cells per step.
    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    pub fn heading(&self) -> f64 {
        self.heading
    }

    pub fn run_remaining(&self) -> u32 {
        self.run_remaining
    }

    pub fn kinetics(&self) -> &Arc<Kinetics> {
        &self.kinetics
    }

    #[cfg(test)]
    pub(crate) fn set_mass(&mut self, mass: f64) -> Result<(), AgentFault> {
        self.commit_mass(mass)
    }

    #[cfg(test)]
    pub(crate) fn set_motion(&mut self, heading: f64, run_remaining: u32) {
        self.heading = heading;
        self.run_remaining = run_remaining;
    }

    /// Install `mass` and recompute the derived quantities. A rejected mass
    /// leaves the agent untouched.
    fn commit_mass(&mut self, mass: f64) -> Result<(), AgentFault> {
        if !(mass.is_finite() && mass > 0.0) {
            return Err(AgentFault::NonPositiveMass { mass });
        }
        let params = self.kinetics.params();
        self.mass = mass;
        self.size = self.mass / params.density;
        self.radius = (self.size / PI).sqrt();
        self.velocity = params.f_d / (self.kinetics.drag * self.radius);
        Ok(())
    }
}

fn clamp_axis(position: usize, delta: i64, grid_size: usize) -> usize {
    let upper = grid_size.saturating_sub(1) as i64;
    (position as i64).saturating_add(delta).clamp(0, upper) as usize
}

/// Uniform draw over the eight non-zero offsets of the Moore neighbourhood.
fn moore_offset<R: Rng>(rng: &mut R) -> (i64, i64) {
    loop {
        let dx = rng.random_range(-1i64..=1);
        let dy = rng.random_range(-1i64..=1);
        if dx != 0 || dy != 0 {
            return (dx, dy);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::create_rng;

    const GRID: usize = 10;

    fn kinetics_with(params: KineticParams) -> Arc<Kinetics> {
        let config = ColonyConfig {
            grid_size: GRID,
            d_c: 0.05,
            dt: 0.2,
            kinetics: params,
            ..ColonyConfig::default()
        };
        Arc::new(Kinetics::from_config(&config).expect("test config should be valid"))
    }

    fn default_kinetics() -> Arc<Kinetics> {
        kinetics_with(KineticParams::default())
    }

    /// Parameters under which a motile cell covers about two cells per step.
    fn fast_kinetics() -> Arc<Kinetics> {
        kinetics_with(KineticParams {
            f_d: 50.0,
            delta_h: 1.0e4,
            ..KineticParams::default()
        })
    }

    fn assert_derived_consistent(agent: &Agent) {
        let params = agent.kinetics().params();
        let radius = ((agent.mass() / params.density) / PI).sqrt();
        let velocity = params.f_d / (4.0 * PI * params.mu * radius);
        assert!((agent.size() - agent.mass() / params.density).abs() < 1e-12);
        assert!((agent.radius() - radius).abs() < 1e-12);
        assert!((agent.velocity() - velocity).abs() < 1e-12);
    }

    #[test]
    fn new_agent_derives_size_radius_and_velocity() {
        let mut rng = create_rng(1);
        let agent = Agent::new(5, 5, 1.0, default_kinetics(), &mut rng).unwrap();
        assert_derived_consistent(&agent);
        assert!((0.0..TAU).contains(&agent.heading()));
    }

    #[test]
    fn new_agent_rejects_non_positive_mass() {
        let mut rng = create_rng(1);
        assert!(matches!(
            Agent::new(0, 0, 0.0, default_kinetics(), &mut rng),
            Err(AgentFault::NonPositiveMass { .. })
        ));
    }

    #[test]
    fn eat_applies_michaelis_menten_uptake() {
        let mut rng = create_rng(2);
        let mut field = NutrientField::new(GRID, 1.0, 0.05, 0.2);
        let mut agent = Agent::new(3, 4, 1.0, default_kinetics(), &mut rng).unwrap();
        let size_before = agent.size();
        let params = KineticParams::default();
        let expected_uptake = params.r_max * 1.0 / (params.k_m + 1.0);

        let uptake = agent.eat(&mut field).unwrap();

        assert!((uptake - expected_uptake).abs() < 1e-12);
        assert!((agent.mass() - (1.0 + params.p * uptake * size_before)).abs() < 1e-12);
        assert!((field.read(3, 4) - (1.0 - uptake)).abs() < 1e-12);
        assert_derived_consistent(&agent);
    }

    #[test]
    fn eat_never_decreases_mass() {
        let mut rng = create_rng(3);
        let mut field = NutrientField::new(GRID, 1.0, 0.05, 0.2);
        field.set(1, 1, 0.0);
        field.set(2, 2, -0.01);
        for (x, y) in [(1, 1), (2, 2), (3, 3)] {
            let mut agent = Agent::new(x, y, 1.2, default_kinetics(), &mut rng).unwrap();
            let before = agent.mass();
            agent.eat(&mut field).unwrap();
            assert!(agent.mass() >= before, "cell ({x}, {y})");
        }
        assert_eq!(field.read(1, 1), 0.0);
    }

    #[test]
    fn eat_runs_for_immobile_agents() {
        let mut rng = create_rng(4);
        let mut field = NutrientField::new(GRID, 1.0, 0.05, 0.2);
        let mut agent = Agent::new(5, 5, 2.5, default_kinetics(), &mut rng).unwrap();
        assert!(!agent.is_motile());
        let before = agent.mass();
        agent.eat(&mut field).unwrap();
        assert!(agent.mass() > before);
    }

    #[test]
    fn motility_window_is_exclusive_on_both_ends() {
        let mut rng = create_rng(5);
        let kinetics = default_kinetics();
        let mut agent = Agent::new(5, 5, 1.0, Arc::clone(&kinetics), &mut rng).unwrap();
        assert!(!agent.is_motile());
        agent.set_mass(1.0001).unwrap();
        assert!(agent.is_motile());
        agent.set_mass(1.9999).unwrap();
        assert!(agent.is_motile());
        agent.set_mass(2.0).unwrap();
        assert!(!agent.is_motile());
    }

    #[test]
    fn swim_is_a_no_op_for_immobile_agents() {
        let mut rng = create_rng(6);
        let mut agent = Agent::new(5, 5, 1.0, fast_kinetics(), &mut rng).unwrap();
        agent.set_motion(0.0, 3);
        assert_eq!(agent.swim(GRID, &mut rng).unwrap(), Motion::Immobile);
        assert_eq!(agent.position(), (5, 5));
        assert_eq!(agent.run_remaining(), 3);
        assert!((agent.mass() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn swim_moves_along_heading_and_pays_for_work() {
        let mut rng = create_rng(7);
        let mut agent = Agent::new(5, 5, 1.5, fast_kinetics(), &mut rng).unwrap();
        agent.set_motion(0.0, 3);
        let v = agent.velocity();
        let expected_dx = v.round_ties_even() as i64;
        assert!(expected_dx >= 1, "test parameters should produce visible motion");
        let params = agent.kinetics().params().clone();

        let motion = agent.swim(GRID, &mut rng).unwrap();

        assert_eq!(motion, Motion::Moved { dx: expected_dx, dy: 0 });
        assert_eq!(agent.position(), (5 + expected_dx as usize, 5));
        assert_eq!(agent.run_remaining(), 2);
        let expected_mass = 1.5 - params.f_d * v / params.delta_h;
        assert!((agent.mass() - expected_mass).abs() < 1e-12);
        assert_derived_consistent(&agent);
    }

    #[test]
    fn swim_clamps_at_the_grid_edge() {
        let mut rng = create_rng(8);
        let mut agent = Agent::new(GRID - 1, 0, 1.5, fast_kinetics(), &mut rng).unwrap();
        agent.set_motion(0.0, 1);
        let motion = agent.swim(GRID, &mut rng).unwrap();
        assert_eq!(motion, Motion::Moved { dx: 0, dy: 0 });
        assert_eq!(agent.position(), (GRID - 1, 0));
        // Work is still paid even though the wall blocked the run.
        assert!(agent.mass() < 1.5);
    }

    #[test]
    fn swim_never_increases_mass() {
        let mut rng = create_rng(9);
        let mut agent = Agent::new(5, 5, 1.9, fast_kinetics(), &mut rng).unwrap();
        for _ in 0..50 {
            let before = agent.mass();
            agent.swim(GRID, &mut rng).unwrap();
            assert!(agent.mass() <= before);
        }
    }

    #[test]
    fn exhausted_run_tumbles_without_moving() {
        let mut rng = create_rng(10);
        let mut agent = Agent::new(4, 6, 1.5, fast_kinetics(), &mut rng).unwrap();
        agent.set_motion(1.0, 0);
        let mass_before = agent.mass();

        let motion = agent.swim(GRID, &mut rng).unwrap();

        assert_eq!(motion, Motion::Tumbled);
        assert_eq!(agent.position(), (4, 6));
        assert_eq!(agent.mass(), mass_before);
        assert!((0.0..TAU).contains(&agent.heading()));
    }

    #[test]
    fn run_lengths_average_to_the_configured_mean() {
        let kinetics = default_kinetics();
        let mut rng = create_rng(11);
        let draws = 4000;
        let total: u64 = (0..draws)
            .map(|_| kinetics.draw_run_length(&mut rng) as u64)
            .sum();
        let mean = total as f64 / draws as f64;
        assert!((9.5..10.5).contains(&mean), "mean run length {mean}");
    }

    #[test]
    fn swim_faults_when_work_exhausts_mass() {
        let mut rng = create_rng(12);
        let kinetics = kinetics_with(KineticParams {
            f_d: 100.0,
            delta_h: 0.001,
            ..KineticParams::default()
        });
        let mut agent = Agent::new(5, 5, 1.5, kinetics, &mut rng).unwrap();
        agent.set_motion(0.0, 5);
        assert!(matches!(
            agent.swim(GRID, &mut rng),
            Err(AgentFault::NonPositiveMass { .. })
        ));
        // The rejected update leaves the agent as it was.
        assert!((agent.mass() - 1.5).abs() < f64::EPSILON);
        assert_eq!(agent.position(), (5, 5));
        assert_eq!(agent.run_remaining(), 5);
        assert_derived_consistent(&agent);
    }

    #[test]
    fn replicate_fires_at_the_inclusive_division_mass() {
        let mut rng = create_rng(13);
        let kinetics = default_kinetics();
        let m_max = kinetics.m_max();

        let mut below = Agent::new(5, 5, m_max - 1e-9, Arc::clone(&kinetics), &mut rng).unwrap();
        assert!(below.replicate(GRID, &mut rng).unwrap().is_none());
        assert!((below.mass() - (m_max - 1e-9)).abs() < f64::EPSILON);

        let mut at = Agent::new(5, 5, m_max, kinetics, &mut rng).unwrap();
        assert!(at.replicate(GRID, &mut rng).unwrap().is_some());
    }

    #[test]
    fn replicate_halves_mass_and_lands_on_a_moore_neighbour() {
        let mut rng = create_rng(14);
        let kinetics = default_kinetics();
        for _ in 0..64 {
            let mass = 2.0 + rng.random_range(0.0..1.0);
            let mut parent = Agent::new(5, 5, mass, Arc::clone(&kinetics), &mut rng).unwrap();
            let daughter = parent.replicate(GRID, &mut rng).unwrap().expect("should divide");

            assert!((parent.mass() - mass / 2.0).abs() < 1e-12);
            assert!((daughter.mass() - mass / 2.0).abs() < 1e-12);
            assert_derived_consistent(&parent);
            assert_derived_consistent(&daughter);
            assert!(Arc::ptr_eq(parent.kinetics(), daughter.kinetics()));

            let dx = daughter.x() as i64 - parent.x() as i64;
            let dy = daughter.y() as i64 - parent.y() as i64;
            assert!(dx.abs() <= 1 && dy.abs() <= 1);
            assert!(dx != 0 || dy != 0);
        }
    }

    #[test]
    fn replicate_clamps_daughter_into_the_grid() {
        let mut rng = create_rng(15);
        let kinetics = default_kinetics();
        for _ in 0..32 {
            let mut parent = Agent::new(0, 0, 2.0, Arc::clone(&kinetics), &mut rng).unwrap();
            let daughter = parent.replicate(GRID, &mut rng).unwrap().expect("should divide");
            assert!(daughter.x() <= 1 && daughter.y() <= 1);
        }
    }

    #[test]
    fn moore_offsets_cover_all_eight_directions() {
        let mut rng = create_rng(16);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..500 {
            seen.insert(moore_offset(&mut rng));
        }
        assert_eq!(seen.len(), 8);
        assert!(!seen.contains(&(0, 0)));
    }
}
