use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Rounding applied to the continuous displacement `v·cosθ`, `v·sinθ` before it
/// is converted to whole grid cells.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DisplacementRounding {
    /// Ties go to the even neighbour (`0.5 -> 0`, `1.5 -> 2`).
    #[default]
    HalfEven,
    /// Ties go away from zero (`0.5 -> 1`, `-0.5 -> -1`).
    HalfAwayFromZero,
}

impl DisplacementRounding {
    pub fn apply(self, value: f64) -> f64 {
        match self {
            DisplacementRounding::HalfEven => value.round_ties_even(),
            DisplacementRounding::HalfAwayFromZero => value.round(),
        }
    }
}

/// Biophysical parameters shared by every agent of a run.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct KineticParams {
    /// Maximum specific uptake rate of the Michaelis–Menten term.
    pub r_max: f64,
    /// Half-saturation concentration.
    #[serde(alias = "K_m")]
    pub k_m: f64,
    /// Minimum mass required for motility. The division mass is `2 * m_min`.
    pub m_min: f64,
    /// Energy yield per unit mass, used to convert mechanical work into mass loss.
    #[serde(alias = "delta_H")]
    pub delta_h: f64,
    /// Propulsive force of the flagellar motor.
    #[serde(alias = "F_d")]
    pub f_d: f64,
    /// Viscosity of the medium.
    pub mu: f64,
    /// Fraction of uptake converted into biomass.
    pub p: f64,
    /// Mass per unit area of a cell.
    pub density: f64,
}

impl Default for KineticParams {
    fn default() -> Self {
        Self {
            r_max: 0.0498,
            k_m: 0.25,
            m_min: 1.0,
            delta_h: 10.0,
            f_d: 0.5,
            mu: 0.8,
            p: 0.01,
            density: 0.08,
        }
    }
}

/// The five dimensionless groups that characterise a parameter set.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct DimensionlessGroups {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
}

impl KineticParams {
    pub fn m_max(&self) -> f64 {
        2.0 * self.m_min
    }

    pub fn radius_for_mass(&self, mass: f64) -> f64 {
        (mass / self.density / PI).sqrt()
    }

    /// Terminal velocity of a cell of the given radius under Stokes drag.
    pub fn velocity_for_radius(&self, radius: f64) -> f64 {
        self.f_d / (4.0 * PI * self.mu * radius)
    }

    /// Scale-free groups evaluated at the smallest motile cell.
    pub fn dimensionless_groups(&self, c_max: f64, d_c: f64) -> DimensionlessGroups {
        let r_min = self.radius_for_mass(self.m_min);
        let v_max = self.velocity_for_radius(r_min);
        DimensionlessGroups {
            a: self.k_m / c_max,
            b: (self.r_max * r_min) / (c_max * v_max),
            c: (r_min * self.p * self.r_max) / (v_max * self.density),
            d: d_c / (r_min * v_max),
            e: (self.f_d * r_min) / (self.m_min * self.delta_h),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ColonyConfig {
    /// Deterministic seed for reproducible runs; `reset` reseeds from it.
    pub seed: u64,
    /// Edge length of the square nutrient grid, in cells.
    pub grid_size: usize,
    /// Initial (and maximum) nutrient concentration of every cell.
    pub c_max: f64,
    /// Diffusion coefficient of the nutrient.
    pub d_c: f64,
    /// Integration time step of the diffusion operator.
    pub dt: f64,
    /// Number of agents placed around the grid centre on reset.
    pub num_agents: usize,
    /// Half-width of the uniform jitter around the centre for initial placement.
    pub initial_jitter: usize,
    /// Mean of the Poisson distribution that run lengths are drawn from.
    pub persistence_mean: f64,
    pub rounding: DisplacementRounding,
    pub kinetics: KineticParams,
}

impl Default for ColonyConfig {
    fn default() -> Self {
        Self {
            seed: 2_246_357_572,
            grid_size: 500,
            c_max: 1.0,
            d_c: 0.0498,
            dt: 1.0,
            num_agents: 1,
            initial_jitter: crate::constants::DEFAULT_INITIAL_JITTER,
            persistence_mean: crate::constants::DEFAULT_PERSISTENCE_MEAN,
            rounding: DisplacementRounding::HalfEven,
            kinetics: KineticParams::default(),
        }
    }
}

macro_rules! define_config_error {
    (
        $(
            $variant:ident $( { $($field:ident : $type:ty),* } )? => $fmt:literal $(, $arg:expr)*
        );* $(;)?
    ) => {
        #[derive(Debug, Clone, PartialEq)]
        pub enum ConfigError {
            $(
                $variant $( { $($field : $type),* } )?,
            )*
        }

        impl std::fmt::Display for ConfigError {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        Self::$variant $( { $($field),* } )? => write!(f, $fmt $(, $arg)*),
                    )*
                }
            }
        }
    };
}

define_config_error! {
    InvalidGridSize => "grid_size must be greater than 0";
    GridSizeTooLarge { max: usize, actual: usize } => "grid_size ({actual}) exceeds supported maximum ({max})";
    InvalidCMax => "c_max must be positive and finite";
    InvalidDiffusionCoefficient => "d_c must be positive and finite";
    InvalidDt => "dt must be positive and finite";
    UnstableDiffusion { ratio: f64, limit: f64 } => "dt * d_c ({ratio}) exceeds the explicit diffusion stability limit ({limit})";
    TooManyInitialAgents { max: usize, actual: usize } => "num_agents ({actual}) exceeds supported maximum ({max})";
    InvalidPersistenceMean => "persistence_mean must be positive and finite";
    InvalidRMax => "kinetics.r_max must be positive and finite";
    InvalidKm => "kinetics.k_m must be positive and finite";
    InvalidMMin => "kinetics.m_min must be positive and finite";
    InvalidDeltaH => "kinetics.delta_h must be positive and finite";
    InvalidDragForce => "kinetics.f_d must be positive and finite";
    InvalidViscosity => "kinetics.mu must be positive and finite";
    InvalidYield => "kinetics.p must be positive and finite";
    InvalidDensity => "kinetics.density must be positive and finite";
}

impl std::error::Error for ConfigError {}

fn positive_finite(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

impl ColonyConfig {
    pub const MAX_GRID_SIZE: usize = crate::constants::MAX_GRID_SIZE;

    pub const MAX_INITIAL_AGENTS: usize = crate::constants::MAX_INITIAL_AGENTS;

    pub const DIFFUSION_STABILITY_LIMIT: f64 = crate::constants::DIFFUSION_STABILITY_LIMIT;

    /// `dt * D_c`, the quantity bounded by the stability limit.
    pub fn diffusion_number(&self) -> f64 {
        self.dt * self.d_c
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_grid()?;
        self.validate_diffusion()?;
        self.validate_population()?;
        self.validate_motility()?;
        self.validate_kinetics()?;
        Ok(())
    }

    fn validate_grid(&self) -> Result<(), ConfigError> {
        if self.grid_size == 0 {
            return Err(ConfigError::InvalidGridSize);
        }
        if self.grid_size > Self::MAX_GRID_SIZE {
            return Err(ConfigError::GridSizeTooLarge {
                max: Self::MAX_GRID_SIZE,
                actual: self.grid_size,
            });
        }
        if !positive_finite(self.c_max) {
            return Err(ConfigError::InvalidCMax);
        }
        Ok(())
    }

    fn validate_diffusion(&self) -> Result<(), ConfigError> {
        if !positive_finite(self.d_c) {
            return Err(ConfigError::InvalidDiffusionCoefficient);
        }
        if !positive_finite(self.dt) {
            return Err(ConfigError::InvalidDt);
        }
        let ratio = self.diffusion_number();
        if ratio > Self::DIFFUSION_STABILITY_LIMIT {
            return Err(ConfigError::UnstableDiffusion {
                ratio,
                limit: Self::DIFFUSION_STABILITY_LIMIT,
            });
        }
        Ok(())
    }

    fn validate_population(&self) -> Result<(), ConfigError> {
        if self.num_agents > Self::MAX_INITIAL_AGENTS {
            return Err(ConfigError::TooManyInitialAgents {
                max: Self::MAX_INITIAL_AGENTS,
                actual: self.num_agents,
            });
        }
        Ok(())
    }

    fn validate_motility(&self) -> Result<(), ConfigError> {
        if !positive_finite(self.persistence_mean) {
            return Err(ConfigError::InvalidPersistenceMean);
        }
        Ok(())
    }

    fn validate_kinetics(&self) -> Result<(), ConfigError> {
        let k = &self.kinetics;
        if !positive_finite(k.r_max) {
            return Err(ConfigError::InvalidRMax);
        }
        if !positive_finite(k.k_m) {
            return Err(ConfigError::InvalidKm);
        }
        if !positive_finite(k.m_min) {
            return Err(ConfigError::InvalidMMin);
        }
        if !positive_finite(k.delta_h) {
            return Err(ConfigError::InvalidDeltaH);
        }
        if !positive_finite(k.f_d) {
            return Err(ConfigError::InvalidDragForce);
        }
        if !positive_finite(k.mu) {
            return Err(ConfigError::InvalidViscosity);
        }
        if !positive_finite(k.p) {
            return Err(ConfigError::InvalidYield);
        }
        if !positive_finite(k.density) {
            return Err(ConfigError::InvalidDensity);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stable_config() -> ColonyConfig {
        ColonyConfig {
            grid_size: 10,
            d_c: 0.05,
            dt: 0.2,
            ..ColonyConfig::default()
        }
    }

    #[test]
    fn default_config_is_valid() {
        assert_eq!(ColonyConfig::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_zero_grid_size() {
        let config = ColonyConfig {
            grid_size: 0,
            ..stable_config()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidGridSize));
    }

    #[test]
    fn rejects_oversized_grid() {
        let config = ColonyConfig {
            grid_size: ColonyConfig::MAX_GRID_SIZE + 1,
            ..stable_config()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::GridSizeTooLarge { .. })
        ));
    }

    #[test]
    fn rejects_unstable_diffusion_number() {
        let config = ColonyConfig {
            d_c: 0.5,
            dt: 1.0,
            ..stable_config()
        };
        match config.validate() {
            Err(ConfigError::UnstableDiffusion { ratio, limit }) => {
                assert!((ratio - 0.5).abs() < 1e-12);
                assert!((limit - 0.25).abs() < 1e-12);
            }
            other => panic!("expected UnstableDiffusion, got {other:?}"),
        }
    }

    #[test]
    fn accepts_diffusion_number_at_the_limit() {
        let config = ColonyConfig {
            d_c: 0.25,
            dt: 1.0,
            ..stable_config()
        };
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn rejects_non_finite_time_step() {
        let config = ColonyConfig {
            dt: f64::NAN,
            ..stable_config()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidDt));
    }

    #[test]
    fn rejects_non_positive_kinetics() {
        let mut config = stable_config();
        config.kinetics.density = 0.0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidDensity));

        let mut config = stable_config();
        config.kinetics.m_min = -1.0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidMMin));

        let mut config = stable_config();
        config.kinetics.mu = f64::INFINITY;
        assert_eq!(config.validate(), Err(ConfigError::InvalidViscosity));
    }

    #[test]
    fn rejects_non_positive_persistence_mean() {
        let config = ColonyConfig {
            persistence_mean: 0.0,
            ..stable_config()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidPersistenceMean));
    }

    #[test]
    fn division_mass_is_twice_the_motility_threshold() {
        let kinetics = KineticParams {
            m_min: 1.5,
            ..KineticParams::default()
        };
        assert!((kinetics.m_max() - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rounding_modes_differ_only_on_ties() {
        assert_eq!(DisplacementRounding::HalfEven.apply(0.5), 0.0);
        assert_eq!(DisplacementRounding::HalfAwayFromZero.apply(0.5), 1.0);
        assert_eq!(DisplacementRounding::HalfEven.apply(-2.5), -2.0);
        assert_eq!(DisplacementRounding::HalfAwayFromZero.apply(-2.5), -3.0);
        assert_eq!(DisplacementRounding::HalfEven.apply(0.7), 1.0);
        assert_eq!(DisplacementRounding::HalfAwayFromZero.apply(0.7), 1.0);
    }

    #[test]
    fn dimensionless_groups_match_hand_computation() {
        let kinetics = KineticParams::default();
        let groups = kinetics.dimensionless_groups(1.0, 0.0498);
        let r_min = (1.0f64 / 0.08 / PI).sqrt();
        let v_max = 0.5 / (4.0 * PI * 0.8 * r_min);
        assert!((groups.a - 0.25).abs() < 1e-12);
        assert!((groups.b - 0.0498 * r_min / v_max).abs() < 1e-12);
        assert!((groups.d - 0.0498 / (r_min * v_max)).abs() < 1e-12);
        assert!((groups.e - 0.5 * r_min / 10.0).abs() < 1e-12);
    }

    #[test]
    fn partial_config_json_deserializes_with_defaults() {
        let json = r#"{
            "grid_size": 64,
            "d_c": 0.1,
            "kinetics": { "K_m": 0.5, "delta_H": 12.0 }
        }"#;
        let config: ColonyConfig = serde_json::from_str(json).expect("partial config should parse");
        assert_eq!(config.grid_size, 64);
        assert!((config.kinetics.k_m - 0.5).abs() < f64::EPSILON);
        assert!((config.kinetics.delta_h - 12.0).abs() < f64::EPSILON);
        assert!((config.kinetics.r_max - KineticParams::default().r_max).abs() < f64::EPSILON);
        assert_eq!(config.rounding, DisplacementRounding::HalfEven);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn enum_fields_use_snake_case_names() {
        let json = r#"{ "rounding": "half_away_from_zero" }"#;
        let config: ColonyConfig = serde_json::from_str(json).expect("enum names should parse");
        assert_eq!(config.rounding, DisplacementRounding::HalfAwayFromZero);
    }
}
