//! Named single-parameter edits used by the reconfigure entry point.

use crate::config::ColonyConfig;
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParamKey {
    RMax,
    Km,
    MMin,
    DeltaH,
    Fd,
    Mu,
    P,
    Density,
    DiffusionCoefficient,
    TimeStep,
    CMax,
    PersistenceMean,
    NumAgents,
    GridSize,
    InitialJitter,
    Seed,
}

impl ParamKey {
    pub const ALL: [ParamKey; 16] = [
        ParamKey::RMax,
        ParamKey::Km,
        ParamKey::MMin,
        ParamKey::DeltaH,
        ParamKey::Fd,
        ParamKey::Mu,
        ParamKey::P,
        ParamKey::Density,
        ParamKey::DiffusionCoefficient,
        ParamKey::TimeStep,
        ParamKey::CMax,
        ParamKey::PersistenceMean,
        ParamKey::NumAgents,
        ParamKey::GridSize,
        ParamKey::InitialJitter,
        ParamKey::Seed,
    ];

    /// Canonical key, matching the JSON field name in [`ColonyConfig`].
    pub fn name(self) -> &'static str {
        match self {
            ParamKey::RMax => "r_max",
            ParamKey::Km => "k_m",
            ParamKey::MMin => "m_min",
            ParamKey::DeltaH => "delta_h",
            ParamKey::Fd => "f_d",
            ParamKey::Mu => "mu",
            ParamKey::P => "p",
            ParamKey::Density => "density",
            ParamKey::DiffusionCoefficient => "d_c",
            ParamKey::TimeStep => "dt",
            ParamKey::CMax => "c_max",
            ParamKey::PersistenceMean => "persistence_mean",
            ParamKey::NumAgents => "num_agents",
            ParamKey::GridSize => "grid_size",
            ParamKey::InitialJitter => "initial_jitter",
            ParamKey::Seed => "seed",
        }
    }

    /// Keys that take a non-negative integer rather than a real number.
    pub fn is_count(self) -> bool {
        matches!(
            self,
            ParamKey::NumAgents | ParamKey::GridSize | ParamKey::InitialJitter | ParamKey::Seed
        )
    }
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ParamKey {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim();
        let alias = match key {
            "K_m" => Some(ParamKey::Km),
            "delta_H" => Some(ParamKey::DeltaH),
            "F_d" => Some(ParamKey::Fd),
            "D_c" => Some(ParamKey::DiffusionCoefficient),
            "time_step" => Some(ParamKey::TimeStep),
            "C_max" => Some(ParamKey::CMax),
            _ => None,
        };
        alias
            .or_else(|| ParamKey::ALL.into_iter().find(|k| k.name() == key))
            .ok_or_else(|| ParamError::UnknownKey {
                key: key.to_string(),
            })
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ParamValue {
    Real(f64),
    Count(u64),
}

/// A `key=value` edit to one configuration parameter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParamChange {
    pub key: ParamKey,
    pub value: ParamValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParamError {
    UnknownKey { key: String },
    MalformedAssignment { input: String },
    InvalidValue { key: ParamKey, value: String },
}

impl fmt::Display for ParamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamError::UnknownKey { key } => write!(f, "unknown parameter key: {key}"),
            ParamError::MalformedAssignment { input } => {
                write!(f, "expected key=value, got {input:?}")
            }
            ParamError::InvalidValue { key, value } => {
                if key.is_count() {
                    write!(f, "{key} expects a non-negative integer, got {value:?}")
                } else {
                    write!(f, "{key} expects a real number, got {value:?}")
                }
            }
        }
    }
}

impl std::error::Error for ParamError {}

impl ParamChange {
    pub fn real(key: ParamKey, value: f64) -> Self {
        Self {
            key,
            value: ParamValue::Real(value),
        }
    }

    pub fn count(key: ParamKey, value: u64) -> Self {
        Self {
            key,
            value: ParamValue::Count(value),
        }
    }

    /// Write the value into `config`. Range checks are left to [`ColonyConfig::validate`].
    pub fn apply_to(&self, config: &mut ColonyConfig) -> Result<(), ParamError> {
        let kinetics = &mut config.kinetics;
        match self.key {
            ParamKey::RMax => kinetics.r_max = self.real_value(),
            ParamKey::Km => kinetics.k_m = self.real_value(),
            ParamKey::MMin => kinetics.m_min = self.real_value(),
            ParamKey::DeltaH => kinetics.delta_h = self.real_value(),
            ParamKey::Fd => kinetics.f_d = self.real_value(),
            ParamKey::Mu => kinetics.mu = self.real_value(),
            ParamKey::P => kinetics.p = self.real_value(),
            ParamKey::Density => kinetics.density = self.real_value(),
            ParamKey::DiffusionCoefficient => config.d_c = self.real_value(),
            ParamKey::TimeStep => config.dt = self.real_value(),
            ParamKey::CMax => config.c_max = self.real_value(),
            ParamKey::PersistenceMean => config.persistence_mean = self.real_value(),
            ParamKey::NumAgents => config.num_agents = self.count_usize()?,
            ParamKey::GridSize => config.grid_size = self.count_usize()?,
            ParamKey::InitialJitter => config.initial_jitter = self.count_usize()?,
            ParamKey::Seed => config.seed = self.count_value()?,
        }
        Ok(())
    }

    fn real_value(&self) -> f64 {
        match self.value {
            ParamValue::Real(v) => v,
            ParamValue::Count(n) => n as f64,
        }
    }

    fn count_value(&self) -> Result<u64, ParamError> {
        match self.value {
            ParamValue::Count(n) => Ok(n),
            ParamValue::Real(_) => Err(self.invalid_value()),
        }
    }

    fn count_usize(&self) -> Result<usize, ParamError> {
        usize::try_from(self.count_value()?).map_err(|_| self.invalid_value())
    }

    fn invalid_value(&self) -> ParamError {
        let value = match self.value {
            ParamValue::Real(v) => v.to_string(),
            ParamValue::Count(n) => n.to_string(),
        };
        ParamError::InvalidValue {
            key: self.key,
            value,
        }
    }
}

impl FromStr for ParamChange {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, raw) = s
            .split_once('=')
            .ok_or_else(|| ParamError::MalformedAssignment {
                input: s.to_string(),
            })?;
        let key: ParamKey = key.parse()?;
        let raw = raw.trim();
        let invalid = || ParamError::InvalidValue {
            key,
            value: raw.to_string(),
        };
        let value = if key.is_count() {
            ParamValue::Count(raw.parse().map_err(|_| invalid())?)
        } else {
            ParamValue::Real(raw.parse().map_err(|_| invalid())?)
        };
        Ok(Self { key, value })
    }
}
