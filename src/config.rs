//! # Configuración del Simulador
//!
//! Parámetros de una corrida: cargadores, estaciones, fallas, horizonte y
//! semilla. Los valores por defecto reproducen la planta de referencia: diez
//! trabajadores y cinco máquinas por estación durante diez días de tres turnos.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::failure::FailureConfig;
use crate::station::{LoaderConfig, Stage, StationConfig};

/// Duración de un turno (minutos).
pub const SHIFT_LENGTH: f64 = 480.0;

/// Turnos por día.
pub const SHIFTS_PER_DAY: u32 = 3;

/// Días simulados por defecto.
pub const DAYS: u32 = 10;

/// Horizonte por defecto: `SHIFT_LENGTH * SHIFTS_PER_DAY * DAYS`.
pub const DEFAULT_HORIZON: f64 = SHIFT_LENGTH * (SHIFTS_PER_DAY * DAYS) as f64;

/// Trabajadores por estación en la planta de referencia.
pub const DEFAULT_WORKERS: usize = 10;

/// Máquinas por estación en la planta de referencia.
pub const DEFAULT_CAPACITY: usize = 5;

/// Configuración de los cargadores por defecto.
pub fn default_loader() -> LoaderConfig {
    LoaderConfig {
        count: 10,
        loading_time: 2.0,
    }
}

/// Configuración de las estaciones por defecto, en orden de la línea.
pub fn default_station_configs() -> Vec<StationConfig> {
    [
        (Stage::Machining, 7.0),
        (Stage::Molding, 5.0),
        (Stage::Assembly, 6.0),
        (Stage::Inspection, 2.0),
        (Stage::Packaging, 3.0),
    ]
    .into_iter()
    .map(|(stage, service_time)| StationConfig {
        stage,
        workers: DEFAULT_WORKERS,
        capacity: DEFAULT_CAPACITY,
        service_time,
    })
    .collect()
}

/// Fallas por defecto: solo las estaciones con maquinaria pesada.
pub fn default_failures() -> Vec<FailureConfig> {
    vec![
        FailureConfig {
            stage: Stage::Machining,
            rate: 0.001,
            repair_time: 30.0,
        },
        FailureConfig {
            stage: Stage::Molding,
            rate: 0.00125,
            repair_time: 25.0,
        },
        FailureConfig {
            stage: Stage::Assembly,
            rate: 0.00083,
            repair_time: 20.0,
        },
    ]
}

/// Configuración completa de una corrida.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub loader: LoaderConfig,
    pub stations: Vec<StationConfig>,
    pub failures: Vec<FailureConfig>,
    /// Tiempo simulado máximo
    pub horizon: f64,
    /// Semilla de la fuente aleatoria; si falta se sortea una y se reporta
    pub seed: Option<u64>,
    /// Unidades terminadas tras las cuales se cancela la corrida
    pub target_units: Option<u64>,
    /// Conservar la traza de transiciones en el resultado
    pub trace: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            loader: default_loader(),
            stations: default_station_configs(),
            failures: default_failures(),
            horizon: DEFAULT_HORIZON,
            seed: None,
            target_units: None,
            trace: false,
        }
    }
}

impl SimulationConfig {
    /// Lee una configuración en JSON. Los campos ausentes toman el valor por
    /// defecto.
    ///
    /// # Errors
    ///
    /// `ConfigError::Parse` si el texto no es una configuración válida.
    /// No valida los valores; para eso está [`SimulationConfig::validate`].
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_horizon(mut self, horizon: f64) -> Self {
        self.horizon = horizon;
        self
    }

    pub fn with_target_units(mut self, target: u64) -> Self {
        self.target_units = Some(target);
        self
    }

    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    pub fn with_loader(mut self, loader: LoaderConfig) -> Self {
        self.loader = loader;
        self
    }

    /// Reemplaza la configuración de la estación `station.stage`.
    pub fn with_station(mut self, station: StationConfig) -> Self {
        match self.stations.iter_mut().find(|s| s.stage == station.stage) {
            Some(existing) => *existing = station,
            None => self.stations.push(station),
        }
        self
    }

    /// Reemplaza (o agrega) el inyector de fallas de `failure.stage`.
    pub fn with_failure(mut self, failure: FailureConfig) -> Self {
        match self.failures.iter_mut().find(|f| f.stage == failure.stage) {
            Some(existing) => *existing = failure,
            None => self.failures.push(failure),
        }
        self
    }

    /// Quita todos los inyectores de fallas.
    pub fn without_failures(mut self) -> Self {
        self.failures.clear();
        self
    }

    /// Configuración de una estación, si existe.
    pub fn station(&self, stage: Stage) -> Option<&StationConfig> {
        self.stations.iter().find(|s| s.stage == stage)
    }

    /// Valida la configuración antes de construir la simulación.
    ///
    /// # Errors
    ///
    /// El primer `ConfigError` encontrado.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use manufacturing_line_simulator::{ConfigError, SimulationConfig};
    ///
    /// assert!(SimulationConfig::default().validate().is_ok());
    /// assert_eq!(
    ///     SimulationConfig::default().with_horizon(0.0).validate(),
    ///     Err(ConfigError::NonPositiveHorizon(0.0))
    /// );
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive_finite(self.horizon).ok_or(ConfigError::NonPositiveHorizon(self.horizon))?;
        if self.target_units == Some(0) {
            return Err(ConfigError::ZeroTargetUnits);
        }

        if self.loader.count == 0 {
            return Err(ConfigError::NoLoaders);
        }
        check_duration("loading_time", self.loader.loading_time)?;

        let mut seen = BTreeSet::new();
        for station in &self.stations {
            if !seen.insert(station.stage) {
                return Err(ConfigError::DuplicateStation {
                    stage: station.stage,
                });
            }
            if station.workers == 0 {
                return Err(ConfigError::NoWorkers {
                    stage: station.stage,
                });
            }
            if station.capacity == 0 {
                return Err(ConfigError::NonPositiveCapacity {
                    name: station.stage.machine_name().to_string(),
                });
            }
            check_duration(
                &format!("{}.service_time", station.stage.key()),
                station.service_time,
            )?;
        }
        if let Some(stage) = Stage::ALL.into_iter().find(|stage| !seen.contains(stage)) {
            return Err(ConfigError::MissingStation { stage });
        }

        let mut vulnerable = BTreeSet::new();
        for failure in &self.failures {
            if !vulnerable.insert(failure.stage) {
                return Err(ConfigError::DuplicateFailure {
                    stage: failure.stage,
                });
            }
            positive_finite(failure.rate).ok_or(ConfigError::NonPositiveRate {
                stage: failure.stage,
                rate: failure.rate,
            })?;
            check_duration(
                &format!("{}.repair_time", failure.stage.key()),
                failure.repair_time,
            )?;
        }

        Ok(())
    }
}

fn positive_finite(value: f64) -> Option<f64> {
    (value.is_finite() && value > 0.0).then_some(value)
}

fn check_duration(what: &str, value: f64) -> Result<(), ConfigError> {
    positive_finite(value)
        .map(|_| ())
        .ok_or_else(|| ConfigError::NonPositiveDuration {
            what: what.to_string(),
            value,
        })
}
