//! # Módulo de Errores
//!
//! Taxonomía de errores del simulador. Los errores de configuración se
//! detectan antes de arrancar la simulación; los de estadísticas se
//! entregan al generar el reporte final.

use crate::station::Stage;

/// Configuración rechazada antes de iniciar la simulación.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("La estación {stage} debe tener al menos un trabajador")]
    NoWorkers { stage: Stage },

    #[error("Debe haber al menos un cargador de materia prima")]
    NoLoaders,

    #[error("El recurso '{name}' debe tener capacidad positiva")]
    NonPositiveCapacity { name: String },

    #[error("La duración '{what}' debe ser finita y positiva (recibido {value})")]
    NonPositiveDuration { what: String, value: f64 },

    #[error("La tasa de fallas de {stage} debe ser finita y positiva (recibido {rate})")]
    NonPositiveRate { stage: Stage, rate: f64 },

    #[error("El horizonte de simulación debe ser finito y positivo (recibido {0})")]
    NonPositiveHorizon(f64),

    #[error("La meta de unidades terminadas debe ser positiva")]
    ZeroTargetUnits,

    #[error("La estación {stage} está configurada más de una vez")]
    DuplicateStation { stage: Stage },

    #[error("Falta la configuración de la estación {stage}")]
    MissingStation { stage: Stage },

    #[error("La estación {stage} tiene más de un inyector de fallas")]
    DuplicateFailure { stage: Stage },

    #[error("No se pudo leer la configuración: {0}")]
    Parse(String),
}

/// Promedio solicitado sobre una estación sin muestras registradas.
///
/// Es un resultado reportable: el horizonte fue demasiado corto para que la
/// estación completara siquiera una unidad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StatisticsError {
    #[error("Sin datos: la estación {stage} no registró ninguna duración")]
    Empty { stage: Stage },
}

/// Errores del motor de simulación.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimulationError {
    #[error("Configuración inválida: {0}")]
    Config(#[from] ConfigError),

    #[error("Retardo inválido: {delay} (debe ser finito y no negativo)")]
    InvalidDelay { delay: f64 },

    #[error("Recurso desconocido: {0}")]
    UnknownResource(usize),

    #[error("Buffer desconocido: {0}")]
    UnknownBuffer(usize),

    #[error("Proceso desconocido: {0}")]
    UnknownProcess(usize),

    #[error("'{actor}' fue despachado sin una condición de espera resuelta")]
    NoPendingWakeup { actor: String },

    #[error("'{actor}' terminó reteniendo {held} unidad(es) sin liberar")]
    UnitLeaked { actor: String, held: usize },

    #[error("Instante inválido: {value} (debe ser finito y no negativo)")]
    InvalidTime { value: f64 },

    #[error("'{actor}' esperaba {expected} pero fue reanudado con {got}")]
    UnexpectedWakeup {
        actor: String,
        expected: &'static str,
        got: &'static str,
    },
}
