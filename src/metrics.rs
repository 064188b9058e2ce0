//! # Módulo de Métricas y Reportes
//!
//! Este módulo define el acumulador de resultados de una corrida
//! (`SimulationResult`) y se encarga de calcular los promedios por estación y
//! de generar los reportes finales en texto y CSV.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::environment::RunSummary;
use crate::error::StatisticsError;
use crate::scheduler::SimTime;
use crate::station::Stage;

/// Secuencia, solo de agregado, de las duraciones de servicio observadas en
/// una estación.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageStatistics {
    stage: Stage,
    samples: Vec<f64>,
}

impl StageStatistics {
    /// Crea una secuencia vacía para la estación.
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            samples: Vec::new(),
        }
    }

    /// Estación a la que pertenecen las muestras.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Agrega una duración observada.
    pub fn record(&mut self, duration: f64) {
        self.samples.push(duration);
    }

    /// Duraciones en orden de registro.
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Número de muestras.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// `true` si la estación no completó ninguna unidad.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Media aritmética de las duraciones.
    ///
    /// # Errors
    ///
    /// `StatisticsError::Empty` si no hay muestras; nunca se reporta cero ni
    /// `NaN` en ese caso.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use manufacturing_line_simulator::{Stage, StageStatistics};
    ///
    /// let mut stats = StageStatistics::new(Stage::Assembly);
    /// assert!(stats.mean().is_err());
    ///
    /// for _ in 0..3 {
    ///     stats.record(6.0);
    /// }
    /// assert_eq!(stats.mean(), Ok(6.0));
    /// ```
    pub fn mean(&self) -> Result<f64, StatisticsError> {
        if self.samples.is_empty() {
            return Err(StatisticsError::Empty { stage: self.stage });
        }
        Ok(self.samples.iter().sum::<f64>() / self.samples.len() as f64)
    }
}

/// Tipo de transición observable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraceKind {
    /// Un cargador depositó materia prima.
    Loaded,
    /// Un trabajador terminó el servicio en su estación.
    Completed(Stage),
    /// Una máquina de la estación quedó fuera de servicio.
    Failed(Stage),
    /// La máquina averiada fue reparada.
    Repaired(Stage),
}

impl fmt::Display for TraceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loaded => write!(f, "Raw materials loaded"),
            Self::Completed(stage) => write!(f, "{} finished", stage.activity()),
            Self::Failed(_) => write!(f, "Machine failed"),
            Self::Repaired(_) => write!(f, "Repaired"),
        }
    }
}

/// Registro de una transición: quién, qué y cuándo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRecord {
    pub time: SimTime,
    pub actor: String,
    pub kind: TraceKind,
}

impl fmt::Display for TraceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} at {}", self.actor, self.kind, self.time)
    }
}

/// Resultado de una corrida.
///
/// Pertenece a la invocación que ejecuta la simulación: los procesos lo
/// actualizan a través de su contexto y se devuelve al terminar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    /// Semilla usada por la fuente aleatoria (permite repetir la corrida).
    pub seed: u64,
    /// Unidades empacadas.
    pub finished_units: u64,
    stages: [StageStatistics; Stage::COUNT],
    /// Transiciones registradas, si se habilitó la traza.
    pub trace: Vec<TraceRecord>,
    /// Resumen del planificador al terminar.
    pub summary: Option<RunSummary>,
}

impl SimulationResult {
    /// Crea un resultado vacío.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            finished_units: 0,
            stages: Stage::ALL.map(StageStatistics::new),
            trace: Vec::new(),
            summary: None,
        }
    }

    /// Estadísticas de una estación.
    pub fn stage(&self, stage: Stage) -> &StageStatistics {
        &self.stages[stage.index()]
    }

    /// Estadísticas de una estación, para registrar muestras.
    pub fn stage_mut(&mut self, stage: Stage) -> &mut StageStatistics {
        &mut self.stages[stage.index()]
    }

    /// Estadísticas de todas las estaciones en orden de la línea.
    pub fn stages(&self) -> &[StageStatistics] {
        &self.stages
    }

    /// Promedio de duración por estación.
    pub fn mean(&self, stage: Stage) -> Result<f64, StatisticsError> {
        self.stage(stage).mean()
    }
}

/// Calculadora de reportes para los resultados de la simulación.
///
/// Proporciona métodos para generar reportes formateados de una corrida ya
/// terminada; no modifica el resultado.
pub struct MetricsCalculator;

impl MetricsCalculator {
    /// Crea una nueva instancia del calculador de métricas.
    pub fn new() -> Self {
        Self
    }

    /// Genera el reporte de resultados en texto.
    ///
    /// Las estaciones sin muestras se reportan como "sin datos".
    ///
    /// # Arguments
    ///
    /// * `result` - Resultado de la corrida
    ///
    /// # Returns
    ///
    /// String con el reporte formateado
    pub fn generate_report(&self, result: &SimulationResult) -> String {
        let mut report = String::new();

        report.push_str("\n=== REPORTE DE RESULTADOS ===\n\n");
        report.push_str(&format!("Semilla: {}\n", result.seed));
        if let Some(summary) = &result.summary {
            report.push_str(&format!(
                "Fin de la corrida: {} en t={} ({} eventos despachados, {} descartados)\n",
                summary.outcome, summary.final_time, summary.dispatched, summary.discarded
            ));
        }
        report.push_str(&format!(
            "Total de productos terminados: {}\n\n",
            result.finished_units
        ));

        report.push_str(&format!(
            "{:<12} {:>10} {:>18}\n",
            "Estación", "Muestras", "Tiempo promedio"
        ));
        report.push_str(&format!("{}\n", "-".repeat(42)));

        for stats in result.stages() {
            let mean = match stats.mean() {
                Ok(mean) => Self::format_time(mean),
                Err(_) => "sin datos".to_string(),
            };
            report.push_str(&format!(
                "{:<12} {:>10} {:>18}\n",
                stats.stage().to_string(),
                stats.len(),
                mean
            ));
        }

        report
    }

    /// Genera un reporte resumido en formato CSV.
    ///
    /// Una estación sin muestras deja la columna `Mean` vacía.
    pub fn generate_csv_report(&self, result: &SimulationResult) -> String {
        let mut csv = String::new();

        csv.push_str("Stage,Samples,Mean\n");
        for stats in result.stages() {
            let mean = stats
                .mean()
                .map(|mean| format!("{:.3}", mean))
                .unwrap_or_default();
            csv.push_str(&format!("{},{},{}\n", stats.stage().key(), stats.len(), mean));
        }
        csv.push_str(&format!("finished,{},\n", result.finished_units));

        csv
    }

    /// Formatea una duración en minutos simulados.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use manufacturing_line_simulator::MetricsCalculator;
    ///
    /// assert_eq!(MetricsCalculator::format_time(6.0), "6.00 min");
    /// ```
    pub fn format_time(minutes: f64) -> String {
        format!("{:.2} min", minutes)
    }
}

impl Default for MetricsCalculator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_of_constant_samples() {
        let mut stats = StageStatistics::new(Stage::Assembly);
        for _ in 0..3 {
            stats.record(6.0);
        }
        assert_eq!(stats.mean(), Ok(6.0));
    }

    #[test]
    fn test_mean_of_empty_stage_is_reported() {
        let stats = StageStatistics::new(Stage::Packaging);
        assert_eq!(
            stats.mean(),
            Err(StatisticsError::Empty {
                stage: Stage::Packaging
            })
        );
    }

    #[test]
    fn test_result_starts_empty_for_every_stage() {
        let result = SimulationResult::new(7);
        assert_eq!(result.finished_units, 0);
        assert_eq!(result.stages().len(), Stage::COUNT);
        for (stats, stage) in result.stages().iter().zip(Stage::ALL) {
            assert_eq!(stats.stage(), stage);
            assert!(stats.is_empty());
        }
    }

    #[test]
    fn test_report_marks_empty_stages() {
        let mut result = SimulationResult::new(1);
        result.stage_mut(Stage::Machining).record(7.0);
        result.finished_units = 0;

        let report = MetricsCalculator::new().generate_report(&result);
        assert!(report.contains("REPORTE DE RESULTADOS"));
        assert!(report.contains("7.00 min"));
        assert!(report.contains("sin datos"));
    }

    #[test]
    fn test_csv_has_one_line_per_stage() {
        let mut result = SimulationResult::new(1);
        result.stage_mut(Stage::Inspection).record(2.0);
        result.finished_units = 4;

        let csv = MetricsCalculator::new().generate_csv_report(&result);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 1 + Stage::COUNT + 1);
        assert_eq!(lines[0], "Stage,Samples,Mean");
        assert!(lines.contains(&"inspection,1,2.000"));
        assert!(lines.contains(&"packaging,0,"));
        assert_eq!(lines[Stage::COUNT + 1], "finished,4,");
    }

    #[test]
    fn test_format_time() {
        assert_eq!(MetricsCalculator::format_time(6.0), "6.00 min");
        assert_eq!(MetricsCalculator::format_time(2.456), "2.46 min");
    }

    #[test]
    fn test_trace_record_display() {
        let record = TraceRecord {
            time: SimTime::new(12.5).unwrap(),
            actor: "Machinist - 1".to_string(),
            kind: TraceKind::Completed(Stage::Machining),
        };
        assert_eq!(record.to_string(), "Machinist - 1 Machining finished at 12.50");
    }
}
