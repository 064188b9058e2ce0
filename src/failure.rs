//! # Módulo de Fallas de Máquinas
//!
//! Un inyector de fallas por estación vulnerable. Cada cierto tiempo,
//! distribuido exponencialmente según la tasa de fallas, solicita una unidad
//! del recurso de la estación exactamente como lo haría un trabajador y la
//! retiene durante el tiempo de reparación.
//!
//! Como compite en la misma cola FIFO que la producción, una falla solo puede
//! tomar una máquina ociosa o ser la siguiente en la cola: nunca interrumpe
//! un servicio en curso.

use std::mem;

use rand_distr::{Distribution, Exp};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, SimulationError};
use crate::metrics::TraceKind;
use crate::process::{Context, Process, Wait, Wakeup};
use crate::resource::{Held, ResourceId};
use crate::station::Stage;

/// Configuración de fallas de una estación.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FailureConfig {
    /// Estación vulnerable
    pub stage: Stage,
    /// Fallas esperadas por unidad de tiempo
    pub rate: f64,
    /// Tiempo que la máquina queda fuera de servicio
    pub repair_time: f64,
}

/// Proceso que simula las fallas de una estación.
pub struct FailureInjector {
    stage: Stage,
    machines: ResourceId,
    interarrival: Exp<f64>,
    repair_time: f64,
    phase: FailurePhase,
}

enum FailurePhase {
    Idle,
    Waiting,
    Requesting,
    Repairing(Held),
}

impl FailureInjector {
    /// Crea un inyector para la estación de `config` sobre `machines`.
    ///
    /// # Errors
    ///
    /// `ConfigError::NonPositiveRate` si la tasa no es finita y positiva.
    pub fn new(config: &FailureConfig, machines: ResourceId) -> Result<Self, ConfigError> {
        if !config.rate.is_finite() || config.rate <= 0.0 {
            return Err(ConfigError::NonPositiveRate {
                stage: config.stage,
                rate: config.rate,
            });
        }
        let interarrival = Exp::new(config.rate).map_err(|_| ConfigError::NonPositiveRate {
            stage: config.stage,
            rate: config.rate,
        })?;
        Ok(Self {
            stage: config.stage,
            machines,
            interarrival,
            repair_time: config.repair_time,
            phase: FailurePhase::Idle,
        })
    }

    fn wait_for_failure(&mut self, ctx: &mut Context<'_>) -> Result<Wait, SimulationError> {
        let delay = self.interarrival.sample(ctx.rng());
        self.phase = FailurePhase::Waiting;
        Ok(Wait::Timeout(delay))
    }
}

impl Process for FailureInjector {
    fn resume(&mut self, wakeup: Wakeup, ctx: &mut Context<'_>) -> Result<Wait, SimulationError> {
        match (mem::replace(&mut self.phase, FailurePhase::Idle), wakeup) {
            (FailurePhase::Idle, Wakeup::Start) => self.wait_for_failure(ctx),
            (FailurePhase::Waiting, Wakeup::Timer) => {
                self.phase = FailurePhase::Requesting;
                Ok(Wait::Request(self.machines))
            }
            (FailurePhase::Requesting, Wakeup::Granted(unit)) => {
                ctx.trace(TraceKind::Failed(self.stage));
                self.phase = FailurePhase::Repairing(unit);
                Ok(Wait::Timeout(self.repair_time))
            }
            (FailurePhase::Repairing(unit), Wakeup::Timer) => {
                ctx.trace(TraceKind::Repaired(self.stage));
                ctx.release(unit)?;
                self.wait_for_failure(ctx)
            }
            (FailurePhase::Idle, other) => Err(ctx.unexpected("inicio", &other)),
            (FailurePhase::Waiting | FailurePhase::Repairing(_), other) => {
                Err(ctx.unexpected("temporizador", &other))
            }
            (FailurePhase::Requesting, other) => Err(ctx.unexpected("unidad concedida", &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Environment;
    use crate::metrics::TraceRecord;
    use crate::process::from_fn;

    #[test]
    fn test_invalid_rate_is_rejected() {
        for rate in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let config = FailureConfig {
                stage: Stage::Molding,
                rate,
                repair_time: 25.0,
            };
            assert!(matches!(
                FailureInjector::new(&config, 0),
                Err(ConfigError::NonPositiveRate { stage: Stage::Molding, .. })
            ));
        }
    }

    #[test]
    fn test_failure_holds_machine_for_repair_time() {
        let mut env = Environment::new(11);
        env.enable_trace();
        let machines = env.add_resource("CNC Machine", 1).unwrap();
        let config = FailureConfig {
            stage: Stage::Machining,
            rate: 0.5,
            repair_time: 30.0,
        };
        env.spawn("CNC Machine", FailureInjector::new(&config, machines).unwrap())
            .unwrap();

        env.run(200.0).unwrap();

        let trace: Vec<&TraceRecord> = env.result().trace.iter().collect();
        assert!(trace.len() >= 2);
        for pair in trace.chunks_exact(2) {
            assert_eq!(pair[0].kind, TraceKind::Failed(Stage::Machining));
            assert_eq!(pair[1].kind, TraceKind::Repaired(Stage::Machining));
            let repair = pair[1].time.since(pair[0].time);
            assert!((repair - 30.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_failure_waits_for_service_in_progress() {
        let mut env = Environment::new(5);
        env.enable_trace();
        let machines = env.add_resource("CNC Machine", 1).unwrap();

        // El trabajador toma la única máquina en t=0 durante 50 unidades
        let mut unit = None;
        env.spawn(
            "Machinist - 1",
            from_fn(move |wakeup, ctx| match wakeup {
                Wakeup::Start => Ok(Wait::Request(machines)),
                Wakeup::Granted(held) => {
                    unit = Some(held);
                    Ok(Wait::Timeout(50.0))
                }
                Wakeup::Timer => {
                    ctx.trace(TraceKind::Completed(Stage::Machining));
                    if let Some(held) = unit.take() {
                        ctx.release(held)?;
                    }
                    Ok(Wait::Exit)
                }
                other => Err(ctx.unexpected("temporizador", &other)),
            }),
        )
        .unwrap();
        let config = FailureConfig {
            stage: Stage::Machining,
            rate: 10.0,
            repair_time: 5.0,
        };
        env.spawn("CNC Machine", FailureInjector::new(&config, machines).unwrap())
            .unwrap();

        env.run(55.0).unwrap();

        let observed: Vec<(String, TraceKind, f64)> = env
            .result()
            .trace
            .iter()
            .map(|record| (record.actor.clone(), record.kind, record.time.as_f64()))
            .collect();
        assert_eq!(
            observed,
            vec![
                (
                    "Machinist - 1".to_string(),
                    TraceKind::Completed(Stage::Machining),
                    50.0
                ),
                (
                    "CNC Machine".to_string(),
                    TraceKind::Failed(Stage::Machining),
                    50.0
                ),
                (
                    "CNC Machine".to_string(),
                    TraceKind::Repaired(Stage::Machining),
                    55.0
                ),
            ]
        );
    }
}
