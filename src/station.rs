//! # Módulo de Estaciones de Trabajo
//!
//! Este módulo define las estaciones de la línea de manufactura y los
//! procesos que trabajan en ellas. Cada estación tiene un banco de máquinas
//! (un recurso) y W trabajadores idénticos que repiten indefinidamente el
//! ciclo: tomar un token del buffer anterior, adquirir una máquina, mantenerla
//! durante el tiempo de servicio, registrar la duración, liberarla y enviar
//! un token a la estación siguiente.

use std::fmt;
use std::mem;

use serde::{Deserialize, Serialize};

use crate::error::SimulationError;
use crate::metrics::TraceKind;
use crate::process::{Context, Process, Wait, Wakeup};
use crate::resource::{Held, ResourceId};
use crate::scheduler::SimTime;
use crate::store::BufferId;

/// Estaciones de la línea, en orden de flujo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Machining,
    Molding,
    Assembly,
    Inspection,
    Packaging,
}

impl Stage {
    /// Número de estaciones.
    pub const COUNT: usize = 5;

    /// Todas las estaciones en orden de la línea.
    pub const ALL: [Stage; Stage::COUNT] = [
        Stage::Machining,
        Stage::Molding,
        Stage::Assembly,
        Stage::Inspection,
        Stage::Packaging,
    ];

    /// Posición de la estación en la línea (0-indexada).
    pub fn index(self) -> usize {
        self as usize
    }

    /// Clave corta para CSV y configuración.
    pub fn key(self) -> &'static str {
        match self {
            Self::Machining => "machining",
            Self::Molding => "molding",
            Self::Assembly => "assembly",
            Self::Inspection => "inspection",
            Self::Packaging => "packaging",
        }
    }

    /// Actividad que realiza la estación, tal como aparece en las trazas.
    pub fn activity(self) -> &'static str {
        match self {
            Self::Machining => "Machining",
            Self::Molding => "Molding",
            Self::Assembly => "Assembling",
            Self::Inspection => "Inspecting",
            Self::Packaging => "Packaging",
        }
    }

    /// Prefijo de la etiqueta de los trabajadores (`Machinist - 1`, ...).
    pub fn worker_title(self) -> &'static str {
        match self {
            Self::Machining => "Machinist",
            Self::Molding => "Molder",
            Self::Assembly => "Assembler",
            Self::Inspection => "Inspector",
            Self::Packaging => "Packer",
        }
    }

    /// Nombre del banco de máquinas de la estación.
    pub fn machine_name(self) -> &'static str {
        match self {
            Self::Machining => "CNC Machine",
            Self::Molding => "Molding Machine",
            Self::Assembly => "Assembly Station",
            Self::Inspection => "Inspection Station",
            Self::Packaging => "Packaging Station",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Machining => "Machining",
            Self::Molding => "Molding",
            Self::Assembly => "Assembly",
            Self::Inspection => "Inspection",
            Self::Packaging => "Packaging",
        };
        f.write_str(name)
    }
}

/// Configuración de una estación de trabajo.
///
/// Puede haber más trabajadores que máquinas; en ese caso los trabajadores
/// hacen cola por el recurso.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StationConfig {
    /// Estación configurada
    pub stage: Stage,
    /// Número de trabajadores independientes
    pub workers: usize,
    /// Número de máquinas intercambiables
    pub capacity: usize,
    /// Tiempo fijo de servicio por unidad
    pub service_time: f64,
}

/// Configuración de los cargadores de materia prima.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Número de cargadores
    pub count: usize,
    /// Tiempo que tarda cada carga
    pub loading_time: f64,
}

/// Cargador de materia prima.
///
/// Espera el tiempo de carga y deposita un token en el buffer de materia
/// prima, sin competir por ningún recurso.
pub struct Loader {
    output: BufferId,
    loading_time: f64,
    phase: LoaderPhase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoaderPhase {
    Idle,
    Loading,
    Depositing,
}

impl Loader {
    /// Crea un cargador que deposita en `output`.
    pub fn new(output: BufferId, loading_time: f64) -> Self {
        Self {
            output,
            loading_time,
            phase: LoaderPhase::Idle,
        }
    }
}

impl Process for Loader {
    fn resume(&mut self, wakeup: Wakeup, ctx: &mut Context<'_>) -> Result<Wait, SimulationError> {
        match (self.phase, wakeup) {
            (LoaderPhase::Idle, Wakeup::Start) | (LoaderPhase::Depositing, Wakeup::Stored) => {
                self.phase = LoaderPhase::Loading;
                Ok(Wait::Timeout(self.loading_time))
            }
            (LoaderPhase::Loading, Wakeup::Timer) => {
                ctx.trace(TraceKind::Loaded);
                let token = ctx.new_token();
                self.phase = LoaderPhase::Depositing;
                Ok(Wait::Put(self.output, token))
            }
            (LoaderPhase::Idle, other) => Err(ctx.unexpected("inicio", &other)),
            (LoaderPhase::Loading, other) => Err(ctx.unexpected("temporizador", &other)),
            (LoaderPhase::Depositing, other) => Err(ctx.unexpected("depósito", &other)),
        }
    }
}

/// Destino de las unidades que salen de una estación.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    /// Buffer de la estación siguiente.
    Buffer(BufferId),
    /// Fin de la línea: se cuenta como producto terminado. Si hay meta de
    /// producción, alcanzarla cancela la corrida.
    Finished { target: Option<u64> },
}

/// Trabajador de una estación.
pub struct StationWorker {
    stage: Stage,
    input: BufferId,
    machines: ResourceId,
    output: Output,
    service_time: f64,
    phase: WorkerPhase,
}

#[derive(Debug)]
enum WorkerPhase {
    Idle,
    Fetching,
    Acquiring,
    Serving { unit: Held, started: SimTime },
    Forwarding,
}

impl WorkerPhase {
    fn expects(&self) -> &'static str {
        match self {
            Self::Idle => "inicio",
            Self::Fetching => "token",
            Self::Acquiring => "unidad concedida",
            Self::Serving { .. } => "temporizador",
            Self::Forwarding => "depósito",
        }
    }
}

impl StationWorker {
    /// Crea un trabajador de `stage` que toma de `input`, usa `machines` y
    /// entrega en `output`.
    pub fn new(
        stage: Stage,
        input: BufferId,
        machines: ResourceId,
        output: Output,
        service_time: f64,
    ) -> Self {
        Self {
            stage,
            input,
            machines,
            output,
            service_time,
            phase: WorkerPhase::Idle,
        }
    }

    /// Estación del trabajador.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    fn fetch(&mut self) -> Result<Wait, SimulationError> {
        self.phase = WorkerPhase::Fetching;
        Ok(Wait::Get(self.input))
    }

    /// Cierra el servicio: registra la duración, libera la máquina y envía
    /// la unidad a su destino.
    fn finish(
        &mut self,
        unit: Held,
        started: SimTime,
        ctx: &mut Context<'_>,
    ) -> Result<Wait, SimulationError> {
        let held_for = ctx.now().since(started);
        ctx.result().stage_mut(self.stage).record(held_for);
        ctx.trace(TraceKind::Completed(self.stage));
        ctx.release(unit)?;

        match self.output {
            Output::Buffer(next) => {
                let token = ctx.new_token();
                self.phase = WorkerPhase::Forwarding;
                Ok(Wait::Put(next, token))
            }
            Output::Finished { target } => {
                let result = ctx.result();
                result.finished_units += 1;
                if target.is_some_and(|target| result.finished_units >= target) {
                    ctx.cancel();
                }
                self.fetch()
            }
        }
    }
}

impl Process for StationWorker {
    fn resume(&mut self, wakeup: Wakeup, ctx: &mut Context<'_>) -> Result<Wait, SimulationError> {
        match (mem::replace(&mut self.phase, WorkerPhase::Idle), wakeup) {
            (WorkerPhase::Idle, Wakeup::Start) | (WorkerPhase::Forwarding, Wakeup::Stored) => {
                self.fetch()
            }
            (WorkerPhase::Fetching, Wakeup::Item(_)) => {
                self.phase = WorkerPhase::Acquiring;
                Ok(Wait::Request(self.machines))
            }
            (WorkerPhase::Acquiring, Wakeup::Granted(unit)) => {
                self.phase = WorkerPhase::Serving {
                    unit,
                    started: ctx.now(),
                };
                Ok(Wait::Timeout(self.service_time))
            }
            (WorkerPhase::Serving { unit, started }, Wakeup::Timer) => {
                self.finish(unit, started, ctx)
            }
            (phase, other) => Err(ctx.unexpected(phase.expects(), &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{Environment, RunOutcome};
    use crate::process::from_fn;

    #[test]
    fn test_stage_order_and_labels() {
        assert_eq!(Stage::ALL.len(), Stage::COUNT);
        for (index, stage) in Stage::ALL.iter().enumerate() {
            assert_eq!(stage.index(), index);
        }
        assert_eq!(Stage::Machining.worker_title(), "Machinist");
        assert_eq!(Stage::Assembly.activity(), "Assembling");
        assert_eq!(Stage::Molding.machine_name(), "Molding Machine");
        assert_eq!(Stage::Inspection.to_string(), "Inspection");
    }

    #[test]
    fn test_loader_deposits_every_loading_time() {
        let mut env = Environment::new(0);
        let raw = env.add_buffer("materia prima");
        env.spawn("Loader - 1", Loader::new(raw, 2.0)).unwrap();

        env.run(9.0).unwrap();
        // Cargas en t=2, 4, 6 y 8
        assert_eq!(env.buffer(raw).unwrap().puts(), 4);
        assert_eq!(env.buffer(raw).unwrap().len(), 4);
    }

    #[test]
    fn test_worker_records_only_service_time() {
        let mut env = Environment::new(0);
        let input = env.add_buffer("entrada");
        let output = env.add_buffer("salida");
        let machines = env.add_resource("CNC Machine", 1).unwrap();

        // Dos tokens disponibles desde el inicio para un solo trabajador y
        // una sola máquina: el segundo espera, pero la espera no se registra.
        let mut produced = 0;
        env.spawn(
            "proveedor",
            from_fn(move |wakeup, ctx| match wakeup {
                Wakeup::Start | Wakeup::Stored if produced < 2 => {
                    produced += 1;
                    let token = ctx.new_token();
                    Ok(Wait::Put(input, token))
                }
                _ => Ok(Wait::Exit),
            }),
        )
        .unwrap();
        env.spawn(
            "Machinist - 1",
            StationWorker::new(Stage::Machining, input, machines, Output::Buffer(output), 7.0),
        )
        .unwrap();

        env.run(100.0).unwrap();
        let result = env.result();
        assert_eq!(result.stage(Stage::Machining).samples(), &[7.0, 7.0]);
        assert_eq!(env.buffer(output).unwrap().len(), 2);
        assert_eq!(env.resource(machines).unwrap().held(), 0);
    }

    #[test]
    fn test_packaging_target_cancels_run() {
        let mut env = Environment::new(0);
        let raw = env.add_buffer("materia prima");
        let machines = env.add_resource("Packaging Station", 1).unwrap();
        env.spawn("Loader - 1", Loader::new(raw, 1.0)).unwrap();
        env.spawn(
            "Packer - 1",
            StationWorker::new(
                Stage::Packaging,
                raw,
                machines,
                Output::Finished { target: Some(3) },
                3.0,
            ),
        )
        .unwrap();

        let summary = env.run(1_000.0).unwrap();
        assert_eq!(summary.outcome, RunOutcome::Cancelled);
        assert_eq!(env.result().finished_units, 3);
        // Empaques en t=4, 7 y 10
        assert_eq!(summary.final_time.as_f64(), 10.0);
    }
}
