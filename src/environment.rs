//! # Módulo del Entorno de Simulación
//!
//! El entorno reúne el planificador, la tabla de procesos, los recursos, los
//! buffers, la fuente aleatoria y el resultado de la corrida. Despacha los
//! eventos en orden y reanuda el proceso asociado a cada uno; todo el estado
//! compartido se modifica únicamente a través de las operaciones de los
//! recursos (solicitar/liberar) y los buffers (poner/tomar).

use std::fmt;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{ConfigError, SimulationError};
use crate::metrics::SimulationResult;
use crate::process::{wake, Context, Process, ProcessId, ProcessState, Wait, WaitKind, Wakeup};
use crate::resource::{Resource, ResourceId};
use crate::scheduler::{Scheduler, SimTime};
use crate::store::{Buffer, BufferId};

/// Motivo por el que terminó una corrida.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunOutcome {
    /// El próximo evento superaba el horizonte; los pendientes se descartaron.
    HorizonReached,
    /// Se levantó la señal de cancelación.
    Cancelled,
    /// No quedaban eventos pendientes antes del horizonte.
    Exhausted,
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HorizonReached => write!(f, "horizonte alcanzado"),
            Self::Cancelled => write!(f, "cancelada"),
            Self::Exhausted => write!(f, "sin eventos pendientes"),
        }
    }
}

/// Resumen del planificador al terminar una corrida.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    pub final_time: SimTime,
    pub dispatched: u64,
    pub discarded: usize,
}

/// Violación de un invariante de recurso o buffer.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Invariante '{invariant}' violado en t={time}: {description}")]
pub struct InvariantViolation {
    pub invariant: &'static str,
    pub description: String,
    pub time: SimTime,
}

struct Slot {
    label: String,
    state: ProcessState,
    process: Box<dyn Process>,
}

/// Entorno de simulación de eventos discretos.
pub struct Environment {
    scheduler: Scheduler<ProcessId>,
    slots: Vec<Slot>,
    inbox: Vec<Option<Wakeup>>,
    holdings: Vec<usize>,
    resources: Vec<Resource>,
    buffers: Vec<Buffer>,
    rng: ChaCha8Rng,
    result: SimulationResult,
    trace_enabled: bool,
    cancelled: bool,
    next_token: u64,
}

impl Environment {
    /// Crea un entorno vacío cuya fuente aleatoria parte de `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            scheduler: Scheduler::new(),
            slots: Vec::new(),
            inbox: Vec::new(),
            holdings: Vec::new(),
            resources: Vec::new(),
            buffers: Vec::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            result: SimulationResult::new(seed),
            trace_enabled: false,
            cancelled: false,
            next_token: 0,
        }
    }

    /// Conserva en el resultado un registro de cada transición.
    pub fn enable_trace(&mut self) {
        self.trace_enabled = true;
    }

    /// Tiempo actual de simulación.
    pub fn now(&self) -> SimTime {
        self.scheduler.now()
    }

    /// Crea un recurso con la capacidad indicada.
    ///
    /// # Errors
    ///
    /// `ConfigError::NonPositiveCapacity` si la capacidad es cero.
    pub fn add_resource(
        &mut self,
        name: impl Into<String>,
        capacity: usize,
    ) -> Result<ResourceId, ConfigError> {
        let name = name.into();
        if capacity == 0 {
            return Err(ConfigError::NonPositiveCapacity { name });
        }
        let id = self.resources.len();
        self.resources.push(Resource::new(id, name, capacity));
        Ok(id)
    }

    /// Crea un buffer vacío.
    pub fn add_buffer(&mut self, name: impl Into<String>) -> BufferId {
        self.buffers.push(Buffer::new(name));
        self.buffers.len() - 1
    }

    /// Registra un proceso y programa su primera activación en el instante
    /// actual.
    pub fn spawn(
        &mut self,
        label: impl Into<String>,
        process: impl Process + 'static,
    ) -> Result<ProcessId, SimulationError> {
        let pid = self.slots.len();
        self.slots.push(Slot {
            label: label.into(),
            state: ProcessState::Runnable,
            process: Box::new(process),
        });
        self.inbox.push(None);
        self.holdings.push(0);
        wake(&mut self.scheduler, &mut self.inbox, pid, Wakeup::Start)?;
        Ok(pid)
    }

    /// Levanta la señal de cancelación.
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    /// `true` si se pidió cancelar la corrida.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Recurso por identificador.
    pub fn resource(&self, id: ResourceId) -> Option<&Resource> {
        self.resources.get(id)
    }

    /// Buffer por identificador.
    pub fn buffer(&self, id: BufferId) -> Option<&Buffer> {
        self.buffers.get(id)
    }

    /// Estado de un proceso.
    pub fn process_state(&self, pid: ProcessId) -> Option<ProcessState> {
        self.slots.get(pid).map(|slot| slot.state)
    }

    /// Unidades de recursos que retiene un proceso.
    pub fn holdings(&self, pid: ProcessId) -> Option<usize> {
        self.holdings.get(pid).copied()
    }

    /// Etiqueta de un proceso.
    pub fn process_label(&self, pid: ProcessId) -> Option<&str> {
        self.slots.get(pid).map(|slot| slot.label.as_str())
    }

    /// Número de procesos registrados.
    pub fn process_count(&self) -> usize {
        self.slots.len()
    }

    /// Eventos despachados hasta ahora.
    pub fn dispatched(&self) -> u64 {
        self.scheduler.dispatched()
    }

    /// Resultados acumulados.
    pub fn result(&self) -> &SimulationResult {
        &self.result
    }

    /// Consume el entorno y devuelve el resultado de la corrida.
    pub fn into_result(self) -> SimulationResult {
        self.result
    }

    /// Ejecuta la simulación hasta `horizon`.
    ///
    /// Despacha los eventos en orden de tiempo (y de inserción ante empates)
    /// mientras el próximo no supere el horizonte. Los eventos posteriores se
    /// descartan: no se ejecutan ni se consideran un error. Los procesos que
    /// quedan suspendidos al llegar al horizonte simplemente no vuelven a
    /// reanudarse.
    ///
    /// # Errors
    ///
    /// `ConfigError::NonPositiveHorizon` si el horizonte no es finito y no
    /// negativo, o el primer error que devuelva un proceso.
    pub fn run(&mut self, horizon: f64) -> Result<RunSummary, SimulationError> {
        let horizon = SimTime::new(horizon).ok_or(ConfigError::NonPositiveHorizon(horizon))?;

        while self.step(horizon)? {}

        let outcome = if self.cancelled {
            RunOutcome::Cancelled
        } else if self.scheduler.pending() > 0 {
            RunOutcome::HorizonReached
        } else {
            RunOutcome::Exhausted
        };

        if outcome != RunOutcome::Cancelled {
            self.scheduler.advance_to(horizon);
        }

        let summary = RunSummary {
            outcome,
            final_time: self.scheduler.now(),
            dispatched: self.scheduler.dispatched(),
            discarded: self.scheduler.discard_pending(),
        };
        debug!(
            outcome = %summary.outcome,
            final_time = summary.final_time.as_f64(),
            dispatched = summary.dispatched,
            discarded = summary.discarded,
            "Corrida terminada"
        );
        self.result.summary = Some(summary);
        Ok(summary)
    }

    /// Despacha un único evento si su tiempo no supera `horizon`.
    ///
    /// Con la señal de cancelación levantada no despacha nada: termina todos
    /// los procesos y devuelve `false`.
    ///
    /// # Returns
    ///
    /// `false` si la corrida fue cancelada o no había eventos pendientes
    /// dentro del horizonte.
    pub fn step(&mut self, horizon: SimTime) -> Result<bool, SimulationError> {
        if self.cancelled {
            self.terminate_all();
            return Ok(false);
        }
        let Some((_, pid)) = self.scheduler.pop_due(horizon) else {
            return Ok(false);
        };
        self.dispatch(pid)?;
        Ok(true)
    }

    fn terminate_all(&mut self) {
        for slot in &mut self.slots {
            slot.state = ProcessState::Terminated;
        }
        self.inbox.iter_mut().for_each(|wakeup| *wakeup = None);
    }

    fn dispatch(&mut self, pid: ProcessId) -> Result<(), SimulationError> {
        let slot = self
            .slots
            .get_mut(pid)
            .ok_or(SimulationError::UnknownProcess(pid))?;
        if slot.state == ProcessState::Terminated {
            return Ok(());
        }

        let wakeup = self
            .inbox
            .get_mut(pid)
            .and_then(Option::take)
            .ok_or_else(|| SimulationError::NoPendingWakeup {
                actor: slot.label.clone(),
            })?;

        trace!(
            time = self.scheduler.now().as_f64(),
            actor = %slot.label,
            wakeup = wakeup.kind(),
            "Reanudando proceso"
        );

        let Slot { label, process, .. } = slot;
        let mut ctx = Context {
            pid,
            actor: label,
            scheduler: &mut self.scheduler,
            inbox: &mut self.inbox,
            holdings: &mut self.holdings,
            resources: &mut self.resources,
            rng: &mut self.rng,
            result: &mut self.result,
            trace_enabled: self.trace_enabled,
            cancelled: &mut self.cancelled,
            next_token: &mut self.next_token,
        };
        let wait = process.resume(wakeup, &mut ctx)?;
        self.suspend(pid, wait)
    }

    fn suspend(&mut self, pid: ProcessId, wait: Wait) -> Result<(), SimulationError> {
        let state = match wait {
            Wait::Timeout(delay) => {
                self.scheduler.schedule(delay, pid)?;
                self.inbox[pid] = Some(Wakeup::Timer);
                ProcessState::Suspended(WaitKind::Timer)
            }
            Wait::Request(id) => {
                let resource = self
                    .resources
                    .get_mut(id)
                    .ok_or(SimulationError::UnknownResource(id))?;
                if let Some(unit) = resource.request(pid) {
                    self.holdings[pid] += 1;
                    wake(&mut self.scheduler, &mut self.inbox, pid, Wakeup::Granted(unit))?;
                }
                ProcessState::Suspended(WaitKind::Resource(id))
            }
            Wait::Get(id) => {
                let buffer = self
                    .buffers
                    .get_mut(id)
                    .ok_or(SimulationError::UnknownBuffer(id))?;
                if let Some(token) = buffer.get(pid) {
                    wake(&mut self.scheduler, &mut self.inbox, pid, Wakeup::Item(token))?;
                }
                ProcessState::Suspended(WaitKind::Buffer(id))
            }
            Wait::Put(id, token) => {
                let buffer = self
                    .buffers
                    .get_mut(id)
                    .ok_or(SimulationError::UnknownBuffer(id))?;
                let handoff = buffer.put(token);
                wake(&mut self.scheduler, &mut self.inbox, pid, Wakeup::Stored)?;
                if let Some((getter, token)) = handoff {
                    wake(&mut self.scheduler, &mut self.inbox, getter, Wakeup::Item(token))?;
                }
                ProcessState::Suspended(WaitKind::Put(id))
            }
            Wait::Exit => {
                let held = self.holdings[pid];
                if held > 0 {
                    return Err(SimulationError::UnitLeaked {
                        actor: self.slots[pid].label.clone(),
                        held,
                    });
                }
                ProcessState::Terminated
            }
        };
        self.slots[pid].state = state;
        Ok(())
    }

    /// Verifica los invariantes de recursos y buffers en el instante actual.
    ///
    /// # Errors
    ///
    /// La primera `InvariantViolation` encontrada.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let time = self.now();
        for resource in &self.resources {
            if resource.held() > resource.capacity() {
                return Err(InvariantViolation {
                    invariant: "ResourceCapacity",
                    description: format!(
                        "'{}' tiene {} unidades ocupadas con capacidad {}",
                        resource.name(),
                        resource.held(),
                        resource.capacity()
                    ),
                    time,
                });
            }
            if resource.queue_len() > 0 && resource.held() < resource.capacity() {
                return Err(InvariantViolation {
                    invariant: "ResourceWorkConserving",
                    description: format!(
                        "'{}' tiene unidades libres con {} procesos en espera",
                        resource.name(),
                        resource.queue_len()
                    ),
                    time,
                });
            }
        }
        for buffer in &self.buffers {
            let stored = buffer.len() as u64;
            if buffer.gets() > buffer.puts() || stored != buffer.puts() - buffer.gets() {
                return Err(InvariantViolation {
                    invariant: "BufferConservation",
                    description: format!(
                        "'{}' almacena {} tokens con {} puestos y {} tomados",
                        buffer.name(),
                        stored,
                        buffer.puts(),
                        buffer.gets()
                    ),
                    time,
                });
            }
        }
        Ok(())
    }
}
