//! # Módulo de Procesos
//!
//! Un proceso es una unidad de control suspendible: el bucle de un
//! trabajador o de un inyector de fallas. Cada proceso es una máquina de
//! estados explícita; el planificador lo reanuda entregándole el resultado de
//! su última espera y el proceso responde con la siguiente espera.
//!
//! Los puntos de suspensión son exactamente:
//! - una espera de duración fija (`Wait::Timeout`)
//! - la adquisición de una unidad de un recurso (`Wait::Request`)
//! - la extracción de un token de un buffer (`Wait::Get`)
//! - la inserción en un buffer (`Wait::Put`), que nunca bloquea pero se
//!   modela como un paso más por simetría

use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::error::SimulationError;
use crate::metrics::{SimulationResult, TraceKind, TraceRecord};
use crate::resource::{Held, Resource, ResourceId};
use crate::scheduler::{Scheduler, SimTime};
use crate::store::{BufferId, Token};

/// Identificador de un proceso dentro del entorno de simulación.
pub type ProcessId = usize;

/// Siguiente condición de espera que declara un proceso al ceder el control.
#[derive(Debug)]
pub enum Wait {
    /// Esperar una duración fija.
    Timeout(f64),
    /// Esperar una unidad del recurso.
    Request(ResourceId),
    /// Esperar un token del buffer.
    Get(BufferId),
    /// Depositar un token en el buffer.
    Put(BufferId, Token),
    /// Terminar el proceso.
    Exit,
}

/// Resultado de una espera, entregado al reanudar el proceso.
#[derive(Debug)]
pub enum Wakeup {
    /// Primera activación tras ser creado.
    Start,
    /// Venció el temporizador.
    Timer,
    /// Se concedió una unidad del recurso solicitado.
    Granted(Held),
    /// Llegó un token del buffer.
    Item(Token),
    /// El token quedó depositado.
    Stored,
}

impl Wakeup {
    /// Nombre corto para mensajes de error.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Start => "inicio",
            Self::Timer => "temporizador",
            Self::Granted(_) => "unidad concedida",
            Self::Item(_) => "token",
            Self::Stored => "depósito",
        }
    }
}

/// Condición que mantiene suspendido a un proceso.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitKind {
    Timer,
    Resource(ResourceId),
    Buffer(BufferId),
    Put(BufferId),
}

/// Estado de un proceso.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    /// Creado, con su primera activación pendiente.
    Runnable,
    /// Esperando exactamente una condición.
    Suspended(WaitKind),
    /// Terminado; nunca vuelve a ejecutarse.
    Terminated,
}

/// Comportamiento de un proceso de simulación.
pub trait Process {
    /// Reanuda el proceso con el resultado de su última espera.
    ///
    /// # Errors
    ///
    /// Cualquier `SimulationError` detiene la simulación; en particular
    /// `UnexpectedWakeup` si `wakeup` no corresponde a la espera pendiente.
    fn resume(&mut self, wakeup: Wakeup, ctx: &mut Context<'_>) -> Result<Wait, SimulationError>;
}

/// Proceso definido por una clausura, al estilo de `std::iter::from_fn`.
///
/// Útil para procesos pequeños cuyo estado cabe en las variables capturadas.
pub fn from_fn<F>(f: F) -> FromFn<F>
where
    F: FnMut(Wakeup, &mut Context<'_>) -> Result<Wait, SimulationError>,
{
    FromFn(f)
}

/// Proceso creado con [`from_fn`].
pub struct FromFn<F>(F);

impl<F> Process for FromFn<F>
where
    F: FnMut(Wakeup, &mut Context<'_>) -> Result<Wait, SimulationError>,
{
    fn resume(&mut self, wakeup: Wakeup, ctx: &mut Context<'_>) -> Result<Wait, SimulationError> {
        (self.0)(wakeup, ctx)
    }
}

/// Acceso de un proceso al entorno mientras se ejecuta.
///
/// Solo vive durante una reanudación; entre dos avances del reloj se ejecuta
/// un único proceso, por lo que no se requieren locks.
pub struct Context<'a> {
    pub(crate) pid: ProcessId,
    pub(crate) actor: &'a str,
    pub(crate) scheduler: &'a mut Scheduler<ProcessId>,
    pub(crate) inbox: &'a mut [Option<Wakeup>],
    pub(crate) holdings: &'a mut [usize],
    pub(crate) resources: &'a mut [Resource],
    pub(crate) rng: &'a mut ChaCha8Rng,
    pub(crate) result: &'a mut SimulationResult,
    pub(crate) trace_enabled: bool,
    pub(crate) cancelled: &'a mut bool,
    pub(crate) next_token: &'a mut u64,
}

impl Context<'_> {
    /// Identificador del proceso en ejecución.
    pub fn pid(&self) -> ProcessId {
        self.pid
    }

    /// Etiqueta del proceso en ejecución (por ejemplo `Machinist - 3`).
    pub fn actor(&self) -> &str {
        self.actor
    }

    /// Tiempo actual de simulación.
    pub fn now(&self) -> SimTime {
        self.scheduler.now()
    }

    /// Fuente aleatoria compartida de la simulación.
    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut *self.rng
    }

    /// Resultados acumulados de la corrida.
    pub fn result(&mut self) -> &mut SimulationResult {
        &mut *self.result
    }

    /// Crea un token nuevo con número de serie único.
    pub fn new_token(&mut self) -> Token {
        *self.next_token += 1;
        Token::new(*self.next_token)
    }

    /// Libera una unidad concedida.
    ///
    /// Un proceso que termina (`Wait::Exit`) sin haber liberado todas sus
    /// unidades produce `SimulationError::UnitLeaked`.
    ///
    /// Si otro proceso esperaba el recurso, recibe la unidad y se programa
    /// su reanudación en el instante actual.
    ///
    /// # Errors
    ///
    /// `SimulationError::UnknownResource` si la unidad no pertenece a
    /// ningún recurso del entorno.
    pub fn release(&mut self, unit: Held) -> Result<(), SimulationError> {
        let id = unit.resource();
        let resource = self
            .resources
            .get_mut(id)
            .ok_or(SimulationError::UnknownResource(id))?;
        if let Some(held) = self.holdings.get_mut(self.pid) {
            *held = held.saturating_sub(1);
        }
        if let Some((next, unit)) = resource.release(unit) {
            let held = self
                .holdings
                .get_mut(next)
                .ok_or(SimulationError::UnknownProcess(next))?;
            *held += 1;
            wake(self.scheduler, self.inbox, next, Wakeup::Granted(unit))?;
        }
        Ok(())
    }

    /// Registra una transición observable.
    pub fn trace(&mut self, kind: TraceKind) {
        let time = self.now();
        debug!(actor = self.actor, time = time.as_f64(), event = %kind, "Transición");
        if self.trace_enabled {
            self.result.trace.push(TraceRecord {
                time,
                actor: self.actor.to_string(),
                kind,
            });
        }
    }

    /// Solicita la cancelación de la corrida.
    ///
    /// Ningún otro proceso se reanuda después del actual.
    pub fn cancel(&mut self) {
        *self.cancelled = true;
    }

    /// Construye el error para una reanudación que no corresponde a la
    /// espera pendiente.
    pub fn unexpected(&self, expected: &'static str, got: &Wakeup) -> SimulationError {
        SimulationError::UnexpectedWakeup {
            actor: self.actor.to_string(),
            expected,
            got: got.kind(),
        }
    }
}

/// Entrega `wakeup` a `pid` y programa su reanudación en el instante actual.
pub(crate) fn wake(
    scheduler: &mut Scheduler<ProcessId>,
    inbox: &mut [Option<Wakeup>],
    pid: ProcessId,
    wakeup: Wakeup,
) -> Result<(), SimulationError> {
    let slot = inbox
        .get_mut(pid)
        .ok_or(SimulationError::UnknownProcess(pid))?;
    *slot = Some(wakeup);
    scheduler.schedule(0.0, pid)?;
    Ok(())
}
