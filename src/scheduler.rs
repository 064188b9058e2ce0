//! # Módulo del Planificador de Eventos
//!
//! Este módulo implementa el reloj de simulación y la cola de eventos
//! pendientes. Cada evento se identifica por su tiempo de disparo y un número
//! de secuencia de inserción, lo que da un orden total y determinista incluso
//! cuando varios eventos coinciden en el mismo instante.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SimulationError;

/// Instante de tiempo simulado.
///
/// Es un número real finito y no negativo. A diferencia de `f64`, tiene un
/// orden total, por lo que puede usarse como clave de la cola de eventos.
/// Al deserializar se valida igual que en [`SimTime::new`].
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
#[serde(try_from = "f64")]
pub struct SimTime(f64);

impl SimTime {
    /// Inicio de la simulación.
    pub const ZERO: SimTime = SimTime(0.0);

    /// Crea un instante validando que sea finito y no negativo.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use manufacturing_line_simulator::SimTime;
    ///
    /// assert!(SimTime::new(3.5).is_some());
    /// assert!(SimTime::new(-1.0).is_none());
    /// assert!(SimTime::new(f64::NAN).is_none());
    /// ```
    pub fn new(value: f64) -> Option<Self> {
        (value.is_finite() && value >= 0.0).then_some(Self(value))
    }

    /// Valor numérico del instante.
    pub fn as_f64(self) -> f64 {
        self.0
    }

    /// Instante que resulta de esperar `delay` unidades desde `self`.
    ///
    /// # Errors
    ///
    /// `SimulationError::InvalidDelay` si el retardo es negativo o no finito.
    pub fn after(self, delay: f64) -> Result<SimTime, SimulationError> {
        if !delay.is_finite() || delay < 0.0 {
            return Err(SimulationError::InvalidDelay { delay });
        }
        SimTime::new(self.0 + delay).ok_or(SimulationError::InvalidDelay { delay })
    }

    /// Intervalo transcurrido desde `earlier` (cero si `earlier` es posterior).
    pub fn since(self, earlier: SimTime) -> f64 {
        (self.0 - earlier.0).max(0.0)
    }
}

impl TryFrom<f64> for SimTime {
    type Error = SimulationError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        SimTime::new(value).ok_or(SimulationError::InvalidTime { value })
    }
}

impl PartialEq for SimTime {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SimTime {}

impl PartialOrd for SimTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SimTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// Clave de ordenamiento de un evento.
///
/// Los eventos se ordenan por:
/// 1. Tiempo de disparo (el más temprano primero)
/// 2. Secuencia de inserción (FIFO entre eventos simultáneos)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct EventKey {
    /// Momento en que el evento debe despacharse.
    pub time: SimTime,
    /// Número de secuencia asignado al programarlo.
    pub sequence: u64,
}

/// Reloj de simulación y cola de eventos pendientes.
///
/// El tipo `E` es la continuación que se reanuda al despachar el evento; el
/// entorno de simulación usa el identificador del proceso a reanudar.
#[derive(Debug)]
pub struct Scheduler<E> {
    queue: BTreeMap<EventKey, E>,
    sequence: u64,
    now: SimTime,
    dispatched: u64,
}

impl<E> Scheduler<E> {
    /// Crea un planificador vacío con el reloj en cero.
    pub fn new() -> Self {
        Self {
            queue: BTreeMap::new(),
            sequence: 0,
            now: SimTime::ZERO,
            dispatched: 0,
        }
    }

    /// Tiempo actual de simulación.
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Cantidad de eventos pendientes.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Cantidad de eventos despachados desde el inicio.
    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }

    /// Tiempo de disparo del próximo evento, si existe.
    pub fn peek_time(&self) -> Option<SimTime> {
        self.queue.first_key_value().map(|(key, _)| key.time)
    }

    /// Programa una continuación para dentro de `delay` unidades de tiempo.
    ///
    /// # Errors
    ///
    /// `SimulationError::InvalidDelay` si el retardo es negativo o no finito.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use manufacturing_line_simulator::Scheduler;
    ///
    /// let mut scheduler = Scheduler::new();
    /// let key = scheduler.schedule(5.0, "A").unwrap();
    /// assert_eq!(key.time.as_f64(), 5.0);
    /// assert!(scheduler.schedule(-1.0, "B").is_err());
    /// ```
    pub fn schedule(&mut self, delay: f64, continuation: E) -> Result<EventKey, SimulationError> {
        let key = EventKey {
            time: self.now.after(delay)?,
            sequence: self.sequence,
        };
        self.sequence += 1;
        self.queue.insert(key, continuation);
        Ok(key)
    }

    /// Extrae el próximo evento si su tiempo no supera `horizon`, avanzando
    /// el reloj hasta ese tiempo.
    pub fn pop_due(&mut self, horizon: SimTime) -> Option<(EventKey, E)> {
        let (&key, _) = self.queue.first_key_value()?;
        if key.time > horizon {
            return None;
        }
        let (key, continuation) = self.queue.pop_first()?;
        self.now = key.time;
        self.dispatched += 1;
        Some((key, continuation))
    }

    /// Descarta los eventos pendientes y devuelve cuántos había.
    pub fn discard_pending(&mut self) -> usize {
        let discarded = self.queue.len();
        self.queue.clear();
        discarded
    }

    /// Lleva el reloj hasta `time` sin despachar eventos. Nunca retrocede.
    pub fn advance_to(&mut self, time: SimTime) {
        if time > self.now {
            self.now = time;
        }
    }
}

impl<E> Default for Scheduler<E> {
    fn default() -> Self {
        Self::new()
    }
}
