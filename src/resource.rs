//! # Módulo de Recursos
//!
//! Un recurso modela un banco de N máquinas intercambiables (por ejemplo,
//! 5 fresadoras CNC). Las solicitudes se atienden en estricto orden de
//! llegada, sin prioridades ni expropiación.

use std::collections::VecDeque;

use crate::process::ProcessId;

/// Identificador de un recurso dentro del entorno de simulación.
pub type ResourceId = usize;

/// Unidad de un recurso concedida a un proceso.
///
/// No es clonable: la única forma de devolverla es entregarla a
/// [`Resource::release`], que la consume. Descartarla no la devuelve al
/// recurso; el entorno lleva la cuenta de las unidades de cada proceso y
/// rechaza con `SimulationError::UnitLeaked` que uno termine reteniendo
/// alguna.
#[must_use = "una unidad concedida debe liberarse"]
#[derive(Debug, PartialEq, Eq)]
pub struct Held {
    resource: ResourceId,
}

impl Held {
    /// Recurso al que pertenece la unidad.
    pub fn resource(&self) -> ResourceId {
        self.resource
    }
}

/// Banco de unidades con capacidad fija y cola de espera FIFO.
#[derive(Debug)]
pub struct Resource {
    id: ResourceId,
    name: String,
    capacity: usize,
    held: usize,
    waiting: VecDeque<ProcessId>,
    grants: u64,
}

impl Resource {
    /// Crea un recurso con la capacidad indicada.
    ///
    /// La capacidad se valida al construir la configuración; aquí se
    /// asume positiva.
    pub fn new(id: ResourceId, name: impl Into<String>, capacity: usize) -> Self {
        Self {
            id,
            name: name.into(),
            capacity,
            held: 0,
            waiting: VecDeque::new(),
            grants: 0,
        }
    }

    /// Nombre del recurso.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Capacidad total (número de unidades).
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Unidades actualmente concedidas.
    pub fn held(&self) -> usize {
        self.held
    }

    /// Procesos esperando una unidad, en orden de llegada.
    pub fn queue_len(&self) -> usize {
        self.waiting.len()
    }

    /// Total de unidades concedidas desde el inicio.
    pub fn grants(&self) -> u64 {
        self.grants
    }

    /// Solicita una unidad para `requester`.
    ///
    /// # Returns
    ///
    /// `Some(Held)` si había una unidad libre, `None` si el proceso quedó
    /// encolado al final de la cola de espera.
    pub fn request(&mut self, requester: ProcessId) -> Option<Held> {
        if self.held < self.capacity {
            self.held += 1;
            self.grants += 1;
            Some(Held { resource: self.id })
        } else {
            self.waiting.push_back(requester);
            None
        }
    }

    /// Libera una unidad.
    ///
    /// Si hay procesos esperando, la unidad pasa directamente al primero de
    /// la cola (el conteo de unidades ocupadas no cambia). Una unidad nunca
    /// queda ociosa mientras alguien espera.
    ///
    /// # Returns
    ///
    /// El proceso que recibe la unidad junto con ella, si lo hay.
    pub fn release(&mut self, unit: Held) -> Option<(ProcessId, Held)> {
        debug_assert_eq!(unit.resource, self.id);
        match self.waiting.pop_front() {
            Some(next) => {
                self.grants += 1;
                Some((next, unit))
            }
            None => {
                self.held = self.held.saturating_sub(1);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grants_until_capacity() {
        let mut resource = Resource::new(0, "CNC", 2);
        assert!(resource.request(1).is_some());
        assert!(resource.request(2).is_some());
        assert!(resource.request(3).is_none());
        assert_eq!(resource.held(), 2);
        assert_eq!(resource.queue_len(), 1);
    }

    #[test]
    fn test_release_hands_unit_to_head_of_queue() {
        let mut resource = Resource::new(0, "Moldeo", 1);
        let unit = resource.request(1).unwrap();
        assert!(resource.request(2).is_none());
        assert!(resource.request(3).is_none());

        let (next, unit) = resource.release(unit).unwrap();
        assert_eq!(next, 2);
        assert_eq!(resource.held(), 1);

        let (next, unit) = resource.release(unit).unwrap();
        assert_eq!(next, 3);

        assert!(resource.release(unit).is_none());
        assert_eq!(resource.held(), 0);
        assert_eq!(resource.grants(), 3);
    }

    #[test]
    fn test_held_unit_remembers_its_resource() {
        let mut resource = Resource::new(4, "Empaque", 1);
        let unit = resource.request(0).unwrap();
        assert_eq!(unit.resource(), 4);
        assert!(resource.release(unit).is_none());
    }
}
