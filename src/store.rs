//! # Módulo de Buffers entre Estaciones
//!
//! Un buffer es una cola FIFO no acotada de tokens que conecta dos
//! estaciones consecutivas. Poner nunca bloquea; tomar bloquea mientras el
//! buffer esté vacío.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::process::ProcessId;

/// Identificador de un buffer dentro del entorno de simulación.
pub type BufferId = usize;

/// Unidad de material en tránsito.
///
/// No lleva más información que su identidad; el número de serie solo sirve
/// para trazas y para verificar el orden FIFO.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    serial: u64,
}

impl Token {
    pub(crate) fn new(serial: u64) -> Self {
        Self { serial }
    }

    /// Número de serie del token.
    pub fn serial(&self) -> u64 {
        self.serial
    }
}

/// Cola de tokens con cola FIFO de consumidores bloqueados.
#[derive(Debug)]
pub struct Buffer {
    name: String,
    items: VecDeque<Token>,
    getters: VecDeque<ProcessId>,
    puts: u64,
    gets: u64,
}

impl Buffer {
    /// Crea un buffer vacío.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: VecDeque::new(),
            getters: VecDeque::new(),
            puts: 0,
            gets: 0,
        }
    }

    /// Nombre del buffer.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tokens almacenados.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// `true` si no hay tokens almacenados.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Procesos bloqueados esperando un token.
    pub fn waiting_getters(&self) -> usize {
        self.getters.len()
    }

    /// Total acumulado de tokens puestos.
    pub fn puts(&self) -> u64 {
        self.puts
    }

    /// Total acumulado de tokens tomados.
    pub fn gets(&self) -> u64 {
        self.gets
    }

    /// Agrega un token al final.
    ///
    /// Si algún consumidor espera, el token se le entrega directamente sin
    /// pasar por el almacenamiento.
    ///
    /// # Returns
    ///
    /// El consumidor despertado y su token, si lo hay.
    pub fn put(&mut self, token: Token) -> Option<(ProcessId, Token)> {
        self.puts += 1;
        match self.getters.pop_front() {
            Some(getter) => {
                self.gets += 1;
                Some((getter, token))
            }
            None => {
                self.items.push_back(token);
                None
            }
        }
    }

    /// Toma el token más antiguo.
    ///
    /// # Returns
    ///
    /// `Some(Token)` si había tokens; `None` si el buffer estaba vacío, en
    /// cuyo caso `getter` queda encolado hasta la próxima llegada.
    pub fn get(&mut self, getter: ProcessId) -> Option<Token> {
        match self.items.pop_front() {
            Some(token) => {
                self.gets += 1;
                Some(token)
            }
            None => {
                self.getters.push_back(getter);
                None
            }
        }
    }
}
