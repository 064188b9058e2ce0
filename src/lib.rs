//! # Simulador de Línea de Manufactura
//!
//! Esta biblioteca implementa un simulador de eventos discretos de una línea
//! de manufactura: cargadores de materia prima, cinco estaciones en serie
//! (maquinado, moldeo, ensamblaje, inspección y empaque) con bancos de
//! máquinas compartidos, y fallas aleatorias que dejan máquinas fuera de
//! servicio mientras se reparan.
//!
//! ## Características principales
//!
//! - **Tiempo simulado**: un planificador ordena los eventos por tiempo y,
//!   ante empates, por orden de inserción. Nada espera tiempo real.
//! - **Procesos como máquinas de estado**: cada trabajador, cargador e
//!   inyector de fallas declara su próxima espera y el entorno lo reanuda
//!   cuando se cumple.
//! - **Recursos con cola FIFO**: capacidad fija, concesión inmediata si hay
//!   unidades libres y traspaso directo al primero de la cola al liberar.
//! - **Buffers sin límite**: depositar nunca bloquea; tomar espera a que haya
//!   un token.
//! - **Reproducibilidad**: la misma semilla produce exactamente la misma
//!   secuencia de eventos.
//!
//! ## Estructura del proyecto
//!
//! - `scheduler`: reloj simulado y cola de eventos
//! - `process`: contrato de los procesos y su contexto de ejecución
//! - `resource` / `store`: recursos con capacidad y buffers de tokens
//! - `environment`: despacho de eventos, horizonte y cancelación
//! - `station` / `failure`: procesos de la línea de manufactura
//! - `config` / `simulation`: configuración y armado de la línea
//! - `metrics`: estadísticas por estación y reportes
//!
//! ## Ejemplo
//!
//! ```rust
//! use manufacturing_line_simulator::{Simulation, SimulationConfig, Stage};
//!
//! let config = SimulationConfig::default().with_seed(42).with_horizon(480.0);
//! let result = Simulation::new(config).unwrap().run().unwrap();
//!
//! let mean = result.mean(Stage::Machining).unwrap();
//! assert!((mean - 7.0).abs() < 1e-9);
//! ```

pub mod config;
pub mod environment;
pub mod error;
pub mod failure;
pub mod metrics;
pub mod process;
pub mod resource;
pub mod scheduler;
pub mod simulation;
pub mod station;
pub mod store;

// Re-exportar las estructuras principales para facilitar su uso
pub use config::SimulationConfig;
pub use environment::{Environment, InvariantViolation, RunOutcome, RunSummary};
pub use error::{ConfigError, SimulationError, StatisticsError};
pub use failure::{FailureConfig, FailureInjector};
pub use metrics::{MetricsCalculator, SimulationResult, StageStatistics, TraceKind, TraceRecord};
pub use process::{from_fn, Context, Process, ProcessId, ProcessState, Wait, WaitKind, Wakeup};
pub use resource::{Held, Resource, ResourceId};
pub use scheduler::{EventKey, Scheduler, SimTime};
pub use simulation::Simulation;
pub use station::{Loader, LoaderConfig, Output, Stage, StationConfig, StationWorker};
pub use store::{Buffer, BufferId, Token};
