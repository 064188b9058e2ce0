//! # Módulo de Simulación Principal
//!
//! Este módulo arma la línea de manufactura sobre un `Environment`: un
//! recurso y un buffer de entrada por estación, los cargadores, los
//! trabajadores y los inyectores de fallas. Luego ejecuta la corrida hasta el
//! horizonte (o hasta la meta de unidades) y entrega el resultado.

use tracing::info;

use crate::config::SimulationConfig;
use crate::environment::Environment;
use crate::error::{ConfigError, SimulationError};
use crate::failure::FailureInjector;
use crate::metrics::SimulationResult;
use crate::resource::ResourceId;
use crate::scheduler::SimTime;
use crate::station::{Loader, Output, Stage, StationWorker};
use crate::store::BufferId;

/// Nombre del buffer del que toma cada estación.
fn input_buffer_name(stage: Stage) -> &'static str {
    match stage {
        Stage::Machining => "materia prima",
        Stage::Molding => "maquinado",
        Stage::Assembly => "moldeo",
        Stage::Inspection => "ensamblaje",
        Stage::Packaging => "inspección",
    }
}

/// Orquestador de la simulación de la línea de manufactura.
///
/// La `Simulation` coordina:
/// - La validación de la configuración y la elección de la semilla
/// - La construcción de recursos, buffers y procesos
/// - La ejecución hasta el horizonte o la meta de producción
pub struct Simulation {
    config: SimulationConfig,
    env: Environment,
    horizon: SimTime,
    machines: [ResourceId; Stage::COUNT],
    inputs: [BufferId; Stage::COUNT],
}

impl Simulation {
    /// Valida la configuración y construye la línea completa.
    ///
    /// Si la configuración no trae semilla se sortea una; queda registrada
    /// en el resultado para poder repetir la corrida.
    ///
    /// # Errors
    ///
    /// `SimulationError::Config` con el primer error de
    /// [`SimulationConfig::validate`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use manufacturing_line_simulator::{Simulation, SimulationConfig};
    ///
    /// let config = SimulationConfig::default().with_seed(7).with_horizon(480.0);
    /// let result = Simulation::new(config).unwrap().run().unwrap();
    /// assert_eq!(result.seed, 7);
    /// assert!(result.finished_units > 0);
    /// ```
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationError> {
        config.validate()?;
        let horizon =
            SimTime::new(config.horizon).ok_or(ConfigError::NonPositiveHorizon(config.horizon))?;
        let seed = config.seed.unwrap_or_else(rand::random);

        let mut env = Environment::new(seed);
        if config.trace {
            env.enable_trace();
        }

        let mut machines = [0; Stage::COUNT];
        let mut inputs = [0; Stage::COUNT];
        for stage in Stage::ALL {
            let station = config
                .station(stage)
                .ok_or(ConfigError::MissingStation { stage })?;
            machines[stage.index()] = env.add_resource(stage.machine_name(), station.capacity)?;
            inputs[stage.index()] = env.add_buffer(input_buffer_name(stage));
        }

        let mut simulation = Self {
            config,
            env,
            horizon,
            machines,
            inputs,
        };
        simulation.spawn_processes()?;

        info!(
            seed,
            horizon = simulation.config.horizon,
            processes = simulation.env.process_count(),
            "Simulación construida"
        );
        Ok(simulation)
    }

    /// Registra los procesos intercalados por índice: `Loader - i`,
    /// `Machinist - i`, ..., `Packer - i` para cada `i`, y al final los
    /// inyectores de fallas. Ese orden decide los empates en un mismo instante.
    fn spawn_processes(&mut self) -> Result<(), SimulationError> {
        let raw_materials = self.inputs[Stage::Machining.index()];
        let mut stations = Vec::with_capacity(Stage::COUNT);
        for stage in Stage::ALL {
            let station = *self
                .config
                .station(stage)
                .ok_or(ConfigError::MissingStation { stage })?;
            stations.push(station);
        }
        let rounds = stations
            .iter()
            .map(|station| station.workers)
            .chain([self.config.loader.count])
            .max()
            .unwrap_or(0);

        for i in 1..=rounds {
            if i <= self.config.loader.count {
                self.env.spawn(
                    format!("Loader - {}", i),
                    Loader::new(raw_materials, self.config.loader.loading_time),
                )?;
            }
            for station in stations.iter().filter(|station| i <= station.workers) {
                let stage = station.stage;
                let output = match Stage::ALL.get(stage.index() + 1) {
                    Some(next) => Output::Buffer(self.inputs[next.index()]),
                    None => Output::Finished {
                        target: self.config.target_units,
                    },
                };
                self.env.spawn(
                    format!("{} - {}", stage.worker_title(), i),
                    StationWorker::new(
                        stage,
                        self.inputs[stage.index()],
                        self.machines[stage.index()],
                        output,
                        station.service_time,
                    ),
                )?;
            }
        }

        for failure in &self.config.failures {
            let machines = self.machines[failure.stage.index()];
            self.env.spawn(
                failure.stage.machine_name(),
                FailureInjector::new(failure, machines)?,
            )?;
        }

        Ok(())
    }

    /// Configuración validada de la corrida.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Semilla efectiva de la fuente aleatoria.
    pub fn seed(&self) -> u64 {
        self.env.result().seed
    }

    /// Horizonte de la corrida.
    pub fn horizon(&self) -> SimTime {
        self.horizon
    }

    /// Entorno subyacente, para inspeccionar recursos y buffers.
    pub fn environment(&self) -> &Environment {
        &self.env
    }

    /// Entorno subyacente, para avanzar la simulación evento por evento.
    pub fn environment_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    /// Recurso (banco de máquinas) de una estación.
    pub fn machines(&self, stage: Stage) -> ResourceId {
        self.machines[stage.index()]
    }

    /// Buffer de entrada de una estación.
    pub fn input(&self, stage: Stage) -> BufferId {
        self.inputs[stage.index()]
    }

    /// Ejecuta la simulación y devuelve el resultado.
    ///
    /// # Errors
    ///
    /// El primer `SimulationError` que produzca algún proceso.
    pub fn run(mut self) -> Result<SimulationResult, SimulationError> {
        info!(
            seed = self.seed(),
            horizon = self.config.horizon,
            target_units = ?self.config.target_units,
            "Iniciando simulación de la línea de manufactura"
        );

        let summary = self.env.run(self.horizon.as_f64())?;

        let result = self.env.into_result();
        info!(
            outcome = %summary.outcome,
            final_time = summary.final_time.as_f64(),
            finished_units = result.finished_units,
            "Simulación completada"
        );
        Ok(result)
    }
}
