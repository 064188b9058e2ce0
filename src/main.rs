//! Simulador de la línea de manufactura.
//!
//! ```bash
//! # Corrida de referencia (10 días, 3 turnos) con semilla fija
//! manufacturing-line-simulator --seed 42
//!
//! # Un turno, con traza y salida CSV
//! manufacturing-line-simulator --horizon 480 --trace --format csv
//!
//! # Configuración desde archivo, detenerse al empacar 500 unidades
//! manufacturing-line-simulator --config planta.json --target-units 500
//! ```

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use manufacturing_line_simulator::{MetricsCalculator, Simulation, SimulationConfig};

/// Formato del reporte final.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Csv,
    Json,
}

/// Simulador de eventos discretos de una línea de manufactura
#[derive(Parser, Debug)]
#[command(name = "manufacturing-line-simulator")]
#[command(version, about, long_about = None)]
struct Args {
    /// Archivo JSON con la configuración; los campos ausentes toman el valor por defecto
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Semilla para repetir una corrida. Si se omite se sortea una.
    #[arg(long)]
    seed: Option<u64>,

    /// Tiempo simulado máximo en minutos
    #[arg(long)]
    horizon: Option<f64>,

    /// Detener la corrida al empacar esta cantidad de unidades
    #[arg(long)]
    target_units: Option<u64>,

    /// Imprimir cada transición registrada
    #[arg(long)]
    trace: bool,

    /// Formato del reporte
    #[arg(short, long, value_enum, default_value = "text")]
    format: Format,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,manufacturing_line_simulator=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    // ---------- CONFIGURACIÓN ----------
    let mut config = match &args.config {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("No se pudo leer {}", path.display()))?;
            SimulationConfig::from_json(&json)
                .with_context(|| format!("Configuración inválida en {}", path.display()))?
        }
        None => SimulationConfig::default(),
    };
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }
    if let Some(horizon) = args.horizon {
        config = config.with_horizon(horizon);
    }
    if let Some(target) = args.target_units {
        config = config.with_target_units(target);
    }
    if args.trace {
        config = config.with_trace(true);
    }

    // ---------- SIMULACIÓN ----------
    let simulation = Simulation::new(config).context("No se pudo construir la simulación")?;
    info!(seed = simulation.seed(), "Usa --seed para repetir esta corrida");
    let result = simulation.run().context("La simulación falló")?;

    // ---------- REPORTE ----------
    if args.trace && args.format != Format::Json {
        for record in &result.trace {
            println!("{}", record);
        }
    }

    let calculator = MetricsCalculator::new();
    match args.format {
        Format::Text => println!("{}", calculator.generate_report(&result)),
        Format::Csv => print!("{}", calculator.generate_csv_report(&result)),
        Format::Json => println!(
            "{}",
            serde_json::to_string_pretty(&result).context("No se pudo serializar el resultado")?
        ),
    }

    Ok(())
}
