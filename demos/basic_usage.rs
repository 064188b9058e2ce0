//! Ejemplo básico de uso del simulador de línea de manufactura

use manufacturing_line_simulator::{MetricsCalculator, Simulation, SimulationConfig, Stage};

fn main() -> anyhow::Result<()> {
    println!("=== Ejemplo: Uso Básico del Simulador ===\n");
    let calculator = MetricsCalculator::new();

    // Planta de referencia durante un día (tres turnos)
    println!("1. Ejecutando la planta de referencia con fallas...");
    let config = SimulationConfig::default()
        .with_seed(42)
        .with_horizon(480.0 * 3.0);
    let with_failures = Simulation::new(config.clone())?.run()?;
    println!("{}", calculator.generate_report(&with_failures));

    // Misma semilla, sin fallas
    println!("\n2. Ejecutando la misma planta sin fallas...");
    let without_failures = Simulation::new(config.without_failures())?.run()?;
    println!("{}", calculator.generate_report(&without_failures));

    // Comparación de resultados
    println!("\n=== Comparación ===");
    println!("| Métrica              | Con fallas | Sin fallas |");
    println!("|----------------------|------------|------------|");
    println!(
        "| Unidades terminadas  | {:>10} | {:>10} |",
        with_failures.finished_units, without_failures.finished_units
    );
    for stage in Stage::ALL {
        println!(
            "| Muestras {:<11} | {:>10} | {:>10} |",
            stage.to_string(),
            with_failures.stage(stage).len(),
            without_failures.stage(stage).len()
        );
    }

    // Generar archivos CSV para análisis posterior
    std::fs::write("with_failures.csv", calculator.generate_csv_report(&with_failures))?;
    std::fs::write(
        "without_failures.csv",
        calculator.generate_csv_report(&without_failures),
    )?;

    println!("\nArchivos CSV generados:");
    println!("   - with_failures.csv");
    println!("   - without_failures.csv");

    Ok(())
}
