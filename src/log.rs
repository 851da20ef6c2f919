use crate::config::Config;
use crate::cutting_plane::{IterationRecord, PlanningProblem, Solution};
use std::time::Duration;

pub fn show_greeting() {
    println!("\nbeamcut - cutting-plane beam-weight planning");
}

pub fn input_reading_line(path: &str) {
    println!("\nReading input files from '{}'", path);
}

/// Helper function for displaying the size of the instance being solved
pub fn problem_summary(problem: &PlanningProblem, config: &Config) {
    println!("\n# Problem");
    println!("- Voxels: {}", problem.matrix.num_voxels());
    println!("- Beamlets: {}", problem.matrix.num_beamlets());
    println!("- Nonzeros: {}", problem.matrix.num_nonzeros());
    println!(
        "- OAR voxels: {} (Ux = {})",
        problem.oar_voxels.len(),
        problem.oar_bound
    );
    println!(
        "- PTV voxels: {} (Ly = {})",
        problem.ptv_voxels.len(),
        problem.ptv_bound
    );
    println!("- Threshold values: {}", config.num_threshold_values);
    println!("- Max iterations: {}\n", config.max_iterations);
}

/// Helper function for displaying the iteration table header
pub fn iteration_table_header() {
    println!(
        "{0: ^10} | {1: ^15} | {2: ^11} | {3: ^11} | {4: ^6} | {5: ^6}",
        "iteration", "objective", "dx", "dy", "kx", "ky"
    )
}

/// Helper function for displaying a divider for the iteration table
pub fn iteration_table_divider() {
    println!(
        "-------------------------------------------------------------------------"
    )
}

pub fn iteration_table_row(record: &IterationRecord) {
    println!(
        "{0: >10} | {1: >15.6} | {2: >11.3e} | {3: >11.3e} | {4: >6} | {5: >6}",
        record.iteration,
        record.objective,
        record.oar_violation,
        record.ptv_violation,
        record.oar_cuts,
        record.ptv_cuts
    )
}

pub fn convergence_summary(solution: &Solution) {
    println!("\nConverged after {} iterations", solution.iterations);
    println!("Objective: {:.6}", solution.objective);
    println!(
        "Cuts: {} OAR, {} PTV",
        solution.oar_cuts, solution.ptv_cuts
    );
}

pub fn failure_summary(reason: &str) {
    println!("\nNo solution: {}", reason);
}

pub fn output_generation_line(path: &str) {
    println!("\nWriting outputs to '{}'", path);
}

pub fn show_farewell(time: Duration) {
    println!(
        "\nTotal running time: {:.2} s",
        time.as_millis() as f64 / 1000.0
    )
}
