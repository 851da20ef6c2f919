use crate::cut::{CutPool, CutSide};
use crate::cutting_plane::{IterationRecord, Solution};
use crate::distribution::Distribution;
use crate::error::{Error, Result};

use csv::Writer;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum SolutionStatus {
    Converged,
    Infeasible,
    MaxIterationsExceeded,
    SolveFailure,
    InvalidInput,
    Failed,
}

#[derive(Serialize)]
struct SolutionOutput<'a> {
    status: SolutionStatus,
    objective: Option<f64>,
    weights: Option<&'a [f64]>,
    iterations: usize,
    oar_cuts: usize,
    ptv_cuts: usize,
    message: Option<String>,
}

fn solution_output<'a>(
    outcome: &'a Result<Solution>,
    history: &[IterationRecord],
    cuts: &CutPool,
) -> SolutionOutput<'a> {
    match outcome {
        Ok(solution) => SolutionOutput {
            status: SolutionStatus::Converged,
            objective: Some(solution.objective),
            weights: Some(&solution.weights),
            iterations: solution.iterations,
            oar_cuts: solution.oar_cuts,
            ptv_cuts: solution.ptv_cuts,
            message: None,
        },
        Err(err) => {
            let status = match err {
                Error::Infeasible => SolutionStatus::Infeasible,
                Error::MaxIterationsExceeded { .. } => {
                    SolutionStatus::MaxIterationsExceeded
                }
                Error::SolveFailure(_) => SolutionStatus::SolveFailure,
                Error::InvalidParameter(_) => SolutionStatus::InvalidInput,
                Error::Io(_) | Error::Json(_) | Error::Csv(_) => {
                    SolutionStatus::Failed
                }
            };
            // a capped run still has the point of its last relaxation
            let (objective, weights) = match err {
                Error::MaxIterationsExceeded {
                    objective, weights, ..
                } => (Some(*objective), Some(weights.as_slice())),
                _ => (None, None),
            };
            SolutionOutput {
                status,
                objective,
                weights,
                iterations: history.len(),
                oar_cuts: cuts.oar_cut_count,
                ptv_cuts: cuts.ptv_cut_count,
                message: Some(err.to_string()),
            }
        }
    }
}

fn write_solution(
    outcome: &Result<Solution>,
    history: &[IterationRecord],
    cuts: &CutPool,
    path: &str,
) -> Result<()> {
    let file = File::create(path.to_owned() + "/solution.json")?;
    let output = solution_output(outcome, history, cuts);
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &output)?;
    writer.flush()?;
    Ok(())
}

fn write_iterations(history: &[IterationRecord], path: &str) -> Result<()> {
    let mut wtr = Writer::from_path(&(path.to_owned() + "/iterations.csv"))?;
    for record in history.iter() {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct CutOutput {
    id: usize,
    side: CutSide,
    threshold: f64,
    subset_size: usize,
    normalization: usize,
    rhs: f64,
}

fn write_cuts(cuts: &CutPool, path: &str) -> Result<()> {
    let mut wtr = Writer::from_path(&(path.to_owned() + "/cuts.csv"))?;
    for cut in cuts.pool.iter() {
        wtr.serialize(CutOutput {
            id: cut.id,
            side: cut.side,
            threshold: cut.threshold,
            subset_size: cut.voxels.len(),
            normalization: cut.normalization,
            rhs: cut.rhs(),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct DistributionOutput {
    threshold: f64,
    cdf: f64,
    int_to: f64,
    int_to_inf: f64,
}

/// Tabulates `distribution` and its two integrals over `thresholds` into
/// `path/name.csv`.
pub fn write_distribution_table(
    distribution: &dyn Distribution,
    thresholds: &[f64],
    path: &str,
    name: &str,
) -> Result<()> {
    let mut wtr = Writer::from_path(&format!("{}/{}.csv", path, name))?;
    for &threshold in thresholds.iter() {
        wtr.serialize(DistributionOutput {
            threshold,
            cdf: distribution.cdf(threshold),
            int_to: distribution.int_to(threshold),
            int_to_inf: distribution.int_to_inf(threshold),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes `solution.json`, `iterations.csv` and `cuts.csv` into `path`.
/// A failed run still gets all three files, with the failure recorded as
/// the solution status.
pub fn generate_outputs(
    outcome: &Result<Solution>,
    history: &[IterationRecord],
    cuts: &CutPool,
    path: &str,
) -> Result<()> {
    write_solution(outcome, history, cuts, path)?;
    write_iterations(history, path)?;
    write_cuts(cuts, path)?;
    Ok(())
}
