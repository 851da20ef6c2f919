//! The cutting-plane method for beam-weight planning under expected-value
//! dose constraints.
//!
//! The two constraints are relaxed into finitely many linear cuts. Each pass
//! solves the current LP, asks the separation oracles for the most violated
//! threshold on each side and, when one is found, appends the cut built at
//! that threshold. The model only ever gains rows.

use crate::config::{Config, Objective, ThresholdSearch};
use crate::cut::{self, CutPool, CutSide};
use crate::distribution::Distribution;
use crate::dose::DoseInfluenceMatrix;
use crate::error::{Error, Result};
use crate::oracle::{self, Separation};
use crate::selector;
use crate::solver::{LinearSolver, SolveStatus};
use serde::Serialize;

/// Everything that defines one planning instance.
pub struct PlanningProblem {
    pub matrix: DoseInfluenceMatrix,
    /// X, the organ-at-risk voxels
    pub oar_voxels: Vec<usize>,
    /// Y, the target voxels
    pub ptv_voxels: Vec<usize>,
    /// Ux
    pub oar_bound: f64,
    /// Ly
    pub ptv_bound: f64,
    pub oar_distribution: Box<dyn Distribution>,
    pub ptv_distribution: Box<dyn Distribution>,
}

impl PlanningProblem {
    pub fn validate(&self) -> Result<()> {
        self.matrix.validate_voxel_set(&self.oar_voxels, "OAR")?;
        self.matrix.validate_voxel_set(&self.ptv_voxels, "PTV")?;
        if !self.oar_bound.is_finite() || !self.ptv_bound.is_finite() {
            return Err(Error::InvalidParameter(format!(
                "dose bounds must be finite, got {} and {}",
                self.oar_bound, self.ptv_bound
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Init,
    Solving,
    Evaluating,
    CutAdded,
    Converged,
    Infeasible,
    MaxItersReached,
    Failed,
}

/// What happened in one pass of the loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IterationRecord {
    pub iteration: usize,
    pub objective: f64,
    pub oar_violation: f64,
    pub ptv_violation: f64,
    pub oar_cuts: usize,
    pub ptv_cuts: usize,
}

#[derive(Debug, Clone)]
pub struct Solution {
    pub objective: f64,
    pub weights: Vec<f64>,
    pub iterations: usize,
    pub oar_cuts: usize,
    pub ptv_cuts: usize,
    pub history: Vec<IterationRecord>,
}

pub struct CuttingPlaneSolver<'a, S: LinearSolver> {
    problem: &'a PlanningProblem,
    config: &'a Config,
    solver: S,
    columns: Vec<usize>,
    cuts: CutPool,
    state: State,
    iteration: usize,
    history: Vec<IterationRecord>,
    oar_thresholds: Vec<f64>,
    ptv_thresholds: Vec<f64>,
}

impl<'a, S: LinearSolver> CuttingPlaneSolver<'a, S> {
    pub fn new(
        problem: &'a PlanningProblem,
        config: &'a Config,
        solver: S,
    ) -> Result<Self> {
        config.validate()?;
        problem.validate()?;
        let n = config.num_threshold_values;
        let (oar_thresholds, ptv_thresholds) = match config.threshold_search {
            ThresholdSearch::Nominal => (
                problem.oar_distribution.threshold_range(n),
                problem.ptv_distribution.threshold_range(n),
            ),
            ThresholdSearch::Wide => (
                problem.oar_distribution.wide_threshold_range(n),
                problem.ptv_distribution.wide_threshold_range(n),
            ),
        };
        Ok(Self {
            problem,
            config,
            solver,
            columns: vec![],
            cuts: CutPool::new(),
            state: State::Init,
            iteration: 0,
            history: vec![],
            oar_thresholds,
            ptv_thresholds,
        })
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn cuts(&self) -> &CutPool {
        &self.cuts
    }

    pub fn history(&self) -> &[IterationRecord] {
        &self.history
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    fn objective_coefficients(&self) -> Vec<f64> {
        match self.config.objective {
            Objective::TotalDose => self.problem.matrix.column_sums(),
            Objective::BeamletStrength => {
                vec![1.0; self.problem.matrix.num_beamlets()]
            }
        }
    }

    /// Adds the weight columns and the baseline constraints (12) and (13),
    /// which are the cuts over the full sets at the nominal bounds.
    fn initialize(&mut self) -> Result<()> {
        let costs = self.objective_coefficients();
        for cost in costs.into_iter() {
            let column = self.solver.add_column(
                cost,
                0.0,
                self.config.weight_upper_bound,
            )?;
            self.columns.push(column);
        }
        let problem = self.problem;
        self.add_cut(
            CutSide::Oar,
            problem.oar_voxels.clone(),
            problem.oar_bound,
        )?;
        self.add_cut(
            CutSide::Ptv,
            problem.ptv_voxels.clone(),
            problem.ptv_bound,
        )?;
        log::info!(
            "Initial model with {} beamlets, {} OAR voxels and {} PTV voxels",
            self.columns.len(),
            problem.oar_voxels.len(),
            problem.ptv_voxels.len()
        );
        Ok(())
    }

    fn add_cut(
        &mut self,
        side: CutSide,
        subset: Vec<usize>,
        threshold: f64,
    ) -> Result<()> {
        let problem = self.problem;
        let constraint = match side {
            CutSide::Oar => cut::oar_cut(
                &problem.matrix,
                &self.columns,
                &subset,
                threshold,
                problem.oar_voxels.len(),
                problem.oar_distribution.as_ref(),
            ),
            CutSide::Ptv => cut::ptv_cut(
                &problem.matrix,
                &self.columns,
                &subset,
                threshold,
                problem.ptv_voxels.len(),
                problem.ptv_distribution.as_ref(),
            ),
        };
        self.solver.add_row(&constraint)?;
        let normalization = match side {
            CutSide::Oar => problem.oar_voxels.len(),
            CutSide::Ptv => problem.ptv_voxels.len(),
        };
        let added =
            self.cuts
                .add(side, subset, threshold, normalization, constraint);
        log::debug!(
            "Cut {} ({:?}) at threshold {:.6} over {} voxels, rhs {:.6}",
            added.id,
            added.side,
            added.threshold,
            added.voxels.len(),
            added.rhs()
        );
        Ok(())
    }

    fn solve(&mut self) -> Result<(f64, Vec<f64>)> {
        self.state = State::Solving;
        match self.solver.solve() {
            SolveStatus::Optimal => {
                let values = self.solver.column_values();
                let weights: Vec<f64> =
                    self.columns.iter().map(|&column| values[column]).collect();
                Ok((self.solver.objective_value(), weights))
            }
            SolveStatus::Infeasible => {
                self.state = State::Infeasible;
                Err(Error::Infeasible)
            }
            SolveStatus::Failed(reason) => Err(Error::SolveFailure(reason)),
        }
    }

    fn evaluate(
        &mut self,
        weights: &[f64],
    ) -> (Vec<f64>, Vec<f64>, Separation, Separation) {
        self.state = State::Evaluating;
        let problem = self.problem;
        let oar_doses = problem.matrix.doses(&problem.oar_voxels, weights);
        let ptv_doses = problem.matrix.doses(&problem.ptv_voxels, weights);
        let oar = oracle::delta_x(
            &oar_doses,
            problem.oar_voxels.len(),
            problem.oar_distribution.as_ref(),
            0.0,
            &self.oar_thresholds,
        );
        let ptv = oracle::delta_y(
            &ptv_doses,
            problem.ptv_voxels.len(),
            problem.ptv_distribution.as_ref(),
            0.0,
            &self.ptv_thresholds,
        );
        (oar_doses, ptv_doses, oar, ptv)
    }

    pub fn run(&mut self) -> Result<Solution> {
        self.run_with_observer(|_| {})
    }

    /// Runs the loop to completion, calling `observer` after every
    /// evaluated pass.
    pub fn run_with_observer(
        &mut self,
        mut observer: impl FnMut(&IterationRecord),
    ) -> Result<Solution> {
        if self.state != State::Init {
            return Err(Error::InvalidParameter(
                "the cutting-plane solver can only run once".to_string(),
            ));
        }
        let outcome = self
            .initialize()
            .and_then(|_| self.iterate(&mut observer));
        if outcome.is_err()
            && !matches!(self.state, State::Infeasible | State::MaxItersReached)
        {
            self.state = State::Failed;
        }
        outcome
    }

    fn iterate(
        &mut self,
        observer: &mut impl FnMut(&IterationRecord),
    ) -> Result<Solution> {
        let problem = self.problem;

        loop {
            self.iteration += 1;
            let (objective, weights) = self.solve()?;
            let (oar_doses, ptv_doses, oar, ptv) = self.evaluate(&weights);

            let record = IterationRecord {
                iteration: self.iteration,
                objective,
                oar_violation: oar.violation,
                ptv_violation: ptv.violation,
                oar_cuts: self.cuts.oar_cut_count,
                ptv_cuts: self.cuts.ptv_cut_count,
            };
            log::debug!(
                "Iteration {}: objective {:.6}, dx {:.3e}, dy {:.3e}, \
                 cuts {}/{}",
                record.iteration,
                record.objective,
                record.oar_violation,
                record.ptv_violation,
                record.oar_cuts,
                record.ptv_cuts
            );
            observer(&record);
            self.history.push(record);

            if oar.violation <= self.config.epsilon
                && ptv.violation <= self.config.epsilon
            {
                self.state = State::Converged;
                log::info!(
                    "Converged after {} iterations with {} OAR and {} PTV cuts",
                    self.iteration,
                    self.cuts.oar_cut_count,
                    self.cuts.ptv_cut_count
                );
                return Ok(Solution {
                    objective,
                    weights,
                    iterations: self.iteration,
                    oar_cuts: self.cuts.oar_cut_count,
                    ptv_cuts: self.cuts.ptv_cut_count,
                    history: self.history.clone(),
                });
            }

            if oar.is_violated() {
                let subset = selector::select_above(
                    &oar_doses,
                    &problem.oar_voxels,
                    oar.threshold,
                );
                self.add_cut(CutSide::Oar, subset, oar.threshold)?;
            }
            if ptv.is_violated() {
                let subset = selector::select_below(
                    &ptv_doses,
                    &problem.ptv_voxels,
                    ptv.threshold,
                );
                self.add_cut(CutSide::Ptv, subset, ptv.threshold)?;
            }
            self.state = State::CutAdded;

            if self.iteration >= self.config.max_iterations {
                self.state = State::MaxItersReached;
                log::warn!(
                    "Reached the iteration cap ({}) without convergence",
                    self.config.max_iterations
                );
                return Err(Error::MaxIterationsExceeded {
                    iterations: self.iteration,
                    objective,
                    oar_violation: oar.violation,
                    ptv_violation: ptv.violation,
                    weights,
                });
            }
        }
    }
}
