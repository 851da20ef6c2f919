//! The LP collaborator used by the cutting-plane loop.
//!
//! [`LinearSolver`] is the only contract the loop depends on. [`HighsSolver`]
//! implements it over a live HiGHS instance: rows are appended to the loaded
//! model, so every re-solve hot-starts from the previous basis.

use std::convert::TryFrom;
use std::ffi::{c_void, CString};
use std::fmt::{Debug, Formatter};
use std::num::TryFromIntError;
use std::os::raw::{c_char, c_int};

use highs_sys::*;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::expression::LinearConstraint;

/// Outcome of one solve, as seen by the cutting-plane loop.
#[derive(Debug, Clone, PartialEq)]
pub enum SolveStatus {
    Optimal,
    Infeasible,
    Failed(String),
}

/// Incremental LP with a minimization objective given by column costs.
pub trait LinearSolver {
    /// Adds a decision variable bounded in `[lower, upper]`, returning its
    /// column index.
    fn add_column(
        &mut self,
        cost: f64,
        lower: f64,
        upper: f64,
    ) -> Result<usize>;

    /// Appends `constraint` without discarding previous rows, returning its
    /// row index.
    fn add_row(&mut self, constraint: &LinearConstraint) -> Result<usize>;

    fn solve(&mut self) -> SolveStatus;

    /// Objective of the last optimal solve.
    fn objective_value(&self) -> f64;

    /// Column values of the last optimal solve, in column order.
    fn column_values(&self) -> Vec<f64>;
}

/// The kinds of results of an optimization
#[derive(Clone, Copy, Debug, PartialOrd, PartialEq, Ord, Eq)]
pub enum HighsModelStatus {
    /// not initialized
    NotSet = MODEL_STATUS_NOTSET as isize,
    /// Unable to load model
    LoadError = MODEL_STATUS_LOAD_ERROR as isize,
    /// invalid model
    ModelError = MODEL_STATUS_MODEL_ERROR as isize,
    /// Unable to run the pre-solve phase
    PresolveError = MODEL_STATUS_PRESOLVE_ERROR as isize,
    /// Unable to solve
    SolveError = MODEL_STATUS_SOLVE_ERROR as isize,
    /// Unable to clean after solve
    PostsolveError = MODEL_STATUS_POSTSOLVE_ERROR as isize,
    /// No variables in the model: nothing to optimize
    ModelEmpty = MODEL_STATUS_MODEL_EMPTY as isize,
    /// There is no solution to the problem
    Infeasible = MODEL_STATUS_INFEASIBLE as isize,
    /// The problem in unbounded or infeasible
    UnboundedOrInfeasible = MODEL_STATUS_UNBOUNDED_OR_INFEASIBLE as isize,
    /// The problem is unbounded: there is no single optimal value
    Unbounded = MODEL_STATUS_UNBOUNDED as isize,
    /// An optimal solution was found
    Optimal = MODEL_STATUS_OPTIMAL as isize,
    /// objective bound
    ObjectiveBound = MODEL_STATUS_OBJECTIVE_BOUND as isize,
    /// objective target
    ObjectiveTarget = MODEL_STATUS_OBJECTIVE_TARGET as isize,
    /// reached limit
    ReachedTimeLimit = MODEL_STATUS_REACHED_TIME_LIMIT as isize,
    /// reached limit
    ReachedIterationLimit = MODEL_STATUS_REACHED_ITERATION_LIMIT as isize,
    /// Unknown model status
    Unknown = MODEL_STATUS_UNKNOWN as isize,
}

/// An unexpected status code was returned by HiGHS
#[derive(PartialEq, Clone, Copy)]
pub struct InvalidStatus(pub c_int);

impl Debug for InvalidStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} is not a valid HiGHS model status", self.0)
    }
}

impl TryFrom<c_int> for HighsModelStatus {
    type Error = InvalidStatus;

    fn try_from(value: c_int) -> std::result::Result<Self, Self::Error> {
        match value {
            MODEL_STATUS_NOTSET => Ok(Self::NotSet),
            MODEL_STATUS_LOAD_ERROR => Ok(Self::LoadError),
            MODEL_STATUS_MODEL_ERROR => Ok(Self::ModelError),
            MODEL_STATUS_PRESOLVE_ERROR => Ok(Self::PresolveError),
            MODEL_STATUS_SOLVE_ERROR => Ok(Self::SolveError),
            MODEL_STATUS_POSTSOLVE_ERROR => Ok(Self::PostsolveError),
            MODEL_STATUS_MODEL_EMPTY => Ok(Self::ModelEmpty),
            MODEL_STATUS_INFEASIBLE => Ok(Self::Infeasible),
            MODEL_STATUS_UNBOUNDED => Ok(Self::Unbounded),
            MODEL_STATUS_UNBOUNDED_OR_INFEASIBLE => {
                Ok(Self::UnboundedOrInfeasible)
            }
            MODEL_STATUS_OPTIMAL => Ok(Self::Optimal),
            MODEL_STATUS_OBJECTIVE_BOUND => Ok(Self::ObjectiveBound),
            MODEL_STATUS_OBJECTIVE_TARGET => Ok(Self::ObjectiveTarget),
            MODEL_STATUS_REACHED_TIME_LIMIT => Ok(Self::ReachedTimeLimit),
            MODEL_STATUS_REACHED_ITERATION_LIMIT => {
                Ok(Self::ReachedIterationLimit)
            }
            MODEL_STATUS_UNKNOWN => Ok(Self::Unknown),
            n => Err(InvalidStatus(n)),
        }
    }
}

/// The status of a highs operation
#[derive(Clone, Copy, Debug, PartialOrd, PartialEq, Ord, Eq)]
pub enum HighsStatus {
    /// Success
    OK = 0,
    /// Done, with warning
    Warning = 1,
    /// An error occurred
    Error = 2,
}

impl From<TryFromIntError> for HighsStatus {
    fn from(_: TryFromIntError) -> Self {
        Self::Error
    }
}

impl TryFrom<c_int> for HighsStatus {
    type Error = InvalidStatus;

    fn try_from(value: c_int) -> std::result::Result<Self, InvalidStatus> {
        match value {
            STATUS_OK => Ok(Self::OK),
            STATUS_WARNING => Ok(Self::Warning),
            STATUS_ERROR => Ok(Self::Error),
            n => Err(InvalidStatus(n)),
        }
    }
}

impl From<HighsStatus> for Error {
    fn from(status: HighsStatus) -> Self {
        Error::SolveFailure(format!("HiGHS call returned {:?}", status))
    }
}

pub trait HighsOptionValue {
    unsafe fn apply_to_highs(
        self,
        highs: *mut c_void,
        option: *const c_char,
    ) -> c_int;
}

impl HighsOptionValue for bool {
    unsafe fn apply_to_highs(
        self,
        highs: *mut c_void,
        option: *const c_char,
    ) -> c_int {
        Highs_setBoolOptionValue(highs, option, if self { 1 } else { 0 })
    }
}

impl HighsOptionValue for i32 {
    unsafe fn apply_to_highs(
        self,
        highs: *mut c_void,
        option: *const c_char,
    ) -> c_int {
        Highs_setIntOptionValue(highs, option, self)
    }
}

impl HighsOptionValue for f64 {
    unsafe fn apply_to_highs(
        self,
        highs: *mut c_void,
        option: *const c_char,
    ) -> c_int {
        Highs_setDoubleOptionValue(highs, option, self)
    }
}

impl<'a> HighsOptionValue for &'a str {
    unsafe fn apply_to_highs(
        self,
        highs: *mut c_void,
        option: *const c_char,
    ) -> c_int {
        match CString::new(self) {
            Ok(value) => {
                Highs_setStringOptionValue(highs, option, value.as_ptr())
            }
            Err(_) => STATUS_ERROR,
        }
    }
}

fn c(n: usize) -> std::result::Result<HighsInt, HighsStatus> {
    Ok(n.try_into()?)
}

macro_rules! highs_call {
    ($function_name:ident ($($param:expr),+)) => {
        try_handle_status(
            $function_name($($param),+),
            stringify!($function_name)
        )
    }
}

fn try_handle_status(
    status: c_int,
    msg: &str,
) -> std::result::Result<HighsStatus, HighsStatus> {
    match HighsStatus::try_from(status) {
        Ok(status @ HighsStatus::OK) => Ok(status),
        Ok(status @ HighsStatus::Warning) => {
            log::warn!("HiGHS emitted a warning: {}", msg);
            Ok(status)
        }
        Ok(error) => Err(error),
        Err(invalid) => {
            log::error!("{:?} from {}", invalid, msg);
            Err(HighsStatus::Error)
        }
    }
}

#[derive(Debug)]
struct HighsPtr(*mut c_void);

impl Drop for HighsPtr {
    fn drop(&mut self) {
        unsafe { Highs_destroy(self.0) }
    }
}

impl Default for HighsPtr {
    fn default() -> Self {
        Self(unsafe { Highs_create() })
    }
}

impl HighsPtr {
    // Needed until https://github.com/ERGO-Code/HiGHS/issues/479 is fixed
    unsafe fn unsafe_mut_ptr(&self) -> *mut c_void {
        self.0
    }

    fn mut_ptr(&mut self) -> *mut c_void {
        self.0
    }

    /// Prevents writing anything to the standard output when solving the model
    fn make_quiet(&mut self) -> std::result::Result<(), HighsStatus> {
        self.set_option("output_flag", false)?;
        self.set_option("log_to_console", false)
    }

    fn set_option<V: HighsOptionValue>(
        &mut self,
        option: &str,
        value: V,
    ) -> std::result::Result<(), HighsStatus> {
        let c_str = CString::new(option).map_err(|_| HighsStatus::Error)?;
        let status =
            unsafe { value.apply_to_highs(self.mut_ptr(), c_str.as_ptr()) };
        try_handle_status(status, "Highs_setOptionValue")?;
        Ok(())
    }

    fn num_cols(&self) -> std::result::Result<usize, TryFromIntError> {
        let n = unsafe { Highs_getNumCols(self.0) };
        n.try_into()
    }

    fn num_rows(&self) -> std::result::Result<usize, TryFromIntError> {
        let n = unsafe { Highs_getNumRows(self.0) };
        n.try_into()
    }
}

/// Whether to maximize or minimize the objective function
#[repr(C)]
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum Sense {
    Maximise = OBJECTIVE_SENSE_MAXIMIZE as isize,
    Minimise = OBJECTIVE_SENSE_MINIMIZE as isize,
}

/// A HiGHS model that grows column by column and row by row.
#[derive(Debug)]
pub struct Model {
    highs: HighsPtr,
}

impl Model {
    /// Creates an empty, quiet model with the given sense.
    pub fn try_new(sense: Sense) -> std::result::Result<Self, HighsStatus> {
        let mut highs = HighsPtr::default();
        highs.make_quiet()?;
        let mut model = Self { highs };
        unsafe {
            highs_call!(Highs_changeObjectiveSense(
                model.highs.mut_ptr(),
                sense as c_int
            ))
        }?;
        Ok(model)
    }

    pub fn set_option<V: HighsOptionValue>(
        &mut self,
        option: &str,
        value: V,
    ) -> std::result::Result<(), HighsStatus> {
        self.highs.set_option(option, value)
    }

    pub fn try_add_column(
        &mut self,
        cost: f64,
        lower: f64,
        upper: f64,
    ) -> std::result::Result<usize, HighsStatus> {
        let no_index: [HighsInt; 0] = [];
        let no_value: [f64; 0] = [];
        unsafe {
            highs_call!(Highs_addCol(
                self.highs.mut_ptr(),
                cost,
                lower,
                upper,
                0,
                no_index.as_ptr(),
                no_value.as_ptr()
            ))
        }?;
        Ok(self.highs.num_cols()? - 1)
    }

    /// Tries to add a new constraint to the highs model.
    ///
    /// Returns the added row index, or the error status value if HiGHS
    /// returned an error status.
    pub fn try_add_row(
        &mut self,
        lower: f64,
        upper: f64,
        row_factors: impl IntoIterator<Item = (usize, f64)>,
    ) -> std::result::Result<usize, HighsStatus> {
        let (cols, factors): (Vec<_>, Vec<_>) = row_factors.into_iter().unzip();
        let cols = cols
            .into_iter()
            .map(c)
            .collect::<std::result::Result<Vec<HighsInt>, HighsStatus>>()?;

        unsafe {
            highs_call!(Highs_addRow(
                self.highs.mut_ptr(),
                lower,
                upper,
                c(cols.len())?,
                cols.as_ptr(),
                factors.as_ptr()
            ))
        }?;

        Ok(self.highs.num_rows()? - 1)
    }

    /// Runs the solver. The outcome is read back through [`Model::status`].
    pub fn try_solve(&mut self) -> std::result::Result<(), HighsStatus> {
        unsafe { highs_call!(Highs_run(self.highs.mut_ptr())) }?;
        Ok(())
    }

    /// The status of the solution. Should be Optimal if everything went well.
    pub fn status(
        &self,
    ) -> std::result::Result<HighsModelStatus, InvalidStatus> {
        let model_status =
            unsafe { Highs_getModelStatus(self.highs.unsafe_mut_ptr()) };
        HighsModelStatus::try_from(model_status)
    }

    pub fn get_objective_value(&self) -> f64 {
        unsafe { Highs_getObjectiveValue(self.highs.unsafe_mut_ptr()) }
    }

    /// Primal values of the columns in the current solution
    pub fn get_column_values(&self) -> Vec<f64> {
        let cols = self.num_cols();
        let rows = self.num_rows();
        let mut colvalue: Vec<f64> = vec![0.; cols];
        let mut coldual: Vec<f64> = vec![0.; cols];
        let mut rowvalue: Vec<f64> = vec![0.; rows];
        let mut rowdual: Vec<f64> = vec![0.; rows];

        unsafe {
            Highs_getSolution(
                self.highs.unsafe_mut_ptr(),
                colvalue.as_mut_ptr(),
                coldual.as_mut_ptr(),
                rowvalue.as_mut_ptr(),
                rowdual.as_mut_ptr(),
            );
        }

        colvalue
    }

    pub fn num_cols(&self) -> usize {
        self.highs.num_cols().unwrap_or(0)
    }

    pub fn num_rows(&self) -> usize {
        self.highs.num_rows().unwrap_or(0)
    }
}

/// Helper function for setting the same solver options on every model:
/// a single-threaded simplex without presolve, so appended rows re-solve
/// from the previous basis.
fn set_default_solver_options(
    model: &mut Model,
    time_limit: f64,
) -> std::result::Result<(), HighsStatus> {
    model.set_option("presolve", "off")?;
    model.set_option("solver", "simplex")?;
    model.set_option("parallel", "off")?;
    model.set_option("threads", 1)?;
    model.set_option("primal_feasibility_tolerance", 1e-7)?;
    model.set_option("dual_feasibility_tolerance", 1e-7)?;
    model.set_option("time_limit", time_limit)?;
    Ok(())
}

/// [`LinearSolver`] backed by HiGHS.
#[derive(Debug)]
pub struct HighsSolver {
    model: Model,
}

impl HighsSolver {
    pub fn new(config: &Config) -> Result<Self> {
        let mut model = Model::try_new(Sense::Minimise)?;
        set_default_solver_options(&mut model, config.time_limit)?;
        Ok(Self { model })
    }

    pub fn num_rows(&self) -> usize {
        self.model.num_rows()
    }
}

impl LinearSolver for HighsSolver {
    fn add_column(
        &mut self,
        cost: f64,
        lower: f64,
        upper: f64,
    ) -> Result<usize> {
        Ok(self.model.try_add_column(cost, lower, upper)?)
    }

    fn add_row(&mut self, constraint: &LinearConstraint) -> Result<usize> {
        Ok(self.model.try_add_row(
            f64::NEG_INFINITY,
            constraint.upper_bound,
            constraint.expression.terms(),
        )?)
    }

    fn solve(&mut self) -> SolveStatus {
        if let Err(status) = self.model.try_solve() {
            return SolveStatus::Failed(format!(
                "Highs_run returned {:?}",
                status
            ));
        }
        match self.model.status() {
            Ok(HighsModelStatus::Optimal) => SolveStatus::Optimal,
            // every column is bounded, so "unbounded or infeasible" can only
            // be infeasible
            Ok(HighsModelStatus::Infeasible)
            | Ok(HighsModelStatus::UnboundedOrInfeasible) => {
                SolveStatus::Infeasible
            }
            Ok(status) => SolveStatus::Failed(format!("{:?}", status)),
            Err(invalid) => SolveStatus::Failed(format!("{:?}", invalid)),
        }
    }

    fn objective_value(&self) -> f64 {
        self.model.get_objective_value()
    }

    fn column_values(&self) -> Vec<f64> {
        self.model.get_column_values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::LinearExpression;

    fn solver() -> HighsSolver {
        HighsSolver::new(&Config::default()).unwrap()
    }

    #[test]
    fn test_solve_bounded_minimization() {
        let mut solver = solver();
        let x = solver.add_column(1.0, 0.0, 10.0).unwrap();
        let y = solver.add_column(2.0, 0.0, 10.0).unwrap();
        // x + y >= 4 written as -x - y <= -4
        let mut expression = LinearExpression::new();
        expression.add_term(-1.0, x).add_term(-1.0, y);
        solver.add_row(&expression.set_bound(-4.0)).unwrap();

        assert_eq!(solver.solve(), SolveStatus::Optimal);
        assert!((solver.objective_value() - 4.0).abs() < 1e-7);
        let values = solver.column_values();
        assert!((values[x] - 4.0).abs() < 1e-7);
        assert!(values[y].abs() < 1e-7);
    }

    #[test]
    fn test_appended_rows_tighten_the_model() {
        let mut solver = solver();
        let x = solver.add_column(1.0, 0.0, 120.0).unwrap();
        let mut at_least_two = LinearExpression::new();
        at_least_two.add_term(-1.0, x);
        solver.add_row(&at_least_two.set_bound(-2.0)).unwrap();
        assert_eq!(solver.solve(), SolveStatus::Optimal);
        assert!((solver.objective_value() - 2.0).abs() < 1e-7);

        let mut at_least_five = LinearExpression::new();
        at_least_five.add_term(-1.0, x);
        let row = solver.add_row(&at_least_five.set_bound(-5.0)).unwrap();
        assert_eq!(row, 1);
        assert_eq!(solver.num_rows(), 2);
        assert_eq!(solver.solve(), SolveStatus::Optimal);
        assert!((solver.objective_value() - 5.0).abs() < 1e-7);
    }

    #[test]
    fn test_contradictory_rows_are_infeasible() {
        let mut solver = solver();
        let x = solver.add_column(1.0, 0.0, 120.0).unwrap();
        let mut below = LinearExpression::new();
        below.add_term(1.0, x);
        solver.add_row(&below.set_bound(1.0)).unwrap();
        let mut above = LinearExpression::new();
        above.add_term(-1.0, x);
        solver.add_row(&above.set_bound(-3.0)).unwrap();
        assert_eq!(solver.solve(), SolveStatus::Infeasible);
    }

    #[test]
    fn test_model_status_conversion() {
        assert_eq!(
            HighsModelStatus::try_from(MODEL_STATUS_OPTIMAL),
            Ok(HighsModelStatus::Optimal)
        );
        assert!(HighsModelStatus::try_from(-42).is_err());
        assert_eq!(
            HighsStatus::try_from(STATUS_WARNING),
            Ok(HighsStatus::Warning)
        );
    }
}
