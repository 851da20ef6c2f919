pub mod config;
pub mod cut;
pub mod cutting_plane;
pub mod distribution;
pub mod dose;
pub mod error;
pub mod expression;
pub mod input;
mod log;
pub mod oracle;
pub mod output;
pub mod selector;
pub mod solver;
pub mod utils;
use cutting_plane::CuttingPlaneSolver;
use input::Input;
use solver::HighsSolver;
use std::error::Error;
use std::time::Instant;

pub fn run(input_args: &InputArgs) -> Result<(), Box<dyn Error>> {
    log::show_greeting();

    let begin = Instant::now();
    let input = Input::build(&input_args.path)?;
    let config = &input.config;

    log::input_reading_line(&input_args.path);

    let problem = input.problem.build_planning_problem(&input.dose)?;
    log::problem_summary(&problem, config);

    let solver = HighsSolver::new(config)?;
    let mut planner = CuttingPlaneSolver::new(&problem, config, solver)?;

    log::iteration_table_header();
    log::iteration_table_divider();
    let outcome = planner.run_with_observer(log::iteration_table_row);
    log::iteration_table_divider();
    match &outcome {
        Ok(solution) => log::convergence_summary(solution),
        Err(err) => log::failure_summary(&err.to_string()),
    }

    log::output_generation_line(&input_args.path);
    output::generate_outputs(
        &outcome,
        planner.history(),
        planner.cuts(),
        &input_args.path,
    )?;
    let n = config.num_threshold_values;
    output::write_distribution_table(
        problem.oar_distribution.as_ref(),
        &problem.oar_distribution.wide_threshold_range(n),
        &input_args.path,
        "oar_distribution",
    )?;
    output::write_distribution_table(
        problem.ptv_distribution.as_ref(),
        &problem.ptv_distribution.wide_threshold_range(n),
        &input_args.path,
        "ptv_distribution",
    )?;

    log::show_farewell(begin.elapsed());

    outcome?;
    Ok(())
}

pub struct InputArgs {
    pub path: String,
}

impl InputArgs {
    pub fn build(args: &[String]) -> Result<Self, &'static str> {
        if args.len() < 2 {
            return Err("Not enough arguments [PATH]");
        }

        let path = args[1].clone();

        Ok(Self { path })
    }
}
