use crate::config::{read_config_input, Config};
use crate::cutting_plane::PlanningProblem;
use crate::distribution::DistributionInput;
use crate::dose::{DoseInfluenceMatrix, Influence};
use crate::error::{Error, Result};
use serde::Deserialize;
use std::fs;

#[derive(Debug, Deserialize)]
pub struct ProblemInput {
    pub num_voxels: usize,
    pub num_beamlets: usize,
    pub oar_voxels: Vec<usize>,
    pub ptv_voxels: Vec<usize>,
    pub oar_bound: f64,
    pub ptv_bound: f64,
    pub oar_distribution: DistributionInput,
    pub ptv_distribution: DistributionInput,
}

pub fn read_problem_input(filepath: &str) -> Result<ProblemInput> {
    let contents = fs::read_to_string(filepath)?;
    let parsed: ProblemInput = serde_json::from_str(&contents)?;
    Ok(parsed)
}

/// Reads the `voxel,beamlet,coefficient` entries of a dose-influence matrix.
pub fn read_dose_input(filepath: &str) -> Result<Vec<Influence>> {
    let mut rdr = csv::Reader::from_path(filepath)?;
    let mut entries = vec![];
    for record in rdr.deserialize() {
        let entry: Influence = record?;
        entries.push(entry);
    }
    Ok(entries)
}

fn validate_unique(voxels: &[usize], name: &str) -> Result<()> {
    let mut sorted = voxels.to_vec();
    sorted.sort_unstable();
    match sorted.windows(2).find(|pair| pair[0] == pair[1]) {
        Some(pair) => Err(Error::InvalidParameter(format!(
            "voxel {} appears twice in the {} set",
            pair[0], name
        ))),
        None => Ok(()),
    }
}

impl ProblemInput {
    pub fn build_planning_problem(
        &self,
        entries: &[Influence],
    ) -> Result<PlanningProblem> {
        validate_unique(&self.oar_voxels, "OAR")?;
        validate_unique(&self.ptv_voxels, "PTV")?;
        let matrix = DoseInfluenceMatrix::from_triplets(
            self.num_voxels,
            self.num_beamlets,
            entries,
        )?;
        let problem = PlanningProblem {
            matrix,
            oar_voxels: self.oar_voxels.clone(),
            ptv_voxels: self.ptv_voxels.clone(),
            oar_bound: self.oar_bound,
            ptv_bound: self.ptv_bound,
            oar_distribution: self.oar_distribution.build()?,
            ptv_distribution: self.ptv_distribution.build()?,
        };
        problem.validate()?;
        Ok(problem)
    }
}

pub struct Input {
    pub config: Config,
    pub problem: ProblemInput,
    pub dose: Vec<Influence>,
}

impl Input {
    pub fn build(path: &str) -> Result<Self> {
        let config = read_config_input(&(path.to_owned() + "/config.json"))?;
        let problem = read_problem_input(&(path.to_owned() + "/problem.json"))?;
        let dose = read_dose_input(&(path.to_owned() + "/dose.csv"))?;
        Ok(Self {
            config,
            problem,
            dose,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_problem() {
        let problem = read_problem_input("example/problem.json").unwrap();
        assert_eq!(problem.num_voxels, 2);
        assert_eq!(problem.num_beamlets, 1);
        assert_eq!(problem.oar_voxels, vec![0]);
        assert_eq!(problem.ptv_voxels, vec![1]);
        assert_eq!(problem.oar_bound, 10.0);
        assert_eq!(problem.ptv_bound, 2.0);
        assert_eq!(
            problem.oar_distribution,
            DistributionInput::Uniform {
                lower: 8.0,
                upper: 12.0
            }
        );
    }

    #[test]
    fn test_read_dose() {
        let entries = read_dose_input("example/dose.csv").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[1],
            Influence {
                voxel: 1,
                beamlet: 0,
                coefficient: 1.0
            }
        );
    }

    #[test]
    fn test_build_input() {
        let input = Input::build("example").unwrap();
        let problem =
            input.problem.build_planning_problem(&input.dose).unwrap();
        assert_eq!(problem.matrix.num_voxels(), 2);
        assert_eq!(problem.matrix.num_nonzeros(), 2);
        assert_eq!(problem.oar_distribution.int_to_inf(12.0), 0.0);
        assert_eq!(input.config.num_threshold_values, 10);
    }

    #[test]
    fn test_missing_directory_is_io_error() {
        assert!(matches!(
            Input::build("example/does-not-exist"),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn test_repeated_voxels_are_rejected() {
        let problem: ProblemInput = serde_json::from_str(
            r#"{
                "num_voxels": 2, "num_beamlets": 1,
                "oar_voxels": [0, 0], "ptv_voxels": [1],
                "oar_bound": 10.0, "ptv_bound": 2.0,
                "oar_distribution": {"kind": "jump", "threshold": 10.0},
                "ptv_distribution": {"kind": "piecewise_linear",
                                     "breakpoints": [[0.0, 0.0], [4.0, 1.0]]}
            }"#,
        )
        .unwrap();
        let entries = read_dose_input("example/dose.csv").unwrap();
        assert!(matches!(
            problem.build_planning_problem(&entries),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_out_of_range_voxel_is_rejected() {
        let problem: ProblemInput = serde_json::from_str(
            r#"{
                "num_voxels": 2, "num_beamlets": 1,
                "oar_voxels": [0], "ptv_voxels": [2],
                "oar_bound": 10.0, "ptv_bound": 2.0,
                "oar_distribution": {"kind": "uniform", "lower": 8.0, "upper": 12.0},
                "ptv_distribution": {"kind": "uniform", "lower": 0.0, "upper": 4.0}
            }"#,
        )
        .unwrap();
        let entries = read_dose_input("example/dose.csv").unwrap();
        assert!(problem.build_planning_problem(&entries).is_err());
    }
}
