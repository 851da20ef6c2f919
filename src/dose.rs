use crate::error::{Error, Result};
use crate::expression::LinearExpression;
use rayon::prelude::*;
use serde::Deserialize;

/// One nonzero entry of the dose-influence matrix: the dose received by
/// `voxel` per unit of weight on `beamlet`. Also the row type of `dose.csv`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Influence {
    pub voxel: usize,
    pub beamlet: usize,
    pub coefficient: f64,
}

/// Sparse voxels × beamlets influence matrix, stored row-compressed so that
/// the dose of one voxel touches only that voxel's nonzeros.
#[derive(Debug, Clone, PartialEq)]
pub struct DoseInfluenceMatrix {
    num_voxels: usize,
    num_beamlets: usize,
    row_offsets: Vec<usize>,
    beamlets: Vec<usize>,
    coefficients: Vec<f64>,
}

impl DoseInfluenceMatrix {
    /// Builds the matrix from `(voxel, beamlet, coefficient)` entries in any
    /// order. Repeated entries are summed and zeros are dropped.
    pub fn from_triplets(
        num_voxels: usize,
        num_beamlets: usize,
        entries: &[Influence],
    ) -> Result<Self> {
        for entry in entries.iter() {
            if entry.voxel >= num_voxels || entry.beamlet >= num_beamlets {
                return Err(Error::InvalidParameter(format!(
                    "influence entry ({}, {}) outside a {}x{} matrix",
                    entry.voxel, entry.beamlet, num_voxels, num_beamlets
                )));
            }
            if !entry.coefficient.is_finite() || entry.coefficient < 0.0 {
                return Err(Error::InvalidParameter(format!(
                    "influence coefficient at ({}, {}) must be non-negative, got {}",
                    entry.voxel, entry.beamlet, entry.coefficient
                )));
            }
        }

        let mut sorted: Vec<Influence> = entries.to_vec();
        sorted.sort_by_key(|e| (e.voxel, e.beamlet));

        let mut row_offsets = vec![0; num_voxels + 1];
        let mut beamlets = Vec::<usize>::with_capacity(sorted.len());
        let mut coefficients = Vec::<f64>::with_capacity(sorted.len());
        let mut last: Option<(usize, usize)> = None;
        for entry in sorted.iter() {
            if last == Some((entry.voxel, entry.beamlet)) {
                if let Some(value) = coefficients.last_mut() {
                    *value += entry.coefficient;
                }
                continue;
            }
            last = Some((entry.voxel, entry.beamlet));
            beamlets.push(entry.beamlet);
            coefficients.push(entry.coefficient);
            row_offsets[entry.voxel + 1] += 1;
        }
        for voxel in 0..num_voxels {
            row_offsets[voxel + 1] += row_offsets[voxel];
        }

        let mut matrix = Self {
            num_voxels,
            num_beamlets,
            row_offsets,
            beamlets,
            coefficients,
        };
        matrix.drop_zeros();
        Ok(matrix)
    }

    /// Builds the matrix from dense rows, keeping only the nonzeros.
    pub fn from_dense(rows: &[Vec<f64>]) -> Result<Self> {
        let num_beamlets = rows.first().map(|r| r.len()).unwrap_or(0);
        let mut entries = vec![];
        for (voxel, row) in rows.iter().enumerate() {
            if row.len() != num_beamlets {
                return Err(Error::InvalidParameter(format!(
                    "row {} has {} columns, expected {}",
                    voxel,
                    row.len(),
                    num_beamlets
                )));
            }
            for (beamlet, &coefficient) in row.iter().enumerate() {
                entries.push(Influence {
                    voxel,
                    beamlet,
                    coefficient,
                });
            }
        }
        Self::from_triplets(rows.len(), num_beamlets, &entries)
    }

    fn drop_zeros(&mut self) {
        let mut offsets = vec![0; self.num_voxels + 1];
        let mut beamlets = Vec::with_capacity(self.beamlets.len());
        let mut coefficients = Vec::with_capacity(self.coefficients.len());
        for voxel in 0..self.num_voxels {
            for (beamlet, coefficient) in self.row(voxel) {
                if coefficient != 0.0 {
                    beamlets.push(beamlet);
                    coefficients.push(coefficient);
                }
            }
            offsets[voxel + 1] = beamlets.len();
        }
        self.row_offsets = offsets;
        self.beamlets = beamlets;
        self.coefficients = coefficients;
    }

    pub fn num_voxels(&self) -> usize {
        self.num_voxels
    }

    pub fn num_beamlets(&self) -> usize {
        self.num_beamlets
    }

    pub fn num_nonzeros(&self) -> usize {
        self.coefficients.len()
    }

    /// The nonzeros `(beamlet, coefficient)` of a voxel row.
    pub fn row(
        &self,
        voxel: usize,
    ) -> impl Iterator<Item = (usize, f64)> + '_ {
        let span = self.row_offsets[voxel]..self.row_offsets[voxel + 1];
        self.beamlets[span.clone()]
            .iter()
            .copied()
            .zip(self.coefficients[span].iter().copied())
    }

    /// Dose received by `voxel` under the given beamlet weights.
    pub fn dose_value(&self, voxel: usize, weights: &[f64]) -> f64 {
        self.row(voxel)
            .map(|(beamlet, coefficient)| coefficient * weights[beamlet])
            .sum()
    }

    /// Dose received by `voxel` as an expression over the solver columns
    /// holding the beamlet weights (`columns[j]` is the column of beamlet j).
    pub fn dose_expression(
        &self,
        voxel: usize,
        columns: &[usize],
    ) -> LinearExpression {
        let mut expression = LinearExpression::new();
        for (beamlet, coefficient) in self.row(voxel) {
            expression.add_term(coefficient, columns[beamlet]);
        }
        expression
    }

    /// Doses of every voxel in `voxels`, in the same order.
    pub fn doses(&self, voxels: &[usize], weights: &[f64]) -> Vec<f64> {
        voxels
            .par_iter()
            .map(|&voxel| self.dose_value(voxel, weights))
            .collect()
    }

    /// Total dose delivered to the whole volume per unit weight of each
    /// beamlet.
    pub fn column_sums(&self) -> Vec<f64> {
        let mut sums = vec![0.0; self.num_beamlets];
        for (beamlet, coefficient) in
            self.beamlets.iter().zip(self.coefficients.iter())
        {
            sums[*beamlet] += coefficient;
        }
        sums
    }

    /// Checks that every voxel index of a set addresses a matrix row.
    pub fn validate_voxel_set(
        &self,
        voxels: &[usize],
        name: &str,
    ) -> Result<()> {
        match voxels.iter().find(|&&voxel| voxel >= self.num_voxels) {
            Some(voxel) => Err(Error::InvalidParameter(format!(
                "voxel {} of the {} set is outside the {} matrix rows",
                voxel, name, self.num_voxels
            ))),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example_matrix() -> DoseInfluenceMatrix {
        DoseInfluenceMatrix::from_dense(&[
            vec![1.0, 0.0, 2.0],
            vec![0.0, 0.0, 0.0],
            vec![0.5, 3.0, 0.0],
        ])
        .unwrap()
    }

    #[test]
    fn test_from_dense_keeps_only_nonzeros() {
        let matrix = example_matrix();
        assert_eq!(matrix.num_voxels(), 3);
        assert_eq!(matrix.num_beamlets(), 3);
        assert_eq!(matrix.num_nonzeros(), 4);
        assert_eq!(matrix.row(1).count(), 0);
        let row: Vec<(usize, f64)> = matrix.row(2).collect();
        assert_eq!(row, vec![(0, 0.5), (1, 3.0)]);
    }

    #[test]
    fn test_from_triplets_sums_repeated_entries() {
        let entries = vec![
            Influence {
                voxel: 1,
                beamlet: 0,
                coefficient: 1.0,
            },
            Influence {
                voxel: 0,
                beamlet: 1,
                coefficient: 2.0,
            },
            Influence {
                voxel: 1,
                beamlet: 0,
                coefficient: 0.5,
            },
        ];
        let matrix =
            DoseInfluenceMatrix::from_triplets(2, 2, &entries).unwrap();
        assert_eq!(matrix.num_nonzeros(), 2);
        assert_eq!(matrix.dose_value(1, &[2.0, 0.0]), 3.0);
        assert_eq!(matrix.dose_value(0, &[0.0, 1.0]), 2.0);
    }

    #[test]
    fn test_from_triplets_rejects_bad_entries() {
        let outside = vec![Influence {
            voxel: 2,
            beamlet: 0,
            coefficient: 1.0,
        }];
        assert!(matches!(
            DoseInfluenceMatrix::from_triplets(2, 2, &outside),
            Err(Error::InvalidParameter(_))
        ));
        let negative = vec![Influence {
            voxel: 0,
            beamlet: 0,
            coefficient: -1.0,
        }];
        assert!(DoseInfluenceMatrix::from_triplets(2, 2, &negative).is_err());
        assert!(DoseInfluenceMatrix::from_dense(&[vec![1.0], vec![1.0, 2.0]])
            .is_err());
    }

    #[test]
    fn test_dose_value_and_doses() {
        let matrix = example_matrix();
        let weights = [2.0, 1.0, 4.0];
        assert_eq!(matrix.dose_value(0, &weights), 10.0);
        assert_eq!(matrix.dose_value(1, &weights), 0.0);
        assert_eq!(matrix.dose_value(2, &weights), 4.0);
        assert_eq!(matrix.doses(&[2, 0], &weights), vec![4.0, 10.0]);
    }

    #[test]
    fn test_dose_expression_maps_beamlets_to_columns() {
        let matrix = example_matrix();
        let columns = [5, 6, 7];
        let expression = matrix.dose_expression(0, &columns);
        let terms: Vec<(usize, f64)> = expression.terms().collect();
        assert_eq!(terms, vec![(5, 1.0), (7, 2.0)]);
    }

    #[test]
    fn test_column_sums() {
        let matrix = example_matrix();
        assert_eq!(matrix.column_sums(), vec![1.5, 3.0, 2.0]);
    }

    #[test]
    fn test_validate_voxel_set() {
        let matrix = example_matrix();
        assert!(matrix.validate_voxel_set(&[0, 2], "OAR").is_ok());
        assert!(matrix.validate_voxel_set(&[3], "PTV").is_err());
    }
}
