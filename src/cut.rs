use crate::distribution::Distribution;
use crate::dose::DoseInfluenceMatrix;
use crate::expression::{LinearConstraint, LinearExpression};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CutSide {
    Oar,
    Ptv,
}

/// A linear inequality over the beamlet weights derived from one side of the
/// expected-value dose constraints.
#[derive(Debug, Clone)]
pub struct Cut {
    pub id: usize,
    pub side: CutSide,
    pub voxels: Vec<usize>,
    pub threshold: f64,
    pub normalization: usize,
    pub constraint: LinearConstraint,
}

impl Cut {
    pub fn rhs(&self) -> f64 {
        self.constraint.upper_bound
    }
}

/// `Σ_{i∈A} (D_i - T) <= |X| · u.int_to_inf(T)`, with the constant part
/// moved to the right-hand side. `normalization` is |X|, the size of the full
/// OAR set, whatever the size of `subset`.
pub fn oar_cut(
    matrix: &DoseInfluenceMatrix,
    columns: &[usize],
    subset: &[usize],
    threshold: f64,
    normalization: usize,
    u: &dyn Distribution,
) -> LinearConstraint {
    let mut expression = LinearExpression::new();
    for &voxel in subset.iter() {
        expression.add_scaled(1.0, &matrix.dose_expression(voxel, columns));
    }
    let rhs = normalization as f64 * u.int_to_inf(threshold)
        + subset.len() as f64 * threshold;
    expression.set_bound(rhs)
}

/// `Σ_{i∈B} (T - D_i) <= |Y| · v.int_to(T)`, written as
/// `-Σ D_i <= |Y| · v.int_to(T) - |B| · T`.
pub fn ptv_cut(
    matrix: &DoseInfluenceMatrix,
    columns: &[usize],
    subset: &[usize],
    threshold: f64,
    normalization: usize,
    v: &dyn Distribution,
) -> LinearConstraint {
    let mut expression = LinearExpression::new();
    for &voxel in subset.iter() {
        expression.add_scaled(-1.0, &matrix.dose_expression(voxel, columns));
    }
    let rhs = normalization as f64 * v.int_to(threshold)
        - subset.len() as f64 * threshold;
    expression.set_bound(rhs)
}

/// Every cut added to the model, in insertion order. Cuts are never removed.
#[derive(Debug, Default)]
pub struct CutPool {
    pub pool: Vec<Cut>,
    pub oar_cut_count: usize,
    pub ptv_cut_count: usize,
}

impl CutPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &mut self,
        side: CutSide,
        voxels: Vec<usize>,
        threshold: f64,
        normalization: usize,
        constraint: LinearConstraint,
    ) -> &Cut {
        match side {
            CutSide::Oar => self.oar_cut_count += 1,
            CutSide::Ptv => self.ptv_cut_count += 1,
        }
        let id = self.pool.len();
        self.pool.push(Cut {
            id,
            side,
            voxels,
            threshold,
            normalization,
            constraint,
        });
        &self.pool[id]
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }
}
