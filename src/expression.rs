use std::collections::BTreeMap;

/// A linear combination of solver columns. Terms added on the same column
/// are merged, so every column appears at most once when the expression is
/// handed to the solver.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpression {
    terms: BTreeMap<usize, f64>,
}

impl LinearExpression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_term(&mut self, coefficient: f64, column: usize) -> &mut Self {
        *self.terms.entry(column).or_insert(0.0) += coefficient;
        self
    }

    /// Adds `factor` times every term of `other` to this expression.
    pub fn add_scaled(&mut self, factor: f64, other: &LinearExpression) {
        for (&column, &coefficient) in other.terms.iter() {
            self.add_term(factor * coefficient, column);
        }
    }

    pub fn coefficient(&self, column: usize) -> f64 {
        self.terms.get(&column).copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Terms in increasing column order.
    pub fn terms(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.terms.iter().map(|(&column, &coefficient)| (column, coefficient))
    }

    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms()
            .map(|(column, coefficient)| coefficient * values[column])
            .sum()
    }

    /// Closes the expression into `expression <= value`.
    pub fn set_bound(self, value: f64) -> LinearConstraint {
        LinearConstraint {
            expression: self,
            upper_bound: value,
        }
    }
}

/// `expression <= upper_bound`
#[derive(Debug, Clone, PartialEq)]
pub struct LinearConstraint {
    pub expression: LinearExpression,
    pub upper_bound: f64,
}

impl LinearConstraint {
    /// Amount by which `values` exceed the bound; non-positive when
    /// satisfied.
    pub fn violation(&self, values: &[f64]) -> f64 {
        self.expression.evaluate(values) - self.upper_bound
    }
}
