/// Outcome of a solve, as consumed by reporters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SolutionStatus {
    /// An optimal point was found.
    Optimal,
    /// No optimal value exists. Infeasible and unbounded problems are not
    /// distinguished; both end here.
    NoOptimum,
}

/// A solve snapshot: everything a reporter needs, nothing the engine needs.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Solution {
    pub status: SolutionStatus,
    /// Direction the caller asked for; decides between "max" and "min"
    /// wording in reports.
    pub maximize: bool,
    /// Value per tableau column, empty when there is no optimum.
    pub values: Vec<f64>,
    /// Objective at the optimum, in the caller's direction.
    pub objective_value: f64,
}

impl Solution {
    pub fn optimal(maximize: bool, values: Vec<f64>, objective_value: f64) -> Self {
        Self {
            status: SolutionStatus::Optimal,
            maximize,
            values,
            objective_value,
        }
    }

    pub fn no_optimum(maximize: bool) -> Self {
        Self {
            status: SolutionStatus::NoOptimum,
            maximize,
            values: Vec::new(),
            objective_value: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_the_status() {
        let ok = Solution::optimal(true, vec![3.0, 1.0], 11.0);
        assert_eq!(ok.status, SolutionStatus::Optimal);
        assert!(ok.maximize);

        let bad = Solution::no_optimum(false);
        assert_eq!(bad.status, SolutionStatus::NoOptimum);
        assert!(bad.values.is_empty());
    }
}
