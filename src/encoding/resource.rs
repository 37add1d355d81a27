//! Machine exclusivity.

use crate::preprocess::ProblemInstance;

use super::EncodedProblem;

/// Adds one no-overlap set per machine.
///
/// Machines with a single operation need no constraint. The order of
/// operations on a machine is left entirely to the engine.
#[derive(Debug, Clone, Copy)]
pub struct ResourceConstraintBuilder<'a> {
    instance: &'a ProblemInstance,
}

impl<'a> ResourceConstraintBuilder<'a> {
    /// Creates the builder.
    pub fn new(instance: &'a ProblemInstance) -> Self {
        Self { instance }
    }

    /// Appends the exclusion sets. Returns how many were added.
    pub fn apply(&self, problem: &mut EncodedProblem) -> usize {
        let mut added = 0;
        for positions in self.instance.machines().values() {
            if positions.len() > 1 {
                let intervals = positions.iter().map(|&i| problem.vars[i].interval).collect();
                problem.builder.add_mutual_exclusion(intervals);
                added += 1;
            }
        }
        added
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cp::Constraint;
    use crate::encoding::ProblemEncoder;
    use crate::models::{Operation, TimeScale};
    use crate::preprocess::Preprocessor;

    #[test]
    fn test_one_set_per_shared_machine() {
        let ops = vec![
            Operation::new(1, 0, 1, 1.0),
            Operation::new(2, 0, 1, 1.0),
            Operation::new(3, 0, 1, 1.0),
            Operation::new(3, 1, 2, 1.0),
        ];
        let inst = Preprocessor::new(TimeScale::default(), false)
            .prepare(&ops)
            .unwrap();
        let mut problem = ProblemEncoder::new(&inst).encode("t");
        let before = problem.builder.constraints().len();

        let added = ResourceConstraintBuilder::new(&inst).apply(&mut problem);
        assert_eq!(added, 1);

        let constraints = &problem.builder.constraints()[before..];
        assert_eq!(constraints.len(), 1);
        match &constraints[0] {
            Constraint::NoOverlap { intervals } => {
                let expected: Vec<_> =
                    [0, 1, 2].iter().map(|&i| problem.vars[i].interval).collect();
                assert_eq!(intervals, &expected);
            }
            other => panic!("unexpected constraint {other:?}"),
        }
    }
}
