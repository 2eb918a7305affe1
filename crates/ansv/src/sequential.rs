use crate::{Direction, Nsv, Policy};

/// State left behind by a monotonic-stack scan over one slice.
///
/// All positions are local to the scanned slice.
#[derive(Debug)]
pub(crate) struct Scan {
    pub answers: Vec<Option<usize>>,
    /// Furthest position of the run of equal values ending at each
    /// position, as far as this slice can tell.
    pub run_start: Vec<usize>,
    /// Remaining stack, bottom first.
    pub stack: Vec<usize>,
    /// Positions without a partner in this slice, in scan order.
    pub unresolved: Vec<usize>,
}

pub(crate) fn scan<T: Ord>(values: &[T], direction: Direction, policy: Policy) -> Scan {
    let n = values.len();
    let mut answers = vec![None; n];
    let mut run_start: Vec<usize> = (0..n).collect();
    let mut stack: Vec<usize> = Vec::new();
    let mut unresolved = Vec::new();

    for step in 0..n {
        let p = direction.position(step, n);
        let value = &values[p];
        while stack
            .last()
            .is_some_and(|&top| policy.beaten(&values[top], value))
        {
            stack.pop();
        }

        match stack.last() {
            None => unresolved.push(p),
            Some(&top) => {
                let equal = values[top] == *value;
                if equal {
                    run_start[p] = run_start[top];
                }
                answers[p] = Some(if equal && policy == Policy::FurthestEqual {
                    run_start[top]
                } else {
                    top
                });
            }
        }
        stack.push(p);
    }

    Scan {
        answers,
        run_start,
        stack,
        unresolved,
    }
}

/// Nearest smaller values of every position of `values` in one direction.
pub fn nsv_sequential<T: Ord>(
    values: &[T],
    direction: Direction,
    policy: Policy,
) -> Vec<Option<usize>> {
    scan(values, direction, policy).answers
}

/// Nearest smaller values in both directions.
pub fn ansv_sequential<T: Ord>(values: &[T], left: Policy, right: Policy) -> Nsv {
    Nsv {
        left: nsv_sequential(values, Direction::Left, left),
        right: nsv_sequential(values, Direction::Right, right),
    }
}
