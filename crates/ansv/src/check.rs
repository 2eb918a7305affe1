use rmq::{SparseTableRmq, StaticRmq};

use crate::{Direction, Error, Policy, Result};

/// Verifies `nsv` against the definition of `policy` using range-minimum
/// queries over `values`, independent of how the answers were computed.
///
/// For [`Policy::FurthestEqual`] this also checks that an equal partner is
/// the furthest one of its run.
pub fn check_nsv<T: Ord + Clone>(
    values: &[T],
    nsv: &[Option<usize>],
    direction: Direction,
    policy: Policy,
) -> Result<()> {
    let n = values.len();
    if nsv.len() != n {
        return Err(Error::LengthMismatch {
            expected: n,
            actual: nsv.len(),
        });
    }
    let fail = |index: usize, reason: &'static str| Error::Check {
        direction,
        index,
        reason,
    };
    if let Some(i) = nsv.iter().position(|a| a.is_some_and(|s| s >= n)) {
        return Err(fail(i, "partner out of range"));
    }

    // the right direction is checked as the left direction of the mirror
    let mirrored;
    let (values, nsv) = match direction {
        Direction::Left => (values, nsv),
        Direction::Right => {
            let v: Vec<T> = values.iter().rev().cloned().collect();
            let a: Vec<Option<usize>> = nsv.iter().rev().map(|a| a.map(|s| n - 1 - s)).collect();
            mirrored = (v, a);
            (&mirrored.0[..], &mirrored.1[..])
        }
    };
    let unmirror = |i: usize| match direction {
        Direction::Left => i,
        Direction::Right => n - 1 - i,
    };

    let rmq = SparseTableRmq::new(values);
    for (i, answer) in nsv.iter().enumerate() {
        check_left(&rmq, i, *answer, policy).map_err(|reason| fail(unmirror(i), reason))?;
    }
    Ok(())
}

fn check_left<T: Ord + Clone>(
    rmq: &SparseTableRmq<T>,
    i: usize,
    answer: Option<usize>,
    policy: Policy,
) -> std::result::Result<(), &'static str> {
    let value = rmq.value(i);
    let Some(s) = answer else {
        // nothing before i may qualify
        return match rmq.min(0..i) {
            Some(m) if policy.accepts(m, value) => Err("a qualifying element was missed"),
            _ => Ok(()),
        };
    };

    if s >= i {
        return Err("partner is on the wrong side");
    }
    let partner = rmq.value(s);
    if !policy.accepts(partner, value) {
        return Err("partner does not qualify");
    }
    if let Some(m) = rmq.min(s + 1..i) {
        let nearer = match policy {
            Policy::NearestSmaller => m < value,
            Policy::NearestEqual => m <= value,
            // equal values in between are fine only if the partner is equal too
            Policy::FurthestEqual => m < value || (m == value && partner < value),
        };
        if nearer {
            return Err("a nearer qualifying element exists");
        }
    }
    if policy == Policy::FurthestEqual && partner == value {
        if let Some(j) = nearest_at_most(rmq, s, value) {
            if rmq.value(j) == value {
                return Err("a further equal element exists");
            }
        }
    }
    Ok(())
}

/// Largest `j < end` with `values[j] <= value`.
fn nearest_at_most<T: Ord + Clone>(rmq: &SparseTableRmq<T>, end: usize, value: &T) -> Option<usize> {
    let reaches = |j: usize| rmq.min(j..end).is_some_and(|m| m <= value);
    if !reaches(0) {
        return None;
    }
    // reaches(lo) holds, reaches(hi) does not
    let (mut lo, mut hi) = (0, end);
    while hi - lo > 1 {
        let mid = lo + (hi - lo) / 2;
        if reaches(mid) {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    Some(lo)
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::tests::brute_force;
    use crate::{ALL_POLICIES, nsv_sequential};

    #[test]
    fn accepts_correct_answers() {
        let mut rng = StdRng::seed_from_u64(0);
        for &n in &[8_usize, 137, 1000, 4200] {
            let values: Vec<i64> = (0..n).map(|_| rng.random_range(0..997)).collect();
            let few: Vec<i64> = (0..n).map(|_| rng.random_range(0..4)).collect();
            for values in [&values, &few] {
                for direction in [Direction::Left, Direction::Right] {
                    for policy in ALL_POLICIES {
                        let nsv = nsv_sequential(values, direction, policy);
                        assert_eq!(check_nsv(values, &nsv, direction, policy), Ok(()));
                    }
                }
            }
        }
    }

    #[test]
    fn rejects_nearest_equal_for_furthest() {
        let values = [2, 5, 2, 7, 2, 1];
        let nearest = nsv_sequential(&values, Direction::Left, Policy::NearestEqual);
        // index 4 points at the equal value at 2, which is minimal but not
        // the furthest occurrence
        assert_eq!(
            check_nsv(&values, &nearest, Direction::Left, Policy::FurthestEqual),
            Err(Error::Check {
                direction: Direction::Left,
                index: 4,
                reason: "a further equal element exists",
            })
        );

        let nearest = nsv_sequential(&values, Direction::Right, Policy::NearestEqual);
        assert_eq!(
            check_nsv(&values, &nearest, Direction::Right, Policy::FurthestEqual),
            Err(Error::Check {
                direction: Direction::Right,
                index: 0,
                reason: "a further equal element exists",
            })
        );
    }

    #[test]
    fn rejects_wrong_answers() {
        let values = [5, 3, 4, 7, 2, 6, 1];
        let policy = Policy::NearestSmaller;
        let good = brute_force(&values, Direction::Left, policy);

        let mut missed = good.clone();
        missed[3] = None;
        assert!(matches!(
            check_nsv(&values, &missed, Direction::Left, policy),
            Err(Error::Check { index: 3, .. })
        ));

        let mut too_far = good.clone();
        too_far[3] = Some(1);
        assert!(check_nsv(&values, &too_far, Direction::Left, policy).is_err());

        let mut not_smaller = good.clone();
        not_smaller[5] = Some(3);
        assert!(check_nsv(&values, &not_smaller, Direction::Left, policy).is_err());

        let mut wrong_side = good.clone();
        wrong_side[2] = Some(4);
        assert!(check_nsv(&values, &wrong_side, Direction::Left, policy).is_err());

        let mut out_of_range = good;
        out_of_range[0] = Some(70);
        assert!(check_nsv(&values, &out_of_range, Direction::Left, policy).is_err());

        assert_eq!(
            check_nsv(&values, &[None], Direction::Right, policy),
            Err(Error::LengthMismatch {
                expected: 7,
                actual: 1
            })
        );
    }

    #[test]
    fn furthest_with_smaller_partner_and_equal_between_is_rejected() {
        // at index 3 the equal 4 at index 2 must win over the 1 at index 0
        let values = [1, 6, 4, 4];
        let answers = [None, Some(0), Some(0), Some(0)];
        assert!(
            check_nsv(&values, &answers, Direction::Left, Policy::FurthestEqual).is_err()
        );
        let answers = [None, Some(0), Some(0), Some(2)];
        assert_eq!(
            check_nsv(&values, &answers, Direction::Left, Policy::FurthestEqual),
            Ok(())
        );
    }
}
