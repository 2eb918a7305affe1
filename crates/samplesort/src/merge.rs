use std::cmp::Ordering;

/// Merges two sorted runs; on ties the element of `left` comes first.
pub(crate) fn merge_two<T, F>(left: Vec<T>, right: Vec<T>, compare: &F) -> Vec<T>
where
    F: Fn(&T, &T) -> Ordering,
{
    if left.is_empty() {
        return right;
    }
    if right.is_empty() {
        return left;
    }
    let ordered = matches!(
        (left.last(), right.first()),
        (Some(a), Some(b)) if compare(a, b) != Ordering::Greater
    );
    if ordered {
        let mut left = left;
        left.extend(right);
        return left;
    }

    let mut out = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    loop {
        let take_left = match (left.peek(), right.peek()) {
            (Some(a), Some(b)) => compare(a, b) != Ordering::Greater,
            _ => break,
        };
        out.extend(if take_left { left.next() } else { right.next() });
    }
    out.extend(left);
    out.extend(right);
    out
}

/// Merges sorted runs pairwise, bottom up, keeping runs in their given
/// order so that ties resolve towards earlier runs.
pub(crate) fn merge_runs<T, F>(runs: Vec<Vec<T>>, compare: &F) -> Vec<T>
where
    F: Fn(&T, &T) -> Ordering,
{
    let mut runs: Vec<Vec<T>> = runs.into_iter().filter(|r| !r.is_empty()).collect();
    while runs.len() > 1 {
        let mut next = Vec::with_capacity(runs.len().div_ceil(2));
        let mut iter = runs.into_iter();
        while let Some(a) = iter.next() {
            match iter.next() {
                Some(b) => next.push(merge_two(a, b, compare)),
                None => next.push(a),
            }
        }
        runs = next;
    }
    runs.pop().unwrap_or_default()
}
