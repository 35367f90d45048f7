// File: src/fuzzy/distance.rs
use smallvec::{smallvec, SmallVec};
use std::cmp::min;
use std::mem;

type Row = SmallVec<[usize; 24]>;

/// Damerau-Levenshtein distance, optimal string alignment variant, counted in chars.
///
/// Insert, delete, substitute and swapping two adjacent chars each cost 1.
/// No substring is edited twice, so "ca" -> "abc" is 3 rather than 2.
/// Returns `None` once the distance is known to exceed `max_distance`.
pub fn damerau_levenshtein(a: &str, b: &str, max_distance: usize) -> Option<usize> {
    let a: SmallVec<[char; 24]> = a.chars().collect();
    let b: SmallVec<[char; 24]> = b.chars().collect();

    if a.len().abs_diff(b.len()) > max_distance {
        return None;
    }
    if a.is_empty() || b.is_empty() {
        return Some(a.len().max(b.len()));
    }

    let mut prev_two: Row = (0..=b.len()).collect();
    let mut prev: Row = (0..=b.len()).collect();
    let mut curr: Row = smallvec![0; b.len() + 1];

    for i in 0..a.len() {
        curr[0] = i + 1;
        let mut row_min = curr[0];

        for j in 0..b.len() {
            let cost = usize::from(a[i] != b[j]);
            curr[j + 1] = min(min(curr[j] + 1, prev[j + 1] + 1), prev[j] + cost);
            if i > 0 && j > 0 && a[i] == b[j - 1] && a[i - 1] == b[j] && a[i] != b[j] {
                curr[j + 1] = min(curr[j + 1], prev_two[j - 1] + 1);
            }
            row_min = row_min.min(curr[j + 1]);
        }

        if row_min > max_distance {
            return None;
        }

        mem::swap(&mut prev_two, &mut prev);
        mem::swap(&mut prev, &mut curr);
    }

    let distance = prev[b.len()];
    (distance <= max_distance).then_some(distance)
}
