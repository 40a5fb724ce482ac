//! Levenshtein edit distance
//!
//! Insertion, deletion and substitution each cost 1. Works on `char`s, keeps
//! two rolling rows sized by the shorter input.

/// Edit distance between `a` and `b`
pub fn edit_distance(a: &str, b: &str) -> usize {
    if a == b {
        return 0;
    }

    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    // Keep the row buffers sized by the shorter string
    let (long, short) = if a.len() >= b.len() { (&a, &b) } else { (&b, &a) };

    if short.is_empty() {
        return long.len();
    }

    let mut prev: Vec<usize> = (0..=short.len()).collect();
    let mut curr = vec![0usize; short.len() + 1];

    for (i, lc) in long.iter().enumerate() {
        curr[0] = i + 1;
        for (j, sc) in short.iter().enumerate() {
            let cost = usize::from(lc != sc);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[short.len()]
}
