//! Fuzzy matching for suggesting corrections to near-miss values.

/// Find the closest match for a value from a list of allowed values.
///
/// Candidates further than `len(s) / 2` edits away (true division, so a
/// 5-character value tolerates 2 edits and a 6-character value 3) are
/// rejected. Among the rest, the smallest distance wins, then the longest
/// common prefix, then the earliest candidate.
pub fn find_closest_match<'a, I>(s: &str, candidates: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let max_distance = s.chars().count() as f64 / 2.0;
    let mut best: Option<(&'a str, usize, usize)> = None;

    for candidate in candidates {
        let distance = get_edit_distance(s, candidate);
        if distance as f64 > max_distance {
            continue;
        }
        if let Some((_, best_distance, _)) = best {
            if distance > best_distance {
                continue;
            }
        }

        let prefix_len = get_common_prefix_len(s, candidate);
        let better = match best {
            None => true,
            Some((_, best_distance, best_prefix)) => {
                distance < best_distance || (distance == best_distance && prefix_len > best_prefix)
            }
        };
        if better {
            best = Some((candidate, distance, prefix_len));
        }
    }

    best.map(|(candidate, _, _)| candidate)
}

/// Number of leading characters two strings share.
pub fn get_common_prefix_len(s1: &str, s2: &str) -> usize {
    s1.chars()
        .zip(s2.chars())
        .take_while(|(a, b)| a == b)
        .count()
}

/// Levenshtein distance between two strings, counted in characters.
///
/// Keeps a single row of the distance matrix, sized by the shorter string.
pub fn get_edit_distance(s1: &str, s2: &str) -> usize {
    let mut short: Vec<char> = s1.chars().collect();
    let mut long: Vec<char> = s2.chars().collect();
    if short.len() > long.len() {
        std::mem::swap(&mut short, &mut long);
    }

    let mut distances: Vec<usize> = (0..=short.len()).collect();
    for (i2, c2) in long.iter().enumerate() {
        let mut next = Vec::with_capacity(short.len() + 1);
        next.push(i2 + 1);
        for (i1, c1) in short.iter().enumerate() {
            if c1 == c2 {
                next.push(distances[i1]);
            } else {
                let best = distances[i1].min(distances[i1 + 1]).min(next[i1]);
                next.push(best + 1);
            }
        }
        distances = next;
    }

    distances[short.len()]
}
