//! Fuzzy "did you mean" matching for names typed on the command line.

/// Find the closest known name to `input`. Returns `(name, is_exact)`.
///
/// Checks, in order: exact match, prefix, suffix, then Levenshtein distance <= 3.
pub fn closest_match(input: &str, names: &[String]) -> Option<(String, bool)> {
    let input_lower = input.to_lowercase();

    for name in names {
        if name.to_lowercase() == input_lower {
            return Some((name.clone(), true));
        }
    }

    for name in names {
        if name.to_lowercase().starts_with(&input_lower) {
            return Some((name.clone(), false));
        }
    }

    for name in names {
        if name.to_lowercase().ends_with(&input_lower) {
            return Some((name.clone(), false));
        }
    }

    names
        .iter()
        .map(|name| (name, levenshtein(&input_lower, &name.to_lowercase())))
        .filter(|(_, dist)| *dist > 0 && *dist <= 3)
        .min_by_key(|(_, dist)| *dist)
        .map(|(name, _)| (name.clone(), false))
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    let mut previous: Vec<usize> = (0..=b_chars.len()).collect();
    let mut current = vec![0usize; b_chars.len() + 1];

    for (i, a_char) in a_chars.iter().enumerate() {
        current[0] = i + 1;
        for (j, b_char) in b_chars.iter().enumerate() {
            let cost = usize::from(a_char != b_char);
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b_chars.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> Vec<String> {
        vec!["tcp_echo".into(), "tcp_ping_pong".into(), "udp_push_pop".into()]
    }

    #[test]
    fn exact_match_ignores_case() {
        assert_eq!(closest_match("TCP_ECHO", &names()), Some(("tcp_echo".into(), true)));
    }

    #[test]
    fn prefix_match() {
        assert_eq!(closest_match("tcp_ping", &names()), Some(("tcp_ping_pong".into(), false)));
    }

    #[test]
    fn typo_match() {
        assert_eq!(closest_match("tcp_ecko", &names()), Some(("tcp_echo".into(), false)));
    }

    #[test]
    fn no_match_for_unrelated_name() {
        assert_eq!(closest_match("sctp_stream_storm", &names()), None);
    }

    #[test]
    fn levenshtein_distances() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("same", "same"), 0);
    }
}
