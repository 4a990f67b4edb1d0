//! Token similarity scoring for the fuzzy topic match.
//!
//! Jaro-Winkler over lowercase tokens. Scores land in [0, 1]; 1 is an exact
//! match, 0 means no characters in common. The prefix boost makes near-misses
//! like "forcast" score high against "forecast", which is the whole point of
//! fuzzy subject matching over chat text.

fn to_f64(n: usize) -> f64 {
    f64::from(u32::try_from(n).unwrap_or(u32::MAX))
}

fn jaro(a: &[char], b: &[char]) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let window = (a.len().max(b.len()) / 2).saturating_sub(1);
    let mut a_matched = vec![false; a.len()];
    let mut b_matched = vec![false; b.len()];
    let mut matches = 0usize;

    for (i, ca) in a.iter().enumerate() {
        let lo = i.saturating_sub(window);
        let hi = i.saturating_add(window).saturating_add(1).min(b.len());
        for j in lo..hi {
            if !b_matched[j] && b[j] == *ca {
                a_matched[i] = true;
                b_matched[j] = true;
                matches = matches.saturating_add(1);
                break;
            }
        }
    }

    if matches == 0 {
        return 0.0;
    }

    let mut transpositions = 0usize;
    let mut j = 0usize;
    for (i, ca) in a.iter().enumerate() {
        if !a_matched[i] {
            continue;
        }
        while j < b.len() && !b_matched[j] {
            j = j.saturating_add(1);
        }
        if b.get(j).is_some_and(|cb| cb != ca) {
            transpositions = transpositions.saturating_add(1);
        }
        j = j.saturating_add(1);
    }

    let m = to_f64(matches);
    let t = to_f64(transpositions / 2);
    (m / to_f64(a.len()) + m / to_f64(b.len()) + (m - t) / m) / 3.0
}

/// Jaro-Winkler similarity of two strings.
pub fn jaro_winkler(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let score = jaro(&a, &b);
    let prefix = a
        .iter()
        .zip(b.iter())
        .take(4)
        .take_while(|(x, y)| x == y)
        .count();
    score + to_f64(prefix) * 0.1 * (1.0 - score)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-3,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn identical_strings_score_one() {
        assert_eq!(jaro_winkler("rain", "rain"), 1.0);
        assert_eq!(jaro_winkler("", ""), 1.0);
    }

    #[test]
    fn disjoint_strings_score_zero() {
        assert_eq!(jaro_winkler("abc", "xyz"), 0.0);
        assert_eq!(jaro_winkler("123", "rain"), 0.0);
    }

    #[test]
    fn empty_against_nonempty_scores_zero() {
        assert_eq!(jaro_winkler("", "rain"), 0.0);
        assert_eq!(jaro_winkler("rain", ""), 0.0);
    }

    #[test]
    fn reference_values() {
        close(jaro_winkler("martha", "marhta"), 0.961);
        close(jaro_winkler("dixon", "dicksonx"), 0.813);
        close(jaro_winkler("dwayne", "duane"), 0.840);
    }

    #[test]
    fn typo_scores_high_against_trigger_word() {
        assert!(jaro_winkler("forcast", "forecast") > 0.9);
        assert!(jaro_winkler("wether", "weather") > 0.9);
    }

    #[test]
    fn symmetric() {
        let ab = jaro_winkler("sunday", "sunny");
        let ba = jaro_winkler("sunny", "sunday");
        close(ab, ba);
    }

    #[test]
    fn exact_beats_fuzzy() {
        assert!(jaro_winkler("rain", "rain") > jaro_winkler("rain", "rains"));
    }
}
