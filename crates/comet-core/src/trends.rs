//! Trend keyword normalization and blacklisting.

use std::collections::HashSet;

/// Suffix tokens that mark variants of the same trend ("X challenge", "X fyp").
/// Each is checked once, in this order, against the end of the key.
const TREND_SUFFIXES: &[&str] = &[
    "trend",
    "challenge",
    "dance",
    "song",
    "sound",
    "audio",
    "viral",
    "tiktok",
    "fyp",
    "foryou",
    "edit",
    "version",
];

const MIN_KEY_LEN: usize = 3;

/// Lower-cased ASCII alphanumerics only.
fn comparison_key(clean: &str) -> String {
    clean
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn core_key(key: &str) -> String {
    let mut core = key;
    for suffix in TREND_SUFFIXES {
        if let Some(stripped) = core.strip_suffix(suffix) {
            core = stripped;
        }
    }
    core.to_string()
}

/// Deduplicates raw trend keywords, keeping the first-seen spelling.
///
/// Two entries collide when they share either the comparison key (case and
/// punctuation removed) or the core key (comparison key minus a trailing
/// suffix token). Bare suffix words all share the empty core key, so only
/// the first of them survives. Entries whose comparison key is shorter than
/// three characters are dropped.
#[must_use]
pub fn normalize_trends<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut normalized = Vec::new();

    for trend in raw {
        let clean = trend.as_ref().trim().trim_start_matches('#').trim();
        let key = comparison_key(clean);
        if key.len() < MIN_KEY_LEN {
            continue;
        }
        let core = core_key(&key);

        if seen.contains(&key) || seen.contains(&core) {
            continue;
        }
        seen.insert(key);
        seen.insert(core);
        normalized.push(clean.to_string());
    }

    normalized
}

/// Drops trends whose lower-cased text contains any blacklisted substring.
#[must_use]
pub fn apply_trend_blacklist(trends: Vec<String>, blacklist: &[String]) -> Vec<String> {
    trends
        .into_iter()
        .filter(|trend| {
            let lower = trend.to_lowercase();
            !blacklist.iter().any(|term| lower.contains(term.as_str()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::FilterPolicy;

    #[test]
    fn collapses_variants_to_first_spelling() {
        let out = normalize_trends(&["#BadBunny", "Bad Bunny Trend", "badbunny", "xy"]);
        assert_eq!(out, vec!["BadBunny"]);
    }

    #[test]
    fn strips_hash_and_whitespace() {
        let out = normalize_trends(&["  ##GirlMath  ", "# Run Club"]);
        assert_eq!(out, vec!["GirlMath", "Run Club"]);
    }

    #[test]
    fn core_key_collapses_suffix_variants_in_either_order() {
        let out = normalize_trends(&["Apple Dance", "apple", "APPLE challenge"]);
        assert_eq!(out, vec!["Apple Dance"]);
    }

    #[test]
    fn chained_suffixes_are_stripped_in_list_order() {
        // "trend" is checked before "challenge", so both come off.
        assert_eq!(core_key("girlmathchallengetrend"), "girlmath");
        // "fyp" is checked after "dance", so "dance" stays.
        assert_eq!(core_key("shuffledancefyp"), "shuffledance");
    }

    #[test]
    fn bare_suffix_words_collapse_into_the_first() {
        assert_eq!(core_key("dance"), "");
        let out = normalize_trends(&["Dance", "Song", "dance"]);
        assert_eq!(out, vec!["Dance"]);
        let out = normalize_trends(&["Dance", "Song", "Trend"]);
        assert_eq!(out, vec!["Dance"]);
    }

    #[test]
    fn short_keys_are_dropped() {
        let out = normalize_trends(&["ab", "#!", "a b", "abc"]);
        assert_eq!(out, vec!["abc"]);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let out = normalize_trends::<&str>(&[]);
        assert!(out.is_empty());
    }

    #[test]
    fn blacklist_drops_news_and_scores() {
        let policy = FilterPolicy::default();
        let trends = vec![
            "Lakers vs Celtics".to_string(),
            "iPhone 17 price".to_string(),
            "Girl Math".to_string(),
            "Oscars 2025".to_string(),
            "versus challenge".to_string(),
        ];
        let kept = apply_trend_blacklist(trends, &policy.trend_blacklist);
        assert_eq!(kept, vec!["Girl Math", "versus challenge"]);
    }
}
