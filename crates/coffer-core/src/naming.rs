//! Random names for sample resources.
//!
//! Vault names are globally unique and capped at 24 characters, so the
//! walkthroughs generate `{base}-{adjective}-{noun}-{digits}` names that
//! are unlikely to collide and easy to recognise when cleaning up after
//! an interrupted run.

use rand::Rng;
use regex::Regex;

const ADJECTIVES: &[&str] = &[
    "amber", "bold", "brisk", "calm", "clever", "deft", "eager", "fond", "keen", "lucid",
    "mellow", "nimble", "quiet", "sly", "steady", "swift", "tidy", "vivid",
];

const NOUNS: &[&str] = &[
    "anchor", "basin", "cedar", "comet", "delta", "ember", "fjord", "grove", "harbor", "inlet",
    "lagoon", "maple", "otter", "pebble", "quartz", "reef", "ridge", "willow",
];

/// Length cap the digit suffix respects.
const MAX_NAME_LEN: usize = 23;
/// Most random digits appended after the noun.
const MAX_SUFFIX_DIGITS: usize = 5;

/// Generate a sample resource name from a base prefix.
///
/// Digits are appended only while the name stays under the length cap.
/// Bases of at most 7 characters always receive at least one digit, which
/// [`sample_name_pattern`] relies on.
pub fn sample_name(base: &str) -> String {
    let mut rng = rand::thread_rng();
    let adjective = ADJECTIVES[rng.gen_range(0..ADJECTIVES.len())];
    let noun = NOUNS[rng.gen_range(0..NOUNS.len())];

    let mut name = format!("{}-{}-{}", base, adjective, noun);
    // Only start a suffix when the separator plus one digit still fits.
    if name.len() + 2 <= MAX_NAME_LEN {
        name.push('-');
        let mut digits = 0;
        while name.len() < MAX_NAME_LEN && digits < MAX_SUFFIX_DIGITS {
            name.push(char::from(b'0' + rng.gen_range(0..10u8)));
            digits += 1;
        }
    }
    name
}

/// Pattern matching every name `sample_name` can produce for `base`.
///
/// Cleanup uses this to pick out leftover sample resources without
/// touching anything named by hand.
pub fn sample_name_pattern(base: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(
        "^{}-[a-z]+-[a-z]+-[0-9]+$",
        regex::escape(base)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_names_match_their_own_pattern() {
        let pattern = sample_name_pattern("vault").unwrap();
        for _ in 0..100 {
            let name = sample_name("vault");
            assert!(pattern.is_match(&name), "{} does not match", name);
            assert!(name.len() <= MAX_NAME_LEN, "{} too long", name);
        }
    }

    #[test]
    fn test_pattern_ignores_hand_named_resources() {
        let pattern = sample_name_pattern("vault").unwrap();
        assert!(!pattern.is_match("vault-prod"));
        assert!(!pattern.is_match("vault-swift-fox"));
        assert!(!pattern.is_match("prod-swift-fox-12"));
        assert!(!pattern.is_match("vault-swift-fox-12-extra"));
    }

    #[test]
    fn test_pattern_is_anchored_to_the_base() {
        let pattern = sample_name_pattern("secret").unwrap();
        assert!(!pattern.is_match(&sample_name("vault")));
        assert!(pattern.is_match(&sample_name("secret")));
    }

    #[test]
    fn test_seven_char_bases_get_a_digit_suffix() {
        let pattern = sample_name_pattern("secrets").unwrap();
        for _ in 0..100 {
            let name = sample_name("secrets");
            assert!(pattern.is_match(&name), "{} has no digit suffix", name);
            assert!(name.len() <= MAX_NAME_LEN, "{} too long", name);
        }
    }
}
