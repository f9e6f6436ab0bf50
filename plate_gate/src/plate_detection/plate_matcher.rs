use super::Verdict;

/// Exact string comparison against the allow list. No case folding and no
/// correction of look-alike characters.
pub fn match_plate<S: AsRef<str>>(text: &str, references: &[S]) -> Verdict {
    if references.iter().any(|reference| reference.as_ref() == text) {
        Verdict::Match
    } else {
        Verdict::NoMatch
    }
}
