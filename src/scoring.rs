//! Title-overlap scoring used by the alignment heuristic.
//!
//! Kept free of any fragment or filesystem type so the policy can be tested
//! on plain strings.

/// Counts the translated titles that contain at least one original title.
///
/// Each translated title contributes at most one point, however many
/// original titles it contains. Empty original titles never match.
pub fn title_overlap<T, O>(translated: &[T], original: &[O]) -> u32
where
    T: AsRef<str>,
    O: AsRef<str>,
{
    let needles: Vec<&str> = original
        .iter()
        .map(AsRef::as_ref)
        .filter(|t| !t.is_empty())
        .collect();

    let hits = translated
        .iter()
        .filter(|haystack| {
            let haystack = haystack.as_ref();
            needles.iter().any(|needle| haystack.contains(needle))
        })
        .count();

    u32::try_from(hits).unwrap_or(u32::MAX)
}

/// Removes every whitespace character.
pub fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Compares two titles ignoring all whitespace.
pub fn same_title(a: &str, b: &str) -> bool {
    strip_whitespace(a) == strip_whitespace(b)
}
