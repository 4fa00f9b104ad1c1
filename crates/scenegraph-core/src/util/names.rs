//! Node name utilities.
//!
//! Node names are the human-facing handle for a node and must be unique
//! within a graph. These helpers normalize requested names and pick the next
//! free name when a request collides with an existing node.

/// Normalize a requested node name.
///
/// Performs the following transformations:
/// 1. Trims leading/trailing whitespace
/// 2. Collapses inner whitespace runs into single underscores
/// 3. Drops characters other than alphanumerics, `_`, `-` and `.`
///
/// # Examples
///
/// ```
/// use scenegraph_core::util::names::normalize_name;
///
/// assert_eq!(normalize_name("hero asset"), "hero_asset");
/// assert_eq!(normalize_name("  comp   v2 "), "comp_v2");
/// assert_eq!(normalize_name("plate#1"), "plate1");
/// ```
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<&str>>()
        .join("_")
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
        .collect()
}

/// Split a name into its base and trailing integer suffix.
///
/// # Examples
///
/// ```
/// use scenegraph_core::util::names::split_numeric_suffix;
///
/// assert_eq!(split_numeric_suffix("dot12"), ("dot", Some(12)));
/// assert_eq!(split_numeric_suffix("asset"), ("asset", None));
/// ```
pub fn split_numeric_suffix(name: &str) -> (&str, Option<u64>) {
    let base = name.trim_end_matches(|c: char| c.is_ascii_digit());
    if base.len() == name.len() {
        return (name, None);
    }
    match name[base.len()..].parse::<u64>() {
        Ok(n) => (base, Some(n)),
        Err(_) => (name, None),
    }
}

/// Return `requested` if it is free, otherwise the lowest free `base<N>`.
///
/// `is_taken` reports whether a candidate name is already used. Numbering
/// starts at 1 and ignores any suffix already present on the request, so
/// asking for `dot1` when `dot1` exists yields `dot2` (or lower, if free).
///
/// # Examples
///
/// ```
/// use scenegraph_core::util::names::unique_name;
///
/// let taken = ["default", "default1"];
/// let name = unique_name("default", |n| taken.contains(&n));
/// assert_eq!(name, "default2");
/// ```
pub fn unique_name(requested: &str, is_taken: impl Fn(&str) -> bool) -> String {
    if !is_taken(requested) {
        return requested.to_string();
    }
    let (base, _) = split_numeric_suffix(requested);
    let mut n: u64 = 1;
    loop {
        let candidate = format!("{base}{n}");
        if !is_taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}
