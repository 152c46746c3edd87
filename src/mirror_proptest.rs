//! Property-based tests for the mirror's exclusion filter and plain-name
//! validation.
//!
//! These tests use proptest to generate random paths and verify that the
//! invariants hold for all of them.

#[cfg(test)]
mod proptest_tests {
    use crate::config::is_plain_name;
    use crate::mirror::ExcludeFilter;
    use proptest::prelude::*;
    use std::path::PathBuf;

    fn component() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9_][a-zA-Z0-9_.-]{0,8}"
    }

    fn relative_path() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec(component(), 1..6)
    }

    // ============================================================================
    // ExcludeFilter::vcs property tests
    // ============================================================================

    proptest! {
        /// Property: any path with a `.git` component is rejected, wherever it sits
        #[test]
        fn vcs_filter_rejects_git_anywhere(
            parts in relative_path(),
            position in 0usize..6,
        ) {
            let mut parts = parts;
            let at = position.min(parts.len());
            parts.insert(at, ".git".to_string());
            let path: PathBuf = parts.iter().collect();
            prop_assert!(ExcludeFilter::vcs().rejects(&path), "{:?} not rejected", path);
        }

        /// Property: paths without a `.git` component are accepted
        #[test]
        fn vcs_filter_accepts_other_paths(parts in relative_path()) {
            prop_assume!(parts.iter().all(|p| p != ".git"));
            let path: PathBuf = parts.iter().collect();
            prop_assert!(!ExcludeFilter::vcs().rejects(&path));
        }

        /// Property: the empty filter never rejects
        #[test]
        fn none_filter_accepts_everything(parts in relative_path()) {
            let path: PathBuf = parts.iter().collect();
            prop_assert!(!ExcludeFilter::none().rejects(&path));
        }

        /// Property: a literal pattern matches whole components only
        #[test]
        fn literal_pattern_does_not_match_prefixes(name in component(), suffix in "[a-z]{1,4}") {
            let filter = ExcludeFilter::new([name.as_str()]).unwrap();
            let longer = format!("{}{}", name, suffix);
            prop_assert!(filter.rejects(&PathBuf::from(&name)));
            prop_assert!(!filter.rejects(&PathBuf::from(longer)));
        }
    }

    // ============================================================================
    // is_plain_name property tests
    // ============================================================================

    proptest! {
        /// Property: names containing a separator are never plain
        #[test]
        fn names_with_separators_are_rejected(a in component(), b in component()) {
            let slash = format!("{}/{}", a, b);
            let backslash = format!("{}\\{}", a, b);
            prop_assert!(!is_plain_name(&slash));
            prop_assert!(!is_plain_name(&backslash));
        }

        /// Property: single alphanumeric components are plain
        #[test]
        fn alphanumeric_names_are_plain(name in "[a-zA-Z0-9_][a-zA-Z0-9_-]{0,16}") {
            prop_assert!(is_plain_name(&name));
        }
    }
}
