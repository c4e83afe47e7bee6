//! Branch → environment classification.

use indexmap::IndexMap;

use crate::domain::EnvironmentSpec;

/// Return the name of the first environment, in configuration order, whose
/// pattern matches `branch`.
///
/// Environments without a pattern never match. When several patterns match,
/// the earliest configured environment wins.
pub fn classify_branch<'a>(
    branch: &str,
    environments: &'a IndexMap<String, EnvironmentSpec>,
) -> Option<&'a str> {
    environments
        .iter()
        .find(|(_, env)| env.pattern.as_ref().is_some_and(|p| p.is_match(branch)))
        .map(|(name, _)| name.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(name: &str, pattern: &str) -> EnvironmentSpec {
        EnvironmentSpec::new(name, "").with_pattern(pattern).unwrap()
    }

    fn environments(specs: Vec<EnvironmentSpec>) -> IndexMap<String, EnvironmentSpec> {
        specs.into_iter().map(|e| (e.name.clone(), e)).collect()
    }

    #[test]
    fn test_dev_pattern_excludes_staging_branches() {
        let envs = environments(vec![env("dev", "^(?!(main|staging)).*$")]);
        assert_eq!(classify_branch("staging-this-is-not-a-develop-branch", &envs), None);
        assert_eq!(classify_branch("feature/23-this-is-a-develop-branch", &envs), Some("dev"));
    }

    #[test]
    fn test_staging_prefix() {
        let envs = environments(vec![env("staging", "^(staging)")]);
        assert_eq!(classify_branch("staging-this-is-a-staging-branch", &envs), Some("staging"));
    }

    #[test]
    fn test_first_configured_environment_wins() {
        let prod_first = environments(vec![env("prod", "^(main)$"), env("catchall", ".*")]);
        let catchall_first = environments(vec![env("catchall", ".*"), env("prod", "^(main)$")]);

        assert_eq!(classify_branch("main", &prod_first), Some("prod"));
        assert_eq!(classify_branch("main", &catchall_first), Some("catchall"));
    }

    #[test]
    fn test_classification_is_stable() {
        let envs = environments(vec![
            env("prod", "^(main)$"),
            env("staging", "^(staging)"),
            env("dev", "^(?!(main|staging)).*$"),
        ]);
        for branch in ["main", "staging-1", "feature/x", ""] {
            let first = classify_branch(branch, &envs);
            for _ in 0..5 {
                assert_eq!(classify_branch(branch, &envs), first);
            }
        }
    }

    #[test]
    fn test_environment_without_pattern_never_matches() {
        let envs = environments(vec![EnvironmentSpec::new("dev", "develop")]);
        assert_eq!(classify_branch("develop", &envs), None);
    }

    #[test]
    fn test_no_environments() {
        assert_eq!(classify_branch("main", &IndexMap::new()), None);
    }
}
