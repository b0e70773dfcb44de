//! Shell-style `$NAME` references in configuration strings.

use std::sync::LazyLock;

use regex::{Captures, Regex};

#[expect(
    clippy::expect_used,
    reason = "the pattern is a literal and is covered by unit tests"
)]
static REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$[A-Za-z0-9_]+").expect("reference pattern is valid"));

#[expect(
    clippy::expect_used,
    reason = "the pattern is a literal and is covered by unit tests"
)]
static EXPANSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(?:\{([A-Za-z0-9_]+)\}|([A-Za-z0-9_]+))").expect("expansion pattern is valid")
});

/// Return the variable names referenced as `$NAME` in `text`, in order.
///
/// Braced `${NAME}` forms are expanded by [`expand`] but are not reported
/// here.
pub fn referenced_variables(text: &str) -> impl Iterator<Item = &str> {
    REFERENCE
        .find_iter(text)
        .filter_map(|found| found.as_str().strip_prefix('$'))
}

/// Expand `$NAME` and `${NAME}` references from `env`.
///
/// Unset variables expand to the empty string. A `$` that does not start a
/// reference is kept as-is.
pub fn expand<E: mockable::Env>(text: &str, env: &E) -> String {
    EXPANSION
        .replace_all(text, |captures: &Captures<'_>| {
            captures
                .get(1)
                .or_else(|| captures.get(2))
                .and_then(|name| env.string(name.as_str()))
                .unwrap_or_default()
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use mockable::MockEnv;
    use rstest::{fixture, rstest};

    use super::{expand, referenced_variables};

    #[fixture]
    fn env() -> MockEnv {
        let mut env = MockEnv::new();
        env.expect_string().returning(|key| match key {
            "HOME" => Some(String::from("/home/u")),
            "CLUSTER" => Some(String::from("prod")),
            _ => None,
        });
        env
    }

    #[rstest]
    #[case("no references here", &[])]
    #[case("$HOME/.ssh/id_rsa", &["HOME"])]
    #[case("$A-$B_2 and $C", &["A", "B_2", "C"])]
    #[case("${HOME}/braced", &[])]
    #[case("cost: $", &[])]
    fn referenced_variables_matches_sigil_names(#[case] text: &str, #[case] expected: &[&str]) {
        let found: Vec<&str> = referenced_variables(text).collect();
        assert_eq!(found, expected);
    }

    #[rstest]
    #[case("$HOME/.ssh/id_rsa", "/home/u/.ssh/id_rsa")]
    #[case("${HOME}/x", "/home/u/x")]
    #[case("k2-$CLUSTER", "k2-prod")]
    #[case("$UNSET/data", "/data")]
    #[case("plain", "plain")]
    #[case("price $ 5", "price $ 5")]
    fn expand_substitutes_from_environment(
        env: MockEnv,
        #[case] text: &str,
        #[case] expected: &str,
    ) {
        assert_eq!(expand(text, &env), expected);
    }
}
