use regex_lite::{Captures, Regex};
use std::sync::LazyLock;

/// `${NAME}` or `${NAME:-fallback}`.
static ENV_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
        .unwrap_or_else(|e| panic!("invalid env pattern: {e}"))
});

/// Substitute environment references in a config value.
///
/// `${GRAPH_API_KEY}` takes the variable's value; `${DATA_DIR:-data}` falls
/// back to `data` when the variable is unset or empty. A reference with no
/// fallback whose variable is unset stays verbatim, which is how
/// [`ApiConfig::has_api_key`](super::ApiConfig::has_api_key) spots a key that
/// was never provided.
pub fn expand_env(s: &str) -> String {
    ENV_REF
        .replace_all(s, |caps: &Captures<'_>| {
            let value = std::env::var(&caps[1]).ok().filter(|v| !v.is_empty());
            match (value, caps.get(2)) {
                (Some(value), _) => value,
                (None, Some(fallback)) => fallback.as_str().to_string(),
                (None, None) => caps[0].to_string(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_env() {
        std::env::set_var("ENV_EXPAND_TEST_KEY", "k-42");
        assert_eq!(expand_env("${ENV_EXPAND_TEST_KEY}"), "k-42");
        assert_eq!(
            expand_env("https://gateway/${ENV_EXPAND_TEST_KEY}/subgraphs"),
            "https://gateway/k-42/subgraphs"
        );
        assert_eq!(expand_env("no_vars"), "no_vars");
        assert_eq!(expand_env("${ENV_EXPAND_UNSET_KEY}"), "${ENV_EXPAND_UNSET_KEY}");
        std::env::remove_var("ENV_EXPAND_TEST_KEY");
    }

    #[test]
    fn test_fallback_values() {
        std::env::set_var("ENV_EXPAND_TEST_DIR", "/srv/liq");
        std::env::set_var("ENV_EXPAND_TEST_EMPTY", "");
        assert_eq!(expand_env("${ENV_EXPAND_TEST_DIR:-data}"), "/srv/liq");
        assert_eq!(expand_env("${ENV_EXPAND_UNSET_DIR:-data}"), "data");
        assert_eq!(expand_env("${ENV_EXPAND_TEST_EMPTY:-data}"), "data");
        assert_eq!(expand_env("${ENV_EXPAND_UNSET_DIR:-}"), "");
        std::env::remove_var("ENV_EXPAND_TEST_DIR");
        std::env::remove_var("ENV_EXPAND_TEST_EMPTY");
    }
}
