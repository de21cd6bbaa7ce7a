// exclusion.rs — URL patterns that bypass interception entirely.

use regex::Regex;

#[derive(Debug, Clone)]
enum Matcher {
    Pattern(Regex),
    /// The configured string was not a valid regex; match it as a substring.
    Literal(String),
}

/// Compiled exclusion patterns, searched anywhere in the full URL.
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    matchers: Vec<Matcher>,
}

impl ExclusionSet {
    pub fn compile<S: AsRef<str>>(patterns: &[S]) -> Self {
        let matchers = patterns
            .iter()
            .map(|p| {
                let p = p.as_ref();
                match Regex::new(p) {
                    Ok(re) => Matcher::Pattern(re),
                    Err(e) => {
                        tracing::warn!(
                            pattern = p,
                            error = %e,
                            "exclude pattern is not a valid regex; matching it literally"
                        );
                        Matcher::Literal(p.to_string())
                    }
                }
            })
            .collect();
        Self { matchers }
    }

    pub fn matches(&self, url: &str) -> bool {
        self.matchers.iter().any(|m| match m {
            Matcher::Pattern(re) => re.is_match(url),
            Matcher::Literal(s) => url.contains(s.as_str()),
        })
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regex_searches_anywhere_in_url() {
        let set = ExclusionSet::compile(&["telemetry\\.", "^https://internal/"]);
        assert!(set.matches("https://telemetry.example.com/v1"));
        assert!(set.matches("https://internal/health"));
        assert!(!set.matches("http://internal/health"));
        assert!(!set.matches("https://api.example.com/"));
    }

    #[test]
    fn invalid_regex_falls_back_to_literal() {
        let set = ExclusionSet::compile(&["metrics(["]);
        assert_eq!(set.len(), 1);
        assert!(set.matches("https://x.com/metrics([/1"));
        assert!(!set.matches("https://x.com/metrics"));
    }

    #[test]
    fn empty_set_matches_nothing() {
        let set = ExclusionSet::compile::<&str>(&[]);
        assert!(set.is_empty());
        assert!(!set.matches("https://anything/"));
    }
}
