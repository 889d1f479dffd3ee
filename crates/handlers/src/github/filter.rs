//! Comma-separated glob lists for branch and action filtering.
//!
//! A list is read in order. Plain patterns add a match, `!`-prefixed ones take
//! it away again, so `feature/*,!feature/wip` matches `feature/login` but not
//! `feature/wip`.
use glob::{MatchOptions, Pattern, PatternError};

const OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

#[derive(Debug, Clone)]
struct Rule {
    negated: bool,
    pattern: Pattern,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct GlobList(Vec<Rule>);

impl GlobList {
    pub(crate) fn parse(raw: &str) -> Result<Self, PatternError> {
        raw.split(',')
            .map(|piece| {
                let (negated, body) = match piece.strip_prefix('!') {
                    Some(rest) => (true, rest),
                    None => (false, piece),
                };
                Ok(Rule {
                    negated,
                    pattern: Pattern::new(body)?,
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(GlobList)
    }

    pub(crate) fn matches(&self, candidate: &str) -> bool {
        self.0.iter().fold(false, |matched, rule| {
            if !rule.pattern.matches_with(candidate, OPTIONS) {
                matched
            } else {
                !rule.negated
            }
        })
    }
}

/// Decides whether a branch or action is worth a notification.
#[derive(Debug, Clone, Default)]
pub(crate) enum Relevance {
    #[default]
    Everything,
    Only(GlobList),
    Except(GlobList),
}

impl Relevance {
    /// `ignore` takes precedence over `filter` when both are set.
    pub(crate) fn from_params(
        filter: Option<&str>,
        ignore: Option<&str>,
    ) -> Result<Self, PatternError> {
        Ok(match (filter, ignore) {
            (_, Some(ignore)) => Relevance::Except(GlobList::parse(ignore)?),
            (Some(filter), None) => Relevance::Only(GlobList::parse(filter)?),
            (None, None) => Relevance::Everything,
        })
    }

    pub(crate) fn allows(&self, candidate: &str) -> bool {
        match self {
            Relevance::Everything => true,
            Relevance::Only(list) => list.matches(candidate),
            Relevance::Except(list) => !list.matches(candidate),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_does_not_cross_slashes() {
        let list = GlobList::parse("release/*").unwrap();
        assert!(list.matches("release/1.0"));
        assert!(!list.matches("release/1.0/hotfix"));
        assert!(!list.matches("main"));
    }

    #[test]
    fn negation_removes_earlier_matches() {
        let list = GlobList::parse("feature/*,!feature/wip").unwrap();
        assert!(list.matches("feature/login"));
        assert!(!list.matches("feature/wip"));

        let leading = GlobList::parse("!main").unwrap();
        assert!(!leading.matches("dev"));
    }

    #[test]
    fn ignore_beats_filter() {
        let relevance = Relevance::from_params(Some("main"), Some("gh-pages")).unwrap();
        assert!(relevance.allows("main"));
        assert!(relevance.allows("dev"));
        assert!(!relevance.allows("gh-pages"));

        let only = Relevance::from_params(Some("main,release/*"), None).unwrap();
        assert!(only.allows("release/2"));
        assert!(!only.allows("dev"));
    }

    #[test]
    fn bad_pattern_is_an_error() {
        assert!(GlobList::parse("[unterminated").is_err());
    }
}
