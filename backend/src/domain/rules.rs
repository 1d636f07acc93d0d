//! Fail-fast business rule runner.
//!
//! A rule is a message code paired with a check that yields `None` on pass
//! or a failure description. Rules run in declaration order and the first
//! failure stops evaluation; later checks are never invoked.

use pagination::PageRequest;

use super::message::{Message, MessageCode};
use super::message_codes::general;

/// First failing rule reported by a [`BusinessRules`] run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {description}")]
pub struct RuleViolation {
    /// Code of the offending rule.
    pub code: MessageCode,
    /// Failure description produced by the rule.
    pub description: String,
}

impl From<RuleViolation> for Message {
    fn from(value: RuleViolation) -> Self {
        Message::error(value.code, value.description)
    }
}

type Check<'a> = Box<dyn FnOnce() -> Option<String> + 'a>;

/// Ordered set of lazily evaluated rules.
///
/// # Examples
/// ```
/// use duty_backend::domain::{BusinessRules, rules, message_codes::auth};
///
/// let outcome = BusinessRules::new()
///     .rule(auth::IDENTIFIER_REQUIRED, || rules::required("ada", "identifier"))
///     .rule(auth::PASSWORD_REQUIRED, || rules::required("", "password"))
///     .run();
/// assert_eq!(outcome.expect_err("password missing").code, auth::PASSWORD_REQUIRED);
/// ```
#[derive(Default)]
pub struct BusinessRules<'a> {
    rules: Vec<(MessageCode, Check<'a>)>,
}

impl<'a> BusinessRules<'a> {
    /// Empty rule set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule.
    pub fn rule(mut self, code: MessageCode, check: impl FnOnce() -> Option<String> + 'a) -> Self {
        self.rules.push((code, Box::new(check)));
        self
    }

    /// Evaluate the rules in order, stopping at the first failure.
    pub fn run(self) -> Result<(), RuleViolation> {
        for (code, check) in self.rules {
            if let Some(description) = check() {
                return Err(RuleViolation { code, description });
            }
        }
        Ok(())
    }
}

/// Run already evaluated `(code, outcome)` pairs, reporting the first
/// failure.
pub fn run_rules(
    outcomes: impl IntoIterator<Item = (MessageCode, Option<String>)>,
) -> Result<(), RuleViolation> {
    outcomes
        .into_iter()
        .find_map(|(code, outcome)| outcome.map(|description| RuleViolation { code, description }))
        .map_or(Ok(()), Err)
}

/// Fails when `value` is blank.
pub fn required(value: &str, name: &str) -> Option<String> {
    value
        .trim()
        .is_empty()
        .then(|| format!("{name} is required"))
}

/// Fails when `value` has fewer than `min` characters.
pub fn min_length(value: &str, min: usize, name: &str) -> Option<String> {
    (value.chars().count() < min).then(|| format!("{name} must be at least {min} characters"))
}

/// Fails when `value` has more than `max` characters.
pub fn max_length(value: &str, max: usize, name: &str) -> Option<String> {
    (value.chars().count() > max).then(|| format!("{name} must be at most {max} characters"))
}

/// Fails unless `value` looks like `local@domain.tld`.
pub fn email_format(value: &str) -> Option<String> {
    let valid = value.split_once('@').is_some_and(|(local, domain)| {
        !local.is_empty()
            && !domain.contains('@')
            && domain
                .split_once('.')
                .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
            && !value.chars().any(char::is_whitespace)
    });
    (!valid).then(|| format!("{value:?} is not a valid email address"))
}

/// Fails unless `value` is exactly `digits` ASCII digits.
pub fn numeric_code(value: &str, digits: usize) -> Option<String> {
    let valid = value.len() == digits && value.bytes().all(|b| b.is_ascii_digit());
    (!valid).then(|| format!("code must be {digits} digits"))
}

/// Validate raw paging input.
pub fn page_request(page: u32, page_size: Option<u32>) -> Result<PageRequest, RuleViolation> {
    PageRequest::new(page, page_size).map_err(|err| RuleViolation {
        code: general::INVALID_PAGE,
        description: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    //! Regression coverage for rule ordering and the stock predicates.
    use super::*;
    use crate::domain::message_codes::auth;
    use std::cell::Cell;
    use rstest::rstest;

    #[rstest]
    fn stops_at_first_failure_without_evaluating_later_rules() {
        let evaluated = Cell::new(0);
        let outcome = BusinessRules::new()
            .rule(auth::IDENTIFIER_REQUIRED, || {
                evaluated.set(evaluated.get() + 1);
                None
            })
            .rule(auth::PASSWORD_REQUIRED, || {
                evaluated.set(evaluated.get() + 1);
                Some("X".to_owned())
            })
            .rule(auth::EMAIL_INVALID, || {
                evaluated.set(evaluated.get() + 1);
                Some("Y".to_owned())
            })
            .run();

        let violation = outcome.expect_err("second rule fails");
        assert_eq!(violation.code, auth::PASSWORD_REQUIRED);
        assert_eq!(violation.description, "X");
        assert_eq!(evaluated.get(), 2);
    }

    #[rstest]
    fn evaluated_pairs_report_first_failure() {
        let outcome = run_rules([
            (auth::IDENTIFIER_REQUIRED, None),
            (auth::PASSWORD_REQUIRED, Some("X".to_owned())),
            (auth::EMAIL_INVALID, Some("Y".to_owned())),
        ]);
        assert_eq!(
            outcome,
            Err(RuleViolation {
                code: auth::PASSWORD_REQUIRED,
                description: "X".to_owned(),
            })
        );
    }

    #[rstest]
    fn empty_rule_set_passes() {
        assert_eq!(BusinessRules::new().run(), Ok(()));
        assert_eq!(run_rules(Vec::<(MessageCode, Option<String>)>::new()), Ok(()));
    }

    #[rstest]
    #[case("ada@example.com", true)]
    #[case("ada@localhost", false)]
    #[case("@example.com", false)]
    #[case("ada@@example.com", false)]
    #[case("ada lovelace@example.com", false)]
    #[case("ada", false)]
    fn validates_email_format(#[case] value: &str, #[case] valid: bool) {
        assert_eq!(email_format(value).is_none(), valid);
    }

    #[rstest]
    #[case("123456", true)]
    #[case("12345", false)]
    #[case("12a456", false)]
    #[case("1234567", false)]
    fn validates_numeric_codes(#[case] value: &str, #[case] valid: bool) {
        assert_eq!(numeric_code(value, 6).is_none(), valid);
    }

    #[rstest]
    #[case("   ", false)]
    #[case("x", true)]
    fn validates_required_values(#[case] value: &str, #[case] valid: bool) {
        assert_eq!(required(value, "name").is_none(), valid);
    }

    #[rstest]
    fn length_bounds_count_characters() {
        assert!(min_length("ñandú", 5, "name").is_none());
        assert!(min_length("abc", 8, "password").is_some());
        assert!(max_length("abcdef", 5, "name").is_some());
    }

    #[rstest]
    #[case(0, Some(10))]
    #[case(1, Some(0))]
    fn rejects_zero_paging_input(#[case] page: u32, #[case] size: Option<u32>) {
        let violation = page_request(page, size).expect_err("invalid paging");
        assert_eq!(violation.code, general::INVALID_PAGE);
    }
}
