//! Regular expression values.
//!
//! A `RegExp` keeps the source and flags it was created from next to the
//! compiled `regex::Regex`. Flags `i`, `m` and `s` configure matching; `g`
//! only changes how callers iterate (every match instead of the first);
//! `u` and `y` are accepted and ignored.

use crate::error::{ExtendError, ExtendResult};
use regex::{Regex, RegexBuilder};
use std::fmt;

const KNOWN_FLAGS: &str = "gimsuy";

#[derive(Clone)]
pub struct RegExp {
    source: String,
    flags: String,
    compiled: Regex,
}

impl RegExp {
    pub fn new(source: &str, flags: &str) -> ExtendResult<Self> {
        if let Some(flag) = flags.chars().find(|c| !KNOWN_FLAGS.contains(*c)) {
            return Err(ExtendError::invalid_argument(
                "RegExp",
                format!("unknown flag '{flag}'"),
            ));
        }
        let compiled = RegexBuilder::new(source)
            .case_insensitive(flags.contains('i'))
            .multi_line(flags.contains('m'))
            .dot_matches_new_line(flags.contains('s'))
            .build()
            .map_err(|err| ExtendError::invalid_argument("RegExp", err.to_string()))?;
        Ok(Self {
            source: source.to_string(),
            flags: flags.to_string(),
            compiled,
        })
    }

    /// Same pattern, matching case-insensitively.
    pub fn ignoring_case(&self) -> ExtendResult<Self> {
        if self.is_ignore_case() {
            return Ok(self.clone());
        }
        RegExp::new(&self.source, &format!("{}i", self.flags))
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn flags(&self) -> &str {
        &self.flags
    }

    pub fn is_global(&self) -> bool {
        self.flags.contains('g')
    }

    pub fn is_ignore_case(&self) -> bool {
        self.flags.contains('i')
    }

    pub fn regex(&self) -> &Regex {
        &self.compiled
    }

    /// Names of the named capture groups, in pattern order.
    pub fn group_names(&self) -> Vec<&str> {
        self.compiled.capture_names().flatten().collect()
    }
}

impl fmt::Display for RegExp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.source, self.flags)
    }
}

impl fmt::Debug for RegExp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_configure_matching() {
        let re = RegExp::new("foo", "gi").unwrap();
        assert!(re.is_global());
        assert!(re.regex().is_match("FOO"));
        assert_eq!(re.to_string(), "/foo/gi");
    }

    #[test]
    fn unknown_flags_and_bad_sources_are_rejected() {
        assert!(RegExp::new("a", "x").is_err());
        assert!(RegExp::new("(", "").is_err());
    }

    #[test]
    fn ignoring_case_adds_the_flag_once() {
        let re = RegExp::new("[A-Z]", "").unwrap().ignoring_case().unwrap();
        assert_eq!(re.flags(), "i");
        assert!(re.regex().is_match("a"));
        assert_eq!(re.ignoring_case().unwrap().flags(), "i");
    }

    #[test]
    fn named_groups_are_listed_in_order() {
        let re = RegExp::new(r"(?<value>\d+)(x)?(?<unit>[a-z]+)", "").unwrap();
        assert_eq!(re.group_names(), vec!["value", "unit"]);
    }
}
