use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    str::FromStr,
    sync::LazyLock,
};

use non_empty_string::NonEmptyString;
use regex::Regex;

/// `PREFIX` + optional separator + `NUMBER`, with the shortest possible prefix.
/// The prefix starts with a letter.
static UID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<prefix>[A-Za-z].*?)(?P<sep>[-_.]?)(?P<number>\d+)$")
        .expect("valid UID pattern")
});

/// The unique identifier of an item.
///
/// An item's own UID always splits into a prefix and a number (`RQ001`,
/// `REQ-003`). Link targets are stored as UIDs too, but they are free-form and
/// need not split or resolve: a link is only required to be non-empty.
///
/// UIDs order lexicographically on their textual form, which gives link lists
/// a stable rendering order.
#[derive(Clone, PartialEq, Eq)]
pub struct Uid(NonEmptyString);

impl Uid {
    /// Creates a UID from any non-empty string.
    ///
    /// # Errors
    ///
    /// Returns [`UidError::Empty`] if the string is empty or whitespace.
    pub fn new(value: impl Into<String>) -> Result<Self, UidError> {
        let value = value.into().trim().to_string();
        NonEmptyString::new(value)
            .map(Self)
            .map_err(|_| UidError::Empty)
    }

    /// Builds a UID from its components, padding the number to `digits`.
    ///
    /// ```
    /// use reqpub::Uid;
    ///
    /// let uid = Uid::from_parts("REQ", "-", 3, 3).unwrap();
    /// assert_eq!(uid.as_str(), "REQ-003");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`UidError::Empty`] if the prefix is empty.
    pub fn from_parts(
        prefix: &str,
        sep: &str,
        number: usize,
        digits: usize,
    ) -> Result<Self, UidError> {
        if prefix.is_empty() {
            return Err(UidError::Empty);
        }
        Self::new(format!("{prefix}{sep}{number:0digits$}"))
    }

    /// Returns the textual form of the UID.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Splits the UID into its prefix, separator and number.
    ///
    /// Returns `None` for free-form link targets such as `abc` or `123`.
    #[must_use]
    pub fn parts(&self) -> Option<UidParts<'_>> {
        let captures = UID_PATTERN.captures(self.as_str())?;
        let prefix = captures.name("prefix")?.as_str();
        let sep = captures.name("sep").map_or("", |m| m.as_str());
        let number = captures.name("number")?.as_str().parse().ok()?;
        Some(UidParts {
            prefix,
            sep,
            number,
        })
    }

    /// The document prefix encoded in the UID, if it has one.
    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        self.parts().map(|parts| parts.prefix)
    }
}

/// The components of a well-formed UID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UidParts<'a> {
    /// Document prefix, e.g. `REQ`.
    pub prefix: &'a str,
    /// Separator between prefix and number; may be empty.
    pub sep: &'a str,
    /// The item number.
    pub number: usize,
}

impl Ord for Uid {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl PartialOrd for Uid {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Hash for Uid {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Uid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Uid({:?})", self.as_str())
    }
}

impl FromStr for Uid {
    type Err = UidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<&str> for Uid {
    type Error = UidError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<String> for Uid {
    type Error = UidError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl AsRef<str> for Uid {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl PartialEq<str> for Uid {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for Uid {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

/// Errors that can occur when parsing a UID.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UidError {
    /// The identifier was empty.
    #[error("UID cannot be empty")]
    Empty,

    /// The identifier does not split into a prefix and a number.
    #[error("invalid item UID '{0}': expected a prefix followed by a number")]
    Syntax(String),
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("RQ001", "RQ", "", 1; "no separator")]
    #[test_case("REQ-003", "REQ", "-", 3; "dash separator")]
    #[test_case("tst1", "tst", "", 1; "lower case")]
    #[test_case("LLT_0042", "LLT", "_", 42; "underscore separator")]
    #[test_case("SYS2.10", "SYS2", ".", 10; "digit in prefix")]
    fn splits_well_formed_uids(uid: &str, prefix: &str, sep: &str, number: usize) {
        let uid = Uid::new(uid).unwrap();
        let parts = uid.parts().expect("uid should split");
        assert_eq!(parts.prefix, prefix);
        assert_eq!(parts.sep, sep);
        assert_eq!(parts.number, number);
    }

    #[test_case("abc"; "letters only")]
    #[test_case("123"; "digits only")]
    fn free_form_uids_do_not_split(uid: &str) {
        let uid = Uid::new(uid).unwrap();
        assert!(uid.parts().is_none());
        assert_eq!(uid.prefix(), None);
    }

    #[test]
    fn empty_uid_is_rejected() {
        assert_eq!(Uid::new("  "), Err(UidError::Empty));
    }

    #[test]
    fn from_parts_pads_number() {
        assert_eq!(Uid::from_parts("RQ", "", 7, 3).unwrap(), "RQ007");
        assert_eq!(Uid::from_parts("RQ", "", 1234, 3).unwrap(), "RQ1234");
        assert_eq!(Uid::from_parts("", "-", 1, 3), Err(UidError::Empty));
    }

    #[test]
    fn ordering_is_lexicographic() {
        let mut uids: Vec<Uid> = ["abc", "123", "REQ10", "REQ2"]
            .into_iter()
            .map(|s| Uid::new(s).unwrap())
            .collect();
        uids.sort();
        let sorted: Vec<_> = uids.iter().map(Uid::as_str).collect();
        assert_eq!(sorted, ["123", "REQ10", "REQ2", "abc"]);
    }
}
