use std::{fmt, str::FromStr};

/// The hierarchical position of an item within its document, e.g. `1.2.3`.
///
/// The depth of a level (the number of components) decides the heading size
/// an item is published with. Trailing zero components are accepted on input
/// (`1.2.0` is the conventional spelling of a heading) and dropped.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Level(Vec<usize>);

impl Level {
    /// Creates a level from its components.
    ///
    /// # Errors
    ///
    /// Returns [`LevelError::Empty`] if no non-zero component remains once
    /// trailing zeros are dropped.
    pub fn new(mut parts: Vec<usize>) -> Result<Self, LevelError> {
        while parts.last() == Some(&0) {
            parts.pop();
        }
        if parts.is_empty() {
            return Err(LevelError::Empty);
        }
        Ok(Self(parts))
    }

    /// The number of components in the level.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// The components of the level.
    #[must_use]
    pub fn parts(&self) -> &[usize] {
        &self.0
    }

    /// Renumbers a sequence of levels in place, keeping each level's depth.
    ///
    /// The first level at any depth below its predecessor starts at `1`; a
    /// level at the same or a shallower depth follows on from the last level
    /// seen at that depth.
    ///
    /// ```
    /// use reqpub::domain::Level;
    ///
    /// let mut levels: Vec<Level> = ["1", "1.4", "1.9", "3", "3.3.3"]
    ///     .iter()
    ///     .map(|l| l.parse().unwrap())
    ///     .collect();
    /// Level::renumber(levels.iter_mut());
    ///
    /// let rendered: Vec<String> = levels.iter().map(ToString::to_string).collect();
    /// assert_eq!(rendered, ["1", "1.1", "1.2", "2", "2.1.1"]);
    /// ```
    pub fn renumber<'a>(levels: impl IntoIterator<Item = &'a mut Self>) {
        let mut current: Vec<usize> = Vec::new();
        for level in levels {
            let depth = level.depth();
            if current.len() >= depth {
                current.truncate(depth);
                if let Some(last) = current.last_mut() {
                    *last += 1;
                }
            } else {
                current.resize(depth, 1);
            }
            level.0.clone_from(&current);
        }
    }
}

impl Default for Level {
    fn default() -> Self {
        Self(vec![1])
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{part}")?;
        }
        Ok(())
    }
}

impl FromStr for Level {
    type Err = LevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s
            .trim()
            .split('.')
            .map(|part| {
                part.trim()
                    .parse::<usize>()
                    .map_err(|_| LevelError::Syntax(s.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(parts)
    }
}

/// Errors that can occur when parsing a level.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LevelError {
    /// The level has no non-zero components.
    #[error("level cannot be empty or zero")]
    Empty,

    /// The level is not a dotted sequence of integers.
    #[error("invalid level '{0}': expected dotted integers such as 1.2.3")]
    Syntax(String),
}
