//! Caller identities and the static allow-list built from configuration.

use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fmt, num::ParseIntError, str::FromStr};

/// Opaque integer identifying whoever submitted a request.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct CallerId(pub i64);

impl fmt::Display for CallerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CallerId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(CallerId)
    }
}

/// Immutable set of callers allowed to submit content.
///
/// Built once at startup and never mutated afterwards.
#[derive(Clone, Debug, Default)]
pub struct AuthorizationSet {
    members: HashSet<CallerId>,
}

/// Outcome of parsing a comma-separated caller list.
#[derive(Debug)]
pub struct ParsedCallers {
    pub set: AuthorizationSet,
    /// Entries that failed to parse, in input order.
    pub malformed: Vec<String>,
}

impl AuthorizationSet {
    pub fn new(members: impl IntoIterator<Item = CallerId>) -> Self {
        Self {
            members: members.into_iter().collect(),
        }
    }

    /// Parse `"1, 2,3"` style input.
    ///
    /// Blank entries are ignored. When some entries are malformed the set keeps
    /// the longest contiguous run of valid entries (the first one on ties), so a
    /// typo never widens access and never aborts startup.
    pub fn parse(raw: &str) -> ParsedCallers {
        let mut malformed = Vec::new();
        let mut best: Vec<CallerId> = Vec::new();
        let mut run: Vec<CallerId> = Vec::new();

        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            match entry.parse::<CallerId>() {
                Ok(id) => run.push(id),
                Err(_) => {
                    malformed.push(entry.to_string());
                    if run.len() > best.len() {
                        best = std::mem::take(&mut run);
                    } else {
                        run.clear();
                    }
                }
            }
        }
        if run.len() > best.len() {
            best = run;
        }

        ParsedCallers {
            set: Self::new(best),
            malformed,
        }
    }

    pub fn contains(&self, caller: CallerId) -> bool {
        self.members.contains(&caller)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_list() {
        let parsed = AuthorizationSet::parse(" 11, 22,33 ,");
        assert!(parsed.malformed.is_empty());
        assert_eq!(parsed.set.len(), 3);
        assert!(parsed.set.contains(CallerId(22)));
    }

    #[test]
    fn empty_input_denies_everyone() {
        let parsed = AuthorizationSet::parse("");
        assert!(parsed.set.is_empty());
        assert!(!parsed.set.contains(CallerId(0)));
    }

    #[test]
    fn malformed_entry_keeps_longest_valid_run() {
        let parsed = AuthorizationSet::parse("1,abc,2,3,x,4");
        assert_eq!(parsed.malformed, vec!["abc".to_string(), "x".to_string()]);
        assert_eq!(parsed.set.len(), 2);
        assert!(parsed.set.contains(CallerId(2)));
        assert!(parsed.set.contains(CallerId(3)));
        assert!(!parsed.set.contains(CallerId(1)));
        assert!(!parsed.set.contains(CallerId(4)));
    }

    #[test]
    fn ties_prefer_the_first_run() {
        let parsed = AuthorizationSet::parse("5,oops,6");
        assert_eq!(parsed.set.len(), 1);
        assert!(parsed.set.contains(CallerId(5)));
    }

    #[test]
    fn nothing_parses_means_deny_all() {
        let parsed = AuthorizationSet::parse("YOUR_TELEGRAM_ID_HERE");
        assert!(parsed.set.is_empty());
        assert_eq!(parsed.malformed.len(), 1);
    }

    #[test]
    fn negative_ids_are_valid() {
        let parsed = AuthorizationSet::parse("-100200300");
        assert!(parsed.set.contains(CallerId(-100200300)));
    }
}
