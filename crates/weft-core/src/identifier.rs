//! Interned identifiers for type names, trait names, and attribute keys.
//!
//! Every name flowing through the engine (factory names, trait names,
//! attribute keys) is an [`Id`]: a `Copy` handle into a process-wide string
//! interner. Interning makes name comparison and map lookups cheap, which
//! matters because association resolution scans names repeatedly.

use std::{
    fmt,
    sync::{Mutex, OnceLock},
};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use string_interner::{DefaultStringInterner, DefaultSymbol};

/// Global string interner backing all [`Id`] values.
static INTERNER: OnceLock<Mutex<DefaultStringInterner>> = OnceLock::new();

fn interner() -> &'static Mutex<DefaultStringInterner> {
    INTERNER.get_or_init(|| Mutex::new(DefaultStringInterner::new()))
}

/// An interned identifier.
///
/// # Examples
///
/// ```
/// use weft_core::identifier::Id;
///
/// let customer = Id::new("customer");
/// let profile = Id::new("profile");
///
/// // Candidate names for factory-name completion are built by joining
/// // an ancestor name with a partial name.
/// let completed = Id::compound(customer, profile);
/// assert_eq!(completed, "customer_profile");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Id(DefaultSymbol);

impl Id {
    /// Interns `name` and returns its identifier.
    pub fn new(name: &str) -> Self {
        let mut interner = interner().lock().expect("Failed to acquire interner lock");
        Self(interner.get_or_intern(name))
    }

    /// Builds the identifier `"{prefix}_{suffix}"`.
    ///
    /// This is the candidate-name primitive used by factory-name completion:
    /// a partial name like `profile` nested under a `customer` ancestor is
    /// tried as `customer_profile`.
    pub fn compound(prefix: Id, suffix: Id) -> Self {
        let mut interner = interner().lock().expect("Failed to acquire interner lock");
        let prefix_str = interner
            .resolve(prefix.0)
            .expect("Prefix should exist in interner");
        let suffix_str = interner
            .resolve(suffix.0)
            .expect("Suffix should exist in interner");
        let joined = format!("{prefix_str}_{suffix_str}");
        Self(interner.get_or_intern(&joined))
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let interner = interner().lock().expect("Failed to acquire interner lock");
        let str_value = interner
            .resolve(self.0)
            .expect("Symbol should exist in interner");
        write!(f, "{str_value}")
    }
}

impl From<&str> for Id {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl PartialEq<str> for Id {
    fn eq(&self, other: &str) -> bool {
        let interner = interner().lock().expect("Failed to acquire interner lock");
        let self_str = interner
            .resolve(self.0)
            .expect("Symbol should exist in interner");
        self_str == other
    }
}

impl PartialEq<&str> for Id {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

impl Serialize for Id {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::new(&name))
    }
}
