//! Breaking change categories matching Buf's categorization system

use serde::{Deserialize, Serialize};

/// Breaking change categories that group related rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BreakingCategory {
    /// FILE category - checks for source-code breaking changes at the per-file level
    File,
    /// PACKAGE category - checks for source-code breaking changes at the per-package level
    Package,
    /// WIRE_JSON category - checks for wire breaking changes for binary or JSON encodings
    WireJson,
    /// WIRE category - checks for wire breaking changes for the binary encoding
    Wire,
}

impl BreakingCategory {
    /// Every category, strictest first. A finding is reported once per
    /// active category of its rule, in this order.
    pub const ALL: [BreakingCategory; 4] = [
        BreakingCategory::File,
        BreakingCategory::Package,
        BreakingCategory::WireJson,
        BreakingCategory::Wire,
    ];

    /// Get the string identifier for this category (matches Buf exactly)
    pub fn id(&self) -> &'static str {
        match self {
            BreakingCategory::File => "FILE",
            BreakingCategory::Package => "PACKAGE",
            BreakingCategory::WireJson => "WIRE_JSON",
            BreakingCategory::Wire => "WIRE",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            BreakingCategory::File => {
                "Checks that there are no source-code breaking changes at the per-file level."
            }
            BreakingCategory::Package => {
                "Checks that there are no source-code breaking changes at the per-package level."
            }
            BreakingCategory::WireJson => {
                "Checks that there are no wire breaking changes for the binary or JSON encodings."
            }
            BreakingCategory::Wire => {
                "Checks that there are no wire breaking changes for the binary encoding."
            }
        }
    }

    /// Parse category from string ID
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "FILE" => Some(BreakingCategory::File),
            "PACKAGE" => Some(BreakingCategory::Package),
            "WIRE_JSON" => Some(BreakingCategory::WireJson),
            "WIRE" => Some(BreakingCategory::Wire),
            _ => None,
        }
    }

    fn bit(&self) -> u8 {
        1 << (*self as u8)
    }
}

impl std::fmt::Display for BreakingCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl std::str::FromStr for BreakingCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_id(s).ok_or_else(|| format!("Unknown breaking category: {s}"))
    }
}

/// Small set of active categories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategorySet(u8);

impl CategorySet {
    pub fn insert(&mut self, category: BreakingCategory) {
        self.0 |= category.bit();
    }

    pub fn contains(&self, category: BreakingCategory) -> bool {
        self.0 & category.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Categories of `tags` that are active, in [`BreakingCategory::ALL`] order.
    pub fn active_in(self, tags: &[BreakingCategory]) -> impl Iterator<Item = BreakingCategory> + '_ {
        BreakingCategory::ALL
            .into_iter()
            .filter(move |c| self.contains(*c) && tags.contains(c))
    }
}

impl FromIterator<BreakingCategory> for CategorySet {
    fn from_iter<I: IntoIterator<Item = BreakingCategory>>(iter: I) -> Self {
        let mut set = CategorySet::default();
        for category in iter {
            set.insert(category);
        }
        set
    }
}
