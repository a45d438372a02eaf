//! District range table.
//!
//! Maps each district to its postal prefix, province and the inclusive
//! numeric ranges of postal codes it owns. The table is built once and only
//! read afterwards, so it is shared behind an `Arc` without locking.
//!
//! Files replacing the built-in table are a YAML (or JSON) list:
//!
//! ```yaml
//! - name: Kandy
//!   prefix: "20"
//!   province: Central
//!   ranges: [[20000, 20999]]
//! ```

use crate::error::CoreError;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

/// One district and the postal codes it owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistrictEntry {
    pub name: String,
    pub prefix: String,
    pub province: String,
    /// Inclusive `(min, max)` ranges, in declaration order.
    pub ranges: Vec<(u32, u32)>,
    /// Free-text description. Defaults to `"<province> Province"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl DistrictEntry {
    pub fn new(
        name: impl Into<String>,
        prefix: impl Into<String>,
        province: impl Into<String>,
        ranges: Vec<(u32, u32)>,
    ) -> Self {
        Self {
            name: name.into(),
            prefix: prefix.into(),
            province: province.into(),
            ranges,
            description: None,
        }
    }

    pub fn description(&self) -> Cow<'_, str> {
        match &self.description {
            Some(d) => Cow::Borrowed(d),
            None => Cow::Owned(format!("{} Province", self.province)),
        }
    }

    /// Returns the first range containing `code`.
    pub fn range_containing(&self, code: u32) -> Option<(u32, u32)> {
        self.ranges
            .iter()
            .copied()
            .find(|&(min, max)| min <= code && code <= max)
    }
}

/// A successful lookup. Borrows the matched entry from the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DistrictMatch<'a> {
    /// Position of the entry in declaration order.
    pub index: usize,
    pub entry: &'a DistrictEntry,
    pub range: (u32, u32),
}

/// Immutable district range table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistrictTable {
    entries: Vec<DistrictEntry>,
}

impl DistrictTable {
    /// Builds a table, rejecting malformed entries.
    ///
    /// Overlapping ranges between districts are allowed but logged; lookups
    /// resolve them in declaration order.
    pub fn new(entries: Vec<DistrictEntry>) -> Result<Self, CoreError> {
        if entries.is_empty() {
            return Err(CoreError::InvalidDistrictTable {
                reason: "table has no districts".to_string(),
            });
        }

        let mut names = HashSet::new();
        for entry in &entries {
            if entry.name.trim().is_empty() {
                return Err(CoreError::InvalidDistrictTable {
                    reason: "district name is empty".to_string(),
                });
            }
            if !names.insert(entry.name.as_str()) {
                return Err(CoreError::DuplicateDistrict {
                    name: entry.name.clone(),
                });
            }
            if entry.prefix.is_empty() || !entry.prefix.bytes().all(|b| b.is_ascii_digit()) {
                return Err(CoreError::InvalidDistrictTable {
                    reason: format!(
                        "district '{}' has non-numeric prefix '{}'",
                        entry.name, entry.prefix
                    ),
                });
            }
            if entry.ranges.is_empty() {
                return Err(CoreError::InvalidDistrictTable {
                    reason: format!("district '{}' has no ranges", entry.name),
                });
            }
            for &(min, max) in &entry.ranges {
                if min > max {
                    return Err(CoreError::InvalidRange {
                        district: entry.name.clone(),
                        min,
                        max,
                    });
                }
            }
        }

        let table = Self { entries };
        table.warn_on_overlaps();
        Ok(table)
    }

    /// The built-in Sri Lankan table, built on first use and shared afterwards.
    pub fn builtin() -> Arc<DistrictTable> {
        static BUILTIN: OnceLock<Arc<DistrictTable>> = OnceLock::new();
        BUILTIN
            .get_or_init(|| {
                Arc::new(DistrictTable {
                    entries: builtin_entries(),
                })
            })
            .clone()
    }

    pub fn entries(&self) -> &[DistrictEntry] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&DistrictEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Finds the district owning `code`.
    ///
    /// When more than one district claims the code, the first in declaration
    /// order wins and the conflict is logged.
    pub fn lookup(&self, code: u32) -> Option<DistrictMatch<'_>> {
        let mut matches = self
            .entries
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| {
                entry.range_containing(code).map(|range| DistrictMatch {
                    index,
                    entry,
                    range,
                })
            });

        let first = matches.next()?;
        for other in matches {
            tracing::warn!(
                code,
                chosen = %first.entry.name,
                ignored = %other.entry.name,
                "postal code claimed by more than one district"
            );
        }
        Some(first)
    }

    fn warn_on_overlaps(&self) {
        for (i, a) in self.entries.iter().enumerate() {
            for b in &self.entries[i + 1..] {
                for &(a_min, a_max) in &a.ranges {
                    for &(b_min, b_max) in &b.ranges {
                        if a_min <= b_max && b_min <= a_max {
                            tracing::warn!(
                                "district ranges overlap: {} {}-{} and {} {}-{}",
                                a.name,
                                a_min,
                                a_max,
                                b.name,
                                b_min,
                                b_max
                            );
                        }
                    }
                }
            }
        }
    }
}

/// Serializes as the reference listing: district name to prefix, ranges and
/// description, in declaration order.
impl Serialize for DistrictTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Listing<'a> {
            prefix: &'a str,
            range: &'a [(u32, u32)],
            description: Cow<'a, str>,
        }

        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(
                &entry.name,
                &Listing {
                    prefix: &entry.prefix,
                    range: &entry.ranges,
                    description: entry.description(),
                },
            )?;
        }
        map.end()
    }
}

fn builtin_entries() -> Vec<DistrictEntry> {
    const TABLE: &[(&str, &str, &str, u32, u32)] = &[
        ("Colombo", "00", "Western", 50, 1599),
        ("Colombo 10", "10", "Western", 10000, 10999),
        ("Gampaha", "11", "Western", 11000, 11999),
        ("Kalutara", "12", "Western", 12000, 12689),
        ("Kandy", "20", "Central", 20000, 20999),
        ("Matale", "21", "Central", 21000, 21599),
        ("Nuwara Eliya", "22", "Central", 22000, 22299),
        ("Galle", "80", "Southern", 80000, 80699),
        ("Matara", "81", "Southern", 81000, 81899),
        ("Hambantota", "82", "Southern", 82000, 82699),
        ("Jaffna", "40", "Northern", 40000, 40999),
        ("Kilinochchi", "44", "Northern", 44000, 44399),
        ("Mannar", "41", "Northern", 41000, 41999),
        ("Vavuniya", "43", "Northern", 43000, 43999),
        ("Mullaitivu", "42", "Northern", 42000, 42999),
        ("Batticaloa", "30", "Eastern", 30000, 30499),
        ("Ampara", "32", "Eastern", 32000, 32499),
        ("Trincomalee", "31", "Eastern", 31000, 31999),
        ("Kurunegala", "60", "North Western", 60000, 60999),
        ("Puttalam", "61", "North Western", 61000, 61399),
        ("Anuradhapura", "50", "North Central", 50000, 50499),
        ("Polonnaruwa", "51", "North Central", 51000, 51999),
        ("Badulla", "90", "Uva", 90000, 90699),
        ("Monaragala", "91", "Uva", 91000, 91999),
        ("Ratnapura", "70", "Sabaragamuwa", 70000, 70999),
        ("Kegalle", "71", "Sabaragamuwa", 71000, 71899),
    ];

    TABLE
        .iter()
        .map(|&(name, prefix, province, min, max)| {
            DistrictEntry::new(name, prefix, province, vec![(min, max)])
        })
        .collect()
}
