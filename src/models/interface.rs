// Interface registry rows

use serde::Serialize;
use std::fmt;

/// Row id of an interface. Stable once assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct InterfaceId(pub i64);

impl fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Interface {
    pub id: InterfaceId,
    pub name: String,
    pub alias: Option<String>,
    pub active: bool,
    /// `YYYY-MM-DD HH:MM:SS`, UTC.
    pub created: String,
    pub updated: String,
    pub rxcounter: u64,
    pub txcounter: u64,
    /// Lifetime totals, independent of any bucket.
    pub rxtotal: u64,
    pub txtotal: u64,
}

/// One key/value pair from the info table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InfoEntry {
    pub name: String,
    pub value: String,
}
