// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Assignment of codewords to signal values, per instrument group.
//!
//! The position of a signal value within its group's list is the codeword the
//! instrument decodes into a waveform. Codeword 0 is reserved for "no signal".

use anyhow::Context;
use cc_log::debug;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::ir::GroupIndex;
use crate::{CC_BACKEND_VERSION, Error, Result};

pub type Codeword = usize;

/// Signal values per group, per instrument name.
pub type CodewordAssignment = IndexMap<String, Vec<Vec<String>>>;

/// Exported codeword assignment, reusable as preloaded input of a later compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodewordMap {
    pub note: String,
    pub codeword_table: CodewordAssignment,
}

impl CodewordMap {
    pub fn from_json(json: &str) -> Result<Self> {
        let map = serde_json::from_str(json).context("Failed to parse codeword map")?;
        Ok(map)
    }

    pub fn to_json(&self) -> Result<String> {
        let mut buffer = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        self.serialize(&mut serializer)
            .context("Failed to serialize codeword map")?;
        let mut json = String::from_utf8(buffer).context("Codeword map is not valid UTF-8")?;
        json.push('\n');
        Ok(json)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodewordMode {
    /// New signal values are assigned the next free codeword.
    Growable,
    /// Only signal values of a preloaded map are accepted.
    Frozen,
}

#[derive(Debug, Clone)]
pub struct CodewordTable {
    mode: CodewordMode,
    table: CodewordAssignment,
}

impl Default for CodewordTable {
    fn default() -> Self {
        Self::new()
    }
}

impl CodewordTable {
    pub fn new() -> Self {
        Self {
            mode: CodewordMode::Growable,
            table: IndexMap::new(),
        }
    }

    pub fn preloaded(map: CodewordMap) -> Self {
        Self {
            mode: CodewordMode::Frozen,
            table: map.codeword_table,
        }
    }

    pub fn mode(&self) -> CodewordMode {
        self.mode
    }

    /// Signal values assigned to a group, indexed by codeword.
    pub fn group(&self, instrument: &str, group: GroupIndex) -> Option<&[String]> {
        self.table
            .get(instrument)
            .and_then(|groups| groups.get(group))
            .map(Vec::as_slice)
    }

    pub fn lookup_or_allocate(
        &mut self,
        instrument: &str,
        group: GroupIndex,
        signal_value: &str,
    ) -> Result<Codeword> {
        match self.mode {
            CodewordMode::Frozen => self.lookup_frozen(instrument, group, signal_value),
            CodewordMode::Growable => Ok(self.lookup_or_append(instrument, group, signal_value)),
        }
    }

    fn lookup_frozen(
        &self,
        instrument: &str,
        group: GroupIndex,
        signal_value: &str,
    ) -> Result<Codeword> {
        let mismatch = |detail: String| Error::CodewordMismatch {
            instrument: instrument.to_string(),
            group,
            value: signal_value.to_string(),
            detail,
        };
        let values = match self.group(instrument, group) {
            Some(values) if !values.is_empty() => values,
            _ => {
                return Err(mismatch(format!(
                    "instrument '{instrument}', group {group} not present in map"
                )));
            }
        };
        values
            .iter()
            .skip(1)
            .position(|v| v == signal_value)
            .map(|position| position + 1)
            .ok_or_else(|| mismatch(format!("group {group} contains {values:?}")))
    }

    fn lookup_or_append(
        &mut self,
        instrument: &str,
        group: GroupIndex,
        signal_value: &str,
    ) -> Codeword {
        let groups = self.table.entry(instrument.to_string()).or_default();
        if groups.len() <= group {
            groups.resize_with(group + 1, Vec::new);
        }
        let values = &mut groups[group];
        if values.is_empty() {
            values.push(String::new());
        }
        if let Some(position) = values.iter().skip(1).position(|v| v == signal_value) {
            return position + 1;
        }
        values.push(signal_value.to_string());
        let codeword = values.len() - 1;
        debug!(
            "Assigned codeword {} to signal value '{}' on instrument '{}', group {}",
            codeword,
            signal_value,
            instrument,
            group
        );
        codeword
    }

    pub fn export(&self) -> CodewordMap {
        CodewordMap {
            note: format!("generated by CC backend version {CC_BACKEND_VERSION}"),
            codeword_table: self.table.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_allocate_on_demand() {
        let mut table = CodewordTable::new();
        assert_eq!(table.lookup_or_allocate("mw0", 0, "x90").unwrap(), 1);
        assert_eq!(table.lookup_or_allocate("mw0", 0, "y90").unwrap(), 2);
        assert_eq!(table.lookup_or_allocate("mw0", 0, "x90").unwrap(), 1);
        assert_eq!(table.lookup_or_allocate("mw0", 2, "x90").unwrap(), 1);
        assert_eq!(
            table.group("mw0", 0).unwrap(),
            &["".to_string(), "x90".to_string(), "y90".to_string()]
        );
        assert_eq!(table.group("mw0", 1).unwrap(), &[] as &[String]);
    }

    #[test]
    fn test_empty_value_does_not_alias_codeword_zero() {
        let mut table = CodewordTable::new();
        assert_eq!(table.lookup_or_allocate("mw0", 0, "").unwrap(), 1);
    }

    #[test]
    fn test_export_format() {
        let mut table = CodewordTable::new();
        table.lookup_or_allocate("mw0", 1, "x90").unwrap();
        let map = table.export();
        let value: serde_json::Value = serde_json::from_str(&map.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "note": format!("generated by CC backend version {CC_BACKEND_VERSION}"),
                "codeword_table": {"mw0": [[], ["", "x90"]]}
            })
        );
        assert!(map.to_json().unwrap().contains("\n    \"note\""));
    }

    #[test]
    fn test_frozen_lookup() {
        let map = CodewordMap::from_json(
            r#"{"note": "n", "codeword_table": {"mw0": [["", "x90", "y90"]]}}"#,
        )
        .unwrap();
        let mut table = CodewordTable::preloaded(map.clone());
        assert_eq!(table.mode(), CodewordMode::Frozen);
        assert_eq!(table.lookup_or_allocate("mw0", 0, "y90").unwrap(), 2);

        let err = table.lookup_or_allocate("mw0", 0, "x180").unwrap_err();
        assert!(matches!(
            &err,
            Error::CodewordMismatch { instrument, group: 0, value, .. }
                if instrument == "mw0" && value == "x180"
        ));
        assert!(matches!(
            table.lookup_or_allocate("mw0", 1, "x90"),
            Err(Error::CodewordMismatch { .. })
        ));
        assert!(matches!(
            table.lookup_or_allocate("flux0", 0, "x90"),
            Err(Error::CodewordMismatch { .. })
        ));
        // A frozen table is never altered.
        assert_eq!(table.export().codeword_table, map.codeword_table);
    }

    #[test]
    fn test_map_round_trip_keeps_instrument_order() {
        let mut table = CodewordTable::new();
        table.lookup_or_allocate("zz", 0, "a").unwrap();
        table.lookup_or_allocate("aa", 0, "b").unwrap();
        let json = table.export().to_json().unwrap();
        let reloaded = CodewordMap::from_json(&json).unwrap();
        let names: Vec<_> = reloaded.codeword_table.keys().cloned().collect();
        assert_eq!(names, vec!["zz", "aa"]);
    }

    proptest! {
        #[test]
        fn distinct_values_get_distinct_nonzero_codewords(
            values in proptest::collection::vec("[a-z]{1,4}", 1..40)
        ) {
            let mut table = CodewordTable::new();
            let mut seen: IndexMap<String, Codeword> = IndexMap::new();
            for value in &values {
                let codeword = table.lookup_or_allocate("mw0", 0, value).unwrap();
                prop_assert_ne!(codeword, 0);
                match seen.get(value) {
                    Some(previous) => prop_assert_eq!(*previous, codeword),
                    None => {
                        prop_assert!(!seen.values().any(|c| *c == codeword));
                        seen.insert(value.clone(), codeword);
                    }
                }
            }
        }
    }
}
