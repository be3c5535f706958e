use crate::models::sensor::{EntryKey, SensorRecord};
use crate::store::{SensorStore, StoreError};
use log::{debug, error, warn};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use std::time::Instant;

static ENTRY_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z]+)([0-9]+)$").expect("entry name pattern is valid"));

/// Splits an entry name like `Value12` into its property and index.
///
/// Returns `None` for names without a letter prefix and digit suffix, and for
/// indices too large for `u32`.
pub fn parse_entry_name(name: &str) -> Option<EntryKey> {
    let captures = ENTRY_NAME.captures(name)?;
    let index = captures[2].parse::<u32>().ok()?;
    Some(EntryKey {
        property: captures[1].to_string(),
        index,
    })
}

/// Reads every entry in `store` and groups them into records sorted by id.
///
/// Never fails: an unavailable namespace is logged and yields no records, and
/// an enumeration error ends the read with whatever was collected so far.
pub fn collect(store: &dyn SensorStore) -> Vec<SensorRecord> {
    let start = Instant::now();

    let mut cursor = match store.open() {
        Ok(cursor) => cursor,
        Err(e) => {
            error!("Store error: {}", e);
            return Vec::new();
        }
    };

    let mut records: BTreeMap<u32, SensorRecord> = BTreeMap::new();
    loop {
        let entry = match cursor.next_entry() {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e @ StoreError::Enumeration { .. }) => {
                warn!("Stopped reading {}: {}", store.namespace(), e);
                break;
            }
            Err(e) => {
                error!("Store error: {}", e);
                break;
            }
        };

        let Some(key) = parse_entry_name(&entry.name) else {
            continue;
        };

        records
            .entry(key.index)
            .or_insert_with(|| SensorRecord::new(key.index))
            .insert(key.property, entry.value);
    }

    debug!(
        "collect ({} sensors from {}) took: {} ms",
        records.len(),
        store.namespace(),
        start.elapsed().as_millis()
    );
    records.into_values().collect()
}
