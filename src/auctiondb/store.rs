use std::collections::HashMap;
use std::path::Path;

use log::info;
use prost::Message;

use crate::error::Result;
use crate::parse::{ItemString, ItemStringType};

use super::increment::MarketValueIncrement;
use super::pb;
use super::record::{MarketValueRecord, MarketValueRecords};

/// The long-lived auction database: a map from item fingerprint to its
/// time series, with inverted id indexes for numeric lookups.
///
/// The indexes are built lazily on the first [query](`Self::query`) and
/// torn down by any mutation that can add or remove keys.
#[derive(Debug, Default, Clone)]
pub struct AuctionDb {
    records: HashMap<ItemString, MarketValueRecords>,
    item_id_index: HashMap<u32, Vec<ItemString>>,
    pet_id_index: HashMap<u32, Vec<ItemString>>,
    indexed: bool,
}

impl AuctionDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of items tracked.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, item_string: &ItemString) -> Option<&MarketValueRecords> {
        self.records.get(item_string)
    }

    pub fn iter(
        &self,
    ) -> std::collections::hash_map::Iter<'_, ItemString, MarketValueRecords> {
        self.records.iter()
    }

    /// Append one record to one item's series. Returns
    /// `(records_added, entries_created)`; an entry counts as created
    /// when its series was previously absent or empty.
    ///
    /// When appending records in ascending timestamp order, pass
    /// `sort = false` and [sort](`Self::sort`) once at the end.
    pub fn add_market_value_record(
        &mut self,
        item_string: ItemString,
        record: MarketValueRecord,
        sort: bool,
    ) -> (usize, usize) {
        let mut entries_created = 0;
        let series = self.records.entry(item_string).or_default();
        if series.is_empty() {
            entries_created = 1;
        }
        let records_added = series.add(record, sort);
        if entries_created > 0 {
            self.invalidate_indexes();
        }
        (records_added, entries_created)
    }

    /// Merge another database into this one. Each of `other`'s series is
    /// appended record by record; with `sort` set, every touched series
    /// is re-sorted once at the end. Returns
    /// `(records_added, entries_created)`.
    pub fn extend(&mut self, other: AuctionDb, sort: bool) -> (usize, usize) {
        let mut records_added = 0;
        let mut entries_created = 0;

        for (item_string, records) in other.records {
            if records.is_empty() {
                continue;
            }
            let series = self.records.entry(item_string).or_default();
            if series.is_empty() {
                entries_created += 1;
            }
            for record in records {
                records_added += series.add(record, false);
            }
            if sort {
                series.sort();
            }
        }

        if entries_created > 0 {
            self.invalidate_indexes();
        }
        (records_added, entries_created)
    }

    /// Fold one scan's increment into the database. Returns
    /// `(records_added, entries_created)`.
    pub fn update_increment(
        &mut self,
        increment: MarketValueIncrement,
        sort: bool,
    ) -> (usize, usize) {
        let mut records_added = 0;
        let mut entries_created = 0;

        for (item_string, record) in increment {
            let (r, e) = self.add_market_value_record(item_string, record, sort);
            records_added += r;
            entries_created += e;
        }

        (records_added, entries_created)
    }

    /// Sort every series ascending by timestamp.
    pub fn sort(&mut self) {
        for records in self.records.values_mut() {
            records.sort();
        }
    }

    /// Drop every record with `timestamp <= ts_expires` across all
    /// series. Returns the total number of records removed.
    pub fn remove_expired(&mut self, ts_expires: i64) -> usize {
        self.records
            .values_mut()
            .map(|records| records.remove_expired(ts_expires))
            .sum()
    }

    /// Drop items whose series has become empty. Returns the number of
    /// entries removed.
    pub fn remove_empty_entries(&mut self) -> usize {
        let before = self.records.len();
        self.records.retain(|_, records| !records.is_empty());
        let removed = before - self.records.len();
        if removed > 0 {
            self.invalidate_indexes();
        }
        removed
    }

    /// Look up every entry whose item id or pet species id equals `id`,
    /// returning deep copies unaffected by later mutation of this
    /// database.
    pub fn query(&mut self, id: u32) -> AuctionDb {
        self.build_indexes();

        let mut result = AuctionDb::new();
        let matches = self
            .item_id_index
            .get(&id)
            .into_iter()
            .chain(self.pet_id_index.get(&id))
            .flatten();
        for item_string in matches {
            if let Some(records) = self.records.get(item_string) {
                result
                    .records
                    .insert(item_string.clone(), records.clone());
            }
        }

        result
    }

    fn build_indexes(&mut self) {
        if self.indexed {
            return;
        }
        for item_string in self.records.keys() {
            let index = match item_string.item_type() {
                ItemStringType::Item => &mut self.item_id_index,
                ItemStringType::Pet => &mut self.pet_id_index,
            };
            index
                .entry(item_string.id())
                .or_insert_with(Vec::new)
                .push(item_string.clone());
        }
        self.indexed = true;
    }

    fn invalidate_indexes(&mut self) {
        if self.indexed {
            self.item_id_index.clear();
            self.pet_id_index.clear();
            self.indexed = false;
        }
    }

    /// Encode to the binary `ItemDB` form. Items with empty series are
    /// skipped.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut item_db = pb::ItemDb { items: Vec::new() };

        for (item_string, records) in &self.records {
            if records.is_empty() {
                continue;
            }
            item_db.items.push(pb::Item {
                item_string: Some(item_string.to_pb()),
                market_value_records: records
                    .iter()
                    .map(|record| pb::MarketValueRecord {
                        timestamp: record.timestamp,
                        market_value: record.market_value.unwrap_or(0),
                        num_auctions: record.num_auctions,
                        min_buyout: record.min_buyout.unwrap_or(0),
                    })
                    .collect(),
            });
        }

        item_db.encode_to_vec()
    }

    /// Decode from the binary `ItemDB` form.
    pub fn from_bytes(data: &[u8]) -> Result<AuctionDb> {
        let item_db = pb::ItemDb::decode(data)?;
        let mut db = AuctionDb::new();

        for item in item_db.items {
            let item_string = match &item.item_string {
                Some(proto) => ItemString::from_pb(proto)?,
                None => {
                    return Err(crate::error::Error::InvalidItemString(
                        "missing item string".to_string(),
                    ))
                }
            };

            let mut records = MarketValueRecords::new();
            for record in item.market_value_records {
                records.add(
                    MarketValueRecord {
                        timestamp: record.timestamp,
                        market_value: Some(record.market_value),
                        num_auctions: record.num_auctions,
                        min_buyout: Some(record.min_buyout),
                    },
                    false,
                );
            }
            db.records.insert(item_string, records);
        }

        Ok(db)
    }

    /// Load a database from a file written by [to_file](`Self::to_file`).
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<AuctionDb> {
        let data = std::fs::read(&path)?;
        let db = Self::from_bytes(&data)?;
        info!("{} loaded, {} items", path.as_ref().display(), db.len());
        Ok(db)
    }

    /// Persist the database.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(&path, self.to_bytes())?;
        info!("{} saved, {} items", path.as_ref().display(), self.len());
        Ok(())
    }
}
