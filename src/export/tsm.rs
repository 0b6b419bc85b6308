use std::collections::{HashMap, HashSet};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use log::{debug, info, warn};
use serde::Deserialize;

use crate::auctiondb::AuctionDb;
use crate::error::{Error, Result};

/// The TSM data format version this exporter emits.
pub const TSM_VERSION: u32 = 41200;

/// Digit set shared by every base the exporter emits; a base of `n`
/// uses the first `n` numerals.
const NUMERALS: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// One export data type and the ordered fields its rows carry.
pub struct ExportSpec {
    pub data_type: &'static str,
    pub fields: &'static [&'static str],
}

/// Latest realm scan data.
pub const REALM_AUCTIONS_EXPORT: ExportSpec = ExportSpec {
    data_type: "AUCTIONDB_REALM_DATA",
    fields: &["itemString", "minBuyout", "numAuctions", "marketValueRecent"],
};

/// Realm historical and two-week data, realm auctions plus commodities.
pub const REALM_AUCTIONS_COMMODITIES_EXPORTS: [ExportSpec; 2] = [
    ExportSpec {
        data_type: "AUCTIONDB_REALM_HISTORICAL",
        fields: &["itemString", "historical"],
    },
    ExportSpec {
        data_type: "AUCTIONDB_REALM_SCAN_STAT",
        fields: &["itemString", "marketValue"],
    },
];

/// Region commodity data.
pub const COMMODITIES_EXPORT: ExportSpec = ExportSpec {
    data_type: "AUCTIONDB_REGION_COMMODITY",
    fields: &["itemString", "minBuyout", "numAuctions", "marketValueRecent"],
};

/// Region two-week and historical data, auctions from all realms plus
/// commodities.
pub const REGION_AUCTIONS_COMMODITIES_EXPORTS: [ExportSpec; 2] = [
    ExportSpec {
        data_type: "AUCTIONDB_REGION_STAT",
        fields: &["itemString", "regionMarketValue"],
    },
    ExportSpec {
        data_type: "AUCTIONDB_REGION_HISTORICAL",
        fields: &["itemString", "regionHistorical"],
    },
];

/// Scan metadata consumed at export time: the update window and the
/// realm composition of each connected realm.
#[derive(Debug, Deserialize)]
pub struct Meta {
    pub update: MetaUpdate,
    pub connected_realms: HashMap<u32, Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct MetaUpdate {
    pub start_ts: i64,
    pub end_ts: i64,
}

impl Meta {
    pub fn from_json(s: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// Renders number `num` in base `base` using uppercase numerals, the
/// way the TSM add-on's data loader reads them. Zero renders as `"0"`.
pub fn base_n(num: u64, base: u64) -> String {
    if num == 0 {
        return "0".to_string();
    }

    let mut digits: Vec<char> = Vec::new();
    let mut num = num;
    while num > 0 {
        digits.push(NUMERALS[(num % base) as usize] as char);
        num /= base;
    }
    digits.iter().rev().collect()
}

/// Parses a number rendered by [`base_n`]. A character outside the
/// base's digit set is [`Error::InvalidValueType`].
pub fn parse_base_n(s: &str, base: u64) -> Result<u64> {
    if s.is_empty() {
        return Err(Error::InvalidValueType(s.to_string()));
    }

    let mut num: u64 = 0;
    for c in s.chars() {
        let digit = NUMERALS[..base as usize]
            .iter()
            .position(|&n| n as char == c)
            .ok_or_else(|| Error::InvalidValueType(s.to_string()))? as u64;
        num = num * base + digit;
    }
    Ok(num)
}

/// Writes auction databases into the `AppData.lua` file consumed by the
/// TSM AppHelper add-on, one `LoadData` row per export.
pub struct TsmExporter {
    export_path: PathBuf,
}

impl TsmExporter {
    pub fn new<P: Into<PathBuf>>(export_path: P) -> Self {
        TsmExporter {
            export_path: export_path.into(),
        }
    }

    /// Append one `LoadData` row for `db` rendered against `fields`.
    ///
    /// Per item, each field renders as base-32 (integers) or as the
    /// textual item string, quoted unless it is purely decimal. Items
    /// whose numeric fields are all zero are skipped entirely; the item
    /// string alone never keeps an item. Recent fields read against
    /// `ts_update_begin`, historical and weighted fields against
    /// `ts_update_end`.
    pub fn export_append_data(
        &self,
        db: &AuctionDb,
        fields: &[&str],
        data_type: &str,
        region_or_realm: &str,
        ts_update_begin: i64,
        ts_update_end: i64,
    ) -> Result<()> {
        info!("exporting {} for {}", data_type, region_or_realm);

        let mut items_data: Vec<String> = Vec::new();
        for (item_string, records) in db.iter() {
            let mut item_data: Vec<String> = Vec::with_capacity(fields.len());
            let mut is_skip_item = true;

            for &field in fields {
                let rendered = match field {
                    "minBuyout" => {
                        let value = records.get_recent_min_buyout(ts_update_begin);
                        if value != 0 {
                            is_skip_item = false;
                        }
                        base_n(value, 32)
                    }
                    "numAuctions" => {
                        let value = records.get_recent_num_auctions(ts_update_begin);
                        if value != 0 {
                            is_skip_item = false;
                        }
                        base_n(value as u64, 32)
                    }
                    "marketValueRecent" => {
                        let value = records.get_recent_market_value(ts_update_begin);
                        if value != 0 {
                            is_skip_item = false;
                        }
                        base_n(value, 32)
                    }
                    "historical" | "regionHistorical" => {
                        let value = records.get_historical_market_value(ts_update_end);
                        if value != 0 {
                            is_skip_item = false;
                        }
                        base_n(value, 32)
                    }
                    "marketValue" | "regionMarketValue" => {
                        let value = records.get_weighted_market_value(ts_update_end);
                        if value != 0 {
                            is_skip_item = false;
                        }
                        base_n(value, 32)
                    }
                    "itemString" => {
                        let value = item_string.to_str();
                        if value.chars().all(|c| c.is_ascii_digit()) {
                            value
                        } else {
                            format!("\"{}\"", value)
                        }
                    }
                    other => return Err(Error::InvalidFieldName(other.to_string())),
                };
                item_data.push(rendered);
            }

            if is_skip_item {
                debug!("skipping {}: no data", item_string);
                continue;
            }
            items_data.push(format!("{{{}}}", item_data.join(",")));
        }

        let fields_str = fields
            .iter()
            .map(|field| format!("\"{}\"", field))
            .collect::<Vec<_>>()
            .join(",");
        let row = format!(
            "select(2, ...).LoadData(\"{}\",\"{}\",[[return {{downloadTime={},fields={{{}}},data={{{}}}}}]])",
            data_type,
            region_or_realm,
            ts_update_begin,
            fields_str,
            items_data.join(",")
        );

        self.append_line(&row)
    }

    /// Append the `APP_INFO` row that stamps the export with a version
    /// and sync time.
    pub fn export_append_app_info(&self, version: u32, ts_last_sync: i64) -> Result<()> {
        let row = format!(
            "select(2, ...).LoadData(\"APP_INFO\",\"Global\",[[return {{version={},lastSync={},message={{id=0,msg=\"\"}},news={{}}}}]])",
            version, ts_last_sync
        );
        self.append_line(&row)
    }

    /// Export a whole region: the commodity data, every requested realm
    /// of every connected realm, the region-wide rollups, and the
    /// `APP_INFO` stamp.
    ///
    /// `auction_dbs` maps connected realm ids to their loaded databases.
    /// Absent metadata is [`Error::MissingMeta`]; requesting realms the
    /// metadata doesn't know is [`Error::InvalidRealmSet`].
    pub fn export_region(
        &self,
        meta: Option<&Meta>,
        region: &str,
        commodity_db: Option<&AuctionDb>,
        auction_dbs: &HashMap<u32, AuctionDb>,
        export_realms: &HashSet<String>,
    ) -> Result<()> {
        let meta = meta.ok_or(Error::MissingMeta)?;
        let ts_update_begin = meta.update.start_ts;
        let ts_update_end = meta.update.end_ts;

        let all_realms: HashSet<&String> = meta.connected_realms.values().flatten().collect();
        let mut unknown: Vec<String> = export_realms
            .iter()
            .filter(|realm| !all_realms.contains(realm))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            unknown.sort();
            return Err(Error::InvalidRealmSet(unknown));
        }

        let region_label = region.to_uppercase();
        let mut region_db = AuctionDb::new();

        if let Some(commodities) = commodity_db {
            region_db.extend(commodities.clone(), false);
            self.export_append_data(
                commodities,
                COMMODITIES_EXPORT.fields,
                COMMODITIES_EXPORT.data_type,
                &region_label,
                ts_update_begin,
                ts_update_end,
            )?;
        }

        for (crid, connected_realms) in &meta.connected_realms {
            let auction_db = match auction_dbs.get(crid) {
                Some(db) => db,
                None => {
                    warn!("no auction data for connected realm {}", crid);
                    continue;
                }
            };
            region_db.extend(auction_db.clone(), false);

            // realm names under one connected realm share auction data
            let sub_realms: Vec<&String> = export_realms
                .iter()
                .filter(|realm| connected_realms.contains(*realm))
                .collect();
            if sub_realms.is_empty() {
                continue;
            }

            let realm_db = match commodity_db {
                Some(commodities) => {
                    let mut db = commodities.clone();
                    db.extend(auction_db.clone(), false);
                    db
                }
                None => auction_db.clone(),
            };

            for realm in sub_realms {
                self.export_append_data(
                    auction_db,
                    REALM_AUCTIONS_EXPORT.fields,
                    REALM_AUCTIONS_EXPORT.data_type,
                    realm,
                    ts_update_begin,
                    ts_update_end,
                )?;
                for spec in REALM_AUCTIONS_COMMODITIES_EXPORTS.iter() {
                    self.export_append_data(
                        &realm_db,
                        spec.fields,
                        spec.data_type,
                        realm,
                        ts_update_begin,
                        ts_update_end,
                    )?;
                }
            }
        }

        if !region_db.is_empty() {
            for spec in REGION_AUCTIONS_COMMODITIES_EXPORTS.iter() {
                self.export_append_data(
                    &region_db,
                    spec.fields,
                    spec.data_type,
                    &region_label,
                    ts_update_begin,
                    ts_update_end,
                )?;
            }
        }

        self.export_append_app_info(TSM_VERSION, ts_update_end)
    }

    fn append_line(&self, line: &str) -> Result<()> {
        // the handle is scoped to this call and released on every exit
        // path
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.export_path)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auctiondb::MarketValueRecord;
    use crate::parse::{ItemString, ItemStringType};

    fn db_with_record(item_string: ItemString, record: MarketValueRecord) -> AuctionDb {
        let mut db = AuctionDb::new();
        db.add_market_value_record(item_string, record, false);
        db
    }

    fn item(id: u32) -> ItemString {
        ItemString::new(ItemStringType::Item, id, None, None).unwrap()
    }

    fn read(path: &std::path::Path) -> String {
        std::fs::read_to_string(path).unwrap()
    }

    #[test]
    fn base_n_renders_base_32() {
        assert_eq!("0", base_n(0, 32));
        assert_eq!("V", base_n(31, 32));
        assert_eq!("10", base_n(32, 32));
        assert_eq!("S4", base_n(900, 32));
    }

    #[test]
    fn base_n_round_trips() {
        for &n in &[0u64, 1, 31, 32, 1_000, 987_654_321, u64::from(u32::MAX)] {
            assert_eq!(n, parse_base_n(&base_n(n, 32), 32).unwrap());
        }
    }

    #[test]
    fn parse_base_n_rejects_foreign_digits() {
        assert!(matches!(
            parse_base_n("1Z", 32),
            Err(Error::InvalidValueType(_))
        ));
        assert!(parse_base_n("", 32).is_err());
    }

    #[test]
    fn export_renders_single_item_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("AppData.lua");

        let db = db_with_record(
            item(2589),
            MarketValueRecord {
                timestamp: 100,
                market_value: Some(1_000),
                num_auctions: 5,
                min_buyout: Some(900),
            },
        );

        let exporter = TsmExporter::new(&path);
        exporter
            .export_append_data(
                &db,
                REALM_AUCTIONS_EXPORT.fields,
                REALM_AUCTIONS_EXPORT.data_type,
                "Proudmoore",
                100,
                100,
            )
            .unwrap();

        let expected = concat!(
            "select(2, ...).LoadData(\"AUCTIONDB_REALM_DATA\",\"Proudmoore\",",
            "[[return {downloadTime=100,",
            "fields={\"itemString\",\"minBuyout\",\"numAuctions\",\"marketValueRecent\"},",
            "data={{2589,S4,5,V8}}}]])\n"
        );
        assert_eq!(expected, read(&path));
    }

    #[test]
    fn export_quotes_non_decimal_item_strings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("AppData.lua");

        let db = db_with_record(
            ItemString::new(ItemStringType::Pet, 7, None, None).unwrap(),
            MarketValueRecord {
                timestamp: 100,
                market_value: Some(32),
                num_auctions: 1,
                min_buyout: Some(32),
            },
        );

        let exporter = TsmExporter::new(&path);
        exporter
            .export_append_data(&db, &["itemString", "marketValueRecent"], "X", "Y", 100, 100)
            .unwrap();

        assert!(read(&path).contains("{\"p:7\",10}"));
    }

    #[test]
    fn export_skips_items_with_all_zero_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("AppData.lua");

        let db = db_with_record(
            item(2589),
            MarketValueRecord {
                timestamp: 100,
                market_value: Some(1_000),
                num_auctions: 5,
                min_buyout: Some(900),
            },
        );

        // everything is stale against a later update window; the item
        // string alone must not keep the item
        let exporter = TsmExporter::new(&path);
        exporter
            .export_append_data(
                &db,
                REALM_AUCTIONS_EXPORT.fields,
                REALM_AUCTIONS_EXPORT.data_type,
                "Proudmoore",
                101,
                100,
            )
            .unwrap();

        assert!(read(&path).contains("data={}"));
    }

    #[test]
    fn export_rejects_unknown_fields() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = TsmExporter::new(dir.path().join("AppData.lua"));

        let result = exporter.export_append_data(
            &AuctionDb::new(),
            &["itemString", "bogus"],
            "X",
            "Y",
            0,
            0,
        );
        assert!(matches!(result, Err(Error::InvalidFieldName(_))));
    }

    #[test]
    fn app_info_row_matches_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("AppData.lua");

        TsmExporter::new(&path)
            .export_append_app_info(TSM_VERSION, 12_345)
            .unwrap();

        let expected = concat!(
            "select(2, ...).LoadData(\"APP_INFO\",\"Global\",",
            "[[return {version=41200,lastSync=12345,message={id=0,msg=\"\"},news={}}]])\n"
        );
        assert_eq!(expected, read(&path));
    }

    #[test]
    fn export_region_requires_meta() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = TsmExporter::new(dir.path().join("AppData.lua"));

        let result = exporter.export_region(
            None,
            "us",
            None,
            &HashMap::new(),
            &HashSet::new(),
        );
        assert!(matches!(result, Err(Error::MissingMeta)));
    }

    #[test]
    fn export_region_rejects_unknown_realms() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = TsmExporter::new(dir.path().join("AppData.lua"));

        let meta = Meta::from_json(
            r#"{
                "update": { "start_ts": 100, "end_ts": 200 },
                "connected_realms": { "1": ["Proudmoore"] }
            }"#,
        )
        .unwrap();

        let realms: HashSet<String> = vec!["Proudmoore".to_string(), "Atlantis".to_string()]
            .into_iter()
            .collect();
        let result = exporter.export_region(Some(&meta), "us", None, &HashMap::new(), &realms);
        match result {
            Err(Error::InvalidRealmSet(unknown)) => {
                assert_eq!(vec!["Atlantis".to_string()], unknown)
            }
            other => panic!("expected InvalidRealmSet, got {:?}", other.err()),
        }
    }

    #[test]
    fn export_region_writes_every_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("AppData.lua");
        let exporter = TsmExporter::new(&path);

        let meta = Meta::from_json(
            r#"{
                "update": { "start_ts": 100, "end_ts": 200 },
                "connected_realms": { "1": ["Proudmoore", "Barthilas"] }
            }"#,
        )
        .unwrap();

        let record = MarketValueRecord {
            timestamp: 150,
            market_value: Some(1_000),
            num_auctions: 5,
            min_buyout: Some(900),
        };
        let commodity_db = db_with_record(item(2589), record);
        let mut auction_dbs = HashMap::new();
        auction_dbs.insert(1, db_with_record(item(854), record));

        let realms: HashSet<String> = vec!["Proudmoore".to_string()].into_iter().collect();
        exporter
            .export_region(Some(&meta), "us", Some(&commodity_db), &auction_dbs, &realms)
            .unwrap();

        let out = read(&path);
        assert_eq!(7, out.lines().count());
        assert!(out.contains("\"AUCTIONDB_REGION_COMMODITY\",\"US\""));
        assert!(out.contains("\"AUCTIONDB_REALM_DATA\",\"Proudmoore\""));
        assert!(out.contains("\"AUCTIONDB_REALM_HISTORICAL\",\"Proudmoore\""));
        assert!(out.contains("\"AUCTIONDB_REALM_SCAN_STAT\",\"Proudmoore\""));
        assert!(out.contains("\"AUCTIONDB_REGION_STAT\",\"US\""));
        assert!(out.contains("\"AUCTIONDB_REGION_HISTORICAL\",\"US\""));
        assert!(out.contains("\"APP_INFO\",\"Global\""));
        assert!(!out.contains("Barthilas"));
    }
}
