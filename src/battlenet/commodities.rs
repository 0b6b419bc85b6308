use serde::Deserialize;

use super::{MarketSnapshot, SnapshotEntry, SnapshotItem};

/// A raw Commodities resource which is returned by Blizzard's Auction
/// House API for a whole region.
///
/// Commodities are fungible: every listing of the same item id is
/// interchangeable, so the item payload is just the id and every listing
/// carries a per-unit price.
#[derive(Deserialize)]
pub struct CommodityFile {
    /// Vector containing all of the commodity auctions currently listed
    /// in the region.
    pub auctions: Vec<CommodityAuction>,
}

impl CommodityFile {
    /// Deserialize an instance of [`CommodityFile`] from a JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// A single commodity auction.
#[derive(Deserialize)]
pub struct CommodityAuction {
    /// Unique ID for the auction within the region.
    pub id: u64,

    /// The item which is being auctioned.
    pub item: CommodityItem,

    /// The quantity (stack size) of the auction.
    pub quantity: u32,

    /// The per-unit price. Commodity auctions are buyout-only.
    pub unit_price: u64,
}

/// The item payload of a commodity auction.
#[derive(Deserialize)]
pub struct CommodityItem {
    /// The in-game ID of the item.
    pub id: u32,
}

/// A parsed [`CommodityFile`] paired with the timestamp of the scan that
/// produced it.
pub struct CommoditiesSnapshot {
    pub timestamp: i64,
    pub file: CommodityFile,
}

impl CommoditiesSnapshot {
    pub fn new(timestamp: i64, file: CommodityFile) -> Self {
        CommoditiesSnapshot { timestamp, file }
    }
}

impl MarketSnapshot for CommoditiesSnapshot {
    fn timestamp(&self) -> i64 {
        self.timestamp
    }

    fn entries<'a>(&'a self) -> Box<dyn Iterator<Item = SnapshotEntry<'a>> + 'a> {
        Box::new(self.file.auctions.iter().map(|auction| SnapshotEntry {
            item: SnapshotItem::Commodity(&auction.item),
            quantity: auction.quantity,
            price: auction.unit_price,
            buyout: Some(auction.unit_price),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_json_parses_listings() {
        let json = r#"
          {
            "auctions": [
              { "id": 9, "item": { "id": 2589 }, "quantity": 200, "unit_price": 1519 }
            ]
          }"#;
        let file = CommodityFile::from_json(json).unwrap();
        assert_eq!(2589, file.auctions[0].item.id);
        assert_eq!(1519, file.auctions[0].unit_price);
    }

    #[test]
    fn snapshot_price_and_buyout_are_unit_price() {
        let file = CommodityFile {
            auctions: vec![CommodityAuction {
                id: 9,
                item: CommodityItem { id: 2589 },
                quantity: 200,
                unit_price: 1519,
            }],
        };
        let snapshot = CommoditiesSnapshot::new(1000, file);
        let entry = snapshot.entries().next().unwrap();
        assert_eq!(1519, entry.price);
        assert_eq!(Some(1519), entry.buyout);
    }
}
