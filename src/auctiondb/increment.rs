use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use crate::battlenet::MarketSnapshot;
use crate::parse::{ItemLevelResolver, ItemString};
use crate::utils::stats;

use super::record::MarketValueRecord;

/// One scan's worth of per-item records: the increment a snapshot
/// contributes to an [AuctionDb](`super::AuctionDb`).
#[derive(Debug, Default)]
pub struct MarketValueIncrement {
    records: HashMap<ItemString, MarketValueRecord>,
}

/// Per-item accumulator while walking a snapshot's listings.
struct ItemAccum {
    total_quantity: u64,
    min_buyout: Option<u64>,
    /// Min-heap over (price, quantity), drained in ascending price
    /// order into the market value engine.
    prices: BinaryHeap<Reverse<(u64, u64)>>,
}

impl MarketValueIncrement {
    /// Aggregate a raw snapshot into one record per distinct item.
    ///
    /// Each listing is fingerprinted into its
    /// [ItemString](`crate::parse::ItemString`), quantities and minimum
    /// buyouts accumulate per item, and the collected price groups feed
    /// [stats::market_value](`crate::utils::stats::market_value`).
    /// Items whose market value comes back absent or zero contribute no
    /// record.
    pub fn from_snapshot<S: MarketSnapshot>(snapshot: &S, resolver: &ItemLevelResolver) -> Self {
        let mut temp: HashMap<ItemString, ItemAccum> = HashMap::new();

        for entry in snapshot.entries() {
            let item_string = ItemString::from_snapshot_item(&entry.item, resolver);
            let accum = temp.entry(item_string).or_insert_with(|| ItemAccum {
                total_quantity: 0,
                min_buyout: None,
                prices: BinaryHeap::new(),
            });

            accum.total_quantity += entry.quantity as u64;
            if let Some(buyout) = entry.buyout {
                accum.min_buyout = Some(match accum.min_buyout {
                    Some(current) => current.min(buyout),
                    None => buyout,
                });
            }
            accum.prices.push(Reverse((entry.price, entry.quantity as u64)));
        }

        let timestamp = snapshot.timestamp();
        let mut records = HashMap::new();

        for (item_string, accum) in temp {
            let ItemAccum {
                total_quantity,
                min_buyout,
                mut prices,
            } = accum;

            let groups = std::iter::from_fn(move || prices.pop().map(|Reverse(group)| group));
            let market_value = match stats::market_value(total_quantity, groups) {
                Some(v) if v != 0.0 => v,
                _ => continue,
            };

            records.insert(
                item_string,
                MarketValueRecord {
                    timestamp,
                    market_value: Some(market_value as u64),
                    num_auctions: total_quantity as u32,
                    // items listed without any buyout record a 0
                    min_buyout: Some(min_buyout.unwrap_or(0)),
                },
            );
        }

        MarketValueIncrement { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, item_string: &ItemString) -> Option<&MarketValueRecord> {
        self.records.get(item_string)
    }

    pub fn iter(&self) -> std::collections::hash_map::Iter<'_, ItemString, MarketValueRecord> {
        self.records.iter()
    }
}

impl IntoIterator for MarketValueIncrement {
    type Item = (ItemString, MarketValueRecord);
    type IntoIter = std::collections::hash_map::IntoIter<ItemString, MarketValueRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battlenet::auctions::{Auction, AuctionFile, AuctionsSnapshot, TimeLeft};
    use crate::battlenet::commodities::{
        CommoditiesSnapshot, CommodityAuction, CommodityFile, CommodityItem,
    };
    use crate::parse::ItemStringType;
    use crate::wow::data_tables::{Db2CurvePoints, Db2ItemBonuses};

    fn empty_resolver() -> ItemLevelResolver {
        ItemLevelResolver::new(
            Db2ItemBonuses::from_csv(
                "ID,Value[0],Value[1],Value[2],Value[3],ParentItemBonusListID,Type,OrderIndex",
            ),
            Db2CurvePoints::from_csv("ID,Pos[0],Pos[1],CurveID,OrderIndex"),
        )
    }

    fn commodity(id: u32, quantity: u32, unit_price: u64) -> CommodityAuction {
        CommodityAuction {
            id: 0,
            item: CommodityItem { id },
            quantity,
            unit_price,
        }
    }

    fn plain_auction(item_id: u32, quantity: u32, buyout: Option<u64>, bid: Option<u64>) -> Auction {
        Auction {
            id: 0,
            quantity,
            item: crate::battlenet::auctions::Item {
                id: item_id,
                context: None,
                bonus_lists: None,
                modifiers: None,
                pet_breed_id: None,
                pet_level: None,
                pet_quality_id: None,
                pet_species_id: None,
            },
            unit_price: None,
            buyout,
            bid,
            time_left: TimeLeft::Long,
        }
    }

    #[test]
    fn commodity_snapshot_builds_one_record_per_item() {
        let snapshot = CommoditiesSnapshot::new(
            5_000,
            CommodityFile {
                auctions: vec![
                    commodity(2589, 2, 100),
                    commodity(2589, 3, 110),
                    commodity(2589, 3, 120),
                    commodity(2589, 2, 10_000),
                    commodity(4306, 10, 50),
                ],
            },
        );

        let increment = MarketValueIncrement::from_snapshot(&snapshot, &empty_resolver());
        assert_eq!(2, increment.len());

        let cloth = ItemString::new(ItemStringType::Item, 2589, None, None).unwrap();
        let record = increment.get(&cloth).unwrap();
        assert_eq!(5_000, record.timestamp);
        // trimmed-mean of the cheapest 30%: 310 / 3, truncated
        assert_eq!(Some(103), record.market_value);
        assert_eq!(10, record.num_auctions);
        assert_eq!(Some(100), record.min_buyout);
    }

    #[test]
    fn bid_only_auctions_record_zero_min_buyout() {
        let snapshot = AuctionsSnapshot::new(
            5_000,
            AuctionFile {
                auctions: vec![plain_auction(100, 1, None, Some(750))],
            },
        );

        let increment = MarketValueIncrement::from_snapshot(&snapshot, &empty_resolver());
        let key = ItemString::new(ItemStringType::Item, 100, None, None).unwrap();
        let record = increment.get(&key).unwrap();
        assert_eq!(Some(750), record.market_value);
        assert_eq!(Some(0), record.min_buyout);
    }

    #[test]
    fn min_buyout_tracks_the_lowest_buyout() {
        let snapshot = AuctionsSnapshot::new(
            5_000,
            AuctionFile {
                auctions: vec![
                    plain_auction(100, 1, Some(900), None),
                    plain_auction(100, 1, Some(600), Some(100)),
                    plain_auction(100, 1, None, Some(50)),
                ],
            },
        );

        let increment = MarketValueIncrement::from_snapshot(&snapshot, &empty_resolver());
        let key = ItemString::new(ItemStringType::Item, 100, None, None).unwrap();
        assert_eq!(Some(600), increment.get(&key).unwrap().min_buyout);
    }

    #[test]
    fn zero_priced_items_contribute_no_record() {
        let snapshot = CommoditiesSnapshot::new(
            5_000,
            CommodityFile {
                auctions: vec![commodity(2589, 5, 0)],
            },
        );

        let increment = MarketValueIncrement::from_snapshot(&snapshot, &empty_resolver());
        assert!(increment.is_empty());
    }
}
