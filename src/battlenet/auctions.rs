use serde::Deserialize;

use super::{MarketSnapshot, SnapshotEntry, SnapshotItem};

/// A raw Auctions resource which is returned by Blizzard's Auction House
/// API for a single Connected Realm, consisting of [`Auction`]s.
///
/// Documentation for this API can be found
/// [on Blizzard's site](https://develop.battle.net/documentation/world-of-warcraft/game-data-apis).
///
/// While the raw resource which is returned from the API contains some
/// other fields, the only important one for the purpose of this library
/// is `auctions`, so the others are discarded.
#[derive(Deserialize)]
pub struct AuctionFile {
    /// Vector containing all of the auctions currently on the Connected
    /// Realm's Auction House.
    pub auctions: Vec<Auction>,
}

impl AuctionFile {
    /// Deserialize an instance of [`AuctionFile`] from a JSON string.
    ///
    /// # Example
    ///
    /// ```rust
    /// use goldcap::auctions::AuctionFile;
    ///
    /// let json = "
    ///   {
    ///     \"auctions\": [
    ///       {
    ///         \"id\": 1234,
    ///         \"quantity\": 1,
    ///         \"item\": {
    ///           \"id\": 72092
    ///         },
    ///         \"buyout\": 164068,
    ///         \"time_left\": \"MEDIUM\"
    ///       }
    ///     ]
    ///   }";
    /// let auction_file = AuctionFile::from_json(json).unwrap();
    /// assert_eq!(1, auction_file.auctions.len());
    /// ```
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// A single Auction that is currently on the Auction House.
///
/// There are three price fields that can be part of the Auction:
/// `unit_price`, `buyout`, and `bid`. Of these 3 fields, only the
/// following combinations are possible:
///
/// 1. `unit_price` only
/// 2. `buyout` only
/// 3. `bid` only
/// 4. `bid` and `buyout` only
///
/// Otherwise, the fields not present will be `None`.
#[derive(Deserialize)]
pub struct Auction {
    /// Unique ID for the auction. This ID is unique _per connected realm_
    /// and not guaranteed to be unique across the entire region or world.
    pub id: u64,

    /// The quantity (stack size) of the auction.
    pub quantity: u32,

    /// The item which is being auctioned.
    pub item: Item,

    /// The Unit Price (per item) for the auction.
    pub unit_price: Option<u64>,

    /// The price to buy out the auction.
    pub buyout: Option<u64>,

    /// The current bid price for the auction.
    pub bid: Option<u64>,

    /// The current time left for the auction. See [`TimeLeft`].
    pub time_left: TimeLeft,
}

impl Auction {
    /// The price that feeds market value calculation: the buyout,
    /// falling back to the current bid for bid-only auctions.
    pub fn price(&self) -> Option<u64> {
        self.buyout.or(self.bid)
    }

    /// The buyout alone. Bid-only auctions never contribute to an
    /// item's min buyout.
    pub fn buyout(&self) -> Option<u64> {
        self.buyout
    }
}

/// An item which is up for auction on an [`Auction`].
#[derive(Deserialize)]
pub struct Item {
    /// The ID of the item. This is also the in-game ID for the item, and
    /// you can easily look this up on various resources (WowHead, etc).
    pub id: u32,

    /// Context is defined as the "creation context". Typically, this
    /// indicates where the item dropped (eg, LFR/Normal/Heroic/Mythic
    /// raid). Not needed for pricing identity.
    pub context: Option<u16>,

    /// List of bonuses present on the item.
    ///
    /// There are thousands of possible bonus IDs, representing item
    /// level changes, quality changes, affixes. Only the ones present in
    /// the ItemBonus table matter for pricing identity; the rest are
    /// filtered out when building an
    /// [ItemString](`crate::parse::ItemString`).
    pub bonus_lists: Option<Vec<i32>>,

    /// List of modifiers present on the item. A modifier type of `9`
    /// carries the player's level when the item dropped, which feeds
    /// item level curve evaluation.
    pub modifiers: Option<Vec<ItemModifier>>,

    /// If this item is a Pet or Pet Cage, this is the Pet's Breed ID.
    pub pet_breed_id: Option<u32>,

    /// If this item is a Pet or Pet Cage, this is the Pet's level (0-25).
    pub pet_level: Option<u8>,

    /// If this item is a Pet or Pet Cage, this is the Pet's Quality ID.
    pub pet_quality_id: Option<u16>,

    /// If this item is a Pet or Pet Cage, this is the Pet's Species ID.
    pub pet_species_id: Option<u32>,
}

/// An Auction Item Modifier.
///
/// Not much information is available from Blizzard about this field, and
/// there is no API to describe it.
///
/// # Known Modifiers
///
/// - `9` - The player's level when the item was looted.
#[derive(Deserialize)]
pub struct ItemModifier {
    /// The modifier type ID. Serialized from `type`.
    #[serde(alias = "type")]
    pub modifier_type: i32,

    /// The value of the modifier.
    pub value: i64,
}

/// The amount of time left on an [`Auction`].
#[derive(Deserialize)]
pub enum TimeLeft {
    /// Parses from `VERY_LONG` and means more than **12 hours** remaining.
    #[serde(rename = "VERY_LONG")]
    VeryLong,

    /// Parses from `LONG` and means between **2 hours** and **12 hours**
    /// remaining.
    #[serde(rename = "LONG")]
    Long,

    /// Parses from `MEDIUM` and means between **30 minutes** and
    /// **2 hours** remaining.
    #[serde(rename = "MEDIUM")]
    Medium,

    /// Parses from `SHORT` and means less than **30 minutes** remaining.
    #[serde(rename = "SHORT")]
    Short,
}

/// A parsed [`AuctionFile`] paired with the timestamp of the scan that
/// produced it.
pub struct AuctionsSnapshot {
    pub timestamp: i64,
    pub file: AuctionFile,
}

impl AuctionsSnapshot {
    pub fn new(timestamp: i64, file: AuctionFile) -> Self {
        AuctionsSnapshot { timestamp, file }
    }
}

impl MarketSnapshot for AuctionsSnapshot {
    fn timestamp(&self) -> i64 {
        self.timestamp
    }

    fn entries<'a>(&'a self) -> Box<dyn Iterator<Item = SnapshotEntry<'a>> + 'a> {
        Box::new(self.file.auctions.iter().filter_map(|auction| {
            let price = auction.price()?;
            Some(SnapshotEntry {
                item: SnapshotItem::Auction(&auction.item),
                quantity: auction.quantity,
                price,
                buyout: auction.buyout(),
            })
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: u32) -> Item {
        Item {
            id,
            context: None,
            bonus_lists: None,
            modifiers: None,
            pet_breed_id: None,
            pet_level: None,
            pet_quality_id: None,
            pet_species_id: None,
        }
    }

    fn auction(buyout: Option<u64>, bid: Option<u64>) -> Auction {
        Auction {
            id: 1,
            quantity: 1,
            item: item(100),
            unit_price: None,
            buyout,
            bid,
            time_left: TimeLeft::Long,
        }
    }

    #[test]
    fn price_prefers_buyout() {
        assert_eq!(Some(500), auction(Some(500), Some(300)).price());
    }

    #[test]
    fn price_falls_back_to_bid() {
        assert_eq!(Some(300), auction(None, Some(300)).price());
    }

    #[test]
    fn snapshot_skips_unpriced_auctions() {
        let file = AuctionFile {
            auctions: vec![auction(None, None), auction(Some(500), None)],
        };
        let snapshot = AuctionsSnapshot::new(1000, file);
        assert_eq!(1, snapshot.entries().count());
    }

    #[test]
    fn bid_only_auction_has_no_buyout() {
        let file = AuctionFile {
            auctions: vec![auction(None, Some(300))],
        };
        let snapshot = AuctionsSnapshot::new(1000, file);
        let entry = snapshot.entries().next().unwrap();
        assert_eq!(300, entry.price);
        assert!(entry.buyout.is_none());
    }
}
