pub mod auctions;
pub mod commodities;

pub use auctions::{Auction, AuctionFile, AuctionsSnapshot};
pub use commodities::{CommodityAuction, CommodityFile, CommoditiesSnapshot};

/// The item carried by one snapshot entry. Realm auctions carry the full
/// item payload (bonuses, modifiers, pet data); region commodities are
/// fungible and carry only the item id.
pub enum SnapshotItem<'a> {
    Auction(&'a auctions::Item),
    Commodity(&'a commodities::CommodityItem),
}

/// One priced listing inside a snapshot, reduced to the fields the
/// aggregation pipeline consumes.
pub struct SnapshotEntry<'a> {
    pub item: SnapshotItem<'a>,

    /// Stack size of the listing.
    pub quantity: u32,

    /// The price used for market value calculation. For realm auctions
    /// this is the buyout falling back to the bid; for commodities the
    /// unit price.
    pub price: u64,

    /// The buyout alone, used for min-buyout tracking. Bid-only realm
    /// auctions have no buyout.
    pub buyout: Option<u64>,
}

/// Capability set shared by realm auction and region commodity snapshots:
/// a scan timestamp plus an iterator of priced entries.
pub trait MarketSnapshot {
    /// Unix timestamp (seconds) at which the snapshot was taken.
    fn timestamp(&self) -> i64;

    /// All priced listings in the snapshot. Listings with neither a
    /// buyout nor a bid are not yielded.
    fn entries<'a>(&'a self) -> Box<dyn Iterator<Item = SnapshotEntry<'a>> + 'a>;
}
