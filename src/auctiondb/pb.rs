//! Wire messages for the persisted item database.
//!
//! These are hand-derived `prost` messages matching the external
//! `ItemDB` schema; the field numbers are load-bearing and must not
//! change, or existing databases stop decoding.

/// The whole persisted database: one entry per item with at least one
/// record.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ItemDb {
    #[prost(message, repeated, tag = "1")]
    pub items: ::prost::alloc::vec::Vec<Item>,
}

/// One item entry: its identity plus its time series.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Item {
    #[prost(message, optional, tag = "1")]
    pub item_string: ::core::option::Option<ItemString>,
    #[prost(message, repeated, tag = "2")]
    pub market_value_records: ::prost::alloc::vec::Vec<MarketValueRecord>,
}

/// Wire form of [ItemString](`crate::parse::ItemString`). Absent bonus
/// and mod lists are carried as empty repeated fields.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ItemString {
    #[prost(enumeration = "ItemStringType", tag = "1")]
    pub r#type: i32,
    #[prost(uint32, tag = "2")]
    pub id: u32,
    #[prost(int32, repeated, tag = "3")]
    pub bonus: ::prost::alloc::vec::Vec<i32>,
    #[prost(int32, repeated, tag = "4")]
    pub mods: ::prost::alloc::vec::Vec<i32>,
}

/// Wire form of one snapshot record.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MarketValueRecord {
    #[prost(int64, tag = "1")]
    pub timestamp: i64,
    #[prost(uint64, tag = "2")]
    pub market_value: u64,
    #[prost(uint32, tag = "3")]
    pub num_auctions: u32,
    #[prost(uint64, tag = "4")]
    pub min_buyout: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ItemStringType {
    Item = 0,
    Pet = 1,
}
