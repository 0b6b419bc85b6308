pub mod increment;
pub mod pb;
pub mod record;
pub mod store;

pub use increment::MarketValueIncrement;
pub use record::{MarketValueRecord, MarketValueRecords};
pub use store::AuctionDb;
