pub mod auctiondb;
pub mod battlenet;
pub mod error;
pub mod export;
pub mod parse;
pub mod utils;
pub mod wow;

pub use battlenet::auctions;
pub use error::Error;
pub use utils::stats;

#[cfg(test)]
#[macro_use]
extern crate approx;
