use std::cmp::Ordering;

use log::debug;

/// Seconds per day, the bucket width of all rolling aggregates.
pub const SECONDS_PER_DAY: i64 = 86_400;

/// Weights applied to the last 15 daily bucket averages when computing
/// the weighted market value, oldest day first. The most recent day
/// dominates.
pub const DAY_WEIGHTS: [u64; 15] = [
    4, 5, 7, 10, 15, 21, 28, 38, 33, 34, 45, 75, 100, 125, 132,
];

/// Window of the unweighted historical market value, in days.
pub const HISTORICAL_DAYS: usize = 60;

/// A single snapshot datum for one item: when it was scanned, what the
/// robust market value was, how many units were listed, and the lowest
/// buyout seen.
///
/// Records are ordered (and compared) by timestamp only; two snapshots
/// taken at the same second are the same point on the time axis no
/// matter what they recorded.
#[derive(Debug, Clone, Copy)]
pub struct MarketValueRecord {
    /// Unix timestamp (seconds) of the scan.
    pub timestamp: i64,

    /// Market value of the scan, if one could be computed.
    pub market_value: Option<u64>,

    /// Total units listed at scan time.
    pub num_auctions: u32,

    /// Lowest buyout across the item's listings, if any had a buyout.
    pub min_buyout: Option<u64>,
}

impl PartialEq for MarketValueRecord {
    fn eq(&self, other: &Self) -> bool {
        self.timestamp == other.timestamp
    }
}

impl Eq for MarketValueRecord {}

impl PartialOrd for MarketValueRecord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MarketValueRecord {
    fn cmp(&self, other: &Self) -> Ordering {
        self.timestamp.cmp(&other.timestamp)
    }
}

/// The time series recorded for one item, ascending by timestamp.
///
/// Callers appending in timestamp order can skip the per-add sort and
/// [sort](`Self::sort`) once at the end; every aggregate below assumes
/// the series is sorted.
#[derive(Debug, Clone, Default)]
pub struct MarketValueRecords {
    records: Vec<MarketValueRecord>,
}

impl MarketValueRecords {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record; restores ascending order afterwards when `sort`
    /// is set. Returns the number of records added, which is always 1.
    pub fn add(&mut self, record: MarketValueRecord, sort: bool) -> usize {
        self.records.push(record);
        if sort {
            self.sort();
        }
        1
    }

    /// Sort the series ascending by timestamp.
    pub fn sort(&mut self) {
        self.records.sort();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MarketValueRecord> {
        self.records.iter()
    }

    pub fn last(&self) -> Option<&MarketValueRecord> {
        self.records.last()
    }

    /// Remove the leading run of records with `timestamp <= ts_expires`.
    /// Returns the number removed.
    pub fn remove_expired(&mut self, ts_expires: i64) -> usize {
        let keep_from = self
            .records
            .iter()
            .position(|r| r.timestamp > ts_expires)
            .unwrap_or(self.records.len());
        self.records.drain(..keep_from);
        keep_from
    }

    /// The latest scan's listed-unit count, provided the scan is no
    /// older than `ts_last_update_begin` and counted anything; 0
    /// otherwise.
    pub fn get_recent_num_auctions(&self, ts_last_update_begin: i64) -> u32 {
        match self.records.last() {
            Some(r) if r.timestamp >= ts_last_update_begin && r.num_auctions != 0 => {
                r.num_auctions
            }
            _ => 0,
        }
    }

    /// The latest scan's min buyout under the same recency rule; 0 when
    /// stale or absent.
    pub fn get_recent_min_buyout(&self, ts_last_update_begin: i64) -> u64 {
        match self.records.last() {
            Some(r) if r.timestamp >= ts_last_update_begin => match r.min_buyout {
                Some(v) if v != 0 => v,
                _ => 0,
            },
            _ => 0,
        }
    }

    /// The latest scan's market value under the same recency rule; 0
    /// when stale or absent.
    pub fn get_recent_market_value(&self, ts_last_update_begin: i64) -> u64 {
        match self.records.last() {
            Some(r) if r.timestamp >= ts_last_update_begin => match r.market_value {
                Some(v) if v != 0 => v,
                _ => 0,
            },
            _ => 0,
        }
    }

    /// Bucket the series into `n_days_before` day-wide averages ending
    /// at `ts_now`, in chronological order (index 0 is the oldest day).
    /// Days without records are `None`; records from the future are
    /// discarded.
    fn average_by_day(&self, ts_now: i64, n_days_before: usize) -> Vec<Option<f64>> {
        let mut buckets: Vec<Vec<u64>> = vec![Vec::new(); n_days_before];

        for record in self.records.iter().rev() {
            let market_value = match record.market_value {
                Some(v) => v,
                None => continue,
            };
            let day = (ts_now - record.timestamp).div_euclid(SECONDS_PER_DAY);
            if day < 0 {
                continue;
            }
            if (day as usize) < n_days_before {
                buckets[day as usize].push(market_value);
            } else {
                // walking newest to oldest, everything from here on is
                // outside the window
                break;
            }
        }

        let mut days_average = vec![None; n_days_before];
        for (day, market_values) in buckets.into_iter().enumerate() {
            if !market_values.is_empty() {
                let avg =
                    market_values.iter().sum::<u64>() as f64 / market_values.len() as f64;
                days_average[n_days_before - day - 1] = Some(avg);
            }
        }

        days_average
    }

    /// Unweighted average of the daily bucket averages over the last
    /// [`HISTORICAL_DAYS`], rounded half-up. 0 when the series is empty
    /// or entirely outside the window.
    pub fn get_historical_market_value(&self, ts_now: i64) -> u64 {
        if self.records.is_empty() {
            debug!("no records, historical market value is 0");
            return 0;
        }

        let days_average = self.average_by_day(ts_now, HISTORICAL_DAYS);
        let mut sum = 0.0;
        let mut n_days = 0u64;
        for avg in days_average.into_iter().flatten() {
            sum += avg;
            n_days += 1;
        }

        if n_days == 0 {
            debug!("all records outside window, historical market value is 0");
            return 0;
        }

        (sum / n_days as f64 + 0.5) as u64
    }

    /// Weighted average of the daily bucket averages over the last 15
    /// days, weighted by [`DAY_WEIGHTS`] and rounded half-up. 0 when
    /// the series is empty or entirely outside the window.
    pub fn get_weighted_market_value(&self, ts_now: i64) -> u64 {
        if self.records.is_empty() {
            debug!("no records, weighted market value is 0");
            return 0;
        }

        let days_average = self.average_by_day(ts_now, DAY_WEIGHTS.len());
        let mut sum = 0.0;
        let mut sum_weights = 0u64;
        for (avg, &weight) in days_average.into_iter().zip(DAY_WEIGHTS.iter()) {
            if let Some(avg) = avg {
                sum += avg * weight as f64;
                sum_weights += weight;
            }
        }

        if sum_weights == 0 {
            debug!("all records outside window, weighted market value is 0");
            return 0;
        }

        (sum / sum_weights as f64 + 0.5) as u64
    }
}

impl IntoIterator for MarketValueRecords {
    type Item = MarketValueRecord;
    type IntoIter = std::vec::IntoIter<MarketValueRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}
