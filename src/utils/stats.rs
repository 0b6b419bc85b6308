//! The robust "market value" statistic computed from a grouped
//! price/quantity distribution.

/// Fraction of the total quantity that must always be sampled.
const SAMPLE_LO: f64 = 0.15;

/// Fraction of the total quantity past which sampling always stops.
const SAMPLE_HI: f64 = 0.30;

/// A price jump of 20% or more between adjacent groups ends the sample
/// early once the low watermark has been reached.
const MAX_JUMP_MUL: f64 = 1.2;

/// Sampled prices further than 1.5 standard deviations from the sample
/// mean are discarded before averaging.
const MAX_STD_MUL: f64 = 1.5;

/// Calculates the Market Value of an item from a snapshot of its
/// listings.
///
/// If you're familiar with Trade Skill Master, this is how "Market
/// Value" is calculated for a single scan: the average of the cheapest
/// 15%–30% of available units, cut off early at a 20% price jump, with
/// outliers beyond 1.5 standard deviations of the sample mean thrown
/// away. This filters out both the 1-copper troll listing and the
/// 10,000g "accident insurance" listing, leaving roughly what you would
/// actually pay for a normal quantity of the item.
///
/// # Example
///
/// Suppose 10 units are listed as `2 @ 100`, `3 @ 110`, `3 @ 120` and
/// `2 @ 10000`. The bottom 15% (1 unit) must be sampled and sampling
/// stops at 30% (3 units): the `100`s and one `110` are taken, nothing
/// is an outlier, and the market value is `310 / 3 ≈ 103.33`. The
/// `10000` listing never contaminates the result.
///
/// # Arguments
///
/// * `item_n` - total quantity of the item across all groups.
/// * `price_groups` - `(price, quantity)` groups in ascending price
///   order, one group per distinct price, e.g. a drained min-heap.
///
/// # Return Values
///
/// * `Some(f64)` - the market value of the sampled units.
/// * `None` - when `item_n` is 0, i.e. there is nothing to sample.
pub fn market_value<I>(item_n: u64, price_groups: I) -> Option<f64>
where
    I: IntoIterator<Item = (u64, u64)>,
{
    if item_n == 0 {
        return None;
    }

    let lo = (item_n as f64 * SAMPLE_LO) as u64;
    let hi = (item_n as f64 * SAMPLE_HI) as u64;

    let mut samples: Vec<(u64, u64)> = Vec::new();
    let mut samples_s: u64 = 0;
    let mut samples_n: u64 = 0;
    let mut last_sample: Option<(u64, u64)> = None;

    for (price, quantity) in price_groups {
        if let Some((last_price, _)) = last_sample {
            if samples_n >= lo
                && (samples_n >= hi || price as f64 >= MAX_JUMP_MUL * last_price as f64)
            {
                break;
            }
        }

        samples.push((price, quantity));
        samples_n += quantity;
        samples_s += price * quantity;

        if samples_n > hi {
            // trim the overshoot off the group just admitted
            let off_by = samples_n - hi;
            let last = samples.len() - 1;
            samples[last].1 -= off_by;
            samples_n -= off_by;
            samples_s -= samples[last].0 * off_by;

            if samples[last].1 == 0 {
                if last_sample.is_some() {
                    samples.pop();
                } else {
                    // the very first group must contribute at least one
                    // unit
                    samples[last].1 = 1;
                    samples_n += 1;
                    samples_s += samples[last].0;
                }
            }

            break;
        }

        last_sample = Some((price, quantity));
    }

    let mean = samples_s as f64 / samples_n as f64;

    let mut variance = 0.0;
    for &(price, quantity) in &samples {
        variance += (price as f64 - mean).powi(2) * quantity as f64;
    }
    // population variance when the sample covers every unit, else the
    // sample estimator
    let ddof = if samples_n == item_n { 0 } else { 1 };
    let std_dev = if samples_n > 1 {
        (variance / (samples_n - ddof) as f64).sqrt()
    } else {
        0.0
    };
    let max_dev = std_dev * MAX_STD_MUL;

    for &(price, quantity) in &samples {
        if (price as f64 - mean).abs() > max_dev {
            samples_s -= price * quantity;
            samples_n -= quantity;
        }
    }

    Some(samples_s as f64 / samples_n as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX_RELATIVE_DIFF: f64 = 0.000000001;

    #[test]
    fn market_value_zero_quantity() {
        assert!(market_value(0, vec![]).is_none());
    }

    #[test]
    fn market_value_single_group() {
        let res = market_value(5, vec![(5112, 5)]).unwrap();
        assert_relative_eq!(5112.0, res, max_relative = MAX_RELATIVE_DIFF);
    }

    #[test]
    fn market_value_single_unit() {
        let res = market_value(1, vec![(10_000, 1)]).unwrap();
        assert_relative_eq!(10_000.0, res, max_relative = MAX_RELATIVE_DIFF);
    }

    #[test]
    fn market_value_uniform_price_across_groups() {
        // distinct heap entries can share a price; the result must be
        // exactly that price
        let res = market_value(30, vec![(200, 10), (200, 10), (200, 10)]).unwrap();
        assert_relative_eq!(200.0, res, max_relative = MAX_RELATIVE_DIFF);
    }

    #[test]
    fn market_value_trims_sample_to_high_watermark() {
        // item_n = 10: lo = 1, hi = 3. Samples (100, 2) then (110, 3)
        // trimmed to (110, 1). Nothing is an outlier.
        let groups = vec![(100, 2), (110, 3), (120, 3), (10_000, 2)];
        let res = market_value(10, groups).unwrap();
        assert_relative_eq!(310.0 / 3.0, res, max_relative = MAX_RELATIVE_DIFF);
    }

    #[test]
    fn market_value_stops_at_price_jump() {
        // item_n = 20: lo = 3, hi = 6. After 4 units of 100 the next
        // group jumps 5x, which ends the sample at the low watermark.
        let groups = vec![(100, 4), (500, 16)];
        let res = market_value(20, groups).unwrap();
        assert_relative_eq!(100.0, res, max_relative = MAX_RELATIVE_DIFF);
    }

    #[test]
    fn market_value_result_within_sampled_price_bounds() {
        let groups = vec![(90, 3), (100, 3), (105, 3), (400, 21)];
        let res = market_value(30, groups).unwrap();
        assert!(res >= 90.0);
        assert!(res <= 400.0);
    }

    #[test]
    fn market_value_discards_outliers_beyond_std_dev() {
        // item_n = 40: lo = 6, hi = 12. Samples: (100, 10) and (110, 2).
        // mean ≈ 101.67, sample std ≈ 3.89, cut at ≈ 5.84: the 110s are
        // discarded and the result is exactly 100.
        let groups = vec![(100, 10), (110, 2), (115, 28)];
        let res = market_value(40, groups).unwrap();
        assert_relative_eq!(100.0, res, max_relative = MAX_RELATIVE_DIFF);
    }

    #[test]
    fn market_value_first_group_keeps_one_unit() {
        // item_n = 3: lo = 0, hi = 0. The very first group overshoots
        // immediately and is trimmed to a single unit.
        let res = market_value(3, vec![(250, 3)]).unwrap();
        assert_relative_eq!(250.0, res, max_relative = MAX_RELATIVE_DIFF);
    }
}
