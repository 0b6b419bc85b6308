use std::cell::RefCell;
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::wow::data_tables::{Db2CurvePoints, Db2ItemBonuses};

/// Cap on the curve evaluation memo. One entry per distinct
/// `(bonus_id, player_level)` pair seen.
const CURVE_CACHE_CAP: usize = 512 * 1024;

/// Default player level assumed when an item carries no drop-level
/// modifier.
const DEFAULT_PLAYER_LEVEL: i32 = 1;

/// Item Level Curve, which corresponds to one curve id in the
/// `CurvePoint` DB2 table in World of Warcraft. It determines the
/// effective item level of an item based on the level the player was
/// when they looted it, by applying
/// <a href="https://en.wikipedia.org/wiki/Linear_interpolation" target="_blank">linear interpolation</a>.
///
/// An Item Level Curve consists of a vector of `(x, y)` data points
/// where `x` is player level and `y` is the effective item level of the
/// item. The player's level when the item dropped is found in the
/// [modifiers](`crate::battlenet::auctions::Item::modifiers`) field for
/// the modifier with a type of `9`.
///
/// # Formula
///
/// ```text
/// y = y₀ + (x - x₀) * ((y₁ - y₀) / (x₁ - x₀))
/// ```
///
/// rounded half-up to an integer, where `(x₀, y₀)` and `(x₁, y₁)` are
/// the two curve points bracketing the requested player level. The
/// requested level is clamped to the curve's domain first, and an exact
/// point match short-circuits the interpolation.
///
/// # Example
///
/// ```rust
/// use goldcap::parse::ItemLevelCurve;
///
/// let curve = ItemLevelCurve::from_points(&[(1, 10), (60, 100)]);
/// assert_eq!(54, curve.calc_ilvl(30).unwrap());
/// assert_eq!(10, curve.calc_ilvl(1).unwrap());
/// // requested levels outside the domain clamp to the edge points
/// assert_eq!(100, curve.calc_ilvl(70).unwrap());
/// ```
pub struct ItemLevelCurve {
    /// The curve points (`(x, y)` coordinates) associated with this
    /// curve, sorted ascending by player level.
    points: Vec<CurvePoint>,
}

/// An individual curve point: `x` is player level, `y` is the effective
/// level of the item.
struct CurvePoint {
    player_level: i32,
    item_level: i32,
}

impl ItemLevelCurve {
    /// Create a new Item Level Curve from an array of `(x, y)`
    /// coordinates. The values are cloned into the resulting struct and
    /// do not need to be previously sorted.
    pub fn from_points(points: &[(i32, i32)]) -> ItemLevelCurve {
        let mut curve = ItemLevelCurve {
            points: points
                .iter()
                .map(|&(x, y)| CurvePoint {
                    player_level: x,
                    item_level: y,
                })
                .collect(),
        };
        curve.points.sort_by_key(|p| p.player_level);
        curve
    }

    /// Using the curve points, calculates the effective item level based
    /// on the player's level when the item was looted.
    ///
    /// Returns [`Error::InvalidCurve`] when the curve has no points, or
    /// when the clamped level cannot be bracketed by two points.
    pub fn calc_ilvl(&self, player_level: i32) -> Result<i32> {
        let first = self.points.first().ok_or(Error::InvalidCurve)?;
        let last = self.points.last().ok_or(Error::InvalidCurve)?;

        let plvl = player_level
            .max(first.player_level)
            .min(last.player_level);

        let mut prev: Option<&CurvePoint> = None;
        let mut next: Option<&CurvePoint> = None;
        for point in &self.points {
            if point.player_level == plvl {
                return Ok(point.item_level);
            }
            if point.player_level > plvl {
                next = Some(point);
                break;
            }
            prev = Some(point);
        }

        let (p0, p1) = match (prev, next) {
            (Some(p0), Some(p1)) => (p0, p1),
            _ => return Err(Error::InvalidCurve),
        };

        // interpolate: y = y0 + (x - x0) * ( (y1 - y0) / (x1 - x0) )
        let ilvl = p0.item_level as f64
            + (plvl - p0.player_level) as f64 * (p1.item_level - p0.item_level) as f64
                / (p1.player_level - p0.player_level) as f64;

        Ok((ilvl + 0.5).floor() as i32)
    }
}

/// The outcome of resolving an item's bonus list into a derived item
/// level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedItemLevel {
    /// The derived level. For `relative` results this is a delta against
    /// a base level the resolver doesn't know; otherwise it's absolute.
    pub ilvl: i32,
    pub relative: bool,
}

/// Resolves the bonus ids on an auction item into a derived item level,
/// consulting the static ItemBonus and CurvePoint tables.
///
/// Resolution folds over the item's bonus ids:
///
/// * flat `level` deltas accumulate;
/// * the first `base_level` seen wins;
/// * among curve bonuses, the one with the numerically larger curve id
///   wins, and a curve — when present — overrides both the base and the
///   accumulated deltas.
///
/// Curve evaluations are memoized per `(bonus_id, player_level)`; the
/// memo is bounded and the tables are immutable, so the cache can only
/// ever hold values the tables would recompute.
pub struct ItemLevelResolver {
    bonuses: Db2ItemBonuses,
    curves: Db2CurvePoints,
    cache: RefCell<HashMap<(i32, i32), i32>>,
}

impl ItemLevelResolver {
    pub fn new(bonuses: Db2ItemBonuses, curves: Db2CurvePoints) -> Self {
        ItemLevelResolver {
            bonuses,
            curves,
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Whether a bonus id has any level-relevant effect. Bonus ids
    /// failing this test are dropped from pricing identity entirely.
    pub fn contains_bonus(&self, bonus_id: i32) -> bool {
        self.bonuses.contains(bonus_id)
    }

    /// Resolve a derived item level from an item's (pre-filtered) bonus
    /// ids and the player level carried by its drop-level modifier.
    ///
    /// Returns `Ok(None)` when the bonuses carry no level information at
    /// all, and when the resolved level would be negative.
    pub fn resolve(
        &self,
        bonuses: &[i32],
        player_level: Option<i32>,
    ) -> Result<Option<DerivedItemLevel>> {
        if bonuses.is_empty() {
            return Ok(None);
        }

        let plvl = player_level.unwrap_or(DEFAULT_PLAYER_LEVEL);

        let mut ilvl_rel: Option<i32> = None;
        let mut ilvl_base: Option<i32> = None;
        let mut curve_bonus: Option<i32> = None;

        for &bid in bonuses {
            let info = match self.bonuses.get(bid) {
                Some(info) => info,
                None => continue,
            };

            if let Some(delta) = info.level {
                ilvl_rel = Some(ilvl_rel.unwrap_or(0) + delta);
            } else if let Some(base) = info.base_level {
                if ilvl_base.is_none() {
                    ilvl_base = Some(base);
                }
            } else if info.curve_id.is_some() {
                curve_bonus = match curve_bonus {
                    // keep the curve with the larger curve id
                    Some(prev) if self.curve_id(prev) > self.curve_id(bid) => Some(prev),
                    Some(_) => Some(bid),
                    None => Some(bid),
                };
            }
        }

        if ilvl_rel.unwrap_or(0) == 0 && ilvl_base.unwrap_or(0) == 0 && curve_bonus.is_none() {
            // no level information at all
            return Ok(None);
        }

        match curve_bonus {
            None => match ilvl_base {
                None => Ok(Some(DerivedItemLevel {
                    ilvl: ilvl_rel.unwrap_or(0),
                    relative: true,
                })),
                Some(base) => {
                    let ilvl = base + ilvl_rel.unwrap_or(0);
                    if ilvl < 0 {
                        Ok(None)
                    } else {
                        Ok(Some(DerivedItemLevel {
                            ilvl,
                            relative: false,
                        }))
                    }
                }
            },
            // a curve overrides both the base and the accumulated deltas
            Some(bid) => {
                let ilvl = self.curve_ilvl(bid, plvl)?;
                if ilvl < 0 {
                    Ok(None)
                } else {
                    Ok(Some(DerivedItemLevel {
                        ilvl,
                        relative: false,
                    }))
                }
            }
        }
    }

    fn curve_id(&self, bonus_id: i32) -> u32 {
        self.bonuses
            .get(bonus_id)
            .and_then(|info| info.curve_id)
            .unwrap_or(0)
    }

    /// Evaluate the curve attached to `bonus_id` at `player_level`,
    /// memoized.
    fn curve_ilvl(&self, bonus_id: i32, player_level: i32) -> Result<i32> {
        if let Some(&ilvl) = self.cache.borrow().get(&(bonus_id, player_level)) {
            return Ok(ilvl);
        }

        let curve_id = self
            .bonuses
            .get(bonus_id)
            .and_then(|info| info.curve_id)
            .ok_or(Error::InvalidCurve)?;
        let points = self.curves.points(curve_id).ok_or(Error::InvalidCurve)?;

        let ilvl = ItemLevelCurve::from_points(points).calc_ilvl(player_level)?;

        let mut cache = self.cache.borrow_mut();
        if cache.len() < CURVE_CACHE_CAP {
            cache.insert((bonus_id, player_level), ilvl);
        }

        Ok(ilvl)
    }
}
