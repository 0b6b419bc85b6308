pub mod curve_points;
pub mod item_bonus;

pub use curve_points::{Db2CurvePoint, Db2CurvePoints};
pub use item_bonus::{Db2ItemBonus, Db2ItemBonuses, ItemBonusInfo};
