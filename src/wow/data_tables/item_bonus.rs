use serde::Deserialize;
use std::collections::HashMap;

/// Container struct for all of the [`Db2ItemBonus`] rows, merged into one
/// [`ItemBonusInfo`] per bonus list id.
pub struct Db2ItemBonuses {
    bonuses: HashMap<i32, ItemBonusInfo>,
}

/// The item-level-relevant effects of a single bonus list id, merged
/// across all of its rows in the ItemBonus table.
///
/// A bonus list id on an auction item can carry any combination of:
///
/// * a flat item level delta (`level`),
/// * a base item level override (`base_level`),
/// * a scaling curve (`curve_id`) which maps the player's level when the
///   item dropped to the item's effective level.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ItemBonusInfo {
    /// Flat item level adjustment. Can be negative.
    pub level: Option<i32>,

    /// Base item level override.
    pub base_level: Option<i32>,

    /// Curve ID to be looked up in the
    /// [Db2CurvePoints](`super::Db2CurvePoints`) table.
    pub curve_id: Option<u32>,
}

/// A struct representation of a single row in the ItemBonus DB2 table of
/// World of Warcraft game files.
#[derive(Debug, Deserialize)]
pub struct Db2ItemBonus {
    /// The ID of the Item Bonus row.
    #[serde(rename = "ID")]
    pub id: u32,

    /// The first value associated with the item bonus. For level
    /// adjustments (type `1`) this is the delta; for base level
    /// overrides (type `14`) this is the base item level.
    #[serde(rename = "Value[0]")]
    pub value0: i32,

    /// The second value associated with the item bonus. Not used here.
    #[serde(rename = "Value[1]")]
    pub value1: i32,

    /// The third value associated with the item bonus. Not used here.
    #[serde(rename = "Value[2]")]
    pub value2: i32,

    /// The fourth value associated with the item bonus. For scaling
    /// distributions (types `11` and `13`) this is the Curve ID.
    #[serde(rename = "Value[3]")]
    pub value3: i32,

    /// The Parent Bonus List ID for the Bonus. This is the number that
    /// appears in an auction item's `bonus_lists` field.
    #[serde(rename = "ParentItemBonusListID")]
    pub parent_item_bonus_list_id: i32,

    /// The type of the bonus.
    ///
    /// * `1` - A flat item level adjustment in `value0`.
    /// * `11` - A scaling distribution; the Curve ID is in `value3`.
    /// * `13` - A fixed scaling distribution; the Curve ID is in `value3`.
    /// * `14` - A base item level override in `value0`.
    #[serde(rename = "Type")]
    pub type_id: u16,

    /// The order index within the table between "like" rows. Unused here.
    #[serde(rename = "OrderIndex")]
    pub order_index: u16,
}

impl Db2ItemBonuses {
    /// Deserializes a CSV string which represents the DB2 ItemBonus table
    /// in World of Warcraft.
    ///
    /// Rows that fail to deserialize, and rows whose type is not one of
    /// the level-relevant types, are skipped.
    pub fn from_csv(csv: &str) -> Db2ItemBonuses {
        let mut reader = csv::Reader::from_reader(csv.as_bytes());
        let iter = reader.deserialize::<Db2ItemBonus>();

        let mut bonuses: HashMap<i32, ItemBonusInfo> = HashMap::new();

        for bonus in iter {
            let bonus = match bonus {
                Ok(b) => b,
                Err(_) => continue,
            };

            let info = bonuses
                .entry(bonus.parent_item_bonus_list_id)
                .or_insert_with(ItemBonusInfo::default);

            match bonus.type_id {
                // flat item level adjustment (ItemLevel)
                1 => info.level = Some(bonus.value0),
                // curve types (ScalingStatDistribution, fixed variant)
                11 | 13 => info.curve_id = Some(bonus.value3 as u32),
                // base item level (SetItemLevel)
                14 => info.base_level = Some(bonus.value0),
                _ => {}
            }
        }

        Db2ItemBonuses { bonuses }
    }

    /// Finds the merged bonus info for a Bonus List ID, if one exists.
    pub fn get(&self, bonus_id: i32) -> Option<&ItemBonusInfo> {
        self.bonuses.get(&bonus_id)
    }

    /// Whether a Bonus List ID appears in the table at all. Rows of
    /// unrecognized types still register membership; their info is just
    /// empty. Ids absent from the table entirely are unknown to the
    /// game data and are dropped from pricing identity.
    pub fn contains(&self, bonus_id: i32) -> bool {
        self.bonuses.contains_key(&bonus_id)
    }

    /// Number of distinct bonus list ids in the table.
    pub fn len(&self) -> usize {
        self.bonuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bonuses.is_empty()
    }
}
