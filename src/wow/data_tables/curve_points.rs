use serde::Deserialize;
use std::collections::HashMap;

/// Container struct for all of the [`Db2CurvePoint`] rows.
pub struct Db2CurvePoints {
    /// Mapping of Curve IDs to all of the curve `(x, y)` values, in the
    /// order they appear in the table (ascending by player level in the
    /// tables WoW ships).
    curve_ids: HashMap<u32, Vec<(i32, i32)>>,
}

/// A struct representation of a single row in the CurvePoint DB2 table
/// of World of Warcraft game files.
#[derive(Debug, Deserialize)]
pub struct Db2CurvePoint {
    /// The ID of a single Curve Point `(x, y)` coordinate.
    #[serde(rename = "ID")]
    pub id: u32,

    /// The `x` coordinate, which corresponds to Player Level.
    #[serde(rename = "Pos[0]")]
    pub x: i32,

    /// The `y` coordinate, which corresponds to Item Level.
    #[serde(rename = "Pos[1]")]
    pub y: i32,

    /// The ID of the overall curve, which is made up of one or more
    /// curve points. This ID is tied to Bonus IDs via the
    /// [Db2ItemBonuses](`super::Db2ItemBonuses`) table.
    #[serde(rename = "CurveID")]
    pub curve_id: u32,

    /// The order index within the table between "like" rows. Unused here.
    #[serde(rename = "OrderIndex")]
    pub order_index: u16,
}

/// Functionality for working with Curve Points and their effect on items.
///
/// In addition to mapping the rows into a [`Db2CurvePoint`], parsing is
/// done which maps all Curve IDs to all `(x, y)` coordinates associated
/// with that ID for fast retrieval.
impl Db2CurvePoints {
    /// Deserializes a CSV string which represents the DB2 CurvePoints
    /// table in World of Warcraft. Rows that fail to deserialize are
    /// skipped.
    pub fn from_csv(csv: &str) -> Db2CurvePoints {
        let mut reader = csv::Reader::from_reader(csv.as_bytes());
        let iter = reader.deserialize::<Db2CurvePoint>();

        let mut curve_ids: HashMap<u32, Vec<(i32, i32)>> = HashMap::new();

        for point in iter {
            let point = match point {
                Ok(p) => p,
                Err(_) => continue,
            };

            curve_ids
                .entry(point.curve_id)
                .or_insert_with(Vec::new)
                .push((point.x, point.y));
        }

        Db2CurvePoints { curve_ids }
    }

    /// Find the curve `(x, y)` coordinates associated with a Curve ID,
    /// if it exists.
    pub fn points(&self, curve_id: u32) -> Option<&Vec<(i32, i32)>> {
        self.curve_ids.get(&curve_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CURVE_CSV_HEADER: &str = "ID,Pos[0],Pos[1],CurveID,OrderIndex";

    #[test]
    fn curve_single_point() {
        let mut csv = String::from(CURVE_CSV_HEADER);
        csv.push_str("\n5,1,6,5,0");

        let table = Db2CurvePoints::from_csv(&csv);
        assert_eq!(vec![(1, 6)], *table.points(5).unwrap());
    }

    #[test]
    fn curve_multiple_points() {
        let mut csv = String::from(CURVE_CSV_HEADER);
        csv.push_str("\n5,1,6,5,0\n9,25,31,5,0");

        let table = Db2CurvePoints::from_csv(&csv);
        assert_eq!(vec![(1, 6), (25, 31)], *table.points(5).unwrap());
    }

    #[test]
    fn curve_mixed_curves() {
        let mut csv = String::from(CURVE_CSV_HEADER);
        csv.push_str("\n5,1,6,5,0\n2,3,4,9,0\n9,25,31,5,0");

        let table = Db2CurvePoints::from_csv(&csv);
        assert_eq!(vec![(1, 6), (25, 31)], *table.points(5).unwrap());
        assert_eq!(vec![(3, 4)], *table.points(9).unwrap());
    }

    #[test]
    fn curve_no_curve_with_id() {
        let mut csv = String::from(CURVE_CSV_HEADER);
        csv.push_str("\n5,1,6,5,0");

        let table = Db2CurvePoints::from_csv(&csv);
        assert!(table.points(12).is_none());
    }
}
