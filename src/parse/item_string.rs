use std::fmt;
use std::str::FromStr;

use log::warn;

use crate::auctiondb::pb;
use crate::battlenet::{auctions, commodities, SnapshotItem};
use crate::error::{Error, Result};

use super::item_level::{DerivedItemLevel, ItemLevelResolver};

/// Sentinel mod key storing an absolute derived item level.
pub const ABS_ILVL: i32 = -1;

/// Sentinel mod key storing a relative derived item level.
pub const REL_ILVL: i32 = -2;

/// Modifier types that take part in pricing identity. Everything else
/// on an auction item is cosmetic.
const KEPT_MODIFIER_TYPES: [i32; 3] = [9, 29, 30];

/// Modifier type carrying the player's level when the item dropped.
const MOD_TYPE_PLAYER_LEVEL: i32 = 9;

/// Whether an item string identifies an item or a battle pet species.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemStringType {
    Item,
    Pet,
}

impl ItemStringType {
    fn as_str(self) -> &'static str {
        match self {
            ItemStringType::Item => "i",
            ItemStringType::Pet => "p",
        }
    }
}

/// Canonical fingerprint of a marketplace item, used as the primary key
/// of the [AuctionDb](`crate::auctiondb::AuctionDb`).
///
/// Two listings share an `ItemString` exactly when they are the same
/// thing to a buyer: same item id, same level-relevant bonuses, same
/// kept modifiers. Construction canonicalizes the raw auction payload:
///
/// * `bonuses` keeps only ids known to the ItemBonus table, sorted
///   ascending;
/// * `mods` keeps only the types in `{9, 29, 30}`, flattened into
///   `(type, value)` pairs sorted by type;
/// * when the bonuses resolve to a derived item level, both collapse
///   into a single sentinel pair ([`ABS_ILVL`] or [`REL_ILVL`], level) —
/// the remaining bonuses and mods no longer matter to pricing.
///
/// The type is immutable after construction; equality and hashing cover
/// every field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemString {
    item_type: ItemStringType,
    id: u32,
    bonuses: Option<Vec<i32>>,
    mods: Option<Vec<i32>>,
}

impl ItemString {
    /// Build an `ItemString` from already-canonical parts.
    ///
    /// Empty sequences are normalized to absent. The mod list must have
    /// an even length, and a sentinel key must form the only pair with
    /// no bonuses alongside; anything else is [`Error::InvalidMods`].
    ///
    /// Callers assembling mods by hand are expected to pass pairs sorted
    /// by key; [from_auction_item](`Self::from_auction_item`) is the
    /// canonical constructor.
    pub fn new(
        item_type: ItemStringType,
        id: u32,
        bonuses: Option<Vec<i32>>,
        mods: Option<Vec<i32>>,
    ) -> Result<Self> {
        let bonuses = bonuses.filter(|b| !b.is_empty());
        let mods = mods.filter(|m| !m.is_empty());

        if let Some(mods) = &mods {
            if mods.len() % 2 != 0 {
                return Err(Error::InvalidMods(mods.clone()));
            }
            if (mods[0] == ABS_ILVL || mods[0] == REL_ILVL)
                && (mods.len() != 2 || bonuses.is_some())
            {
                return Err(Error::InvalidMods(mods.clone()));
            }
        }

        Ok(ItemString {
            item_type,
            id,
            bonuses,
            mods,
        })
    }

    pub fn item_type(&self) -> ItemStringType {
        self.item_type
    }

    /// The item id, or the pet species id for pets.
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn bonuses(&self) -> Option<&[i32]> {
        self.bonuses.as_deref()
    }

    pub fn mods(&self) -> Option<&[i32]> {
        self.mods.as_deref()
    }

    /// Derive the fingerprint of one snapshot entry's item.
    pub fn from_snapshot_item(item: &SnapshotItem<'_>, resolver: &ItemLevelResolver) -> Self {
        match item {
            SnapshotItem::Auction(item) => Self::from_auction_item(item, resolver),
            SnapshotItem::Commodity(item) => Self::from_commodity_item(item),
        }
    }

    /// Derive the fingerprint of a realm auction item.
    ///
    /// Pets collapse to their species id. For everything else the
    /// bonuses and modifiers are filtered and sorted as described on
    /// [`ItemString`], and the item level resolver decides whether they
    /// collapse into a derived-level sentinel. Resolver failures are
    /// swallowed here: the item falls back to its filtered bonuses and
    /// mods.
    pub fn from_auction_item(item: &auctions::Item, resolver: &ItemLevelResolver) -> Self {
        if let Some(species) = item.pet_species_id {
            return ItemString {
                item_type: ItemStringType::Pet,
                id: species,
                bonuses: None,
                mods: None,
            };
        }

        // filtered, in input order: the resolver fold is order-sensitive
        let mut bonuses: Vec<i32> = match &item.bonus_lists {
            Some(list) => list
                .iter()
                .copied()
                .filter(|&b| resolver.contains_bonus(b))
                .collect(),
            None => Vec::new(),
        };

        let mut player_level = None;
        let mut pairs: Vec<(i32, i64)> = Vec::new();
        if let Some(modifiers) = &item.modifiers {
            for modifier in modifiers {
                if !KEPT_MODIFIER_TYPES.contains(&modifier.modifier_type) {
                    continue;
                }
                if modifier.modifier_type == MOD_TYPE_PLAYER_LEVEL {
                    player_level = Some(modifier.value as i32);
                }
                pairs.push((modifier.modifier_type, modifier.value));
            }
        }
        pairs.sort_unstable();

        let derived = match resolver.resolve(&bonuses, player_level) {
            Ok(derived) => derived,
            Err(err) => {
                warn!("item {}: item level resolution failed: {}", item.id, err);
                None
            }
        };

        match derived {
            Some(DerivedItemLevel { ilvl, relative }) => {
                let key = if relative { REL_ILVL } else { ABS_ILVL };
                ItemString {
                    item_type: ItemStringType::Item,
                    id: item.id,
                    bonuses: None,
                    mods: Some(vec![key, ilvl]),
                }
            }
            None => {
                bonuses.sort_unstable();
                let mut mods = Vec::with_capacity(pairs.len() * 2);
                for (mod_type, value) in pairs {
                    mods.push(mod_type);
                    mods.push(value as i32);
                }
                ItemString {
                    item_type: ItemStringType::Item,
                    id: item.id,
                    bonuses: if bonuses.is_empty() { None } else { Some(bonuses) },
                    mods: if mods.is_empty() { None } else { Some(mods) },
                }
            }
        }
    }

    /// Derive the fingerprint of a commodity item. Commodities are
    /// fungible, so the id is the whole identity.
    pub fn from_commodity_item(item: &commodities::CommodityItem) -> Self {
        ItemString {
            item_type: ItemStringType::Item,
            id: item.id,
            bonuses: None,
            mods: None,
        }
    }

    /// Reconstruct an `ItemString` from its wire message.
    pub fn from_pb(proto: &pb::ItemString) -> Result<Self> {
        let item_type = if proto.r#type == pb::ItemStringType::Item as i32 {
            ItemStringType::Item
        } else if proto.r#type == pb::ItemStringType::Pet as i32 {
            ItemStringType::Pet
        } else {
            return Err(Error::InvalidItemString(format!(
                "unknown item string type {}",
                proto.r#type
            )));
        };

        ItemString::new(
            item_type,
            proto.id,
            Some(proto.bonus.clone()),
            Some(proto.mods.clone()),
        )
    }

    /// Render the wire message. Absent bonuses and mods become empty
    /// repeated fields.
    pub fn to_pb(&self) -> pb::ItemString {
        pb::ItemString {
            r#type: match self.item_type {
                ItemStringType::Item => pb::ItemStringType::Item as i32,
                ItemStringType::Pet => pb::ItemStringType::Pet as i32,
            },
            id: self.id,
            bonus: self.bonuses.clone().unwrap_or_default(),
            mods: self.mods.clone().unwrap_or_default(),
        }
    }

    /// Render the textual form consumed by the TSM add-on.
    ///
    /// Derived-level sentinels render as `i:<id>::i<ilvl>` (absolute)
    /// or `i:<id>::+<ilvl>` (relative); otherwise bonuses and mods are
    /// emitted as counted segments, and a bare item with neither is just
    /// the decimal id.
    pub fn to_str(&self) -> String {
        if let Some(mods) = &self.mods {
            if mods[0] == ABS_ILVL {
                return format!("{}:{}::i{}", self.item_type.as_str(), self.id, mods[1]);
            }
            if mods[0] == REL_ILVL {
                let sign = if mods[1] > 0 { "+" } else { "" };
                return format!(
                    "{}:{}::{}{}",
                    self.item_type.as_str(),
                    self.id,
                    sign,
                    mods[1]
                );
            }
        }

        let bonus_str = self.bonuses.as_ref().map(|bonuses| {
            let joined: Vec<String> = bonuses.iter().map(i32::to_string).collect();
            format!("{}:{}", bonuses.len(), joined.join(":"))
        });
        let mod_str = self.mods.as_ref().map(|mods| {
            let joined: Vec<String> = mods.iter().map(i32::to_string).collect();
            format!("{}:{}", mods.len() / 2, joined.join(":"))
        });

        let kind = self.item_type.as_str();
        match (bonus_str, mod_str) {
            (Some(b), Some(m)) => format!("{}:{}::{}:{}", kind, self.id, b, m),
            (Some(b), None) => format!("{}:{}::{}", kind, self.id, b),
            (None, Some(m)) => format!("{}:{}::0:{}", kind, self.id, m),
            (None, None) => match self.item_type {
                ItemStringType::Item => self.id.to_string(),
                ItemStringType::Pet => format!("p:{}", self.id),
            },
        }
    }
}

impl fmt::Display for ItemString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_str())
    }
}

impl FromStr for ItemString {
    type Err = Error;

    /// Parse the textual form. Every shape [to_str](`ItemString::to_str`)
    /// can emit round-trips; anything else is
    /// [`Error::InvalidItemString`].
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidItemString(s.to_string());

        if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) {
            let id = s.parse().map_err(|_| invalid())?;
            return ItemString::new(ItemStringType::Item, id, None, None);
        }

        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() < 2 {
            return Err(invalid());
        }

        let item_type = match parts[0] {
            "i" => ItemStringType::Item,
            "p" => ItemStringType::Pet,
            _ => return Err(invalid()),
        };
        let id: u32 = parts[1].parse().map_err(|_| invalid())?;

        if parts.len() == 2 {
            return ItemString::new(item_type, id, None, None);
        }

        // segment between the id and the payload is an empty placeholder
        if !parts[2].is_empty() || parts.len() < 4 {
            return Err(invalid());
        }

        let head = parts[3];
        if let Some(rest) = head.strip_prefix('i') {
            if parts.len() != 4 {
                return Err(invalid());
            }
            let ilvl: i32 = rest.parse().map_err(|_| invalid())?;
            return ItemString::new(item_type, id, None, Some(vec![ABS_ILVL, ilvl]));
        }
        if head.starts_with('+') || head.starts_with('-') {
            if parts.len() != 4 {
                return Err(invalid());
            }
            let ilvl: i32 = head.parse().map_err(|_| invalid())?;
            return ItemString::new(item_type, id, None, Some(vec![REL_ILVL, ilvl]));
        }

        // counted bonus segment, optionally followed by a counted mod
        // segment
        let nums: Vec<i32> = parts[3..]
            .iter()
            .map(|p| p.parse().map_err(|_| invalid()))
            .collect::<Result<_>>()?;

        let n_bonuses = nums[0];
        if n_bonuses < 0 {
            return Err(invalid());
        }
        let n_bonuses = n_bonuses as usize;
        if nums.len() < 1 + n_bonuses {
            return Err(invalid());
        }
        let bonuses: Vec<i32> = nums[1..1 + n_bonuses].to_vec();

        let rest = &nums[1 + n_bonuses..];
        let mods: Vec<i32> = if rest.is_empty() {
            Vec::new()
        } else {
            let n_mods = rest[0];
            if n_mods < 0 || rest.len() != 1 + 2 * n_mods as usize {
                return Err(invalid());
            }
            rest[1..].to_vec()
        };

        ItemString::new(item_type, id, Some(bonuses), Some(mods))
    }
}
