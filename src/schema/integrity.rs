//! Foreign keys between entity tables and the verifier that checks them

use std::fmt;

use super::tables::RawTables;
use crate::error::{Error, Result};

/// Entity table a foreign key can point into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Category,
    Group,
    Type,
    Attribute,
    MarketGroup,
    MetaGroup,
    Region,
    Constellation,
}

impl Target {
    pub fn name(self) -> &'static str {
        match self {
            Target::Category => "categories",
            Target::Group => "groups",
            Target::Type => "types",
            Target::Attribute => "attributes",
            Target::MarketGroup => "market_groups",
            Target::MetaGroup => "meta_groups",
            Target::Region => "regions",
            Target::Constellation => "constellations",
        }
    }

    fn exists(self, tables: &RawTables, id: i32) -> bool {
        match self {
            Target::Category => tables.categories.contains_key(&id),
            Target::Group => tables.groups.contains_key(&id),
            Target::Type => tables.types.contains_key(&id),
            Target::Attribute => tables.attributes.contains_key(&id),
            Target::MarketGroup => tables.market_groups.contains_key(&id),
            Target::MetaGroup => tables.meta_groups.contains_key(&id),
            Target::Region => tables.regions.contains_key(&id),
            Target::Constellation => tables.constellations.contains_key(&id),
        }
    }
}

/// (owning row ID, referenced ID) pairs for one foreign key column
type References = fn(&RawTables) -> Vec<(i32, i32)>;

/// Foreign key reference
#[derive(Clone)]
pub struct ForeignKey {
    pub table: &'static str,
    pub column: &'static str,
    pub target: Target,
    references: References,
}

impl ForeignKey {
    pub const fn new(
        table: &'static str,
        column: &'static str,
        target: Target,
        references: References,
    ) -> Self {
        Self {
            table,
            column,
            target,
            references,
        }
    }
}

impl fmt::Debug for ForeignKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForeignKey")
            .field("table", &self.table)
            .field("column", &self.column)
            .field("target", &self.target)
            .finish()
    }
}

impl fmt::Display for ForeignKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} -> {}", self.table, self.column, self.target.name())
    }
}

// =============================================================================
// Item taxonomy
// =============================================================================

fn group_category(t: &RawTables) -> Vec<(i32, i32)> {
    t.groups.values().map(|g| (g.id, g.category_id)).collect()
}

fn type_group(t: &RawTables) -> Vec<(i32, i32)> {
    t.types.values().map(|ty| (ty.id, ty.group_id)).collect()
}

fn type_market_group(t: &RawTables) -> Vec<(i32, i32)> {
    t.types
        .values()
        .filter_map(|ty| ty.market_group_id.map(|mg| (ty.id, mg)))
        .collect()
}

fn market_group_parent(t: &RawTables) -> Vec<(i32, i32)> {
    t.market_groups
        .values()
        .filter_map(|mg| mg.parent_id.map(|parent| (mg.id, parent)))
        .collect()
}

fn meta_type_type(t: &RawTables) -> Vec<(i32, i32)> {
    t.meta_types.keys().map(|ty| (*ty, *ty)).collect()
}

fn meta_type_group(t: &RawTables) -> Vec<(i32, i32)> {
    t.meta_types.iter().map(|(ty, mg)| (*ty, *mg)).collect()
}

fn variant_member(t: &RawTables) -> Vec<(i32, i32)> {
    t.variants.members().map(|ty| (ty, ty)).collect()
}

// =============================================================================
// Dogma
// =============================================================================

fn type_attribute_type(t: &RawTables) -> Vec<(i32, i32)> {
    t.type_attributes.keys().map(|ty| (*ty, *ty)).collect()
}

fn type_attribute_attribute(t: &RawTables) -> Vec<(i32, i32)> {
    t.type_attributes
        .iter()
        .flat_map(|(ty, values)| values.keys().map(move |attr| (*ty, *attr)))
        .collect()
}

// =============================================================================
// Industry
// =============================================================================

fn activity_blueprint(t: &RawTables) -> Vec<(i32, i32)> {
    t.industry_activities.keys().map(|bp| (*bp, *bp)).collect()
}

fn activity_product(t: &RawTables) -> Vec<(i32, i32)> {
    t.industry_activities
        .iter()
        .flat_map(|(bp, activities)| {
            activities
                .values()
                .flat_map(move |a| a.products.keys().map(move |product| (*bp, *product)))
        })
        .collect()
}

// =============================================================================
// Map
// =============================================================================

fn constellation_region(t: &RawTables) -> Vec<(i32, i32)> {
    t.constellations
        .values()
        .map(|c| (c.id, c.region_id))
        .collect()
}

fn system_constellation(t: &RawTables) -> Vec<(i32, i32)> {
    t.solar_systems
        .values()
        .map(|s| (s.id, s.constellation_id))
        .collect()
}

fn system_region(t: &RawTables) -> Vec<(i32, i32)> {
    t.solar_systems.values().map(|s| (s.id, s.region_id)).collect()
}

/// Every foreign key a corrected data set must satisfy
pub static FOREIGN_KEYS: &[ForeignKey] = &[
    ForeignKey::new("groups", "category_id", Target::Category, group_category),
    ForeignKey::new("types", "group_id", Target::Group, type_group),
    ForeignKey::new("types", "market_group_id", Target::MarketGroup, type_market_group),
    ForeignKey::new("market_groups", "parent_id", Target::MarketGroup, market_group_parent),
    ForeignKey::new("meta_types", "type_id", Target::Type, meta_type_type),
    ForeignKey::new("meta_types", "meta_group_id", Target::MetaGroup, meta_type_group),
    ForeignKey::new("variants", "type_id", Target::Type, variant_member),
    ForeignKey::new("type_attributes", "type_id", Target::Type, type_attribute_type),
    ForeignKey::new("type_attributes", "attribute_id", Target::Attribute, type_attribute_attribute),
    ForeignKey::new("industry_activities", "blueprint_id", Target::Type, activity_blueprint),
    ForeignKey::new("industry_activities", "product_id", Target::Type, activity_product),
    ForeignKey::new("constellations", "region_id", Target::Region, constellation_region),
    ForeignKey::new("solar_systems", "constellation_id", Target::Constellation, system_constellation),
    ForeignKey::new("solar_systems", "region_id", Target::Region, system_region),
];

/// A reference that does not resolve
#[derive(Debug, Clone)]
pub struct Violation {
    pub key: &'static ForeignKey,
    pub owner: i32,
    pub missing: i32,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (row {}, missing {})", self.key, self.owner, self.missing)
    }
}

/// Collect every unresolved reference
pub fn violations(tables: &RawTables) -> Vec<Violation> {
    FOREIGN_KEYS
        .iter()
        .flat_map(|key| {
            (key.references)(tables)
                .into_iter()
                .filter(move |(_, target)| !key.target.exists(tables, *target))
                .map(move |(owner, missing)| Violation { key, owner, missing })
        })
        .collect()
}

/// Fail on the first unresolved reference, reporting how many there are in total
pub fn verify(tables: &RawTables) -> Result<()> {
    let found = violations(tables);
    match found.first() {
        None => Ok(()),
        Some(first) if found.len() == 1 => Err(Error::Reference(first.to_string())),
        Some(first) => Err(Error::Reference(format!(
            "{first} and {} more",
            found.len() - 1
        ))),
    }
}
