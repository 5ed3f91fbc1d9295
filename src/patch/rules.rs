//! The correction ruleset: hand-maintained lists of known data errors.

use indexmap::{IndexMap, IndexSet};

use crate::schema::*;

/// Copy one attribute's display metadata onto another
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeMerge {
    pub from: AttributeId,
    pub onto: AttributeId,
}

/// Raise an attribute to a minimum derived from each type's meta group
#[derive(Debug, Clone, PartialEq)]
pub struct MetaLevelFloor {
    pub attribute: AttributeId,
    pub floors: IndexMap<MetaGroupId, f64>,
    pub default: f64,
}

impl MetaLevelFloor {
    pub fn floor(&self, meta_group: MetaGroupId) -> f64 {
        self.floors.get(&meta_group).copied().unwrap_or(self.default)
    }
}

/// Literal text replacement in one type's description
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptionFix {
    pub type_id: TypeId,
    pub find: String,
    pub replace: String,
}

/// Every correction the patch engine applies, constructed once and passed in.
///
/// The "and children" sets reach down the taxonomy: a category in
/// `publish_categories_and_children` publishes its groups, and every group
/// published that way publishes its types.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ruleset {
    pub publish_categories: IndexSet<CategoryId>,
    pub publish_categories_and_children: IndexSet<CategoryId>,
    pub publish_groups: IndexSet<GroupId>,
    pub publish_groups_and_children: IndexSet<GroupId>,
    pub publish_types: IndexSet<TypeId>,

    pub unpublish_categories: IndexSet<CategoryId>,
    pub unpublish_categories_and_children: IndexSet<CategoryId>,
    pub unpublish_groups: IndexSet<GroupId>,
    pub unpublish_groups_and_children: IndexSet<GroupId>,
    pub unpublish_types: IndexSet<TypeId>,
    /// Types whose name starts with any of these are unpublished
    pub unpublished_name_prefixes: Vec<String>,

    /// Synthetic parent for every market group without one
    pub market_root: Option<MarketGroup>,
    /// (group, new parent)
    pub market_reparents: Vec<(MarketGroupId, MarketGroupId)>,

    pub attribute_merges: Vec<AttributeMerge>,
    /// (attribute, new category)
    pub attribute_categories: Vec<(AttributeId, i32)>,
    /// (attribute, new unit)
    pub attribute_units: Vec<(AttributeId, UnitId)>,
    pub meta_level: Option<MetaLevelFloor>,

    pub description_fixes: Vec<DescriptionFix>,
    /// Pairs placed in one variant family
    pub variant_links: Vec<(TypeId, TypeId)>,
}

impl Ruleset {
    /// No corrections at all; the patch engine then only prunes
    pub fn empty() -> Self {
        Self::default()
    }

    /// Corrections for the current game data, applied to either export
    pub fn standard() -> Self {
        Self {
            publish_groups_and_children: IndexSet::from([6, 15, 1324]),
            publish_types: IndexSet::from([30574, 30575, 30576, 30577, 30669, 30670]),

            unpublish_categories_and_children: IndexSet::from([11, 54, 91, 2118]),
            unpublish_groups_and_children: IndexSet::from([
                110, 186, 316, 836, 872, 876, 920, 935, 952, 1016, 1020, 1021, 1048, 1273, 1461,
                1717, 1975, 1977, 1984, 2004, 2022, 2026, 4161,
            ]),
            unpublish_types: [
                // Legacy and mission items
                3404, 27038, 28320, 34574, 35915, 47449,
                // Defunct starbase blueprints
                2742, 2743, 2744, 2745, 2746, 2747, 2748, 2786, 2790, 2791, 2793, 2795, 2797, 2820,
                2821, 28605, 33515, 33584, 2788, 2789, 2800, 33582,
                // Defunct starbase structures
                12239, 14343, 16221, 16869, 17982, 20175, 22634, 24684, 25270, 25271, 25280, 25821,
                30655, 30656, 16216, 24567, 28351, 32245, 33477, 33581, 33583, 27673, 27674, 27897,
            ]
            .into_iter()
            .collect(),
            unpublished_name_prefixes: vec!["Batch Compressed".to_string()],

            market_root: Some(MarketGroup {
                id: -1,
                parent_id: None,
                name: "Items".to_string(),
                description: None,
            }),
            market_reparents: vec![
                // Drones and ship rigs under ship equipment
                (157, 9),
                (955, 9),
                // Structure rigs under structure equipment
                (2203, 2202),
            ],

            // Warp speed: 1281 is display-only, 600 holds the value
            attribute_merges: vec![AttributeMerge { from: 1281, onto: 600 }],
            // Cargo hold capacities
            attribute_categories: vec![(38, 40), (1233, 40), (1770, 40)],
            attribute_units: vec![(2104, -1), (90, 114)],
            meta_level: Some(MetaLevelFloor {
                attribute: 633,
                floors: IndexMap::from([
                    (1, 0.0),
                    (2, 5.0),
                    (3, 6.0),
                    (4, 7.0),
                    (5, 11.0),
                    (6, 8.0),
                    (14, 5.0),
                ]),
                default: 0.0,
            }),

            description_fixes: vec![DescriptionFix {
                type_id: 2846,
                find: "// ".to_string(),
                replace: "//".to_string(),
            }],
            variant_links: vec![
                // Standup ECM
                (35940, 46577),
                // Research labs
                (35891, 45550),
            ],
            ..Self::default()
        }
    }
}
