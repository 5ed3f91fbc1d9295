//! Derived lookup indices, built in one pass per source table.

use indexmap::{IndexMap, IndexSet};

use crate::schema::*;

type Index<K, V> = IndexMap<K, IndexSet<V>>;

/// Every index the presentation layer queries by key.
///
/// Values keep the order of the table they were derived from, so output
/// built from them is stable without sorting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Views {
    // =========================================================================
    // Taxonomy and market
    // =========================================================================
    pub category_groups: Index<CategoryId, GroupId>,
    pub group_types: Index<GroupId, TypeId>,
    pub market_group_types: Index<MarketGroupId, TypeId>,
    pub market_group_children: Index<MarketGroupId, MarketGroupId>,

    // =========================================================================
    // Industry
    // =========================================================================
    pub material_activities: Index<TypeId, ActivityKey>,
    pub product_activities: Index<TypeId, ActivityKey>,
    pub skill_activities: Index<TypeId, ActivityKey>,
    pub output_schematic: IndexMap<TypeId, SchematicId>,
    pub input_schematics: Index<TypeId, SchematicId>,
    /// Reprocessed material -> ore and ice types yielding it
    pub ore_sources: Index<TypeId, TypeId>,

    // =========================================================================
    // Map
    // =========================================================================
    pub constellation_systems: Index<ConstellationId, SolarSystemId>,
    pub region_systems: Index<RegionId, SolarSystemId>,
    pub region_constellations: Index<RegionId, ConstellationId>,

    // =========================================================================
    // Skills
    // =========================================================================
    /// Skill -> required level -> types requiring it
    pub skill_dependants: IndexMap<TypeId, IndexMap<i32, IndexSet<TypeId>>>,
}

impl Views {
    pub fn materialize(tables: &RawTables) -> Self {
        let mut views = Views::default();

        for group in tables.groups.values() {
            push(&mut views.category_groups, group.category_id, group.id);
        }
        for ty in tables.types.values() {
            push(&mut views.group_types, ty.group_id, ty.id);
            if let Some(market_group) = ty.market_group_id {
                push(&mut views.market_group_types, market_group, ty.id);
            }
        }
        for market_group in tables.market_groups.values() {
            if let Some(parent) = market_group.parent_id {
                push(&mut views.market_group_children, parent, market_group.id);
            }
        }

        for activity in tables.industry_activities.values().flat_map(|a| a.values()) {
            let key = activity.key();
            for material in activity.materials.keys() {
                push(&mut views.material_activities, *material, key);
            }
            for product in activity.products.keys() {
                push(&mut views.product_activities, *product, key);
            }
            for skill in activity.skills.keys() {
                push(&mut views.skill_activities, *skill, key);
            }
        }

        for schematic in tables.planet_schematics.values() {
            // A later schematic with the same output replaces the earlier one
            views
                .output_schematic
                .insert(schematic.output_type_id, schematic.id);
            for input in schematic.inputs.keys() {
                push(&mut views.input_schematics, *input, schematic.id);
            }
        }

        for (source, materials) in &tables.reprocessing_materials {
            if category_of(tables, *source) != Some(ASTEROID_CATEGORY) {
                continue;
            }
            for material in materials.keys() {
                push(&mut views.ore_sources, *material, *source);
            }
        }

        for constellation in tables.constellations.values() {
            push(&mut views.region_constellations, constellation.region_id, constellation.id);
        }
        for system in tables.solar_systems.values() {
            push(&mut views.constellation_systems, system.constellation_id, system.id);
            push(&mut views.region_systems, system.region_id, system.id);
        }

        for (type_id, values) in &tables.type_attributes {
            for (skill_attribute, level_attribute) in SKILL_ATTRIBUTES.iter().zip(SKILL_LEVEL_ATTRIBUTES.iter()) {
                let Some(skill) = values.get(skill_attribute) else {
                    continue;
                };
                let level = values.get(level_attribute).map_or(1, |level| *level as i32);
                views
                    .skill_dependants
                    .entry(*skill as TypeId)
                    .or_default()
                    .entry(level)
                    .or_default()
                    .insert(*type_id);
            }
        }

        views
    }
}

fn push<K: std::hash::Hash + Eq, V: std::hash::Hash + Eq>(index: &mut Index<K, V>, key: K, value: V) {
    index.entry(key).or_default().insert(value);
}

fn category_of(tables: &RawTables, type_id: TypeId) -> Option<CategoryId> {
    let group = tables.types.get(&type_id)?.group_id;
    tables.groups.get(&group).map(|g| g.category_id)
}
