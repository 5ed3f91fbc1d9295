//! The frozen dataset handed to consumers.

use indexmap::{IndexMap, IndexSet};

use crate::patch::PatchReport;
use crate::schema::*;
use crate::views::Views;

/// Corrected tables plus their materialized views, read-only.
///
/// The only way to obtain one is [`SdeData::freeze`], which builds the
/// views, so there is no state in which a view is missing.
#[derive(Debug, Clone)]
pub struct SdeData {
    tables: RawTables,
    views: Views,
    report: Option<PatchReport>,
}

impl SdeData {
    pub fn freeze(tables: RawTables) -> Self {
        let views = Views::materialize(&tables);
        Self {
            tables,
            views,
            report: None,
        }
    }

    pub(crate) fn with_report(mut self, report: Option<PatchReport>) -> Self {
        self.report = report;
        self
    }

    pub fn tables(&self) -> &RawTables {
        &self.tables
    }

    pub fn views(&self) -> &Views {
        &self.views
    }

    /// Present when the tables were corrected before freezing
    pub fn patch_report(&self) -> Option<&PatchReport> {
        self.report.as_ref()
    }

    pub fn categories(&self) -> &IndexMap<CategoryId, Category> {
        &self.tables.categories
    }

    pub fn groups(&self) -> &IndexMap<GroupId, Group> {
        &self.tables.groups
    }

    pub fn types(&self) -> &IndexMap<TypeId, Type> {
        &self.tables.types
    }

    pub fn type_traits(&self) -> &IndexMap<TypeId, TypeTraits> {
        &self.tables.type_traits
    }

    pub fn icons(&self) -> &IndexMap<IconId, String> {
        &self.tables.icons
    }

    pub fn market_groups(&self) -> &IndexMap<MarketGroupId, MarketGroup> {
        &self.tables.market_groups
    }

    pub fn meta_groups(&self) -> &IndexMap<MetaGroupId, MetaGroup> {
        &self.tables.meta_groups
    }

    pub fn meta_types(&self) -> &IndexMap<TypeId, MetaGroupId> {
        &self.tables.meta_types
    }

    pub fn variants(&self) -> &Variants {
        &self.tables.variants
    }

    pub fn attributes(&self) -> &IndexMap<AttributeId, Attribute> {
        &self.tables.attributes
    }

    pub fn type_attributes(&self) -> &IndexMap<TypeId, IndexMap<AttributeId, f64>> {
        &self.tables.type_attributes
    }

    pub fn effects(&self) -> &IndexMap<EffectId, Effect> {
        &self.tables.effects
    }

    pub fn type_effects(&self) -> &IndexMap<TypeId, IndexSet<EffectId>> {
        &self.tables.type_effects
    }

    pub fn industry_activities(&self) -> &IndexMap<TypeId, IndexMap<ActivityKind, IndustryActivity>> {
        &self.tables.industry_activities
    }

    pub fn reprocessing_materials(&self) -> &IndexMap<TypeId, IndexMap<TypeId, i32>> {
        &self.tables.reprocessing_materials
    }

    pub fn planet_schematics(&self) -> &IndexMap<SchematicId, PlanetSchematic> {
        &self.tables.planet_schematics
    }

    pub fn regions(&self) -> &IndexMap<RegionId, Region> {
        &self.tables.regions
    }

    pub fn constellations(&self) -> &IndexMap<ConstellationId, Constellation> {
        &self.tables.constellations
    }

    pub fn solar_systems(&self) -> &IndexMap<SolarSystemId, SolarSystem> {
        &self.tables.solar_systems
    }

    pub fn out_jumps(&self) -> &IndexMap<SolarSystemId, IndexSet<SolarSystemId>> {
        &self.tables.out_jumps
    }

    pub fn in_jumps(&self) -> &IndexMap<SolarSystemId, IndexSet<SolarSystemId>> {
        &self.tables.in_jumps
    }

    pub fn celestials(&self) -> &IndexMap<SolarSystemId, Vec<Celestial>> {
        &self.tables.celestials
    }

    pub fn stations(&self) -> &IndexMap<SolarSystemId, Vec<Station>> {
        &self.tables.stations
    }

    pub fn factions(&self) -> &IndexMap<FactionId, Faction> {
        &self.tables.factions
    }

    /// Explicit value, else the attribute's default; `None` if the attribute is undefined
    pub fn attribute_value(&self, type_id: TypeId, attribute_id: AttributeId) -> Option<f64> {
        let explicit = self
            .tables
            .type_attributes
            .get(&type_id)
            .and_then(|values| values.get(&attribute_id));
        match explicit {
            Some(value) => Some(*value),
            None => self.tables.attributes.get(&attribute_id).map(Attribute::default_value),
        }
    }

    /// Ancestors of a market group, root first, ending with the group itself
    pub fn market_group_path(&self, id: MarketGroupId) -> Vec<&MarketGroup> {
        let mut path = Vec::new();
        let mut current = self.tables.market_groups.get(&id);
        while let Some(group) = current {
            // Guards against a parent cycle in unpatched data
            if path.iter().any(|g: &&MarketGroup| g.id == group.id) {
                break;
            }
            path.push(group);
            current = group
                .parent_id
                .and_then(|parent| self.tables.market_groups.get(&parent));
        }
        path.reverse();
        path
    }

    /// The other members of a type's variant family
    pub fn type_variants(&self, type_id: TypeId) -> Vec<TypeId> {
        self.tables
            .variants
            .family(type_id)
            .map(|family| family.iter().copied().filter(|id| *id != type_id).collect())
            .unwrap_or_default()
    }

    pub fn activity(&self, key: ActivityKey) -> Option<&IndustryActivity> {
        self.tables
            .industry_activities
            .get(&key.blueprint)
            .and_then(|activities| activities.get(&key.kind))
    }

    /// Row counts per table and view, for reporting
    pub fn counts(&self) -> Vec<(&'static str, usize)> {
        let t = &self.tables;
        let v = &self.views;
        vec![
            ("categories", t.categories.len()),
            ("groups", t.groups.len()),
            ("types", t.types.len()),
            ("type traits", t.type_traits.len()),
            ("icons", t.icons.len()),
            ("market groups", t.market_groups.len()),
            ("meta groups", t.meta_groups.len()),
            ("meta types", t.meta_types.len()),
            ("variant families", t.variants.len()),
            ("attributes", t.attributes.len()),
            ("typed attribute sets", t.type_attributes.len()),
            ("effects", t.effects.len()),
            ("blueprints", t.industry_activities.len()),
            ("reprocessable types", t.reprocessing_materials.len()),
            ("planet schematics", t.planet_schematics.len()),
            ("regions", t.regions.len()),
            ("constellations", t.constellations.len()),
            ("solar systems", t.solar_systems.len()),
            ("systems with jumps", t.out_jumps.len()),
            ("systems with celestials", t.celestials.len()),
            ("systems with stations", t.stations.len()),
            ("factions", t.factions.len()),
            ("materials used in industry", v.material_activities.len()),
            ("ore materials", v.ore_sources.len()),
            ("required skills", v.skill_dependants.len()),
        ]
    }
}
