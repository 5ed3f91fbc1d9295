//! Raw entity tables, as filled in by a source reader and corrected by the patch engine

use indexmap::{IndexMap, IndexSet};

use super::types::*;

/// Mutable builder holding every entity table.
///
/// Readers fill it, the patch engine corrects it in place, and
/// [`crate::SdeData::freeze`] consumes it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTables {
    // =========================================================================
    // Item taxonomy
    // =========================================================================
    pub categories: IndexMap<CategoryId, Category>,
    pub groups: IndexMap<GroupId, Group>,
    pub types: IndexMap<TypeId, Type>,
    pub type_traits: IndexMap<TypeId, TypeTraits>,
    pub icons: IndexMap<IconId, String>,
    pub market_groups: IndexMap<MarketGroupId, MarketGroup>,
    pub meta_groups: IndexMap<MetaGroupId, MetaGroup>,
    pub meta_types: IndexMap<TypeId, MetaGroupId>,
    pub variants: Variants,

    // =========================================================================
    // Dogma
    // =========================================================================
    pub attributes: IndexMap<AttributeId, Attribute>,
    pub type_attributes: IndexMap<TypeId, IndexMap<AttributeId, f64>>,
    pub effects: IndexMap<EffectId, Effect>,
    pub type_effects: IndexMap<TypeId, IndexSet<EffectId>>,

    // =========================================================================
    // Industry
    // =========================================================================
    pub industry_activities: IndexMap<TypeId, IndexMap<ActivityKind, IndustryActivity>>,
    pub reprocessing_materials: IndexMap<TypeId, IndexMap<TypeId, i32>>,
    pub planet_schematics: IndexMap<SchematicId, PlanetSchematic>,

    // =========================================================================
    // Map
    // =========================================================================
    pub regions: IndexMap<RegionId, Region>,
    pub constellations: IndexMap<ConstellationId, Constellation>,
    pub solar_systems: IndexMap<SolarSystemId, SolarSystem>,
    pub out_jumps: IndexMap<SolarSystemId, IndexSet<SolarSystemId>>,
    pub in_jumps: IndexMap<SolarSystemId, IndexSet<SolarSystemId>>,
    pub celestials: IndexMap<SolarSystemId, Vec<Celestial>>,
    pub stations: IndexMap<SolarSystemId, Vec<Station>>,
    pub factions: IndexMap<FactionId, Faction>,
}

impl RawTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a directed jump, keeping both adjacency directions in step
    pub fn add_jump(&mut self, from: SolarSystemId, to: SolarSystemId) {
        self.out_jumps.entry(from).or_default().insert(to);
        self.in_jumps.entry(to).or_default().insert(from);
    }

    /// Sort every ID-keyed table by key.
    ///
    /// Tables filled by concurrent tasks land in scheduling order; sorting once
    /// the load drains makes iteration order reproducible.
    pub fn sort_by_id(&mut self) {
        self.categories.sort_keys();
        self.groups.sort_keys();
        self.types.sort_keys();
        self.type_traits.sort_keys();
        self.icons.sort_keys();
        self.market_groups.sort_keys();
        self.meta_groups.sort_keys();
        self.meta_types.sort_keys();
        self.attributes.sort_keys();
        self.type_attributes.sort_keys();
        self.effects.sort_keys();
        self.type_effects.sort_keys();
        self.industry_activities.sort_keys();
        for activities in self.industry_activities.values_mut() {
            activities.sort_keys();
        }
        self.reprocessing_materials.sort_keys();
        self.planet_schematics.sort_keys();
        self.regions.sort_keys();
        self.constellations.sort_keys();
        self.solar_systems.sort_keys();
        self.out_jumps.sort_keys();
        self.in_jumps.sort_keys();
        for targets in self.out_jumps.values_mut().chain(self.in_jumps.values_mut()) {
            targets.sort();
        }
        self.celestials.sort_keys();
        for celestials in self.celestials.values_mut() {
            celestials.sort_by_key(|c| c.item_id);
        }
        self.stations.sort_keys();
        for stations in self.stations.values_mut() {
            stations.sort_by_key(|s| s.id);
        }
        self.factions.sort_keys();
    }
}

pub type FamilyId = u32;

/// Variant families: types that are tiers of one base type.
///
/// Each member maps to a family ID and the family map is the single owner of
/// the member sets, so membership is symmetric by construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Variants {
    family_of: IndexMap<TypeId, FamilyId>,
    families: IndexMap<FamilyId, IndexSet<TypeId>>,
    next_family: FamilyId,
}

impl Variants {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put `a` and `b` in the same family, creating or merging families as needed
    pub fn join(&mut self, a: TypeId, b: TypeId) {
        let family = match (self.family_of.get(&a).copied(), self.family_of.get(&b).copied()) {
            (Some(fa), Some(fb)) if fa == fb => return,
            (Some(fa), Some(fb)) => {
                let moved = self.families.shift_remove(&fb).unwrap_or_default();
                for member in &moved {
                    self.family_of.insert(*member, fa);
                }
                if let Some(members) = self.families.get_mut(&fa) {
                    members.extend(moved);
                }
                return;
            }
            (Some(fa), None) => fa,
            (None, Some(fb)) => {
                self.family_of.insert(a, fb);
                if let Some(members) = self.families.get_mut(&fb) {
                    members.insert(a);
                }
                return;
            }
            (None, None) => {
                let family = self.next_family;
                self.next_family += 1;
                self.family_of.insert(a, family);
                self.families.insert(family, IndexSet::from([a]));
                family
            }
        };
        self.family_of.insert(b, family);
        if let Some(members) = self.families.get_mut(&family) {
            members.insert(b);
        }
    }

    /// Every member of `ty`'s family, `ty` included
    pub fn family(&self, ty: TypeId) -> Option<&IndexSet<TypeId>> {
        self.family_of.get(&ty).and_then(|f| self.families.get(f))
    }

    pub fn family_id(&self, ty: TypeId) -> Option<FamilyId> {
        self.family_of.get(&ty).copied()
    }

    pub fn contains(&self, ty: TypeId) -> bool {
        self.family_of.contains_key(&ty)
    }

    pub fn families(&self) -> impl Iterator<Item = &IndexSet<TypeId>> {
        self.families.values()
    }

    pub fn members(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.family_of.keys().copied()
    }

    /// Number of families
    pub fn len(&self) -> usize {
        self.families.len()
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }

    /// Drop members failing `keep`, then any family left with fewer than two members
    pub fn retain(&mut self, mut keep: impl FnMut(TypeId) -> bool) -> usize {
        let before = self.family_of.len();
        self.family_of.retain(|ty, _| keep(*ty));
        let family_of = &self.family_of;
        for members in self.families.values_mut() {
            members.retain(|ty| family_of.contains_key(ty));
        }
        self.prune_singletons();
        before - self.family_of.len()
    }

    /// Families of one are not meaningful variant groups
    pub fn prune_singletons(&mut self) {
        self.families.retain(|_, members| members.len() > 1);
        let families = &self.families;
        self.family_of.retain(|_, family| families.contains_key(family));
    }
}
