use indexmap::IndexMap;
use serde::Serialize;

pub type CategoryId = i32;
pub type GroupId = i32;
pub type TypeId = i32;
pub type AttributeId = i32;
pub type EffectId = i32;
pub type IconId = i32;
pub type UnitId = i32;
pub type MarketGroupId = i32;
pub type MetaGroupId = i32;
pub type FactionId = i32;
pub type RegionId = i32;
pub type ConstellationId = i32;
pub type SolarSystemId = i32;
pub type SchematicId = i32;
pub type ItemId = i32;

/// Unit IDs whose values are multipliers, so an omitted value means "unchanged" (1.0)
pub const MULTIPLIER_UNITS: &[UnitId] = &[104, 108, 109, 111];

/// Attributes holding a required skill's type ID, paired index-wise with [`SKILL_LEVEL_ATTRIBUTES`]
pub const SKILL_ATTRIBUTES: [AttributeId; 6] = [182, 183, 184, 1285, 1289, 1290];

/// Attributes holding the level required of the skill in the same position of [`SKILL_ATTRIBUTES`]
pub const SKILL_LEVEL_ATTRIBUTES: [AttributeId; 6] = [277, 278, 279, 1286, 1287, 1288];

/// Category holding asteroid and ice ore types
pub const ASTEROID_CATEGORY: CategoryId = 25;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub icon_id: Option<IconId>,
    pub published: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    pub id: GroupId,
    pub category_id: CategoryId,
    pub name: String,
    pub icon_id: Option<IconId>,
    pub published: bool,
}

/// An item definition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Type {
    pub id: TypeId,
    pub group_id: GroupId,
    pub name: String,
    pub description: Option<String>,
    pub mass: f64,
    pub volume: f64,
    pub capacity: f64,
    pub published: bool,
    pub icon_id: Option<IconId>,
    pub graphic_id: Option<i32>,
    pub market_group_id: Option<MarketGroupId>,
}

/// Dogma attribute definition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribute {
    pub id: AttributeId,
    pub category_id: Option<i32>,
    pub attribute_name: Option<String>,
    pub display_name: Option<String>,
    pub unit_id: Option<UnitId>,
    pub icon_id: Option<IconId>,
    pub published: bool,
    pub high_is_good: bool,
}

impl Attribute {
    /// Value assumed when a type has no explicit entry for this attribute
    pub fn default_value(&self) -> f64 {
        match self.unit_id {
            Some(unit) if MULTIPLIER_UNITS.contains(&unit) => 1.0,
            _ => 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Effect {
    pub id: EffectId,
    pub name: String,
}

/// Industry activity kinds, with the numeric codes used by the relational export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ActivityKind {
    Manufacturing,
    ResearchTime,
    ResearchMaterial,
    Copying,
    Invention,
    Reactions,
}

impl ActivityKind {
    pub const ALL: [ActivityKind; 6] = [
        ActivityKind::Manufacturing,
        ActivityKind::ResearchTime,
        ActivityKind::ResearchMaterial,
        ActivityKind::Copying,
        ActivityKind::Invention,
        ActivityKind::Reactions,
    ];

    /// Translate a relational activity code; `None` for codes this crate doesn't know
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(ActivityKind::Manufacturing),
            3 => Some(ActivityKind::ResearchTime),
            4 => Some(ActivityKind::ResearchMaterial),
            5 => Some(ActivityKind::Copying),
            8 => Some(ActivityKind::Invention),
            11 => Some(ActivityKind::Reactions),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            ActivityKind::Manufacturing => 1,
            ActivityKind::ResearchTime => 3,
            ActivityKind::ResearchMaterial => 4,
            ActivityKind::Copying => 5,
            ActivityKind::Invention => 8,
            ActivityKind::Reactions => 11,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ActivityKind::Manufacturing => "manufacturing",
            ActivityKind::ResearchTime => "research_time",
            ActivityKind::ResearchMaterial => "research_material",
            ActivityKind::Copying => "copying",
            ActivityKind::Invention => "invention",
            ActivityKind::Reactions => "reaction",
        }
    }

    /// Inverse of [`ActivityKind::name`], as keyed in the hierarchical export
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

/// Identifies one activity of one blueprint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ActivityKey {
    pub blueprint: TypeId,
    pub kind: ActivityKind,
}

/// A blueprint recipe for a single activity kind
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndustryActivity {
    pub blueprint_id: TypeId,
    pub kind: ActivityKind,
    /// Duration in seconds
    pub time: i32,
    pub materials: IndexMap<TypeId, i32>,
    pub products: IndexMap<TypeId, i32>,
    /// Invention success chance per product
    pub probabilities: IndexMap<TypeId, f64>,
    /// Required skill type -> level
    pub skills: IndexMap<TypeId, i32>,
}

impl IndustryActivity {
    pub fn new(blueprint_id: TypeId, kind: ActivityKind, time: i32) -> Self {
        Self {
            blueprint_id,
            kind,
            time,
            materials: IndexMap::new(),
            products: IndexMap::new(),
            probabilities: IndexMap::new(),
            skills: IndexMap::new(),
        }
    }

    pub fn key(&self) -> ActivityKey {
        ActivityKey {
            blueprint: self.blueprint_id,
            kind: self.kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketGroup {
    pub id: MarketGroupId,
    pub parent_id: Option<MarketGroupId>,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Region {
    pub id: RegionId,
    pub name: String,
    pub center: [f64; 3],
    pub min: [f64; 3],
    pub max: [f64; 3],
    pub faction_id: Option<FactionId>,
    pub wormhole_class: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Constellation {
    pub id: ConstellationId,
    pub region_id: RegionId,
    pub name: String,
    pub center: [f64; 3],
    pub min: [f64; 3],
    pub max: [f64; 3],
    pub faction_id: Option<FactionId>,
    pub wormhole_class: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolarSystem {
    pub id: SolarSystemId,
    pub region_id: RegionId,
    pub constellation_id: ConstellationId,
    pub name: String,
    pub center: [f64; 3],
    pub security: f64,
    pub faction_id: Option<FactionId>,
    pub sun_type_id: Option<TypeId>,
    pub wormhole_class: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Faction {
    pub id: FactionId,
    pub name: String,
    pub icon_id: Option<IconId>,
}

/// Planetary production recipe; exactly one output per schematic
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanetSchematic {
    pub id: SchematicId,
    /// Seconds per cycle
    pub cycle_time: i32,
    pub output_type_id: TypeId,
    pub output_quantity: i32,
    pub inputs: IndexMap<TypeId, i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetaGroup {
    pub id: MetaGroupId,
    pub name: String,
}

/// Services offered by an NPC station
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum StationService {
    Reprocessing,
    Market,
    CloneBay,
    RepairShop,
    Industry,
    Fitting,
    Insurance,
    LpStore,
    MilitiaOffice,
}

impl StationService {
    /// Unknown service codes map to `None` and are dropped by the readers
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            5 => Some(StationService::Reprocessing),
            7 => Some(StationService::Market),
            10 => Some(StationService::CloneBay),
            13 => Some(StationService::RepairShop),
            14 => Some(StationService::Industry),
            17 => Some(StationService::Fitting),
            21 => Some(StationService::Insurance),
            25 => Some(StationService::LpStore),
            26 => Some(StationService::MilitiaOffice),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Station {
    pub id: ItemId,
    pub type_id: TypeId,
    pub name: String,
    pub operation_id: i32,
    pub services: Vec<StationService>,
}

/// A planet, moon, asteroid belt, star or other fixed object in a solar system
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Celestial {
    pub item_id: ItemId,
    pub type_id: TypeId,
    pub group_id: GroupId,
    pub name: String,
    pub celestial_index: Option<i32>,
    pub orbit_index: Option<i32>,
}

/// Skill-key used by the relational export for role bonuses
pub const ROLE_BONUS_KEY: i32 = -1;
/// Skill-key used by the relational export for miscellaneous bonuses
pub const MISC_BONUS_KEY: i32 = -2;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraitBonus {
    pub amount: Option<f64>,
    pub text: String,
    pub unit_id: Option<UnitId>,
}

/// Ship/module bonus text, grouped by the skill that scales it
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TypeTraits {
    pub role_bonuses: Vec<TraitBonus>,
    pub misc_bonuses: Vec<TraitBonus>,
    pub skill_bonuses: IndexMap<TypeId, Vec<TraitBonus>>,
}

impl TypeTraits {
    /// File a bonus under the relational export's skill key convention
    pub fn push(&mut self, skill_key: i32, bonus: TraitBonus) {
        match skill_key {
            ROLE_BONUS_KEY => self.role_bonuses.push(bonus),
            MISC_BONUS_KEY => self.misc_bonuses.push(bonus),
            skill => self.skill_bonuses.entry(skill).or_default().push(bonus),
        }
    }
}
