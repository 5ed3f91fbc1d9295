//! Serde models for the hierarchical export's documents.
//!
//! Only the fields the load pipeline uses are modelled; anything else in a
//! document is ignored.

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::schema::*;

/// Multi-language text; only English is read
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocalizedString {
    #[serde(default)]
    pub en: Option<String>,
}

impl LocalizedString {
    pub fn english(&self, context: impl FnOnce() -> String) -> Result<String> {
        self.en
            .clone()
            .ok_or_else(|| Error::schema(context(), "missing English text"))
    }
}

// =============================================================================
// Item taxonomy
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct SdeCategory {
    pub name: LocalizedString,
    pub published: bool,
    #[serde(rename = "iconID")]
    pub icon_id: Option<IconId>,
}

impl SdeCategory {
    pub fn into_category(self, id: CategoryId) -> Result<Category> {
        Ok(Category {
            id,
            name: self.name.english(|| format!("category {id}"))?,
            icon_id: self.icon_id,
            published: self.published,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct SdeGroup {
    #[serde(rename = "categoryID")]
    pub category_id: CategoryId,
    pub name: LocalizedString,
    pub published: bool,
    #[serde(rename = "iconID")]
    pub icon_id: Option<IconId>,
}

impl SdeGroup {
    pub fn into_group(self, id: GroupId) -> Result<Group> {
        Ok(Group {
            id,
            category_id: self.category_id,
            name: self.name.english(|| format!("group {id}"))?,
            icon_id: self.icon_id,
            published: self.published,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct SdeTraitBonus {
    pub bonus: Option<f64>,
    #[serde(rename = "bonusText")]
    pub bonus_text: LocalizedString,
    #[serde(default)]
    pub importance: i32,
    #[serde(rename = "unitID")]
    pub unit_id: Option<UnitId>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SdeTraits {
    #[serde(rename = "roleBonuses", default)]
    pub role_bonuses: Vec<SdeTraitBonus>,
    #[serde(rename = "miscBonuses", default)]
    pub misc_bonuses: Vec<SdeTraitBonus>,
    #[serde(default)]
    pub types: IndexMap<TypeId, Vec<SdeTraitBonus>>,
}

impl SdeTraits {
    pub fn into_traits(self, type_id: TypeId) -> Result<TypeTraits> {
        let convert = |mut bonuses: Vec<SdeTraitBonus>| -> Result<Vec<TraitBonus>> {
            bonuses.sort_by_key(|b| b.importance);
            bonuses
                .into_iter()
                .map(|b| {
                    Ok(TraitBonus {
                        amount: b.bonus,
                        text: b.bonus_text.english(|| format!("traits of type {type_id}"))?,
                        unit_id: b.unit_id,
                    })
                })
                .collect()
        };

        let mut traits = TypeTraits {
            role_bonuses: convert(self.role_bonuses)?,
            misc_bonuses: convert(self.misc_bonuses)?,
            skill_bonuses: IndexMap::new(),
        };
        for (skill, bonuses) in self.types {
            traits.skill_bonuses.insert(skill, convert(bonuses)?);
        }
        Ok(traits)
    }
}

#[derive(Debug, Deserialize)]
pub struct SdeType {
    #[serde(rename = "groupID")]
    pub group_id: GroupId,
    pub name: LocalizedString,
    pub description: Option<LocalizedString>,
    pub published: bool,
    #[serde(default)]
    pub mass: f64,
    #[serde(default)]
    pub volume: f64,
    #[serde(default)]
    pub capacity: f64,
    #[serde(rename = "iconID")]
    pub icon_id: Option<IconId>,
    #[serde(rename = "graphicID")]
    pub graphic_id: Option<i32>,
    #[serde(rename = "marketGroupID")]
    pub market_group_id: Option<MarketGroupId>,
    #[serde(rename = "metaGroupID")]
    pub meta_group_id: Option<MetaGroupId>,
    #[serde(rename = "variationParentTypeID")]
    pub variation_parent_type_id: Option<TypeId>,
    pub traits: Option<SdeTraits>,
}

impl SdeType {
    pub fn to_type(&self, id: TypeId) -> Result<Type> {
        Ok(Type {
            id,
            group_id: self.group_id,
            name: self.name.english(|| format!("type {id}"))?,
            description: self.description.as_ref().and_then(|d| d.en.clone()),
            mass: self.mass,
            volume: self.volume,
            capacity: self.capacity,
            published: self.published,
            icon_id: self.icon_id,
            graphic_id: self.graphic_id,
            market_group_id: self.market_group_id,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct SdeIcon {
    #[serde(rename = "iconFile")]
    pub icon_file: String,
}

#[derive(Debug, Deserialize)]
pub struct SdeMarketGroup {
    #[serde(rename = "nameID")]
    pub name: LocalizedString,
    #[serde(rename = "descriptionID")]
    pub description: Option<LocalizedString>,
    #[serde(rename = "parentGroupID")]
    pub parent_group_id: Option<MarketGroupId>,
}

impl SdeMarketGroup {
    pub fn into_market_group(self, id: MarketGroupId) -> Result<MarketGroup> {
        Ok(MarketGroup {
            id,
            parent_id: self.parent_group_id,
            name: self.name.english(|| format!("market group {id}"))?,
            description: self.description.and_then(|d| d.en),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct SdeMetaGroup {
    #[serde(rename = "nameID")]
    pub name: LocalizedString,
}

#[derive(Debug, Deserialize)]
pub struct SdeFaction {
    #[serde(rename = "nameID")]
    pub name: LocalizedString,
    #[serde(rename = "iconID")]
    pub icon_id: Option<IconId>,
}

// =============================================================================
// Dogma
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct SdeAttribute {
    #[serde(rename = "categoryID")]
    pub category_id: Option<i32>,
    pub name: Option<String>,
    #[serde(rename = "displayNameID")]
    pub display_name: Option<LocalizedString>,
    #[serde(rename = "unitID")]
    pub unit_id: Option<UnitId>,
    #[serde(rename = "iconID")]
    pub icon_id: Option<IconId>,
    pub published: bool,
    #[serde(rename = "highIsGood")]
    pub high_is_good: bool,
}

impl SdeAttribute {
    pub fn into_attribute(self, id: AttributeId) -> Attribute {
        Attribute {
            id,
            category_id: self.category_id,
            attribute_name: self.name,
            display_name: self.display_name.and_then(|d| d.en),
            unit_id: self.unit_id,
            icon_id: self.icon_id,
            published: self.published,
            high_is_good: self.high_is_good,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SdeEffect {
    #[serde(rename = "effectName")]
    pub effect_name: String,
}

#[derive(Debug, Deserialize)]
pub struct SdeAttributeValue {
    #[serde(rename = "attributeID")]
    pub attribute_id: AttributeId,
    pub value: f64,
}

#[derive(Debug, Deserialize)]
pub struct SdeEffectRef {
    #[serde(rename = "effectID")]
    pub effect_id: EffectId,
}

#[derive(Debug, Deserialize)]
pub struct SdeTypeDogma {
    #[serde(rename = "dogmaAttributes", default)]
    pub attributes: Vec<SdeAttributeValue>,
    #[serde(rename = "dogmaEffects", default)]
    pub effects: Vec<SdeEffectRef>,
}

// =============================================================================
// Industry
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct SdeQuantity {
    #[serde(rename = "typeID")]
    pub type_id: TypeId,
    pub quantity: i32,
    pub probability: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct SdeSkill {
    #[serde(rename = "typeID")]
    pub type_id: TypeId,
    pub level: i32,
}

#[derive(Debug, Deserialize)]
pub struct SdeActivity {
    pub time: i32,
    #[serde(default)]
    pub materials: Vec<SdeQuantity>,
    #[serde(default)]
    pub products: Vec<SdeQuantity>,
    #[serde(default)]
    pub skills: Vec<SdeSkill>,
}

#[derive(Debug, Deserialize)]
pub struct SdeBlueprint {
    #[serde(rename = "blueprintTypeID")]
    pub blueprint_type_id: TypeId,
    #[serde(default)]
    pub activities: IndexMap<String, SdeActivity>,
}

impl SdeBlueprint {
    pub fn into_activities(self) -> Result<IndexMap<ActivityKind, IndustryActivity>> {
        let blueprint = self.blueprint_type_id;
        let context = || format!("blueprint {blueprint}");
        let mut activities = IndexMap::new();

        for (name, document) in self.activities {
            let kind = ActivityKind::from_name(&name)
                .ok_or_else(|| Error::schema(context(), format!("unknown activity {name}")))?;
            let mut activity = IndustryActivity::new(blueprint, kind, document.time);
            for material in document.materials {
                insert_unique(&mut activity.materials, material.type_id, material.quantity, context)?;
            }
            for product in document.products {
                insert_unique(&mut activity.products, product.type_id, product.quantity, context)?;
                if let Some(probability) = product.probability {
                    insert_unique(&mut activity.probabilities, product.type_id, probability, context)?;
                }
            }
            for skill in document.skills {
                insert_unique(&mut activity.skills, skill.type_id, skill.level, context)?;
            }
            activities.insert(kind, activity);
        }
        Ok(activities)
    }
}

#[derive(Debug, Deserialize)]
pub struct SdeMaterial {
    #[serde(rename = "materialTypeID")]
    pub material_type_id: TypeId,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct SdeTypeMaterials {
    #[serde(default)]
    pub materials: Vec<SdeMaterial>,
}

#[derive(Debug, Deserialize)]
pub struct SdeSchematicType {
    #[serde(rename = "isInput")]
    pub is_input: bool,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct SdePlanetSchematic {
    #[serde(rename = "cycleTime")]
    pub cycle_time: i32,
    #[serde(default)]
    pub types: IndexMap<TypeId, SdeSchematicType>,
}

impl SdePlanetSchematic {
    pub fn into_schematic(self, id: SchematicId) -> Result<PlanetSchematic> {
        let context = || format!("planet schematic {id}");
        let mut output = None;
        let mut inputs = IndexMap::new();
        for (type_id, entry) in self.types {
            if entry.is_input {
                insert_unique(&mut inputs, type_id, entry.quantity, context)?;
            } else if output.replace((type_id, entry.quantity)).is_some() {
                return Err(Error::schema(context(), "more than one output"));
            }
        }
        let (output_type_id, output_quantity) =
            output.ok_or_else(|| Error::schema(context(), "no output"))?;
        Ok(PlanetSchematic {
            id,
            cycle_time: self.cycle_time,
            output_type_id,
            output_quantity,
            inputs,
        })
    }
}

/// Repeated keys are tolerated only when they agree
pub fn insert_unique<V: PartialEq + std::fmt::Debug>(
    map: &mut IndexMap<TypeId, V>,
    key: TypeId,
    value: V,
    context: impl FnOnce() -> String,
) -> Result<()> {
    match map.get(&key) {
        Some(existing) if *existing != value => Err(Error::schema(
            context(),
            format!("conflicting entries for type {key}: {existing:?} and {value:?}"),
        )),
        Some(_) => Ok(()),
        None => {
            map.insert(key, value);
            Ok(())
        }
    }
}

// =============================================================================
// Stations and names
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct SdeStationOperation {
    #[serde(default)]
    pub services: Vec<i32>,
}

#[derive(Debug, Deserialize)]
pub struct SdeStation {
    #[serde(rename = "stationID")]
    pub station_id: ItemId,
    #[serde(rename = "stationName")]
    pub station_name: String,
    #[serde(rename = "stationTypeID")]
    pub station_type_id: TypeId,
    #[serde(rename = "solarSystemID")]
    pub solar_system_id: SolarSystemId,
    #[serde(rename = "operationID")]
    pub operation_id: i32,
}

#[derive(Debug, Deserialize)]
pub struct SdeItemName {
    #[serde(rename = "itemID")]
    pub item_id: ItemId,
    #[serde(rename = "itemName")]
    pub item_name: String,
}

// =============================================================================
// Universe
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct SdeRegion {
    #[serde(rename = "regionID")]
    pub region_id: RegionId,
    #[serde(rename = "nameID")]
    pub name_id: i32,
    pub center: [f64; 3],
    pub min: [f64; 3],
    pub max: [f64; 3],
    #[serde(rename = "factionID")]
    pub faction_id: Option<FactionId>,
    #[serde(rename = "wormholeClassID")]
    pub wormhole_class_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct SdeConstellation {
    #[serde(rename = "constellationID")]
    pub constellation_id: ConstellationId,
    #[serde(rename = "nameID")]
    pub name_id: i32,
    pub center: [f64; 3],
    pub min: [f64; 3],
    pub max: [f64; 3],
    #[serde(rename = "factionID")]
    pub faction_id: Option<FactionId>,
    #[serde(rename = "wormholeClassID")]
    pub wormhole_class_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct SdeSolarSystem {
    #[serde(rename = "solarSystemID")]
    pub solar_system_id: SolarSystemId,
    #[serde(rename = "solarSystemNameID")]
    pub name_id: i32,
    pub center: [f64; 3],
    pub security: f64,
    #[serde(rename = "factionID")]
    pub faction_id: Option<FactionId>,
    #[serde(rename = "sunTypeID")]
    pub sun_type_id: Option<TypeId>,
    #[serde(rename = "wormholeClassID")]
    pub wormhole_class_id: Option<i32>,
    #[serde(default)]
    pub planets: IndexMap<ItemId, SdePlanet>,
    #[serde(default)]
    pub stargates: IndexMap<ItemId, SdeStargate>,
    #[serde(rename = "secondarySun")]
    pub secondary_sun: Option<SdeSecondarySun>,
}

#[derive(Debug, Deserialize)]
pub struct SdePlanet {
    #[serde(rename = "planetNameID")]
    pub name_id: Option<i32>,
    #[serde(rename = "celestialIndex")]
    pub celestial_index: i32,
    #[serde(rename = "typeID")]
    pub type_id: TypeId,
    #[serde(rename = "asteroidBelts", default)]
    pub asteroid_belts: IndexMap<ItemId, SdeAsteroidBelt>,
    #[serde(default)]
    pub moons: IndexMap<ItemId, SdeMoon>,
}

#[derive(Debug, Deserialize)]
pub struct SdeAsteroidBelt {
    #[serde(rename = "asteroidBeltNameID")]
    pub name_id: Option<i32>,
    #[serde(rename = "typeID")]
    pub type_id: TypeId,
}

#[derive(Debug, Deserialize)]
pub struct SdeMoon {
    #[serde(rename = "moonNameID")]
    pub name_id: Option<i32>,
    #[serde(rename = "typeID")]
    pub type_id: TypeId,
}

#[derive(Debug, Deserialize)]
pub struct SdeStargate {
    pub destination: ItemId,
}

#[derive(Debug, Deserialize)]
pub struct SdeSecondarySun {
    #[serde(rename = "itemID")]
    pub item_id: ItemId,
    #[serde(rename = "typeID")]
    pub type_id: TypeId,
}
