//! Reader for the relational (SQLite) conversion of the static data export

use std::path::{Path, PathBuf};

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, Row};
use tracing::{debug, info};

use super::SdeSource;
use crate::error::{Error, Result};
use crate::schema::*;

/// One fixed query, with the column indices that must never be null
#[derive(Debug, Clone)]
pub struct QuerySpec {
    pub name: &'static str,
    pub required: &'static [usize],
    pub sql: &'static str,
}

impl QuerySpec {
    pub const fn new(name: &'static str, required: &'static [usize], sql: &'static str) -> Self {
        Self {
            name,
            required,
            sql,
        }
    }
}

// =============================================================================
// Item taxonomy
// =============================================================================

pub static CATEGORIES: QuerySpec = QuerySpec::new(
    "categories",
    &[0, 1, 3],
    "SELECT categoryID, categoryName, iconID, published
     FROM invCategories
     ORDER BY categoryID",
);

pub static GROUPS: QuerySpec = QuerySpec::new(
    "groups",
    &[0, 1, 2, 4],
    "SELECT groupID, categoryID, groupName, iconID, published
     FROM invGroups
     ORDER BY groupID",
);

pub static TYPES: QuerySpec = QuerySpec::new(
    "types",
    &[0, 1, 2, 4, 5, 6, 7],
    "SELECT typeID, groupID, typeName, description, mass, volume, capacity,
            published, iconID, graphicID, marketGroupID
     FROM invTypes
     ORDER BY typeID",
);

pub static TRAITS: QuerySpec = QuerySpec::new(
    "traits",
    &[0, 1, 3],
    "SELECT typeID, skillID, bonus, bonusText, unitID
     FROM invTraits",
);

pub static ICONS: QuerySpec = QuerySpec::new(
    "icons",
    &[0, 1],
    "SELECT iconID, iconFile
     FROM eveIcons
     ORDER BY iconID",
);

pub static MARKET_GROUPS: QuerySpec = QuerySpec::new(
    "market_groups",
    &[0, 2],
    "SELECT marketGroupID, parentGroupID, marketGroupName, description
     FROM invMarketGroups
     ORDER BY marketGroupID",
);

pub static META_GROUPS: QuerySpec = QuerySpec::new(
    "meta_groups",
    &[0, 1],
    "SELECT metaGroupID, metaGroupName
     FROM invMetaGroups
     ORDER BY metaGroupID",
);

/// Rows without a parent sort first, so family roots are seen before their variants
pub static META_TYPES: QuerySpec = QuerySpec::new(
    "meta_types",
    &[0, 2],
    "SELECT typeID, parentTypeID, metaGroupID
     FROM invMetaTypes
     ORDER BY parentTypeID, typeID",
);

// =============================================================================
// Dogma
// =============================================================================

pub static ATTRIBUTES: QuerySpec = QuerySpec::new(
    "attributes",
    &[0, 6, 7],
    "SELECT attributeID, categoryID, attributeName, displayName, unitID, iconID,
            published, highIsGood
     FROM dgmAttributeTypes
     ORDER BY attributeID",
);

pub static TYPE_ATTRIBUTES: QuerySpec = QuerySpec::new(
    "type_attributes",
    &[0, 1, 2],
    "SELECT typeID, attributeID, coalesce(valueFloat, valueInt)
     FROM dgmTypeAttributes
     ORDER BY typeID, attributeID",
);

pub static EFFECTS: QuerySpec = QuerySpec::new(
    "effects",
    &[0, 1],
    "SELECT effectID, effectName
     FROM dgmEffects
     ORDER BY effectID",
);

pub static TYPE_EFFECTS: QuerySpec = QuerySpec::new(
    "type_effects",
    &[0, 1],
    "SELECT typeID, effectID
     FROM dgmTypeEffects
     ORDER BY typeID, effectID",
);

// =============================================================================
// Industry
// =============================================================================

pub static ACTIVITIES: QuerySpec = QuerySpec::new(
    "industry_activities",
    &[0, 1, 2],
    "SELECT typeID, activityID, time
     FROM industryActivity
     ORDER BY typeID, activityID",
);

pub static ACTIVITY_MATERIALS: QuerySpec = QuerySpec::new(
    "industry_activity_materials",
    &[0, 1, 2, 3],
    "SELECT typeID, activityID, materialTypeID, quantity
     FROM industryActivityMaterials
     ORDER BY typeID",
);

pub static ACTIVITY_PRODUCTS: QuerySpec = QuerySpec::new(
    "industry_activity_products",
    &[0, 1, 2, 3],
    "SELECT typeID, activityID, productTypeID, quantity
     FROM industryActivityProducts
     ORDER BY typeID",
);

pub static ACTIVITY_PROBABILITIES: QuerySpec = QuerySpec::new(
    "industry_activity_probabilities",
    &[0, 1, 2, 3],
    "SELECT typeID, activityID, productTypeID, probability
     FROM industryActivityProbabilities
     ORDER BY typeID",
);

pub static ACTIVITY_SKILLS: QuerySpec = QuerySpec::new(
    "industry_activity_skills",
    &[0, 1, 2, 3],
    "SELECT typeID, activityID, skillID, level
     FROM industryActivitySkills
     ORDER BY typeID",
);

pub static TYPE_MATERIALS: QuerySpec = QuerySpec::new(
    "type_materials",
    &[0, 1, 2],
    "SELECT typeID, materialTypeID, quantity
     FROM invTypeMaterials
     ORDER BY typeID",
);

pub static SCHEMATIC_OUTPUTS: QuerySpec = QuerySpec::new(
    "planet_schematic_outputs",
    &[0, 1, 2, 3],
    "SELECT planetSchematics.schematicID, cycleTime, typeID, quantity
     FROM planetSchematics
     JOIN planetSchematicsTypeMap
       ON planetSchematics.schematicID = planetSchematicsTypeMap.schematicID
     WHERE isInput = 0
     ORDER BY planetSchematics.schematicID",
);

pub static SCHEMATIC_INPUTS: QuerySpec = QuerySpec::new(
    "planet_schematic_inputs",
    &[0, 1, 2],
    "SELECT schematicID, typeID, quantity
     FROM planetSchematicsTypeMap
     WHERE isInput = 1
     ORDER BY schematicID",
);

// =============================================================================
// Map
// =============================================================================

pub static REGIONS: QuerySpec = QuerySpec::new(
    "regions",
    &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10],
    "SELECT regionID, regionName, x, y, z, xMin, yMin, zMin, xMax, yMax, zMax,
            factionID, regionClasses.wormholeClassID
     FROM mapRegions
     LEFT JOIN mapLocationWormholeClasses AS regionClasses
       ON regionClasses.locationID = regionID
     ORDER BY regionID",
);

pub static CONSTELLATIONS: QuerySpec = QuerySpec::new(
    "constellations",
    &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11],
    "SELECT regionID, constellationID, constellationName, x, y, z,
            xMin, yMin, zMin, xMax, yMax, zMax, factionID,
            coalesce(constellationClasses.wormholeClassID, regionClasses.wormholeClassID)
     FROM mapConstellations
     LEFT JOIN mapLocationWormholeClasses AS constellationClasses
       ON constellationClasses.locationID = constellationID
     LEFT JOIN mapLocationWormholeClasses AS regionClasses
       ON regionClasses.locationID = regionID
     ORDER BY constellationID",
);

pub static SOLAR_SYSTEMS: QuerySpec = QuerySpec::new(
    "solar_systems",
    &[0, 1, 2, 3, 4, 5, 6, 7],
    "SELECT regionID, constellationID, solarSystemID, solarSystemName, x, y, z,
            security, factionID, sunTypeID,
            coalesce(systemClasses.wormholeClassID, constellationClasses.wormholeClassID,
                     regionClasses.wormholeClassID)
     FROM mapSolarSystems
     LEFT JOIN mapLocationWormholeClasses AS systemClasses
       ON systemClasses.locationID = solarSystemID
     LEFT JOIN mapLocationWormholeClasses AS constellationClasses
       ON constellationClasses.locationID = constellationID
     LEFT JOIN mapLocationWormholeClasses AS regionClasses
       ON regionClasses.locationID = regionID
     ORDER BY solarSystemID",
);

pub static JUMPS: QuerySpec = QuerySpec::new(
    "jumps",
    &[0, 1],
    "SELECT fromSolarSystemID, toSolarSystemID
     FROM mapSolarSystemJumps
     ORDER BY fromSolarSystemID, toSolarSystemID",
);

/// Everything with a solar system except stargates (group 10) and stations (group 15)
pub static CELESTIALS: QuerySpec = QuerySpec::new(
    "celestials",
    &[0, 1, 2, 3, 4],
    "SELECT itemID, typeID, groupID, solarSystemID, itemName, celestialIndex, orbitIndex
     FROM mapDenormalize
     WHERE solarSystemID IS NOT NULL AND groupID IS NOT 10 AND groupID IS NOT 15
     ORDER BY solarSystemID, itemID",
);

pub static STATION_SERVICES: QuerySpec = QuerySpec::new(
    "station_services",
    &[0, 1],
    "SELECT operationID, serviceID
     FROM staOperationServices
     ORDER BY operationID, serviceID",
);

pub static STATIONS: QuerySpec = QuerySpec::new(
    "stations",
    &[0, 1, 2, 3, 4],
    "SELECT stationID, operationID, stationTypeID, solarSystemID, stationName
     FROM staStations
     ORDER BY solarSystemID, stationID",
);

pub static FACTIONS: QuerySpec = QuerySpec::new(
    "factions",
    &[0, 1],
    "SELECT factionID, factionName, iconID
     FROM chrFactions
     ORDER BY factionID",
);

/// All queries, in execution order
pub static ALL_QUERIES: &[&QuerySpec] = &[
    &CATEGORIES,
    &GROUPS,
    &TYPES,
    &TRAITS,
    &ICONS,
    &MARKET_GROUPS,
    &META_GROUPS,
    &META_TYPES,
    &ATTRIBUTES,
    &TYPE_ATTRIBUTES,
    &EFFECTS,
    &TYPE_EFFECTS,
    &ACTIVITIES,
    &ACTIVITY_MATERIALS,
    &ACTIVITY_PRODUCTS,
    &ACTIVITY_PROBABILITIES,
    &ACTIVITY_SKILLS,
    &TYPE_MATERIALS,
    &SCHEMATIC_OUTPUTS,
    &SCHEMATIC_INPUTS,
    &REGIONS,
    &CONSTELLATIONS,
    &SOLAR_SYSTEMS,
    &JUMPS,
    &CELESTIALS,
    &STATION_SERVICES,
    &STATIONS,
    &FACTIONS,
];

/// Get query by name
pub fn get_query(name: &str) -> Option<&'static QuerySpec> {
    ALL_QUERIES.iter().find(|q| q.name == name).copied()
}

/// Get all query names
pub fn query_names() -> Vec<&'static str> {
    ALL_QUERIES.iter().map(|q| q.name).collect()
}

/// Run `spec`, checking its non-null columns on every row before handing it to `map`
fn each_row(
    conn: &Connection,
    spec: &'static QuerySpec,
    mut map: impl FnMut(&Row<'_>) -> Result<()>,
) -> Result<usize> {
    let mut stmt = conn.prepare(spec.sql)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let mut rows = stmt.query([])?;
    let mut count = 0;

    while let Some(row) = rows.next()? {
        for &column in spec.required {
            if matches!(row.get_ref(column)?, ValueRef::Null) {
                return Err(Error::schema(
                    spec.name,
                    format!("column {} is null in row {}", columns[column], count + 1),
                ));
            }
        }
        map(row)?;
        count += 1;
    }

    debug!(query = spec.name, rows = count, "query complete");
    Ok(count)
}

fn activity_kind(spec: &QuerySpec, code: i32) -> Result<ActivityKind> {
    ActivityKind::from_code(code)
        .ok_or_else(|| Error::schema(spec.name, format!("unknown activity code {code}")))
}

/// Look up the activity a material/product/skill row belongs to
fn declared_activity<'a>(
    tables: &'a mut RawTables,
    spec: &QuerySpec,
    blueprint: TypeId,
    code: i32,
) -> Result<&'a mut IndustryActivity> {
    let kind = activity_kind(spec, code)?;
    tables
        .industry_activities
        .get_mut(&blueprint)
        .and_then(|activities| activities.get_mut(&kind))
        .ok_or_else(|| {
            Error::schema(
                spec.name,
                format!("row for undeclared activity {blueprint}:{kind:?}"),
            )
        })
}

/// Read every table from an open connection
pub fn read_connection(conn: &Connection) -> Result<RawTables> {
    let mut t = RawTables::new();

    each_row(conn, &CATEGORIES, |row| {
        let id = row.get(0)?;
        t.categories.insert(
            id,
            Category {
                id,
                name: row.get(1)?,
                icon_id: row.get(2)?,
                published: row.get(3)?,
            },
        );
        Ok(())
    })?;

    each_row(conn, &GROUPS, |row| {
        let id = row.get(0)?;
        t.groups.insert(
            id,
            Group {
                id,
                category_id: row.get(1)?,
                name: row.get(2)?,
                icon_id: row.get(3)?,
                published: row.get(4)?,
            },
        );
        Ok(())
    })?;

    each_row(conn, &TYPES, |row| {
        let id = row.get(0)?;
        t.types.insert(
            id,
            Type {
                id,
                group_id: row.get(1)?,
                name: row.get(2)?,
                description: row.get(3)?,
                mass: row.get(4)?,
                volume: row.get(5)?,
                capacity: row.get(6)?,
                published: row.get(7)?,
                icon_id: row.get(8)?,
                graphic_id: row.get(9)?,
                market_group_id: row.get(10)?,
            },
        );
        Ok(())
    })?;

    each_row(conn, &TRAITS, |row| {
        let bonus = TraitBonus {
            amount: row.get(2)?,
            text: row.get(3)?,
            unit_id: row.get(4)?,
        };
        t.type_traits
            .entry(row.get(0)?)
            .or_default()
            .push(row.get(1)?, bonus);
        Ok(())
    })?;

    each_row(conn, &ICONS, |row| {
        t.icons.insert(row.get(0)?, row.get(1)?);
        Ok(())
    })?;

    each_row(conn, &MARKET_GROUPS, |row| {
        let id = row.get(0)?;
        t.market_groups.insert(
            id,
            MarketGroup {
                id,
                parent_id: row.get(1)?,
                name: row.get(2)?,
                description: row.get(3)?,
            },
        );
        Ok(())
    })?;

    each_row(conn, &META_GROUPS, |row| {
        let id = row.get(0)?;
        t.meta_groups.insert(id, MetaGroup { id, name: row.get(1)? });
        Ok(())
    })?;

    each_row(conn, &META_TYPES, |row| {
        let ty: TypeId = row.get(0)?;
        if let Some(parent) = row.get::<_, Option<TypeId>>(1)? {
            t.variants.join(parent, ty);
        }
        t.meta_types.insert(ty, row.get(2)?);
        Ok(())
    })?;
    t.variants.prune_singletons();

    each_row(conn, &ATTRIBUTES, |row| {
        let id = row.get(0)?;
        t.attributes.insert(
            id,
            Attribute {
                id,
                category_id: row.get(1)?,
                attribute_name: row.get(2)?,
                display_name: row.get(3)?,
                unit_id: row.get(4)?,
                icon_id: row.get(5)?,
                published: row.get(6)?,
                high_is_good: row.get(7)?,
            },
        );
        Ok(())
    })?;

    each_row(conn, &TYPE_ATTRIBUTES, |row| {
        t.type_attributes
            .entry(row.get(0)?)
            .or_default()
            .insert(row.get(1)?, row.get(2)?);
        Ok(())
    })?;

    each_row(conn, &EFFECTS, |row| {
        let id = row.get(0)?;
        t.effects.insert(id, Effect { id, name: row.get(1)? });
        Ok(())
    })?;

    each_row(conn, &TYPE_EFFECTS, |row| {
        t.type_effects
            .entry(row.get(0)?)
            .or_default()
            .insert(row.get(1)?);
        Ok(())
    })?;

    each_row(conn, &ACTIVITIES, |row| {
        let blueprint = row.get(0)?;
        let kind = activity_kind(&ACTIVITIES, row.get(1)?)?;
        t.industry_activities
            .entry(blueprint)
            .or_default()
            .insert(kind, IndustryActivity::new(blueprint, kind, row.get(2)?));
        Ok(())
    })?;

    each_row(conn, &ACTIVITY_MATERIALS, |row| {
        declared_activity(&mut t, &ACTIVITY_MATERIALS, row.get(0)?, row.get(1)?)?
            .materials
            .insert(row.get(2)?, row.get(3)?);
        Ok(())
    })?;

    each_row(conn, &ACTIVITY_PRODUCTS, |row| {
        declared_activity(&mut t, &ACTIVITY_PRODUCTS, row.get(0)?, row.get(1)?)?
            .products
            .insert(row.get(2)?, row.get(3)?);
        Ok(())
    })?;

    each_row(conn, &ACTIVITY_PROBABILITIES, |row| {
        declared_activity(&mut t, &ACTIVITY_PROBABILITIES, row.get(0)?, row.get(1)?)?
            .probabilities
            .insert(row.get(2)?, row.get(3)?);
        Ok(())
    })?;

    each_row(conn, &ACTIVITY_SKILLS, |row| {
        declared_activity(&mut t, &ACTIVITY_SKILLS, row.get(0)?, row.get(1)?)?
            .skills
            .insert(row.get(2)?, row.get(3)?);
        Ok(())
    })?;

    each_row(conn, &TYPE_MATERIALS, |row| {
        t.reprocessing_materials
            .entry(row.get(0)?)
            .or_default()
            .insert(row.get(1)?, row.get(2)?);
        Ok(())
    })?;

    each_row(conn, &SCHEMATIC_OUTPUTS, |row| {
        let id = row.get(0)?;
        let schematic = PlanetSchematic {
            id,
            cycle_time: row.get(1)?,
            output_type_id: row.get(2)?,
            output_quantity: row.get(3)?,
            inputs: Default::default(),
        };
        if t.planet_schematics.insert(id, schematic).is_some() {
            return Err(Error::schema(
                SCHEMATIC_OUTPUTS.name,
                format!("schematic {id} has more than one output"),
            ));
        }
        Ok(())
    })?;

    each_row(conn, &SCHEMATIC_INPUTS, |row| {
        let id: SchematicId = row.get(0)?;
        t.planet_schematics
            .get_mut(&id)
            .ok_or_else(|| {
                Error::schema(SCHEMATIC_INPUTS.name, format!("inputs for unknown schematic {id}"))
            })?
            .inputs
            .insert(row.get(1)?, row.get(2)?);
        Ok(())
    })?;

    each_row(conn, &REGIONS, |row| {
        let id = row.get(0)?;
        t.regions.insert(
            id,
            Region {
                id,
                name: row.get(1)?,
                center: [row.get(2)?, row.get(3)?, row.get(4)?],
                min: [row.get(5)?, row.get(6)?, row.get(7)?],
                max: [row.get(8)?, row.get(9)?, row.get(10)?],
                faction_id: row.get(11)?,
                wormhole_class: row.get(12)?,
            },
        );
        Ok(())
    })?;

    each_row(conn, &CONSTELLATIONS, |row| {
        let id = row.get(1)?;
        t.constellations.insert(
            id,
            Constellation {
                id,
                region_id: row.get(0)?,
                name: row.get(2)?,
                center: [row.get(3)?, row.get(4)?, row.get(5)?],
                min: [row.get(6)?, row.get(7)?, row.get(8)?],
                max: [row.get(9)?, row.get(10)?, row.get(11)?],
                faction_id: row.get(12)?,
                wormhole_class: row.get(13)?,
            },
        );
        Ok(())
    })?;

    each_row(conn, &SOLAR_SYSTEMS, |row| {
        let id = row.get(2)?;
        t.solar_systems.insert(
            id,
            SolarSystem {
                id,
                region_id: row.get(0)?,
                constellation_id: row.get(1)?,
                name: row.get(3)?,
                center: [row.get(4)?, row.get(5)?, row.get(6)?],
                security: row.get(7)?,
                faction_id: row.get(8)?,
                sun_type_id: row.get(9)?,
                wormhole_class: row.get(10)?,
            },
        );
        Ok(())
    })?;

    each_row(conn, &JUMPS, |row| {
        t.add_jump(row.get(0)?, row.get(1)?);
        Ok(())
    })?;

    each_row(conn, &CELESTIALS, |row| {
        let celestial = Celestial {
            item_id: row.get(0)?,
            type_id: row.get(1)?,
            group_id: row.get(2)?,
            name: row.get(4)?,
            celestial_index: row.get(5)?,
            orbit_index: row.get(6)?,
        };
        t.celestials.entry(row.get(3)?).or_default().push(celestial);
        Ok(())
    })?;

    let mut services: indexmap::IndexMap<i32, Vec<StationService>> = Default::default();
    each_row(conn, &STATION_SERVICES, |row| {
        if let Some(service) = StationService::from_code(row.get(1)?) {
            services.entry(row.get(0)?).or_default().push(service);
        }
        Ok(())
    })?;

    each_row(conn, &STATIONS, |row| {
        let operation_id: i32 = row.get(1)?;
        let station = Station {
            id: row.get(0)?,
            type_id: row.get(2)?,
            name: row.get(4)?,
            operation_id,
            services: services.get(&operation_id).cloned().unwrap_or_default(),
        };
        t.stations.entry(row.get(3)?).or_default().push(station);
        Ok(())
    })?;

    each_row(conn, &FACTIONS, |row| {
        let id = row.get(0)?;
        t.factions.insert(
            id,
            Faction {
                id,
                name: row.get(1)?,
                icon_id: row.get(2)?,
            },
        );
        Ok(())
    })?;

    Ok(t)
}

/// Relational source backed by an SQLite file
#[derive(Debug, Clone)]
pub struct SqliteSource {
    path: PathBuf,
}

impl SqliteSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SdeSource for SqliteSource {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn read(&self) -> Result<RawTables> {
        info!(path = %self.path.display(), "Reading relational export");
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        read_connection(&conn)
    }
}
