//! Reader for the hierarchical (YAML) export.
//!
//! Every document is read by its own task on the [`Scheduler`]; the map
//! hierarchy runs as three chained stages (see [`universe`]). Results land
//! in shared tables that are sorted once the pool drains.

mod archive;
mod documents;
mod record;
mod universe;

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Instant;

use indexmap::{IndexMap, IndexSet};
use parking_lot::Mutex;
use tracing::{debug, info};

pub use archive::Archive;
pub use record::{Boundary, Records};

use self::documents::*;
use self::universe::Universe;
use super::SdeSource;
use crate::error::{Error, Result};
use crate::scheduler::{Scheduler, Spawner, Trace};
use crate::schema::*;

const CATEGORIES: &str = "fsd/categories.yaml";
const GROUPS: &str = "fsd/groups.yaml";
const TYPES: &str = "fsd/types.yaml";
const ICONS: &str = "fsd/iconIDs.yaml";
const MARKET_GROUPS: &str = "fsd/marketGroups.yaml";
const META_GROUPS: &str = "fsd/metaGroups.yaml";
const ATTRIBUTES: &str = "fsd/dogmaAttributes.yaml";
const EFFECTS: &str = "fsd/dogmaEffects.yaml";
const TYPE_DOGMA: &str = "fsd/typeDogma.yaml";
const BLUEPRINTS: &str = "fsd/blueprints.yaml";
const TYPE_MATERIALS: &str = "fsd/typeMaterials.yaml";
const PLANET_SCHEMATICS: &str = "fsd/planetSchematics.yaml";
const FACTIONS: &str = "fsd/factions.yaml";
const STATION_OPERATIONS: &str = "fsd/stationOperations.yaml";
const STATIONS: &str = "bsd/staStations.yaml";

/// Load the name table mapping name IDs to English text
pub fn read_localization(path: &Path) -> Result<HashMap<i32, String>> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

pub struct YamlSource {
    path: PathBuf,
    localization: PathBuf,
    workers: usize,
    trace: Option<Trace>,
}

impl YamlSource {
    pub fn new(path: impl Into<PathBuf>, localization: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            localization: localization.into(),
            workers: 4,
            trace: None,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Record the start order of every read task
    pub fn with_trace(mut self, trace: Trace) -> Self {
        self.trace = Some(trace);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn scheduler(&self) -> Scheduler {
        let scheduler = Scheduler::new(self.workers);
        match &self.trace {
            Some(trace) => scheduler.with_trace(trace.clone()),
            None => scheduler,
        }
    }
}

impl SdeSource for YamlSource {
    fn name(&self) -> &'static str {
        "yaml"
    }

    fn read(&self) -> Result<RawTables> {
        let start = Instant::now();
        let archive = Archive::open(&self.path)?;
        let localization = read_localization(&self.localization)?;
        debug!(names = localization.len(), "Localization table read");

        let tables = Mutex::new(RawTables::new());
        let universe = Universe::new(&archive, &localization);
        let scheduler = self.scheduler();
        info!(path = %self.path.display(), workers = scheduler.workers(), "Reading YAML export");

        scheduler.run(|spawner| seed(spawner, &archive, &tables, &universe))?;

        let mut tables = tables.into_inner();
        collect_universe(&mut tables, universe)?;
        tables.sort_by_id();
        info!(elapsed_ms = start.elapsed().as_millis() as u64, "YAML export read");
        Ok(tables)
    }
}

fn seed<'a>(
    spawner: &Spawner<'a>,
    archive: &'a Archive,
    tables: &'a Mutex<RawTables>,
    universe: &'a Universe<'a>,
) {
    spawner.spawn("universe", move |spawner| universe.bootstrap(spawner));

    spawner.spawn(CATEGORIES, move |_| {
        let documents: IndexMap<CategoryId, SdeCategory> = whole(archive, CATEGORIES)?;
        let mut categories = IndexMap::new();
        for (id, document) in documents {
            categories.insert(id, document.into_category(id)?);
        }
        tables.lock().categories = categories;
        Ok(())
    });

    spawner.spawn(GROUPS, move |_| {
        let documents: IndexMap<GroupId, SdeGroup> = whole(archive, GROUPS)?;
        let mut groups = IndexMap::new();
        for (id, document) in documents {
            groups.insert(id, document.into_group(id)?);
        }
        tables.lock().groups = groups;
        Ok(())
    });

    spawner.spawn(TYPES, move |_| read_types(archive, tables));

    spawner.spawn(ICONS, move |_| {
        let documents: IndexMap<IconId, SdeIcon> = whole(archive, ICONS)?;
        tables.lock().icons = documents
            .into_iter()
            .map(|(id, icon)| (id, icon.icon_file))
            .collect();
        Ok(())
    });

    spawner.spawn(MARKET_GROUPS, move |_| {
        let mut market_groups = IndexMap::new();
        split(archive, MARKET_GROUPS, |id, document: SdeMarketGroup| {
            market_groups.insert(id, document.into_market_group(id)?);
            Ok(())
        })?;
        tables.lock().market_groups = market_groups;
        Ok(())
    });

    spawner.spawn(META_GROUPS, move |_| {
        let documents: IndexMap<MetaGroupId, SdeMetaGroup> = whole(archive, META_GROUPS)?;
        let mut meta_groups = IndexMap::new();
        for (id, document) in documents {
            let name = document.name.english(|| format!("meta group {id}"))?;
            meta_groups.insert(id, MetaGroup { id, name });
        }
        tables.lock().meta_groups = meta_groups;
        Ok(())
    });

    spawner.spawn(FACTIONS, move |_| {
        let documents: IndexMap<FactionId, SdeFaction> = whole(archive, FACTIONS)?;
        let mut factions = IndexMap::new();
        for (id, document) in documents {
            let name = document.name.english(|| format!("faction {id}"))?;
            let icon_id = document.icon_id;
            factions.insert(id, Faction { id, name, icon_id });
        }
        tables.lock().factions = factions;
        Ok(())
    });

    spawner.spawn(ATTRIBUTES, move |_| {
        let mut attributes = IndexMap::new();
        split(archive, ATTRIBUTES, |id, document: SdeAttribute| {
            attributes.insert(id, document.into_attribute(id));
            Ok(())
        })?;
        tables.lock().attributes = attributes;
        Ok(())
    });

    spawner.spawn(EFFECTS, move |_| {
        let mut effects = IndexMap::new();
        split(archive, EFFECTS, |id, document: SdeEffect| {
            effects.insert(id, Effect { id, name: document.effect_name });
            Ok(())
        })?;
        tables.lock().effects = effects;
        Ok(())
    });

    spawner.spawn(TYPE_DOGMA, move |_| {
        let mut type_attributes = IndexMap::new();
        let mut type_effects = IndexMap::new();
        split(archive, TYPE_DOGMA, |id, document: SdeTypeDogma| {
            if !document.attributes.is_empty() {
                let values: IndexMap<AttributeId, f64> = document
                    .attributes
                    .into_iter()
                    .map(|a| (a.attribute_id, a.value))
                    .collect();
                type_attributes.insert(id, values);
            }
            if !document.effects.is_empty() {
                let effects: IndexSet<EffectId> =
                    document.effects.into_iter().map(|e| e.effect_id).collect();
                type_effects.insert(id, effects);
            }
            Ok(())
        })?;
        let mut tables = tables.lock();
        tables.type_attributes = type_attributes;
        tables.type_effects = type_effects;
        Ok(())
    });

    spawner.spawn(BLUEPRINTS, move |_| {
        let mut industry_activities = IndexMap::new();
        split(archive, BLUEPRINTS, |id, document: SdeBlueprint| {
            if document.blueprint_type_id != id {
                return Err(Error::schema(
                    BLUEPRINTS,
                    format!("record {id} names blueprint {}", document.blueprint_type_id),
                ));
            }
            let activities = document.into_activities()?;
            if !activities.is_empty() {
                industry_activities.insert(id, activities);
            }
            Ok(())
        })?;
        tables.lock().industry_activities = industry_activities;
        Ok(())
    });

    spawner.spawn(TYPE_MATERIALS, move |_| {
        let mut reprocessing = IndexMap::new();
        split(archive, TYPE_MATERIALS, |id, document: SdeTypeMaterials| {
            let mut materials = IndexMap::new();
            for material in document.materials {
                insert_unique(&mut materials, material.material_type_id, material.quantity, || {
                    format!("materials of type {id}")
                })?;
            }
            reprocessing.insert(id, materials);
            Ok(())
        })?;
        tables.lock().reprocessing_materials = reprocessing;
        Ok(())
    });

    spawner.spawn(PLANET_SCHEMATICS, move |_| {
        let mut schematics = IndexMap::new();
        split(archive, PLANET_SCHEMATICS, |id, document: SdePlanetSchematic| {
            schematics.insert(id, document.into_schematic(id)?);
            Ok(())
        })?;
        tables.lock().planet_schematics = schematics;
        Ok(())
    });

    spawner.spawn(STATIONS, move |_| read_stations(archive, tables));
}

fn whole<T: serde::de::DeserializeOwned>(archive: &Archive, document: &str) -> Result<T> {
    let text = archive.read_to_string(document)?;
    let parsed = record::parse_whole(&text, document)?;
    debug!(document, "Document parsed");
    Ok(parsed)
}

fn split<T: serde::de::DeserializeOwned>(
    archive: &Archive,
    document: &str,
    f: impl FnMut(i32, T) -> Result<()>,
) -> Result<usize> {
    let count = archive.with_reader(document, |reader| record::for_each_entry(reader, document, f))?;
    debug!(document, records = count, "Document parsed");
    Ok(count)
}

fn read_types(archive: &Archive, tables: &Mutex<RawTables>) -> Result<()> {
    let mut types = IndexMap::new();
    let mut type_traits = IndexMap::new();
    let mut meta_types = IndexMap::new();
    let mut parents = Vec::new();

    split(archive, TYPES, |id, document: SdeType| {
        types.insert(id, document.to_type(id)?);
        if let Some(meta_group) = document.meta_group_id {
            meta_types.insert(id, meta_group);
        }
        if let Some(parent) = document.variation_parent_type_id {
            parents.push((parent, id));
        }
        if let Some(traits) = document.traits {
            type_traits.insert(id, traits.into_traits(id)?);
        }
        Ok(())
    })?;

    let mut variants = Variants::new();
    for (parent, id) in parents {
        variants.join(parent, id);
    }

    let mut tables = tables.lock();
    tables.types = types;
    tables.type_traits = type_traits;
    tables.meta_types = meta_types;
    tables.variants = variants;
    Ok(())
}

fn read_stations(archive: &Archive, tables: &Mutex<RawTables>) -> Result<()> {
    let operations: IndexMap<i32, SdeStationOperation> = whole(archive, STATION_OPERATIONS)?;
    let documents: Vec<SdeStation> = whole(archive, STATIONS)?;

    let mut stations: IndexMap<SolarSystemId, Vec<Station>> = IndexMap::new();
    for document in documents {
        let operation = operations.get(&document.operation_id).ok_or_else(|| {
            Error::schema(
                STATIONS,
                format!(
                    "station {} uses unknown operation {}",
                    document.station_id, document.operation_id
                ),
            )
        })?;
        let services = operation
            .services
            .iter()
            .filter_map(|code| StationService::from_code(*code))
            .collect();
        stations.entry(document.solar_system_id).or_default().push(Station {
            id: document.station_id,
            type_id: document.station_type_id,
            name: document.station_name,
            operation_id: document.operation_id,
            services,
        });
    }
    tables.lock().stations = stations;
    Ok(())
}

/// Move the map tables out of the concurrent maps and derive what needed
/// every system to be read first: celestial groups and jump adjacency.
fn collect_universe(tables: &mut RawTables, universe: Universe<'_>) -> Result<()> {
    tables.regions = universe.regions.into_iter().collect();
    tables.constellations = universe.constellations.into_iter().collect();
    tables.solar_systems = universe.solar_systems.into_iter().collect();

    for (system, placed) in universe.celestials {
        let celestials = placed
            .into_iter()
            .map(|celestial| celestial.resolve(&tables.types))
            .collect::<Result<Vec<_>>>()?;
        if !celestials.is_empty() {
            tables.celestials.insert(system, celestials);
        }
    }

    let stargates: HashMap<ItemId, (SolarSystemId, ItemId)> =
        universe.stargates.into_iter().collect();
    for (gate, (from, destination)) in &stargates {
        let (to, _) = stargates.get(destination).ok_or_else(|| {
            Error::schema(
                format!("stargate {gate}"),
                format!("destination {destination} is not a known stargate"),
            )
        })?;
        tables.add_jump(*from, *to);
    }
    debug!(stargates = stargates.len(), "Jumps derived");
    Ok(())
}
