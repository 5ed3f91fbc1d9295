//! Staged reading of the map hierarchy.
//!
//! Region documents carry no parent reference, constellations only know
//! their region by folder, and systems only know both by folder. Each level
//! therefore runs as a stage that starts once the level above has finished
//! registering its folder -> ID mapping.

use std::collections::HashMap;
use std::sync::OnceLock;

use dashmap::DashMap;
use indexmap::IndexMap;
use tracing::debug;

use super::archive::Archive;
use super::documents::{SdeConstellation, SdeItemName, SdeRegion, SdeSolarSystem};
use super::record;
use crate::error::{Error, Result};
use crate::scheduler::{Job, Spawner};
use crate::schema::*;

pub const ITEM_NAMES: &str = "bsd/invNames.yaml";
const UNIVERSE_PREFIX: &str = "universe/";

/// A celestial whose group (and, for secondary suns, name) is only known
/// once the types table is loaded
#[derive(Debug, Clone)]
pub struct PlacedCelestial {
    pub item_id: ItemId,
    pub type_id: TypeId,
    pub name: Option<String>,
    pub celestial_index: Option<i32>,
    pub orbit_index: Option<i32>,
}

impl PlacedCelestial {
    pub fn resolve(self, types: &IndexMap<TypeId, Type>) -> Result<Celestial> {
        let ty = types.get(&self.type_id).ok_or_else(|| {
            Error::schema(
                format!("celestial {}", self.item_id),
                format!("unknown type {}", self.type_id),
            )
        })?;
        Ok(Celestial {
            item_id: self.item_id,
            type_id: self.type_id,
            group_id: ty.group_id,
            name: self.name.unwrap_or_else(|| ty.name.clone()),
            celestial_index: self.celestial_index,
            orbit_index: self.orbit_index,
        })
    }
}

/// Universe documents, bucketed by level
#[derive(Debug, Default, PartialEq)]
pub struct Layout {
    pub regions: Vec<String>,
    pub constellations: Vec<String>,
    pub systems: Vec<String>,
}

impl Layout {
    pub fn classify<'a>(names: impl IntoIterator<Item = &'a str>) -> Result<Self> {
        let mut layout = Layout::default();
        for name in names {
            if !name.starts_with(UNIVERSE_PREFIX) {
                continue;
            }
            let file = name.rsplit('/').next().unwrap_or(name);
            match file {
                "region.yaml" => layout.regions.push(name.to_string()),
                "constellation.yaml" => layout.constellations.push(name.to_string()),
                "solarsystem.yaml" => layout.systems.push(name.to_string()),
                "landmarks.yaml" => {}
                other => {
                    return Err(Error::schema(name, format!("unexpected universe file {other}")))
                }
            }
        }
        Ok(layout)
    }
}

/// Shared state of the map stages
pub struct Universe<'a> {
    archive: &'a Archive,
    localization: &'a HashMap<i32, String>,
    item_names: OnceLock<HashMap<ItemId, String>>,
    folder_ids: DashMap<String, i32>,
    pub regions: DashMap<RegionId, Region>,
    pub constellations: DashMap<ConstellationId, Constellation>,
    pub solar_systems: DashMap<SolarSystemId, SolarSystem>,
    pub celestials: DashMap<SolarSystemId, Vec<PlacedCelestial>>,
    /// Stargate -> (owning system, destination stargate)
    pub stargates: DashMap<ItemId, (SolarSystemId, ItemId)>,
}

impl<'a> Universe<'a> {
    pub fn new(archive: &'a Archive, localization: &'a HashMap<i32, String>) -> Self {
        Self {
            archive,
            localization,
            item_names: OnceLock::new(),
            folder_ids: DashMap::new(),
            regions: DashMap::new(),
            constellations: DashMap::new(),
            solar_systems: DashMap::new(),
            celestials: DashMap::new(),
            stargates: DashMap::new(),
        }
    }

    /// Read item names and list the map documents, then chain the three stages
    pub fn bootstrap(&'a self, spawner: &Spawner<'a>) -> Result<()> {
        let mut names = HashMap::new();
        self.archive.with_reader(ITEM_NAMES, |reader| {
            record::for_each_item(reader, ITEM_NAMES, |item: SdeItemName| {
                names.insert(item.item_id, item.item_name);
                Ok(())
            })
        })?;
        debug!(count = names.len(), "Item names read");
        // Only ever set here, before any system task exists
        let _ = self.item_names.set(names);

        let files = self.archive.file_names()?;
        let layout = Layout::classify(files.iter().map(String::as_str))?;
        debug!(
            regions = layout.regions.len(),
            constellations = layout.constellations.len(),
            systems = layout.systems.len(),
            "Universe documents listed"
        );

        let Layout { regions, constellations, systems } = layout;
        let region_jobs = self.jobs("region", regions, Self::read_region);
        spawner.spawn_stage(region_jobs, move |spawner| {
            let constellation_jobs =
                self.jobs("constellation", constellations, Self::read_constellation);
            spawner.spawn_stage(constellation_jobs, move |spawner| {
                let system_jobs = self.jobs("system", systems, Self::read_system);
                spawner.spawn_stage(system_jobs, |_| Ok(()))
            })
        })
    }

    fn jobs(
        &'a self,
        level: &str,
        paths: Vec<String>,
        read: fn(&Self, &str) -> Result<()>,
    ) -> Vec<Job<'a>> {
        paths
            .into_iter()
            .map(|path| Job::new(format!("{level}:{}", folder(&path)), move |_| read(self, &path)))
            .collect()
    }

    fn name(&self, name_id: i32, path: &str) -> Result<String> {
        self.localization
            .get(&name_id)
            .cloned()
            .ok_or_else(|| Error::schema(path, format!("name ID {name_id} not in localization table")))
    }

    fn folder_id(&self, folder: &str, path: &str) -> Result<i32> {
        self.folder_ids
            .get(folder)
            .map(|id| *id)
            .ok_or_else(|| Error::schema(path, format!("no document registered for folder {folder}")))
    }

    fn read_region(&self, path: &str) -> Result<()> {
        let document: SdeRegion = record::parse_whole(&self.archive.read_to_string(path)?, path)?;
        let region = Region {
            id: document.region_id,
            name: self.name(document.name_id, path)?,
            center: document.center,
            min: document.min,
            max: document.max,
            faction_id: document.faction_id,
            wormhole_class: document.wormhole_class_id,
        };
        self.folder_ids.insert(folder(path).to_string(), region.id);
        self.regions.insert(region.id, region);
        Ok(())
    }

    fn read_constellation(&self, path: &str) -> Result<()> {
        let document: SdeConstellation =
            record::parse_whole(&self.archive.read_to_string(path)?, path)?;
        let own = folder(path);
        let constellation = Constellation {
            id: document.constellation_id,
            region_id: self.folder_id(parent(own), path)?,
            name: self.name(document.name_id, path)?,
            center: document.center,
            min: document.min,
            max: document.max,
            faction_id: document.faction_id,
            wormhole_class: document.wormhole_class_id,
        };
        self.folder_ids.insert(own.to_string(), constellation.id);
        self.constellations.insert(constellation.id, constellation);
        Ok(())
    }

    fn read_system(&self, path: &str) -> Result<()> {
        let document: SdeSolarSystem =
            record::parse_whole(&self.archive.read_to_string(path)?, path)?;
        let constellation_folder = parent(folder(path));
        let system = SolarSystem {
            id: document.solar_system_id,
            region_id: self.folder_id(parent(constellation_folder), path)?,
            constellation_id: self.folder_id(constellation_folder, path)?,
            name: self.name(document.name_id, path)?,
            center: document.center,
            security: document.security,
            faction_id: document.faction_id,
            sun_type_id: document.sun_type_id,
            wormhole_class: document.wormhole_class_id,
        };

        let celestials = self.celestials_of(&document, path)?;
        for (gate, stargate) in &document.stargates {
            self.stargates.insert(*gate, (system.id, stargate.destination));
        }
        self.celestials.insert(system.id, celestials);
        self.solar_systems.insert(system.id, system);
        Ok(())
    }

    fn celestials_of(&self, document: &SdeSolarSystem, path: &str) -> Result<Vec<PlacedCelestial>> {
        let mut celestials = Vec::new();
        if let Some(sun) = &document.secondary_sun {
            celestials.push(PlacedCelestial {
                item_id: sun.item_id,
                type_id: sun.type_id,
                name: None,
                celestial_index: None,
                orbit_index: None,
            });
        }

        for (&planet_id, planet) in &document.planets {
            let index = Some(planet.celestial_index);
            celestials.push(PlacedCelestial {
                item_id: planet_id,
                type_id: planet.type_id,
                name: Some(self.item_name(planet_id, planet.name_id, path)?),
                celestial_index: index,
                orbit_index: None,
            });

            // Belts and moons are numbered separately
            let belts = planet
                .asteroid_belts
                .iter()
                .map(|(&id, belt)| (id, belt.type_id, belt.name_id));
            let moons = planet
                .moons
                .iter()
                .map(|(&id, moon)| (id, moon.type_id, moon.name_id));
            self.push_orbiting(&mut celestials, belts.collect(), index, path)?;
            self.push_orbiting(&mut celestials, moons.collect(), index, path)?;
        }
        Ok(celestials)
    }

    fn push_orbiting(
        &self,
        celestials: &mut Vec<PlacedCelestial>,
        mut orbiting: Vec<(ItemId, TypeId, Option<i32>)>,
        celestial_index: Option<i32>,
        path: &str,
    ) -> Result<()> {
        orbiting.sort_by_key(|(id, _, _)| *id);
        for (orbit, (item_id, type_id, name_id)) in orbiting.into_iter().enumerate() {
            celestials.push(PlacedCelestial {
                item_id,
                type_id,
                name: Some(self.item_name(item_id, name_id, path)?),
                celestial_index,
                orbit_index: Some(orbit as i32 + 1),
            });
        }
        Ok(())
    }

    /// Localized name when the document carries a name ID, otherwise the item name table
    fn item_name(&self, item_id: ItemId, name_id: Option<i32>, path: &str) -> Result<String> {
        if let Some(name_id) = name_id {
            return self.name(name_id, path);
        }
        self.item_names
            .get()
            .and_then(|names| names.get(&item_id))
            .cloned()
            .ok_or_else(|| Error::schema(path, format!("no name for item {item_id}")))
    }
}

/// Folder holding a document
fn folder(path: &str) -> &str {
    parent(path)
}

fn parent(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(head, _)| head)
}
