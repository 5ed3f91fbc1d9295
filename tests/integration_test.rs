//! End-to-end loads of small but complete fixture exports.
//!
//! Both export formats are written to a temporary directory describing the
//! same data, loaded through the full pipeline and checked against the
//! guarantees a corrected data set makes: closed references, symmetric
//! variant families, an exactly reachable market tree and mirrored jumps.

use std::collections::HashSet;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use rusqlite::Connection;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use eve_sde_index::patch;
use eve_sde_index::scheduler::Trace;
use eve_sde_index::schema::{self, ActivityKey, ActivityKind, MarketGroup, StationService};
use eve_sde_index::source::{self, SdeSource, SqliteSource, YamlSource};
use eve_sde_index::{Error, Ruleset, SdeData};

// =============================================================================
// YAML Fixture
// =============================================================================

const CATEGORIES: &str = "\
2:
  name:
    en: Celestial
  published: true
4:
  name:
    en: Material
  published: true
6:
  name:
    en: Ship
  published: true
9:
  name:
    en: Blueprint
  published: true
16:
  name:
    en: Skill
  published: true
25:
  name:
    en: Asteroid
  published: true
99:
  name:
    en: Unused
  published: true
";

const GROUPS: &str = "\
7:
  categoryID: 2
  name:
    en: Planet
  published: true
8:
  categoryID: 2
  name:
    en: Moon
  published: true
9:
  categoryID: 2
  name:
    en: Asteroid Belt
  published: true
18:
  categoryID: 4
  name:
    en: Mineral
  published: true
25:
  categoryID: 6
  name:
    en: Frigate
  published: true
26:
  categoryID: 6
  name:
    en: Cruiser
  published: true
105:
  categoryID: 9
  name:
    en: Frigate Blueprint
  published: true
255:
  categoryID: 16
  name:
    en: Gunnery
  published: true
450:
  categoryID: 25
  name:
    en: Arkonor
  published: true
995:
  categoryID: 2
  name:
    en: Secondary Sun
  published: true
1000:
  categoryID: 99
  name:
    en: Unused
  published: false
";

const TYPES: &str = "\
11:
  groupID: 7
  name:
    en: Planet (Temperate)
  published: true
14:
  groupID: 8
  name:
    en: Moon
  published: true
15:
  groupID: 9
  name:
    en: Asteroid Belt
  published: true
22:
  groupID: 450
  name:
    en: Arkonor
  published: true
  volume: 16.0
34:
  groupID: 18
  marketGroupID: 1857
  name:
    en: Tritanium
  published: true
  volume: 0.01
587:
  groupID: 25
  marketGroupID: 61
  metaGroupID: 1
  mass: 1067000.0
  name:
    en: Rifter
  description:
    en: A fast frigate.
  published: true
  traits:
    roleBonuses:
    - bonus: 7.5
      bonusText:
        en: bonus to turret tracking
      importance: 1
      unitID: 105
    types:
      3300:
      - bonus: 10
        bonusText:
          en: bonus to turret damage
        importance: 1
        unitID: 105
588:
  groupID: 25
  name:
    en: Reaper
  published: true
681:
  groupID: 105
  marketGroupID: 62
  name:
    en: Rifter Blueprint
  published: true
999:
  groupID: 25
  name:
    en: Prototype Frigate
  published: false
  variationParentTypeID: 588
1001:
  groupID: 1000
  name:
    en: Test Item
  published: false
3300:
  groupID: 255
  name:
    en: Gunnery
  published: true
11371:
  groupID: 25
  marketGroupID: 61
  metaGroupID: 2
  name:
    en: Wolf
  published: true
  variationParentTypeID: 587
45031:
  groupID: 995
  name:
    en: Sun A0 (Blue Small)
  published: true
";

const ICONS: &str = "\
21:
  iconFile: 'res:/ui/texture/icons/21_64_1.png'
";

const MARKET_GROUPS: &str = "\
2:
  nameID:
    en: Blueprints
4:
  nameID:
    en: Ships
61:
  nameID:
    en: Frigates
  parentGroupID: 4
62:
  nameID:
    en: Ship Blueprints
  parentGroupID: 2
533:
  nameID:
    en: Materials
700:
  nameID:
    en: Empty
  parentGroupID: 4
800:
  nameID:
    en: Orphan
1857:
  nameID:
    en: Minerals
  parentGroupID: 533
";

const META_GROUPS: &str = "\
1:
  nameID:
    en: Tech I
2:
  nameID:
    en: Tech II
";

const FACTIONS: &str = "\
500001:
  nameID:
    en: Caldari State
  iconID: 1439
500003:
  nameID:
    en: Amarr Empire
";

const ATTRIBUTES: &str = "\
9:
  attributeID: 9
  name: hp
  displayNameID:
    en: Structure Hitpoints
  unitID: 1
  published: true
  highIsGood: true
20:
  attributeID: 20
  name: speedFactor
  unitID: 109
  published: true
  highIsGood: true
182:
  attributeID: 182
  name: requiredSkill1
  unitID: 116
  published: true
  highIsGood: true
277:
  attributeID: 277
  name: requiredSkill1Level
  published: true
  highIsGood: true
633:
  attributeID: 633
  name: metaLevelOld
  published: true
  highIsGood: true
";

const EFFECTS: &str = "\
11:
  effectID: 11
  effectName: loPower
";

const TYPE_DOGMA: &str = "\
587:
  dogmaAttributes:
  - attributeID: 9
    value: 350.0
  - attributeID: 182
    value: 3300.0
  - attributeID: 277
    value: 1.0
  dogmaEffects:
  - effectID: 11
    isDefault: false
999:
  dogmaAttributes:
  - attributeID: 9
    value: 500.0
11371:
  dogmaAttributes:
  - attributeID: 182
    value: 3300.0
  - attributeID: 277
    value: 3.0
  - attributeID: 633
    value: 5.0
";

const BLUEPRINTS: &str = "\
681:
  activities:
    invention:
      products:
      - probability: 0.3
        quantity: 1
        typeID: 999
      time: 100
    manufacturing:
      materials:
      - quantity: 32000
        typeID: 34
      products:
      - quantity: 1
        typeID: 587
      skills:
      - level: 1
        typeID: 3300
      time: 6000
  blueprintTypeID: 681
  maxProductionLimit: 30
";

const TYPE_MATERIALS: &str = "\
22:
  materials:
  - materialTypeID: 34
    quantity: 22000
587:
  materials:
  - materialTypeID: 34
    quantity: 1000
";

const PLANET_SCHEMATICS: &str = "\
65:
  cycleTime: 1800
  nameID:
    en: Frigate Parts
  types:
    34:
      isInput: true
      quantity: 40
    588:
      isInput: false
      quantity: 5
";

const STATION_OPERATIONS: &str = "\
26:
  operationNameID:
    en: Assembly Plant
  services:
  - 5
  - 7
";

const STATIONS: &str = "\
- operationID: 26
  solarSystemID: 30000142
  stationID: 60003760
  stationName: Jita IV - Moon 4 - Caldari Navy Assembly Plant
  stationTypeID: 1531
";

const ITEM_NAMES: &str = "\
- itemID: 40009077
  itemName: Jita IV
- itemID: 40009079
  itemName: Jita IV - Asteroid Belt 1
- itemID: 40009080
  itemName: Jita IV - Moon 4
";

const FORGE: &str = "\
center: [-96.0, 68.0, 103.0]
factionID: 500001
max: [1.0, 1.0, 1.0]
min: [-1.0, -1.0, -1.0]
nameID: 1001
regionID: 10000002
";

const KIMOTORO: &str = "\
center: [-12.0, 4.0, 9.0]
constellationID: 20000020
max: [1.0, 1.0, 1.0]
min: [-1.0, -1.0, -1.0]
nameID: 1002
";

const JITA: &str = "\
border: true
center: [0.0, 0.0, 0.0]
planets:
  40009077:
    asteroidBelts:
      40009079:
        typeID: 15
    celestialIndex: 4
    moons:
      40009081:
        moonNameID: 2001
        typeID: 14
      40009080:
        typeID: 14
    typeID: 11
security: 0.945913
solarSystemID: 30000142
solarSystemNameID: 1003
stargates:
  50001248:
    destination: 50001249
    typeID: 29624
sunTypeID: 3802
";

const PERIMETER_PATH: &str = "universe/eve/TheForge/Kimotoro/Perimeter/solarsystem.yaml";

const PERIMETER: &str = "\
center: [1.0, 0.0, 0.0]
security: 0.95
solarSystemID: 30000144
solarSystemNameID: 1004
stargates:
  50001249:
    destination: 50001248
    typeID: 29624
sunTypeID: 3802
";

const DOMAIN: &str = "\
center: [10.0, 0.0, 0.0]
factionID: 500003
max: [1.0, 1.0, 1.0]
min: [-1.0, -1.0, -1.0]
nameID: 1005
regionID: 10000043
";

const THRONE_WORLDS: &str = "\
center: [10.0, 0.0, 0.0]
constellationID: 20000322
max: [1.0, 1.0, 1.0]
min: [-1.0, -1.0, -1.0]
nameID: 1006
";

const AMARR: &str = "\
center: [10.0, 1.0, 0.0]
factionID: 500003
secondarySun:
  itemID: 40139443
  typeID: 45031
security: 1.0
solarSystemID: 30002187
solarSystemNameID: 1007
sunTypeID: 3802
";

const LANDMARKS: &str = "\
1:
  landmarkNameID: 3000
  position: [0.0, 0.0, 0.0]
";

const LOCALIZATION: &str = r#"{
  "1001": "The Forge",
  "1002": "Kimotoro",
  "1003": "Jita",
  "1004": "Perimeter",
  "1005": "Domain",
  "1006": "Throne Worlds",
  "1007": "Amarr",
  "2001": "Jita IV - Moon 5"
}"#;

fn yaml_files() -> Vec<(&'static str, String)> {
    [
        ("fsd/categories.yaml", CATEGORIES),
        ("fsd/groups.yaml", GROUPS),
        ("fsd/types.yaml", TYPES),
        ("fsd/iconIDs.yaml", ICONS),
        ("fsd/marketGroups.yaml", MARKET_GROUPS),
        ("fsd/metaGroups.yaml", META_GROUPS),
        ("fsd/factions.yaml", FACTIONS),
        ("fsd/dogmaAttributes.yaml", ATTRIBUTES),
        ("fsd/dogmaEffects.yaml", EFFECTS),
        ("fsd/typeDogma.yaml", TYPE_DOGMA),
        ("fsd/blueprints.yaml", BLUEPRINTS),
        ("fsd/typeMaterials.yaml", TYPE_MATERIALS),
        ("fsd/planetSchematics.yaml", PLANET_SCHEMATICS),
        ("fsd/stationOperations.yaml", STATION_OPERATIONS),
        ("bsd/staStations.yaml", STATIONS),
        ("bsd/invNames.yaml", ITEM_NAMES),
        ("universe/eve/TheForge/region.yaml", FORGE),
        ("universe/eve/TheForge/Kimotoro/constellation.yaml", KIMOTORO),
        ("universe/eve/TheForge/Kimotoro/Jita/solarsystem.yaml", JITA),
        (PERIMETER_PATH, PERIMETER),
        ("universe/eve/Domain/region.yaml", DOMAIN),
        ("universe/eve/Domain/ThroneWorlds/constellation.yaml", THRONE_WORLDS),
        ("universe/eve/Domain/ThroneWorlds/Amarr/solarsystem.yaml", AMARR),
        ("universe/landmarks/landmarks.yaml", LANDMARKS),
    ]
    .into_iter()
    .map(|(name, text)| (name, text.to_string()))
    .collect()
}

fn write_extracted(root: &Path, files: &[(&'static str, String)]) -> PathBuf {
    let sde = root.join("sde");
    for (name, text) in files {
        let path = sde.join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, text).unwrap();
    }
    sde
}

fn write_zipped(root: &Path, files: &[(&'static str, String)]) -> PathBuf {
    let path = root.join("sde.zip");
    let mut zip = ZipWriter::new(File::create(&path).unwrap());
    for (name, text) in files {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(text.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
    path
}

fn write_localization(root: &Path) -> PathBuf {
    let path = root.join("localization.json");
    std::fs::write(&path, LOCALIZATION).unwrap();
    path
}

/// Extracted YAML export plus its localization table
fn yaml_source(dir: &TempDir) -> YamlSource {
    let sde = write_extracted(dir.path(), &yaml_files());
    YamlSource::new(sde, write_localization(dir.path()))
}

// =============================================================================
// SQLite Fixture
// =============================================================================

const SQLITE_SCHEMA: &str = "
    CREATE TABLE invCategories (categoryID INTEGER, categoryName TEXT, iconID INTEGER, published INTEGER);
    CREATE TABLE invGroups (groupID INTEGER, categoryID INTEGER, groupName TEXT, iconID INTEGER, published INTEGER);
    CREATE TABLE invTypes (typeID INTEGER, groupID INTEGER, typeName TEXT, description TEXT, mass REAL,
        volume REAL, capacity REAL, published INTEGER, iconID INTEGER, graphicID INTEGER, marketGroupID INTEGER);
    CREATE TABLE invTraits (typeID INTEGER, skillID INTEGER, bonus REAL, bonusText TEXT, unitID INTEGER);
    CREATE TABLE eveIcons (iconID INTEGER, iconFile TEXT);
    CREATE TABLE invMarketGroups (marketGroupID INTEGER, parentGroupID INTEGER, marketGroupName TEXT, description TEXT);
    CREATE TABLE invMetaGroups (metaGroupID INTEGER, metaGroupName TEXT);
    CREATE TABLE invMetaTypes (typeID INTEGER, parentTypeID INTEGER, metaGroupID INTEGER);
    CREATE TABLE dgmAttributeTypes (attributeID INTEGER, categoryID INTEGER, attributeName TEXT, displayName TEXT,
        unitID INTEGER, iconID INTEGER, published INTEGER, highIsGood INTEGER);
    CREATE TABLE dgmTypeAttributes (typeID INTEGER, attributeID INTEGER, valueInt INTEGER, valueFloat REAL);
    CREATE TABLE dgmEffects (effectID INTEGER, effectName TEXT);
    CREATE TABLE dgmTypeEffects (typeID INTEGER, effectID INTEGER);
    CREATE TABLE industryActivity (typeID INTEGER, activityID INTEGER, time INTEGER);
    CREATE TABLE industryActivityMaterials (typeID INTEGER, activityID INTEGER, materialTypeID INTEGER, quantity INTEGER);
    CREATE TABLE industryActivityProducts (typeID INTEGER, activityID INTEGER, productTypeID INTEGER, quantity INTEGER);
    CREATE TABLE industryActivityProbabilities (typeID INTEGER, activityID INTEGER, productTypeID INTEGER, probability REAL);
    CREATE TABLE industryActivitySkills (typeID INTEGER, activityID INTEGER, skillID INTEGER, level INTEGER);
    CREATE TABLE invTypeMaterials (typeID INTEGER, materialTypeID INTEGER, quantity INTEGER);
    CREATE TABLE planetSchematics (schematicID INTEGER, schematicName TEXT, cycleTime INTEGER);
    CREATE TABLE planetSchematicsTypeMap (schematicID INTEGER, typeID INTEGER, quantity INTEGER, isInput INTEGER);
    CREATE TABLE mapRegions (regionID INTEGER, regionName TEXT, x REAL, y REAL, z REAL, xMin REAL, yMin REAL,
        zMin REAL, xMax REAL, yMax REAL, zMax REAL, factionID INTEGER);
    CREATE TABLE mapConstellations (regionID INTEGER, constellationID INTEGER, constellationName TEXT, x REAL, y REAL,
        z REAL, xMin REAL, yMin REAL, zMin REAL, xMax REAL, yMax REAL, zMax REAL, factionID INTEGER);
    CREATE TABLE mapSolarSystems (regionID INTEGER, constellationID INTEGER, solarSystemID INTEGER,
        solarSystemName TEXT, x REAL, y REAL, z REAL, security REAL, factionID INTEGER, sunTypeID INTEGER);
    CREATE TABLE mapLocationWormholeClasses (locationID INTEGER, wormholeClassID INTEGER);
    CREATE TABLE mapSolarSystemJumps (fromRegionID INTEGER, fromConstellationID INTEGER, fromSolarSystemID INTEGER,
        toSolarSystemID INTEGER, toConstellationID INTEGER, toRegionID INTEGER);
    CREATE TABLE mapDenormalize (itemID INTEGER, typeID INTEGER, groupID INTEGER, solarSystemID INTEGER,
        itemName TEXT, celestialIndex INTEGER, orbitIndex INTEGER);
    CREATE TABLE staOperationServices (operationID INTEGER, serviceID INTEGER);
    CREATE TABLE staStations (stationID INTEGER, operationID INTEGER, stationTypeID INTEGER,
        solarSystemID INTEGER, stationName TEXT);
    CREATE TABLE chrFactions (factionID INTEGER, factionName TEXT, iconID INTEGER);
";

/// The same taxonomy, market tree and map as the YAML fixture
const SQLITE_ROWS: &str = "
    INSERT INTO invCategories VALUES (2, 'Celestial', NULL, 1), (4, 'Material', NULL, 1), (6, 'Ship', NULL, 1),
        (9, 'Blueprint', NULL, 1), (16, 'Skill', NULL, 1), (25, 'Asteroid', NULL, 1), (99, 'Unused', NULL, 1);
    INSERT INTO invGroups VALUES (7, 2, 'Planet', NULL, 1), (8, 2, 'Moon', NULL, 1), (9, 2, 'Asteroid Belt', NULL, 1),
        (18, 4, 'Mineral', NULL, 1), (25, 6, 'Frigate', NULL, 1), (26, 6, 'Cruiser', NULL, 1),
        (105, 9, 'Frigate Blueprint', NULL, 1), (255, 16, 'Gunnery', NULL, 1), (450, 25, 'Arkonor', NULL, 1),
        (995, 2, 'Secondary Sun', NULL, 1), (1000, 99, 'Unused', NULL, 0);
    INSERT INTO invTypes VALUES
        (11, 7, 'Planet (Temperate)', NULL, 0, 0, 0, 1, NULL, NULL, NULL),
        (14, 8, 'Moon', NULL, 0, 0, 0, 1, NULL, NULL, NULL),
        (15, 9, 'Asteroid Belt', NULL, 0, 0, 0, 1, NULL, NULL, NULL),
        (22, 450, 'Arkonor', NULL, 0, 16, 0, 1, NULL, NULL, NULL),
        (34, 18, 'Tritanium', NULL, 0, 0.01, 0, 1, NULL, NULL, 1857),
        (587, 25, 'Rifter', 'A fast frigate.', 1067000, 0, 0, 1, NULL, NULL, 61),
        (588, 25, 'Reaper', NULL, 0, 0, 0, 1, NULL, NULL, NULL),
        (681, 105, 'Rifter Blueprint', NULL, 0, 0, 0, 1, NULL, NULL, 62),
        (999, 25, 'Prototype Frigate', NULL, 0, 0, 0, 0, NULL, NULL, NULL),
        (1001, 1000, 'Test Item', NULL, 0, 0, 0, 0, NULL, NULL, NULL),
        (3300, 255, 'Gunnery', NULL, 0, 0, 0, 1, NULL, NULL, NULL),
        (11371, 25, 'Wolf', NULL, 0, 0, 0, 1, NULL, NULL, 61),
        (45031, 995, 'Sun A0 (Blue Small)', NULL, 0, 0, 0, 1, NULL, NULL, NULL);
    INSERT INTO invMarketGroups VALUES (2, NULL, 'Blueprints', NULL), (4, NULL, 'Ships', NULL),
        (61, 4, 'Frigates', NULL), (62, 2, 'Ship Blueprints', NULL), (533, NULL, 'Materials', NULL),
        (700, 4, 'Empty', NULL), (800, NULL, 'Orphan', NULL), (1857, 533, 'Minerals', NULL);
    INSERT INTO invMetaGroups VALUES (1, 'Tech I'), (2, 'Tech II');
    INSERT INTO invMetaTypes VALUES (587, NULL, 1), (11371, 587, 2), (999, 588, 1);
    INSERT INTO industryActivity VALUES (681, 1, 6000), (681, 8, 100);
    INSERT INTO industryActivityMaterials VALUES (681, 1, 34, 32000);
    INSERT INTO industryActivityProducts VALUES (681, 1, 587, 1), (681, 8, 999, 1);
    INSERT INTO industryActivitySkills VALUES (681, 1, 3300, 1);
    INSERT INTO mapRegions VALUES (10000002, 'The Forge', -96, 68, 103, -1, -1, -1, 1, 1, 1, 500001),
        (10000043, 'Domain', 10, 0, 0, -1, -1, -1, 1, 1, 1, 500003);
    INSERT INTO mapConstellations VALUES (10000002, 20000020, 'Kimotoro', -12, 4, 9, -1, -1, -1, 1, 1, 1, NULL),
        (10000043, 20000322, 'Throne Worlds', 10, 0, 0, -1, -1, -1, 1, 1, 1, NULL);
    INSERT INTO mapSolarSystems VALUES (10000002, 20000020, 30000142, 'Jita', 0, 0, 0, 0.945913, NULL, 3802),
        (10000002, 20000020, 30000144, 'Perimeter', 1, 0, 0, 0.95, NULL, 3802),
        (10000043, 20000322, 30002187, 'Amarr', 10, 1, 0, 1.0, 500003, 3802);
    INSERT INTO mapSolarSystemJumps VALUES (10000002, 20000020, 30000142, 30000144, 20000020, 10000002),
        (10000002, 20000020, 30000144, 30000142, 20000020, 10000002);
    INSERT INTO staOperationServices VALUES (26, 5), (26, 7);
    INSERT INTO staStations VALUES (60003760, 26, 1531, 30000142, 'Jita IV - Moon 4 - Caldari Navy Assembly Plant');
    INSERT INTO chrFactions VALUES (500001, 'Caldari State', 1439), (500003, 'Amarr Empire', NULL);
";

fn sqlite_source(dir: &TempDir) -> SqliteSource {
    let path = dir.path().join("sde.sqlite");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(SQLITE_SCHEMA).unwrap();
    conn.execute_batch(SQLITE_ROWS).unwrap();
    SqliteSource::new(path)
}

// =============================================================================
// Invariants
// =============================================================================

/// Guarantees every corrected data set makes, whatever its source
fn assert_corrected(data: &SdeData) {
    let violations = schema::violations(data.tables());
    assert!(violations.is_empty(), "dangling references: {violations:?}");

    for activities in data.industry_activities().values() {
        for activity in activities.values() {
            for product in activity.products.keys() {
                assert!(data.types().contains_key(product), "product {product} was pruned");
            }
        }
    }

    for family in data.variants().families() {
        assert!(family.len() >= 2, "singleton family {family:?}");
        for member in family {
            assert_eq!(data.variants().family(*member), Some(family));
        }
    }

    let mut reachable = HashSet::new();
    for start in data.types().values().filter_map(|ty| ty.market_group_id) {
        let mut current = Some(start);
        while let Some(id) = current {
            if !reachable.insert(id) {
                break;
            }
            current = data.market_groups().get(&id).and_then(|g| g.parent_id);
        }
    }
    let retained: HashSet<_> = data.market_groups().keys().copied().collect();
    assert_eq!(retained, reachable);

    for (from, targets) in data.out_jumps() {
        for to in targets {
            assert!(data.in_jumps()[to].contains(from), "jump {from} -> {to} not mirrored");
        }
    }
}

fn ids<'a>(keys: impl IntoIterator<Item = &'a i32>) -> Vec<i32> {
    let mut ids: Vec<i32> = keys.into_iter().copied().collect();
    ids.sort();
    ids
}

// =============================================================================
// YAML Loads
// =============================================================================

#[test]
fn test_yaml_load_is_corrected() {
    let dir = TempDir::new().unwrap();
    let data = source::load(&yaml_source(&dir), Some(&Ruleset::empty())).unwrap();
    assert_corrected(&data);

    let report = data.patch_report().unwrap();
    assert_eq!(report.types_removed, 2);
    assert_eq!(report.groups_removed, 2);
    assert_eq!(report.categories_removed, 1);
    assert_eq!(report.market_groups_removed, 2);
    assert_eq!(report.activities_removed, 1);

    assert!(!data.types().contains_key(&999));
    assert!(!data.categories().contains_key(&99));
    let frigates: Vec<_> = data.views().category_groups[&6].iter().copied().collect();
    assert_eq!(frigates, vec![25]);
    assert_eq!(ids(data.market_groups().keys()), vec![2, 4, 61, 62, 533, 1857]);
}

#[test]
fn test_yaml_taxonomy_and_dogma() {
    let dir = TempDir::new().unwrap();
    let data = source::load(&yaml_source(&dir), Some(&Ruleset::empty())).unwrap();

    let rifter = &data.types()[&587];
    assert_eq!(rifter.name, "Rifter");
    assert_eq!(rifter.description.as_deref(), Some("A fast frigate."));
    assert_eq!(rifter.mass, 1067000.0);
    assert_eq!(data.meta_types()[&11371], 2);
    assert_eq!(data.type_variants(587), vec![11371]);
    assert!(data.type_variants(588).is_empty());

    let traits = &data.type_traits()[&587];
    assert_eq!(traits.role_bonuses[0].amount, Some(7.5));
    assert_eq!(traits.skill_bonuses[&3300][0].text, "bonus to turret damage");

    assert_eq!(data.attribute_value(587, 9), Some(350.0));
    assert_eq!(data.attribute_value(587, 20), Some(1.0));
    assert_eq!(data.attribute_value(588, 9), Some(0.0));
    assert_eq!(data.attribute_value(587, 12345), None);
    assert!(data.type_effects()[&587].contains(&11));

    let dependants = &data.views().skill_dependants[&3300];
    assert!(dependants[&1].contains(&587));
    assert!(dependants[&3].contains(&11371));
}

#[test]
fn test_yaml_industry_views() {
    let dir = TempDir::new().unwrap();
    let data = source::load(&yaml_source(&dir), Some(&Ruleset::empty())).unwrap();

    let key = ActivityKey {
        blueprint: 681,
        kind: ActivityKind::Manufacturing,
    };
    let manufacturing = data.activity(key).unwrap();
    assert_eq!(manufacturing.materials[&34], 32000);
    assert_eq!(manufacturing.skills[&3300], 1);
    assert!(data.industry_activities()[&681].get(&ActivityKind::Invention).is_none());

    let views = data.views();
    assert!(views.product_activities[&587].contains(&key));
    assert!(views.material_activities[&34].contains(&key));
    assert!(views.skill_activities[&3300].contains(&key));
    assert_eq!(views.output_schematic[&588], 65);
    assert!(views.input_schematics[&34].contains(&65));

    let ore: Vec<_> = views.ore_sources[&34].iter().copied().collect();
    assert_eq!(ore, vec![22]);
}

#[test]
fn test_yaml_map() {
    let dir = TempDir::new().unwrap();
    let data = source::load(&yaml_source(&dir), Some(&Ruleset::empty())).unwrap();

    assert_eq!(data.regions()[&10000002].name, "The Forge");
    let jita = &data.solar_systems()[&30000142];
    assert_eq!(jita.name, "Jita");
    assert_eq!(jita.region_id, 10000002);
    assert_eq!(jita.constellation_id, 20000020);
    // Inherited through the constellation
    assert_eq!(data.constellations()[&20000020].faction_id, Some(500001));
    assert_eq!(jita.faction_id, Some(500001));
    assert_eq!(data.solar_systems()[&30002187].faction_id, Some(500003));

    assert!(data.out_jumps()[&30000142].contains(&30000144));
    assert!(data.in_jumps()[&30000142].contains(&30000144));
    assert!(!data.out_jumps().contains_key(&30002187));

    let systems: Vec<_> = data.views().constellation_systems[&20000020].iter().copied().collect();
    assert_eq!(systems, vec![30000142, 30000144]);
    let constellations: Vec<_> = data.views().region_constellations[&10000043].iter().copied().collect();
    assert_eq!(constellations, vec![20000322]);

    let station = &data.stations()[&30000142][0];
    assert_eq!(station.id, 60003760);
    assert_eq!(station.services, vec![StationService::Reprocessing, StationService::Market]);
}

#[test]
fn test_yaml_celestials() {
    let dir = TempDir::new().unwrap();
    let data = source::load(&yaml_source(&dir), None).unwrap();

    let jita: Vec<_> = data.celestials()[&30000142]
        .iter()
        .map(|c| (c.item_id, c.group_id, c.name.as_str(), c.celestial_index, c.orbit_index))
        .collect();
    assert_eq!(
        jita,
        vec![
            (40009077, 7, "Jita IV", Some(4), None),
            (40009079, 9, "Jita IV - Asteroid Belt 1", Some(4), Some(1)),
            (40009080, 8, "Jita IV - Moon 4", Some(4), Some(1)),
            (40009081, 8, "Jita IV - Moon 5", Some(4), Some(2)),
        ]
    );

    let sun = &data.celestials()[&30002187][0];
    assert_eq!(sun.name, "Sun A0 (Blue Small)");
    assert_eq!(sun.group_id, 995);
    assert_eq!(sun.orbit_index, None);
    assert!(!data.celestials().contains_key(&30000144));
}

#[test]
fn test_zipped_and_extracted_agree() {
    let dir = TempDir::new().unwrap();
    let files = yaml_files();
    let localization = write_localization(dir.path());
    let extracted = YamlSource::new(write_extracted(dir.path(), &files), &localization);
    let zipped = YamlSource::new(write_zipped(dir.path(), &files), &localization).with_workers(3);

    assert_eq!(extracted.read().unwrap(), zipped.read().unwrap());
}

#[test]
fn test_map_stages_run_in_order() {
    for workers in [1, 4] {
        let dir = TempDir::new().unwrap();
        let trace = Trace::default();
        let yaml = yaml_source(&dir).with_workers(workers).with_trace(trace.clone());
        yaml.read().unwrap();

        let labels = trace.lock().clone();
        let first = |prefix: &str| labels.iter().position(|l| l.starts_with(prefix)).unwrap();
        let last = |prefix: &str| labels.iter().rposition(|l| l.starts_with(prefix)).unwrap();
        assert!(last("region:") < first("constellation:"), "{labels:?}");
        assert!(last("constellation:") < first("system:"), "{labels:?}");
        assert_eq!(labels.iter().filter(|l| l.starts_with("system:")).count(), 3);
    }
}

#[test]
fn test_missing_name_id_is_schema_error() {
    let dir = TempDir::new().unwrap();
    let mut files = yaml_files();
    for (name, text) in files.iter_mut() {
        if *name == PERIMETER_PATH {
            *text = text.replace("solarSystemNameID: 1004", "solarSystemNameID: 9999");
        }
    }
    let yaml = YamlSource::new(write_extracted(dir.path(), &files), write_localization(dir.path()));

    match yaml.read() {
        Err(Error::Schema { context, message }) => {
            assert_eq!(context, PERIMETER_PATH);
            assert!(message.contains("9999"), "{message}");
        }
        other => panic!("expected schema error, got {other:?}"),
    }
}

#[test]
fn test_dangling_stargate_is_schema_error() {
    let dir = TempDir::new().unwrap();
    let mut files = yaml_files();
    for (name, text) in files.iter_mut() {
        if *name == PERIMETER_PATH {
            *text = text.replace("destination: 50001248", "destination: 50009999");
        }
    }
    let yaml = YamlSource::new(write_extracted(dir.path(), &files), write_localization(dir.path()));
    assert!(matches!(yaml.read(), Err(Error::Schema { .. })));
}

#[test]
fn test_missing_document_is_schema_error() {
    let dir = TempDir::new().unwrap();
    let files: Vec<_> = yaml_files()
        .into_iter()
        .filter(|(name, _)| *name != "fsd/dogmaEffects.yaml")
        .collect();
    let yaml = YamlSource::new(write_zipped(dir.path(), &files), write_localization(dir.path()));
    assert!(matches!(yaml.read(), Err(Error::Schema { .. })));
}

// =============================================================================
// Patching
// =============================================================================

#[test]
fn test_patch_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let mut tables = yaml_source(&dir).read().unwrap();
    let rules = Ruleset {
        market_root: Some(MarketGroup {
            id: -1,
            parent_id: None,
            name: "Items".to_string(),
            description: None,
        }),
        ..Ruleset::empty()
    };

    patch::apply(&mut tables, &rules).unwrap();
    let once = tables.clone();
    let report = patch::apply(&mut tables, &rules).unwrap();

    assert_eq!(tables, once);
    assert_eq!(report.types_removed, 0);
    assert_eq!(report.market_groups_removed, 0);
    assert_eq!(report.map_values_backfilled, 0);
}

#[test]
fn test_market_root_and_reparent() {
    let dir = TempDir::new().unwrap();
    let rules = Ruleset {
        market_root: Some(MarketGroup {
            id: -1,
            parent_id: None,
            name: "Items".to_string(),
            description: None,
        }),
        market_reparents: vec![(62, 4), (61, 12345)],
        ..Ruleset::empty()
    };
    let data = source::load(&yaml_source(&dir), Some(&rules)).unwrap();
    assert_corrected(&data);

    let path: Vec<_> = data.market_group_path(62).iter().map(|g| g.name.as_str()).collect();
    assert_eq!(path, vec!["Items", "Ships", "Ship Blueprints"]);
    // Blueprints lost its only child
    assert_eq!(ids(data.market_groups().keys()), vec![-1, 4, 61, 62, 533, 1857]);
    assert_eq!(data.patch_report().unwrap().rules_skipped, 1);
}

#[test]
fn test_standard_rules_need_their_attributes() {
    let dir = TempDir::new().unwrap();
    let result = source::load(&yaml_source(&dir), Some(&Ruleset::standard()));
    assert!(matches!(result, Err(Error::Reference(_))));
}

// =============================================================================
// SQLite Loads
// =============================================================================

#[test]
fn test_sqlite_load_is_corrected() {
    let dir = TempDir::new().unwrap();
    let data = source::load(&sqlite_source(&dir), Some(&Ruleset::empty())).unwrap();
    assert_corrected(&data);

    assert_eq!(data.solar_systems()[&30000144].faction_id, Some(500001));
    assert_eq!(data.stations()[&30000142][0].services.len(), 2);
    assert_eq!(data.type_variants(11371), vec![587]);
}

#[test]
fn test_sources_agree() {
    let dir = TempDir::new().unwrap();
    let yaml = source::load(&yaml_source(&dir), Some(&Ruleset::empty())).unwrap();
    let sqlite = source::load(&sqlite_source(&dir), Some(&Ruleset::empty())).unwrap();

    assert_eq!(ids(yaml.categories().keys()), ids(sqlite.categories().keys()));
    assert_eq!(ids(yaml.groups().keys()), ids(sqlite.groups().keys()));
    assert_eq!(ids(yaml.types().keys()), ids(sqlite.types().keys()));
    assert_eq!(ids(yaml.market_groups().keys()), ids(sqlite.market_groups().keys()));
    assert_eq!(yaml.meta_types(), sqlite.meta_types());
    assert_eq!(yaml.out_jumps(), sqlite.out_jumps());
    assert_eq!(yaml.in_jumps(), sqlite.in_jumps());

    let summary = |data: &SdeData| -> Vec<_> {
        data.solar_systems()
            .values()
            .map(|s| (s.id, s.name.clone(), s.region_id, s.constellation_id, s.faction_id))
            .collect()
    };
    assert_eq!(summary(&yaml), summary(&sqlite));

    let products = |data: &SdeData| data.views().product_activities.clone();
    assert_eq!(products(&yaml), products(&sqlite));
}
