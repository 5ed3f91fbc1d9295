//! Small entity constructors shared by the unit tests

use indexmap::IndexMap;

use super::types::*;

pub fn category(id: CategoryId, published: bool) -> Category {
    Category {
        id,
        name: format!("Category {id}"),
        icon_id: None,
        published,
    }
}

pub fn group(id: GroupId, category_id: CategoryId, published: bool) -> Group {
    Group {
        id,
        category_id,
        name: format!("Group {id}"),
        icon_id: None,
        published,
    }
}

pub fn item(id: TypeId, group_id: GroupId, published: bool) -> Type {
    Type {
        id,
        group_id,
        name: format!("Type {id}"),
        description: None,
        mass: 0.0,
        volume: 0.0,
        capacity: 0.0,
        published,
        icon_id: None,
        graphic_id: None,
        market_group_id: None,
    }
}

pub fn attribute(id: AttributeId, unit_id: Option<UnitId>) -> Attribute {
    Attribute {
        id,
        category_id: None,
        attribute_name: Some(format!("attribute{id}")),
        display_name: None,
        unit_id,
        icon_id: None,
        published: true,
        high_is_good: true,
    }
}

pub fn market_group(id: MarketGroupId, parent_id: Option<MarketGroupId>) -> MarketGroup {
    MarketGroup {
        id,
        parent_id,
        name: format!("Market group {id}"),
        description: None,
    }
}

pub fn activity(
    blueprint_id: TypeId,
    kind: ActivityKind,
    materials: &[(TypeId, i32)],
    products: &[(TypeId, i32)],
    skills: &[(TypeId, i32)],
) -> IndustryActivity {
    let mut activity = IndustryActivity::new(blueprint_id, kind, 600);
    activity.materials = materials.iter().copied().collect::<IndexMap<_, _>>();
    activity.products = products.iter().copied().collect::<IndexMap<_, _>>();
    activity.skills = skills.iter().copied().collect::<IndexMap<_, _>>();
    activity
}

pub fn region(id: RegionId, faction_id: Option<FactionId>) -> Region {
    Region {
        id,
        name: format!("Region {id}"),
        center: [0.0; 3],
        min: [0.0; 3],
        max: [0.0; 3],
        faction_id,
        wormhole_class: None,
    }
}

pub fn constellation(
    id: ConstellationId,
    region_id: RegionId,
    faction_id: Option<FactionId>,
) -> Constellation {
    Constellation {
        id,
        region_id,
        name: format!("Constellation {id}"),
        center: [0.0; 3],
        min: [0.0; 3],
        max: [0.0; 3],
        faction_id,
        wormhole_class: None,
    }
}

pub fn solar_system(
    id: SolarSystemId,
    constellation_id: ConstellationId,
    region_id: RegionId,
    faction_id: Option<FactionId>,
) -> SolarSystem {
    SolarSystem {
        id,
        region_id,
        constellation_id,
        name: format!("System {id}"),
        center: [0.0; 3],
        security: 0.5,
        faction_id,
        sun_type_id: None,
        wormhole_class: None,
    }
}
