//! Patch engine: corrects raw tables in place, in a fixed order.
//!
//! 1. publish/unpublish overrides
//! 2. taxonomy pruning (types, then groups, then categories)
//! 3. pruning of every table keyed by type
//! 4. market tree root, re-parenting and reachability pruning
//! 5. attribute corrections
//! 6. faction and wormhole class backfill down the map hierarchy
//! 7. one-off exceptions
//!
//! Running it twice yields no further changes.

pub mod rules;

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, info, warn};

pub use rules::{AttributeMerge, DescriptionFix, MetaLevelFloor, Ruleset};

use crate::error::{Error, Result};
use crate::schema::*;

/// What each step changed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PatchReport {
    pub types_removed: usize,
    pub groups_removed: usize,
    pub categories_removed: usize,
    pub dependent_rows_removed: usize,
    pub activities_removed: usize,
    pub market_groups_removed: usize,
    pub attributes_corrected: usize,
    pub meta_levels_raised: usize,
    pub map_values_backfilled: usize,
    pub exceptions_applied: usize,
    pub rules_skipped: usize,
}

pub fn apply(tables: &mut RawTables, rules: &Ruleset) -> Result<PatchReport> {
    let mut report = PatchReport::default();

    apply_publish_overrides(tables, rules);
    prune_taxonomy(tables, &mut report);
    info!(
        types_removed = report.types_removed,
        groups_removed = report.groups_removed,
        categories_removed = report.categories_removed,
        "Taxonomy pruned"
    );

    prune_dependents(tables, &mut report);
    debug!(
        rows = report.dependent_rows_removed,
        activities = report.activities_removed,
        "Type-keyed tables pruned"
    );

    rebuild_market_tree(tables, rules, &mut report);
    info!(
        removed = report.market_groups_removed,
        retained = tables.market_groups.len(),
        "Market tree rebuilt"
    );

    correct_attributes(tables, rules, &mut report)?;
    backfill_map(tables, &mut report);
    apply_exceptions(tables, rules, &mut report);
    info!(
        attributes = report.attributes_corrected,
        meta_levels = report.meta_levels_raised,
        backfilled = report.map_values_backfilled,
        exceptions = report.exceptions_applied,
        skipped = report.rules_skipped,
        "Corrections applied"
    );

    Ok(report)
}

// =============================================================================
// Publication
// =============================================================================

fn apply_publish_overrides(tables: &mut RawTables, rules: &Ruleset) {
    // Grown below as categories pass their state down to groups
    let mut publish_groups = rules.publish_groups_and_children.clone();
    let mut unpublish_groups = rules.unpublish_groups_and_children.clone();

    for category in tables.categories.values_mut() {
        let id = category.id;
        if rules.publish_categories.contains(&id) || rules.publish_categories_and_children.contains(&id) {
            category.published = true;
        }
        if rules.unpublish_categories.contains(&id)
            || rules.unpublish_categories_and_children.contains(&id)
        {
            category.published = false;
        }
    }

    for group in tables.groups.values_mut() {
        let id = group.id;
        if rules.publish_groups.contains(&id) || publish_groups.contains(&id) {
            group.published = true;
        }
        if rules.publish_categories_and_children.contains(&group.category_id) {
            group.published = true;
            publish_groups.insert(id);
        }
        if rules.unpublish_groups.contains(&id) || unpublish_groups.contains(&id) {
            group.published = false;
        }
        if rules.unpublish_categories_and_children.contains(&group.category_id) {
            group.published = false;
            unpublish_groups.insert(id);
        }
    }

    for ty in tables.types.values_mut() {
        if rules.publish_types.contains(&ty.id) || publish_groups.contains(&ty.group_id) {
            ty.published = true;
        }
        let prefixed = rules
            .unpublished_name_prefixes
            .iter()
            .any(|prefix| ty.name.starts_with(prefix.as_str()));
        if rules.unpublish_types.contains(&ty.id) || unpublish_groups.contains(&ty.group_id) || prefixed {
            ty.published = false;
        }
    }
}

// =============================================================================
// Pruning
// =============================================================================

fn prune_taxonomy(tables: &mut RawTables, report: &mut PatchReport) {
    let categories = &tables.categories;
    let groups_before = tables.groups.len();
    tables.groups.retain(|_, group| categories.contains_key(&group.category_id));

    let groups = &tables.groups;
    let types_before = tables.types.len();
    tables
        .types
        .retain(|_, ty| ty.published && groups.contains_key(&ty.group_id));
    report.types_removed = types_before - tables.types.len();

    // A group survives iff a surviving type uses it
    let used_groups: HashSet<GroupId> = tables.types.values().map(|ty| ty.group_id).collect();
    tables.groups.retain(|id, group| {
        group.published = true;
        used_groups.contains(id)
    });
    report.groups_removed = groups_before - tables.groups.len();

    let used_categories: HashSet<CategoryId> =
        tables.groups.values().map(|group| group.category_id).collect();
    let categories_before = tables.categories.len();
    tables.categories.retain(|id, category| {
        category.published = true;
        used_categories.contains(id)
    });
    report.categories_removed = categories_before - tables.categories.len();
}

fn prune_dependents(tables: &mut RawTables, report: &mut PatchReport) {
    let types = &tables.types;
    let mut removed = 0;

    let before = tables.type_traits.len();
    tables.type_traits.retain(|id, _| types.contains_key(id));
    removed += before - tables.type_traits.len();
    for traits in tables.type_traits.values_mut() {
        traits
            .skill_bonuses
            .retain(|skill, _| *skill < 0 || types.contains_key(skill));
    }

    let before = tables.type_attributes.len();
    tables.type_attributes.retain(|id, _| types.contains_key(id));
    removed += before - tables.type_attributes.len();

    let before = tables.type_effects.len();
    tables.type_effects.retain(|id, _| types.contains_key(id));
    removed += before - tables.type_effects.len();

    let before = tables.reprocessing_materials.len();
    tables.reprocessing_materials.retain(|id, _| types.contains_key(id));
    removed += before - tables.reprocessing_materials.len();

    let before = tables.meta_types.len();
    tables.meta_types.retain(|id, _| types.contains_key(id));
    removed += before - tables.meta_types.len();

    removed += tables.variants.retain(|id| types.contains_key(&id));

    let mut activities_removed = 0;
    tables.industry_activities.retain(|blueprint, activities| {
        if !types.contains_key(blueprint) {
            activities_removed += activities.len();
            return false;
        }
        let before = activities.len();
        activities.retain(|_, activity| activity.products.keys().all(|p| types.contains_key(p)));
        activities_removed += before - activities.len();
        !activities.is_empty()
    });

    report.dependent_rows_removed = removed;
    report.activities_removed = activities_removed;
}

// =============================================================================
// Market tree
// =============================================================================

fn rebuild_market_tree(tables: &mut RawTables, rules: &Ruleset, report: &mut PatchReport) {
    let market_groups = &mut tables.market_groups;

    if let Some(root) = &rules.market_root {
        market_groups.insert(root.id, root.clone());
        market_groups.sort_keys();
        for group in market_groups.values_mut() {
            if group.parent_id.is_none() && group.id != root.id {
                group.parent_id = Some(root.id);
            }
        }
    }

    for &(child, parent) in &rules.market_reparents {
        if !market_groups.contains_key(&parent) {
            warn!(child, parent, "Re-parent target missing, rule skipped");
            report.rules_skipped += 1;
            continue;
        }
        match market_groups.get_mut(&child) {
            Some(group) => group.parent_id = Some(parent),
            None => {
                warn!(child, parent, "Re-parented market group missing, rule skipped");
                report.rules_skipped += 1;
            }
        }
    }

    // Closure upward from every group a surviving type is listed under
    let mut reachable = HashSet::new();
    for start in tables.types.values().filter_map(|ty| ty.market_group_id) {
        let mut current = Some(start);
        while let Some(id) = current {
            if !reachable.insert(id) {
                break;
            }
            current = market_groups.get(&id).and_then(|group| group.parent_id);
        }
    }

    let before = market_groups.len();
    market_groups.retain(|id, _| reachable.contains(id));
    report.market_groups_removed = before - market_groups.len();
}

// =============================================================================
// Attributes
// =============================================================================

fn attribute_mut<'a>(
    attributes: &'a mut indexmap::IndexMap<AttributeId, Attribute>,
    id: AttributeId,
) -> Result<&'a mut Attribute> {
    attributes
        .get_mut(&id)
        .ok_or_else(|| Error::Reference(format!("correction names undefined attribute {id}")))
}

fn correct_attributes(tables: &mut RawTables, rules: &Ruleset, report: &mut PatchReport) -> Result<()> {
    let attributes = &mut tables.attributes;

    for merge in &rules.attribute_merges {
        let from = attribute_mut(attributes, merge.from)?.clone();
        let onto = attribute_mut(attributes, merge.onto)?;
        onto.display_name = from.display_name;
        onto.unit_id = from.unit_id;
        onto.icon_id = from.icon_id;
        onto.published = from.published;
        report.attributes_corrected += 1;
    }
    for &(id, category) in &rules.attribute_categories {
        attribute_mut(attributes, id)?.category_id = Some(category);
        report.attributes_corrected += 1;
    }
    for &(id, unit) in &rules.attribute_units {
        attribute_mut(attributes, id)?.unit_id = Some(unit);
        report.attributes_corrected += 1;
    }

    if let Some(meta_level) = &rules.meta_level {
        attribute_mut(attributes, meta_level.attribute)?;
        for (type_id, meta_group) in &tables.meta_types {
            let Some(values) = tables.type_attributes.get_mut(type_id) else {
                continue;
            };
            let floor = meta_level.floor(*meta_group);
            if let Some(value) = values.get_mut(&meta_level.attribute) {
                if *value < floor {
                    *value = floor;
                    report.meta_levels_raised += 1;
                }
            }
        }
    }

    // Icon 0 means "no icon"
    for icon in tables
        .categories
        .values_mut()
        .map(|c| &mut c.icon_id)
        .chain(tables.groups.values_mut().map(|g| &mut g.icon_id))
        .chain(tables.attributes.values_mut().map(|a| &mut a.icon_id))
    {
        if *icon == Some(0) {
            *icon = None;
        }
    }
    Ok(())
}

// =============================================================================
// Map
// =============================================================================

fn backfill_map(tables: &mut RawTables, report: &mut PatchReport) {
    let regions = &tables.regions;
    for constellation in tables.constellations.values_mut() {
        if let Some(region) = regions.get(&constellation.region_id) {
            report.map_values_backfilled += inherit(&mut constellation.faction_id, region.faction_id)
                + inherit(&mut constellation.wormhole_class, region.wormhole_class);
        }
    }

    let constellations = &tables.constellations;
    for system in tables.solar_systems.values_mut() {
        if let Some(constellation) = constellations.get(&system.constellation_id) {
            report.map_values_backfilled += inherit(&mut system.faction_id, constellation.faction_id)
                + inherit(&mut system.wormhole_class, constellation.wormhole_class);
        }
    }
}

/// Fill `own` from `parent` when unset; returns 1 if it changed
fn inherit(own: &mut Option<i32>, parent: Option<i32>) -> usize {
    if own.is_none() && parent.is_some() {
        *own = parent;
        1
    } else {
        0
    }
}

// =============================================================================
// Exceptions
// =============================================================================

fn apply_exceptions(tables: &mut RawTables, rules: &Ruleset, report: &mut PatchReport) {
    for fix in &rules.description_fixes {
        let Some(ty) = tables.types.get_mut(&fix.type_id) else {
            warn!(type_id = fix.type_id, "Type for description fix missing, rule skipped");
            report.rules_skipped += 1;
            continue;
        };
        if let Some(description) = &mut ty.description {
            if let Some(fixed) = replace_settled(description, &fix.find, &fix.replace) {
                *description = fixed;
                report.exceptions_applied += 1;
            }
        }
    }

    for &(a, b) in &rules.variant_links {
        if !tables.types.contains_key(&a) || !tables.types.contains_key(&b) {
            warn!(a, b, "Type for variant link missing, rule skipped");
            report.rules_skipped += 1;
            continue;
        }
        if tables.variants.family_id(a).is_none() || tables.variants.family_id(a) != tables.variants.family_id(b) {
            tables.variants.join(a, b);
            report.exceptions_applied += 1;
        }
    }
}

/// Replace `find` until none is left, so a second pass has nothing to do.
///
/// Repeats only while the text shrinks; a replacement that is not shorter
/// than `find` is applied once.
fn replace_settled(text: &str, find: &str, replace: &str) -> Option<String> {
    if find.is_empty() || !text.contains(find) {
        return None;
    }
    let mut fixed = text.replace(find, replace);
    while replace.len() < find.len() && fixed.contains(find) {
        fixed = fixed.replace(find, replace);
    }
    Some(fixed)
}
