use anyhow::{Context, Result};
use eve_sde_index::{
    cli::{Cli, Commands, SourceArgs},
    config::Config,
    source::{self, sqlite},
    Ruleset, SdeData,
};
use serde_json::json;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse_args();

    match cli.command {
        Commands::Load { source } => {
            let start = Instant::now();
            let data = load(&source)?;

            println!("\nLoaded in {:.1}s\n", start.elapsed().as_secs_f64());
            for (name, count) in data.counts() {
                println!("  {:<28} {}", name, count);
            }
            if let Some(report) = data.patch_report() {
                println!(
                    "\nPatched: {} types, {} groups, {} categories, {} market groups removed; {} rules skipped",
                    report.types_removed,
                    report.groups_removed,
                    report.categories_removed,
                    report.market_groups_removed,
                    report.rules_skipped
                );
            }
        }

        Commands::Inspect { type_id, source } => {
            let data = load(&source)?;
            let summary = inspect(&data, type_id)
                .with_context(|| format!("Type {} not found", type_id))?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Commands::ListQueries => {
            println!("Relational export queries:\n");
            for name in sqlite::query_names() {
                println!("  {}", name);
            }
        }
    }

    Ok(())
}

fn load(args: &SourceArgs) -> Result<SdeData> {
    let config = Config::resolve(args.overrides()).context("Failed to resolve configuration")?;
    let reader = source::open(&config)?;
    let ruleset = config.patch.then(Ruleset::standard);
    source::load(reader.as_ref(), ruleset.as_ref())
        .with_context(|| format!("Failed to load {}", config.path.display()))
}

fn inspect(data: &SdeData, type_id: i32) -> Option<serde_json::Value> {
    let ty = data.types().get(&type_id)?;
    let group = data.groups().get(&ty.group_id);
    let category = group.and_then(|g| data.categories().get(&g.category_id));
    let market_path: Vec<&str> = ty
        .market_group_id
        .map(|id| data.market_group_path(id))
        .unwrap_or_default()
        .into_iter()
        .map(|g| g.name.as_str())
        .collect();
    let dependants = data.views().skill_dependants.get(&type_id);

    Some(json!({
        "type": ty,
        "group": group.map(|g| &g.name),
        "category": category.map(|c| &c.name),
        "market_path": market_path,
        "variants": data.type_variants(type_id),
        "meta_group": data.meta_types().get(&type_id),
        "attributes": data.type_attributes().get(&type_id),
        "traits": data.type_traits().get(&type_id),
        "required_by": dependants,
    }))
}
