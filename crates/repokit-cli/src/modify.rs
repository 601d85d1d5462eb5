use nu_ansi_term::Color::{Cyan, Green, Red};
use repokit_core::Repository;
use serde_json::Value;
use tracing::{info, warn};

use crate::{
    utils::{parse_assignments, parse_value, print_json, Colored},
    Context,
};

pub fn create_entity(ctx: &Context, model: &str, set: &[String]) -> miette::Result<()> {
    let mut repository = Repository::new(ctx.container.clone(), model)?;
    let data = parse_assignments(set)?;

    let entity = repository.create(&data)?;
    if !entity.exists() {
        warn!("Creating {} was cancelled", model);
        return Ok(());
    }

    print_json(&entity.to_json(), ctx.json)
}

pub fn update_entities(
    ctx: &Context,
    model: &str,
    id: &str,
    set: &[String],
    by: Option<&str>,
    bulk: bool,
) -> miette::Result<()> {
    let mut repository = Repository::new(ctx.container.clone(), model)?;
    let data = parse_assignments(set)?;
    let attribute = by.unwrap_or(repository.get_key_name()).to_string();
    let id = parse_value(id);

    let updated = if bulk {
        repository.update_bulk(&data, id, &attribute)?
    } else {
        repository.update(&data, id, &attribute)?
    };

    info!(
        "Updated {} {}",
        Colored(if updated > 0 { Green } else { Red }, updated),
        plural(model, updated)
    );
    Ok(())
}

pub fn delete_entities(ctx: &Context, model: &str, ids: &[String]) -> miette::Result<()> {
    let mut repository = Repository::new(ctx.container.clone(), model)?;
    let ids = ids.iter().map(|id| parse_value(id)).collect::<Vec<Value>>();
    let requested = ids.len();

    let deleted = repository.delete(ids)?;

    info!(
        "Deleted {} of {} {}",
        Colored(if deleted > 0 { Green } else { Red }, deleted),
        Colored(Cyan, requested),
        plural(model, requested)
    );
    Ok(())
}

fn plural(model: &str, count: usize) -> String {
    if count == 1 {
        model.to_string()
    } else {
        format!("{model}s")
    }
}
