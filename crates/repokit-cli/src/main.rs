use std::sync::Arc;

use clap::Parser;
use cli::{Args, Commands};
use list::{find_entity, list_entities, list_models, ListOptions};
use logging::setup_logging;
use modify::{create_entity, delete_entities, update_entities};
use models::build_container;
use repokit_config::{paths::resolve_path, Config};
use repokit_core::Container;
use repokit_db::Database;
use tracing::debug;
use utils::COLOR;

mod cli;
mod list;
mod logging;
mod models;
mod modify;
mod utils;

/// Everything a command needs.
pub struct Context {
    pub config: Arc<Config>,
    pub container: Arc<Container>,
    pub json: bool,
}

fn create_context(config: Arc<Config>, json: bool) -> miette::Result<Context> {
    let db_path = config.database_path()?;
    debug!(path = %db_path.display(), "opening database");

    let db = Database::open(&db_path)?;
    let container = build_container(Arc::clone(&config), db)?;

    Ok(Context {
        config,
        container: Arc::new(container),
        json,
    })
}

fn handle_cli() -> miette::Result<()> {
    let args = Args::parse();

    setup_logging(&args);

    if args.no_color {
        if let Ok(mut color) = COLOR.write() {
            *color = false;
        }
    }

    let config_path = args
        .config
        .as_deref()
        .map(resolve_path)
        .transpose()?;
    let config = Arc::new(Config::load(config_path.as_deref())?);

    match args.command {
        Commands::Models => list_models(&config, args.json)?,
        command => {
            let ctx = create_context(config, args.json)?;

            match command {
                Commands::List {
                    model,
                    filters,
                    order,
                    dir,
                    limit,
                    page,
                    with,
                    all,
                } => {
                    let options = ListOptions {
                        filters,
                        order,
                        dir,
                        limit,
                        page,
                        with,
                        all,
                    };
                    list_entities(&ctx, &model, options)?;
                }
                Commands::Find {
                    model,
                    id,
                    by,
                } => find_entity(&ctx, &model, &id, by.as_deref())?,
                Commands::Create {
                    model,
                    set,
                } => create_entity(&ctx, &model, &set)?,
                Commands::Update {
                    model,
                    id,
                    set,
                    by,
                    bulk,
                } => update_entities(&ctx, &model, &id, &set, by.as_deref(), bulk)?,
                Commands::Delete {
                    model,
                    ids,
                } => delete_entities(&ctx, &model, &ids)?,
                Commands::Models => unreachable!(),
            }
        }
    }

    Ok(())
}

fn main() -> miette::Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    }))
    .ok();

    handle_cli()
}
