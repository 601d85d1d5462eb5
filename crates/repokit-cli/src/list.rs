use nu_ansi_term::Color::{Blue, Cyan, Green};
use repokit_config::Config;
use repokit_core::Repository;
use serde_json::{json, Map, Value};
use tracing::info;

use crate::{
    utils::{parse_assignments, parse_value, print_json, Colored},
    Context,
};

pub fn list_models(config: &Config, json: bool) -> miette::Result<()> {
    if json {
        let models = config
            .models
            .iter()
            .map(|model| {
                json!({
                    "name": model.name,
                    "table": model.table,
                    "key": model.get_key(),
                    "fillable": model.fillable,
                })
            })
            .collect::<Vec<_>>();
        return print_json(&Value::Array(models), true);
    }

    if config.models.is_empty() {
        info!("No models declared");
        return Ok(());
    }

    for model in &config.models {
        let fillable = if model.fillable.is_empty() {
            "*".to_string()
        } else {
            model.fillable.join(", ")
        };
        info!(
            "{} {} (key: {}) [{}]",
            Colored(Green, &model.name),
            Colored(Blue, &model.table),
            Colored(Cyan, model.get_key()),
            fillable
        );
    }

    Ok(())
}

pub struct ListOptions {
    pub filters: Vec<String>,
    pub order: Option<String>,
    pub dir: Option<String>,
    pub limit: Option<u64>,
    pub page: Option<u64>,
    pub with: Vec<String>,
    pub all: bool,
}

impl ListOptions {
    /// Shapes the options as declarative filter input.
    fn to_input(&self) -> miette::Result<Value> {
        let mut input = Map::new();
        input.insert(
            "order".into(),
            json!({ "col": self.order, "dir": self.dir }),
        );
        input.insert(
            "filters".into(),
            Value::Object(parse_assignments(&self.filters)?),
        );
        if let Some(limit) = self.limit {
            input.insert("limit".into(), limit.into());
        }
        if let Some(page) = self.page {
            input.insert("page".into(), page.into());
        }
        Ok(Value::Object(input))
    }
}

pub fn list_entities(ctx: &Context, model: &str, options: ListOptions) -> miette::Result<()> {
    let mut repository = Repository::new(ctx.container.clone(), model)?;
    let input = options.to_input()?;
    let with = options.with.iter().map(String::as_str).collect::<Vec<_>>();

    let output = if options.all {
        let entities = repository.filter_get(&input, &with)?;
        Value::Array(entities.iter().map(|entity| entity.to_json()).collect())
    } else {
        let page = repository.filter_paginate(&input, &with, ctx.config.get_pagination_size())?;
        serde_json::to_value(page.map(|entity| entity.to_json()))
            .map_err(|err| miette::miette!("Failed to serialize page: {err}"))?
    };

    print_json(&output, ctx.json)
}

pub fn find_entity(ctx: &Context, model: &str, id: &str, by: Option<&str>) -> miette::Result<()> {
    let mut repository = Repository::new(ctx.container.clone(), model)?;
    let id = parse_value(id);

    let entity = match by {
        Some(attribute) => repository.find_by(attribute, id.clone(), &[])?,
        None => repository.find(id.clone(), &[])?,
    };

    match entity {
        Some(entity) => print_json(&entity.to_json(), ctx.json),
        None => {
            info!("{} {} not found", model, Colored(Cyan, id));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> ListOptions {
        ListOptions {
            filters: Vec::new(),
            order: None,
            dir: None,
            limit: None,
            page: None,
            with: Vec::new(),
            all: false,
        }
    }

    #[test]
    fn test_to_input_defaults() {
        let input = options().to_input().unwrap();
        assert_eq!(
            input,
            json!({"order": {"col": null, "dir": null}, "filters": {}})
        );
    }

    #[test]
    fn test_to_input_shapes_order_and_paging() {
        let input = ListOptions {
            filters: vec!["name=ada".into(), "min_age=30".into()],
            order: Some("age,name".into()),
            dir: Some("asc".into()),
            limit: Some(5),
            page: Some(2),
            ..options()
        }
        .to_input()
        .unwrap();

        assert_eq!(input["order"], json!({"col": "age,name", "dir": "asc"}));
        assert_eq!(input["filters"], json!({"name": "ada", "min_age": 30}));
        assert_eq!(input["limit"], json!(5));
        assert_eq!(input["page"], json!(2));
    }

    #[test]
    fn test_to_input_rejects_bad_filter() {
        let result = ListOptions {
            filters: vec!["name".into()],
            ..options()
        }
        .to_input();
        assert!(result.is_err());
    }
}
