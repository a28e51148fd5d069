//! `query` - print the REST URL of a read query

use anyhow::{Context as _, Result, bail};
use reconcile::{Query, ResourceRegistry};
use std::collections::HashMap;

use super::Project;
use crate::Context;
use crate::cli::QueryArgs;

pub fn run(ctx: &Context, args: &QueryArgs) -> Result<()> {
    let project = Project::load(ctx)?;
    let query = build(&project.registry, args)?;
    let base = project.config.public_url()?;
    println!("{}", query.url(&base));
    Ok(())
}

/// Build the query described by the command-line arguments
pub fn build(registry: &ResourceRegistry, args: &QueryArgs) -> Result<Query> {
    let mut query = Query::for_model(registry, &args.model)?.select(args.select.iter().cloned());

    if let Some(path) = &args.with {
        let columns: HashMap<String, Vec<String>> = parse_pairs(&args.columns, "--columns")?
            .into_iter()
            .map(|(model, cols)| {
                let cols = cols
                    .split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string)
                    .collect();
                (model, cols)
            })
            .collect();
        let foreign_keys: HashMap<String, String> =
            parse_pairs(&args.foreign_keys, "--fk")?.into_iter().collect();

        query = query.with(registry, path, &columns, &foreign_keys)?;
    }

    for (column, value) in parse_pairs(&args.eq, "--eq")? {
        query = query.eq(&column, value);
    }

    if let Some(order) = &args.order {
        query = match order.strip_suffix(".desc") {
            Some(column) => query.order(column, false),
            None => query.order(order.strip_suffix(".asc").unwrap_or(order), true),
        };
    }

    Ok(query.limit(args.limit).offset(args.offset))
}

/// Parse `KEY=VALUE` arguments
fn parse_pairs(values: &[String], flag: &str) -> Result<Vec<(String, String)>> {
    values
        .iter()
        .map(|raw| -> Result<(String, String)> {
            let (key, value) = raw
                .split_once('=')
                .with_context(|| format!("{flag} expects KEY=VALUE, got '{raw}'"))?;
            if key.trim().is_empty() {
                bail!("{flag} expects KEY=VALUE, got '{raw}'");
            }
            Ok((key.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reconcile::ConfigurationError;

    fn registry() -> ResourceRegistry {
        crate::manifest::Manifest::parse(
            r#"
[[tables]]
name = "posts"
model = "Post"

[[tables]]
name = "authors"
model = "Author"

[[tables]]
name = "profiles"
model = "Profile"
"#,
        )
        .unwrap()
        .into_registry()
        .unwrap()
    }

    fn args(model: &str) -> QueryArgs {
        QueryArgs {
            model: model.to_string(),
            select: Vec::new(),
            with: None,
            columns: Vec::new(),
            foreign_keys: Vec::new(),
            eq: Vec::new(),
            order: None,
            limit: 0,
            offset: 0,
        }
    }

    #[test]
    fn test_build_with_embed() {
        let mut args = args("Post");
        args.select = vec!["id".into(), "title".into()];
        args.with = Some("Author.Profile".into());
        args.columns = vec!["Author=id, name".into()];
        args.foreign_keys = vec!["Author=posts_author_id_fkey".into()];
        args.eq = vec!["published=true".into()];
        args.order = Some("created_at.desc".into());
        args.limit = 10;

        let query = build(&registry(), &args).unwrap();
        assert_eq!(
            query.to_query_string(),
            "posts?select=id,title,authors!posts_author_id_fkey(id,name,profiles(*))\
             &published=eq.true&order=created_at.desc&limit=10"
        );
    }

    #[test]
    fn test_unregistered_model_is_configuration_error() {
        let err = build(&registry(), &args("Comment")).unwrap_err();
        assert!(err.downcast_ref::<ConfigurationError>().is_some());

        let mut args = args("Post");
        args.with = Some("Author.Profile.Post.Author".into());
        let err = build(&registry(), &args).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigurationError>(),
            Some(ConfigurationError::RelationTooDeep { .. })
        ));
    }

    #[test]
    fn test_parse_pairs() {
        let pairs = parse_pairs(&["a=1".into(), " b = x=y ".into()], "--eq").unwrap();
        assert_eq!(
            pairs,
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "x=y".to_string())
            ]
        );
        assert!(parse_pairs(&["novalue".into()], "--eq").is_err());
        assert!(parse_pairs(&["=1".into()], "--eq").is_err());
    }
}
