//! Relation resolver
//!
//! Turns a dotted path of registered model names (`Post.Author.Profile`)
//! into the nested embedding expression understood by the REST layer
//! (`posts(*,authors(*,profiles(*)))`).

use crate::error::ConfigurationError;
use crate::registry::ResourceRegistry;
use std::collections::HashMap;

/// Deepest supported relation path
pub const MAX_DEPTH: usize = 3;

/// Resolve a relation path into an embed expression
///
/// `columns` and `foreign_keys` are keyed by model name. A model without a
/// column list selects `*`; a model with a foreign key hint renders as
/// `table!fk(...)`.
pub fn resolve(
    registry: &ResourceRegistry,
    path: &str,
    columns: &HashMap<String, Vec<String>>,
    foreign_keys: &HashMap<String, String>,
) -> Result<String, ConfigurationError> {
    let segments = split_path(path)?;

    let mut tables = Vec::with_capacity(segments.len());
    for segment in &segments {
        let table = registry.find_model(segment).ok_or_else(|| {
            ConfigurationError::UnregisteredResource {
                name: (*segment).to_string(),
            }
        })?;
        tables.push(table.name());
    }

    let mut inner: Option<String> = None;
    for (segment, table) in segments.iter().zip(tables).rev() {
        let cols = columns
            .get(*segment)
            .filter(|c| !c.is_empty())
            .map_or_else(|| "*".to_string(), |c| c.join(","));

        let mut rendered = String::from(table);
        if let Some(fk) = foreign_keys.get(*segment).filter(|f| !f.is_empty()) {
            rendered.push('!');
            rendered.push_str(fk);
        }
        rendered.push('(');
        rendered.push_str(&cols);
        if let Some(inner) = inner.take() {
            rendered.push(',');
            rendered.push_str(&inner);
        }
        rendered.push(')');

        inner = Some(rendered);
    }

    let resolved = inner.ok_or(ConfigurationError::EmptyRelationPath)?;
    log::debug!("resolved relation {path} -> {resolved}");
    Ok(resolved)
}

fn split_path(path: &str) -> Result<Vec<&str>, ConfigurationError> {
    let path = path.trim();
    if path.is_empty() {
        return Err(ConfigurationError::EmptyRelationPath);
    }

    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(ConfigurationError::InvalidRelationPath {
            path: path.to_string(),
        });
    }
    if segments.len() > MAX_DEPTH {
        return Err(ConfigurationError::RelationTooDeep {
            path: path.to_string(),
            max: MAX_DEPTH,
        });
    }

    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ColumnDef, Declared, Table};
    use std::sync::Arc;

    #[derive(Debug)]
    struct Model(&'static str, &'static str);

    impl Declared for Model {
        fn name(&self) -> &str {
            self.1
        }
    }

    impl Table for Model {
        fn model_name(&self) -> &str {
            self.0
        }

        fn columns(&self) -> &[ColumnDef] {
            &[]
        }
    }

    fn registry() -> ResourceRegistry {
        ResourceRegistry::builder()
            .table(Arc::new(Model("A", "a")))
            .table(Arc::new(Model("B", "b")))
            .table(Arc::new(Model("C", "c")))
            .table(Arc::new(Model("D", "d")))
            .build()
            .unwrap()
    }

    fn none() -> (HashMap<String, Vec<String>>, HashMap<String, String>) {
        (HashMap::new(), HashMap::new())
    }

    #[test]
    fn test_two_level_path() {
        let (cols, fks) = none();
        assert_eq!(resolve(&registry(), "A.B", &cols, &fks).unwrap(), "a(*,b(*))");
    }

    #[test]
    fn test_single_and_three_levels() {
        let (cols, fks) = none();
        let registry = registry();
        assert_eq!(resolve(&registry, "C", &cols, &fks).unwrap(), "c(*)");
        assert_eq!(
            resolve(&registry, "A.B.C", &cols, &fks).unwrap(),
            "a(*,b(*,c(*)))"
        );
    }

    #[test]
    fn test_too_deep() {
        let (cols, fks) = none();
        let err = resolve(&registry(), "A.B.C.D", &cols, &fks).unwrap_err();
        assert!(matches!(err, ConfigurationError::RelationTooDeep { max: 3, .. }));
    }

    #[test]
    fn test_unregistered_segment() {
        let (cols, fks) = none();
        let err = resolve(&registry(), "A.Z", &cols, &fks).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::UnregisteredResource {
                name: "Z".to_string()
            }
        );
        // table names are not model names
        assert!(resolve(&registry(), "a", &cols, &fks).is_err());
    }

    #[test]
    fn test_malformed_paths() {
        let (cols, fks) = none();
        let registry = registry();
        assert_eq!(
            resolve(&registry, "  ", &cols, &fks).unwrap_err(),
            ConfigurationError::EmptyRelationPath
        );
        assert!(matches!(
            resolve(&registry, "A..B", &cols, &fks).unwrap_err(),
            ConfigurationError::InvalidRelationPath { .. }
        ));
    }

    #[test]
    fn test_columns_and_foreign_keys() {
        let mut cols = HashMap::new();
        cols.insert("A".to_string(), vec!["id".to_string(), "title".to_string()]);
        cols.insert("B".to_string(), vec![]);
        let mut fks = HashMap::new();
        fks.insert("B".to_string(), "a_author_id_fkey".to_string());

        assert_eq!(
            resolve(&registry(), "A.B", &cols, &fks).unwrap(),
            "a(id,title,b!a_author_id_fkey(*))"
        );
    }
}
