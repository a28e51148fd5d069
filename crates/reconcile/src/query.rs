//! Read-query builder
//!
//! Builds REST query strings of the form
//! `table?select=...&col=eq.v&or=(...)&order=...&limit=N&offset=N`.

use crate::error::ConfigurationError;
use crate::registry::ResourceRegistry;
use crate::relation;
use std::collections::HashMap;
use std::fmt;

/// Comparison operator of a filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    Ilike,
    Is,
    In,
}

impl Operator {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Neq => "neq",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Like => "like",
            Self::Ilike => "ilike",
            Self::Is => "is",
            Self::In => "in",
        }
    }
}

/// A single column filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub operator: Operator,
    pub value: String,
}

impl Filter {
    pub fn new(column: impl Into<String>, operator: Operator, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            operator,
            value: value.into(),
        }
    }

    /// `col=op.value`, as a top-level query parameter
    fn render_and(&self) -> String {
        format!("{}={}.{}", self.column, self.operator.as_str(), self.value)
    }

    /// `col.op.value`, inside an `or=(...)` group
    fn render_or(&self) -> String {
        format!("{}.{}.{}", self.column, self.operator.as_str(), self.value)
    }
}

/// Read query against one table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    table: String,
    columns: Vec<String>,
    and_filters: Vec<Filter>,
    or_filters: Vec<Filter>,
    order: Vec<String>,
    limit: usize,
    offset: usize,
}

impl Query {
    /// Query a table by its table name
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Default::default()
        }
    }

    /// Query the table registered under `model`
    pub fn for_model(registry: &ResourceRegistry, model: &str) -> Result<Self, ConfigurationError> {
        let table = registry
            .find_model(model)
            .ok_or_else(|| ConfigurationError::UnregisteredResource {
                name: model.to_string(),
            })?;
        Ok(Self::new(table.name()))
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Append selected columns
    #[must_use]
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Embed a relation path as an extra selected column
    pub fn with(
        mut self,
        registry: &ResourceRegistry,
        path: &str,
        columns: &HashMap<String, Vec<String>>,
        foreign_keys: &HashMap<String, String>,
    ) -> Result<Self, ConfigurationError> {
        let embed = relation::resolve(registry, path, columns, foreign_keys)?;
        self.columns.push(embed);
        Ok(self)
    }

    /// Add an AND filter
    #[must_use]
    pub fn filter(mut self, column: &str, operator: Operator, value: impl fmt::Display) -> Self {
        self.and_filters
            .push(Filter::new(column, operator, value.to_string()));
        self
    }

    #[must_use]
    pub fn eq(self, column: &str, value: impl fmt::Display) -> Self {
        self.filter(column, Operator::Eq, value)
    }

    #[must_use]
    pub fn neq(self, column: &str, value: impl fmt::Display) -> Self {
        self.filter(column, Operator::Neq, value)
    }

    #[must_use]
    pub fn gt(self, column: &str, value: impl fmt::Display) -> Self {
        self.filter(column, Operator::Gt, value)
    }

    #[must_use]
    pub fn gte(self, column: &str, value: impl fmt::Display) -> Self {
        self.filter(column, Operator::Gte, value)
    }

    #[must_use]
    pub fn lt(self, column: &str, value: impl fmt::Display) -> Self {
        self.filter(column, Operator::Lt, value)
    }

    #[must_use]
    pub fn lte(self, column: &str, value: impl fmt::Display) -> Self {
        self.filter(column, Operator::Lte, value)
    }

    #[must_use]
    pub fn like(self, column: &str, pattern: &str) -> Self {
        self.filter(column, Operator::Like, pattern)
    }

    #[must_use]
    pub fn ilike(self, column: &str, pattern: &str) -> Self {
        self.filter(column, Operator::Ilike, pattern)
    }

    /// `is` check, for `null`, `true` and `false`
    #[must_use]
    pub fn is(self, column: &str, value: &str) -> Self {
        self.filter(column, Operator::Is, value)
    }

    /// Membership in a list of values
    #[must_use]
    pub fn in_list<I, T>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: fmt::Display,
    {
        let list: Vec<String> = values.into_iter().map(|v| v.to_string()).collect();
        self.filter(column, Operator::In, format!("({})", list.join(",")))
    }

    /// Add a filter to the `or=(...)` group
    #[must_use]
    pub fn or_where(mut self, column: &str, operator: Operator, value: impl fmt::Display) -> Self {
        self.or_filters
            .push(Filter::new(column, operator, value.to_string()));
        self
    }

    #[must_use]
    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        let direction = if ascending { "asc" } else { "desc" };
        self.order.push(format!("{column}.{direction}"));
        self
    }

    /// Row limit, `0` for none
    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Rows to skip, `0` for none
    #[must_use]
    pub const fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Render the path and query string, relative to the REST base
    pub fn to_query_string(&self) -> String {
        let mut out = format!("{}?select=", self.table);
        if self.columns.is_empty() {
            out.push('*');
        } else {
            out.push_str(&self.columns.join(","));
        }

        if !self.and_filters.is_empty() {
            let filters: Vec<String> = self.and_filters.iter().map(Filter::render_and).collect();
            out.push('&');
            out.push_str(&filters.join("&"));
        }

        if !self.or_filters.is_empty() {
            let filters: Vec<String> = self.or_filters.iter().map(Filter::render_or).collect();
            out.push_str(&format!("&or=({})", filters.join(",")));
        }

        if !self.order.is_empty() {
            out.push_str(&format!("&order={}", self.order.join(",")));
        }

        if self.limit > 0 {
            out.push_str(&format!("&limit={}", self.limit));
        }

        if self.offset > 0 {
            out.push_str(&format!("&offset={}", self.offset));
        }

        out
    }

    /// Full URL under `{public_url}/rest/v1/`
    pub fn url(&self, public_url: &str) -> String {
        format!(
            "{}/rest/v1/{}",
            public_url.trim_end_matches('/'),
            self.to_query_string()
        )
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_query_string())
    }
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
            .table(Arc::new(Model("Post", "posts")))
            .table(Arc::new(Model("Author", "authors")))
            .build()
            .unwrap()
    }

    #[test]
    fn test_select_all_by_default() {
        assert_eq!(Query::new("posts").to_query_string(), "posts?select=*");
    }

    #[test]
    fn test_full_query_string() {
        let query = Query::new("posts")
            .select(["id", "title"])
            .eq("published", true)
            .gte("views", 10)
            .or_where("status", Operator::Eq, "draft")
            .or_where("status", Operator::Eq, "review")
            .order("created_at", false)
            .limit(20)
            .offset(40);

        assert_eq!(
            query.to_query_string(),
            "posts?select=id,title&published=eq.true&views=gte.10\
             &or=(status.eq.draft,status.eq.review)&order=created_at.desc&limit=20&offset=40"
        );
    }

    #[test]
    fn test_in_list_and_is() {
        let query = Query::new("posts")
            .in_list("id", [1, 2, 3])
            .is("deleted_at", "null");
        assert_eq!(
            query.to_query_string(),
            "posts?select=*&id=in.(1,2,3)&deleted_at=is.null"
        );
    }

    #[test]
    fn test_for_model_with_embed() {
        let registry = registry();
        let query = Query::for_model(&registry, "Post")
            .unwrap()
            .select(["id"])
            .with(&registry, "Author", &HashMap::new(), &HashMap::new())
            .unwrap();
        assert_eq!(query.to_query_string(), "posts?select=id,authors(*)");
    }

    #[test]
    fn test_unknown_model() {
        let err = Query::for_model(&registry(), "Comment").unwrap_err();
        assert!(matches!(err, ConfigurationError::UnregisteredResource { .. }));
    }

    #[test]
    fn test_url() {
        let query = Query::new("posts").limit(1);
        assert_eq!(
            query.url("https://abc.example.co/"),
            "https://abc.example.co/rest/v1/posts?select=*&limit=1"
        );
    }
}
