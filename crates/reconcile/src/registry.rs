//! Resource registry
//!
//! Holds every declared resource of the application. It is built once at
//! startup and passed explicitly to the engine; after `build()` it is
//! immutable and can be shared across threads without locking.

use crate::error::{Error, Result};
use crate::model::{Policy, Role, Rpc, Table};
use crate::types::ResourceKind;
use std::collections::HashMap;
use std::sync::Arc;

/// Immutable set of declared resources
#[derive(Debug, Default, Clone)]
pub struct ResourceRegistry {
    roles: Vec<Arc<dyn Role>>,
    tables: Vec<Arc<dyn Table>>,
    policies: Vec<Arc<dyn Policy>>,
    rpcs: Vec<Arc<dyn Rpc>>,
    /// model name -> index into `tables`
    models: HashMap<String, usize>,
}

impl ResourceRegistry {
    /// Start registering resources
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn roles(&self) -> &[Arc<dyn Role>] {
        &self.roles
    }

    pub fn tables(&self) -> &[Arc<dyn Table>] {
        &self.tables
    }

    pub fn policies(&self) -> &[Arc<dyn Policy>] {
        &self.policies
    }

    pub fn rpcs(&self) -> &[Arc<dyn Rpc>] {
        &self.rpcs
    }

    /// Look up a table by its registered model name (case-sensitive)
    pub fn find_model(&self, model_name: &str) -> Option<&Arc<dyn Table>> {
        self.models.get(model_name).map(|&i| &self.tables[i])
    }

    /// Whether `model_name` is registered
    pub fn is_registered(&self, model_name: &str) -> bool {
        self.models.contains_key(model_name)
    }

    /// Number of declared resources of a kind
    pub fn count(&self, kind: ResourceKind) -> usize {
        match kind {
            ResourceKind::Role => self.roles.len(),
            ResourceKind::Table => self.tables.len(),
            ResourceKind::Policy => self.policies.len(),
            ResourceKind::Function => self.rpcs.len(),
        }
    }

    /// Total number of declared resources
    pub fn len(&self) -> usize {
        ResourceKind::ALL.iter().map(|k| self.count(*k)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Collects declared resources before freezing them into a registry
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    registry: ResourceRegistry,
}

impl RegistryBuilder {
    pub fn role(mut self, role: Arc<dyn Role>) -> Self {
        self.registry.roles.push(role);
        self
    }

    pub fn table(mut self, table: Arc<dyn Table>) -> Self {
        self.registry.tables.push(table);
        self
    }

    pub fn policy(mut self, policy: Arc<dyn Policy>) -> Self {
        self.registry.policies.push(policy);
        self
    }

    pub fn rpc(mut self, rpc: Arc<dyn Rpc>) -> Self {
        self.registry.rpcs.push(rpc);
        self
    }

    /// Freeze the registry
    ///
    /// Fails when two tables are registered under the same model name.
    pub fn build(mut self) -> Result<ResourceRegistry> {
        let mut models = HashMap::with_capacity(self.registry.tables.len());
        for (i, table) in self.registry.tables.iter().enumerate() {
            let model = table.model_name().to_string();
            if models.insert(model.clone(), i).is_some() {
                return Err(Error::DuplicateName {
                    kind: ResourceKind::Table,
                    name: model,
                });
            }
        }
        self.registry.models = models;

        log::debug!(
            "registered {} roles, {} tables, {} policies, {} functions",
            self.registry.roles.len(),
            self.registry.tables.len(),
            self.registry.policies.len(),
            self.registry.rpcs.len()
        );

        Ok(self.registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ColumnDef, Declared};

    #[derive(Debug)]
    struct Model {
        model: &'static str,
        table: &'static str,
    }

    impl Declared for Model {
        fn name(&self) -> &str {
            self.table
        }
    }

    impl Table for Model {
        fn model_name(&self) -> &str {
            self.model
        }

        fn columns(&self) -> &[ColumnDef] {
            &[]
        }
    }

    #[test]
    fn test_find_model_by_registered_name() {
        let registry = ResourceRegistry::builder()
            .table(Arc::new(Model {
                model: "Profile",
                table: "profiles",
            }))
            .build()
            .unwrap();

        assert!(registry.is_registered("Profile"));
        assert!(!registry.is_registered("profile"));
        assert!(!registry.is_registered("profiles"));
        assert_eq!(registry.find_model("Profile").unwrap().name(), "profiles");
        assert_eq!(registry.count(ResourceKind::Table), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_model_names_rejected() {
        let err = ResourceRegistry::builder()
            .table(Arc::new(Model {
                model: "Post",
                table: "posts",
            }))
            .table(Arc::new(Model {
                model: "Post",
                table: "archived_posts",
            }))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateName { .. }));
    }

    #[test]
    fn test_empty_registry() {
        let registry = ResourceRegistry::builder().build().unwrap();
        assert!(registry.is_empty());
        assert!(registry.find_model("Anything").is_none());
    }
}
