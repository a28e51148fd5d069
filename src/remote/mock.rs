//! In-memory remote for tests

use super::{Method, RemoteApi, RemoteError, Request};
use reconcile::ResourceKind;
use reconcile::objects;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct State {
    roles: Vec<objects::Role>,
    tables: Vec<objects::Table>,
    policies: Vec<objects::Policy>,
    functions: Vec<objects::Function>,
    requests: Vec<Request>,
    failing_fetches: HashSet<ResourceKind>,
    failing_names: HashSet<String>,
    next_id: i64,
}

/// Remote that stores records in memory and records every request
#[derive(Debug, Clone, Default)]
pub struct MockRemote {
    state: Arc<Mutex<State>>,
}

impl MockRemote {
    pub fn new() -> Self {
        let remote = Self::default();
        remote.state.lock().unwrap().next_id = 100;
        remote
    }

    pub fn add_role(&self, name: &str) {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id;
        state.next_id += 1;
        state.roles.push(objects::Role {
            id,
            name: name.to_string(),
            connection_limit: -1,
            inherit_role: true,
            ..Default::default()
        });
    }

    pub fn add_table(&self, schema: &str, name: &str) {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id;
        state.next_id += 1;
        state.tables.push(objects::Table {
            id,
            schema: schema.to_string(),
            name: name.to_string(),
            rls_enabled: true,
            ..Default::default()
        });
    }

    pub fn add_policy(&self, table: &str, name: &str) {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id;
        state.next_id += 1;
        state.policies.push(objects::Policy {
            id,
            schema: "public".to_string(),
            table: table.to_string(),
            name: name.to_string(),
            ..Default::default()
        });
    }

    pub fn add_function(&self, name: &str, arguments: &str) {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id;
        state.next_id += 1;
        state.functions.push(objects::Function {
            id,
            schema: "public".to_string(),
            name: name.to_string(),
            argument_types: arguments.to_string(),
            identity_argument_types: arguments.to_string(),
            ..Default::default()
        });
    }

    /// Make fetching one kind fail with HTTP 500
    pub fn fail_fetch(&self, kind: ResourceKind) {
        self.state.lock().unwrap().failing_fetches.insert(kind);
    }

    /// Make requests for a resource name fail with HTTP 500
    pub fn fail_apply(&self, name: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_names
            .insert(name.to_string());
    }

    /// Requests applied so far, in order
    pub fn requests(&self) -> Vec<Request> {
        self.state.lock().unwrap().requests.clone()
    }

    fn check_fetch(&self, kind: ResourceKind) -> Result<(), RemoteError> {
        if self.state.lock().unwrap().failing_fetches.contains(&kind) {
            return Err(RemoteError::Status {
                status: 500,
                url: format!("mock://{}", kind.plural()),
            });
        }
        Ok(())
    }
}

impl RemoteApi for MockRemote {
    fn fetch_roles(&self) -> Result<Vec<objects::Role>, RemoteError> {
        self.check_fetch(ResourceKind::Role)?;
        Ok(self.state.lock().unwrap().roles.clone())
    }

    fn fetch_tables(&self) -> Result<Vec<objects::Table>, RemoteError> {
        self.check_fetch(ResourceKind::Table)?;
        Ok(self.state.lock().unwrap().tables.clone())
    }

    fn fetch_policies(&self) -> Result<Vec<objects::Policy>, RemoteError> {
        self.check_fetch(ResourceKind::Policy)?;
        Ok(self.state.lock().unwrap().policies.clone())
    }

    fn fetch_functions(&self) -> Result<Vec<objects::Function>, RemoteError> {
        self.check_fetch(ResourceKind::Function)?;
        Ok(self.state.lock().unwrap().functions.clone())
    }

    fn apply(&self, request: &Request) -> Result<(), RemoteError> {
        let mut state = self.state.lock().unwrap();
        if state.failing_names.contains(&request.name) {
            return Err(RemoteError::Status {
                status: 500,
                url: format!("mock:/{}", request.path()),
            });
        }
        if request.method != Method::Post && request.id.is_none() {
            return Err(RemoteError::MissingId {
                kind: request.kind,
                name: request.name.clone(),
            });
        }
        state.requests.push(request.clone());
        Ok(())
    }
}
