//! In-memory cloud used by the provisioner tests

use crate::error::ProvisionError;
use crate::provider::{CloudProvider, Connector};
use crate::types::{
    AccountOutcome, BucketOutcome, BucketOwnership, BucketSpec, KeyMaterial, ProjectId,
    RoleOutcome, ServiceAccount, ServiceAccountSpec,
};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owner {
    ThisProject,
    OtherProject,
}

#[derive(Default)]
pub struct CloudState {
    pub buckets: HashMap<String, Owner>,
    pub accounts: HashMap<String, ServiceAccount>,
    /// (role, member)
    pub bindings: BTreeSet<(String, String)>,
    /// Roles whose grant fails with a permission error
    pub denied_roles: HashSet<String>,
    /// Key creation fails with a quota error
    pub key_limit_reached: bool,
    /// Bucket creation fails with a permission error
    pub storage_denied: bool,
    pub keys_issued: u32,
    /// Every API call, in order
    pub calls: Vec<String>,
    /// Calls that changed state (keys excluded)
    pub mutations: Vec<String>,
}

/// Shared fake; clones see the same state
#[derive(Clone, Default)]
pub struct FakeCloud {
    pub state: Arc<Mutex<CloudState>>,
}

impl FakeCloud {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bucket(self, name: &str, owner: Owner) -> Self {
        self.state
            .lock()
            .unwrap()
            .buckets
            .insert(name.to_string(), owner);
        self
    }

    pub fn snapshot<T>(&self, f: impl FnOnce(&CloudState) -> T) -> T {
        f(&self.state.lock().unwrap())
    }

    pub fn update(&self, f: impl FnOnce(&mut CloudState)) {
        f(&mut self.state.lock().unwrap())
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl CloudProvider for FakeCloud {
    async fn bucket_ownership(&self, name: &str) -> Result<BucketOwnership, ProvisionError> {
        self.record(format!("lookup_bucket {}", name));
        Ok(match self.state.lock().unwrap().buckets.get(name) {
            Some(Owner::ThisProject) => BucketOwnership::Owned,
            Some(Owner::OtherProject) => BucketOwnership::Foreign,
            None => BucketOwnership::Absent,
        })
    }

    async fn create_bucket(&self, spec: &BucketSpec) -> Result<BucketOutcome, ProvisionError> {
        self.record(format!("create_bucket {}", spec.name));
        let mut state = self.state.lock().unwrap();
        if state.storage_denied {
            return Err(ProvisionError::PermissionOrApi {
                context: format!("Failed to create bucket {}", spec.name),
                message: "does not have storage.buckets.create access".into(),
            });
        }
        match state.buckets.get(&spec.name) {
            Some(Owner::ThisProject) => Ok(BucketOutcome::AlreadyOwned),
            Some(Owner::OtherProject) => Ok(BucketOutcome::NameTaken),
            None => {
                state.buckets.insert(spec.name.clone(), Owner::ThisProject);
                state.mutations.push(format!("bucket {}", spec.name));
                Ok(BucketOutcome::Created)
            }
        }
    }

    async fn find_service_account(
        &self,
        email: &str,
    ) -> Result<Option<ServiceAccount>, ProvisionError> {
        self.record(format!("find_service_account {}", email));
        Ok(self.state.lock().unwrap().accounts.get(email).cloned())
    }

    async fn create_service_account(
        &self,
        spec: &ServiceAccountSpec,
    ) -> Result<AccountOutcome, ProvisionError> {
        self.record(format!("create_service_account {}", spec.account_id));
        let mut state = self.state.lock().unwrap();
        if let Some(existing) = state.accounts.get(&spec.email) {
            return Ok(AccountOutcome::AlreadyExists(existing.clone()));
        }
        let project = spec.email.split(['@', '.']).nth(1).unwrap_or_default();
        let account = ServiceAccount {
            name: format!("projects/{}/serviceAccounts/{}", project, spec.email),
            email: spec.email.clone(),
            unique_id: Some(format!("{}", state.accounts.len() + 1)),
            display_name: Some(spec.display_name.clone()),
        };
        state.accounts.insert(spec.email.clone(), account.clone());
        state.mutations.push(format!("account {}", spec.email));
        Ok(AccountOutcome::Created(account))
    }

    async fn bind_role(
        &self,
        account: &ServiceAccount,
        role: &str,
    ) -> Result<RoleOutcome, ProvisionError> {
        self.record(format!("bind_role {}", role));
        let mut state = self.state.lock().unwrap();
        if state.denied_roles.contains(role) {
            return Err(ProvisionError::PermissionOrApi {
                context: format!("Failed to update IAM policy for {}", role),
                message: "caller lacks resourcemanager.projects.setIamPolicy".into(),
            });
        }
        if state
            .bindings
            .insert((role.to_string(), account.member()))
        {
            state.mutations.push(format!("role {}", role));
            Ok(RoleOutcome::Granted)
        } else {
            Ok(RoleOutcome::AlreadyBound)
        }
    }

    async fn create_key(&self, account: &ServiceAccount) -> Result<KeyMaterial, ProvisionError> {
        self.record(format!("create_key {}", account.email));
        let mut state = self.state.lock().unwrap();
        if state.key_limit_reached {
            return Err(ProvisionError::Quota {
                context: format!("Failed to create key for {}", account.email),
                message: "The maximum number of keys for this service account has been reached."
                    .into(),
            });
        }
        state.keys_issued += 1;
        Ok(KeyMaterial {
            key_id: format!("key-{}", state.keys_issued),
            credentials_json: format!(
                r#"{{"type": "service_account", "client_email": "{}", "private_key_id": "key-{}"}}"#,
                account.email, state.keys_issued
            )
            .into_bytes(),
        })
    }
}

/// Connector over a [`FakeCloud`]; `authenticated: false` models a
/// machine without application default credentials
pub struct FakeConnector {
    pub cloud: FakeCloud,
    pub authenticated: bool,
}

#[async_trait]
impl Connector for FakeConnector {
    type Provider = FakeCloud;

    async fn connect(&self, _project: &ProjectId) -> Result<FakeCloud, ProvisionError> {
        if !self.authenticated {
            return Err(ProvisionError::Authentication(
                "could not find default credentials".into(),
            ));
        }
        Ok(self.cloud.clone())
    }
}
