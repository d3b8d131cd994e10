//! Seams to the out-of-scope collaborators.
//!
//! The profile-management HTTP API and the persistence layer are external
//! systems; the workflows only ever talk to them through these traits.
//! In-memory implementations live here too — the tests drive them, and
//! the CLI uses [`StaticProfiles`] for fleets whose endpoints are known
//! up front.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;

use drover_runtime::Endpoint;

use crate::config::ProfileEntry;
use crate::tasks::TaskResult;

#[derive(Debug, Error)]
pub enum CollabError {
	#[error("profile manager: {0}")]
	Profile(String),
	#[error("persistence: {0}")]
	Store(String),
}

/// A running browser handed back by the profile manager.
#[derive(Debug, Clone)]
pub struct BrowserHandle {
	pub profile_id: String,
	pub endpoint: Endpoint,
}

/// Stored login credential for one profile.
#[derive(Debug, Clone)]
pub struct Credential {
	pub id: String,
	pub secret: String,
	pub totp_seed: Option<String>,
}

/// An entity harvested from a listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entity {
	pub id: String,
	pub name: String,
	pub url: String,
}

/// Opens and closes profile browsers.
#[async_trait]
pub trait ProfileManager: Send + Sync {
	async fn open(&self, profile_id: &str) -> Result<BrowserHandle, CollabError>;
	async fn close(&self, profile_id: &str) -> Result<(), CollabError>;
	async fn list(&self, filter: Option<&str>) -> Result<Vec<String>, CollabError>;
}

/// Receives scan results, task history, and pending credentials.
#[async_trait]
pub trait Persistence: Send + Sync {
	async fn store_scan_results(&self, profile_id: &str, entities: &[Entity]) -> Result<(), CollabError>;
	async fn store_task_history(&self, record: &TaskResult) -> Result<(), CollabError>;
	async fn read_pending_login(&self, profile_id: &str) -> Result<Option<Credential>, CollabError>;
}

/// Profile manager for fleets whose debug endpoints are configured up
/// front. `open` assumes the browser is already listening.
pub struct StaticProfiles {
	endpoints: HashMap<String, Endpoint>,
	closes: Mutex<Vec<String>>,
}

impl StaticProfiles {
	pub fn new(entries: &[ProfileEntry]) -> Self {
		Self {
			endpoints: entries
				.iter()
				.map(|e| (e.id.clone(), Endpoint::new(e.host.clone(), e.port)))
				.collect(),
			closes: Mutex::new(Vec::new()),
		}
	}

	/// Profiles this manager has been asked to close, in call order.
	pub fn closed(&self) -> Vec<String> {
		self.closes.lock().clone()
	}
}

#[async_trait]
impl ProfileManager for StaticProfiles {
	async fn open(&self, profile_id: &str) -> Result<BrowserHandle, CollabError> {
		let endpoint = self
			.endpoints
			.get(profile_id)
			.cloned()
			.ok_or_else(|| CollabError::Profile(format!("unknown profile {profile_id}")))?;
		Ok(BrowserHandle {
			profile_id: profile_id.to_string(),
			endpoint,
		})
	}

	async fn close(&self, profile_id: &str) -> Result<(), CollabError> {
		self.closes.lock().push(profile_id.to_string());
		Ok(())
	}

	async fn list(&self, filter: Option<&str>) -> Result<Vec<String>, CollabError> {
		let mut ids: Vec<String> = self
			.endpoints
			.keys()
			.filter(|id| filter.is_none_or(|f| id.contains(f)))
			.cloned()
			.collect();
		ids.sort();
		Ok(ids)
	}
}

/// In-memory persistence: collects what it is given and serves
/// credentials seeded at construction.
#[derive(Default)]
pub struct MemoryStore {
	credentials: HashMap<String, Credential>,
	scans: Mutex<Vec<(String, Vec<Entity>)>>,
	history: Mutex<Vec<TaskResult>>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_credentials(credentials: HashMap<String, Credential>) -> Self {
		Self {
			credentials,
			..Self::default()
		}
	}

	pub fn scans(&self) -> Vec<(String, Vec<Entity>)> {
		self.scans.lock().clone()
	}

	pub fn history(&self) -> Vec<TaskResult> {
		self.history.lock().clone()
	}
}

#[async_trait]
impl Persistence for MemoryStore {
	async fn store_scan_results(&self, profile_id: &str, entities: &[Entity]) -> Result<(), CollabError> {
		self.scans
			.lock()
			.push((profile_id.to_string(), entities.to_vec()));
		Ok(())
	}

	async fn store_task_history(&self, record: &TaskResult) -> Result<(), CollabError> {
		self.history.lock().push(record.clone());
		Ok(())
	}

	async fn read_pending_login(&self, profile_id: &str) -> Result<Option<Credential>, CollabError> {
		Ok(self.credentials.get(profile_id).cloned())
	}
}

/// Convenience for wiring the doubles into a runner.
pub type SharedProfiles = Arc<dyn ProfileManager>;
pub type SharedPersistence = Arc<dyn Persistence>;

#[cfg(test)]
mod tests {
	use super::*;

	fn entries() -> Vec<ProfileEntry> {
		let toml = r#"
			[[profiles]]
			id = "alpha"
			port = 9301

			[[profiles]]
			id = "beta"
			port = 9302
		"#;
		let config: crate::Config = toml::from_str(toml).unwrap();
		config.profiles
	}

	#[tokio::test]
	async fn static_profiles_resolve_known_ids() {
		let profiles = StaticProfiles::new(&entries());
		let handle = profiles.open("alpha").await.unwrap();
		assert_eq!(handle.endpoint, Endpoint::local(9301));
		assert!(profiles.open("gamma").await.is_err());
	}

	#[tokio::test]
	async fn list_filters_by_substring() {
		let profiles = StaticProfiles::new(&entries());
		assert_eq!(profiles.list(None).await.unwrap().len(), 2);
		assert_eq!(profiles.list(Some("bet")).await.unwrap(), vec!["beta"]);
	}

	#[tokio::test]
	async fn memory_store_round_trips_scan_results() {
		let store = MemoryStore::new();
		let entities = vec![Entity {
			id: "g1".into(),
			name: "First".into(),
			url: "https://www.example.com/groups/g1/".into(),
		}];
		store.store_scan_results("alpha", &entities).await.unwrap();
		assert_eq!(store.scans()[0].1, entities);
	}
}
