//! Run configuration.
//!
//! Page-state detection matches third-party UI copy, which changes under
//! our feet; every phrase and selector the workflows probe for lives here
//! as data, overridable from a TOML file, never hardcoded in task logic.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::retry::RetryPolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("config read failed: {0}")]
	Io(#[from] std::io::Error),
	#[error("config parse failed: {0}")]
	Parse(#[from] toml::de::Error),
}

/// Physical screen the window grid is laid out on.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
	pub width: u32,
	pub height: u32,
	pub left_offset: u32,
	pub top_offset: u32,
	/// Height reserved for the taskbar at the bottom of the screen.
	pub taskbar_clearance: u32,
}

impl Default for ScreenConfig {
	fn default() -> Self {
		Self {
			width: 1920,
			height: 1080,
			left_offset: 0,
			top_offset: 0,
			taskbar_clearance: 40,
		}
	}
}

/// Size of each automated window, pre scale flag.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
	pub width: u32,
	pub height: u32,
	pub margin: u32,
}

impl Default for WindowConfig {
	fn default() -> Self {
		Self {
			width: 400,
			height: 300,
			margin: 10,
		}
	}
}

/// Bounded readiness polling.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ReadyConfig {
	pub attempts: u32,
	pub interval_ms: u64,
}

impl Default for ReadyConfig {
	fn default() -> Self {
		Self {
			attempts: 10,
			interval_ms: 1_000,
		}
	}
}

impl ReadyConfig {
	pub fn interval(&self) -> Duration {
		Duration::from_millis(self.interval_ms)
	}
}

/// The only two retryable steps, each with its own bounded policy.
#[derive(Debug, Clone, Copy, Deserialize, Default)]
#[serde(default)]
pub struct RetrySection {
	pub confirm: ConfirmRetry,
	pub classify: ClassifyRetry,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(transparent)]
pub struct ConfirmRetry(pub RetryPolicy);

impl Default for ConfirmRetry {
	fn default() -> Self {
		Self(RetryPolicy::new(5, 4_000))
	}
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(transparent)]
pub struct ClassifyRetry(pub RetryPolicy);

impl Default for ClassifyRetry {
	fn default() -> Self {
		Self(RetryPolicy::new(3, 2_000))
	}
}

/// Scan pacing and bounds.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
	/// Upper bound on lazy-load scroll cycles; the loop also stops as
	/// soon as the document height plateaus.
	pub max_scroll_cycles: u32,
	pub scroll_amount: u32,
	pub settle_ms: u64,
}

impl Default for ScanConfig {
	fn default() -> Self {
		Self {
			max_scroll_cycles: 15,
			scroll_amount: 600,
			settle_ms: 2_500,
		}
	}
}

/// Site-coupled URLs, selectors, and extraction patterns.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
	pub login_url: String,
	pub home_url: String,
	pub listing_url: String,
	pub composer_url: String,

	/// Cookie domains and storage origins wiped before a login attempt.
	pub clear_domains: Vec<String>,
	pub clear_origins: Vec<String>,

	pub identity_input: String,
	pub password_input: String,
	pub login_submit_selectors: Vec<String>,

	pub two_factor_input_selectors: Vec<String>,
	pub two_factor_switch_phrases: Vec<String>,
	pub two_factor_continue_phrases: Vec<String>,

	pub upload_input_selectors: Vec<String>,
	pub preview_selectors: Vec<String>,
	pub caption_editor_selectors: Vec<String>,
	pub post_next_phrases: Vec<String>,
	pub post_submit_phrases: Vec<String>,

	pub comment_editor_selectors: Vec<String>,
	pub comment_submit_phrases: Vec<String>,

	/// Attribute fragment that marks a listing entity's anchor.
	pub entity_marker: String,
	/// Pattern extracting the stable id from an entity href.
	pub entity_id_pattern: String,
	pub entity_url_template: String,
	/// Ids that match the pattern but are navigation chrome, not entities.
	pub entity_excluded_ids: Vec<String>,

	/// Pattern recognizing the canonical resource URL, capture = id.
	pub resource_link_pattern: String,
	pub resource_url_template: String,
	/// Patterns locating an upload id inside the serialized page.
	pub resource_id_patterns: Vec<String>,
}

impl Default for SiteConfig {
	fn default() -> Self {
		Self {
			login_url: "https://www.example.com/login".into(),
			home_url: "https://www.example.com/".into(),
			listing_url: "https://www.example.com/groups/joined".into(),
			composer_url: "https://www.example.com/clips/create".into(),
			clear_domains: vec![".example.com".into(), "www.example.com".into()],
			clear_origins: vec!["https://www.example.com".into()],
			identity_input: "#email".into(),
			password_input: "#pass".into(),
			login_submit_selectors: vec![
				"#loginbutton".into(),
				"button[name=\"login\"]".into(),
				"button[type=\"submit\"]".into(),
			],
			two_factor_input_selectors: vec![
				"input[name=\"approvals_code\"]".into(),
				"input[autocomplete=\"off\"][type=\"text\"]".into(),
			],
			two_factor_switch_phrases: vec![
				"Try another way".into(),
				"Authentication app".into(),
			],
			two_factor_continue_phrases: vec!["Continue".into(), "Submit".into()],
			upload_input_selectors: vec![
				"input[type=\"file\"][accept*=\"video\"]".into(),
				"input[type=\"file\"][accept*=\"mp4\"]".into(),
				"input[type=\"file\"]".into(),
			],
			preview_selectors: vec![
				"img[src*=\"blob:\"]".into(),
				"img[src*=\"data:\"]".into(),
				"video[src*=\"blob:\"]".into(),
				".upload-preview".into(),
			],
			caption_editor_selectors: vec![
				"[contenteditable=\"true\"][data-lexical-editor=\"true\"]".into(),
				"[contenteditable=\"true\"]".into(),
				"[role=\"textbox\"]".into(),
			],
			post_next_phrases: vec!["Next".into(), "Continue".into()],
			post_submit_phrases: vec!["Publish".into(), "Post".into(), "Share".into()],
			comment_editor_selectors: vec![
				"[contenteditable=\"true\"][aria-label*=\"omment\"]".into(),
				"[role=\"textbox\"][aria-label*=\"omment\"]".into(),
			],
			comment_submit_phrases: vec!["Comment".into(), "Send".into(), "Submit".into()],
			entity_marker: "aria-label=\"Open group\"".into(),
			entity_id_pattern: r"/groups/([^/?#\x22]+)".into(),
			entity_url_template: "https://www.example.com/groups/{id}/".into(),
			entity_excluded_ids: vec!["joined".into(), "feed".into(), "discover".into()],
			resource_link_pattern: r"/clip/(\d+)".into(),
			resource_url_template: "https://www.example.com/clip/{id}".into(),
			resource_id_patterns: vec![
				r#""clip_id":\s*"(\d+)""#.into(),
				r#""upload_id":\s*"(\d+)""#.into(),
			],
		}
	}
}

/// Phrase lists driving login-page classification. Matching is
/// lowercase-substring on the page text or URL.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PhraseTable {
	pub locked_url_fragments: Vec<String>,
	pub two_factor_url_fragments: Vec<String>,
	pub wrong_password: Vec<String>,
	pub disabled: Vec<String>,
	pub authenticated_url_fragments: Vec<String>,
	/// Selectors present only in an authenticated shell.
	pub authenticated_markers: Vec<String>,
}

impl Default for PhraseTable {
	fn default() -> Self {
		Self {
			locked_url_fragments: vec![
				"checkpoint".into(),
				"locked".into(),
				"verify".into(),
				"confirm".into(),
			],
			two_factor_url_fragments: vec!["two_step".into(), "code_generator".into()],
			wrong_password: vec![
				"password you entered".into(),
				"incorrect password".into(),
				"wrong password".into(),
				"forgotten password".into(),
			],
			disabled: vec![
				"account has been disabled".into(),
				"disabled".into(),
				"suspended".into(),
			],
			authenticated_url_fragments: vec!["?sk=".into(), "/home".into()],
			authenticated_markers: vec![
				"[aria-label*=\"Account\"]".into(),
				"div[role=\"navigation\"]".into(),
			],
		}
	}
}

/// One profile the fleet can drive: its id and debug endpoint address.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileEntry {
	pub id: String,
	#[serde(default = "default_host")]
	pub host: String,
	pub port: u16,
}

fn default_host() -> String {
	"127.0.0.1".into()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
	pub screen: ScreenConfig,
	pub window: WindowConfig,
	/// Worker-pool ceiling; the effective pool is
	/// `min(profile_count, pool_cap)`.
	pub pool_cap: usize,
	pub command_timeout_ms: u64,
	pub ready: ReadyConfig,
	pub retry: RetrySection,
	pub scan: ScanConfig,
	pub sites: SiteConfig,
	pub phrases: PhraseTable,
	pub profiles: Vec<ProfileEntry>,
	/// Pause after page-mutating steps before the next probe.
	pub step_settle_ms: u64,
	/// Wait for server-side media processing after an upload.
	pub post_processing_wait_ms: u64,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			screen: ScreenConfig::default(),
			window: WindowConfig::default(),
			pool_cap: 3,
			command_timeout_ms: 30_000,
			ready: ReadyConfig::default(),
			retry: RetrySection::default(),
			scan: ScanConfig::default(),
			sites: SiteConfig::default(),
			phrases: PhraseTable::default(),
			profiles: Vec::new(),
			step_settle_ms: 2_000,
			post_processing_wait_ms: 15_000,
		}
	}
}

impl Config {
	pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let text = std::fs::read_to_string(path)?;
		Ok(toml::from_str(&text)?)
	}

	pub fn command_timeout(&self) -> Duration {
		Duration::from_millis(self.command_timeout_ms)
	}

	pub fn step_settle(&self) -> Duration {
		Duration::from_millis(self.step_settle_ms)
	}

	pub fn post_processing_wait(&self) -> Duration {
		Duration::from_millis(self.post_processing_wait_ms)
	}
}
