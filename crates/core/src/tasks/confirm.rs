//! Canonical-URL confirmation for post-type tasks.
//!
//! A secondary session resolves what the publish actually created, by
//! layered heuristics: the current URL already being the resource, an
//! upload id buried in the serialized page, or the most recent resource
//! link on it. The probe reloads between bounded attempts; exhaustion
//! falls back to a best-guess URL that is still reported as a success,
//! with the artifact marked unconfirmed.

use regex::Regex;
use tracing::{debug, warn};

use drover_runtime::Session;

use crate::config::{Config, SiteConfig};
use crate::error::{Result, TaskError};
use crate::tasks::TaskContext;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ConfirmedResource {
	pub url: String,
	pub confirmed: bool,
}

pub(crate) async fn resolve(ctx: &TaskContext<'_>) -> Result<ConfirmedResource> {
	let config = ctx.config();
	let session = Session::connect(
		format!("{}#confirm", ctx.profile_id),
		ctx.handle.endpoint.clone(),
		config.command_timeout(),
	)
	.await?;
	let result = resolve_with(config, &session).await;
	session.close().await;
	result
}

async fn resolve_with(config: &Config, session: &Session) -> Result<ConfirmedResource> {
	let matcher = ResourceMatcher::from_site(&config.sites)?;

	let policy = config.retry.confirm.0;
	let matcher_ref = &matcher;
	let resolved = policy
		.run_if(
			|attempt| async move {
				if attempt > 1 {
					session.reload().await?;
					session.wait_ready(5, config.ready.interval()).await;
				}
				let url = session.current_url().await?;
				let html = session.document_html().await?;
				match matcher_ref.locate(&url, &html) {
					Some(resource_url) => Ok(resource_url),
					None => Err(TaskError::ConfirmationUnavailable(format!(
						"no resource link after attempt {attempt}"
					))),
				}
			},
			|err| matches!(err, TaskError::ConfirmationUnavailable(_)),
		)
		.await;

	match resolved {
		Ok(url) => Ok(ConfirmedResource {
			url,
			confirmed: true,
		}),
		Err(TaskError::ConfirmationUnavailable(detail)) => {
			warn!(target: "drover::tasks", %detail, "confirmation exhausted, using best guess");
			let guess = session
				.current_url()
				.await
				.map(|url| strip_query(&url))
				.unwrap_or_else(|_| config.sites.home_url.clone());
			Ok(ConfirmedResource {
				url: guess,
				confirmed: false,
			})
		}
		Err(other) => Err(other),
	}
}

/// Compiled site patterns for resource resolution.
#[derive(Debug)]
pub(crate) struct ResourceMatcher {
	link: Regex,
	id_patterns: Vec<Regex>,
	url_template: String,
}

impl ResourceMatcher {
	pub(crate) fn from_site(sites: &SiteConfig) -> Result<Self> {
		let link = Regex::new(&sites.resource_link_pattern)
			.map_err(|err| TaskError::Pattern(format!("resource_link_pattern: {err}")))?;
		let id_patterns = sites
			.resource_id_patterns
			.iter()
			.map(|p| Regex::new(p).map_err(|err| TaskError::Pattern(format!("{p}: {err}"))))
			.collect::<Result<Vec<_>>>()?;
		Ok(Self {
			link,
			id_patterns,
			url_template: sites.resource_url_template.clone(),
		})
	}

	/// Layered heuristics, most direct first.
	pub(crate) fn locate(&self, current_url: &str, html: &str) -> Option<String> {
		// 1. Already navigated onto the resource itself.
		if let Some(id) = self.capture(&self.link, current_url) {
			debug!(target: "drover::tasks", "resource matched from current url");
			return Some(self.url_for(&id));
		}
		// 2. An upload id serialized somewhere in the page.
		for pattern in &self.id_patterns {
			if let Some(id) = self.capture(pattern, html) {
				debug!(target: "drover::tasks", "resource matched from upload id");
				return Some(self.url_for(&id));
			}
		}
		// 3. The most recent resource link anywhere on the page.
		self.capture_last(&self.link, html).map(|id| {
			debug!(target: "drover::tasks", "resource matched from most recent link");
			self.url_for(&id)
		})
	}

	fn capture(&self, pattern: &Regex, haystack: &str) -> Option<String> {
		pattern
			.captures(haystack)
			.and_then(|caps| caps.get(1))
			.map(|m| m.as_str().to_string())
	}

	fn capture_last(&self, pattern: &Regex, haystack: &str) -> Option<String> {
		pattern
			.captures_iter(haystack)
			.last()
			.and_then(|caps| caps.get(1))
			.map(|m| m.as_str().to_string())
	}

	fn url_for(&self, id: &str) -> String {
		self.url_template.replace("{id}", id)
	}
}

fn strip_query(url: &str) -> String {
	url.split(['?', '#']).next().unwrap_or(url).to_string()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn matcher() -> ResourceMatcher {
		ResourceMatcher::from_site(&SiteConfig::default()).unwrap()
	}

	#[test]
	fn current_url_match_wins() {
		let located = matcher().locate(
			"https://www.example.com/clip/990011?src=notify",
			"<html><a href=\"/clip/112233\"></a></html>",
		);
		assert_eq!(located.as_deref(), Some("https://www.example.com/clip/990011"));
	}

	#[test]
	fn upload_id_in_page_is_second_preference() {
		let html = r#"<script>{"clip_id": "445566", "state": "done"}</script>
			<a href="/clip/111111">older</a>"#;
		let located = matcher().locate("https://www.example.com/creator/done", html);
		assert_eq!(located.as_deref(), Some("https://www.example.com/clip/445566"));
	}

	#[test]
	fn most_recent_link_is_the_fallback_heuristic() {
		let html = r#"
			<a href="/clip/100">first</a>
			<a href="/clip/200">middle</a>
			<a href="/clip/300">latest</a>
		"#;
		let located = matcher().locate("https://www.example.com/creator/done", html);
		assert_eq!(located.as_deref(), Some("https://www.example.com/clip/300"));
	}

	#[test]
	fn no_evidence_resolves_to_none() {
		let located = matcher().locate("https://www.example.com/creator", "<html></html>");
		assert_eq!(located, None);
	}

	#[test]
	fn invalid_configured_pattern_is_reported() {
		let mut sites = SiteConfig::default();
		sites.resource_link_pattern = "(unclosed".into();
		let err = ResourceMatcher::from_site(&sites).unwrap_err();
		assert!(matches!(err, TaskError::Pattern(_)));
	}

	#[test]
	fn strip_query_drops_query_and_fragment() {
		assert_eq!(
			strip_query("https://a.example/clip/1?x=1#frag"),
			"https://a.example/clip/1"
		);
		assert_eq!(strip_query("https://a.example/clip/1"), "https://a.example/clip/1");
	}
}
