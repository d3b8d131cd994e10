//! Scan workflow: trigger lazy loading with bounded scroll cycles,
//! serialize the document, and harvest entities by structural pattern.

use std::collections::HashSet;

use regex::Regex;
use tracing::{debug, info};

use crate::collab::Entity;
use crate::config::SiteConfig;
use crate::error::{Result, TaskError};
use crate::humanize::{self, ScrollDirection};
use crate::tasks::script;
use crate::tasks::{Artifact, TaskContext, TaskResult};

pub(crate) async fn run(ctx: &TaskContext<'_>) -> Result<TaskResult> {
	let scan = ctx.config().scan;

	// Scroll until the document stops growing or the cycle bound hits.
	let mut last_height: i64 = 0;
	for cycle in 0..scan.max_scroll_cycles {
		ctx.checkpoint()?;
		humanize::scroll(ctx.session, ScrollDirection::Down, scan.scroll_amount).await?;
		tokio::time::sleep(std::time::Duration::from_millis(scan.settle_ms)).await;

		let height = script::eval_i64(ctx.session, "document.body.scrollHeight")
			.await?
			.unwrap_or(0);
		if height == last_height {
			// One more settle in case the loader was mid-flight.
			tokio::time::sleep(std::time::Duration::from_millis(scan.settle_ms)).await;
			let recheck = script::eval_i64(ctx.session, "document.body.scrollHeight")
				.await?
				.unwrap_or(0);
			if recheck == last_height {
				debug!(target: "drover::tasks", profile = %ctx.profile_id, cycle, "document height plateaued");
				break;
			}
		}
		last_height = height;
	}

	let html = ctx.session.document_html().await?;
	let entities = extract_entities(&html, &ctx.config().sites)?;
	info!(
		target: "drover::tasks",
		profile = %ctx.profile_id,
		count = entities.len(),
		"scan harvested entities"
	);

	ctx.runner
		.store
		.store_scan_results(ctx.profile_id, &entities)
		.await
		.map_err(|err| TaskError::Store(err.to_string()))?;

	Ok(ctx.conclude(
		"scan",
		Artifact::Entities {
			count: entities.len(),
		},
	))
}

/// Harvests entities from a serialized document: anchors carrying the
/// marker attribute, ids derived from their hrefs, names from their
/// inner text. Already deduplicated by id.
pub fn extract_entities(html: &str, sites: &SiteConfig) -> Result<Vec<Entity>> {
	let anchor = Regex::new(r"(?s)<a\s([^>]*)>(.*?)</a>")
		.map_err(|err| TaskError::Pattern(err.to_string()))?;
	let href = Regex::new(r#"href="([^"]+)""#).map_err(|err| TaskError::Pattern(err.to_string()))?;
	let id = Regex::new(&sites.entity_id_pattern)
		.map_err(|err| TaskError::Pattern(format!("entity_id_pattern: {err}")))?;
	let tag = Regex::new(r"<[^>]+>").map_err(|err| TaskError::Pattern(err.to_string()))?;

	let mut seen = HashSet::new();
	let mut entities = Vec::new();
	for caps in anchor.captures_iter(html) {
		let attrs = &caps[1];
		if !attrs.contains(sites.entity_marker.as_str()) {
			continue;
		}
		let Some(href_value) = href.captures(attrs).map(|c| c[1].to_string()) else {
			continue;
		};
		let Some(entity_id) = id.captures(&href_value).and_then(|c| c.get(1)).map(|m| m.as_str()) else {
			continue;
		};
		if sites.entity_excluded_ids.iter().any(|x| x == entity_id) {
			continue;
		}
		if !seen.insert(entity_id.to_string()) {
			continue;
		}
		let name = tag.replace_all(&caps[2], " ");
		let name = name.split_whitespace().collect::<Vec<_>>().join(" ");
		entities.push(Entity {
			id: entity_id.to_string(),
			name: if name.is_empty() {
				entity_id.to_string()
			} else {
				name
			},
			url: sites.entity_url_template.replace("{id}", entity_id),
		});
	}
	Ok(entities)
}

/// Order-preserving merge of entity lists, deduplicated by id.
pub fn dedup_entities(lists: impl IntoIterator<Item = Vec<Entity>>) -> Vec<Entity> {
	let mut seen = HashSet::new();
	let mut merged = Vec::new();
	for list in lists {
		for entity in list {
			if seen.insert(entity.id.clone()) {
				merged.push(entity);
			}
		}
	}
	merged
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sites() -> SiteConfig {
		SiteConfig::default()
	}

	fn anchor(id: &str, name: &str) -> String {
		format!(
			r#"<a class="x1" aria-label="Open group" href="/groups/{id}?ref=list"><span><b>{name}</b></span></a>"#
		)
	}

	#[test]
	fn harvests_marked_anchors_with_derived_ids() {
		let html = format!(
			"<div>{}{}<a href=\"/groups/plain\">unmarked</a></div>",
			anchor("g100", "Gardeners"),
			anchor("g200", "Runners Club")
		);
		let entities = extract_entities(&html, &sites()).unwrap();
		assert_eq!(entities.len(), 2);
		assert_eq!(entities[0].id, "g100");
		assert_eq!(entities[0].name, "Gardeners");
		assert_eq!(entities[0].url, "https://www.example.com/groups/g100/");
		assert_eq!(entities[1].name, "Runners Club");
	}

	#[test]
	fn navigation_chrome_ids_are_excluded() {
		let html = format!("{}{}", anchor("joined", "All groups"), anchor("g1", "Real"));
		let entities = extract_entities(&html, &sites()).unwrap();
		assert_eq!(entities.len(), 1);
		assert_eq!(entities[0].id, "g1");
	}

	#[test]
	fn duplicate_ids_within_one_snapshot_collapse() {
		let html = format!("{}{}", anchor("g1", "First"), anchor("g1", "First again"));
		let entities = extract_entities(&html, &sites()).unwrap();
		assert_eq!(entities.len(), 1);
		assert_eq!(entities[0].name, "First");
	}

	#[test]
	fn nameless_anchor_falls_back_to_its_id() {
		let html = r#"<a aria-label="Open group" href="/groups/g9"><img src="x.png"/></a>"#;
		let entities = extract_entities(html, &sites()).unwrap();
		assert_eq!(entities[0].name, "g9");
	}

	#[test]
	fn three_overlapping_snapshots_dedupe_cleanly() {
		// Consecutive lazy-load snapshots share their boundary entries.
		let snapshots = [
			format!("{}{}{}", anchor("g1", "A"), anchor("g2", "B"), anchor("g3", "C")),
			format!("{}{}{}", anchor("g2", "B"), anchor("g3", "C"), anchor("g4", "D")),
			format!("{}{}{}", anchor("g3", "C"), anchor("g4", "D"), anchor("g5", "E")),
		];
		let merged = dedup_entities(
			snapshots
				.iter()
				.map(|html| extract_entities(html, &sites()).unwrap()),
		);
		let ids: Vec<_> = merged.iter().map(|e| e.id.as_str()).collect();
		assert_eq!(ids, vec!["g1", "g2", "g3", "g4", "g5"]);
		let unique: HashSet<_> = ids.iter().collect();
		assert_eq!(unique.len(), ids.len(), "no repeated ids");
	}

	#[test]
	fn invalid_entity_pattern_is_reported() {
		let mut sites = sites();
		sites.entity_id_pattern = "[".into();
		let err = extract_entities("<a href=\"x\">y</a>", &sites).unwrap_err();
		assert!(matches!(err, TaskError::Pattern(_)));
	}
}
