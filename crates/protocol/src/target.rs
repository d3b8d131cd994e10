//! Debuggable-target descriptors from the endpoint's HTTP listing.

use serde::Deserialize;

/// One entry from the endpoint's target list.
///
/// The listing includes pages, service workers, extensions, and the
/// devtools frontend itself; only ordinary pages are attachable for
/// automation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetInfo {
	#[serde(default)]
	pub id: String,
	#[serde(rename = "type", default)]
	pub kind: String,
	#[serde(default)]
	pub url: String,
	#[serde(default)]
	pub title: String,
	#[serde(default)]
	pub web_socket_debugger_url: Option<String>,
}

/// Selects the first page-type target that is not a devtools page,
/// falling back to the first target of any kind.
pub fn pick_page_target(targets: &[TargetInfo]) -> Option<&TargetInfo> {
	targets
		.iter()
		.find(|t| t.kind == "page" && !t.url.starts_with("devtools://"))
		.or_else(|| targets.first())
}

#[cfg(test)]
mod tests {
	use super::*;

	fn target(kind: &str, url: &str) -> TargetInfo {
		TargetInfo {
			id: String::new(),
			kind: kind.into(),
			url: url.into(),
			title: String::new(),
			web_socket_debugger_url: Some(format!("ws://127.0.0.1:9222/devtools/page/{url}")),
		}
	}

	#[test]
	fn prefers_first_ordinary_page() {
		let targets = vec![
			target("service_worker", "https://a.example/sw.js"),
			target("page", "devtools://devtools/bundled/inspector.html"),
			target("page", "https://a.example/feed"),
			target("page", "https://a.example/other"),
		];
		let picked = pick_page_target(&targets).unwrap();
		assert_eq!(picked.url, "https://a.example/feed");
	}

	#[test]
	fn falls_back_to_first_target_when_no_page_matches() {
		let targets = vec![target("service_worker", "https://a.example/sw.js")];
		let picked = pick_page_target(&targets).unwrap();
		assert_eq!(picked.kind, "service_worker");
	}

	#[test]
	fn empty_listing_yields_none() {
		assert!(pick_page_target(&[]).is_none());
	}

	#[test]
	fn listing_json_deserializes() {
		let json = r#"[{
			"id": "F0A1",
			"type": "page",
			"url": "https://a.example/",
			"title": "Home",
			"webSocketDebuggerUrl": "ws://127.0.0.1:9222/devtools/page/F0A1"
		}]"#;
		let targets: Vec<TargetInfo> = serde_json::from_str(json).unwrap();
		assert_eq!(targets[0].kind, "page");
		assert!(targets[0].web_socket_debugger_url.as_deref().unwrap().starts_with("ws://"));
	}
}
