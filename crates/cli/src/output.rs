use colored::Colorize;

use drover::slots::GridInfo;
use drover::tasks::Artifact;
use drover::{Outcome, TaskResult};

pub fn print_grid(info: &GridInfo) {
	println!(
		"grid: {} cols x {} rows = {} slots ({} in use)",
		info.cols, info.rows, info.max_slots, info.in_use
	);
}

pub fn print_result(result: &TaskResult) {
	let tag = match result.outcome {
		Outcome::Success => " ok ".green().bold(),
		Outcome::SoftFailure => "soft".yellow().bold(),
		Outcome::Failure => "fail".red().bold(),
	};
	let mut line = format!("[{tag}] {} {}", result.profile_id, result.task);
	if let Some(artifact) = &result.artifact {
		line.push_str(&format!(" {}", describe(artifact)));
	}
	if let Some(detail) = &result.error_detail {
		line.push_str(&format!(" ({})", detail.dimmed()));
	}
	println!("{line}");
}

fn describe(artifact: &Artifact) -> String {
	match artifact {
		Artifact::Resource { url, confirmed } => {
			if *confirmed {
				format!("-> {url}")
			} else {
				format!("-> {url} (unconfirmed)")
			}
		}
		Artifact::Entities { count } => format!("{count} entities"),
		Artifact::Login { signal } => signal.to_string(),
		Artifact::Comment { url } => format!("on {url}"),
	}
}

/// Prints the run summary and returns true when nothing hard-failed.
pub fn print_summary(results: &[TaskResult]) -> bool {
	let ok = results.iter().filter(|r| r.outcome == Outcome::Success).count();
	let soft = results
		.iter()
		.filter(|r| r.outcome == Outcome::SoftFailure)
		.count();
	let failed = results.iter().filter(|r| r.outcome == Outcome::Failure).count();
	println!(
		"\n{} succeeded, {} soft-failed, {} failed of {}",
		ok.to_string().green(),
		soft.to_string().yellow(),
		failed.to_string().red(),
		results.len()
	);
	failed == 0
}
