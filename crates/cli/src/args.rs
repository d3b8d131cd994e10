use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "drover", about = "Drive a fleet of profile browsers over their debug endpoints")]
pub struct Cli {
	/// Path to the TOML config file.
	#[arg(long, global = true, default_value = "drover.toml")]
	pub config: String,

	/// Increase log verbosity (-v, -vv).
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Profiles to run on (defaults to every configured profile).
	#[arg(long, global = true, value_delimiter = ',')]
	pub profiles: Vec<String>,

	#[command(subcommand)]
	pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
	/// Print the slot grid for the configured screen and window sizes.
	Grid,
	/// Harvest entities from each profile's listing page.
	Scan,
	/// Upload and publish media on each profile.
	Post {
		/// Path to the media file, as seen by the browsers.
		#[arg(long)]
		media: String,
		/// Caption text typed into the composer.
		#[arg(long, default_value = "")]
		caption: String,
	},
	/// Log profiles in with their stored pending credentials.
	Login {
		/// TOML file mapping profile ids to credentials.
		#[arg(long)]
		credentials: Option<String>,
	},
	/// Comment on an existing resource from each profile.
	Comment {
		#[arg(long)]
		url: String,
		#[arg(long)]
		text: String,
	},
}
