//! Launch configuration profiles, ordered most-featured to most-conservative.

/// One launch configuration for the underlying automation session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchProfile {
	pub name: &'static str,
	pub headless: bool,
	pub args: Vec<String>,
}

impl LaunchProfile {
	/// The degradation ladder tried in order by session acquisition.
	///
	/// Each profile is strictly more conservative than the one before it;
	/// the minimal profile trades rendering fidelity for launch reliability
	/// on constrained hosts.
	pub fn ladder() -> Vec<LaunchProfile> {
		vec![
			LaunchProfile {
				name: "full",
				headless: true,
				args: base_args(),
			},
			LaunchProfile {
				name: "degraded",
				headless: true,
				args: with_extra(&["--disable-gpu", "--disable-dev-shm-usage"]),
			},
			LaunchProfile {
				name: "minimal",
				headless: true,
				args: with_extra(&["--disable-gpu", "--disable-dev-shm-usage", "--disable-extensions", "--no-zygote", "--single-process"]),
			},
		]
	}
}

fn base_args() -> Vec<String> {
	vec!["--no-first-run".to_string(), "--no-default-browser-check".to_string()]
}

fn with_extra(extra: &[&str]) -> Vec<String> {
	let mut args = base_args();
	args.extend(extra.iter().map(|arg| arg.to_string()));
	args
}
