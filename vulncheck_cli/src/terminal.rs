//! Terminal detection utilities

use is_terminal::IsTerminal;
use std::env;
use std::io::stdout;

/// Check if stdout is connected to an interactive terminal
pub fn is_interactive() -> bool {
    if !stdout().is_terminal() {
        return false;
    }

    if is_ci_environment() {
        return false;
    }

    if env::var("DEBIAN_FRONTEND").unwrap_or_default() == "noninteractive" {
        return false;
    }

    true
}

/// Detect if running in a CI environment
fn is_ci_environment() -> bool {
    let ci_vars = [
        "CI",
        "CONTINUOUS_INTEGRATION",
        "JENKINS_URL",
        "GITHUB_ACTIONS",
        "GITLAB_CI",
        "TRAVIS",
        "CIRCLECI",
        "BUILDKITE",
        "DRONE",
        "TEAMCITY_VERSION",
        "TF_BUILD", // Azure DevOps
    ];

    ci_vars.iter().any(|var| env::var(var).is_ok())
}
