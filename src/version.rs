//! Build identity reported by `--version` of the emote binaries

/// Release version, stamped by build.rs
pub const VERSION: &str = env!("EMOTE_VERSION");

/// Cargo profile the crate was built with
pub const PROFILE: &str = env!("EMOTE_BUILD_PROFILE");

/// Commit hash passed in through `EMOTE_GIT_COMMIT`, if any
pub const GIT_COMMIT: Option<&str> = option_env!("EMOTE_GIT_COMMIT");

fn short_commit(commit: &str) -> &str {
    commit.get(..8).unwrap_or(commit)
}

/// `0.1.0 (1a2b3c4d, release)` style version line
pub fn full_version() -> String {
    match GIT_COMMIT {
        Some(commit) => format!("{VERSION} ({}, {PROFILE})", short_commit(commit)),
        None => format!("{VERSION} ({PROFILE})"),
    }
}
