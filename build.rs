use std::env;
use std::fs;
use std::path::Path;

fn main() {
    // EMOTE_VERSION wins, then a VERSION file next to Cargo.toml, then the package version
    let version = env::var("EMOTE_VERSION").ok().unwrap_or_else(|| {
        fs::read_to_string(Path::new("VERSION"))
            .map(|v| v.trim().to_string())
            .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string())
    });
    let profile = env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());

    println!("cargo:rustc-env=EMOTE_VERSION={version}");
    println!("cargo:rustc-env=EMOTE_BUILD_PROFILE={profile}");
    if let Ok(commit) = env::var("EMOTE_GIT_COMMIT") {
        println!("cargo:rustc-env=EMOTE_GIT_COMMIT={commit}");
    }
    println!("cargo:rerun-if-changed=VERSION");
    println!("cargo:rerun-if-env-changed=EMOTE_VERSION");
    println!("cargo:rerun-if-env-changed=EMOTE_GIT_COMMIT");
}
