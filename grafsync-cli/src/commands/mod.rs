pub mod backup;
pub mod diff;
pub mod ls;
pub mod restore;
pub mod sync;

use std::future::Future;

use anyhow::{Context, Result};

use grafsync_client::{load_profiles, load_profiles_file, GrafanaClient, Profiles};

use crate::GlobalArgs;

/// Profiles from `--config`, or from the default location when absent.
pub fn profiles(global: &GlobalArgs) -> Result<Profiles> {
    let profiles = match &global.config {
        Some(path) => load_profiles_file(path)
            .with_context(|| format!("failed to load profiles from {}", path.display()))?,
        None => load_profiles().context("failed to load profiles")?,
    };
    tracing::debug!(
        "{} profile(s) from {}",
        profiles.instances.len(),
        profiles.path.display()
    );
    Ok(profiles)
}

/// Client for `instance`, a URL or a profile name.
pub fn connect(profiles: &Profiles, instance: &str) -> Result<GrafanaClient> {
    let conn = profiles
        .resolve(instance)
        .with_context(|| format!("cannot resolve instance '{instance}'"))?;
    GrafanaClient::new(&conn).with_context(|| format!("cannot connect to '{instance}'"))
}

/// Drive `future` to completion on a fresh multi-threaded runtime.
pub fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;
    Ok(runtime.block_on(future))
}
