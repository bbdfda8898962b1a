use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use anyhow::{Result, bail};

use crate::gateway::{DEFAULT_QUERY_TIMEOUT, GatewayConfig, MAX_QUERY_TIMEOUT};

pub const DEFAULT_DATA_DIR: &str = ".securecheck";
pub const DEFAULT_DATABASE_FILE: &str = "policeledger.sqlite";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub home_dir: PathBuf,
    pub cwd: PathBuf,
    pub database_path: PathBuf,
    pub query_timeout: Duration,
}

impl RuntimeConfig {
    #[must_use]
    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig::new(self.database_path.clone()).with_query_timeout(self.query_timeout)
    }
}

pub fn resolve_runtime_config(
    home_dir: &Path,
    cwd: &Path,
    database_override: Option<&Path>,
    query_timeout_ms: Option<u64>,
) -> Result<RuntimeConfig> {
    if !home_dir.is_absolute() {
        bail!("home_dir must be absolute: {}", home_dir.display());
    }
    if !cwd.is_absolute() {
        bail!("cwd must be absolute: {}", cwd.display());
    }

    let home_dir = normalize_lexical(home_dir);
    let cwd = normalize_lexical(cwd);
    let database_path = match database_override {
        Some(path) => resolve_user_path(path, &home_dir, &cwd)?,
        None => home_dir.join(DEFAULT_DATA_DIR).join(DEFAULT_DATABASE_FILE),
    };

    let query_timeout = match query_timeout_ms {
        Some(0) => bail!("query timeout must be greater than zero milliseconds"),
        Some(millis) if Duration::from_millis(millis) > MAX_QUERY_TIMEOUT => bail!(
            "query timeout must be at most {} milliseconds, got {millis}",
            MAX_QUERY_TIMEOUT.as_millis()
        ),
        Some(millis) => Duration::from_millis(millis),
        None => DEFAULT_QUERY_TIMEOUT,
    };

    Ok(RuntimeConfig {
        home_dir,
        cwd,
        database_path: normalize_lexical(&database_path),
        query_timeout,
    })
}

fn resolve_user_path(path: &Path, home_dir: &Path, cwd: &Path) -> Result<PathBuf> {
    let expanded = expand_tilde(path, home_dir)?;
    let resolved = if expanded.is_absolute() {
        expanded
    } else {
        cwd.join(expanded)
    };

    Ok(normalize_lexical(&resolved))
}

fn expand_tilde(path: &Path, home_dir: &Path) -> Result<PathBuf> {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "~" => {
            let mut expanded = home_dir.to_path_buf();
            expanded.extend(components.map(|component| component.as_os_str()));
            Ok(expanded)
        }
        Some(Component::Normal(first))
            if first
                .to_str()
                .is_some_and(|segment| segment.starts_with('~')) =>
        {
            bail!(
                "only `~` and `~/...` database paths are supported: {}",
                path.display()
            )
        }
        _ => Ok(path.to_path_buf()),
    }
}

fn normalize_lexical(path: &Path) -> PathBuf {
    path.components()
        .fold(PathBuf::new(), |mut normalized, component| {
            match component {
                Component::CurDir => {}
                Component::ParentDir if normalized.pop() => {}
                _ => normalized.push(component.as_os_str()),
            }
            normalized
        })
}
