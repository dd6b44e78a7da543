//! Engine construction for one CLI invocation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result, bail};
use hearth_approval::{AssistantEngine, EngineSettings};
use hearth_config::Config;
use hearth_core::{HouseholdId, UserId};
use hearth_storage::{KvStore, MemoryKvStore};
use tracing::{info, warn};

use crate::formatter::OutputFormat;

/// Namespace for CLI bookkeeping rows.
const CLI_NAMESPACE: &str = "cli";
/// Key of the household used when `--household` is not given.
const DEFAULT_HOUSEHOLD_KEY: &str = "default_household";

/// Everything a command needs.
pub(crate) struct CliContext {
    pub(crate) engine: AssistantEngine,
    pub(crate) household: HouseholdId,
    pub(crate) actor: Option<UserId>,
    pub(crate) format: OutputFormat,
    #[cfg(feature = "kv")]
    kv: Option<Arc<hearth_storage::SurrealKvStore>>,
}

/// Flags that shape the context.
pub(crate) struct ContextOptions<'a> {
    pub(crate) data_dir: Option<&'a Path>,
    pub(crate) household: Option<&'a str>,
    pub(crate) user: Option<&'a str>,
    pub(crate) format: OutputFormat,
}

impl CliContext {
    /// Open the configured store and build the engine over it.
    pub(crate) async fn open(config: &Config, options: &ContextOptions<'_>) -> Result<Self> {
        let settings = EngineSettings::from_config(config)?;
        let opened = open_store(config, options.data_dir)?;
        let household = resolve_household(opened.store.as_ref(), options.household).await?;
        let actor = options
            .user
            .map(str::parse::<UserId>)
            .transpose()
            .context("invalid --user")?;

        let engine = AssistantEngine::builder()
            .store(opened.store)
            .settings(settings)
            .build()?;

        Ok(Self {
            engine,
            household,
            actor,
            format: options.format,
            #[cfg(feature = "kv")]
            kv: opened.kv,
        })
    }

    /// Flush and close the store.
    pub(crate) async fn close(self) -> Result<()> {
        #[cfg(feature = "kv")]
        if let Some(kv) = self.kv {
            kv.close().await?;
        }
        Ok(())
    }
}

struct OpenedStore {
    store: Arc<dyn KvStore>,
    #[cfg(feature = "kv")]
    kv: Option<Arc<hearth_storage::SurrealKvStore>>,
}

/// Resolve the store directory: `--data-dir`, then `storage.path`, then the
/// platform data directory.
fn store_dir(config: &Config, data_dir: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = data_dir {
        return Ok(dir.to_path_buf());
    }
    if let Some(path) = &config.storage.path {
        return Ok(PathBuf::from(path));
    }
    Ok(hearth_config::loader::default_data_dir()?.join("store"))
}

fn open_store(config: &Config, data_dir: Option<&Path>) -> Result<OpenedStore> {
    match config.storage.backend.as_str() {
        "memory" => {
            warn!("memory backend: nothing persists after this command");
            Ok(OpenedStore {
                store: Arc::new(MemoryKvStore::new()),
                #[cfg(feature = "kv")]
                kv: None,
            })
        },
        "surrealkv" => open_surrealkv(&store_dir(config, data_dir)?),
        other => bail!("unknown storage backend '{other}'"),
    }
}

#[cfg(feature = "kv")]
fn open_surrealkv(dir: &Path) -> Result<OpenedStore> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("cannot create data directory {}", dir.display()))?;
    let kv = Arc::new(hearth_storage::SurrealKvStore::open(dir)?);
    let store: Arc<dyn KvStore> = kv.clone();
    Ok(OpenedStore {
        store,
        kv: Some(kv),
    })
}

#[cfg(not(feature = "kv"))]
fn open_surrealkv(_dir: &Path) -> Result<OpenedStore> {
    bail!("this build has no surrealkv support; rebuild hearth-cli with the `kv` feature")
}

/// The household given on the command line, or the store's default one,
/// created on first use.
async fn resolve_household(store: &dyn KvStore, flag: Option<&str>) -> Result<HouseholdId> {
    if let Some(raw) = flag {
        return raw.parse().context("invalid --household");
    }
    if let Some(bytes) = store.get(CLI_NAMESPACE, DEFAULT_HOUSEHOLD_KEY).await? {
        let raw = String::from_utf8(bytes).context("stored default household is not UTF-8")?;
        return raw.parse().context("stored default household is invalid");
    }
    let household = HouseholdId::new();
    store
        .set(
            CLI_NAMESPACE,
            DEFAULT_HOUSEHOLD_KEY,
            household.to_string().into_bytes(),
        )
        .await?;
    info!(household = %household, "created default household");
    Ok(household)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_household_is_stable() {
        let store = MemoryKvStore::new();
        let first = resolve_household(&store, None).await.unwrap();
        let second = resolve_household(&store, None).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_household_flag_wins() {
        let store = MemoryKvStore::new();
        let explicit = HouseholdId::new();
        let flag = explicit.to_string();
        let resolved = resolve_household(&store, Some(&flag)).await.unwrap();
        assert_eq!(resolved, explicit);
        assert!(resolve_household(&store, Some("not-a-uuid")).await.is_err());
    }

    #[test]
    fn test_store_dir_precedence() {
        let mut config = Config::default();
        config.storage.path = Some("/var/lib/hearth".into());
        assert_eq!(
            store_dir(&config, Some(Path::new("/tmp/x"))).unwrap(),
            PathBuf::from("/tmp/x")
        );
        assert_eq!(
            store_dir(&config, None).unwrap(),
            PathBuf::from("/var/lib/hearth")
        );
    }

    #[tokio::test]
    async fn test_memory_backend_opens() {
        let config = Config::default();
        let options = ContextOptions {
            data_dir: None,
            household: None,
            user: None,
            format: OutputFormat::Json,
        };
        let ctx = CliContext::open(&config, &options).await.unwrap();
        assert!(ctx.actor.is_none());
        assert!(!ctx.engine.functions().is_empty());
        ctx.close().await.unwrap();
    }
}
