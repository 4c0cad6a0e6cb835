use anyhow::Result;
use log::debug;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    application::Services,
    dispatch::ReadyDispatcher,
    host::Host,
    registry::{Catalog, CatalogRegistry},
    runtime::Runtime,
    settings::{Settings, default_catalog_path},
    surface::QueueSurface,
};

/// Command-line overrides that shape a [`Config`].
#[derive(Debug, Clone, Default)]
pub struct Options {
    pub install_root: Option<PathBuf>,
    pub catalog: Option<PathBuf>,
    pub headless: bool,
    pub max_wait: Option<Duration>,
}

pub struct Config<R: Runtime + 'static> {
    pub services: Services<R>,
    pub catalog: Arc<CatalogRegistry<R>>,
    pub queue: Arc<QueueSurface>,
}

impl<R: Runtime + 'static> Config<R> {
    pub fn new(runtime: R, options: Options) -> Result<Self> {
        let runtime = Arc::new(runtime);

        let mut settings = Settings::resolve(runtime.as_ref(), options.install_root)?;
        settings.headless = options.headless;
        if let Some(max_wait) = options.max_wait {
            settings.max_wait = max_wait;
        }
        debug!("Using install root: {:?}", settings.install_root);

        let catalog = match options.catalog {
            Some(path) => Catalog::load(runtime.as_ref(), &path)?,
            None => {
                let path = default_catalog_path(runtime.as_ref())?;
                if runtime.exists(&path) {
                    Catalog::load(runtime.as_ref(), &path)?
                } else {
                    debug!("No catalog at {:?}, starting with an empty one", path);
                    Catalog::default()
                }
            }
        };

        let registry = Arc::new(CatalogRegistry::new(
            Arc::clone(&runtime),
            &catalog,
            &settings.install_root,
        )?);
        let dispatcher = Arc::new(ReadyDispatcher::new(registry.clone()));
        let queue = Arc::new(QueueSurface::new(
            Arc::clone(&dispatcher),
            settings.max_concurrency,
        ));

        let services = Services {
            runtime,
            registry: registry.clone(),
            aliases: catalog.aliases,
            surface: queue.clone(),
            dispatcher,
            host: Host::new(settings.headless),
            settings,
        };

        Ok(Self {
            services,
            catalog: registry,
            queue,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;
    use crate::test_utils::{test_home, test_root};
    use mockall::predicate::eq;

    const CATALOG: &str = r#"{
        "servers": { "html-ls": { "install": ["true"] } },
        "aliases": { "web": ["html-ls"] }
    }"#;

    fn configure_runtime_basics(runtime: &mut MockRuntime) {
        runtime.expect_is_privileged().returning(|| false);
        runtime.expect_home_dir().returning(|| Some(test_home()));
        runtime
            .expect_config_dir()
            .returning(|| Some(test_home().join(".config")));
    }

    #[test]
    fn test_config_loads_default_catalog() {
        let mut runtime = MockRuntime::new();
        configure_runtime_basics(&mut runtime);
        let catalog_path = test_home().join(".config/lsi/catalog.json");
        runtime
            .expect_exists()
            .with(eq(catalog_path.clone()))
            .returning(|_| true);
        runtime
            .expect_read_to_string()
            .with(eq(catalog_path))
            .returning(|_| Ok(CATALOG.to_string()));

        let config = Config::new(runtime, Options::default()).unwrap();

        assert_eq!(config.services.settings.install_root, test_root());
        assert!(config.services.settings.is_default_root());
        assert!(!config.services.host.is_headless());
        assert_eq!(
            config.services.registry.available_server_names().len(),
            1
        );
        assert!(config.services.aliases.candidates("web").is_some());
    }

    #[test]
    fn test_config_without_default_catalog_is_empty() {
        let mut runtime = MockRuntime::new();
        configure_runtime_basics(&mut runtime);
        runtime.expect_exists().returning(|_| false);

        let options = Options {
            install_root: Some(PathBuf::from("/srv/servers")),
            headless: true,
            max_wait: Some(Duration::from_secs(30)),
            ..Default::default()
        };
        let config = Config::new(runtime, options).unwrap();

        let settings = &config.services.settings;
        assert_eq!(settings.install_root, PathBuf::from("/srv/servers"));
        assert_eq!(settings.default_install_root, test_root());
        assert_eq!(settings.max_wait, Duration::from_secs(30));
        assert!(config.services.host.is_headless());
        assert!(config.services.registry.available_server_names().is_empty());
    }

    #[test]
    fn test_config_with_missing_explicit_catalog_fails() {
        let mut runtime = MockRuntime::new();
        configure_runtime_basics(&mut runtime);
        runtime.expect_exists().returning(|_| false);

        let options = Options {
            catalog: Some(PathBuf::from("/nowhere/catalog.json")),
            ..Default::default()
        };
        assert!(Config::new(runtime, options).is_err());
    }
}
