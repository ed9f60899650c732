use std::{path::PathBuf, sync::Arc};

use chrono::Local;
use dialoguer::theme::ColorfulTheme;
use tracing::info;

use crate::{
    config::{Config, ConfigManager},
    core::{
        drill_down::DrillDownNavigator,
        icons::IconTable,
        services::{CategoryService, PathResolver},
        utils::app_data_dir,
    },
    seed::DEFAULT_CATEGORIES,
    storage::{JsonStorage, MemoryStore},
};

use super::commands;
use super::core::CliError;
use super::registry::{CommandEntry, CommandRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliMode {
    Interactive,
    Script,
}

pub type Navigator = DrillDownNavigator<MemoryStore, MemoryStore>;

/// Everything a command handler can reach: the open store, the
/// configuration, and the stats navigation state.
pub struct ShellContext {
    pub mode: CliMode,
    pub registry: CommandRegistry,
    pub theme: ColorfulTheme,
    pub config_manager: ConfigManager,
    pub config: Config,
    store: Arc<MemoryStore>,
    icons: IconTable,
    pub navigator: Navigator,
    pub running: bool,
}

impl ShellContext {
    pub fn new(mode: CliMode) -> Result<Self, CliError> {
        Self::with_base_dir(mode, app_data_dir())
    }

    /// Opens the configuration and store under `base`, seeding the default
    /// hierarchy into an empty store when configured to.
    pub fn with_base_dir(mode: CliMode, base: PathBuf) -> Result<Self, CliError> {
        let mut registry = CommandRegistry::new();
        commands::register_all(&mut registry);

        let config_manager = ConfigManager::with_base_dir(base)?;
        let config = config_manager.load()?;
        let store_path = config_manager.store_path(&config);
        let store = Arc::new(JsonStorage::new(store_path.clone()).open()?);

        if config.seed_defaults {
            let seeded = CategoryService::new(store.as_ref(), store.as_ref())
                .install_seed(DEFAULT_CATEGORIES)?;
            if seeded > 0 {
                info!(seeded, path = %store_path.display(), "default categories installed");
            }
        }

        let navigator = DrillDownNavigator::new(
            Arc::clone(&store),
            Arc::clone(&store),
            config.default_period,
            Local::now().date_naive(),
        );

        Ok(Self {
            mode,
            registry,
            theme: ColorfulTheme::default(),
            config_manager,
            config,
            store,
            icons: IconTable::canonical(),
            navigator,
            running: true,
        })
    }

    pub(crate) fn mode(&self) -> CliMode {
        self.mode
    }

    pub(crate) fn store(&self) -> &MemoryStore {
        self.store.as_ref()
    }

    pub(crate) fn icons(&self) -> &IconTable {
        &self.icons
    }

    pub(crate) fn categories(&self) -> CategoryService<'_, MemoryStore, MemoryStore> {
        CategoryService::new(self.store(), self.store())
    }

    pub(crate) fn resolver(&self) -> PathResolver<'_, MemoryStore, MemoryStore> {
        PathResolver::new(self.store(), self.store(), &self.icons)
    }

    pub(crate) fn command(&self, name: &str) -> Option<&CommandEntry> {
        self.registry.get(name)
    }

    /// Store handle for the line completer, which outlives borrows of `self`.
    pub(crate) fn shared_store(&self) -> Arc<MemoryStore> {
        Arc::clone(&self.store)
    }

    pub(crate) fn prompt(&self) -> String {
        let mut prompt = String::from("expense");
        for level in self.navigator.levels() {
            prompt.push_str(" / ");
            prompt.push_str(&level.title);
        }
        prompt.push_str(" ⮞ ");
        prompt
    }

    pub(crate) fn confirm_exit(&self) -> Result<bool, CliError> {
        let assume_yes = self.mode == CliMode::Script;
        Ok(super::io::confirm_action(&self.theme, self.mode, "Exit shell?", assume_yes)?)
    }
}
