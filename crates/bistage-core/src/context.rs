use crate::config::Config;
use crate::effects::{Compiler, Installer, SharedEffects, VersionLister};

/// Everything a phase needs for one invocation: the environment-derived
/// configuration and the effect handles.
pub struct CommandContext {
    config: Config,
    effects: SharedEffects,
}

impl CommandContext {
    pub fn new(effects: SharedEffects) -> Self {
        Self {
            config: Config::from_env(),
            effects,
        }
    }

    #[cfg(test)]
    pub(crate) fn for_tests(effects: SharedEffects, config: Config) -> Self {
        Self { config, effects }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn lister(&self) -> &dyn VersionLister {
        self.effects.lister()
    }

    pub fn compiler(&self) -> &dyn Compiler {
        self.effects.compiler()
    }

    pub fn installer(&self) -> &dyn Installer {
        self.effects.installer()
    }
}
