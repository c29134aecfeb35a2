use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use arc_swap::ArcSwap;
use nf_core::config::{PipelineConfig, load_config};
use nf_core::session::ModeSelector;
use nf_dsp::Analyzer;
use notify::{Event, EventKind, RecursiveMode, Watcher};

use crate::cli::Overrides;

/// Reapply the command-line overrides to `config` and check the result.
///
/// The result is only accepted if a full analysis chain can be built from it,
/// so filter cutoffs outside `(0, fs/2)` are caught here and not in the worker.
///
/// # Errors
/// Returns an error if the overridden configuration is invalid.
pub fn finalize(mut config: PipelineConfig, overrides: &Overrides) -> Result<PipelineConfig> {
    overrides.apply(&mut config);
    Analyzer::new(&config)?;
    Ok(config)
}

/// Load `path`, then [`finalize`] it.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed, or if the
/// overridden configuration is invalid.
pub fn reload(path: &Path, overrides: &Overrides) -> Result<PipelineConfig> {
    finalize(load_config(path)?, overrides)
}

/// Publish a freshly loaded configuration to the worker and the mode selector.
fn publish(config: PipelineConfig, shared: &ArcSwap<PipelineConfig>, modes: &ModeSelector) {
    modes.set_index(config.mode);
    shared.store(Arc::new(config));
}

/// Watch the config file and swap every valid edit into `config`.
///
/// Invalid edits are logged and the previous configuration stays live.
/// The returned watcher must outlive the session.
///
/// # Errors
/// Returns an error if the watcher cannot be created or the path cannot be watched.
pub fn spawn_config_watcher(
    config_path: &Path,
    config: &Arc<ArcSwap<PipelineConfig>>,
    modes: &Arc<ModeSelector>,
    overrides: Overrides,
) -> Result<impl Watcher + use<>> {
    let config = Arc::clone(config);
    let modes = Arc::clone(modes);
    let path = config_path.to_path_buf();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        let Ok(event) = res else {
            return;
        };
        if !matches!(event.kind, EventKind::Modify(_)) {
            return;
        }
        match reload(&path, &overrides) {
            Ok(new_config) => {
                publish(new_config, &config, &modes);
                log::info!("Config reloaded from {}", path.display());
            }
            Err(e) => log::warn!("Config reload rejected, keeping previous: {e:#}"),
        }
    })?;

    watcher.watch(config_path, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn file_with(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn reload_reapplies_overrides() {
        let file = file_with("[signal]\nchannel = 1\n\n[flight]\nmode = 2\n");
        let overrides = Overrides {
            channel: Some(4),
            ..Overrides::default()
        };
        let config = reload(file.path(), &overrides).unwrap();
        assert_eq!(config.channel, 4);
        assert_eq!(config.mode, 2);
    }

    #[test]
    fn override_that_breaks_the_file_is_rejected() {
        let file = file_with("[signal]\nupper_cutoff_hz = 30.0\n");
        let overrides = Overrides {
            lower_cutoff_hz: Some(35.0),
            ..Overrides::default()
        };
        assert!(reload(file.path(), &overrides).is_err());
    }

    #[test]
    fn publish_moves_the_mode_selector() {
        let shared = ArcSwap::from_pointee(PipelineConfig::default());
        let modes = ModeSelector::new(1);
        let config = PipelineConfig {
            mode: 2,
            channel: 5,
            ..PipelineConfig::default()
        };
        publish(config, &shared, &modes);
        assert_eq!(modes.index(), 2);
        assert_eq!(shared.load().channel, 5);
    }
}
