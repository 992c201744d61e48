//! Default values for corpus-reconcile configuration.
//!
//! This module provides centralized default values used by the configuration
//! record and the CLI, ensuring consistency and avoiding duplication.

use std::collections::BTreeMap;
use std::path::PathBuf;

/// Name of the project-local configuration file.
pub const CONFIG_FILE_NAME: &str = ".corpus-reconcile.yaml";

/// Working fragments directory, relative to the base directory.
pub const PARTS_DIR: &str = "partes";

/// Archive for original and already-merged fragments.
pub const BACKUP_DIR: &str = "bkp";

/// Archive for translated fragments.
pub const TRANSLATIONS_BACKUP_DIR: &str = "bkp_translations";

/// Rebuilt corpus file, relative to the base directory.
pub const CORPUS_FILE: &str = "corpus.json";

/// Suffix of a fully reconciled per-theme aggregate.
pub const MERGED_SUFFIX: &str = "_merged.json";

/// Returns the user-level configuration file path.
///
/// Uses the platform-appropriate configuration directory:
/// - Linux: `~/.config/corpus-reconcile/config.yaml`
/// - macOS: `~/Library/Application Support/corpus-reconcile/config.yaml`
/// - Windows: `{FOLDERID_RoamingAppData}\corpus-reconcile\config.yaml`
///
/// Returns `None` when the platform directory cannot be determined.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("corpus-reconcile").join("config.yaml"))
}

/// Built-in volume-name translation table.
///
/// Volume names missing from the table pass through unchanged.
pub fn volume_names() -> BTreeMap<String, String> {
    [
        (
            "1.経綸・霊主体従・夜昼転換・祖霊祭祀編",
            "1. Plano Divino, Precedência do Espírito sobre a Matéria, Transição da Noite para o Dia e Culto aos Antepassados",
        ),
        ("3.信仰編", "3. Seção da Fé"),
        ("4.その他", "4. Outros"),
    ]
    .into_iter()
    .map(|(jp, pt)| (jp.to_string(), pt.to_string()))
    .collect()
}
