// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::config::OutcomeConfig;
use camino_tempfile::Utf8TempDir;

/// Creates a temporary workspace root with `config_contents` at `.config/outcome.toml`.
pub(super) fn temp_workspace(config_contents: &str) -> Utf8TempDir {
    let temp_dir = camino_tempfile::tempdir().expect("error creating temp dir");
    let config_path = temp_dir.path().join(OutcomeConfig::CONFIG_PATH);
    let parent = config_path.parent().expect("config path has a parent");
    std::fs::create_dir_all(parent).expect("error creating config dir");
    std::fs::write(&config_path, config_contents).expect("error writing config file");
    temp_dir
}
