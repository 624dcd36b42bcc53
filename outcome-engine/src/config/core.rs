// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::elements::{
    DurationPolicy, JunitConfig, JunitImpl, RetainArtifacts, UnexpectedPassPolicy,
};
use crate::{
    errors::{ConfigParseError, ConfigParseErrorKind, ProfileNotFound},
    session::SessionSettings,
};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, builder::DefaultState};
use itertools::Itertools;
use serde::Deserialize;
use std::{
    collections::{BTreeSet, HashMap},
    num::NonZeroU32,
};
use tracing::warn;

/// Overall configuration for the outcome engine.
///
/// Settings are grouped into profiles, obtained through [`profile`](Self::profile). A profile
/// that doesn't set a value inherits it from the `default` profile.
#[derive(Clone, Debug)]
pub struct OutcomeConfig {
    workspace_root: Utf8PathBuf,
    store_dir: Utf8PathBuf,
    default_profile: DefaultProfileImpl,
    other_profiles: HashMap<String, CustomProfileImpl>,
}

impl OutcomeConfig {
    /// The default location of the config within the workspace root.
    pub const CONFIG_PATH: &'static str = ".config/outcome.toml";

    /// Contains the default config as a TOML file.
    ///
    /// Workspace-specific configuration is layered on top of the default config.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../../default-config.toml");

    /// The name of the default profile.
    pub const DEFAULT_PROFILE: &'static str = "default";

    /// Reads the config from the given file, or if not specified from `.config/outcome.toml` in
    /// the workspace root.
    ///
    /// If no config file is specified and the workspace root doesn't have one, the default
    /// config is used.
    pub fn from_sources(
        workspace_root: impl Into<Utf8PathBuf>,
        config_file: Option<&Utf8Path>,
    ) -> Result<Self, ConfigParseError> {
        let workspace_root = workspace_root.into();
        let (config_file, source) = match config_file {
            Some(file) => (file.to_owned(), File::new(file.as_str(), FileFormat::Toml)),
            None => {
                let config_file = workspace_root.join(Self::CONFIG_PATH);
                let source = File::new(config_file.as_str(), FileFormat::Toml).required(false);
                (config_file, source)
            }
        };

        let builder = Self::make_default_config().add_source(source);
        let (deserialized, unknown) = Self::build_and_deserialize_config(&builder)
            .map_err(|kind| ConfigParseError::new(&config_file, kind))?;
        if !unknown.is_empty() {
            warn!(
                "ignoring unknown configuration keys in {config_file}: {}",
                unknown.iter().join(", ")
            );
        }

        deserialized
            .into_config(workspace_root)
            .map_err(|kind| ConfigParseError::new(&config_file, kind))
    }

    /// Returns the default config, with no workspace config layered on top.
    pub fn default_config(workspace_root: impl Into<Utf8PathBuf>) -> Self {
        let workspace_root = workspace_root.into();
        Self::build_and_deserialize_config(&Self::make_default_config())
            .and_then(|(deserialized, _)| deserialized.into_config(workspace_root.clone()))
            .unwrap_or_else(|kind| Self::builtin_config(workspace_root, &kind))
    }

    /// The config used when the embedded default config fails to load.
    fn builtin_config(workspace_root: Utf8PathBuf, kind: &ConfigParseErrorKind) -> Self {
        warn!("failed to load the embedded default config, using built-in values: {kind}");
        Self {
            store_dir: workspace_root.join(DEFAULT_STORE_DIR),
            workspace_root,
            default_profile: DefaultProfileImpl::new(CustomProfileImpl::default()),
            other_profiles: HashMap::new(),
        }
    }

    /// Returns the workspace root.
    pub fn workspace_root(&self) -> &Utf8Path {
        &self.workspace_root
    }

    /// Returns the profile with the given name, or an error if it isn't defined.
    pub fn profile(&self, name: impl AsRef<str>) -> Result<OutcomeProfile<'_>, ProfileNotFound> {
        let name = name.as_ref();
        let custom_profile = match name {
            Self::DEFAULT_PROFILE => None,
            other => Some(
                self.other_profiles
                    .get(other)
                    .ok_or_else(|| ProfileNotFound::new(name, self.all_profiles()))?,
            ),
        };

        Ok(OutcomeProfile {
            name: name.to_owned(),
            store_dir: self.store_dir.join(name),
            default_profile: &self.default_profile,
            custom_profile,
        })
    }

    fn all_profiles(&self) -> impl Iterator<Item = &str> {
        self.other_profiles
            .keys()
            .map(|key| key.as_str())
            .chain(std::iter::once(Self::DEFAULT_PROFILE))
    }

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }

    /// This returns a tuple of (config, ignored paths).
    fn build_and_deserialize_config(
        builder: &ConfigBuilder<DefaultState>,
    ) -> Result<(OutcomeConfigDeserialize, BTreeSet<String>), ConfigParseErrorKind> {
        let config = builder
            .build_cloned()
            .map_err(|error| ConfigParseErrorKind::BuildError(Box::new(error)))?;

        let mut ignored = BTreeSet::new();
        let mut cb = |path: serde_ignored::Path| {
            ignored.insert(path.to_string());
        };
        let ignored_de = serde_ignored::Deserializer::new(config, &mut cb);
        let config: OutcomeConfigDeserialize = serde_path_to_error::deserialize(ignored_de)
            .map_err(|error| {
                // The config crate also reports the key; drop it so the path is only printed once.
                let path = error.path().clone();
                let error = match error.into_inner() {
                    ConfigError::At { error, .. } => *error,
                    other => other,
                };
                ConfigParseErrorKind::DeserializeError(Box::new(serde_path_to_error::Error::new(
                    path, error,
                )))
            })?;

        Ok((config, ignored))
    }
}

const DEFAULT_STORE_DIR: &str = "target/outcome";

/// A named set of settings, returned by [`OutcomeConfig::profile`].
#[derive(Clone, Debug)]
pub struct OutcomeProfile<'cfg> {
    name: String,
    store_dir: Utf8PathBuf,
    default_profile: &'cfg DefaultProfileImpl,
    custom_profile: Option<&'cfg CustomProfileImpl>,
}

impl<'cfg> OutcomeProfile<'cfg> {
    /// Returns the name of the profile.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the directory reports for this profile are written to.
    pub fn store_dir(&self) -> &Utf8Path {
        &self.store_dir
    }

    /// Returns the number of attempts allowed for a case that doesn't declare a rerun policy.
    pub fn default_max_attempts(&self) -> NonZeroU32 {
        self.custom_profile
            .and_then(|profile| profile.default_max_attempts.and_then(NonZeroU32::new))
            .unwrap_or(self.default_profile.default_max_attempts)
    }

    /// Returns which attempts' artifacts are kept in final records.
    pub fn retain_artifacts(&self) -> RetainArtifacts {
        self.custom_profile
            .and_then(|profile| profile.retain_artifacts)
            .unwrap_or(self.default_profile.retain_artifacts)
    }

    /// Returns how non-strict unexpected passes are treated.
    pub fn unexpected_pass(&self) -> UnexpectedPassPolicy {
        self.custom_profile
            .and_then(|profile| profile.unexpected_pass)
            .unwrap_or(self.default_profile.unexpected_pass)
    }

    /// Returns which duration final records report.
    pub fn duration(&self) -> DurationPolicy {
        self.custom_profile
            .and_then(|profile| profile.duration)
            .unwrap_or(self.default_profile.duration)
    }

    /// Returns the JUnit configuration, if a JUnit path is set.
    pub fn junit(&self) -> Option<JunitConfig<'cfg>> {
        JunitConfig::new(
            self.custom_profile.map(|profile| &profile.junit),
            &self.default_profile.junit,
        )
    }

    /// Returns the settings a [`Session`](crate::session::Session) runs with under this profile.
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            default_max_attempts: self.default_max_attempts(),
            retain_artifacts: self.retain_artifacts(),
            unexpected_pass: self.unexpected_pass(),
            duration: self.duration(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct OutcomeConfigDeserialize {
    #[serde(default)]
    store: StoreConfigImpl,
    #[serde(default, rename = "profile")]
    profiles: HashMap<String, CustomProfileImpl>,
}

impl OutcomeConfigDeserialize {
    fn into_config(
        mut self,
        workspace_root: Utf8PathBuf,
    ) -> Result<OutcomeConfig, ConfigParseErrorKind> {
        for (name, profile) in &self.profiles {
            if profile.default_max_attempts == Some(0) {
                return Err(ConfigParseErrorKind::ZeroMaxAttempts {
                    profile: name.clone(),
                });
            }
        }

        let default_profile = DefaultProfileImpl::new(
            self.profiles
                .remove(OutcomeConfig::DEFAULT_PROFILE)
                .unwrap_or_default(),
        );
        Ok(OutcomeConfig {
            store_dir: workspace_root.join(&self.store.dir),
            workspace_root,
            default_profile,
            other_profiles: self.profiles,
        })
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct StoreConfigImpl {
    dir: Utf8PathBuf,
}

impl Default for StoreConfigImpl {
    fn default() -> Self {
        Self {
            dir: DEFAULT_STORE_DIR.into(),
        }
    }
}

#[derive(Clone, Debug)]
struct DefaultProfileImpl {
    default_max_attempts: NonZeroU32,
    retain_artifacts: RetainArtifacts,
    unexpected_pass: UnexpectedPassPolicy,
    duration: DurationPolicy,
    junit: JunitImpl,
}

impl DefaultProfileImpl {
    // Values missing from the default profile fall back to the built-in defaults.
    fn new(p: CustomProfileImpl) -> Self {
        Self {
            default_max_attempts: p
                .default_max_attempts
                .and_then(NonZeroU32::new)
                .unwrap_or(NonZeroU32::MIN),
            retain_artifacts: p.retain_artifacts.unwrap_or_default(),
            unexpected_pass: p.unexpected_pass.unwrap_or_default(),
            duration: p.duration.unwrap_or_default(),
            junit: p.junit,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct CustomProfileImpl {
    #[serde(default)]
    default_max_attempts: Option<u32>,
    #[serde(default)]
    retain_artifacts: Option<RetainArtifacts>,
    #[serde(default)]
    unexpected_pass: Option<UnexpectedPassPolicy>,
    #[serde(default)]
    duration: Option<DurationPolicy>,
    #[serde(default)]
    junit: JunitImpl,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_helpers::temp_workspace;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_config_is_valid() {
        let config = OutcomeConfig::make_default_config()
            .build()
            .expect("default config is always valid");
        let mut unknown = BTreeSet::new();
        let _: OutcomeConfigDeserialize =
            serde_ignored::deserialize(config, |path: serde_ignored::Path| {
                unknown.insert(path.to_string());
            })
            .expect("default config is always valid");
        assert!(
            unknown.is_empty(),
            "found unknown keys in default config: {unknown:?}"
        );
    }

    #[test]
    fn default_profile_values() {
        let config = OutcomeConfig::default_config("/fake/workspace");
        let profile = config.profile("default").expect("default profile exists");
        assert_eq!(profile.default_max_attempts().get(), 1);
        assert_eq!(profile.retain_artifacts(), RetainArtifacts::DecidingOnly);
        assert_eq!(profile.unexpected_pass(), UnexpectedPassPolicy::Passing);
        assert_eq!(profile.duration(), DurationPolicy::Total);
        assert!(profile.junit().is_none());
        assert_eq!(
            profile.store_dir(),
            Utf8Path::new("/fake/workspace/target/outcome/default")
        );
    }

    #[test]
    fn builtin_config_matches_embedded_defaults() {
        let kind = ConfigParseErrorKind::ZeroMaxAttempts {
            profile: "default".to_owned(),
        };
        let builtin = OutcomeConfig::builtin_config("/fake/workspace".into(), &kind);
        let embedded = OutcomeConfig::default_config("/fake/workspace");

        let builtin = builtin.profile("default").expect("default profile exists");
        let embedded = embedded.profile("default").expect("default profile exists");
        assert_eq!(builtin.default_max_attempts(), embedded.default_max_attempts());
        assert_eq!(builtin.retain_artifacts(), embedded.retain_artifacts());
        assert_eq!(builtin.unexpected_pass(), embedded.unexpected_pass());
        assert_eq!(builtin.duration(), embedded.duration());
        assert_eq!(builtin.store_dir(), embedded.store_dir());
    }

    #[test]
    fn custom_profile_inherits_from_default() {
        let workspace = temp_workspace(indoc! {r#"
            [profile.default]
            default-max-attempts = 2

            [profile.ci]
            retain-artifacts = "all-attempts"
            unexpected-pass = "failing"
            duration = "deciding-attempt"
        "#});
        let config = OutcomeConfig::from_sources(workspace.path(), None).expect("config is valid");

        let ci = config.profile("ci").expect("ci profile exists");
        assert_eq!(ci.name(), "ci");
        assert_eq!(
            ci.default_max_attempts().get(),
            2,
            "inherited from the default profile"
        );
        assert_eq!(ci.retain_artifacts(), RetainArtifacts::AllAttempts);
        assert_eq!(ci.unexpected_pass(), UnexpectedPassPolicy::Failing);
        assert_eq!(ci.duration(), DurationPolicy::DecidingAttempt);

        let default = config.profile("default").expect("default profile exists");
        assert_eq!(default.retain_artifacts(), RetainArtifacts::DecidingOnly);
    }

    #[test]
    fn profile_not_found() {
        let workspace = temp_workspace(indoc! {r#"
            [profile.ci]
            default-max-attempts = 3
        "#});
        let config = OutcomeConfig::from_sources(workspace.path(), None).expect("config is valid");
        let err = config.profile("nightly").expect_err("nightly isn't defined");
        assert_eq!(
            err.to_string(),
            "profile `nightly` not found (known profiles: ci, default)"
        );
    }

    #[test]
    fn zero_max_attempts() {
        let workspace = temp_workspace(indoc! {r#"
            [profile.ci]
            default-max-attempts = 0
        "#});
        let err = OutcomeConfig::from_sources(workspace.path(), None)
            .expect_err("zero attempts is invalid");
        assert!(
            matches!(
                err.kind(),
                ConfigParseErrorKind::ZeroMaxAttempts { profile } if profile == "ci"
            ),
            "unexpected error kind: {:?}",
            err.kind()
        );
    }

    #[test]
    fn invalid_value_reports_path() {
        let workspace = temp_workspace(indoc! {r#"
            [profile.default]
            retain-artifacts = "some-attempts"
        "#});
        let err = OutcomeConfig::from_sources(workspace.path(), None)
            .expect_err("unknown variant");
        match err.kind() {
            ConfigParseErrorKind::DeserializeError(error) => {
                assert_eq!(error.path().to_string(), "profile.default.retain-artifacts");
            }
            other => panic!("unexpected error kind: {other:?}"),
        }
    }

    #[test]
    fn explicit_config_file_is_required() {
        let workspace = temp_workspace("");
        let missing = workspace.path().join("missing.toml");
        let err = OutcomeConfig::from_sources(workspace.path(), Some(&missing))
            .expect_err("explicit file must exist");
        assert_eq!(err.config_file(), &missing);
        assert!(matches!(err.kind(), ConfigParseErrorKind::BuildError(_)));
    }
}
