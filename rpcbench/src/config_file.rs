use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use rpcbench_core::{
    InputSource, KindDefaults, KindOverrides, KindSelection, RequestKind, RunOptions,
};
use serde::Deserialize;

use crate::cli::RunArgs;

/// Duration written as `10s` / `250ms` or as integer/float seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ConfigDuration(Duration);

impl ConfigDuration {
    pub(crate) fn into_inner(self) -> Duration {
        self.0
    }
}

impl<'de> Deserialize<'de> for ConfigDuration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct V;

        impl serde::de::Visitor<'_> for V {
            type Value = ConfigDuration;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("duration as string (e.g. 10s), integer seconds, or float seconds")
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(ConfigDuration(Duration::from_secs(v)))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                let secs = u64::try_from(v).map_err(|_| E::custom("duration must not be negative"))?;
                Ok(ConfigDuration(Duration::from_secs(secs)))
            }

            fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Duration::try_from_secs_f64(v)
                    .map(ConfigDuration)
                    .map_err(|err| E::custom(format!("invalid duration {v}: {err}")))
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                crate::cli::parse_duration(v)
                    .map(ConfigDuration)
                    .map_err(E::custom)
            }
        }

        deserializer.deserialize_any(V)
    }
}

/// Per-method settings. Also used for the `global` section, where it fills unset
/// per-method fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct MethodConfig {
    pub concurrency: Option<u64>,
    pub duration: Option<ConfigDuration>,
    pub limit: Option<u64>,
    pub enabled: Option<bool>,
}

impl MethodConfig {
    fn overrides(&self) -> KindOverrides {
        KindOverrides {
            concurrency: self.concurrency,
            duration: self.duration.map(ConfigDuration::into_inner),
            limit: self.limit,
            enabled: self.enabled,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ConfigFile {
    pub target_rpc_url: Option<String>,
    pub api_key: Option<String>,
    #[serde(default)]
    pub accounts: Vec<String>,
    pub account_file: Option<PathBuf>,
    /// Fallback for `global.limit`.
    pub limit: Option<u64>,
    #[serde(default)]
    pub global: MethodConfig,
    #[serde(default)]
    pub methods: BTreeMap<String, MethodConfig>,
}

/// Reads a YAML (or JSON) config file. A relative `account_file` is resolved against the
/// config file's directory.
pub(crate) async fn load(path: &Path) -> anyhow::Result<ConfigFile> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    let mut file: ConfigFile = serde_yaml::from_slice(&bytes)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;

    if let Some(account_file) = file.account_file.take() {
        file.account_file = Some(match path.parent() {
            Some(dir) if account_file.is_relative() => dir.join(account_file),
            _ => account_file,
        });
    }

    Ok(file)
}

/// Built-in defaults, overlaid with `global`, overlaid with explicit values.
pub(crate) fn kind_defaults(
    concurrency: Option<u64>,
    duration: Option<Duration>,
    limit: Option<u64>,
    global: &MethodConfig,
) -> KindDefaults {
    let base = KindDefaults::default();
    KindDefaults {
        concurrency: concurrency.or(global.concurrency).unwrap_or(base.concurrency),
        duration: duration
            .or(global.duration.map(ConfigDuration::into_inner))
            .unwrap_or(base.duration),
        limit: limit.or(global.limit).unwrap_or(base.limit),
    }
}

/// Every supported method (or only `selected`, when non-empty) with the per-method
/// overrides applied. A `methods` entry for a name outside `selected` is ignored; an
/// unsupported name is kept so planning can reject it.
pub(crate) fn run_options(
    defaults: KindDefaults,
    global: &MethodConfig,
    methods: &BTreeMap<String, MethodConfig>,
    selected: &[String],
) -> RunOptions {
    let names: Vec<String> = if selected.is_empty() {
        RequestKind::ALL.iter().map(ToString::to_string).collect()
    } else {
        selected.to_vec()
    };

    let mut options = RunOptions {
        defaults,
        kinds: names
            .into_iter()
            .map(|name| {
                KindSelection::with_overrides(
                    name,
                    KindOverrides {
                        enabled: global.enabled,
                        ..KindOverrides::default()
                    },
                )
            })
            .collect(),
    };

    for (name, cfg) in methods {
        if !selected.is_empty() && !selected.contains(name) {
            continue;
        }
        let mut overrides = cfg.overrides();
        overrides.enabled = overrides.enabled.or(global.enabled);
        options.set_overrides(name, overrides);
    }

    options
}

/// Everything `rpcbench run` needs, after merging flags over the config file.
#[derive(Debug, Clone)]
pub(crate) struct RunSettings {
    pub url: String,
    pub api_key: Option<String>,
    pub options: RunOptions,
    pub source: InputSource,
}

impl RunSettings {
    pub(crate) fn resolve(args: &RunArgs, file: ConfigFile) -> anyhow::Result<Self> {
        let url = args
            .url
            .clone()
            .or(file.target_rpc_url)
            .context("no target RPC URL (pass --url or set `target_rpc_url` in --config)")?;

        let api_key = args.api_key.clone().or(file.api_key);

        let defaults = kind_defaults(
            args.concurrency,
            args.duration,
            args.limit.or(file.global.limit).or(file.limit),
            &file.global,
        );
        let options = run_options(defaults, &file.global, &file.methods, &args.methods);

        let mut inline = args.accounts.clone();
        inline.extend(file.accounts);
        let source = InputSource {
            inline,
            file: args.account_file.clone().or(file.account_file),
        };

        Ok(Self {
            url,
            api_key,
            options,
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use clap::Parser as _;

    fn run_args(extra: &[&str]) -> RunArgs {
        let mut argv = vec!["rpcbench", "run"];
        argv.extend_from_slice(extra);
        match crate::cli::Cli::try_parse_from(argv) {
            Ok(cli) => match cli.command {
                crate::cli::Command::Run(args) => args,
                _ => panic!("expected run command"),
            },
            Err(err) => panic!("failed to parse args: {err}"),
        }
    }

    fn parse(yaml: &str) -> ConfigFile {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn durations_accept_strings_and_seconds() {
        let cfg = parse(
            "global:\n  duration: 30\nmethods:\n  getAccountInfo:\n    duration: 250ms\n  getProgramAccounts:\n    duration: 1.5\n",
        );
        assert_eq!(
            cfg.global.duration.map(ConfigDuration::into_inner),
            Some(Duration::from_secs(30))
        );
        assert_eq!(
            cfg.methods["getAccountInfo"].duration.map(ConfigDuration::into_inner),
            Some(Duration::from_millis(250))
        );
        assert_eq!(
            cfg.methods["getProgramAccounts"].duration.map(ConfigDuration::into_inner),
            Some(Duration::from_millis(1500))
        );
    }

    #[test]
    fn out_of_range_durations_are_errors() {
        for yaml in [
            "global:\n  duration: 1.0e30\n",
            "global:\n  duration: -2.5\n",
            "global:\n  duration: -3\n",
            "global:\n  duration: .nan\n",
            "global:\n  duration: \"1e30\"\n",
        ] {
            assert!(
                serde_yaml::from_str::<ConfigFile>(yaml).is_err(),
                "accepted {yaml:?}"
            );
        }
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(serde_yaml::from_str::<ConfigFile>("target: http://x\n").is_err());
        assert!(serde_yaml::from_str::<ConfigFile>("global:\n  vus: 3\n").is_err());
    }

    #[test]
    fn flags_win_over_file_over_defaults() {
        let file = parse(
            "target_rpc_url: http://file:8899\napi_key: filekey\nglobal:\n  concurrency: 9\n  duration: 20s\nlimit: 50\n",
        );
        let args = run_args(&["-u", "http://flag:8899", "-d", "5s"]);

        let s = RunSettings::resolve(&args, file).unwrap();
        assert_eq!(s.url, "http://flag:8899");
        assert_eq!(s.api_key.as_deref(), Some("filekey"));
        assert_eq!(s.options.defaults.concurrency, 9);
        assert_eq!(s.options.defaults.duration, Duration::from_secs(5));
        assert_eq!(s.options.defaults.limit, 50);
        assert_eq!(s.options.kinds.len(), RequestKind::ALL.len());
    }

    #[test]
    fn builtin_defaults_apply_without_file() {
        let args = run_args(&["-u", "http://x:1"]);
        let s = RunSettings::resolve(&args, ConfigFile::default()).unwrap();
        assert_eq!(s.options.defaults, KindDefaults::default());
        assert!(s.source.inline.is_empty());
        assert_eq!(s.source.file, None);
    }

    #[test]
    fn missing_url_is_an_error() {
        let args = run_args(&[]);
        let err = RunSettings::resolve(&args, ConfigFile::default()).unwrap_err();
        assert!(err.to_string().contains("--url"));
    }

    #[test]
    fn method_flags_narrow_the_file_selection() {
        let file = parse(
            "target_rpc_url: http://file:8899\nmethods:\n  getAccountInfo:\n    concurrency: 2\n  getProgramAccounts:\n    enabled: false\n",
        );
        let args = run_args(&["-m", "getAccountInfo"]);

        let s = RunSettings::resolve(&args, file).unwrap();
        assert_eq!(s.options.kinds.len(), 1);
        assert_eq!(s.options.kinds[0].name, "getAccountInfo");
        assert_eq!(s.options.kinds[0].overrides.concurrency, Some(2));
    }

    #[test]
    fn global_enabled_false_needs_explicit_opt_in() {
        let global = MethodConfig {
            enabled: Some(false),
            ..MethodConfig::default()
        };
        let mut methods = BTreeMap::new();
        methods.insert(
            "getMultipleAccounts".to_string(),
            MethodConfig {
                enabled: Some(true),
                ..MethodConfig::default()
            },
        );

        let options = run_options(KindDefaults::default(), &global, &methods, &[]);
        let enabled: Vec<_> = options
            .kinds
            .iter()
            .filter(|k| k.overrides.enabled != Some(false))
            .map(|k| k.name.as_str())
            .collect();
        assert_eq!(enabled, vec!["getMultipleAccounts"]);
    }

    #[test]
    fn unsupported_method_names_are_kept_for_planning() {
        let mut methods = BTreeMap::new();
        methods.insert("getBalance".to_string(), MethodConfig::default());
        let options = run_options(
            KindDefaults::default(),
            &MethodConfig::default(),
            &methods,
            &[],
        );
        assert_eq!(options.kinds.len(), RequestKind::ALL.len() + 1);
        assert_eq!(options.kinds[3].name, "getBalance");
    }

    #[test]
    fn inputs_merge_flags_and_file() {
        let file = parse(
            "target_rpc_url: http://x:1\naccounts: [vines1vzrYbzLMRdu58ou5XTby4qAqVRLmqo36NKPTg]\naccount_file: from-file.txt\n",
        );
        let args = run_args(&["-a", "7Xnw7aDxJu1CxPPEkz9ttfGSn2bpH3R1GYYziJxTCv3e"]);
        let s = RunSettings::resolve(&args, file).unwrap();
        assert_eq!(s.source.inline.len(), 2);
        assert_eq!(s.source.file, Some(PathBuf::from("from-file.txt")));
    }

    #[tokio::test]
    async fn load_resolves_account_file_next_to_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bench.yaml");
        tokio::fs::write(
            &path,
            "target_rpc_url: http://127.0.0.1:8899\naccount_file: accounts.txt\n",
        )
        .await
        .unwrap();

        let file = load(&path).await.unwrap();
        assert_eq!(file.account_file, Some(dir.path().join("accounts.txt")));
    }

    #[tokio::test]
    async fn load_reports_the_path_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.yaml");
        let err = load(&path).await.unwrap_err();
        assert!(format!("{err:#}").contains("missing.yaml"));
    }
}
