use crate::error::{SweepError, SweepResult};
use crate::types::{Group, InputFile, OffsetTuple};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::{env, fs, path::PathBuf};

pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_PRESET: &str = "split";
pub const PRESETS: &[&str] = &["single", "split"];

/// A complete sweep: which jobs to build and how many to run at once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Appended to every group label to form the group directory name.
    pub suffix: String,
    /// Learner binary, relative to the sweep root unless absolute.
    #[serde(default = "default_binary")]
    pub binary: String,
    /// Leading arguments passed before the input files.
    #[serde(default = "default_verb")]
    pub verb: Vec<String>,
    pub primaries: Vec<InputFile>,
    pub maps: Vec<InputFile>,
    pub groups: Vec<Group>,
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_binary() -> String {
    "binary".to_string()
}

fn default_verb() -> Vec<String> {
    vec!["test".to_string(), "learn_fdebug".to_string()]
}

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

fn offset_group(label: &str, span: i32) -> Group {
    Group::new(
        label,
        vec![
            OffsetTuple::new(10, span, -span),
            OffsetTuple::new(10, span, span),
            OffsetTuple::new(10, -span, span),
            OffsetTuple::new(10, -span, -span),
        ],
    )
}

impl SweepConfig {
    /// Look up a built-in preset by name.
    pub fn preset(name: &str) -> SweepResult<Self> {
        match name {
            "single" => Ok(Self::single()),
            "split" => Ok(Self::split()),
            other => Err(SweepError::UnknownPreset(other.to_string())),
        }
    }

    /// One primary against one map, two offset groups.
    pub fn single() -> Self {
        Self {
            suffix: "one".to_string(),
            binary: default_binary(),
            verb: default_verb(),
            primaries: vec![InputFile::infer("ee_ab_map_4.dat")],
            maps: vec![InputFile::infer("ee_ab_map_4.dat")],
            groups: vec![
                Group::new(
                    "10_5",
                    vec![
                        OffsetTuple::new(10, 5, 5),
                        OffsetTuple::new(10, -5, 5),
                        OffsetTuple::new(10, 5, -5),
                        OffsetTuple::new(10, -5, -5),
                    ],
                ),
                offset_group("10_7", 7),
            ],
            workers: DEFAULT_WORKERS,
        }
    }

    /// Separate primary and map files under `data/`, one offset group.
    pub fn split() -> Self {
        Self {
            suffix: "pi3exp3".to_string(),
            binary: default_binary(),
            verb: default_verb(),
            primaries: vec![InputFile::infer("data/ee_ab_map_9lin.dat")],
            maps: vec![InputFile::infer("data/ee_ab_map_8lin.dat")],
            groups: vec![offset_group("10_7", 7)],
            workers: DEFAULT_WORKERS,
        }
    }

    /// Number of jobs this configuration enumerates to.
    pub fn job_count(&self) -> usize {
        let per_group = self.primaries.len() * self.maps.len();
        self.groups.iter().map(|g| g.tuples.len() * per_group).sum()
    }

    pub fn validate(&self) -> SweepResult<()> {
        if self.primaries.is_empty() {
            return Err(SweepError::invalid("no primary input files"));
        }
        if self.maps.is_empty() {
            return Err(SweepError::invalid("no map input files"));
        }
        if self.groups.is_empty() {
            return Err(SweepError::invalid("no parameter groups"));
        }
        if self.workers == 0 {
            return Err(SweepError::invalid("worker count must be at least 1"));
        }
        if self.binary.trim().is_empty() {
            return Err(SweepError::invalid("binary must not be empty"));
        }

        if self.suffix.contains(['/', '\\']) {
            return Err(SweepError::invalid(format!(
                "suffix `{}` must not contain a path separator",
                self.suffix
            )));
        }

        let mut seen = HashSet::new();
        for group in &self.groups {
            let label = group.label.as_str();
            let dir_name = format!("{}{}", label, self.suffix);
            if !is_plain_dir_name(label) || !is_plain_dir_name(&dir_name) {
                return Err(SweepError::invalid(format!(
                    "group `{}` with suffix `{}` is not a valid directory name",
                    label, self.suffix
                )));
            }
            if !seen.insert(label) {
                return Err(SweepError::invalid(format!("duplicate group `{}`", label)));
            }
            if group.tuples.is_empty() {
                return Err(SweepError::invalid(format!("group `{}` has no tuples", label)));
            }
        }

        for input in self.primaries.iter().chain(&self.maps) {
            let id = input.id.as_str();
            if id.is_empty() || id.contains(['/', '\\']) {
                return Err(SweepError::invalid(format!(
                    "input `{}` has unusable id `{}`",
                    input.path.display(),
                    id
                )));
            }
        }

        Ok(())
    }
}

/// A single path component that names a real child directory.
fn is_plain_dir_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(['/', '\\']) && name != "." && name != ".."
}

pub fn resolve_config_path(explicit: Option<PathBuf>) -> Option<PathBuf> {
    if explicit.is_some() {
        return explicit;
    }

    env::var("SWEEP_CONFIG").ok().map(PathBuf::from)
}

pub(crate) fn expand_env_vars(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next(); // consume '{'
            let mut name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                name.push(c);
            }
            if let Ok(val) = env::var(&name) {
                out.push_str(&val);
            } else {
                out.push_str("${");
                out.push_str(&name);
                out.push('}');
            }
        } else {
            out.push(ch);
        }
    }

    out
}

fn expand_config(cfg: SweepConfig) -> SweepConfig {
    let mut cfg = cfg;

    cfg.suffix = expand_env_vars(&cfg.suffix);
    cfg.binary = expand_env_vars(&cfg.binary);
    cfg.verb = cfg.verb.into_iter().map(|a| expand_env_vars(&a)).collect();
    // Input paths were already expanded while deserializing, ahead of id
    // inference.

    cfg
}

/// Parse a JSON sweep description, expanding `${VAR}` references.
pub fn parse_config(raw: &str) -> anyhow::Result<SweepConfig> {
    let cfg: SweepConfig = serde_json::from_str(raw)?;
    let cfg = expand_config(cfg);
    cfg.validate()?;
    Ok(cfg)
}

/// Load the sweep from a config file when one is given, else from a preset.
pub fn load_sweep_config(path: Option<PathBuf>, preset: &str) -> anyhow::Result<SweepConfig> {
    match resolve_config_path(path) {
        Some(path) => {
            let raw = fs::read_to_string(&path).map_err(|e| {
                anyhow::anyhow!("Could not read sweep config {}: {}", path.display(), e)
            })?;
            parse_config(&raw)
                .map_err(|e| anyhow::anyhow!("Invalid sweep config {}: {}", path.display(), e))
        }
        None => {
            let cfg = SweepConfig::preset(preset)?;
            cfg.validate()?;
            Ok(cfg)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GroupLabel;

    #[test]
    fn test_presets_are_valid() {
        for name in PRESETS {
            let cfg = SweepConfig::preset(name).unwrap();
            assert!(cfg.validate().is_ok(), "preset {} failed validation", name);
            assert_eq!(cfg.workers, 4);
        }
    }

    #[test]
    fn test_preset_job_counts() {
        assert_eq!(SweepConfig::single().job_count(), 8);
        assert_eq!(SweepConfig::split().job_count(), 4);
    }

    #[test]
    fn test_unknown_preset() {
        assert_eq!(
            SweepConfig::preset("triple"),
            Err(SweepError::UnknownPreset("triple".to_string()))
        );
    }

    #[test]
    fn test_parse_config_defaults() {
        let cfg = parse_config(
            r#"{
                "suffix": "run1",
                "primaries": ["data/ee_ab_map_9lin.dat"],
                "maps": [{"path": "data/hall.dat", "id": "hall"}],
                "groups": [{"label": "10_7", "tuples": [[10, 7, -7]]}]
            }"#,
        )
        .unwrap();

        assert_eq!(cfg.binary, "binary");
        assert_eq!(cfg.verb, vec!["test", "learn_fdebug"]);
        assert_eq!(cfg.workers, DEFAULT_WORKERS);
        assert_eq!(cfg.primaries[0].id.as_str(), "9");
        assert_eq!(cfg.maps[0].id.as_str(), "hall");
        assert_eq!(cfg.job_count(), 1);
    }

    #[test]
    fn test_parse_config_rejects_invalid() {
        let err = parse_config(
            r#"{"suffix": "x", "primaries": [], "maps": ["m_1.dat"], "groups": []}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("no primary input files"));
    }

    #[test]
    fn test_validate_duplicate_group() {
        let mut cfg = SweepConfig::split();
        cfg.groups.push(cfg.groups[0].clone());
        let err = cfg.validate().unwrap_err();
        assert_eq!(err, SweepError::invalid("duplicate group `10_7`"));
    }

    #[test]
    fn test_validate_empty_group_and_workers() {
        let mut cfg = SweepConfig::split();
        cfg.groups[0].tuples.clear();
        assert!(cfg.validate().is_err());

        let mut cfg = SweepConfig::split();
        cfg.workers = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_suffix_must_stay_one_level() {
        let mut cfg = SweepConfig::split();
        cfg.suffix = "run/a".to_string();
        assert_eq!(
            cfg.validate(),
            Err(SweepError::invalid("suffix `run/a` must not contain a path separator"))
        );

        cfg.suffix = "run\\a".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_dot_directories() {
        let mut cfg = SweepConfig::split();
        cfg.suffix = String::new();
        cfg.groups[0].label = GroupLabel::from("..");
        assert!(cfg.validate().is_err());

        cfg.groups[0].label = GroupLabel::from(".");
        cfg.suffix = ".".to_string();
        assert!(cfg.validate().is_err());

        cfg.groups[0].label = GroupLabel::from("10_7");
        cfg.suffix = String::new();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_expanded_suffix_is_validated() {
        // SAFETY: the variable name is unique to this test.
        unsafe { env::set_var("LEARN_SWEEP_CONFIG_SUFFIX", "run/a") };

        let err = parse_config(
            r#"{
                "suffix": "${LEARN_SWEEP_CONFIG_SUFFIX}",
                "primaries": ["data/ee_ab_map_9lin.dat"],
                "maps": ["data/ee_ab_map_8lin.dat"],
                "groups": [{"label": "10_7", "tuples": [[10, 7, -7]]}]
            }"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("path separator"));
    }

    #[test]
    fn test_parse_config_infers_id_from_expanded_path() {
        // SAFETY: the variable name is unique to this test.
        unsafe { env::set_var("LEARN_SWEEP_CONFIG_MAP", "data/ee_ab_map_8lin.dat") };

        let cfg = parse_config(
            r#"{
                "suffix": "run1",
                "primaries": ["data/ee_ab_map_9lin.dat"],
                "maps": ["${LEARN_SWEEP_CONFIG_MAP}"],
                "groups": [{"label": "10_7", "tuples": [[10, 7, -7]]}]
            }"#,
        )
        .unwrap();

        assert_eq!(cfg.maps[0].path, PathBuf::from("data/ee_ab_map_8lin.dat"));
        assert_eq!(cfg.maps[0].id.as_str(), "8");
    }

    #[test]
    fn test_validate_input_id_with_separator() {
        let mut cfg = SweepConfig::split();
        cfg.maps = vec![InputFile::new("data/a.dat", "a/b")];
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_expand_env_vars_unset_kept() {
        assert_eq!(
            expand_env_vars("${LEARN_SWEEP_SURELY_UNSET}/maps"),
            "${LEARN_SWEEP_SURELY_UNSET}/maps"
        );
        assert_eq!(expand_env_vars("plain/path"), "plain/path");
    }

    #[test]
    fn test_expand_env_vars_set() {
        if let Ok(path) = env::var("PATH") {
            assert_eq!(expand_env_vars("${PATH}:/opt/bin"), format!("{}:/opt/bin", path));
        }
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sweep.json");
        let cfg = SweepConfig::single();
        fs::write(&path, serde_json::to_string(&cfg).unwrap()).unwrap();

        let loaded = load_sweep_config(Some(path), "split").unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn test_load_falls_back_to_preset() {
        // Only meaningful when SWEEP_CONFIG is not set in the test environment.
        if env::var("SWEEP_CONFIG").is_ok() {
            return;
        }
        let loaded = load_sweep_config(None, "single").unwrap();
        assert_eq!(loaded, SweepConfig::single());
    }
}
