//! Core value types for a parameter sweep.
//!
//! Everything here is immutable once built: the enumerator turns a
//! configuration into a list of [`Job`]s and the dispatcher only reads them.

use crate::config::expand_env_vars;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Macro to generate a NewType wrapper with standard trait implementations.
macro_rules! newtype_string {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new instance.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Get the inner value as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

newtype_string!(
    /// Label of a parameter group, e.g. "10_7".
    ///
    /// The group directory is this label followed by the run suffix.
    GroupLabel
);

newtype_string!(
    /// Short identifier of an input file used in job directory names.
    InputId
);

/// Three signed offsets handed to the learner as positional arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OffsetTuple(pub [i32; 3]);

impl OffsetTuple {
    pub const fn new(a: i32, b: i32, c: i32) -> Self {
        Self([a, b, c])
    }

    /// The offsets as command-line arguments, in order.
    pub fn to_args(&self) -> [String; 3] {
        self.0.map(|v| v.to_string())
    }
}

impl fmt::Display for OffsetTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c] = self.0;
        write!(f, "{}_{}_{}", a, b, c)
    }
}

/// A named bucket of offset tuples sharing one group directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub label: GroupLabel,
    pub tuples: Vec<OffsetTuple>,
}

impl Group {
    pub fn new(label: impl Into<String>, tuples: Vec<OffsetTuple>) -> Self {
        Self {
            label: GroupLabel::new(label),
            tuples,
        }
    }
}

/// An input data file (primary or map) with the identifier used for
/// directory naming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "InputFileSpec")]
pub struct InputFile {
    pub path: PathBuf,
    pub id: InputId,
}

/// Accepted config shapes: a bare path, or a path with an explicit id.
///
/// `${VAR}` references in the path are expanded here, before any id is
/// inferred from it.
#[derive(Deserialize)]
#[serde(untagged)]
enum InputFileSpec {
    Path(PathBuf),
    Declared { path: PathBuf, id: Option<String> },
}

impl From<InputFileSpec> for InputFile {
    fn from(spec: InputFileSpec) -> Self {
        let expand = |path: PathBuf| PathBuf::from(expand_env_vars(&path.to_string_lossy()));
        match spec {
            InputFileSpec::Path(path) => InputFile::infer(expand(path)),
            InputFileSpec::Declared { path, id: Some(id) } => InputFile::new(expand(path), id),
            InputFileSpec::Declared { path, id: None } => InputFile::infer(expand(path)),
        }
    }
}

impl InputFile {
    pub fn new(path: impl Into<PathBuf>, id: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            id: InputId::new(id),
        }
    }

    /// Build an input file whose id is derived from its name.
    ///
    /// Takes the last `_`-separated segment of the file stem and keeps its
    /// leading digits, so `data/ee_ab_map_9lin.dat` becomes `9`. Segments
    /// without leading digits are used whole.
    pub fn infer(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let id = infer_id(&path);
        Self {
            path,
            id: InputId::new(id),
        }
    }
}

fn infer_id(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let segment = stem.rsplit('_').next().unwrap_or(&stem);
    let digits: String = segment.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        segment.to_string()
    } else {
        digits
    }
}

/// One invocation of the learner: a program, its arguments and the
/// directory it must run in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Job {
    pub group: GroupLabel,
    pub tuple: OffsetTuple,
    pub program: String,
    pub args: Vec<String>,
    pub dir: PathBuf,
}

impl Job {
    /// The command as a single shell-style line, for logs and listings.
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_tuple_display() {
        assert_eq!(OffsetTuple::new(10, 7, -7).to_string(), "10_7_-7");
        assert_eq!(OffsetTuple::new(10, -5, -5).to_string(), "10_-5_-5");
    }

    #[test]
    fn test_offset_tuple_args_keep_order() {
        let args = OffsetTuple::new(10, -7, 7).to_args();
        assert_eq!(args, ["10".to_string(), "-7".to_string(), "7".to_string()]);
    }

    #[test]
    fn test_input_id_inference() {
        assert_eq!(InputFile::infer("data/ee_ab_map_9lin.dat").id.as_str(), "9");
        assert_eq!(InputFile::infer("data/ee_ab_map_8lin.dat").id.as_str(), "8");
        assert_eq!(InputFile::infer("ee_ab_map_4.dat").id.as_str(), "4");
        assert_eq!(InputFile::infer("maps/corridor.dat").id.as_str(), "corridor");
        assert_eq!(InputFile::infer("maps/floor_b2.dat").id.as_str(), "b2");
    }

    #[test]
    fn test_input_file_deserialize_shapes() {
        let bare: InputFile = serde_json::from_str(r#""data/ee_ab_map_9lin.dat""#).unwrap();
        assert_eq!(bare.id.as_str(), "9");
        assert_eq!(bare.path, PathBuf::from("data/ee_ab_map_9lin.dat"));

        let declared: InputFile =
            serde_json::from_str(r#"{"path": "data/lab.dat", "id": "lab"}"#).unwrap();
        assert_eq!(declared.id.as_str(), "lab");

        let implicit: InputFile = serde_json::from_str(r#"{"path": "data/x_12.dat"}"#).unwrap();
        assert_eq!(implicit.id.as_str(), "12");
    }

    #[test]
    fn test_input_id_inferred_after_env_expansion() {
        // SAFETY: the variable name is unique to this test.
        unsafe { std::env::set_var("LEARN_SWEEP_TYPES_MAP", "data/ee_ab_map_8lin.dat") };

        let bare: InputFile = serde_json::from_str(r#""${LEARN_SWEEP_TYPES_MAP}""#).unwrap();
        assert_eq!(bare.path, PathBuf::from("data/ee_ab_map_8lin.dat"));
        assert_eq!(bare.id.as_str(), "8");

        let implicit: InputFile =
            serde_json::from_str(r#"{"path": "${LEARN_SWEEP_TYPES_MAP}"}"#).unwrap();
        assert_eq!(implicit.id.as_str(), "8");

        let declared: InputFile =
            serde_json::from_str(r#"{"path": "${LEARN_SWEEP_TYPES_MAP}", "id": "hall"}"#).unwrap();
        assert_eq!(declared.path, PathBuf::from("data/ee_ab_map_8lin.dat"));
        assert_eq!(declared.id.as_str(), "hall");
    }

    #[test]
    fn test_group_deserialize() {
        let group: Group =
            serde_json::from_str(r#"{"label": "10_7", "tuples": [[10, 7, -7], [10, -7, 7]]}"#)
                .unwrap();
        assert_eq!(group.label.as_str(), "10_7");
        assert_eq!(group.tuples, vec![OffsetTuple::new(10, 7, -7), OffsetTuple::new(10, -7, 7)]);
    }

    #[test]
    fn test_command_line() {
        let job = Job {
            group: GroupLabel::from("10_7"),
            tuple: OffsetTuple::new(10, 7, -7),
            program: "../../binary".to_string(),
            args: vec!["test".into(), "learn_fdebug".into(), "10".into()],
            dir: PathBuf::from("/tmp/x"),
        };
        assert_eq!(job.command_line(), "../../binary test learn_fdebug 10");
    }
}
