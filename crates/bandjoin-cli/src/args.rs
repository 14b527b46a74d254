//! Hand-rolled argument parsing. Errors are usage errors (exit code 2).

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use bandjoin_datagen::GeneratorConfig;
use bandjoin_error::{BandJoinError, Result};
use bandjoin_exec::{JoinConfig, PairIdentity, Strategy};

pub const DEFAULT_DB_DIR: &str = "databases";
pub const DEFAULT_DB1: &str = "database1.db";
pub const DEFAULT_DB2: &str = "database2.db";

#[derive(Debug)]
pub enum Command {
    Generate(GenerateArgs),
    Run(RunArgs),
    Compare(CompareArgs),
}

impl Command {
    pub fn log_file(&self) -> Option<&Path> {
        match self {
            Self::Generate(a) => a.log_file.as_deref(),
            Self::Run(a) => a.log_file.as_deref(),
            Self::Compare(a) => a.log_file.as_deref(),
        }
    }
}

#[derive(Debug)]
pub struct GenerateArgs {
    pub dir: PathBuf,
    pub db1: String,
    pub db2: String,
    pub config: GeneratorConfig,
    pub log_file: Option<PathBuf>,
}

/// Join settings: an optional TOML file plus flag overrides.
#[derive(Debug, Default)]
pub struct JoinOverrides {
    pub config_file: Option<PathBuf>,
    pub max_days_diff: Option<u32>,
    pub invert_join: bool,
    pub pair_identity: Option<PairIdentity>,
    pub semi_join_dedup: Option<PairIdentity>,
}

impl JoinOverrides {
    /// Load the file (if any), then apply flags on top.
    pub fn resolve(&self) -> Result<JoinConfig> {
        let mut config = match &self.config_file {
            Some(path) => {
                let text = fs::read_to_string(path).map_err(|e| {
                    BandJoinError::Config(format!("cannot read {}: {e}", path.display()))
                })?;
                JoinConfig::from_toml_str(&text)?
            }
            None => JoinConfig::default(),
        };
        if let Some(days) = self.max_days_diff {
            config.max_days_diff = days;
        }
        if self.invert_join {
            config.invert_join = true;
        }
        if let Some(identity) = self.pair_identity {
            config.pair_identity = identity;
        }
        if self.semi_join_dedup.is_some() {
            config.semi_join_dedup = self.semi_join_dedup;
        }
        Ok(config)
    }
}

#[derive(Debug)]
pub struct RunArgs {
    pub strategy: Strategy,
    pub db1: PathBuf,
    pub db2: PathBuf,
    pub join: JoinOverrides,
    pub output: Option<PathBuf>,
    pub report: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
}

#[derive(Debug)]
pub struct CompareArgs {
    pub db1: PathBuf,
    pub db2: PathBuf,
    pub join: JoinOverrides,
    pub out_dir: PathBuf,
    pub report: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
}

fn default_db(name: &str) -> PathBuf {
    Path::new(DEFAULT_DB_DIR).join(name)
}

/// Cursor over the arguments following the subcommand.
struct Flags<'a> {
    args: &'a [String],
    pos: usize,
}

impl<'a> Flags<'a> {
    fn next_flag(&mut self) -> Option<&'a str> {
        let flag = self.args.get(self.pos)?;
        self.pos += 1;
        Some(flag.as_str())
    }

    fn value(&mut self, flag: &str) -> std::result::Result<&'a str, String> {
        let value = self
            .args
            .get(self.pos)
            .ok_or_else(|| format!("{flag} requires a value"))?;
        self.pos += 1;
        Ok(value.as_str())
    }

    fn parsed<T: FromStr>(&mut self, flag: &str) -> std::result::Result<T, String> {
        let text = self.value(flag)?;
        text.parse()
            .map_err(|_| format!("invalid value `{text}` for {flag}"))
    }

    fn identity(&mut self, flag: &str) -> std::result::Result<PairIdentity, String> {
        let text = self.value(flag)?;
        PairIdentity::parse(text)
            .ok_or_else(|| format!("{flag} expects `ordinal` or `content`, got `{text}`"))
    }
}

/// Try the flags shared by `run` and `compare`. Returns `Ok(false)` if
/// `flag` is not one of them.
fn join_flag(
    flag: &str,
    flags: &mut Flags<'_>,
    join: &mut JoinOverrides,
    db1: &mut PathBuf,
    db2: &mut PathBuf,
    log_file: &mut Option<PathBuf>,
) -> std::result::Result<bool, String> {
    match flag {
        "--db1" => *db1 = PathBuf::from(flags.value(flag)?),
        "--db2" => *db2 = PathBuf::from(flags.value(flag)?),
        "--config" => join.config_file = Some(PathBuf::from(flags.value(flag)?)),
        "--max-days-diff" => join.max_days_diff = Some(flags.parsed(flag)?),
        "--invert-join" => join.invert_join = true,
        "--pair-identity" => join.pair_identity = Some(flags.identity(flag)?),
        "--semi-join-dedup" => join.semi_join_dedup = Some(flags.identity(flag)?),
        "--log-file" => *log_file = Some(PathBuf::from(flags.value(flag)?)),
        _ => return Ok(false),
    }
    Ok(true)
}

pub fn parse_generate(args: &[String]) -> std::result::Result<GenerateArgs, String> {
    let mut parsed = GenerateArgs {
        dir: PathBuf::from(DEFAULT_DB_DIR),
        db1: DEFAULT_DB1.to_owned(),
        db2: DEFAULT_DB2.to_owned(),
        config: GeneratorConfig::default(),
        log_file: None,
    };
    let mut flags = Flags { args, pos: 0 };
    while let Some(flag) = flags.next_flag() {
        match flag {
            "--dir" => parsed.dir = PathBuf::from(flags.value(flag)?),
            "--db1" => parsed.db1 = flags.value(flag)?.to_owned(),
            "--db2" => parsed.db2 = flags.value(flag)?.to_owned(),
            "--employees" => parsed.config.num_employees = flags.parsed(flag)?,
            "--overlap-ratio" => parsed.config.overlap_ratio = flags.parsed(flag)?,
            "--departments" => parsed.config.num_departments = flags.parsed(flag)?,
            "--avg-projects" => parsed.config.avg_projects_per_department = flags.parsed(flag)?,
            "--std-projects" => parsed.config.std_projects_per_department = flags.parsed(flag)?,
            "--seed" => parsed.config.seed = flags.parsed(flag)?,
            "--log-file" => parsed.log_file = Some(PathBuf::from(flags.value(flag)?)),
            other => return Err(format!("unknown option `{other}` for generate")),
        }
    }
    parsed.config.validate().map_err(|e| e.to_string())?;
    Ok(parsed)
}

pub fn parse_run(args: &[String]) -> std::result::Result<RunArgs, String> {
    let mut strategy = None;
    let mut db1 = default_db(DEFAULT_DB1);
    let mut db2 = default_db(DEFAULT_DB2);
    let mut join = JoinOverrides::default();
    let mut output = None;
    let mut report = None;
    let mut log_file = None;
    let mut flags = Flags { args, pos: 0 };
    while let Some(flag) = flags.next_flag() {
        if join_flag(flag, &mut flags, &mut join, &mut db1, &mut db2, &mut log_file)? {
            continue;
        }
        match flag {
            "--strategy" => {
                let name = flags.value(flag)?;
                strategy = Some(
                    Strategy::parse(name)
                        .ok_or_else(|| format!("unknown strategy `{name}`"))?,
                );
            }
            "--output" => output = Some(PathBuf::from(flags.value(flag)?)),
            "--report" => report = Some(PathBuf::from(flags.value(flag)?)),
            other => return Err(format!("unknown option `{other}` for run")),
        }
    }
    Ok(RunArgs {
        strategy: strategy.ok_or("run requires --strategy")?,
        db1,
        db2,
        join,
        output,
        report,
        log_file,
    })
}

pub fn parse_compare(args: &[String]) -> std::result::Result<CompareArgs, String> {
    let mut db1 = default_db(DEFAULT_DB1);
    let mut db2 = default_db(DEFAULT_DB2);
    let mut join = JoinOverrides::default();
    let mut out_dir = PathBuf::from(".");
    let mut report = None;
    let mut log_file = None;
    let mut flags = Flags { args, pos: 0 };
    while let Some(flag) = flags.next_flag() {
        if join_flag(flag, &mut flags, &mut join, &mut db1, &mut db2, &mut log_file)? {
            continue;
        }
        match flag {
            "--out-dir" => out_dir = PathBuf::from(flags.value(flag)?),
            "--report" => report = Some(PathBuf::from(flags.value(flag)?)),
            other => return Err(format!("unknown option `{other}` for compare")),
        }
    }
    if join.invert_join {
        return Err("compare always runs both orientations; drop --invert-join".to_owned());
    }
    Ok(CompareArgs {
        db1,
        db2,
        join,
        out_dir,
        report,
        log_file,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn run_flags_and_defaults() {
        let run = parse_run(&args(&["--strategy", "semi", "--invert-join", "--max-days-diff", "3"]))
            .unwrap();
        assert_eq!(run.strategy, Strategy::SemiJoin);
        assert_eq!(run.db1, Path::new("databases").join("database1.db"));
        let config = run.join.resolve().unwrap();
        assert_eq!(config.max_days_diff, 3);
        assert!(config.invert_join);
    }

    #[test]
    fn run_requires_strategy() {
        assert!(parse_run(&args(&["--db1", "a.db"])).is_err());
        assert!(parse_run(&args(&["--strategy", "nested-loop"])).is_err());
    }

    #[test]
    fn missing_value_is_reported() {
        let err = parse_run(&args(&["--strategy"])).unwrap_err();
        assert!(err.contains("--strategy requires a value"));
        let err = parse_generate(&args(&["--employees", "many"])).unwrap_err();
        assert!(err.contains("invalid value `many`"));
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("join.toml");
        fs::write(&path, "max_days_diff = 5\npair_identity = \"content\"\n").unwrap();
        let overrides = JoinOverrides {
            config_file: Some(path),
            max_days_diff: Some(1),
            ..JoinOverrides::default()
        };
        let config = overrides.resolve().unwrap();
        assert_eq!(config.max_days_diff, 1);
        assert_eq!(config.pair_identity, PairIdentity::Content);
    }

    #[test]
    fn unreadable_config_file_is_config_error() {
        let overrides = JoinOverrides {
            config_file: Some(PathBuf::from("/nonexistent/join.toml")),
            ..JoinOverrides::default()
        };
        assert!(matches!(overrides.resolve(), Err(BandJoinError::Config(_))));
    }

    #[test]
    fn generate_overrides() {
        let parsed = parse_generate(&args(&[
            "--dir",
            "out",
            "--employees",
            "10",
            "--overlap-ratio",
            "0.5",
            "--seed",
            "9",
        ]))
        .unwrap();
        assert_eq!(parsed.dir, PathBuf::from("out"));
        assert_eq!(parsed.config.num_employees, 10);
        assert_eq!(parsed.config.overlap_ratio, 0.5);
        assert_eq!(parsed.config.seed, 9);
        assert_eq!(parsed.db1, "database1.db");
        assert!(parse_generate(&args(&["--overlap-ratio", "0"])).is_err());
    }

    #[test]
    fn compare_rejects_invert() {
        assert!(parse_compare(&args(&["--invert-join"])).is_err());
        let parsed = parse_compare(&args(&["--out-dir", "results"])).unwrap();
        assert_eq!(parsed.out_dir, PathBuf::from("results"));
    }
}
