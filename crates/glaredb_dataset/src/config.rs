use std::collections::HashMap;
use std::sync::LazyLock;

use crate::arrays::scalar::ScalarValue;
use crate::errors::{DatasetError, Result};

/// Configuration for a dataset session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetConfig {
    pub case_sensitive: bool,
    pub self_join_auto_resolve_ambiguity: bool,
    pub default_partitions: u64,
    pub max_explain_depth: u64,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        DatasetConfig {
            case_sensitive: false,
            self_join_auto_resolve_ambiguity: true,
            default_partitions: num_cpus::get().clamp(MIN_PARTITION_COUNT, MAX_PARTITION_COUNT)
                as u64,
            max_explain_depth: 64,
        }
    }
}

impl DatasetConfig {
    pub fn set_from_scalar(&mut self, name: &str, value: ScalarValue) -> Result<()> {
        let func = GET_SET_FUNCTIONS
            .get(name)
            .ok_or_else(|| missing_setting(name))?;

        (func.set)(value, self)
    }

    pub fn get_as_scalar(&self, name: &str) -> Result<ScalarValue> {
        let func = GET_SET_FUNCTIONS
            .get(name)
            .ok_or_else(|| missing_setting(name))?;

        Ok((func.get)(self))
    }

    pub fn reset(&mut self, name: &str) -> Result<()> {
        let def_conf = Self::default();

        let func = GET_SET_FUNCTIONS
            .get(name)
            .ok_or_else(|| missing_setting(name))?;

        let scalar = (func.get)(&def_conf);
        (func.set)(scalar, self)
    }

    pub fn reset_all(&mut self) {
        *self = Self::default();
    }

    /// Names of all known settings, sorted.
    pub fn setting_names() -> Vec<&'static str> {
        let mut names: Vec<_> = GET_SET_FUNCTIONS.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

fn missing_setting(name: &str) -> DatasetError {
    DatasetError::InvalidArgument(format!("Missing setting for '{name}'"))
}

struct SettingFunctions {
    set: fn(scalar: ScalarValue, conf: &mut DatasetConfig) -> Result<()>,
    get: fn(conf: &DatasetConfig) -> ScalarValue,
}

impl SettingFunctions {
    const fn new<S: DatasetSetting>() -> Self {
        SettingFunctions {
            set: S::set_from_scalar as _,
            get: S::get_as_scalar as _,
        }
    }
}

fn insert_setting<S: DatasetSetting>(map: &mut HashMap<&'static str, SettingFunctions>) {
    if map.insert(S::NAME, SettingFunctions::new::<S>()).is_some() {
        panic!("Duplicate settings names: {}", S::NAME);
    }
}

static GET_SET_FUNCTIONS: LazyLock<HashMap<&'static str, SettingFunctions>> = LazyLock::new(|| {
    let mut map = HashMap::new();

    insert_setting::<CaseSensitive>(&mut map);
    insert_setting::<SelfJoinAutoResolveAmbiguity>(&mut map);
    insert_setting::<DefaultPartitions>(&mut map);
    insert_setting::<MaxExplainDepth>(&mut map);

    map
});

pub trait DatasetSetting: Sync + Send + 'static {
    const NAME: &'static str;
    const DESCRIPTION: &'static str;

    fn set_from_scalar(scalar: ScalarValue, conf: &mut DatasetConfig) -> Result<()>;
    fn get_as_scalar(conf: &DatasetConfig) -> ScalarValue;
}

fn expect_bool(name: &str, scalar: &ScalarValue) -> Result<bool> {
    match scalar {
        ScalarValue::Boolean(b) => Ok(*b),
        other => Err(DatasetError::InvalidArgument(format!(
            "Setting '{name}' expects a boolean, got '{other}'"
        ))),
    }
}

fn expect_u64(name: &str, scalar: &ScalarValue) -> Result<u64> {
    let val = match scalar {
        ScalarValue::Int32(v) => *v as i64,
        ScalarValue::Int64(v) => *v,
        other => {
            return Err(DatasetError::InvalidArgument(format!(
                "Setting '{name}' expects an integer, got '{other}'"
            )));
        }
    };
    u64::try_from(val).map_err(|_| {
        DatasetError::InvalidArgument(format!("Setting '{name}' cannot be negative, got {val}"))
    })
}

pub struct CaseSensitive;

impl DatasetSetting for CaseSensitive {
    const NAME: &'static str = "case_sensitive";
    const DESCRIPTION: &'static str = "Compare column names case sensitively during resolution";

    fn set_from_scalar(scalar: ScalarValue, conf: &mut DatasetConfig) -> Result<()> {
        conf.case_sensitive = expect_bool(Self::NAME, &scalar)?;
        Ok(())
    }

    fn get_as_scalar(conf: &DatasetConfig) -> ScalarValue {
        conf.case_sensitive.into()
    }
}

pub struct SelfJoinAutoResolveAmbiguity;

impl DatasetSetting for SelfJoinAutoResolveAmbiguity {
    const NAME: &'static str = "self_join_auto_resolve_ambiguity";
    const DESCRIPTION: &'static str =
        "Rewrite trivially true equalities in self-join conditions to compare both sides";

    fn set_from_scalar(scalar: ScalarValue, conf: &mut DatasetConfig) -> Result<()> {
        conf.self_join_auto_resolve_ambiguity = expect_bool(Self::NAME, &scalar)?;
        Ok(())
    }

    fn get_as_scalar(conf: &DatasetConfig) -> ScalarValue {
        conf.self_join_auto_resolve_ambiguity.into()
    }
}

const MIN_PARTITION_COUNT: usize = 1;
const MAX_PARTITION_COUNT: usize = 512;

pub struct DefaultPartitions;

impl DefaultPartitions {
    pub fn validate_value(val: u64) -> Result<()> {
        if val < MIN_PARTITION_COUNT as u64 {
            return Err(DatasetError::InvalidArgument(format!(
                "Partition count cannot be less than {MIN_PARTITION_COUNT}"
            )));
        }

        if val > MAX_PARTITION_COUNT as u64 {
            return Err(DatasetError::InvalidArgument(format!(
                "Partition count cannot be greater than {MAX_PARTITION_COUNT}"
            )));
        }

        Ok(())
    }
}

impl DatasetSetting for DefaultPartitions {
    const NAME: &'static str = "default_partitions";
    const DESCRIPTION: &'static str = "Number of partitions local relations are split into";

    fn set_from_scalar(scalar: ScalarValue, conf: &mut DatasetConfig) -> Result<()> {
        let val = expect_u64(Self::NAME, &scalar)?;
        Self::validate_value(val)?;
        conf.default_partitions = val;
        Ok(())
    }

    fn get_as_scalar(conf: &DatasetConfig) -> ScalarValue {
        (conf.default_partitions as i64).into()
    }
}

pub struct MaxExplainDepth;

impl DatasetSetting for MaxExplainDepth {
    const NAME: &'static str = "max_explain_depth";
    const DESCRIPTION: &'static str = "Plan depth after which explain output is truncated";

    fn set_from_scalar(scalar: ScalarValue, conf: &mut DatasetConfig) -> Result<()> {
        conf.max_explain_depth = expect_u64(Self::NAME, &scalar)?;
        Ok(())
    }

    fn get_as_scalar(conf: &DatasetConfig) -> ScalarValue {
        (conf.max_explain_depth as i64).into()
    }
}
