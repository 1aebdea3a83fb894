use std::collections::HashMap;
use std::sync::LazyLock;

use dcount_error::{DcountError, Result, ResultExt};
use tracing::debug;

use crate::membership::MembershipSetKind;
use crate::null_handling::{GLOBAL_NULL_HANDLING, NullHandling, NullHandlingSource};

/// Configuration for distinct count aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationConfig {
    pub null_handling: NullHandling,
    pub membership_set: MembershipSetKind,
    pub parallel_buckets: bool,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AggregationConfig {
    /// Create a config with default settings.
    ///
    /// Null handling is seeded from the process-wide mode.
    pub fn new() -> Self {
        AggregationConfig {
            null_handling: GLOBAL_NULL_HANDLING.current_mode(),
            membership_set: MembershipSetKind::default(),
            parallel_buckets: false,
        }
    }

    pub fn set_from_str(&mut self, name: &str, value: &str) -> Result<()> {
        let func = GET_SET_FUNCTIONS
            .get(name)
            .ok_or_else(|| DcountError::new(format!("Missing setting for '{name}'")))?;

        (func.set)(value, self)?;
        debug!(%name, %value, "set aggregation setting");

        Ok(())
    }

    pub fn get_as_string(&self, name: &str) -> Result<String> {
        let func = GET_SET_FUNCTIONS
            .get(name)
            .ok_or_else(|| DcountError::new(format!("Missing setting for '{name}'")))?;

        Ok((func.get)(self))
    }

    /// Reset a single setting to its default value.
    pub fn reset(&mut self, name: &str) -> Result<()> {
        let def_conf = Self::new();

        let func = GET_SET_FUNCTIONS
            .get(name)
            .ok_or_else(|| DcountError::new(format!("Missing setting for '{name}'")))?;

        let value = (func.get)(&def_conf);
        (func.set)(&value, self)
    }

    pub fn reset_all(&mut self) {
        *self = Self::new();
    }

    /// Names and descriptions of all settings, sorted by name.
    pub fn settings() -> Vec<(&'static str, &'static str)> {
        let mut settings: Vec<_> = GET_SET_FUNCTIONS
            .iter()
            .map(|(name, funcs)| (*name, funcs.description))
            .collect();
        settings.sort_unstable();
        settings
    }
}

impl NullHandlingSource for AggregationConfig {
    fn current_mode(&self) -> NullHandling {
        self.null_handling
    }
}

struct SettingFunctions {
    description: &'static str,
    set: fn(value: &str, conf: &mut AggregationConfig) -> Result<()>,
    get: fn(conf: &AggregationConfig) -> String,
}

impl SettingFunctions {
    const fn new<S: AggregationSetting>() -> Self {
        SettingFunctions {
            description: S::DESCRIPTION,
            set: S::set_from_str as _,
            get: S::get_as_string as _,
        }
    }
}

fn insert_setting<S: AggregationSetting>(map: &mut HashMap<&'static str, SettingFunctions>) {
    if map.insert(S::NAME, SettingFunctions::new::<S>()).is_some() {
        panic!("Duplicate settings names: {}", S::NAME);
    }
}

static GET_SET_FUNCTIONS: LazyLock<HashMap<&'static str, SettingFunctions>> = LazyLock::new(|| {
    let mut map = HashMap::new();

    insert_setting::<NullHandlingSetting>(&mut map);
    insert_setting::<MembershipSetSetting>(&mut map);
    insert_setting::<ParallelBuckets>(&mut map);

    map
});

pub trait AggregationSetting: Sync + Send + 'static {
    const NAME: &'static str;
    const DESCRIPTION: &'static str;

    fn set_from_str(value: &str, conf: &mut AggregationConfig) -> Result<()>;
    fn get_as_string(conf: &AggregationConfig) -> String;
}

pub struct NullHandlingSetting;

impl AggregationSetting for NullHandlingSetting {
    const NAME: &'static str = "null_handling";
    const DESCRIPTION: &'static str =
        "Whether null dictionary entries count as distinct values (default_value or explicit_null)";

    fn set_from_str(value: &str, conf: &mut AggregationConfig) -> Result<()> {
        conf.null_handling = value.parse()?;
        Ok(())
    }

    fn get_as_string(conf: &AggregationConfig) -> String {
        conf.null_handling.to_string()
    }
}

pub struct MembershipSetSetting;

impl AggregationSetting for MembershipSetSetting {
    const NAME: &'static str = "membership_set";
    const DESCRIPTION: &'static str = "Set implementation used to track seen dictionary ids";

    fn set_from_str(value: &str, conf: &mut AggregationConfig) -> Result<()> {
        conf.membership_set = value.parse()?;
        Ok(())
    }

    fn get_as_string(conf: &AggregationConfig) -> String {
        conf.membership_set.to_string()
    }
}

pub struct ParallelBuckets;

impl AggregationSetting for ParallelBuckets {
    const NAME: &'static str = "parallel_buckets";
    const DESCRIPTION: &'static str = "Scan buckets in parallel, one membership set per bucket";

    fn set_from_str(value: &str, conf: &mut AggregationConfig) -> Result<()> {
        conf.parallel_buckets = value
            .parse()
            .context_fn(|| format!("Invalid value for '{}': {value}", Self::NAME))?;
        Ok(())
    }

    fn get_as_string(conf: &AggregationConfig) -> String {
        conf.parallel_buckets.to_string()
    }
}
