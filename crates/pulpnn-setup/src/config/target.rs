use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Description of the cluster the generated kernels run on.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Number of cores sharing the work of a kernel.
    #[serde(default = "num_cores_default")]
    pub num_cores: u32,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            num_cores: num_cores_default(),
        }
    }
}

impl TargetConfig {
    /// Kernels split their work with `log2(num_cores)` shifts and `num_cores - 1` masks.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.num_cores.is_power_of_two() {
            return Err(ConfigError::InvalidCoreCount(self.num_cores));
        }
        Ok(())
    }
}

fn num_cores_default() -> u32 {
    8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_count_must_be_power_of_two() {
        assert_eq!(TargetConfig::default().validate(), Ok(()));
        for num_cores in [0, 3, 6] {
            assert_eq!(
                TargetConfig { num_cores }.validate(),
                Err(ConfigError::InvalidCoreCount(num_cores))
            );
        }
    }
}
