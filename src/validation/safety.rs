use crate::config::SafetyConfig;

/// What the safety gate needs to know about a matched module. Cloned out of
/// the catalog so validation jobs own their data.
#[derive(Debug, Clone)]
pub struct ModuleSpec {
    pub module_id: String,
    pub safe_mode: bool,
    pub destructive: bool,
}

/// Non-destructive execution policy. Rejections are terminal per candidate
/// (`skipped-unsafe`) and never abort the run.
#[derive(Debug, Clone, Default)]
pub struct SafetyPolicy {
    excluded_targets: Vec<String>,
    destructive_modules: Vec<String>,
}

impl SafetyPolicy {
    pub fn from_config(config: &SafetyConfig) -> Self {
        Self {
            excluded_targets: config.excluded_targets.clone(),
            destructive_modules: config.destructive_modules.clone(),
        }
    }

    /// Decide whether a candidate may be submitted. Returns the rejection
    /// reason when it may not.
    pub fn check(&self, host: &str, module: Option<&ModuleSpec>) -> Result<(), String> {
        if self.excluded_targets.iter().any(|t| t == host) {
            return Err(format!("target {} is on the exclusion list", host));
        }

        let module = match module {
            Some(m) => m,
            None => return Err("module is not in the catalog".to_string()),
        };

        if self
            .destructive_modules
            .iter()
            .any(|m| m == &module.module_id)
        {
            return Err(format!("module {} is blacklisted as destructive", module.module_id));
        }
        if module.destructive {
            return Err(format!("module {} is flagged destructive", module.module_id));
        }
        if !module.safe_mode {
            return Err(format!(
                "module {} has no safe-mode variant",
                module.module_id
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(safe_mode: bool, destructive: bool) -> ModuleSpec {
        ModuleSpec {
            module_id: "exploit/test/mod".into(),
            safe_mode,
            destructive,
        }
    }

    #[test]
    fn test_safe_module_passes() {
        let policy = SafetyPolicy::default();
        assert!(policy.check("10.0.0.5", Some(&spec(true, false))).is_ok());
    }

    #[test]
    fn test_excluded_target_rejected() {
        let policy = SafetyPolicy::from_config(&SafetyConfig {
            excluded_targets: vec!["10.0.0.5".into()],
            destructive_modules: vec![],
        });
        assert!(policy.check("10.0.0.5", Some(&spec(true, false))).is_err());
        assert!(policy.check("10.0.0.6", Some(&spec(true, false))).is_ok());
    }

    #[test]
    fn test_module_without_safe_mode_rejected() {
        let policy = SafetyPolicy::default();
        let err = policy.check("h", Some(&spec(false, false))).unwrap_err();
        assert!(err.contains("no safe-mode"));
    }

    #[test]
    fn test_destructive_flag_rejected() {
        let policy = SafetyPolicy::default();
        assert!(policy.check("h", Some(&spec(true, true))).is_err());
    }

    #[test]
    fn test_blacklisted_module_rejected() {
        let policy = SafetyPolicy::from_config(&SafetyConfig {
            excluded_targets: vec![],
            destructive_modules: vec!["exploit/test/mod".into()],
        });
        assert!(policy.check("h", Some(&spec(true, false))).is_err());
    }

    #[test]
    fn test_unknown_module_rejected() {
        let policy = SafetyPolicy::default();
        assert!(policy.check("h", None).is_err());
    }
}
