//! Execution: run an instrumented script and collect its answers.
//!
//! The transformer only produces text; something else has to run it. That
//! boundary is the [`ExecutionAdapter`] trait. [`execute_with_limits`] wraps a
//! single run in a timeout and a value cap. Nothing here retries: a failed run
//! is reported once, as is.
//!
//! # Modules
//!
//! - [`error`]: `ExecutionError` / `ExecutionResult`
//! - [`subprocess`]: `SubprocessAdapter`, which runs real interpreters

pub mod error;
pub mod subprocess;

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use error::{ExecutionError, ExecutionResult};
pub use subprocess::{RuntimePrograms, SubprocessAdapter, RESULT_SENTINEL, VALUE_LIMIT_MARKER};

use crate::language::Language;
use crate::obs;
use crate::transform::InstrumentedScript;

/// Names made visible to the script before it runs, in name order.
pub type Bindings = BTreeMap<String, Value>;

/// Runs instrumented scripts of one language.
#[async_trait]
pub trait ExecutionAdapter: Send + Sync {
    fn language(&self) -> Language;

    /// Run `script` and return the collector's values in order.
    async fn execute(
        &self,
        script: &InstrumentedScript,
        bindings: &Bindings,
    ) -> ExecutionResult<Vec<Value>>;
}

/// Limits applied to a single execution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Wall-clock limit for one run (milliseconds).
    pub timeout_ms: u64,
    /// Maximum number of collected values.
    pub max_values: usize,
    /// Maximum bytes read from the runtime's stdout.
    pub max_output_bytes: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            max_values: 10_000,
            max_output_bytes: 1024 * 1024,
        }
    }
}

impl ExecutionConfig {
    pub fn validate(&self) -> ExecutionResult<()> {
        if self.timeout_ms == 0 {
            return Err(ExecutionError::InvalidConfig(
                "timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.max_values == 0 {
            return Err(ExecutionError::InvalidConfig(
                "max_values must be greater than zero".to_string(),
            ));
        }
        if self.max_output_bytes == 0 {
            return Err(ExecutionError::InvalidConfig(
                "max_output_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Run `script` once under `config`'s timeout and value cap.
///
/// Returned values past the cap are rejected here as well; a
/// [`SubprocessAdapter`] already stops the run inside the child.
pub async fn execute_with_limits(
    adapter: &dyn ExecutionAdapter,
    script: &InstrumentedScript,
    bindings: &Bindings,
    config: &ExecutionConfig,
) -> ExecutionResult<Vec<Value>> {
    config.validate()?;
    if adapter.language() != script.language {
        return Err(ExecutionError::NoAdapter {
            language: script.language,
        });
    }

    let started = Instant::now();
    let outcome = match tokio::time::timeout(config.timeout(), adapter.execute(script, bindings)).await
    {
        Ok(result) => result,
        Err(_elapsed) => Err(ExecutionError::Timeout {
            limit_ms: config.timeout_ms,
        }),
    };

    let values = match outcome {
        Ok(values) if values.len() > config.max_values => Err(ExecutionError::ValueLimitExceeded {
            produced: values.len(),
            limit: config.max_values,
        }),
        other => other,
    };

    match &values {
        Ok(values) => obs::emit_execution_finished(
            &script.snippet_id,
            script.language,
            started.elapsed().as_millis() as u64,
            values.len(),
        ),
        Err(e) => obs::emit_execution_failed(&script.snippet_id, script.language, e),
    }
    values
}

/// Adapters keyed by language.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<Language, Arc<dyn ExecutionAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with a [`SubprocessAdapter`] for every language.
    pub fn subprocess(programs: &RuntimePrograms, config: &ExecutionConfig) -> Self {
        let mut registry = Self::new();
        for language in Language::ALL {
            registry.register(Arc::new(SubprocessAdapter::new(
                language,
                programs.clone(),
                config,
            )));
        }
        registry
    }

    /// Register `adapter` under its own language, replacing any previous one.
    pub fn register(&mut self, adapter: Arc<dyn ExecutionAdapter>) {
        self.adapters.insert(adapter.language(), adapter);
    }

    pub fn adapter_for(&self, language: Language) -> ExecutionResult<Arc<dyn ExecutionAdapter>> {
        self.adapters
            .get(&language)
            .cloned()
            .ok_or(ExecutionError::NoAdapter { language })
    }

    pub fn languages(&self) -> Vec<Language> {
        let mut languages: Vec<_> = self.adapters.keys().copied().collect();
        languages.sort();
        languages
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("languages", &self.languages())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lines::Snippet;
    use crate::transform::transform;

    struct FixedAdapter {
        values: Vec<Value>,
        delay: Duration,
    }

    #[async_trait]
    impl ExecutionAdapter for FixedAdapter {
        fn language(&self) -> Language {
            Language::Python
        }

        async fn execute(
            &self,
            _script: &InstrumentedScript,
            _bindings: &Bindings,
        ) -> ExecutionResult<Vec<Value>> {
            tokio::time::sleep(self.delay).await;
            Ok(self.values.clone())
        }
    }

    fn script() -> InstrumentedScript {
        let snippet = Snippet::new(
            "limits",
            Language::Python,
            "if __name__ == '__main__':\n    print(1)\n",
        );
        transform(&snippet).unwrap()
    }

    #[test]
    fn test_config_defaults_and_validation() {
        let config = ExecutionConfig::default();
        assert_eq!(config.timeout_ms, 5_000);
        assert!(config.validate().is_ok());

        let bad = ExecutionConfig {
            timeout_ms: 0,
            ..ExecutionConfig::default()
        };
        assert!(matches!(bad.validate(), Err(ExecutionError::InvalidConfig(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_reported_without_retry() {
        let adapter = FixedAdapter {
            values: vec![],
            delay: Duration::from_secs(60),
        };
        let config = ExecutionConfig {
            timeout_ms: 100,
            ..ExecutionConfig::default()
        };
        let err = execute_with_limits(&adapter, &script(), &Bindings::new(), &config)
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::Timeout { limit_ms: 100 }));
    }

    #[tokio::test]
    async fn test_value_cap() {
        let adapter = FixedAdapter {
            values: vec![Value::from(1); 3],
            delay: Duration::ZERO,
        };
        let config = ExecutionConfig {
            max_values: 2,
            ..ExecutionConfig::default()
        };
        let err = execute_with_limits(&adapter, &script(), &Bindings::new(), &config)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ExecutionError::ValueLimitExceeded {
                produced: 3,
                limit: 2
            }
        ));
    }

    #[tokio::test]
    async fn test_language_mismatch_is_rejected() {
        let adapter = FixedAdapter {
            values: vec![],
            delay: Duration::ZERO,
        };
        let js = transform(&Snippet::new(
            "js",
            Language::JavaScript,
            "function main() {\n}\n",
        ))
        .unwrap();
        let err = execute_with_limits(&adapter, &js, &Bindings::new(), &ExecutionConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ExecutionError::NoAdapter {
                language: Language::JavaScript
            }
        ));
    }

    #[test]
    fn test_registry_lookup() {
        let mut registry = AdapterRegistry::new();
        registry.register(Arc::new(FixedAdapter {
            values: vec![],
            delay: Duration::ZERO,
        }));
        assert!(registry.adapter_for(Language::Python).is_ok());
        assert!(matches!(
            registry.adapter_for(Language::Java),
            Err(ExecutionError::NoAdapter { .. })
        ));

        let full = AdapterRegistry::subprocess(&RuntimePrograms::default(), &ExecutionConfig::default());
        assert_eq!(full.languages().len(), 3);
    }
}
