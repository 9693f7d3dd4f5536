//! Asynchronous rule-walk with cooperative cancellation.
//!
//! The contract matches the synchronous walk exactly, except that async
//! predicates are awaited one at a time in rule order (never concurrently,
//! so a rule's position in the error list stays deterministic) and a
//! cancellation signal is honored between rules.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;

use crate::config::ValidateOptions;
use crate::error::{EngineError, EngineResult};
use crate::extractor::extract;
use crate::predicates::{AsyncPredicateInput, PredicateFn};
use crate::rule::ValidationReport;
use crate::validator::{predicate_input, RuleEval, ValidationCore};

/// Cheap cloneable cancellation flag, checked between rules.
///
/// Cancellation is cooperative: a rule already awaiting a predicate is not
/// interrupted, but no further rule starts once the flag is raised.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Raises the flag after `timeout`. The engine itself imposes no
    /// deadlines; this is caller-side sugar for bounding an async or
    /// streaming run. Requires a running tokio runtime.
    pub fn cancel_after(&self, timeout: Duration) {
        let handle = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            handle.cancel();
        });
    }
}

impl ValidationCore {
    pub(crate) async fn validate_async(
        &self,
        record: &Value,
        opts: &ValidateOptions,
        cancel: Option<&CancelHandle>,
    ) -> EngineResult<ValidationReport> {
        let started = Instant::now();
        if !record.is_object() {
            return Err(EngineError::bad_input(record));
        }

        let mut buf = self.pool.acquire_result();
        let mut error_count = 0usize;

        for rule in &self.rules {
            if cancel.is_some_and(CancelHandle::is_cancelled) {
                self.pool.release_result(buf);
                return Err(EngineError::Cancelled);
            }

            let raw = match self.eval_rule_async(record, rule).await {
                Ok(RuleEval::Ran(raw)) => raw,
                Ok(RuleEval::Skipped) => continue,
                Err(failure) => {
                    self.pool.release_result(buf);
                    return Err(failure);
                }
            };

            let pass = raw ^ rule.negative;
            if !pass {
                self.record_failure(&mut buf, rule);
                error_count += 1;
                if opts.fail_fast {
                    break;
                }
                if opts.max_errors.is_some_and(|max| error_count >= max) {
                    break;
                }
            }
        }

        let report = self.finish(record, buf);
        self.emit_diagnostics(&report, started.elapsed());
        Ok(report)
    }

    async fn eval_rule_async(
        &self,
        record: &Value,
        rule: &crate::compiler::CompiledRule,
    ) -> EngineResult<RuleEval> {
        let extracted = extract(record, &rule.segments);
        if self.skip_for_partial(rule, extracted.is_none()) {
            return Ok(RuleEval::Skipped);
        }

        match &rule.predicate.function {
            PredicateFn::Sync(predicate) => {
                let (args, has_value) = self.assemble_args(rule, extracted);
                let outcome = {
                    let input = predicate_input(rule, &args, has_value);
                    predicate(&input)
                };
                self.pool.release_args(args);
                outcome.map(RuleEval::Ran)
            }
            PredicateFn::Async(predicate) => {
                let input = AsyncPredicateInput {
                    value: extracted.cloned(),
                    params: Arc::clone(&rule.params),
                    regex: rule.regex.clone(),
                };
                predicate(input).await.map(RuleEval::Ran)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile_rules;
    use crate::config::EngineOptions;
    use crate::path_cache::PathCache;
    use crate::pool::BufferPool;
    use crate::predicates::{
        AsyncPredicateInput, PredicateCategory, PredicateDef, PredicateRegistry,
    };
    use crate::rule::Rule;
    use serde_json::json;

    fn registry_with_async_check() -> PredicateRegistry {
        // Simulates a remote uniqueness lookup: valid unless the value is
        // the string "taken".
        let remote = PredicateDef::asynchronous(
            "remoteAvailable",
            PredicateCategory::String,
            Vec::new(),
            |input: AsyncPredicateInput| async move {
                tokio::task::yield_now().await;
                let taken = input.value.as_ref().and_then(|v| v.as_str()) == Some("taken");
                Ok(!taken)
            },
        );
        PredicateRegistry::builtin().extended(vec![remote])
    }

    fn core_with(rules: Vec<Rule>, registry: &PredicateRegistry) -> ValidationCore {
        let options = EngineOptions::default();
        let cache = Arc::new(PathCache::new(options.path_cache_capacity));
        let (compiled, _) = compile_rules(&rules, registry, &cache, &options).unwrap();
        ValidationCore {
            rules: compiled,
            pool: BufferPool::new(options.memory_pool_size, options.enable_memory_pool),
            cache,
            options,
        }
    }

    #[tokio::test]
    async fn async_walk_matches_sync_contract() {
        let registry = registry_with_async_check();
        let core = core_with(
            vec![
                Rule::new("email", "isEmail"),
                Rule::new("handle", "remoteAvailable"),
            ],
            &registry,
        );

        let ok = core
            .validate_async(
                &json!({"email": "u@d.com", "handle": "fresh"}),
                &ValidateOptions::default(),
                None,
            )
            .await
            .unwrap();
        assert!(ok.is_valid);

        let bad = core
            .validate_async(
                &json!({"email": "u@d.com", "handle": "taken"}),
                &ValidateOptions::default(),
                None,
            )
            .await
            .unwrap();
        assert!(!bad.is_valid);
        assert_eq!(bad.errors.get("handle").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn sync_predicates_run_unchanged_on_the_async_path() {
        let core = core_with(
            vec![Rule::new("age", "between")
                .param("min", json!(1))
                .param("max", json!(10))],
            PredicateRegistry::builtin(),
        );
        let report = core
            .validate_async(&json!({"age": 5}), &ValidateOptions::default(), None)
            .await
            .unwrap();
        assert!(report.is_valid);
    }

    #[tokio::test]
    async fn cancel_after_raises_the_flag() {
        let cancel = CancelHandle::new();
        cancel.cancel_after(Duration::from_millis(5));
        assert!(!cancel.is_cancelled());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn pre_cancelled_signal_short_circuits() {
        let core = core_with(vec![Rule::new("a", "isEmpty")], PredicateRegistry::builtin());
        let cancel = CancelHandle::new();
        cancel.cancel();
        let err = core
            .validate_async(&json!({"a": ""}), &ValidateOptions::default(), Some(&cancel))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "Cancelled");
    }

    #[tokio::test]
    async fn errors_stay_in_rule_order_across_await_points() {
        let registry = registry_with_async_check();
        let core = core_with(
            vec![
                Rule::new("handle", "remoteAvailable").message("first"),
                Rule::new("handle", "isEmail").message("second"),
            ],
            &registry,
        );
        let report = core
            .validate_async(
                &json!({"handle": "taken"}),
                &ValidateOptions::default(),
                None,
            )
            .await
            .unwrap();
        let errors = report.errors.get("handle").unwrap();
        assert_eq!(errors[0].message, "first");
        assert_eq!(errors[1].message, "second");
    }
}
