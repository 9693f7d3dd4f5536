//! Synchronous rule-walk over one record.
//!
//! This is the hot path shared (in shape) by the async and streaming
//! validators: extract the field, invoke the predicate, XOR with the
//! rule's negation bit, and append failures in rule-definition order.
//! Pool-borrowed buffers are released on every exit path, including
//! structured predicate failures; the returned report is copied out of the
//! pooled buffer so the caller owns it outright.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;

use crate::compiler::CompiledRule;
use crate::config::{EngineOptions, ValidateOptions};
use crate::error::{EngineError, EngineResult};
use crate::extractor::extract;
use crate::path_cache::PathCache;
use crate::pool::{BufferPool, ResultBuf};
use crate::predicates::{PredicateFn, PredicateInput};
use crate::rule::{FieldError, ValidationReport};

const SLOW_VALIDATION: Duration = Duration::from_millis(100);

/// Compiled rules plus the per-engine mutable state they evaluate with.
pub(crate) struct ValidationCore {
    pub(crate) rules: Vec<CompiledRule>,
    pub(crate) pool: BufferPool,
    pub(crate) cache: Arc<PathCache>,
    pub(crate) options: EngineOptions,
}

/// Outcome of evaluating one rule against one record.
pub(crate) enum RuleEval {
    /// Predicate ran; raw boolean before negation.
    Ran(bool),
    /// Skipped under partial validation (absent value, non-existence op).
    Skipped,
}

impl ValidationCore {
    pub(crate) fn validate_sync(
        &self,
        record: &Value,
        opts: &ValidateOptions,
    ) -> EngineResult<ValidationReport> {
        let started = Instant::now();
        if !record.is_object() {
            return Err(EngineError::bad_input(record));
        }

        let mut buf = self.pool.acquire_result();
        let mut error_count = 0usize;

        for rule in &self.rules {
            let raw = match self.eval_rule_sync(record, rule) {
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

    pub(crate) fn eval_rule_sync(
        &self,
        record: &Value,
        rule: &CompiledRule,
    ) -> EngineResult<RuleEval> {
        let extracted = extract(record, &rule.segments);
        if self.skip_for_partial(rule, extracted.is_none()) {
            return Ok(RuleEval::Skipped);
        }

        let (args, has_value) = self.assemble_args(rule, extracted);
        let outcome = {
            let input = predicate_input(rule, &args, has_value);
            match &rule.predicate.function {
                PredicateFn::Sync(predicate) => predicate(&input),
                PredicateFn::Async(_) => Err(EngineError::predicate_internal(
                    &rule.predicate.name,
                    "async predicate invoked on the synchronous path",
                )),
            }
        };
        self.pool.release_args(args);
        outcome.map(RuleEval::Ran)
    }

    pub(crate) fn skip_for_partial(&self, rule: &CompiledRule, absent: bool) -> bool {
        absent && self.options.allow_partial_validation && !rule.predicate.handles_absent
    }

    /// Builds the predicate argument tuple: extracted value first (when
    /// present), then the frozen parameters in declared order.
    pub(crate) fn assemble_args(
        &self,
        rule: &CompiledRule,
        extracted: Option<&Value>,
    ) -> (Vec<Value>, bool) {
        let mut args = self.pool.acquire_args();
        let has_value = extracted.is_some();
        if let Some(value) = extracted {
            args.push(value.clone());
        }
        args.extend(rule.params.iter().cloned());
        (args, has_value)
    }

    pub(crate) fn record_failure(&self, buf: &mut ResultBuf, rule: &CompiledRule) {
        buf.is_valid = false;
        let error = FieldError {
            message: rule.failure_message(),
            code: rule.code.clone(),
        };
        if buf.errors.entry_mut(&rule.field).is_none() {
            let list = self.pool.acquire_errors();
            buf.errors.insert_entry(rule.field.clone(), list);
        }
        buf.errors
            .entry_mut(&rule.field)
            .expect("entry inserted above")
            .push(error);
    }

    /// Copies the pooled buffer into an owned report and recycles the
    /// buffer. Ownership of the report transfers to the caller.
    pub(crate) fn finish(&self, record: &Value, buf: ResultBuf) -> ValidationReport {
        let report = ValidationReport {
            is_valid: buf.is_valid,
            data: record.clone(),
            errors: buf.errors.clone(),
        };
        self.pool.release_result(buf);
        report
    }

    pub(crate) fn emit_diagnostics(&self, report: &ValidationReport, elapsed: Duration) {
        if self.options.silent {
            return;
        }
        if self.options.debug {
            log::debug!(
                target: "veritor::engine",
                "validated record: rules={} failing_fields={} errors={} valid={} duration_us={}",
                self.rules.len(),
                report.errors.field_count(),
                report.errors.total_errors(),
                report.is_valid,
                elapsed.as_micros()
            );
        }
        if elapsed > SLOW_VALIDATION {
            log::warn!(
                target: "veritor::engine",
                "slow validation: {} ms across {} rules",
                elapsed.as_millis(),
                self.rules.len()
            );
        }
    }
}

pub(crate) fn predicate_input<'a>(
    rule: &'a CompiledRule,
    args: &'a [Value],
    has_value: bool,
) -> PredicateInput<'a> {
    let (value, params) = if has_value {
        (Some(&args[0]), &args[1..])
    } else {
        (None, args)
    };
    PredicateInput {
        value,
        params,
        regex: rule.regex.as_deref(),
    }
}
