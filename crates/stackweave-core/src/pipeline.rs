//! Per-consumer pipeline and the concurrent stack driver.
//!
//! The run is split by a barrier: the `ResolutionContext` (catalog, resolver,
//! rules, registry) is fully built before any consumer starts, then shared
//! read-only through an `Arc`. Each consumer walks
//! `Pending -> Resolved -> Validated -> Compiled -> Accepted` in its own task;
//! any failure ends that consumer in `Rejected` and touches nothing else.

use std::collections::HashMap;
use std::sync::Arc;

use stackweave_types::consumer::{CompiledDocument, StackDefinition, StackSelection};
use stackweave_types::error::{CatalogError, ConsumerError};
use stackweave_types::relationship::RelationshipsFile;
use stackweave_types::report::{ConsumerReport, ConsumerStatus, Diagnostic, PipelineStage, Severity};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::catalog::Catalog;
use crate::compiler::compile;
use crate::merger::merge;
use crate::output::validate_document;
use crate::registry::ConsumerRegistry;
use crate::relationship::{RelationshipSet, Selection};
use crate::resolver::IdentifierResolver;

// ---------------------------------------------------------------------------
// Shared, immutable run state
// ---------------------------------------------------------------------------

/// Everything a consumer pipeline reads. Never mutated after `build`.
#[derive(Debug)]
pub struct ResolutionContext {
    pub catalog: Catalog,
    pub resolver: IdentifierResolver,
    pub rules: RelationshipSet,
    pub registry: ConsumerRegistry,
}

impl ResolutionContext {
    /// Build the resolver and load the relationship rules. Any failure here is
    /// fatal to the whole run.
    pub fn build(
        catalog: Catalog,
        relationships: &RelationshipsFile,
        registry: ConsumerRegistry,
    ) -> Result<Self, CatalogError> {
        let resolver = IdentifierResolver::build(&catalog, &relationships.aliases)?;
        let rules = RelationshipSet::load(relationships, &resolver)?;

        tracing::info!(
            fragments = catalog.len(),
            aliases = relationships.aliases.len(),
            rules = rules.rules().len(),
            consumers = registry.len(),
            "resolution context ready"
        );

        Ok(Self {
            catalog,
            resolver,
            rules,
            registry,
        })
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// The terminal result of one consumer pipeline.
#[derive(Debug, Clone)]
pub struct ConsumerOutcome {
    pub report: ConsumerReport,
    /// Present only when accepted.
    pub document: Option<CompiledDocument>,
    /// Canonical ids selected by an accepted consumer.
    pub fragments: Vec<String>,
}

impl ConsumerOutcome {
    pub fn is_accepted(&self) -> bool {
        self.report.status == ConsumerStatus::Accepted
    }

    fn panicked(consumer: String, detail: String) -> Self {
        Self {
            report: ConsumerReport {
                consumer,
                status: ConsumerStatus::Rejected,
                stage: PipelineStage::Pending,
                diagnostics: vec![Diagnostic::note(
                    Severity::Error,
                    "PipelinePanic",
                    format!("consumer pipeline aborted: {detail}"),
                )],
                output: None,
                digest: None,
            },
            document: None,
            fragments: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

struct ConsumerRun {
    consumer: String,
    stage: PipelineStage,
    diagnostics: Vec<Diagnostic>,
}

impl ConsumerRun {
    fn new(consumer: &str) -> Self {
        Self {
            consumer: consumer.to_owned(),
            stage: PipelineStage::Pending,
            diagnostics: Vec::new(),
        }
    }

    fn advance(&mut self) {
        if let Some(next) = self.stage.successor() {
            tracing::debug!(consumer = %self.consumer, stage = %next, "stage reached");
            self.stage = next;
        }
    }

    fn reject(mut self, err: &ConsumerError) -> ConsumerOutcome {
        tracing::warn!(
            consumer = %self.consumer,
            stage = %self.stage,
            error = %err.signature(),
            "consumer rejected"
        );
        self.diagnostics.insert(0, Diagnostic::error(err));
        ConsumerOutcome {
            report: ConsumerReport {
                consumer: self.consumer,
                status: ConsumerStatus::Rejected,
                stage: self.stage,
                diagnostics: self.diagnostics,
                output: None,
                digest: None,
            },
            document: None,
            fragments: Vec::new(),
        }
    }

    fn accept(mut self, document: CompiledDocument, fragments: Vec<String>) -> ConsumerOutcome {
        self.advance();
        tracing::info!(consumer = %self.consumer, bytes = document.content.len(), "consumer accepted");
        ConsumerOutcome {
            report: ConsumerReport {
                consumer: self.consumer,
                status: ConsumerStatus::Accepted,
                stage: self.stage,
                diagnostics: self.diagnostics,
                output: None,
                digest: None,
            },
            document: Some(document),
            fragments,
        }
    }
}

/// Run one consumer through merge, validation, compilation and the output
/// check.
pub fn run_consumer(ctx: &ResolutionContext, selection: &StackSelection) -> ConsumerOutcome {
    let mut run = ConsumerRun::new(&selection.consumer_name);

    // Pending -> Resolved
    let merged = match merge(&ctx.registry, selection, &ctx.resolver) {
        Ok(merged) => merged,
        Err(err) => return run.reject(&err),
    };
    run.diagnostics.extend(merged.notes);
    let consumer = merged.consumer;
    run.advance();

    // Resolved -> Validated
    let selected = Selection::from_consumer(&consumer);
    match ctx.rules.validate(&selected) {
        Ok(advisories) => {
            for advisory in &advisories {
                tracing::warn!(consumer = %consumer.name, "{advisory}");
                run.diagnostics.push(Diagnostic::advisory(advisory));
            }
        }
        Err(err) => {
            if let ConsumerError::Conflict { target, .. } = &err {
                suggest_alternatives(ctx, &selected, target, &mut run.diagnostics);
            }
            return run.reject(&err);
        }
    }
    run.advance();

    // Validated -> Compiled
    let document = compile(&consumer, &ctx.catalog);
    run.advance();

    // Compiled -> Accepted
    if let Err(err) = validate_document(&document) {
        return run.reject(&err);
    }

    let fragments = consumer
        .all_fragments()
        .map(|f| f.canonical_id.clone())
        .collect();
    run.accept(document, fragments)
}

fn suggest_alternatives(
    ctx: &ResolutionContext,
    selected: &Selection,
    target_reference: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let Some(target_id) = selected.canonical_for(target_reference) else {
        return;
    };
    for alternative in ctx.rules.alternatives_for(target_id) {
        if selected.contains(&alternative.canonical_id) {
            continue;
        }
        diagnostics.push(Diagnostic::note(
            Severity::Info,
            "Suggestion",
            format!(
                "'{}' is a declared alternative to '{target_reference}'",
                alternative.declared
            ),
        ));
    }
}

// ---------------------------------------------------------------------------
// Stack driver
// ---------------------------------------------------------------------------

/// Run every consumer of `stack` concurrently, at most `max_parallel` at a
/// time, and return their outcomes sorted by consumer name.
pub async fn run_stack(
    ctx: Arc<ResolutionContext>,
    stack: &StackDefinition,
    max_parallel: usize,
) -> Vec<ConsumerOutcome> {
    tracing::info!(
        stack = %stack.name,
        consumers = stack.selections.len(),
        max_parallel,
        "running stack"
    );

    let semaphore = Arc::new(Semaphore::new(max_parallel.max(1)));
    let mut join_set = JoinSet::new();
    let mut names = HashMap::new();

    for selection in &stack.selections {
        let ctx = Arc::clone(&ctx);
        let semaphore = Arc::clone(&semaphore);
        let selection = selection.clone();
        let name = selection.consumer_name.clone();

        let handle = join_set.spawn(async move {
            // The semaphore is never closed, so acquisition only waits.
            let _permit = semaphore.acquire_owned().await.ok();
            run_consumer(&ctx, &selection)
        });
        names.insert(handle.id(), name);
    }

    let mut outcomes = Vec::with_capacity(stack.selections.len());
    while let Some(result) = join_set.join_next_with_id().await {
        match result {
            Ok((_, outcome)) => outcomes.push(outcome),
            Err(err) => {
                let consumer = names.remove(&err.id()).unwrap_or_default();
                tracing::error!(consumer = %consumer, error = %err, "consumer task failed");
                outcomes.push(ConsumerOutcome::panicked(consumer, err.to_string()));
            }
        }
    }

    outcomes.sort_by(|a, b| a.report.consumer.cmp(&b.report.consumer));

    let accepted = outcomes.iter().filter(|o| o.is_accepted()).count();
    tracing::info!(
        stack = %stack.name,
        accepted,
        rejected = outcomes.len() - accepted,
        "stack finished"
    );

    outcomes
}
