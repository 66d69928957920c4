//! Relationship rules and selection validation.
//!
//! Rules are loaded from `relationships.yaml` with every member resolved to a
//! canonical id up front, so validation only ever compares canonical ids. A
//! consumer's selection is checked once, after merge and before compilation:
//! conflicts and unmet requirements reject it, recommendations produce
//! advisories, alternatives only feed suggestions.

use std::collections::{BTreeMap, HashMap, HashSet};

use anyhow::bail;
use petgraph::algo::toposort;
use petgraph::graph::DiGraph;
use stackweave_types::consumer::ResolvedConsumer;
use stackweave_types::error::{CatalogError, ConsumerError};
use stackweave_types::relationship::{
    Advisory, Cardinality, RelationshipRule, RelationshipsFile, RuleDecl, RuleKind, RuleMember,
};

use crate::resolver::IdentifierResolver;

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// The canonical id set selected for one consumer, remembering the reference
/// each id was selected by so diagnostics can quote the stack document.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    by_id: BTreeMap<String, String>,
}

impl Selection {
    /// Build from `(canonical id, reference)` pairs. The first reference wins.
    pub fn from_pairs<I, A, B>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (A, B)>,
        A: Into<String>,
        B: Into<String>,
    {
        let mut by_id = BTreeMap::new();
        for (id, reference) in pairs {
            by_id.entry(id.into()).or_insert_with(|| reference.into());
        }
        Self { by_id }
    }

    pub fn from_consumer(consumer: &ResolvedConsumer) -> Self {
        Self::from_pairs(
            consumer
                .all_fragments()
                .map(|f| (f.canonical_id.clone(), f.reference.clone())),
        )
    }

    pub fn contains(&self, canonical_id: &str) -> bool {
        self.by_id.contains_key(canonical_id)
    }

    /// The reference a selected id was written as.
    pub fn reference<'a>(&'a self, canonical_id: &'a str) -> &'a str {
        self.by_id
            .get(canonical_id)
            .map_or(canonical_id, String::as_str)
    }

    /// The canonical id a reference was resolved to.
    pub fn canonical_for(&self, reference: &str) -> Option<&str> {
        self.by_id
            .iter()
            .find(|(_, r)| r.as_str() == reference)
            .map(|(id, _)| id.as_str())
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Rule set
// ---------------------------------------------------------------------------

/// All relationship rules of the catalog, members resolved.
#[derive(Debug, Clone, Default)]
pub struct RelationshipSet {
    rules: Vec<RelationshipRule>,
}

impl RelationshipSet {
    /// Resolve every rule member against the catalog.
    ///
    /// Fails on unknown members, empty sides, and members that appear on
    /// both sides of a rule (except a conflict group, whose sides are equal).
    pub fn load(
        file: &RelationshipsFile,
        resolver: &IdentifierResolver,
    ) -> Result<Self, CatalogError> {
        let rules = file
            .rules
            .iter()
            .enumerate()
            .map(|(index, decl)| load_rule(index, decl, resolver))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(rules = rules.len(), "loaded relationship rules");
        Ok(Self { rules })
    }

    pub fn from_rules(rules: Vec<RelationshipRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[RelationshipRule] {
        &self.rules
    }

    /// Check a selection against every rule whose subjects it touches.
    ///
    /// Rules are evaluated in declaration order and members in declared
    /// order, so the outcome does not depend on the order of the selection.
    pub fn validate(&self, selection: &Selection) -> Result<Vec<Advisory>, ConsumerError> {
        let mut advisories = Vec::new();

        for rule in &self.rules {
            let present: Vec<&RuleMember> = rule
                .subjects
                .iter()
                .filter(|s| selection.contains(&s.canonical_id))
                .collect();
            let Some(first) = present.first() else {
                continue;
            };

            match rule.kind {
                RuleKind::Conflict => {
                    for subject in &present {
                        let clash = rule.targets.iter().find(|t| {
                            t.canonical_id != subject.canonical_id
                                && selection.contains(&t.canonical_id)
                        });
                        if let Some(target) = clash {
                            return Err(ConsumerError::Conflict {
                                subject: selection.reference(&subject.canonical_id).to_owned(),
                                target: selection.reference(&target.canonical_id).to_owned(),
                                reason: rule.reason.clone(),
                            });
                        }
                    }
                }
                RuleKind::Requires => {
                    let selected = rule
                        .targets
                        .iter()
                        .filter(|t| selection.contains(&t.canonical_id))
                        .count();
                    let satisfied = match rule.cardinality {
                        Cardinality::All => selected == rule.targets.len(),
                        Cardinality::Any => selected > 0,
                    };
                    if !satisfied {
                        return Err(ConsumerError::MissingDependency {
                            subject: selection.reference(&first.canonical_id).to_owned(),
                            targets: rule.targets.iter().map(|t| t.declared.clone()).collect(),
                            cardinality: rule.cardinality,
                            reason: rule.reason.clone(),
                        });
                    }
                }
                RuleKind::Recommends => {
                    let missing: Vec<String> = rule
                        .targets
                        .iter()
                        .filter(|t| !selection.contains(&t.canonical_id))
                        .map(|t| t.declared.clone())
                        .collect();
                    if !missing.is_empty() {
                        for subject in &present {
                            advisories.push(Advisory {
                                subject: selection.reference(&subject.canonical_id).to_owned(),
                                missing: missing.clone(),
                                reason: rule.reason.clone(),
                            });
                        }
                    }
                }
                RuleKind::Alternative => {}
            }
        }

        Ok(advisories)
    }

    /// Declared alternatives of `canonical_id`, in either direction, deduplicated.
    pub fn alternatives_for(&self, canonical_id: &str) -> Vec<&RuleMember> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for rule in self.rules.iter().filter(|r| r.kind == RuleKind::Alternative) {
            let others = if rule.subjects.iter().any(|s| s.canonical_id == canonical_id) {
                &rule.targets
            } else if rule.targets.iter().any(|t| t.canonical_id == canonical_id) {
                &rule.subjects
            } else {
                continue;
            };
            for member in others {
                if member.canonical_id != canonical_id && seen.insert(member.canonical_id.as_str()) {
                    out.push(member);
                }
            }
        }
        out
    }

    /// Every rule that mentions `canonical_id` on either side.
    pub fn rules_for<'a>(&'a self, canonical_id: &'a str) -> impl Iterator<Item = &'a RelationshipRule> + 'a {
        self.rules.iter().filter(move |rule| {
            rule.subjects
                .iter()
                .chain(rule.targets.iter())
                .any(|m| m.canonical_id == canonical_id)
        })
    }

    /// The transitive `requires` closure of `canonical_id`, dependencies first.
    ///
    /// Every declared target is followed regardless of cardinality. The last
    /// element is `canonical_id` itself. Fails if the chain is circular.
    pub fn dependency_order(&self, canonical_id: &str) -> anyhow::Result<Vec<String>> {
        let mut edges: HashMap<&str, Vec<&str>> = HashMap::new();
        for rule in self.rules.iter().filter(|r| r.kind == RuleKind::Requires) {
            for subject in &rule.subjects {
                let deps = edges.entry(subject.canonical_id.as_str()).or_default();
                for target in &rule.targets {
                    if !deps.contains(&target.canonical_id.as_str()) {
                        deps.push(target.canonical_id.as_str());
                    }
                }
            }
        }

        let mut graph = DiGraph::<&str, ()>::new();
        let mut node_indices = HashMap::new();
        let mut to_visit = vec![canonical_id];
        let mut visited = HashSet::new();

        while let Some(current) = to_visit.pop() {
            if !visited.insert(current) {
                continue;
            }
            let idx = *node_indices
                .entry(current)
                .or_insert_with(|| graph.add_node(current));

            for &dep in edges.get(current).into_iter().flatten() {
                let dep_idx = *node_indices
                    .entry(dep)
                    .or_insert_with(|| graph.add_node(dep));
                // Edge from fragment -> dependency
                graph.add_edge(idx, dep_idx, ());
                to_visit.push(dep);
            }
        }

        match toposort(&graph, None) {
            Ok(sorted) => Ok(sorted
                .into_iter()
                .rev()
                .map(|idx| graph[idx].to_owned())
                .collect()),
            Err(cycle) => {
                bail!(
                    "circular requires chain involving '{}'",
                    graph[cycle.node_id()]
                )
            }
        }
    }
}

fn load_rule(
    index: usize,
    decl: &RuleDecl,
    resolver: &IdentifierResolver,
) -> Result<RelationshipRule, CatalogError> {
    let label = format!("rule #{} ({})", index + 1, decl.kind);
    let resolve_side = |names: &[String], side: &str| -> Result<Vec<RuleMember>, CatalogError> {
        if names.is_empty() {
            return Err(CatalogError::Relationship(format!("{label}: no {side} declared")));
        }
        let mut members: Vec<RuleMember> = Vec::with_capacity(names.len());
        for name in names {
            let resolved = resolver.resolve(name).map_err(|_| {
                CatalogError::Relationship(format!("{label}: unknown {side} member '{name}'"))
            })?;
            if !members.iter().any(|m| m.canonical_id == resolved.canonical_id) {
                members.push(RuleMember {
                    declared: name.trim().to_owned(),
                    canonical_id: resolved.canonical_id,
                });
            }
        }
        Ok(members)
    };

    let subjects = resolve_side(&decl.subjects, "subjects")?;
    let targets = resolve_side(&decl.targets, "targets")?;

    let rule = RelationshipRule {
        kind: decl.kind,
        subjects,
        targets,
        cardinality: decl.cardinality,
        reason: decl.reason.clone(),
    };

    if !rule.is_exclusive_group() {
        let overlap = rule
            .subjects
            .iter()
            .find(|s| rule.targets.iter().any(|t| t.canonical_id == s.canonical_id));
        if let Some(member) = overlap {
            return Err(CatalogError::Relationship(format!(
                "{label}: '{}' appears as both subject and target",
                member.declared
            )));
        }
    }

    Ok(rule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::test_support::catalog;

    fn resolver() -> IdentifierResolver {
        let catalog = catalog(&[
            "react-framework",
            "vue-framework",
            "svelte-framework",
            "auth-oauth",
            "database-drizzle",
            "database-prisma",
            "react-testing",
            "zustand",
        ]);
        let aliases = [("react", "react-framework"), ("vue", "vue-framework")]
            .into_iter()
            .map(|(a, c)| (a.to_owned(), c.to_owned()))
            .collect();
        IdentifierResolver::build(&catalog, &aliases).unwrap()
    }

    fn rules(yaml: &str) -> RelationshipSet {
        let file: RelationshipsFile = serde_yaml_ng::from_str(yaml).unwrap();
        RelationshipSet::load(&file, &resolver()).unwrap()
    }

    fn selection(ids: &[&str]) -> Selection {
        Selection::from_pairs(ids.iter().map(|id| (*id, *id)))
    }

    const RULES: &str = r#"
rules:
  - kind: conflict
    subjects: [react]
    targets: [vue]
    reason: Pick one UI framework
  - kind: requires
    subjects: [auth-oauth]
    targets: [database-drizzle]
  - kind: requires
    subjects: [zustand]
    targets: [react, vue]
    cardinality: any
  - kind: recommends
    subjects: [react]
    targets: [react-testing]
  - kind: alternative
    subjects: [react]
    targets: [svelte-framework]
"#;

    #[test]
    fn conflict_rejects_both_orders_identically() {
        let rules = rules(RULES);
        let forward = rules
            .validate(&selection(&["react-framework", "vue-framework"]))
            .unwrap_err();
        let backward = rules
            .validate(&selection(&["vue-framework", "react-framework"]))
            .unwrap_err();
        assert_eq!(forward, backward);
        assert_eq!(
            forward.signature(),
            "ConflictError(react-framework, vue-framework)"
        );
    }

    #[test]
    fn conflict_quotes_stack_references() {
        let rules = rules(RULES);
        let sel = Selection::from_pairs([("vue-framework", "vue"), ("react-framework", "react")]);
        let err = rules.validate(&sel).unwrap_err();
        assert_eq!(
            err,
            ConsumerError::Conflict {
                subject: "react".to_owned(),
                target: "vue".to_owned(),
                reason: Some("Pick one UI framework".to_owned()),
            }
        );
    }

    #[test]
    fn exclusive_group_conflicts_on_any_pair() {
        let rules = rules(
            "rules:\n  - kind: conflict\n    subjects: [react, vue, svelte-framework]\n    targets: [react, vue, svelte-framework]\n",
        );
        assert!(rules.validate(&selection(&["react-framework"])).is_ok());
        let err = rules
            .validate(&selection(&["svelte-framework", "vue-framework"]))
            .unwrap_err();
        assert_eq!(
            err.signature(),
            "ConflictError(vue-framework, svelte-framework)"
        );
    }

    #[test]
    fn requires_all_reports_declared_targets() {
        let err = rules(RULES)
            .validate(&selection(&["auth-oauth"]))
            .unwrap_err();
        assert_eq!(
            err.signature(),
            "MissingDependencyError(auth-oauth, [database-drizzle], all)"
        );
    }

    #[test]
    fn requires_all_satisfied() {
        let advisories = rules(RULES)
            .validate(&selection(&["auth-oauth", "database-drizzle"]))
            .unwrap();
        assert!(advisories.is_empty());
    }

    #[test]
    fn requires_any_needs_one_target() {
        let rules = rules(RULES);
        let err = rules.validate(&selection(&["zustand"])).unwrap_err();
        assert_eq!(
            err.signature(),
            "MissingDependencyError(zustand, [react, vue], any)"
        );
        assert!(rules.validate(&selection(&["zustand", "vue-framework"])).is_ok());
    }

    #[test]
    fn recommends_is_advisory_only() {
        let advisories = rules(RULES)
            .validate(&selection(&["react-framework"]))
            .unwrap();
        assert_eq!(advisories.len(), 1);
        assert_eq!(advisories[0].subject, "react-framework");
        assert_eq!(advisories[0].missing, ["react-testing"]);
    }

    #[test]
    fn alternatives_are_never_validated() {
        let rules = rules(RULES);
        assert!(rules
            .validate(&selection(&["react-framework", "svelte-framework", "react-testing"]))
            .is_ok());
        let alternatives: Vec<_> = rules
            .alternatives_for("svelte-framework")
            .into_iter()
            .map(|m| m.declared.as_str())
            .collect();
        assert_eq!(alternatives, ["react"]);
    }

    #[test]
    fn unknown_member_fails_at_load() {
        let file: RelationshipsFile =
            serde_yaml_ng::from_str("rules:\n  - kind: requires\n    subjects: [angular]\n    targets: [react]\n")
                .unwrap();
        let err = RelationshipSet::load(&file, &resolver()).unwrap_err();
        assert!(err.to_string().contains("unknown subjects member 'angular'"));
    }

    #[test]
    fn self_requirement_fails_at_load() {
        let file: RelationshipsFile =
            serde_yaml_ng::from_str("rules:\n  - kind: requires\n    subjects: [react]\n    targets: [react-framework]\n")
                .unwrap();
        let err = RelationshipSet::load(&file, &resolver()).unwrap_err();
        assert!(err.to_string().contains("both subject and target"));
    }

    #[test]
    fn dependency_order_puts_dependencies_first() {
        let rules = rules(
            r#"
rules:
  - kind: requires
    subjects: [auth-oauth]
    targets: [database-drizzle]
  - kind: requires
    subjects: [database-drizzle]
    targets: [zustand]
"#,
        );
        let order = rules.dependency_order("auth-oauth").unwrap();
        assert_eq!(order, ["zustand", "database-drizzle", "auth-oauth"]);
    }

    #[test]
    fn dependency_order_detects_cycles() {
        let rules = rules(
            r#"
rules:
  - kind: requires
    subjects: [auth-oauth]
    targets: [database-drizzle]
  - kind: requires
    subjects: [database-drizzle]
    targets: [auth-oauth]
"#,
        );
        let err = rules.dependency_order("auth-oauth").unwrap_err();
        assert!(err.to_string().contains("circular requires chain"));
    }

    #[test]
    fn rules_for_matches_either_side() {
        let rules = rules(RULES);
        let kinds: Vec<_> = rules.rules_for("vue-framework").map(|r| r.kind).collect();
        assert_eq!(kinds, [RuleKind::Conflict, RuleKind::Requires]);
    }

    #[test]
    fn selection_reference_lookup() {
        let sel = Selection::from_pairs([("react-framework", "react"), ("react-framework", "reactjs")]);
        assert_eq!(sel.reference("react-framework"), "react");
        assert_eq!(sel.canonical_for("react"), Some("react-framework"));
        assert_eq!(sel.len(), 1);
    }
}
