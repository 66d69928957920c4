//! `weave resolve <reference>`: resolution trace for one reference.

use std::process::ExitCode;

use anyhow::Result;
use console::style;
use stackweave_core::resolver::is_canonical_form;
use stackweave_infra::config::Project;
use stackweave_infra::runner::load_context;
use stackweave_types::fragment::FragmentRef;
use stackweave_types::relationship::{RelationshipRule, RuleKind, RuleMember};

fn describe_rule(rule: &RelationshipRule) -> String {
    let names = |members: &[RuleMember]| {
        members
            .iter()
            .map(|m| m.declared.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };
    let mut line = match rule.kind {
        RuleKind::Requires => format!(
            "[{}] requires {} of [{}]",
            names(&rule.subjects),
            rule.cardinality,
            names(&rule.targets)
        ),
        kind => format!(
            "[{}] {kind} [{}]",
            names(&rule.subjects),
            names(&rule.targets)
        ),
    };
    if let Some(reason) = &rule.reason {
        line.push_str(&format!(" ({reason})"));
    }
    line
}

pub fn resolve(project: &Project, reference: &str, json: bool) -> Result<ExitCode> {
    let ctx = load_context(project)?;
    let classified = ctx.resolver.classify(reference);

    let resolved = match ctx.resolver.resolve(reference) {
        Ok(resolved) => resolved,
        Err(err) => {
            if json {
                let out = serde_json::json!({
                    "reference": reference,
                    "kind": classified.kind(),
                    "error": err.code(),
                    "message": err.to_string(),
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                eprintln!("  {} {err}", style("✗").red().bold());
                if let FragmentRef::Canonical(raw) = &classified {
                    if !is_canonical_form(raw) {
                        eprintln!(
                            "    '{raw}' is not a canonical id; map it to one under `aliases` in relationships.yaml"
                        );
                    }
                }
            }
            return Ok(ExitCode::FAILURE);
        }
    };

    let id = resolved.canonical_id.as_str();
    let aliases: Vec<&str> = ctx.resolver.aliases_for(id).collect();
    let reverse = ctx.resolver.reverse_alias(id);
    let dependency_order = ctx.rules.dependency_order(id).map_err(|e| format!("{e:#}"));
    let alternatives: Vec<&str> = ctx
        .rules
        .alternatives_for(id)
        .into_iter()
        .map(|m| m.declared.as_str())
        .collect();
    let rules: Vec<String> = ctx.rules.rules_for(id).map(describe_rule).collect();
    let meta = ctx.catalog.metadata(id);

    if json {
        let out = serde_json::json!({
            "reference": reference,
            "kind": classified.kind(),
            "canonical_id": id,
            "storage_location": resolved.storage_location,
            "reverse_alias": reverse,
            "aliases": aliases,
            "legacy_path": meta.and_then(|m| m.legacy_path.as_deref()),
            "dependency_order": dependency_order.as_ref().ok(),
            "dependency_error": dependency_order.as_ref().err(),
            "alternatives": alternatives,
            "rules": rules,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(ExitCode::SUCCESS);
    }

    let label = |s: &str| style(format!("{s:>16}")).dim().to_string();
    println!();
    println!("  {} {}", label("reference"), classified);
    println!("  {} {}", label("canonical id"), style(id).cyan().bold());
    println!(
        "  {} {}",
        label("location"),
        resolved.storage_location.display()
    );
    if let Some(alias) = reverse {
        println!("  {} {alias}", label("short name"));
    }
    if aliases.len() > 1 {
        println!("  {} {}", label("aliases"), aliases.join(", "));
    }
    if let Some(legacy) = meta.and_then(|m| m.legacy_path.as_deref()) {
        println!("  {} {legacy}", label("legacy path"));
    }
    match &dependency_order {
        Ok(order) if order.len() > 1 => {
            println!("  {} {}", label("load order"), order.join(" -> "));
        }
        Ok(_) => {}
        Err(e) => println!("  {} {}", label("load order"), style(e).red()),
    }
    if !alternatives.is_empty() {
        println!("  {} {}", label("alternatives"), alternatives.join(", "));
    }
    for rule in &rules {
        println!("  {} {rule}", label("rule"));
    }
    println!();

    Ok(ExitCode::SUCCESS)
}
