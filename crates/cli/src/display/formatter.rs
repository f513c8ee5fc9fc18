use crate::utils::describe_entry;
use std::path::Path;
use widget_injector_core::project::{NodeKind, ProjectDescriptor};
use widget_injector_core::{Level, Outcome, RunReport};

pub fn format_outcome(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::NoOp => "⏭️  no changes",
        Outcome::Applied => "✅ applied",
        Outcome::SoftSkip => "⚠️  applied with skips",
        Outcome::SoftFailure => "❌ failed",
    }
}

fn level_marker(level: Level) -> &'static str {
    match level {
        Level::Info => "•",
        Level::Warning => "⚠️ ",
        Level::Error => "❌",
    }
}

pub fn print_run_report(report: &RunReport) {
    println!(
        "🔧 Injecting {} into: {}",
        report.target_name,
        report.project_root.display()
    );
    println!("{}", "=".repeat(80));

    for (i, stage) in report.stages.iter().enumerate() {
        println!("{}. {} {}", i + 1, stage.stage, format_outcome(stage.outcome));
        for diagnostic in &stage.diagnostics {
            println!("   {} {}", level_marker(diagnostic.level), diagnostic.message);
        }
    }

    if !report.written.is_empty() {
        println!("\n📝 Wrote {} file(s):", report.written.len());
        for path in &report.written {
            let shown = path.strip_prefix(&report.project_root).unwrap_or(path);
            println!("   {} {}", describe_entry(path), shown.display());
        }
    }

    println!("\n🎯 Result: {}", format_outcome(report.outcome()));
    println!("{}", "=".repeat(80));
}

pub fn print_targets(project: &ProjectDescriptor, pbxproj: &Path) {
    println!("🔍 Inspecting: {}", pbxproj.display());
    println!("{}", "=".repeat(80));

    let targets: Vec<_> = project.nodes_of_kind(NodeKind::NativeTarget).collect();
    if targets.is_empty() {
        println!("\n❌ No native targets found.");
    } else {
        println!("\n✅ Found {} target(s):\n", targets.len());
    }

    for (i, target) in targets.iter().enumerate() {
        println!("{}. {}", i + 1, target.name().unwrap_or("<unnamed>"));
        if let Some(product_type) = target.str_field("productType") {
            println!("   📦 Type: {product_type}");
        }

        let list = target.reference("buildConfigurationList");
        match list.as_ref().and_then(|id| project.node(id)) {
            Some(list_node) => {
                println!("   🗂️  Configuration list: {}", list_node.id);
                let names: Vec<&str> = list_node
                    .references("buildConfigurations")
                    .iter()
                    .filter_map(|id| project.node(id))
                    .filter_map(|config| config.name())
                    .collect();
                println!("   ⚙️  Configurations: {}", names.join(", "));
            }
            None => println!("   ⚠️  No configuration list"),
        }

        if i < targets.len() - 1 {
            println!();
        }
    }

    println!("\n{}", "=".repeat(80));
}
