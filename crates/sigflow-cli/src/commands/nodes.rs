//! Node kind listing and information command.

use clap::Args;
use sigflow_registry::{NodeCategory, NodeDescriptor, NodeRegistry};

#[derive(Args)]
pub struct NodesArgs {
    /// Show details for a specific node kind
    #[arg(value_name = "KIND")]
    kind: Option<String>,
}

pub fn run(args: NodesArgs) -> anyhow::Result<()> {
    let registry = NodeRegistry::new();

    if let Some(kind) = &args.kind {
        let descriptor = registry
            .all_nodes()
            .into_iter()
            .find(|d| d.id.eq_ignore_ascii_case(kind))
            .ok_or_else(|| anyhow::anyhow!("Unknown node kind: {}", kind))?;
        print_details(descriptor);
        return Ok(());
    }

    println!("Available Nodes");
    println!("===============");
    for category in NodeCategory::ALL {
        let nodes = registry.nodes_in_category(category);
        if nodes.is_empty() {
            continue;
        }
        println!();
        println!("{} - {}", category.name(), category.description());
        for node in nodes {
            println!("  {:12}  {}", node.id, node.description);
        }
    }
    println!();
    println!("Use 'sigflow nodes <KIND>' for inputs and buffer slots.");
    Ok(())
}

fn print_details(node: &NodeDescriptor) {
    println!("{} ({})", node.name, node.id);
    println!("{}", "=".repeat(node.name.len() + node.id.len() + 3));
    println!();
    println!("{}", node.description);
    println!();
    println!("Category: {}", node.category.name());

    print_list("Inputs", node.inputs);
    print_list("Buffer slots", node.buffer_slots);
    print_list("Options", node.options);

    println!();
    println!("Patch snippet:");
    println!();
    println!("  [[outputs]]");
    println!("  node = \"{}\"", node.id);
    if let Some(slot) = node.buffer_slots.first() {
        println!("  buffers = {{ {} = \"my_sample\" }}", slot);
    }
}

fn print_list(title: &str, items: &[&str]) {
    if items.is_empty() {
        return;
    }
    println!();
    println!("{}:", title);
    for item in items {
        println!("  {}", item);
    }
}
