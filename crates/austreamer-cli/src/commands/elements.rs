//! Element type listing command.

use clap::Args;

use austreamer_algo::{ElementCategory, ElementRegistry};

use crate::wav;

#[derive(Args)]
pub struct ElementsArgs {
    /// Only list one category: source, sink, routing or algorithm
    #[arg(long)]
    category: Option<String>,
}

pub fn run(args: ElementsArgs) -> anyhow::Result<()> {
    let mut registry = ElementRegistry::new();
    wav::register(&mut registry);

    let categories = [
        ElementCategory::Source,
        ElementCategory::Sink,
        ElementCategory::Routing,
        ElementCategory::Algorithm,
    ];
    let selected: Vec<ElementCategory> = match &args.category {
        Some(name) => {
            let category = categories
                .into_iter()
                .find(|c| c.name().eq_ignore_ascii_case(name))
                .ok_or_else(|| anyhow::anyhow!("Unknown category: {name}"))?;
            vec![category]
        }
        None => categories.to_vec(),
    };

    println!("Available Elements");
    println!("==================");
    for category in selected {
        println!();
        println!("{} - {}", category.name(), category.description());
        for d in registry.in_category(category) {
            println!("  {:12}  {}", d.id, d.description);
        }
    }
    Ok(())
}
