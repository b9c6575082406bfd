use anyhow::Result;

use crate::normalize::ContentShape;
use crate::strategy::StrategyRegistry;

pub fn list_vendors() -> Result<()> {
    let registry = StrategyRegistry::with_builtins();

    println!("{:<12} {:<10} DESCRIPTION", "VENDOR", "INPUT");
    for strategy in registry.strategies() {
        let input = match (
            strategy.supports(ContentShape::Rows),
            strategy.supports(ContentShape::Text),
        ) {
            (true, true) => "rows+text",
            (true, false) => "rows",
            (false, true) => "text",
            (false, false) => "-",
        };
        println!(
            "{:<12} {:<10} {}",
            strategy.vendor(),
            input,
            strategy.description()
        );
    }

    Ok(())
}
