//! List strategies command.

use anyhow::Result;
use quant_strategies::StrategyRegistry;

pub async fn run() -> Result<()> {
    let registry = StrategyRegistry::new();

    println!("Available Strategies");
    println!("═══════════════════════════════════════════════════════════");
    println!();

    for (key, info) in registry.names().into_iter().zip(registry.list()) {
        println!("  {} ({})", info.name, key);
        println!("  ───────────────────────────────────────────────────────");
        println!("  {}", info.description);
        println!("  Defaults: {}", info.default_config);
        println!();
    }

    println!("Use --strategy <name> and --params '<json>' to select and tune a strategy.");

    Ok(())
}
