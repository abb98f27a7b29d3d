//! List strategies command.

use anyhow::Result;
use simlab_strategies::StrategyRegistry;

pub fn run() -> Result<()> {
    let registry = StrategyRegistry::new();

    println!("Available Strategies");
    println!("═══════════════════════════════════════════════════════════");
    println!();

    for info in registry.list() {
        println!("  {}", info.name);
        println!("  ───────────────────────────────────────────────────────");
        println!("  {}", info.description);
        println!("  Parameters: {}", info.parameters.join(", "));
        println!("  Defaults:   {}", info.default_config);
        println!();
    }

    println!("Use --strategy <name> to select a strategy and --param name=value to tune it.");

    Ok(())
}
