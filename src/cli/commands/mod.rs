pub mod category;
pub mod expense;
pub mod stats;
pub mod system;

use crate::cli::registry::{CommandGroup, CommandRegistry};

pub fn register_all(registry: &mut CommandRegistry) {
    registry.register_group(CommandGroup::Categories, category::definitions());
    registry.register_group(CommandGroup::Expenses, expense::definitions());
    registry.register_group(CommandGroup::Stats, stats::definitions());
    registry.register_group(CommandGroup::Shell, system::definitions());
}
