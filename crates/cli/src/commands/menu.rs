//! Menu listing.

use pizzeria_core::ItemType;
use pizzeria_storefront::ClientConfig;
use pizzeria_storefront::services::MenuService;

use super::{CliError, connect};

/// Print the menu grouped by section.
#[allow(clippy::print_stdout)]
pub async fn print(config: &ClientConfig) -> Result<(), CliError> {
    let state = connect(config).await?;
    let menu = MenuService::new(&state).fetch().await?;

    for item_type in [ItemType::Pizza, ItemType::Drink, ItemType::Snack] {
        println!("== {item_type} ==");
        for item in menu.section(item_type) {
            println!("  {:<30} {:>8}  {}g", item.heading, item.price, item.weight);
        }
    }
    Ok(())
}
