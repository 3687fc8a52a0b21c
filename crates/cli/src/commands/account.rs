//! Signed-in user commands.

use pizzeria_storefront::ClientConfig;
use pizzeria_storefront::services::OrderService;

use super::{CliError, Credentials, sign_in};

/// Print the profile and address book.
#[allow(clippy::print_stdout)]
pub async fn whoami(config: &ClientConfig, credentials: &Credentials) -> Result<(), CliError> {
    let (_state, user) = sign_in(config, credentials).await?;

    println!("{} <{}>", user.name, user.email);
    println!("phone:   {}", user.phone);
    println!("payment: {}", user.pay_method);
    if user.addresses.is_empty() {
        println!("no addresses");
    }
    for address in &user.addresses {
        let marker = if address.main { "*" } else { " " };
        println!("{marker} [{}] {}", address.id, address.place);
    }
    Ok(())
}

/// Print the order history, newest last.
#[allow(clippy::print_stdout)]
pub async fn orders(config: &ClientConfig, credentials: &Credentials) -> Result<(), CliError> {
    let (state, _user) = sign_in(config, credentials).await?;
    let orders = OrderService::new(&state).fetch().await?;

    if orders.is_empty() {
        println!("no orders");
    }
    for order in &orders {
        println!(
            "#{} {} [{}] {} -> {}",
            order.id,
            order.created_at.format("%Y-%m-%d %H:%M"),
            order.status,
            order.total_price,
            order.address
        );
        for line in &order.contents {
            println!("    {} x{} @ {}", line.heading, line.amount, line.price);
        }
    }
    Ok(())
}
