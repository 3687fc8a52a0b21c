//! Address book commands.
//!
//! Every change goes through the reconciling service, so the single-main
//! invariant holds after each command.

use pizzeria_core::AddressId;
use pizzeria_storefront::ClientConfig;
use pizzeria_storefront::services::AddressService;

use super::{CliError, Credentials, sign_in};

/// Add an address; it becomes the main one.
pub async fn add(config: &ClientConfig, credentials: &Credentials, place: &str) -> Result<(), CliError> {
    let (state, _user) = sign_in(config, credentials).await?;
    let address = AddressService::new(&state).add(place).await?;
    tracing::info!(address_id = %address.id, "Address added");
    Ok(())
}

/// Change an address's text.
pub async fn edit(
    config: &ClientConfig,
    credentials: &Credentials,
    id: i64,
    place: &str,
) -> Result<(), CliError> {
    let (state, _user) = sign_in(config, credentials).await?;
    AddressService::new(&state)
        .edit(AddressId::new(id), place)
        .await?;
    tracing::info!(address_id = id, "Address updated");
    Ok(())
}

/// Delete an address.
pub async fn delete(config: &ClientConfig, credentials: &Credentials, id: i64) -> Result<(), CliError> {
    let (state, _user) = sign_in(config, credentials).await?;
    AddressService::new(&state).delete(AddressId::new(id)).await?;
    tracing::info!(address_id = id, "Address deleted");
    Ok(())
}

/// Make an address the main one.
pub async fn set_main(config: &ClientConfig, credentials: &Credentials, id: i64) -> Result<(), CliError> {
    let (state, _user) = sign_in(config, credentials).await?;
    AddressService::new(&state)
        .set_main(AddressId::new(id))
        .await?;
    tracing::info!(address_id = id, "Main address changed");
    Ok(())
}
