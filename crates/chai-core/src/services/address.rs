//! Address book use cases.

use std::sync::Arc;

use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::ports::AddressStore;
use crate::types::{Address, AddressInput, AddressPatch};
use crate::validation::{validate_address_input, validate_address_patch};

#[derive(Clone)]
pub struct AddressService {
    addresses: Arc<dyn AddressStore>,
}

impl AddressService {
    pub fn new(addresses: Arc<dyn AddressStore>) -> Self {
        AddressService { addresses }
    }

    /// Default address first, then newest first.
    pub async fn list(&self, user_id: &str) -> CoreResult<Vec<Address>> {
        Ok(self.addresses.list(user_id).await?)
    }

    pub async fn get(&self, user_id: &str, id: &str) -> CoreResult<Address> {
        self.addresses
            .find(user_id, id)
            .await?
            .ok_or_else(|| CoreError::not_found("Address", id))
    }

    pub async fn create(&self, user_id: &str, input: AddressInput) -> CoreResult<Address> {
        validate_address_input(&input)?;
        let input = AddressInput {
            label: input.label.trim().to_string(),
            address_line1: input.address_line1.trim().to_string(),
            address_line2: input
                .address_line2
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty()),
            city: input.city.trim().to_string(),
            state: input.state.trim().to_string(),
            pincode: input.pincode.trim().to_string(),
            is_default: input.is_default,
        };
        let address = self.addresses.create(user_id, &input).await?;
        debug!(user_id = %user_id, address_id = %address.id, is_default = address.is_default, "Address created");
        Ok(address)
    }

    pub async fn update(&self, user_id: &str, id: &str, patch: AddressPatch) -> CoreResult<Address> {
        validate_address_patch(&patch)?;
        self.addresses
            .update(user_id, id, &patch)
            .await?
            .ok_or_else(|| CoreError::not_found("Address", id))
    }

    pub async fn delete(&self, user_id: &str, id: &str) -> CoreResult<()> {
        if !self.addresses.delete(user_id, id).await? {
            return Err(CoreError::not_found("Address", id));
        }
        Ok(())
    }
}
