//! Contact (CRM) store port.

use funnelbot_types::contact::ContactRecord;
use funnelbot_types::error::ContactStoreError;

pub trait ContactStore: Send + Sync {
    /// Fetch the contact, creating an untagged record on first sight.
    fn get_or_create(
        &self,
        user_id: &str,
    ) -> impl std::future::Future<Output = Result<ContactRecord, ContactStoreError>> + Send;

    /// Replace the contact's tag list.
    fn set_tags(
        &self,
        user_id: &str,
        tags: Vec<String>,
    ) -> impl std::future::Future<Output = Result<(), ContactStoreError>> + Send;

    /// Add a tag unless already present. Returns whether it was added.
    fn add_tag(
        &self,
        user_id: &str,
        tag: &str,
    ) -> impl std::future::Future<Output = Result<bool, ContactStoreError>> + Send {
        async move {
            let mut contact = self.get_or_create(user_id).await?;
            if !contact.add_tag(tag) {
                return Ok(false);
            }
            self.set_tags(user_id, contact.tags).await?;
            Ok(true)
        }
    }
}
