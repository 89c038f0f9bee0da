//! Address book

use chrono::Utc;
use va_contracts::contacts::{ContactInput, CreateContactContract, UpdateContactContract};
use va_contracts::Contract;
use va_core::{Id, Owned, VaError, VaResult};
use va_models::Contact;

use crate::context::ServiceContext;

pub struct ContactService {
    ctx: ServiceContext,
}

impl ContactService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    async fn owned(&self, owner: Id, id: Id) -> VaResult<Contact> {
        self.ctx
            .stores
            .contacts
            .find_by_id(id)
            .await?
            .filter(|c| c.is_owned_by(owner))
            .ok_or_else(|| VaError::not_found("Contact not found or not authorized"))
    }

    async fn ensure_email_free(&self, owner: Id, email: &str, exclude: Option<Id>) -> VaResult<()> {
        if self.ctx.stores.contacts.email_taken(owner, email, exclude).await? {
            return Err(VaError::conflict("Contact with this email already exists"));
        }
        Ok(())
    }

    /// Newest first
    pub async fn list(&self, owner: Id) -> VaResult<Vec<Contact>> {
        Ok(self.ctx.stores.contacts.list_owned(owner).await?)
    }

    pub async fn get(&self, owner: Id, id: Id) -> VaResult<Contact> {
        self.owned(owner, id).await
    }

    pub async fn create(&self, owner: Id, input: ContactInput) -> VaResult<Contact> {
        CreateContactContract.validate(&input)?;
        let email = input.email.as_deref().unwrap_or_default().trim().to_lowercase();
        self.ensure_email_free(owner, &email, None).await?;

        let now = Utc::now();
        let mut contact = Contact {
            id: uuid::Uuid::new_v4(),
            name: input.name.as_deref().unwrap_or_default().trim().to_string(),
            company_name: input.company_name.as_deref().unwrap_or_default().trim().to_string(),
            email,
            position: input.position.as_deref().unwrap_or_default().trim().to_string(),
            phone_number: input.phone().unwrap_or_default(),
            user_id: owner,
            created_at: now,
            updated_at: now,
        };
        contact.normalize();
        let contact = self.ctx.stores.contacts.insert(contact).await?;
        tracing::info!(contact_id = %contact.id, %owner, "Contact added");
        Ok(contact)
    }

    pub async fn update(&self, owner: Id, id: Id, input: ContactInput) -> VaResult<Contact> {
        UpdateContactContract.validate(&input)?;
        let mut contact = self.owned(owner, id).await?;

        if let Some(email) = input.email.as_deref() {
            let email = email.trim().to_lowercase();
            if email != contact.email {
                self.ensure_email_free(owner, &email, Some(id)).await?;
            }
            contact.email = email;
        }
        if let Some(name) = input.name.as_deref() {
            contact.name = name.trim().to_string();
        }
        if let Some(company) = input.company_name.as_deref() {
            contact.company_name = company.trim().to_string();
        }
        if let Some(position) = input.position.as_deref() {
            contact.position = position.trim().to_string();
        }
        if let Some(phone) = input.phone() {
            contact.phone_number = phone;
        }
        contact.normalize();
        contact.updated_at = Utc::now();
        Ok(self.ctx.stores.contacts.update(&contact).await?)
    }

    pub async fn delete(&self, owner: Id, id: Id) -> VaResult<()> {
        self.owned(owner, id).await?;
        self.ctx.stores.contacts.delete(id).await?;
        Ok(())
    }

    pub async fn search_company(&self, owner: Id, company: &str) -> VaResult<Vec<Contact>> {
        Ok(self.ctx.stores.contacts.search_company(owner, company.trim()).await?)
    }

    pub async fn search_name(&self, owner: Id, name: &str) -> VaResult<Vec<Contact>> {
        Ok(self.ctx.stores.contacts.search_name(owner, name.trim()).await?)
    }
}
