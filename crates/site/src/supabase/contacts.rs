//! Operations on the `contacts` table.

use serde_json::json;
use studio_core::{ContactInput, ContactMessage, ContactStatus};
use tracing::instrument;
use uuid::Uuid;

use super::{CONTACTS_TABLE, Caller, Query, SupabaseClient, SupabaseError};

impl SupabaseClient {
    /// Store a contact form submission.
    ///
    /// Anonymous callers may insert into `contacts` but not read it back,
    /// so nothing is returned.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip_all, fields(email_domain = input.email.domain()))]
    pub async fn submit_contact(&self, input: &ContactInput) -> Result<(), SupabaseError> {
        self.insert_minimal(Caller::Anonymous, CONTACTS_TABLE, input)
            .await
    }

    /// List messages newest first, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn list_contacts(
        &self,
        caller: Caller<'_>,
        status: Option<ContactStatus>,
    ) -> Result<Vec<ContactMessage>, SupabaseError> {
        let mut query = Query::table(CONTACTS_TABLE);
        if let Some(status) = status {
            query = query.eq("status", status);
        }
        self.select(caller, &query.order("created_at.desc")).await
    }

    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn get_contact(
        &self,
        caller: Caller<'_>,
        id: Uuid,
    ) -> Result<Option<ContactMessage>, SupabaseError> {
        self.select_one(caller, &Query::table(CONTACTS_TABLE).eq("id", id))
            .await
    }

    /// # Errors
    ///
    /// Returns `NotFound` if no message has this id.
    #[instrument(skip(self, caller))]
    pub async fn set_contact_status(
        &self,
        caller: Caller<'_>,
        id: Uuid,
        status: ContactStatus,
    ) -> Result<ContactMessage, SupabaseError> {
        self.update(
            caller,
            &Query::table(CONTACTS_TABLE).eq("id", id),
            &json!({ "status": status }),
        )
        .await?
        .ok_or(SupabaseError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `NotFound` if no message has this id.
    #[instrument(skip(self, caller))]
    pub async fn delete_contact(&self, caller: Caller<'_>, id: Uuid) -> Result<(), SupabaseError> {
        match self
            .delete(caller, &Query::table(CONTACTS_TABLE).eq("id", id))
            .await?
        {
            0 => Err(SupabaseError::NotFound),
            _ => Ok(()),
        }
    }

    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn count_contacts(
        &self,
        caller: Caller<'_>,
        status: Option<ContactStatus>,
    ) -> Result<u64, SupabaseError> {
        let mut query = Query::table(CONTACTS_TABLE);
        if let Some(status) = status {
            query = query.eq("status", status);
        }
        self.count(caller, &query).await
    }
}
