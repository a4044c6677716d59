//! Operations on the `services` table.

use serde::Deserialize;
use serde_json::json;
use studio_core::{Service, ServiceInput};
use tracing::instrument;
use uuid::Uuid;

use super::{Caller, Query, SERVICES_TABLE, SupabaseClient, SupabaseError};

/// Which services to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Everything, for the admin panel.
    All,
    /// Only services flagged public, for the site.
    Public,
}

/// Direction to move a service in the display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

/// Compute the position updates that move `id` one step.
///
/// `services` must be in display order. Positions are renumbered densely
/// from zero so duplicates left by manual edits resolve too; only rows
/// whose position actually changes are returned. Moving past either end
/// yields no updates.
#[must_use]
pub fn reorder_positions(services: &[Service], id: Uuid, direction: Direction) -> Vec<(Uuid, i32)> {
    let mut order: Vec<&Service> = services.iter().collect();
    let Some(index) = order.iter().position(|s| s.id == id) else {
        return Vec::new();
    };
    let neighbour = match direction {
        Direction::Up => index.checked_sub(1),
        Direction::Down => Some(index + 1).filter(|&i| i < order.len()),
    };
    let Some(neighbour) = neighbour else {
        return Vec::new();
    };
    order.swap(index, neighbour);

    order
        .iter()
        .zip(0..)
        .filter(|(service, position)| service.position != *position)
        .map(|(service, position)| (service.id, position))
        .collect()
}

impl SupabaseClient {
    /// List services in display order.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn list_services(
        &self,
        caller: Caller<'_>,
        visibility: Visibility,
    ) -> Result<Vec<Service>, SupabaseError> {
        let mut query = Query::table(SERVICES_TABLE);
        if visibility == Visibility::Public {
            query = query.eq("is_public", true);
        }
        self.select(caller, &query.order("position.asc").order("title.asc"))
            .await
    }

    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn get_service(
        &self,
        caller: Caller<'_>,
        id: Uuid,
    ) -> Result<Option<Service>, SupabaseError> {
        self.select_one(caller, &Query::table(SERVICES_TABLE).eq("id", id))
            .await
    }

    /// # Errors
    ///
    /// Returns error if the request fails.
    pub async fn count_services(&self, caller: Caller<'_>) -> Result<u64, SupabaseError> {
        self.count(caller, &Query::table(SERVICES_TABLE)).await
    }

    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self, caller, input), fields(title = %input.title))]
    pub async fn create_service(
        &self,
        caller: Caller<'_>,
        input: &ServiceInput,
    ) -> Result<Service, SupabaseError> {
        self.insert(caller, SERVICES_TABLE, input).await
    }

    /// # Errors
    ///
    /// Returns `NotFound` if no service has this id.
    #[instrument(skip(self, caller, input))]
    pub async fn update_service(
        &self,
        caller: Caller<'_>,
        id: Uuid,
        input: &ServiceInput,
    ) -> Result<Service, SupabaseError> {
        self.update(caller, &Query::table(SERVICES_TABLE).eq("id", id), input)
            .await?
            .ok_or(SupabaseError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `NotFound` if no service has this id.
    #[instrument(skip(self, caller))]
    pub async fn delete_service(&self, caller: Caller<'_>, id: Uuid) -> Result<(), SupabaseError> {
        match self
            .delete(caller, &Query::table(SERVICES_TABLE).eq("id", id))
            .await?
        {
            0 => Err(SupabaseError::NotFound),
            _ => Ok(()),
        }
    }

    /// Show or hide a service on the public site.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no service has this id.
    #[instrument(skip(self, caller))]
    pub async fn set_service_visibility(
        &self,
        caller: Caller<'_>,
        id: Uuid,
        is_public: bool,
    ) -> Result<Service, SupabaseError> {
        self.update(
            caller,
            &Query::table(SERVICES_TABLE).eq("id", id),
            &json!({ "is_public": is_public }),
        )
        .await?
        .ok_or(SupabaseError::NotFound)
    }

    /// Swap a service with its neighbour in the display order.
    ///
    /// Positions are written one row at a time; a failure part-way leaves
    /// the order renumbered but still consistent enough to retry.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no service has this id.
    #[instrument(skip(self, caller))]
    pub async fn move_service(
        &self,
        caller: Caller<'_>,
        id: Uuid,
        direction: Direction,
    ) -> Result<(), SupabaseError> {
        let services = self.list_services(caller, Visibility::All).await?;
        if !services.iter().any(|s| s.id == id) {
            return Err(SupabaseError::NotFound);
        }

        for (service_id, position) in reorder_positions(&services, id, direction) {
            let _: Option<Service> = self
                .update(
                    caller,
                    &Query::table(SERVICES_TABLE).eq("id", service_id),
                    &json!({ "position": position }),
                )
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use httpmock::prelude::*;
    use studio_core::ServiceDraft;

    use super::*;
    use crate::supabase::test_support::{ADMIN_TOKEN, client_for};

    fn service(n: u128, position: i32) -> Service {
        Service {
            id: Uuid::from_u128(n),
            title: format!("Service {n}"),
            description: String::new(),
            icon: None,
            cta_label: None,
            cta_url: None,
            position,
            is_public: true,
        }
    }

    #[test]
    fn test_reorder_moves_up() {
        let services = vec![service(1, 0), service(2, 1), service(3, 2)];
        let updates = reorder_positions(&services, Uuid::from_u128(3), Direction::Up);
        assert_eq!(updates, vec![(Uuid::from_u128(3), 1), (Uuid::from_u128(2), 2)]);
    }

    #[test]
    fn test_reorder_at_edges_is_noop() {
        let services = vec![service(1, 0), service(2, 1)];
        assert!(reorder_positions(&services, Uuid::from_u128(1), Direction::Up).is_empty());
        assert!(reorder_positions(&services, Uuid::from_u128(2), Direction::Down).is_empty());
        assert!(reorder_positions(&services, Uuid::from_u128(9), Direction::Down).is_empty());
    }

    #[test]
    fn test_reorder_renumbers_duplicates() {
        let services = vec![service(1, 5), service(2, 5), service(3, 5)];
        let updates = reorder_positions(&services, Uuid::from_u128(1), Direction::Down);
        assert_eq!(
            updates,
            vec![
                (Uuid::from_u128(2), 0),
                (Uuid::from_u128(1), 1),
                (Uuid::from_u128(3), 2),
            ]
        );
    }

    #[tokio::test]
    async fn test_list_public_services() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/rest/v1/services")
                    .query_param("is_public", "eq.true")
                    .query_param("order", "position.asc,title.asc");
                then.status(200).json_body(json!([{
                    "id": "00000000-0000-0000-0000-000000000001",
                    "title": "Web Apps",
                    "description": null,
                    "position": 0,
                    "is_public": true
                }]));
            })
            .await;

        let client = client_for(&server);
        let services = client
            .list_services(Caller::Anonymous, Visibility::Public)
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(services.len(), 1);
        assert_eq!(services[0].title, "Web Apps");
    }

    #[tokio::test]
    async fn test_create_service_posts_validated_payload() {
        let server = MockServer::start_async().await;
        let input = ServiceDraft {
            title: "Branding".to_string(),
            position: Some("3".to_string()),
            is_public: Some("on".to_string()),
            ..ServiceDraft::default()
        }
        .validate()
        .unwrap();

        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/rest/v1/services")
                    .header("prefer", "return=representation")
                    .json_body(json!({
                        "title": "Branding",
                        "description": "",
                        "icon": null,
                        "cta_label": null,
                        "cta_url": null,
                        "position": 3,
                        "is_public": true
                    }));
                then.status(201).json_body(json!([{
                    "id": "00000000-0000-0000-0000-000000000002",
                    "title": "Branding",
                    "description": "",
                    "position": 3,
                    "is_public": true
                }]));
            })
            .await;

        let client = client_for(&server);
        let created = client
            .create_service(Caller::Admin(ADMIN_TOKEN), &input)
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(created.id, Uuid::from_u128(2));
    }

    #[tokio::test]
    async fn test_delete_missing_service() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(DELETE).path("/rest/v1/services");
                then.status(200).json_body(json!([]));
            })
            .await;

        let client = client_for(&server);
        let err = client
            .delete_service(Caller::Admin(ADMIN_TOKEN), Uuid::from_u128(1))
            .await
            .unwrap_err();
        assert!(matches!(err, SupabaseError::NotFound));
    }

    #[tokio::test]
    async fn test_move_service_patches_changed_rows() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/rest/v1/services");
                then.status(200).json_body(json!([
                    { "id": "00000000-0000-0000-0000-000000000001", "title": "A", "position": 0 },
                    { "id": "00000000-0000-0000-0000-000000000002", "title": "B", "position": 1 }
                ]));
            })
            .await;
        let first = server
            .mock_async(|when, then| {
                when.method(PATCH)
                    .path("/rest/v1/services")
                    .query_param("id", "eq.00000000-0000-0000-0000-000000000001")
                    .json_body(json!({ "position": 1 }));
                then.status(200).json_body(json!([]));
            })
            .await;
        let second = server
            .mock_async(|when, then| {
                when.method(PATCH)
                    .path("/rest/v1/services")
                    .query_param("id", "eq.00000000-0000-0000-0000-000000000002")
                    .json_body(json!({ "position": 0 }));
                then.status(200).json_body(json!([]));
            })
            .await;

        let client = client_for(&server);
        client
            .move_service(Caller::Admin(ADMIN_TOKEN), Uuid::from_u128(2), Direction::Up)
            .await
            .unwrap();
        first.assert_async().await;
        second.assert_async().await;
    }
}
