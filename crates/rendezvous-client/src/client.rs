//! Rendezvous HTTP client implementation.

use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

use crate::error::ClientError;
use crate::types::{
    AccountResponse, ApiErrorResponse, ApplicationDecision, ApplicationId, ApplicationIdBody,
    ApplicationsBody, ChatParticipant, ConnectionView, ConnectionsBody, CreditBalance, CreditHold,
    DeductOutcome, Event, EventApplication, EventClosed, EventId, EventsBody, ExpirySummary,
    HoldOutcome, HoldsBody, NewEvent, ParticipantsBody, Profile, ProfileUpdate, PurchaseRequest,
    RefundClaim, RefundDecision, RefundIdBody, RefundRequest, RefundRequestId, RefundRequestsBody,
    RefundStatus, ReleaseOutcome, ReleaseRequest, ReviewOutcome, Sufficiency, TransactionPage,
};

/// Rendezvous API client.
///
/// User calls take the caller's bearer token. Purchases use the service API
/// key from [`ClientOptions`].
#[derive(Debug, Clone)]
pub struct RendezvousClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    service_name: String,
}

impl RendezvousClient {
    /// Create a new client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the rendezvous service (e.g., `"http://rendezvous:8080"`)
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_options(base_url, ClientOptions::default())
    }

    /// Create a new client with custom options.
    pub fn with_options(
        base_url: impl Into<String>,
        options: ClientOptions,
    ) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_seconds))
            .build()
            .map_err(|e| ClientError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: options.api_key,
            service_name: options.service_name,
        })
    }

    /// Open the caller's account with the welcome grant.
    pub async fn create_account(&self, token: &str) -> Result<AccountResponse, ClientError> {
        self.send(self.user(Method::POST, "/v1/accounts", token).json(&serde_json::json!({})))
            .await
    }

    /// Current balance of the caller.
    pub async fn balance(&self, token: &str) -> Result<CreditBalance, ClientError> {
        self.send(self.user(Method::GET, "/v1/credits/balance", token))
            .await
    }

    /// Whether the caller can hold `required` credits.
    pub async fn check_sufficient(
        &self,
        token: &str,
        required: u32,
    ) -> Result<Sufficiency, ClientError> {
        self.send(
            self.user(Method::GET, "/v1/credits/sufficient", token)
                .query(&[("required", required)]),
        )
        .await
    }

    /// One page of the caller's ledger, newest first.
    pub async fn transactions(
        &self,
        token: &str,
        limit: usize,
        offset: usize,
    ) -> Result<TransactionPage, ClientError> {
        self.send(
            self.user(Method::GET, "/v1/credits/transactions", token)
                .query(&[("limit", limit), ("offset", offset)]),
        )
        .await
    }

    /// The caller's credit holds.
    pub async fn holds(&self, token: &str) -> Result<Vec<CreditHold>, ClientError> {
        let body: HoldsBody = self
            .send(self.user(Method::GET, "/v1/credits/holds", token))
            .await?;
        Ok(body.holds)
    }

    /// Reserve `max_guests` credits for an event the caller hosts.
    pub async fn hold(
        &self,
        token: &str,
        event_id: EventId,
        max_guests: u32,
        event_title: Option<&str>,
    ) -> Result<HoldOutcome, ClientError> {
        self.send(
            self.user(Method::POST, "/v1/credits/hold", token)
                .json(&HoldBody {
                    event_id,
                    max_guests,
                    event_title,
                }),
        )
        .await
    }

    /// Consume one held credit for an approved application.
    pub async fn deduct(
        &self,
        token: &str,
        event_id: EventId,
        application_id: ApplicationId,
    ) -> Result<DeductOutcome, ClientError> {
        self.send(
            self.user(Method::POST, "/v1/credits/deduct", token)
                .json(&serde_json::json!({
                    "event_id": event_id,
                    "application_id": application_id
                })),
        )
        .await
    }

    /// Return the unused credits of an event's hold.
    pub async fn release(
        &self,
        token: &str,
        request: &ReleaseRequest,
    ) -> Result<ReleaseOutcome, ClientError> {
        self.send(self.user(Method::POST, "/v1/credits/release", token).json(request))
            .await
    }

    /// The caller's profile.
    pub async fn profile(&self, token: &str) -> Result<Profile, ClientError> {
        self.send(self.user(Method::GET, "/v1/profiles/me", token))
            .await
    }

    /// Create or replace the caller's profile.
    pub async fn update_profile(
        &self,
        token: &str,
        update: &ProfileUpdate,
    ) -> Result<Profile, ClientError> {
        self.send(self.user(Method::PUT, "/v1/profiles/me", token).json(update))
            .await
    }

    /// Credit a completed payment. Requires the service API key.
    pub async fn record_purchase(
        &self,
        request: &PurchaseRequest,
    ) -> Result<AccountResponse, ClientError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ClientError::Configuration("service API key not set".into()))?;

        let builder = self
            .client
            .post(self.url("/v1/credits/purchases"))
            .header("x-api-key", api_key)
            .header("x-service-name", &self.service_name)
            .json(request);

        self.send(builder).await
    }

    /// Create an event, reserving one credit per guest slot.
    pub async fn create_event(&self, token: &str, event: &NewEvent) -> Result<Event, ClientError> {
        self.send(self.user(Method::POST, "/v1/events", token).json(event))
            .await
    }

    /// Fetch one event.
    pub async fn get_event(&self, token: &str, event_id: EventId) -> Result<Event, ClientError> {
        self.send(self.user(Method::GET, &format!("/v1/events/{event_id}"), token))
            .await
    }

    /// Events hosted by the caller.
    pub async fn my_events(&self, token: &str) -> Result<Vec<Event>, ClientError> {
        let body: EventsBody = self
            .send(self.user(Method::GET, "/v1/events/mine", token))
            .await?;
        Ok(body.events)
    }

    /// Delete one of the caller's events.
    pub async fn delete_event(
        &self,
        token: &str,
        event_id: EventId,
    ) -> Result<EventClosed, ClientError> {
        self.send(self.user(Method::DELETE, &format!("/v1/events/{event_id}"), token))
            .await
    }

    /// Apply to an event.
    pub async fn apply(
        &self,
        token: &str,
        event_id: EventId,
        message: Option<&str>,
    ) -> Result<ApplicationId, ClientError> {
        let body: ApplicationIdBody = self
            .send(
                self.user(
                    Method::POST,
                    &format!("/v1/events/{event_id}/applications"),
                    token,
                )
                .json(&serde_json::json!({ "message": message })),
            )
            .await?;
        Ok(body.application_id)
    }

    /// Applications to one of the caller's events.
    pub async fn event_applications(
        &self,
        token: &str,
        event_id: EventId,
    ) -> Result<Vec<EventApplication>, ClientError> {
        let body: ApplicationsBody = self
            .send(self.user(
                Method::GET,
                &format!("/v1/events/{event_id}/applications"),
                token,
            ))
            .await?;
        Ok(body.applications)
    }

    /// The caller's own applications.
    pub async fn my_applications(&self, token: &str) -> Result<Vec<EventApplication>, ClientError> {
        let body: ApplicationsBody = self
            .send(self.user(Method::GET, "/v1/applications/mine", token))
            .await?;
        Ok(body.applications)
    }

    /// Chat roster of an event the caller hosts or joined.
    pub async fn participants(
        &self,
        token: &str,
        event_id: EventId,
    ) -> Result<Vec<ChatParticipant>, ClientError> {
        let body: ParticipantsBody = self
            .send(self.user(
                Method::GET,
                &format!("/v1/events/{event_id}/participants"),
                token,
            ))
            .await?;
        Ok(body.participants)
    }

    /// Approve or reject an application to one of the caller's events.
    pub async fn respond(
        &self,
        token: &str,
        application_id: ApplicationId,
        decision: ApplicationDecision,
        owner_response: Option<&str>,
    ) -> Result<ApplicationId, ClientError> {
        let body: ApplicationIdBody = self
            .send(
                self.user(
                    Method::POST,
                    &format!("/v1/applications/{application_id}/respond"),
                    token,
                )
                .json(&serde_json::json!({
                    "status": decision,
                    "owner_response": owner_response
                })),
            )
            .await?;
        Ok(body.application_id)
    }

    /// Withdraw one of the caller's pending applications.
    pub async fn cancel_application(
        &self,
        token: &str,
        application_id: ApplicationId,
    ) -> Result<ApplicationId, ClientError> {
        let body: ApplicationIdBody = self
            .send(self.user(
                Method::POST,
                &format!("/v1/applications/{application_id}/cancel"),
                token,
            ))
            .await?;
        Ok(body.application_id)
    }

    /// The caller's connections.
    pub async fn connections(&self, token: &str) -> Result<Vec<ConnectionView>, ClientError> {
        let body: ConnectionsBody = self
            .send(self.user(Method::GET, "/v1/connections", token))
            .await?;
        Ok(body.connections)
    }

    /// Ask for the credit spent on a no-show participant.
    pub async fn submit_refund(
        &self,
        token: &str,
        claim: &RefundClaim,
    ) -> Result<RefundRequestId, ClientError> {
        let body: RefundIdBody = self
            .send(self.user(Method::POST, "/v1/refunds", token).json(claim))
            .await?;
        Ok(body.refund_request_id)
    }

    /// Refund requests the caller submitted.
    pub async fn my_refund_requests(&self, token: &str) -> Result<Vec<RefundRequest>, ClientError> {
        let body: RefundRequestsBody = self
            .send(self.user(Method::GET, "/v1/refunds/mine", token))
            .await?;
        Ok(body.refund_requests)
    }

    /// Refund requests, optionally filtered by status. Admin only.
    pub async fn refund_queue(
        &self,
        token: &str,
        status: Option<RefundStatus>,
    ) -> Result<Vec<RefundRequest>, ClientError> {
        let mut builder = self.user(Method::GET, "/v1/admin/refunds", token);
        if let Some(status) = status {
            builder = builder.query(&[("status", status)]);
        }
        let body: RefundRequestsBody = self.send(builder).await?;
        Ok(body.refund_requests)
    }

    /// Decide a pending refund request. Admin only.
    pub async fn review_refund(
        &self,
        token: &str,
        request_id: RefundRequestId,
        decision: RefundDecision,
        admin_notes: Option<&str>,
    ) -> Result<ReviewOutcome, ClientError> {
        self.send(
            self.user(
                Method::POST,
                &format!("/v1/admin/refunds/{request_id}/review"),
                token,
            )
            .json(&ReviewBody {
                decision,
                admin_notes,
            }),
        )
        .await
    }

    /// Expire every finished event now. Admin only.
    pub async fn expire_events(&self, token: &str) -> Result<ExpirySummary, ClientError> {
        self.send(self.user(Method::POST, "/v1/admin/events/expire", token))
            .await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn user(&self, method: Method, path: &str, token: &str) -> RequestBuilder {
        self.client
            .request(method, self.url(path))
            .bearer_auth(token)
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        let response = builder.send().await?;
        self.handle_response(response).await
    }

    /// Handle API response and convert errors.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        // Try to parse error response
        let error_body: Result<ApiErrorResponse, _> = response.json().await;

        match error_body {
            Ok(api_error) => {
                let details = api_error.error.details.as_ref();
                let detail = |name: &str| {
                    details
                        .and_then(|d| d.get(name))
                        .and_then(serde_json::Value::as_u64)
                        .and_then(|v| u32::try_from(v).ok())
                        .unwrap_or(0)
                };

                // Map specific error codes to typed errors
                match api_error.error.code.as_str() {
                    "insufficient_credits" => Err(ClientError::InsufficientCredits {
                        required: detail("required"),
                        available: detail("available"),
                        shortfall: detail("shortfall"),
                    }),
                    "event_full" => Err(ClientError::EventFull {
                        max_guests: detail("max_guests"),
                    }),
                    "hold_exhausted" => Err(ClientError::HoldExhausted {
                        event_id: details
                            .and_then(|d| d.get("event_id"))
                            .and_then(serde_json::Value::as_str)
                            .and_then(|id| id.parse().ok()),
                        credits_held: detail("credits_held"),
                    }),
                    "invalid_state" => Err(ClientError::InvalidState {
                        message: api_error.error.message,
                    }),
                    "conflict" => Err(ClientError::Conflict {
                        message: api_error.error.message,
                    }),
                    "not_found" | "no_active_hold" => Err(ClientError::NotFound {
                        message: api_error.error.message,
                    }),
                    code => {
                        tracing::debug!(code, status = status.as_u16(), "API request failed");
                        Err(ClientError::Api {
                            code: code.to_string(),
                            message: api_error.error.message,
                            status: status.as_u16(),
                        })
                    }
                }
            }
            Err(_) => Err(ClientError::Api {
                code: "unknown".to_string(),
                message: format!("HTTP {status}"),
                status: status.as_u16(),
            }),
        }
    }
}

#[derive(Serialize)]
struct HoldBody<'a> {
    event_id: EventId,
    max_guests: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    event_title: Option<&'a str>,
}

#[derive(Serialize)]
struct ReviewBody<'a> {
    decision: RefundDecision,
    #[serde(skip_serializing_if = "Option::is_none")]
    admin_notes: Option<&'a str>,
}

/// Client options for customization.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Request timeout in seconds (default: 30).
    pub timeout_seconds: u64,
    /// Service API key, needed only to record purchases.
    pub api_key: Option<String>,
    /// Service name to include in service requests.
    pub service_name: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            api_key: None,
            service_name: "unknown".to_string(),
        }
    }
}

impl ClientOptions {
    /// Options for a service that records purchases.
    #[must_use]
    pub fn for_service(name: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            service_name: name.into(),
            ..Self::default()
        }
    }
}
