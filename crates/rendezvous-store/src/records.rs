//! Typed record access over a [`Tx`].
//!
//! Values are encoded with CBOR. Writers keep the index column families in
//! step with the primary records; none of the indexed fields ever change after
//! a record is created, so index entries are only ever added.

use serde::de::DeserializeOwned;
use serde::Serialize;

use rendezvous_core::{
    ApplicationId, ChatParticipant, Connection, CreditAccount, CreditHold, CreditTransaction,
    Event, EventApplication, EventId, Profile, RefundRequest, RefundRequestId, UserId,
};

use crate::error::{Result, StoreError};
use crate::keys::{self, ID_LEN};
use crate::schema::cf;
use crate::Tx;

/// Serialize a value using CBOR.
fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(buf)
}

/// Deserialize a value from CBOR.
fn decode<T: DeserializeOwned>(data: &[u8]) -> Result<T> {
    ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn load<T, X>(tx: &X, family: &'static str, key: &[u8]) -> Result<Option<T>>
where
    T: DeserializeOwned,
    X: Tx + ?Sized,
{
    tx.get(family, key)?.map(|data| decode(&data)).transpose()
}

fn store<T, X>(tx: &mut X, family: &'static str, key: Vec<u8>, value: &T) -> Result<()>
where
    T: Serialize,
    X: Tx + ?Sized,
{
    let value = encode(value)?;
    tx.put(family, key, value)
}

/// Follow a `parent || child` index to the primary records it names.
fn load_indexed<T, X>(
    tx: &X,
    index: &'static str,
    parent: &[u8; ID_LEN],
    primary: &'static str,
) -> Result<Vec<T>>
where
    T: DeserializeOwned,
    X: Tx + ?Sized,
{
    let mut records = Vec::new();
    for (key, _) in tx.scan_prefix(index, parent)? {
        let child = keys::child_id(&key).ok_or(StoreError::CorruptIndex { cf: index })?;
        if let Some(record) = load(tx, primary, &keys::id_key(&child))? {
            records.push(record);
        }
    }
    Ok(records)
}

/// Decode every value in a column family.
fn load_all<T, X>(tx: &X, family: &'static str) -> Result<Vec<T>>
where
    T: DeserializeOwned,
    X: Tx + ?Sized,
{
    tx.scan_prefix(family, &[])?
        .into_iter()
        .map(|(_, value)| decode(&value))
        .collect()
}

/// Typed accessors for every record kind.
///
/// Implemented for every [`Tx`], including `dyn Tx`.
pub trait Records: Tx {
    // =========================================================================
    // Credit Accounts
    // =========================================================================

    /// Get a credit account by user ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn account(&self, user_id: &UserId) -> Result<Option<CreditAccount>> {
        load(self, cf::ACCOUNTS, &keys::id_key(user_id.as_bytes()))
    }

    /// Insert or update a credit account.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_account(&mut self, account: &CreditAccount) -> Result<()> {
        store(
            self,
            cf::ACCOUNTS,
            keys::id_key(account.user_id.as_bytes()),
            account,
        )
    }

    // =========================================================================
    // Credit Holds
    // =========================================================================

    /// Get the hold placed for an event, active or released.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn hold_for_event(&self, event_id: &EventId) -> Result<Option<CreditHold>> {
        load(self, cf::HOLDS, &keys::id_key(event_id.as_bytes()))
    }

    /// Insert or update a hold and its owner index.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_hold(&mut self, hold: &CreditHold) -> Result<()> {
        store(self, cf::HOLDS, keys::id_key(hold.event_id.as_bytes()), hold)?;
        self.put(
            cf::HOLDS_BY_USER,
            keys::pair_key(hold.user_id.as_bytes(), hold.event_id.as_bytes()),
            Vec::new(),
        )
    }

    /// List a user's holds, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn holds_for_user(&self, user_id: &UserId) -> Result<Vec<CreditHold>> {
        let mut holds: Vec<CreditHold> =
            load_indexed(self, cf::HOLDS_BY_USER, user_id.as_bytes(), cf::HOLDS)?;
        holds.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(holds)
    }

    // =========================================================================
    // Credit Transactions
    // =========================================================================

    /// Append a ledger transaction.
    ///
    /// This also maintains the user index and, for purchases, the payment index.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn append_transaction(&mut self, transaction: &CreditTransaction) -> Result<()> {
        store(
            self,
            cf::TRANSACTIONS,
            keys::transaction_key(&transaction.id),
            transaction,
        )?;
        self.put(
            cf::TRANSACTIONS_BY_USER,
            keys::user_transaction_key(transaction.user_id.as_bytes(), &transaction.id),
            Vec::new(),
        )?;
        if let Some(payment_id) = &transaction.payment_transaction_id {
            self.put(
                cf::PAYMENTS,
                keys::payment_key(payment_id),
                keys::transaction_key(&transaction.id),
            )?;
        }
        Ok(())
    }

    /// List a user's transactions, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn transactions_for_user(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreditTransaction>> {
        let index = self.scan_prefix(cf::TRANSACTIONS_BY_USER, user_id.as_bytes())?;

        let mut transactions = Vec::new();
        for (key, _) in index.iter().rev().skip(offset).take(limit) {
            let tx_id = keys::child_id(key).ok_or(StoreError::CorruptIndex {
                cf: cf::TRANSACTIONS_BY_USER,
            })?;
            if let Some(tx) = load(self, cf::TRANSACTIONS, &tx_id)? {
                transactions.push(tx);
            }
        }
        Ok(transactions)
    }

    /// Check whether a payment reference has already been credited.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn payment_recorded(&self, payment_transaction_id: &str) -> Result<bool> {
        Ok(self
            .get(cf::PAYMENTS, &keys::payment_key(payment_transaction_id))?
            .is_some())
    }

    // =========================================================================
    // Events and Profiles
    // =========================================================================

    /// Get an event by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn event(&self, event_id: &EventId) -> Result<Option<Event>> {
        load(self, cf::EVENTS, &keys::id_key(event_id.as_bytes()))
    }

    /// Insert or update an event and its owner index.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_event(&mut self, event: &Event) -> Result<()> {
        store(self, cf::EVENTS, keys::id_key(event.id.as_bytes()), event)?;
        self.put(
            cf::EVENTS_BY_OWNER,
            keys::pair_key(event.owner_id.as_bytes(), event.id.as_bytes()),
            Vec::new(),
        )
    }

    /// List the events a user hosts, soonest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn events_for_owner(&self, owner_id: &UserId) -> Result<Vec<Event>> {
        let mut events: Vec<Event> =
            load_indexed(self, cf::EVENTS_BY_OWNER, owner_id.as_bytes(), cf::EVENTS)?;
        events.sort_by(|a, b| a.start_time.cmp(&b.start_time));
        Ok(events)
    }

    /// List every event.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn all_events(&self) -> Result<Vec<Event>> {
        load_all(self, cf::EVENTS)
    }

    /// Get a profile by user ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn profile(&self, user_id: &UserId) -> Result<Option<Profile>> {
        load(self, cf::PROFILES, &keys::id_key(user_id.as_bytes()))
    }

    /// Insert or update a profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_profile(&mut self, profile: &Profile) -> Result<()> {
        store(
            self,
            cf::PROFILES,
            keys::id_key(profile.user_id.as_bytes()),
            profile,
        )
    }

    // =========================================================================
    // Event Applications
    // =========================================================================

    /// Get an application by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn application(&self, application_id: &ApplicationId) -> Result<Option<EventApplication>> {
        load(
            self,
            cf::APPLICATIONS,
            &keys::id_key(application_id.as_bytes()),
        )
    }

    /// Insert or update an application and its indexes.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_application(&mut self, application: &EventApplication) -> Result<()> {
        let id = application.id.as_bytes();
        store(self, cf::APPLICATIONS, keys::id_key(id), application)?;
        self.put(
            cf::APPLICATIONS_BY_EVENT,
            keys::pair_key(application.event_id.as_bytes(), id),
            Vec::new(),
        )?;
        self.put(
            cf::APPLICATIONS_BY_APPLICANT,
            keys::pair_key(application.applicant_id.as_bytes(), id),
            Vec::new(),
        )?;
        self.put(
            cf::APPLICATION_BY_PAIR,
            keys::pair_key(
                application.event_id.as_bytes(),
                application.applicant_id.as_bytes(),
            ),
            id.to_vec(),
        )
    }

    /// Find the application a user made for an event, whatever its status.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn application_for(
        &self,
        event_id: &EventId,
        applicant_id: &UserId,
    ) -> Result<Option<EventApplication>> {
        let pair = keys::pair_key(event_id.as_bytes(), applicant_id.as_bytes());
        let Some(value) = self.get(cf::APPLICATION_BY_PAIR, &pair)? else {
            return Ok(None);
        };
        let id = keys::id_value(&value).ok_or(StoreError::CorruptIndex {
            cf: cf::APPLICATION_BY_PAIR,
        })?;
        load(self, cf::APPLICATIONS, &id)
    }

    /// List an event's applications, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn applications_for_event(&self, event_id: &EventId) -> Result<Vec<EventApplication>> {
        let mut applications: Vec<EventApplication> = load_indexed(
            self,
            cf::APPLICATIONS_BY_EVENT,
            event_id.as_bytes(),
            cf::APPLICATIONS,
        )?;
        applications.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(applications)
    }

    /// List a user's applications, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn applications_for_applicant(&self, applicant_id: &UserId) -> Result<Vec<EventApplication>> {
        let mut applications: Vec<EventApplication> = load_indexed(
            self,
            cf::APPLICATIONS_BY_APPLICANT,
            applicant_id.as_bytes(),
            cf::APPLICATIONS,
        )?;
        applications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(applications)
    }

    // =========================================================================
    // Connections and Chat Participants
    // =========================================================================

    /// Find a connection between two users under either ordering.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn connection_between(&self, a: &UserId, b: &UserId) -> Result<Option<Connection>> {
        if let Some(found) = load(
            self,
            cf::CONNECTIONS,
            &keys::pair_key(a.as_bytes(), b.as_bytes()),
        )? {
            return Ok(Some(found));
        }
        load(
            self,
            cf::CONNECTIONS,
            &keys::pair_key(b.as_bytes(), a.as_bytes()),
        )
    }

    /// Insert a connection and index it under both users.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_connection(&mut self, connection: &Connection) -> Result<()> {
        let pair = keys::pair_key(connection.user_a.as_bytes(), connection.user_b.as_bytes());
        store(self, cf::CONNECTIONS, pair.clone(), connection)?;
        for user in [connection.user_a, connection.user_b] {
            self.put(
                cf::CONNECTIONS_BY_USER,
                keys::pair_key(user.as_bytes(), connection.id.as_bytes()),
                pair.clone(),
            )?;
        }
        Ok(())
    }

    /// List a user's connections, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn connections_for_user(&self, user_id: &UserId) -> Result<Vec<Connection>> {
        let mut connections: Vec<Connection> = Vec::new();
        for (_, pair) in self.scan_prefix(cf::CONNECTIONS_BY_USER, user_id.as_bytes())? {
            if let Some(connection) = load(self, cf::CONNECTIONS, &pair)? {
                connections.push(connection);
            }
        }
        connections.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(connections)
    }

    /// Get a user's chat membership for an event.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn chat_participant(
        &self,
        event_id: &EventId,
        user_id: &UserId,
    ) -> Result<Option<ChatParticipant>> {
        load(
            self,
            cf::CHAT_PARTICIPANTS,
            &keys::pair_key(event_id.as_bytes(), user_id.as_bytes()),
        )
    }

    /// Insert a chat membership.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_chat_participant(&mut self, participant: &ChatParticipant) -> Result<()> {
        store(
            self,
            cf::CHAT_PARTICIPANTS,
            keys::pair_key(
                participant.event_id.as_bytes(),
                participant.user_id.as_bytes(),
            ),
            participant,
        )
    }

    /// List an event's chat members in join order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn chat_participants(&self, event_id: &EventId) -> Result<Vec<ChatParticipant>> {
        let mut participants: Vec<ChatParticipant> = self
            .scan_prefix(cf::CHAT_PARTICIPANTS, event_id.as_bytes())?
            .into_iter()
            .map(|(_, value)| decode(&value))
            .collect::<Result<_>>()?;
        participants.sort_by(|a, b| a.joined_at.cmp(&b.joined_at));
        Ok(participants)
    }

    // =========================================================================
    // Refund Requests
    // =========================================================================

    /// Get a refund request by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn refund_request(&self, id: &RefundRequestId) -> Result<Option<RefundRequest>> {
        load(self, cf::REFUND_REQUESTS, &keys::id_key(id.as_bytes()))
    }

    /// Insert or update a refund request and its indexes.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_refund_request(&mut self, request: &RefundRequest) -> Result<()> {
        let id = request.id.as_bytes();
        store(self, cf::REFUND_REQUESTS, keys::id_key(id), request)?;
        self.put(
            cf::REFUND_BY_APPLICATION,
            keys::id_key(request.application_id.as_bytes()),
            id.to_vec(),
        )?;
        self.put(
            cf::REFUNDS_BY_USER,
            keys::pair_key(request.user_id.as_bytes(), id),
            Vec::new(),
        )
    }

    /// Find the refund request filed for an application.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn refund_for_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Option<RefundRequest>> {
        let Some(value) = self.get(
            cf::REFUND_BY_APPLICATION,
            &keys::id_key(application_id.as_bytes()),
        )?
        else {
            return Ok(None);
        };
        let id = keys::id_value(&value).ok_or(StoreError::CorruptIndex {
            cf: cf::REFUND_BY_APPLICATION,
        })?;
        load(self, cf::REFUND_REQUESTS, &id)
    }

    /// List the refund requests a user filed, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn refund_requests_for_user(&self, user_id: &UserId) -> Result<Vec<RefundRequest>> {
        let mut requests: Vec<RefundRequest> = load_indexed(
            self,
            cf::REFUNDS_BY_USER,
            user_id.as_bytes(),
            cf::REFUND_REQUESTS,
        )?;
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(requests)
    }

    /// List every refund request, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn all_refund_requests(&self) -> Result<Vec<RefundRequest>> {
        let mut requests: Vec<RefundRequest> = load_all(self, cf::REFUND_REQUESTS)?;
        requests.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(requests)
    }
}

impl<T: Tx + ?Sized> Records for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use chrono::Utc;
    use rendezvous_core::{ApplicationStatus, NewEvent};

    fn sample_event(owner_id: UserId) -> Event {
        Event::new(
            owner_id,
            NewEvent {
                title: "Board games".into(),
                room_title: Some("Game night".into()),
                start_time: Utc::now(),
                end_time: None,
                max_guests: Some(3),
                min_age: None,
                max_age: None,
            },
        )
    }

    #[test]
    fn application_indexes() {
        let db = Database::in_memory();
        let owner = UserId::generate();
        let applicant = UserId::generate();
        let event = sample_event(owner);
        let application = EventApplication::new(&event, applicant, Some("hi".into()));

        db.transaction(|tx| -> Result<()> {
            tx.put_event(&event)?;
            tx.put_application(&application)
        })
        .unwrap();

        db.transaction(|tx| -> Result<()> {
            let by_pair = tx.application_for(&event.id, &applicant)?.unwrap();
            assert_eq!(by_pair.id, application.id);
            assert!(tx.application_for(&event.id, &owner)?.is_none());

            assert_eq!(tx.applications_for_event(&event.id)?.len(), 1);
            assert_eq!(tx.applications_for_applicant(&applicant)?.len(), 1);
            assert!(tx.applications_for_applicant(&owner)?.is_empty());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn updated_application_is_not_duplicated_in_indexes() {
        let db = Database::in_memory();
        let event = sample_event(UserId::generate());
        let mut application = EventApplication::new(&event, UserId::generate(), None);

        db.transaction(|tx| -> Result<()> { tx.put_application(&application) })
            .unwrap();
        application.status = ApplicationStatus::Cancelled;
        db.transaction(|tx| -> Result<()> { tx.put_application(&application) })
            .unwrap();

        let listed = db
            .transaction(|tx| -> Result<_> { tx.applications_for_event(&event.id) })
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].status, ApplicationStatus::Cancelled);
    }

    #[test]
    fn connection_found_under_either_ordering() {
        let db = Database::in_memory();
        let (a, b) = (UserId::generate(), UserId::generate());
        let connection = Connection::new(a, b, EventId::generate());

        db.transaction(|tx| -> Result<()> { tx.put_connection(&connection) })
            .unwrap();

        db.transaction(|tx| -> Result<()> {
            assert_eq!(tx.connection_between(&a, &b)?.unwrap().id, connection.id);
            assert_eq!(tx.connection_between(&b, &a)?.unwrap().id, connection.id);
            assert_eq!(tx.connections_for_user(&a)?.len(), 1);
            assert_eq!(tx.connections_for_user(&b)?.len(), 1);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn payment_reference_recorded_with_purchase() {
        let db = Database::in_memory();
        let account = CreditAccount::new(UserId::generate());
        let purchase = CreditTransaction::purchase(&account, 5, "pi_42".into(), "Bought".into());

        db.transaction(|tx| -> Result<()> { tx.append_transaction(&purchase) })
            .unwrap();

        db.transaction(|tx| -> Result<()> {
            assert!(tx.payment_recorded("pi_42")?);
            assert!(!tx.payment_recorded("pi_43")?);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn refund_request_indexed_by_application() {
        let db = Database::in_memory();
        let requester = UserId::generate();
        let request = RefundRequest::new(
            requester,
            EventId::generate(),
            ApplicationId::generate(),
            UserId::generate(),
            "No show".into(),
            vec!["img/1.png".into()],
        );

        db.transaction(|tx| -> Result<()> { tx.put_refund_request(&request) })
            .unwrap();

        db.transaction(|tx| -> Result<()> {
            let found = tx.refund_for_application(&request.application_id)?.unwrap();
            assert_eq!(found.id, request.id);
            assert_eq!(tx.refund_requests_for_user(&requester)?.len(), 1);
            assert_eq!(tx.all_refund_requests()?.len(), 1);
            Ok(())
        })
        .unwrap();
    }
}
