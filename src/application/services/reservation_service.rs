//! Reservation coordinator — the use-case orchestration for the
//! reservation lifecycle.
//!
//! Every mutating operation follows the same shape: validate locally,
//! consult the remote oracles, claim external holds (quota, table),
//! persist the aggregate, then emit events. There is no distributed
//! transaction; each external hold has an explicit compensation on the
//! failure paths, and post-commit publish failures are logged without
//! rolling back the aggregate.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use super::table_assigner::TableTransition;
use super::{record_operation_latency, release_quota_with_retry, RestaurantValidator, TableAssigner};
use crate::application::dto::{
    collect_field_errors, CreateReservationRequest, MenuItemSelection, UpdateReservationRequest,
};
use crate::domain::{
    CapacityKind, DomainError, DomainResult, HistoryAction, QuotaDecision, RepositoryProvider,
    Reservation, ReservationMenuItem, ReservationStatus, SlotKey,
};
use crate::messaging::messages::{
    ReservationCancelledEvent, ReservationConfirmedEvent, ReservationCreatedEvent,
    ReservationUpdatedEvent,
};
use crate::messaging::{OutboundEvent, SharedEventPublisher};
use crate::shared::{validate_pagination, PaginatedResult, SharedClock};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Business rules driven by configuration (§6 keys).
#[derive(Debug, Clone)]
pub struct ReservationRules {
    pub confirmation_expiration_minutes: i64,
    pub default_session_length_minutes: i32,
    pub min_advance_booking_minutes: i64,
    pub max_party_size: i32,
    pub max_future_days: i64,
}

impl Default for ReservationRules {
    fn default() -> Self {
        Self {
            confirmation_expiration_minutes: 15,
            default_session_length_minutes: 120,
            min_advance_booking_minutes: 60,
            max_party_size: 20,
            max_future_days: 90,
        }
    }
}

pub struct ReservationService {
    repos: Arc<dyn RepositoryProvider>,
    validator: Arc<RestaurantValidator>,
    assigner: Arc<TableAssigner>,
    publisher: SharedEventPublisher,
    clock: SharedClock,
    rules: ReservationRules,
}

impl ReservationService {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        validator: Arc<RestaurantValidator>,
        assigner: Arc<TableAssigner>,
        publisher: SharedEventPublisher,
        clock: SharedClock,
        rules: ReservationRules,
    ) -> Self {
        Self {
            repos,
            validator,
            assigner,
            publisher,
            clock,
            rules,
        }
    }

    // ── Create ─────────────────────────────────────────────────

    pub async fn create(
        &self,
        request: CreateReservationRequest,
        user_id: &str,
    ) -> DomainResult<Reservation> {
        let start = std::time::Instant::now();
        let now = self.clock.now();

        // Structural + business-rule validation, aggregated into one
        // field map before any remote call.
        let mut fields = match request.validate() {
            Ok(()) => BTreeMap::new(),
            Err(errors) => collect_field_errors(&errors),
        };
        if request.customer_phone.is_none() && request.customer_email.is_none() {
            fields.insert(
                "customerPhone".to_string(),
                "either phone or email is required".to_string(),
            );
        }
        if request.party_size < 1 || request.party_size > self.rules.max_party_size {
            fields.insert(
                "partySize".to_string(),
                format!("must be between 1 and {}", self.rules.max_party_size),
            );
        }
        self.check_booking_window(request.reservation_time, now, &mut fields);
        if !fields.is_empty() {
            return Err(DomainError::validation(fields));
        }

        // Remote validation.
        self.validator
            .ensure_exists_and_active(&request.restaurant_id)
            .await?;
        self.validator
            .ensure_within_operating_hours(&request.restaurant_id, request.reservation_time)
            .await?;

        // Claim the slot quota. Everything after this point must give
        // it back on failure.
        let slot = SlotKey::for_reservation(&request.restaurant_id, request.reservation_time);
        let party_size = request.party_size;
        match self.repos.quotas().try_reserve(&slot, party_size).await? {
            QuotaDecision::Granted => {}
            QuotaDecision::Unavailable => {
                return Err(DomainError::capacity(
                    CapacityKind::NoAvailability,
                    slot.descriptor(),
                ));
            }
            QuotaDecision::CannotAccommodate => {
                return Err(DomainError::capacity(
                    CapacityKind::NoSuitableTables,
                    slot.descriptor(),
                ));
            }
        }

        match self.create_with_quota(request, user_id, now, &slot).await {
            Ok(reservation) => {
                record_operation_latency("create", start);
                metrics::counter!("reservations_created_total").increment(1);
                Ok(reservation)
            }
            Err(e) => {
                release_quota_with_retry(&self.repos, &slot, party_size).await;
                Err(e)
            }
        }
    }

    async fn create_with_quota(
        &self,
        request: CreateReservationRequest,
        user_id: &str,
        now: DateTime<Utc>,
        slot: &SlotKey,
    ) -> DomainResult<Reservation> {
        // Persist the pending aggregate first so a full slot fails
        // early and the table finder sees a real reservation id.
        let duration = request
            .duration_minutes
            .unwrap_or(self.rules.default_session_length_minutes);
        let reservation = Reservation {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            restaurant_id: request.restaurant_id.clone(),
            table_id: None,
            reservation_time: request.reservation_time,
            duration_minutes: duration,
            party_size: request.party_size,
            status: ReservationStatus::Pending,
            customer_name: request.customer_name.clone(),
            customer_phone: request.customer_phone.clone(),
            customer_email: request.customer_email.clone(),
            special_requests: request.special_requests.clone(),
            reminders_enabled: request.reminders_enabled,
            created_at: now,
            updated_at: now,
            confirmation_deadline: now
                + Duration::minutes(self.rules.confirmation_expiration_minutes),
            confirmed_at: None,
            cancelled_at: None,
            completed_at: None,
            cancellation_reason: None,
            history: Vec::new(),
            menu_items: Vec::new(),
            version: 0,
        };
        let mut reservation = self.repos.reservations().save(reservation).await?;

        // Table assignment; absence of an assignable table aborts the
        // whole creation.
        let transition = match self.assigner.assign(&mut reservation).await {
            Ok(Some(transition)) => transition,
            Ok(None) => {
                self.discard_created(&reservation.id).await;
                return Err(DomainError::capacity(
                    CapacityKind::NoSuitableTables,
                    slot.descriptor(),
                ));
            }
            Err(e) => {
                self.discard_created(&reservation.id).await;
                return Err(e);
            }
        };

        reservation.record(
            HistoryAction::Created,
            format!(
                "Reservation created for {} guests at {}",
                reservation.party_size,
                reservation.reservation_time.format(TIME_FORMAT)
            ),
            user_id,
            now,
        );

        // Snapshot requested menu items; stale selections are skipped.
        let attached = match self
            .resolve_menu_selections(&reservation, &request.menu_items, now)
            .await
        {
            Ok(attached) => attached,
            Err(e) => {
                self.assigner.revert(&transition);
                self.discard_created(&reservation.id).await;
                return Err(e);
            }
        };
        reservation.menu_items.extend(attached);

        let reservation_id_for_discard = reservation.id.clone();
        let reservation = match self.repos.reservations().save(reservation).await {
            Ok(reservation) => reservation,
            Err(e) => {
                self.assigner.revert(&transition);
                self.discard_created(&reservation_id_for_discard).await;
                return Err(e);
            }
        };

        // Post-commit effects, best-effort.
        self.assigner
            .announce_assignment(&reservation, &transition)
            .await;
        let event = ReservationCreatedEvent {
            reservation_id: reservation.id.clone(),
            restaurant_id: reservation.restaurant_id.clone(),
            user_id: reservation.user_id.clone(),
            reservation_time: reservation.reservation_time,
            party_size: reservation.party_size,
            table_id: reservation.table_id.clone(),
        };
        if let Err(e) = self
            .publisher
            .publish(OutboundEvent::ReservationCreated(event))
            .await
        {
            warn!(reservation_id = reservation.id.as_str(), error = %e, "ReservationCreated publish failed");
        }

        info!(
            reservation_id = reservation.id.as_str(),
            restaurant_id = reservation.restaurant_id.as_str(),
            table_id = reservation.table_id.as_deref().unwrap_or("-"),
            party_size = reservation.party_size,
            "Reservation created"
        );
        Ok(reservation)
    }

    /// Remove a pending row whose creation was aborted mid-flight.
    async fn discard_created(&self, id: &str) {
        if let Err(e) = self.repos.reservations().delete(id).await {
            warn!(reservation_id = id, error = %e, "Could not remove aborted reservation row");
        }
    }

    // ── Confirm ────────────────────────────────────────────────

    pub async fn confirm(&self, id: &str, user_id: &str) -> DomainResult<Reservation> {
        let start = std::time::Instant::now();
        let now = self.clock.now();
        let mut reservation = self.load(id).await?;

        if reservation.status != ReservationStatus::Pending {
            return Err(DomainError::field(
                "status",
                format!("cannot confirm a {} reservation", reservation.status),
            ));
        }
        if reservation.user_id != user_id {
            return Err(DomainError::field(
                "userId",
                "only the reservation owner can confirm",
            ));
        }
        if now > reservation.confirmation_deadline {
            return Err(DomainError::field(
                "confirmationDeadline",
                "confirmation deadline has passed",
            ));
        }

        reservation.confirm(now);
        reservation.record(HistoryAction::Confirmed, "Reservation confirmed", user_id, now);

        // Creation may have committed without a table (never on the
        // create path today, but confirm re-tries rather than strands).
        let transition = if reservation.table_id.is_none() {
            match self.assigner.assign(&mut reservation).await {
                Ok(transition) => transition,
                Err(e) => {
                    warn!(reservation_id = id, error = %e, "Re-assignment on confirm failed");
                    None
                }
            }
        } else {
            None
        };

        let reservation = match self.repos.reservations().save(reservation).await {
            Ok(reservation) => reservation,
            Err(e) => {
                if let Some(t) = &transition {
                    self.assigner.revert(t);
                }
                return Err(e);
            }
        };

        if let Some(t) = &transition {
            self.assigner.announce_assignment(&reservation, t).await;
        }
        let event = ReservationConfirmedEvent {
            reservation_id: reservation.id.clone(),
            restaurant_id: reservation.restaurant_id.clone(),
            user_id: reservation.user_id.clone(),
            table_id: reservation.table_id.clone(),
        };
        if let Err(e) = self
            .publisher
            .publish(OutboundEvent::ReservationConfirmed(event))
            .await
        {
            warn!(reservation_id = reservation.id.as_str(), error = %e, "ReservationConfirmed publish failed");
        }

        record_operation_latency("confirm", start);
        Ok(reservation)
    }

    // ── Cancel ─────────────────────────────────────────────────

    pub async fn cancel(
        &self,
        id: &str,
        reason: &str,
        caller_id: &str,
    ) -> DomainResult<Reservation> {
        let start = std::time::Instant::now();
        let now = self.clock.now();
        let mut reservation = self.load(id).await?;

        if reservation.is_terminal() {
            return Err(DomainError::field(
                "status",
                format!("cannot cancel a {} reservation", reservation.status),
            ));
        }
        if reason.chars().count() > 500 {
            return Err(DomainError::field(
                "cancellationReason",
                "must be at most 500 characters",
            ));
        }
        // The creator may always cancel; anyone else must be verified
        // as the restaurant's owner (fail-closed on oracle trouble).
        let authorized = caller_id == reservation.user_id
            || self
                .validator
                .is_owner(&reservation.restaurant_id, caller_id)
                .await;
        if !authorized {
            return Err(DomainError::field(
                "userId",
                "not allowed to cancel this reservation",
            ));
        }

        let previous_status = reservation.status;
        reservation.cancel(reason, now);
        reservation.record(
            HistoryAction::Cancelled,
            format!("Cancelled: {}", reason),
            caller_id,
            now,
        );
        let released = self.assigner.release(&mut reservation);

        let reservation = match self.repos.reservations().save(reservation).await {
            Ok(reservation) => reservation,
            Err(e) => {
                if let Some(t) = &released {
                    self.assigner.revert(t);
                }
                return Err(e);
            }
        };

        if let Some(t) = &released {
            self.assigner
                .announce_release(&reservation.restaurant_id, t, &reservation.id)
                .await;
        }
        let slot = SlotKey::for_reservation(&reservation.restaurant_id, reservation.reservation_time);
        release_quota_with_retry(&self.repos, &slot, reservation.party_size).await;

        let event = ReservationCancelledEvent {
            reservation_id: reservation.id.clone(),
            restaurant_id: reservation.restaurant_id.clone(),
            user_id: reservation.user_id.clone(),
            previous_status: previous_status.as_str().to_string(),
            reason: reason.to_string(),
        };
        if let Err(e) = self
            .publisher
            .publish(OutboundEvent::ReservationCancelled(event))
            .await
        {
            warn!(reservation_id = reservation.id.as_str(), error = %e, "ReservationCancelled publish failed");
        }

        info!(
            reservation_id = reservation.id.as_str(),
            previous_status = previous_status.as_str(),
            caller_id,
            "Reservation cancelled"
        );
        record_operation_latency("cancel", start);
        Ok(reservation)
    }

    // ── Update ─────────────────────────────────────────────────

    pub async fn update(
        &self,
        id: &str,
        patch: UpdateReservationRequest,
        user_id: &str,
    ) -> DomainResult<Reservation> {
        let start = std::time::Instant::now();
        let now = self.clock.now();
        let mut reservation = self.load(id).await?;

        if !reservation.status.is_live() {
            return Err(DomainError::field(
                "status",
                "only pending or confirmed reservations can be modified",
            ));
        }
        if reservation.user_id != user_id {
            return Err(DomainError::field(
                "userId",
                "only the reservation owner can modify",
            ));
        }

        let mut fields = match patch.validate() {
            Ok(()) => BTreeMap::new(),
            Err(errors) => collect_field_errors(&errors),
        };
        if patch.is_empty() {
            fields.insert(
                "request".to_string(),
                "no updatable fields provided".to_string(),
            );
        }
        if let Some(new_party) = patch.party_size {
            if new_party < 1 || new_party > self.rules.max_party_size {
                fields.insert(
                    "partySize".to_string(),
                    format!("must be between 1 and {}", self.rules.max_party_size),
                );
            }
        }
        if let Some(new_time) = patch.reservation_time {
            self.check_booking_window(new_time, now, &mut fields);
        }
        if !fields.is_empty() {
            return Err(DomainError::validation(fields));
        }

        let old_time = reservation.reservation_time;
        let old_party = reservation.party_size;
        let old_duration = reservation.duration_minutes;
        let new_time = patch.reservation_time.unwrap_or(old_time);
        let new_party = patch.party_size.unwrap_or(old_party);
        let time_changed = new_time != old_time;
        let party_changed = new_party != old_party;

        if time_changed {
            self.validator
                .ensure_within_operating_hours(&reservation.restaurant_id, new_time)
                .await?;
        }

        // Quota movement is a swap: release the old claim, reserve the
        // new one, and re-book the old claim if the new slot refuses.
        let old_slot = SlotKey::for_reservation(&reservation.restaurant_id, old_time);
        let new_slot = SlotKey::for_reservation(&reservation.restaurant_id, new_time);
        let quota_swapped = time_changed || party_changed;
        if quota_swapped {
            self.repos.quotas().release(&old_slot, old_party).await?;
            let decision = self.repos.quotas().try_reserve(&new_slot, new_party).await;
            match decision {
                Ok(QuotaDecision::Granted) => {}
                Ok(QuotaDecision::Unavailable) => {
                    self.rebook_quota(&old_slot, old_party).await;
                    return Err(DomainError::capacity(
                        CapacityKind::NoAvailability,
                        new_slot.descriptor(),
                    ));
                }
                Ok(QuotaDecision::CannotAccommodate) => {
                    self.rebook_quota(&old_slot, old_party).await;
                    return Err(DomainError::capacity(
                        CapacityKind::NoSuitableTables,
                        new_slot.descriptor(),
                    ));
                }
                Err(e) => {
                    self.rebook_quota(&old_slot, old_party).await;
                    return Err(e);
                }
            }
        }

        reservation.reservation_time = new_time;
        reservation.party_size = new_party;
        if let Some(duration) = patch.duration_minutes {
            reservation.duration_minutes = duration;
        }
        if let Some(name) = patch.customer_name.clone() {
            reservation.customer_name = name;
        }
        if let Some(phone) = patch.customer_phone.clone() {
            reservation.customer_phone = Some(phone);
        }
        if let Some(email) = patch.customer_email.clone() {
            reservation.customer_email = Some(email);
        }
        if let Some(requests) = patch.special_requests.clone() {
            reservation.special_requests = Some(requests);
        }

        // The window moved or the party grew: the old table may no
        // longer fit, so release it and find a fresh one.
        let needs_reassign =
            time_changed || patch.duration_minutes.is_some() || new_party > old_party;
        let mut released: Option<TableTransition> = None;
        let mut assigned: Option<TableTransition> = None;
        if needs_reassign {
            released = self.assigner.release(&mut reservation);
            match self.assigner.assign(&mut reservation).await {
                Ok(Some(t)) => assigned = Some(t),
                Ok(None) => {
                    self.undo_update_holds(&released, &None, quota_swapped, &old_slot, old_party, &new_slot, new_party)
                        .await;
                    return Err(DomainError::capacity(
                        CapacityKind::NoSuitableTables,
                        new_slot.descriptor(),
                    ));
                }
                Err(e) => {
                    self.undo_update_holds(&released, &None, quota_swapped, &old_slot, old_party, &new_slot, new_party)
                        .await;
                    return Err(e);
                }
            }
        }

        let mut changes = Vec::new();
        if time_changed {
            changes.push(format!(
                "time: {} -> {}",
                old_time.format(TIME_FORMAT),
                new_time.format(TIME_FORMAT)
            ));
        }
        if party_changed {
            changes.push(format!("partySize: {} -> {}", old_party, new_party));
        }
        if let Some(duration) = patch.duration_minutes {
            if duration != old_duration {
                changes.push(format!("duration: {} -> {}", old_duration, duration));
            }
        }
        for (field, touched) in [
            ("customerName", patch.customer_name.is_some()),
            ("customerPhone", patch.customer_phone.is_some()),
            ("customerEmail", patch.customer_email.is_some()),
            ("specialRequests", patch.special_requests.is_some()),
        ] {
            if touched {
                changes.push(format!("{} updated", field));
            }
        }
        reservation.record(HistoryAction::Modified, changes.join(", "), user_id, now);

        let reservation = match self.repos.reservations().save(reservation).await {
            Ok(reservation) => reservation,
            Err(e) => {
                self.undo_update_holds(&released, &assigned, quota_swapped, &old_slot, old_party, &new_slot, new_party)
                    .await;
                return Err(e);
            }
        };

        if let Some(t) = &released {
            self.assigner
                .announce_release(&reservation.restaurant_id, t, &reservation.id)
                .await;
        }
        if let Some(t) = &assigned {
            self.assigner.announce_assignment(&reservation, t).await;
        }
        let event = ReservationUpdatedEvent {
            reservation_id: reservation.id.clone(),
            restaurant_id: reservation.restaurant_id.clone(),
            user_id: reservation.user_id.clone(),
            old_reservation_time: old_time,
            new_reservation_time: new_time,
            old_party_size: old_party,
            new_party_size: new_party,
        };
        if let Err(e) = self
            .publisher
            .publish(OutboundEvent::ReservationUpdated(event))
            .await
        {
            warn!(reservation_id = reservation.id.as_str(), error = %e, "ReservationModified publish failed");
        }

        record_operation_latency("update", start);
        Ok(reservation)
    }

    /// Best-effort restoration of the old slot claim if the new one
    /// cannot be kept.
    async fn rebook_quota(&self, slot: &SlotKey, party_size: i32) {
        match self.repos.quotas().try_reserve(slot, party_size).await {
            Ok(QuotaDecision::Granted) => {}
            Ok(decision) => warn!(
                slot = slot.descriptor().as_str(),
                ?decision,
                "Could not re-book the original slot after a failed update"
            ),
            Err(e) => warn!(
                slot = slot.descriptor().as_str(),
                error = %e,
                "Could not re-book the original slot after a failed update"
            ),
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn undo_update_holds(
        &self,
        released: &Option<TableTransition>,
        assigned: &Option<TableTransition>,
        quota_swapped: bool,
        old_slot: &SlotKey,
        old_party: i32,
        new_slot: &SlotKey,
        new_party: i32,
    ) {
        if let Some(t) = assigned {
            self.assigner.revert(t);
        }
        if let Some(t) = released {
            self.assigner.revert(t);
        }
        if quota_swapped {
            release_quota_with_retry(&self.repos, new_slot, new_party).await;
            self.rebook_quota(old_slot, old_party).await;
        }
    }

    // ── Menu items ─────────────────────────────────────────────

    pub async fn add_menu_items(
        &self,
        id: &str,
        selections: Vec<MenuItemSelection>,
        user_id: &str,
    ) -> DomainResult<Reservation> {
        let start = std::time::Instant::now();
        let now = self.clock.now();
        let mut reservation = self.load(id).await?;

        if !reservation.can_attach_menu_items() {
            return Err(DomainError::field(
                "status",
                "menu items can only be added to pending or confirmed reservations",
            ));
        }
        if reservation.user_id != user_id {
            return Err(DomainError::field(
                "userId",
                "only the reservation owner can add menu items",
            ));
        }
        if selections.is_empty() {
            return Err(DomainError::field("menuItems", "must not be empty"));
        }
        let mut fields = BTreeMap::new();
        for (index, selection) in selections.iter().enumerate() {
            if let Err(errors) = selection.validate() {
                for (field, message) in collect_field_errors(&errors) {
                    fields.insert(format!("menuItems[{}].{}", index, field), message);
                }
            }
        }
        if !fields.is_empty() {
            return Err(DomainError::validation(fields));
        }

        let attached = self
            .resolve_menu_selections(&reservation, &selections, now)
            .await?;
        let attached_count = attached.len();
        reservation.menu_items.extend(attached);
        reservation.record(
            HistoryAction::MenuItemsAdded,
            format!(
                "Attached {} of {} requested menu item(s)",
                attached_count,
                selections.len()
            ),
            user_id,
            now,
        );

        let reservation = self.repos.reservations().save(reservation).await?;
        record_operation_latency("add_menu_items", start);
        Ok(reservation)
    }

    /// Resolve selections against the local projection, silently
    /// skipping items that vanished, were deactivated, or belong to a
    /// different restaurant. A stale UI is tolerated, not punished.
    async fn resolve_menu_selections(
        &self,
        reservation: &Reservation,
        selections: &[MenuItemSelection],
        now: DateTime<Utc>,
    ) -> DomainResult<Vec<ReservationMenuItem>> {
        let mut attached = Vec::new();
        for selection in selections {
            let Some(item) = self
                .repos
                .menu_items()
                .find_by_id(&selection.menu_item_id)
                .await?
            else {
                info!(menu_item_id = selection.menu_item_id.as_str(), "Skipping unknown menu item");
                continue;
            };
            if !item.is_attachable() {
                info!(menu_item_id = item.id.as_str(), "Skipping inactive/unavailable menu item");
                continue;
            }
            if item.restaurant_id != reservation.restaurant_id {
                warn!(
                    menu_item_id = item.id.as_str(),
                    restaurant_id = reservation.restaurant_id.as_str(),
                    "Skipping menu item from another restaurant"
                );
                continue;
            }
            attached.push(ReservationMenuItem {
                reservation_id: reservation.id.clone(),
                menu_item_id: item.id,
                quantity: selection.quantity,
                special_instructions: selection.special_instructions.clone(),
                price_cents: item.price_cents,
                created_at: now,
                updated_at: now,
            });
        }
        Ok(attached)
    }

    // ── Queries ────────────────────────────────────────────────

    pub async fn get(&self, id: &str) -> DomainResult<Reservation> {
        self.load(id).await
    }

    pub async fn list_by_user(
        &self,
        user_id: &str,
        page: Option<u64>,
        limit: Option<u64>,
    ) -> DomainResult<PaginatedResult<Reservation>> {
        let (page, limit) = validate_pagination(page, limit);
        self.repos
            .reservations()
            .page_by_user(user_id, page, limit)
            .await
    }

    pub async fn list_by_restaurant(
        &self,
        restaurant_id: &str,
        page: Option<u64>,
        limit: Option<u64>,
    ) -> DomainResult<PaginatedResult<Reservation>> {
        let (page, limit) = validate_pagination(page, limit);
        self.repos
            .reservations()
            .page_by_restaurant(restaurant_id, page, limit)
            .await
    }

    // ── Helpers ────────────────────────────────────────────────

    async fn load(&self, id: &str) -> DomainResult<Reservation> {
        self.repos
            .reservations()
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::NotFound {
                entity: "Reservation",
                field: "id",
                value: id.to_string(),
            })
    }

    fn check_booking_window(
        &self,
        reservation_time: DateTime<Utc>,
        now: DateTime<Utc>,
        fields: &mut BTreeMap<String, String>,
    ) {
        if reservation_time < now + Duration::minutes(self.rules.min_advance_booking_minutes) {
            fields.insert(
                "reservationTime".to_string(),
                format!(
                    "must be at least {} minutes in the future",
                    self.rules.min_advance_booking_minutes
                ),
            );
        } else if reservation_time > now + Duration::days(self.rules.max_future_days) {
            fields.insert(
                "reservationTime".to_string(),
                format!("must be within {} days", self.rules.max_future_days),
            );
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::correlation::CorrelationBrokers;
    use crate::application::testkit::{RemoteScript, ScriptedBus, StubTablesApi};
    use crate::cache::{SharedTableStatusCache, TableStatusCache};
    use crate::domain::{
        MenuItem, MenuItemRepository, QuotaRepository, ReservationQuota, TableStatus,
    };
    use crate::infrastructure::memory::InMemoryRepositories;
    use crate::messaging::topics;
    use crate::shared::clock::FixedClock;
    use std::time::Duration as StdDuration;

    struct World {
        service: ReservationService,
        repos: Arc<InMemoryRepositories>,
        bus: Arc<ScriptedBus>,
        clock: Arc<FixedClock>,
        cache: SharedTableStatusCache,
    }

    fn world(script: RemoteScript) -> World {
        let brokers = CorrelationBrokers::shared();
        let bus = Arc::new(ScriptedBus::new(brokers.clone(), script));
        let repos = InMemoryRepositories::shared();
        let repos_dyn: Arc<dyn RepositoryProvider> = repos.clone();
        let cache = TableStatusCache::shared();
        let clock = FixedClock::at("2025-01-01T12:00:00Z");
        let validator = Arc::new(RestaurantValidator::new(
            brokers.clone(),
            bus.clone(),
            StdDuration::from_millis(40),
        ));
        let assigner = Arc::new(TableAssigner::new(
            brokers,
            bus.clone(),
            repos_dyn.clone(),
            cache.clone(),
            Arc::new(StubTablesApi { tables: None }),
            StdDuration::from_millis(40),
        ));
        let service = ReservationService::new(
            repos_dyn,
            validator,
            assigner,
            bus.clone(),
            clock.clone(),
            ReservationRules::default(),
        );
        World {
            service,
            repos,
            bus,
            clock,
            cache,
        }
    }

    fn at(rfc3339: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(rfc3339)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn create_request() -> CreateReservationRequest {
        CreateReservationRequest {
            restaurant_id: "R1".to_string(),
            reservation_time: at("2025-01-08T19:00:00Z"),
            duration_minutes: Some(120),
            party_size: 4,
            customer_name: "John Doe".to_string(),
            customer_phone: Some("+11234567890".to_string()),
            customer_email: Some("john@example.com".to_string()),
            special_requests: None,
            reminders_enabled: true,
            menu_items: Vec::new(),
        }
    }

    fn slot() -> SlotKey {
        SlotKey::for_reservation("R1", at("2025-01-08T19:00:00Z"))
    }

    async fn quota_counters(world: &World) -> (i32, i32) {
        match world.repos.quotas_mut().get(&slot()).await.unwrap() {
            Some(q) => (q.current_reservations, q.current_capacity),
            None => (0, 0),
        }
    }

    // Full create flow without menu items.
    #[tokio::test]
    async fn create_happy_path() {
        let world = world(RemoteScript::default());
        let r = world.service.create(create_request(), "U1").await.unwrap();

        assert_eq!(r.status, ReservationStatus::Pending);
        assert_eq!(r.confirmation_deadline, at("2025-01-01T12:15:00Z"));
        assert_eq!(r.table_id.as_deref(), Some("T1"));
        assert_eq!(r.end_time(), at("2025-01-08T21:00:00Z"));
        assert_eq!(r.history.len(), 1);
        assert_eq!(r.history[0].action, HistoryAction::Created);
        assert_eq!(r.history[0].performed_by, "U1");

        assert_eq!(quota_counters(&world).await, (1, 4));
        assert_eq!(world.bus.sent_to(topics::RESERVATION_CREATE).len(), 1);

        // visible to find_by_id with status PENDING
        let loaded = world.service.get(&r.id).await.unwrap();
        assert_eq!(loaded.status, ReservationStatus::Pending);
        assert_eq!(loaded.end_time(), r.reservation_time + Duration::minutes(120));
    }

    #[tokio::test]
    async fn create_defaults_duration_to_session_length() {
        let world = world(RemoteScript::default());
        let mut request = create_request();
        request.duration_minutes = None;
        let r = world.service.create(request, "U1").await.unwrap();
        assert_eq!(r.duration_minutes, 120);
    }

    #[tokio::test]
    async fn create_rejects_missing_contact_and_bad_party_in_one_error() {
        let world = world(RemoteScript::default());
        let mut request = create_request();
        request.customer_phone = None;
        request.customer_email = None;
        request.party_size = 25;
        match world.service.create(request, "U1").await.unwrap_err() {
            DomainError::Validation { fields } => {
                assert!(fields.contains_key("customerPhone"));
                assert!(fields.contains_key("partySize"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        // failed fast: nothing was sent to the bus
        assert_eq!(world.bus.sent_count(), 0);
    }

    #[tokio::test]
    async fn create_rejects_times_outside_booking_window() {
        let world = world(RemoteScript::default());
        let mut request = create_request();
        request.reservation_time = at("2025-01-01T12:30:00Z"); // < 60 min ahead
        assert!(matches!(
            world.service.create(request, "U1").await.unwrap_err(),
            DomainError::Validation { .. }
        ));

        let mut request = create_request();
        request.reservation_time = at("2025-06-01T19:00:00Z"); // > 90 days ahead
        assert!(matches!(
            world.service.create(request, "U1").await.unwrap_err(),
            DomainError::Validation { .. }
        ));
    }

    // Confirm within the deadline.
    #[tokio::test]
    async fn confirm_happy_path() {
        let world = world(RemoteScript::default());
        let r = world.service.create(create_request(), "U1").await.unwrap();

        world.clock.set(at("2025-01-01T12:05:00Z"));
        let confirmed = world.service.confirm(&r.id, "U1").await.unwrap();

        assert_eq!(confirmed.status, ReservationStatus::Confirmed);
        assert_eq!(confirmed.confirmed_at, Some(at("2025-01-01T12:05:00Z")));
        assert_eq!(confirmed.history.len(), 2);
        assert_eq!(confirmed.history[1].action, HistoryAction::Confirmed);
        assert_eq!(world.bus.sent_to(topics::RESERVATION_EVENTS).len(), 1);

        // confirmed_at within [created_at, confirmation_deadline]
        assert!(confirmed.confirmed_at.unwrap() >= confirmed.created_at);
        assert!(confirmed.confirmed_at.unwrap() <= confirmed.confirmation_deadline);
    }

    // Confirming after the deadline changes nothing.
    #[tokio::test]
    async fn confirm_past_deadline_is_rejected() {
        let world = world(RemoteScript::default());
        let r = world.service.create(create_request(), "U1").await.unwrap();

        world.clock.set(at("2025-01-01T12:20:00Z"));
        match world.service.confirm(&r.id, "U1").await.unwrap_err() {
            DomainError::Validation { fields } => {
                assert!(fields.contains_key("confirmationDeadline"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        let reloaded = world.service.get(&r.id).await.unwrap();
        assert_eq!(reloaded.status, ReservationStatus::Pending);
        assert_eq!(reloaded.confirmed_at, None);
    }

    #[tokio::test]
    async fn confirm_by_other_user_is_rejected() {
        let world = world(RemoteScript::default());
        let r = world.service.create(create_request(), "U1").await.unwrap();
        match world.service.confirm(&r.id, "U2").await.unwrap_err() {
            DomainError::Validation { fields } => assert!(fields.contains_key("userId")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    // A stranger (not creator, not owner) cannot cancel.
    #[tokio::test]
    async fn cancel_by_stranger_is_rejected() {
        let world = world(RemoteScript::default()); // owner: false
        let r = world.service.create(create_request(), "U1").await.unwrap();

        match world
            .service
            .cancel(&r.id, "not mine", "U2")
            .await
            .unwrap_err()
        {
            DomainError::Validation { fields } => assert!(fields.contains_key("userId")),
            other => panic!("unexpected error: {:?}", other),
        }
        let reloaded = world.service.get(&r.id).await.unwrap();
        assert_eq!(reloaded.status, ReservationStatus::Pending);
        assert!(world.bus.sent_to(topics::RESERVATION_CANCEL).is_empty());
        assert_eq!(quota_counters(&world).await, (1, 4));
    }

    // The restaurant owner may cancel someone else's reservation.
    #[tokio::test]
    async fn cancel_by_owner_releases_everything() {
        let script = RemoteScript {
            owner: true,
            ..RemoteScript::default()
        };
        let world = world(script);
        let r = world.service.create(create_request(), "U1").await.unwrap();

        let cancelled = world
            .service
            .cancel(&r.id, "Owner closing slot", "U2")
            .await
            .unwrap();

        assert_eq!(cancelled.status, ReservationStatus::Cancelled);
        assert_eq!(
            cancelled.cancellation_reason.as_deref(),
            Some("Owner closing slot")
        );
        assert_eq!(cancelled.table_id, None);
        assert_eq!(quota_counters(&world).await, (0, 0));
        assert_eq!(world.cache.get("T1"), Some(TableStatus::Available));

        let cancel_events = world.bus.sent_to(topics::RESERVATION_CANCEL);
        assert_eq!(cancel_events.len(), 1);
        match &cancel_events[0] {
            OutboundEvent::ReservationCancelled(event) => {
                assert_eq!(event.previous_status, "PENDING");
                assert_eq!(event.reason, "Owner closing slot");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    // Party cannot fit into the remaining slot capacity.
    #[tokio::test]
    async fn create_into_nearly_full_slot_cannot_accommodate() {
        let world = world(RemoteScript::default());
        world.repos.quotas_mut().preload(ReservationQuota {
            current_reservations: 9,
            current_capacity: 96,
            ..ReservationQuota::with_defaults(&slot())
        });

        let mut request = create_request();
        request.party_size = 5;
        match world.service.create(request, "U1").await.unwrap_err() {
            DomainError::Capacity { kind, .. } => {
                assert_eq!(kind, CapacityKind::NoSuitableTables);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(quota_counters(&world).await, (9, 96));
        let page = world
            .service
            .list_by_restaurant("R1", None, None)
            .await
            .unwrap();
        assert_eq!(page.total, 0);
        assert!(world.bus.sent_to(topics::RESERVATION_CREATE).is_empty());
    }

    #[tokio::test]
    async fn create_into_full_slot_is_unavailable() {
        let world = world(RemoteScript::default());
        world.repos.quotas_mut().preload(ReservationQuota {
            current_reservations: 10,
            current_capacity: 40,
            ..ReservationQuota::with_defaults(&slot())
        });
        match world
            .service
            .create(create_request(), "U1")
            .await
            .unwrap_err()
        {
            DomainError::Capacity { kind, slot } => {
                assert_eq!(kind, CapacityKind::NoAvailability);
                assert_eq!(slot, "2025-01-08, 19:00");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    // No table anywhere: the quota claim rolls back exactly.
    #[tokio::test]
    async fn create_without_any_table_rolls_quota_back() {
        let script = RemoteScript {
            table_silent: true, // finder never answers; REST stub has no tables either
            ..RemoteScript::default()
        };
        let world = world(script);
        world.repos.quotas_mut().preload(ReservationQuota {
            current_reservations: 2,
            current_capacity: 10,
            ..ReservationQuota::with_defaults(&slot())
        });

        match world
            .service
            .create(create_request(), "U1")
            .await
            .unwrap_err()
        {
            DomainError::Capacity { kind, .. } => {
                assert_eq!(kind, CapacityKind::NoSuitableTables);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        // exact rollback to the preloaded counters
        assert_eq!(quota_counters(&world).await, (2, 10));
        let page = world
            .service
            .list_by_restaurant("R1", None, None)
            .await
            .unwrap();
        assert_eq!(page.total, 0);
        assert!(world.bus.sent_to(topics::RESERVATION_CREATE).is_empty());
    }

    #[tokio::test]
    async fn unknown_restaurant_fails_before_quota() {
        let script = RemoteScript {
            restaurant_exists: false,
            ..RemoteScript::default()
        };
        let world = world(script);
        assert!(matches!(
            world
                .service
                .create(create_request(), "U1")
                .await
                .unwrap_err(),
            DomainError::NotFound { .. }
        ));
        assert_eq!(quota_counters(&world).await, (0, 0));
    }

    // Quota agrees with the sum of live reservations.
    #[tokio::test]
    async fn quota_tracks_live_reservations() {
        let script = RemoteScript {
            owner: true,
            ..RemoteScript::default()
        };
        let world = world(script);

        let first = world.service.create(create_request(), "U1").await.unwrap();
        let mut second_request = create_request();
        second_request.party_size = 2;
        let _second = world
            .service
            .create(second_request, "U3")
            .await
            .unwrap();
        assert_eq!(quota_counters(&world).await, (2, 6));

        world.service.cancel(&first.id, "plans", "U1").await.unwrap();
        assert_eq!(quota_counters(&world).await, (1, 2));
    }

    // No reservation leaves a terminal state.
    #[tokio::test]
    async fn terminal_states_admit_no_transitions() {
        let world = world(RemoteScript::default());
        let r = world.service.create(create_request(), "U1").await.unwrap();
        world.service.cancel(&r.id, "plans", "U1").await.unwrap();

        assert!(matches!(
            world.service.confirm(&r.id, "U1").await.unwrap_err(),
            DomainError::Validation { .. }
        ));
        assert!(matches!(
            world.service.cancel(&r.id, "again", "U1").await.unwrap_err(),
            DomainError::Validation { .. }
        ));
        assert!(matches!(
            world
                .service
                .update(
                    &r.id,
                    UpdateReservationRequest {
                        party_size: Some(2),
                        ..Default::default()
                    },
                    "U1"
                )
                .await
                .unwrap_err(),
            DomainError::Validation { .. }
        ));
    }

    #[tokio::test]
    async fn menu_selections_snapshot_prices_and_skip_stale_items() {
        let world = world(RemoteScript::default());
        let menu = world.repos.menu_items();
        menu.upsert(MenuItem {
            id: "M1".to_string(),
            restaurant_id: "R1".to_string(),
            name: "Margherita".to_string(),
            description: None,
            price_cents: 1250,
            category_id: None,
            available: true,
            active: true,
        })
        .await
        .unwrap();
        menu.upsert(MenuItem {
            id: "M2".to_string(),
            restaurant_id: "R1".to_string(),
            name: "Retired".to_string(),
            description: None,
            price_cents: 900,
            category_id: None,
            available: true,
            active: false,
        })
        .await
        .unwrap();
        menu.upsert(MenuItem {
            id: "M3".to_string(),
            restaurant_id: "R2".to_string(),
            name: "Elsewhere".to_string(),
            description: None,
            price_cents: 700,
            category_id: None,
            available: true,
            active: true,
        })
        .await
        .unwrap();

        let mut request = create_request();
        request.menu_items = vec![
            MenuItemSelection {
                menu_item_id: "M1".to_string(),
                quantity: 2,
                special_instructions: Some("no basil".to_string()),
            },
            MenuItemSelection {
                menu_item_id: "M2".to_string(),
                quantity: 1,
                special_instructions: None,
            },
            MenuItemSelection {
                menu_item_id: "M3".to_string(),
                quantity: 1,
                special_instructions: None,
            },
            MenuItemSelection {
                menu_item_id: "ghost".to_string(),
                quantity: 1,
                special_instructions: None,
            },
        ];
        let r = world.service.create(request, "U1").await.unwrap();

        assert_eq!(r.menu_items.len(), 1);
        assert_eq!(r.menu_items[0].menu_item_id, "M1");
        assert_eq!(r.menu_items[0].price_cents, 1250);
        assert_eq!(r.menu_items[0].quantity, 2);
    }

    #[tokio::test]
    async fn add_menu_items_requires_live_status_and_nonempty_input() {
        let world = world(RemoteScript::default());
        let r = world.service.create(create_request(), "U1").await.unwrap();

        assert!(matches!(
            world
                .service
                .add_menu_items(&r.id, Vec::new(), "U1")
                .await
                .unwrap_err(),
            DomainError::Validation { .. }
        ));

        world.repos.menu_items().upsert(MenuItem {
            id: "M1".to_string(),
            restaurant_id: "R1".to_string(),
            name: "Margherita".to_string(),
            description: None,
            price_cents: 1250,
            category_id: None,
            available: true,
            active: true,
        })
        .await
        .unwrap();
        let selections = vec![MenuItemSelection {
            menu_item_id: "M1".to_string(),
            quantity: 1,
            special_instructions: None,
        }];
        let updated = world
            .service
            .add_menu_items(&r.id, selections.clone(), "U1")
            .await
            .unwrap();
        assert_eq!(updated.menu_items.len(), 1);
        assert_eq!(
            updated.history.last().unwrap().action,
            HistoryAction::MenuItemsAdded
        );

        world.service.cancel(&r.id, "done", "U1").await.unwrap();
        assert!(matches!(
            world
                .service
                .add_menu_items(&r.id, selections, "U1")
                .await
                .unwrap_err(),
            DomainError::Validation { .. }
        ));
    }

    #[tokio::test]
    async fn update_swaps_quota_and_reassigns_table() {
        let world = world(RemoteScript::default());
        let r = world.service.create(create_request(), "U1").await.unwrap();
        assert_eq!(quota_counters(&world).await, (1, 4));

        let patch = UpdateReservationRequest {
            reservation_time: Some(at("2025-01-09T18:00:00Z")),
            party_size: Some(6),
            ..Default::default()
        };
        let updated = world.service.update(&r.id, patch, "U1").await.unwrap();

        assert_eq!(updated.reservation_time, at("2025-01-09T18:00:00Z"));
        assert_eq!(updated.party_size, 6);
        assert_eq!(updated.table_id.as_deref(), Some("T1"));

        // old slot emptied, new slot claimed
        assert_eq!(quota_counters(&world).await, (0, 0));
        let new_slot = SlotKey::for_reservation("R1", at("2025-01-09T18:00:00Z"));
        let new_quota = world
            .repos
            .quotas_mut()
            .get(&new_slot)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(new_quota.current_reservations, 1);
        assert_eq!(new_quota.current_capacity, 6);

        let modified = updated.history.last().unwrap();
        assert_eq!(modified.action, HistoryAction::Modified);
        assert!(modified.details.contains("partySize: 4 -> 6"));
        assert!(modified.details.contains("time:"));
        assert_eq!(world.bus.sent_to(topics::RESERVATION_UPDATE).len(), 1);
    }

    #[tokio::test]
    async fn update_into_full_slot_restores_original_claim() {
        let world = world(RemoteScript::default());
        let r = world.service.create(create_request(), "U1").await.unwrap();

        let new_time = at("2025-01-09T18:00:00Z");
        let new_slot = SlotKey::for_reservation("R1", new_time);
        world.repos.quotas_mut().preload(ReservationQuota {
            current_reservations: 10,
            current_capacity: 40,
            ..ReservationQuota::with_defaults(&new_slot)
        });

        let patch = UpdateReservationRequest {
            reservation_time: Some(new_time),
            ..Default::default()
        };
        assert!(matches!(
            world.service.update(&r.id, patch, "U1").await.unwrap_err(),
            DomainError::Capacity { .. }
        ));

        // original claim re-booked, aggregate untouched
        assert_eq!(quota_counters(&world).await, (1, 4));
        let reloaded = world.service.get(&r.id).await.unwrap();
        assert_eq!(reloaded.reservation_time, at("2025-01-08T19:00:00Z"));
        assert_eq!(reloaded.party_size, 4);
    }

    #[tokio::test]
    async fn update_by_other_user_is_rejected() {
        let world = world(RemoteScript::default());
        let r = world.service.create(create_request(), "U1").await.unwrap();
        let patch = UpdateReservationRequest {
            party_size: Some(2),
            ..Default::default()
        };
        match world.service.update(&r.id, patch, "U9").await.unwrap_err() {
            DomainError::Validation { fields } => assert!(fields.contains_key("userId")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn get_unknown_reservation_is_not_found() {
        let world = world(RemoteScript::default());
        assert!(matches!(
            world.service.get("missing").await.unwrap_err(),
            DomainError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn list_by_user_pages_newest_first() {
        let world = world(RemoteScript::default());
        let _first = world.service.create(create_request(), "U1").await.unwrap();
        let mut later = create_request();
        later.reservation_time = at("2025-01-10T19:00:00Z");
        let later = world.service.create(later, "U1").await.unwrap();

        let page = world.service.list_by_user("U1", None, None).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].id, later.id);

        let other = world.service.list_by_user("U2", None, None).await.unwrap();
        assert_eq!(other.total, 0);
    }
}
