//! Reservation engine: validate-then-commit orchestration.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use common::{ReservationId, SpaceId, UserId};
use domain::reservation::validate_lines;
use domain::{
    Actor, Amendment, AvailabilityReport, Element, ElementLine, Reservation, ReservationDraft,
    ReservationError, ReservationEvent, ReservationStatus, Role, Space, StockReport, TimeWindow,
};
use reservation_store::{
    CatalogStore, LedgerStamp, ReservationQuery, ReservationStore, ScheduleSnapshot,
};

use crate::clock::{Clock, SystemClock};
use crate::commands::SubmitReservation;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::identity::RoleDirectory;

/// Orchestrates the Availability Validator, the Stock Allocator and the
/// approval state machine over a reservation store.
///
/// Every write runs as a read-validate-commit cycle against one schedule
/// snapshot. The store rejects the commit if the snapshot went stale, in
/// which case the cycle is repeated up to `max_commit_attempts` times.
pub struct ReservationEngine<S, D>
where
    S: ReservationStore + CatalogStore,
    D: RoleDirectory,
{
    store: S,
    directory: D,
    config: EngineConfig,
    clock: Arc<dyn Clock>,
}

impl<S, D> ReservationEngine<S, D>
where
    S: ReservationStore + CatalogStore,
    D: RoleDirectory,
{
    pub fn new(store: S, directory: D, config: EngineConfig) -> Self {
        Self {
            store,
            directory,
            config,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the clock used for timestamps and the past-date rule.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Submits a new reservation as pending.
    ///
    /// Input rules are checked before any store access. The space, time
    /// window and stock are then validated and the reservation persisted
    /// against the same snapshot.
    #[tracing::instrument(skip(self, command), fields(space_id = %command.space_id, requester_id = %command.requester_id))]
    pub async fn submit(&self, command: SubmitReservation) -> Result<Reservation> {
        let result = self.submit_inner(command).await;
        if result.is_ok() {
            metrics::counter!("reservations_submitted_total").increment(1);
        }
        self.observe("submit", result)
    }

    async fn submit_inner(&self, command: SubmitReservation) -> Result<Reservation> {
        let window = TimeWindow::new(command.date, command.start_time, command.end_time)?;
        let draft = ReservationDraft {
            space_id: command.space_id,
            requester_id: command.requester_id,
            window,
            motive: command.motive,
            lines: command.lines,
        };
        let (reservation, event) = Reservation::submit(
            draft,
            &self.config.submission_rules(),
            self.clock.today(),
            self.clock.now(),
        )?;

        self.with_retries("submit", || self.commit_new(&reservation, &event))
            .await?;

        tracing::info!(
            reservation_id = %reservation.id(),
            window = %reservation.window(),
            "reservation submitted"
        );
        Ok(reservation)
    }

    async fn commit_new(&self, reservation: &Reservation, event: &ReservationEvent) -> Result<()> {
        let snapshot = self.snapshot_for(reservation).await?;
        self.validate(
            &snapshot,
            &reservation.window(),
            reservation.lines(),
            None,
        )?;
        self.store.insert(reservation, event, &snapshot.stamp).await?;
        Ok(())
    }

    /// Approves a pending reservation after re-validating its window and
    /// stock with its own hold excluded.
    #[tracing::instrument(skip(self))]
    pub async fn approve(
        &self,
        reservation_id: ReservationId,
        actor_id: UserId,
    ) -> Result<Reservation> {
        let result: Result<Reservation> = async {
            let actor = self.known_actor(actor_id).await?;
            self.with_retries("approve", || self.try_approve(reservation_id, &actor))
                .await
        }
        .await;
        self.observe("approve", result)
    }

    async fn try_approve(&self, reservation_id: ReservationId, actor: &Actor) -> Result<Reservation> {
        let mut reservation = self.load(reservation_id).await?;
        let event = reservation.approve(actor, self.clock.now())?;
        reservation.apply(&event);

        let snapshot = self.snapshot_for(&reservation).await?;
        self.validate(
            &snapshot,
            &reservation.window(),
            reservation.lines(),
            Some(reservation_id),
        )?;
        self.store
            .update(&reservation, &event, &snapshot.stamp)
            .await?;

        tracing::info!(%reservation_id, reviewer = %actor.user_id, "reservation approved");
        Ok(reservation)
    }

    /// Rejects a pending reservation. The reason must not be blank.
    #[tracing::instrument(skip(self, reason))]
    pub async fn reject(
        &self,
        reservation_id: ReservationId,
        actor_id: UserId,
        reason: &str,
    ) -> Result<Reservation> {
        let result: Result<Reservation> = async {
            if reason.trim().is_empty() {
                return Err(domain::ValidationError::MissingReason.into());
            }
            let actor = self.known_actor(actor_id).await?;
            let reservation = self
                .with_retries("reject", || {
                    self.try_release(reservation_id, |r| {
                        r.reject(&actor, reason, self.clock.now())
                    })
                })
                .await?;
            tracing::info!(%reservation_id, reviewer = %actor_id, "reservation rejected");
            Ok(reservation)
        }
        .await;
        self.observe("reject", result)
    }

    /// Cancels a pending or approved reservation.
    ///
    /// `force` is only honored for administrators cancelling someone
    /// else's approved reservation.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(
        &self,
        reservation_id: ReservationId,
        actor_id: UserId,
        force: bool,
    ) -> Result<Reservation> {
        let result: Result<Reservation> = async {
            let actor = self.actor_or_requester(actor_id).await?;
            let reservation = self
                .with_retries("cancel", || {
                    self.try_release(reservation_id, |r| r.cancel(&actor, force, self.clock.now()))
                })
                .await?;
            tracing::info!(%reservation_id, cancelled_by = %actor_id, "reservation cancelled");
            Ok(reservation)
        }
        .await;
        self.observe("cancel", result)
    }

    /// Applies a transition that only removes holds. No stamp is needed.
    async fn try_release<F>(&self, reservation_id: ReservationId, decide: F) -> Result<Reservation>
    where
        F: FnOnce(&Reservation) -> std::result::Result<ReservationEvent, ReservationError>,
    {
        let mut reservation = self.load(reservation_id).await?;
        let event = decide(&reservation)?;
        reservation.apply(&event);
        self.store
            .update(&reservation, &event, &LedgerStamp::new())
            .await?;
        Ok(reservation)
    }

    /// Edits a pending reservation and re-validates the result with its own
    /// hold excluded.
    #[tracing::instrument(skip(self, amendment))]
    pub async fn amend(
        &self,
        reservation_id: ReservationId,
        actor_id: UserId,
        amendment: Amendment,
    ) -> Result<Reservation> {
        let result: Result<Reservation> = async {
            let actor = self.actor_or_requester(actor_id).await?;
            self.with_retries("amend", || self.try_amend(reservation_id, &actor, &amendment))
                .await
        }
        .await;
        self.observe("amend", result)
    }

    async fn try_amend(
        &self,
        reservation_id: ReservationId,
        actor: &Actor,
        amendment: &Amendment,
    ) -> Result<Reservation> {
        let mut reservation = self.load(reservation_id).await?;
        let event = reservation.amend(
            actor,
            amendment.clone(),
            &self.config.submission_rules(),
            self.clock.today(),
            self.clock.now(),
        )?;
        reservation.apply(&event);

        let snapshot = self.snapshot_for(&reservation).await?;
        self.validate(
            &snapshot,
            &reservation.window(),
            reservation.lines(),
            Some(reservation_id),
        )?;
        self.store
            .update(&reservation, &event, &snapshot.stamp)
            .await?;

        tracing::info!(%reservation_id, window = %reservation.window(), "reservation amended");
        Ok(reservation)
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Reads one reservation. Requesters may only read their own.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, reservation_id: ReservationId, actor_id: UserId) -> Result<Reservation> {
        let actor = self.actor_or_requester(actor_id).await?;
        let reservation = self.load(reservation_id).await?;
        if !reservation.is_visible_to(&actor) {
            return Err(EngineError::Forbidden(format!(
                "{} may not read reservation {}",
                actor.role, reservation_id
            )));
        }
        Ok(reservation)
    }

    /// Lists reservations. Actors who may not see every reservation are
    /// always scoped to their own.
    #[tracing::instrument(skip(self))]
    pub async fn list_reservations(
        &self,
        actor_id: UserId,
        mut query: ReservationQuery,
    ) -> Result<Vec<Reservation>> {
        let actor = self.actor_or_requester(actor_id).await?;
        if !actor.role.sees_all_reservations() {
            query.requester_id = Some(actor.user_id);
        }
        Ok(self.store.list(query).await?)
    }

    /// The approval queue, oldest submission first.
    #[tracing::instrument(skip(self))]
    pub async fn pending(&self, actor_id: UserId) -> Result<Vec<Reservation>> {
        let actor = self.known_actor(actor_id).await?;
        if !actor.role.can_review() {
            return Err(EngineError::Forbidden(format!(
                "{} may not read the approval queue",
                actor.role
            )));
        }
        let mut queue = self
            .store
            .list(ReservationQuery::new().status(ReservationStatus::Pending))
            .await?;
        queue.sort_by_key(Reservation::created_at);
        Ok(queue)
    }

    /// The event trail of one reservation, with the same visibility as `get`.
    #[tracing::instrument(skip(self))]
    pub async fn history(
        &self,
        reservation_id: ReservationId,
        actor_id: UserId,
    ) -> Result<Vec<ReservationEvent>> {
        self.get(reservation_id, actor_id).await?;
        Ok(self.store.history(reservation_id).await?)
    }

    /// Checks whether `window` is free on `space_id`.
    ///
    /// `excluding` removes one reservation from the counted set, so a
    /// reservation never conflicts with itself.
    #[tracing::instrument(skip(self))]
    pub async fn check_availability(
        &self,
        space_id: SpaceId,
        window: TimeWindow,
        excluding: Option<ReservationId>,
    ) -> Result<AvailabilityReport> {
        let snapshot = self.store.load_snapshot(space_id, window.date(), &[]).await?;
        Ok(domain::check_availability(
            &snapshot.space,
            &window,
            &snapshot.reservations,
            excluding,
            self.config.hold_policy,
        ))
    }

    /// Checks whether every line can be lent for `window`.
    #[tracing::instrument(skip(self, lines))]
    pub async fn check_stock(
        &self,
        lines: &[ElementLine],
        window: TimeWindow,
        excluding: Option<ReservationId>,
    ) -> Result<StockReport> {
        validate_lines(lines)?;

        let mut elements = Vec::with_capacity(lines.len());
        for line in lines {
            let element = self
                .store
                .get_element(line.element_id)
                .await?
                .ok_or(EngineError::ElementNotFound(line.element_id))?;
            elements.push(element);
        }

        let reservations = self
            .store
            .list(
                ReservationQuery::new()
                    .on(window.date())
                    .statuses(vec![ReservationStatus::Pending, ReservationStatus::Approved]),
            )
            .await?;

        Ok(domain::check_stock(
            lines,
            &window,
            &elements,
            &reservations,
            excluding,
            self.config.hold_policy,
        )?)
    }

    /// Catalog spaces, optionally only those accepting reservations.
    pub async fn spaces(&self, available_only: bool) -> Result<Vec<Space>> {
        let mut spaces = self.store.list_spaces().await?;
        if available_only {
            spaces.retain(|s| s.status.accepts_reservations());
        }
        Ok(spaces)
    }

    pub async fn elements(&self) -> Result<Vec<Element>> {
        Ok(self.store.list_elements().await?)
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    /// Resolves an actor the directory must know. Used for reviewer
    /// operations.
    async fn known_actor(&self, user_id: UserId) -> Result<Actor> {
        match self.directory.role_of(user_id).await? {
            Some(role) => Ok(Actor::new(user_id, role)),
            None => Err(EngineError::Forbidden(format!("unknown user {}", user_id))),
        }
    }

    /// Resolves an actor, treating users the directory does not know as
    /// plain requesters.
    async fn actor_or_requester(&self, user_id: UserId) -> Result<Actor> {
        let role = self.directory.role_of(user_id).await?;
        Ok(Actor::new(user_id, role.unwrap_or(Role::Requester)))
    }

    async fn load(&self, reservation_id: ReservationId) -> Result<Reservation> {
        self.store
            .get(reservation_id)
            .await?
            .ok_or(EngineError::ReservationNotFound(reservation_id))
    }

    async fn snapshot_for(&self, reservation: &Reservation) -> Result<ScheduleSnapshot> {
        let element_ids: Vec<_> = reservation.element_ids().collect();
        Ok(self
            .store
            .load_snapshot(reservation.space_id(), reservation.date(), &element_ids)
            .await?)
    }

    /// Runs the Availability Validator, then the Stock Allocator.
    fn validate(
        &self,
        snapshot: &ScheduleSnapshot,
        window: &TimeWindow,
        lines: &[ElementLine],
        excluding: Option<ReservationId>,
    ) -> Result<()> {
        let started = Instant::now();
        let result = self.run_validators(snapshot, window, lines, excluding);
        metrics::histogram!("reservation_validation_seconds")
            .record(started.elapsed().as_secs_f64());
        result
    }

    fn run_validators(
        &self,
        snapshot: &ScheduleSnapshot,
        window: &TimeWindow,
        lines: &[ElementLine],
        excluding: Option<ReservationId>,
    ) -> Result<()> {
        let policy = self.config.hold_policy;

        let availability = domain::check_availability(
            &snapshot.space,
            window,
            &snapshot.reservations,
            excluding,
            policy,
        );
        if availability.space_unavailable() {
            return Err(EngineError::SpaceUnavailable {
                space_id: snapshot.space.id,
                status: availability.space_status,
            });
        }
        if !availability.available {
            tracing::warn!(
                space_id = %snapshot.space.id,
                %window,
                conflicts = availability.conflicts.len(),
                "time conflict"
            );
            return Err(EngineError::TimeConflict {
                conflicts: availability.conflicts,
            });
        }

        let stock = domain::check_stock(
            lines,
            window,
            &snapshot.elements,
            &snapshot.reservations,
            excluding,
            policy,
        )?;
        if !stock.sufficient {
            tracing::warn!(%window, shortfalls = stock.shortfalls.len(), "stock shortfall");
            return Err(EngineError::StockShortfall {
                shortfalls: stock.shortfalls,
            });
        }

        Ok(())
    }

    /// Repeats a read-validate-commit cycle while the commit loses a race.
    async fn with_retries<T, F, Fut>(&self, operation: &'static str, mut attempt: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut tries = 1;
        loop {
            match attempt().await {
                Err(err) if err.is_commit_conflict() && tries < self.config.max_commit_attempts => {
                    metrics::counter!("reservation_commit_retries_total", "operation" => operation)
                        .increment(1);
                    tracing::warn!(operation, attempt = tries, error = %err, "commit conflict, retrying");
                    tries += 1;
                }
                other => return other,
            }
        }
    }

    /// Records transition metrics for a write's outcome.
    fn observe<T>(&self, transition: &'static str, result: Result<T>) -> Result<T> {
        match &result {
            Ok(_) => {
                metrics::counter!("reservation_transitions_total", "transition" => transition)
                    .increment(1);
            }
            Err(err) => {
                metrics::counter!(
                    "reservation_rejections_total",
                    "reason" => err.kind().as_str(),
                    "operation" => transition
                )
                .increment(1);
                tracing::debug!(operation = transition, error = %err, "operation refused");
            }
        }
        result
    }
}
