use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use common::{ElementId, ReservationId, SpaceId, Version};
use domain::{Element, Reservation, ReservationEvent, ReservationEventKind, Space};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::{
    LedgerKey, LedgerStamp, ReservationQuery, Result, ScheduleSnapshot, StoreError,
    store::{
        CatalogStore, ReservationStore, expected_prior, validate_guard, validate_insert,
        validate_write,
    },
};

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const EXCLUSION_VIOLATION: &str = "23P01";

/// PostgreSQL-backed catalog and reservation store.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_space(row: PgRow) -> Result<Space> {
        Ok(Space {
            id: SpaceId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            kind: row.try_get::<String, _>("kind")?.parse()?,
            capacity: to_u32(row.try_get("capacity")?, "capacity")?,
            location: row.try_get("location")?,
            description: row.try_get("description")?,
            status: row.try_get::<String, _>("status")?.parse()?,
        })
    }

    fn row_to_element(row: PgRow) -> Result<Element> {
        Ok(Element {
            id: ElementId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            category: row.try_get::<String, _>("category")?.parse()?,
            stock_total: to_u32(row.try_get("stock_total")?, "stock_total")?,
            status: row.try_get::<String, _>("status")?.parse()?,
        })
    }

    fn row_to_reservation(row: PgRow) -> Result<Reservation> {
        let state: serde_json::Value = row.try_get("state")?;
        Ok(serde_json::from_value(state)?)
    }

    fn row_to_event(row: PgRow) -> Result<ReservationEvent> {
        let payload: serde_json::Value = row.try_get("payload")?;
        Ok(serde_json::from_value(payload)?)
    }

    /// Verifies and bumps every stamped ledger key inside `tx`.
    ///
    /// Keys are visited in stamp order so concurrent writers lock rows in
    /// the same order. A writer blocked on a row re-checks the guard after
    /// the other transaction commits and then finds the version moved.
    async fn advance_ledger(tx: &mut Transaction<'_, Postgres>, stamp: &LedgerStamp) -> Result<()> {
        for (key, expected) in stamp.iter() {
            let updated = if *expected == Version::initial() {
                sqlx::query(
                    "INSERT INTO schedule_ledger (ledger_key, version) VALUES ($1, 1) ON CONFLICT (ledger_key) DO NOTHING",
                )
                .bind(key.to_string())
                .execute(&mut **tx)
                .await?
                .rows_affected()
            } else {
                sqlx::query(
                    "UPDATE schedule_ledger SET version = version + 1 WHERE ledger_key = $1 AND version = $2",
                )
                .bind(key.to_string())
                .bind(expected.as_i64())
                .execute(&mut **tx)
                .await?
                .rows_affected()
            };

            if updated == 0 {
                let actual: Option<i64> =
                    sqlx::query_scalar("SELECT version FROM schedule_ledger WHERE ledger_key = $1")
                        .bind(key.to_string())
                        .fetch_optional(&mut **tx)
                        .await?;
                metrics::counter!("reservation_ledger_conflicts_total").increment(1);
                tracing::debug!(%key, %expected, "ledger key moved since snapshot");
                return Err(StoreError::ConcurrencyConflict {
                    key: *key,
                    expected: *expected,
                    actual: Version::new(actual.unwrap_or(0)),
                });
            }
        }
        Ok(())
    }

    async fn insert_lines(
        tx: &mut Transaction<'_, Postgres>,
        reservation: &Reservation,
    ) -> Result<()> {
        for line in reservation.lines() {
            sqlx::query(
                "INSERT INTO reservation_elements (reservation_id, element_id, quantity) VALUES ($1, $2, $3)",
            )
            .bind(reservation.id().as_uuid())
            .bind(line.element_id.as_uuid())
            .bind(i64::from(line.quantity))
            .execute(&mut **tx)
            .await
            .map_err(|e| {
                if is_violation(&e, FOREIGN_KEY_VIOLATION) {
                    return StoreError::ElementNotFound(line.element_id);
                }
                StoreError::Database(e)
            })?;
        }
        Ok(())
    }

    async fn insert_event(
        tx: &mut Transaction<'_, Postgres>,
        event: &ReservationEvent,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reservation_events (reservation_id, sequence, event_type, actor, occurred_at, payload)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(event.reservation_id.as_uuid())
        .bind(event.sequence.as_i64())
        .bind(event.event_type())
        .bind(event.actor.as_uuid())
        .bind(event.occurred_at)
        .bind(serde_json::to_value(event)?)
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            if is_violation(&e, UNIQUE_VIOLATION) {
                return StoreError::VersionConflict {
                    reservation_id: event.reservation_id,
                    expected: expected_prior(event),
                    actual: event.sequence,
                };
            }
            StoreError::Database(e)
        })?;
        Ok(())
    }
}

fn to_u32(value: i64, column: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| StoreError::Decode(format!("{column} out of range: {value}")))
}

fn is_violation(e: &sqlx::Error, code: &str) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.code().as_deref() == Some(code))
}

/// Maps constraint violations on the reservations table to store errors.
fn reservation_write_error(e: sqlx::Error, reservation: &Reservation) -> StoreError {
    if let sqlx::Error::Database(ref db) = e {
        match db.code().as_deref() {
            Some(EXCLUSION_VIOLATION) => {
                return StoreError::OverlapViolation(
                    db.constraint().unwrap_or("no_overlapping_approved").to_string(),
                );
            }
            Some(UNIQUE_VIOLATION) => {
                return StoreError::DuplicateReservation(reservation.id());
            }
            Some(FOREIGN_KEY_VIOLATION) => {
                return StoreError::SpaceNotFound(reservation.space_id());
            }
            _ => {}
        }
    }
    StoreError::Database(e)
}

#[async_trait]
impl CatalogStore for PostgresStore {
    #[tracing::instrument(skip(self, space), fields(space_id = %space.id))]
    async fn put_space(&self, space: Space) -> Result<()> {
        space.validate()?;
        sqlx::query(
            r#"
            INSERT INTO spaces (id, name, kind, capacity, location, description, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                kind = EXCLUDED.kind,
                capacity = EXCLUDED.capacity,
                location = EXCLUDED.location,
                description = EXCLUDED.description,
                status = EXCLUDED.status
            "#,
        )
        .bind(space.id.as_uuid())
        .bind(&space.name)
        .bind(space.kind.as_str())
        .bind(i64::from(space.capacity))
        .bind(&space.location)
        .bind(&space.description)
        .bind(space.status.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_space(&self, space_id: SpaceId) -> Result<Option<Space>> {
        let row = sqlx::query(
            "SELECT id, name, kind, capacity, location, description, status FROM spaces WHERE id = $1",
        )
        .bind(space_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::row_to_space).transpose()
    }

    async fn list_spaces(&self) -> Result<Vec<Space>> {
        let rows = sqlx::query(
            "SELECT id, name, kind, capacity, location, description, status FROM spaces ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_space).collect()
    }

    #[tracing::instrument(skip(self))]
    async fn delete_space(&self, space_id: SpaceId) -> Result<()> {
        let result = sqlx::query("DELETE FROM spaces WHERE id = $1")
            .bind(space_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_violation(&e, FOREIGN_KEY_VIOLATION) {
                    return StoreError::SpaceInUse(space_id);
                }
                StoreError::Database(e)
            })?;
        if result.rows_affected() == 0 {
            return Err(StoreError::SpaceNotFound(space_id));
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, element), fields(element_id = %element.id))]
    async fn put_element(&self, element: Element) -> Result<()> {
        element.validate()?;
        sqlx::query(
            r#"
            INSERT INTO elements (id, name, category, stock_total, status)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                category = EXCLUDED.category,
                stock_total = EXCLUDED.stock_total,
                status = EXCLUDED.status
            "#,
        )
        .bind(element.id.as_uuid())
        .bind(&element.name)
        .bind(element.category.as_str())
        .bind(i64::from(element.stock_total))
        .bind(element.status.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_element(&self, element_id: ElementId) -> Result<Option<Element>> {
        let row = sqlx::query(
            "SELECT id, name, category, stock_total, status FROM elements WHERE id = $1",
        )
        .bind(element_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::row_to_element).transpose()
    }

    async fn list_elements(&self) -> Result<Vec<Element>> {
        let rows = sqlx::query(
            "SELECT id, name, category, stock_total, status FROM elements ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_element).collect()
    }

    #[tracing::instrument(skip(self))]
    async fn delete_element(&self, element_id: ElementId) -> Result<()> {
        let result = sqlx::query("DELETE FROM elements WHERE id = $1")
            .bind(element_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_violation(&e, FOREIGN_KEY_VIOLATION) {
                    return StoreError::ElementInUse(element_id);
                }
                StoreError::Database(e)
            })?;
        if result.rows_affected() == 0 {
            return Err(StoreError::ElementNotFound(element_id));
        }
        Ok(())
    }
}

#[async_trait]
impl ReservationStore for PostgresStore {
    #[tracing::instrument(skip(self, element_ids), fields(elements = element_ids.len()))]
    async fn load_snapshot(
        &self,
        space_id: SpaceId,
        date: NaiveDate,
        element_ids: &[ElementId],
    ) -> Result<ScheduleSnapshot> {
        let keys = LedgerKey::for_schedule(space_id, date, element_ids.iter().copied());
        let key_names: Vec<String> = keys.iter().map(ToString::to_string).collect();
        let element_uuids: Vec<Uuid> = element_ids.iter().map(ElementId::as_uuid).collect();

        // One snapshot for every read below.
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;

        // Ledger first: a write this read misses must have moved a key.
        let versions: HashMap<String, i64> = sqlx::query(
            "SELECT ledger_key, version FROM schedule_ledger WHERE ledger_key = ANY($1)",
        )
        .bind(&key_names)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .map(|row| -> Result<(String, i64)> {
            Ok((row.try_get("ledger_key")?, row.try_get("version")?))
        })
        .collect::<Result<_>>()?;

        let stamp = keys
            .into_iter()
            .zip(&key_names)
            .map(|(key, name)| {
                let version = versions.get(name).copied().unwrap_or(0);
                (key, Version::new(version))
            })
            .collect();

        let space = sqlx::query(
            "SELECT id, name, kind, capacity, location, description, status FROM spaces WHERE id = $1",
        )
        .bind(space_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?
        .map(Self::row_to_space)
        .transpose()?
        .ok_or(StoreError::SpaceNotFound(space_id))?;

        let found: Vec<Element> = sqlx::query(
            "SELECT id, name, category, stock_total, status FROM elements WHERE id = ANY($1)",
        )
        .bind(&element_uuids)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .map(Self::row_to_element)
        .collect::<Result<_>>()?;
        let elements = element_ids
            .iter()
            .map(|id| {
                found
                    .iter()
                    .find(|e| e.id == *id)
                    .cloned()
                    .ok_or(StoreError::ElementNotFound(*id))
            })
            .collect::<Result<Vec<_>>>()?;

        let reservations = sqlx::query(
            r#"
            SELECT r.state
            FROM reservations r
            WHERE r.reservation_date = $1
              AND r.status IN ('pending', 'approved')
              AND (
                r.space_id = $2
                OR EXISTS (
                    SELECT 1 FROM reservation_elements re
                    WHERE re.reservation_id = r.id AND re.element_id = ANY($3)
                )
              )
            ORDER BY r.start_time ASC
            "#,
        )
        .bind(date)
        .bind(space_id.as_uuid())
        .bind(&element_uuids)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .map(Self::row_to_reservation)
        .collect::<Result<Vec<_>>>()?;

        tx.commit().await?;

        Ok(ScheduleSnapshot {
            space,
            elements,
            reservations,
            stamp,
        })
    }

    #[tracing::instrument(skip_all, fields(reservation_id = %reservation.id()))]
    async fn insert(
        &self,
        reservation: &Reservation,
        event: &ReservationEvent,
        stamp: &LedgerStamp,
    ) -> Result<()> {
        validate_insert(reservation, event)?;
        validate_guard(reservation, event, stamp)?;

        let mut tx = self.pool.begin().await?;
        Self::advance_ledger(&mut tx, stamp).await?;

        let window = reservation.window();
        sqlx::query(
            r#"
            INSERT INTO reservations
                (id, space_id, requester_id, reservation_date, start_time, end_time, status, version, created_at, state)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(reservation.id().as_uuid())
        .bind(reservation.space_id().as_uuid())
        .bind(reservation.requester_id().as_uuid())
        .bind(window.date())
        .bind(window.start())
        .bind(window.end())
        .bind(reservation.status().as_str())
        .bind(reservation.version().as_i64())
        .bind(reservation.created_at())
        .bind(serde_json::to_value(reservation)?)
        .execute(&mut *tx)
        .await
        .map_err(|e| reservation_write_error(e, reservation))?;

        Self::insert_lines(&mut tx, reservation).await?;
        Self::insert_event(&mut tx, event).await?;

        tx.commit().await?;
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(reservation_id = %reservation.id(), event_type = event.event_type()))]
    async fn update(
        &self,
        reservation: &Reservation,
        event: &ReservationEvent,
        stamp: &LedgerStamp,
    ) -> Result<()> {
        validate_write(reservation, event)?;
        validate_guard(reservation, event, stamp)?;

        let mut tx = self.pool.begin().await?;
        Self::advance_ledger(&mut tx, stamp).await?;

        let expected = expected_prior(event);
        let window = reservation.window();
        let result = sqlx::query(
            r#"
            UPDATE reservations
            SET reservation_date = $2, start_time = $3, end_time = $4, status = $5, version = $6, state = $7
            WHERE id = $1 AND version = $8
            "#,
        )
        .bind(reservation.id().as_uuid())
        .bind(window.date())
        .bind(window.start())
        .bind(window.end())
        .bind(reservation.status().as_str())
        .bind(reservation.version().as_i64())
        .bind(serde_json::to_value(reservation)?)
        .bind(expected.as_i64())
        .execute(&mut *tx)
        .await
        .map_err(|e| reservation_write_error(e, reservation))?;

        if result.rows_affected() == 0 {
            let actual: Option<i64> =
                sqlx::query_scalar("SELECT version FROM reservations WHERE id = $1")
                    .bind(reservation.id().as_uuid())
                    .fetch_optional(&mut *tx)
                    .await?;
            return Err(match actual {
                Some(actual) => StoreError::VersionConflict {
                    reservation_id: reservation.id(),
                    expected,
                    actual: Version::new(actual),
                },
                None => StoreError::ReservationNotFound(reservation.id()),
            });
        }

        if matches!(event.kind, ReservationEventKind::Amended(_)) {
            sqlx::query("DELETE FROM reservation_elements WHERE reservation_id = $1")
                .bind(reservation.id().as_uuid())
                .execute(&mut *tx)
                .await?;
            Self::insert_lines(&mut tx, reservation).await?;
        }
        Self::insert_event(&mut tx, event).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, reservation_id: ReservationId) -> Result<Option<Reservation>> {
        let row = sqlx::query("SELECT state FROM reservations WHERE id = $1")
            .bind(reservation_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_reservation).transpose()
    }

    async fn list(&self, query: ReservationQuery) -> Result<Vec<Reservation>> {
        let mut sql = String::from("SELECT state FROM reservations WHERE 1=1");
        let mut param_count = 0;

        // Build dynamic query
        if query.space_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND space_id = ${param_count}"));
        }
        if query.requester_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND requester_id = ${param_count}"));
        }
        if query.statuses.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND status = ANY(${param_count})"));
        }
        if query.from_date.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND reservation_date >= ${param_count}"));
        }
        if query.to_date.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND reservation_date <= ${param_count}"));
        }

        sql.push_str(" ORDER BY reservation_date ASC, start_time ASC, created_at ASC");

        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }
        if query.offset.is_some() {
            param_count += 1;
            sql.push_str(&format!(" OFFSET ${param_count}"));
        }

        let mut sqlx_query = sqlx::query(&sql);

        if let Some(space_id) = query.space_id {
            sqlx_query = sqlx_query.bind(space_id.as_uuid());
        }
        if let Some(requester_id) = query.requester_id {
            sqlx_query = sqlx_query.bind(requester_id.as_uuid());
        }
        if let Some(statuses) = query.statuses {
            let names: Vec<&'static str> = statuses.iter().map(|s| s.as_str()).collect();
            sqlx_query = sqlx_query.bind(names);
        }
        if let Some(from) = query.from_date {
            sqlx_query = sqlx_query.bind(from);
        }
        if let Some(to) = query.to_date {
            sqlx_query = sqlx_query.bind(to);
        }
        if let Some(limit) = query.limit {
            sqlx_query = sqlx_query.bind(limit as i64);
        }
        if let Some(offset) = query.offset {
            sqlx_query = sqlx_query.bind(offset as i64);
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_reservation).collect()
    }

    async fn history(&self, reservation_id: ReservationId) -> Result<Vec<ReservationEvent>> {
        let rows = sqlx::query(
            "SELECT payload FROM reservation_events WHERE reservation_id = $1 ORDER BY sequence ASC",
        )
        .bind(reservation_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_event).collect()
    }
}
