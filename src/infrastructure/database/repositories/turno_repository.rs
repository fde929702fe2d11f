//! SeaORM implementation of TurnoRepository
//!
//! Seat occupancy is a single conditional UPDATE re-checked at write
//! time, so concurrent bookings on the same turno are linearized by
//! the database rather than by application locks.

use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, UpdateResult,
};
use tracing::debug;

use crate::domain::turno::{Turno, TurnoRepository};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::turno;

pub struct SeaOrmTurnoRepository {
    db: DatabaseConnection,
}

impl SeaOrmTurnoRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn require(&self, turno_id: i32) -> DomainResult<turno::Model> {
        turno::Entity::find_by_id(turno_id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DomainError::NotFound {
                entity: "turno".into(),
                field: "id".into(),
                value: turno_id.to_string(),
            })
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn model_to_domain(m: turno::Model) -> Turno {
    Turno {
        id: m.id,
        activity: m.activity,
        starts_at: m.starts_at,
        max_capacity: m.max_capacity,
        occupied: m.occupied,
    }
}

fn db_err(e: sea_orm::DbErr) -> DomainError {
    DomainError::Storage(e.to_string())
}

// ── TurnoRepository impl ────────────────────────────────────────

#[async_trait]
impl TurnoRepository for SeaOrmTurnoRepository {
    async fn save(&self, t: Turno) -> DomainResult<()> {
        debug!(turno_id = t.id, "Saving turno");

        let model = turno::ActiveModel {
            id: Set(t.id),
            activity: Set(t.activity.clone()),
            starts_at: Set(t.starts_at),
            max_capacity: Set(t.max_capacity),
            occupied: Set(t.occupied),
        };

        let existing = turno::Entity::find_by_id(t.id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        if existing.is_some() {
            model.update(&self.db).await.map_err(db_err)?;
        } else {
            model.insert(&self.db).await.map_err(db_err)?;
        }
        Ok(())
    }

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Turno>> {
        let model = turno::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn occupy_seats(&self, turno_id: i32, count: i32) -> DomainResult<()> {
        let current = self.require(turno_id).await?;

        // the WHERE clause re-checks occupied at write time; zero rows
        // affected means a racing update got there first
        let result: UpdateResult = turno::Entity::update_many()
            .col_expr(
                turno::Column::Occupied,
                Expr::col(turno::Column::Occupied).add(count),
            )
            .filter(turno::Column::Id.eq(turno_id))
            .filter(turno::Column::Occupied.lte(current.max_capacity - count))
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            let now = self.require(turno_id).await?;
            return Err(DomainError::CapacityExceeded {
                turno_id,
                requested: count,
                available: now.max_capacity - now.occupied,
            });
        }
        Ok(())
    }

    async fn release_seats(&self, turno_id: i32, count: i32) -> DomainResult<()> {
        self.require(turno_id).await?;

        let result: UpdateResult = turno::Entity::update_many()
            .col_expr(
                turno::Column::Occupied,
                Expr::col(turno::Column::Occupied).sub(count),
            )
            .filter(turno::Column::Id.eq(turno_id))
            .filter(turno::Column::Occupied.gte(count))
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            let now = self.require(turno_id).await?;
            return Err(DomainError::CapacityUnderflow {
                turno_id,
                requested: count,
                occupied: now.occupied,
            });
        }
        Ok(())
    }
}
