//! SeaORM implementation of AgencyRepository

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, NotSet, QueryFilter, Set,
};
use tracing::debug;

use crate::domain::agency::{Agency, AgencyRepository};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::agency;

pub struct SeaOrmAgencyRepository {
    db: DatabaseConnection,
}

impl SeaOrmAgencyRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn model_to_domain(m: agency::Model) -> Agency {
    Agency {
        id: m.id,
        name: m.name,
        email: m.email,
        connected_account_id: m.connected_account_id,
        commission_bps: m.commission_bps,
        processor_fee: m.processor_fee,
        charges_enabled: m.charges_enabled,
        payouts_enabled: m.payouts_enabled,
        authorized: m.authorized,
        created_at: m.created_at,
        updated_at: m.updated_at,
    }
}

fn domain_to_active(a: &Agency) -> agency::ActiveModel {
    agency::ActiveModel {
        id: Set(a.id),
        name: Set(a.name.clone()),
        email: Set(a.email.clone()),
        connected_account_id: Set(a.connected_account_id.clone()),
        commission_bps: Set(a.commission_bps),
        processor_fee: Set(a.processor_fee),
        charges_enabled: Set(a.charges_enabled),
        payouts_enabled: Set(a.payouts_enabled),
        authorized: Set(a.authorized),
        created_at: Set(a.created_at),
        updated_at: Set(a.updated_at),
    }
}

fn db_err(e: sea_orm::DbErr) -> DomainError {
    DomainError::Storage(e.to_string())
}

// ── AgencyRepository impl ───────────────────────────────────────

#[async_trait]
impl AgencyRepository for SeaOrmAgencyRepository {
    async fn save(&self, agency: Agency) -> DomainResult<Agency> {
        debug!(name = %agency.name, "Saving agency");

        let mut model = domain_to_active(&agency);
        if agency.id == 0 {
            model.id = NotSet;
        }
        let stored = model.insert(&self.db).await.map_err(db_err)?;
        Ok(model_to_domain(stored))
    }

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Agency>> {
        let model = agency::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn find_by_connected_account(&self, account_id: &str) -> DomainResult<Option<Agency>> {
        let model = agency::Entity::find()
            .filter(agency::Column::ConnectedAccountId.eq(account_id))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn update(&self, agency: &Agency) -> DomainResult<()> {
        let existing = agency::Entity::find_by_id(agency.id)
            .one(&self.db)
            .await
            .map_err(db_err)?;

        if existing.is_none() {
            return Err(DomainError::NotFound {
                entity: "agency".into(),
                field: "id".into(),
                value: agency.id.to_string(),
            });
        }

        domain_to_active(agency)
            .update(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}
