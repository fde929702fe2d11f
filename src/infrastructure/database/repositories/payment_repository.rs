//! SeaORM implementations of PaymentRepository and RefundRepository

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, NotSet, QueryFilter,
    QueryOrder, Set,
};
use tracing::debug;

use crate::domain::payment::{
    Payment, PaymentRepository, PaymentStatus, Refund, RefundRepository,
};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::{payment, refund};

pub struct SeaOrmPaymentRepository {
    db: DatabaseConnection,
}

impl SeaOrmPaymentRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn payment_to_domain(m: payment::Model) -> Payment {
    Payment {
        id: m.id,
        reservation_id: m.reservation_id,
        session_id: m.session_id,
        payment_intent_id: m.payment_intent_id,
        amount: m.amount,
        currency: m.currency,
        status: PaymentStatus::from_str(&m.status),
        external_status: m.external_status,
        receipt_url: m.receipt_url,
        created_at: m.created_at,
        updated_at: m.updated_at,
    }
}

fn payment_to_active(p: &Payment) -> payment::ActiveModel {
    payment::ActiveModel {
        id: Set(p.id),
        reservation_id: Set(p.reservation_id),
        session_id: Set(p.session_id.clone()),
        payment_intent_id: Set(p.payment_intent_id.clone()),
        amount: Set(p.amount),
        currency: Set(p.currency.clone()),
        status: Set(p.status.as_str().to_string()),
        external_status: Set(p.external_status.clone()),
        receipt_url: Set(p.receipt_url.clone()),
        created_at: Set(p.created_at),
        updated_at: Set(p.updated_at),
    }
}

fn db_err(e: sea_orm::DbErr) -> DomainError {
    DomainError::Storage(e.to_string())
}

// ── PaymentRepository impl ──────────────────────────────────────

#[async_trait]
impl PaymentRepository for SeaOrmPaymentRepository {
    async fn create(&self, p: Payment) -> DomainResult<Payment> {
        debug!(
            reservation_id = p.reservation_id,
            session_id = %p.session_id,
            "Creating payment row"
        );

        let mut model = payment_to_active(&p);
        model.id = NotSet;
        let stored = model.insert(&self.db).await.map_err(db_err)?;
        Ok(payment_to_domain(stored))
    }

    async fn update(&self, p: &Payment) -> DomainResult<()> {
        let existing = payment::Entity::find_by_id(p.id)
            .one(&self.db)
            .await
            .map_err(db_err)?;

        if existing.is_none() {
            return Err(DomainError::NotFound {
                entity: "payment".into(),
                field: "id".into(),
                value: p.id.to_string(),
            });
        }

        payment_to_active(p).update(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    async fn find_by_reservation(&self, reservation_id: i32) -> DomainResult<Vec<Payment>> {
        let models = payment::Entity::find()
            .filter(payment::Column::ReservationId.eq(reservation_id))
            .order_by_desc(payment::Column::CreatedAt)
            .order_by_desc(payment::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(payment_to_domain).collect())
    }

    async fn find_by_session(&self, session_id: &str) -> DomainResult<Option<Payment>> {
        let model = payment::Entity::find()
            .filter(payment::Column::SessionId.eq(session_id))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(payment_to_domain))
    }

    async fn find_by_intent(&self, payment_intent_id: &str) -> DomainResult<Option<Payment>> {
        let model = payment::Entity::find()
            .filter(payment::Column::PaymentIntentId.eq(payment_intent_id))
            .order_by_desc(payment::Column::CreatedAt)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(payment_to_domain))
    }
}

// ── RefundRepository impl ───────────────────────────────────────

pub struct SeaOrmRefundRepository {
    db: DatabaseConnection,
}

impl SeaOrmRefundRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn refund_to_domain(m: refund::Model) -> Refund {
    Refund {
        id: m.id,
        reservation_id: m.reservation_id,
        payment_id: m.payment_id,
        provider_refund_id: m.provider_refund_id,
        amount: m.amount,
        status: m.status,
        authorized_by: m.authorized_by,
        fallback_used: m.fallback_used,
        fallback_reason: m.fallback_reason,
        created_at: m.created_at,
    }
}

#[async_trait]
impl RefundRepository for SeaOrmRefundRepository {
    async fn create(&self, r: Refund) -> DomainResult<Refund> {
        debug!(
            reservation_id = r.reservation_id,
            provider_refund_id = %r.provider_refund_id,
            "Recording refund"
        );

        let model = refund::ActiveModel {
            id: NotSet,
            reservation_id: Set(r.reservation_id),
            payment_id: Set(r.payment_id),
            provider_refund_id: Set(r.provider_refund_id.clone()),
            amount: Set(r.amount),
            status: Set(r.status.clone()),
            authorized_by: Set(r.authorized_by.clone()),
            fallback_used: Set(r.fallback_used),
            fallback_reason: Set(r.fallback_reason.clone()),
            created_at: Set(r.created_at),
        };
        let stored = model.insert(&self.db).await.map_err(db_err)?;
        Ok(refund_to_domain(stored))
    }

    async fn find_by_reservation(&self, reservation_id: i32) -> DomainResult<Vec<Refund>> {
        let models = refund::Entity::find()
            .filter(refund::Column::ReservationId.eq(reservation_id))
            .order_by_asc(refund::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(refund_to_domain).collect())
    }
}
