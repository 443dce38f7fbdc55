use std::sync::Arc;

use crate::DaoError;
use mockall::automock;
use time::PrimitiveDateTime;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdjustmentTypeEntity {
    Correction,
    Manual,
    Bonus,
    Penalty,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdjustmentStatusEntity {
    Pending,
    Approved,
    Rejected,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OvertimeAdjustmentEntity {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub adjustment_type: AdjustmentTypeEntity,
    pub hours: f64,
    pub reason: Arc<str>,
    pub description: Arc<str>,
    pub status: AdjustmentStatusEntity,
    pub author: Arc<str>,
    pub approved_by: Option<Arc<str>>,
    pub approved_at: Option<PrimitiveDateTime>,

    pub created: PrimitiveDateTime,
    pub deleted: Option<PrimitiveDateTime>,
    pub version: Uuid,
}

#[automock(type Transaction = crate::MockTransaction;)]
#[async_trait::async_trait]
pub trait OvertimeAdjustmentDao {
    type Transaction: crate::Transaction;

    async fn find_by_id(
        &self,
        id: Uuid,
        tx: Self::Transaction,
    ) -> Result<Option<OvertimeAdjustmentEntity>, DaoError>;

    /// All adjustments of an employee, including deleted ones.
    async fn dump_by_employee_id(
        &self,
        employee_id: Uuid,
        tx: Self::Transaction,
    ) -> Result<Arc<[OvertimeAdjustmentEntity]>, DaoError>;

    async fn create(
        &self,
        entity: &OvertimeAdjustmentEntity,
        process: &str,
        tx: Self::Transaction,
    ) -> Result<(), DaoError>;

    async fn update(
        &self,
        entity: &OvertimeAdjustmentEntity,
        process: &str,
        tx: Self::Transaction,
    ) -> Result<(), DaoError>;

    async fn find_by_employee_id(
        &self,
        employee_id: Uuid,
        tx: Self::Transaction,
    ) -> Result<Arc<[OvertimeAdjustmentEntity]>, DaoError> {
        Ok(self
            .dump_by_employee_id(employee_id, tx)
            .await?
            .iter()
            .filter(|entity| entity.deleted.is_none())
            .cloned()
            .collect())
    }

    async fn find_approved_by_employee_id(
        &self,
        employee_id: Uuid,
        tx: Self::Transaction,
    ) -> Result<Arc<[OvertimeAdjustmentEntity]>, DaoError> {
        Ok(self
            .find_by_employee_id(employee_id, tx)
            .await?
            .iter()
            .filter(|entity| entity.status == AdjustmentStatusEntity::Approved)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;
    use time::macros::datetime;

    use uuid::{uuid, Uuid};

    use super::{
        AdjustmentStatusEntity, AdjustmentTypeEntity, OvertimeAdjustmentDao,
        OvertimeAdjustmentEntity,
    };
    use crate::DaoError;

    const EMPLOYEE_UUID: Uuid = uuid!("5b2a7c4e-7d8f-4f71-9a0d-0b6f3c1e2d40");
    const APPROVED_UUID: Uuid = uuid!("9e1f0b2c-3a4d-4e5f-8a6b-7c8d9e0f1a20");
    const PENDING_UUID: Uuid = uuid!("9e1f0b2c-3a4d-4e5f-8a6b-7c8d9e0f1a21");
    const DELETED_UUID: Uuid = uuid!("9e1f0b2c-3a4d-4e5f-8a6b-7c8d9e0f1a22");
    const REJECTED_UUID: Uuid = uuid!("9e1f0b2c-3a4d-4e5f-8a6b-7c8d9e0f1a23");
    const VERSION_UUID: Uuid = uuid!("25bf7f52-d66c-4681-a74e-e07ecf5e952e");

    fn adjustment(
        id: Uuid,
        hours: f64,
        status: AdjustmentStatusEntity,
        deleted: bool,
    ) -> OvertimeAdjustmentEntity {
        OvertimeAdjustmentEntity {
            id,
            employee_id: EMPLOYEE_UUID,
            adjustment_type: AdjustmentTypeEntity::Correction,
            hours,
            reason: Arc::from("Test"),
            description: Arc::from(""),
            status,
            author: Arc::from("hr"),
            approved_by: None,
            approved_at: None,
            created: datetime!(2025-03-01 12:00:00),
            deleted: deleted.then_some(datetime!(2025-03-02 12:00:00)),
            version: VERSION_UUID,
        }
    }

    pub struct OvertimeAdjustmentDaoTestImpl;

    #[async_trait::async_trait]
    impl OvertimeAdjustmentDao for OvertimeAdjustmentDaoTestImpl {
        type Transaction = crate::MockTransaction;

        async fn find_by_id(
            &self,
            _id: Uuid,
            _tx: Self::Transaction,
        ) -> Result<Option<OvertimeAdjustmentEntity>, DaoError> {
            Ok(None)
        }

        async fn dump_by_employee_id(
            &self,
            _employee_id: Uuid,
            _tx: Self::Transaction,
        ) -> Result<Arc<[OvertimeAdjustmentEntity]>, DaoError> {
            Ok(Arc::new([
                adjustment(APPROVED_UUID, 1.5, AdjustmentStatusEntity::Approved, false),
                adjustment(PENDING_UUID, 4.0, AdjustmentStatusEntity::Pending, false),
                adjustment(DELETED_UUID, 8.0, AdjustmentStatusEntity::Approved, true),
                adjustment(REJECTED_UUID, -2.0, AdjustmentStatusEntity::Rejected, false),
            ]))
        }

        async fn create(
            &self,
            _entity: &OvertimeAdjustmentEntity,
            _process: &str,
            _tx: Self::Transaction,
        ) -> Result<(), DaoError> {
            Ok(())
        }

        async fn update(
            &self,
            _entity: &OvertimeAdjustmentEntity,
            _process: &str,
            _tx: Self::Transaction,
        ) -> Result<(), DaoError> {
            Ok(())
        }
    }

    #[tokio::test]
    pub async fn test_find_by_employee_id_skips_deleted() {
        let dao = OvertimeAdjustmentDaoTestImpl;

        let entities = dao
            .find_by_employee_id(EMPLOYEE_UUID, crate::MockTransaction)
            .await
            .unwrap();
        assert_eq!(entities.len(), 3);
        assert!(entities.iter().all(|entity| entity.id != DELETED_UUID));
    }

    #[tokio::test]
    pub async fn test_find_approved_by_employee_id() {
        let dao = OvertimeAdjustmentDaoTestImpl;

        let entities = dao
            .find_approved_by_employee_id(EMPLOYEE_UUID, crate::MockTransaction)
            .await
            .unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].id, APPROVED_UUID);
    }
}
