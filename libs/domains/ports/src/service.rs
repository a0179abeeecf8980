use uuid::Uuid;

use crate::{error::PortResult, models::PortAllocation, repository::PortRepository};

/// Leases and releases ports in the managed range for ServiceInstances.
pub struct PortAllocator<R: PortRepository> {
    repository: R,
}

impl<R: PortRepository> PortAllocator<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    pub async fn allocate(&self, service_instance_id: Uuid) -> PortResult<PortAllocation> {
        let allocation = self.repository.allocate(service_instance_id).await?;
        tracing::info!(port = allocation.port, service_instance_id = %service_instance_id, "allocated port");
        Ok(allocation)
    }

    pub async fn active_for_service_instance(
        &self,
        service_instance_id: Uuid,
    ) -> PortResult<Option<PortAllocation>> {
        self.repository
            .get_active_for_service_instance(service_instance_id)
            .await
    }

    /// Flips a service instance's allocation to inactive. Retained for
    /// audit rather than deleted.
    pub async fn release_for_service_instance(&self, service_instance_id: Uuid) -> PortResult<()> {
        self.repository
            .release_for_service_instance(service_instance_id)
            .await?;
        tracing::info!(service_instance_id = %service_instance_id, "released port allocation");
        Ok(())
    }

    pub async fn list_active(&self) -> PortResult<Vec<PortAllocation>> {
        self.repository.list_active().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PORT_RANGE_END, PORT_RANGE_START};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct InMemoryPortRepository {
        allocations: Mutex<Vec<PortAllocation>>,
    }

    #[async_trait]
    impl PortRepository for InMemoryPortRepository {
        async fn allocate(&self, service_instance_id: Uuid) -> PortResult<PortAllocation> {
            let mut allocations = self.allocations.lock().unwrap();
            let used: std::collections::HashSet<u16> = allocations
                .iter()
                .filter(|a| a.active)
                .map(|a| a.port)
                .collect();
            let port = (PORT_RANGE_START..=PORT_RANGE_END)
                .find(|p| !used.contains(p))
                .ok_or(crate::error::PortError::ExhaustedRange)?;
            let allocation = PortAllocation::new(service_instance_id, port);
            allocations.push(allocation.clone());
            Ok(allocation)
        }

        async fn get_by_id(&self, id: Uuid) -> PortResult<Option<PortAllocation>> {
            Ok(self
                .allocations
                .lock()
                .unwrap()
                .iter()
                .find(|a| a.id == id)
                .cloned())
        }

        async fn get_active_for_service_instance(
            &self,
            service_instance_id: Uuid,
        ) -> PortResult<Option<PortAllocation>> {
            Ok(self
                .allocations
                .lock()
                .unwrap()
                .iter()
                .find(|a| a.service_instance_id == service_instance_id && a.active)
                .cloned())
        }

        async fn release(&self, id: Uuid) -> PortResult<PortAllocation> {
            let mut allocations = self.allocations.lock().unwrap();
            let allocation = allocations
                .iter_mut()
                .find(|a| a.id == id)
                .ok_or(crate::error::PortError::NotFound(id))?;
            allocation.release();
            Ok(allocation.clone())
        }

        async fn release_for_service_instance(&self, service_instance_id: Uuid) -> PortResult<()> {
            let mut allocations = self.allocations.lock().unwrap();
            for allocation in allocations
                .iter_mut()
                .filter(|a| a.service_instance_id == service_instance_id && a.active)
            {
                allocation.release();
            }
            Ok(())
        }

        async fn list_active(&self) -> PortResult<Vec<PortAllocation>> {
            Ok(self
                .allocations
                .lock()
                .unwrap()
                .iter()
                .filter(|a| a.active)
                .cloned()
                .collect())
        }
    }

    #[tokio::test]
    async fn allocate_never_reuses_an_active_port() {
        let allocator = PortAllocator::new(InMemoryPortRepository::default());

        let a = allocator.allocate(Uuid::now_v7()).await.unwrap();
        let b = allocator.allocate(Uuid::now_v7()).await.unwrap();

        assert_ne!(a.port, b.port);
    }

    #[tokio::test]
    async fn release_allows_port_reuse() {
        let allocator = PortAllocator::new(InMemoryPortRepository::default());
        let service_instance_id = Uuid::now_v7();

        let a = allocator.allocate(service_instance_id).await.unwrap();
        allocator
            .release_for_service_instance(service_instance_id)
            .await
            .unwrap();

        assert!(allocator
            .active_for_service_instance(service_instance_id)
            .await
            .unwrap()
            .is_none());

        let active = allocator.list_active().await.unwrap();
        assert!(active.iter().all(|p| p.id != a.id));
    }
}
