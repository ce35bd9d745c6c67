use crate::core::{
    errors::{ManagerError, ResultExt},
    traits::ManagerProtocol,
    types::{Login, OrderRecord, Ticket},
};
use crate::manager::ManagerClient;
use chrono::{DateTime, Utc};
use tracing::{instrument, warn};

/// Open orders and order history
///
/// Lookups here report rejections as [`ManagerError::User`], the same as
/// account operations.
impl<P: ManagerProtocol> ManagerClient<P> {
    #[instrument(skip(self))]
    pub async fn get_order(&mut self, ticket: Ticket) -> Result<OrderRecord, ManagerError> {
        let (protocol, session) = self.live().await?;
        protocol.orders(session).get(ticket).await.or_user()
    }

    /// Number of open orders of an account
    #[instrument(skip(self))]
    pub async fn get_order_total(&mut self, login: Login) -> Result<u32, ManagerError> {
        let (protocol, session) = self.live().await?;
        protocol.orders(session).total(login).await.or_user()
    }

    /// Up to `total` open orders starting at `offset`
    #[instrument(skip(self))]
    pub async fn get_order_page(
        &mut self,
        login: Login,
        offset: u32,
        total: u32,
    ) -> Result<Vec<OrderRecord>, ManagerError> {
        let (protocol, session) = self.live().await?;
        let orders = protocol
            .orders(session)
            .page(login, offset, total)
            .await
            .or_user()?;
        Ok(clamp_page(orders, total))
    }

    /// Number of closed orders of an account between `from` and `to`
    #[instrument(skip(self))]
    pub async fn get_order_history_total(
        &mut self,
        login: Login,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<u32, ManagerError> {
        let (protocol, session) = self.live().await?;
        protocol
            .history(session)
            .total(login, from, to)
            .await
            .or_user()
    }

    #[instrument(skip(self))]
    pub async fn get_order_history_page(
        &mut self,
        login: Login,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        offset: u32,
        total: u32,
    ) -> Result<Vec<OrderRecord>, ManagerError> {
        let (protocol, session) = self.live().await?;
        let orders = protocol
            .history(session)
            .page(login, from, to, offset, total)
            .await
            .or_user()?;
        Ok(clamp_page(orders, total))
    }
}

/// Never hand back more records than the page size asked for
fn clamp_page(mut records: Vec<OrderRecord>, page_size: u32) -> Vec<OrderRecord> {
    let limit = usize::try_from(page_size).unwrap_or(usize::MAX);
    if records.len() > limit {
        warn!(
            received = records.len(),
            page_size,
            "server returned an oversized page"
        );
        records.truncate(limit);
    }
    records
}
