use crate::core::{
    errors::{ManagerError, ResultExt},
    traits::ManagerProtocol,
    types::{BalanceAction, BalanceOperation, Login, Ticket},
};
use crate::manager::ManagerClient;
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

/// Balance operations
impl<P: ManagerProtocol> ManagerClient<P> {
    /// Submit a deposit, withdrawal or other balance operation
    ///
    /// On success the same operation comes back with only its ticket filled
    /// in. Rejections surface as [`ManagerError::Trade`].
    #[instrument(
        skip(self, operation),
        fields(
            login = operation.login(),
            action = ?operation.action(),
            amount = %operation.amount()
        )
    )]
    pub async fn trade(
        &mut self,
        operation: BalanceOperation,
    ) -> Result<BalanceOperation, ManagerError> {
        let (protocol, session) = self.live().await?;
        let ticket = protocol
            .trades(session)
            .balance(
                operation.login(),
                operation.action(),
                operation.amount(),
                operation.comment(),
            )
            .await
            .or_trade()?;

        match ticket {
            Some(ticket) => info!(ticket, "balance operation accepted"),
            None => warn!("balance operation accepted without a ticket"),
        }
        Ok(operation.with_ticket(ticket))
    }

    /// Balance operation from loose arguments, reporting rejections as user errors
    #[instrument(skip(self, comment))]
    pub async fn conduct_user_balance(
        &mut self,
        login: Login,
        action: BalanceAction,
        amount: Decimal,
        comment: &str,
    ) -> Result<Option<Ticket>, ManagerError> {
        let (protocol, session) = self.live().await?;
        protocol
            .trades(session)
            .balance(login, action, amount, comment)
            .await
            .or_user()
    }
}
