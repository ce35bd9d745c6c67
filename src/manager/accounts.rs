use crate::core::{
    errors::{ManagerError, ResultExt},
    retcode::ResultCode,
    traits::ManagerProtocol,
    types::{AccountProfile, Login, UserRecord},
};
use crate::manager::ManagerClient;
use tracing::{info, instrument};

/// Account management
impl<P: ManagerProtocol> ManagerClient<P> {
    /// Create a new account; the returned profile carries the server-assigned login
    #[instrument(skip(self, profile), fields(group = %profile.group))]
    pub async fn create_account(
        &mut self,
        mut profile: AccountProfile,
    ) -> Result<AccountProfile, ManagerError> {
        let (protocol, session) = self.live().await?;
        let record = UserRecord::from(&profile);
        let mut users = protocol.users(session);
        let created = users.add(&record).await.or_user()?;

        profile.login = created.login;
        info!(login = ?profile.login, "account created");
        Ok(profile)
    }

    /// Logins of every account in groups matching `group`
    #[instrument(skip(self))]
    pub async fn user_logins(&mut self, group: &str) -> Result<Vec<Login>, ManagerError> {
        let (protocol, session) = self.live().await?;
        protocol.users(session).logins(group).await.or_user()
    }

    #[instrument(skip(self))]
    pub async fn get_account(&mut self, login: Login) -> Result<AccountProfile, ManagerError> {
        let (protocol, session) = self.live().await?;
        let record = protocol.users(session).get(login).await.or_user()?;
        Ok(AccountProfile::from(record))
    }

    #[instrument(skip(self))]
    pub async fn delete_account(&mut self, login: Login) -> Result<bool, ManagerError> {
        let (protocol, session) = self.live().await?;
        protocol.users(session).delete(login).await.or_user()?;
        info!("account deleted");
        Ok(true)
    }

    /// Update an existing account; the profile must carry its login
    #[instrument(skip(self, profile), fields(login = ?profile.login))]
    pub async fn update_account(
        &mut self,
        profile: AccountProfile,
    ) -> Result<AccountProfile, ManagerError> {
        let (protocol, session) = self.live().await?;
        if profile.login.is_none() {
            return Err(ManagerError::User(ResultCode::ErrParams));
        }

        let record = UserRecord::from(&profile);
        let mut users = protocol.users(session);
        let updated = users.update(&record).await.or_user()?;
        Ok(AccountProfile::from(updated))
    }
}
