use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use secrecy::Secret;
use serde::{Deserialize, Serialize};

/// Server-assigned trading account identifier
pub type Login = u64;

/// Server-assigned identifier of a deal or order
pub type Ticket = u64;

/// Account as seen by the caller of the manager client
///
/// `login` is `None` until the server assigns one. Passwords are only sent,
/// never read back, so they are skipped when serializing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountProfile {
    pub login: Option<Login>,
    pub group: String,
    pub name: String,
    pub email: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub phone: String,
    pub zip_code: String,
    #[serde(skip_serializing, default)]
    pub main_password: Option<Secret<String>>,
    #[serde(skip_serializing, default)]
    pub investor_password: Option<Secret<String>>,
    #[serde(skip_serializing, default)]
    pub phone_password: Option<Secret<String>>,
    pub leverage: u32,
}

impl AccountProfile {
    pub fn new(group: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
            leverage: UserRecord::DEFAULT_LEVERAGE,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_login(mut self, login: Login) -> Self {
        self.login = Some(login);
        self
    }

    #[must_use]
    pub fn with_main_password(mut self, password: impl Into<String>) -> Self {
        self.main_password = Some(Secret::new(password.into()));
        self
    }

    #[must_use]
    pub fn with_investor_password(mut self, password: impl Into<String>) -> Self {
        self.investor_password = Some(Secret::new(password.into()));
        self
    }

    #[must_use]
    pub fn with_phone_password(mut self, password: impl Into<String>) -> Self {
        self.phone_password = Some(Secret::new(password.into()));
        self
    }

    #[must_use]
    pub const fn with_leverage(mut self, leverage: u32) -> Self {
        self.leverage = leverage;
        self
    }
}

/// Permission flags of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserRights(pub u64);

impl UserRights {
    pub const NONE: Self = Self(0x0000_0000);
    pub const ENABLED: Self = Self(0x0000_0001);
    pub const PASSWORD: Self = Self(0x0000_0002);
    pub const TRADE_DISABLED: Self = Self(0x0000_0004);
    pub const INVESTOR: Self = Self(0x0000_0008);
    pub const CONFIRMED: Self = Self(0x0000_0010);
    pub const TRAILING: Self = Self(0x0000_0020);
    pub const EXPERT: Self = Self(0x0000_0040);
    pub const REPORTS: Self = Self(0x0000_0100);
    /// Flags a freshly created account receives
    pub const DEFAULT: Self = Self(
        Self::ENABLED.0 | Self::PASSWORD.0 | Self::TRAILING.0 | Self::EXPERT.0 | Self::REPORTS.0,
    );

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

/// Account record in the shape the user protocol exchanges with the server
#[derive(Debug, Clone, Default)]
pub struct UserRecord {
    pub login: Option<Login>,
    pub group: String,
    pub name: String,
    pub email: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub phone: String,
    pub zip_code: String,
    pub main_password: Option<Secret<String>>,
    pub investor_password: Option<Secret<String>>,
    pub phone_password: Option<Secret<String>>,
    pub leverage: u32,
    pub rights: UserRights,
    pub balance: Decimal,
    pub credit: Decimal,
    pub registration: Option<DateTime<Utc>>,
    pub last_access: Option<DateTime<Utc>>,
}

impl UserRecord {
    pub const DEFAULT_LEVERAGE: u32 = 100;

    /// Empty record carrying the server defaults for new accounts
    pub fn create_default() -> Self {
        Self {
            leverage: Self::DEFAULT_LEVERAGE,
            rights: UserRights::DEFAULT,
            ..Self::default()
        }
    }
}

/// Kind of balance-affecting deal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BalanceAction {
    /// Deposit when the amount is positive, withdrawal when negative
    Balance,
    Credit,
    Charge,
    Correction,
    Bonus,
    Commission,
}

impl BalanceAction {
    /// Deal action number used on the wire
    pub const fn code(self) -> u32 {
        match self {
            Self::Balance => 2,
            Self::Credit => 3,
            Self::Charge => 4,
            Self::Correction => 5,
            Self::Bonus => 6,
            Self::Commission => 7,
        }
    }

    pub const fn from_code(code: u32) -> Option<Self> {
        match code {
            2 => Some(Self::Balance),
            3 => Some(Self::Credit),
            4 => Some(Self::Charge),
            5 => Some(Self::Correction),
            6 => Some(Self::Bonus),
            7 => Some(Self::Commission),
            _ => None,
        }
    }
}

/// Deposit, withdrawal or other balance correction on one account
///
/// Request fields are fixed at construction; `ticket` is filled in by the
/// client once the server accepts the operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceOperation {
    login: Login,
    action: BalanceAction,
    amount: Decimal,
    comment: String,
    ticket: Option<Ticket>,
}

impl BalanceOperation {
    pub fn new(
        login: Login,
        action: BalanceAction,
        amount: Decimal,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            login,
            action,
            amount,
            comment: comment.into(),
            ticket: None,
        }
    }

    pub fn deposit(login: Login, amount: Decimal, comment: impl Into<String>) -> Self {
        Self::new(login, BalanceAction::Balance, amount.abs(), comment)
    }

    pub fn withdrawal(login: Login, amount: Decimal, comment: impl Into<String>) -> Self {
        Self::new(login, BalanceAction::Balance, -amount.abs(), comment)
    }

    pub fn credit(login: Login, amount: Decimal, comment: impl Into<String>) -> Self {
        Self::new(login, BalanceAction::Credit, amount, comment)
    }

    pub const fn login(&self) -> Login {
        self.login
    }

    pub const fn action(&self) -> BalanceAction {
        self.action
    }

    pub const fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub const fn ticket(&self) -> Option<Ticket> {
        self.ticket
    }

    #[must_use]
    pub(crate) fn with_ticket(mut self, ticket: Option<Ticket>) -> Self {
        self.ticket = ticket;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderKind {
    Buy,
    Sell,
    BuyLimit,
    SellLimit,
    BuyStop,
    SellStop,
    BuyStopLimit,
    SellStopLimit,
    CloseBy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderState {
    Started,
    Placed,
    Canceled,
    Partial,
    Filled,
    Rejected,
    Expired,
    RequestAdd,
    RequestModify,
    RequestCancel,
}

/// Open or historical order as reported by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub ticket: Ticket,
    pub login: Login,
    pub symbol: String,
    pub kind: OrderKind,
    pub state: OrderState,
    pub volume_initial: Decimal,
    pub volume_current: Decimal,
    pub price_order: Decimal,
    pub price_current: Decimal,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
    pub setup_time: DateTime<Utc>,
    pub done_time: Option<DateTime<Utc>>,
    pub comment: String,
}
