use serde::{Deserialize, Serialize};
use std::fmt;

/// Generates the closed `ResultCode` set from a single `(variant, wire, description)` table
/// so the numeric value, the description and the decoder can never drift apart.
macro_rules! result_codes {
    ($($(#[$meta:meta])* $variant:ident = $code:literal => $text:literal,)+) => {
        /// Protocol-level status value returned by every remote call
        ///
        /// `Ok` is the only success sentinel; every other variant is a failure
        /// with a fixed human-readable description.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[repr(u32)]
        pub enum ResultCode {
            $($(#[$meta])* $variant = $code,)+
        }

        impl ResultCode {
            /// Every code in wire order
            pub const ALL: &'static [Self] = &[$(Self::$variant,)+];

            /// Numeric value as carried on the wire
            pub const fn code(self) -> u32 {
                self as u32
            }

            /// Human-readable description of the code
            pub const fn description(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl TryFrom<u32> for ResultCode {
            type Error = u32;

            fn try_from(value: u32) -> Result<Self, u32> {
                match value {
                    $($code => Ok(Self::$variant),)+
                    other => Err(other),
                }
            }
        }
    };
}

result_codes! {
    Ok = 0 => "Done",
    OkNone = 1 => "Done, no data",
    Error = 2 => "Common error",
    ErrParams = 3 => "Invalid parameters",
    ErrData = 4 => "Invalid data",
    ErrDisk = 5 => "Disk error",
    ErrMem = 6 => "Memory error",
    ErrNetwork = 7 => "Network error",
    ErrPermissions = 8 => "Not enough permissions",
    ErrTimeout = 9 => "Operation timeout",
    ErrConnection = 10 => "No connection",
    ErrNoService = 11 => "Service is not available",
    ErrFrequent = 12 => "Too frequent requests",
    ErrNotFound = 13 => "Not found",
    ErrPartial = 14 => "Partial error",
    ErrShutdown = 15 => "Server shutdown in progress",
    ErrCancel = 16 => "Operation has been canceled",
    ErrDuplicate = 17 => "Duplicate data",

    AuthClientInvalid = 1000 => "Invalid terminal type",
    AuthAccountInvalid = 1001 => "Invalid account",
    AuthAccountDisabled = 1002 => "Account disabled",
    AuthAdvanced = 1003 => "Advanced authorization necessary",
    AuthCertificate = 1004 => "Certificate required",
    AuthCertificateBad = 1005 => "Invalid certificate",
    AuthNotConfirmed = 1006 => "Certificate is not confirmed",
    AuthServerInternal = 1007 => "Attempt to connect to non-access server",
    AuthServerBad = 1008 => "Server is not authenticated",
    AuthUpdateOnly = 1009 => "Only updates available",
    AuthClientOld = 1010 => "Client has old version",
    AuthManagerNoConfig = 1011 => "Manager account does not have manager config",
    AuthManagerIpBlock = 1012 => "IP address unallowed for manager",
    AuthGroupInvalid = 1013 => "Group is not initialized",
    AuthCaDisabled = 1014 => "Certificate generation disabled",
    AuthInvalidId = 1015 => "Invalid or disabled server id",
    AuthInvalidIp = 1016 => "Unallowed address",
    AuthInvalidType = 1017 => "Invalid or disabled server type",
    AuthServerBusy = 1018 => "Server is busy",
    AuthServerCert = 1019 => "Invalid server certificate",
    AuthAccountUnknown = 1020 => "Unknown account",
    AuthServerOld = 1021 => "Old server version",
    AuthServerLimit = 1022 => "Server cannot be connected due to license limitation",
    AuthMobileDisabled = 1023 => "Mobile connections are not allowed by server license",

    CfgLastAdmin = 2001 => "Last admin config deleting",
    CfgLastAdminGroup = 2002 => "Last admin group cannot be deleted",
    CfgNotEmpty = 2003 => "Accounts or trades in group",
    CfgInvalidRange = 2004 => "Invalid accounts or trades ranges",
    CfgNotManager = 2005 => "Manager account is not from manager group",
    CfgBuiltin = 2006 => "Built-in protected config",
    CfgDuplicate = 2007 => "Configuration duplicate",
    CfgLimitReached = 2008 => "Configuration limit reached",
    CfgNoAccessToMain = 2009 => "Invalid network configuration",

    UsrLastAdmin = 3001 => "Last admin account deleting",
    UsrLoginExhausted = 3002 => "Logins range exhausted",
    UsrLoginProhibited = 3003 => "Login reserved at another server",
    UsrLoginExist = 3004 => "Account already exists",
    UsrSuicide = 3005 => "Attempt of self-deletion",
    UsrInvalidPassword = 3006 => "Invalid account password",
    UsrLimitReached = 3007 => "Users limit reached",
    UsrHasTrades = 3008 => "Account has open trades",
    UsrDifferentServers = 3009 => "Attempt to move account to different server",
    UsrDifferentCurrency = 3010 => "Attempt to move account to different currency group",
    UsrImportBalance = 3011 => "Account balance import error",
    UsrImportGroup = 3012 => "Account import with invalid group",

    TradeLimitReached = 4001 => "Orders or deals limit reached",
    TradeOrderExist = 4002 => "Order already exists",
    TradeOrderExhausted = 4003 => "Orders range exhausted",
    TradeDealExhausted = 4004 => "Deals range exhausted",
    TradeMaxMoney = 4005 => "Money limit reached",

    ReportSnapshot = 5001 => "Base snapshot error",
    ReportNotSupported = 5002 => "Method is not supported for this report",
    ReportNoData = 5003 => "No report data",

    HstSymbolNotFound = 6001 => "Symbol not found",

    RequestInway = 10001 => "Request on the way",
    RequestAccepted = 10002 => "Request accepted",
    RequestProcess = 10003 => "Request processed",
    RequestRequote = 10004 => "Requote",
    RequestPrices = 10005 => "Prices",
    RequestReject = 10006 => "Request rejected",
    RequestCancel = 10007 => "Request canceled",
    RequestPlaced = 10008 => "Order placed",
    RequestDone = 10009 => "Request executed",
    RequestDonePartial = 10010 => "Request executed partially",
    RequestError = 10011 => "Request error",
    RequestTimeout = 10012 => "Request timeout",
    RequestInvalid = 10013 => "Invalid request",
    RequestInvalidVolume = 10014 => "Invalid volume",
    RequestInvalidPrice = 10015 => "Invalid price",
    RequestInvalidStops = 10016 => "Invalid stops",
    RequestTradeDisabled = 10017 => "Trade disabled",
    RequestMarketClosed = 10018 => "Market closed",
    RequestNoMoney = 10019 => "Not enough money",
    RequestPriceChanged = 10020 => "Price changed",
    RequestPriceOff = 10021 => "No prices",
    RequestInvalidExp = 10022 => "Invalid order expiration",
    RequestOrderChanged = 10023 => "Order has been changed already",
    RequestTooMany = 10024 => "Too many trade requests",
    RequestNoChanges = 10025 => "Request does not contain changes",
    RequestAtDisabledServer = 10026 => "AutoTrading disabled by server",
    RequestAtDisabledClient = 10027 => "AutoTrading disabled by client",
    RequestLocked = 10028 => "Request locked by dealer",
    RequestFrozen = 10029 => "Order or position frozen",
    RequestInvalidFill = 10030 => "Unsupported filling mode",
    RequestConnection = 10031 => "No connection",
}

impl ResultCode {
    /// `true` only for the `Ok` sentinel
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Outcome of one protocol round trip; the error side never carries `ResultCode::Ok`.
pub type ProtocolResult<T> = Result<T, ResultCode>;
