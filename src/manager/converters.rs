use crate::core::types::{AccountProfile, UserRecord, UserRights};
use rust_decimal::Decimal;

/// Build the wire record for a profile
///
/// Fields the profile does not carry get the values a new account starts
/// with. Both conversions destructure without `..` so adding a field to
/// either type fails to compile until it is mapped here.
impl From<&AccountProfile> for UserRecord {
    fn from(profile: &AccountProfile) -> Self {
        let AccountProfile {
            login,
            group,
            name,
            email,
            address,
            city,
            state,
            country,
            phone,
            zip_code,
            main_password,
            investor_password,
            phone_password,
            leverage,
        } = profile;

        Self {
            login: *login,
            group: group.clone(),
            name: name.clone(),
            email: email.clone(),
            address: address.clone(),
            city: city.clone(),
            state: state.clone(),
            country: country.clone(),
            phone: phone.clone(),
            zip_code: zip_code.clone(),
            main_password: main_password.clone(),
            investor_password: investor_password.clone(),
            phone_password: phone_password.clone(),
            leverage: *leverage,
            rights: UserRights::DEFAULT,
            balance: Decimal::ZERO,
            credit: Decimal::ZERO,
            registration: None,
            last_access: None,
        }
    }
}

impl From<UserRecord> for AccountProfile {
    fn from(record: UserRecord) -> Self {
        let UserRecord {
            login,
            group,
            name,
            email,
            address,
            city,
            state,
            country,
            phone,
            zip_code,
            main_password,
            investor_password,
            phone_password,
            leverage,
            rights: _,
            balance: _,
            credit: _,
            registration: _,
            last_access: _,
        } = record;

        Self {
            login,
            group,
            name,
            email,
            address,
            city,
            state,
            country,
            phone,
            zip_code,
            main_password,
            investor_password,
            phone_password,
            leverage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use secrecy::ExposeSecret;

    fn sample_profile() -> AccountProfile {
        AccountProfile {
            login: Some(1001),
            group: "demo\\forex".to_string(),
            name: "Jane Roe".to_string(),
            email: "jane@example.com".to_string(),
            address: "1 Main St".to_string(),
            city: "Limassol".to_string(),
            state: "Limassol".to_string(),
            country: "Cyprus".to_string(),
            phone: "+35799000000".to_string(),
            zip_code: "3030".to_string(),
            leverage: 200,
            ..AccountProfile::default()
        }
        .with_main_password("Main123")
        .with_investor_password("Invest123")
        .with_phone_password("Phone123")
    }

    #[test]
    fn test_profile_to_record() {
        let profile = sample_profile();
        let record = UserRecord::from(&profile);

        assert_eq!(record.login, Some(1001));
        assert_eq!(record.email, "jane@example.com");
        assert_eq!(record.zip_code, "3030");
        assert_eq!(record.leverage, 200);
        assert_eq!(record.rights, UserRights::DEFAULT);
        assert_eq!(record.balance, Decimal::ZERO);
        let phone = record.phone_password.as_ref().map(|p| p.expose_secret());
        assert_eq!(phone.map(String::as_str), Some("Phone123"));
    }

    #[test]
    fn test_record_to_profile_drops_server_fields() {
        let mut record = UserRecord::from(&sample_profile());
        record.balance = dec!(1500);
        record.rights = UserRights::ENABLED;

        let profile = AccountProfile::from(record);
        assert_eq!(profile.login, Some(1001));
        assert_eq!(profile.name, "Jane Roe");
        assert_eq!(profile.country, "Cyprus");
        let main = profile.main_password.as_ref().map(|p| p.expose_secret());
        assert_eq!(main.map(String::as_str), Some("Main123"));
    }

    #[test]
    fn test_profile_without_login() {
        let profile = AccountProfile::new("real\\usd", "John Doe");
        let record = UserRecord::from(&profile);
        assert_eq!(record.login, None);
        assert_eq!(record.leverage, UserRecord::DEFAULT_LEVERAGE);
        assert!(record.main_password.is_none());
    }
}
