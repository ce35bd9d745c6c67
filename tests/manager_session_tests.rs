use chrono::{Duration as ChronoDuration, Utc};
use mt5api::{
    core::kernel::SessionState,
    stub::{StubCall, StubProtocol, StubServer},
    AccountProfile, BalanceAction, BalanceOperation, ManagerBuilder, ManagerClient, ManagerError,
    OrderKind, OrderRecord, OrderState, ResultCode, UserRecord,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Client over a fresh stub server, encryption on
fn create_test_client() -> (StubServer, ManagerClient<StubProtocol>) {
    let server = StubServer::new();
    let client =
        ManagerBuilder::new("10.0.0.1", 443, 1000, "ManagerPass1").build(server.protocol());
    (server, client)
}

fn order(ticket: u64, login: u64, minutes_ago: i64) -> OrderRecord {
    let setup_time = Utc::now() - ChronoDuration::minutes(minutes_ago);
    OrderRecord {
        ticket,
        login,
        symbol: "EURUSD".to_string(),
        kind: OrderKind::Buy,
        state: OrderState::Filled,
        volume_initial: dec!(1.00),
        volume_current: Decimal::ZERO,
        price_order: dec!(1.0850),
        price_current: dec!(1.0850),
        stop_loss: None,
        take_profit: Some(dec!(1.0950)),
        setup_time,
        done_time: Some(setup_time),
        comment: String::new(),
    }
}

fn seed_account(server: &StubServer, login: u64) {
    server.insert_user(UserRecord {
        login: Some(login),
        group: "demo\\forex".to_string(),
        name: "Seeded".to_string(),
        ..UserRecord::create_default()
    });
}

#[cfg(test)]
mod connection_tests {
    use super::*;

    #[tokio::test]
    async fn test_first_operation_connects_once() {
        let (server, mut client) = create_test_client();
        seed_account(&server, 1001);
        assert_eq!(client.state(), SessionState::Absent);

        client.get_account(1001).await.unwrap();
        client.user_logins("demo\\*").await.unwrap();

        let calls = server.calls();
        assert_eq!(server.open_count(), 1);
        assert!(matches!(calls[0], StubCall::Open { port: 443, encrypted: true, .. }));
        assert!(matches!(calls[1], StubCall::Authenticate { login: 1000, version: 2190, .. }));
        assert_eq!(calls[2], StubCall::SetSessionKey);
        assert_eq!(calls[3], StubCall::UserGet(1001));
        assert_eq!(client.state(), SessionState::Live);
    }

    #[tokio::test]
    async fn test_agent_is_announced() {
        let server = StubServer::new();
        let mut client = ManagerBuilder::new("10.0.0.1", 443, 1000, "pw")
            .with_agent("BackOffice")
            .build(server.protocol());

        assert_eq!(client.connect().await, ResultCode::Ok);
        let agent = server.calls().into_iter().find_map(|call| match call {
            StubCall::Authenticate { agent, .. } => Some(agent),
            _ => None,
        });
        assert_eq!(agent.as_deref(), Some("BackOffice"));
        let agent = client.session().map(|s| s.agent());
        assert_eq!(agent, Some("BackOffice"));
    }

    #[tokio::test]
    async fn test_unreachable_server_fails_before_domain_calls() {
        let (server, mut client) = create_test_client();
        server.set_open_result(ResultCode::ErrNetwork);

        let result = client
            .create_account(AccountProfile::new("demo\\forex", "Jane Roe"))
            .await;

        match result {
            Err(ManagerError::Connection(code)) => assert_eq!(code, ResultCode::ErrNetwork),
            other => panic!("expected connection error, got {:?}", other),
        }
        assert!(server.domain_calls().is_empty());
        assert!(!client.is_connected());
        assert_eq!(client.state(), SessionState::Absent);
    }

    #[tokio::test]
    async fn test_every_operation_requires_a_session() {
        let (server, mut client) = create_test_client();
        server.set_open_result(ResultCode::ErrNetwork);
        let to = Utc::now();
        let from = to - ChronoDuration::days(1);
        let profile = AccountProfile::new("demo\\forex", "Jane Roe");

        let outcomes = vec![
            (
                "trade",
                client
                    .trade(BalanceOperation::deposit(1001, dec!(10), "deposit"))
                    .await
                    .err(),
            ),
            (
                "create_account",
                client.create_account(profile.clone()).await.err(),
            ),
            ("user_logins", client.user_logins("*").await.err()),
            ("get_account", client.get_account(1001).await.err()),
            ("delete_account", client.delete_account(1001).await.err()),
            (
                "update_account",
                client
                    .update_account(profile.with_login(1001))
                    .await
                    .err(),
            ),
            ("get_order", client.get_order(1).await.err()),
            ("get_order_total", client.get_order_total(1001).await.err()),
            (
                "get_order_page",
                client.get_order_page(1001, 0, 10).await.err(),
            ),
            (
                "conduct_user_balance",
                client
                    .conduct_user_balance(1001, BalanceAction::Balance, dec!(10), "deposit")
                    .await
                    .err(),
            ),
            (
                "get_order_history_total",
                client.get_order_history_total(1001, from, to).await.err(),
            ),
            (
                "get_order_history_page",
                client
                    .get_order_history_page(1001, from, to, 0, 10)
                    .await
                    .err(),
            ),
        ];

        assert_eq!(outcomes.len(), 12);
        for (operation, err) in &outcomes {
            assert!(
                matches!(err, Some(ManagerError::Connection(ResultCode::ErrNetwork))),
                "{} did not fail with a connection error: {:?}",
                operation,
                err
            );
        }
        assert_eq!(server.open_count(), 12);
        assert!(server.domain_calls().is_empty());
        assert_eq!(client.state(), SessionState::Absent);
    }

    #[tokio::test]
    async fn test_auth_failure_closes_transport() {
        let (server, mut client) = create_test_client();
        server.set_auth_result(ResultCode::AuthAccountDisabled);

        assert_eq!(client.connect().await, ResultCode::AuthAccountDisabled);
        assert!(!client.is_connected());
        assert_eq!(server.calls().last(), Some(&StubCall::Close));

        let err = client.get_order_total(1001).await.unwrap_err();
        assert!(err.is_connection());
        assert_eq!(err.description(), "Account disabled");
        assert!(server.domain_calls().is_empty());
    }

    #[tokio::test]
    async fn test_wrong_credentials() {
        let (server, mut client) = create_test_client();
        server.require_credentials(1000, "SomethingElse");

        assert_eq!(client.connect().await, ResultCode::AuthAccountInvalid);
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn test_plain_session_skips_key_seeding() {
        let server = StubServer::new();
        let mut client = ManagerBuilder::new("10.0.0.1", 443, 1000, "pw")
            .with_crypt(false)
            .build(server.protocol());

        assert_eq!(client.connect().await, ResultCode::Ok);
        assert!(!server.calls().contains(&StubCall::SetSessionKey));
        let session = client.session().unwrap();
        assert!(!session.is_encrypted());
        assert!(session.key_material().is_none());
    }

    #[tokio::test]
    async fn test_missing_key_material_rejects_session() {
        let (server, mut client) = create_test_client();
        server.set_withhold_key_material(true);

        assert_eq!(client.connect().await, ResultCode::AuthServerBad);
        assert!(!client.is_connected());
        assert!(!server.calls().contains(&StubCall::SetSessionKey));
        assert_eq!(server.calls().last(), Some(&StubCall::Close));
    }

    #[tokio::test]
    async fn test_encrypted_session_holds_key_material() {
        let (_server, mut client) = create_test_client();

        assert_eq!(client.connect().await, ResultCode::Ok);
        let session = client.session().unwrap();
        assert!(session.is_encrypted());
        assert!(session.transport().session_key().is_some());
        assert_eq!(session.login(), 1000);
        assert_eq!(session.address(), "10.0.0.1");
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let (server, mut client) = create_test_client();

        client.disconnect().await;
        assert!(server.calls().is_empty());

        assert_eq!(client.connect().await, ResultCode::Ok);
        client.disconnect().await;
        client.disconnect().await;

        let closes = server
            .calls()
            .iter()
            .filter(|c| **c == StubCall::Close)
            .count();
        assert_eq!(closes, 1);
        assert!(!client.is_connected());
        assert_eq!(client.state(), SessionState::Absent);
    }

    #[tokio::test]
    async fn test_reconnect_closes_previous_session() {
        let (server, mut client) = create_test_client();

        assert_eq!(client.connect().await, ResultCode::Ok);
        assert_eq!(client.connect().await, ResultCode::Ok);

        assert_eq!(server.open_count(), 2);
        assert!(server.calls().contains(&StubCall::Close));
        assert!(client.is_connected());
    }

    #[tokio::test]
    async fn test_operation_after_disconnect_reconnects() {
        let (server, mut client) = create_test_client();
        seed_account(&server, 1001);

        client.get_account(1001).await.unwrap();
        client.disconnect().await;
        client.get_account(1001).await.unwrap();

        assert_eq!(server.open_count(), 2);
    }
}

#[cfg(test)]
mod account_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_account_assigns_login() {
        let (server, mut client) = create_test_client();
        server.set_next_login(1001);

        let profile = AccountProfile::new("demo\\forex", "Jane Roe")
            .with_main_password("Main123")
            .with_investor_password("Invest123");
        let created = client.create_account(profile).await.unwrap();

        assert_eq!(created.login, Some(1001));
        assert_eq!(created.name, "Jane Roe");
        assert_eq!(
            server.domain_calls(),
            vec![StubCall::UserAdd {
                group: "demo\\forex".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_create_then_get_round_trips_login() {
        let (_server, mut client) = create_test_client();

        let mut profile = AccountProfile::new("real\\usd", "John Doe").with_leverage(500);
        profile.email = "john@example.com".to_string();
        profile.country = "Cyprus".to_string();

        let created = client.create_account(profile).await.unwrap();
        let login = created.login.unwrap();
        let fetched = client.get_account(login).await.unwrap();

        assert_eq!(fetched.login, Some(login));
        assert_eq!(fetched.email, "john@example.com");
        assert_eq!(fetched.country, "Cyprus");
        assert_eq!(fetched.leverage, 500);
    }

    #[tokio::test]
    async fn test_invalid_account_is_user_error() {
        let (server, mut client) = create_test_client();
        server.fail_next(ResultCode::AuthAccountInvalid);

        let err = client.get_account(4242).await.unwrap_err();

        assert!(matches!(
            err,
            ManagerError::User(ResultCode::AuthAccountInvalid)
        ));
        assert_eq!(err.description(), "Invalid account");
        assert_eq!(err.to_string(), "User error: Invalid account");
        assert!(client.is_connected());
        assert_eq!(client.state(), SessionState::Live);
    }

    #[tokio::test]
    async fn test_failure_keeps_session_for_next_call() {
        let (server, mut client) = create_test_client();
        seed_account(&server, 1001);
        server.fail_next(ResultCode::ErrTimeout);

        assert!(client.get_account(1001).await.is_err());
        assert!(client.get_account(1001).await.is_ok());
        assert_eq!(server.open_count(), 1);
    }

    #[tokio::test]
    async fn test_user_logins_filters_by_group() {
        let (server, mut client) = create_test_client();
        seed_account(&server, 1001);
        seed_account(&server, 1002);
        server.insert_user(UserRecord {
            login: Some(2001),
            group: "real\\usd".to_string(),
            ..UserRecord::create_default()
        });

        let demo = client.user_logins("demo\\*").await.unwrap();
        assert_eq!(demo, vec![1001, 1002]);
        let all = client.user_logins("*").await.unwrap();
        assert_eq!(all, vec![1001, 1002, 2001]);
        let contest = client.user_logins("contest\\*").await.unwrap();
        assert!(contest.is_empty());
    }

    #[tokio::test]
    async fn test_delete_account() {
        let (server, mut client) = create_test_client();
        seed_account(&server, 1001);

        assert!(client.delete_account(1001).await.unwrap());
        assert!(server.user(1001).is_none());

        let err = client.delete_account(1001).await.unwrap_err();
        assert!(matches!(err, ManagerError::User(ResultCode::ErrNotFound)));
    }

    #[tokio::test]
    async fn test_update_account_keeps_server_fields() {
        let (server, mut client) = create_test_client();
        seed_account(&server, 1001);
        client
            .conduct_user_balance(1001, BalanceAction::Balance, dec!(300), "seed")
            .await
            .unwrap();

        let mut profile = client.get_account(1001).await.unwrap();
        profile.name = "Renamed".to_string();
        profile.leverage = 50;
        let updated = client.update_account(profile).await.unwrap();

        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.leverage, 50);
        let stored = server.user(1001).unwrap();
        assert_eq!(stored.balance, dec!(300));
        assert_eq!(stored.name, "Renamed");
    }

    #[tokio::test]
    async fn test_update_without_login_is_invalid_params() {
        let (server, mut client) = create_test_client();

        let err = client
            .update_account(AccountProfile::new("demo\\forex", "No Login"))
            .await
            .unwrap_err();

        assert!(matches!(err, ManagerError::User(ResultCode::ErrParams)));
        assert!(client.is_connected());
        assert!(server.domain_calls().is_empty());
    }
}

#[cfg(test)]
mod trading_tests {
    use super::*;

    #[tokio::test]
    async fn test_trade_only_fills_ticket() {
        let (server, mut client) = create_test_client();
        seed_account(&server, 1001);

        let request = BalanceOperation::deposit(1001, dec!(250.50), "wire in");
        let executed = client.trade(request.clone()).await.unwrap();

        assert!(executed.ticket().is_some());
        assert_eq!(executed.login(), request.login());
        assert_eq!(executed.action(), request.action());
        assert_eq!(executed.amount(), request.amount());
        assert_eq!(executed.comment(), request.comment());
        assert_eq!(server.user(1001).unwrap().balance, dec!(250.50));
    }

    #[tokio::test]
    async fn test_trade_rejection_is_trade_error() {
        let (server, mut client) = create_test_client();
        seed_account(&server, 1001);
        server.fail_next(ResultCode::TradeMaxMoney);

        let withdrawal = BalanceOperation::withdrawal(1001, dec!(1000000), "too much");
        let err = client.trade(withdrawal).await.unwrap_err();

        assert!(matches!(
            err,
            ManagerError::Trade(ResultCode::TradeMaxMoney)
        ));
        assert_eq!(err.description(), "Money limit reached");
        assert!(client.is_connected());
    }

    #[tokio::test]
    async fn test_trade_without_ticket() {
        let (server, mut client) = create_test_client();
        seed_account(&server, 1001);
        server.set_withhold_ticket(true);

        let executed = client
            .trade(BalanceOperation::credit(1001, dec!(50), "promo"))
            .await
            .unwrap();

        assert_eq!(executed.ticket(), None);
        assert_eq!(server.user(1001).unwrap().credit, dec!(50));
    }

    #[tokio::test]
    async fn test_conduct_user_balance_maps_to_user_error() {
        let (server, mut client) = create_test_client();
        seed_account(&server, 1001);

        let ticket = client
            .conduct_user_balance(1001, BalanceAction::Bonus, dec!(10), "bonus")
            .await
            .unwrap();
        assert!(ticket.is_some());

        server.fail_next(ResultCode::TradeMaxMoney);
        let err = client
            .conduct_user_balance(1001, BalanceAction::Balance, dec!(10), "again")
            .await
            .unwrap_err();
        assert!(matches!(err, ManagerError::User(ResultCode::TradeMaxMoney)));
    }
}

#[cfg(test)]
mod order_tests {
    use super::*;

    fn seed_orders(server: &StubServer) {
        for ticket in 1..=5 {
            server.add_order(order(ticket, 1001, 0));
        }
        server.add_order(order(99, 2002, 0));
    }

    #[tokio::test]
    async fn test_get_order() {
        let (server, mut client) = create_test_client();
        seed_orders(&server);

        let found = client.get_order(3).await.unwrap();
        assert_eq!(found.ticket, 3);
        assert_eq!(found.symbol, "EURUSD");

        let err = client.get_order(404).await.unwrap_err();
        assert!(matches!(err, ManagerError::User(ResultCode::ErrNotFound)));
    }

    #[tokio::test]
    async fn test_order_total_and_pages() {
        let (server, mut client) = create_test_client();
        seed_orders(&server);

        assert_eq!(client.get_order_total(1001).await.unwrap(), 5);

        let first = client.get_order_page(1001, 0, 2).await.unwrap();
        let tickets: Vec<_> = first.iter().map(|o| o.ticket).collect();
        assert_eq!(tickets, vec![1, 2]);

        let last = client.get_order_page(1001, 4, 2).await.unwrap();
        let tickets: Vec<_> = last.iter().map(|o| o.ticket).collect();
        assert_eq!(tickets, vec![5]);

        let past_end = client.get_order_page(1001, 10, 2).await.unwrap();
        assert!(past_end.is_empty());
        let empty = client.get_order_page(1001, 0, 0).await.unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn test_order_lookup_failure_is_user_error() {
        let (server, mut client) = create_test_client();
        server.fail_next(ResultCode::ErrNetwork);

        let err = client.get_order_total(1001).await.unwrap_err();
        assert!(matches!(err, ManagerError::User(ResultCode::ErrNetwork)));
        assert_eq!(err.description(), "Network error");
    }

    #[tokio::test]
    async fn test_history_range() {
        let (server, mut client) = create_test_client();
        server.add_history(order(10, 1001, 10));
        server.add_history(order(11, 1001, 20));
        server.add_history(order(12, 1001, 60 * 24 * 3));
        server.add_history(order(13, 2002, 10));

        let to = Utc::now();
        let from = to - ChronoDuration::days(1);

        let total = client.get_order_history_total(1001, from, to).await.unwrap();
        assert_eq!(total, 2);

        let page = client
            .get_order_history_page(1001, from, to, 0, 10)
            .await
            .unwrap();
        let tickets: Vec<_> = page.iter().map(|o| o.ticket).collect();
        assert_eq!(tickets, vec![10, 11]);

        let page = client
            .get_order_history_page(1001, from, to, 1, 10)
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].ticket, 11);

        assert!(client
            .get_order_history_page(1001, from, to, 2, 10)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_history_failure_is_user_error() {
        let (server, mut client) = create_test_client();
        server.fail_next(ResultCode::HstSymbolNotFound);

        let to = Utc::now();
        let err = client
            .get_order_history_total(1001, to - ChronoDuration::days(1), to)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ManagerError::User(ResultCode::HstSymbolNotFound)
        ));
        assert_eq!(server.domain_calls(), vec![StubCall::HistoryTotal(1001)]);
    }
}
