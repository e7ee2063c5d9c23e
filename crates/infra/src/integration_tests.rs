//! Integration tests for onboarding and the merchant ledger.
//!
//! Tests: SignUpManager → MerchantAggregate → AccountLedger → in-memory adapters
//!
//! Verifies:
//! - Review outcomes (approve, reject, re-review) persist the right state
//! - Ledger operations keep balances and entries consistent
//! - The transfer saga compensates and reports partial failures
//! - Concurrent settlements on one merchant never lose an update

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use chrono::{Duration, Utc};
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    use vendorledger_core::{
        DomainError, ExpectedVersion, FieldProblem, MemberId, MerchantId, Money, SignUpField,
    };
    use vendorledger_merchant::{
        AccountLedger, AccountStore, BalanceLogKind, ChangeKind, FeeConfig, KvManager, LogState,
        MemberLevel, Merchant, MerchantAggregate, MerchantConfig, MerchantDeps, MerchantSignUp,
        MerchantStatus, MerchantUpdate, MerchantUser, Registry, ReviewDecision, ReviewStatus, Shop,
        ShopKind, SignUpManager,
    };

    use crate::backend::InMemoryBackend;

    const MEMBER: i64 = 42;

    struct Harness {
        backend: InMemoryBackend,
        deps: MerchantDeps,
        sign_ups: SignUpManager,
    }

    fn member(id: i64) -> MemberId {
        MemberId::new(id).unwrap()
    }

    fn money(cents: i64) -> Money {
        Money::from_minor(cents)
    }

    fn setup() -> Harness {
        vendorledger_observability::init_for_tests();

        let backend = InMemoryBackend::new();
        for (id, name) in [(MEMBER, "Li Wei"), (43, "Zhang Min"), (44, "Chen Jie")] {
            backend.members.add_member(member(id), name).unwrap();
        }
        backend.values.add_area(440000, "Guangdong");
        backend.values.add_area(440300, "Shenzhen");
        backend.values.add_area(440305, "Nanshan");

        let config = MerchantConfig {
            server_domain: "mall.test".to_string(),
            ..MerchantConfig::default()
        };
        let deps = backend.deps(config);
        let sign_ups = SignUpManager::new(deps.clone());
        Harness {
            backend,
            deps,
            sign_ups,
        }
    }

    fn application(member_id: i64) -> MerchantSignUp {
        MerchantSignUp {
            member_id: MemberId::new(member_id),
            mch_name: "Blue Lantern".to_string(),
            province: 440000,
            city: 440300,
            district: 440305,
            address: "12 Harbour Road".to_string(),
            company_name: "Blue Lantern Trading Co.".to_string(),
            company_no: "91440300MA5FL0001X".to_string(),
            phone: "13800000000".to_string(),
            person_name: "Li Wei".to_string(),
            person_id: "440301199003071230".to_string(),
            person_image: "person.jpg".to_string(),
            company_image: "licence.jpg".to_string(),
            ..MerchantSignUp::default()
        }
    }

    /// Persist the platform's own store so that approved merchants get ids > 1.
    fn seed_platform_store(h: &Harness) -> MerchantAggregate {
        let now = Utc::now();
        let value = Merchant {
            id: None,
            member_id: None,
            name: "Platform Store".to_string(),
            self_operated: false,
            level: 1,
            logo: String::new(),
            province: 0,
            city: 0,
            district: 0,
            enabled: true,
            expires_at: now + Duration::days(3650),
            join_time: now,
            update_time: now,
            login_time: None,
            last_login_time: None,
            account: "platform".to_string(),
            password: "platform-secret".to_string(),
        };
        let mut store = MerchantAggregate::new(value, h.deps.clone());
        store.save().unwrap();
        store
    }

    fn approved_merchant(h: &Harness, member_id: i64) -> MerchantAggregate {
        let id = h.sign_ups.commit_sign_up(application(member_id)).unwrap();
        h.sign_ups.review(id, ReviewDecision::Approve).unwrap();
        h.sign_ups
            .merchant_by_member(member(member_id))
            .unwrap()
            .expect("approved merchant")
    }

    fn ledger_with_balance(h: &Harness, cents: i64) -> (MerchantAggregate, AccountLedger) {
        seed_platform_store(h);
        let merchant = approved_merchant(h, MEMBER);
        let ledger = merchant.account().unwrap();
        if cents > 0 {
            ledger
                .settle_order("SO-SEED", money(cents), Money::ZERO, Money::ZERO, "seed")
                .unwrap();
        }
        (merchant, ledger)
    }

    // --- onboarding ---

    #[test]
    fn approved_application_becomes_merchant_with_profile() {
        let h = setup();
        seed_platform_store(&h);

        let id = h.sign_ups.commit_sign_up(application(MEMBER)).unwrap();
        assert!(id.get() > 0);
        let submitted = h.sign_ups.sign_up(id).unwrap().unwrap();
        assert_eq!(submitted.reviewed, ReviewStatus::Awaiting);
        let submit_time = submitted.submit_time.expect("submit time stamped");

        h.sign_ups.review(id, ReviewDecision::Approve).unwrap();

        let merchant = h.sign_ups.merchant_by_member(member(MEMBER)).unwrap().unwrap();
        let value = merchant.value();
        assert_ne!(merchant.id(), Some(MerchantId::ROOT));
        assert!(value.enabled);
        assert!(!value.self_operated);
        assert_eq!(value.name, "Blue Lantern");
        assert_eq!(value.level, 1);
        assert_eq!(value.expires_at, submit_time + Duration::days(365));
        assert_eq!(merchant.status(), MerchantStatus::Ok);

        let profile = merchant.profile_manager().unwrap().enterprise_info().unwrap().unwrap();
        assert_eq!(profile.reviewed, ReviewStatus::Pass);
        assert_eq!(profile.name, "Blue Lantern Trading Co.");
        assert_eq!(profile.person_id_no, "440301199003071230");
        assert_eq!(profile.location, "GuangdongShenzhenNanshan");

        let api = merchant.api_manager().unwrap().api_info().unwrap().unwrap();
        assert!(api.enabled);
        assert_eq!(api.white_list, "*");

        let stored = h.sign_ups.sign_up(id).unwrap().unwrap();
        assert_eq!(stored.reviewed, ReviewStatus::Pass);
        assert!(stored.remark.is_empty());
    }

    #[test]
    fn submission_requires_a_known_member() {
        let h = setup();

        for v in [application(999), MerchantSignUp { member_id: None, ..application(MEMBER) }] {
            let err = h.sign_ups.commit_sign_up(v).unwrap_err();
            assert_eq!(
                err,
                DomainError::validation(SignUpField::Member, FieldProblem::Unknown)
            );
        }
        assert!(h.sign_ups.sign_up_by_member(member(999)).unwrap().is_none());
    }

    #[test]
    fn resubmitting_a_draft_keeps_its_id() {
        let h = setup();
        let id = h.sign_ups.commit_sign_up(application(MEMBER)).unwrap();

        let mut draft = h.sign_ups.sign_up(id).unwrap().unwrap();
        draft.mch_name = "Blue Lantern Outlet".to_string();
        let again = h.sign_ups.commit_sign_up(draft).unwrap();

        assert_eq!(again, id);
        let stored = h.sign_ups.sign_up_by_member(member(MEMBER)).unwrap().unwrap();
        assert_eq!(stored.mch_name, "Blue Lantern Outlet");
    }

    #[test]
    fn rejection_needs_remark_and_repeats_cleanly() {
        let h = setup();
        let id = h.sign_ups.commit_sign_up(application(MEMBER)).unwrap();

        let err = h
            .sign_ups
            .review(id, ReviewDecision::from_flag(false, "  "))
            .unwrap_err();
        assert_eq!(err, DomainError::MissingRejectionRemark);
        assert_eq!(
            h.sign_ups.sign_up(id).unwrap().unwrap().reviewed,
            ReviewStatus::Awaiting
        );

        for _ in 0..2 {
            h.sign_ups
                .review(id, ReviewDecision::from_flag(false, "blurry licence"))
                .unwrap();
            let stored = h.sign_ups.sign_up(id).unwrap().unwrap();
            assert_eq!(stored.reviewed, ReviewStatus::Reject);
            assert_eq!(stored.remark, "blurry licence");
        }
        assert!(h.sign_ups.merchant_by_member(member(MEMBER)).unwrap().is_none());

        let err = h.sign_ups.review(id, ReviewDecision::Approve).unwrap_err();
        assert!(matches!(err, DomainError::InvalidReviewState(_)));
    }

    #[test]
    fn approving_twice_creates_one_merchant() {
        let h = setup();
        seed_platform_store(&h);
        let id = h.sign_ups.commit_sign_up(application(MEMBER)).unwrap();

        h.sign_ups.review(id, ReviewDecision::Approve).unwrap();
        let err = h.sign_ups.review(id, ReviewDecision::Approve).unwrap_err();
        assert!(matches!(err, DomainError::InvalidReviewState(_)));
        let err = h
            .sign_ups
            .review(id, ReviewDecision::from_flag(false, "too late"))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidReviewState(_)));

        let approved = h.sign_ups.sign_up(id).unwrap().unwrap();
        let err = h.sign_ups.commit_sign_up(approved).unwrap_err();
        assert!(matches!(err, DomainError::InvalidReviewState(_)));

        assert_eq!(h.backend.merchants.merchant_count().unwrap(), 2);
    }

    #[test]
    fn concurrent_approvals_create_one_merchant() {
        let h = setup();
        let id = h.sign_ups.commit_sign_up(application(MEMBER)).unwrap();
        h.backend
            .merchants
            .delay_member_lookups(std::time::Duration::from_millis(50));

        let sign_ups = Arc::new(h.sign_ups);
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let sign_ups = sign_ups.clone();
                thread::spawn(move || sign_ups.review(id, ReviewDecision::Approve))
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|t| t.join().unwrap()).collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(DomainError::InvalidReviewState(_)))));
        assert_eq!(h.backend.merchants.merchant_count().unwrap(), 1);
        assert!(h.backend.sign_up_locks.is_empty());
    }

    #[test]
    fn member_with_a_merchant_cannot_take_over_its_profile() {
        let h = setup();
        seed_platform_store(&h);
        let first = h.sign_ups.commit_sign_up(application(MEMBER)).unwrap();
        let second = h
            .sign_ups
            .commit_sign_up(MerchantSignUp {
                company_name: "Other Co".to_string(),
                ..application(MEMBER)
            })
            .unwrap();
        h.sign_ups.review(first, ReviewDecision::Approve).unwrap();

        // A pending application from before the approval cannot be promoted.
        let err = h.sign_ups.review(second, ReviewDecision::Approve).unwrap_err();
        assert!(matches!(err, DomainError::InvalidReviewState(_)));
        assert_eq!(
            h.sign_ups.sign_up(second).unwrap().unwrap().reviewed,
            ReviewStatus::Awaiting
        );

        // A fresh application is refused outright.
        let err = h
            .sign_ups
            .commit_sign_up(MerchantSignUp {
                company_name: "Other Co".to_string(),
                ..application(MEMBER)
            })
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidReviewState(_)));

        let merchant = h.sign_ups.merchant_by_member(member(MEMBER)).unwrap().unwrap();
        let profile = merchant.profile_manager().unwrap().enterprise_info().unwrap().unwrap();
        assert_eq!(profile.name, "Blue Lantern Trading Co.");
        assert_eq!(h.backend.merchants.merchant_count().unwrap(), 2);
    }

    #[test]
    fn reviewing_unknown_application_fails() {
        let h = setup();
        let missing = vendorledger_core::SignUpId::new(77).unwrap();
        let err = h.sign_ups.review(missing, ReviewDecision::Approve).unwrap_err();
        assert_eq!(err, DomainError::NoSuchApplication);
    }

    #[test]
    fn failed_profile_save_leaves_application_awaiting() {
        let h = setup();
        seed_platform_store(&h);
        let id = h.sign_ups.commit_sign_up(application(MEMBER)).unwrap();

        h.backend.merchants.fail_profile_saves(true);
        let err = h.sign_ups.review(id, ReviewDecision::Approve).unwrap_err();
        assert!(matches!(err, DomainError::Persistence(_)));

        assert_eq!(
            h.sign_ups.sign_up(id).unwrap().unwrap().reviewed,
            ReviewStatus::Awaiting
        );
        // The merchant saved before the profile failure is not rolled back.
        let merchant = h.sign_ups.merchant_by_member(member(MEMBER)).unwrap().unwrap();
        assert!(merchant.profile_manager().unwrap().enterprise_info().unwrap().is_none());

        // A retried approval reuses that merchant.
        h.backend.merchants.fail_profile_saves(false);
        h.sign_ups.review(id, ReviewDecision::Approve).unwrap();
        assert_eq!(h.backend.merchants.merchant_count().unwrap(), 2);
        let profile = merchant.profile_manager().unwrap().enterprise_info().unwrap().unwrap();
        assert_eq!(profile.reviewed, ReviewStatus::Pass);
    }

    #[test]
    fn sign_up_tokens_and_removal() {
        let h = setup();
        let token = h.sign_ups.create_sign_up_token(member(MEMBER)).unwrap();
        assert_eq!(
            h.sign_ups.member_from_sign_up_token(&token).unwrap(),
            Some(member(MEMBER))
        );
        assert_eq!(h.sign_ups.member_from_sign_up_token("nope").unwrap(), None);

        h.sign_ups.commit_sign_up(application(MEMBER)).unwrap();
        assert_eq!(h.sign_ups.remove_sign_up(member(MEMBER)).unwrap(), 1);
        assert!(h.sign_ups.sign_up_by_member(member(MEMBER)).unwrap().is_none());
    }

    // --- merchant aggregate ---

    #[test]
    fn first_merchant_is_the_self_operated_store() {
        let h = setup();
        let store = seed_platform_store(&h);

        assert_eq!(store.id(), Some(MerchantId::ROOT));
        assert!(store.value().self_operated);
        assert!(store.is_self_operated());
        assert_eq!(store.value().account, "-");
        assert_eq!(store.value().password, "-");

        let reloaded = h.sign_ups.merchant(MerchantId::ROOT).unwrap();
        assert!(reloaded.value().self_operated);
    }

    #[test]
    fn non_root_merchant_claiming_self_operated_is_disabled_on_save() {
        let h = setup();
        seed_platform_store(&h);
        let mut merchant = approved_merchant(&h, MEMBER);

        let mut forged = merchant.value().clone();
        forged.self_operated = true;
        merchant = MerchantAggregate::new(forged, h.deps.clone());
        let id = merchant.save().unwrap();

        let stored = h.sign_ups.merchant(id).unwrap();
        assert!(!stored.value().self_operated);
        assert!(!stored.value().enabled);
        assert_eq!(stored.status(), MerchantStatus::Disabled);
    }

    #[test]
    fn disabled_is_reported_before_expired() {
        let h = setup();
        seed_platform_store(&h);
        let mut merchant = approved_merchant(&h, MEMBER);

        let later = merchant.value().expires_at + Duration::days(1);
        assert_eq!(merchant.status_at(later), MerchantStatus::Expired);
        assert_eq!(merchant.ensure_active(later), Err(DomainError::MerchantExpired));

        merchant.set_enabled(false).unwrap();
        assert_eq!(merchant.status_at(later), MerchantStatus::Disabled);
        assert_eq!(merchant.ensure_active(Utc::now()), Err(DomainError::MerchantDisabled));

        let id = merchant.id().unwrap();
        assert!(!h.sign_ups.merchant(id).unwrap().value().enabled);
    }

    #[test]
    fn set_value_updates_editable_fields_only() {
        let h = setup();
        seed_platform_store(&h);
        let mut merchant = approved_merchant(&h, MEMBER);
        let expires_at = merchant.value().expires_at;
        let login = Utc::now();

        merchant.set_value(MerchantUpdate {
            name: "Blue Lantern Flagship".to_string(),
            province: 440000,
            city: 440300,
            district: 440305,
            logo: String::new(),
            login_time: Some(login),
            last_login_time: None,
            password: "new-secret".to_string(),
        });
        merchant.save().unwrap();

        let stored = h.sign_ups.merchant(merchant.id().unwrap()).unwrap();
        assert_eq!(stored.value().name, "Blue Lantern Flagship");
        assert_eq!(stored.value().login_time, Some(login));
        assert_eq!(stored.value().last_login_time, None);
        assert_eq!(stored.value().expires_at, expires_at);
        assert!(stored.value().logo.is_empty());
    }

    #[test]
    fn major_host_falls_back_to_account_subdomain() {
        let h = setup();
        seed_platform_store(&h);
        let mut merchant = approved_merchant(&h, MEMBER);
        let mut value = merchant.value().clone();
        value.account = "bluelantern".to_string();
        merchant = MerchantAggregate::new(value, h.deps.clone());
        merchant.save().unwrap();

        assert_eq!(merchant.major_host().unwrap(), "bluelantern.mall.test");

        let id = merchant.id().unwrap();
        h.backend.merchants.bind_host(id, "shop.bluelantern.cn").unwrap();
        assert_eq!(merchant.major_host().unwrap(), "shop.bluelantern.cn");
    }

    #[test]
    fn wholesale_can_be_enabled_once() {
        let h = setup();
        seed_platform_store(&h);
        let merchant = approved_merchant(&h, MEMBER);
        assert!(merchant.wholesaler().unwrap().is_none());

        let wholesaler = merchant.enable_wholesale().unwrap();
        assert_eq!(wholesaler.rate, dec!(1));
        assert_eq!(wholesaler.review_state, ReviewStatus::Awaiting);

        assert_eq!(
            merchant.enable_wholesale().unwrap_err(),
            DomainError::WholesaleAlreadyEnabled
        );
    }

    #[test]
    fn sub_managers_need_a_persisted_merchant() {
        let h = setup();
        let store = seed_platform_store(&h);
        let unsaved = MerchantAggregate::new(
            Merchant {
                id: None,
                ..store.value().clone()
            },
            h.deps.clone(),
        );

        assert_eq!(unsaved.account().unwrap_err(), DomainError::NoSuchMerchant);
        assert!(matches!(unsaved.kv_manager(), Err(DomainError::NoSuchMerchant)));
        assert!(matches!(unsaved.shop_manager(), Err(DomainError::NoSuchMerchant)));
        assert!(matches!(unsaved.major_host(), Err(DomainError::NoSuchMerchant)));
        assert!(matches!(
            unsaved.enable_wholesale(),
            Err(DomainError::NoSuchMerchant)
        ));
        assert!(matches!(
            h.sign_ups.merchant(MerchantId::new(99).unwrap()),
            Err(DomainError::NoSuchMerchant)
        ));
    }

    #[test]
    fn sub_managers_are_scoped_to_the_merchant() {
        let h = setup();
        seed_platform_store(&h);
        let merchant = approved_merchant(&h, MEMBER);
        let id = merchant.id().unwrap();

        let settings = merchant.kv_manager().unwrap();
        let member_settings = merchant.member_kv_manager().unwrap();
        assert_eq!(settings.namespace(), KvManager::MERCHANT_NAMESPACE);
        settings.set("order_timeout_minutes", "30").unwrap();
        member_settings.set("order_timeout_minutes", "oops").unwrap();
        assert_eq!(settings.get_int("order_timeout_minutes").unwrap(), 30);
        assert_eq!(member_settings.get_int("order_timeout_minutes").unwrap(), 0);
        assert_eq!(settings.get("missing").unwrap(), None);

        let levels = merchant.level_manager().unwrap();
        for (name, value, enabled) in [("Gold", 3, true), ("Basic", 1, false), ("Silver", 2, true)] {
            levels
                .save_level(MemberLevel {
                    id: None,
                    merchant_id: MerchantId::ROOT,
                    name: name.to_string(),
                    value,
                    enabled,
                })
                .unwrap();
        }
        let names: Vec<_> = levels.levels().unwrap().into_iter().map(|l| l.name).collect();
        assert_eq!(names, ["Basic", "Silver", "Gold"]);
        assert_eq!(levels.initial_level().unwrap().unwrap().name, "Silver");

        for (shop_id, kind) in [(1, ShopKind::Offline), (2, ShopKind::Online)] {
            h.backend
                .catalog
                .add_shop(Shop {
                    id: shop_id,
                    merchant_id: id,
                    name: format!("shop {shop_id}"),
                    kind,
                    enabled: true,
                })
                .unwrap();
        }
        let shops = merchant.shop_manager().unwrap();
        assert_eq!(shops.shops().unwrap().len(), 2);
        assert_eq!(shops.online_shop().unwrap().unwrap().id, 2);

        h.backend
            .catalog
            .add_user(MerchantUser {
                id: 9,
                merchant_id: id,
                name: "cashier".to_string(),
                role: "staff".to_string(),
                enabled: true,
            })
            .unwrap();
        let users = merchant.user_manager().unwrap();
        assert_eq!(users.user(9).unwrap().unwrap().name, "cashier");
        assert!(users.user(10).unwrap().is_none());

        let api = merchant.api_manager().unwrap();
        let before = api.api_info().unwrap().unwrap();
        let secret = api.refresh_secret().unwrap();
        let after = api.api_info().unwrap().unwrap();
        assert_eq!(after.api_id, before.api_id);
        assert_ne!(after.api_secret, before.api_secret);
        assert_eq!(after.api_secret, secret);
        api.set_enabled(false).unwrap();
        assert!(!api.api_info().unwrap().unwrap().allows_caller("10.0.0.1"));
    }

    // --- ledger ---

    #[test]
    fn settlement_credits_balance_and_records_entry() {
        let h = setup();
        let (merchant, ledger) = ledger_with_balance(&h, 0);

        let log = ledger
            .settle_order("SO-1001", money(12_050), money(150), money(500), "order settled")
            .unwrap();

        let account = ledger.account().unwrap();
        assert_eq!(account.balance, money(12_050));
        assert_eq!(account.sales_amount, money(12_050));
        assert_eq!(account.refund_amount, money(500));
        assert_eq!(account.version, 1);

        assert_eq!(log.kind, BalanceLogKind::SettleOrder);
        assert_eq!(log.state, LogState::Completed);
        assert_eq!(log.amount, money(12_050));
        assert_eq!(log.csn_amount, money(150));
        assert_eq!(log.outer_no.as_deref(), Some("SO-1001"));
        assert_eq!(log.merchant_id, merchant.id().unwrap());

        let id = log.id.unwrap();
        assert_eq!(ledger.balance_log(id).unwrap(), Some(log.clone()));
        assert_eq!(ledger.balance_log_by_outer_no("SO-1001").unwrap(), Some(log));
    }

    #[test]
    fn settling_the_same_order_twice_is_rejected() {
        let h = setup();
        let (_, ledger) = ledger_with_balance(&h, 0);

        ledger
            .settle_order("SO-1", money(1_000), Money::ZERO, Money::ZERO, "")
            .unwrap();
        let err = ledger
            .settle_order("SO-1", money(1_000), Money::ZERO, Money::ZERO, "")
            .unwrap_err();
        assert_eq!(err, DomainError::DuplicateReference("SO-1".to_string()));

        let err = ledger
            .settle_order("  ", money(1_000), Money::ZERO, Money::ZERO, "")
            .unwrap_err();
        assert_eq!(err, DomainError::missing(SignUpField::OrderNo));

        assert_eq!(ledger.account().unwrap().balance, money(1_000));
    }

    #[test]
    fn many_small_settlements_sum_exactly() {
        let h = setup();
        let (merchant, ledger) = ledger_with_balance(&h, 0);

        for n in 0..1_000 {
            let amount = Money::from_decimal(dec!(0.10));
            ledger
                .settle_order(&format!("SO-{n}"), amount, Money::ZERO, Money::ZERO, "")
                .unwrap();
        }

        let account = ledger.account().unwrap();
        assert_eq!(account.balance, Money::from_decimal(dec!(100.00)));
        assert_eq!(account.sales_amount, account.balance);
        let logs = h.backend.accounts.logs(merchant.id().unwrap()).unwrap();
        assert_eq!(logs.len(), 1_000);
    }

    #[test]
    fn present_adds_bonus() {
        let h = setup();
        let (merchant, ledger) = ledger_with_balance(&h, 10_000);

        let log = ledger.present(money(5_000), "promo").unwrap();

        let account = ledger.account().unwrap();
        assert_eq!(account.balance, money(15_000));
        assert_eq!(account.present_amount, money(5_000));
        assert_eq!(log.kind, BalanceLogKind::Present);
        assert_eq!(log.title, "promo");
        assert_eq!(h.backend.accounts.logs(merchant.id().unwrap()).unwrap().len(), 2);
    }

    #[test]
    fn transfer_requires_sufficient_funds() {
        let h = setup();
        let (merchant, ledger) = ledger_with_balance(&h, 1_000);

        let err = ledger.transfer_to_member(money(2_000)).unwrap_err();
        assert_eq!(err, DomainError::InsufficientFunds);

        assert_eq!(ledger.account().unwrap().balance, money(1_000));
        assert_eq!(h.backend.accounts.logs(merchant.id().unwrap()).unwrap().len(), 1);
        assert_eq!(h.backend.members.wallet(member(MEMBER)).unwrap(), Money::ZERO);
    }

    #[test]
    fn invalid_amounts_change_nothing() {
        let h = setup();
        let (merchant, ledger) = ledger_with_balance(&h, 1_000);

        assert_eq!(
            ledger.transfer_to_member(money(-500)).unwrap_err(),
            DomainError::InvalidAmount
        );
        assert_eq!(Money::try_from_f64(f64::NAN).unwrap_err(), DomainError::InvalidAmount);
        assert_eq!(
            ledger.present(Money::ZERO, "").unwrap_err(),
            DomainError::InvalidAmount
        );
        assert_eq!(
            ledger
                .settle_order("SO-2", money(100), money(-1), Money::ZERO, "")
                .unwrap_err(),
            DomainError::InvalidAmount
        );

        assert_eq!(ledger.account().unwrap().balance, money(1_000));
        assert_eq!(h.backend.accounts.logs(merchant.id().unwrap()).unwrap().len(), 1);
    }

    #[test]
    fn transfer_moves_funds_and_rebates_fee() {
        let h = setup();
        h.backend.values.set_registry(Registry {
            merchant_free_withdrawal: true,
        });
        h.backend.values.set_fee_config(FeeConfig {
            withdrawal_fee_rate: dec!(0.006),
        });
        let (_, ledger) = ledger_with_balance(&h, 10_000);

        let receipt = ledger.transfer_to_member(money(4_000)).unwrap();

        let account = ledger.account().unwrap();
        assert_eq!(account.balance, money(6_000));
        assert_eq!(account.take_amount, money(4_000));
        assert_eq!(receipt.log.kind, BalanceLogKind::TransferToMember);
        assert_eq!(receipt.log.amount, money(-4_000));
        assert_eq!(receipt.fee_rebate, Some(money(24)));

        assert_eq!(h.backend.members.wallet(member(MEMBER)).unwrap(), money(4_024));
        let charges = h.backend.members.charges(member(MEMBER)).unwrap();
        assert_eq!(charges.len(), 2);
        assert!(charges.iter().all(|c| c.kind == ChangeKind::WalletAdd));
    }

    #[test]
    fn transfer_without_free_withdrawal_has_no_rebate() {
        let h = setup();
        h.backend.values.set_fee_config(FeeConfig {
            withdrawal_fee_rate: dec!(0.006),
        });
        let (_, ledger) = ledger_with_balance(&h, 10_000);

        let receipt = ledger.transfer_to_member(money(10_000)).unwrap();

        assert_eq!(receipt.fee_rebate, None);
        assert_eq!(ledger.account().unwrap().balance, Money::ZERO);
        assert_eq!(h.backend.members.wallet(member(MEMBER)).unwrap(), money(10_000));
        assert_eq!(
            ledger.transfer_to_member(money(1)).unwrap_err(),
            DomainError::InsufficientFunds
        );
    }

    #[test]
    fn merchant_without_member_cannot_transfer() {
        let h = setup();
        let store = seed_platform_store(&h);
        let ledger = store.account().unwrap();
        ledger
            .settle_order("SO-P1", money(1_000), Money::ZERO, Money::ZERO, "")
            .unwrap();

        assert_eq!(
            ledger.transfer_to_member(money(500)).unwrap_err(),
            DomainError::NoSuchMember
        );
        assert_eq!(ledger.account().unwrap().balance, money(1_000));
    }

    #[test]
    fn failed_commit_reverses_wallet_credit() {
        let h = setup();
        let (merchant, ledger) = ledger_with_balance(&h, 10_000);

        h.backend.accounts.fail_next_commits(1);
        let err = ledger.transfer_to_member(money(3_000)).unwrap_err();
        assert!(matches!(err, DomainError::Persistence(_)));

        assert_eq!(ledger.account().unwrap().balance, money(10_000));
        assert_eq!(h.backend.accounts.logs(merchant.id().unwrap()).unwrap().len(), 1);
        assert_eq!(h.backend.members.wallet(member(MEMBER)).unwrap(), Money::ZERO);
        let kinds: Vec<_> = h
            .backend
            .members
            .charges(member(MEMBER))
            .unwrap()
            .into_iter()
            .map(|c| c.kind)
            .collect();
        assert_eq!(kinds, [ChangeKind::WalletAdd, ChangeKind::WalletDeduct]);
    }

    #[test]
    fn failed_reversal_is_reported() {
        let h = setup();
        let (_, ledger) = ledger_with_balance(&h, 10_000);

        h.backend.accounts.fail_next_commits(1);
        h.backend
            .members
            .fail_charges_where(|c| c.kind == ChangeKind::WalletDeduct)
            .unwrap();
        let err = ledger.transfer_to_member(money(3_000)).unwrap_err();

        assert!(matches!(err, DomainError::CompensationFailed(_)));
        assert_eq!(err.code(), DomainError::CompensationFailed(String::new()).code());
        assert_eq!(ledger.account().unwrap().balance, money(10_000));
        assert_eq!(h.backend.members.wallet(member(MEMBER)).unwrap(), money(3_000));
    }

    #[test]
    fn failed_rebate_keeps_transfer() {
        let h = setup();
        h.backend.values.set_registry(Registry {
            merchant_free_withdrawal: true,
        });
        h.backend.values.set_fee_config(FeeConfig {
            withdrawal_fee_rate: dec!(0.01),
        });
        let (merchant, ledger) = ledger_with_balance(&h, 10_000);
        h.backend
            .members
            .fail_charges_where(|c| c.title.contains("fee"))
            .unwrap();

        let err = ledger.transfer_to_member(money(5_000)).unwrap_err();

        assert!(matches!(err, DomainError::FeeRebateFailed(_)));
        assert_eq!(ledger.account().unwrap().balance, money(5_000));
        assert_eq!(h.backend.members.wallet(member(MEMBER)).unwrap(), money(5_000));
        let logs = h.backend.accounts.logs(merchant.id().unwrap()).unwrap();
        assert_eq!(logs.last().unwrap().kind, BalanceLogKind::TransferToMember);
    }

    #[test]
    fn stale_snapshot_is_a_conflict() {
        let h = setup();
        let (merchant, ledger) = ledger_with_balance(&h, 1_000);
        let id = merchant.id().unwrap();

        let mut stale = ledger.account().unwrap();
        ledger.present(money(100), "").unwrap();

        stale.balance += money(1);
        let log = h.backend.accounts.logs(id).unwrap().remove(0);
        let err = h
            .backend
            .accounts
            .commit(&log, &stale, ExpectedVersion::Exact(stale.version))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(ledger.account().unwrap().balance, money(1_100));
    }

    #[test]
    fn concurrent_settlements_do_not_lose_updates() {
        let h = setup();
        let (merchant, ledger) = ledger_with_balance(&h, 0);
        let ledger = Arc::new(ledger);

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let ledger = ledger.clone();
                thread::spawn(move || {
                    for n in 0..25 {
                        ledger
                            .settle_order(
                                &format!("SO-{worker}-{n}"),
                                money(100),
                                Money::ZERO,
                                Money::ZERO,
                                "",
                            )
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let account = ledger.account().unwrap();
        assert_eq!(account.balance, money(20_000));
        assert_eq!(account.version, 200);
        assert_eq!(h.backend.accounts.logs(merchant.id().unwrap()).unwrap().len(), 200);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// Property: the balance always equals settled minus transferred,
        /// and a refused transfer changes nothing.
        #[test]
        fn balance_tracks_settlements_and_transfers(
            ops in prop::collection::vec((any::<bool>(), 1i64..50_000), 1..40)
        ) {
            let h = setup();
            let (_, ledger) = ledger_with_balance(&h, 0);
            let mut expected = Money::ZERO;

            for (n, (settle, cents)) in ops.into_iter().enumerate() {
                let amount = money(cents);
                if settle {
                    ledger
                        .settle_order(&format!("SO-{n}"), amount, Money::ZERO, Money::ZERO, "")
                        .unwrap();
                    expected += amount;
                } else {
                    match ledger.transfer_to_member(amount) {
                        Ok(_) => expected -= amount,
                        Err(e) => prop_assert_eq!(e, DomainError::InsufficientFunds),
                    }
                }
                prop_assert_eq!(ledger.account().unwrap().balance, expected);
            }
            let account = ledger.account().unwrap();
            prop_assert_eq!(account.sales_amount - account.take_amount, expected);
        }
    }
}
