// Copyright (c) 2024 Furchill

//! Journal replay tests: a reopened ledger must reproduce the state it had
//! when it was closed.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use fur_taxed_token::ValidationRules;
use fur_token_types::{constants::NATIVE_UNIT, Address, Network};
use launchpad::{
    ledger::{JournalError, Ledger, LedgerError},
    registry::{CreateTokenRequest, FactorySettings, RegistryError},
};
use tempfile::TempDir;

const OWNER: Address = Address::new([0xAA; 20]);
const NEW_OWNER: Address = Address::new([0xBB; 20]);
const CREATOR: Address = Address::new([0xC1; 20]);
const MARKETING: Address = Address::new([0x3E; 20]);
const POOL: Address = Address::new([0x77; 20]);
const BUYER: Address = Address::new([0xB0; 20]);
const SPENDER: Address = Address::new([0x55; 20]);

const FEE: u128 = NATIVE_UNIT / 100;

fn settings() -> FactorySettings {
    FactorySettings {
        address: Address::new([0xFA; 20]),
        owner: OWNER,
        deployment_fee: FEE,
        rules: ValidationRules::new(Network::Sepolia),
    }
}

fn request() -> CreateTokenRequest {
    CreateTokenRequest {
        name: "Test".to_string(),
        symbol: "TEST".to_string(),
        total_supply: 1_000_000,
        buy_tax: 500,
        sell_tax: 500,
        lp_percentage: 8000,
        marketing_wallet: MARKETING.to_hex(),
        marketing_percentage: 200,
        wallets: vec![],
        percentages: vec![],
    }
}

fn open(path: &Path) -> Ledger {
    Ledger::open(path, settings()).expect("Failed to open ledger")
}

/// Issue a token and trade it a little. Returns the token handle.
fn populate(ledger: &mut Ledger) -> Address {
    let token = ledger.create_token(&request(), FEE, CREATOR, 100).unwrap().value;
    ledger.register_pool(&token, &CREATOR, POOL).unwrap();
    ledger.transfer(&token, CREATOR, POOL, 10_000).unwrap();
    ledger.transfer(&token, POOL, BUYER, 1_000).unwrap();
    ledger.approve(&token, BUYER, SPENDER, 400).unwrap();
    ledger
        .transfer_from(&token, SPENDER, BUYER, CREATOR, 150)
        .unwrap();
    token
}

#[test]
fn test_reopen_reproduces_state() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ledger.journal");

    let (token, before) = {
        let mut ledger = open(&path);
        let token = populate(&mut ledger);
        ledger.withdraw_fees(&OWNER).unwrap();
        ledger.transfer_ownership(&OWNER, NEW_OWNER).unwrap();
        (token, ledger.registry().clone())
    };

    let ledger = open(&path);
    let after = ledger.registry();
    assert_eq!(ledger.journal_len(), 8);

    assert_eq!(after.owner(), NEW_OWNER);
    assert_eq!(after.accumulated_fees(), 0);
    assert_eq!(after.native_balance_of(&OWNER), FEE);
    assert_eq!(after.records_of(&CREATOR), before.records_of(&CREATOR));
    assert_eq!(after.next_token_address(), before.next_token_address());
    assert_eq!(after.pools().pools_of(&token), vec![POOL]);

    let (was, is) = (before.token(&token).unwrap(), after.token(&token).unwrap());
    for account in [CREATOR, POOL, BUYER, MARKETING, SPENDER, token] {
        assert_eq!(was.balance_of(&account), is.balance_of(&account));
    }
    assert_eq!(is.allowance(&BUYER, &SPENDER), 250);
    assert_eq!(is.balances_total(), is.total_supply());
}

#[test]
fn test_rejected_operations_are_not_journaled() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ledger.journal");

    {
        let mut ledger = open(&path);
        assert!(ledger.create_token(&request(), FEE - 1, CREATOR, 1).is_err());
        assert!(ledger.withdraw_fees(&CREATOR).is_err());
        assert_eq!(ledger.journal_len(), 0);

        let token = ledger.create_token(&request(), FEE, CREATOR, 1).unwrap().value;
        ledger.register_pool(&token, &CREATOR, POOL).unwrap();
        // Already known, nothing to record
        ledger.register_pool(&token, &CREATOR, POOL).unwrap();
        assert_eq!(ledger.journal_len(), 2);
    }

    let ledger = open(&path);
    assert_eq!(ledger.journal_len(), 2);
    assert_eq!(ledger.registry().token_count(), 1);
}

#[test]
fn test_fee_overflow_leaves_journal_replayable() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ledger.journal");

    {
        let mut ledger = open(&path);
        ledger.create_token(&request(), u128::MAX, CREATOR, 1).unwrap();
        ledger.withdraw_fees(&OWNER).unwrap();
        ledger.create_token(&request(), FEE, CREATOR, 2).unwrap();

        assert!(matches!(
            ledger.withdraw_fees(&OWNER),
            Err(LedgerError::Registry(RegistryError::BalanceOverflow { .. }))
        ));
        assert!(matches!(
            ledger.create_token(&request(), u128::MAX, CREATOR, 3),
            Err(LedgerError::Registry(RegistryError::BalanceOverflow { .. }))
        ));
        assert_eq!(ledger.journal_len(), 3);
    }

    let ledger = open(&path);
    assert_eq!(ledger.journal_len(), 3);
    assert_eq!(ledger.registry().native_balance_of(&OWNER), u128::MAX);
    assert_eq!(ledger.registry().accumulated_fees(), FEE);
    assert_eq!(ledger.registry().token_count(), 2);
}

#[test]
fn test_torn_tail_is_dropped() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ledger.journal");

    let token = {
        let mut ledger = open(&path);
        populate(&mut ledger)
    };

    // A crash part-way through the next record
    {
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&[0x40, 0x00, 0x00]).unwrap();
    }

    let mut ledger = open(&path);
    assert_eq!(ledger.journal_len(), 6);
    assert_eq!(
        ledger.registry().token(&token).unwrap().balance_of(&BUYER),
        950 - 150
    );

    // The journal keeps working after recovery
    ledger.transfer(&token, CREATOR, BUYER, 1).unwrap();
    drop(ledger);

    let ledger = open(&path);
    assert_eq!(ledger.journal_len(), 7);
    assert_eq!(
        ledger.registry().token(&token).unwrap().balance_of(&BUYER),
        950 - 150 + 1
    );
}

#[test]
fn test_foreign_file_is_refused() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ledger.journal");
    std::fs::write(&path, b"definitely not a journal").unwrap();

    let result = Ledger::open(&path, settings());
    assert!(matches!(
        result,
        Err(LedgerError::Journal(JournalError::BadMagic))
    ));
}
