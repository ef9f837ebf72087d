//! C6 - Bond/Prize Ledger: per-account available/locked balances backed by
//! stable storage. Every entry point checks a balance before mutating it and
//! leaves rollback to the caller, since every caller here runs synchronously
//! within one canister call.

use candid::Principal;
use ic_stable_structures::memory_manager::MemoryId;
use ic_stable_structures::StableBTreeMap;
use std::cell::RefCell;

use crate::types::Balances;
use crate::{Memory, BOND_LEDGER_MEMORY_ID, MEMORY_MANAGER};

thread_local! {
    static BALANCES: RefCell<StableBTreeMap<Principal, Balances, Memory>> = RefCell::new(
        StableBTreeMap::init(
            MEMORY_MANAGER.with(|m| m.borrow().get(MemoryId::new(BOND_LEDGER_MEMORY_ID))),
        )
    );
}

/// Trait seam so `challenge.rs`'s transition functions can be exercised
/// against an in-memory fixture in tests instead of stable storage.
pub trait BondLedger {
    fn available_bond(&self, account: Principal) -> u64;
    fn lock_bond(&mut self, account: Principal, amount: u64) -> Result<(), String>;
    fn unlock_bond(&mut self, account: Principal, amount: u64) -> Result<(), String>;
    fn pay_bond_to(&mut self, recipient: Principal, from: Principal, amount: u64) -> Result<(), String>;
    fn allocate_prize(&mut self, amount: u64);
    fn reward_prize_to(&mut self, recipient: Principal) -> Result<u64, String>;
}

fn get_balances(account: Principal) -> Balances {
    BALANCES.with(|b| b.borrow().get(&account).unwrap_or_default())
}

fn put_balances(account: Principal, balances: Balances) {
    BALANCES.with(|b| {
        b.borrow_mut().insert(account, balances);
    });
}

/// Stable-storage-backed [`BondLedger`]. Zero-sized - every method reaches
/// into the thread-local map directly, the same way `accounting::get_balance`
/// reaches into `USER_BALANCES_STABLE` without threading `&self` state.
pub struct StableLedger;

thread_local! {
    static PRIZE_POOL: RefCell<u64> = RefCell::new(0);
}

impl BondLedger for StableLedger {
    fn available_bond(&self, account: Principal) -> u64 {
        get_balances(account).available
    }

    fn lock_bond(&mut self, account: Principal, amount: u64) -> Result<(), String> {
        let mut balances = get_balances(account);
        if balances.available < amount {
            return Err(format!(
                "insufficient bond: have {}, need {}",
                balances.available, amount
            ));
        }
        balances.available -= amount;
        balances.locked += amount;
        put_balances(account, balances);
        Ok(())
    }

    fn unlock_bond(&mut self, account: Principal, amount: u64) -> Result<(), String> {
        let mut balances = get_balances(account);
        if balances.locked < amount {
            return Err(format!(
                "cannot unlock {}: only {} locked",
                amount, balances.locked
            ));
        }
        balances.locked -= amount;
        balances.available += amount;
        put_balances(account, balances);
        Ok(())
    }

    fn pay_bond_to(&mut self, recipient: Principal, from: Principal, amount: u64) -> Result<(), String> {
        let mut payer = get_balances(from);
        if payer.locked < amount {
            return Err(format!(
                "cannot pay out {}: only {} locked for {}",
                amount, payer.locked, from
            ));
        }
        payer.locked -= amount;
        put_balances(from, payer);

        let mut payee = get_balances(recipient);
        payee.available += amount;
        put_balances(recipient, payee);
        Ok(())
    }

    fn allocate_prize(&mut self, amount: u64) {
        PRIZE_POOL.with(|p| *p.borrow_mut() += amount);
    }

    fn reward_prize_to(&mut self, recipient: Principal) -> Result<u64, String> {
        let amount = PRIZE_POOL.with(|p| {
            let mut pool = p.borrow_mut();
            let amount = *pool;
            *pool = 0;
            amount
        });
        if amount == 0 {
            return Err("no prize allocated".to_string());
        }
        let mut payee = get_balances(recipient);
        payee.available += amount;
        put_balances(recipient, payee);
        Ok(amount)
    }
}
