use parking_lot::Mutex;
use std::collections::HashMap;
use tradecore_instrument::{SessionId, Symbol};

/// The symbol lease table (spec.md §4.3 "Symbol lease"): at most one
/// session may hold a given symbol at a time, acquired atomically under a
/// single mutex. Stale entries — leftovers from a session that is no
/// longer the controller's live one — are purged lazily on every
/// acquisition attempt rather than by a background sweeper, since
/// `ExecutionController` only ever tracks one session at a time (spec.md
/// §3) and the caller always knows, at acquisition time, which session id
/// (if any) is still live.
///
/// Ported from `execution_controller.py`'s `_active_symbols` dict plus
/// `_purge_stale_active_symbols`/`_acquire_symbols`/`_release_symbols`.
#[derive(Debug, Default)]
pub struct SymbolLeaseTable {
    leases: Mutex<HashMap<Symbol, SessionId>>,
}

impl SymbolLeaseTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every lease not owned by `live_session` (pass `None` when no
    /// session is currently live), then attempts to acquire `symbols` under
    /// `session_id`. All-or-nothing: on conflict, no symbols are acquired
    /// and the first conflicting `(symbol, owner)` pair is returned.
    pub fn acquire(
        &self,
        session_id: &SessionId,
        symbols: &[Symbol],
        live_session: Option<&SessionId>,
    ) -> Result<(), (Symbol, SessionId)> {
        let mut leases = self.leases.lock();
        leases.retain(|_, owner| Some(owner) == live_session);

        for symbol in symbols {
            if let Some(owner) = leases.get(symbol) {
                if owner != session_id {
                    return Err((symbol.clone(), owner.clone()));
                }
            }
        }
        for symbol in symbols {
            leases.insert(symbol.clone(), session_id.clone());
        }
        Ok(())
    }

    pub fn release(&self, session_id: &SessionId, symbols: &[Symbol]) {
        let mut leases = self.leases.lock();
        for symbol in symbols {
            if leases.get(symbol) == Some(session_id) {
                leases.remove(symbol);
            }
        }
    }

    /// Releases every symbol owned by `session_id`, regardless of which
    /// symbols the caller remembers requesting (used by cleanup, where the
    /// session's own `symbols` list is the source of truth but a defensive
    /// full sweep costs nothing).
    pub fn release_all_for(&self, session_id: &SessionId) {
        self.leases.lock().retain(|_, owner| owner != session_id);
    }

    pub fn is_empty(&self) -> bool {
        self.leases.lock().is_empty()
    }

    pub fn owner_of(&self, symbol: &Symbol) -> Option<SessionId> {
        self.leases.lock().get(symbol).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(s: &str) -> Symbol {
        Symbol::new(s)
    }

    fn sid(s: &str) -> SessionId {
        SessionId::new(s)
    }

    #[test]
    fn acquire_succeeds_when_symbols_are_free() {
        let table = SymbolLeaseTable::new();
        let a = sid("exec_a");
        assert!(table.acquire(&a, &[sym("BTC_USDT"), sym("ETH_USDT")], None).is_ok());
        assert_eq!(table.owner_of(&sym("BTC_USDT")), Some(a));
    }

    #[test]
    fn acquire_conflicts_when_another_live_session_holds_the_symbol() {
        let table = SymbolLeaseTable::new();
        let a = sid("exec_a");
        table.acquire(&a, &[sym("BTC_USDT")], None).unwrap();

        let b = sid("exec_b");
        let err = table
            .acquire(&b, &[sym("BTC_USDT"), sym("ETH_USDT")], Some(&a))
            .unwrap_err();
        assert_eq!(err, (sym("BTC_USDT"), a.clone()));
        // all-or-nothing: ETH_USDT must not have been acquired either.
        assert_eq!(table.owner_of(&sym("ETH_USDT")), None);
    }

    #[test]
    fn stale_leases_are_purged_when_no_session_is_live() {
        let table = SymbolLeaseTable::new();
        let a = sid("exec_a");
        table.acquire(&a, &[sym("BTC_USDT")], None).unwrap();

        let b = sid("exec_b");
        // a is no longer live (None) -> its lease is dropped, b can proceed.
        assert!(table.acquire(&b, &[sym("BTC_USDT")], None).is_ok());
        assert_eq!(table.owner_of(&sym("BTC_USDT")), Some(b));
    }

    #[test]
    fn release_only_drops_symbols_owned_by_the_given_session() {
        let table = SymbolLeaseTable::new();
        let a = sid("exec_a");
        table.acquire(&a, &[sym("BTC_USDT")], None).unwrap();

        table.release(&sid("exec_other"), &[sym("BTC_USDT")]);
        assert_eq!(table.owner_of(&sym("BTC_USDT")), Some(a.clone()));

        table.release(&a, &[sym("BTC_USDT")]);
        assert!(table.is_empty());
    }

    #[test]
    fn release_all_for_clears_every_symbol_for_that_session() {
        let table = SymbolLeaseTable::new();
        let a = sid("exec_a");
        table.acquire(&a, &[sym("BTC_USDT"), sym("ETH_USDT")], None).unwrap();
        table.release_all_for(&a);
        assert!(table.is_empty());
    }
}
