//! Page-level strict two-phase locking.
//!
//! Every page has zero or more holders. A page is either free, shared by one or
//! more transactions, or held exclusively by one transaction; a sole shared
//! holder may upgrade in place. A blocked request waits on a condition variable
//! until a release wakes it, a deadlock is found, or its deadline passes.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::common::{AbortReason, PageId, Result, TarnError, TransactionId, DEFAULT_LOCK_TIMEOUT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockMode {
    Shared,
    Exclusive,
}

/// The access a caller asks the buffer pool for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    ReadOnly,
    ReadWrite,
}

impl From<Permission> for LockMode {
    fn from(permission: Permission) -> Self {
        match permission {
            Permission::ReadOnly => LockMode::Shared,
            Permission::ReadWrite => LockMode::Exclusive,
        }
    }
}

/// Outcome of checking a request against the current holders.
enum Decision {
    Granted,
    /// Blocked behind these transactions
    Blocked(HashSet<TransactionId>),
}

#[derive(Debug, Default)]
struct LockTable {
    /// Holders of each locked page
    locks: HashMap<PageId, HashMap<TransactionId, LockMode>>,
    /// Pages held by each transaction
    held: HashMap<TransactionId, HashSet<PageId>>,
    /// Wait-for graph: waiter -> transactions it is blocked on
    waits_for: HashMap<TransactionId, HashSet<TransactionId>>,
}

impl LockTable {
    fn try_grant(&mut self, tid: TransactionId, page_id: PageId, mode: LockMode) -> Decision {
        let holders = self.locks.entry(page_id).or_default();
        let sole_holder = holders.len() == 1 && holders.contains_key(&tid);
        let decision = if holders.is_empty() || sole_holder {
            Decision::Granted
        } else {
            match mode {
                // Joins one or more sharers; blocked only behind a writer.
                LockMode::Shared if holders.values().all(|&m| m == LockMode::Shared) => {
                    Decision::Granted
                }
                _ => Decision::Blocked(holders.keys().copied().filter(|&h| h != tid).collect()),
            }
        };

        if let Decision::Granted = decision {
            let entry = holders.entry(tid).or_insert(mode);
            if mode == LockMode::Exclusive {
                *entry = LockMode::Exclusive;
            }
            self.held.entry(tid).or_default().insert(page_id);
        }

        decision
    }

    fn remove_lock(&mut self, tid: TransactionId, page_id: PageId) -> bool {
        let Some(holders) = self.locks.get_mut(&page_id) else {
            return false;
        };
        let removed = holders.remove(&tid).is_some();
        if holders.is_empty() {
            self.locks.remove(&page_id);
        }
        removed
    }

    /// Drops every wait-for edge into or out of `tid`.
    fn forget_waits(&mut self, tid: TransactionId) {
        self.waits_for.remove(&tid);
        for blockers in self.waits_for.values_mut() {
            blockers.remove(&tid);
        }
        self.waits_for.retain(|_, blockers| !blockers.is_empty());
    }

    /// Kahn's algorithm over every transaction that holds, awaits, or is
    /// awaited. Any node left unprocessed sits on a cycle.
    fn has_cycle(&self) -> bool {
        let mut in_degree: HashMap<TransactionId, usize> = HashMap::new();
        for tid in self.held.keys() {
            in_degree.entry(*tid).or_insert(0);
        }
        for (waiter, blockers) in &self.waits_for {
            in_degree.entry(*waiter).or_insert(0);
            for blocker in blockers {
                *in_degree.entry(*blocker).or_insert(0) += 1;
            }
        }

        let mut queue: VecDeque<TransactionId> = in_degree
            .iter()
            .filter(|(_, &degree)| degree == 0)
            .map(|(&tid, _)| tid)
            .collect();

        let mut processed = 0;
        while let Some(tid) = queue.pop_front() {
            processed += 1;
            let Some(blockers) = self.waits_for.get(&tid) else {
                continue;
            };
            for blocker in blockers {
                if let Some(degree) = in_degree.get_mut(blocker) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(*blocker);
                    }
                }
            }
        }

        processed < in_degree.len()
    }
}

/// Grants shared and exclusive page locks to transactions.
pub struct LockManager {
    table: Mutex<LockTable>,
    released: Condvar,
    timeout: Duration,
}

impl LockManager {
    /// Creates a lock manager whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self {
            table: Mutex::new(LockTable::default()),
            released: Condvar::new(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Blocks until `tid` holds `page_id` in at least `mode`.
    ///
    /// Fails with [`TarnError::TransactionAborted`] when waiting would close a
    /// cycle in the wait-for graph, or when the lock is not granted before the
    /// timeout. Either way the caller must abort the transaction.
    pub fn acquire(&self, tid: TransactionId, page_id: PageId, mode: LockMode) -> Result<()> {
        let deadline = Instant::now() + self.timeout;
        let mut table = self.table.lock();

        loop {
            let blockers = match table.try_grant(tid, page_id, mode) {
                Decision::Granted => {
                    table.waits_for.remove(&tid);
                    tracing::debug!(tid = %tid, page = %page_id, ?mode, "lock granted");
                    return Ok(());
                }
                Decision::Blocked(blockers) => blockers,
            };

            let previous = table.waits_for.insert(tid, blockers.clone());
            let added = previous.map_or(true, |prev| !blockers.is_subset(&prev));
            if added && table.has_cycle() {
                table.waits_for.remove(&tid);
                tracing::warn!(tid = %tid, page = %page_id, ?mode, "deadlock detected");
                return Err(TarnError::TransactionAborted {
                    tid,
                    reason: AbortReason::Deadlock,
                });
            }

            if Instant::now() >= deadline {
                table.waits_for.remove(&tid);
                tracing::warn!(tid = %tid, page = %page_id, ?mode, "lock wait timed out");
                return Err(TarnError::TransactionAborted {
                    tid,
                    reason: AbortReason::Timeout,
                });
            }

            tracing::debug!(tid = %tid, page = %page_id, ?mode, waiting_on = ?blockers, "lock wait");
            self.released.wait_until(&mut table, deadline);
        }
    }

    /// Drops the lock `tid` holds on `page_id`, if any.
    pub fn release(&self, tid: TransactionId, page_id: PageId) {
        let mut table = self.table.lock();
        if table.remove_lock(tid, page_id) {
            if let Some(pages) = table.held.get_mut(&tid) {
                pages.remove(&page_id);
                if pages.is_empty() {
                    table.held.remove(&tid);
                }
            }
            tracing::debug!(tid = %tid, page = %page_id, "lock released");
            self.released.notify_all();
        }
    }

    /// Drops every lock `tid` holds. Called once, when the transaction ends.
    pub fn release_all(&self, tid: TransactionId) {
        let mut table = self.table.lock();
        let pages = table.held.remove(&tid).unwrap_or_default();
        for page_id in &pages {
            table.remove_lock(tid, *page_id);
        }
        table.forget_waits(tid);
        tracing::debug!(tid = %tid, count = pages.len(), "released all locks");
        self.released.notify_all();
    }

    pub fn holds_lock(&self, tid: TransactionId, page_id: PageId) -> bool {
        self.lock_mode(tid, page_id).is_some()
    }

    /// Returns the mode `tid` holds `page_id` in.
    pub fn lock_mode(&self, tid: TransactionId, page_id: PageId) -> Option<LockMode> {
        self.table
            .lock()
            .locks
            .get(&page_id)
            .and_then(|holders| holders.get(&tid).copied())
    }

    /// Returns the pages `tid` holds, in page order.
    pub fn locked_pages(&self, tid: TransactionId) -> Vec<PageId> {
        let mut pages: Vec<_> = self
            .table
            .lock()
            .held
            .get(&tid)
            .map(|pages| pages.iter().copied().collect())
            .unwrap_or_default();
        pages.sort();
        pages
    }
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new(DEFAULT_LOCK_TIMEOUT)
    }
}
