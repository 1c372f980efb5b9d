//! redb-based persistence gateway
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `tables` | `number` | `Table` | Dining tables (unique number) |
//! | `orders` | `order_id` | `Order` | Order lines |
//! | `order_groups` | `group_id` | `OrderGroup` | Unit of payment |
//! | `payments` | `payment_id` | `Payment` | Payment links |
//! | `revenues` | `revenue_id` | `Revenue` | Append-only ledger |
//! | `guests` | `guest_id` | `Guest` | QR guest sessions |
//! | `dishes` | `dish_id` | `Dish` | Menu collaborator data |
//! | `payment_refs` | `reference_code` | `payment_id` | Webhook matching |
//! | `processed_transactions` | `bank_tx_id` | `payment_id` | Webhook idempotency |
//! | `revenue_sources` | `source_id` | `revenue_id` | One revenue per settlement |
//!
//! # Consistency
//!
//! redb serialises write transactions. Every read-check-write done inside a
//! single [`WriteTransaction`] is therefore a conditional update: the loser of
//! a race re-reads the committed state and fails its precondition. Effects
//! spanning several documents commit together or not at all.

use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};
use shared::error::AppError;
use shared::models::{Dish, Guest, Order, OrderGroup, Payment, Revenue, Table};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Dining tables: key = table number, value = JSON-serialized Table
const TABLES_TABLE: TableDefinition<i32, &[u8]> = TableDefinition::new("tables");

/// Orders: key = order id, value = JSON-serialized Order
const ORDERS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("orders");

/// Order groups: key = group id, value = JSON-serialized OrderGroup
const ORDER_GROUPS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("order_groups");

/// Payments: key = payment id, value = JSON-serialized Payment
const PAYMENTS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("payments");

/// Revenue ledger: key = revenue id, value = JSON-serialized Revenue
const REVENUES_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("revenues");

/// Guests: key = guest id, value = JSON-serialized Guest
const GUESTS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("guests");

/// Dishes: key = dish id, value = JSON-serialized Dish
const DISHES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("dishes");

/// Reference code index: key = reference code, value = payment id
const PAYMENT_REFS_TABLE: TableDefinition<&str, i64> = TableDefinition::new("payment_refs");

/// Processed bank transactions: key = transaction id, value = payment id
const PROCESSED_TRANSACTIONS_TABLE: TableDefinition<&str, i64> =
    TableDefinition::new("processed_transactions");

/// Revenue uniqueness: key = settlement source id, value = revenue id
const REVENUE_SOURCES_TABLE: TableDefinition<&str, i64> = TableDefinition::new("revenue_sources");

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        AppError::database(err.to_string())
    }
}

/// Persistence gateway backed by redb
#[derive(Clone)]
pub struct Storage {
    db: Arc<Database>,
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage").finish_non_exhaustive()
    }
}

impl Storage {
    /// Open or create the database at the given path
    ///
    /// redb commits with `Durability::Immediate` by default: once `commit()`
    /// returns the write survives a crash.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (tests, ephemeral runs)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        // Create all tables if they don't exist
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(TABLES_TABLE)?;
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_table(ORDER_GROUPS_TABLE)?;
            let _ = write_txn.open_table(PAYMENTS_TABLE)?;
            let _ = write_txn.open_table(REVENUES_TABLE)?;
            let _ = write_txn.open_table(GUESTS_TABLE)?;
            let _ = write_txn.open_table(DISHES_TABLE)?;
            let _ = write_txn.open_table(PAYMENT_REFS_TABLE)?;
            let _ = write_txn.open_table(PROCESSED_TRANSACTIONS_TABLE)?;
            let _ = write_txn.open_table(REVENUE_SOURCES_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Begin a write transaction (blocks while another writer is active)
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    /// Commit a write transaction
    pub fn commit(txn: WriteTransaction) -> StorageResult<()> {
        txn.commit()?;
        Ok(())
    }

    // ========== Id allocation ==========

    /// Snowflake id not yet used as a key of `def` (within transaction)
    fn fresh_id(
        txn: &WriteTransaction,
        def: TableDefinition<'static, i64, &'static [u8]>,
    ) -> StorageResult<i64> {
        let table = txn.open_table(def)?;
        loop {
            let id = shared::util::snowflake_id();
            if table.get(id)?.is_none() {
                return Ok(id);
            }
        }
    }

    pub fn next_order_id(&self, txn: &WriteTransaction) -> StorageResult<i64> {
        Self::fresh_id(txn, ORDERS_TABLE)
    }

    pub fn next_group_id(&self, txn: &WriteTransaction) -> StorageResult<i64> {
        Self::fresh_id(txn, ORDER_GROUPS_TABLE)
    }

    pub fn next_payment_id(&self, txn: &WriteTransaction) -> StorageResult<i64> {
        Self::fresh_id(txn, PAYMENTS_TABLE)
    }

    pub fn next_revenue_id(&self, txn: &WriteTransaction) -> StorageResult<i64> {
        Self::fresh_id(txn, REVENUES_TABLE)
    }

    pub fn next_guest_id(&self, txn: &WriteTransaction) -> StorageResult<i64> {
        Self::fresh_id(txn, GUESTS_TABLE)
    }

    // ========== Table Operations ==========

    pub fn get_table_txn(
        &self,
        txn: &WriteTransaction,
        number: i32,
    ) -> StorageResult<Option<Table>> {
        let table = txn.open_table(TABLES_TABLE)?;
        match table.get(number)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn put_table_txn(&self, txn: &WriteTransaction, record: &Table) -> StorageResult<()> {
        let mut table = txn.open_table(TABLES_TABLE)?;
        let value = serde_json::to_vec(record)?;
        table.insert(record.number, value.as_slice())?;
        Ok(())
    }

    pub fn get_table(&self, number: i32) -> StorageResult<Option<Table>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TABLES_TABLE)?;
        match table.get(number)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// All tables ordered by number
    pub fn list_tables(&self) -> StorageResult<Vec<Table>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TABLES_TABLE)?;

        let mut tables = Vec::with_capacity(table.len()? as usize);
        for result in table.iter()? {
            let (_key, value) = result?;
            tables.push(serde_json::from_slice(value.value())?);
        }
        Ok(tables)
    }

    // ========== Order Operations ==========

    pub fn get_order_txn(&self, txn: &WriteTransaction, id: i64) -> StorageResult<Option<Order>> {
        let table = txn.open_table(ORDERS_TABLE)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn put_order_txn(&self, txn: &WriteTransaction, order: &Order) -> StorageResult<()> {
        let mut table = txn.open_table(ORDERS_TABLE)?;
        let value = serde_json::to_vec(order)?;
        table.insert(order.id, value.as_slice())?;
        Ok(())
    }

    /// Orders matching `filter` (within transaction)
    pub fn find_orders_txn(
        &self,
        txn: &WriteTransaction,
        filter: impl Fn(&Order) -> bool,
    ) -> StorageResult<Vec<Order>> {
        let table = txn.open_table(ORDERS_TABLE)?;
        let mut orders = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let order: Order = serde_json::from_slice(value.value())?;
            if filter(&order) {
                orders.push(order);
            }
        }
        Ok(orders)
    }

    pub fn get_order(&self, id: i64) -> StorageResult<Option<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Orders matching `filter`, oldest first
    pub fn list_orders(&self, filter: impl Fn(&Order) -> bool) -> StorageResult<Vec<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;

        let mut orders = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let order: Order = serde_json::from_slice(value.value())?;
            if filter(&order) {
                orders.push(order);
            }
        }
        orders.sort_by_key(|o| (o.created_at, o.id));
        Ok(orders)
    }

    // ========== Order Group Operations ==========

    pub fn get_group_txn(
        &self,
        txn: &WriteTransaction,
        id: i64,
    ) -> StorageResult<Option<OrderGroup>> {
        let table = txn.open_table(ORDER_GROUPS_TABLE)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn put_group_txn(&self, txn: &WriteTransaction, group: &OrderGroup) -> StorageResult<()> {
        let mut table = txn.open_table(ORDER_GROUPS_TABLE)?;
        let value = serde_json::to_vec(group)?;
        table.insert(group.id, value.as_slice())?;
        Ok(())
    }

    pub fn get_group(&self, id: i64) -> StorageResult<Option<OrderGroup>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDER_GROUPS_TABLE)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Group plus its orders from one read snapshot
    pub fn get_group_with_orders(
        &self,
        id: i64,
    ) -> StorageResult<Option<(OrderGroup, Vec<Order>)>> {
        let read_txn = self.db.begin_read()?;
        let groups = read_txn.open_table(ORDER_GROUPS_TABLE)?;
        let group: OrderGroup = match groups.get(id)? {
            Some(value) => serde_json::from_slice(value.value())?,
            None => return Ok(None),
        };

        let orders_table = read_txn.open_table(ORDERS_TABLE)?;
        let mut orders = Vec::with_capacity(group.order_ids.len());
        for order_id in &group.order_ids {
            if let Some(value) = orders_table.get(*order_id)? {
                orders.push(serde_json::from_slice(value.value())?);
            }
        }
        Ok(Some((group, orders)))
    }

    /// Groups matching `filter`, oldest first
    pub fn list_groups(
        &self,
        filter: impl Fn(&OrderGroup) -> bool,
    ) -> StorageResult<Vec<OrderGroup>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDER_GROUPS_TABLE)?;

        let mut groups = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let group: OrderGroup = serde_json::from_slice(value.value())?;
            if filter(&group) {
                groups.push(group);
            }
        }
        groups.sort_by_key(|g| (g.created_at, g.id));
        Ok(groups)
    }

    // ========== Payment Operations ==========

    pub fn get_payment_txn(
        &self,
        txn: &WriteTransaction,
        id: i64,
    ) -> StorageResult<Option<Payment>> {
        let table = txn.open_table(PAYMENTS_TABLE)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn put_payment_txn(&self, txn: &WriteTransaction, payment: &Payment) -> StorageResult<()> {
        let mut table = txn.open_table(PAYMENTS_TABLE)?;
        let value = serde_json::to_vec(payment)?;
        table.insert(payment.id, value.as_slice())?;
        Ok(())
    }

    pub fn get_payment(&self, id: i64) -> StorageResult<Option<Payment>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PAYMENTS_TABLE)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn list_payments(&self, filter: impl Fn(&Payment) -> bool) -> StorageResult<Vec<Payment>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PAYMENTS_TABLE)?;

        let mut payments = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let payment: Payment = serde_json::from_slice(value.value())?;
            if filter(&payment) {
                payments.push(payment);
            }
        }
        Ok(payments)
    }

    /// Payments matching `filter` (within transaction)
    pub fn find_payments_txn(
        &self,
        txn: &WriteTransaction,
        filter: impl Fn(&Payment) -> bool,
    ) -> StorageResult<Vec<Payment>> {
        let table = txn.open_table(PAYMENTS_TABLE)?;
        let mut payments = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let payment: Payment = serde_json::from_slice(value.value())?;
            if filter(&payment) {
                payments.push(payment);
            }
        }
        Ok(payments)
    }

    pub fn put_payment_ref_txn(
        &self,
        txn: &WriteTransaction,
        reference_code: &str,
        payment_id: i64,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(PAYMENT_REFS_TABLE)?;
        table.insert(reference_code, payment_id)?;
        Ok(())
    }

    pub fn find_payment_by_ref_txn(
        &self,
        txn: &WriteTransaction,
        reference_code: &str,
    ) -> StorageResult<Option<i64>> {
        let table = txn.open_table(PAYMENT_REFS_TABLE)?;
        Ok(table.get(reference_code)?.map(|guard| guard.value()))
    }

    // ========== Webhook Idempotency ==========

    /// Check if a bank transaction has been processed (within transaction)
    pub fn is_transaction_processed_txn(
        &self,
        txn: &WriteTransaction,
        transaction_id: &str,
    ) -> StorageResult<bool> {
        let table = txn.open_table(PROCESSED_TRANSACTIONS_TABLE)?;
        Ok(table.get(transaction_id)?.is_some())
    }

    /// Mark a bank transaction as processed
    pub fn mark_transaction_processed(
        &self,
        txn: &WriteTransaction,
        transaction_id: &str,
        payment_id: i64,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(PROCESSED_TRANSACTIONS_TABLE)?;
        table.insert(transaction_id, payment_id)?;
        Ok(())
    }

    // ========== Revenue Ledger ==========

    pub fn has_revenue_source_txn(
        &self,
        txn: &WriteTransaction,
        source_id: &str,
    ) -> StorageResult<bool> {
        let table = txn.open_table(REVENUE_SOURCES_TABLE)?;
        Ok(table.get(source_id)?.is_some())
    }

    /// Insert a revenue record and its source index entry
    pub fn insert_revenue_txn(
        &self,
        txn: &WriteTransaction,
        revenue: &Revenue,
    ) -> StorageResult<()> {
        {
            let mut table = txn.open_table(REVENUES_TABLE)?;
            let value = serde_json::to_vec(revenue)?;
            table.insert(revenue.id, value.as_slice())?;
        }
        let mut sources = txn.open_table(REVENUE_SOURCES_TABLE)?;
        sources.insert(revenue.source_id.as_str(), revenue.id)?;
        Ok(())
    }

    pub fn list_revenues(&self, filter: impl Fn(&Revenue) -> bool) -> StorageResult<Vec<Revenue>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(REVENUES_TABLE)?;

        let mut revenues = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let revenue: Revenue = serde_json::from_slice(value.value())?;
            if filter(&revenue) {
                revenues.push(revenue);
            }
        }
        revenues.sort_by_key(|r| (r.created_at, r.id));
        Ok(revenues)
    }

    pub fn count_revenues(&self) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(REVENUES_TABLE)?;
        Ok(table.len()?)
    }

    // ========== Guest Operations ==========

    pub fn put_guest_txn(&self, txn: &WriteTransaction, guest: &Guest) -> StorageResult<()> {
        let mut table = txn.open_table(GUESTS_TABLE)?;
        let value = serde_json::to_vec(guest)?;
        table.insert(guest.id, value.as_slice())?;
        Ok(())
    }

    /// Guests currently bound to a table (within transaction)
    pub fn guests_at_table_txn(
        &self,
        txn: &WriteTransaction,
        number: i32,
    ) -> StorageResult<Vec<Guest>> {
        let table = txn.open_table(GUESTS_TABLE)?;
        let mut guests = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let guest: Guest = serde_json::from_slice(value.value())?;
            if guest.table_number == Some(number) {
                guests.push(guest);
            }
        }
        Ok(guests)
    }

    pub fn get_guest(&self, id: i64) -> StorageResult<Option<Guest>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(GUESTS_TABLE)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Insert or replace a guest record
    pub fn put_guest(&self, guest: &Guest) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        self.put_guest_txn(&txn, guest)?;
        txn.commit()?;
        Ok(())
    }

    // ========== Dish Operations ==========

    pub fn get_dish(&self, id: &str) -> StorageResult<Option<Dish>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(DISHES_TABLE)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn put_dish(&self, dish: &Dish) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(DISHES_TABLE)?;
            let value = serde_json::to_vec(dish)?;
            table.insert(dish.id.as_str(), value.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{Dish, DishStatus, TableStatus};

    fn create_test_table(number: i32) -> Table {
        Table {
            id: shared::util::snowflake_id(),
            number,
            capacity: 4,
            status: TableStatus::Available,
            token: "abc123".to_string(),
            location: None,
            reservation: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_open_in_memory_starts_empty() {
        let storage = Storage::open_in_memory().unwrap();
        assert!(storage.list_tables().unwrap().is_empty());
        assert_eq!(storage.count_revenues().unwrap(), 0);
    }

    #[test]
    fn test_table_roundtrip_ordered_by_number() {
        let storage = Storage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        storage.put_table_txn(&txn, &create_test_table(12)).unwrap();
        storage.put_table_txn(&txn, &create_test_table(7)).unwrap();
        Storage::commit(txn).unwrap();

        let numbers: Vec<i32> = storage.list_tables().unwrap().iter().map(|t| t.number).collect();
        assert_eq!(numbers, vec![7, 12]);
        assert_eq!(storage.get_table(7).unwrap().unwrap().token, "abc123");
        assert!(storage.get_table(99).unwrap().is_none());
    }

    #[test]
    fn test_uncommitted_transaction_is_discarded() {
        let storage = Storage::open_in_memory().unwrap();
        {
            let txn = storage.begin_write().unwrap();
            storage.put_table_txn(&txn, &create_test_table(3)).unwrap();
            // dropped without commit
        }
        assert!(storage.get_table(3).unwrap().is_none());
    }

    #[test]
    fn test_processed_transactions() {
        let storage = Storage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        assert!(!storage.is_transaction_processed_txn(&txn, "92704").unwrap());
        storage.mark_transaction_processed(&txn, "92704", 1).unwrap();
        assert!(storage.is_transaction_processed_txn(&txn, "92704").unwrap());
        Storage::commit(txn).unwrap();

        let txn = storage.begin_write().unwrap();
        assert!(storage.is_transaction_processed_txn(&txn, "92704").unwrap());
    }

    #[test]
    fn test_revenue_source_index() {
        let storage = Storage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let revenue = Revenue {
            id: storage.next_revenue_id(&txn).unwrap(),
            source_id: "payment:1".to_string(),
            payment_id: Some(1),
            order_group_ids: vec![10],
            amount: 50.0,
            method: shared::models::PaymentMethod::Bank,
            created_at: 1,
        };
        storage.insert_revenue_txn(&txn, &revenue).unwrap();
        assert!(storage.has_revenue_source_txn(&txn, "payment:1").unwrap());
        assert!(!storage.has_revenue_source_txn(&txn, "payment:2").unwrap());
        Storage::commit(txn).unwrap();

        assert_eq!(storage.count_revenues().unwrap(), 1);
        assert_eq!(storage.list_revenues(|_| true).unwrap()[0], revenue);
    }

    #[test]
    fn test_dish_upsert_replaces() {
        let storage = Storage::open_in_memory().unwrap();
        let mut dish = Dish {
            id: "D1".to_string(),
            name: "Pho".to_string(),
            price: 45000.0,
            image: None,
            description: None,
            status: DishStatus::Available,
        };
        storage.put_dish(&dish).unwrap();
        dish.price = 50000.0;
        storage.put_dish(&dish).unwrap();
        assert_eq!(storage.get_dish("D1").unwrap().unwrap().price, 50000.0);
    }
}
