// Entity Models - Customers, Accounts, Transactions
//
// Flat, read-only records owned by an external store.
// Customer 1→N Account, Account 1→N Transaction.
//
// Each entity can describe itself so that core errors name the offending row.

pub mod customer;
pub mod account;
pub mod transaction;

pub use customer::Customer;
pub use account::{Account, AccountType};
pub use transaction::{Transaction, TransactionType, category};

/// A record the analytical core can point at in an error message
pub trait Record {
    /// Short human-readable identity, e.g. "transaction #42"
    fn describe(&self) -> String;
}

impl<T: Record + ?Sized> Record for &T {
    fn describe(&self) -> String {
        (**self).describe()
    }
}
