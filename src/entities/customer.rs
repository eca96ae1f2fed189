// 👤 Customer Entity - owner of one or more accounts

use super::Record;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    /// Stable identity
    pub customer_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub registration_date: NaiveDate,
}

impl Customer {
    pub fn new(
        customer_id: i64,
        first_name: &str,
        last_name: &str,
        email: &str,
        registration_date: NaiveDate,
    ) -> Self {
        Customer {
            customer_id,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: email.to_string(),
            registration_date,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl Record for Customer {
    fn describe(&self) -> String {
        format!("customer #{}", self.customer_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_customer_full_name_and_description() {
        let customer = Customer::new(
            7,
            "Ada",
            "Lovelace",
            "ada@example.com",
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        );

        assert_eq!(customer.full_name(), "Ada Lovelace");
        assert_eq!(customer.describe(), "customer #7");
    }
}
