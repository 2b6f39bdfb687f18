use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::CustomerError;
use super::value_objects::Cpf;

// ============================================================================
// Customer - identity the order workflow resolves tokens against
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    /// Empty until the repository assigns one.
    pub id: String,
    pub name: String,
    pub cpf: Cpf,
    pub email: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    pub fn new(
        name: impl Into<String>,
        cpf: Cpf,
        email: impl Into<String>,
        phone: impl Into<String>,
    ) -> Result<Self, CustomerError> {
        let name = name.into();
        let email = email.into();

        if name.trim().is_empty() {
            return Err(CustomerError::EmptyName);
        }
        if !email.contains('@') {
            return Err(CustomerError::InvalidEmail(email));
        }

        let now = Utc::now();
        Ok(Self {
            id: String::new(),
            name,
            cpf,
            email,
            phone: phone.into(),
            created_at: now,
            updated_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cpf() -> Cpf {
        Cpf::parse("111.444.777-35").unwrap()
    }

    #[test]
    fn test_customer_registration() {
        let customer = Customer::new("Maria Silva", cpf(), "maria@example.com", "11999990000").unwrap();
        assert!(customer.id.is_empty());
        assert_eq!(customer.cpf.as_str(), "11144477735");
        assert_eq!(customer.created_at, customer.updated_at);
    }

    #[test]
    fn test_customer_registration_with_empty_name_fails() {
        let result = Customer::new("   ", cpf(), "maria@example.com", "");
        assert!(matches!(result, Err(CustomerError::EmptyName)));
    }

    #[test]
    fn test_customer_registration_with_invalid_email_fails() {
        let result = Customer::new("Maria", cpf(), "not-an-email", "");
        assert!(matches!(result, Err(CustomerError::InvalidEmail(_))));
    }
}
