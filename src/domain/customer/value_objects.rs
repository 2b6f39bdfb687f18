use std::fmt;

use serde::{Deserialize, Serialize};

use super::errors::CustomerError;

// ============================================================================
// Customer Value Objects
// ============================================================================

/// Brazilian individual taxpayer number, stored as its 11 bare digits.
///
/// Formatting characters are ignored on input, so `111.444.777-35` and
/// `11144477735` are the same CPF.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cpf(String);

impl Cpf {
    pub fn parse(raw: &str) -> Result<Self, CustomerError> {
        let digits: Vec<u32> = raw.chars().filter_map(|c| c.to_digit(10)).collect();

        if digits.len() != 11 {
            return Err(CustomerError::InvalidCpf(raw.to_string()));
        }
        if digits.iter().all(|d| *d == digits[0]) {
            return Err(CustomerError::InvalidCpf(raw.to_string()));
        }
        if check_digit(&digits[..9]) != digits[9] || check_digit(&digits[..10]) != digits[10] {
            return Err(CustomerError::InvalidCpf(raw.to_string()));
        }

        Ok(Self(digits.iter().map(|d| char::from_digit(*d, 10).unwrap_or('0')).collect()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// mod-11 weighted sum, weights counting down to 2
fn check_digit(digits: &[u32]) -> u32 {
    let weight_start = digits.len() as u32 + 1;
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, d)| d * (weight_start - i as u32))
        .sum();
    let rest = (sum * 10) % 11;
    if rest == 10 { 0 } else { rest }
}

impl fmt::Display for Cpf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Cpf {
    type Error = CustomerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Cpf::parse(&value)
    }
}

impl From<Cpf> for String {
    fn from(cpf: Cpf) -> Self {
        cpf.0
    }
}
