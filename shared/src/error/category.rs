//! Grouping of error codes by the thousand they fall in

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};

/// Storefront area an error code belongs to. Only `System` errors are
/// logged at error level when turned into a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    General,
    Auth,
    Permission,
    Cart,
    Order,
    Payment,
    Product,
    /// 9xxx, plus any thousand with no area assigned
    System,
}

impl ErrorCategory {
    pub fn from_code(code: u16) -> Self {
        match code / 1000 {
            0 => Self::General,
            1 => Self::Auth,
            2 => Self::Permission,
            3 => Self::Cart,
            4 => Self::Order,
            5 => Self::Payment,
            6 => Self::Product,
            _ => Self::System,
        }
    }
}

impl ErrorCode {
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code())
    }
}
