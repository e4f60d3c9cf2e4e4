use thiserror::Error;

use super::models::{AbortRequest, ScanRequest, SignalRequest};

/// Largest number of addresses accepted in one scan request.
pub const MAX_SCAN_ADDRESSES: usize = 10_000;
const MAX_ADDRESS_LEN: usize = 2048;

#[derive(Debug, Error)]
pub enum RequestValidationError {
    #[error("addresses must contain between 1 and 10000 entries")]
    InvalidAddressCount,
    #[error("address must not be empty")]
    EmptyAddress,
    #[error("address exceeds 2048 bytes")]
    AddressTooLong,
}

pub fn validate_scan(request: &ScanRequest) -> Result<(), RequestValidationError> {
    if !(1..=MAX_SCAN_ADDRESSES).contains(&request.addresses.len()) {
        return Err(RequestValidationError::InvalidAddressCount);
    }
    // Empty entries are counted as rejected by the scan itself; only length is capped here.
    for address in &request.addresses {
        if address.len() > MAX_ADDRESS_LEN {
            return Err(RequestValidationError::AddressTooLong);
        }
    }
    Ok(())
}

pub fn validate_signal(request: &SignalRequest) -> Result<(), RequestValidationError> {
    validate_address(&request.address)
}

pub fn validate_abort(request: &AbortRequest) -> Result<(), RequestValidationError> {
    validate_address(&request.address)
}

fn validate_address(address: &str) -> Result<(), RequestValidationError> {
    if address.trim().is_empty() {
        return Err(RequestValidationError::EmptyAddress);
    }
    if address.len() > MAX_ADDRESS_LEN {
        return Err(RequestValidationError::AddressTooLong);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::links::Signal;

    #[test]
    fn test_scan_address_count() {
        let empty = ScanRequest { addresses: vec![] };
        assert!(matches!(
            validate_scan(&empty),
            Err(RequestValidationError::InvalidAddressCount)
        ));

        let too_many = ScanRequest {
            addresses: vec!["https://a.test/".to_string(); MAX_SCAN_ADDRESSES + 1],
        };
        assert!(validate_scan(&too_many).is_err());

        let ok = ScanRequest {
            addresses: vec!["https://a.test/".to_string(), String::new()],
        };
        assert!(validate_scan(&ok).is_ok());
    }

    #[test]
    fn test_signal_address() {
        let blank = SignalRequest {
            address: "  ".to_string(),
            signal: Signal::HoverEnter,
        };
        assert!(matches!(
            validate_signal(&blank),
            Err(RequestValidationError::EmptyAddress)
        ));

        let long = AbortRequest {
            address: format!("https://a.test/{}", "x".repeat(MAX_ADDRESS_LEN)),
        };
        assert!(matches!(
            validate_abort(&long),
            Err(RequestValidationError::AddressTooLong)
        ));
    }
}
