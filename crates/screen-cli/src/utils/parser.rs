use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Ledger address '{0}' has no host. Expected 'host[:port][/db]' (e.g., 'localhost:6379/7').")]
    MissingHost(String),

    #[error("Invalid port '{port}' in ledger address '{address}'.")]
    InvalidPort { address: String, port: String },

    #[error("Invalid database index '{db}' in ledger address '{address}'.")]
    InvalidDatabase { address: String, db: String },
}

/// Ledger store location as written on the command line or in a settings file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerAddress {
    pub host: String,
    pub port: Option<u16>,
    pub db: Option<i64>,
}

/// Parses `host[:port][/db]`.
pub fn parse_ledger_address(address: &str) -> Result<LedgerAddress, ParseError> {
    let trimmed = address.trim();
    let (authority, db) = match trimmed.split_once('/') {
        Some((authority, db)) => (authority, Some(db)),
        None => (trimmed, None),
    };
    let (host, port) = match authority.rsplit_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (authority, None),
    };

    if host.is_empty() {
        return Err(ParseError::MissingHost(address.to_string()));
    }
    let port = port
        .map(|p| {
            p.parse::<u16>().map_err(|_| ParseError::InvalidPort {
                address: address.to_string(),
                port: p.to_string(),
            })
        })
        .transpose()?;
    let db = db
        .map(|d| {
            d.parse::<i64>()
                .ok()
                .filter(|d| *d >= 0)
                .ok_or_else(|| ParseError::InvalidDatabase {
                    address: address.to_string(),
                    db: d.to_string(),
                })
        })
        .transpose()?;

    Ok(LedgerAddress {
        host: host.to_string(),
        port,
        db,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_address_is_split_into_its_parts() {
        assert_eq!(
            parse_ledger_address("db.internal:6380/3"),
            Ok(LedgerAddress {
                host: "db.internal".to_string(),
                port: Some(6380),
                db: Some(3),
            })
        );
    }

    #[test]
    fn port_and_database_are_optional() {
        let address = parse_ledger_address("localhost").unwrap();
        assert_eq!(address.port, None);
        assert_eq!(address.db, None);

        let address = parse_ledger_address("localhost/9").unwrap();
        assert_eq!(address.port, None);
        assert_eq!(address.db, Some(9));
    }

    #[test]
    fn malformed_addresses_are_rejected() {
        assert_eq!(
            parse_ledger_address(":6379"),
            Err(ParseError::MissingHost(":6379".to_string()))
        );
        assert!(matches!(
            parse_ledger_address("localhost:redis"),
            Err(ParseError::InvalidPort { .. })
        ));
        assert!(matches!(
            parse_ledger_address("localhost:6379/-1"),
            Err(ParseError::InvalidDatabase { .. })
        ));
    }
}
