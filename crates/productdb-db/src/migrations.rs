//! Schema migrations for the product catalog database.
//!
//! Each migration has a version, a description and a SQL body. They are
//! applied in the order they are declared here, whatever their version
//! strings sort as, and tracked in the `schema_migrations` ledger.
//!
//! Entries are append-only: the ledger is keyed by version, so editing the
//! SQL of a released migration is never detected and silently diverges
//! recorded history from the real schema.
use std::collections::HashSet;

use productdb_common::{Error, Result};

/// Width of the ledger's `version` column.
pub const MAX_VERSION_LEN: usize = 10;
/// Width of the ledger's `description` column.
pub const MAX_DESCRIPTION_LEN: usize = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Migration {
    pub version: &'static str,
    pub description: &'static str,
    pub sql: &'static str,
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "001",
        description: "Create products table",
        sql: "CREATE TABLE IF NOT EXISTS products (
            id BIGSERIAL PRIMARY KEY,
            name VARCHAR(255) NOT NULL,
            description TEXT,
            price NUMERIC(10, 2) NOT NULL DEFAULT 0,
            category VARCHAR(100),
            quantity INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        );",
    },
    Migration {
        version: "002",
        description: "Add index on products.name",
        sql: "CREATE INDEX IF NOT EXISTS idx_products_name ON products(name);",
    },
    Migration {
        version: "003",
        description: "Add index on products.category",
        sql: "CREATE INDEX IF NOT EXISTS idx_products_category ON products(category);",
    },
];

/// Ordered, validated set of migrations.
#[derive(Debug, Clone)]
pub struct Catalog {
    migrations: Vec<Migration>,
}

impl Catalog {
    pub fn new(migrations: Vec<Migration>) -> Result<Self> {
        let mut seen = HashSet::new();
        for m in &migrations {
            if m.version.trim().is_empty() {
                return Err(Error::Catalog("migration version cannot be empty".into()));
            }
            if m.version.len() > MAX_VERSION_LEN {
                return Err(Error::Catalog(format!(
                    "migration version {:?} exceeds {MAX_VERSION_LEN} characters",
                    m.version
                )));
            }
            if m.description.chars().count() > MAX_DESCRIPTION_LEN {
                return Err(Error::Catalog(format!(
                    "description of migration {} exceeds {MAX_DESCRIPTION_LEN} characters",
                    m.version
                )));
            }
            if m.sql.trim().is_empty() {
                return Err(Error::Catalog(format!(
                    "migration {} has an empty SQL body",
                    m.version
                )));
            }
            if !seen.insert(m.version) {
                return Err(Error::Catalog(format!(
                    "duplicate migration version {}",
                    m.version
                )));
            }
        }
        Ok(Self { migrations })
    }

    /// The migrations shipped with this build.
    pub fn builtin() -> Result<Self> {
        Self::new(MIGRATIONS.to_vec())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Migration> {
        self.migrations.iter()
    }

    pub fn get(&self, version: &str) -> Option<&Migration> {
        self.migrations.iter().find(|m| m.version == version)
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn migration(version: &'static str) -> Migration {
        Migration {
            version,
            description: "test",
            sql: "SELECT 1",
        }
    }

    #[test]
    fn builtin_catalog_is_valid() {
        let catalog = Catalog::builtin().expect("shipped migrations must validate");
        assert_eq!(catalog.len(), MIGRATIONS.len());
        assert_eq!(catalog.iter().next().map(|m| m.version), Some("001"));
    }

    #[test]
    fn declared_order_is_preserved() {
        let catalog = Catalog::new(vec![migration("010"), migration("002")]).unwrap();
        let versions: Vec<_> = catalog.iter().map(|m| m.version).collect();
        assert_eq!(versions, ["010", "002"]);
    }

    #[test]
    fn duplicate_versions_are_rejected() {
        let err = Catalog::new(vec![migration("001"), migration("002"), migration("001")])
            .unwrap_err();
        assert!(err.to_string().contains("duplicate migration version 001"));
    }

    #[test]
    fn oversized_version_is_rejected() {
        assert!(Catalog::new(vec![migration("20240101000000")]).is_err());
    }

    #[test]
    fn empty_body_is_rejected() {
        let blank = Migration {
            version: "001",
            description: "nothing",
            sql: "  ",
        };
        assert!(Catalog::new(vec![blank]).is_err());
    }

    #[test]
    fn get_finds_by_version() {
        let catalog = Catalog::new(vec![migration("001"), migration("002")]).unwrap();
        assert!(catalog.get("002").is_some());
        assert!(catalog.get("003").is_none());
    }
}
