use std::path::{Path, PathBuf};

/// Tables created by `schema.sql`.
pub const SCHEMA_TABLES: &[&str] = &[
    "roles",
    "users",
    "payment_methods",
    "logistic_statuses",
    "product_categories",
    "products",
    "customers",
    "customer_addresses",
    "orders",
    "order_items",
    "payments",
    "shipments",
    "shipment_status_history",
    "audit_log",
];

/// Tables created by `extension.sql`.
pub const EXTENSION_TABLES: &[&str] = &[
    "inventory_movements",
    "inventory_levels",
    "product_price_history",
    "lost_orders",
];

/// Locations of the three bootstrap scripts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SqlAssets {
    pub schema: PathBuf,
    pub extension: PathBuf,
    pub seed: PathBuf,
}

impl SqlAssets {
    pub const DEFAULT_DIR: &'static str = "sql";

    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            schema: dir.join("schema.sql"),
            extension: dir.join("extension.sql"),
            seed: dir.join("seed.sql"),
        }
    }

    pub fn files(&self) -> [&Path; 3] {
        [&self.schema, &self.extension, &self.seed]
    }

    /// Scripts that are not regular files on disk.
    pub fn missing(&self) -> Vec<&Path> {
        self.files()
            .into_iter()
            .filter(|path| !path.is_file())
            .collect()
    }
}

impl Default for SqlAssets {
    fn default() -> Self {
        Self::in_dir(Self::DEFAULT_DIR)
    }
}
