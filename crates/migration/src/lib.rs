pub use sea_orm_migration::prelude::*;

mod m20260301_000000_init;
mod m20260303_000000_categories;
mod m20260305_000000_transactions;
mod m20260308_000000_budgets;
mod m20260310_000000_refresh_tokens;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000000_init::Migration),
            Box::new(m20260303_000000_categories::Migration),
            Box::new(m20260305_000000_transactions::Migration),
            Box::new(m20260308_000000_budgets::Migration),
            Box::new(m20260310_000000_refresh_tokens::Migration),
        ]
    }
}
