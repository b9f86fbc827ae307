use cohort_core::{Coordinator, CoordinatorBuilder};
use tempfile::TempDir;

/// Plan that scores 100: two phases, five tasks, every section filled.
pub const AUTH_PLAN: &str = include_str!("../fixtures/auth_plan.json");

/// Helper function to create a test coordinator
pub async fn create_test_coordinator() -> (TempDir, Coordinator) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");
    let coordinator = CoordinatorBuilder::new()
        .with_database_path(Some(&db_path))
        .build()
        .await
        .expect("Failed to create coordinator");
    (temp_dir, coordinator)
}
