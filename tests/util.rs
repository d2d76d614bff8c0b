#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]

use std::sync::Arc;

use asset_admin_lib::{migrate, DependencyGraph, DeletionService};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

pub async fn temp_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("connect sqlite::memory:");
    sqlx::query("PRAGMA foreign_keys=ON;")
        .execute(&pool)
        .await
        .unwrap();
    pool
}

pub async fn migrated_pool() -> SqlitePool {
    let pool = temp_pool().await;
    migrate::apply_migrations(&pool)
        .await
        .expect("apply migrations");
    pool
}

pub fn service(pool: &SqlitePool) -> DeletionService {
    let graph = DependencyGraph::builtin().expect("builtin graph");
    DeletionService::new(pool.clone(), Arc::new(graph))
}

/// Run `;`-separated statements in order.
pub async fn exec(pool: &SqlitePool, script: &str) {
    for stmt in script.split(';') {
        let stmt = stmt.trim();
        if stmt.is_empty() {
            continue;
        }
        sqlx::query(stmt)
            .execute(pool)
            .await
            .unwrap_or_else(|err| panic!("{stmt}: {err}"));
    }
}

pub async fn count(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn scalar_i64(pool: &SqlitePool, sql: &str) -> i64 {
    sqlx::query_scalar(sql).fetch_one(pool).await.unwrap()
}

/// Rows reported by `PRAGMA foreign_key_check`; zero means every reference
/// resolves.
pub async fn fk_violations(pool: &SqlitePool) -> usize {
    sqlx::query("PRAGMA foreign_key_check")
        .fetch_all(pool)
        .await
        .unwrap()
        .len()
}

/// Customer C1 with location L1, building B1, rooms R1 and R2 and three
/// assets in each room.
pub const BUILDING_B1: &str = "
INSERT INTO customers (id, name) VALUES ('C1', 'Acme');
INSERT INTO locations (id, customer_id, name) VALUES ('L1', 'C1', 'Plant');
INSERT INTO buildings (id, location_id, name) VALUES ('B1', 'L1', 'North');
INSERT INTO building_rooms (id, building_id, name) VALUES ('R1', 'B1', 'Boiler');
INSERT INTO building_rooms (id, building_id, name) VALUES ('R2', 'B1', 'Kitchen');
INSERT INTO assets (id, room_id, name) VALUES ('A1', 'R1', 'Boiler 1');
INSERT INTO assets (id, room_id, name) VALUES ('A2', 'R1', 'Boiler 2');
INSERT INTO assets (id, room_id, name) VALUES ('A3', 'R1', 'Pump');
INSERT INTO assets (id, room_id, name) VALUES ('A4', 'R2', 'Sink');
INSERT INTO assets (id, room_id, name) VALUES ('A5', 'R2', 'Chiller');
INSERT INTO assets (id, room_id, name) VALUES ('A6', 'R2', 'Tap');
";

/// Manufacturer M1 referenced by three assets and nothing else.
pub const MANUFACTURER_M1: &str = "
INSERT INTO manufacturers (id, name) VALUES ('M1', 'Globex');
UPDATE assets SET manufacturer_id = 'M1' WHERE id IN ('A1', 'A2', 'A4');
";

/// Everything hanging off customer C1, on top of [`BUILDING_B1`] and
/// [`MANUFACTURER_M1`], plus rows owned by nobody in particular.
pub const CUSTOMER_C1_TREE: &str = "
INSERT INTO customer_contacts (id, customer_id, name) VALUES ('CC1', 'C1', 'Jo');
INSERT INTO addresses (id, customer_id, line1) VALUES ('AD1', 'C1', '1 Main St');
UPDATE locations SET address_id = 'AD1' WHERE id = 'L1';
INSERT INTO location_contacts (id, location_id, name) VALUES ('LC1', 'L1', 'Sam');
INSERT INTO location_notes (id, location_id, body) VALUES ('LN1', 'L1', 'gate code 1234');
INSERT INTO asset_types (id, name) VALUES ('T1', 'Boiler');
UPDATE assets SET asset_type_id = 'T1' WHERE id IN ('A1', 'A2');
INSERT INTO pou_points (id, asset_id, label) VALUES ('P1', 'A1', 'Outlet');
INSERT INTO pou_points (id, asset_id, label) VALUES ('P2', 'A4', 'Tap');
INSERT INTO pou_readings (id, pou_point_id, value) VALUES ('PR1', 'P1', 7.5);
INSERT INTO asset_readings (id, asset_id, value) VALUES ('AR1', 'A2', 61.0);
INSERT INTO asset_documents (id, asset_id, title) VALUES ('DOC1', 'A2', 'Manual');
INSERT INTO service_schedules (id, asset_id) VALUES ('SS1', 'A3');
INSERT INTO filter_types (id, name) VALUES ('FT1', 'Carbon');
INSERT INTO filters (id, filter_type_id, manufacturer_id, name) VALUES ('F1', 'FT1', 'M1', 'CF-10');
INSERT INTO asset_filters (id, asset_id, filter_id) VALUES ('AF1', 'A4', 'F1');
INSERT INTO filter_changes (id, asset_filter_id) VALUES ('FC1', 'AF1');
INSERT INTO part_categories (id, name) VALUES ('PC1', 'Valves');
INSERT INTO parts_listing (id, manufacturer_id, part_category_id, name) VALUES ('PT1', 'M1', 'PC1', 'Valve');
INSERT INTO part_inventory (id, part_id, location_id, quantity) VALUES ('PI1', 'PT1', 'L1', 4);
INSERT INTO technicians (id, name) VALUES ('TE1', 'Alex');
INSERT INTO work_orders (id, location_id, asset_id, title) VALUES ('WO1', 'L1', 'A1', 'Descale');
INSERT INTO work_order_items (id, work_order_id, part_id) VALUES ('WI1', 'WO1', 'PT1');
INSERT INTO work_order_notes (id, work_order_id, body) VALUES ('WN1', 'WO1', 'Arrived');
INSERT INTO work_order_assignments (id, work_order_id, technician_id) VALUES ('WA1', 'WO1', 'TE1');
INSERT INTO work_order_attachments (id, work_order_id, path) VALUES ('WT1', 'WO1', 'photo.jpg');
INSERT INTO invoices (id, customer_id, work_order_id) VALUES ('I1', 'C1', 'WO1');
INSERT INTO invoice_lines (id, invoice_id, description) VALUES ('IL1', 'I1', 'Labour');
INSERT INTO users (id, customer_id, email) VALUES ('U1', 'C1', 'jo@acme.test');
INSERT INTO user_locations (id, user_id, location_id) VALUES ('UL1', 'U1', 'L1');
INSERT INTO content_sections (id, slug, title) VALUES ('CS1', 'about', 'About');
";

/// A second tenant that must survive anything done to C1.
pub const CUSTOMER_C2_TREE: &str = "
INSERT INTO customers (id, name) VALUES ('C2', 'Initech');
INSERT INTO locations (id, customer_id, name) VALUES ('L2', 'C2', 'Office');
INSERT INTO buildings (id, location_id, name) VALUES ('B2', 'L2', 'Tower');
INSERT INTO building_rooms (id, building_id, name) VALUES ('R3', 'B2', 'Lobby');
INSERT INTO assets (id, room_id, manufacturer_id, name) VALUES ('A7', 'R3', 'M1', 'Fountain');
INSERT INTO work_orders (id, location_id, asset_id, title) VALUES ('WO2', 'L2', 'A7', 'Inspect');
INSERT INTO invoices (id, customer_id, work_order_id) VALUES ('I2', 'C2', 'WO2');
";

pub async fn seed_building_b1(pool: &SqlitePool) {
    exec(pool, BUILDING_B1).await;
}

pub async fn seed_everything(pool: &SqlitePool) {
    exec(pool, BUILDING_B1).await;
    exec(pool, MANUFACTURER_M1).await;
    exec(pool, CUSTOMER_C1_TREE).await;
    exec(pool, CUSTOMER_C2_TREE).await;
}
