//! Dependency graph for the facilities schema in `migrations/`.
//!
//! Edges are listed leaf-first per entity. Chained edges spell out every hop;
//! the resolver never infers joins. Cross links that should survive a delete
//! (an asset's manufacturer, a work order's asset) are nullified instead.

use super::{delete, entity, nullify, GraphDefinition, SoftStatus, GRAPH_VERSION};

pub fn definition() -> GraphDefinition {
    GraphDefinition {
        version: GRAPH_VERSION,
        entities: entities(),
    }
}

fn entities() -> Vec<super::EntitySpec> {
    vec![
        // Tenant root. Everything a customer owns hangs off its locations.
        entity("customers")
            .soft_status(SoftStatus::status_and_flag())
            .edge(nullify("locations", "address_id").via(&[("addresses", "customer_id")]))
            .edge(
                nullify("work_orders", "asset_id").via(&[
                    ("assets", "room_id"),
                    ("building_rooms", "building_id"),
                    ("buildings", "location_id"),
                    ("locations", "customer_id"),
                ]),
            )
            .edge(
                nullify("invoices", "work_order_id").via(&[
                    ("work_orders", "location_id"),
                    ("locations", "customer_id"),
                ]),
            )
            .edge(delete("invoice_lines", "invoice_id").via(&[("invoices", "customer_id")]))
            .edge(delete("invoices", "customer_id"))
            .edge(
                delete("work_order_items", "work_order_id").via(&[
                    ("work_orders", "location_id"),
                    ("locations", "customer_id"),
                ]),
            )
            .edge(
                delete("work_order_notes", "work_order_id").via(&[
                    ("work_orders", "location_id"),
                    ("locations", "customer_id"),
                ]),
            )
            .edge(
                delete("work_order_assignments", "work_order_id").via(&[
                    ("work_orders", "location_id"),
                    ("locations", "customer_id"),
                ]),
            )
            .edge(
                delete("work_order_attachments", "work_order_id")
                    .via(&[
                        ("work_orders", "location_id"),
                        ("locations", "customer_id"),
                    ])
                    .optional(),
            )
            .edge(delete("work_orders", "location_id").via(&[("locations", "customer_id")]))
            .edge(
                delete("pou_readings", "pou_point_id")
                    .via(&[
                        ("pou_points", "asset_id"),
                        ("assets", "room_id"),
                        ("building_rooms", "building_id"),
                        ("buildings", "location_id"),
                        ("locations", "customer_id"),
                    ])
                    .optional(),
            )
            .edge(
                delete("pou_points", "asset_id").via(&[
                    ("assets", "room_id"),
                    ("building_rooms", "building_id"),
                    ("buildings", "location_id"),
                    ("locations", "customer_id"),
                ]),
            )
            .edge(
                delete("asset_readings", "asset_id")
                    .via(&[
                        ("assets", "room_id"),
                        ("building_rooms", "building_id"),
                        ("buildings", "location_id"),
                        ("locations", "customer_id"),
                    ])
                    .optional(),
            )
            .edge(
                delete("asset_documents", "asset_id").via(&[
                    ("assets", "room_id"),
                    ("building_rooms", "building_id"),
                    ("buildings", "location_id"),
                    ("locations", "customer_id"),
                ]),
            )
            .edge(
                delete("service_schedules", "asset_id").via(&[
                    ("assets", "room_id"),
                    ("building_rooms", "building_id"),
                    ("buildings", "location_id"),
                    ("locations", "customer_id"),
                ]),
            )
            .edge(
                delete("filter_changes", "asset_filter_id").via(&[
                    ("asset_filters", "asset_id"),
                    ("assets", "room_id"),
                    ("building_rooms", "building_id"),
                    ("buildings", "location_id"),
                    ("locations", "customer_id"),
                ]),
            )
            .edge(
                delete("asset_filters", "asset_id").via(&[
                    ("assets", "room_id"),
                    ("building_rooms", "building_id"),
                    ("buildings", "location_id"),
                    ("locations", "customer_id"),
                ]),
            )
            .edge(
                delete("assets", "room_id").via(&[
                    ("building_rooms", "building_id"),
                    ("buildings", "location_id"),
                    ("locations", "customer_id"),
                ]),
            )
            .edge(
                delete("building_rooms", "building_id").via(&[
                    ("buildings", "location_id"),
                    ("locations", "customer_id"),
                ]),
            )
            .edge(delete("buildings", "location_id").via(&[("locations", "customer_id")]))
            .edge(delete("part_inventory", "location_id").via(&[("locations", "customer_id")]))
            .edge(delete("location_contacts", "location_id").via(&[("locations", "customer_id")]))
            .edge(
                delete("location_notes", "location_id")
                    .via(&[("locations", "customer_id")])
                    .optional(),
            )
            .edge(delete("user_locations", "location_id").via(&[("locations", "customer_id")]))
            .edge(delete("locations", "customer_id"))
            .edge(delete("customer_contacts", "customer_id"))
            .edge(nullify("users", "customer_id"))
            .edge(delete("addresses", "customer_id")),
        entity("addresses")
            .edge(nullify("locations", "address_id")),
        entity("locations")
            .soft_status(SoftStatus::status_and_flag())
            .edge(
                nullify("work_orders", "asset_id").via(&[
                    ("assets", "room_id"),
                    ("building_rooms", "building_id"),
                    ("buildings", "location_id"),
                ]),
            )
            .edge(nullify("invoices", "work_order_id").via(&[("work_orders", "location_id")]))
            .edge(
                delete("work_order_items", "work_order_id").via(&[("work_orders", "location_id")]),
            )
            .edge(
                delete("work_order_notes", "work_order_id").via(&[("work_orders", "location_id")]),
            )
            .edge(
                delete("work_order_assignments", "work_order_id").via(&[("work_orders", "location_id")]),
            )
            .edge(
                delete("work_order_attachments", "work_order_id")
                    .via(&[("work_orders", "location_id")])
                    .optional(),
            )
            .edge(delete("work_orders", "location_id"))
            .edge(
                delete("pou_readings", "pou_point_id")
                    .via(&[
                        ("pou_points", "asset_id"),
                        ("assets", "room_id"),
                        ("building_rooms", "building_id"),
                        ("buildings", "location_id"),
                    ])
                    .optional(),
            )
            .edge(
                delete("pou_points", "asset_id").via(&[
                    ("assets", "room_id"),
                    ("building_rooms", "building_id"),
                    ("buildings", "location_id"),
                ]),
            )
            .edge(
                delete("asset_readings", "asset_id")
                    .via(&[
                        ("assets", "room_id"),
                        ("building_rooms", "building_id"),
                        ("buildings", "location_id"),
                    ])
                    .optional(),
            )
            .edge(
                delete("asset_documents", "asset_id").via(&[
                    ("assets", "room_id"),
                    ("building_rooms", "building_id"),
                    ("buildings", "location_id"),
                ]),
            )
            .edge(
                delete("service_schedules", "asset_id").via(&[
                    ("assets", "room_id"),
                    ("building_rooms", "building_id"),
                    ("buildings", "location_id"),
                ]),
            )
            .edge(
                delete("filter_changes", "asset_filter_id").via(&[
                    ("asset_filters", "asset_id"),
                    ("assets", "room_id"),
                    ("building_rooms", "building_id"),
                    ("buildings", "location_id"),
                ]),
            )
            .edge(
                delete("asset_filters", "asset_id").via(&[
                    ("assets", "room_id"),
                    ("building_rooms", "building_id"),
                    ("buildings", "location_id"),
                ]),
            )
            .edge(
                delete("assets", "room_id").via(&[
                    ("building_rooms", "building_id"),
                    ("buildings", "location_id"),
                ]),
            )
            .edge(delete("building_rooms", "building_id").via(&[("buildings", "location_id")]))
            .edge(delete("buildings", "location_id"))
            .edge(delete("part_inventory", "location_id"))
            .edge(delete("location_contacts", "location_id"))
            .edge(delete("location_notes", "location_id").optional())
            .edge(delete("user_locations", "location_id")),
        // Rooms are the only path from a building to its assets.
        entity("buildings")
            .soft_status(SoftStatus::status_only())
            .edge(
                delete("pou_readings", "pou_point_id")
                    .via(&[
                        ("pou_points", "asset_id"),
                        ("assets", "room_id"),
                        ("building_rooms", "building_id"),
                    ])
                    .optional(),
            )
            .edge(
                delete("pou_points", "asset_id").via(&[
                    ("assets", "room_id"),
                    ("building_rooms", "building_id"),
                ]),
            )
            .edge(
                delete("asset_readings", "asset_id")
                    .via(&[
                        ("assets", "room_id"),
                        ("building_rooms", "building_id"),
                    ])
                    .optional(),
            )
            .edge(
                delete("asset_documents", "asset_id").via(&[
                    ("assets", "room_id"),
                    ("building_rooms", "building_id"),
                ]),
            )
            .edge(
                delete("service_schedules", "asset_id").via(&[
                    ("assets", "room_id"),
                    ("building_rooms", "building_id"),
                ]),
            )
            .edge(
                delete("filter_changes", "asset_filter_id").via(&[
                    ("asset_filters", "asset_id"),
                    ("assets", "room_id"),
                    ("building_rooms", "building_id"),
                ]),
            )
            .edge(
                delete("asset_filters", "asset_id").via(&[
                    ("assets", "room_id"),
                    ("building_rooms", "building_id"),
                ]),
            )
            .edge(
                nullify("work_orders", "asset_id").via(&[
                    ("assets", "room_id"),
                    ("building_rooms", "building_id"),
                ]),
            )
            .edge(delete("assets", "room_id").via(&[("building_rooms", "building_id")]))
            .edge(delete("building_rooms", "building_id")),
        entity("building_rooms")
            .edge(
                delete("pou_readings", "pou_point_id")
                    .via(&[
                        ("pou_points", "asset_id"),
                        ("assets", "room_id"),
                    ])
                    .optional(),
            )
            .edge(delete("pou_points", "asset_id").via(&[("assets", "room_id")]))
            .edge(delete("asset_readings", "asset_id").via(&[("assets", "room_id")]).optional())
            .edge(delete("asset_documents", "asset_id").via(&[("assets", "room_id")]))
            .edge(delete("service_schedules", "asset_id").via(&[("assets", "room_id")]))
            .edge(
                delete("filter_changes", "asset_filter_id").via(&[
                    ("asset_filters", "asset_id"),
                    ("assets", "room_id"),
                ]),
            )
            .edge(delete("asset_filters", "asset_id").via(&[("assets", "room_id")]))
            .edge(nullify("work_orders", "asset_id").via(&[("assets", "room_id")]))
            .edge(delete("assets", "room_id")),
        entity("assets")
            .soft_status(SoftStatus::status_and_flag())
            .edge(
                delete("pou_readings", "pou_point_id")
                    .via(&[("pou_points", "asset_id")])
                    .optional(),
            )
            .edge(delete("pou_points", "asset_id"))
            .edge(delete("asset_readings", "asset_id").optional())
            .edge(delete("asset_documents", "asset_id"))
            .edge(delete("service_schedules", "asset_id"))
            .edge(delete("filter_changes", "asset_filter_id").via(&[("asset_filters", "asset_id")]))
            .edge(delete("asset_filters", "asset_id"))
            .edge(nullify("work_orders", "asset_id")),
        entity("pou_points")
            .edge(delete("pou_readings", "pou_point_id").optional()),
        entity("asset_filters")
            .edge(delete("filter_changes", "asset_filter_id")),
        // Notes and attachments go with the order without asking.
        entity("work_orders")
            .edge(nullify("invoices", "work_order_id"))
            .edge(delete("work_order_items", "work_order_id"))
            .edge(delete("work_order_notes", "work_order_id").auto_cascade())
            .edge(delete("work_order_assignments", "work_order_id"))
            .edge(delete("work_order_attachments", "work_order_id").optional().auto_cascade()),
        entity("invoices")
            .edge(delete("invoice_lines", "invoice_id")),
        entity("technicians")
            .soft_status(SoftStatus::status_and_flag())
            .edge(delete("work_order_assignments", "technician_id")),
        entity("users")
            .soft_status(SoftStatus::flag_only())
            .edge(delete("user_locations", "user_id")),
        // Catalogue rows survive a manufacturer going away.
        entity("manufacturers")
            .soft_status(SoftStatus::status_only())
            .edge(nullify("assets", "manufacturer_id"))
            .edge(nullify("filters", "manufacturer_id"))
            .edge(nullify("parts_listing", "manufacturer_id")),
        entity("parts_listing")
            .soft_status(SoftStatus::status_only())
            .edge(nullify("work_order_items", "part_id"))
            .edge(delete("part_inventory", "part_id")),
        entity("part_categories")
            .edge(nullify("parts_listing", "part_category_id")),
        entity("filters")
            .soft_status(SoftStatus::status_only())
            .edge(delete("filter_changes", "asset_filter_id").via(&[("asset_filters", "filter_id")]))
            .edge(delete("asset_filters", "filter_id")),
        entity("filter_types")
            .edge(nullify("filters", "filter_type_id")),
        entity("asset_types")
            .edge(nullify("assets", "asset_type_id")),
        // Leaf tables: nothing references them.
        entity("customer_contacts"),
        entity("location_contacts"),
        entity("pou_readings"),
        entity("asset_documents"),
        entity("service_schedules"),
        entity("filter_changes"),
        entity("part_inventory"),
        entity("work_order_items"),
        entity("work_order_notes"),
        entity("work_order_assignments"),
        entity("invoice_lines"),
        entity("user_locations"),
        entity("asset_readings"),
        entity("location_notes"),
        entity("work_order_attachments"),
        entity("content_sections"),
    ]
}
