pub mod agent_filter;
pub mod contributor_selector;
pub mod csv_movement_source;
pub mod date_range_filter;
pub mod document_type_filter;
pub mod json_file_sink;
pub mod logging_sink;
pub mod positive_quantity_filter;
pub mod precision_selector;
pub mod product_filter;
pub mod product_level_exclusion_filter;
