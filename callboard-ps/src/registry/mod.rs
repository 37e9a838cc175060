//! Field and option registries
//!
//! Administrator-owned metadata: field definitions and the option sets of
//! enumerated fields. All mutations here must be followed by a schema cache
//! invalidation (the API layer does this).

pub mod fields;
pub mod options;

pub use fields::{create_field, delete_field, get_field, list_fields, update_field, FieldPatch, FieldSpec};
pub use options::{
    create_option, delete_option, get_option, list_options, reorder_options, update_option,
    OptionPatch, OptionSpec,
};
