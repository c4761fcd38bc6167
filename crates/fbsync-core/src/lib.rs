pub mod attributes;
pub mod convert;
pub mod diff;
pub mod domain;
pub mod error;
pub mod fax;
pub mod filter;
pub mod groups;
pub mod keypad;
pub mod reconcile;

pub use attributes::{AttributeRow, AttributeSnapshot, CSV_HEADER};
pub use convert::{
    export_phonebook, ConversionConfig, ConversionReport, ConversionRun, Converter, Replacement,
    TypeMapping, DEFAULT_FAX_TYPE,
};
pub use diff::device_only_contacts;
pub use domain::*;
pub use error::{CoreError, Result};
pub use fax::{extract_fax_records, FaxRecord};
pub use filter::{apply_filters, FilterOutcome, FilterRules, TagAttribute, TagRules};
pub use groups::{dissolve_groups, DissolvedGroups};
pub use keypad::quickdial_labels;
pub use reconcile::{
    has_manual_attributes, reconcile, PreservedAttribute, PreservedAttributes, ReconcileOutcome,
};
