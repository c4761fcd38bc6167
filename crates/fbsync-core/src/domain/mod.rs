pub mod contact;
pub mod phone;
pub mod phonebook;

pub use contact::{
    BinaryProperty, BinaryValue, CanonicalContact, GroupCard, NameParts, NormalizedCard,
    RawEmail, RawPhone, VendorHints,
};
pub use phone::{
    composite_key, is_device_hosted, is_device_internal, is_internal_number, normalize_number_key,
};
pub use phonebook::{DeviceContact, DeviceEmail, DeviceNumber, Phonebook, MAX_NUMBERS_PER_CONTACT};
