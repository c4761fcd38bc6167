pub mod carddav;
pub mod device;
pub mod error;
pub mod local;
pub mod normalize;
pub mod phonebook_xml;
pub mod photos;
pub mod source;
pub mod vcf;

pub use carddav::CardDavSource;
pub use device::{DeviceTransport, FritzBoxClient};
pub use error::{Result, SyncError};
pub use local::LocalVcfSource;
pub use normalize::{LinkedData, LinkedDataFetcher, NormalizeReport, Normalizer};
pub use phonebook_xml::{parse_phonebook, write_phonebook};
pub use photos::{upload_photos, DirectoryPhotoStore, PhotoReport, PhotoUploader};
pub use source::VcfSource;
