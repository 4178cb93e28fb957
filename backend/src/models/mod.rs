pub mod catalog;
pub mod configuration;
pub mod coordinate;
pub mod site;
pub mod target;
pub mod time;

pub use catalog::*;
pub use configuration::{
    AngleValue, AttributeBag, AttributeValue, Configuration, ConfigurationTable, OffsetStar,
    RecognizedAttributes, SlitGeometry,
};
pub use coordinate::*;
pub use site::*;
pub use target::*;
pub use time::*;
